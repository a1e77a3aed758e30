//! Whitespace and escape-artifact cleanup for model and OCR output.

use once_cell::sync::Lazy;
use perceptor_core::{SentenceEmotion, TextAnalysis};
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:[A-Za-z]+)?").expect("valid regex"));

/// Replace newlines with spaces, drop backslashes, collapse whitespace runs
/// and trim. Idempotent.
pub fn clean_text(text: &str) -> String {
    let text = text.replace('\n', " ").replace('\\', "");
    WHITESPACE_RUN.replace_all(&text, " ").trim().to_string()
}

/// Clean every string field of an analysis.
pub fn clean_analysis(analysis: TextAnalysis) -> TextAnalysis {
    TextAnalysis {
        full_text: clean_text(&analysis.full_text),
        sentences: analysis
            .sentences
            .into_iter()
            .map(|s| SentenceEmotion {
                sentence: clean_text(&s.sentence),
                emotion: clean_text(&s.emotion),
            })
            .collect(),
    }
}

/// Strip markdown code fences and surrounding prose from a model's JSON
/// answer, leaving the outermost `{...}` object when one is present.
pub fn strip_code_fences(raw: &str) -> String {
    let unfenced = CODE_FENCE.replace_all(raw, "");
    let trimmed = unfenced.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(open), Some(close)) if open < close => trimmed[open..=close].to_string(),
        _ => trimmed.to_string(),
    }
}

/// Last-resort repair for JSON mangled with literal `\n` sequences and
/// stray backslashes.
pub(crate) fn scrub_escapes(json: &str) -> String {
    json.replace("\\n", " ").replace('\\', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_collapses_and_strips() {
        assert_eq!(clean_text("  Hello\\n  \n world\t\\ again  "), "Hellon world again");
        assert_eq!(clean_text("line one\nline two"), "line one line two");
    }

    #[test]
    fn test_clean_text_is_idempotent() {
        for input in ["a\n\nb  c\\d", "  \\\\ x \t y\n", "already clean", ""] {
            let once = clean_text(input);
            assert_eq!(clean_text(&once), once);
        }
    }

    #[test]
    fn test_clean_analysis_touches_every_field() {
        let analysis = TextAnalysis {
            full_text: "One.\nTwo.".into(),
            sentences: vec![SentenceEmotion {
                sentence: " One.\n".into(),
                emotion: "Calm\\".into(),
            }],
        };
        let cleaned = clean_analysis(analysis);
        assert_eq!(cleaned.full_text, "One. Two.");
        assert_eq!(cleaned.sentences[0].sentence, "One.");
        assert_eq!(cleaned.sentences[0].emotion, "Calm");
    }

    #[test]
    fn test_strip_code_fences() {
        let raw = "```json\n{\"summary\": \"s\", \"mood\": \"m\"}\n```";
        assert_eq!(strip_code_fences(raw), "{\"summary\": \"s\", \"mood\": \"m\"}");
        assert_eq!(
            strip_code_fences("Here you go: {\"a\": 1} hope it helps"),
            "{\"a\": 1}"
        );
        assert_eq!(strip_code_fences("no json"), "no json");
    }

    #[test]
    fn test_scrub_escapes() {
        assert_eq!(scrub_escapes(r#"{"a": "x\ny\"}"#), r#"{"a": "x y"}"#);
    }
}

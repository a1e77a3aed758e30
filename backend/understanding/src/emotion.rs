//! Per-sentence emotion tagging.
//!
//! Sentences are tagged in order; each prompt carries the emotion chosen for
//! the previous sentence, and an empty answer falls back to that emotion (or
//! `Neutral` for the first sentence).

use std::sync::Arc;

use perceptor_core::{
    GenerationRequest, PerceptorError, SentenceEmotion, TextAnalysis, TextGenerator,
    UpstreamCallPolicy, call_with_retry,
};
use perceptor_logging::{EventLogger, PipelineEvent};
use tracing::debug;

use crate::sentences::split_sentences;

/// Emotion used when neither the model nor the context gives one.
pub const DEFAULT_EMOTION: &str = "Neutral";

/// Prompt asking for the strongest emotion of `sentence`.
pub fn emotion_prompt(sentence: &str, previous: Option<&str>) -> String {
    format!(
        r#"*TASK:* Detect the strongest emotion in the given sentence, considering its tone, punctuation, and prior context.

*Possible Emotions:*
- Positive: Happy, Excited, Proud, Motivated, Hopeful, Admiration
- Negative: Sad, Angry, Frustrated, Fearful, Regretful
- Neutral: Informative, Calm, Objective

*Example Analysis:*
- "She won the championship!" → Emotion: Excited
- "He left without saying goodbye." → Emotion: Sad
- "The sun rises in the east." → Emotion: Neutral

*Previous Emotion:* {}
*Sentence:* "{}"

*Response Format:*
[Emotion Name]"#,
        previous.unwrap_or("None"),
        sentence
    )
}

/// Reduce a raw model answer to a bare emotion label.
///
/// Takes the first non-empty line and strips an `Emotion:` prefix, brackets,
/// markdown emphasis and quotes. Returns `None` when nothing is left.
pub fn parse_emotion(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line.trim_matches(|c: char| c == '*' || c == '"' || c == '\'' || c.is_whitespace());
    let line = match line.find(':') {
        Some(idx) if line[..idx].trim().trim_matches('*').eq_ignore_ascii_case("emotion") => {
            &line[idx + 1..]
        }
        _ => line,
    };
    let label = line
        .trim()
        .trim_matches(|c: char| matches!(c, '[' | ']' | '*' | '"' | '\'' | '.') || c.is_whitespace());
    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}

/// Accumulator for one document's tagging pass.
#[derive(Debug, Default)]
pub struct EmotionFold {
    previous: Option<String>,
    tagged: Vec<SentenceEmotion>,
}

impl EmotionFold {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emotion carried into the next prompt.
    pub fn previous(&self) -> Option<&str> {
        self.previous.as_deref()
    }

    pub fn prompt_for(&self, sentence: &str) -> String {
        emotion_prompt(sentence, self.previous())
    }

    /// Record the model's answer for `sentence` and advance the context.
    pub fn absorb(&mut self, sentence: String, raw_answer: &str) -> &SentenceEmotion {
        let emotion = parse_emotion(raw_answer)
            .or_else(|| self.previous.clone())
            .unwrap_or_else(|| DEFAULT_EMOTION.to_string());
        self.previous = Some(emotion.clone());
        let index = self.tagged.len();
        self.tagged.push(SentenceEmotion { sentence, emotion });
        &self.tagged[index]
    }

    pub fn finish(self, full_text: impl Into<String>) -> TextAnalysis {
        TextAnalysis {
            full_text: full_text.into(),
            sentences: self.tagged,
        }
    }
}

/// Drives an [`EmotionFold`] against a text generator.
pub struct EmotionAnalyzer {
    generator: Arc<dyn TextGenerator>,
    policy: UpstreamCallPolicy,
}

impl EmotionAnalyzer {
    pub fn new(generator: Arc<dyn TextGenerator>, policy: UpstreamCallPolicy) -> Self {
        Self { generator, policy }
    }

    /// Split `text` and tag every sentence, in order.
    pub async fn analyze(&self, scope: &str, text: &str) -> Result<TextAnalysis, PerceptorError> {
        let mut fold = EmotionFold::new();

        for (index, sentence) in split_sentences(text).into_iter().enumerate() {
            let request = GenerationRequest::new(fold.prompt_for(&sentence)).with_max_tokens(16);
            let response = call_with_retry(self.generator.name(), &self.policy, || {
                self.generator.complete(&request)
            })
            .await?;
            debug!(index, raw = %response.content, "Emotion response");

            let tagged = fold.absorb(sentence, &response.content);
            EventLogger::log_event(
                scope,
                PipelineEvent::SentenceTagged {
                    index,
                    sentence: tagged.sentence.clone(),
                    emotion: tagged.emotion.clone(),
                },
            );
        }

        Ok(fold.finish(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedGenerator;
    use perceptor_core::RetryPolicy;

    fn policy() -> UpstreamCallPolicy {
        UpstreamCallPolicy {
            retry: RetryPolicy::none(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_emotion_variants() {
        assert_eq!(parse_emotion("[Excited]").as_deref(), Some("Excited"));
        assert_eq!(parse_emotion("Emotion: Sad").as_deref(), Some("Sad"));
        assert_eq!(parse_emotion("**Emotion:** [Hopeful]\nbecause...").as_deref(), Some("Hopeful"));
        assert_eq!(parse_emotion("\n\n  \"Calm\"  ").as_deref(), Some("Calm"));
        assert_eq!(parse_emotion("   \n  "), None);
        assert_eq!(parse_emotion("[]"), None);
    }

    #[test]
    fn test_fold_falls_back_to_previous_then_neutral() {
        let mut fold = EmotionFold::new();
        assert_eq!(fold.absorb("a".into(), "").emotion, "Neutral");
        assert_eq!(fold.absorb("b".into(), "[Angry]").emotion, "Angry");
        assert_eq!(fold.absorb("c".into(), "  ").emotion, "Angry");
        let analysis = fold.finish("a b c");
        assert_eq!(analysis.sentences.len(), 3);
        assert_eq!(analysis.full_text, "a b c");
    }

    #[test]
    fn test_prompt_carries_previous_emotion() {
        let mut fold = EmotionFold::new();
        assert!(fold.prompt_for("x").contains("*Previous Emotion:* None"));
        fold.absorb("x".into(), "Sad");
        let prompt = fold.prompt_for("y");
        assert!(prompt.contains("*Previous Emotion:* Sad"));
        assert!(prompt.contains("*Sentence:* \"y\""));
    }

    #[tokio::test]
    async fn test_analyze_tags_each_sentence_in_order() {
        let generator = Arc::new(ScriptedGenerator::new("").with_responses(["[Excited]", "[Sad]"]));
        let analyzer = EmotionAnalyzer::new(generator.clone(), policy());

        let text = "She won the championship! He left without saying goodbye.";
        let analysis = analyzer.analyze("test", text).await.unwrap();

        assert_eq!(analysis.full_text, text);
        assert_eq!(
            analysis.sentences,
            vec![
                SentenceEmotion {
                    sentence: "She won the championship!".into(),
                    emotion: "Excited".into()
                },
                SentenceEmotion {
                    sentence: "He left without saying goodbye.".into(),
                    emotion: "Sad".into()
                },
            ]
        );
        let prompts = generator.prompts();
        assert!(prompts[1].contains("*Previous Emotion:* Excited"));
    }

    #[tokio::test]
    async fn test_analyze_empty_text_makes_no_calls() {
        let generator = Arc::new(ScriptedGenerator::new("Joy"));
        let analyzer = EmotionAnalyzer::new(generator.clone(), policy());
        let analysis = analyzer.analyze("test", "   ").await.unwrap();
        assert!(analysis.sentences.is_empty());
        assert!(generator.prompts().is_empty());
    }
}

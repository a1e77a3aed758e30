//! Sentence segmentation for OCR output.
//!
//! A sentence ends at a run of `.`, `!`, `?` or `…` (plus any closing quotes
//! or brackets) followed by whitespace and a token that can start a sentence.
//! A lone period after a known abbreviation or a name initial does not end a
//! sentence; periods inside numbers never do.

const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "inc", "ltd",
    "co", "corp", "fig", "approx", "dept", "mt", "est", "jan", "feb", "mar", "apr", "jun", "jul",
    "aug", "sep", "sept", "oct", "nov", "dec", "u.s", "u.k", "a.m", "p.m",
];

/// Abbreviations only when a number follows (`No. 5`, `pp. 12`).
const NUMBER_ABBREVIATIONS: &[&str] = &["no", "nos", "vol", "pp", "ch"];

/// Words that start a new sentence after a capital letter (`Plan A. Then`).
const SENTENCE_STARTERS: &[&str] = &[
    "a", "after", "an", "and", "as", "at", "before", "but", "he", "her", "his", "how", "i", "if",
    "in", "it", "its", "my", "now", "on", "our", "she", "so", "that", "the", "their", "then",
    "there", "these", "they", "this", "those", "we", "what", "when", "why", "you",
];

const TERMINATORS: &[char] = &['.', '!', '?', '…'];
const CLOSERS: &[char] = &['"', '\'', '”', '’', ')', ']', '}'];

/// Split `text` into trimmed, non-empty sentences in source order.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        if !TERMINATORS.contains(&chars[i].1) {
            i += 1;
            continue;
        }

        let run_start = i;
        while i < chars.len() && TERMINATORS.contains(&chars[i].1) {
            i += 1;
        }
        let lone_period = i - run_start == 1 && chars[run_start].1 == '.';
        while i < chars.len() && CLOSERS.contains(&chars[i].1) {
            i += 1;
        }

        let end = chars.get(i).map(|(idx, _)| *idx).unwrap_or(text.len());
        let boundary = match chars.get(i) {
            None => true,
            Some((_, c)) if !c.is_whitespace() => false,
            Some(_) => {
                let next = chars[i..].iter().map(|(_, c)| *c).find(|c| !c.is_whitespace());
                let starts_sentence = next.is_none_or(|c| !c.is_lowercase());
                let abbreviated = lone_period
                    && is_abbreviation(&text[start..chars[run_start].0], &text[end..]);
                starts_sentence && !abbreviated
            }
        };

        if boundary {
            push_trimmed(&mut sentences, &text[start..end]);
            start = end;
        }
    }

    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
}

fn strip_openers(token: &str) -> &str {
    token.trim_start_matches(['(', '[', '"', '\'', '“', '‘'])
}

fn is_initial(token: &str) -> bool {
    let mut letters = token.chars();
    matches!((letters.next(), letters.next()), (Some(c), None) if c.is_uppercase())
}

fn is_dotted_initial(token: &str) -> bool {
    token.strip_suffix('.').is_some_and(is_initial)
}

fn is_capitalized(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_uppercase)
}

/// Whether the period closing `before` belongs to an abbreviation or an
/// initial, given the text `after` it.
fn is_abbreviation(before: &str, after: &str) -> bool {
    let mut previous = before.split_whitespace().rev().map(strip_openers);
    let token = previous.next().unwrap_or("");
    if token.is_empty() {
        return false;
    }
    let next = after.split_whitespace().next().map(strip_openers).unwrap_or("");

    if is_initial(token) {
        let prior = previous.next().unwrap_or("");
        if is_dotted_initial(prior) || is_dotted_initial(next) {
            return true;
        }
        let next_lower = next.trim_end_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
        if SENTENCE_STARTERS.contains(&next_lower.as_str()) {
            return false;
        }
        return is_capitalized(prior) && is_capitalized(next);
    }

    let lower = token.to_lowercase();
    if NUMBER_ABBREVIATIONS.contains(&lower.as_str()) {
        return next.trim_start_matches('#').starts_with(|c: char| c.is_ascii_digit());
    }
    ABBREVIATIONS.contains(&lower.as_str())
}

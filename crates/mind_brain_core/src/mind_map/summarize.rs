//! Short labels for long conversation turns.
//!
//! The heuristics target Chinese text: a sentence is reduced to the phrase
//! that follows a question, emotion or action marker, else to a core noun,
//! else to its first clause.

use std::sync::OnceLock;

use regex::Regex;

const DEFAULT_LABEL: &str = "思考";
pub const MAX_LABEL_CHARS: usize = 8;

const QUESTION_MARKERS: &[&str] = &["如何", "為什麼", "为什么", "怎麼", "怎么", "需要", "想要", "希望", "是否"];
const EMOTION_MARKERS: &[&str] = &["感到", "覺得", "擔心", "焦慮", "害怕", "開心", "難過", "壓力", "煩惱"];
const ACTION_MARKERS: &[&str] = &["開始", "計畫", "計劃", "準備", "嘗試", "決定", "學習", "改變"];

const FILLER: &str = "我覺得|我想|我希望|我認為|可能|也許|或許|應該";

fn is_boundary(c: char) -> bool {
    matches!(
        c,
        '？' | '！' | '。' | '，' | '；' | '：' | '、' | '?' | '!' | '.' | ',' | ';' | ':' | '\n' | '\r'
    )
}

fn is_noise(c: char) -> bool {
    is_boundary(c) || matches!(c, '「' | '」' | '『' | '』' | '（' | '）' | '(' | ')' | '"' | '\'')
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_LABEL_CHARS).collect()
}

/// The phrase starting at the earliest marker of `markers`, cut at the next
/// clause boundary.
fn phrase_after_marker(text: &str, markers: &[&str]) -> Option<String> {
    let start = markers.iter().filter_map(|m| text.find(m)).min()?;
    let phrase: String = text[start..].chars().take_while(|c| !is_boundary(*c)).collect();
    let phrase = truncate(phrase.trim());
    (phrase.chars().count() >= 2).then_some(phrase)
}

struct Patterns {
    filler: Regex,
    core: Vec<Regex>,
}

fn patterns() -> Option<&'static Patterns> {
    static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(Patterns {
                filler: Regex::new(FILLER).ok()?,
                core: vec![
                    Regex::new("(學習|工作|目標|計畫|問題|想法|感受|經驗|挑戰|機會|成長|改變|決定|選擇)").ok()?,
                    Regex::new("([A-Za-z]+)").ok()?,
                    Regex::new("([\u{4e00}-\u{9fa5}]{2,4})").ok()?,
                ],
            })
        })
        .as_ref()
}

fn core_keyword(cleaned: &str) -> Option<String> {
    patterns()?.core.iter().find_map(|pattern| {
        let found = pattern.captures(cleaned)?.get(1)?.as_str();
        let len = found.chars().count();
        (2..=MAX_LABEL_CHARS).contains(&len).then(|| found.to_string())
    })
}

/// Reduces `text` to a label of at most eight characters.
pub fn extract_label(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return DEFAULT_LABEL.to_string();
    }

    for markers in [QUESTION_MARKERS, EMOTION_MARKERS, ACTION_MARKERS] {
        if let Some(phrase) = phrase_after_marker(text, markers) {
            return phrase;
        }
    }

    let stripped: String = text.chars().filter(|c| !is_noise(*c)).collect();
    let cleaned = match patterns() {
        Some(p) => p.filler.replace_all(&stripped, "").trim().to_string(),
        None => stripped.trim().to_string(),
    };
    if cleaned.chars().count() <= 6 {
        return if cleaned.is_empty() { DEFAULT_LABEL.to_string() } else { cleaned };
    }

    if let Some(keyword) = core_keyword(&cleaned) {
        return keyword;
    }

    let first_clause: String = text.chars().take_while(|c| !is_boundary(*c)).collect();
    let label = truncate(first_clause.trim());
    if label.is_empty() {
        truncate(&cleaned)
    } else {
        label
    }
}

//! Journal content statistics and the text report for a self-analysis.
//!
//! Both are pure functions over already loaded entries; storage lives in
//! [`crate::db::Database`].

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AnalysisEntry, JournalEntry};

const WORDS_PER_MINUTE: usize = 200;

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "happy", "joy", "love", "wonderful", "amazing", "excellent", "positive",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "sad", "angry", "hate", "terrible", "awful", "negative", "difficult", "hard",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentStats {
    pub word_count: usize,
    pub sentence_count: usize,
    pub paragraph_count: usize,
    /// Words per sentence; a text without sentence text counts as one sentence.
    pub avg_sentence_length: f64,
    /// At 200 words per minute, rounded up.
    pub reading_time_minutes: usize,
    pub sentiment: Sentiment,
    pub positive_words: usize,
    pub negative_words: usize,
}

/// Count words, sentences and paragraphs and score the tone of `content`.
///
/// Sentences end at `.`, `!` or `?`. Paragraphs are separated by blank
/// lines. Tone comes from a small fixed word list, matched on the lowercase
/// ASCII letters of each word.
pub fn analyze_content(content: &str) -> ContentStats {
    let words: Vec<&str> = content.split_whitespace().collect();
    let sentence_count = content
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();

    let mut positive_words = 0;
    let mut negative_words = 0;
    for word in &words {
        let clean: String = word
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_lowercase())
            .collect();
        if POSITIVE_WORDS.contains(&clean.as_str()) {
            positive_words += 1;
        }
        if NEGATIVE_WORDS.contains(&clean.as_str()) {
            negative_words += 1;
        }
    }

    let sentiment = if positive_words > negative_words {
        Sentiment::Positive
    } else if negative_words > positive_words {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    };

    ContentStats {
        word_count: words.len(),
        sentence_count,
        paragraph_count: count_paragraphs(content),
        avg_sentence_length: words.len() as f64 / sentence_count.max(1) as f64,
        reading_time_minutes: words.len().div_ceil(WORDS_PER_MINUTE),
        sentiment,
        positive_words,
        negative_words,
    }
}

fn count_paragraphs(content: &str) -> usize {
    let mut count = 0;
    let mut in_paragraph = false;
    for line in content.lines() {
        let blank = line.trim().is_empty();
        if !blank && !in_paragraph {
            count += 1;
        }
        in_paragraph = !blank;
    }
    count
}

// ============================================================
// Report
// ============================================================

pub const REPORT_HEADER: &str = "=== CRITICAL SELF-ANALYSIS ===";

const RULE_WIDTH: usize = 50;

/// Answer keys of the six-step form, grouped by report section.
const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    ("FACTS", &[("facts", "")]),
    ("SELF-JUDGMENT", &[("judgment", "")]),
    (
        "DECONSTRUCTION",
        &[
            ("intent", "Intent"),
            ("action", "Action"),
            ("outcome", "Outcome"),
            ("gap", "The Gap"),
        ],
    ),
    (
        "REFRAME",
        &[
            ("global_label", "Global Label"),
            ("skill_deficit", "Specific Skill Deficit"),
        ],
    ),
    ("PRACTICAL PLAN", &[("plan", "")]),
    ("CONCLUSION", &[("conclusion", "")]),
];

/// Render a saved analysis as plain text.
///
/// Sections whose answers are all blank are left out. Answers under keys the
/// six-step form does not know are listed last under NOTES.
pub fn format_report(analysis: &AnalysisEntry, entry: Option<&JournalEntry>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}\n", REPORT_HEADER);
    let _ = writeln!(out, "Title: {}", analysis.title);
    if let Some(entry) = entry {
        let _ = writeln!(out, "Original Entry: {}", display_date(entry.created_at));
    }
    let _ = writeln!(out, "Analysis Date: {}\n", display_date(analysis.created_at));

    let answer = |key: &str| {
        analysis
            .answers
            .get(key)
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
    };

    for (number, (title, fields)) in SECTIONS.iter().enumerate() {
        if fields.iter().all(|(key, _)| answer(key).is_none()) {
            continue;
        }
        push_heading(&mut out, &format!("{}. {}", number + 1, title));
        for (key, label) in fields.iter() {
            let text = answer(key).unwrap_or_default();
            if label.is_empty() {
                let _ = writeln!(out, "{}\n", text);
            } else {
                let _ = writeln!(out, "{}: {}\n", label, text);
            }
        }
    }

    let known = |key: &str| SECTIONS.iter().any(|(_, fields)| fields.iter().any(|(k, _)| *k == key));
    let extra: Vec<(&String, &str)> = analysis
        .answers
        .iter()
        .filter(|(key, _)| !known(key))
        .filter_map(|(key, _)| answer(key).map(|text| (key, text)))
        .collect();
    if !extra.is_empty() {
        push_heading(&mut out, &format!("{}. NOTES", SECTIONS.len() + 1));
        for (key, text) in extra {
            let _ = writeln!(out, "{}: {}\n", key, text);
        }
    }

    out.truncate(out.trim_end().len());
    out.push('\n');
    out
}

fn push_heading(out: &mut String, heading: &str) {
    let _ = writeln!(out, "{}\n{}", heading, "=".repeat(RULE_WIDTH));
}

fn display_date(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    #[test]
    fn empty_content_has_zero_counts() {
        let stats = analyze_content("   \n\n ");
        assert_eq!(stats.word_count, 0);
        assert_eq!(stats.sentence_count, 0);
        assert_eq!(stats.paragraph_count, 0);
        assert_eq!(stats.avg_sentence_length, 0.0);
        assert_eq!(stats.reading_time_minutes, 0);
        assert_eq!(stats.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn counts_sentences_and_paragraphs() {
        let text = "I woke early. Ran five miles!\n\n  \nWas it worth it?? Yes";
        let stats = analyze_content(text);
        assert_eq!(stats.word_count, 11);
        assert_eq!(stats.sentence_count, 4);
        assert_eq!(stats.paragraph_count, 2);
        assert_eq!(stats.avg_sentence_length, 11.0 / 4.0);
        assert_eq!(stats.reading_time_minutes, 1);
    }

    #[test]
    fn text_without_terminator_is_one_sentence() {
        let stats = analyze_content("just some words");
        assert_eq!(stats.sentence_count, 1);
        assert_eq!(stats.avg_sentence_length, 3.0);
    }

    #[test]
    fn reading_time_rounds_up() {
        let text = vec!["word"; 201].join(" ");
        assert_eq!(analyze_content(&text).reading_time_minutes, 2);
        let text = vec!["word"; 200].join(" ");
        assert_eq!(analyze_content(&text).reading_time_minutes, 1);
    }

    #[test]
    fn scores_sentiment_ignoring_case_and_punctuation() {
        let stats = analyze_content("What a GREAT day, full of joy! A bit hard though.");
        assert_eq!(stats.positive_words, 2);
        assert_eq!(stats.negative_words, 1);
        assert_eq!(stats.sentiment, Sentiment::Positive);

        let stats = analyze_content("Sad and angry. Happy?");
        assert_eq!(stats.sentiment, Sentiment::Negative);

        let stats = analyze_content("good bad");
        assert_eq!(stats.sentiment, Sentiment::Neutral);
    }

    fn analysis(answers: &[(&str, &str)]) -> AnalysisEntry {
        AnalysisEntry {
            id: "a1".to_string(),
            title: "Missed deadline".to_string(),
            entry_id: Some("1".to_string()),
            answers: answers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 2, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn report_lists_filled_sections_in_order() {
        let entry = JournalEntry {
            id: "1".to_string(),
            entry_type: "personal".to_string(),
            content: "Shipped late".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap(),
        };
        let report = format_report(
            &analysis(&[
                ("plan", "Estimate with buffer"),
                ("facts", "Report was two days late"),
                ("gap", "Underestimated review time"),
            ]),
            Some(&entry),
        );

        let rule = "=".repeat(50);
        let expected = format!(
            "=== CRITICAL SELF-ANALYSIS ===\n\n\
             Title: Missed deadline\n\
             Original Entry: 2024-03-01 20:00 UTC\n\
             Analysis Date: 2024-03-02 09:30 UTC\n\n\
             1. FACTS\n{rule}\nReport was two days late\n\n\
             3. DECONSTRUCTION\n{rule}\nIntent: \n\nAction: \n\nOutcome: \n\nThe Gap: Underestimated review time\n\n\
             5. PRACTICAL PLAN\n{rule}\nEstimate with buffer\n",
            rule = rule
        );
        assert_eq!(report, expected);
    }

    #[test]
    fn report_skips_blank_answers_and_keeps_unknown_keys() {
        let report = format_report(
            &analysis(&[("judgment", "   "), ("What drains you?", "Meetings")]),
            None,
        );
        assert!(!report.contains("SELF-JUDGMENT"));
        assert!(!report.contains("Original Entry"));
        assert!(report.contains("7. NOTES\n"));
        assert!(report.ends_with("What drains you?: Meetings\n"));
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::text;

// Determines which review renderer applies to a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    Vocab,
    Sentence,
}

impl CardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardKind::Vocab => "vocab",
            CardKind::Sentence => "sentence",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "vocab" | "v" | "word" => Some(CardKind::Vocab),
            "sentence" | "s" => Some(CardKind::Sentence),
            _ => None,
        }
    }

    /// Guess the kind from the target text: contiguous-script text with
    /// sentence punctuation, or spaced text with more than three words.
    pub fn detect(target: &str) -> Self {
        let is_sentence = if text::is_contiguous_script(target) {
            target
                .chars()
                .any(|c| matches!(c, '。' | '？' | '！' | '，' | ',' | '?' | '!'))
        } else {
            target.split_whitespace().count() > 3
        };

        if is_sentence {
            CardKind::Sentence
        } else {
            CardKind::Vocab
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    New,
    Active,
    Leech,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::New => "new",
            CardStatus::Active => "active",
            CardStatus::Leech => "leech",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "new" => Some(CardStatus::New),
            "active" => Some(CardStatus::Active),
            "leech" => Some(CardStatus::Leech),
            _ => None,
        }
    }
}

// Reviewer's rating after seeing the answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    Again = 0,
    Hard = 1,
    Good = 2,
    Easy = 3,
}

impl Grade {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Grade::Again),
            1 => Some(Grade::Hard),
            2 => Some(Grade::Good),
            3 => Some(Grade::Easy),
            _ => None,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "again" | "fail" | "a" | "0" => Some(Grade::Again),
            "hard" | "h" | "1" => Some(Grade::Hard),
            "good" | "g" | "2" => Some(Grade::Good),
            "easy" | "e" | "3" => Some(Grade::Easy),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        *self != Grade::Again
    }

    pub fn label(&self) -> &'static str {
        match self {
            Grade::Again => "Again",
            Grade::Hard => "Hard",
            Grade::Good => "Good",
            Grade::Easy => "Easy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    pub target_text: String,
    pub native_text: String,
    pub meta_info: Option<String>,
    pub tag: Option<String>,
    pub kind: CardKind,
    pub status: CardStatus,
    pub in_study_queue: bool,
    pub is_mastered: bool,
    pub interval_days: u32,
    pub ease_factor: f64,
    pub due_date: Option<NaiveDate>,
    pub lapse_count: u32,
    pub consecutive_correct: u32,
    pub locked_cloze_index: Option<usize>,
    pub created_at: String,
}

impl Card {
    /// In the study queue and either due by `today` or activated without
    /// ever being scheduled.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        if !self.in_study_queue {
            return false;
        }
        match self.due_date {
            Some(due) => due <= today,
            None => self.status != CardStatus::New,
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_mastered {
            return "Mastered";
        }
        match self.status {
            CardStatus::New => "New",
            CardStatus::Active => "Active",
            CardStatus::Leech => "Leech",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCard {
    pub target_text: String,
    pub native_text: String,
    pub meta_info: Option<String>,
    pub tag: Option<String>,
    pub kind: CardKind,
    pub in_study_queue: bool,
}

/// Field changes for an existing card. `None` leaves a field as it is; an
/// empty string clears `meta_info` or `tag`.
#[derive(Debug, Clone, Default)]
pub struct CardEdit {
    pub target_text: Option<String>,
    pub native_text: Option<String>,
    pub meta_info: Option<String>,
    pub tag: Option<String>,
    pub kind: Option<CardKind>,
}

impl CardEdit {
    pub fn is_empty(&self) -> bool {
        self.target_text.is_none()
            && self.native_text.is_none()
            && self.meta_info.is_none()
            && self.tag.is_none()
            && self.kind.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub position: u32,
    pub card_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub created_at: String,
    pub segments: Vec<Segment>,
}

impl Collection {
    pub fn card_ids(&self) -> Vec<i64> {
        self.segments.iter().filter_map(|s| s.card_id).collect()
    }
}

/// One persisted grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub card_id: i64,
    pub grade: Grade,
    pub reviewed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub card_count: i64,
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod card_kind_tests {
        use super::*;

        #[test]
        fn parses_aliases() {
            assert_eq!(CardKind::from_str("VOCAB"), Some(CardKind::Vocab));
            assert_eq!(CardKind::from_str("s"), Some(CardKind::Sentence));
            assert_eq!(CardKind::from_str("phrase"), None);
        }

        #[test]
        fn detect_short_spaced_text_is_vocab() {
            assert_eq!(CardKind::detect("der Hund"), CardKind::Vocab);
        }

        #[test]
        fn detect_long_spaced_text_is_sentence() {
            assert_eq!(
                CardKind::detect("ich habe einen Hund gesehen"),
                CardKind::Sentence
            );
        }

        #[test]
        fn detect_cjk_with_punctuation_is_sentence() {
            assert_eq!(CardKind::detect("我很好。"), CardKind::Sentence);
            assert_eq!(CardKind::detect("你好"), CardKind::Vocab);
        }
    }

    mod grade_tests {
        use super::*;

        #[test]
        fn from_i32_covers_range() {
            assert_eq!(Grade::from_i32(0), Some(Grade::Again));
            assert_eq!(Grade::from_i32(3), Some(Grade::Easy));
            assert_eq!(Grade::from_i32(4), None);
            assert_eq!(Grade::from_i32(-1), None);
        }

        #[test]
        fn from_str_accepts_names_and_digits() {
            assert_eq!(Grade::from_str("good"), Some(Grade::Good));
            assert_eq!(Grade::from_str("1"), Some(Grade::Hard));
            assert_eq!(Grade::from_str("FAIL"), Some(Grade::Again));
            assert_eq!(Grade::from_str("meh"), None);
        }

        #[test]
        fn only_again_is_failure() {
            assert!(!Grade::Again.is_success());
            assert!(Grade::Hard.is_success());
            assert!(Grade::Easy.is_success());
        }
    }

    mod status_tests {
        use super::*;

        #[test]
        fn round_trips_through_str() {
            for status in [CardStatus::New, CardStatus::Active, CardStatus::Leech] {
                assert_eq!(CardStatus::from_str(status.as_str()), Some(status));
            }
        }
    }

    mod due_tests {
        use super::*;

        fn card(status: CardStatus, due: Option<NaiveDate>) -> Card {
            Card {
                id: 1,
                target_text: "Hund".into(),
                native_text: "dog".into(),
                meta_info: None,
                tag: None,
                kind: CardKind::Vocab,
                status,
                in_study_queue: true,
                is_mastered: false,
                interval_days: 0,
                ease_factor: 2.5,
                due_date: due,
                lapse_count: 0,
                consecutive_correct: 0,
                locked_cloze_index: None,
                created_at: String::new(),
            }
        }

        fn day(d: u32) -> NaiveDate {
            NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
        }

        #[test]
        fn due_on_or_before_today() {
            assert!(card(CardStatus::Active, Some(day(9))).is_due(day(10)));
            assert!(card(CardStatus::Active, Some(day(10))).is_due(day(10)));
            assert!(!card(CardStatus::Active, Some(day(11))).is_due(day(10)));
        }

        #[test]
        fn unscheduled_new_card_is_not_due() {
            assert!(!card(CardStatus::New, None).is_due(day(10)));
        }

        #[test]
        fn activated_but_unscheduled_card_is_due() {
            assert!(card(CardStatus::Active, None).is_due(day(10)));
        }

        #[test]
        fn story_only_card_is_never_due() {
            let mut c = card(CardStatus::Leech, Some(day(1)));
            c.in_study_queue = false;
            assert!(!c.is_due(day(10)));
        }
    }

    mod collection_tests {
        use super::*;

        #[test]
        fn card_ids_skip_unpromoted_segments() {
            let collection = Collection {
                id: 1,
                name: "Chapter 1".into(),
                created_at: String::new(),
                segments: vec![
                    Segment { position: 1, card_id: Some(4) },
                    Segment { position: 2, card_id: None },
                    Segment { position: 3, card_id: Some(9) },
                ],
            };
            assert_eq!(collection.card_ids(), vec![4, 9]);
        }
    }

    mod json_output_tests {
        use super::*;

        #[test]
        fn ok_with_data() {
            let output = JsonOutput::ok("test data");
            assert!(output.success);
            assert_eq!(output.data, Some("test data"));
            assert!(output.error.is_none());
        }

        #[test]
        fn err_with_message() {
            let output = JsonOutput::<()>::err("Card not found");
            assert!(!output.success);
            assert!(output.data.is_none());
            assert_eq!(output.error, Some("Card not found".to_string()));
        }
    }
}

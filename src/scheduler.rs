//! Spaced repetition scheduling.
//!
//! Two interval models are available and exactly one is used per run, chosen
//! by `scheduling.model` in the config:
//!
//! - Multiplier (default): interval grows by a fixed factor per grade
//!   (Hard 1.2, Good 2.5, Easy 4.0) starting from `max(1, previous)`.
//! - Ease factor: SM-2 style. Grades map to quality 1/3/4/5, the ease factor
//!   is adjusted on every grade and floored at 1.3, and the interval follows
//!   1 day, 6 days, then `previous * ease`.
//!
//! Both share the failure branch (interval 0, due today, one more lapse) and
//! the mastery track (five consecutive successes).

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::config::SchedulingModel;
use crate::models::{Card, CardKind, CardStatus, Grade};

pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
pub const LEECH_THRESHOLD: u32 = 5;
pub const MASTERY_STREAK: u32 = 5;
/// Longest interval either model will schedule, about a century.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// New review state for a card after one grade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewUpdate {
    pub interval_days: u32,
    pub ease_factor: f64,
    pub due_date: NaiveDate,
    pub lapse_count: u32,
    pub status: CardStatus,
    pub locked_cloze_index: Option<usize>,
    pub consecutive_correct: u32,
    pub is_mastered: bool,
}

impl ReviewUpdate {
    pub fn apply_to(&self, card: &mut Card) {
        card.interval_days = self.interval_days;
        card.ease_factor = self.ease_factor;
        card.due_date = Some(self.due_date);
        card.lapse_count = self.lapse_count;
        card.status = self.status;
        card.locked_cloze_index = self.locked_cloze_index;
        card.consecutive_correct = self.consecutive_correct;
        card.is_mastered = self.is_mastered;
    }
}

fn multiplier(grade: Grade) -> f64 {
    match grade {
        Grade::Again => 0.0,
        Grade::Hard => 1.2,
        Grade::Good => 2.5,
        Grade::Easy => 4.0,
    }
}

fn quality(grade: Grade) -> i32 {
    match grade {
        Grade::Again => 1,
        Grade::Hard => 3,
        Grade::Good => 4,
        Grade::Easy => 5,
    }
}

/// `EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02))`, floored at 1.3
pub fn adjust_ease(ease: f64, grade: Grade) -> f64 {
    let miss = (5 - quality(grade)) as f64;
    (ease + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EASE_FACTOR)
}

fn multiplier_interval(previous: u32, grade: Grade) -> u32 {
    let base = previous.clamp(1, MAX_INTERVAL_DAYS) as f64;
    ((base * multiplier(grade)).ceil() as u32).min(MAX_INTERVAL_DAYS)
}

fn ease_interval(previous: u32, repetitions: u32, ease: f64) -> u32 {
    match repetitions {
        0 => 1,
        1 => 6,
        _ => ((previous.min(MAX_INTERVAL_DAYS) as f64 * ease).round() as u32)
            .clamp(1, MAX_INTERVAL_DAYS),
    }
}

/// Compute the next review state for `card` graded `grade` on `today`.
///
/// `cloze_index` is the token blanked in this attempt; on failure of a
/// sentence card it becomes the locked index so the same blank is asked again.
pub fn next_review_state(
    card: &Card,
    grade: Grade,
    cloze_index: Option<usize>,
    today: NaiveDate,
    model: SchedulingModel,
) -> ReviewUpdate {
    let ease_factor = match model {
        SchedulingModel::Multiplier => card.ease_factor,
        SchedulingModel::EaseFactor => adjust_ease(card.ease_factor, grade),
    };

    let (interval_days, lapse_count, locked_cloze_index, consecutive_correct) =
        if grade.is_success() {
            let interval = match model {
                SchedulingModel::Multiplier => multiplier_interval(card.interval_days, grade),
                SchedulingModel::EaseFactor => {
                    ease_interval(card.interval_days, card.consecutive_correct, ease_factor)
                }
            };
            (interval, card.lapse_count, None, card.consecutive_correct + 1)
        } else {
            let locked = match card.kind {
                CardKind::Sentence => cloze_index,
                CardKind::Vocab => None,
            };
            (0, card.lapse_count + 1, locked, 0)
        };

    let status = if lapse_count >= LEECH_THRESHOLD {
        CardStatus::Leech
    } else {
        CardStatus::Active
    };

    ReviewUpdate {
        interval_days,
        ease_factor,
        due_date: today
            .checked_add_signed(Duration::days(interval_days as i64))
            .unwrap_or(NaiveDate::MAX),
        lapse_count,
        status,
        locked_cloze_index,
        consecutive_correct,
        is_mastered: card.is_mastered || consecutive_correct >= MASTERY_STREAK,
    }
}

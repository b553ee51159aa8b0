//! Arcade: memorise a run of cards as they flash past, then recall them.
//!
//! Each round shows a shuffled working set one card at a time (watch), then
//! asks for the native text of each card in the same order (test). A perfect
//! round pays `round * reward_per_round` sparks and offers another, faster
//! round; anything less ends the game.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;

use crate::config::{AnswerMode, ArcadeSettings};
use crate::error::{AppError, Result};
use crate::models::Card;
use crate::repository::{CardQuery, StudyContext};
use crate::text;
use crate::timer::{TimerSlot, TimerToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcadePhase {
    Watch,
    Test,
    /// Answer disclosed after a miss; waiting for an exact retype
    Sticky,
    RoundComplete,
    GameOver,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    Wrong,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArcadeEvent {
    RoundStarted {
        round: u32,
        speed_ms: u64,
        cards: usize,
    },
    WatchCard {
        index: usize,
        card: Card,
    },
    Prompt {
        index: usize,
        card: Card,
        countdown_ms: Option<u64>,
    },
    Correct {
        card_id: i64,
    },
    Disclosed {
        card_id: i64,
        expected: String,
        reason: MissReason,
    },
    RetypeRejected {
        card_id: i64,
    },
    RoundComplete {
        round: u32,
        score: usize,
        reward: u32,
        balance: u32,
    },
    GameOver {
        round: u32,
        score: usize,
        total: usize,
    },
}

/// Time each card is shown during watch: `max(floor, floor(base * decay^(round-1)))`.
pub fn watch_speed_ms(settings: &ArcadeSettings, round: u32) -> u64 {
    let exponent = round.saturating_sub(1) as i32;
    let raw = settings.watch_base_ms as f64 * settings.watch_decay.powi(exponent);
    (raw.floor() as u64).max(settings.watch_floor_ms)
}

/// Strict-mode answer window: `base * decay^(round-1)`, no floor.
pub fn countdown_ms(settings: &ArcadeSettings, round: u32) -> u64 {
    let exponent = round.saturating_sub(1) as i32;
    (settings.countdown_base_ms as f64 * settings.countdown_decay.powi(exponent)).round() as u64
}

#[derive(Debug)]
pub struct ArcadeGame {
    settings: ArcadeSettings,
    pool: Vec<Card>,
    working_set: Vec<Card>,
    round: u32,
    index: usize,
    score: usize,
    earned: u32,
    phase: ArcadePhase,
    timer: TimerSlot,
}

impl ArcadeGame {
    /// Load the eligible pool and begin round one.
    pub fn start(ctx: &mut StudyContext<'_>) -> Result<(Self, Vec<ArcadeEvent>)> {
        let settings = ctx.settings.arcade.clone();
        let pool = ctx
            .repo
            .query_cards(&CardQuery::study_queue(ctx.settings.scheduling.leech_policy))?;

        let needed = settings.min_cards.max(1);
        if pool.len() < needed {
            return Err(AppError::NotEnoughCards {
                needed,
                found: pool.len(),
            });
        }

        let mut game = Self {
            settings,
            pool,
            working_set: Vec::new(),
            round: 1,
            index: 0,
            score: 0,
            earned: 0,
            phase: ArcadePhase::Watch,
            timer: TimerSlot::new(),
        };
        let events = game.begin_round(ctx);
        Ok((game, events))
    }

    fn begin_round(&mut self, ctx: &mut StudyContext<'_>) -> Vec<ArcadeEvent> {
        let mut set = self.pool.clone();
        set.shuffle(&mut *ctx.rng);
        set.truncate(self.settings.working_set.max(1));
        self.working_set = set;
        self.index = 0;
        self.score = 0;
        self.phase = ArcadePhase::Watch;

        let speed_ms = self.speed_ms();
        self.timer.arm(ctx.now(), speed_ms);
        log::info!(
            "arcade round {} started: {} cards at {}ms",
            self.round,
            self.working_set.len(),
            speed_ms
        );

        vec![
            ArcadeEvent::RoundStarted {
                round: self.round,
                speed_ms,
                cards: self.working_set.len(),
            },
            ArcadeEvent::WatchCard {
                index: 0,
                card: self.working_set[0].clone(),
            },
        ]
    }

    /// Drive timers. Call regularly with the current time.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<ArcadeEvent> {
        match self.timer.expired(now) {
            Some(token) => self.fire(token, now),
            None => Vec::new(),
        }
    }

    /// Fire a specific timer. Tokens from a cancelled or replaced timer are ignored.
    pub fn fire(&mut self, token: TimerToken, now: DateTime<Utc>) -> Vec<ArcadeEvent> {
        if !self.timer.is_current(token) {
            log::debug!("ignoring stale arcade timer {:?}", token);
            return Vec::new();
        }
        self.timer.cancel();
        self.on_timer(now)
    }

    fn on_timer(&mut self, now: DateTime<Utc>) -> Vec<ArcadeEvent> {
        match self.phase {
            ArcadePhase::Watch => {
                if self.index + 1 < self.working_set.len() {
                    self.index += 1;
                    self.timer.arm(now, self.speed_ms());
                    vec![ArcadeEvent::WatchCard {
                        index: self.index,
                        card: self.working_set[self.index].clone(),
                    }]
                } else {
                    log::debug!("arcade round {}: watch done, testing", self.round);
                    self.phase = ArcadePhase::Test;
                    self.index = 0;
                    vec![self.prompt(now)]
                }
            }
            ArcadePhase::Test => {
                let card = &self.working_set[self.index];
                log::debug!("arcade: card {} timed out", card.id);
                let event = ArcadeEvent::Disclosed {
                    card_id: card.id,
                    expected: card.native_text.clone(),
                    reason: MissReason::TimedOut,
                };
                self.phase = ArcadePhase::Sticky;
                vec![event]
            }
            phase => {
                log::warn!("arcade timer fired in {:?}", phase);
                Vec::new()
            }
        }
    }

    fn prompt(&mut self, now: DateTime<Utc>) -> ArcadeEvent {
        let countdown = match self.settings.answer_mode {
            AnswerMode::Strict => {
                let ms = countdown_ms(&self.settings, self.round);
                self.timer.arm(now, ms);
                Some(ms)
            }
            AnswerMode::Fuzzy => None,
        };
        ArcadeEvent::Prompt {
            index: self.index,
            card: self.working_set[self.index].clone(),
            countdown_ms: countdown,
        }
    }

    fn is_accepted(&self, input: &str, expected: &str) -> bool {
        match self.settings.answer_mode {
            AnswerMode::Fuzzy => text::is_close_enough(input, expected),
            AnswerMode::Strict => text::answers_match(input, expected),
        }
    }

    /// Answer the current test card, or retype a disclosed answer.
    pub fn submit(&mut self, ctx: &mut StudyContext<'_>, input: &str) -> Result<Vec<ArcadeEvent>> {
        let card = match self.phase {
            ArcadePhase::Test | ArcadePhase::Sticky => self.working_set[self.index].clone(),
            phase => {
                return Err(AppError::ContractViolation(format!(
                    "arcade input not accepted during {:?}",
                    phase
                )))
            }
        };

        if self.phase == ArcadePhase::Sticky {
            if text::answers_match(input, &card.native_text) {
                return self.advance(ctx);
            }
            return Ok(vec![ArcadeEvent::RetypeRejected { card_id: card.id }]);
        }

        self.timer.cancel();
        if self.is_accepted(input, &card.native_text) {
            self.score += 1;
            let mut events = vec![ArcadeEvent::Correct { card_id: card.id }];
            events.extend(self.advance(ctx)?);
            Ok(events)
        } else {
            self.phase = ArcadePhase::Sticky;
            Ok(vec![ArcadeEvent::Disclosed {
                card_id: card.id,
                expected: card.native_text,
                reason: MissReason::Wrong,
            }])
        }
    }

    /// Count a disclosed fuzzy-mode miss as correct, for answers the matcher
    /// rejected but the player knows were right.
    pub fn override_miss(&mut self, ctx: &mut StudyContext<'_>) -> Result<Vec<ArcadeEvent>> {
        if self.phase != ArcadePhase::Sticky || self.settings.answer_mode != AnswerMode::Fuzzy {
            return Err(AppError::ContractViolation(format!(
                "override not allowed during {:?} in {:?} mode",
                self.phase, self.settings.answer_mode
            )));
        }

        let card_id = self.working_set[self.index].id;
        log::debug!("arcade: miss on card {} overridden", card_id);
        self.timer.cancel();
        self.score += 1;
        let mut events = vec![ArcadeEvent::Correct { card_id }];
        events.extend(self.advance(ctx)?);
        Ok(events)
    }

    fn advance(&mut self, ctx: &mut StudyContext<'_>) -> Result<Vec<ArcadeEvent>> {
        self.index += 1;
        if self.index < self.working_set.len() {
            self.phase = ArcadePhase::Test;
            return Ok(vec![self.prompt(ctx.now())]);
        }
        self.finish_round(ctx)
    }

    fn finish_round(&mut self, ctx: &mut StudyContext<'_>) -> Result<Vec<ArcadeEvent>> {
        self.timer.cancel();
        let total = self.working_set.len();

        if self.score == total {
            let reward = self.round * self.settings.reward_per_round;
            ctx.ledger.add_currency(reward);
            ctx.save_ledger()?;
            self.earned += reward;
            self.phase = ArcadePhase::RoundComplete;
            log::info!("arcade round {} perfect, +{} sparks", self.round, reward);
            Ok(vec![ArcadeEvent::RoundComplete {
                round: self.round,
                score: self.score,
                reward,
                balance: ctx.ledger.balance,
            }])
        } else {
            self.phase = ArcadePhase::GameOver;
            log::info!(
                "arcade game over in round {}: {}/{}",
                self.round,
                self.score,
                total
            );
            Ok(vec![ArcadeEvent::GameOver {
                round: self.round,
                score: self.score,
                total,
            }])
        }
    }

    /// Start the next, faster round after a perfect one.
    pub fn continue_run(&mut self, ctx: &mut StudyContext<'_>) -> Result<Vec<ArcadeEvent>> {
        if self.phase != ArcadePhase::RoundComplete {
            return Err(AppError::ContractViolation(format!(
                "continue requested during {:?}",
                self.phase
            )));
        }
        self.round += 1;
        Ok(self.begin_round(ctx))
    }

    /// Cash out after a perfect round. Rewards are already banked.
    pub fn stop(&mut self) -> Result<ArcadeEvent> {
        if self.phase != ArcadePhase::RoundComplete {
            return Err(AppError::ContractViolation(format!(
                "stop requested during {:?}",
                self.phase
            )));
        }
        self.phase = ArcadePhase::GameOver;
        Ok(ArcadeEvent::GameOver {
            round: self.round,
            score: self.score,
            total: self.working_set.len(),
        })
    }

    /// Quit immediately, dropping the current round. Safe to call repeatedly.
    pub fn abort(&mut self) {
        self.timer.cancel();
        if !self.is_over() {
            log::info!("arcade aborted in round {}", self.round);
            self.phase = ArcadePhase::Aborted;
        }
    }

    pub fn phase(&self) -> ArcadePhase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn earned(&self) -> u32 {
        self.earned
    }

    pub fn speed_ms(&self) -> u64 {
        watch_speed_ms(&self.settings, self.round)
    }

    pub fn working_set(&self) -> &[Card] {
        &self.working_set
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Card being shown (watch) or asked (test, sticky).
    pub fn current_card(&self) -> Option<&Card> {
        match self.phase {
            ArcadePhase::Watch | ArcadePhase::Test | ArcadePhase::Sticky => {
                self.working_set.get(self.index)
            }
            _ => None,
        }
    }

    pub fn remaining_ms(&self, now: DateTime<Utc>) -> Option<u64> {
        self.timer.remaining_ms(now)
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, ArcadePhase::GameOver | ArcadePhase::Aborted)
    }
}

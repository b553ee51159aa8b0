//! One sitting of card review.
//!
//! A session owns an in-memory queue. The head card is presented (front),
//! revealed (back), then graded; a failed card goes back to the tail so it is
//! seen again before the session ends.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::config::LeechPolicy;
use crate::error::{AppError, Result};
use crate::models::{Card, CardKind, CardStatus, Grade};
use crate::repository::{CardQuery, StudyContext};
use crate::scheduler;
use crate::text::ClozePrompt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SessionMode {
    Due,
    New {
        batch_size: usize,
    },
    /// Practice outside the schedule; costs sparks and never writes review state
    Cram {
        tag: Option<String>,
        kind: Option<CardKind>,
        limit: usize,
    },
    Collection {
        id: i64,
    },
}

impl SessionMode {
    pub fn label(&self) -> &'static str {
        match self {
            SessionMode::Due => "Due",
            SessionMode::New { .. } => "New",
            SessionMode::Cram { .. } => "Cram",
            SessionMode::Collection { .. } => "Collection",
        }
    }

    fn is_cram(&self) -> bool {
        matches!(self, SessionMode::Cram { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PresentationMode {
    /// Target text shown, native text asked
    Recognition,
    /// Native text shown, target text asked
    Recall,
    Cloze(ClozePrompt),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Presentation {
    pub card: Card,
    pub mode: PresentationMode,
}

impl Presentation {
    pub fn cloze_index(&self) -> Option<usize> {
        match &self.mode {
            PresentationMode::Cloze(prompt) => Some(prompt.blank_index),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Front,
    Back,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionEvent {
    CardPresented(Presentation),
    AnswerRevealed {
        card_id: i64,
        /// Result of a typed cloze answer; `None` for a plain reveal
        correct: Option<bool>,
    },
    CardGraded {
        card_id: i64,
        grade: Grade,
        requeued: bool,
        level_up: Option<u32>,
    },
    SessionComplete {
        reviewed: usize,
        failed: usize,
    },
}

/// Run the scheduler for one grade and persist the result: card state,
/// history row and ledger. Returns the updated card and any new level.
pub fn apply_grade(
    ctx: &mut StudyContext<'_>,
    card: &Card,
    grade: Grade,
    cloze_index: Option<usize>,
) -> Result<(Card, Option<u32>)> {
    let today = ctx.today();
    let first_exposure = card.due_date.is_none();

    let update = scheduler::next_review_state(
        card,
        grade,
        cloze_index,
        today,
        ctx.settings.scheduling.model,
    );
    let mut updated = card.clone();
    update.apply_to(&mut updated);

    ctx.repo.upsert_card(&updated)?;
    ctx.repo.record_history(updated.id, grade, ctx.now())?;

    let mut level_up = None;
    if grade.is_success() {
        let ledger_settings = &ctx.settings.ledger;
        level_up = if first_exposure {
            ctx.ledger.record_learn(today, ledger_settings.xp_learn)
        } else {
            ctx.ledger.record_review(today, ledger_settings.xp_review)
        };
        ctx.save_ledger()?;
    }

    log::debug!(
        "card {} graded {}: interval {}d, due {}, lapses {}",
        updated.id,
        grade.label(),
        update.interval_days,
        update.due_date,
        update.lapse_count
    );

    Ok((updated, level_up))
}

#[derive(Debug)]
pub struct ReviewSession {
    mode: SessionMode,
    queue: VecDeque<Card>,
    phase: Phase,
    current: Option<Presentation>,
    reviewed: usize,
    failed: usize,
}

impl ReviewSession {
    /// Build the queue for `mode` and present the first card.
    ///
    /// An empty pool is `NothingToStudy` and leaves everything untouched. Cram
    /// checks funds before looking at cards and only charges once it has a
    /// non-empty pool.
    pub fn start(ctx: &mut StudyContext<'_>, mode: SessionMode) -> Result<(Self, SessionEvent)> {
        let cards = Self::load_pool(ctx, &mode)?;
        if cards.is_empty() {
            log::info!("{} session: nothing to study", mode.label());
            return Err(AppError::NothingToStudy);
        }

        if mode.is_cram() {
            ctx.ledger.spend(ctx.settings.cram.cost)?;
            ctx.save_ledger()?;
        }

        if let SessionMode::New { .. } = mode {
            for card in &cards {
                ctx.repo.upsert_card(card)?;
            }
        }

        log::info!("{} session started with {} cards", mode.label(), cards.len());

        let mut session = Self {
            mode,
            queue: cards.into(),
            phase: Phase::Front,
            current: None,
            reviewed: 0,
            failed: 0,
        };
        let event = session.present(ctx)?;
        Ok((session, event))
    }

    fn load_pool(ctx: &mut StudyContext<'_>, mode: &SessionMode) -> Result<Vec<Card>> {
        let today = ctx.today();
        let leech_policy = ctx.settings.scheduling.leech_policy;

        match mode {
            SessionMode::Due => ctx.repo.query_cards(&CardQuery::due(today, leech_policy)),
            SessionMode::New { batch_size } => {
                let mut cards = ctx.repo.query_cards(&CardQuery::new_cards(*batch_size))?;
                for card in &mut cards {
                    card.status = CardStatus::Active;
                }
                Ok(cards)
            }
            SessionMode::Cram { tag, kind, limit } => {
                let cost = ctx.settings.cram.cost;
                if !ctx.ledger.can_afford(cost) {
                    return Err(AppError::InsufficientFunds {
                        needed: cost,
                        available: ctx.ledger.balance,
                    });
                }

                let mut cards = ctx.repo.query_cards(&CardQuery {
                    tag: tag.clone(),
                    kind: *kind,
                    ..CardQuery::default()
                })?;
                cards.shuffle(&mut *ctx.rng);
                cards.truncate(*limit);
                Ok(cards)
            }
            SessionMode::Collection { id } => {
                let ids = ctx
                    .repo
                    .collection_card_ids(*id)?
                    .ok_or(AppError::CollectionNotFound(*id))?;

                let exclude_leech = leech_policy == LeechPolicy::Exclude;
                let mut cards = Vec::new();
                for card_id in ids {
                    if let Some(card) = ctx.repo.get_card(card_id)? {
                        if card.is_due(today) && !(exclude_leech && card.status == CardStatus::Leech)
                        {
                            cards.push(card);
                        }
                    }
                }
                Ok(cards)
            }
        }
    }

    /// Pick how the head card is shown. The head stays in the queue.
    fn present(&mut self, ctx: &mut StudyContext<'_>) -> Result<SessionEvent> {
        let card = self
            .queue
            .front()
            .cloned()
            .ok_or_else(|| AppError::ContractViolation("present on an empty queue".into()))?;

        let mode = match card.kind {
            CardKind::Sentence => {
                match ClozePrompt::choose(&card.target_text, card.locked_cloze_index, &mut *ctx.rng)
                {
                    Some(prompt) => PresentationMode::Cloze(prompt),
                    None => PresentationMode::Recognition,
                }
            }
            CardKind::Vocab => {
                let p = ctx.settings.review.recognition_chance();
                if ctx.rng.gen_bool(p) {
                    PresentationMode::Recognition
                } else {
                    PresentationMode::Recall
                }
            }
        };

        let presentation = Presentation { card, mode };
        self.phase = Phase::Front;
        self.current = Some(presentation.clone());
        Ok(SessionEvent::CardPresented(presentation))
    }

    fn front_card_id(&self) -> Result<i64> {
        if self.phase != Phase::Front {
            return Err(AppError::ContractViolation(format!(
                "answer expected on the front side, session is {:?}",
                self.phase
            )));
        }
        self.current
            .as_ref()
            .map(|p| p.card.id)
            .ok_or_else(|| AppError::ContractViolation("no card presented".into()))
    }

    /// Flip to the back side.
    pub fn reveal(&mut self) -> Result<SessionEvent> {
        let card_id = self.front_card_id()?;
        self.phase = Phase::Back;
        Ok(SessionEvent::AnswerRevealed {
            card_id,
            correct: None,
        })
    }

    /// Check a typed cloze answer and flip to the back side.
    pub fn submit_cloze(&mut self, input: &str) -> Result<SessionEvent> {
        let card_id = self.front_card_id()?;
        let correct = match self.current.as_ref().map(|p| &p.mode) {
            Some(PresentationMode::Cloze(prompt)) => prompt.check(input),
            _ => {
                return Err(AppError::ContractViolation(
                    "typed answer for a card that is not a cloze".into(),
                ))
            }
        };
        self.phase = Phase::Back;
        Ok(SessionEvent::AnswerRevealed {
            card_id,
            correct: Some(correct),
        })
    }

    /// Grade the revealed head card, then present the next one or complete.
    pub fn grade(
        &mut self,
        ctx: &mut StudyContext<'_>,
        card_id: i64,
        grade: Grade,
    ) -> Result<Vec<SessionEvent>> {
        if self.phase != Phase::Back {
            return Err(AppError::ContractViolation(format!(
                "grade before reveal, session is {:?}",
                self.phase
            )));
        }
        let head_id = self.queue.front().map(|c| c.id);
        if head_id != Some(card_id) {
            return Err(AppError::ContractViolation(format!(
                "card {} graded but head of queue is {:?}",
                card_id, head_id
            )));
        }

        let (card, cloze_index) = match (self.queue.front(), self.current.as_ref()) {
            (Some(card), Some(p)) => (card.clone(), p.cloze_index()),
            _ => return Err(AppError::ContractViolation("no card presented".into())),
        };

        let (updated, level_up) = if self.mode.is_cram() {
            let mut practiced = card;
            if practiced.kind == CardKind::Sentence {
                practiced.locked_cloze_index = if grade.is_success() {
                    None
                } else {
                    cloze_index
                };
            }
            (practiced, None)
        } else {
            apply_grade(ctx, &card, grade, cloze_index)?
        };

        // Persistence succeeded; now mutate the queue
        self.queue.pop_front();
        self.reviewed += 1;
        let requeued = !grade.is_success();
        if requeued {
            self.failed += 1;
            self.queue.push_back(updated);
        }

        let mut events = vec![SessionEvent::CardGraded {
            card_id,
            grade,
            requeued,
            level_up,
        }];

        if self.queue.is_empty() {
            self.phase = Phase::Complete;
            self.current = None;
            log::info!(
                "{} session complete: {} reviewed, {} failed",
                self.mode.label(),
                self.reviewed,
                self.failed
            );
            events.push(SessionEvent::SessionComplete {
                reviewed: self.reviewed,
                failed: self.failed,
            });
        } else {
            events.push(self.present(ctx)?);
        }

        Ok(events)
    }

    /// Drop the rest of the queue. Grades already given stay persisted.
    pub fn abort(&mut self) {
        if self.phase != Phase::Complete {
            log::info!(
                "{} session aborted with {} cards left",
                self.mode.label(),
                self.queue.len()
            );
        }
        self.queue.clear();
        self.current = None;
        self.phase = Phase::Complete;
    }

    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current(&self) -> Option<&Presentation> {
        self.current.as_ref()
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn reviewed(&self) -> usize {
        self.reviewed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }
}

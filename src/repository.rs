//! Storage contract used by the study engines, and the borrowed context they
//! run against.

use chrono::{DateTime, NaiveDate, Utc};
use rand::RngCore;

use crate::clock::Clock;
use crate::config::{LeechPolicy, Settings};
use crate::error::Result;
use crate::ledger::Ledger;
use crate::models::{Card, CardKind, CardStatus, Grade};

/// Filter for card selection. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardQuery {
    pub status: Option<CardStatus>,
    pub in_study_queue: Option<bool>,
    /// Cards due on or before this day, plus cards that left NEW without ever
    /// being scheduled.
    pub due_on_or_before: Option<NaiveDate>,
    pub tag: Option<String>,
    pub kind: Option<CardKind>,
    pub exclude_leech: bool,
    pub limit: Option<usize>,
}

impl CardQuery {
    pub fn due(today: NaiveDate, leech_policy: LeechPolicy) -> Self {
        Self {
            in_study_queue: Some(true),
            due_on_or_before: Some(today),
            exclude_leech: leech_policy == LeechPolicy::Exclude,
            ..Self::default()
        }
    }

    pub fn new_cards(limit: usize) -> Self {
        Self {
            status: Some(CardStatus::New),
            in_study_queue: Some(true),
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn study_queue(leech_policy: LeechPolicy) -> Self {
        Self {
            in_study_queue: Some(true),
            exclude_leech: leech_policy == LeechPolicy::Exclude,
            ..Self::default()
        }
    }
}

/// Synchronous data access for cards, collections, history and the ledger.
pub trait Repository {
    fn get_card(&self, id: i64) -> Result<Option<Card>>;

    fn query_cards(&self, query: &CardQuery) -> Result<Vec<Card>>;

    /// Insert or fully overwrite the card with `card.id`.
    fn upsert_card(&self, card: &Card) -> Result<()>;

    fn count_cards(&self, query: &CardQuery) -> Result<usize>;

    /// Card ids referenced by a collection in segment order, or `None` when
    /// the collection does not exist. Empty segments are skipped.
    fn collection_card_ids(&self, collection_id: i64) -> Result<Option<Vec<i64>>>;

    fn record_history(&self, card_id: i64, grade: Grade, reviewed_at: DateTime<Utc>)
        -> Result<()>;

    fn load_ledger(&self) -> Result<Option<Ledger>>;

    fn save_ledger(&self, ledger: &Ledger) -> Result<()>;
}

/// Load the stored ledger, creating it with the starting balance on first run.
pub fn load_or_init_ledger(repo: &dyn Repository, starting_balance: u32) -> Result<Ledger> {
    match repo.load_ledger()? {
        Some(ledger) => Ok(ledger),
        None => {
            log::info!("creating ledger with {} sparks", starting_balance);
            let ledger = Ledger::new(starting_balance);
            repo.save_ledger(&ledger)?;
            Ok(ledger)
        }
    }
}

/// Everything an engine call needs, borrowed for the duration of the call.
pub struct StudyContext<'a> {
    pub repo: &'a dyn Repository,
    pub ledger: &'a mut Ledger,
    pub clock: &'a dyn Clock,
    pub rng: &'a mut dyn RngCore,
    pub settings: &'a Settings,
}

impl<'a> StudyContext<'a> {
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn save_ledger(&self) -> Result<()> {
        self.repo.save_ledger(self.ledger)
    }
}

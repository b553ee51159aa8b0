use chrono::{DateTime, Local, NaiveDate, Utc};

/// Source of the current time, injected so sessions can be tested.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar day used for due dates and daily ledger bookkeeping.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

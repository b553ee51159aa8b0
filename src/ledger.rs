//! Sparks (currency), streak, XP and daily counters.
//!
//! The ledger is plain state; engines mutate it and persist it through the
//! repository after every change.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

pub const XP_PER_LEVEL: u32 = 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCounters {
    pub day: Option<NaiveDate>,
    pub reviews: u32,
    pub learned: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub balance: u32,
    pub streak: u32,
    /// Last day the app was opened
    pub last_active: Option<NaiveDate>,
    /// Last day with at least one successful review
    pub last_study: Option<NaiveDate>,
    pub xp: u32,
    pub level: u32,
    pub daily: DailyCounters,
}

impl Ledger {
    pub fn new(starting_balance: u32) -> Self {
        Self {
            balance: starting_balance,
            streak: 0,
            last_active: None,
            last_study: None,
            xp: 0,
            level: 1,
            daily: DailyCounters::default(),
        }
    }

    /// First access of a new calendar day: reset daily counters, pay the
    /// bonus and break the streak if yesterday was skipped. Returns the bonus
    /// paid, or `None` when already run today.
    pub fn daily_check(&mut self, today: NaiveDate, bonus: u32) -> Option<u32> {
        if self.last_active == Some(today) {
            return None;
        }

        self.roll_daily(today);

        let yesterday = today - Duration::days(1);
        let studied_recently = matches!(self.last_study, Some(d) if d == yesterday || d == today);
        if !studied_recently && self.streak > 0 {
            log::info!("streak of {} broken", self.streak);
            self.streak = 0;
        }

        self.add_currency(bonus);
        self.last_active = Some(today);
        log::info!("daily bonus +{} sparks", bonus);
        Some(bonus)
    }

    /// Add XP and return the new level when it went up.
    pub fn add_xp(&mut self, amount: u32) -> Option<u32> {
        self.xp = self.xp.saturating_add(amount);
        let level = self.xp / XP_PER_LEVEL + 1;
        if level > self.level {
            self.level = level;
            log::info!("level up: {}", level);
            return Some(level);
        }
        None
    }

    pub fn add_currency(&mut self, amount: u32) {
        self.balance = self.balance.saturating_add(amount);
    }

    pub fn can_afford(&self, amount: u32) -> bool {
        self.balance >= amount
    }

    /// Deduct `amount`, or reject without touching the balance.
    pub fn spend(&mut self, amount: u32) -> Result<()> {
        if !self.can_afford(amount) {
            return Err(AppError::InsufficientFunds {
                needed: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    /// Successful review of a card seen before.
    pub fn record_review(&mut self, today: NaiveDate, xp: u32) -> Option<u32> {
        self.roll_daily(today);
        self.daily.reviews += 1;
        self.touch_streak(today);
        self.add_xp(xp)
    }

    /// First successful review of a brand-new card.
    pub fn record_learn(&mut self, today: NaiveDate, xp: u32) -> Option<u32> {
        self.roll_daily(today);
        self.daily.learned += 1;
        self.touch_streak(today);
        self.add_xp(xp)
    }

    fn roll_daily(&mut self, today: NaiveDate) {
        if self.daily.day != Some(today) {
            self.daily = DailyCounters {
                day: Some(today),
                reviews: 0,
                learned: 0,
            };
        }
    }

    fn touch_streak(&mut self, today: NaiveDate) {
        let yesterday = today - Duration::days(1);
        match self.last_study {
            Some(d) if d == today => {}
            Some(d) if d == yesterday => self.streak += 1,
            _ => self.streak = 1,
        }
        self.last_study = Some(today);
    }
}

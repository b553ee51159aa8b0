//! Single-slot deadline timer owned by an engine.
//!
//! Nothing runs in the background: the owner asks `expired(now)` whether the
//! deadline passed and fires the returned token. Every `arm` bumps the
//! generation, so a token handed out before a re-arm or cancel no longer
//! matches.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimerToken(u64);

#[derive(Debug, Default)]
pub struct TimerSlot {
    generation: u64,
    armed: Option<(TimerToken, DateTime<Utc>)>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm for `ms` milliseconds after `now`, replacing any armed timer.
    pub fn arm(&mut self, now: DateTime<Utc>, ms: u64) -> TimerToken {
        self.generation += 1;
        let token = TimerToken(self.generation);
        self.armed = Some((token, now + Duration::milliseconds(ms as i64)));
        token
    }

    pub fn cancel(&mut self) {
        self.armed = None;
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.armed.map(|(_, deadline)| deadline)
    }

    /// Milliseconds left, or `None` when nothing is armed.
    pub fn remaining_ms(&self, now: DateTime<Utc>) -> Option<u64> {
        self.deadline()
            .map(|deadline| (deadline - now).num_milliseconds().max(0) as u64)
    }

    /// Token of the armed timer once its deadline has passed. The slot stays
    /// armed until the owner cancels or re-arms it.
    pub fn expired(&self, now: DateTime<Utc>) -> Option<TimerToken> {
        match self.armed {
            Some((token, deadline)) if now >= deadline => Some(token),
            _ => None,
        }
    }

    /// True when `token` is the one currently armed.
    pub fn is_current(&self, token: TimerToken) -> bool {
        matches!(self.armed, Some((armed, _)) if armed == token)
    }
}

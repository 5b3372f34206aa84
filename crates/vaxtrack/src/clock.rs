//! Calendar source for the scheduling and recording policies.
//!
//! Lead-time and immutability checks read "today" on every call instead of caching it, so the
//! clock is injected as a capability and tests can pin or advance it freely.

use chrono::{Duration, Local, NaiveDate};
use std::sync::Mutex;

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall-clock calendar in the server's local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Settable calendar for tests and offline report generation.
#[derive(Debug)]
pub struct FixedClock {
    today: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    pub fn set(&self, today: NaiveDate) {
        let mut guard = self
            .today
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = today;
    }

    pub fn advance_days(&self, days: i64) {
        let next = self.today() + Duration::days(days);
        self.set(next);
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self
            .today
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

//! Daily focus counter

use chrono::NaiveDate;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
struct CounterDay {
    day: Option<NaiveDate>,
    minutes: u32,
}

/// Focus minutes accrued on the current calendar day
///
/// Written only by the enforcement loop (and by the daemon once at startup
/// to restore a persisted value). Within a day the value never decreases
/// and never exceeds the daily target; a new day starts again from zero.
#[derive(Debug)]
pub struct FocusCounter {
    target: u32,
    inner: Mutex<CounterDay>,
}

impl FocusCounter {
    pub fn new(target: u32) -> Self {
        Self {
            target,
            inner: Mutex::new(CounterDay::default()),
        }
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    /// Minutes credited on `day`, zero if the counter holds another day
    pub fn minutes_on(&self, day: NaiveDate) -> u32 {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.day == Some(day) {
            inner.minutes
        } else {
            0
        }
    }

    /// Credit one minute on `day`
    ///
    /// Returns the new total, or `None` when the target was already reached.
    pub fn credit(&self, day: NaiveDate) -> Option<u32> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.day != Some(day) {
            inner.day = Some(day);
            inner.minutes = 0;
        }
        if inner.minutes >= self.target {
            return None;
        }
        inner.minutes += 1;
        Some(inner.minutes)
    }

    /// Install a persisted value for `day`
    pub fn restore(&self, day: NaiveDate, minutes: u32) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let minutes = minutes.min(self.target);
        if inner.day == Some(day) {
            inner.minutes = inner.minutes.max(minutes);
        } else {
            inner.day = Some(day);
            inner.minutes = minutes;
        }
    }
}

//! Per-key cooldown timers.
//!
//! Each [`SignalKey`] is either COLD (no entry, or the last fire is at least
//! `window` old) or HOT. A fire moves a key to HOT; only the passage of time
//! moves it back. Entries are never removed except by [`CooldownRegistry::reset`].

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::domain::SignalKey;

#[derive(Debug)]
pub struct CooldownRegistry {
    window: Duration,
    last_fired: Mutex<HashMap<SignalKey, DateTime<Utc>>>,
}

impl CooldownRegistry {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_minutes(minutes: u32) -> Self {
        Self::new(Duration::minutes(i64::from(minutes)))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// A key is HOT while `now - last_fired < window`. A `now` earlier than
    /// the last fire also counts as HOT.
    fn hot_at(&self, last: Option<&DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last {
            Some(last) => now.signed_duration_since(*last) < self.window,
            None => false,
        }
    }

    pub fn is_hot(&self, key: &SignalKey, now: DateTime<Utc>) -> bool {
        let map = self.last_fired.lock();
        self.hot_at(map.get(key), now)
    }

    /// Record a fire unconditionally.
    pub fn mark_fired(&self, key: SignalKey, now: DateTime<Utc>) {
        self.last_fired.lock().insert(key, now);
    }

    /// Atomic check-and-mark. Returns `true` and records `now` if the key was
    /// COLD; returns `false` and leaves the entry untouched if it was HOT.
    pub fn try_fire(&self, key: &SignalKey, now: DateTime<Utc>) -> bool {
        let mut map = self.last_fired.lock();
        if self.hot_at(map.get(key), now) {
            return false;
        }
        map.insert(key.clone(), now);
        true
    }

    pub fn last_fired(&self, key: &SignalKey) -> Option<DateTime<Utc>> {
        self.last_fired.lock().get(key).copied()
    }

    /// Number of keys that have ever fired since the last reset.
    pub fn len(&self) -> usize {
        self.last_fired.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every timer.
    pub fn reset(&self) {
        self.last_fired.lock().clear();
    }
}

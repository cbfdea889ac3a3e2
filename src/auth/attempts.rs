//! Sliding-window ledger of failed login attempts per client identifier.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

#[derive(Debug)]
pub struct AttemptLedger {
    window: Duration,
    failures: HashMap<String, VecDeque<Duration>>,
}

impl AttemptLedger {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            failures: HashMap::new(),
        }
    }

    /// Records a failure at `now` and returns how many failures fall inside the
    /// window, the new one included.
    ///
    /// Entries older than `window` are discarded first. A failure exactly one
    /// window old still counts.
    pub fn record_failure(&mut self, identifier: &str, now: Duration) -> usize {
        let entries = self.failures.entry(identifier.to_string()).or_default();
        prune(entries, now, self.window);
        entries.push_back(now);
        entries.len()
    }

    /// Failures currently inside the window. Prunes stale entries as a side effect.
    pub fn count(&mut self, identifier: &str, now: Duration) -> usize {
        let Some(entries) = self.failures.get_mut(identifier) else {
            return 0;
        };
        prune(entries, now, self.window);
        if entries.is_empty() {
            self.failures.remove(identifier);
            return 0;
        }
        entries.len()
    }

    pub fn clear(&mut self, identifier: &str) {
        self.failures.remove(identifier);
    }
}

fn prune(entries: &mut VecDeque<Duration>, now: Duration, window: Duration) {
    while let Some(&oldest) = entries.front() {
        if now.saturating_sub(oldest) > window {
            entries.pop_front();
        } else {
            break;
        }
    }
}

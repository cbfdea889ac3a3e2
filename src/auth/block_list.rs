//! Per-identifier login blocks with lazily checked expiry.
//!
//! A block is its own record rather than something re-derived from the attempt
//! ledger, so clearing the ledger never lifts an active block.

use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug)]
pub struct BlockList {
    duration: Duration,
    blocked_until: HashMap<String, Duration>,
}

impl BlockList {
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            blocked_until: HashMap::new(),
        }
    }

    /// True while the identifier's block has not expired. An expired entry is
    /// removed on the way out; there is no background sweep.
    pub fn is_blocked(&mut self, identifier: &str, now: Duration) -> bool {
        match self.blocked_until.get(identifier) {
            Some(&expiry) if expiry > now => true,
            Some(_) => {
                self.blocked_until.remove(identifier);
                false
            }
            None => false,
        }
    }

    /// Blocks the identifier until `now + duration`, overwriting any earlier block.
    pub fn block(&mut self, identifier: &str, now: Duration) -> Duration {
        let expiry = now.saturating_add(self.duration);
        self.blocked_until.insert(identifier.to_string(), expiry);
        expiry
    }

    /// Seconds left on an active block, rounded up.
    pub fn remaining(&mut self, identifier: &str, now: Duration) -> Option<u64> {
        if !self.is_blocked(identifier, now) {
            return None;
        }
        self.blocked_until.get(identifier).map(|expiry| {
            let left = expiry.saturating_sub(now);
            left.as_secs() + u64::from(left.subsec_nanos() > 0)
        })
    }
}

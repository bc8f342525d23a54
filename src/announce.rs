//! Announcement cool-down tracking.
//!
//! The throttle keeps the last emission time per exact message text and
//! suppresses repeats inside the cool-down window. Keying by exact text is
//! intentional: two distance roundings of the same object are distinct keys
//! and may both fire. The map is never evicted, so it grows with the number
//! of distinct messages over a long run; at one entry per spoken phrase this
//! is accepted for process-lifetime state.

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct AnnouncementThrottle {
    cooldown: Duration,
    last_announced: HashMap<String, Instant>,
}

impl AnnouncementThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_announced: HashMap::new(),
        }
    }

    /// Decide whether `message` may be announced at `now`. The first
    /// occurrence of a message always passes; later occurrences pass only
    /// once the cool-down has elapsed. Approval records `now` as the new
    /// last-emission time.
    pub fn approve(&mut self, message: &str, now: Instant) -> bool {
        match self.last_announced.get(message) {
            Some(&last) if now.duration_since(last) < self.cooldown => false,
            _ => {
                self.last_announced.insert(message.to_string(), now);
                true
            }
        }
    }

    /// Number of distinct messages tracked so far.
    pub fn len(&self) -> usize {
        self.last_announced.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_announced.is_empty()
    }
}

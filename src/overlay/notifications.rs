//! Time-limited banner messages.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Maximum queued notifications; pushing past this evicts the oldest.
pub const QUEUE_CAPACITY: usize = 4;

/// How long a notification stays visible.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// A banner message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    text: String,
    created: Instant,
    expires: Instant,
}

impl Notification {
    pub fn new(text: impl Into<String>, now: Instant, timeout: Duration) -> Self {
        Self {
            text: text.into(),
            created: now,
            expires: now + timeout,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created(&self) -> Instant {
        self.created
    }

    pub fn expires(&self) -> Instant {
        self.expires
    }

    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires
    }
}

/// Bounded FIFO of notifications, oldest first.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    entries: VecDeque<Notification>,
    capacity: usize,
    timeout: Duration,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::with_limits(QUEUE_CAPACITY, DEFAULT_TIMEOUT)
    }

    pub fn with_limits(capacity: usize, timeout: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            timeout,
        }
    }

    /// Enqueues `text`, evicting the oldest entry when full.
    pub fn push(&mut self, text: impl Into<String>, now: Instant) {
        if self.entries.len() == self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                tracing::trace!(text = evicted.text(), "Notification evicted");
            }
        }
        self.entries
            .push_back(Notification::new(text, now, self.timeout));
    }

    /// Drops expired entries.
    pub fn prune(&mut self, now: Instant) {
        self.entries.retain(|n| !n.is_expired(now));
    }

    /// Oldest unexpired notification, after pruning.
    pub fn current(&mut self, now: Instant) -> Option<&Notification> {
        self.prune(now);
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}

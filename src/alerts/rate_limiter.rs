use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// Sliding-window limiter for outgoing alerts
///
/// Remembers when recent alerts were let through and refuses new ones once
/// `max_per_window` of them fall inside the window.
#[derive(Debug)]
pub struct RateLimiter {
    /// Alerts allowed inside one window
    max_per_window: usize,
    window: Duration,
    /// Times of alerts let through, oldest first
    recent: VecDeque<DateTime<Utc>>,
}

impl RateLimiter {
    /// Limiter allowing `max_per_minute` alerts in any one-minute window
    ///
    /// # Arguments
    ///
    /// * `max_per_minute` - Maximum number of alerts let through per minute
    pub fn per_minute(max_per_minute: usize) -> Self {
        Self::new(max_per_minute, Duration::minutes(1))
    }

    /// Create a limiter with an arbitrary window length
    ///
    /// # Arguments
    ///
    /// * `max_per_window` - Maximum number of alerts let through per window
    /// * `window` - Length of the sliding window
    pub fn new(max_per_window: usize, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            recent: VecDeque::new(),
        }
    }

    /// Take a slot now if one is free
    ///
    /// # Returns
    ///
    /// `true` if the alert may be sent, `false` if rate limited
    pub fn try_acquire(&mut self) -> bool {
        self.try_acquire_at(Utc::now())
    }

    /// Take a slot at `now` if one is free
    ///
    /// Returns `false` without recording anything when the window is full.
    ///
    /// # Arguments
    ///
    /// * `now` - Time of the attempted alert; used instead of the clock in tests
    pub fn try_acquire_at(&mut self, now: DateTime<Utc>) -> bool {
        self.expire(now);
        if self.recent.len() >= self.max_per_window {
            return false;
        }
        self.recent.push_back(now);
        true
    }

    /// Slots in use at `now`
    pub fn count_at(&mut self, now: DateTime<Utc>) -> usize {
        self.expire(now);
        self.recent.len()
    }

    fn expire(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        self.recent.retain(|&sent| sent > cutoff);
    }
}

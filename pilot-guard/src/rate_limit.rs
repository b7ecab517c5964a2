//! Sliding-window rate limiting for agent actions and navigations.
//!
//! Two independent 60-second windows with a hard cutoff: no smoothing, no
//! leaky bucket. Timestamps older than the window are pruned before every
//! check, and a rejected call records nothing.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde::Serialize;

/// Size of both sliding windows.
pub const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Per-category limits within one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimits {
    pub actions_per_minute: usize,
    pub navigations_per_minute: usize,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            actions_per_minute: 60,
            navigations_per_minute: 10,
        }
    }
}

/// Process-wide sliding-window rate limiter, shared across tasks via `Arc`.
///
/// Sharing across concurrently running tasks is intentional: the ceilings
/// bound the process, not one task.
#[derive(Debug)]
pub struct RateLimiter {
    limits: RateLimits,
    actions: Mutex<VecDeque<Instant>>,
    navigations: Mutex<VecDeque<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimits::default())
    }
}

impl RateLimiter {
    pub fn new(limits: RateLimits) -> Self {
        Self {
            limits,
            actions: Mutex::new(VecDeque::new()),
            navigations: Mutex::new(VecDeque::new()),
        }
    }

    /// Record one action. Returns false (recording nothing) when the window
    /// is full.
    pub fn record_action(&self) -> bool {
        self.record_action_at(Instant::now())
    }

    /// Record one navigation. Returns false (recording nothing) when the
    /// window is full.
    pub fn record_navigation(&self) -> bool {
        self.record_navigation_at(Instant::now())
    }

    /// [`Self::record_action`] with an injectable clock.
    pub fn record_action_at(&self, now: Instant) -> bool {
        let mut window = self.actions.lock().unwrap_or_else(|e| e.into_inner());
        let accepted = record(&mut window, self.limits.actions_per_minute, now);
        if !accepted {
            tracing::debug!(
                limit = self.limits.actions_per_minute,
                "action rate limit reached"
            );
        }
        accepted
    }

    /// [`Self::record_navigation`] with an injectable clock.
    pub fn record_navigation_at(&self, now: Instant) -> bool {
        let mut window = self.navigations.lock().unwrap_or_else(|e| e.into_inner());
        let accepted = record(&mut window, self.limits.navigations_per_minute, now);
        if !accepted {
            tracing::debug!(
                limit = self.limits.navigations_per_minute,
                "navigation rate limit reached"
            );
        }
        accepted
    }

    /// Clear both windows.
    pub fn reset(&self) {
        self.actions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.navigations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

/// Prune, then either reject at the limit or append `now`.
///
/// Invariant: immediately after a successful record the window length never
/// exceeds the limit.
fn record(window: &mut VecDeque<Instant>, limit: usize, now: Instant) -> bool {
    while window
        .front()
        .is_some_and(|t| now.duration_since(*t) >= RATE_WINDOW)
    {
        window.pop_front();
    }
    if window.len() >= limit {
        return false;
    }
    window.push_back(now);
    true
}

//! Periodic location publication
//!
//! The bridge caches the last position fix it received and republishes it on
//! a fixed schedule. Windows are anchored when the interval is set; fixes
//! arriving in between never move the anchor.

use std::time::{Duration, Instant};

/// Default publication interval
pub const DEFAULT_LOCATION_INTERVAL: Duration = Duration::from_secs(60);

/// Shortest accepted interval
pub const MIN_LOCATION_INTERVAL: Duration = Duration::from_millis(1);

/// Longest accepted interval
pub const MAX_LOCATION_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// A position fix in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationFix {
    /// Build a fix, rejecting NaN coordinates
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if latitude.is_nan() || longitude.is_nan() {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
        })
    }
}

/// Fixed-window schedule
///
/// Windows are `[anchor + k * interval, anchor + (k + 1) * interval)`.
/// [`LocationSchedule::poll`] fires at most once per window, on the first
/// poll at or after the window's start.
#[derive(Debug, Clone)]
pub struct LocationSchedule {
    interval: Duration,
    anchor: Instant,
    /// `None` when the next window lies beyond what `Instant` can represent
    next_due: Option<Instant>,
}

impl LocationSchedule {
    pub fn new(interval: Duration, now: Instant) -> Self {
        let interval = interval.clamp(MIN_LOCATION_INTERVAL, MAX_LOCATION_INTERVAL);
        Self {
            interval,
            anchor: now,
            next_due: now.checked_add(interval),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the interval and restart windows at `now`
    pub fn reset(&mut self, interval: Duration, now: Instant) {
        *self = Self::new(interval, now);
    }

    /// Returns true once per elapsed window
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {}
            _ => return false,
        }
        let interval = self.interval.as_nanos();
        let phase = now.duration_since(self.anchor).as_nanos() % interval;
        let remaining = u64::try_from(interval - phase).unwrap_or(u64::MAX);
        self.next_due = now.checked_add(Duration::from_nanos(remaining));
        true
    }
}

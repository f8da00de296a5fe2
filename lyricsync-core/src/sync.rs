//! Maps playback time to the active lyric line.

use crate::config::SyncConfig;
use crate::lyrics::LyricSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

const LOG_TARGET: &str = "lyricsync::sync";

/// Default lead compensating for render lag, in seconds
pub const DEFAULT_LEAD_BIAS_SECS: f64 = 0.05;

/// Default minimum time between recomputations
pub const DEFAULT_MIN_UPDATE_INTERVAL: Duration = Duration::from_millis(100);

/// Tracks the active line of one lyric set as playback time advances.
///
/// The set is replaced wholesale on track change and never mutated in place.
#[derive(Debug, Clone)]
pub struct SyncTracker {
    lines: Arc<LyricSet>,
    active_index: Option<usize>,
    last_update: Option<Instant>,
    lead_bias: f64,
    user_offset: f64,
    min_interval: Duration,
}

impl SyncTracker {
    /// Create a tracker with no lines
    #[must_use]
    pub fn new(lead_bias: f64, user_offset: f64, min_interval: Duration) -> Self {
        Self {
            lines: Arc::new(LyricSet::empty()),
            active_index: None,
            last_update: None,
            lead_bias,
            user_offset,
            min_interval,
        }
    }

    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.lead_bias_secs,
            config.user_offset_secs,
            config.min_update_interval(),
        )
    }

    /// Replace the tracked set; the active line resets to none
    pub fn set_lines(&mut self, lines: Arc<LyricSet>) {
        self.lines = lines;
        self.reset();
    }

    /// Forget the active line and the throttle clock
    pub fn reset(&mut self) {
        self.active_index = None;
        self.last_update = None;
    }

    #[must_use]
    pub fn lines(&self) -> &Arc<LyricSet> {
        &self.lines
    }

    #[must_use]
    pub const fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    #[must_use]
    pub const fn user_offset(&self) -> f64 {
        self.user_offset
    }

    /// Signed offset in seconds, positive shows lyrics earlier.
    ///
    /// Takes effect on the next recomputation.
    pub fn set_user_offset(&mut self, offset: f64) {
        self.user_offset = offset;
    }

    /// Time used for the line lookup
    #[must_use]
    pub fn adjusted_time(&self, current_time: f64) -> f64 {
        current_time + self.lead_bias - self.user_offset
    }

    /// Feed a playback time observed at `now`.
    ///
    /// Returns `Some(new_index)` only when the active line changed. Calls
    /// arriving sooner than the minimum interval after the last
    /// recomputation are ignored.
    pub fn update(&mut self, current_time: f64, now: Instant) -> Option<Option<usize>> {
        if let Some(last) = self.last_update {
            if now.saturating_duration_since(last) < self.min_interval {
                return None;
            }
        }
        self.recompute(current_time, now)
    }

    /// Recompute immediately, ignoring the throttle (pause, seek, stop)
    pub fn flush(&mut self, current_time: f64, now: Instant) -> Option<Option<usize>> {
        self.recompute(current_time, now)
    }

    fn recompute(&mut self, current_time: f64, now: Instant) -> Option<Option<usize>> {
        self.last_update = Some(now);

        let index = if self.lines.is_empty() {
            None
        } else {
            self.lines.active_index_at(self.adjusted_time(current_time))
        };

        if index == self.active_index {
            return None;
        }
        trace!(
            target: LOG_TARGET,
            "Active line {:?} -> {:?} at {:.3}s",
            self.active_index,
            index,
            current_time
        );
        self.active_index = index;
        Some(index)
    }
}

impl Default for SyncTracker {
    fn default() -> Self {
        Self::new(DEFAULT_LEAD_BIAS_SECS, 0.0, DEFAULT_MIN_UPDATE_INTERVAL)
    }
}

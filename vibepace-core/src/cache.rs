//! Time-indexed score cache.
//!
//! Scores arrive in production order (one per analysis window) and are
//! consumed strictly forward by playback time. Physically this is a growable
//! array with a cursor: entries before the cursor are evicted, entries from
//! the cursor on are pending. When the array fills, the evicted prefix is
//! compacted away if there is one, otherwise capacity doubles. That keeps
//! appends amortized O(1) and peak memory bounded by roughly twice the
//! working set between cursor advances.

use std::time::Duration;

use tracing::{debug, warn};

/// Score returned when the requested time cannot be satisfied — either
/// already consumed (past) or not yet produced (future). Pacing is advisory,
/// so degraded lookups stay soft instead of failing the caller.
pub const NEUTRAL_SCORE: f32 = 0.5;

/// Growable, forward-only-consumable store of per-window scores.
#[derive(Debug)]
pub struct ScoreCache {
    /// Produced, not-yet-dropped scores; `scores.len()` is the limit.
    scores: Vec<f32>,
    /// Current allocation target. Doubles when full and compaction is
    /// impossible.
    capacity: usize,
    /// Index of the next not-yet-consumed score.
    cursor_index: usize,
    /// Playback timestamp (relative to session start) of `cursor_index`.
    cursor_time: Duration,
    /// Playback span covered by one score.
    window_period: Duration,
}

impl ScoreCache {
    /// Create a cache sized for about one second of windows.
    ///
    /// `window_period` is `window_size / sample_rate` seconds; the initial
    /// capacity is `ceil(sample_rate / window_size) + 1`.
    pub fn new(sample_rate: u32, window_size: usize) -> Self {
        let capacity = (sample_rate as usize).div_ceil(window_size) + 1;
        let window_period =
            Duration::from_secs_f64(window_size as f64 / f64::from(sample_rate));

        Self {
            scores: Vec::with_capacity(capacity),
            capacity,
            cursor_index: 0,
            cursor_time: Duration::ZERO,
            window_period,
        }
    }

    /// Append the score for the next window slot.
    pub fn push(&mut self, score: f32) {
        if self.scores.len() == self.capacity {
            if self.cursor_index > 0 {
                // Shift the pending range down over the evicted prefix.
                self.scores.drain(..self.cursor_index);
                self.cursor_index = 0;
            } else {
                self.capacity *= 2;
                self.scores.reserve_exact(self.capacity - self.scores.len());
                debug!(capacity = self.capacity, "score cache grown");
            }
        }

        self.scores.push(score);
    }

    /// Score for the window containing `elapsed` playback time.
    ///
    /// Advances the cursor to that window, evicting everything skipped over:
    /// lookup is strictly monotonic and a later call can never see an
    /// earlier window. Times before the cursor or beyond produced data yield
    /// [`NEUTRAL_SCORE`].
    pub fn score_at(&mut self, elapsed: Duration) -> f32 {
        let Some(mut delta) = elapsed.checked_sub(self.cursor_time) else {
            warn!(?elapsed, cursor = ?self.cursor_time, "score not available (past)");
            return NEUTRAL_SCORE;
        };

        while delta >= self.window_period && self.cursor_index < self.scores.len() {
            self.cursor_time += self.window_period;
            delta -= self.window_period;
            self.cursor_index += 1;
        }

        if self.cursor_index >= self.scores.len() {
            debug!(?elapsed, "score not available (future)");
            return NEUTRAL_SCORE;
        }

        self.scores[self.cursor_index]
    }

    /// Number of produced, not-yet-dropped scores.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Current allocation target (diagnostics and tests).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Index of the next not-yet-consumed score (diagnostics and tests).
    pub fn cursor_index(&self) -> usize {
        self.cursor_index
    }

    pub fn window_period(&self) -> Duration {
        self.window_period
    }
}

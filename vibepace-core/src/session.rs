//! Session lifecycle and pacing.
//!
//! A [`Session`] owns the source stream, the analyzer, the score cache and
//! the single reusable chunk buffer. Two collaborators drive it from one
//! thread: the audio output adapter pulls [`Session::next_chunk`] to refill
//! its queue (which lazily produces scores), and the process stepper calls
//! [`Session::pace`] once per step to convert the current score into a
//! sleep. The playback clock starts at the first chunk pull.
//!
//! Teardown is scoped: everything is released on drop, on every exit path
//! including initialization failures. [`Session::close`] exists for explicit
//! teardown; because it consumes the session, use-after-close does not
//! compile.

use std::fs::File;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analyzer::{ReferenceMode, SpectralAnalyzer};
use crate::cache::ScoreCache;
use crate::error::Result;
use crate::format::AudioParameters;
use crate::source::PcmSource;

/// Sleep applied at score 0.0. Score 1.0 sleeps not at all: busier audio
/// lets the traced program advance faster.
pub const MAX_PACE_SLEEP: Duration = Duration::from_millis(10);

/// Everything needed to start a session: the vibe file and its layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub path: PathBuf,
    pub parameters: AudioParameters,
    pub reference_mode: ReferenceMode,
}

/// One playback-plus-pacing run. Singleton per process run; exclusively
/// owned, never shared across threads.
#[derive(Debug)]
pub struct Session {
    parameters: AudioParameters,
    source: PcmSource<File>,
    analyzer: SpectralAnalyzer,
    cache: ScoreCache,
    /// One second of PCM, reused in place on every pull. Contents are only
    /// valid until the next `next_chunk` call.
    chunk: Vec<u8>,
    /// Set on the first chunk pull; pacing measures elapsed time from here.
    start: Option<Instant>,
}

impl Session {
    /// Open the source and build the analysis pipeline.
    ///
    /// Fatal on an unreadable source or an unsupported layout; partially
    /// acquired resources are dropped on the error path.
    pub fn open(config: &SessionConfig) -> Result<Self> {
        let source = PcmSource::open(&config.path)?;
        let analyzer = SpectralAnalyzer::new(&config.parameters, config.reference_mode)?;
        let cache = ScoreCache::new(
            config.parameters.sample_rate,
            config.parameters.window_size(),
        );

        info!(
            path = %config.path.display(),
            sample_rate = config.parameters.sample_rate,
            channels = config.parameters.channels,
            window_size = analyzer.window_size(),
            "vibe session opened"
        );

        Ok(Self {
            parameters: config.parameters,
            source,
            analyzer,
            cache,
            chunk: vec![0u8; config.parameters.chunk_bytes()],
            start: None,
        })
    }

    pub fn parameters(&self) -> &AudioParameters {
        &self.parameters
    }

    /// Pull, analyze and return the next decoded chunk.
    ///
    /// The first call records the session start time. Returns `Ok(None)` at
    /// end of stream. The returned slice aliases the internal buffer and is
    /// invalidated by the next pull.
    pub fn next_chunk(&mut self) -> Result<Option<&[u8]>> {
        if self.start.is_none() {
            self.start = Some(Instant::now());
            debug!("playback clock started");
        }

        let filled = self.source.read_chunk(&mut self.chunk)?;
        if filled == 0 {
            return Ok(None);
        }

        for score in self.analyzer.analyze(&self.chunk[..filled]) {
            self.cache.push(score);
        }

        Ok(Some(&self.chunk[..filled]))
    }

    /// Sleep in proportion to the current spectral calm.
    ///
    /// `sleep = (1 - score) * 10 ms`: the sole point where the analysis
    /// signal throttles the outside world.
    pub fn pace(&mut self) {
        let pause = self.pace_duration();
        if !pause.is_zero() {
            thread::sleep(pause);
        }
    }

    /// The sleep `pace` would perform right now.
    pub fn pace_duration(&mut self) -> Duration {
        let elapsed = self
            .start
            .map(|start| start.elapsed())
            .unwrap_or(Duration::ZERO);
        self.pace_duration_at(elapsed)
    }

    /// Deterministic pacing seam: look up the score for `elapsed` (advancing
    /// the cache cursor exactly like `pace`) and map it to a sleep.
    pub fn pace_duration_at(&mut self, elapsed: Duration) -> Duration {
        let score = self.cache.score_at(elapsed);
        MAX_PACE_SLEEP.mul_f32((1.0 - score).max(0.0))
    }

    /// Produced, not-yet-consumed score count (diagnostics and tests).
    pub fn pending_scores(&self) -> usize {
        self.cache.len() - self.cache.cursor_index()
    }

    /// Explicit teardown. Consuming: a closed session cannot be touched
    /// again. All resources are released here (or on drop).
    pub fn close(self) {
        info!("vibe session closed");
    }
}

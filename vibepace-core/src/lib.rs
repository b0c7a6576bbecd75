//! # vibepace-core
//!
//! Audio-driven pacing engine: decodes a raw PCM stream, scores each ~21 ms
//! window by how much its spectrum moved, and answers "what is the score at
//! playback time T" so an external driver can throttle a traced process.
//!
//! ## Architecture
//!
//! ```text
//! PcmSource ──read_chunk──► Session ──analyze──► SpectralAnalyzer
//!                              │                       │
//!                       chunk for playback       one score per window
//!                              │                       │
//!                              ▼                       ▼
//!                       output adapter            ScoreCache
//!                                                      │
//!                              pace() ──score_at(elapsed)──► sleep
//! ```
//!
//! Chunk pulls (driven by the audio output's consumption rate) and pacing
//! queries (driven by the process-stepping loop) meet only at the
//! [`cache::ScoreCache`] and the session's playback clock. Everything is
//! single-threaded and exclusively owned by the [`Session`].

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod analyzer;
pub mod cache;
pub mod error;
pub mod format;
pub mod session;
pub mod source;

// Convenience re-exports for downstream crates
pub use analyzer::{ReferenceMode, SpectralAnalyzer};
pub use cache::{ScoreCache, NEUTRAL_SCORE};
pub use error::VibepaceError;
pub use format::{AudioParameters, ChannelLayout, SampleFormat};
pub use session::{Session, SessionConfig, MAX_PACE_SLEEP};
pub use source::PcmSource;

use thiserror::Error;

use crate::format::SampleFormat;

/// All errors produced by vibepace-core.
#[derive(Debug, Error)]
pub enum VibepaceError {
    #[error("cannot open vibe source '{path}': {source}")]
    SourceOpen {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported sample layout: {channels} channel(s), {format:?}")]
    UnsupportedLayout { channels: u16, format: SampleFormat },

    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, VibepaceError>;

//! PCM parameter types and the decode layout resolved from them.
//!
//! The source stream is headerless, so the caller supplies the full sample
//! layout up front. Validation happens exactly once, at session
//! initialization: [`DecodeLayout::resolve`] turns the raw channel count and
//! format into a tagged layout plus precomputed byte arithmetic, so the
//! per-sample decode loop never re-branches on raw parameters.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VibepaceError};

/// Signed PCM sample encoding, little-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleFormat {
    /// 8-bit signed, normalized by 1/128.
    Signed8,
    /// 16-bit signed little-endian, normalized by 1/32767.
    Signed16,
}

impl SampleFormat {
    /// Size of one sample of one channel, in bytes.
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::Signed8 => 1,
            SampleFormat::Signed16 => 2,
        }
    }
}

/// Supported channel arrangements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub fn count(self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }
}

/// The sample layout of a vibe source. Immutable once a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioParameters {
    /// Interleaved channel count. Only 1 and 2 are supported.
    pub channels: u16,
    /// Samples per second per channel, e.g. 48000.
    pub sample_rate: u32,
    pub sample_format: SampleFormat,
}

impl AudioParameters {
    /// Bytes per sample frame (one sample of every channel).
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * self.sample_format.bytes_per_sample()
    }

    /// Bytes in one second of audio — the size of one decoded chunk.
    pub fn chunk_bytes(&self) -> usize {
        self.sample_rate as usize * self.frame_bytes()
    }

    /// Samples per analysis window: `sample_rate >> 6` (~21 ms at 48 kHz).
    pub fn window_size(&self) -> usize {
        (self.sample_rate >> 6) as usize
    }
}

/// Decode parameters resolved once at session initialization.
#[derive(Debug, Clone, Copy)]
pub struct DecodeLayout {
    pub channels: ChannelLayout,
    pub format: SampleFormat,
    /// Bytes per sample frame, cached for window arithmetic.
    pub frame_bytes: usize,
}

impl DecodeLayout {
    /// Validate raw parameters into a decode layout.
    ///
    /// # Errors
    /// - `UnsupportedLayout` for channel counts outside {1, 2}.
    /// - `InvalidSampleRate` when the rate is zero or too low to form a
    ///   single analysis window.
    pub fn resolve(parameters: &AudioParameters) -> Result<Self> {
        let channels = match parameters.channels {
            1 => ChannelLayout::Mono,
            2 => ChannelLayout::Stereo,
            channels => {
                return Err(VibepaceError::UnsupportedLayout {
                    channels,
                    format: parameters.sample_format,
                })
            }
        };

        if parameters.window_size() == 0 {
            return Err(VibepaceError::InvalidSampleRate(parameters.sample_rate));
        }

        Ok(Self {
            channels,
            format: parameters.sample_format,
            frame_bytes: parameters.frame_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(channels: u16, sample_rate: u32, sample_format: SampleFormat) -> AudioParameters {
        AudioParameters {
            channels,
            sample_rate,
            sample_format,
        }
    }

    #[test]
    fn window_and_chunk_arithmetic() {
        let p = params(2, 48_000, SampleFormat::Signed16);
        assert_eq!(p.window_size(), 750);
        assert_eq!(p.frame_bytes(), 4);
        assert_eq!(p.chunk_bytes(), 192_000);

        let p = params(1, 48_000, SampleFormat::Signed8);
        assert_eq!(p.chunk_bytes(), 48_000);
    }

    #[test]
    fn resolve_accepts_mono_and_stereo() {
        let layout = DecodeLayout::resolve(&params(1, 48_000, SampleFormat::Signed16)).unwrap();
        assert_eq!(layout.channels, ChannelLayout::Mono);
        assert_eq!(layout.frame_bytes, 2);

        let layout = DecodeLayout::resolve(&params(2, 48_000, SampleFormat::Signed8)).unwrap();
        assert_eq!(layout.channels, ChannelLayout::Stereo);
        assert_eq!(layout.frame_bytes, 2);
    }

    #[test]
    fn resolve_rejects_surround() {
        let err = DecodeLayout::resolve(&params(6, 48_000, SampleFormat::Signed16)).unwrap_err();
        assert!(matches!(
            err,
            VibepaceError::UnsupportedLayout { channels: 6, .. }
        ));
    }

    #[test]
    fn resolve_rejects_degenerate_rate() {
        // 32 >> 6 == 0: no window fits
        let err = DecodeLayout::resolve(&params(1, 32, SampleFormat::Signed8)).unwrap_err();
        assert!(matches!(err, VibepaceError::InvalidSampleRate(32)));
    }
}

//! Per-window spectral difference scoring.
//!
//! Each complete window in a decoded chunk is channel-mixed to mono,
//! transformed with a forward complex FFT, and scored against a reference
//! spectrum: the fraction of frequency bins whose real-magnitude moved by
//! more than [`SPECTRAL_DIFF_THRESHOLD`], clamped at
//! [`MAX_DIVERGENT_BINS`]. The result is a coarse [0, 1] measure of
//! spectral volatility, insensitive to phase and to absolute level.

use std::mem;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::error::Result;
use crate::format::{AudioParameters, DecodeLayout, SampleFormat};

/// Real-magnitude difference above which a frequency bin counts as divergent.
pub const SPECTRAL_DIFF_THRESHOLD: f32 = 10.0;

/// Divergent-bin count that saturates the score at 1.0.
pub const MAX_DIVERGENT_BINS: usize = 150;

/// What each window is scored against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum ReferenceMode {
    /// Compare consecutive windows: the reference becomes the previous
    /// window's spectrum after every score.
    #[default]
    SlidingWindow,
    /// Compare every window against the initial all-zero (silent) spectrum.
    FixedSilence,
}

/// Windowed FFT scorer. All buffers are allocated once at construction and
/// reused for every window.
pub struct SpectralAnalyzer {
    layout: DecodeLayout,
    window_size: usize,
    window_bytes: usize,
    reference_mode: ReferenceMode,
    fft: Arc<dyn Fft<f32>>,
    /// Mixed mono window; holds the spectrum in place after the transform.
    current: Vec<Complex<f32>>,
    /// Spectrum the next window is scored against. Starts silent.
    reference: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl std::fmt::Debug for SpectralAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralAnalyzer")
            .field("layout", &self.layout)
            .field("window_size", &self.window_size)
            .field("window_bytes", &self.window_bytes)
            .field("reference_mode", &self.reference_mode)
            .finish_non_exhaustive()
    }
}

impl SpectralAnalyzer {
    /// Build an analyzer for the given parameters.
    ///
    /// Window size is fixed at [`AudioParameters::window_size`]
    /// (`sample_rate >> 6`). Fails with `UnsupportedLayout` /
    /// `InvalidSampleRate` for layouts outside {s8, s16} × {mono, stereo}.
    pub fn new(parameters: &AudioParameters, reference_mode: ReferenceMode) -> Result<Self> {
        let layout = DecodeLayout::resolve(parameters)?;
        let window_size = parameters.window_size();

        let fft = FftPlanner::new().plan_fft_forward(window_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Ok(Self {
            layout,
            window_size,
            window_bytes: window_size * layout.frame_bytes,
            reference_mode,
            fft,
            current: vec![Complex::new(0.0, 0.0); window_size],
            reference: vec![Complex::new(0.0, 0.0); window_size],
            scratch,
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Bytes consumed per complete window.
    pub fn window_bytes(&self) -> usize {
        self.window_bytes
    }

    /// Score every complete window in `bytes`, in order.
    ///
    /// Trailing bytes that do not fill a window are dropped; they are not
    /// carried over to the next chunk.
    pub fn analyze(&mut self, bytes: &[u8]) -> Vec<f32> {
        let mut scores = Vec::with_capacity(bytes.len() / self.window_bytes);

        for window in bytes.chunks_exact(self.window_bytes) {
            self.mix_window(window);
            self.fft
                .process_with_scratch(&mut self.current, &mut self.scratch);

            scores.push(score_spectrum(&self.current, &self.reference));

            if self.reference_mode == ReferenceMode::SlidingWindow {
                mem::swap(&mut self.current, &mut self.reference);
            }
        }

        scores
    }

    /// Decode one window into `self.current` as a mono amplitude sequence:
    /// the per-channel normalized amplitudes are summed, not averaged.
    fn mix_window(&mut self, window: &[u8]) {
        let channels = self.layout.channels.count();
        let bytes_per_sample = self.layout.format.bytes_per_sample();

        for (sample, slot) in self.current.iter_mut().enumerate() {
            let frame = sample * self.layout.frame_bytes;
            let mut amplitude = 0.0f32;

            for channel in 0..channels {
                let at = frame + channel * bytes_per_sample;
                amplitude += match self.layout.format {
                    SampleFormat::Signed8 => window[at] as i8 as f32 / 128.0,
                    SampleFormat::Signed16 => {
                        i16::from_le_bytes([window[at], window[at + 1]]) as f32 / 32767.0
                    }
                };
            }

            *slot = Complex::new(amplitude, 0.0);
        }
    }
}

/// Count bins whose real magnitude moved past the threshold, clamp, and
/// normalize to [0, 1].
fn score_spectrum(current: &[Complex<f32>], reference: &[Complex<f32>]) -> f32 {
    let divergent = current
        .iter()
        .zip(reference)
        .filter(|(cur, re)| (cur.re.abs() - re.re.abs()).abs() > SPECTRAL_DIFF_THRESHOLD)
        .count();

    divergent.min(MAX_DIVERGENT_BINS) as f32 / MAX_DIVERGENT_BINS as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn params_mono_s16() -> AudioParameters {
        AudioParameters {
            channels: 1,
            sample_rate: 48_000,
            sample_format: SampleFormat::Signed16,
        }
    }

    fn s16_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    /// One 750-sample window of full-scale random-sign noise.
    fn noise_window(seed: u64) -> Vec<i16> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..750)
            .map(|_| if rng.gen_bool(0.5) { 32_767 } else { -32_767 })
            .collect()
    }

    #[test]
    fn silence_scores_zero() {
        let mut analyzer =
            SpectralAnalyzer::new(&params_mono_s16(), ReferenceMode::SlidingWindow).unwrap();
        let chunk = s16_bytes(&[0i16; 750 * 3]);

        let scores = analyzer.analyze(&chunk);
        assert_eq!(scores.len(), 3);
        for score in scores {
            assert_relative_eq!(score, 0.0);
        }
    }

    #[test]
    fn broadband_noise_saturates_against_silence() {
        let mut analyzer =
            SpectralAnalyzer::new(&params_mono_s16(), ReferenceMode::FixedSilence).unwrap();
        let chunk = s16_bytes(&noise_window(42));

        let scores = analyzer.analyze(&chunk);
        assert_eq!(scores, vec![1.0]);
    }

    #[test]
    fn scores_stay_bounded() {
        let mut analyzer =
            SpectralAnalyzer::new(&params_mono_s16(), ReferenceMode::SlidingWindow).unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..8 {
            let window: Vec<i16> = (0..750).map(|_| rng.gen::<i16>()).collect();
            for score in analyzer.analyze(&s16_bytes(&window)) {
                assert!((0.0..=1.0).contains(&score), "score={score}");
            }
        }
    }

    #[test]
    fn sliding_reference_tracks_previous_window() {
        let window = noise_window(11);
        let mut chunk = s16_bytes(&window);
        chunk.extend(s16_bytes(&window));

        let mut analyzer =
            SpectralAnalyzer::new(&params_mono_s16(), ReferenceMode::SlidingWindow).unwrap();
        let scores = analyzer.analyze(&chunk);

        assert_eq!(scores.len(), 2);
        assert_relative_eq!(scores[0], 1.0);
        // Identical consecutive windows: no spectral movement.
        assert_relative_eq!(scores[1], 0.0);
    }

    #[test]
    fn fixed_reference_keeps_comparing_to_silence() {
        let window = noise_window(11);
        let mut chunk = s16_bytes(&window);
        chunk.extend(s16_bytes(&window));

        let mut analyzer =
            SpectralAnalyzer::new(&params_mono_s16(), ReferenceMode::FixedSilence).unwrap();
        let scores = analyzer.analyze(&chunk);

        assert_eq!(scores, vec![1.0, 1.0]);
    }

    #[test]
    fn partial_trailing_window_is_dropped() {
        let mut analyzer =
            SpectralAnalyzer::new(&params_mono_s16(), ReferenceMode::SlidingWindow).unwrap();
        // 2 complete windows plus half a window of remainder.
        let chunk = s16_bytes(&vec![0i16; 750 * 2 + 375]);

        assert_eq!(analyzer.analyze(&chunk).len(), 2);
    }

    #[test]
    fn opposite_stereo_channels_cancel() {
        let params = AudioParameters {
            channels: 2,
            sample_rate: 48_000,
            sample_format: SampleFormat::Signed16,
        };
        let mut analyzer = SpectralAnalyzer::new(&params, ReferenceMode::FixedSilence).unwrap();

        // L = -R everywhere: the summed mono signal is silence.
        let window = noise_window(3);
        let mut interleaved = Vec::with_capacity(750 * 2);
        for sample in window {
            interleaved.push(sample);
            interleaved.push(-sample);
        }

        let scores = analyzer.analyze(&s16_bytes(&interleaved));
        assert_eq!(scores, vec![0.0]);
    }

    #[test]
    fn signed8_normalization() {
        let params = AudioParameters {
            channels: 1,
            sample_rate: 48_000,
            sample_format: SampleFormat::Signed8,
        };
        let mut analyzer = SpectralAnalyzer::new(&params, ReferenceMode::FixedSilence).unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let chunk: Vec<u8> = (0..750)
            .map(|_| {
                let sample: i8 = if rng.gen_bool(0.5) { 127 } else { -127 };
                sample as u8
            })
            .collect();

        let scores = analyzer.analyze(&chunk);
        assert_eq!(scores, vec![1.0]);
    }
}

//! Audio output adapter.
//!
//! A cpal output stream plays from an SPSC ring holding up to
//! [`QUEUE_SLOTS`] one-second chunks. The real-time callback only pops
//! samples and zero-fills underruns; all pulling, decoding and pushing
//! happens in [`AudioPlayer::update`] on the driver thread, once per tick.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;
use tracing::{error, info};

use vibepace_core::{AudioParameters, SampleFormat, Session};

/// Chunks of read-ahead the ring can hold — the fixed hardware-queue depth.
pub const QUEUE_SLOTS: usize = 4;

/// Output device state: the stream, its feed ring, and drain tracking.
pub struct AudioPlayer {
    stream: Stream,
    producer: ringbuf::HeapProd<f32>,
    /// Reused per-chunk conversion buffer.
    scratch: Vec<f32>,
    /// Samples (all channels) in one full chunk.
    chunk_samples: usize,
    format: SampleFormat,
    started: bool,
    source_drained: bool,
}

impl AudioPlayer {
    /// Open the default output device with a config matching the vibe
    /// parameters. Playback does not start until data is queued.
    pub fn open(parameters: &AudioParameters) -> Result<Self> {
        let chunk_samples = parameters.sample_rate as usize * parameters.channels as usize;
        let (producer, mut consumer) = HeapRb::<f32>::new(QUEUE_SLOTS * chunk_samples).split();

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("no default output device"))?;

        info!(
            device = device.name().unwrap_or_default().as_str(),
            sample_rate = parameters.sample_rate,
            channels = parameters.channels,
            "opening output device"
        );

        let config = StreamConfig {
            channels: parameters.channels,
            sample_rate: SampleRate(parameters.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _info| {
                    // RT callback: no allocation, no blocking.
                    let popped = consumer.pop_slice(data);
                    data[popped..].fill(0.0);
                },
                |err| error!("audio stream error: {err}"),
                None,
            )
            .context("building output stream")?;

        Ok(Self {
            stream,
            producer,
            scratch: Vec::with_capacity(chunk_samples),
            chunk_samples,
            format: parameters.sample_format,
            started: false,
            source_drained: false,
        })
    }

    /// Refill freed queue space from the session.
    ///
    /// Pulls one chunk per free slot, converts it for the device, and starts
    /// playback once the first data is queued. After end of stream, no-op:
    /// the ring drains and playback ends naturally.
    pub fn update(&mut self, session: &mut Session) -> Result<()> {
        while !self.source_drained && self.producer.vacant_len() >= self.chunk_samples {
            match session.next_chunk()? {
                Some(chunk) => {
                    decode_chunk(chunk, self.format, &mut self.scratch);
                    self.producer.push_slice(&self.scratch);
                }
                None => {
                    self.source_drained = true;
                    info!("vibe source drained, letting playback run out");
                }
            }
        }

        if !self.started && self.producer.occupied_len() > 0 {
            self.stream.play().context("starting playback")?;
            self.started = true;
            info!("playback started");
        }

        Ok(())
    }

    /// True once the source hit end of stream and the ring has played out.
    pub fn finished(&self) -> bool {
        self.source_drained && self.producer.occupied_len() == 0
    }
}

/// Convert raw little-endian PCM into f32 frames for the output stream.
fn decode_chunk(bytes: &[u8], format: SampleFormat, out: &mut Vec<f32>) {
    out.clear();
    match format {
        SampleFormat::Signed8 => {
            out.extend(bytes.iter().map(|&b| b as i8 as f32 / 128.0));
        }
        SampleFormat::Signed16 => {
            out.extend(
                bytes
                    .chunks_exact(2)
                    .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0),
            );
        }
    }
}

//! vibepace entry point.
//!
//! Per outer-loop tick, in order: pace (sleep scaled by the current vibe
//! score), one traced syscall-step, then an output-queue refill poll. The
//! loop exits when the traced program exits or dies to a signal; its exit
//! status is propagated.

mod player;
mod tracer;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vibepace_core::{AudioParameters, ReferenceMode, SampleFormat, Session, SessionConfig};

use player::AudioPlayer;
use tracer::{StepOutcome, TracedChild};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// 8-bit signed PCM.
    S8,
    /// 16-bit signed little-endian PCM.
    S16,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReferenceArg {
    /// Score each window against the previous one.
    Sliding,
    /// Score every window against initial silence.
    Silence,
}

/// Run a program under syscall-step tracing, paced by its soundtrack.
#[derive(Debug, Parser)]
#[command(name = "vibepace", version, about)]
struct Cli {
    /// Raw headerless PCM file to play and analyze.
    #[arg(long, default_value = "sample.pcm")]
    vibe: PathBuf,

    /// Sample rate of the vibe file in Hz.
    #[arg(long, default_value_t = 48_000)]
    sample_rate: u32,

    /// Interleaved channel count (1 or 2).
    #[arg(long, default_value_t = 2)]
    channels: u16,

    /// Sample encoding of the vibe file.
    #[arg(long, value_enum, default_value_t = FormatArg::S16)]
    format: FormatArg,

    /// Reference-spectrum policy for scoring.
    #[arg(long, value_enum, default_value_t = ReferenceArg::Sliding)]
    reference: ReferenceArg,

    /// Program to trace, plus its arguments.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

impl Cli {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            path: self.vibe.clone(),
            parameters: AudioParameters {
                channels: self.channels,
                sample_rate: self.sample_rate,
                sample_format: match self.format {
                    FormatArg::S8 => SampleFormat::Signed8,
                    FormatArg::S16 => SampleFormat::Signed16,
                },
            },
            reference_mode: match self.reference {
                ReferenceArg::Sliding => ReferenceMode::SlidingWindow,
                ReferenceArg::Silence => ReferenceMode::FixedSilence,
            },
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut session = Session::open(&cli.session_config()).context("opening vibe session")?;
    let mut player = AudioPlayer::open(session.parameters()).context("opening audio output")?;

    // The child is forked after the audio stack is up, mirroring the
    // session-before-trace ordering of initialization failures: a missing
    // vibe file never leaves a stopped child behind.
    let child = TracedChild::spawn(&cli.command)?;

    let exit_code = loop {
        session.pace();

        match child.step()? {
            StepOutcome::Stopped => {}
            StepOutcome::Exited(code) => {
                info!(code, "traced program exited");
                break code;
            }
            StepOutcome::Signaled(signal) => {
                warn!(signal = ?signal, "traced program terminated by signal");
                break 128 + signal as i32;
            }
        }

        if let Err(e) = player.update(&mut session) {
            // Pacing still works from already-produced scores; playback
            // trouble is not fatal to the traced program.
            warn!("audio update failed: {e:#}");
        }
    };

    if player.finished() {
        info!("playback completed");
    }

    session.close();
    std::process::exit(exit_code);
}

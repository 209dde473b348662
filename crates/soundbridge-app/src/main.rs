//! # soundbridge
//!
//! Plays an emulated square-wave channel through the audio transport.
//!
//! ```bash
//! soundbridge --seconds 5 --tone-hz 440
//! soundbridge --pacing clock --record tone.wav
//! soundbridge --list-devices
//! ```

mod producer;
mod tone;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use soundbridge_audio::capture::RECORD_LIMIT_SECS;
use soundbridge_audio::output::list_output_devices;
use soundbridge_audio::{AudioSession, WavRecorder};
use soundbridge_core::{Pacing, TransportConfig};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use producer::{Producer, RunPlan};
use tone::SquareWave;

#[derive(Parser)]
#[command(name = "soundbridge")]
#[command(author, version, about = "Stream emulated audio to the default output device")]
struct Args {
    /// Config file (defaults to the user config directory)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// How long to play, in seconds
    #[arg(long, short = 's', default_value = "5")]
    seconds: u64,

    /// Square-wave frequency in Hz
    #[arg(long, default_value = "440")]
    tone_hz: f64,

    /// Record produced audio to a WAV file (first minute only)
    #[arg(long, short = 'r')]
    record: Option<PathBuf>,

    /// Override the pacing mode
    #[arg(long, value_enum)]
    pacing: Option<PacingArg>,

    /// Fixed device buffer size in frames
    #[arg(long)]
    quantum: Option<u32>,

    /// Pause output for one second after this many seconds
    #[arg(long)]
    pause_at: Option<u64>,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    write_config: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum PacingArg {
    Audio,
    Clock,
}

impl From<PacingArg> for Pacing {
    fn from(arg: PacingArg) -> Self {
        match arg {
            PacingArg::Audio => Self::Audio,
            PacingArg::Clock => Self::Clock,
        }
    }
}

impl Args {
    fn load_config(&self) -> Result<TransportConfig> {
        let mut config = match &self.config {
            Some(path) => TransportConfig::load_from(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => TransportConfig::load().context("Failed to load config")?,
        };

        if let Some(pacing) = self.pacing {
            config.pacing = pacing.into();
        }
        if self.quantum.is_some() {
            config.quantum_frames = self.quantum;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soundbridge=info,soundbridge_audio=info".into()),
        )
        .init();

    let args = Args::parse();
    info!("Starting soundbridge v{}", env!("CARGO_PKG_VERSION"));

    if args.list_devices {
        for device in list_output_devices()? {
            println!("{device}");
        }
        return Ok(());
    }

    let config = args.load_config()?;

    if args.write_config {
        let path = match &args.config {
            Some(path) => {
                config.save_to(path)?;
                path.clone()
            }
            None => config.save()?,
        };
        info!("Wrote config to {}", path.display());
        return Ok(());
    }

    let mut session = AudioSession::initialize(&config)
        .inspect_err(|e| {
            if e.is_device_error() {
                warn!("No usable output device; try --list-devices");
            }
        })
        .context("Failed to start audio")?;
    let sender = session
        .take_sender()
        .context("Producer handle already taken")?;
    info!("Playing a {} Hz tone on {}", args.tone_hz, session.device_name());

    let recorder = args
        .record
        .as_ref()
        .map(|path| {
            WavRecorder::create(
                path,
                config.producer_rate,
                session.consumer_rate(),
                config.encoding,
                RECORD_LIMIT_SECS,
            )
        })
        .transpose()?;

    let source = SquareWave::new(config.producer_rate, args.tone_hz, config.encoding);
    let mut producer = Producer::new(source, sender, recorder);

    let started = Instant::now();
    let plan = RunPlan {
        deadline: started + Duration::from_secs(args.seconds),
        pause_at: args.pause_at.map(|secs| started + Duration::from_secs(secs)),
    };

    match config.pacing {
        Pacing::Audio => {
            let demand = session
                .take_demand()
                .context("Audio pacing requested but no demand channel")?;
            producer.run_on_demand(&session, &demand, plan)?;
        }
        Pacing::Clock => producer.run_on_clock(&session, config.refresh_rate, plan)?,
    }

    if let Some(samples) = producer.finish()? {
        info!("Recorded {samples} samples");
    }

    session.shutdown()?;
    let totals = session.diagnostics();
    info!(
        "Done: {} samples in, {} dropped, {} underrun quanta",
        totals.received_samples, totals.dropped_samples, totals.underrun_quanta
    );

    Ok(())
}

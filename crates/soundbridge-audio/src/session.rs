//! Audio session owning the device stream and the transport behind it.
//!
//! `initialize` builds the ring buffer, bridge, and renderer, then moves them
//! into the device callback on a dedicated thread (cpal streams are not
//! `Send`). The caller keeps only the producer half of the bridge and a view
//! of the diagnostic counters.

use crate::bridge::{demand_channel, producer_bridge, BatchSender, DemandReceiver};
use crate::buffer::SampleRingBuffer;
use crate::diagnostics::{Diagnostics, DiagnosticsSnapshot, SharedDiagnostics};
use crate::output::{AudioOutput, OutputConfig};
use crate::render::{AudioRenderer, RenderContext};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use soundbridge_core::{Error, Pacing, Result, TransportConfig};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// Pending demand notifications held before the callback starts coalescing.
const DEMAND_SLOTS: usize = 64;

/// Lifecycle state of an audio session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Running,
    Paused,
    Closed,
}

/// Commands served by the session thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionCommand {
    Pause,
    Resume,
    Shutdown,
}

/// A running audio output fed by one producer.
pub struct AudioSession {
    command_tx: Sender<SessionCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
    state: Arc<RwLock<SessionState>>,
    diagnostics: SharedDiagnostics,
    sender: Option<BatchSender>,
    demand: Option<DemandReceiver>,
    device_name: String,
    /// Rate the device granted; may differ from the configured one.
    consumer_rate: u32,
}

impl AudioSession {
    /// Allocate the transport and start the default output device.
    ///
    /// Returns once the device is playing, or with the error that kept it
    /// from starting. Nothing is left running on failure.
    pub fn initialize(config: &TransportConfig) -> Result<Self> {
        config.validate()?;

        let diagnostics = Diagnostics::shared();
        let (sender, receiver) = producer_bridge(diagnostics.clone());
        let renderer = AudioRenderer::new(config.rate(), config.encoding, diagnostics.clone());
        let mut context = RenderContext::new(SampleRingBuffer::new(config.capacity_samples), receiver, renderer);

        let demand = match config.pacing {
            Pacing::Audio => {
                let (demand_tx, demand_rx) = demand_channel(DEMAND_SLOTS);
                context = context.with_demand(demand_tx);
                Some(demand_rx)
            }
            Pacing::Clock => None,
        };

        debug!(
            "Initializing audio session: {} samples, {:.1} Hz -> {} Hz",
            config.capacity_samples, config.producer_rate, config.consumer_rate
        );

        let (command_tx, command_rx) = unbounded();
        let (ready_tx, ready_rx) = bounded(1);
        let state = Arc::new(RwLock::new(SessionState::Running));
        let output_config = OutputConfig::from(config);
        let state_clone = state.clone();

        let worker = std::thread::Builder::new()
            .name("audio-session".to_string())
            .spawn(move || {
                // Create audio output inside the worker thread (cpal::Stream is not Send)
                match AudioOutput::new(context, output_config) {
                    Ok(output) => {
                        let _ = ready_tx.send(Ok((
                            output.device_name().to_string(),
                            output.sample_rate(),
                            output.channels(),
                        )));
                        SessionWorker {
                            command_rx,
                            state: state_clone,
                            output,
                        }
                        .run();
                    }
                    Err(e) => {
                        error!("Failed to initialize audio output: {e}");
                        *state_clone.write() = SessionState::Closed;
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })
            .map_err(|e| Error::AudioOutput(format!("Failed to spawn session thread: {e}")))?;

        let (device_name, consumer_rate, channels) = match ready_rx.recv() {
            Ok(Ok(started)) => started,
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(Error::AudioOutput(
                    "Session thread exited during startup".to_string(),
                ));
            }
        };

        info!("Audio session started on {device_name}: {consumer_rate} Hz, {channels} channel(s)");

        Ok(Self {
            command_tx,
            worker: Mutex::new(Some(worker)),
            state,
            diagnostics,
            sender: Some(sender),
            demand,
            device_name,
            consumer_rate,
        })
    }

    /// Take the producer half of the bridge. There is exactly one.
    pub fn take_sender(&mut self) -> Option<BatchSender> {
        self.sender.take()
    }

    /// Take the demand listener. Only present with audio pacing.
    pub fn take_demand(&mut self) -> Option<DemandReceiver> {
        self.demand.take()
    }

    /// Get the current session state.
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Output rate in Hz the device is running at.
    pub const fn consumer_rate(&self) -> u32 {
        self.consumer_rate
    }

    /// Current diagnostic counters.
    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    /// Stop the render callback, keeping buffered audio.
    pub fn pause(&self) -> Result<()> {
        self.send_command(SessionCommand::Pause)
    }

    /// Restart the render callback.
    pub fn resume(&self) -> Result<()> {
        self.send_command(SessionCommand::Resume)
    }

    /// Stop the device and release the transport. Safe to call repeatedly.
    pub fn shutdown(&self) -> Result<()> {
        let Some(worker) = self.worker.lock().take() else {
            return Ok(());
        };

        let _ = self.command_tx.send(SessionCommand::Shutdown);
        worker
            .join()
            .map_err(|_| Error::AudioOutput("Session thread panicked".to_string()))?;

        *self.state.write() = SessionState::Closed;
        info!("Audio session closed: {:?}", self.diagnostics.snapshot());
        Ok(())
    }

    fn send_command(&self, command: SessionCommand) -> Result<()> {
        if self.state() == SessionState::Closed {
            return Err(Error::SessionClosed);
        }
        self.command_tx
            .send(command)
            .map_err(|_| Error::SessionClosed)
    }
}

impl Drop for AudioSession {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Audio session shutdown failed: {e}");
        }
    }
}

/// Owns the output stream for the lifetime of the session thread.
struct SessionWorker {
    command_rx: Receiver<SessionCommand>,
    state: Arc<RwLock<SessionState>>,
    output: AudioOutput,
}

impl SessionWorker {
    fn run(self) {
        debug!("Audio session worker started");

        for command in &self.command_rx {
            match command {
                SessionCommand::Pause => match self.output.pause() {
                    Ok(()) => self.set_state(SessionState::Paused),
                    Err(e) => warn!("{e}"),
                },
                SessionCommand::Resume => match self.output.resume() {
                    Ok(()) => self.set_state(SessionState::Running),
                    Err(e) => warn!("{e}"),
                },
                SessionCommand::Shutdown => break,
            }
        }

        debug!("Audio session worker stopping");
        // Dropping the output stops the callback and frees the ring buffer.
        drop(self.output);
    }

    fn set_state(&self, new_state: SessionState) {
        let old_state = std::mem::replace(&mut *self.state.write(), new_state);
        if old_state != new_state {
            debug!("Session state changed: {:?} -> {:?}", old_state, new_state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_default() {
        assert_eq!(SessionState::default(), SessionState::Running);
    }

    #[test]
    fn test_initialize_rejects_invalid_config() {
        let config = TransportConfig {
            capacity_samples: 0,
            ..TransportConfig::default()
        };
        assert!(matches!(
            AudioSession::initialize(&config),
            Err(Error::InvalidArgument(_))
        ));
    }

    // Note: starting a session requires audio hardware
    // and may fail in CI environments without audio devices
}

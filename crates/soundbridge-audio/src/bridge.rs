//! One-way hand-off of sample batches from the emulation thread to the audio
//! callback, plus the demand signal flowing the other way.
//!
//! Contract: exactly one [`BatchSender`] and one [`BatchReceiver`] per bridge.
//! The receiver is owned by the audio callback, which applies pending batches
//! only between render quanta. Neither side ever blocks on the other, and no
//! batch is refused: overflow is resolved by the ring buffer evicting its
//! oldest samples.
//!
//! Applied batches travel back to the producer over a bounded recycle channel
//! so the callback does not free them. When that channel is full the batch is
//! dropped in the callback. The unbounded channel also releases its internal
//! blocks on the receiving side as they are emptied.

use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use soundbridge_core::Sample;
use tracing::{debug, trace};

use crate::buffer::SampleRingBuffer;
use crate::diagnostics::SharedDiagnostics;

/// Emptied batches held for reuse by the producer.
const RECYCLE_SLOTS: usize = 64;

/// Create a bridge. Every sent batch is delivered exactly once, in order.
pub fn producer_bridge(diagnostics: SharedDiagnostics) -> (BatchSender, BatchReceiver) {
    let (tx, rx) = unbounded();
    let (recycle_tx, recycle_rx) = bounded(RECYCLE_SLOTS);

    (
        BatchSender {
            tx,
            recycled: recycle_rx,
            disconnected: false,
        },
        BatchReceiver {
            rx,
            recycle: recycle_tx,
            diagnostics,
        },
    )
}

/// Producer half of the bridge.
#[derive(Debug)]
pub struct BatchSender {
    tx: Sender<Vec<Sample>>,
    recycled: Receiver<Vec<Sample>>,
    disconnected: bool,
}

impl BatchSender {
    /// An empty batch to fill, reusing one the callback already applied when
    /// available.
    pub fn batch(&self) -> Vec<Sample> {
        self.recycled.try_recv().unwrap_or_default()
    }

    /// Hand a batch over to the audio callback.
    ///
    /// Never blocks and never refuses a batch while the callback is alive.
    /// Returns `false` once the callback is gone and batches are discarded.
    pub fn send(&mut self, batch: Vec<Sample>) -> bool {
        if batch.is_empty() {
            return true;
        }

        let len = batch.len();
        match self.tx.send(batch) {
            Ok(()) => {
                trace!("Queued batch of {len} samples");
                true
            }
            Err(_) => {
                if !self.disconnected {
                    debug!("Audio callback gone, discarding batches from now on");
                    self.disconnected = true;
                }
                false
            }
        }
    }

    /// Number of batches waiting for the audio callback.
    pub fn pending(&self) -> usize {
        self.tx.len()
    }
}

/// What one call to [`BatchReceiver::drain_into`] applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    pub batches: usize,
    pub samples: usize,
    /// Samples lost to overwrite-on-overflow while applying.
    pub lost: usize,
}

/// Consumer half of the bridge, owned by the audio callback.
#[derive(Debug)]
pub struct BatchReceiver {
    rx: Receiver<Vec<Sample>>,
    recycle: Sender<Vec<Sample>>,
    diagnostics: SharedDiagnostics,
}

impl BatchReceiver {
    /// Apply every pending batch to `buffer` in send order.
    pub fn drain_into(&mut self, buffer: &mut SampleRingBuffer) -> DrainStats {
        let mut stats = DrainStats::default();

        loop {
            match self.rx.try_recv() {
                Ok(mut batch) => {
                    stats.batches += 1;
                    stats.samples += batch.len();
                    stats.lost += buffer.push_back(&batch);

                    batch.clear();
                    // A full recycle channel means the producer has plenty.
                    let _ = self.recycle.try_send(batch);
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }

        if stats.batches > 0 {
            self.diagnostics.record_received(stats.samples);
            self.diagnostics.record_dropped(stats.lost);
        }
        stats
    }
}

/// Create the demand channel. The audio callback reports rendered frames,
/// the producer waits on them.
pub fn demand_channel(slots: usize) -> (DemandSender, DemandReceiver) {
    let (tx, rx) = bounded(slots.max(1));
    (DemandSender { tx, backlog: 0 }, DemandReceiver { rx })
}

/// Callback-side demand reporter.
#[derive(Debug)]
pub struct DemandSender {
    tx: Sender<usize>,
    /// Frames not yet delivered because the channel was full.
    backlog: usize,
}

impl DemandSender {
    /// Report that `frames` output frames were rendered. Never blocks; demand
    /// that does not fit is carried into the next notification.
    pub fn notify(&mut self, frames: usize) {
        let total = self.backlog + frames;
        match self.tx.try_send(total) {
            Ok(()) => self.backlog = 0,
            Err(TrySendError::Full(_)) => self.backlog = total,
            Err(TrySendError::Disconnected(_)) => self.backlog = 0,
        }
    }
}

/// Outcome of waiting for demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demand {
    /// Frames rendered since the last collection.
    Frames(usize),
    Timeout,
    /// The audio side has gone away.
    Closed,
}

/// Producer-side demand listener.
#[derive(Debug)]
pub struct DemandReceiver {
    rx: Receiver<usize>,
}

impl DemandReceiver {
    /// Wait up to `timeout` for demand, then collect everything pending.
    pub fn wait(&self, timeout: Duration) -> Demand {
        match self.rx.recv_timeout(timeout) {
            Ok(frames) => Demand::Frames(frames + self.take()),
            Err(RecvTimeoutError::Timeout) => Demand::Timeout,
            Err(RecvTimeoutError::Disconnected) => Demand::Closed,
        }
    }

    /// Collect pending demand without waiting.
    pub fn take(&self) -> usize {
        self.rx.try_iter().sum()
    }
}

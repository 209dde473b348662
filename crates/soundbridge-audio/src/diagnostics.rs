//! Degradation counters shared between the audio callback and the UI.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cumulative transport counters.
///
/// Written from the audio callback and the producer with relaxed atomics;
/// readers get a best-effort view through [`Diagnostics::snapshot`].
#[derive(Debug, Default)]
pub struct Diagnostics {
    dropped_samples: AtomicU64,
    underrun_quanta: AtomicU64,
    stretched_quanta: AtomicU64,
    rendered_quanta: AtomicU64,
    received_samples: AtomicU64,
    consumed_samples: AtomicU64,
}

/// Point-in-time copy of [`Diagnostics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    /// Samples lost to overflow eviction or a full bridge.
    pub dropped_samples: u64,
    /// Quanta rendered as silence because the buffer was empty.
    pub underrun_quanta: u64,
    /// Quanta stretched from fewer samples than the rate ratio asks for.
    pub stretched_quanta: u64,
    pub rendered_quanta: u64,
    pub received_samples: u64,
    pub consumed_samples: u64,
}

/// Thread-safe reference to the counters.
pub type SharedDiagnostics = Arc<Diagnostics>;

impl Diagnostics {
    pub fn shared() -> SharedDiagnostics {
        Arc::new(Self::default())
    }

    pub(crate) fn record_dropped(&self, samples: usize) {
        if samples > 0 {
            self.dropped_samples
                .fetch_add(samples as u64, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_received(&self, samples: usize) {
        self.received_samples
            .fetch_add(samples as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_underrun(&self) {
        self.underrun_quanta.fetch_add(1, Ordering::Relaxed);
        self.rendered_quanta.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_quantum(&self, consumed: usize, stretched: bool) {
        if stretched {
            self.stretched_quanta.fetch_add(1, Ordering::Relaxed);
        }
        self.rendered_quanta.fetch_add(1, Ordering::Relaxed);
        self.consumed_samples
            .fetch_add(consumed as u64, Ordering::Relaxed);
    }

    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples.load(Ordering::Relaxed)
    }

    pub fn underrun_quanta(&self) -> u64 {
        self.underrun_quanta.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            dropped_samples: self.dropped_samples(),
            underrun_quanta: self.underrun_quanta(),
            stretched_quanta: self.stretched_quanta.load(Ordering::Relaxed),
            rendered_quanta: self.rendered_quanta.load(Ordering::Relaxed),
            received_samples: self.received_samples.load(Ordering::Relaxed),
            consumed_samples: self.consumed_samples.load(Ordering::Relaxed),
        }
    }
}

impl DiagnosticsSnapshot {
    /// Counter growth since an earlier snapshot.
    pub const fn since(&self, earlier: &Self) -> Self {
        Self {
            dropped_samples: self.dropped_samples.saturating_sub(earlier.dropped_samples),
            underrun_quanta: self.underrun_quanta.saturating_sub(earlier.underrun_quanta),
            stretched_quanta: self.stretched_quanta.saturating_sub(earlier.stretched_quanta),
            rendered_quanta: self.rendered_quanta.saturating_sub(earlier.rendered_quanta),
            received_samples: self.received_samples.saturating_sub(earlier.received_samples),
            consumed_samples: self.consumed_samples.saturating_sub(earlier.consumed_samples),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let diagnostics = Diagnostics::default();
        diagnostics.record_dropped(10);
        diagnostics.record_dropped(0);
        diagnostics.record_underrun();
        diagnostics.record_quantum(64, true);
        diagnostics.record_quantum(128, false);
        diagnostics.record_received(300);

        let snapshot = diagnostics.snapshot();
        assert_eq!(snapshot.dropped_samples, 10);
        assert_eq!(snapshot.underrun_quanta, 1);
        assert_eq!(snapshot.stretched_quanta, 1);
        assert_eq!(snapshot.rendered_quanta, 3);
        assert_eq!(snapshot.consumed_samples, 192);
        assert_eq!(snapshot.received_samples, 300);
    }

    #[test]
    fn test_snapshot_delta() {
        let diagnostics = Diagnostics::default();
        diagnostics.record_underrun();
        let first = diagnostics.snapshot();
        diagnostics.record_underrun();
        diagnostics.record_dropped(5);

        let delta = diagnostics.snapshot().since(&first);
        assert_eq!(delta.underrun_quanta, 1);
        assert_eq!(delta.rendered_quanta, 1);
        assert_eq!(delta.dropped_samples, 5);
    }
}

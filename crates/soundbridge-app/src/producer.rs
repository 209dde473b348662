//! Emulation loop feeding the audio session.

use std::time::{Duration, Instant};

use soundbridge_audio::{AudioSession, BatchSender, Demand, DemandReceiver, DiagnosticsSnapshot, WavRecorder};
use soundbridge_core::{RateRatio, Result, SampleSource};
use tracing::{debug, info, warn};

use crate::tone::SquareWave;

/// How long to wait for demand before checking the clock again.
const DEMAND_POLL: Duration = Duration::from_millis(100);
const REPORT_INTERVAL: Duration = Duration::from_secs(1);
/// How long a scheduled pause lasts.
const PAUSE_LENGTH: Duration = Duration::from_secs(1);

/// When to stop, and optionally when to pause once.
#[derive(Debug, Clone, Copy)]
pub struct RunPlan {
    pub deadline: Instant,
    pub pause_at: Option<Instant>,
}

/// Drives the emulated source and hands each batch to the session.
pub struct Producer {
    source: SquareWave,
    sender: BatchSender,
    recorder: Option<WavRecorder>,
    /// Fractional samples carried between steps.
    owed: f64,
    batches: u64,
}

impl Producer {
    pub const fn new(source: SquareWave, sender: BatchSender, recorder: Option<WavRecorder>) -> Self {
        Self {
            source,
            sender,
            recorder,
            owed: 0.0,
            batches: 0,
        }
    }

    /// Emulate `samples` worth of producer time (fractions carry over) and
    /// send whatever the source emitted. Returns the batch size.
    pub fn step(&mut self, samples: f64) -> Result<usize> {
        self.owed += samples;
        let whole = self.owed.floor();
        self.owed -= whole;
        self.source.emulate(whole as usize);

        let mut batch = self.sender.batch();
        batch.reserve(self.source.pending());
        self.source.produce_samples(&mut batch);
        let len = batch.len();
        if len == 0 {
            return Ok(0);
        }

        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record(&batch)?;
        }
        self.sender.send(batch);
        self.batches += 1;
        Ok(len)
    }

    /// Emulate in response to rendered frames until the deadline.
    pub fn run_on_demand(
        &mut self,
        session: &AudioSession,
        demand: &DemandReceiver,
        plan: RunPlan,
    ) -> Result<()> {
        let rate = RateRatio::new(self.source.producer_rate(), session.consumer_rate());
        let mut monitor = Monitor::new(session, plan);
        info!("Pacing emulation on device demand ({:.2} samples per frame)", rate.ratio());

        while !monitor.tick()? {
            match demand.wait(DEMAND_POLL) {
                Demand::Frames(frames) => {
                    self.step(frames as f64 * rate.ratio())?;
                }
                Demand::Timeout => {}
                Demand::Closed => {
                    warn!("Audio device stopped requesting samples");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Emulate one video frame per display refresh until the deadline.
    pub fn run_on_clock(&mut self, session: &AudioSession, refresh_rate: u32, plan: RunPlan) -> Result<()> {
        let frame = Duration::from_secs(1) / refresh_rate.max(1);
        let samples_per_frame = self.source.producer_rate() / f64::from(refresh_rate.max(1));
        let mut monitor = Monitor::new(session, plan);
        let mut next = Instant::now();
        info!("Pacing emulation at {refresh_rate} Hz ({samples_per_frame:.1} samples per frame)");

        while !monitor.tick()? {
            if !monitor.paused {
                self.step(samples_per_frame)?;
            }
            next += frame;
            let now = Instant::now();
            if next > now {
                std::thread::sleep(next - now);
            } else {
                // Fell behind; skip ahead instead of bursting.
                next = now;
            }
        }
        Ok(())
    }

    /// Close the recording, if any. Returns samples recorded.
    pub fn finish(self) -> Result<Option<usize>> {
        debug!("Producer sent {} batches", self.batches);
        self.recorder.map(WavRecorder::finish).transpose()
    }
}

/// Tracks the run plan and logs diagnostics once per second.
struct Monitor<'a> {
    session: &'a AudioSession,
    plan: RunPlan,
    paused: bool,
    resume_at: Option<Instant>,
    last_report: Instant,
    last_snapshot: DiagnosticsSnapshot,
}

impl<'a> Monitor<'a> {
    fn new(session: &'a AudioSession, plan: RunPlan) -> Self {
        Self {
            session,
            plan,
            paused: false,
            resume_at: None,
            last_report: Instant::now(),
            last_snapshot: session.diagnostics(),
        }
    }

    /// Returns `true` once the run is over.
    fn tick(&mut self) -> Result<bool> {
        let now = Instant::now();

        if self.plan.pause_at.is_some_and(|at| now >= at) {
            self.plan.pause_at = None;
            info!("Pausing audio for {PAUSE_LENGTH:?}");
            self.session.pause()?;
            self.paused = true;
            self.resume_at = Some(now + PAUSE_LENGTH);
        }
        if self.resume_at.is_some_and(|at| now >= at) {
            self.resume_at = None;
            info!("Resuming audio");
            self.session.resume()?;
            self.paused = false;
        }

        if now.duration_since(self.last_report) >= REPORT_INTERVAL {
            let snapshot = self.session.diagnostics();
            let delta = snapshot.since(&self.last_snapshot);
            info!(
                "audio: {} quanta, {} underruns, {} stretched, {} dropped, {} samples in",
                delta.rendered_quanta,
                delta.underrun_quanta,
                delta.stretched_quanta,
                delta.dropped_samples,
                delta.received_samples
            );
            self.last_snapshot = snapshot;
            self.last_report = now;
        }

        Ok(now >= self.plan.deadline)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use soundbridge_audio::{producer_bridge, Diagnostics, SampleRingBuffer};
    use soundbridge_core::SampleEncoding;

    #[test]
    fn test_step_carries_fractions() {
        let (sender, mut receiver) = producer_bridge(Diagnostics::shared());
        let wave = SquareWave::new(8.0, 1.0, SampleEncoding::Unsigned);
        let mut producer = Producer::new(wave, sender, None);

        assert_eq!(producer.step(0.5).unwrap(), 0);
        assert_eq!(producer.step(0.75).unwrap(), 1);
        assert_eq!(producer.step(2.75).unwrap(), 3);

        let mut buffer = SampleRingBuffer::new(16);
        let stats = receiver.drain_into(&mut buffer);
        assert_eq!(stats.batches, 2);
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_step_records_batches() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        let recorder = WavRecorder::create(&path, 8.0, 8, SampleEncoding::Unsigned, 60).unwrap();

        let (sender, _receiver) = producer_bridge(Diagnostics::shared());
        let wave = SquareWave::new(8.0, 1.0, SampleEncoding::Unsigned);
        let mut producer = Producer::new(wave, sender, Some(recorder));

        producer.step(8.0).unwrap();
        assert_eq!(producer.finish().unwrap(), Some(8));
    }
}

//! Detection polling loop with single-flight and generation cancellation.

use std::sync::Arc;

use watcher_alert::AlertDispatcher;
use watcher_analysis::{AnalysisClient, AnalysisError};
use watcher_capture::{FrameImage, FrameSource};
use watcher_core::{DetectionEntry, ThreatAssessment};
use watcher_store::DetectionLog;

/// Analysis request handed out by [`MonitorLoop::poll_tick`].
///
/// Carries the stream generation it belongs to; results from an older
/// generation are discarded on completion.
#[derive(Debug)]
pub struct PendingAnalysis {
    /// Stream generation at dispatch time.
    pub generation: u64,
    /// Capture timestamp, used as the detection id.
    pub capture_id_ms: u64,
    /// Frame bytes to analyze.
    pub frame: FrameImage,
}

/// Outcome of one polling tick.
#[derive(Debug)]
pub enum TickAction {
    /// Stream is not running; nothing sampled.
    Idle,
    /// A previous analysis is still outstanding; this tick is dropped.
    Skipped,
    /// Frame source produced nothing; no analysis dispatched.
    NoFrame,
    /// Frame sampled; caller must run the analysis and report back via
    /// [`MonitorLoop::apply_analysis`].
    Dispatch(PendingAnalysis),
}

/// Caller-driven polling loop owning the detection log and alert policy.
///
/// Ticks arrive on the caller's cadence. Each tick samples at most one frame,
/// and at most one analysis is outstanding at any time.
pub struct MonitorLoop {
    frame_source: Arc<dyn FrameSource>,
    log: DetectionLog,
    dispatcher: AlertDispatcher,
    streaming: bool,
    in_flight: bool,
    generation: u64,
}

impl MonitorLoop {
    /// Creates a stopped loop around a frame source, log, and dispatcher.
    pub fn new(
        frame_source: Arc<dyn FrameSource>,
        log: DetectionLog,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            frame_source,
            log,
            dispatcher,
            streaming: false,
            in_flight: false,
            generation: 0,
        }
    }

    /// Starts the monitoring stream.
    pub fn start_stream(&mut self) {
        if self.streaming {
            return;
        }
        self.streaming = true;
        log::info!("monitoring stream started (generation {})", self.generation);
    }

    /// Stops the stream and cancels any outstanding analysis.
    ///
    /// The generation bump makes an in-flight result stale; it is discarded
    /// without touching the log when it eventually completes.
    pub fn stop_stream(&mut self) {
        if !self.streaming {
            return;
        }
        self.streaming = false;
        self.in_flight = false;
        self.generation = self.generation.wrapping_add(1);
        log::info!("monitoring stream stopped");
    }

    /// Returns `true` while the stream is running.
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Returns `true` while an analysis request is outstanding.
    pub fn analysis_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Read access to the detection log.
    pub fn log(&self) -> &DetectionLog {
        &self.log
    }

    /// Clears the detection log and its persisted snapshot.
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Returns `true` when the alert dispatcher has an email notifier.
    pub fn email_configured(&self) -> bool {
        self.dispatcher.email_configured()
    }

    /// Runs one polling tick, sampling a frame when the loop is free.
    pub fn poll_tick(&mut self, now_ms: u64) -> TickAction {
        if !self.streaming {
            return TickAction::Idle;
        }
        if self.in_flight {
            log::debug!("analysis still outstanding, tick at {now_ms} dropped");
            return TickAction::Skipped;
        }
        if !self.frame_source.is_active() {
            return TickAction::NoFrame;
        }
        let Some(frame) = self.frame_source.capture_frame(now_ms) else {
            return TickAction::NoFrame;
        };

        self.in_flight = true;
        TickAction::Dispatch(PendingAnalysis {
            generation: self.generation,
            capture_id_ms: frame.captured_at_ms,
            frame,
        })
    }

    /// Applies one analysis outcome in tick order.
    ///
    /// Stale results (dispatched before the last [`stop_stream`]) are
    /// discarded entirely. A fresh success appends the assessment entry
    /// first, then the dispatcher's side-effect entries; a fresh failure
    /// appends one system entry and the loop keeps polling.
    ///
    /// [`stop_stream`]: MonitorLoop::stop_stream
    pub fn apply_analysis(
        &mut self,
        pending: PendingAnalysis,
        outcome: Result<ThreatAssessment, AnalysisError>,
        now_ms: u64,
    ) {
        if pending.generation != self.generation {
            log::debug!(
                "discarding stale analysis result for capture {}",
                pending.capture_id_ms
            );
            return;
        }
        self.in_flight = false;

        match outcome {
            Ok(assessment) => {
                self.log.append(DetectionEntry::from_assessment(
                    assessment.clone(),
                    pending.capture_id_ms,
                ));
                for entry in self
                    .dispatcher
                    .dispatch(&assessment, pending.capture_id_ms, now_ms)
                {
                    self.log.append(entry);
                }
            }
            Err(error) => {
                let text = if error.is_unreachable() {
                    "Analysis service unreachable".to_string()
                } else {
                    format!("Analysis failed: {}", error.reason())
                };
                log::warn!("analysis tick failed: {error}");
                self.log.append(DetectionEntry::system(text, now_ms));
            }
        }
    }

    /// Convenience tick: polls, runs the analysis synchronously, and applies
    /// the outcome.
    pub fn run_tick(&mut self, client: &AnalysisClient, now_ms: u64) {
        if let TickAction::Dispatch(pending) = self.poll_tick(now_ms) {
            let outcome = client.analyze(&pending.frame.bytes);
            self.apply_analysis(pending, outcome, now_ms);
        }
    }
}

#![warn(missing_docs)]
//! # watcher-capture
//!
//! ## Purpose
//! Provides the frame-sampling abstraction feeding the analysis loop.
//!
//! ## Responsibilities
//! - Define a source-agnostic frame capture trait.
//! - Expose deterministic synthetic capture for CI and unit tests.
//! - Provide fixed-interval scheduling helpers used by the monitor loop.
//! - Encode captured stills as base64 for snapshot payloads.
//!
//! ## Data flow
//! The monitor loop asks the attached [`FrameSource`] for a still on each
//! tick; encoded bytes flow to the analysis client and, on qualification, to
//! report snapshots.
//!
//! ## Ownership and lifetimes
//! Captured frames are owned values with independent buffers; no borrowed
//! frame memory escapes source boundaries.
//!
//! ## Error model
//! A missing/inactive source is a normal, checked condition reported as
//! `None`, never an error. Invalid sampling intervals are [`CaptureError`]
//! values.
//!
//! ## Security and privacy notes
//! Sources must release transient encode buffers synchronously; nothing in
//! this crate persists raw frame bytes.

use std::sync::Mutex;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use thiserror::Error;

/// Encoded still image handed to the analysis service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameImage {
    /// Encoded image bytes (JPEG payload).
    pub bytes: Vec<u8>,
    /// Capture time in Unix epoch milliseconds.
    pub captured_at_ms: u64,
}

/// Trait implemented by concrete frame providers.
pub trait FrameSource: Send + Sync {
    /// Captures one still from the currently active video source.
    ///
    /// Returns `None` when no active source is attached. This is the normal
    /// signal for disabling capture-dependent controls, not a failure.
    fn capture_frame(&self, captured_at_ms: u64) -> Option<FrameImage>;

    /// Returns `true` while a video source is attached and producing frames.
    fn is_active(&self) -> bool;
}

/// Sampling configuration used by the monitor loop scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Interval between analysis ticks in milliseconds.
    pub interval_ms: u64,
}

impl SamplerConfig {
    /// Creates validated sampler configuration.
    ///
    /// # Errors
    /// Returns [`CaptureError::InvalidInterval`] when `interval_ms == 0`.
    pub fn new(interval_ms: u64) -> Result<Self, CaptureError> {
        if interval_ms == 0 {
            return Err(CaptureError::InvalidInterval);
        }
        Ok(Self { interval_ms })
    }
}

/// Computes deterministic tick timestamps for a fixed sampling interval.
///
/// # Returns
/// Vector of `count` timestamps starting at `start_ms` with `interval_ms`
/// spacing.
pub fn scheduled_sample_times(config: SamplerConfig, start_ms: u64, count: usize) -> Vec<u64> {
    (0..count)
        .map(|index| start_ms.saturating_add(config.interval_ms.saturating_mul(index as u64)))
        .collect()
}

/// Encodes still-image bytes as standard base64 for snapshot payloads.
pub fn frame_to_base64(bytes: &[u8]) -> String {
    BASE64_STANDARD.encode(bytes)
}

/// Deterministic synthetic source for test and CI usage.
///
/// Produces a small distinct payload per capture and supports toggling the
/// attached-source state to exercise the missing-source path.
#[derive(Debug)]
pub struct SyntheticFrameSource {
    active: Mutex<bool>,
    sequence: Mutex<u64>,
}

impl SyntheticFrameSource {
    /// Creates an active synthetic source.
    pub fn new() -> Self {
        Self {
            active: Mutex::new(true),
            sequence: Mutex::new(0),
        }
    }

    /// Creates a detached synthetic source (captures return `None`).
    pub fn detached() -> Self {
        Self {
            active: Mutex::new(false),
            sequence: Mutex::new(0),
        }
    }

    /// Attaches or detaches the simulated video source.
    pub fn set_active(&self, active: bool) {
        if let Ok(mut guard) = self.active.lock() {
            *guard = active;
        }
    }

    /// Returns how many frames this source has produced.
    pub fn frames_produced(&self) -> u64 {
        self.sequence.lock().map(|guard| *guard).unwrap_or(0)
    }
}

impl Default for SyntheticFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for SyntheticFrameSource {
    fn capture_frame(&self, captured_at_ms: u64) -> Option<FrameImage> {
        if !self.is_active() {
            return None;
        }

        let mut sequence = self.sequence.lock().ok()?;
        *sequence += 1;

        let byte = (*sequence % 255) as u8;
        Some(FrameImage {
            bytes: vec![byte; 16],
            captured_at_ms,
        })
    }

    fn is_active(&self) -> bool {
        self.active.lock().map(|guard| *guard).unwrap_or(false)
    }
}

/// Capture layer error type.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Sampling interval must be positive.
    #[error("invalid sampling interval: must be greater than zero")]
    InvalidInterval,
}

#[cfg(test)]
mod tests {
    //! Unit tests for synthetic source behavior.

    use super::*;

    #[test]
    fn synthetic_source_produces_frames_while_active() {
        let source = SyntheticFrameSource::new();
        let frame = source.capture_frame(42).expect("capture should work");
        assert_eq!(frame.captured_at_ms, 42);
        assert_eq!(source.frames_produced(), 1);
    }

    #[test]
    fn detached_source_returns_none_without_error() {
        let source = SyntheticFrameSource::detached();
        assert!(source.capture_frame(42).is_none());
        assert_eq!(source.frames_produced(), 0);
    }

    #[test]
    fn scheduled_sample_times_are_evenly_spaced() {
        let config = SamplerConfig::new(3_000).expect("config should build");
        let times = scheduled_sample_times(config, 1_000, 3);
        assert_eq!(times, vec![1_000, 4_000, 7_000]);
    }
}

//! Diagnostics sink for the detection loop.
//!
//! The loop reports what it does through [`ScanObserver::on_event`] and asks
//! [`ScanObserver::should_continue`] before every iteration, so callers can
//! log, record or cancel a scan without the core doing any I/O itself.

use std::time::{Duration, Instant};

use notescan_core::Quad;

use crate::verifier::Rejection;

#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    SceneReady {
        keypoints: usize,
    },
    TemplateStarted {
        tag: String,
        template_keypoints: usize,
        live_keypoints: usize,
    },
    Filtered {
        tag: String,
        correspondences: usize,
        good: usize,
        min_distance: Option<f32>,
        threshold: f32,
    },
    Accepted {
        tag: String,
        value: u32,
        corners: Quad,
        inliers: usize,
        consumed: usize,
    },
    Rejected {
        tag: String,
        reason: Rejection,
    },
    Aborted {
        tag: String,
    },
    Finished {
        instances: usize,
        total_value: u64,
        elapsed: Duration,
    },
}

pub trait ScanObserver {
    fn on_event(&mut self, event: &ScanEvent);

    /// Polled before each iteration; returning `false` stops the scan.
    fn should_continue(&self) -> bool {
        true
    }
}

impl<O: ScanObserver + ?Sized> ScanObserver for &mut O {
    fn on_event(&mut self, event: &ScanEvent) {
        (**self).on_event(event)
    }

    fn should_continue(&self) -> bool {
        (**self).should_continue()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ScanObserver for NoopObserver {
    fn on_event(&mut self, _event: &ScanEvent) {}
}

/// Forwards events to the `log` facade
#[derive(Debug, Clone, Default)]
pub struct LogObserver {
    /// Prefix for every record, usually the scene's file name
    pub label: String,
}

impl LogObserver {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl ScanObserver for LogObserver {
    fn on_event(&mut self, event: &ScanEvent) {
        let label = &self.label;
        match event {
            ScanEvent::SceneReady { keypoints } => {
                log::debug!("[{label}] scene has {keypoints} keypoints");
            }
            ScanEvent::TemplateStarted {
                tag,
                template_keypoints,
                live_keypoints,
            } => {
                log::debug!("[{label}] {tag}: {template_keypoints} template vs {live_keypoints} scene keypoints");
            }
            ScanEvent::Filtered {
                tag,
                correspondences,
                good,
                min_distance,
                threshold,
            } => {
                log::debug!(
                    "[{label}] {tag}: {good}/{correspondences} good matches (min distance {:?}, threshold {threshold})",
                    min_distance
                );
            }
            ScanEvent::Accepted {
                tag,
                value,
                inliers,
                consumed,
                ..
            } => {
                log::info!("[{label}] found {tag} ({value}) with {inliers} inliers, {consumed} keypoints consumed");
            }
            ScanEvent::Rejected { tag, reason } => {
                log::debug!("[{label}] {tag}: done, {reason}");
            }
            ScanEvent::Aborted { tag } => {
                log::warn!("[{label}] scan aborted during {tag}");
            }
            ScanEvent::Finished {
                instances,
                total_value,
                elapsed,
            } => {
                log::info!("[{label}] {instances} note(s), total {total_value}, in {elapsed:.2?}");
            }
        }
    }
}

/// Keeps every event, for tests and post-mortem inspection
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    pub events: Vec<ScanEvent>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejections(&self) -> impl Iterator<Item = (&str, &Rejection)> {
        self.events.iter().filter_map(|e| match e {
            ScanEvent::Rejected { tag, reason } => Some((tag.as_str(), reason)),
            _ => None,
        })
    }
}

impl ScanObserver for RecordingObserver {
    fn on_event(&mut self, event: &ScanEvent) {
        self.events.push(event.clone());
    }
}

/// Wraps an observer and stops the scan once a wall-clock budget is spent.
#[derive(Debug, Clone)]
pub struct Deadline<O> {
    inner: O,
    until: Instant,
}

impl<O: ScanObserver> Deadline<O> {
    pub fn new(inner: O, budget: Duration) -> Self {
        Self {
            inner,
            until: Instant::now() + budget,
        }
    }

    pub fn into_inner(self) -> O {
        self.inner
    }
}

impl<O: ScanObserver> ScanObserver for Deadline<O> {
    fn on_event(&mut self, event: &ScanEvent) {
        self.inner.on_event(event)
    }

    fn should_continue(&self) -> bool {
        Instant::now() < self.until && self.inner.should_continue()
    }
}

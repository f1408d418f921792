//! Frame-to-frame correlation of decoded symbols.
//!
//! A track is keyed by format and text, and by location when both sightings
//! carry geometry. One [`Tracker::observe`] call corresponds to one processed
//! frame; tracks not corroborated by that frame lose their streak and move
//! toward expiry.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::config::TrackingConfig;
use crate::models::{Point, ScanResult};

/// Lifecycle of a tracked symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// Seen, not yet corroborated often enough
    Candidate,
    /// Seen in enough consecutive frames to report
    Confirmed,
    /// Silent for too long; removed from the tracker
    Expired,
}

/// A decoded symbol followed across frames
#[derive(Debug, Clone)]
pub struct TrackedDetection {
    /// Tracker-assigned identifier
    pub id: u64,
    /// Symbology identifier
    pub format: String,
    /// Decoded text
    pub code: String,
    /// Last known centre, frame coordinates
    pub center: Option<Point>,
    /// Current state
    pub state: TrackState,
    /// Consecutive frames with a sighting
    pub streak: u32,
    /// Consecutive frames without a sighting
    pub missed: u32,
    /// Most recent corroborating result
    pub last_result: ScanResult,
}

impl TrackedDetection {
    fn matches(&self, format: &str, code: &str, center: Option<Point>, max_distance: f32) -> bool {
        if self.format != format || self.code != code {
            return false;
        }
        match (self.center, center) {
            (Some(a), Some(b)) => a.distance(&b) <= max_distance,
            _ => true,
        }
    }
}

/// What one observation did to the tracked set
#[derive(Debug, Clone, Default)]
pub struct TrackerUpdate {
    /// State of the track the result fed, `None` for failed frames
    pub state: Option<TrackState>,
    /// The track reached `Confirmed` on this frame
    pub newly_confirmed: bool,
    /// Tracks removed on this frame
    pub expired: Vec<TrackedDetection>,
}

impl TrackerUpdate {
    /// The result belongs to a confirmed track and should reach the detected channel
    pub fn is_confirmed(&self) -> bool {
        self.state == Some(TrackState::Confirmed)
    }

    /// Update for an untracked pipeline: every success confirms immediately
    fn passthrough(result: &ScanResult) -> Self {
        if result.is_success() {
            Self {
                state: Some(TrackState::Confirmed),
                newly_confirmed: true,
                expired: Vec::new(),
            }
        } else {
            Self::default()
        }
    }
}

/// Centre of the decoded box, or of the decoding scanline
fn result_center(result: &ScanResult) -> Option<Point> {
    if let Some(corners) = &result.bbox {
        let (sx, sy) = corners
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        return Some(Point::new(sx / 4.0, sy / 4.0));
    }
    result
        .line
        .map(|[a, b]| Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0))
}

/// Candidate/Confirmed/Expired state machine over all live tracks
#[derive(Debug)]
pub struct Tracker {
    options: TrackingConfig,
    tracks: Vec<TrackedDetection>,
    next_id: u64,
    frames: u64,
}

impl Tracker {
    /// Empty tracker
    pub fn new(options: TrackingConfig) -> Self {
        Self {
            options,
            tracks: Vec::new(),
            next_id: 1,
            frames: 0,
        }
    }

    /// Live tracks
    pub fn tracks(&self) -> &[TrackedDetection] {
        &self.tracks
    }

    /// Frames observed so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Drop every track
    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    /// Integrate one frame's result.
    ///
    /// A track confirms on exactly the `confirm_after`-th consecutive
    /// sighting. Confirmed tracks stay confirmed through gaps shorter than
    /// `expire_after` frames; any track silent for `expire_after` frames is
    /// removed.
    pub fn observe(&mut self, result: &ScanResult) -> TrackerUpdate {
        self.frames += 1;
        let mut update = TrackerUpdate::default();
        let mut touched = None;

        if let Some(code_result) = &result.code_result {
            let center = result_center(result);
            let max_distance = self.options.max_center_distance;
            let found = self.tracks.iter().position(|t| {
                t.matches(&code_result.format, &code_result.code, center, max_distance)
            });

            let index = match found {
                Some(i) => {
                    let track = &mut self.tracks[i];
                    track.streak += 1;
                    track.missed = 0;
                    track.center = center.or(track.center);
                    track.last_result = result.clone();
                    i
                }
                None => {
                    self.tracks.push(TrackedDetection {
                        id: self.next_id,
                        format: code_result.format.clone(),
                        code: code_result.code.clone(),
                        center,
                        state: TrackState::Candidate,
                        streak: 1,
                        missed: 0,
                        last_result: result.clone(),
                    });
                    self.next_id += 1;
                    self.tracks.len() - 1
                }
            };

            let track = &mut self.tracks[index];
            if track.state == TrackState::Candidate && track.streak >= self.options.confirm_after {
                track.state = TrackState::Confirmed;
                update.newly_confirmed = true;
                debug!(id = track.id, code = %track.code, format = %track.format, "track confirmed");
            }
            update.state = Some(track.state);
            touched = Some(track.id);
        }

        let expire_after = self.options.expire_after;
        let mut kept = Vec::with_capacity(self.tracks.len());
        for mut track in self.tracks.drain(..) {
            if Some(track.id) == touched {
                kept.push(track);
                continue;
            }
            track.streak = 0;
            track.missed += 1;
            if track.missed >= expire_after {
                track.state = TrackState::Expired;
                debug!(id = track.id, code = %track.code, "track expired");
                update.expired.push(track);
            } else {
                kept.push(track);
            }
        }
        self.tracks = kept;
        update
    }
}

/// Tracker shared by every worker; integrations never interleave.
///
/// Built without tracking, it confirms every successful decode immediately.
#[derive(Debug, Clone)]
pub struct SharedTracker {
    inner: Option<Arc<Mutex<Tracker>>>,
}

impl SharedTracker {
    /// Shared tracker with the given options
    pub fn new(options: TrackingConfig) -> Self {
        Self {
            inner: Some(Arc::new(Mutex::new(Tracker::new(options)))),
        }
    }

    /// No tracking: successes confirm on first sight
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Whether results are correlated across frames
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    fn lock(tracker: &Mutex<Tracker>) -> MutexGuard<'_, Tracker> {
        tracker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Integrate one result atomically
    pub fn observe(&self, result: &ScanResult) -> TrackerUpdate {
        match &self.inner {
            Some(tracker) => Self::lock(tracker).observe(result),
            None => TrackerUpdate::passthrough(result),
        }
    }

    /// Snapshot of the live tracks
    pub fn snapshot(&self) -> Vec<TrackedDetection> {
        match &self.inner {
            Some(tracker) => Self::lock(tracker).tracks().to_vec(),
            None => Vec::new(),
        }
    }
}

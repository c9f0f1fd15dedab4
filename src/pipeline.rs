use anyhow::Result;
use log::{debug, error, info, warn};
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use crate::actions::InputSink;
use crate::config::Profile;
use crate::dispatch::dispatch_gesture;
use crate::gestures::GestureEvent;
use crate::session::{Outcome, Session};
use crate::source::{LandmarkSource, TrackedFrame};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub frames: u64,
    pub fired: u64,
    pub suppressed: u64,
    pub rejected: u64,
}

/// Session plus the sink it drives.
pub struct Pipeline<S: InputSink> {
    session: Session,
    profile: Profile,
    sink: S,
    start: Instant,
    last_now: Option<Instant>,
    stats: RunStats,
}

impl<S: InputSink> Pipeline<S> {
    pub fn new(profile: Profile, sink: S, start: Instant) -> Self {
        Self {
            session: Session::new(profile.thresholds.clone(), start),
            profile,
            sink,
            start,
            last_now: None,
            stats: RunStats::default(),
        }
    }

    pub fn set_profile(&mut self, profile: Profile) {
        self.session.set_thresholds(profile.thresholds.clone());
        self.profile = profile;
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Frame time: stream timestamp when present, wall clock otherwise.
    /// A timestamp that is negative or not finite keeps the previous
    /// frame's time so the two clocks never mix within a stream.
    fn clock(&self, t: Option<f64>) -> Instant {
        let Some(t) = t else {
            return Instant::now();
        };
        match Duration::try_from_secs_f64(t) {
            Ok(d) => self.start + d,
            Err(_) => {
                warn!("frame {}: bad timestamp {t}", self.stats.frames);
                self.last_now.unwrap_or(self.start)
            }
        }
    }

    /// Process one frame and dispatch whatever it fires.
    pub fn step(&mut self, frame: &TrackedFrame) -> Option<GestureEvent> {
        self.stats.frames += 1;
        let now = self.clock(frame.t);
        self.last_now = Some(now);
        let report = match self.session.process(&frame.hands, now) {
            Ok(r) => r,
            Err(e) => {
                self.stats.rejected += 1;
                warn!("frame {}: rejected: {e}", self.stats.frames);
                return None;
            }
        };
        match report.outcome {
            Outcome::Fired(g) => {
                self.stats.fired += 1;
                // fire-and-forget: the lock stays engaged even if the sink failed
                if let Err(e) = dispatch_gesture(&g, &self.profile, &mut self.sink) {
                    error!("dispatch failed: {e}");
                }
                Some(g)
            }
            Outcome::Suppressed(_) => {
                self.stats.suppressed += 1;
                debug!(
                    "frame {}: {:?} held back ({:?})",
                    self.stats.frames, report.candidates, report.state
                );
                None
            }
            Outcome::Initialized => {
                info!("hand detected, tracking");
                None
            }
            _ => None,
        }
    }
}

/// Pull frames until the source ends or `stop` is set. `reload` is polled
/// between frames and may hand back a new profile.
pub fn run_pipeline<S: InputSink>(
    source: &mut dyn LandmarkSource,
    pipeline: &mut Pipeline<S>,
    stop: &AtomicBool,
    mut reload: impl FnMut() -> Option<Profile>,
) -> Result<RunStats> {
    loop {
        if stop.load(Ordering::Relaxed) {
            info!("stop requested");
            break;
        }
        if let Some(p) = reload() {
            pipeline.set_profile(p);
            info!("profile reloaded");
        }
        match source.next_frame() {
            Ok(Some(frame)) => {
                pipeline.step(&frame);
            }
            Ok(None) => {
                info!("landmark stream ended");
                break;
            }
            Err(e) => {
                error!("landmark source failed: {e}");
                return Err(e);
            }
        }
    }
    let st = pipeline.stats();
    info!(
        "session done: {} frames, {} fired, {} suppressed, {} rejected",
        st.frames, st.fired, st.suppressed, st.rejected
    );
    Ok(st)
}

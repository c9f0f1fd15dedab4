//! One tracking session: smoothing, classification and debounce for a
//! single hand, fed one frame at a time.

use log::debug;
use std::time::Instant;

use crate::config::Thresholds;
use crate::debounce::{DebounceState, GestureDebounce};
use crate::gestures::{GestureEvent, PositionSnapshot, classify_all};
use crate::landmarks::{LandmarkError, LandmarkFrame};
use crate::smoothing::{Exponential, MovingAverage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No hand in this frame; nothing changed.
    NoHand,
    /// First frame with a hand; snapshot seeded, nothing can fire.
    Initialized,
    /// Dropped because the previous action's throttle window is still open.
    Throttled,
    NoGesture,
    Fired(GestureEvent),
    /// A candidate was seen but the debounce lock or cooldown held it back.
    Suppressed(GestureEvent),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub outcome: Outcome,
    pub candidates: Vec<GestureEvent>,
    pub state: DebounceState,
}

#[derive(Debug)]
pub struct Session {
    th: Thresholds,
    index_x: MovingAverage,
    middle_x: MovingAverage,
    thumb_x: MovingAverage,
    wrist_y: Exponential,
    snapshot: Option<PositionSnapshot>,
    debounce: GestureDebounce,
    throttle_until: Option<Instant>,
}

impl Session {
    pub fn new(th: Thresholds, start: Instant) -> Self {
        let debounce = GestureDebounce::new(start, th.cooldown());
        Self {
            th,
            index_x: MovingAverage::new(),
            middle_x: MovingAverage::new(),
            thumb_x: MovingAverage::new(),
            wrist_y: Exponential::new(),
            snapshot: None,
            debounce,
            throttle_until: None,
        }
    }

    /// Swap in new thresholds. Smoothing history and the debounce lock carry over.
    pub fn set_thresholds(&mut self, th: Thresholds) {
        self.debounce.set_cooldown(th.cooldown());
        self.th = th;
    }

    #[cfg(test)]
    pub fn thresholds(&self) -> &Thresholds {
        &self.th
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> Option<&PositionSnapshot> {
        self.snapshot.as_ref()
    }

    #[cfg(test)]
    pub fn state(&self) -> DebounceState {
        self.debounce.state()
    }

    /// Process the hands reported for one frame. Only the first hand is used.
    pub fn process(
        &mut self,
        hands: &[Vec<[f64; 2]>],
        now: Instant,
    ) -> Result<FrameReport, LandmarkError> {
        let Some(hand) = hands.first() else {
            return Ok(self.report(Outcome::NoHand, Vec::new()));
        };
        if self.throttled(now) {
            return Ok(self.report(Outcome::Throttled, Vec::new()));
        }
        if hands.len() > 1 {
            debug!("{} hands reported, ignoring all but the first", hands.len());
        }
        let frame = LandmarkFrame::from_hand(hand)?;
        Ok(self.process_frame(&frame, now))
    }

    /// Process one validated landmark frame.
    pub fn process_frame(&mut self, raw: &LandmarkFrame, now: Instant) -> FrameReport {
        if self.throttled(now) {
            return self.report(Outcome::Throttled, Vec::new());
        }
        self.throttle_until = None;

        let cur = self.smooth(raw);
        let Some(prev) = self.snapshot.replace(cur) else {
            return self.report(Outcome::Initialized, Vec::new());
        };

        let candidates = classify_all(&prev, &cur, raw, &self.th);
        let outcome = match candidates.first().copied() {
            None => Outcome::NoGesture,
            Some(g) if self.debounce.try_admit(now) => {
                let throttle = if g.is_scroll() {
                    self.th.scroll_throttle()
                } else {
                    self.th.tab_throttle()
                };
                self.throttle_until = Some(now + throttle);
                Outcome::Fired(g)
            }
            Some(g) => {
                debug!("suppressed {} ({:?})", g.as_str(), self.debounce.state());
                Outcome::Suppressed(g)
            }
        };

        self.debounce
            .observe_motion(cur.is_still_since(&prev, self.th.stability_epsilon));

        self.report(outcome, candidates)
    }

    fn throttled(&self, now: Instant) -> bool {
        self.throttle_until.is_some_and(|until| now < until)
    }

    fn smooth(&mut self, raw: &LandmarkFrame) -> PositionSnapshot {
        let w = self.th.window_size;
        PositionSnapshot {
            index_tip_x: self.index_x.push(raw.index_tip.x, w),
            middle_tip_x: self.middle_x.push(raw.middle_tip.x, w),
            thumb_tip_x: self.thumb_x.push(raw.thumb_tip.x, w),
            wrist_y: self.wrist_y.push(raw.wrist.y, self.th.smoothing_factor),
        }
    }

    fn report(&self, outcome: Outcome, candidates: Vec<GestureEvent>) -> FrameReport {
        FrameReport {
            outcome,
            candidates,
            state: self.debounce.state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::Point;
    use std::time::Duration;

    /// Smoothing disabled so snapshots equal the raw input.
    fn raw_thresholds() -> Thresholds {
        Thresholds {
            window_size: 1,
            smoothing_factor: 1.0,
            ..Thresholds::default()
        }
    }

    fn at(t0: Instant, s: f64) -> Instant {
        t0 + Duration::from_secs_f64(s)
    }

    /// Open hand with the thumb well away from both fingertips.
    fn frame(index_x: f64, middle_x: f64, wrist_y: f64) -> LandmarkFrame {
        LandmarkFrame::new(
            Point::new(index_x, 0.3),
            Point::new(middle_x, 0.3),
            Point::new(0.9, 0.9),
            Point::new(0.5, wrist_y),
        )
        .unwrap()
    }

    fn hand(index_x: f64, middle_x: f64, wrist_y: f64) -> Vec<[f64; 2]> {
        let mut h = vec![[0.5, 0.5]; 21];
        h[0] = [0.5, wrist_y];
        h[4] = [0.9, 0.9];
        h[8] = [index_x, 0.3];
        h[12] = [middle_x, 0.3];
        h
    }

    #[test]
    fn nothing_happens_without_a_hand() {
        let t0 = Instant::now();
        let mut s = Session::new(raw_thresholds(), t0);
        let r = s.process(&[], at(t0, 2.0)).unwrap();
        assert_eq!(r.outcome, Outcome::NoHand);
        assert!(s.snapshot().is_none());
    }

    #[test]
    fn first_frame_only_seeds_the_snapshot() {
        let t0 = Instant::now();
        let mut s = Session::new(raw_thresholds(), t0);
        let r = s.process_frame(&frame(0.6, 0.62, 0.5), at(t0, 5.0));
        assert_eq!(r.outcome, Outcome::Initialized);
        assert!(r.candidates.is_empty());
        assert_eq!(s.snapshot().map(|p| p.index_tip_x), Some(0.6));
        assert_eq!(s.state(), DebounceState::Idle);
    }

    #[test]
    fn swipe_left_fires_and_locks() {
        let t0 = Instant::now();
        let mut s = Session::new(raw_thresholds(), t0);
        s.process_frame(&frame(0.60, 0.62, 0.50), at(t0, 2.0));
        let r = s.process_frame(&frame(0.50, 0.52, 0.50), at(t0, 2.03));
        assert_eq!(r.outcome, Outcome::Fired(GestureEvent::SwipeLeft));
        assert_eq!(r.state, DebounceState::Locked);
        assert_eq!(s.debounce.last_event(), at(t0, 2.03));
    }

    #[test]
    fn wrist_drop_scrolls_down() {
        let t0 = Instant::now();
        let mut s = Session::new(raw_thresholds(), t0);
        s.process_frame(&frame(0.5, 0.5, 0.50), at(t0, 2.0));
        let r = s.process_frame(&frame(0.5, 0.5, 0.58), at(t0, 2.03));
        assert_eq!(r.outcome, Outcome::Fired(GestureEvent::ScrollDown(1600)));
    }

    #[test]
    fn pinch_opens_tab_when_idle() {
        let t0 = Instant::now();
        let mut s = Session::new(raw_thresholds(), t0);
        let pinch = LandmarkFrame::new(
            Point::new(0.45, 0.42),
            Point::new(0.8, 0.2),
            Point::new(0.40, 0.40),
            Point::new(0.5, 0.8),
        )
        .unwrap();
        s.process_frame(&pinch, at(t0, 2.0));
        let r = s.process_frame(&pinch, at(t0, 2.03));
        assert_eq!(r.outcome, Outcome::Fired(GestureEvent::OpenTab));
        // the hand did not move, so the lock is released in the same frame
        assert_eq!(r.state, DebounceState::Idle);
    }

    #[test]
    fn second_candidate_while_locked_is_suppressed() {
        let t0 = Instant::now();
        let mut th = raw_thresholds();
        th.tab_throttle_ms = 0;
        let mut s = Session::new(th, t0);
        s.process_frame(&frame(0.60, 0.62, 0.5), at(t0, 2.0));
        let first = s.process_frame(&frame(0.50, 0.52, 0.5), at(t0, 2.1));
        let second = s.process_frame(&frame(0.40, 0.42, 0.5), at(t0, 2.4));
        assert_eq!(first.outcome, Outcome::Fired(GestureEvent::SwipeLeft));
        assert_eq!(second.outcome, Outcome::Suppressed(GestureEvent::SwipeLeft));
        assert_eq!(second.candidates, vec![GestureEvent::SwipeLeft]);
    }

    #[test]
    fn lock_holds_across_kinds_while_hand_moves() {
        let t0 = Instant::now();
        let mut th = raw_thresholds();
        th.tab_throttle_ms = 0;
        let mut s = Session::new(th, t0);
        s.process_frame(&frame(0.60, 0.62, 0.5), at(t0, 2.0));
        s.process_frame(&frame(0.50, 0.52, 0.5), at(t0, 2.1));
        // well past the cooldown, but the hand never settles
        let r = s.process_frame(&frame(0.50, 0.52, 0.6), at(t0, 4.0));
        assert_eq!(r.outcome, Outcome::Suppressed(GestureEvent::ScrollDown(2000)));
        assert_eq!(r.state, DebounceState::Locked);
    }

    #[test]
    fn still_frame_releases_the_lock() {
        let t0 = Instant::now();
        let mut th = raw_thresholds();
        th.tab_throttle_ms = 0;
        let mut s = Session::new(th, t0);
        s.process_frame(&frame(0.60, 0.62, 0.5), at(t0, 2.0));
        s.process_frame(&frame(0.50, 0.52, 0.5), at(t0, 2.1));
        let r = s.process_frame(&frame(0.50, 0.52, 0.5), at(t0, 2.2));
        assert_eq!(r.outcome, Outcome::NoGesture);
        assert_eq!(r.state, DebounceState::Idle);
        for i in 0..5 {
            let r = s.process_frame(&frame(0.50, 0.52, 0.5), at(t0, 2.3 + i as f64 * 0.1));
            assert_eq!(r.state, DebounceState::Idle);
        }
        // released and cooled down: the next swipe fires
        let r = s.process_frame(&frame(0.61, 0.63, 0.5), at(t0, 3.5));
        assert_eq!(r.outcome, Outcome::Fired(GestureEvent::SwipeRight));
    }

    #[test]
    fn frames_inside_throttle_window_are_dropped() {
        let t0 = Instant::now();
        let mut s = Session::new(raw_thresholds(), t0);
        s.process_frame(&frame(0.60, 0.62, 0.5), at(t0, 2.0));
        s.process_frame(&frame(0.50, 0.52, 0.5), at(t0, 2.0));
        let before = *s.snapshot().unwrap();
        let r = s.process_frame(&frame(0.10, 0.12, 0.9), at(t0, 2.3));
        assert_eq!(r.outcome, Outcome::Throttled);
        assert_eq!(*s.snapshot().unwrap(), before);
        let r = s.process_frame(&frame(0.50, 0.52, 0.5), at(t0, 2.5));
        assert_eq!(r.outcome, Outcome::NoGesture);
    }

    #[test]
    fn scroll_throttle_is_shorter() {
        let t0 = Instant::now();
        let mut s = Session::new(raw_thresholds(), t0);
        s.process_frame(&frame(0.5, 0.5, 0.50), at(t0, 2.0));
        s.process_frame(&frame(0.5, 0.5, 0.58), at(t0, 2.0));
        let r = s.process_frame(&frame(0.5, 0.5, 0.58), at(t0, 2.05));
        assert_eq!(r.outcome, Outcome::Throttled);
        let r = s.process_frame(&frame(0.5, 0.5, 0.58), at(t0, 2.11));
        assert_eq!(r.outcome, Outcome::NoGesture);
        assert_eq!(r.state, DebounceState::Idle);
    }

    #[test]
    fn disagreeing_fingers_fall_through_to_scroll() {
        let t0 = Instant::now();
        let mut s = Session::new(raw_thresholds(), t0);
        s.process_frame(&frame(0.50, 0.50, 0.50), at(t0, 2.0));
        let r = s.process_frame(&frame(0.40, 0.60, 0.60), at(t0, 2.03));
        assert_eq!(r.outcome, Outcome::Fired(GestureEvent::ScrollDown(2000)));
    }

    #[test]
    fn nothing_fires_during_initial_cooldown() {
        let t0 = Instant::now();
        let mut s = Session::new(raw_thresholds(), t0);
        s.process_frame(&frame(0.60, 0.62, 0.5), at(t0, 0.1));
        let r = s.process_frame(&frame(0.50, 0.52, 0.5), at(t0, 0.2));
        assert_eq!(r.outcome, Outcome::Suppressed(GestureEvent::SwipeLeft));
        assert_eq!(r.state, DebounceState::Idle);
    }

    #[test]
    fn default_smoothing_damps_a_single_jump() {
        let t0 = Instant::now();
        let mut s = Session::new(Thresholds::default(), t0);
        for i in 0..5 {
            s.process_frame(&frame(0.6, 0.62, 0.5), at(t0, 2.0 + i as f64 * 0.03));
        }
        // one-frame jump of 0.1 moves the 5-frame average by 0.02
        let r = s.process_frame(&frame(0.5, 0.52, 0.5), at(t0, 2.2));
        assert_eq!(r.outcome, Outcome::NoGesture);
        let snap = s.snapshot().unwrap();
        assert!((snap.index_tip_x - 0.58).abs() < 1e-9);
    }

    #[test]
    fn exponential_smoothing_feeds_wrist() {
        let t0 = Instant::now();
        let mut s = Session::new(Thresholds::default(), t0);
        s.process_frame(&frame(0.5, 0.5, 0.50), at(t0, 2.0));
        s.process_frame(&frame(0.5, 0.5, 0.60), at(t0, 2.03));
        assert!((s.snapshot().unwrap().wrist_y - 0.53).abs() < 1e-9);
    }

    #[test]
    fn invalid_landmarks_leave_state_untouched() {
        let t0 = Instant::now();
        let mut s = Session::new(raw_thresholds(), t0);
        s.process(&[hand(0.6, 0.62, 0.5)], at(t0, 2.0)).unwrap();
        let err = s.process(&[hand(f64::NAN, 0.62, 0.5)], at(t0, 2.03));
        assert!(matches!(err, Err(LandmarkError::InvalidLandmark { .. })));
        assert_eq!(s.snapshot().map(|p| p.index_tip_x), Some(0.6));
    }

    #[test]
    fn only_first_hand_is_used() {
        let t0 = Instant::now();
        let mut s = Session::new(raw_thresholds(), t0);
        s.process(&[hand(0.6, 0.62, 0.5), hand(0.1, 0.1, 0.1)], at(t0, 2.0))
            .unwrap();
        let r = s
            .process(&[hand(0.5, 0.52, 0.5), hand(0.9, 0.9, 0.9)], at(t0, 2.03))
            .unwrap();
        assert_eq!(r.outcome, Outcome::Fired(GestureEvent::SwipeLeft));
        assert_eq!(s.snapshot().map(|p| p.wrist_y), Some(0.5));
    }

    #[test]
    fn reload_keeps_history_and_lock() {
        let t0 = Instant::now();
        let mut s = Session::new(raw_thresholds(), t0);
        s.process_frame(&frame(0.60, 0.62, 0.5), at(t0, 2.0));
        s.process_frame(&frame(0.50, 0.52, 0.5), at(t0, 2.1));
        let mut th = raw_thresholds();
        th.cooldown_ms = 5000;
        s.set_thresholds(th);
        assert_eq!(s.state(), DebounceState::Locked);
        assert_eq!(s.thresholds().cooldown_ms, 5000);
        assert!(s.snapshot().is_some());
    }
}

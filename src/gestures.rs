//! Frame-to-frame gesture classification.
//!
//! Every classifier compares the previous smoothed snapshot with the current
//! one (or, for the touch poses, looks at raw landmark distances) and yields
//! at most one candidate. Whether a candidate actually fires is decided by
//! [`crate::debounce`].

use crate::config::Thresholds;
use crate::landmarks::LandmarkFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    SwipeLeft,
    SwipeRight,
    ScrollUp(u32),
    ScrollDown(u32),
    OpenTab,
    CloseTab,
}

impl GestureEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SwipeLeft => "swipe-left",
            Self::SwipeRight => "swipe-right",
            Self::ScrollUp(_) => "scroll-up",
            Self::ScrollDown(_) => "scroll-down",
            Self::OpenTab => "open-tab",
            Self::CloseTab => "close-tab",
        }
    }

    pub fn is_scroll(&self) -> bool {
        matches!(self, Self::ScrollUp(_) | Self::ScrollDown(_))
    }
}

/// Smoothed hand state for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSnapshot {
    pub index_tip_x: f64,
    pub middle_tip_x: f64,
    pub thumb_tip_x: f64,
    pub wrist_y: f64,
}

impl PositionSnapshot {
    /// True when index, middle and wrist all moved less than `epsilon` since `prev`.
    pub fn is_still_since(&self, prev: &PositionSnapshot, epsilon: f64) -> bool {
        (prev.index_tip_x - self.index_tip_x).abs() < epsilon
            && (prev.middle_tip_x - self.middle_tip_x).abs() < epsilon
            && (prev.wrist_y - self.wrist_y).abs() < epsilon
    }
}

/// Two-finger horizontal swipe. Both fingertips must pass the threshold and
/// agree on direction; movement toward x = 0 is a left swipe.
pub fn classify_swipe(
    prev: &PositionSnapshot,
    cur: &PositionSnapshot,
    th: &Thresholds,
) -> Option<GestureEvent> {
    let di = prev.index_tip_x - cur.index_tip_x;
    let dm = prev.middle_tip_x - cur.middle_tip_x;
    if di.abs() <= th.motion_threshold || dm.abs() <= th.motion_threshold {
        return None;
    }
    if di > 0.0 && dm > 0.0 {
        Some(GestureEvent::SwipeLeft)
    } else if di < 0.0 && dm < 0.0 {
        Some(GestureEvent::SwipeRight)
    } else {
        None
    }
}

/// Vertical wrist motion. Speed scales with the size of the move.
pub fn classify_scroll(
    prev: &PositionSnapshot,
    cur: &PositionSnapshot,
    th: &Thresholds,
) -> Option<GestureEvent> {
    let dy = prev.wrist_y - cur.wrist_y;
    if dy.abs() <= th.motion_threshold {
        return None;
    }
    let speed = scroll_speed(dy, th.scroll_scale);
    // image y grows downward
    Some(if dy > 0.0 {
        GestureEvent::ScrollUp(speed)
    } else {
        GestureEvent::ScrollDown(speed)
    })
}

pub fn scroll_speed(delta: f64, scale: f64) -> u32 {
    (delta.abs() * scale).round() as u32
}

/// Thumb tip touching the index tip.
pub fn classify_thumbs_up(raw: &LandmarkFrame, th: &Thresholds) -> Option<GestureEvent> {
    (raw.thumb_tip.distance(&raw.index_tip) < th.touch_distance).then_some(GestureEvent::OpenTab)
}

/// Thumb tip touching the middle tip.
pub fn classify_thumbs_down(raw: &LandmarkFrame, th: &Thresholds) -> Option<GestureEvent> {
    (raw.thumb_tip.distance(&raw.middle_tip) < th.touch_distance).then_some(GestureEvent::CloseTab)
}

/// Run every classifier in priority order: swipe, scroll, thumbs up, thumbs down.
pub fn classify_all(
    prev: &PositionSnapshot,
    cur: &PositionSnapshot,
    raw: &LandmarkFrame,
    th: &Thresholds,
) -> Vec<GestureEvent> {
    [
        classify_swipe(prev, cur, th),
        classify_scroll(prev, cur, th),
        classify_thumbs_up(raw, th),
        classify_thumbs_down(raw, th),
    ]
    .into_iter()
    .flatten()
    .collect()
}

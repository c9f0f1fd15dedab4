use anyhow::{Result, anyhow};
use log::info;

use crate::actions::InputSink;
use crate::config::Profile;
use crate::gestures::GestureEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    PreviousTab,
    NextTab,
    /// Positive scrolls up.
    ScrollBy(i64),
    NewTab,
    CloseTab,
}

impl Action {
    pub fn for_gesture(g: &GestureEvent) -> Self {
        match g {
            GestureEvent::SwipeLeft => Action::PreviousTab,
            GestureEvent::SwipeRight => Action::NextTab,
            GestureEvent::ScrollUp(n) => Action::ScrollBy(i64::from(*n)),
            GestureEvent::ScrollDown(n) => Action::ScrollBy(-i64::from(*n)),
            GestureEvent::OpenTab => Action::NewTab,
            GestureEvent::CloseTab => Action::CloseTab,
        }
    }

    /// Binding key in the profile, `None` for scrolling.
    pub fn binding(&self) -> Option<&'static str> {
        match self {
            Action::PreviousTab => Some("previous_tab"),
            Action::NextTab => Some("next_tab"),
            Action::NewTab => Some("new_tab"),
            Action::CloseTab => Some("close_tab"),
            Action::ScrollBy(_) => None,
        }
    }
}

/// Wheel notches for a scroll amount, rounded toward zero. Any non-zero
/// amount moves at least one notch.
pub fn wheel_steps(amount: i64, units_per_step: i32) -> i32 {
    if amount == 0 {
        return 0;
    }
    let per = i64::from(units_per_step.max(1));
    let steps = (amount / per).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
    if steps == 0 { amount.signum() as i32 } else { steps }
}

/// Perform the single action bound to `g`.
pub fn dispatch_gesture(
    g: &GestureEvent,
    profile: &Profile,
    sink: &mut dyn InputSink,
) -> Result<()> {
    let action = Action::for_gesture(g);
    info!("{} -> {action:?}", g.as_str());
    match action {
        Action::ScrollBy(amount) => {
            sink.scroll_vertical(wheel_steps(amount, profile.output.wheel_units_per_step))
        }
        other => {
            let key = other.binding().unwrap_or_default();
            let chord = profile
                .chord(key)
                .ok_or_else(|| anyhow!("no key binding for '{key}'"))?;
            sink.key_chord(chord)
        }
    }
}

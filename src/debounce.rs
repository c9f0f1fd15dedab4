//! Debounce lock shared by every gesture kind.
//!
//! Idle admits a candidate only once the cooldown since the last fired event
//! has passed, then locks. The lock is released when the hand comes to rest,
//! independent of the cooldown.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    Locked,
}

#[derive(Debug, Clone)]
pub struct GestureDebounce {
    triggered: bool,
    last_event: Instant,
    cooldown: Duration,
}

impl GestureDebounce {
    /// The cooldown starts running at `start`, so nothing fires before
    /// `start + cooldown`.
    pub fn new(start: Instant, cooldown: Duration) -> Self {
        Self {
            triggered: false,
            last_event: start,
            cooldown,
        }
    }

    pub fn set_cooldown(&mut self, cooldown: Duration) {
        self.cooldown = cooldown;
    }

    pub fn state(&self) -> DebounceState {
        if self.triggered {
            DebounceState::Locked
        } else {
            DebounceState::Idle
        }
    }

    #[cfg(test)]
    pub fn last_event(&self) -> Instant {
        self.last_event
    }

    /// Would a candidate seen at `now` be admitted?
    pub fn admissible(&self, now: Instant) -> bool {
        !self.triggered && now.saturating_duration_since(self.last_event) > self.cooldown
    }

    /// Admit a candidate at `now`. Returns false, and changes nothing, when
    /// locked or still cooling down.
    pub fn try_admit(&mut self, now: Instant) -> bool {
        if !self.admissible(now) {
            return false;
        }
        self.triggered = true;
        self.last_event = now;
        true
    }

    /// Feed the per-frame stillness check. A still hand unlocks.
    pub fn observe_motion(&mut self, still: bool) {
        if still {
            self.triggered = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: Duration = Duration::from_secs(1);

    fn secs(t0: Instant, s: f64) -> Instant {
        t0 + Duration::from_secs_f64(s)
    }

    #[test]
    fn nothing_fires_inside_initial_cooldown() {
        let t0 = Instant::now();
        let mut d = GestureDebounce::new(t0, COOLDOWN);
        assert!(!d.try_admit(secs(t0, 0.5)));
        assert!(!d.try_admit(secs(t0, 1.0)));
        assert_eq!(d.state(), DebounceState::Idle);
        assert!(d.try_admit(secs(t0, 1.01)));
        assert_eq!(d.state(), DebounceState::Locked);
        assert_eq!(d.last_event(), secs(t0, 1.01));
    }

    #[test]
    fn locked_suppresses_until_still() {
        let t0 = Instant::now();
        let mut d = GestureDebounce::new(t0, COOLDOWN);
        assert!(d.try_admit(secs(t0, 2.0)));
        // moving hand: stays locked even long after the cooldown
        for i in 1..20 {
            d.observe_motion(false);
            assert!(!d.try_admit(secs(t0, 2.0 + i as f64 * 0.3)));
        }
        assert_eq!(d.last_event(), secs(t0, 2.0));
        d.observe_motion(true);
        assert_eq!(d.state(), DebounceState::Idle);
        assert!(d.try_admit(secs(t0, 8.0)));
    }

    #[test]
    fn release_does_not_skip_cooldown() {
        let t0 = Instant::now();
        let mut d = GestureDebounce::new(t0, COOLDOWN);
        assert!(d.try_admit(secs(t0, 2.0)));
        d.observe_motion(true);
        assert_eq!(d.state(), DebounceState::Idle);
        assert!(!d.try_admit(secs(t0, 2.5)));
        assert!(d.try_admit(secs(t0, 3.1)));
    }

    #[test]
    fn still_hand_releases_in_one_frame() {
        let t0 = Instant::now();
        let mut d = GestureDebounce::new(t0, COOLDOWN);
        assert!(d.try_admit(secs(t0, 5.0)));
        d.observe_motion(true);
        assert_eq!(d.state(), DebounceState::Idle);
        d.observe_motion(true);
        assert_eq!(d.state(), DebounceState::Idle);
    }

    #[test]
    fn cooldown_change_applies_to_next_admit() {
        let t0 = Instant::now();
        let mut d = GestureDebounce::new(t0, COOLDOWN);
        d.set_cooldown(Duration::from_millis(100));
        assert!(d.admissible(secs(t0, 0.2)));
    }

    #[test]
    fn clock_before_start_is_not_admissible() {
        let t0 = Instant::now() + Duration::from_secs(10);
        let d = GestureDebounce::new(t0, COOLDOWN);
        assert!(!d.admissible(Instant::now()));
    }
}

//! Keyboard state tracking with delayed auto-repeat
//!
//! Platform key events feed a [`KeyRepeat`]; the frame loop polls it for
//! repeats that came due. Repeats are stored as deadlines, so dropping the
//! tracker (or calling [`KeyRepeat::release_all`]) cancels every pending one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::{REPEAT_INITIAL_DELAY_MS, REPEAT_INTERVAL_MS};

/// A game action a key can be bound to
pub trait Action: Copy + Eq + fmt::Debug {
    /// Whether holding the key keeps re-applying the action
    fn repeats(self) -> bool;
}

/// Auto-repeat timings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepeatTiming {
    pub initial_delay_ms: f64,
    pub interval_ms: f64,
}

impl Default for RepeatTiming {
    fn default() -> Self {
        Self {
            initial_delay_ms: REPEAT_INITIAL_DELAY_MS,
            interval_ms: REPEAT_INTERVAL_MS,
        }
    }
}

/// Key name to action bindings. Several keys may share an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMap<A> {
    bindings: Vec<(String, A)>,
}

impl<A: Action> Default for ControlMap<A> {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }
}

impl<A: Action> ControlMap<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, key: impl Into<String>, action: A) -> Self {
        self.bindings.push((key.into(), action));
        self
    }

    /// Keys match case-insensitively so a held Shift does not drop input
    pub fn action_for(&self, key: &str) -> Option<A> {
        self.bindings
            .iter()
            .find(|(bound, _)| bound.eq_ignore_ascii_case(key))
            .map(|(_, action)| *action)
    }

    pub fn handles(&self, key: &str) -> bool {
        self.action_for(key).is_some()
    }

    /// Distinct actions in binding order
    pub fn actions(&self) -> Vec<A> {
        let mut out: Vec<A> = Vec::new();
        for (_, action) in &self.bindings {
            if !out.contains(action) {
                out.push(*action);
            }
        }
        out
    }

    pub fn merged(mut self, other: &ControlMap<A>) -> Self {
        self.bindings.extend(other.bindings.iter().cloned());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct KeyState {
    pressed: bool,
    /// First repeat fires here
    delay_until: Option<f64>,
    next_repeat: Option<f64>,
}

/// Held-key tracker producing immediate actions and timed repeats
#[derive(Debug, Clone)]
pub struct KeyRepeat<A> {
    map: ControlMap<A>,
    timing: RepeatTiming,
    states: Vec<(A, KeyState)>,
}

impl<A: Action> KeyRepeat<A> {
    pub fn new(map: ControlMap<A>, timing: RepeatTiming) -> Self {
        let states = map
            .actions()
            .into_iter()
            .map(|a| (a, KeyState::default()))
            .collect();
        Self {
            map,
            timing,
            states,
        }
    }

    pub fn controls(&self) -> &ControlMap<A> {
        &self.map
    }

    fn state_mut(&mut self, action: A) -> Option<&mut KeyState> {
        self.states
            .iter_mut()
            .find(|(a, _)| *a == action)
            .map(|(_, s)| s)
    }

    /// Handle a key-down event, returning the action to apply now.
    ///
    /// Repeating actions fire once per press; the platform's own key repeat
    /// is ignored while the key is held. Non-repeating actions fire on every
    /// key-down event.
    pub fn key_down(&mut self, key: &str, now_ms: f64) -> Option<A> {
        let action = self.map.action_for(key)?;
        let timing = self.timing;
        let state = self.state_mut(action)?;

        if !action.repeats() {
            state.pressed = true;
            return Some(action);
        }
        if state.pressed {
            return None;
        }
        state.pressed = true;
        state.delay_until = Some(now_ms + timing.initial_delay_ms);
        state.next_repeat = None;
        Some(action)
    }

    /// Handle a key-up event. Returns the released action, if bound.
    pub fn key_up(&mut self, key: &str) -> Option<A> {
        let action = self.map.action_for(key)?;
        let state = self.state_mut(action)?;
        *state = KeyState::default();
        Some(action)
    }

    /// Collect repeats that came due at `now_ms`
    pub fn poll(&mut self, now_ms: f64) -> Vec<A> {
        let interval = self.timing.interval_ms.max(1.0);
        let mut due = Vec::new();
        for (action, state) in &mut self.states {
            if !state.pressed || !action.repeats() {
                continue;
            }
            if let Some(start) = state.delay_until {
                if now_ms < start {
                    continue;
                }
                state.delay_until = None;
                state.next_repeat = Some(start);
            }
            while let Some(at) = state.next_repeat {
                if now_ms < at {
                    break;
                }
                due.push(*action);
                state.next_repeat = Some(at + interval);
            }
        }
        due
    }

    pub fn is_pressed(&self, action: A) -> bool {
        self.states
            .iter()
            .any(|(a, s)| *a == action && s.pressed)
    }

    /// Forget every held key and cancel pending repeats
    pub fn release_all(&mut self) {
        for (_, state) in &mut self.states {
            *state = KeyState::default();
        }
    }

    pub fn has_pending_repeats(&self) -> bool {
        self.states
            .iter()
            .any(|(_, s)| s.delay_until.is_some() || s.next_repeat.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Test {
        Slide,
        Spin,
    }

    impl Action for Test {
        fn repeats(self) -> bool {
            matches!(self, Test::Slide)
        }
    }

    fn tracker() -> KeyRepeat<Test> {
        let map = ControlMap::new().bind("a", Test::Slide).bind("w", Test::Spin);
        KeyRepeat::new(map, RepeatTiming::default())
    }

    #[test]
    fn test_press_applies_immediately() {
        let mut keys = tracker();
        assert_eq!(keys.key_down("a", 0.0), Some(Test::Slide));
        assert!(keys.is_pressed(Test::Slide));
    }

    #[test]
    fn test_no_repeat_before_initial_delay() {
        let mut keys = tracker();
        keys.key_down("a", 0.0);
        assert!(keys.poll(299.0).is_empty());
    }

    #[test]
    fn test_repeats_every_interval_after_delay() {
        let mut keys = tracker();
        keys.key_down("a", 0.0);
        assert_eq!(keys.poll(300.0), vec![Test::Slide]);
        assert!(keys.poll(340.0).is_empty());
        assert_eq!(keys.poll(350.0), vec![Test::Slide]);
        // A long frame catches up on every missed repeat
        assert_eq!(keys.poll(500.0).len(), 3);
    }

    #[test]
    fn test_platform_repeat_is_ignored_while_held() {
        let mut keys = tracker();
        keys.key_down("a", 0.0);
        assert_eq!(keys.key_down("a", 30.0), None);
        assert_eq!(keys.poll(300.0), vec![Test::Slide]);
    }

    #[test]
    fn test_release_cancels_pending_repeat() {
        let mut keys = tracker();
        keys.key_down("a", 0.0);
        keys.key_up("a");
        assert!(!keys.has_pending_repeats());
        assert!(keys.poll(1000.0).is_empty());
    }

    #[test]
    fn test_rotation_fires_per_event_and_never_repeats() {
        let mut keys = tracker();
        assert_eq!(keys.key_down("w", 0.0), Some(Test::Spin));
        assert_eq!(keys.key_down("w", 40.0), Some(Test::Spin));
        assert!(keys.poll(2000.0).is_empty());
    }

    #[test]
    fn test_keys_match_case_insensitively() {
        let mut keys = tracker();
        assert_eq!(keys.key_down("A", 0.0), Some(Test::Slide));
        assert_eq!(keys.key_up("a"), Some(Test::Slide));
    }

    #[test]
    fn test_unbound_key_is_ignored() {
        let mut keys = tracker();
        assert_eq!(keys.key_down("q", 0.0), None);
        assert_eq!(keys.key_up("q"), None);
    }

    #[test]
    fn test_release_all_clears_everything() {
        let mut keys = tracker();
        keys.key_down("a", 0.0);
        keys.key_down("w", 0.0);
        keys.release_all();
        assert!(!keys.is_pressed(Test::Slide));
        assert!(!keys.is_pressed(Test::Spin));
        assert!(!keys.has_pending_repeats());
    }

    #[test]
    fn test_actions_are_distinct() {
        let map = ControlMap::new()
            .bind("a", Test::Slide)
            .bind("ArrowLeft", Test::Slide)
            .bind("w", Test::Spin);
        assert_eq!(map.actions(), vec![Test::Slide, Test::Spin]);
    }
}

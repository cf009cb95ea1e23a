//! Match lifecycle
//!
//! Every legal transition is listed in [`MatchPhase::next`]; anything else is
//! rejected. `Over` is terminal.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchPhase {
    /// Constructed, nothing shown yet
    #[default]
    Idle,
    /// Waiting for any key (pong only)
    Menu,
    Running,
    /// Point scored, serve pending (pong only)
    ScoredPause,
    Over,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    Shown,
    Started,
    AnyKey,
    Scored,
    Served,
    TargetReached,
    BoardLockedOut,
    LevelCapReached,
}

impl MatchPhase {
    pub fn next(self, event: PhaseEvent) -> Option<MatchPhase> {
        use MatchPhase::*;
        use PhaseEvent::*;

        match (self, event) {
            (Idle, Shown) => Some(Menu),
            (Idle, Started) => Some(Running),
            (Menu, AnyKey) => Some(Running),
            (Running, Scored) => Some(ScoredPause),
            (ScoredPause, Served) => Some(Running),
            (Running | ScoredPause, TargetReached) => Some(Over),
            (Running, BoardLockedOut | LevelCapReached) => Some(Over),
            _ => None,
        }
    }

    pub fn is_over(self) -> bool {
        self == MatchPhase::Over
    }

    /// Whether the simulation advances in this phase
    pub fn is_live(self) -> bool {
        matches!(self, MatchPhase::Running | MatchPhase::ScoredPause)
    }
}

/// Current phase plus transition bookkeeping
#[derive(Debug, Clone, Default)]
pub struct PhaseMachine {
    phase: MatchPhase,
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Apply `event`; returns false and leaves the phase alone if illegal
    pub fn fire(&mut self, event: PhaseEvent) -> bool {
        match self.phase.next(event) {
            Some(next) => {
                log::debug!("Phase {:?} -> {:?} on {:?}", self.phase, next, event);
                self.phase = next;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pong_lifecycle() {
        let mut fsm = PhaseMachine::new();
        assert!(fsm.fire(PhaseEvent::Shown));
        assert!(fsm.fire(PhaseEvent::AnyKey));
        assert!(fsm.fire(PhaseEvent::Scored));
        assert_eq!(fsm.phase(), MatchPhase::ScoredPause);
        assert!(fsm.fire(PhaseEvent::Served));
        assert!(fsm.fire(PhaseEvent::TargetReached));
        assert!(fsm.phase().is_over());
    }

    #[test]
    fn test_tetris_lifecycle_skips_menu() {
        let mut fsm = PhaseMachine::new();
        assert!(fsm.fire(PhaseEvent::Started));
        assert!(fsm.fire(PhaseEvent::BoardLockedOut));
        assert!(fsm.phase().is_over());
    }

    #[test]
    fn test_target_reached_during_pause_ends_match() {
        assert_eq!(
            MatchPhase::ScoredPause.next(PhaseEvent::TargetReached),
            Some(MatchPhase::Over)
        );
    }

    #[test]
    fn test_over_is_terminal() {
        let events = [
            PhaseEvent::Shown,
            PhaseEvent::Started,
            PhaseEvent::AnyKey,
            PhaseEvent::Scored,
            PhaseEvent::Served,
            PhaseEvent::TargetReached,
            PhaseEvent::BoardLockedOut,
            PhaseEvent::LevelCapReached,
        ];
        for event in events {
            assert_eq!(MatchPhase::Over.next(event), None);
        }
    }

    #[test]
    fn test_illegal_event_keeps_phase() {
        let mut fsm = PhaseMachine::new();
        assert!(!fsm.fire(PhaseEvent::Scored));
        assert_eq!(fsm.phase(), MatchPhase::Idle);
    }
}

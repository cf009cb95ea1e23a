//! Paddle controllers
//!
//! A pong match drives each paddle through a [`PaddleController`]: the human
//! side reads held keys, the single-player opponent chases the ball.

use serde::{Deserialize, Serialize};

use super::physics::{Ball, Direction, Paddle, PongRules};
use crate::consts::BALL_VERTICAL_DIVISOR;
use crate::input::{Action, ControlMap, KeyRepeat, RepeatTiming};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaddleAction {
    Up,
    Down,
}

impl Action for PaddleAction {
    fn repeats(self) -> bool {
        false
    }
}

pub trait PaddleController {
    /// Update `paddle` for one simulation step
    fn drive(&mut self, paddle: &mut Paddle, ball: &Ball, rules: &PongRules);

    /// Returns true if the key belongs to this controller
    fn key_down(&mut self, _key: &str, _now_ms: f64) -> bool {
        false
    }

    fn key_up(&mut self, _key: &str) -> bool {
        false
    }

    /// Drop any held input
    fn release(&mut self) {}
}

impl<C: PaddleController + ?Sized> PaddleController for Box<C> {
    fn drive(&mut self, paddle: &mut Paddle, ball: &Ball, rules: &PongRules) {
        (**self).drive(paddle, ball, rules)
    }

    fn key_down(&mut self, key: &str, now_ms: f64) -> bool {
        (**self).key_down(key, now_ms)
    }

    fn key_up(&mut self, key: &str) -> bool {
        (**self).key_up(key)
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Human paddle. The most recently pressed direction wins while both are held.
#[derive(Debug, Clone)]
pub struct KeyboardController {
    keys: KeyRepeat<PaddleAction>,
    last: Option<PaddleAction>,
}

impl KeyboardController {
    pub fn new(controls: ControlMap<PaddleAction>) -> Self {
        Self {
            keys: KeyRepeat::new(controls, RepeatTiming::default()),
            last: None,
        }
    }

    fn intent(&self) -> Direction {
        let held = |a| self.keys.is_pressed(a);
        let chosen = match self.last {
            Some(a) if held(a) => Some(a),
            _ => [PaddleAction::Up, PaddleAction::Down]
                .into_iter()
                .find(|a| held(*a)),
        };
        match chosen {
            Some(PaddleAction::Up) => Direction::Up,
            Some(PaddleAction::Down) => Direction::Down,
            None => Direction::Idle,
        }
    }
}

impl PaddleController for KeyboardController {
    fn drive(&mut self, paddle: &mut Paddle, _ball: &Ball, rules: &PongRules) {
        paddle.motion = self.intent();
        paddle.apply_motion(rules);
    }

    fn key_down(&mut self, key: &str, now_ms: f64) -> bool {
        match self.keys.key_down(key, now_ms) {
            Some(action) => {
                self.last = Some(action);
                true
            }
            None => false,
        }
    }

    fn key_up(&mut self, key: &str) -> bool {
        self.keys.key_up(key).is_some()
    }

    fn release(&mut self) {
        self.keys.release_all();
        self.last = None;
    }
}

/// Ball-chasing opponent. Tracks hard while the ball approaches and drifts
/// lazily while it travels away.
#[derive(Debug, Clone, Copy, Default)]
pub struct AiController;

impl AiController {
    /// Rate divisor while the ball is heading away
    const RELAXED_DIVISOR: f32 = 4.0;
}

impl PaddleController for AiController {
    fn drive(&mut self, paddle: &mut Paddle, ball: &Ball, rules: &PongRules) {
        let approaching = ball.move_x == paddle.side.toward();
        let rate = if approaching {
            paddle.speed / BALL_VERTICAL_DIVISOR
        } else {
            paddle.speed / Self::RELAXED_DIVISOR
        };

        let target = ball.pos.y - paddle.size.y / 2.0;
        let dy = (target - paddle.pos.y).clamp(-rate, rate);
        paddle.motion = if dy < 0.0 {
            Direction::Up
        } else if dy > 0.0 {
            Direction::Down
        } else {
            Direction::Idle
        };
        paddle.nudge(dy, rules);
    }
}

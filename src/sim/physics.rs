//! Paddle/ball physics kernel
//!
//! Motion is measured in logical pixels per simulation step. One step is
//! `SIM_DT`; the frame clock decides how many steps a rendered frame runs.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Movement along one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Idle,
    Up,
    Down,
    Left,
    Right,
}

/// Which half of the field a paddle defends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Horizontal direction that travels toward this side's goal
    pub fn toward(self) -> Direction {
        match self {
            Side::Left => Direction::Left,
            Side::Right => Direction::Right,
        }
    }
}

/// Tunable rules for a pong match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PongRules {
    pub field_width: f32,
    pub field_height: f32,
    pub ball_size: f32,
    pub ball_base_speed: f32,
    pub ball_speed_increment: f32,
    pub paddle_width: f32,
    pub paddle_height: f32,
    pub paddle_speed: f32,
    pub paddle_inset: f32,
    pub target_score: u32,
    pub serve_delay_ms: f64,
    pub serve_margin: f32,
}

impl Default for PongRules {
    fn default() -> Self {
        Self {
            field_width: PONG_FIELD_WIDTH,
            field_height: PONG_FIELD_HEIGHT,
            ball_size: BALL_SIZE,
            ball_base_speed: BALL_BASE_SPEED,
            ball_speed_increment: BALL_SPEED_INCREMENT,
            paddle_width: PADDLE_WIDTH,
            paddle_height: PADDLE_HEIGHT,
            paddle_speed: PADDLE_SPEED,
            paddle_inset: PADDLE_INSET,
            target_score: TARGET_SCORE,
            serve_delay_ms: SERVE_DELAY_MS,
            serve_margin: SERVE_MARGIN,
        }
    }
}

impl PongRules {
    /// Largest x the ball may occupy
    pub fn ball_max_x(&self) -> f32 {
        self.field_width - self.ball_size
    }

    /// Largest y the ball may occupy
    pub fn ball_max_y(&self) -> f32 {
        self.field_height - self.ball_size
    }
}

/// The ball. `pos` is the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub pos: Vec2,
    pub size: Vec2,
    pub move_x: Direction,
    pub move_y: Direction,
    /// Grows on every paddle hit, reset when a point is scored
    pub speed: f32,
}

impl Ball {
    /// A motionless ball in the middle of the field
    pub fn centered(rules: &PongRules) -> Self {
        let half = rules.ball_size / 2.0;
        Self {
            pos: Vec2::new(rules.field_width / 2.0 - half, rules.field_height / 2.0 - half),
            size: Vec2::splat(rules.ball_size),
            move_x: Direction::Idle,
            move_y: Direction::Idle,
            speed: rules.ball_base_speed,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.move_x != Direction::Idle || self.move_y != Direction::Idle
    }

    pub fn center_y(&self) -> f32 {
        self.pos.y + self.size.y / 2.0
    }

    /// Advance one step. Vertical motion runs at `speed / 1.5`.
    pub fn integrate(&mut self) {
        let vertical = self.speed / BALL_VERTICAL_DIVISOR;
        match self.move_y {
            Direction::Up => self.pos.y -= vertical,
            Direction::Down => self.pos.y += vertical,
            _ => {}
        }
        match self.move_x {
            Direction::Left => self.pos.x -= self.speed,
            Direction::Right => self.pos.x += self.speed,
            _ => {}
        }
    }
}

/// A player's paddle. `pos` is the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paddle {
    pub side: Side,
    pub pos: Vec2,
    pub size: Vec2,
    pub score: u32,
    pub motion: Direction,
    pub speed: f32,
}

impl Paddle {
    pub fn new(side: Side, rules: &PongRules) -> Self {
        let x = match side {
            Side::Left => rules.paddle_inset,
            Side::Right => rules.field_width - rules.paddle_inset,
        };
        Self {
            side,
            pos: Vec2::new(x, rules.field_height / 2.0 - rules.paddle_height / 2.0),
            size: Vec2::new(rules.paddle_width, rules.paddle_height),
            score: 0,
            motion: Direction::Idle,
            speed: rules.paddle_speed,
        }
    }

    /// Move one step according to `motion`
    pub fn apply_motion(&mut self, rules: &PongRules) {
        match self.motion {
            Direction::Up => self.pos.y -= self.speed,
            Direction::Down => self.pos.y += self.speed,
            _ => {}
        }
        self.clamp(rules);
    }

    /// Shift vertically by `dy` and stay on the field
    pub fn nudge(&mut self, dy: f32, rules: &PongRules) {
        self.pos.y += dy;
        self.clamp(rules);
    }

    pub fn clamp(&mut self, rules: &PongRules) {
        self.pos.y = self.pos.y.clamp(0.0, rules.field_height - self.size.y);
    }

    fn overlaps(&self, ball: &Ball) -> bool {
        ball.pos.x <= self.pos.x + self.size.x
            && ball.pos.x + ball.size.x >= self.pos.x
            && ball.pos.y <= self.pos.y + self.size.y
            && ball.pos.y + ball.size.y >= self.pos.y
    }
}

/// What happened during one rally step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepEvents {
    pub hit_wall: bool,
    pub hit_paddle: Option<Side>,
    /// Side that won the point
    pub scorer: Option<Side>,
}

/// Bounce off the top/bottom wall. Returns true on contact.
pub fn resolve_walls(ball: &mut Ball, rules: &PongRules) -> bool {
    let max_y = rules.ball_max_y();
    if ball.pos.y <= 0.0 {
        ball.pos.y = 0.0;
        ball.move_y = Direction::Down;
        true
    } else if ball.pos.y >= max_y {
        ball.pos.y = max_y;
        ball.move_y = Direction::Up;
        true
    } else {
        false
    }
}

/// Reflect the ball off `paddle` if it is moving into it.
///
/// The ball is snapped flush against the paddle face so it cannot stick or
/// tunnel on the next step, and every hit adds the configured speed increment.
pub fn resolve_paddle(ball: &mut Ball, paddle: &Paddle, rules: &PongRules) -> bool {
    if ball.move_x != paddle.side.toward() || !paddle.overlaps(ball) {
        return false;
    }

    match paddle.side {
        Side::Left => {
            ball.pos.x = paddle.pos.x + paddle.size.x;
            ball.move_x = Direction::Right;
        }
        Side::Right => {
            ball.pos.x = paddle.pos.x - ball.size.x;
            ball.move_x = Direction::Left;
        }
    }
    ball.speed += rules.ball_speed_increment;
    true
}

/// Side that scored if the ball reached a goal line
pub fn check_goal(ball: &Ball, rules: &PongRules) -> Option<Side> {
    if ball.pos.x <= 0.0 {
        Some(Side::Right)
    } else if ball.pos.x >= rules.ball_max_x() {
        Some(Side::Left)
    } else {
        None
    }
}

/// Integrate and resolve one rally step.
///
/// The ball is left untouched on a goal; the caller respawns it.
pub fn step_rally(
    ball: &mut Ball,
    left: &Paddle,
    right: &Paddle,
    rules: &PongRules,
) -> StepEvents {
    let mut events = StepEvents::default();
    if !ball.is_moving() {
        return events;
    }

    ball.integrate();
    events.hit_wall = resolve_walls(ball, rules);

    for paddle in [left, right] {
        if resolve_paddle(ball, paddle, rules) {
            events.hit_paddle = Some(paddle.side);
            break;
        }
    }

    events.scorer = check_goal(ball, rules);
    events
}

//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Time comes in as an argument, never from the platform
//! - No rendering, network or platform dependencies

pub mod opponent;
pub mod phase;
pub mod physics;
pub mod playfield;
pub mod pong;
pub mod tetris;
pub mod tetromino;

pub use opponent::{AiController, KeyboardController, PaddleAction, PaddleController};
pub use phase::{MatchPhase, PhaseEvent, PhaseMachine};
pub use physics::{Ball, Direction, Paddle, PongRules, Side, StepEvents};
pub use playfield::Playfield;
pub use pong::{PongMatch, PongOutcome};
pub use tetris::{
    GameOverCause, TetrisAction, TetrisBoard, TetrisGame, TetrisRules, TetrisVariant,
};
pub use tetromino::{Bag, Piece, PieceKind, Shape};

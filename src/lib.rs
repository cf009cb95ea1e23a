//! Arena Arcade - Pong and Tetris match engines with tournament play
//!
//! Core modules:
//! - `sim`: Deterministic simulation (paddle physics, tetromino engine, match phases)
//! - `input`: Key-state tracking with delayed auto-repeat
//! - `clock`: Frame clock feeding fixed simulation steps
//! - `tournament`: Single-elimination bracket coordinator
//! - `session`: Page-level context owning the current game and tournament
//! - `api`: Boundary contracts for the remote game server
//! - `renderer`: Drawable surface contract and game views
//! - `platform`: Browser bindings (canvas, animation frames, listeners, fetch)

pub mod api;
pub mod clock;
pub mod error;
pub mod input;
pub mod platform;
pub mod renderer;
pub mod session;
pub mod settings;
pub mod sim;
pub mod tournament;

pub use error::{ApiError, SettingsError, SetupError, TournamentError};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, one physics "frame")
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Largest frame delta accepted before clamping (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Pong field dimensions (logical pixels)
    pub const PONG_FIELD_WIDTH: f32 = 1400.0;
    pub const PONG_FIELD_HEIGHT: f32 = 1000.0;

    /// Ball defaults
    pub const BALL_SIZE: f32 = 18.0;
    pub const BALL_BASE_SPEED: f32 = 10.0;
    /// Speed gained on every paddle hit
    pub const BALL_SPEED_INCREMENT: f32 = 0.2;
    /// Vertical speed divisor (horizontal crossing time stays angle-independent)
    pub const BALL_VERTICAL_DIVISOR: f32 = 1.5;

    /// Paddle defaults
    pub const PADDLE_WIDTH: f32 = 18.0;
    pub const PADDLE_HEIGHT: f32 = 70.0;
    pub const PADDLE_SPEED: f32 = 10.0;
    /// Distance of each paddle from its goal line
    pub const PADDLE_INSET: f32 = 150.0;

    /// Points needed to win a match
    pub const TARGET_SCORE: u32 = 5;
    /// Wall-clock freeze after a point (ms)
    pub const SERVE_DELAY_MS: f64 = 1000.0;
    /// Serves never start closer than this to the top or bottom wall
    pub const SERVE_MARGIN: f32 = 200.0;

    /// Tetris playfield
    pub const TETRIS_ROWS: usize = 22;
    pub const TETRIS_COLS: usize = 10;
    /// Cell size used by the tetris view (logical pixels)
    pub const TETRIS_CELL: f32 = 20.0;
    pub const BASE_DROP_INTERVAL_MS: f64 = 1000.0;
    /// Drop interval shrinks by this much per level
    pub const DROP_INTERVAL_STEP_MS: f64 = 100.0;
    pub const LINES_PER_LEVEL: u32 = 10;

    /// Auto-repeat timings (ms)
    pub const REPEAT_INITIAL_DELAY_MS: f64 = 300.0;
    pub const REPEAT_INTERVAL_MS: f64 = 50.0;

    /// Keep-alive cadence while a tournament match is live (ms)
    pub const TOURNAMENT_PING_MS: f64 = 30_000.0;
}

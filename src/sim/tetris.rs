//! Tetris engine
//!
//! [`TetrisGame`] is one board: gravity, movement, locking, line clears,
//! scoring and level progression. [`TetrisBoard`] pairs it with a player's
//! key bindings and auto-repeat state.

use serde::{Deserialize, Serialize};

use super::phase::{MatchPhase, PhaseEvent, PhaseMachine};
use super::playfield::Playfield;
use super::tetromino::{Bag, Piece};
use crate::api::{GameSummary, Participant};
use crate::consts::*;
use crate::input::{Action, ControlMap, KeyRepeat, RepeatTiming};

/// Points for clearing 0..=4 rows at once, before the level multiplier
const LINE_SCORES: [u64; 5] = [0, 40, 100, 300, 1200];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TetrisVariant {
    /// Ends at the level cap
    #[default]
    Standard,
    /// Slower floor on the drop interval, no level cap
    Classic,
}

impl TetrisVariant {
    pub fn min_drop_interval_ms(self) -> f64 {
        match self {
            TetrisVariant::Standard => 50.0,
            TetrisVariant::Classic => 200.0,
        }
    }

    pub fn level_cap(self) -> Option<u32> {
        match self {
            TetrisVariant::Standard => Some(15),
            TetrisVariant::Classic => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TetrisRules {
    pub rows: usize,
    pub cols: usize,
    pub base_drop_interval_ms: f64,
    pub variant: TetrisVariant,
}

impl Default for TetrisRules {
    fn default() -> Self {
        Self {
            rows: TETRIS_ROWS,
            cols: TETRIS_COLS,
            base_drop_interval_ms: BASE_DROP_INTERVAL_MS,
            variant: TetrisVariant::Standard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TetrisAction {
    Left,
    Right,
    Down,
    Rotate,
}

impl Action for TetrisAction {
    fn repeats(self) -> bool {
        self != TetrisAction::Rotate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOverCause {
    /// A new piece had no room to spawn
    BoardFull,
    LevelCap,
}

/// A single tetris board
#[derive(Debug, Clone)]
pub struct TetrisGame {
    rules: TetrisRules,
    field: Playfield,
    bag: Bag,
    active: Option<Piece>,
    fsm: PhaseMachine,
    score: u64,
    lines_cleared: u32,
    drop_interval_ms: f64,
    drop_counter_ms: f64,
    last_time: Option<f64>,
    /// Cells written by the most recent lock, for highlighting
    last_placed: Vec<(usize, usize)>,
    over_cause: Option<GameOverCause>,
    over_taken: bool,
}

impl TetrisGame {
    pub fn new(rules: TetrisRules, seed: u64) -> Self {
        Self {
            field: Playfield::new(rules.rows, rules.cols),
            drop_interval_ms: rules.base_drop_interval_ms,
            rules,
            bag: Bag::new(seed),
            active: None,
            fsm: PhaseMachine::new(),
            score: 0,
            lines_cleared: 0,
            drop_counter_ms: 0.0,
            last_time: None,
            last_placed: Vec::new(),
            over_cause: None,
            over_taken: false,
        }
    }

    /// Spawn the first piece and start gravity
    pub fn start(&mut self, now_ms: f64) {
        if self.fsm.fire(PhaseEvent::Started) {
            self.last_time = Some(now_ms);
            self.spawn();
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.fsm.phase()
    }

    pub fn playfield(&self) -> &Playfield {
        &self.field
    }

    pub fn active_piece(&self) -> Option<&Piece> {
        self.active.as_ref()
    }

    pub fn last_placed(&self) -> &[(usize, usize)] {
        &self.last_placed
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn lines_cleared(&self) -> u32 {
        self.lines_cleared
    }

    pub fn level(&self) -> u32 {
        self.lines_cleared / LINES_PER_LEVEL + 1
    }

    pub fn drop_interval_ms(&self) -> f64 {
        self.drop_interval_ms
    }

    pub fn over_cause(&self) -> Option<GameOverCause> {
        self.over_cause
    }

    /// Hand out the game-over signal exactly once
    pub fn take_game_over(&mut self) -> Option<GameOverCause> {
        if self.over_taken {
            return None;
        }
        let cause = self.over_cause?;
        self.over_taken = true;
        Some(cause)
    }

    /// Accumulate elapsed time and apply gravity when the interval passes
    pub fn update(&mut self, now_ms: f64) {
        if self.phase() != MatchPhase::Running {
            return;
        }
        let last = self.last_time.replace(now_ms).unwrap_or(now_ms);
        self.drop_counter_ms += (now_ms - last).max(0.0);
        if self.drop_counter_ms > self.drop_interval_ms {
            self.drop_counter_ms = 0.0;
            self.gravity_step();
        }
    }

    /// Move the active piece down one row, locking it if it cannot move
    fn gravity_step(&mut self) {
        if !self.try_shift(1, 0) {
            self.lock_active();
        }
    }

    /// Apply a player action. Returns false if it was rejected.
    pub fn apply(&mut self, action: TetrisAction) -> bool {
        if self.phase() != MatchPhase::Running {
            return false;
        }
        match action {
            TetrisAction::Left => self.try_shift(0, -1),
            TetrisAction::Right => self.try_shift(0, 1),
            TetrisAction::Down => {
                let moved = self.try_shift(1, 0);
                if moved {
                    self.drop_counter_ms = 0.0;
                }
                moved
            }
            TetrisAction::Rotate => self.try_rotate(),
        }
    }

    fn try_shift(&mut self, dr: i32, dc: i32) -> bool {
        let Some(piece) = &mut self.active else {
            return false;
        };
        if self.field.fits(&piece.shape, piece.row + dr, piece.col + dc) {
            piece.row += dr;
            piece.col += dc;
            true
        } else {
            false
        }
    }

    /// Rotation without wall kicks
    fn try_rotate(&mut self) -> bool {
        let Some(piece) = &mut self.active else {
            return false;
        };
        let rotated = piece.shape.rotated();
        if self.field.fits(&rotated, piece.row, piece.col) {
            piece.shape = rotated;
            true
        } else {
            false
        }
    }

    fn lock_active(&mut self) {
        let Some(piece) = self.active.take() else {
            return;
        };
        self.last_placed = self.field.lock(&piece);

        let cleared = self.field.clear_full_rows();
        if cleared > 0 {
            self.lines_cleared += cleared;
            let level = self.level();
            self.score += LINE_SCORES[cleared.min(4) as usize] * u64::from(9 + level) / 10;
            self.drop_interval_ms = (self.rules.base_drop_interval_ms
                - f64::from(level - 1) * DROP_INTERVAL_STEP_MS)
                .max(self.rules.variant.min_drop_interval_ms());
            log::debug!(
                "Cleared {} rows, score {}, level {}",
                cleared,
                self.score,
                level
            );
        }

        if let Some(cap) = self.rules.variant.level_cap()
            && self.level() >= cap
        {
            self.end(PhaseEvent::LevelCapReached, GameOverCause::LevelCap);
            return;
        }
        self.spawn();
    }

    fn spawn(&mut self) {
        let piece = Piece::spawn(self.bag.next_kind(), self.rules.cols);
        if self.field.fits(&piece.shape, piece.row, piece.col) {
            log::debug!("Spawned {:?}", piece.kind);
            self.active = Some(piece);
        } else {
            self.field.stamp_overlap(&piece);
            self.end(PhaseEvent::BoardLockedOut, GameOverCause::BoardFull);
        }
    }

    fn end(&mut self, event: PhaseEvent, cause: GameOverCause) {
        if !self.fsm.fire(event) {
            return;
        }
        self.active = None;
        self.over_cause = Some(cause);
        log::info!(
            "Tetris game over ({:?}): score {}, lines {}, level {}",
            cause,
            self.score,
            self.lines_cleared,
            self.level()
        );
    }

    /// Recolor the board for display once every board has finished
    pub fn finalize(&mut self) {
        self.field.finalize();
    }

    pub fn summary(&self, match_id: &str, ranked: bool, is_tournament: bool) -> GameSummary {
        GameSummary {
            match_id: match_id.to_string(),
            score: self.score,
            lines_cleared: self.lines_cleared,
            level: self.level(),
            ranked,
            is_tournament,
        }
    }
}

/// One player's board and controls
#[derive(Debug, Clone)]
pub struct TetrisBoard {
    pub game: TetrisGame,
    pub seat: Participant,
    keys: KeyRepeat<TetrisAction>,
}

impl TetrisBoard {
    pub fn new(
        game: TetrisGame,
        seat: Participant,
        controls: ControlMap<TetrisAction>,
        timing: RepeatTiming,
    ) -> Self {
        Self {
            game,
            seat,
            keys: KeyRepeat::new(controls, timing),
        }
    }

    pub fn controls(&self) -> &ControlMap<TetrisAction> {
        self.keys.controls()
    }

    /// Returns true if the key is bound on this board
    pub fn key_down(&mut self, key: &str, now_ms: f64) -> bool {
        if !self.keys.controls().handles(key) {
            return false;
        }
        if self.game.phase().is_over() {
            return true;
        }
        if let Some(action) = self.keys.key_down(key, now_ms) {
            self.game.apply(action);
        }
        true
    }

    pub fn key_up(&mut self, key: &str) -> bool {
        self.keys.key_up(key).is_some()
    }

    /// Apply due repeats, then gravity
    pub fn update(&mut self, now_ms: f64) {
        if self.game.phase().is_over() {
            self.keys.release_all();
            return;
        }
        for action in self.keys.poll(now_ms) {
            self.game.apply(action);
        }
        self.game.update(now_ms);
    }

    pub fn teardown(&mut self) {
        self.keys.release_all();
    }

    pub fn has_pending_repeats(&self) -> bool {
        self.keys.has_pending_repeats()
    }
}

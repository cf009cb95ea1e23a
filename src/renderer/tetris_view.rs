//! Tetris boards side by side, with per-board HUD and a final scoreboard

use super::{Color, Surface, TextAlign, draw_panel};
use crate::consts::TETRIS_CELL;
use crate::sim::TetrisBoard;

const BACKGROUND: Color = Color::rgb(17, 17, 17);
const WELL: Color = Color::rgb(0, 0, 0);
const GRID: Color = Color::rgb(40, 40, 40);
const MARGIN: f32 = 40.0;
const GAP: f32 = 80.0;
const TOP: f32 = 60.0;

/// Palette indexed by cell value
const PALETTE: [Color; 10] = [
    WELL,
    Color::rgb(0, 255, 255),
    Color::rgb(255, 255, 0),
    Color::rgb(128, 0, 128),
    Color::rgb(0, 128, 0),
    Color::rgb(255, 0, 0),
    Color::rgb(0, 0, 255),
    Color::rgb(255, 165, 0),
    Color::GREY,
    Color::WHITE,
];

fn cell_color(value: u8) -> Color {
    PALETTE.get(usize::from(value)).copied().unwrap_or(Color::WHITE)
}

/// Surface size needed for `boards` boards of the given dimensions
pub fn layout_size(boards: usize, rows: usize, cols: usize) -> (f32, f32) {
    let board_w = cols as f32 * TETRIS_CELL;
    let n = boards.max(1) as f32;
    let width = MARGIN * 2.0 + n * board_w + (n - 1.0) * GAP;
    let height = TOP + rows as f32 * TETRIS_CELL + 120.0;
    (width, height)
}

fn draw_board<S: Surface>(board: &TetrisBoard, surface: &mut S, x0: f32) {
    let field = board.game.playfield();
    let (rows, cols) = (field.rows(), field.cols());
    let cell = TETRIS_CELL;
    let (bw, bh) = (cols as f32 * cell, rows as f32 * cell);

    surface.fill_rect(x0, TOP, bw, bh, WELL);
    for c in 1..cols {
        surface.fill_rect(x0 + c as f32 * cell, TOP, 1.0, bh, GRID);
    }
    for r in 1..rows {
        surface.fill_rect(x0, TOP + r as f32 * cell, bw, 1.0, GRID);
    }

    for r in 0..rows {
        for (c, value) in field.row(r).iter().enumerate() {
            if *value != 0 {
                let (x, y) = (x0 + c as f32 * cell, TOP + r as f32 * cell);
                surface.fill_rect(x, y, cell - 1.0, cell - 1.0, cell_color(*value));
            }
        }
    }

    if let Some(piece) = board.game.active_piece() {
        for (r, c, value) in piece.cells() {
            let (x, y) = (x0 + c as f32 * cell, TOP + r as f32 * cell);
            surface.fill_rect(x, y, cell - 1.0, cell - 1.0, cell_color(value));
        }
    }

    let label = board.seat.identity.label();
    surface.draw_text(label, x0, TOP - 15.0, 20.0, Color::WHITE, TextAlign::Left);
    let hud = [
        format!("Score: {}", board.game.score()),
        format!("Lines: {}", board.game.lines_cleared()),
        format!("Level: {}", board.game.level()),
    ];
    for (i, line) in hud.iter().enumerate() {
        let y = TOP + bh + 30.0 + i as f32 * 24.0;
        surface.draw_text(line, x0, y, 18.0, Color::WHITE, TextAlign::Left);
    }
    if board.game.phase().is_over() {
        surface.draw_text(
            "Game over",
            x0 + bw / 2.0,
            TOP + bh / 2.0,
            24.0,
            Color::GOLD,
            TextAlign::Center,
        );
    }
}

/// Draw every board. `scoreboard` is shown once all boards are finished.
pub fn draw_tetris<S: Surface>(
    boards: &[TetrisBoard],
    scoreboard: Option<&[(String, u64)]>,
    surface: &mut S,
) {
    let Some(first) = boards.first() else {
        surface.clear(BACKGROUND);
        return;
    };
    let field = first.game.playfield();
    let board_w = field.cols() as f32 * TETRIS_CELL;

    surface.clear(BACKGROUND);
    for (i, board) in boards.iter().enumerate() {
        draw_board(board, surface, MARGIN + i as f32 * (board_w + GAP));
    }

    if let Some(scores) = scoreboard {
        let lines: Vec<String> = scores
            .iter()
            .enumerate()
            .map(|(i, (name, score))| format!("{}. {} - {}", i + 1, name, score))
            .collect();
        draw_panel(surface, "Final scores", &lines);
    }
}

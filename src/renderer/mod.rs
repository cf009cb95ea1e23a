//! Rendering module
//!
//! Views draw through the [`Surface`] trait using a handful of 2D primitives.
//! The browser backs it with a Canvas2D context; tests record the calls.

pub mod pong_view;
pub mod tetris_view;

pub use pong_view::draw_pong;
pub use tetris_view::draw_tetris;

/// RGBA color, 8 bits per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const GREY: Color = Color::rgb(128, 128, 128);
    pub const GOLD: Color = Color::rgb(255, 215, 0);
    /// Dims whatever is underneath
    pub const SHADE: Color = Color::rgba(0, 0, 0, 170);

    /// CSS color string
    pub fn to_css(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!(
                "rgba({}, {}, {}, {:.3})",
                self.r,
                self.g,
                self.b,
                f32::from(self.a) / 255.0
            )
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
}

/// Something views can draw on. Coordinates are logical pixels with the
/// origin at the top-left.
pub trait Surface {
    /// Drawable width and height
    fn size(&self) -> (f32, f32);

    fn clear(&mut self, color: Color);

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color);

    /// `y` is the text baseline
    fn draw_text(&mut self, text: &str, x: f32, y: f32, size: f32, color: Color, align: TextAlign);
}

/// Shade the surface and list `lines` centered under a title
pub fn draw_panel<S: Surface>(surface: &mut S, title: &str, lines: &[String]) {
    let (width, height) = surface.size();
    surface.fill_rect(0.0, 0.0, width, height, Color::SHADE);
    let cx = width / 2.0;
    surface.draw_text(title, cx, height * 0.25, 48.0, Color::GOLD, TextAlign::Center);
    for (i, line) in lines.iter().enumerate() {
        let y = height * 0.25 + 70.0 + i as f32 * 36.0;
        surface.draw_text(line, cx, y, 26.0, Color::WHITE, TextAlign::Center);
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum DrawOp {
        Clear(Color),
        Rect { x: f32, y: f32, w: f32, h: f32, color: Color },
        Text { text: String, x: f32, y: f32 },
    }

    #[derive(Debug)]
    pub struct RecordingSurface {
        pub ops: Vec<DrawOp>,
        pub size: (f32, f32),
    }

    impl Default for RecordingSurface {
        fn default() -> Self {
            Self {
                ops: Vec::new(),
                size: (1400.0, 1000.0),
            }
        }
    }

    impl RecordingSurface {
        pub fn texts(&self) -> Vec<String> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    DrawOp::Text { text, .. } => Some(text.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn rects_of(&self, color: Color) -> usize {
            self.ops
                .iter()
                .filter(|op| matches!(op, DrawOp::Rect { color: c, .. } if *c == color))
                .count()
        }
    }

    impl Surface for RecordingSurface {
        fn size(&self) -> (f32, f32) {
            self.size
        }

        fn clear(&mut self, color: Color) {
            self.ops.push(DrawOp::Clear(color));
        }

        fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
            self.ops.push(DrawOp::Rect { x, y, w, h, color });
        }

        fn draw_text(
            &mut self,
            text: &str,
            x: f32,
            y: f32,
            _size: f32,
            _color: Color,
            _align: TextAlign,
        ) {
            self.ops.push(DrawOp::Text {
                text: text.to_string(),
                x,
                y,
            });
        }
    }
}

//! Frame clock feeding fixed simulation steps
//!
//! Animation-frame timestamps arrive at whatever rate the display runs;
//! the simulation always advances in `SIM_DT` steps.

use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SIM_DT};

#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    accumulator: f32,
    last_time: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a frame at `now_ms` and return how many fixed steps to run.
    ///
    /// The first frame only records the timestamp. Long stalls (tab in the
    /// background) are clamped so the simulation never spirals.
    pub fn advance(&mut self, now_ms: f64) -> u32 {
        let Some(last) = self.last_time.replace(now_ms) else {
            return 0;
        };
        let dt = (((now_ms - last) / 1000.0) as f32).clamp(0.0, MAX_FRAME_DT);
        self.accumulator += dt;

        let mut steps = 0;
        while self.accumulator >= SIM_DT && steps < MAX_SUBSTEPS {
            self.accumulator -= SIM_DT;
            steps += 1;
        }
        if steps == MAX_SUBSTEPS {
            self.accumulator = self.accumulator.min(SIM_DT);
        }
        steps
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_runs_nothing() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.advance(1234.0), 0);
    }

    #[test]
    fn test_sixty_hz_frames_run_one_step() {
        let mut clock = FrameClock::new();
        clock.advance(0.0);
        let mut total = 0;
        for i in 1..=60 {
            total += clock.advance(i as f64 * 1000.0 / 60.0 + 0.01);
        }
        assert_eq!(total, 60);
    }

    #[test]
    fn test_stall_is_clamped() {
        let mut clock = FrameClock::new();
        clock.advance(0.0);
        let steps = clock.advance(10_000.0);
        assert!(steps <= MAX_SUBSTEPS);
        assert!(steps >= 5);
    }

    #[test]
    fn test_time_going_backwards_runs_nothing() {
        let mut clock = FrameClock::new();
        clock.advance(500.0);
        assert_eq!(clock.advance(100.0), 0);
    }

    #[test]
    fn test_reset_forgets_last_frame() {
        let mut clock = FrameClock::new();
        clock.advance(0.0);
        clock.reset();
        assert_eq!(clock.advance(5000.0), 0);
    }
}

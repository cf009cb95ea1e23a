//! Pong match
//!
//! Owns the ball, both paddles and their controllers. The host calls
//! [`PongMatch::tick`] once per simulation step with the current wall-clock
//! time; serve delays are deadlines checked against that time, so dropping a
//! match leaves nothing scheduled behind.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::opponent::{KeyboardController, PaddleController};
use super::phase::{MatchPhase, PhaseEvent, PhaseMachine};
use super::physics::{Ball, Direction, Paddle, PongRules, Side, StepEvents, step_rally};
use crate::api::{Credential, Participant, ScoreReport};

/// Final result of a pong match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PongOutcome {
    pub winner: Side,
    pub left_score: u32,
    pub right_score: u32,
}

impl PongOutcome {
    pub fn score_of(&self, side: Side) -> u32 {
        match side {
            Side::Left => self.left_score,
            Side::Right => self.right_score,
        }
    }
}

/// A pong match between the local keyboard player on the left and an
/// opponent controller on the right
pub struct PongMatch<O: PaddleController = Box<dyn PaddleController>> {
    rules: PongRules,
    fsm: PhaseMachine,
    ball: Ball,
    left: Paddle,
    right: Paddle,
    player: KeyboardController,
    opponent: O,
    /// Left is always a known player; the right seat is empty for the AI
    left_seat: Participant,
    right_seat: Option<Participant>,
    /// Side the next serve travels toward
    turn: Side,
    serve_at: Option<f64>,
    rng: Pcg32,
    outcome: Option<PongOutcome>,
    outcome_taken: bool,
}

impl<O: PaddleController> PongMatch<O> {
    pub fn new(
        rules: PongRules,
        left_seat: Participant,
        right_seat: Option<Participant>,
        player: KeyboardController,
        opponent: O,
        seed: u64,
    ) -> Self {
        Self {
            ball: Ball::centered(&rules),
            left: Paddle::new(Side::Left, &rules),
            right: Paddle::new(Side::Right, &rules),
            rules,
            fsm: PhaseMachine::new(),
            player,
            opponent,
            left_seat,
            right_seat,
            turn: Side::Right,
            serve_at: None,
            rng: Pcg32::seed_from_u64(seed),
            outcome: None,
            outcome_taken: false,
        }
    }

    pub fn rules(&self) -> &PongRules {
        &self.rules
    }

    pub fn phase(&self) -> MatchPhase {
        self.fsm.phase()
    }

    pub fn ball(&self) -> &Ball {
        &self.ball
    }

    pub fn paddle(&self, side: Side) -> &Paddle {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    #[cfg(test)]
    pub(crate) fn paddle_mut(&mut self, side: Side) -> &mut Paddle {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    pub fn seat(&self, side: Side) -> Option<&Participant> {
        match side {
            Side::Left => Some(&self.left_seat),
            Side::Right => self.right_seat.as_ref(),
        }
    }

    pub fn outcome(&self) -> Option<&PongOutcome> {
        self.outcome.as_ref()
    }

    /// Hand out the outcome exactly once
    pub fn take_outcome(&mut self) -> Option<PongOutcome> {
        if self.outcome_taken {
            return None;
        }
        let outcome = self.outcome.clone()?;
        self.outcome_taken = true;
        Some(outcome)
    }

    /// Show the start menu
    pub fn show(&mut self) {
        self.fsm.fire(PhaseEvent::Shown);
    }

    /// The ball is hidden until the serve delay has elapsed
    pub fn ball_visible(&self, now_ms: f64) -> bool {
        self.serve_at.is_none_or(|at| now_ms >= at)
    }

    /// Route a key press. Any key leaves the start menu, and that same key
    /// still counts as paddle input.
    pub fn key_down(&mut self, key: &str, now_ms: f64) -> bool {
        if self.phase() == MatchPhase::Menu && self.fsm.fire(PhaseEvent::AnyKey) {
            log::info!("Pong match started");
            self.serve_at = Some(now_ms);
        }
        if self.phase().is_over() {
            return false;
        }
        self.player.key_down(key, now_ms) || self.opponent.key_down(key, now_ms)
    }

    pub fn key_up(&mut self, key: &str) -> bool {
        self.player.key_up(key) || self.opponent.key_up(key)
    }

    /// Advance one simulation step
    pub fn tick(&mut self, now_ms: f64) -> StepEvents {
        if !self.phase().is_live() {
            return StepEvents::default();
        }

        self.player.drive(&mut self.left, &self.ball, &self.rules);
        self.opponent.drive(&mut self.right, &self.ball, &self.rules);

        if let Some(at) = self.serve_at
            && now_ms >= at
        {
            self.serve();
        }

        let events = step_rally(&mut self.ball, &self.left, &self.right, &self.rules);
        if let Some(scorer) = events.scorer {
            self.award_point(scorer, now_ms);
        }
        events
    }

    fn serve(&mut self) {
        self.serve_at = None;
        if self.phase() == MatchPhase::ScoredPause {
            self.fsm.fire(PhaseEvent::Served);
        }

        let low = self.rules.serve_margin;
        let high = self.rules.field_height - self.rules.serve_margin - self.ball.size.y;
        if low < high {
            self.ball.pos.y = self.rng.random_range(low..high);
        }
        self.ball.move_x = self.turn.toward();
        self.ball.move_y = if self.rng.random_bool(0.5) {
            Direction::Up
        } else {
            Direction::Down
        };
        log::debug!("Serve toward {:?}", self.turn);
    }

    fn award_point(&mut self, scorer: Side, now_ms: f64) {
        let paddle = match scorer {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        };
        paddle.score += 1;
        log::debug!(
            "Point to {:?} ({} - {})",
            scorer,
            self.left.score,
            self.right.score
        );

        self.ball = Ball::centered(&self.rules);
        self.turn = scorer.opponent();
        self.serve_at = Some(now_ms + self.rules.serve_delay_ms);
        self.fsm.fire(PhaseEvent::Scored);

        let target = self.rules.target_score;
        if self.left.score >= target || self.right.score >= target {
            self.finish(scorer);
        }
    }

    fn finish(&mut self, winner: Side) {
        if !self.fsm.fire(PhaseEvent::TargetReached) {
            return;
        }
        self.serve_at = None;
        self.player.release();
        self.opponent.release();
        let outcome = PongOutcome {
            winner,
            left_score: self.left.score,
            right_score: self.right.score,
        };
        log::info!(
            "Pong match over: {:?} wins {} - {}",
            winner,
            outcome.left_score,
            outcome.right_score
        );
        self.outcome = Some(outcome);
    }

    /// One report per seat holding a credential, each from that seat's
    /// point of view
    pub fn score_reports(&self) -> Vec<(Credential, ScoreReport)> {
        let Some(outcome) = &self.outcome else {
            return Vec::new();
        };
        [Side::Left, Side::Right]
            .into_iter()
            .filter_map(|side| {
                let seat = self.seat(side)?;
                let credential = seat.credential.clone()?;
                let their_username = self
                    .seat(side.opponent())
                    .map(|s| s.username().to_string())
                    .unwrap_or_default();
                Some((
                    credential,
                    ScoreReport {
                        their_username,
                        my_score: outcome.score_of(side),
                        their_score: outcome.score_of(side.opponent()),
                    },
                ))
            })
            .collect()
    }

    /// Drop held keys before the match is discarded
    pub fn teardown(&mut self) {
        self.player.release();
        self.opponent.release();
        self.serve_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Credential, PlayerIdentity};
    use crate::input::ControlMap;
    use crate::sim::opponent::{AiController, PaddleAction};

    fn left_keys() -> ControlMap<PaddleAction> {
        ControlMap::new()
            .bind("w", PaddleAction::Up)
            .bind("s", PaddleAction::Down)
    }

    fn right_keys() -> ControlMap<PaddleAction> {
        ControlMap::new()
            .bind("ArrowUp", PaddleAction::Up)
            .bind("ArrowDown", PaddleAction::Down)
    }

    fn seat(name: &str) -> Participant {
        Participant::new(PlayerIdentity::new(name), Credential::new(format!("tok-{name}")))
    }

    fn versus() -> PongMatch<KeyboardController> {
        PongMatch::new(
            PongRules::default(),
            seat("arthur"),
            Some(seat("ford")),
            KeyboardController::new(left_keys()),
            KeyboardController::new(right_keys()),
            42,
        )
    }

    fn started(m: &mut PongMatch<impl PaddleController>) {
        m.show();
        m.key_down("x", 0.0);
    }

    #[test]
    fn test_new_match_is_idle_until_shown() {
        let mut m = versus();
        assert_eq!(m.phase(), MatchPhase::Idle);
        m.show();
        assert_eq!(m.phase(), MatchPhase::Menu);
        assert_eq!(m.tick(0.0), StepEvents::default());
        assert!(!m.ball().is_moving());
    }

    #[test]
    fn test_any_key_starts_and_first_serve_goes_right() {
        let mut m = versus();
        started(&mut m);
        assert_eq!(m.phase(), MatchPhase::Running);
        m.tick(0.0);
        assert_eq!(m.ball().move_x, Direction::Right);
        assert!(m.ball().pos.y >= 200.0 && m.ball().pos.y <= 782.0);
    }

    #[test]
    fn test_point_freezes_ball_until_serve_delay() {
        let mut m = versus();
        started(&mut m);
        m.tick(0.0);
        m.ball.move_x = Direction::Left;
        m.ball.pos.x = 2.0;
        m.tick(10.0);

        assert_eq!(m.paddle(Side::Right).score, 1);
        assert_eq!(m.phase(), MatchPhase::ScoredPause);
        assert!(!m.ball().is_moving());
        assert!(!m.ball_visible(500.0));

        m.tick(500.0);
        assert!(!m.ball().is_moving());

        m.tick(1010.0);
        assert_eq!(m.phase(), MatchPhase::Running);
        // Loser receives the serve
        assert_eq!(m.ball().move_x, Direction::Left);
    }

    #[test]
    fn test_reports_from_each_side() {
        let mut m = versus();
        m.outcome = Some(PongOutcome {
            winner: Side::Left,
            left_score: 5,
            right_score: 3,
        });
        let reports = m.score_reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].0.token(), "tok-arthur");
        assert_eq!(
            reports[0].1,
            ScoreReport {
                their_username: "ford".into(),
                my_score: 5,
                their_score: 3
            }
        );
        assert_eq!(reports[1].1.their_username, "arthur");
        assert_eq!(reports[1].1.my_score, 3);
    }

    #[test]
    fn test_ai_seat_gets_no_report() {
        let mut m = PongMatch::new(
            PongRules::default(),
            seat("arthur"),
            None,
            KeyboardController::new(left_keys()),
            AiController,
            7,
        );
        m.outcome = Some(PongOutcome {
            winner: Side::Right,
            left_score: 1,
            right_score: 5,
        });
        let reports = m.score_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].1.their_username, "");
    }

    /// Both players stand still at the center. Every serve slips past a
    /// paddle, so the first to five wins and the outcome is handed out once.
    #[test]
    fn test_five_points_end_the_match_once() {
        let mut m = versus();
        started(&mut m);

        let mut now = 0.0;
        let mut taken = Vec::new();
        for _ in 0..20_000 {
            now += 1000.0 / 60.0;
            m.tick(now);
            if let Some(outcome) = m.take_outcome() {
                taken.push(outcome);
            }
            if m.phase().is_over() {
                break;
            }
        }
        // Keep ticking after the end: nothing changes and nothing is re-emitted
        for _ in 0..100 {
            now += 1000.0 / 60.0;
            m.tick(now);
            assert!(m.take_outcome().is_none());
        }

        assert!(m.phase().is_over());
        assert_eq!(taken.len(), 1);
        let outcome = &taken[0];
        assert_eq!(outcome.score_of(outcome.winner), 5);
        assert!(outcome.score_of(outcome.winner.opponent()) < 5);
        assert_eq!(m.score_reports().len(), 2);
    }

    #[test]
    fn test_keys_ignored_after_match_end() {
        let mut m = versus();
        started(&mut m);
        m.left.score = 4;
        m.award_point(Side::Left, 0.0);
        assert!(m.phase().is_over());
        assert!(!m.key_down("w", 1.0));
    }

    #[test]
    fn test_teardown_releases_held_keys() {
        let mut m = versus();
        started(&mut m);
        m.key_down("w", 0.0);
        m.teardown();
        let y = m.paddle(Side::Left).pos.y;
        m.tick(20.0);
        assert_eq!(m.paddle(Side::Left).pos.y, y);
    }
}

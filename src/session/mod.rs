//! Page-level session context
//!
//! Owns at most one running game and at most one tournament. Starting a game
//! always tears down the previous one first, so a stale match can never keep
//! receiving frames or key events. The session is driven synchronously by
//! the frame loop; anything that must reach the server comes back out of
//! [`Session::frame`] as [`Outbound`] values.

pub mod outbox;
pub mod setup;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

pub use outbox::{Outbound, deliver_all};

use crate::api::{Credential, MatchId, MatchResultReport, Participant, PlayerIdentity};
use crate::clock::FrameClock;
use crate::consts::TOURNAMENT_PING_MS;
use crate::error::{SetupError, TournamentError};
use crate::renderer::{
    Color, Surface, draw_panel, draw_pong, draw_tetris, pong_view, tetris_view,
};
use crate::settings::Settings;
use crate::sim::{
    AiController, KeyboardController, PaddleController, PongMatch, TetrisBoard, TetrisGame,
};
use crate::tournament::{Advance, Player, Recorded, Tournament, TournamentStatus};

/// Several tetris boards sharing one keyboard
pub struct TetrisTable {
    boards: Vec<TetrisBoard>,
    match_id: String,
    ranked: bool,
    is_tournament: bool,
    finished: bool,
}

impl TetrisTable {
    pub fn boards(&self) -> &[TetrisBoard] {
        &self.boards
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn all_over(&self) -> bool {
        self.boards.iter().all(|b| b.game.phase().is_over())
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn key_down(&mut self, key: &str, now_ms: f64) -> bool {
        let mut handled = false;
        for board in &mut self.boards {
            handled |= board.key_down(key, now_ms);
        }
        handled
    }

    fn key_up(&mut self, key: &str) -> bool {
        let mut handled = false;
        for board in &mut self.boards {
            handled |= board.key_up(key);
        }
        handled
    }

    fn update(&mut self, now_ms: f64) {
        for board in &mut self.boards {
            board.update(now_ms);
        }
    }

    /// Finalize every board once all are over. Returns the summaries to
    /// submit, exactly once.
    fn finish(&mut self) -> Option<Vec<Outbound>> {
        if self.finished || !self.all_over() {
            return None;
        }
        self.finished = true;
        for board in &mut self.boards {
            board.game.finalize();
        }
        log::info!("Tetris match {} finished", self.match_id);

        let summaries = self
            .boards
            .iter()
            .filter_map(|b| {
                let credential = b.seat.credential.clone()?;
                let summary = b.game.summary(&self.match_id, self.ranked, self.is_tournament);
                Some(Outbound::Summary {
                    credential,
                    summary,
                })
            })
            .collect();
        Some(summaries)
    }

    /// (name, score), best first. Ties keep seating order.
    pub fn scoreboard(&self) -> Vec<(String, u64)> {
        let mut rows: Vec<(String, u64)> = self
            .boards
            .iter()
            .map(|b| (b.seat.identity.label().to_string(), b.game.score()))
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1));
        rows
    }

    /// Highest score; the first-seated player wins a tie
    pub fn leader(&self) -> Option<&Participant> {
        let mut best: Option<&TetrisBoard> = None;
        for board in &self.boards {
            if best.is_none_or(|b| board.game.score() > b.game.score()) {
                best = Some(board);
            }
        }
        best.map(|b| &b.seat)
    }

    fn teardown(&mut self) {
        for board in &mut self.boards {
            board.teardown();
        }
    }
}

/// The game currently on screen
pub enum ActiveGame {
    Pong(PongMatch),
    Tetris(TetrisTable),
}

impl ActiveGame {
    pub fn is_over(&self) -> bool {
        match self {
            ActiveGame::Pong(m) => m.phase().is_over(),
            ActiveGame::Tetris(t) => t.all_over(),
        }
    }

    fn teardown(&mut self) {
        match self {
            ActiveGame::Pong(m) => m.teardown(),
            ActiveGame::Tetris(t) => t.teardown(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TournamentGame {
    Pong,
    Tetris,
}

#[derive(Debug, Clone, Copy)]
struct LiveMatch {
    id: MatchId,
    next_ping_ms: f64,
}

pub struct TournamentRun {
    bracket: Tournament,
    game: TournamentGame,
    /// Host credential used for keep-alive pings
    host: Credential,
    live: Option<LiveMatch>,
}

impl TournamentRun {
    pub fn bracket(&self) -> &Tournament {
        &self.bracket
    }

    pub fn game(&self) -> TournamentGame {
        self.game
    }

    pub fn live_match(&self) -> Option<MatchId> {
        self.live.map(|l| l.id)
    }
}

/// Seats of a casual pong match, kept so it can be replayed
#[derive(Debug, Clone)]
enum PongSeats {
    Solo(Participant),
    Versus(Participant, Participant),
}

fn seat_for(player: &Player) -> Participant {
    Participant {
        identity: PlayerIdentity::new(player.username.clone()),
        credential: player.credential.clone(),
    }
}

pub struct Session {
    settings: Settings,
    clock: FrameClock,
    current: Option<ActiveGame>,
    tournament: Option<TournamentRun>,
    /// Set while the current game is a casual pong match
    rematch: Option<PongSeats>,
    seeds: Pcg32,
}

impl Session {
    pub fn new(settings: Settings, seed: u64) -> Self {
        Self {
            settings,
            clock: FrameClock::new(),
            current: None,
            tournament: None,
            rematch: None,
            seeds: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn current(&self) -> Option<&ActiveGame> {
        self.current.as_ref()
    }

    pub fn tournament(&self) -> Option<&TournamentRun> {
        self.tournament.as_ref()
    }

    fn next_seed(&mut self) -> u64 {
        self.seeds.random()
    }

    /// Logical size of whatever is being shown
    pub fn view_size(&self) -> (f32, f32) {
        match &self.current {
            Some(ActiveGame::Tetris(t)) => {
                let rules = &self.settings.tetris;
                tetris_view::layout_size(t.boards.len(), rules.rows, rules.cols)
            }
            _ => (self.settings.pong.field_width, self.settings.pong.field_height),
        }
    }

    /// Stop the current game. A tournament match in progress is abandoned and
    /// can be replayed.
    pub fn teardown(&mut self) {
        self.drop_current();
        if let Some(run) = &mut self.tournament
            && run.live.take().is_some()
        {
            run.bracket.abandon_active();
        }
    }

    fn drop_current(&mut self) {
        if let Some(mut game) = self.current.take() {
            game.teardown();
            log::info!("Previous game torn down");
        }
        self.rematch = None;
        self.clock.reset();
    }

    /// A finished bracket stops being shown once something else starts
    fn retire_finished_tournament(&mut self) {
        if self
            .tournament
            .as_ref()
            .is_some_and(|r| matches!(r.bracket.status(), TournamentStatus::Finished { .. }))
        {
            self.tournament = None;
        }
    }

    /// Keyboard player against the AI
    pub fn start_single_pong(&mut self, player: Participant) {
        self.teardown();
        self.retire_finished_tournament();
        self.install_casual(PongSeats::Solo(player));
    }

    /// Two players on one keyboard
    pub fn start_versus_pong(&mut self, left: Participant, right: Participant) {
        self.teardown();
        self.retire_finished_tournament();
        self.install_casual(PongSeats::Versus(left, right));
    }

    fn install_casual(&mut self, seats: PongSeats) {
        match seats.clone() {
            PongSeats::Solo(player) => self.install_single(player),
            PongSeats::Versus(left, right) => self.install_versus(left, right),
        }
        self.rematch = Some(seats);
    }

    /// Fresh match with the same seats as the finished one
    fn start_rematch(&mut self) {
        let Some(seats) = self.rematch.clone() else {
            return;
        };
        self.drop_current();
        log::info!("Rematch");
        self.install_casual(seats);
    }

    fn rematch_ready(&self) -> bool {
        self.rematch.is_some()
            && matches!(&self.current, Some(ActiveGame::Pong(m)) if m.phase().is_over())
    }

    fn install_single(&mut self, player: Participant) {
        let seed = self.next_seed();
        let controls = self.settings.controls.pong_solo.clone();
        let opponent: Box<dyn PaddleController> = Box::new(AiController);
        let m = PongMatch::new(
            self.settings.pong.clone(),
            player,
            None,
            KeyboardController::new(controls),
            opponent,
            seed,
        );
        self.install_pong(m);
    }

    fn install_versus(&mut self, left: Participant, right: Participant) {
        let seed = self.next_seed();
        let controls = &self.settings.controls;
        let opponent: Box<dyn PaddleController> =
            Box::new(KeyboardController::new(controls.pong_right.clone()));
        let m = PongMatch::new(
            self.settings.pong.clone(),
            left,
            Some(right),
            KeyboardController::new(controls.pong_left.clone()),
            opponent,
            seed,
        );
        self.install_pong(m);
    }

    fn install_pong(&mut self, mut m: PongMatch) {
        m.show();
        log::info!("Pong match ready");
        self.current = Some(ActiveGame::Pong(m));
    }

    /// One board per seat, seated in order
    pub fn start_tetris(&mut self, seats: Vec<Participant>, now_ms: f64) -> Result<(), SetupError> {
        self.teardown();
        self.retire_finished_tournament();
        let ranked = self.settings.ranked;
        self.install_tetris(seats, ranked, false, now_ms)
    }

    fn install_tetris(
        &mut self,
        seats: Vec<Participant>,
        ranked: bool,
        is_tournament: bool,
        now_ms: f64,
    ) -> Result<(), SetupError> {
        let max = self.settings.max_local_tetris_players();
        if seats.is_empty() || seats.len() > max {
            return Err(SetupError::TooManyPlayers { max });
        }
        let seeds: Vec<u64> = seats.iter().map(|_| self.next_seed()).collect();
        let settings = &self.settings;

        let boards = seats
            .into_iter()
            .zip(&settings.controls.tetris)
            .zip(seeds)
            .map(|((seat, controls), seed)| {
                let mut game = TetrisGame::new(settings.tetris.clone(), seed);
                game.start(now_ms);
                TetrisBoard::new(game, seat, controls.clone(), settings.repeat)
            })
            .collect::<Vec<_>>();

        log::info!("Tetris match started with {} boards", boards.len());
        self.current = Some(ActiveGame::Tetris(TetrisTable {
            boards,
            match_id: format!("{}", now_ms.max(0.0) as u64),
            ranked,
            is_tournament,
            finished: false,
        }));
        Ok(())
    }

    /// Open registration with the host seated first
    pub fn open_tournament(&mut self, host: Player, game: TournamentGame) -> Result<(), TournamentError> {
        if self
            .tournament
            .as_ref()
            .is_some_and(|r| *r.bracket.status() == TournamentStatus::InProgress)
        {
            return Err(TournamentError::AlreadyStarted);
        }
        let host_credential = host
            .credential
            .clone()
            .ok_or(TournamentError::Setup(SetupError::MissingIdentity))?;

        self.teardown();
        let mut bracket = Tournament::new(self.next_seed());
        bracket.register(Player { primary: true, ..host })?;
        self.tournament = Some(TournamentRun {
            bracket,
            game,
            host: host_credential,
            live: None,
        });
        Ok(())
    }

    fn run_mut(&mut self) -> Result<&mut TournamentRun, TournamentError> {
        self.tournament.as_mut().ok_or(TournamentError::NotStarted)
    }

    pub fn is_registered(&self, username: &str) -> bool {
        self.tournament
            .as_ref()
            .is_some_and(|r| r.bracket.player(username).is_some())
    }

    pub fn register_player(&mut self, player: Player) -> Result<(), TournamentError> {
        self.run_mut()?.bracket.register(player)
    }

    pub fn remove_player(&mut self, username: &str) -> Result<Player, TournamentError> {
        self.run_mut()?.bracket.remove(username)
    }

    /// Close registration and pair round one. Returns the bracket lines.
    pub fn start_tournament(&mut self) -> Result<Vec<String>, TournamentError> {
        let run = self.run_mut()?;
        run.bracket.start()?;
        Ok(run.bracket.bracket_lines())
    }

    /// Start the next bracket match, or report the champion
    pub fn advance_tournament(&mut self, now_ms: f64) -> Result<Advance, TournamentError> {
        let run = self.run_mut()?;
        if run.live.is_some() {
            return Err(TournamentError::AdvanceInProgress);
        }
        let entry = match run.bracket.advance()? {
            Advance::Play(entry) => entry,
            champion => return Ok(champion),
        };

        let first = run.bracket.player(&entry.first).map(seat_for);
        let second = entry
            .second
            .as_deref()
            .and_then(|name| run.bracket.player(name))
            .map(seat_for);
        let (Some(first), Some(second)) = (first, second) else {
            run.bracket.abandon_active();
            return Err(TournamentError::UnknownMatch(entry.id));
        };
        let game = run.game;
        run.live = Some(LiveMatch {
            id: entry.id,
            next_ping_ms: now_ms,
        });
        log::info!("Tournament match {}: {} vs {}", entry.id, first.username(), second.username());

        self.drop_current();
        match game {
            TournamentGame::Pong => self.install_versus(first, second),
            TournamentGame::Tetris => {
                if let Err(e) = self.install_tetris(vec![first, second], false, true, now_ms) {
                    self.teardown();
                    return Err(e.into());
                }
            }
        }
        Ok(Advance::Play(entry))
    }

    /// Abort the tournament and any match being played for it
    pub fn cancel_tournament(&mut self) {
        let Some(run) = &mut self.tournament else {
            return;
        };
        let was_live = run.live.take().is_some();
        run.bracket.cancel();
        if was_live {
            self.drop_current();
        }
        self.tournament = None;
        log::info!("Tournament cancelled");
    }

    fn awaiting_next_match(&self) -> bool {
        self.tournament.as_ref().is_some_and(|r| {
            *r.bracket.status() == TournamentStatus::InProgress && r.live.is_none()
        })
    }

    /// Route a key press. Between tournament matches any key starts the
    /// next one; after a casual pong match it starts a rematch.
    pub fn key_down(&mut self, key: &str, now_ms: f64) -> bool {
        if self.awaiting_next_match() {
            match self.advance_tournament(now_ms) {
                Ok(Advance::Play(entry)) => log::debug!("Advanced to match {}", entry.id),
                Ok(Advance::Champion(name)) => log::info!("{} won the tournament", name),
                Err(e) => log::warn!("Could not advance tournament: {}", e),
            }
            return true;
        }
        if self.rematch_ready() {
            self.start_rematch();
            return true;
        }
        match &mut self.current {
            Some(ActiveGame::Pong(m)) => m.key_down(key, now_ms),
            Some(ActiveGame::Tetris(t)) => t.key_down(key, now_ms),
            None => false,
        }
    }

    pub fn key_up(&mut self, key: &str) -> bool {
        match &mut self.current {
            Some(ActiveGame::Pong(m)) => m.key_up(key),
            Some(ActiveGame::Tetris(t)) => t.key_up(key),
            None => false,
        }
    }

    /// Advance the current game to `now_ms` and collect anything that must
    /// be sent to the server
    pub fn frame(&mut self, now_ms: f64) -> Vec<Outbound> {
        let steps = self.clock.advance(now_ms);
        let in_tournament = self.tournament.as_ref().is_some_and(|r| r.live.is_some());
        let mut out = Vec::new();

        let winner = match &mut self.current {
            Some(ActiveGame::Pong(m)) => {
                for _ in 0..steps {
                    m.tick(now_ms);
                }
                m.take_outcome().and_then(|outcome| {
                    out.extend(m.score_reports().into_iter().map(|(credential, report)| {
                        Outbound::Score { credential, report }
                    }));
                    if in_tournament {
                        m.seat(outcome.winner).map(|s| s.username().to_string())
                    } else {
                        None
                    }
                })
            }
            Some(ActiveGame::Tetris(t)) => {
                t.update(now_ms);
                match t.finish() {
                    Some(summaries) => {
                        out.extend(summaries);
                        t.leader()
                            .filter(|_| in_tournament)
                            .map(|s| s.username().to_string())
                    }
                    None => None,
                }
            }
            None => None,
        };

        if let Some(winner) = winner {
            out.extend(self.record_tournament_result(&winner));
        }
        if let Some(ping) = self.due_ping(now_ms) {
            out.push(ping);
        }
        out
    }

    fn record_tournament_result(&mut self, winner: &str) -> Vec<Outbound> {
        let Some(run) = &mut self.tournament else {
            return Vec::new();
        };
        let Some(live) = run.live.take() else {
            return Vec::new();
        };
        let (winner, loser) = match run.bracket.record_result(live.id, winner) {
            Ok(Recorded::New { winner, loser }) => (winner, loser),
            Ok(Recorded::Duplicate) => return Vec::new(),
            Err(e) => {
                log::warn!("Could not record match {}: {}", live.id, e);
                run.bracket.abandon_active();
                return Vec::new();
            }
        };

        [
            (winner, MatchResultReport::winner(live.id)),
            (loser, MatchResultReport::loser(live.id)),
        ]
        .into_iter()
        .filter_map(|(name, report)| {
            let credential = run.bracket.player(&name)?.credential.clone()?;
            Some(Outbound::MatchResult { credential, report })
        })
        .collect()
    }

    fn due_ping(&mut self, now_ms: f64) -> Option<Outbound> {
        let run = self.tournament.as_mut()?;
        let live = run.live.as_mut()?;
        if now_ms < live.next_ping_ms {
            return None;
        }
        live.next_ping_ms = now_ms + TOURNAMENT_PING_MS;
        Some(Outbound::Ping {
            credential: run.host.clone(),
            match_id: live.id,
        })
    }

    pub fn draw<S: Surface>(&self, surface: &mut S, now_ms: f64) {
        match &self.current {
            Some(ActiveGame::Pong(m)) => {
                draw_pong(m, surface, now_ms);
                if self.rematch_ready() {
                    pong_view::draw_rematch_prompt(m.rules(), surface);
                }
            }
            Some(ActiveGame::Tetris(t)) => {
                let scores = t.is_finished().then(|| t.scoreboard());
                draw_tetris(t.boards(), scores.as_deref(), surface);
            }
            None => surface.clear(Color::BLACK),
        }

        let Some(run) = &self.tournament else {
            return;
        };
        if run.live.is_some() {
            return;
        }
        match run.bracket.status() {
            TournamentStatus::Finished { champion } => {
                draw_panel(surface, &format!("Champion: {champion}"), &[]);
            }
            TournamentStatus::InProgress => {
                let round = run.bracket.current_round().map_or(0, |r| r.number);
                let mut lines = run.bracket.bracket_lines();
                lines.push(String::new());
                lines.push("Press any key to continue".to_string());
                draw_panel(surface, &format!("Round {round}"), &lines);
            }
            TournamentStatus::Registration | TournamentStatus::Cancelled => {}
        }
    }
}

//! Single-elimination bracket coordinator
//!
//! Players register, the bracket is paired at random, and rounds are played
//! one match at a time. An odd player out gets a bye. Only one match may be
//! in progress at a time: [`Tournament::advance`] hands out the next pairing
//! and refuses until [`Tournament::record_result`] or
//! [`Tournament::abandon_active`] releases it.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;

use crate::api::{Credential, MatchId};
use crate::error::TournamentError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub username: String,
    pub credential: Option<Credential>,
    /// The account that opened the tournament
    pub primary: bool,
    pub eliminated: bool,
}

impl Player {
    pub fn new(username: impl Into<String>, credential: Option<Credential>) -> Self {
        Self {
            username: username.into(),
            credential,
            primary: false,
            eliminated: false,
        }
    }

    pub fn primary(username: impl Into<String>, credential: Credential) -> Self {
        Self {
            primary: true,
            ..Self::new(username, Some(credential))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketEntry {
    pub id: MatchId,
    pub first: String,
    /// `None` for a bye
    pub second: Option<String>,
    pub winner: Option<String>,
}

impl BracketEntry {
    pub fn is_bye(&self) -> bool {
        self.second.is_none()
    }

    /// Human-readable bracket line
    pub fn describe(&self) -> String {
        match (&self.second, &self.winner) {
            (None, _) => format!("{} gets a bye (auto-advances)", self.first),
            (Some(second), None) => format!("{} vs {}", self.first, second),
            (Some(second), Some(winner)) => {
                format!("{} vs {} -> Winner: {}", self.first, second, winner)
            }
        }
    }

    fn loser(&self) -> Option<&str> {
        let winner = self.winner.as_deref()?;
        let second = self.second.as_deref()?;
        Some(if winner == self.first { second } else { &self.first })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub number: u32,
    pub entries: Vec<BracketEntry>,
}

impl Round {
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|e| e.winner.is_some())
    }

    pub fn winners(&self) -> Vec<String> {
        self.entries.iter().filter_map(|e| e.winner.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TournamentStatus {
    Registration,
    InProgress,
    Finished { champion: String },
    Cancelled,
}

/// Result of asking for the next match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Play(BracketEntry),
    Champion(String),
}

/// Result of recording a match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    /// First result for this entry; report it
    New { winner: String, loser: String },
    /// Already decided; nothing changes
    Duplicate,
}

#[derive(Debug, Clone)]
pub struct Tournament {
    players: Vec<Player>,
    rounds: Vec<Round>,
    status: TournamentStatus,
    active_match: Option<MatchId>,
    next_id: MatchId,
    rng: Pcg32,
}

impl Tournament {
    pub fn new(seed: u64) -> Self {
        Self {
            players: Vec::new(),
            rounds: Vec::new(),
            status: TournamentStatus::Registration,
            active_match: None,
            next_id: 1,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, username: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.username == username)
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn current_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    pub fn status(&self) -> &TournamentStatus {
        &self.status
    }

    pub fn active_match(&self) -> Option<MatchId> {
        self.active_match
    }

    pub fn champion(&self) -> Option<&str> {
        match &self.status {
            TournamentStatus::Finished { champion } => Some(champion),
            _ => None,
        }
    }

    fn ensure_registration(&self) -> Result<(), TournamentError> {
        match self.status {
            TournamentStatus::Registration => Ok(()),
            _ => Err(TournamentError::AlreadyStarted),
        }
    }

    /// Add a player. The primary player always sits first.
    pub fn register(&mut self, player: Player) -> Result<(), TournamentError> {
        self.ensure_registration()?;
        if self.player(&player.username).is_some() {
            log::warn!("{} is already registered", player.username);
            return Err(TournamentError::DuplicatePlayer(player.username));
        }
        log::info!("Registered {}", player.username);
        if player.primary {
            self.players.insert(0, player);
        } else {
            self.players.push(player);
        }
        Ok(())
    }

    pub fn remove(&mut self, username: &str) -> Result<Player, TournamentError> {
        self.ensure_registration()?;
        let index = self
            .players
            .iter()
            .position(|p| p.username == username)
            .ok_or_else(|| TournamentError::UnknownPlayer(username.to_string()))?;
        if self.players[index].primary {
            return Err(TournamentError::PrimaryPlayerRemoval);
        }
        Ok(self.players.remove(index))
    }

    /// Close registration and pair the first round
    pub fn start(&mut self) -> Result<&Round, TournamentError> {
        self.ensure_registration()?;
        if self.players.len() < 2 {
            return Err(TournamentError::NotEnoughPlayers);
        }
        self.status = TournamentStatus::InProgress;
        let names = self.players.iter().map(|p| p.username.clone()).collect();
        self.pair_round(names);
        log::info!("Tournament started with {} players", self.players.len());
        self.rounds.last().ok_or(TournamentError::NotStarted)
    }

    fn pair_round(&mut self, mut names: Vec<String>) {
        names.shuffle(&mut self.rng);
        let mut entries = Vec::with_capacity(names.len().div_ceil(2));
        for pair in names.chunks(2) {
            let id = self.next_id;
            self.next_id += 1;
            let entry = match pair {
                [first, second] => BracketEntry {
                    id,
                    first: first.clone(),
                    second: Some(second.clone()),
                    winner: None,
                },
                [single] => BracketEntry {
                    id,
                    first: single.clone(),
                    second: None,
                    winner: Some(single.clone()),
                },
                _ => continue,
            };
            entries.push(entry);
        }
        let number = self.rounds.len() as u32 + 1;
        log::info!("Round {} paired: {} entries", number, entries.len());
        self.rounds.push(Round { number, entries });
    }

    /// Reserve the next match to play, pairing a new round when the current
    /// one is complete
    pub fn advance(&mut self) -> Result<Advance, TournamentError> {
        match &self.status {
            TournamentStatus::Registration | TournamentStatus::Cancelled => {
                return Err(TournamentError::NotStarted);
            }
            TournamentStatus::Finished { champion } => return Ok(Advance::Champion(champion.clone())),
            TournamentStatus::InProgress => {}
        }
        if self.active_match.is_some() {
            return Err(TournamentError::AdvanceInProgress);
        }

        loop {
            let round = self.rounds.last().ok_or(TournamentError::NotStarted)?;
            if let Some(entry) = round.entries.iter().find(|e| e.winner.is_none()) {
                let entry = entry.clone();
                self.active_match = Some(entry.id);
                return Ok(Advance::Play(entry));
            }

            let winners = round.winners();
            if let [champion] = winners.as_slice() {
                let champion = champion.clone();
                log::info!("Tournament champion: {}", champion);
                self.status = TournamentStatus::Finished {
                    champion: champion.clone(),
                };
                return Ok(Advance::Champion(champion));
            }
            self.pair_round(winners);
        }
    }

    fn entry_mut(&mut self, id: MatchId) -> Option<&mut BracketEntry> {
        self.rounds
            .iter_mut()
            .flat_map(|r| r.entries.iter_mut())
            .find(|e| e.id == id)
    }

    /// Record the winner of match `id`. Recording the same match again is a
    /// no-op.
    pub fn record_result(&mut self, id: MatchId, winner: &str) -> Result<Recorded, TournamentError> {
        let active = self.active_match;
        let entry = self
            .entry_mut(id)
            .ok_or(TournamentError::UnknownMatch(id))?;
        if entry.winner.is_some() {
            log::warn!("Match {} already has a result", id);
            return Ok(Recorded::Duplicate);
        }
        if active != Some(id) {
            return Err(TournamentError::MatchNotActive(id));
        }
        if entry.first != winner && entry.second.as_deref() != Some(winner) {
            return Err(TournamentError::UnknownPlayer(winner.to_string()));
        }

        entry.winner = Some(winner.to_string());
        let loser = entry.loser().unwrap_or_default().to_string();
        self.active_match = None;
        if let Some(p) = self.players.iter_mut().find(|p| p.username == loser) {
            p.eliminated = true;
        }
        log::info!("Match {}: {} beat {}", id, winner, loser);
        Ok(Recorded::New {
            winner: winner.to_string(),
            loser,
        })
    }

    /// Release the active match without a result so it can be replayed
    pub fn abandon_active(&mut self) -> Option<MatchId> {
        let id = self.active_match.take()?;
        log::info!("Match {} abandoned", id);
        Some(id)
    }

    pub fn cancel(&mut self) {
        if matches!(self.status, TournamentStatus::Finished { .. }) {
            return;
        }
        self.active_match = None;
        self.status = TournamentStatus::Cancelled;
        log::info!("Tournament cancelled");
    }

    /// Lines describing the current round
    pub fn bracket_lines(&self) -> Vec<String> {
        self.current_round()
            .map(|r| r.entries.iter().map(BracketEntry::describe).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cred(name: &str) -> Credential {
        Credential::new(format!("tok-{name}"))
    }

    fn with_players(names: &[&str], seed: u64) -> Tournament {
        let mut t = Tournament::new(seed);
        for (i, name) in names.iter().enumerate() {
            let player = if i == 0 {
                Player::primary(*name, cred(name))
            } else {
                Player::new(*name, Some(cred(name)))
            };
            t.register(player).unwrap();
        }
        t
    }

    fn play(t: &mut Tournament) -> BracketEntry {
        match t.advance().unwrap() {
            Advance::Play(entry) => entry,
            Advance::Champion(name) => panic!("unexpected champion {name}"),
        }
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut t = with_players(&["arthur"], 1);
        let err = t.register(Player::new("arthur", None)).unwrap_err();
        assert_eq!(err, TournamentError::DuplicatePlayer("arthur".into()));
    }

    #[test]
    fn test_primary_sits_first_and_cannot_leave() {
        let mut t = Tournament::new(1);
        t.register(Player::new("ford", None)).unwrap();
        t.register(Player::primary("arthur", cred("arthur"))).unwrap();
        assert_eq!(t.players()[0].username, "arthur");
        assert_eq!(t.remove("arthur"), Err(TournamentError::PrimaryPlayerRemoval));
        assert!(t.remove("ford").is_ok());
        assert_eq!(t.remove("ford"), Err(TournamentError::UnknownPlayer("ford".into())));
    }

    #[test]
    fn test_needs_two_players() {
        let mut t = with_players(&["arthur"], 1);
        assert_eq!(t.start().unwrap_err(), TournamentError::NotEnoughPlayers);
    }

    #[test]
    fn test_registration_closes_at_start() {
        let mut t = with_players(&["arthur", "ford"], 1);
        t.start().unwrap();
        assert_eq!(
            t.register(Player::new("zaphod", None)),
            Err(TournamentError::AlreadyStarted)
        );
        assert_eq!(t.start().unwrap_err(), TournamentError::AlreadyStarted);
    }

    #[test]
    fn test_advance_before_start_fails() {
        let mut t = with_players(&["arthur", "ford"], 1);
        assert_eq!(t.advance(), Err(TournamentError::NotStarted));
    }

    #[test]
    fn test_three_players_one_bye() {
        let mut t = with_players(&["arthur", "ford", "trillian"], 9);
        let round = t.start().unwrap().clone();
        assert_eq!(round.entries.len(), 2);
        let byes: Vec<_> = round.entries.iter().filter(|e| e.is_bye()).collect();
        assert_eq!(byes.len(), 1);
        let bye_player = byes[0].first.clone();
        assert_eq!(byes[0].winner.as_deref(), Some(bye_player.as_str()));
        assert!(t.bracket_lines().contains(&format!("{bye_player} gets a bye (auto-advances)")));

        let first = play(&mut t);
        assert!(!first.is_bye());
        t.record_result(first.id, &first.first).unwrap();

        let final_match = play(&mut t);
        assert_eq!(t.rounds().len(), 2);
        let finalists = [final_match.first.clone(), final_match.second.clone().unwrap()];
        assert!(finalists.contains(&first.first));
        assert!(finalists.contains(&bye_player));

        t.record_result(final_match.id, &bye_player).unwrap();
        assert_eq!(t.advance(), Ok(Advance::Champion(bye_player.clone())));
        assert_eq!(t.champion(), Some(bye_player.as_str()));
    }

    #[test]
    fn test_second_advance_while_match_live_is_refused() {
        let mut t = with_players(&["arthur", "ford", "trillian", "zaphod"], 3);
        t.start().unwrap();
        let entry = play(&mut t);
        assert_eq!(t.advance(), Err(TournamentError::AdvanceInProgress));
        t.record_result(entry.id, &entry.first).unwrap();
        assert!(t.advance().is_ok());
    }

    #[test]
    fn test_duplicate_result_is_noop() {
        let mut t = with_players(&["arthur", "ford"], 3);
        t.start().unwrap();
        let entry = play(&mut t);
        let first = t.record_result(entry.id, &entry.first).unwrap();
        assert!(matches!(first, Recorded::New { .. }));
        let again = t.record_result(entry.id, entry.second.as_deref().unwrap()).unwrap();
        assert_eq!(again, Recorded::Duplicate);
        assert_eq!(t.rounds()[0].entries[0].winner.as_deref(), Some(entry.first.as_str()));
    }

    #[test]
    fn test_result_for_idle_match_rejected() {
        let mut t = with_players(&["arthur", "ford", "trillian", "zaphod"], 3);
        t.start().unwrap();
        let playing = play(&mut t);
        let other = t.rounds()[0]
            .entries
            .iter()
            .find(|e| e.id != playing.id)
            .cloned()
            .unwrap();
        assert_eq!(
            t.record_result(other.id, &other.first),
            Err(TournamentError::MatchNotActive(other.id))
        );
        assert_eq!(t.record_result(999, "arthur"), Err(TournamentError::UnknownMatch(999)));
    }

    #[test]
    fn test_winner_must_be_in_match() {
        let mut t = with_players(&["arthur", "ford"], 3);
        t.start().unwrap();
        let entry = play(&mut t);
        assert_eq!(
            t.record_result(entry.id, "marvin"),
            Err(TournamentError::UnknownPlayer("marvin".into()))
        );
    }

    #[test]
    fn test_loser_is_eliminated_and_line_shows_winner() {
        let mut t = with_players(&["arthur", "ford"], 3);
        t.start().unwrap();
        let entry = play(&mut t);
        let loser = entry.second.clone().unwrap();
        t.record_result(entry.id, &entry.first).unwrap();
        assert!(t.player(&loser).unwrap().eliminated);
        assert_eq!(
            t.bracket_lines(),
            vec![format!("{} vs {} -> Winner: {}", entry.first, loser, entry.first)]
        );
    }

    #[test]
    fn test_abandon_releases_lock_for_replay() {
        let mut t = with_players(&["arthur", "ford"], 3);
        t.start().unwrap();
        let entry = play(&mut t);
        assert_eq!(t.abandon_active(), Some(entry.id));
        assert_eq!(play(&mut t).id, entry.id);
    }

    #[test]
    fn test_cancel_stops_advancing() {
        let mut t = with_players(&["arthur", "ford"], 3);
        t.start().unwrap();
        play(&mut t);
        t.cancel();
        assert_eq!(t.active_match(), None);
        assert_eq!(t.advance(), Err(TournamentError::NotStarted));
    }

    proptest! {
        #[test]
        fn prop_finishes_in_log2_rounds(n in 2usize..40, seed in any::<u64>(), picks in any::<u64>()) {
            let names: Vec<String> = (0..n).map(|i| format!("p{i}")).collect();
            let mut t = Tournament::new(seed);
            for name in &names {
                t.register(Player::new(name.clone(), None)).unwrap();
            }
            t.start().unwrap();

            let mut matches = 0u32;
            let champion = loop {
                match t.advance().unwrap() {
                    Advance::Play(entry) => {
                        let winner = if (picks >> (matches % 64)) & 1 == 0 {
                            entry.first.clone()
                        } else {
                            entry.second.clone().unwrap()
                        };
                        t.record_result(entry.id, &winner).unwrap();
                        matches += 1;
                    }
                    Advance::Champion(name) => break name,
                }
            };

            let expected_rounds = (n as f64).log2().ceil() as usize;
            prop_assert_eq!(t.rounds().len(), expected_rounds);
            prop_assert_eq!(matches as usize, n - 1);
            prop_assert!(names.contains(&champion));
            let alive = t.players().iter().filter(|p| !p.eliminated).count();
            prop_assert_eq!(alive, 1);
        }
    }
}

//! Boundary contracts for the remote game server
//!
//! The simulation never talks to the network. Sessions resolve identities and
//! credentials before a match starts and hand terminal results to a [`GameApi`]
//! implementation after it ends.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Bracket entry identifier, unique within a tournament
pub type MatchId = u32;

/// Opaque bearer token scoped to one player
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(..)")
    }
}

/// Who a credential belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl PlayerIdentity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            display_name: None,
        }
    }

    /// Name shown on the HUD
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

/// A player seated in a match: identity plus the credential used to report
/// on their behalf. AI opponents have neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub identity: PlayerIdentity,
    pub credential: Option<Credential>,
}

impl Participant {
    pub fn new(identity: PlayerIdentity, credential: Credential) -> Self {
        Self {
            identity,
            credential: Some(credential),
        }
    }

    pub fn anonymous(username: impl Into<String>) -> Self {
        Self {
            identity: PlayerIdentity::new(username),
            credential: None,
        }
    }

    pub fn username(&self) -> &str {
        &self.identity.username
    }
}

/// Final pong score from one player's point of view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub their_username: String,
    pub my_score: u32,
    pub their_score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Winner,
    Loser,
}

/// One half of a tournament result. The winner's half is sent first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResultReport {
    pub status: ResultStatus,
    pub match_id: MatchId,
    /// 1 for the winner, 2 for the loser
    pub sequence: u8,
    pub total: u8,
}

impl MatchResultReport {
    pub fn winner(match_id: MatchId) -> Self {
        Self {
            status: ResultStatus::Winner,
            match_id,
            sequence: 1,
            total: 2,
        }
    }

    pub fn loser(match_id: MatchId) -> Self {
        Self {
            status: ResultStatus::Loser,
            match_id,
            sequence: 2,
            total: 2,
        }
    }
}

/// End-of-game record for one tetris board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    /// Shared by every board of the same session
    pub match_id: String,
    pub score: u64,
    pub lines_cleared: u32,
    pub level: u32,
    pub ranked: bool,
    pub is_tournament: bool,
}

/// Remote collaborator used around matches.
///
/// Calls are made from a single-threaded frontend, so futures need not be
/// `Send`.
#[allow(async_fn_in_trait)]
pub trait GameApi {
    /// Identity behind `credential`
    async fn current_user(&self, credential: &Credential) -> Result<PlayerIdentity, ApiError>;

    /// Ask `username` to let this session act on their behalf.
    /// Fails with [`ApiError::Denied`] when they decline.
    async fn acquire_opponent_credential(&self, username: &str) -> Result<Credential, ApiError>;

    async fn publish_score(
        &self,
        credential: &Credential,
        report: &ScoreReport,
    ) -> Result<(), ApiError>;

    async fn report_match_result(
        &self,
        credential: &Credential,
        report: &MatchResultReport,
    ) -> Result<(), ApiError>;

    async fn submit_game_summary(
        &self,
        credential: &Credential,
        summary: &GameSummary,
    ) -> Result<(), ApiError>;

    /// Keep-alive while a tournament match is being played
    async fn ping_tournament(&self, credential: &Credential, match_id: MatchId)
    -> Result<(), ApiError>;
}

#[cfg(test)]
pub(crate) mod mock {
    //! Recording in-memory server for tests

    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        CurrentUser(String),
        Acquire(String),
        Publish(String, ScoreReport),
        Report(String, MatchResultReport),
        Summary(String, GameSummary),
        Ping(String, MatchId),
    }

    /// Tokens are `"tok-<username>"`
    #[derive(Default)]
    pub struct MockApi {
        pub calls: RefCell<Vec<Call>>,
        pub refusing: HashSet<String>,
        pub failing_publish: bool,
        pub identities: HashMap<String, String>,
    }

    impl MockApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn refusing(mut self, username: &str) -> Self {
            self.refusing.insert(username.to_string());
            self
        }

        pub fn token_for(username: &str) -> Credential {
            Credential::new(format!("tok-{username}"))
        }

        fn owner(credential: &Credential) -> String {
            credential.token().trim_start_matches("tok-").to_string()
        }

        fn record(&self, call: Call) {
            self.calls.borrow_mut().push(call);
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls.borrow().iter().filter(|c| pred(c)).count()
        }
    }

    impl GameApi for MockApi {
        async fn current_user(
            &self,
            credential: &Credential,
        ) -> Result<PlayerIdentity, ApiError> {
            let owner = Self::owner(credential);
            self.record(Call::CurrentUser(owner.clone()));
            if owner.is_empty() {
                return Err(ApiError::Unauthorized);
            }
            let mut identity = PlayerIdentity::new(owner.clone());
            identity.display_name = self.identities.get(&owner).cloned();
            Ok(identity)
        }

        async fn acquire_opponent_credential(&self, username: &str) -> Result<Credential, ApiError> {
            self.record(Call::Acquire(username.to_string()));
            if self.refusing.contains(username) {
                Err(ApiError::Denied)
            } else {
                Ok(Self::token_for(username))
            }
        }

        async fn publish_score(
            &self,
            credential: &Credential,
            report: &ScoreReport,
        ) -> Result<(), ApiError> {
            self.record(Call::Publish(Self::owner(credential), report.clone()));
            if self.failing_publish {
                Err(ApiError::Http { status: 500 })
            } else {
                Ok(())
            }
        }

        async fn report_match_result(
            &self,
            credential: &Credential,
            report: &MatchResultReport,
        ) -> Result<(), ApiError> {
            self.record(Call::Report(Self::owner(credential), report.clone()));
            Ok(())
        }

        async fn submit_game_summary(
            &self,
            credential: &Credential,
            summary: &GameSummary,
        ) -> Result<(), ApiError> {
            self.record(Call::Summary(Self::owner(credential), summary.clone()));
            Ok(())
        }

        async fn ping_tournament(
            &self,
            credential: &Credential,
            match_id: MatchId,
        ) -> Result<(), ApiError> {
            self.record(Call::Ping(Self::owner(credential), match_id));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_hides_token() {
        let cred = Credential::new("secret-token");
        assert_eq!(format!("{cred:?}"), "Credential(..)");
        assert_eq!(cred.token(), "secret-token");
    }

    #[test]
    fn test_result_reports_are_ordered_winner_first() {
        let win = MatchResultReport::winner(7);
        let lose = MatchResultReport::loser(7);
        assert_eq!((win.sequence, win.total), (1, 2));
        assert_eq!((lose.sequence, lose.total), (2, 2));
        assert_eq!(win.status, ResultStatus::Winner);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&MatchResultReport::loser(3)).unwrap();
        assert!(json.contains("\"status\":\"loser\""));
    }

    #[test]
    fn test_label_prefers_display_name() {
        let mut identity = PlayerIdentity::new("zaphod");
        assert_eq!(identity.label(), "zaphod");
        identity.display_name = Some("Zaphod B.".into());
        assert_eq!(identity.label(), "Zaphod B.");
    }
}

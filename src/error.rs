//! Error taxonomy
//!
//! Routine gameplay rejections (illegal moves, duplicate terminal events)
//! are not errors and never show up here.

use thiserror::Error;

/// Failure reported by a remote collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The other player declined delegation
    #[error("request denied")]
    Denied,
    #[error("credential rejected")]
    Unauthorized,
    #[error("server responded with status {status}")]
    Http { status: u16 },
    #[error("network failure: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Match construction aborted before the simulation could start
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("could not resolve the identity of a participant")]
    MissingIdentity,
    #[error("{username} declined to delegate their credential")]
    CredentialDenied { username: String },
    #[error("at most {max} players can share the keyboard")]
    TooManyPlayers { max: usize },
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Structural tournament failures and coordinator misuse
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TournamentError {
    #[error("a tournament needs at least 2 players")]
    NotEnoughPlayers,
    #[error("{0} is already registered")]
    DuplicatePlayer(String),
    #[error("{0} is not registered")]
    UnknownPlayer(String),
    #[error("the primary player cannot be removed")]
    PrimaryPlayerRemoval,
    #[error("the tournament has already started")]
    AlreadyStarted,
    #[error("the tournament has not started")]
    NotStarted,
    #[error("a match is already being played")]
    AdvanceInProgress,
    #[error("no bracket entry with id {0}")]
    UnknownMatch(u32),
    #[error("match {0} is not the active match")]
    MatchNotActive(u32),
    #[error(transparent)]
    Setup(#[from] SetupError),
}

/// Stored settings could not be read or written
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_wraps_api_error() {
        let err: SetupError = ApiError::Http { status: 502 }.into();
        assert_eq!(err.to_string(), "server responded with status 502");
    }

    #[test]
    fn test_denied_credential_names_player() {
        let err = SetupError::CredentialDenied {
            username: "marvin".into(),
        };
        assert_eq!(err.to_string(), "marvin declined to delegate their credential");
    }
}

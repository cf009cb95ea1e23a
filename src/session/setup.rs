//! Match setup
//!
//! Identities and delegated credentials are resolved before any match state
//! exists. A failure here means no match is constructed.

use crate::api::{Credential, GameApi, Participant};
use crate::error::{ApiError, SetupError};
use crate::tournament::Player;

/// The session owner, resolved from their own credential
pub async fn resolve_primary<A: GameApi>(
    api: &A,
    credential: &Credential,
) -> Result<Participant, SetupError> {
    let identity = api
        .current_user(credential)
        .await
        .map_err(|e| match e {
            ApiError::Unauthorized => SetupError::MissingIdentity,
            other => other.into(),
        })?;
    Ok(Participant::new(identity, credential.clone()))
}

/// Another local player. They must agree to delegate their credential.
pub async fn resolve_opponent<A: GameApi>(
    api: &A,
    username: &str,
) -> Result<Participant, SetupError> {
    let credential = api
        .acquire_opponent_credential(username)
        .await
        .map_err(|e| match e {
            ApiError::Denied => SetupError::CredentialDenied {
                username: username.to_string(),
            },
            other => other.into(),
        })?;
    let identity = api.current_user(&credential).await?;
    log::info!("{} joined the match", identity.username);
    Ok(Participant::new(identity, credential))
}

/// Every seat of a local multi-board tetris match, owner first
pub async fn resolve_tetris_seats<A: GameApi>(
    api: &A,
    credential: &Credential,
    opponents: &[String],
    max_players: usize,
) -> Result<Vec<Participant>, SetupError> {
    if opponents.len() + 1 > max_players {
        return Err(SetupError::TooManyPlayers { max: max_players });
    }
    let mut seats = vec![resolve_primary(api, credential).await?];
    for username in opponents {
        seats.push(resolve_opponent(api, username).await?);
    }
    Ok(seats)
}

/// Tournament entrant backed by a delegated credential
pub async fn resolve_entrant<A: GameApi>(api: &A, username: &str) -> Result<Player, SetupError> {
    let seat = resolve_opponent(api, username).await?;
    Ok(Player::new(seat.identity.username, seat.credential))
}

/// The tournament host
pub async fn resolve_host<A: GameApi>(
    api: &A,
    credential: &Credential,
) -> Result<Player, SetupError> {
    let seat = resolve_primary(api, credential).await?;
    Ok(Player::primary(seat.identity.username, credential.clone()))
}

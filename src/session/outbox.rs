//! Outbound calls produced by finished matches
//!
//! The frame loop never awaits. Terminal events are queued as [`Outbound`]
//! values and delivered asynchronously; each is attempted exactly once.

use crate::api::{
    Credential, GameApi, GameSummary, MatchId, MatchResultReport, ScoreReport,
};
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Score {
        credential: Credential,
        report: ScoreReport,
    },
    MatchResult {
        credential: Credential,
        report: MatchResultReport,
    },
    Summary {
        credential: Credential,
        summary: GameSummary,
    },
    Ping {
        credential: Credential,
        match_id: MatchId,
    },
}

impl Outbound {
    pub async fn deliver<A: GameApi>(&self, api: &A) -> Result<(), ApiError> {
        match self {
            Outbound::Score { credential, report } => api.publish_score(credential, report).await,
            Outbound::MatchResult { credential, report } => {
                api.report_match_result(credential, report).await
            }
            Outbound::Summary {
                credential,
                summary,
            } => api.submit_game_summary(credential, summary).await,
            Outbound::Ping {
                credential,
                match_id,
            } => api.ping_tournament(credential, *match_id).await,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outbound::Score { .. } => "score",
            Outbound::MatchResult { .. } => "match result",
            Outbound::Summary { .. } => "game summary",
            Outbound::Ping { .. } => "tournament ping",
        }
    }
}

/// Deliver in order. Failures are logged and dropped, not retried.
/// Returns how many calls succeeded.
pub async fn deliver_all<A: GameApi>(api: &A, outbound: Vec<Outbound>) -> usize {
    let mut delivered = 0;
    for item in outbound {
        match item.deliver(api).await {
            Ok(()) => delivered += 1,
            Err(e) => log::warn!("Failed to send {}: {}", item.label(), e),
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{Call, MockApi};
    use futures::executor::block_on;

    fn score(name: &str) -> Outbound {
        Outbound::Score {
            credential: MockApi::token_for(name),
            report: ScoreReport {
                their_username: "ford".into(),
                my_score: 5,
                their_score: 2,
            },
        }
    }

    #[test]
    fn test_delivers_in_order() {
        let api = MockApi::new();
        let sent = block_on(deliver_all(
            &api,
            vec![
                score("arthur"),
                Outbound::Ping {
                    credential: MockApi::token_for("arthur"),
                    match_id: 4,
                },
            ],
        ));
        assert_eq!(sent, 2);
        assert!(matches!(api.calls()[0], Call::Publish(..)));
        assert_eq!(api.calls()[1], Call::Ping("arthur".into(), 4));
    }

    #[test]
    fn test_failure_is_attempted_once() {
        let api = MockApi {
            failing_publish: true,
            ..MockApi::new()
        };
        let sent = block_on(deliver_all(&api, vec![score("arthur"), score("ford")]));
        assert_eq!(sent, 0);
        assert_eq!(api.count(|c| matches!(c, Call::Publish(..))), 2);
    }
}

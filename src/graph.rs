use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::correlation::CorrelationId;

mod client;
pub use client::WellPlayedGraph;

mod queries;

/// Operations we need from the WellPlayed GraphQL API.
///
/// Each call is a single round trip, without caching or retries. GraphQL errors are returned
/// even when the server also sent partial data.
#[async_trait]
pub trait IdentityGraph: Send + Sync {
    /// Fetches a tournament team with its accepted members, `None` if it doesn't exist.
    async fn get_team(
        &self,
        correlation_id: CorrelationId,
        team_id: &str,
    ) -> Result<Option<Team>, GraphError>;

    async fn get_players(
        &self,
        correlation_id: CorrelationId,
        ids: &[String],
    ) -> Result<Vec<Player>, GraphError>;

    async fn update_player_custom_field(
        &self,
        correlation_id: CorrelationId,
        player_id: &str,
        property: &str,
        value: &str,
    ) -> Result<(), GraphError>;

    /// Issues an access token for the identity `account_id` linked through `provider_id`.
    async fn issue_identity_access_token(
        &self,
        correlation_id: CorrelationId,
        account_id: &str,
        provider_id: &str,
    ) -> Result<AccessToken, GraphError>;

    /// Refreshes the linked identity and returns the provider-side identifier (e.g. a Discord
    /// user id).
    async fn refresh_identity(
        &self,
        correlation_id: CorrelationId,
        account_id: &str,
        provider_id: &str,
    ) -> Result<String, GraphError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Team {
    pub id: String,
    pub members: Vec<TeamMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub player_profile_id: String,
}

impl Team {
    pub fn player_profile_ids(&self) -> Vec<String> {
        self.members
            .iter()
            .map(|member| member.player_profile_id.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Player {
    pub id: String,
}

/// Short-lived token issued by WellPlayed for an identity provider.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid header `{0}` in GraphQL configuration")]
    InvalidHeader(String),
    #[error("GraphQL endpoint answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("couldn't decode GraphQL response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("GraphQL errors: {}", join_messages(.0))]
    Application(Vec<GraphQlError>),
    #[error("GraphQL response has neither data nor errors")]
    MissingData,
}

fn join_messages(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|error| error.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_is_not_logged() {
        let token = AccessToken::new("secret-token");

        assert_eq!(token.as_str(), "secret-token");
        assert!(!format!("{:?}", token).contains("secret-token"));
    }

    #[test]
    fn team_member_ids_keep_order() {
        let team: Team = serde_json::from_str(
            r#"{"id":"T1","members":[{"playerProfileId":"P2"},{"playerProfileId":"P1"}]}"#,
        )
        .unwrap();

        assert_eq!(team.player_profile_ids(), vec!["P2", "P1"]);
    }

    #[test]
    fn application_error_lists_messages() {
        let error = GraphError::Application(vec![
            GraphQlError {
                message: "No authorization token found".to_string(),
            },
            GraphQlError {
                message: "Player not found".to_string(),
            },
        ]);

        assert_eq!(
            error.to_string(),
            "GraphQL errors: No authorization token found; Player not found"
        );
    }
}

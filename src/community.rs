use async_trait::async_trait;
use thiserror::Error;

use crate::{correlation::CorrelationId, graph::AccessToken};

mod discord;
pub use discord::DiscordRest;

/// Adds and removes members of a community guild.
#[async_trait]
pub trait GuildMembership: Send + Sync {
    /// Adds `member_id` to the guild on behalf of the member, using their OAuth2 access token.
    async fn grant_membership(
        &self,
        correlation_id: CorrelationId,
        guild_id: &str,
        member_id: &str,
        access_token: &AccessToken,
    ) -> Result<(), CommunityError>;

    async fn revoke_membership(
        &self,
        correlation_id: CorrelationId,
        guild_id: &str,
        member_id: &str,
    ) -> Result<(), CommunityError>;
}

#[derive(Debug, Error)]
pub enum CommunityError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API base URL {0} can't have path segments")]
    InvalidBaseUrl(String),
    #[error("community API answered {status}: {body}")]
    Status { status: u16, body: String },
}

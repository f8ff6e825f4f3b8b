use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, RequestBuilder};
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

use crate::{
    community::{CommunityError, GuildMembership},
    correlation::CorrelationId,
    graph::AccessToken,
};

const TIMEOUT: Duration = Duration::from_secs(30);
const X_AUDIT_LOG_REASON: &str = "X-Audit-Log-Reason";

/// [`GuildMembership`] backed by the Discord REST API, authenticated as a bot.
pub struct DiscordRest {
    http: Client,
    api_url: Url,
    token: String,
}

#[derive(Serialize)]
struct AddGuildMember<'a> {
    access_token: &'a str,
}

impl DiscordRest {
    pub fn new(api_url: Url, token: String) -> Result<Self, CommunityError> {
        if api_url.cannot_be_a_base() {
            return Err(CommunityError::InvalidBaseUrl(api_url.to_string()));
        }

        let http = Client::builder()
            .timeout(TIMEOUT)
            .user_agent(concat!(
                "DiscordBot (",
                env!("CARGO_PKG_NAME"),
                ", ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .build()?;

        Ok(Self {
            http,
            api_url,
            token,
        })
    }

    /// `{api}/guilds/{guild_id}/members/{member_id}`
    fn guild_member_url(&self, guild_id: &str, member_id: &str) -> Result<Url, CommunityError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| CommunityError::InvalidBaseUrl(self.api_url.to_string()))?
            .pop_if_empty()
            .extend(&["guilds", guild_id, "members", member_id]);

        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder, correlation_id: CorrelationId) -> RequestBuilder {
        request
            .header(AUTHORIZATION, format!("Bot {}", self.token))
            .header(X_AUDIT_LOG_REASON, format!("roster-sync:{}", correlation_id))
    }

    /// `PUT` adding the member with its OAuth2 token, a no-op when they already joined.
    fn grant_request(
        &self,
        correlation_id: CorrelationId,
        guild_id: &str,
        member_id: &str,
        access_token: &AccessToken,
    ) -> Result<RequestBuilder, CommunityError> {
        let url = self.guild_member_url(guild_id, member_id)?;
        let request = self.http.put(url).json(&AddGuildMember {
            access_token: access_token.as_str(),
        });

        Ok(self.authorized(request, correlation_id))
    }

    fn revoke_request(
        &self,
        correlation_id: CorrelationId,
        guild_id: &str,
        member_id: &str,
    ) -> Result<RequestBuilder, CommunityError> {
        let url = self.guild_member_url(guild_id, member_id)?;

        Ok(self.authorized(self.http.delete(url), correlation_id))
    }

    async fn send(request: RequestBuilder) -> Result<(), CommunityError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            trace!("community API answered {}", status);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(CommunityError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl GuildMembership for DiscordRest {
    async fn grant_membership(
        &self,
        correlation_id: CorrelationId,
        guild_id: &str,
        member_id: &str,
        access_token: &AccessToken,
    ) -> Result<(), CommunityError> {
        debug!("adding member {} to guild {}", member_id, guild_id);
        let request = self.grant_request(correlation_id, guild_id, member_id, access_token)?;
        Self::send(request).await
    }

    async fn revoke_membership(
        &self,
        correlation_id: CorrelationId,
        guild_id: &str,
        member_id: &str,
    ) -> Result<(), CommunityError> {
        debug!("removing member {} from guild {}", member_id, guild_id);
        let request = self.revoke_request(correlation_id, guild_id, member_id)?;
        Self::send(request).await
    }
}

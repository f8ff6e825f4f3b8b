//! Recording fakes for the remote clients.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::{
    community::{CommunityError, GuildMembership},
    config::CustomFieldMapping,
    correlation::CorrelationId,
    graph::{AccessToken, GraphError, GraphQlError, IdentityGraph, Player, Team, TeamMember},
    reconciler::{Reconciler, ReconcilerSettings, WebhookDelivery},
    webhooks::wellplayed::TeamEventType,
};

pub const GUILD_ID: &str = "G1";
pub const PROVIDER_ID: &str = "idp-discord";
pub const ACCESS_TOKEN: &str = "oauth-token-M1";
pub const MEMBER_ID: &str = "discord-M1";
pub const FIELD_PROPERTY: &str = "discordSynced";
pub const FIELD_VALUE: &str = "true";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphCall {
    GetTeam(String),
    GetPlayers(Vec<String>),
    UpdateCustomField {
        player_id: String,
        property: String,
        value: String,
    },
    IssueAccessToken {
        account_id: String,
        provider_id: String,
    },
    RefreshIdentity {
        account_id: String,
        provider_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuildCall {
    Grant {
        guild_id: String,
        member_id: String,
        access_token: String,
    },
    Revoke {
        guild_id: String,
        member_id: String,
    },
}

fn failure(message: &str) -> GraphError {
    GraphError::Application(vec![GraphQlError {
        message: message.to_string(),
    }])
}

#[derive(Clone)]
pub struct FakeGraph {
    pub team: Option<Team>,
    pub fail_team_lookup: bool,
    pub fail_custom_fields: bool,
    pub fail_token: bool,
    calls: Arc<Mutex<Vec<GraphCall>>>,
}

impl FakeGraph {
    pub fn with_members(team_id: &str, members: &[&str]) -> Self {
        let team = Team {
            id: team_id.to_string(),
            members: members
                .iter()
                .map(|id| TeamMember {
                    player_profile_id: id.to_string(),
                })
                .collect(),
        };

        Self {
            team: Some(team),
            fail_team_lookup: false,
            fail_custom_fields: false,
            fail_token: false,
            calls: Default::default(),
        }
    }

    pub fn without_team() -> Self {
        Self {
            team: None,
            ..Self::with_members("T1", &[])
        }
    }

    pub fn calls(&self) -> Vec<GraphCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&GraphCall) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: GraphCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl IdentityGraph for FakeGraph {
    async fn get_team(
        &self,
        _correlation_id: CorrelationId,
        team_id: &str,
    ) -> Result<Option<Team>, GraphError> {
        self.record(GraphCall::GetTeam(team_id.to_string()));
        if self.fail_team_lookup {
            return Err(failure("team lookup unavailable"));
        }

        Ok(self.team.clone().filter(|team| team.id == team_id))
    }

    async fn get_players(
        &self,
        _correlation_id: CorrelationId,
        ids: &[String],
    ) -> Result<Vec<Player>, GraphError> {
        self.record(GraphCall::GetPlayers(ids.to_vec()));

        Ok(ids.iter().map(|id| Player { id: id.clone() }).collect())
    }

    async fn update_player_custom_field(
        &self,
        _correlation_id: CorrelationId,
        player_id: &str,
        property: &str,
        value: &str,
    ) -> Result<(), GraphError> {
        self.record(GraphCall::UpdateCustomField {
            player_id: player_id.to_string(),
            property: property.to_string(),
            value: value.to_string(),
        });
        if self.fail_custom_fields {
            return Err(failure("custom field is read-only"));
        }

        Ok(())
    }

    async fn issue_identity_access_token(
        &self,
        _correlation_id: CorrelationId,
        account_id: &str,
        provider_id: &str,
    ) -> Result<AccessToken, GraphError> {
        self.record(GraphCall::IssueAccessToken {
            account_id: account_id.to_string(),
            provider_id: provider_id.to_string(),
        });
        if self.fail_token {
            return Err(failure("identity isn't linked"));
        }

        Ok(AccessToken::new(format!("oauth-token-{}", account_id)))
    }

    async fn refresh_identity(
        &self,
        _correlation_id: CorrelationId,
        account_id: &str,
        provider_id: &str,
    ) -> Result<String, GraphError> {
        self.record(GraphCall::RefreshIdentity {
            account_id: account_id.to_string(),
            provider_id: provider_id.to_string(),
        });

        Ok(format!("discord-{}", account_id))
    }
}

#[derive(Clone, Default)]
pub struct FakeGuild {
    pub fail_grant: bool,
    pub fail_revoke: bool,
    calls: Arc<Mutex<Vec<GuildCall>>>,
}

impl FakeGuild {
    pub fn failing_grant() -> Self {
        Self {
            fail_grant: true,
            ..Default::default()
        }
    }

    pub fn failing_revoke() -> Self {
        Self {
            fail_revoke: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<GuildCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn grants(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, GuildCall::Grant { .. }))
            .count()
    }

    pub fn revokes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, GuildCall::Revoke { .. }))
            .count()
    }
}

#[async_trait]
impl GuildMembership for FakeGuild {
    async fn grant_membership(
        &self,
        _correlation_id: CorrelationId,
        guild_id: &str,
        member_id: &str,
        access_token: &AccessToken,
    ) -> Result<(), CommunityError> {
        self.calls.lock().unwrap().push(GuildCall::Grant {
            guild_id: guild_id.to_string(),
            member_id: member_id.to_string(),
            access_token: access_token.as_str().to_string(),
        });
        if self.fail_grant {
            return Err(CommunityError::Status {
                status: 403,
                body: r#"{"message": "Missing Permissions", "code": 50013}"#.to_string(),
            });
        }

        Ok(())
    }

    async fn revoke_membership(
        &self,
        _correlation_id: CorrelationId,
        guild_id: &str,
        member_id: &str,
    ) -> Result<(), CommunityError> {
        self.calls.lock().unwrap().push(GuildCall::Revoke {
            guild_id: guild_id.to_string(),
            member_id: member_id.to_string(),
        });
        if self.fail_revoke {
            return Err(CommunityError::Status {
                status: 404,
                body: r#"{"message": "Unknown Member", "code": 10007}"#.to_string(),
            });
        }

        Ok(())
    }
}

pub fn settings() -> ReconcilerSettings {
    ReconcilerSettings {
        guild_id: GUILD_ID.to_string(),
        identity_provider_id: PROVIDER_ID.to_string(),
        custom_field: Some(CustomFieldMapping {
            property: FIELD_PROPERTY.to_string(),
            value: FIELD_VALUE.to_string(),
        }),
    }
}

pub fn reconciler(graph: &FakeGraph, guild: &FakeGuild) -> Reconciler {
    Reconciler::new(Box::new(graph.clone()), Box::new(guild.clone()), settings())
}

/// JSON body of a tournament team notification.
pub fn team_payload(team_id: &str, manager_id: &str, status: &str) -> Vec<u8> {
    let body = json!({
        "id": "registration-1",
        "tag": "WPG",
        "name": "Well Played Gaming",
        "teamId": team_id,
        "managerId": manager_id,
        "status": status,
        "tournamentId": "tournament-1",
        "createdAt": "2024-03-01T10:00:00.000Z",
        "updatedAt": "2024-03-02T12:30:00.000Z",
    });
    serde_json::to_vec(&body).unwrap()
}

pub fn delivery(event_type: Option<TeamEventType>, status: &str) -> WebhookDelivery {
    WebhookDelivery {
        event_type,
        payload: team_payload("T1", "M1", status),
        message_id: "msg-1".to_string(),
        timestamp: "1700000000".to_string(),
        correlation_id: CorrelationId::new(),
    }
}

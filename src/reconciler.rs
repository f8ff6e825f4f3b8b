use std::fmt::{self, Display};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    community::{CommunityError, GuildMembership},
    config::{CustomFieldMapping, RosterConfig},
    correlation::CorrelationId,
    graph::{AccessToken, GraphError, IdentityGraph, Player},
    webhooks::wellplayed::{TeamEventType, TeamStatus, TournamentTeamPayload},
};


/// One inbound WellPlayed delivery, after its signature was verified.
#[derive(Debug)]
pub struct WebhookDelivery {
    /// `None` when the event header is absent or names an event we don't handle
    pub event_type: Option<TeamEventType>,
    /// Raw, unparsed body as received
    pub payload: Vec<u8>,
    pub message_id: String,
    pub timestamp: String,
    pub correlation_id: CorrelationId,
}

/// Manager identity as known by the identity provider, resolved for each delivery.
#[derive(Debug, Clone)]
pub struct ExternalIdentityLink {
    pub access_token: AccessToken,
    pub member_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipAction {
    Grant {
        member_id: String,
        access_token: AccessToken,
    },
    Revoke {
        member_id: String,
    },
    None,
}

impl MembershipAction {
    pub fn decide(event: TeamEventType, status: TeamStatus, link: ExternalIdentityLink) -> Self {
        use TeamEventType::*;

        match event {
            Deleted | DeletedAdmin => Self::Revoke {
                member_id: link.member_id,
            },
            StatusUpdated | ConfirmationUpdated | AttendanceUpdated => {
                if status == TeamStatus::Confirmed {
                    Self::Grant {
                        member_id: link.member_id,
                        access_token: link.access_token,
                    }
                } else {
                    Self::Revoke {
                        member_id: link.member_id,
                    }
                }
            }
        }
    }

    /// A missing member is already the state a revocation wants, so only grants are required.
    fn failure_policy(&self) -> CallPolicy {
        match self {
            Self::Grant { .. } => CallPolicy::Required,
            Self::Revoke { .. } | Self::None => CallPolicy::BestEffort,
        }
    }
}

impl Display for MembershipAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grant { member_id, .. } => write!(f, "grant membership to {}", member_id),
            Self::Revoke { member_id } => write!(f, "revoke membership of {}", member_id),
            Self::None => write!(f, "nothing"),
        }
    }
}

/// Remote calls of the pipeline, used to name the one that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    FetchTeam,
    FetchPlayers,
    UpdateCustomField,
    IssueAccessToken,
    RefreshIdentity,
    GrantMembership,
    RevokeMembership,
}

impl Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            Self::FetchTeam => "team lookup",
            Self::FetchPlayers => "players lookup",
            Self::UpdateCustomField => "custom field update",
            Self::IssueAccessToken => "access token issuance",
            Self::RefreshIdentity => "identity refresh",
            Self::GrantMembership => "membership grant",
            Self::RevokeMembership => "membership revocation",
        };
        f.write_str(step)
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("couldn't parse payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("{step} failed: {source}")]
    Graph {
        step: Step,
        #[source]
        source: GraphError,
    },
    #[error("{step} failed: {source}")]
    Community {
        step: Step,
        #[source]
        source: CommunityError,
    },
}

impl ReconcileError {
    fn graph(step: Step) -> impl FnOnce(GraphError) -> Self {
        move |source| Self::Graph { step, source }
    }

    fn community(step: Step) -> impl FnOnce(CommunityError) -> Self {
        move |source| Self::Community { step, source }
    }
}

/// How a failed remote call affects the delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallPolicy {
    /// The failure aborts the delivery.
    Required,
    /// The failure is logged and the pipeline goes on.
    BestEffort,
}

impl CallPolicy {
    fn settle<T>(self, result: Result<T, ReconcileError>) -> Result<Option<T>, ReconcileError> {
        match (self, result) {
            (_, Ok(value)) => Ok(Some(value)),
            (Self::Required, Err(e)) => Err(e),
            (Self::BestEffort, Err(e)) => {
                warn!("{}, carrying on", e);
                Ok(None)
            }
        }
    }
}

pub struct ReconcilerSettings {
    pub guild_id: String,
    pub identity_provider_id: String,
    pub custom_field: Option<CustomFieldMapping>,
}

impl From<&RosterConfig> for ReconcilerSettings {
    fn from(config: &RosterConfig) -> Self {
        Self {
            guild_id: config.discord_guild_id.clone(),
            identity_provider_id: config.wp_identity_provider_id.clone(),
            custom_field: config.custom_field.clone(),
        }
    }
}

/// Turns a WellPlayed team event into a guild membership change.
///
/// Every delivery is handled on its own: no state is kept between two calls to
/// [`Reconciler::reconcile`], so a replayed delivery runs the whole pipeline again.
pub struct Reconciler {
    graph: Box<dyn IdentityGraph>,
    guild: Box<dyn GuildMembership>,
    settings: ReconcilerSettings,
}

impl Reconciler {
    pub fn new(
        graph: Box<dyn IdentityGraph>,
        guild: Box<dyn GuildMembership>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            graph,
            guild,
            settings,
        }
    }

    /// Runs the pipeline for `delivery` and returns the membership action that was applied.
    ///
    /// Remote calls are awaited one after the other. Unknown events and deleted teams are
    /// [`MembershipAction::None`].
    pub async fn reconcile(
        &self,
        delivery: &WebhookDelivery,
    ) -> Result<MembershipAction, ReconcileError> {
        let correlation_id = delivery.correlation_id;

        let event = match delivery.event_type {
            Some(event) => event,
            None => {
                debug!("delivery doesn't carry a team event we handle, ignoring it");
                return Ok(MembershipAction::None);
            }
        };

        let payload: TournamentTeamPayload = serde_json::from_slice(&delivery.payload)?;
        info!(
            "received {:?} for team {} ({}) of tournament {}, status {:?}",
            event,
            payload.team_id,
            payload.name.as_deref().unwrap_or("unnamed"),
            payload.tournament_id.as_deref().unwrap_or("?"),
            payload.status
        );
        debug!(
            "tournament team registration id: {:?}, updated at {:?}",
            payload.id, payload.updated_at
        );

        let team = self
            .graph
            .get_team(correlation_id, &payload.team_id)
            .await
            .map_err(ReconcileError::graph(Step::FetchTeam))?;
        let team = match team {
            Some(team) => team,
            None => {
                info!("team {} doesn't exist anymore, nothing to do", payload.team_id);
                return Ok(MembershipAction::None);
            }
        };

        let players = self
            .graph
            .get_players(correlation_id, &team.player_profile_ids())
            .await
            .map_err(ReconcileError::graph(Step::FetchPlayers))?;
        debug!("team {} has {} players", team.id, players.len());

        self.update_custom_fields(correlation_id, &players).await;

        let link = self
            .resolve_identity(correlation_id, &payload.manager_id)
            .await?;
        let action = MembershipAction::decide(event, payload.status, link);

        self.apply(correlation_id, &action).await?;

        Ok(action)
    }

    async fn update_custom_fields(&self, correlation_id: CorrelationId, players: &[Player]) {
        let field = match &self.settings.custom_field {
            Some(field) => field,
            None => {
                debug!("no custom field configured, skipping player updates");
                return;
            }
        };

        for player in players {
            let result = self
                .graph
                .update_player_custom_field(
                    correlation_id,
                    &player.id,
                    &field.property,
                    &field.value,
                )
                .await
                .map_err(ReconcileError::graph(Step::UpdateCustomField));

            // best-effort calls never fail the delivery
            if let Ok(Some(())) = CallPolicy::BestEffort.settle(result) {
                debug!("set `{}` on player {}", field.property, player.id);
            }
        }
    }

    /// Both calls are always made, whichever action ends up being applied.
    async fn resolve_identity(
        &self,
        correlation_id: CorrelationId,
        manager_id: &str,
    ) -> Result<ExternalIdentityLink, ReconcileError> {
        let provider_id = &self.settings.identity_provider_id;

        let access_token = self
            .graph
            .issue_identity_access_token(correlation_id, manager_id, provider_id)
            .await
            .map_err(ReconcileError::graph(Step::IssueAccessToken))?;
        let member_id = self
            .graph
            .refresh_identity(correlation_id, manager_id, provider_id)
            .await
            .map_err(ReconcileError::graph(Step::RefreshIdentity))?;
        debug!("manager {} is member {} on the community", manager_id, member_id);

        Ok(ExternalIdentityLink {
            access_token,
            member_id,
        })
    }

    async fn apply(
        &self,
        correlation_id: CorrelationId,
        action: &MembershipAction,
    ) -> Result<(), ReconcileError> {
        let guild_id = &self.settings.guild_id;

        let result = match action {
            MembershipAction::Grant {
                member_id,
                access_token,
            } => self
                .guild
                .grant_membership(correlation_id, guild_id, member_id, access_token)
                .await
                .map_err(ReconcileError::community(Step::GrantMembership)),
            MembershipAction::Revoke { member_id } => self
                .guild
                .revoke_membership(correlation_id, guild_id, member_id)
                .await
                .map_err(ReconcileError::community(Step::RevokeMembership)),
            MembershipAction::None => return Ok(()),
        };

        if action.failure_policy().settle(result)?.is_some() {
            info!("applied: {}", action);
        }

        Ok(())
    }
}

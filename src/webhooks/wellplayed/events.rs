use serde::{de::IntoDeserializer, Deserialize, Deserializer};

/// Tournament team events we subscribe to, as sent in the `wp-webhook-event` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TeamEventType {
    #[serde(rename = "TOURNAMENT_TEAM_DELETED")]
    Deleted,
    #[serde(rename = "TOURNAMENT_TEAM_DELETED_ADMIN")]
    DeletedAdmin,
    #[serde(rename = "TOURNAMENT_TEAM_STATUS_UPDATED")]
    StatusUpdated,
    #[serde(rename = "TOURNAMENT_TEAM_CONFIRMATION_UPDATED")]
    ConfirmationUpdated,
    #[serde(rename = "TOURNAMENT_TEAM_ATTENDANCE_UPDATED")]
    AttendanceUpdated,
}

impl TeamEventType {
    /// Returns `None` for event types we don't handle.
    pub fn from_header(value: &str) -> Option<Self> {
        let deserializer: serde::de::value::StrDeserializer<'_, serde::de::value::Error> =
            value.trim().into_deserializer();
        Self::deserialize(deserializer).ok()
    }
}

/// Registration status of a tournament team. Statuses added later by WellPlayed, or a missing
/// status, are [`TeamStatus::Unknown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamStatus {
    NotAttending,
    NotValid,
    Registered,
    AwaitingForPayment,
    AwaitingForPresenceConfirmation,
    Confirmed,
    Denied,
    #[default]
    #[serde(other)]
    Unknown,
}

fn status_or_unknown<'de, D>(deserializer: D) -> Result<TeamStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TeamStatus>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of the tournament team events. Only `teamId` and `managerId` are needed to act on a
/// delivery, the other fields are informative.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentTeamPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[allow(dead_code)]
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub team_id: String,
    pub manager_id: String,
    #[serde(default, deserialize_with = "status_or_unknown")]
    pub status: TeamStatus,
    #[serde(default)]
    pub tournament_id: Option<String>,
    #[allow(dead_code)]
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

//! GraphQL documents sent to WellPlayed, with the shape of their `data` field.

use serde::{Deserialize, Serialize};

use crate::graph::{AccessToken, Player, Team};

pub const RETRIEVE_TEAM: &str = r#"
query RetrieveTeamQuery($id: ID!) {
  tournamentTeam(teamId: $id, memberStatus: ACCEPTED) {
    id
    members {
      playerProfileId
    }
  }
}
"#;

pub const GET_PLAYERS: &str = r#"
query GetPlayersQuery($ids: [ID!]!) {
  players(
    ids: $ids
    identityProviderProperties: []
    identityProviders: []
    page: {}
  ) {
    nodes {
      id
    }
  }
}
"#;

pub const UPDATE_CUSTOM_FIELD: &str = r#"
mutation UpdateCustomField($id: ID!, $customField: String!, $fieldValue: String!) {
  updatePlayer(
    input: { customFields: [{ property: $customField, value: $fieldValue }] }
    id: $id
  ) {
    id
  }
}
"#;

pub const IDP_API_TOKEN: &str = r#"
mutation IdpApiTokenMutation($id: ID!, $providerId: ID!) {
  accountIdentityGenerateAccessToken(accountId: $id, identityProviderId: $providerId)
}
"#;

pub const IDP_REFRESH_IDENTITY: &str = r#"
mutation IdpRefreshIdentityMutation($id: ID!, $providerId: ID!) {
  accountIdentityRefresh(accountId: $id, identityProviderId: $providerId) {
    providerId
  }
}
"#;

#[derive(Serialize)]
pub struct IdVariables<'a> {
    pub id: &'a str,
}

#[derive(Serialize)]
pub struct IdsVariables<'a> {
    pub ids: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldVariables<'a> {
    pub id: &'a str,
    pub custom_field: &'a str,
    pub field_value: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityVariables<'a> {
    pub id: &'a str,
    pub provider_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveTeamData {
    pub tournament_team: Option<Team>,
}

#[derive(Debug, Deserialize)]
pub struct GetPlayersData {
    pub players: PlayerPage,
}

#[derive(Debug, Deserialize)]
pub struct PlayerPage {
    pub nodes: Vec<Player>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomFieldData {
    #[allow(dead_code)]
    pub update_player: Player,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdpApiTokenData {
    pub account_identity_generate_access_token: AccessToken,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdpRefreshIdentityData {
    pub account_identity_refresh: RefreshedIdentity,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedIdentity {
    pub provider_id: String,
}

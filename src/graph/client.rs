use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, RequestBuilder, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

use crate::{
    correlation::CorrelationId,
    graph::{queries::*, AccessToken, GraphError, GraphQlError, IdentityGraph, Player, Team},
};

const TIMEOUT: Duration = Duration::from_secs(30);
const X_REQUEST_ID: &str = "x-request-id";

/// [`IdentityGraph`] backed by the WellPlayed GraphQL endpoint.
pub struct WellPlayedGraph {
    http: Client,
    endpoint: Url,
    headers: HeaderMap,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlRequest<V> {
    operation_name: &'static str,
    query: &'static str,
    variables: V,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

impl<T> GraphQlResponse<T> {
    /// Errors win over data: a partial response is still reported as a failure.
    fn into_result(self) -> Result<T, GraphError> {
        if !self.errors.is_empty() {
            return Err(GraphError::Application(self.errors));
        }

        self.data.ok_or(GraphError::MissingData)
    }
}

impl WellPlayedGraph {
    /// Creates a client for `endpoint`, sending `extra_headers` with every request.
    pub fn new(endpoint: Url, extra_headers: &HashMap<String, String>) -> Result<Self, GraphError> {
        let mut headers = HeaderMap::new();
        for (name, value) in extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| GraphError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| GraphError::InvalidHeader(name.as_str().to_owned()))?;
            headers.insert(name, value);
        }

        let http = Client::builder()
            .timeout(TIMEOUT)
            .user_agent(concat!("roster-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            headers,
        })
    }

    fn request<V: Serialize>(
        &self,
        correlation_id: CorrelationId,
        operation_name: &'static str,
        query: &'static str,
        variables: V,
    ) -> RequestBuilder {
        self.http
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .header(X_REQUEST_ID, correlation_id.to_string())
            .json(&GraphQlRequest {
                operation_name,
                query,
                variables,
            })
    }

    async fn execute<V, T>(
        &self,
        correlation_id: CorrelationId,
        operation_name: &'static str,
        query: &'static str,
        variables: V,
    ) -> Result<T, GraphError>
    where
        V: Serialize + Send,
        T: DeserializeOwned,
    {
        debug!("sending GraphQL operation {}", operation_name);

        let response = self
            .request(correlation_id, operation_name, query, variables)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        trace!(
            "{} answered {}: {}",
            operation_name,
            status,
            String::from_utf8_lossy(&body)
        );

        classify(status, &body)
    }
}

/// Turns an HTTP answer of the GraphQL endpoint into data or a [`GraphError`].
///
/// GraphQL servers report validation errors with a 4xx status and an `errors` body, those are
/// application errors. Any other non-2xx answer is a status error.
fn classify<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T, GraphError> {
    let status_error = || GraphError::Status {
        status: status.as_u16(),
        body: String::from_utf8_lossy(body).into_owned(),
    };

    match serde_json::from_slice::<GraphQlResponse<T>>(body) {
        Ok(response) if status.is_success() || !response.errors.is_empty() => {
            response.into_result()
        }
        Ok(_) => Err(status_error()),
        Err(_) if !status.is_success() => Err(status_error()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl IdentityGraph for WellPlayedGraph {
    async fn get_team(
        &self,
        correlation_id: CorrelationId,
        team_id: &str,
    ) -> Result<Option<Team>, GraphError> {
        let data: RetrieveTeamData = self
            .execute(
                correlation_id,
                "RetrieveTeamQuery",
                RETRIEVE_TEAM,
                IdVariables { id: team_id },
            )
            .await?;

        Ok(data.tournament_team)
    }

    async fn get_players(
        &self,
        correlation_id: CorrelationId,
        ids: &[String],
    ) -> Result<Vec<Player>, GraphError> {
        let data: GetPlayersData = self
            .execute(
                correlation_id,
                "GetPlayersQuery",
                GET_PLAYERS,
                IdsVariables { ids },
            )
            .await?;

        Ok(data.players.nodes)
    }

    async fn update_player_custom_field(
        &self,
        correlation_id: CorrelationId,
        player_id: &str,
        property: &str,
        value: &str,
    ) -> Result<(), GraphError> {
        let _: UpdateCustomFieldData = self
            .execute(
                correlation_id,
                "UpdateCustomField",
                UPDATE_CUSTOM_FIELD,
                CustomFieldVariables {
                    id: player_id,
                    custom_field: property,
                    field_value: value,
                },
            )
            .await?;

        Ok(())
    }

    async fn issue_identity_access_token(
        &self,
        correlation_id: CorrelationId,
        account_id: &str,
        provider_id: &str,
    ) -> Result<AccessToken, GraphError> {
        let data: IdpApiTokenData = self
            .execute(
                correlation_id,
                "IdpApiTokenMutation",
                IDP_API_TOKEN,
                IdentityVariables {
                    id: account_id,
                    provider_id,
                },
            )
            .await?;

        Ok(data.account_identity_generate_access_token)
    }

    async fn refresh_identity(
        &self,
        correlation_id: CorrelationId,
        account_id: &str,
        provider_id: &str,
    ) -> Result<String, GraphError> {
        let data: IdpRefreshIdentityData = self
            .execute(
                correlation_id,
                "IdpRefreshIdentityMutation",
                IDP_REFRESH_IDENTITY,
                IdentityVariables {
                    id: account_id,
                    provider_id,
                },
            )
            .await?;

        Ok(data.account_identity_refresh.provider_id)
    }
}

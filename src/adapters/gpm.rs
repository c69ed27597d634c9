use crate::config::{Credentials, GpmSettings};
use crate::domain::model::{
    group_rows, DataSourceId, DataSourceQuery, ElementId, Plant, PlantId, TimeSeriesResult,
};
use crate::domain::ports::PlantDataSource;
use crate::utils::error::{GatewayError, Result};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::RwLock;

const TOKEN_ENDPOINT: &str = "/Account/Token";
const DATA_LIST_ENDPOINT: &str = "/DataList/v2";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(rename = "AccessToken")]
    access_token: String,
}

/// Authenticated client for the GPM+ REST API.
///
/// Holds a bearer token obtained at construction. When the API rejects the
/// token, a new one is requested once and the call is repeated once.
pub struct GpmClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
    bearer: RwLock<String>,
    batch_size: usize,
    max_concurrent_requests: usize,
}

impl std::fmt::Debug for GpmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpmClient")
            .field("base_url", &self.base_url)
            .field("user", &self.credentials.user)
            .field("batch_size", &self.batch_size)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .finish()
    }
}

impl GpmClient {
    /// Builds the HTTP client and authenticates. Fails when the token request fails.
    pub async fn connect(settings: &GpmSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        let base_url = settings.api_base_url();

        let bearer = request_token(&http, &base_url, &settings.credentials).await?;
        tracing::info!("Token successfully retrieved from {}", base_url);

        Ok(Self {
            http,
            base_url,
            credentials: settings.credentials.clone(),
            bearer: RwLock::new(bearer),
            batch_size: settings.batch_size.max(1),
            max_concurrent_requests: settings.max_concurrent_requests.max(1),
        })
    }


    async fn send_get(
        &self,
        endpoint: &str,
        bearer: &str,
        params: &[(&str, String)],
        headers: &[(&'static str, &'static str)],
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!("GET {} {:?}", url, params);

        let mut request = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, bearer)
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json");
        for (key, value) in headers {
            request = request.header(*key, *value);
        }
        if !params.is_empty() {
            request = request.query(params);
        }

        Ok(request.send().await?)
    }

    /// Replaces the token unless another request already did so.
    async fn refresh_token(&self, rejected: &str) -> Result<String> {
        let mut bearer = self.bearer.write().await;
        if bearer.as_str() != rejected {
            return Ok(bearer.clone());
        }
        let fresh = request_token(&self.http, &self.base_url, &self.credentials).await?;
        tracing::info!("Token refreshed");
        *bearer = fresh.clone();
        Ok(fresh)
    }

    /// GET returning the decoded JSON body, refreshing the token once on 401.
    pub async fn get_json(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        headers: &[(&'static str, &'static str)],
    ) -> Result<Value> {
        let bearer = self.bearer.read().await.clone();
        let mut response = self.send_get(endpoint, &bearer, params, headers).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!("GPM+ rejected the token for {}, re-authenticating", endpoint);
            let fresh = self.refresh_token(&bearer).await?;
            response = self.send_get(endpoint, &fresh, params, headers).await?;
        }

        let status = response.status();
        tracing::debug!("GPM+ {} responded {}", endpoint, status);
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("GPM+ {} failed with {}", endpoint, status);
            return Err(GatewayError::upstream_status(endpoint, status.as_u16(), &body));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| GatewayError::UpstreamFormat {
            endpoint: endpoint.to_string(),
            message: format!("invalid JSON: {}", e),
        })
    }

    async fn get_list(&self, endpoint: &str) -> Result<Vec<Value>> {
        match self.get_json(endpoint, &[], &[]).await? {
            Value::Array(items) => Ok(items),
            other => Err(GatewayError::UpstreamFormat {
                endpoint: endpoint.to_string(),
                message: format!("expected a JSON array, got {}", json_kind(&other)),
            }),
        }
    }

    async fn fetch_batch(
        &self,
        batch: &[DataSourceId],
        query: &DataSourceQuery,
    ) -> Result<Vec<TimeSeriesResult>> {
        let ids = batch
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let params = [
            ("dataSourceIds", ids),
            ("startDate", query.start_param()),
            ("endDate", query.end_param()),
            ("grouping", query.grouping.clone()),
            ("aggregationType", query.aggregation_type.to_string()),
        ];
        let headers: Vec<(&'static str, &'static str)> =
            query.tz.upstream_header().into_iter().collect();

        let payload = self.get_json(DATA_LIST_ENDPOINT, &params, &headers).await?;
        group_rows(batch, payload).map_err(|message| GatewayError::UpstreamFormat {
            endpoint: DATA_LIST_ENDPOINT.to_string(),
            message,
        })
    }
}

async fn request_token(http: &Client, base_url: &str, credentials: &Credentials) -> Result<String> {
    let url = format!("{}{}", base_url, TOKEN_ENDPOINT);
    let response = http
        .post(&url)
        .json(&serde_json::json!({
            "username": credentials.user,
            "password": credentials.password,
        }))
        .send()
        .await?;

    let status = response.status();
    if status != StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        tracing::error!("Failed to get token: {} {}", status, body);
        return Err(GatewayError::AuthError {
            message: format!("token request to {} returned {}", url, status),
        });
    }

    let token: TokenResponse = response.json().await.map_err(|e| GatewayError::AuthError {
        message: format!("token response without AccessToken: {}", e),
    })?;
    Ok(format!("Bearer {}", token.access_token))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl PlantDataSource for GpmClient {
    async fn plants(&self) -> Result<Vec<Plant>> {
        let items = self.get_list("/Plant").await?;
        items
            .into_iter()
            .map(|item| {
                Plant::from_upstream(item).map_err(|e| GatewayError::UpstreamFormat {
                    endpoint: "/Plant".to_string(),
                    message: format!("unexpected plant record: {}", e),
                })
            })
            .collect()
    }

    async fn elements(&self, plant_id: PlantId) -> Result<Vec<Value>> {
        self.get_list(&format!("/Plant/{}/Element", plant_id)).await
    }

    async fn tags(&self, plant_id: PlantId, element_id: ElementId) -> Result<Vec<Value>> {
        self.get_list(&format!(
            "/Plant/{}/Element/{}/Datasource",
            plant_id, element_id
        ))
        .await
    }

    async fn data_list(&self, query: &DataSourceQuery) -> Result<Vec<TimeSeriesResult>> {
        let batches: Vec<Vec<DataSourceId>> = query
            .data_source_ids
            .chunks(self.batch_size)
            .map(<[DataSourceId]>::to_vec)
            .collect();
        tracing::debug!(
            "Fetching {} data sources in {} batches",
            query.data_source_ids.len(),
            batches.len()
        );

        // `buffered` keeps batch order; the first failed batch fails the whole query.
        let results: Vec<Vec<TimeSeriesResult>> = futures::stream::iter(batches)
            .map(|batch| async move { self.fetch_batch(&batch, query).await })
            .buffered(self.max_concurrent_requests)
            .try_collect()
            .await?;

        Ok(results.into_iter().flatten().collect())
    }
}

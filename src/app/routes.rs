//! HTTP routes: GET /health, /plants, /elements, /tags, /data.
//!
//! Every response is JSON. Errors use `{"detail": .., "error": ..}`.

use crate::core::gateway::{Gateway, Health};
use crate::core::query::{DataParams, ElementsParams, TagsParams};
use crate::domain::model::{Plant, TimeSeriesResult};
use crate::domain::ports::PlantDataSource;
use crate::utils::error::GatewayError;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
    pub error: &'static str,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", status, self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }
        let body = ErrorBody {
            detail: self.to_string(),
            error: self.kind(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, GatewayError>;

fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, GatewayError> {
    params
        .map(|Query(inner)| inner)
        .map_err(|rejection| GatewayError::validation(rejection.body_text()))
}

async fn health(State(gateway): State<Gateway>) -> Json<Health> {
    Json(gateway.health())
}

async fn plants(State(gateway): State<Gateway>) -> ApiResult<Vec<Plant>> {
    Ok(Json(gateway.plants().await?))
}

async fn elements(
    State(gateway): State<Gateway>,
    params: Result<Query<ElementsParams>, QueryRejection>,
) -> ApiResult<Vec<serde_json::Value>> {
    let params = query_params(params)?;
    Ok(Json(gateway.elements(&params).await?))
}

async fn tags(
    State(gateway): State<Gateway>,
    params: Result<Query<TagsParams>, QueryRejection>,
) -> ApiResult<Vec<serde_json::Value>> {
    let params = query_params(params)?;
    Ok(Json(gateway.tags(&params).await?))
}

async fn data(
    State(gateway): State<Gateway>,
    params: Result<Query<DataParams>, QueryRejection>,
) -> ApiResult<Vec<TimeSeriesResult>> {
    let params = query_params(params)?;
    Ok(Json(gateway.data(params).await?))
}

async fn not_found() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            detail: "Not Found".to_string(),
            error: "not_found",
        }),
    )
}

/// Build the facade router around an already constructed data source.
pub fn router(source: Arc<dyn PlantDataSource>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/plants", get(plants))
        .route("/elements", get(elements))
        .route("/tags", get(tags))
        .route("/data", get(data))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Gateway::new(source))
}

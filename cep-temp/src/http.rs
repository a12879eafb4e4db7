//! HTTP boundary: `GET /tempForCep/{cep}`.

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use cep_temp_core::{Deadline, LookupError, TemperatureService};
use serde_json::json;
use tower_http::trace::TraceLayer;

#[derive(Debug, Clone)]
pub struct AppState {
    pub service: Arc<TemperatureService>,
    /// Overall budget for one request; each stage gets its own slice of it.
    pub request_timeout: Duration,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/tempForCep/{cep}", get(temperature_for_cep))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn temperature_for_cep(State(state): State<AppState>, Path(cep): Path<String>) -> Response {
    let deadline = Deadline::after(state.request_timeout);

    match state.service.lookup(&cep, &deadline).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: LookupError) -> Response {
    match &err {
        LookupError::InvalidZipcode(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "error": "invalid zipcode" })))
                .into_response()
        }
        LookupError::CityNotFound(_) => {
            (StatusCode::NOT_FOUND, Json(json!({ "error": "can not find zipcode" }))).into_response()
        }
        LookupError::TemperatureUnavailable { source, .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err.to_string(), "details": source.to_string() })),
        )
            .into_response(),
    }
}

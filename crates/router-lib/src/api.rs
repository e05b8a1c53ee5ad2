// ============================
// crates/router-lib/src/api.rs
// ============================
//! Inbound HTTP surface speaking the backend protocol.
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use meeting_router_common::{Params, Payload, RETURN_SUCCESS};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::error::RouterError;
use crate::validation::{self, ValidationError};
use crate::AppState;

/// Protocol version reported by the index call
pub const API_VERSION: &str = "2.0";

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let base = state.settings.api_path.trim_end_matches('/').to_string();

    Router::new()
        .route("/healthz", get(healthz))
        .route(&base, get(index))
        .route(&format!("{base}/"), get(index))
        .route(&format!("{base}/create"), get(create))
        .route(&format!("{base}/getMeetingInfo"), get(get_meeting_info))
        .route(&format!("{base}/isMeetingRunning"), get(is_meeting_running))
        .route(&format!("{base}/end"), get(end))
        .route(&format!("{base}/join"), get(join))
        .route(&format!("{base}/getMeetings"), get(get_meetings))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wrap a payload in the protocol envelope, forcing a SUCCESS return code
fn envelope(mut payload: Payload) -> Json<Value> {
    payload.insert("returncode".to_string(), Value::from(RETURN_SUCCESS));
    Json(json!({ "response": payload }))
}

/// Inbound parameters; an undecodable query string becomes a FAILED reply
fn query_params(query: Result<Query<Params>, QueryRejection>) -> Result<Params, RouterError> {
    query.map(|Query(params)| params).map_err(|rejection| {
        RouterError::Validation(ValidationError::InvalidParameter {
            name: "query",
            reason: rejection.body_text(),
        })
    })
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index() -> Json<Value> {
    Json(json!({
        "response": {
            "returncode": RETURN_SUCCESS,
            "version": API_VERSION,
        }
    }))
}

async fn create(
    State(state): State<Arc<AppState>>,
    query: Result<Query<Params>, QueryRejection>,
) -> Result<Json<Value>, RouterError> {
    let params = query_params(query)?;
    let meeting_id = validation::meeting_id(&params)?;
    let outcome = state.engine.create(&meeting_id, &params).await?;
    Ok(envelope(outcome.payload))
}

async fn get_meeting_info(
    State(state): State<Arc<AppState>>,
    query: Result<Query<Params>, QueryRejection>,
) -> Result<Json<Value>, RouterError> {
    let params = query_params(query)?;
    let meeting_id = validation::meeting_id(&params)?;
    let payload = state.engine.get_meeting_info(&meeting_id, &params).await?;
    Ok(envelope(payload))
}

async fn is_meeting_running(
    State(state): State<Arc<AppState>>,
    query: Result<Query<Params>, QueryRejection>,
) -> Result<Json<Value>, RouterError> {
    let params = query_params(query)?;
    let meeting_id = validation::meeting_id(&params)?;
    let payload = state.engine.is_meeting_running(&meeting_id, &params).await?;
    Ok(envelope(payload))
}

async fn end(
    State(state): State<Arc<AppState>>,
    query: Result<Query<Params>, QueryRejection>,
) -> Result<Json<Value>, RouterError> {
    let params = query_params(query)?;
    let meeting_id = validation::meeting_id(&params)?;
    let payload = state.engine.end(&meeting_id, &params).await?;
    Ok(envelope(payload))
}

async fn join(
    State(state): State<Arc<AppState>>,
    query: Result<Query<Params>, QueryRejection>,
) -> Result<Response, RouterError> {
    let params = query_params(query)?;
    let meeting_id = validation::meeting_id(&params)?;
    let url = state.engine.join_url(&meeting_id, &params).await?;
    Ok((StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response())
}

async fn get_meetings(State(state): State<Arc<AppState>>) -> Result<Json<Value>, RouterError> {
    let payload = state.engine.get_meetings().await?;
    Ok(envelope(payload))
}

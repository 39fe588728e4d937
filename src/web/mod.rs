//! Admin API for hourgate.
//!
//! The server binds to `127.0.0.1:9998` by default and exposes:
//!
//! - `GET  /api/policy`        — current policy as structured JSON
//! - `GET  /api/policy/text`   — current policy as the file texts
//! - `PUT  /api/policy`        — replace and persist the policy files
//! - `POST /api/policy/reload` — re-read the policy files now
//!
//! When a token is configured, the mutating routes require
//! `Authorization: Bearer <token>`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::error::HourgateError;
use crate::policy::admin::PolicyAdmin;
use crate::policy::{PolicySnapshot, TimeRule};

/// Shared state for all admin handlers.
#[derive(Clone)]
pub struct AppState {
    pub admin: PolicyAdmin,
    /// Literal bearer credential for mutating routes.
    pub token: Option<String>,
}

/// Build the axum router with all admin endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/policy", get(get_policy).put(put_policy))
        .route("/api/policy/text", get(get_policy_text))
        .route("/api/policy/reload", post(reload_policy))
        .with_state(state)
}

/// Start the admin server on the given address.
pub async fn start(listen_addr: &str, state: Arc<AppState>) -> crate::error::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!("Admin API listening on {}", listen_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

// ─── Request / Response Types ───────────────────────────────────────────────

/// Structured view of the active snapshot.
#[derive(Debug, Serialize)]
pub struct PolicyResponse {
    pub whitelist: Vec<String>,
    pub blacklist: Vec<String>,
    pub rules: Vec<TimeRule>,
    pub loaded_at: String,
}

impl From<&PolicySnapshot> for PolicyResponse {
    fn from(s: &PolicySnapshot) -> Self {
        Self {
            whitelist: s.whitelist().entries().to_vec(),
            blacklist: s.blacklist().entries().to_vec(),
            rules: s.rules().to_vec(),
            loaded_at: s.loaded_wall().to_rfc3339(),
        }
    }
}

/// The three policy files as text, used for both reading and replacing.
#[derive(Debug, Serialize, Deserialize)]
pub struct PolicyText {
    #[serde(default)]
    pub whitelist: String,
    #[serde(default)]
    pub blacklist: String,
    #[serde(default)]
    pub rules: String,
}

// ─── Handlers ───────────────────────────────────────────────────────────────

/// `GET /api/policy`
async fn get_policy(State(state): State<Arc<AppState>>) -> Json<PolicyResponse> {
    Json(PolicyResponse::from(&*state.admin.snapshot()))
}

/// `GET /api/policy/text`
async fn get_policy_text(State(state): State<Arc<AppState>>) -> Json<PolicyText> {
    Json(PolicyText {
        whitelist: state.admin.whitelist_text(),
        blacklist: state.admin.blacklist_text(),
        rules: state.admin.rules_text(),
    })
}

/// `PUT /api/policy` — validate, persist, install.
async fn put_policy(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<PolicyText>,
) -> Response {
    if let Some(resp) = check_token(&state, &headers) {
        return resp;
    }

    let admin = state.admin.clone();
    let result = tokio::task::spawn_blocking(move || {
        admin.replace_policy(&body.whitelist, &body.blacklist, &body.rules)
    })
    .await;

    match result {
        Ok(Ok(snapshot)) => {
            tracing::info!("Policy updated via API ({} rules)", snapshot.rules().len());
            Json(PolicyResponse::from(&*snapshot)).into_response()
        }
        Ok(Err(e)) => error_response(&e),
        Err(e) => internal_error(e.to_string()),
    }
}

/// `POST /api/policy/reload`
async fn reload_policy(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(resp) = check_token(&state, &headers) {
        return resp;
    }

    let admin = state.admin.clone();
    match tokio::task::spawn_blocking(move || admin.reload()).await {
        Ok(Ok(snapshot)) => Json(PolicyResponse::from(&*snapshot)).into_response(),
        Ok(Err(e)) => error_response(&e),
        Err(e) => internal_error(e.to_string()),
    }
}

/// `None` when the request is authorized, otherwise the 401 to return.
fn check_token(state: &AppState, headers: &HeaderMap) -> Option<Response> {
    let expected = state.token.as_deref()?;
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if presented == Some(expected) {
        None
    } else {
        tracing::warn!("Rejected admin request with missing or wrong token");
        Some(
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "unauthorized"})),
            )
                .into_response(),
        )
    }
}

fn error_response(e: &HourgateError) -> Response {
    let status = match e {
        HourgateError::PolicyLoad {
            cause: crate::error::PolicyLoadCause::MalformedRule { .. },
            ..
        } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({"error": e.to_string()}))).into_response()
}

fn internal_error(msg: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": msg})),
    )
        .into_response()
}

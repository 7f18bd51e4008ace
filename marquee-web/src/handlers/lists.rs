//! JSON API for managing a user's lists.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use marquee_core::catalog::{ListPatch, UserListEntry};
use marquee_core::{ListError, MarqueeError};
use marquee_search::RefreshReport;
use marquee_search::service::parse_list;
use serde::Deserialize;
use serde_json::json;

use crate::server::AppState;

/// Errors surfaced by the list API as `{"error": ...}` bodies.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{reason}")]
    BadRequest { reason: String },

    #[error("{reason}")]
    NotFound { reason: String },

    #[error("{reason}")]
    Conflict { reason: String },

    #[error("{reason}")]
    Upstream { reason: String },

    #[error("{reason}")]
    Internal { reason: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MarqueeError> for ApiError {
    fn from(err: MarqueeError) -> Self {
        let reason = err.user_message();
        match &err {
            MarqueeError::List(ListError::Duplicate { .. }) => ApiError::Conflict { reason },
            MarqueeError::List(ListError::NotFound { .. }) => ApiError::NotFound { reason },
            MarqueeError::List(ListError::Unavailable { .. }) => {
                tracing::warn!("List API upstream failure: {}", err);
                ApiError::Upstream { reason }
            }
            e if e.is_user_error() => ApiError::BadRequest { reason },
            _ => {
                tracing::error!("List API failure: {}", err);
                ApiError::Internal { reason }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct AddListRequest {
    /// List URL or bare list id
    pub source: String,
    pub name: Option<String>,
}

pub async fn list_lists(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Json<Vec<UserListEntry>> {
    Json(state.service.lists(&uid).await)
}

/// Adds a list and starts its first classification pass in the background.
pub async fn add_list(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(request): Json<AddListRequest>,
) -> Result<(StatusCode, Json<UserListEntry>), ApiError> {
    let entry = state
        .service
        .add_list(&uid, &request.source, request.name)
        .await?;
    state.service.spawn_refresh(uid, entry.id.clone());
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn patch_list(
    State(state): State<AppState>,
    Path((uid, list)): Path<(String, String)>,
    Json(patch): Json<ListPatch>,
) -> Result<Json<UserListEntry>, ApiError> {
    let entry = state.service.patch_list(&uid, &list, patch).await?;
    Ok(Json(entry))
}

pub async fn remove_list(
    State(state): State<AppState>,
    Path((uid, list)): Path<(String, String)>,
) -> Result<Json<UserListEntry>, ApiError> {
    let entry = state.service.remove_list(&uid, &list).await?;
    Ok(Json(entry))
}

/// Runs a full classification pass and waits for it.
pub async fn refresh_list(
    State(state): State<AppState>,
    Path((uid, list)): Path<(String, String)>,
) -> Result<Json<RefreshReport>, ApiError> {
    let list = parse_list(&list)?;
    let report = state.service.refresh_list(&uid, &list).await?;
    Ok(Json(report))
}

//! Waitlist handler.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::ApiJson;
use crate::api::state::AppState;
use crate::db::StoreError;
use crate::waitlist::{JoinWaitlistRequest, is_plausible_email};

/// Response for a successful sign-up.
#[derive(Debug, Serialize)]
pub struct JoinWaitlistResponse {
    pub success: bool,
    pub id: String,
}

/// Add an email to the waitlist.
#[instrument(skip(state, request))]
pub async fn join_waitlist(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<JoinWaitlistRequest>,
) -> ApiResult<(StatusCode, Json<JoinWaitlistResponse>)> {
    if !is_plausible_email(&request.email) {
        return Err(ApiError::bad_request("A valid email is required"));
    }

    let entry = state
        .waitlist
        .join(&request.email)
        .await
        .map_err(|err| match err {
            StoreError::Duplicate(_) => ApiError::bad_request("already registered"),
            other => other.into(),
        })?;

    info!(entry_id = %entry.id, "Joined waitlist");
    Ok((
        StatusCode::CREATED,
        Json(JoinWaitlistResponse {
            success: true,
            id: entry.id,
        }),
    ))
}

//! Relationship handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::ApiJson;
use crate::api::state::AppState;
use crate::relationship::{
    CreateRelationshipRequest, RelationshipUpdate, RelationshipWithAgents,
    UpdateRelationshipRequest,
};
use crate::ws::RealtimeEvent;

/// Create a relationship, or return the existing one for the pair.
///
/// 201 when created, 200 when the pair already had one.
#[instrument(skip(state, request))]
pub async fn create_relationship(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateRelationshipRequest>,
) -> ApiResult<(StatusCode, Json<RelationshipWithAgents>)> {
    if request.agent1_id == request.agent2_id {
        return Err(ApiError::bad_request(
            "A relationship needs two different agents",
        ));
    }

    let outcome = state.relationships.create_or_fetch(request).await?;
    let status = if outcome.was_created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let relationship = outcome.into_inner();

    info!(
        relationship_id = %relationship.relationship.id,
        created = status == StatusCode::CREATED,
        "Created or fetched relationship"
    );
    Ok((status, Json(relationship)))
}

/// Partially update a relationship and broadcast the result.
#[instrument(skip(state, request))]
pub async fn update_relationship(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateRelationshipRequest>,
) -> ApiResult<Json<RelationshipWithAgents>> {
    let update = RelationshipUpdate::try_from(request).map_err(ApiError::bad_request)?;
    let relationship = state.relationships.update(&id, update).await?;

    state
        .realtime
        .emit(RealtimeEvent::RelationshipUpdate(relationship.clone()));

    info!(relationship_id = %id, status = %relationship.relationship.status, "Updated relationship");
    Ok(Json(relationship))
}

/// Talking and coupled relationships, most recently updated first.
#[instrument(skip(state))]
pub async fn list_relationships(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<RelationshipWithAgents>>> {
    let relationships = state.relationships.list_active().await?;
    info!(count = relationships.len(), "Listed active relationships");
    Ok(Json(relationships))
}

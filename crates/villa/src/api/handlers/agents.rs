//! Agent handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::{info, instrument};

use crate::agent::{
    Agent, AgentPayload, AgentWithRelationships, BulkUpsertResponse, TraitPrecedence,
    UpdateAgentStatusRequest,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::ApiJson;
use crate::api::state::AppState;

/// List all agents, newest first.
#[instrument(skip(state))]
pub async fn list_agents(State(state): State<AppState>) -> ApiResult<Json<Vec<Agent>>> {
    let agents = state.agents.list().await?;
    info!(count = agents.len(), "Listed agents");
    Ok(Json(agents))
}

/// Get an agent with its relationships.
#[instrument(skip(state))]
pub async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AgentWithRelationships>> {
    let agent = state
        .agents
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Agent {} not found", id)))?;

    let (relationships_as_agent1, relationships_as_agent2) =
        state.relationships.list_for_agent(&id).await?;

    Ok(Json(AgentWithRelationships {
        agent,
        relationships_as_agent1,
        relationships_as_agent2,
    }))
}

/// Create or update an agent by id.
///
/// Flat trait fields win over their `bigFive` / `romanceStyle` counterparts.
#[instrument(skip(state, payload), fields(agent_id = %payload.id))]
pub async fn upsert_agent(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<AgentPayload>,
) -> ApiResult<Json<Agent>> {
    if payload.id.trim().is_empty() {
        return Err(ApiError::bad_request("Agent id is required"));
    }

    let agent = state
        .agents
        .upsert(payload.resolve(TraitPrecedence::FlatFirst))
        .await?;
    info!(agent_id = %agent.id, "Upserted agent");
    Ok(Json(agent))
}

/// Upsert an array of agents one by one.
///
/// Grouped trait values win over flat ones here. Elements are parsed and
/// written in order; the first bad or failed element ends the run with a 500
/// and agents written before it stay written.
#[instrument(skip(state, body))]
pub async fn bulk_upsert_agents(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<serde_json::Value>,
) -> ApiResult<Json<BulkUpsertResponse>> {
    let serde_json::Value::Array(items) = body else {
        return Err(ApiError::bad_request("Expected an array of agents"));
    };

    let mut agents = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let payload: AgentPayload = serde_json::from_value(item)
            .map_err(|e| ApiError::internal(format!("bulk agent {index}: {e}")))?;
        if payload.id.trim().is_empty() {
            return Err(ApiError::internal(format!("bulk agent {index}: blank id")));
        }
        let agent = state
            .agents
            .upsert(payload.resolve(TraitPrecedence::NestedFirst))
            .await?;
        agents.push(agent);
    }

    info!(count = agents.len(), "Bulk upserted agents");
    Ok(Json(BulkUpsertResponse {
        count: agents.len(),
        agents,
    }))
}

/// Set an agent's status and current partner.
#[instrument(skip(state, request))]
pub async fn update_agent_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateAgentStatusRequest>,
) -> ApiResult<Json<Agent>> {
    let agent = state
        .agents
        .update_status(&id, request.status, request.current_partner_id.as_deref())
        .await?;
    info!(agent_id = %agent.id, status = %agent.status, "Updated agent status");
    Ok(Json(agent))
}

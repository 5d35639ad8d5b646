use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use dcr_ledger::HistoryRecord;
use dcr_protocol::{
    CheckQuery, CheckResponse, EventStateDto, ExecuteRequest, ExecuteResponse, HealthResponse,
    Notification, TimestampResponse,
};
use dcr_types::{EventDefinition, EventKey, EventNode, LockToken};

use crate::auth::Action;
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

type EventPath = Path<(String, String)>;
type SenderPath = Path<(String, String, String)>;

fn key((workflow_id, event_id): (String, String)) -> EventKey {
    EventKey::new(workflow_id, event_id)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ServerResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ServerError::BadRequest(e.body_text()))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

pub async fn create_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<EventDefinition>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<EventNode>)> {
    state.require(&headers, Action::CreateEvent).await?;
    let node = state.engine.create(body(payload)?)?;
    Ok((StatusCode::CREATED, Json(node)))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(path): EventPath,
) -> ServerResult<Json<EventNode>> {
    Ok(Json(state.engine.get(&key(path))?))
}

pub async fn delete_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): EventPath,
) -> ServerResult<StatusCode> {
    let key = key(path);
    state.require(&headers, Action::DeleteEvent(key.clone())).await?;
    state.engine.delete(&key)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reset_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): EventPath,
) -> ServerResult<Json<EventNode>> {
    let key = key(path);
    state.require(&headers, Action::ResetEvent(key.clone())).await?;
    Ok(Json(state.engine.reset(&key)?))
}

pub async fn is_executed(
    State(state): State<AppState>,
    Path((workflow_id, event_id, sender_id)): SenderPath,
) -> ServerResult<Json<bool>> {
    let key = EventKey::new(workflow_id, event_id);
    Ok(Json(state.engine.is_executed(&key, &sender_id)?))
}

pub async fn is_included(
    State(state): State<AppState>,
    Path((workflow_id, event_id, sender_id)): SenderPath,
) -> ServerResult<Json<bool>> {
    let key = EventKey::new(workflow_id, event_id);
    Ok(Json(state.engine.is_included(&key, &sender_id)?))
}

pub async fn check_condition(
    State(state): State<AppState>,
    Path(path): EventPath,
    query: Result<Query<CheckQuery>, QueryRejection>,
) -> ServerResult<Json<CheckResponse>> {
    let Query(query) = query.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    Ok(Json(state.engine.check_condition(&key(path), &query)?))
}

pub async fn check_milestone(
    State(state): State<AppState>,
    Path(path): EventPath,
    query: Result<Query<CheckQuery>, QueryRejection>,
) -> ServerResult<Json<CheckResponse>> {
    let Query(query) = query.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    Ok(Json(state.engine.check_milestone(&key(path), &query)?))
}

pub async fn get_state(
    State(state): State<AppState>,
    Path((workflow_id, event_id, sender_id)): SenderPath,
) -> ServerResult<Json<EventStateDto>> {
    let key = EventKey::new(workflow_id, event_id);
    Ok(Json(state.engine.state(&key, &sender_id).await?))
}

fn flag_path(
    path: Result<Path<(String, String, bool)>, PathRejection>,
) -> ServerResult<(EventKey, bool)> {
    let Path((workflow_id, event_id, value)) =
        path.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    Ok((EventKey::new(workflow_id, event_id), value))
}

pub async fn set_included(
    State(state): State<AppState>,
    path: Result<Path<(String, String, bool)>, PathRejection>,
    payload: Result<Json<Notification>, JsonRejection>,
) -> ServerResult<Json<TimestampResponse>> {
    let (key, included) = flag_path(path)?;
    let timestamp = state.engine.set_included(&key, included, &body(payload)?)?;
    Ok(Json(TimestampResponse { timestamp }))
}

pub async fn set_pending(
    State(state): State<AppState>,
    path: Result<Path<(String, String, bool)>, PathRejection>,
    payload: Result<Json<Notification>, JsonRejection>,
) -> ServerResult<Json<TimestampResponse>> {
    let (key, pending) = flag_path(path)?;
    let timestamp = state.engine.set_pending(&key, pending, &body(payload)?)?;
    Ok(Json(TimestampResponse { timestamp }))
}

pub async fn execute(
    State(state): State<AppState>,
    Path(path): EventPath,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> ServerResult<Json<ExecuteResponse>> {
    let request = body(payload)?;
    Ok(Json(state.engine.execute(&key(path), &request.roles).await?))
}

pub async fn lock(
    State(state): State<AppState>,
    Path(path): EventPath,
    payload: Result<Json<LockToken>, JsonRejection>,
) -> ServerResult<StatusCode> {
    state.engine.lock(&key(path), &body(payload)?)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unlock(
    State(state): State<AppState>,
    Path((workflow_id, event_id, sender_id)): SenderPath,
) -> ServerResult<StatusCode> {
    let key = EventKey::new(workflow_id, event_id);
    state.engine.unlock(&key, &sender_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn event_history(
    State(state): State<AppState>,
    Path(path): EventPath,
) -> ServerResult<Json<Vec<HistoryRecord>>> {
    Ok(Json(state.engine.event_history(&key(path))?))
}

pub async fn workflow_history(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> ServerResult<Json<Vec<HistoryRecord>>> {
    Ok(Json(state.engine.workflow_history(&workflow_id)?))
}

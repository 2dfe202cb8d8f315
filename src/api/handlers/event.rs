//! Event API Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::models::{CreateEventRequest, Event};
use crate::utils::response::AppError;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    pub events: Vec<Event>,
    pub total: usize,
}

/// Create an event
/// POST /events
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Extension(_auth_user): Extension<AuthUser>,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    req.validate()
        .map_err(|e| AppError::bad_request(&e.to_string()))?;

    let event = Event::new(req.title, req.description);
    state.store.insert_event(event.clone());
    tracing::info!(event = %event.id, "event created");
    Ok((StatusCode::CREATED, Json(event)))
}

/// List all events
/// GET /events
pub async fn list_events(State(state): State<Arc<AppState>>) -> Json<EventsResponse> {
    let events = state.store.list_events();
    let total = events.len();
    Json(EventsResponse { events, total })
}

/// Get an event
/// GET /events/:event_id
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Event>, AppError> {
    let event = state
        .store
        .get_event(event_id)
        .ok_or_else(|| AppError::not_found("event not found"))?;
    Ok(Json(event))
}

//! Event endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        event::{CreateEvent, Event, EventQuery, UpdateEvent},
        registration::{Registration, RegistrationQuery},
    },
    AppState,
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List events
#[utoipa::path(
    get,
    path = "/api/events",
    tag = "events",
    params(EventQuery),
    responses(
        (status = 200, description = "Events", body = PaginatedResponse<Event>)
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> AppResult<Json<PaginatedResponse<Event>>> {
    let (events, total) = state.services.events.list(&query).await?;
    Ok(Json(PaginatedResponse::new(events, total, query.page, query.size)))
}

/// Get an event
#[utoipa::path(
    get,
    path = "/api/events/{id}",
    tag = "events",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event", body = Event),
        (status = 404, description = "Event not found")
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Event>> {
    Ok(Json(state.services.events.get_by_id(id).await?))
}

/// Host a new event
#[utoipa::path(
    post,
    path = "/api/events",
    tag = "events",
    security(("bearer_auth" = [])),
    request_body = CreateEvent,
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 400, description = "Invalid input or date in the past"),
        (status = 404, description = "Featured game not found")
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(event): Json<CreateEvent>,
) -> AppResult<(StatusCode, Json<Event>)> {
    let created = state.services.events.create(&claims, event).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an event (host only)
#[utoipa::path(
    put,
    path = "/api/events/{id}",
    tag = "events",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Event ID")),
    request_body = UpdateEvent,
    responses(
        (status = 200, description = "Event updated", body = Event),
        (status = 400, description = "Capacity below current participants"),
        (status = 403, description = "Not the host"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(update): Json<UpdateEvent>,
) -> AppResult<Json<Event>> {
    Ok(Json(state.services.events.update(&claims, id, update).await?))
}

/// Delete an event (host only)
#[utoipa::path(
    delete,
    path = "/api/events/{id}",
    tag = "events",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 403, description = "Not the host"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn delete_event(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.events.delete(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Registrations of an event
#[utoipa::path(
    get,
    path = "/api/events/{id}/registrations",
    tag = "events",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Event ID"),
        ("page" = Option<i64>, Query, description = "Page number (0-based)"),
        ("size" = Option<i64>, Query, description = "Page size (default 20)")
    ),
    responses(
        (status = 200, description = "Registrations", body = PaginatedResponse<Registration>),
        (status = 404, description = "Event not found")
    )
)]
pub async fn list_event_registrations(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(mut query): Query<RegistrationQuery>,
) -> AppResult<Json<PaginatedResponse<Registration>>> {
    state.services.events.get_by_id(id).await?;
    query.event_id = Some(id);
    let (registrations, total) = state.services.events.list_registrations(&query).await?;
    Ok(Json(PaginatedResponse::new(registrations, total, query.page, query.size)))
}

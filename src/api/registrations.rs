//! Event registration endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::registration::{CreateRegistration, Registration, RegistrationQuery, UpdateRegistration},
    AppState,
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List registrations
#[utoipa::path(
    get,
    path = "/api/registrations",
    tag = "registrations",
    security(("bearer_auth" = [])),
    params(RegistrationQuery),
    responses(
        (status = 200, description = "Registrations", body = PaginatedResponse<Registration>)
    )
)]
pub async fn list_registrations(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<RegistrationQuery>,
) -> AppResult<Json<PaginatedResponse<Registration>>> {
    let (registrations, total) = state.services.events.list_registrations(&query).await?;
    Ok(Json(PaginatedResponse::new(registrations, total, query.page, query.size)))
}

/// Register the caller to an event
#[utoipa::path(
    post,
    path = "/api/registrations",
    tag = "registrations",
    security(("bearer_auth" = [])),
    request_body = CreateRegistration,
    responses(
        (status = 201, description = "Registered", body = Registration),
        (status = 400, description = "Event full or already past"),
        (status = 404, description = "Event not found"),
        (status = 409, description = "Already registered")
    )
)]
pub async fn create_registration(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(body): Json<CreateRegistration>,
) -> AppResult<(StatusCode, Json<Registration>)> {
    let registration = state.services.events.register(&claims, body.event_id).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

/// Get a registration
#[utoipa::path(
    get,
    path = "/api/registrations/{id}",
    tag = "registrations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Registration ID")),
    responses(
        (status = 200, description = "Registration", body = Registration),
        (status = 404, description = "Registration not found")
    )
)]
pub async fn get_registration(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Registration>> {
    Ok(Json(state.services.events.get_registration(id).await?))
}

/// Move a registration to another event
#[utoipa::path(
    put,
    path = "/api/registrations/{id}",
    tag = "registrations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Registration ID")),
    request_body = UpdateRegistration,
    responses(
        (status = 200, description = "Registration moved", body = Registration),
        (status = 400, description = "Target event full or already past"),
        (status = 403, description = "Not the attendee"),
        (status = 404, description = "Registration or event not found"),
        (status = 409, description = "Already registered to the target event")
    )
)]
pub async fn update_registration(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(body): Json<UpdateRegistration>,
) -> AppResult<Json<Registration>> {
    let moved = state
        .services
        .events
        .move_registration(&claims, id, body.event_id)
        .await?;
    Ok(Json(moved))
}

/// Cancel a registration (attendee or host)
#[utoipa::path(
    delete,
    path = "/api/registrations/{id}",
    tag = "registrations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Registration ID")),
    responses(
        (status = 204, description = "Registration cancelled"),
        (status = 403, description = "Neither attendee nor host"),
        (status = 404, description = "Registration not found")
    )
)]
pub async fn delete_registration(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.events.unregister(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Borrow request endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::borrow_request::{
        BorrowRequestDetails, BorrowRequestQuery, CreateBorrowRequest, UpdateBorrowRequestStatus,
    },
    AppState,
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List borrow requests
#[utoipa::path(
    get,
    path = "/api/borrowrequests",
    tag = "borrow-requests",
    security(("bearer_auth" = [])),
    params(BorrowRequestQuery),
    responses(
        (status = 200, description = "Borrow requests", body = PaginatedResponse<BorrowRequestDetails>),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_requests(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<BorrowRequestQuery>,
) -> AppResult<Json<PaginatedResponse<BorrowRequestDetails>>> {
    let (requests, total) = state.services.borrow_requests.list(&query).await?;
    Ok(Json(PaginatedResponse::new(requests, total, query.page, query.size)))
}

/// Ask to borrow a game
#[utoipa::path(
    post,
    path = "/api/borrowrequests",
    tag = "borrow-requests",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowRequest,
    responses(
        (status = 201, description = "Request created", body = BorrowRequestDetails),
        (status = 400, description = "Invalid dates, own game, unavailable copy or overlapping approved request"),
        (status = 404, description = "Game or instance not found")
    )
)]
pub async fn create_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowRequestDetails>)> {
    let created = state.services.borrow_requests.create(&claims, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a borrow request
#[utoipa::path(
    get,
    path = "/api/borrowrequests/{id}",
    tag = "borrow-requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Borrow request", body = BorrowRequestDetails),
        (status = 403, description = "Neither requester nor game owner"),
        (status = 404, description = "Borrow request not found")
    )
)]
pub async fn get_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowRequestDetails>> {
    Ok(Json(state.services.borrow_requests.get(&claims, id).await?))
}

/// Approve or decline a request (game owner only)
#[utoipa::path(
    put,
    path = "/api/borrowrequests/{id}",
    tag = "borrow-requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow request ID")),
    request_body = UpdateBorrowRequestStatus,
    responses(
        (status = 200, description = "Request answered", body = BorrowRequestDetails),
        (status = 400, description = "Unknown status, request already answered or overlap"),
        (status = 403, description = "Not the game owner"),
        (status = 404, description = "Borrow request not found")
    )
)]
pub async fn update_request_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(update): Json<UpdateBorrowRequestStatus>,
) -> AppResult<Json<BorrowRequestDetails>> {
    let updated = state
        .services
        .borrow_requests
        .update_status(&claims, id, &update.status)
        .await?;
    Ok(Json(updated))
}

/// Delete a request (requester or game owner)
#[utoipa::path(
    delete,
    path = "/api/borrowrequests/{id}",
    tag = "borrow-requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow request ID")),
    responses(
        (status = 204, description = "Request deleted"),
        (status = 400, description = "Lending still in progress"),
        (status = 403, description = "Neither requester nor game owner"),
        (status = 404, description = "Borrow request not found")
    )
)]
pub async fn delete_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.borrow_requests.delete(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

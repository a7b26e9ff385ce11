//! Lending record endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::lending_record::{
        ConfirmReturn, CreateLendingRecord, ExtendEndDate, LendingRecord, LendingRecordQuery,
        LendingStats, UpdateLendingStatus,
    },
    AppState,
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List lending records
#[utoipa::path(
    get,
    path = "/api/lending-records",
    tag = "lending-records",
    security(("bearer_auth" = [])),
    params(LendingRecordQuery),
    responses(
        (status = 200, description = "Lending records", body = PaginatedResponse<LendingRecord>),
        (status = 400, description = "Unknown status or sort field")
    )
)]
pub async fn list_records(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<LendingRecordQuery>,
) -> AppResult<Json<PaginatedResponse<LendingRecord>>> {
    let (records, total) = state.services.lending.list(&query).await?;
    Ok(Json(PaginatedResponse::new(records, total, query.page, query.size)))
}

/// ACTIVE records past their end date
#[utoipa::path(
    get,
    path = "/api/lending-records/overdue",
    tag = "lending-records",
    security(("bearer_auth" = [])),
    params(LendingRecordQuery),
    responses(
        (status = 200, description = "Overdue records", body = PaginatedResponse<LendingRecord>)
    )
)]
pub async fn list_overdue(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<LendingRecordQuery>,
) -> AppResult<Json<PaginatedResponse<LendingRecord>>> {
    let (page, size) = (query.page, query.size);
    let (records, total) = state.services.lending.list_overdue(query).await?;
    Ok(Json(PaginatedResponse::new(records, total, page, size)))
}

/// Statistics over the caller's lendings
#[utoipa::path(
    get,
    path = "/api/lending-records/stats",
    tag = "lending-records",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Statistics", body = LendingStats)
    )
)]
pub async fn get_stats(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<LendingStats>> {
    Ok(Json(state.services.lending.stats(&claims).await?))
}

/// Open the record of an approved request
#[utoipa::path(
    post,
    path = "/api/lending-records",
    tag = "lending-records",
    security(("bearer_auth" = [])),
    request_body = CreateLendingRecord,
    responses(
        (status = 201, description = "Record created", body = LendingRecord),
        (status = 400, description = "Request is not approved"),
        (status = 403, description = "Not the game owner"),
        (status = 409, description = "Record already exists")
    )
)]
pub async fn create_record(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(body): Json<CreateLendingRecord>,
) -> AppResult<(StatusCode, Json<LendingRecord>)> {
    let record = state
        .services
        .lending
        .create_from_request(&claims, body.request_id)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Get a lending record
#[utoipa::path(
    get,
    path = "/api/lending-records/{id}",
    tag = "lending-records",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Lending record ID")),
    responses(
        (status = 200, description = "Lending record", body = LendingRecord),
        (status = 404, description = "Lending record not found")
    )
)]
pub async fn get_record(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LendingRecord>> {
    Ok(Json(state.services.lending.get(id).await?))
}

/// Manual status change (owner only)
#[utoipa::path(
    put,
    path = "/api/lending-records/{id}/status",
    tag = "lending-records",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Lending record ID")),
    request_body = UpdateLendingStatus,
    responses(
        (status = 200, description = "Status changed", body = LendingRecord),
        (status = 400, description = "Transition not allowed or missing reason"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Lending record not found")
    )
)]
pub async fn update_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(update): Json<UpdateLendingStatus>,
) -> AppResult<Json<LendingRecord>> {
    Ok(Json(state.services.lending.update_status(&claims, id, update).await?))
}

/// Borrower reports the game returned
#[utoipa::path(
    post,
    path = "/api/lending-records/{id}/mark-returned",
    tag = "lending-records",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Lending record ID")),
    responses(
        (status = 200, description = "Awaiting owner confirmation", body = LendingRecord),
        (status = 400, description = "Return already reported or record closed"),
        (status = 403, description = "Not the borrower"),
        (status = 404, description = "Lending record not found")
    )
)]
pub async fn mark_returned(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LendingRecord>> {
    Ok(Json(state.services.lending.mark_returned(&claims, id).await?))
}

/// Owner confirms the return and assesses damage
#[utoipa::path(
    post,
    path = "/api/lending-records/{id}/confirm-return",
    tag = "lending-records",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Lending record ID")),
    request_body = ConfirmReturn,
    responses(
        (status = 200, description = "Record closed", body = LendingRecord),
        (status = 400, description = "Record already closed"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Lending record not found")
    )
)]
pub async fn confirm_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(confirmation): Json<ConfirmReturn>,
) -> AppResult<Json<LendingRecord>> {
    Ok(Json(state.services.lending.confirm_return(&claims, id, confirmation).await?))
}

/// Move the end date of an open record (owner only)
#[utoipa::path(
    put,
    path = "/api/lending-records/{id}/end-date",
    tag = "lending-records",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Lending record ID")),
    request_body = ExtendEndDate,
    responses(
        (status = 200, description = "End date changed", body = LendingRecord),
        (status = 400, description = "Record closed or end before start"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Lending record not found")
    )
)]
pub async fn extend_end_date(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(extension): Json<ExtendEndDate>,
) -> AppResult<Json<LendingRecord>> {
    Ok(Json(state.services.lending.extend_end_date(&claims, id, extension).await?))
}

/// Delete a closed record (owner only)
#[utoipa::path(
    delete,
    path = "/api/lending-records/{id}",
    tag = "lending-records",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Lending record ID")),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 400, description = "Record is not closed"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Lending record not found")
    )
)]
pub async fn delete_record(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.lending.delete(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

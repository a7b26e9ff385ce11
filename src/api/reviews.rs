//! Review endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::review::{CreateReview, Review, ReviewQuery, UpdateReview},
    AppState,
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List reviews by game and/or reviewer
#[utoipa::path(
    get,
    path = "/api/reviews",
    tag = "reviews",
    params(ReviewQuery),
    responses(
        (status = 200, description = "Reviews", body = PaginatedResponse<Review>)
    )
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(query): Query<ReviewQuery>,
) -> AppResult<Json<PaginatedResponse<Review>>> {
    let (reviews, total) = state.services.reviews.list(&query).await?;
    Ok(Json(PaginatedResponse::new(reviews, total, query.page, query.size)))
}

/// Review a borrowed game
#[utoipa::path(
    post,
    path = "/api/reviews",
    tag = "reviews",
    security(("bearer_auth" = [])),
    request_body = CreateReview,
    responses(
        (status = 201, description = "Review created", body = Review),
        (status = 400, description = "No completed lending for this game, or invalid rating"),
        (status = 404, description = "Game not found")
    )
)]
pub async fn create_review(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(review): Json<CreateReview>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let created = state.services.reviews.create(&claims, review).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a review
#[utoipa::path(
    get,
    path = "/api/reviews/{id}",
    tag = "reviews",
    params(("id" = i32, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review", body = Review),
        (status = 404, description = "Review not found")
    )
)]
pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Review>> {
    Ok(Json(state.services.reviews.get(id).await?))
}

/// Update own review
#[utoipa::path(
    put,
    path = "/api/reviews/{id}",
    tag = "reviews",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Review ID")),
    request_body = UpdateReview,
    responses(
        (status = 200, description = "Review updated", body = Review),
        (status = 403, description = "Not the reviewer"),
        (status = 404, description = "Review not found")
    )
)]
pub async fn update_review(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(update): Json<UpdateReview>,
) -> AppResult<Json<Review>> {
    Ok(Json(state.services.reviews.update(&claims, id, update).await?))
}

/// Delete own review
#[utoipa::path(
    delete,
    path = "/api/reviews/{id}",
    tag = "reviews",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Review ID")),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 403, description = "Not the reviewer"),
        (status = 404, description = "Review not found")
    )
)]
pub async fn delete_review(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.reviews.delete(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

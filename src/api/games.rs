//! Game catalog endpoints: games, instances, reviews, rating and availability

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        game::{
            Availability, AvailabilityQuery, CreateGame, CreateGameInstance, Game, GameInstance,
            GameQuery, GameRating, UpdateGame, UpdateGameInstance,
        },
        review::{CreateGameReview, CreateReview, Review, ReviewQuery},
    },
    AppState,
};

use super::{AuthenticatedUser, PaginatedResponse};

/// Search games
#[utoipa::path(
    get,
    path = "/api/games",
    tag = "games",
    params(GameQuery),
    responses(
        (status = 200, description = "Games", body = PaginatedResponse<Game>)
    )
)]
pub async fn list_games(
    State(state): State<AppState>,
    Query(query): Query<GameQuery>,
) -> AppResult<Json<PaginatedResponse<Game>>> {
    let (games, total) = state.services.catalog.search_games(&query).await?;
    Ok(Json(PaginatedResponse::new(games, total, query.page, query.size)))
}

/// Get a game
#[utoipa::path(
    get,
    path = "/api/games/{id}",
    tag = "games",
    params(("id" = i32, Path, description = "Game ID")),
    responses(
        (status = 200, description = "Game", body = Game),
        (status = 404, description = "Game not found")
    )
)]
pub async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Game>> {
    Ok(Json(state.services.catalog.get_game(id).await?))
}

/// Add a game (game owners only)
#[utoipa::path(
    post,
    path = "/api/games",
    tag = "games",
    security(("bearer_auth" = [])),
    request_body = CreateGame,
    responses(
        (status = 201, description = "Game created", body = Game),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Caller is not a game owner")
    )
)]
pub async fn create_game(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(game): Json<CreateGame>,
) -> AppResult<(StatusCode, Json<Game>)> {
    let created = state.services.catalog.create_game(&claims, game).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a game (owner only)
#[utoipa::path(
    put,
    path = "/api/games/{id}",
    tag = "games",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Game ID")),
    request_body = UpdateGame,
    responses(
        (status = 200, description = "Game updated", body = Game),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Game not found")
    )
)]
pub async fn update_game(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(update): Json<UpdateGame>,
) -> AppResult<Json<Game>> {
    Ok(Json(state.services.catalog.update_game(&claims, id, update).await?))
}

/// Delete a game (owner only)
#[utoipa::path(
    delete,
    path = "/api/games/{id}",
    tag = "games",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Game ID")),
    responses(
        (status = 204, description = "Game deleted"),
        (status = 400, description = "Game is lent out or featured in an upcoming event"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Game not found")
    )
)]
pub async fn delete_game(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_game(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the copies of a game
#[utoipa::path(
    get,
    path = "/api/games/{id}/instances",
    tag = "games",
    params(("id" = i32, Path, description = "Game ID")),
    responses(
        (status = 200, description = "Instances", body = Vec<GameInstance>),
        (status = 404, description = "Game not found")
    )
)]
pub async fn list_instances(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<GameInstance>>> {
    Ok(Json(state.services.catalog.list_instances(id).await?))
}

/// Register a copy of a game
#[utoipa::path(
    post,
    path = "/api/games/{id}/instances",
    tag = "games",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Game ID")),
    request_body = CreateGameInstance,
    responses(
        (status = 201, description = "Instance created", body = GameInstance),
        (status = 403, description = "Not the owner of the game"),
        (status = 404, description = "Game not found")
    )
)]
pub async fn create_instance(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(instance): Json<CreateGameInstance>,
) -> AppResult<(StatusCode, Json<GameInstance>)> {
    let created = state.services.catalog.create_instance(&claims, id, instance).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a copy of a game
#[utoipa::path(
    get,
    path = "/api/games/{id}/instances/{instance_id}",
    tag = "games",
    params(
        ("id" = i32, Path, description = "Game ID"),
        ("instance_id" = i32, Path, description = "Instance ID")
    ),
    responses(
        (status = 200, description = "Instance", body = GameInstance),
        (status = 404, description = "Instance not found")
    )
)]
pub async fn get_instance(
    State(state): State<AppState>,
    Path((id, instance_id)): Path<(i32, i32)>,
) -> AppResult<Json<GameInstance>> {
    Ok(Json(state.services.catalog.get_instance(id, instance_id).await?))
}

/// Update a copy (its owner only)
#[utoipa::path(
    put,
    path = "/api/games/{id}/instances/{instance_id}",
    tag = "games",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Game ID"),
        ("instance_id" = i32, Path, description = "Instance ID")
    ),
    request_body = UpdateGameInstance,
    responses(
        (status = 200, description = "Instance updated", body = GameInstance),
        (status = 403, description = "Not the owner of the copy"),
        (status = 404, description = "Instance not found")
    )
)]
pub async fn update_instance(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, instance_id)): Path<(i32, i32)>,
    Json(update): Json<UpdateGameInstance>,
) -> AppResult<Json<GameInstance>> {
    let updated = state
        .services
        .catalog
        .update_instance(&claims, id, instance_id, update)
        .await?;
    Ok(Json(updated))
}

/// Delete a copy (its owner only)
#[utoipa::path(
    delete,
    path = "/api/games/{id}/instances/{instance_id}",
    tag = "games",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Game ID"),
        ("instance_id" = i32, Path, description = "Instance ID")
    ),
    responses(
        (status = 204, description = "Instance deleted"),
        (status = 403, description = "Not the owner of the copy"),
        (status = 404, description = "Instance not found")
    )
)]
pub async fn delete_instance(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, instance_id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_instance(&claims, id, instance_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reviews of a game
#[utoipa::path(
    get,
    path = "/api/games/{id}/reviews",
    tag = "games",
    params(
        ("id" = i32, Path, description = "Game ID"),
        ("page" = Option<i64>, Query, description = "Page number (0-based)"),
        ("size" = Option<i64>, Query, description = "Page size (default 20)")
    ),
    responses(
        (status = 200, description = "Reviews", body = PaginatedResponse<Review>)
    )
)]
pub async fn list_game_reviews(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(mut query): Query<ReviewQuery>,
) -> AppResult<Json<PaginatedResponse<Review>>> {
    query.game_id = Some(id);
    let (reviews, total) = state.services.reviews.list(&query).await?;
    Ok(Json(PaginatedResponse::new(reviews, total, query.page, query.size)))
}

/// Review a game after borrowing it
#[utoipa::path(
    post,
    path = "/api/games/{id}/reviews",
    tag = "games",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Game ID")),
    request_body = CreateGameReview,
    responses(
        (status = 201, description = "Review created", body = Review),
        (status = 400, description = "No completed lending for this game, or invalid rating"),
        (status = 404, description = "Game not found")
    )
)]
pub async fn create_game_review(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(review): Json<CreateGameReview>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let review = CreateReview {
        game_id: id,
        rating: review.rating,
        comment: review.comment,
    };
    let created = state.services.reviews.create(&claims, review).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Average rating of a game
#[utoipa::path(
    get,
    path = "/api/games/{id}/rating",
    tag = "games",
    params(("id" = i32, Path, description = "Game ID")),
    responses(
        (status = 200, description = "Rating", body = GameRating),
        (status = 404, description = "Game not found")
    )
)]
pub async fn get_rating(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<GameRating>> {
    Ok(Json(state.services.catalog.rating(id).await?))
}

/// Whether a game is free over a date range
#[utoipa::path(
    get,
    path = "/api/games/{id}/availability",
    tag = "games",
    params(("id" = i32, Path, description = "Game ID"), AvailabilityQuery),
    responses(
        (status = 200, description = "Availability", body = Availability),
        (status = 400, description = "Invalid date range"),
        (status = 404, description = "Game or instance not found")
    )
)]
pub async fn get_availability(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<Availability>> {
    Ok(Json(state.services.catalog.availability(id, &query).await?))
}

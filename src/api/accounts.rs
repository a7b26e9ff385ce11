//! Account endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::account::{Account, AccountShort, CreateAccount, UpdateAccount},
    AppState,
};

use super::AuthenticatedUser;

/// Sign up
#[utoipa::path(
    post,
    path = "/api/account",
    tag = "accounts",
    request_body = CreateAccount,
    responses(
        (status = 201, description = "Account created", body = Account),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_account(
    State(state): State<AppState>,
    Json(account): Json<CreateAccount>,
) -> AppResult<(StatusCode, Json<Account>)> {
    let created = state.services.accounts.create(account).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update the caller's profile
#[utoipa::path(
    put,
    path = "/api/account",
    tag = "accounts",
    security(("bearer_auth" = [])),
    request_body = UpdateAccount,
    responses(
        (status = 200, description = "Account updated", body = Account),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated or wrong current password")
    )
)]
pub async fn update_account(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(update): Json<UpdateAccount>,
) -> AppResult<Json<Account>> {
    let updated = state.services.accounts.update_own(&claims, update).await?;
    Ok(Json(updated))
}

/// Get an account by email
#[utoipa::path(
    get,
    path = "/api/account/{email}",
    tag = "accounts",
    security(("bearer_auth" = [])),
    params(("email" = String, Path, description = "Account email")),
    responses(
        (status = 200, description = "Account", body = AccountShort),
        (status = 404, description = "Account not found")
    )
)]
pub async fn get_account(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(email): Path<String>,
) -> AppResult<Json<AccountShort>> {
    let account = state.services.accounts.get_by_email(&email).await?;
    Ok(Json(account.into()))
}

/// Become a game owner
#[utoipa::path(
    put,
    path = "/api/account/{email}",
    tag = "accounts",
    security(("bearer_auth" = [])),
    params(("email" = String, Path, description = "Caller's email")),
    responses(
        (status = 200, description = "Account promoted", body = Account),
        (status = 403, description = "Not the caller's account"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn promote_account(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(email): Path<String>,
) -> AppResult<Json<Account>> {
    let account = state.services.accounts.promote_to_owner(&claims, &email).await?;
    Ok(Json(account))
}

/// Delete the caller's account
#[utoipa::path(
    delete,
    path = "/api/account/{email}",
    tag = "accounts",
    security(("bearer_auth" = [])),
    params(("email" = String, Path, description = "Caller's email")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 400, description = "Lendings still in progress"),
        (status = 403, description = "Not the caller's account"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn delete_account(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(email): Path<String>,
) -> AppResult<StatusCode> {
    state.services.accounts.delete_own(&claims, &email).await?;
    Ok(StatusCode::NO_CONTENT)
}

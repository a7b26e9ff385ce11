//! Authentication endpoints

use axum::{extract::State, Json};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    CookieJar,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{error::AppResult, models::account::Account, AppState};

use super::{AuthenticatedUser, ACCESS_TOKEN_COOKIE, IS_AUTHENTICATED_COOKIE};

/// Login request
#[derive(Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub password: String,
    /// Keep the session across browser restarts
    #[serde(default)]
    pub remember_me: bool,
}

/// Login response
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    /// JWT, also set in the `accessToken` cookie
    pub token: String,
    pub token_type: String,
    pub account: Account,
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct RequestPasswordReset {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Deserialize, ToSchema)]
pub struct PerformPasswordReset {
    pub token: String,
    pub new_password: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

fn auth_cookie(
    name: &'static str,
    value: String,
    http_only: bool,
    secure: bool,
    max_age_secs: Option<i64>,
) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, value))
        .path("/")
        .http_only(http_only)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build();
    if let Some(secs) = max_age_secs {
        cookie.set_max_age(time::Duration::seconds(secs));
    }
    cookie
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}

/// Authenticate and receive the session cookies
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, cookies set", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    request.validate()?;

    let session = state
        .services
        .auth
        .login(&request.email, &request.password, request.remember_me)
        .await?;

    let secure = state.config.auth.cookie_secure;
    let jar = jar
        .add(auth_cookie(
            ACCESS_TOKEN_COOKIE,
            session.token.clone(),
            true,
            secure,
            session.persistent_secs,
        ))
        .add(auth_cookie(
            IS_AUTHENTICATED_COOKIE,
            "true".to_string(),
            false,
            secure,
            session.persistent_secs,
        ));

    Ok((
        jar,
        Json(LoginResponse {
            token: session.token,
            token_type: "Bearer".to_string(),
            account: session.account,
        }),
    ))
}

/// Revoke the current token and clear the session cookies
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<MessageResponse>)> {
    state.services.auth.logout(&claims).await?;

    let jar = jar
        .remove(removal_cookie(ACCESS_TOKEN_COOKIE))
        .remove(removal_cookie(IS_AUTHENTICATED_COOKIE));

    Ok((
        jar,
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    ))
}

/// Get the authenticated account
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current account", body = Account),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Account>> {
    let account = state.services.accounts.get_by_id(claims.account_id).await?;
    Ok(Json(account))
}

/// Ask for a password reset link. Always answers 200.
#[utoipa::path(
    post,
    path = "/auth/request-password-reset",
    tag = "auth",
    request_body = RequestPasswordReset,
    responses(
        (status = 200, description = "Reset link sent if the account exists", body = MessageResponse),
        (status = 400, description = "Invalid email")
    )
)]
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(request): Json<RequestPasswordReset>,
) -> AppResult<Json<MessageResponse>> {
    request.validate()?;
    state.services.auth.request_password_reset(&request.email).await?;

    Ok(Json(MessageResponse {
        message: "If an account exists for this email, a reset link has been sent".to_string(),
    }))
}

/// Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/auth/perform-password-reset",
    tag = "auth",
    request_body = PerformPasswordReset,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid or expired token", body = crate::error::ErrorResponse)
    )
)]
pub async fn perform_password_reset(
    State(state): State<AppState>,
    Json(request): Json<PerformPasswordReset>,
) -> AppResult<Json<MessageResponse>> {
    state
        .services
        .auth
        .perform_password_reset(&request.token, &request.new_password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password has been reset".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_cookie_attributes() {
        let cookie = auth_cookie(ACCESS_TOKEN_COOKIE, "jwt".to_string(), true, false, None);
        assert_eq!(cookie.value(), "jwt");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert!(cookie.max_age().is_none());
    }

    #[test]
    fn test_remember_me_cookie_persists() {
        let cookie = auth_cookie(IS_AUTHENTICATED_COOKIE, "true".to_string(), false, true, Some(3600));
        assert_eq!(cookie.http_only(), Some(false));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(3600)));
    }
}

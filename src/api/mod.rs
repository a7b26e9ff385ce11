//! API handlers for GameLend REST endpoints

pub mod accounts;
pub mod auth;
pub mod borrow_requests;
pub mod events;
pub mod games;
pub mod health;
pub mod lending_records;
pub mod openapi;
pub mod registrations;
pub mod reviews;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use axum_extra::extract::CookieJar;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppError, models::{account::AccountClaims, page_bounds}, AppState};

/// Cookie carrying the JWT (HttpOnly)
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
/// Cookie readable by the front-end to know a session exists
pub const IS_AUTHENTICATED_COOKIE: &str = "isAuthenticated";

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Items of the requested page
    pub items: Vec<T>,
    /// Total number of matching items
    pub total: i64,
    /// Current page number (0-based)
    pub page: i64,
    /// Page size
    pub size: i64,
}

impl<T> PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Wrap a page of results, echoing the effective pagination
    pub fn new(items: Vec<T>, total: i64, page: Option<i64>, size: Option<i64>) -> Self {
        let (page, size, _) = page_bounds(page, size);
        Self { items, total, page, size }
    }
}

/// Token from `Authorization: Bearer`, falling back to the `accessToken` cookie
pub fn extract_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    match bearer {
        Some(token) => Some(token.to_string()),
        None => jar
            .get(ACCESS_TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty()),
    }
}

/// Extractor for the authenticated account
pub struct AuthenticatedUser(pub AccountClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = extract_token(&parts.headers, &jar)
            .ok_or_else(|| AppError::Authentication("Missing authentication token".to_string()))?;

        let claims = state.services.auth.validate_token(&token).await?;

        Ok(AuthenticatedUser(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum_extra::extract::cookie::Cookie;

    fn jar_with_token(token: &str) -> CookieJar {
        CookieJar::new().add(Cookie::new(ACCESS_TOKEN_COOKIE, token.to_string()))
    }

    #[test]
    fn test_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_token(&headers, &CookieJar::new()), Some("abc.def".to_string()));
    }

    #[test]
    fn test_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(
            extract_token(&headers, &jar_with_token("from-cookie")),
            Some("from-header".to_string())
        );
    }

    #[test]
    fn test_cookie_fallback() {
        let headers = HeaderMap::new();
        assert_eq!(
            extract_token(&headers, &jar_with_token("from-cookie")),
            Some("from-cookie".to_string())
        );
    }

    #[test]
    fn test_non_bearer_header_falls_back_to_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(extract_token(&headers, &CookieJar::new()), None);
        assert_eq!(
            extract_token(&headers, &jar_with_token("c")),
            Some("c".to_string())
        );
    }

    #[test]
    fn test_pagination_echo() {
        let page: PaginatedResponse<crate::models::Review> = PaginatedResponse::new(vec![], 0, None, Some(500));
        assert_eq!(page.page, 0);
        assert_eq!(page.size, 100);
    }
}

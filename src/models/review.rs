//! Game review model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Review {
    pub id: i32,
    /// 1 to 5
    pub rating: i32,
    pub comment: Option<String>,
    pub date_submitted: DateTime<Utc>,
    pub game_id: i32,
    pub reviewer_id: i32,
    pub reviewer_name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReview {
    pub game_id: i32,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 2000, message = "Comment must be at most 2000 characters"))]
    pub comment: Option<String>,
}

/// Review submitted through `/api/games/{id}/reviews`
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateGameReview {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 2000, message = "Comment must be at most 2000 characters"))]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateReview {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i32>,
    #[validate(length(max = 2000, message = "Comment must be at most 2000 characters"))]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ReviewQuery {
    pub game_id: Option<i32>,
    pub reviewer_id: Option<i32>,
    /// Page number (0-based)
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        for (rating, ok) in [(0, false), (1, true), (5, true), (6, false)] {
            let review = CreateReview { game_id: 1, rating, comment: None };
            assert_eq!(review.validate().is_ok(), ok, "rating {}", rating);
        }
    }
}

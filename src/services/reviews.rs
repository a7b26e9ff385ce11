//! Reviews service
//!
//! Only accounts that borrowed a game and gave it back (a CLOSED lending
//! record) may review it.

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        account::AccountClaims,
        review::{CreateReview, Review, ReviewQuery, UpdateReview},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct ReviewsService {
    repository: Repository,
}

impl ReviewsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &ReviewQuery) -> AppResult<(Vec<Review>, i64)> {
        self.repository.reviews.list(query).await
    }

    pub async fn get(&self, id: i32) -> AppResult<Review> {
        self.repository.reviews.get_by_id(id).await
    }

    pub async fn create(&self, claims: &AccountClaims, review: CreateReview) -> AppResult<Review> {
        review.validate()?;

        self.repository.games.get_by_id(review.game_id).await?;
        let eligible = self
            .repository
            .lending_records
            .has_closed_for_game(claims.account_id, review.game_id)
            .await?;
        if !eligible {
            tracing::warn!(
                "Account {} tried to review game {} without a completed lending",
                claims.account_id,
                review.game_id
            );
            return Err(AppError::BadRequest(
                "You can only review games you have borrowed and returned".to_string(),
            ));
        }

        let created = self
            .repository
            .reviews
            .create(claims.account_id, review.game_id, review.rating, review.comment.as_deref())
            .await?;
        tracing::info!(
            "Review {} of game {} by account {} ({} stars)",
            created.id,
            created.game_id,
            claims.account_id,
            created.rating
        );
        Ok(created)
    }

    async fn own_review(&self, claims: &AccountClaims, id: i32) -> AppResult<Review> {
        let review = self.repository.reviews.get_by_id(id).await?;
        if review.reviewer_id != claims.account_id {
            return Err(AppError::Authorization(
                "You can only modify your own reviews".to_string(),
            ));
        }
        Ok(review)
    }

    pub async fn update(&self, claims: &AccountClaims, id: i32, update: UpdateReview) -> AppResult<Review> {
        update.validate()?;
        self.own_review(claims, id).await?;
        self.repository
            .reviews
            .update(id, update.rating, update.comment.as_deref())
            .await
    }

    pub async fn delete(&self, claims: &AccountClaims, id: i32) -> AppResult<()> {
        self.own_review(claims, id).await?;
        self.repository.reviews.delete(id).await?;
        tracing::info!("Review {} deleted", id);
        Ok(())
    }
}

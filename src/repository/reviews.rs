//! Reviews repository

use chrono::Utc;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        page_bounds,
        review::{Review, ReviewQuery},
    },
};

const SELECT_REVIEW: &str = r#"
    SELECT r.id, r.rating, r.comment, r.date_submitted, r.game_id,
           r.reviewer_id, a.name AS reviewer_name
    FROM reviews r
    JOIN accounts a ON a.id = r.reviewer_id
"#;

#[derive(Clone)]
pub struct ReviewsRepository {
    pool: Pool<Postgres>,
}

fn push_review_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ReviewQuery) {
    builder.push(" WHERE 1=1");
    if let Some(game_id) = query.game_id {
        builder.push(" AND r.game_id = ").push_bind(game_id);
    }
    if let Some(reviewer_id) = query.reviewer_id {
        builder.push(" AND r.reviewer_id = ").push_bind(reviewer_id);
    }
}

impl ReviewsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List reviews, newest first
    pub async fn list(&self, query: &ReviewQuery) -> AppResult<(Vec<Review>, i64)> {
        let (_, size, offset) = page_bounds(query.page, query.size);

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM reviews r");
        push_review_filters(&mut count, query);
        let (total,): (i64,) = count.build_query_as().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new(SELECT_REVIEW);
        push_review_filters(&mut select, query);
        select
            .push(" ORDER BY r.date_submitted DESC, r.id DESC LIMIT ")
            .push_bind(size)
            .push(" OFFSET ")
            .push_bind(offset);
        let reviews = select.build_query_as::<Review>().fetch_all(&self.pool).await?;

        Ok((reviews, total))
    }

    /// Get review by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Review> {
        let sql = format!("{} WHERE r.id = $1", SELECT_REVIEW);
        sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Review with id {} not found", id)))
    }

    pub async fn create(
        &self,
        reviewer_id: i32,
        game_id: i32,
        rating: i32,
        comment: Option<&str>,
    ) -> AppResult<Review> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO reviews (rating, comment, date_submitted, game_id, reviewer_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(rating)
        .bind(comment)
        .bind(Utc::now())
        .bind(game_id)
        .bind(reviewer_id)
        .fetch_one(&self.pool)
        .await?;
        self.get_by_id(id).await
    }

    pub async fn update(&self, id: i32, rating: Option<i32>, comment: Option<&str>) -> AppResult<Review> {
        let result = sqlx::query(
            r#"
            UPDATE reviews
            SET rating = COALESCE($2, rating),
                comment = COALESCE($3, comment)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(rating)
        .bind(comment)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Review with id {} not found", id)));
        }
        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Review with id {} not found", id)));
        }
        Ok(())
    }
}

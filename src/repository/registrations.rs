//! Registrations repository
//!
//! Every write touching a registration also adjusts the participant counter
//! of the affected events inside the same transaction.

use chrono::Utc;
use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::{is_unique_violation, AppError, AppResult},
    models::{page_bounds, registration::{Registration, RegistrationQuery}},
};

use super::events::{release_seat, reserve_seat};

const SELECT_REGISTRATION: &str = r#"
    SELECT r.id, r.registration_date, r.attendee_id, a.name AS attendee_name,
           r.event_id, e.title AS event_title, e.date_time AS event_date_time
    FROM registrations r
    JOIN accounts a ON a.id = r.attendee_id
    JOIN events e ON e.id = r.event_id
"#;

#[derive(Clone)]
pub struct RegistrationsRepository {
    pool: Pool<Postgres>,
}

fn already_registered(e: sqlx::Error, event_id: Uuid) -> AppError {
    if is_unique_violation(&e) {
        AppError::Conflict(format!("Already registered to event {}", event_id))
    } else {
        e.into()
    }
}

fn push_registration_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &RegistrationQuery) {
    builder.push(" WHERE 1=1");
    if let Some(attendee_id) = query.attendee_id {
        builder.push(" AND r.attendee_id = ").push_bind(attendee_id);
    }
    if let Some(event_id) = query.event_id {
        builder.push(" AND r.event_id = ").push_bind(event_id);
    }
}

impl RegistrationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List registrations with filters and pagination
    pub async fn list(&self, query: &RegistrationQuery) -> AppResult<(Vec<Registration>, i64)> {
        let (_, size, offset) = page_bounds(query.page, query.size);

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM registrations r");
        push_registration_filters(&mut count, query);
        let (total,): (i64,) = count.build_query_as().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new(SELECT_REGISTRATION);
        push_registration_filters(&mut select, query);
        select
            .push(" ORDER BY r.registration_date, r.id LIMIT ")
            .push_bind(size)
            .push(" OFFSET ")
            .push_bind(offset);
        let registrations = select
            .build_query_as::<Registration>()
            .fetch_all(&self.pool)
            .await?;

        Ok((registrations, total))
    }

    /// Get registration by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Registration> {
        let sql = format!("{} WHERE r.id = $1", SELECT_REGISTRATION);
        sqlx::query_as::<_, Registration>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Registration with id {} not found", id)))
    }

    /// Register an attendee, taking a seat of the event
    pub async fn create(&self, attendee_id: i32, event_id: Uuid) -> AppResult<Registration> {
        let mut tx = self.pool.begin().await?;

        reserve_seat(&mut tx, event_id).await?;

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO registrations (registration_date, attendee_id, event_id)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(Utc::now())
        .bind(attendee_id)
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| already_registered(e, event_id))?;

        tx.commit().await?;
        self.get_by_id(id).await
    }

    /// Move a registration to another event
    pub async fn move_to_event(&self, id: i32, event_id: Uuid) -> AppResult<Registration> {
        let mut tx = self.pool.begin().await?;

        let old_event_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT event_id FROM registrations WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Registration with id {} not found", id)))?;

        if old_event_id == event_id {
            tx.rollback().await?;
            return self.get_by_id(id).await;
        }

        reserve_seat(&mut tx, event_id).await?;

        sqlx::query("UPDATE registrations SET event_id = $2, registration_date = $3 WHERE id = $1")
            .bind(id)
            .bind(event_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| already_registered(e, event_id))?;

        release_seat(&mut tx, old_event_id).await?;

        tx.commit().await?;
        self.get_by_id(id).await
    }

    /// Delete a registration, giving its seat back
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let event_id = sqlx::query_scalar::<_, Uuid>(
            "DELETE FROM registrations WHERE id = $1 RETURNING event_id",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Registration with id {} not found", id)))?;

        release_seat(&mut tx, event_id).await?;

        tx.commit().await?;
        Ok(())
    }
}

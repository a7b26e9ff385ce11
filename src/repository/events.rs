//! Events repository

use chrono::Utc;
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        event::{CreateEvent, Event, EventQuery, UpdateEvent},
        page_bounds,
    },
};

#[derive(Clone)]
pub struct EventsRepository {
    pool: Pool<Postgres>,
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Event with id {} not found", id))
}

/// Take one seat of an upcoming event on the caller's connection.
/// The guarded UPDATE keeps `current_participants <= max_participants`
/// whatever the number of concurrent registrations.
pub(crate) async fn reserve_seat(conn: &mut PgConnection, event_id: Uuid) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE events
        SET current_participants = current_participants + 1
        WHERE id = $1 AND current_participants < max_participants AND date_time > NOW()
        "#,
    )
    .bind(event_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| not_found(event_id))?;

    if event.has_started(Utc::now()) {
        Err(AppError::BadRequest(format!("Event {} has already taken place", event_id)))
    } else {
        Err(AppError::BadRequest(format!(
            "Event {} is full ({} participants)",
            event_id, event.max_participants
        )))
    }
}

/// Give back one seat
pub(crate) async fn release_seat(conn: &mut PgConnection, event_id: Uuid) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE events
        SET current_participants = current_participants - 1
        WHERE id = $1 AND current_participants > 0
        "#,
    )
    .bind(event_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn push_event_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &EventQuery) {
    builder.push(" WHERE 1=1");
    if let Some(from) = query.from {
        builder.push(" AND date_time >= ").push_bind(from);
    }
    if let Some(to) = query.to {
        builder.push(" AND date_time <= ").push_bind(to);
    }
    if let Some(game_id) = query.game_id {
        builder.push(" AND featured_game_id = ").push_bind(game_id);
    }
    if let Some(host_id) = query.host_id {
        builder.push(" AND host_id = ").push_bind(host_id);
    }
    if let Some(ref title) = query.title {
        builder.push(" AND title ILIKE ").push_bind(format!("%{}%", title));
    }
}

impl EventsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List events with optional filters and pagination
    pub async fn list(&self, query: &EventQuery) -> AppResult<(Vec<Event>, i64)> {
        let (_, size, offset) = page_bounds(query.page, query.size);

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM events");
        push_event_filters(&mut count, query);
        let (total,): (i64,) = count.build_query_as().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new("SELECT * FROM events");
        push_event_filters(&mut select, query);
        select
            .push(" ORDER BY date_time, id LIMIT ")
            .push_bind(size)
            .push(" OFFSET ")
            .push_bind(offset);
        let events = select.build_query_as::<Event>().fetch_all(&self.pool).await?;

        Ok((events, total))
    }

    /// Get event by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Event> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Create a new event hosted by `host_id`
    pub async fn create(&self, host_id: i32, event: &CreateEvent) -> AppResult<Event> {
        let created = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (id, title, date_time, location, description, max_participants,
                                current_participants, featured_game_id, host_id, game_instance_id)
            VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event.title.trim())
        .bind(event.date_time)
        .bind(&event.location)
        .bind(&event.description)
        .bind(event.max_participants)
        .bind(event.featured_game_id)
        .bind(host_id)
        .bind(event.game_instance_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// Update provided fields of an event.
    /// A new capacity below the current participant count leaves the row untouched.
    pub async fn update(&self, id: Uuid, event: &UpdateEvent) -> AppResult<Event> {
        let updated = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
            SET title = COALESCE($2, title),
                date_time = COALESCE($3, date_time),
                location = COALESCE($4, location),
                description = COALESCE($5, description),
                max_participants = COALESCE($6, max_participants),
                featured_game_id = COALESCE($7, featured_game_id),
                game_instance_id = CASE WHEN $9 THEN NULL ELSE COALESCE($8, game_instance_id) END
            WHERE id = $1 AND ($6::int IS NULL OR $6 >= current_participants)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(event.title.as_deref().map(str::trim))
        .bind(event.date_time)
        .bind(&event.location)
        .bind(&event.description)
        .bind(event.max_participants)
        .bind(event.featured_game_id)
        .bind(event.game_instance_id)
        .bind(event.clear_game_instance)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(event) => Ok(event),
            None => {
                let current = self.get_by_id(id).await?;
                Err(AppError::BadRequest(format!(
                    "max_participants cannot be lower than the {} registered participants",
                    current.current_participants
                )))
            }
        }
    }

    /// Delete an event; its registrations are removed by ON DELETE CASCADE
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    /// Upcoming events featuring a game
    pub async fn count_upcoming_for_game(&self, game_id: i32) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM events WHERE featured_game_id = $1 AND date_time > NOW()",
        )
        .bind(game_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

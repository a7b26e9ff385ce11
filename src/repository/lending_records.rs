//! Lending records repository
//!
//! Status writes are compare-and-set on the status read by the service, so a
//! concurrent transition makes the second writer fail instead of skipping a
//! state.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::{is_unique_violation, AppError, AppResult},
    models::{
        borrow_request::BorrowRequest,
        lending_record::{
            DamageAssessment, LendingRecord, LendingRecordQuery, LendingStats, LendingStatus,
        },
        page_bounds,
    },
};

const SELECT_RECORD: &str = r#"
    SELECT lr.id, lr.start_date, lr.end_date, lr.status,
           lr.record_owner_id, o.name AS record_owner_name,
           lr.borrower_id, b.name AS borrower_name,
           lr.request_id, br.game_id, g.name AS game_name, br.instance_id,
           lr.is_damaged, lr.damage_notes, lr.damage_severity, lr.damage_assessment_date,
           lr.last_modified_date, lr.last_modified_by, lr.status_change_reason,
           lr.closed_by, lr.closing_reason, lr.created_at
    FROM lending_records lr
    JOIN borrow_requests br ON br.id = lr.request_id
    JOIN games g ON g.id = br.game_id
    JOIN accounts o ON o.id = lr.record_owner_id
    JOIN accounts b ON b.id = lr.borrower_id
"#;

const FROM_RECORDS: &str = r#"
    FROM lending_records lr
    JOIN borrow_requests br ON br.id = lr.request_id
"#;

#[derive(Clone)]
pub struct LendingRecordsRepository {
    pool: Pool<Postgres>,
}

/// Open an ACTIVE record for an approved request.
/// Runs on the caller's connection so approval and record creation commit together.
pub(crate) async fn insert_for_request(
    conn: &mut PgConnection,
    request: &BorrowRequest,
    owner_id: i32,
    modified_by: i32,
) -> AppResult<i32> {
    let id = sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO lending_records
            (start_date, end_date, status, record_owner_id, borrower_id, request_id,
             last_modified_date, last_modified_by)
        VALUES ($1, $2, 'ACTIVE', $3, $4, $5, NOW(), $6)
        RETURNING id
        "#,
    )
    .bind(request.start_date)
    .bind(request.end_date)
    .bind(owner_id)
    .bind(request.requester_id)
    .bind(request.id)
    .bind(modified_by)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!(
                "A lending record already exists for borrow request {}",
                request.id
            ))
        } else {
            e.into()
        }
    })?;
    Ok(id)
}

/// Move the end date of a record that is still open; returns the rows touched
pub(crate) async fn set_end_date(
    conn: &mut PgConnection,
    id: i32,
    end_date: DateTime<Utc>,
    actor_id: i32,
    reason: &str,
) -> AppResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE lending_records
        SET end_date = $2,
            status_change_reason = $4,
            last_modified_date = NOW(),
            last_modified_by = $3
        WHERE id = $1 AND status <> 'CLOSED' AND start_date < $2
        "#,
    )
    .bind(id)
    .bind(end_date)
    .bind(actor_id)
    .bind(reason)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

fn push_record_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    query: &LendingRecordQuery,
    status: Option<LendingStatus>,
) {
    builder.push(" WHERE 1=1");
    if let Some(status) = status {
        builder.push(" AND lr.status = ").push_bind(status);
    }
    if let Some(owner_id) = query.owner_id {
        builder.push(" AND lr.record_owner_id = ").push_bind(owner_id);
    }
    if let Some(borrower_id) = query.borrower_id {
        builder.push(" AND lr.borrower_id = ").push_bind(borrower_id);
    }
    if let Some(game_id) = query.game_id {
        builder.push(" AND br.game_id = ").push_bind(game_id);
    }
    if let Some(from_date) = query.from_date {
        builder.push(" AND lr.end_date >= ").push_bind(from_date);
    }
    if let Some(to_date) = query.to_date {
        builder.push(" AND lr.start_date <= ").push_bind(to_date);
    }
    if query.overdue_only == Some(true) {
        builder.push(" AND lr.status = 'ACTIVE' AND lr.end_date < NOW()");
    }
}

impl LendingRecordsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get lending record by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<LendingRecord> {
        let sql = format!("{} WHERE lr.id = $1", SELECT_RECORD);
        sqlx::query_as::<_, LendingRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(|record| record.with_derived(Utc::now()))
            .ok_or_else(|| AppError::NotFound(format!("Lending record with id {} not found", id)))
    }

    /// Id of the record attached to a borrow request, if any
    pub async fn find_id_by_request(&self, request_id: i32) -> AppResult<Option<i32>> {
        let id = sqlx::query_scalar::<_, i32>("SELECT id FROM lending_records WHERE request_id = $1")
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    /// Create the record of an already approved request
    pub async fn create_for_request(
        &self,
        request: &BorrowRequest,
        owner_id: i32,
        actor_id: i32,
    ) -> AppResult<LendingRecord> {
        let mut conn = self.pool.acquire().await?;
        let id = insert_for_request(&mut conn, request, owner_id, actor_id).await?;
        drop(conn);
        self.get_by_id(id).await
    }

    /// List records with filters, sorting and pagination
    pub async fn list(
        &self,
        query: &LendingRecordQuery,
        status: Option<LendingStatus>,
        order_by: &str,
    ) -> AppResult<(Vec<LendingRecord>, i64)> {
        let (_, size, offset) = page_bounds(query.page, query.size);

        let mut count = QueryBuilder::new(format!("SELECT COUNT(*) {}", FROM_RECORDS));
        push_record_filters(&mut count, query, status);
        let (total,): (i64,) = count.build_query_as().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new(SELECT_RECORD);
        push_record_filters(&mut select, query, status);
        // order_by comes from a whitelist of columns, never from raw input
        select
            .push(" ORDER BY ")
            .push(order_by)
            .push(" LIMIT ")
            .push_bind(size)
            .push(" OFFSET ")
            .push_bind(offset);
        let now = Utc::now();
        let records = select
            .build_query_as::<LendingRecord>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|record| record.with_derived(now))
            .collect();

        Ok((records, total))
    }

    /// Lending statistics, optionally restricted to one owner
    pub async fn stats(&self, owner_id: Option<i32>) -> AppResult<LendingStats> {
        let stats = sqlx::query_as::<_, LendingStats>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'ACTIVE') AS active,
                   COUNT(*) FILTER (WHERE status = 'OVERDUE') AS overdue,
                   COUNT(*) FILTER (WHERE status = 'PENDING_RETURN') AS pending_return,
                   COUNT(*) FILTER (WHERE status = 'CLOSED') AS closed,
                   COUNT(*) FILTER (WHERE status = 'ACTIVE' AND end_date < NOW()) AS overdue_now,
                   COUNT(*) FILTER (WHERE is_damaged) AS damaged,
                   (AVG(EXTRACT(EPOCH FROM (end_date - start_date)) / 86400)
                       FILTER (WHERE status = 'CLOSED'))::float8 AS average_duration_days
            FROM lending_records
            WHERE ($1::int IS NULL OR record_owner_id = $1)
            "#,
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    /// Move a record from `expected` to `next`, recording who and why
    pub async fn transition(
        &self,
        id: i32,
        expected: LendingStatus,
        next: LendingStatus,
        actor_id: i32,
        reason: &str,
    ) -> AppResult<LendingRecord> {
        let closing = next == LendingStatus::Closed;
        let result = sqlx::query(
            r#"
            UPDATE lending_records
            SET status = $3,
                status_change_reason = $5,
                last_modified_date = NOW(),
                last_modified_by = $4,
                closed_by = CASE WHEN $6 THEN $4 ELSE closed_by END,
                closing_reason = CASE WHEN $6 THEN $5 ELSE closing_reason END
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(next)
        .bind(actor_id)
        .bind(reason)
        .bind(closing)
        .execute(&self.pool)
        .await?;

        self.after_write(id, result.rows_affected()).await
    }

    /// Close a record after the owner checked the returned game
    pub async fn confirm_return(
        &self,
        id: i32,
        expected: LendingStatus,
        damage: &DamageAssessment,
        actor_id: i32,
        closing_reason: Option<&str>,
    ) -> AppResult<LendingRecord> {
        let result = sqlx::query(
            r#"
            UPDATE lending_records
            SET status = 'CLOSED',
                is_damaged = $3,
                damage_notes = $4,
                damage_severity = $5,
                damage_assessment_date = CASE WHEN $3 THEN NOW() ELSE NULL END,
                closing_reason = $6,
                closed_by = $7,
                status_change_reason = 'Owner confirmed the return',
                last_modified_date = NOW(),
                last_modified_by = $7
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(damage.is_damaged)
        .bind(&damage.notes)
        .bind(damage.severity)
        .bind(closing_reason)
        .bind(actor_id)
        .execute(&self.pool)
        .await?;

        self.after_write(id, result.rows_affected()).await
    }

    async fn after_write(&self, id: i32, rows: u64) -> AppResult<LendingRecord> {
        if rows == 0 {
            let current = self.get_by_id(id).await?;
            return Err(AppError::InvalidOperation(format!(
                "Lending record {} changed concurrently (now {})",
                id, current.status
            )));
        }
        self.get_by_id(id).await
    }

    /// Delete a closed record
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM lending_records WHERE id = $1 AND status = 'CLOSED'")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            self.get_by_id(id).await?;
            return Err(AppError::InvalidOperation(
                "Only closed lending records can be deleted".to_string(),
            ));
        }
        Ok(())
    }

    /// Open (non CLOSED) records for a game
    pub async fn count_open_for_game(&self, game_id: i32) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) {} WHERE br.game_id = $1 AND lr.status <> 'CLOSED'",
            FROM_RECORDS
        ))
        .bind(game_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Open records an account owns or borrows
    pub async fn count_open_for_account(&self, account_id: i32) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM lending_records
            WHERE (record_owner_id = $1 OR borrower_id = $1) AND status <> 'CLOSED'
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Whether the account has a CLOSED record for the game
    pub async fn has_closed_for_game(&self, borrower_id: i32, game_id: i32) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(&format!(
            "SELECT EXISTS (SELECT 1 {} WHERE lr.borrower_id = $1 AND br.game_id = $2 AND lr.status = 'CLOSED')",
            FROM_RECORDS
        ))
        .bind(borrower_id)
        .bind(game_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

//! Borrow requests repository
//!
//! Overlap checks and approvals run inside a transaction holding a row lock
//! on the requested game, so concurrent approvals for the same game are
//! serialized and can never produce two overlapping APPROVED requests.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow_request::{
            same_target, BorrowRequest, BorrowRequestDetails, BorrowRequestQuery,
            BorrowRequestStatus, CreateBorrowRequest,
        },
        page_bounds,
    },
};

use super::lending_records;

const SELECT_DETAILS: &str = r#"
    SELECT br.id, br.start_date, br.end_date, br.status, br.request_date,
           br.game_id, g.name AS game_name, g.owner_id AS game_owner_id,
           br.instance_id, br.requester_id, a.name AS requester_name,
           br.responder_id, lr.id AS lending_record_id
    FROM borrow_requests br
    JOIN games g ON g.id = br.game_id
    JOIN accounts a ON a.id = br.requester_id
    LEFT JOIN lending_records lr ON lr.request_id = br.id
"#;

#[derive(Clone)]
pub struct BorrowRequestsRepository {
    pool: Pool<Postgres>,
}

/// Lock the game row for the rest of the transaction
async fn lock_game(conn: &mut PgConnection, game_id: i32) -> AppResult<i32> {
    sqlx::query_scalar::<_, i32>("SELECT owner_id FROM games WHERE id = $1 FOR UPDATE")
        .bind(game_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Game with id {} not found", game_id)))
}

/// APPROVED requests of a game whose range overlaps `[start, end)`
async fn approved_overlapping(
    conn: &mut PgConnection,
    game_id: i32,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<Vec<BorrowRequest>> {
    let requests = sqlx::query_as::<_, BorrowRequest>(
        r#"
        SELECT * FROM borrow_requests
        WHERE game_id = $1 AND status = 'APPROVED' AND start_date < $3 AND end_date > $2
        ORDER BY id
        "#,
    )
    .bind(game_id)
    .bind(start)
    .bind(end)
    .fetch_all(&mut *conn)
    .await?;
    Ok(requests)
}

/// Ids of APPROVED requests competing with the given target and range
async fn conflicting_ids(
    conn: &mut PgConnection,
    game_id: i32,
    instance_id: Option<i32>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<Vec<i32>> {
    Ok(approved_overlapping(conn, game_id, start, end)
        .await?
        .into_iter()
        .filter(|other| same_target(game_id, instance_id, other.game_id, other.instance_id))
        .map(|other| other.id)
        .collect())
}

fn push_request_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    query: &BorrowRequestQuery,
    status: Option<BorrowRequestStatus>,
) {
    builder.push(" WHERE 1=1");
    if let Some(status) = status {
        builder.push(" AND br.status = ").push_bind(status);
    }
    if let Some(requester_id) = query.requester_id {
        builder.push(" AND br.requester_id = ").push_bind(requester_id);
    }
    if let Some(owner_id) = query.owner_id {
        builder.push(" AND g.owner_id = ").push_bind(owner_id);
    }
    if let Some(game_id) = query.game_id {
        builder.push(" AND br.game_id = ").push_bind(game_id);
    }
}

impl BorrowRequestsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get borrow request by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>("SELECT * FROM borrow_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow request with id {} not found", id)))
    }

    /// Get borrow request with game and requester details
    pub async fn get_details(&self, id: i32) -> AppResult<BorrowRequestDetails> {
        let sql = format!("{} WHERE br.id = $1", SELECT_DETAILS);
        sqlx::query_as::<_, BorrowRequestDetails>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow request with id {} not found", id)))
    }

    /// List borrow requests with filters and pagination
    pub async fn list(
        &self,
        query: &BorrowRequestQuery,
        status: Option<BorrowRequestStatus>,
    ) -> AppResult<(Vec<BorrowRequestDetails>, i64)> {
        let (_, size, offset) = page_bounds(query.page, query.size);

        let mut count = QueryBuilder::new(
            "SELECT COUNT(*) FROM borrow_requests br JOIN games g ON g.id = br.game_id",
        );
        push_request_filters(&mut count, query, status);
        let (total,): (i64,) = count.build_query_as().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new(SELECT_DETAILS);
        push_request_filters(&mut select, query, status);
        select
            .push(" ORDER BY br.request_date DESC, br.id DESC LIMIT ")
            .push_bind(size)
            .push(" OFFSET ")
            .push_bind(offset);
        let requests = select
            .build_query_as::<BorrowRequestDetails>()
            .fetch_all(&self.pool)
            .await?;

        Ok((requests, total))
    }

    /// Approved requests overlapping a range (availability check)
    pub async fn find_conflicts(
        &self,
        game_id: i32,
        instance_id: Option<i32>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<i32>> {
        let mut conn = self.pool.acquire().await?;
        conflicting_ids(&mut conn, game_id, instance_id, start, end).await
    }

    /// Insert a PENDING request after checking it against approved ones
    pub async fn create(
        &self,
        requester_id: i32,
        request: &CreateBorrowRequest,
    ) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;

        lock_game(&mut tx, request.game_id).await?;

        let conflicts = conflicting_ids(
            &mut tx,
            request.game_id,
            request.instance_id,
            request.start_date,
            request.end_date,
        )
        .await?;
        if !conflicts.is_empty() {
            return Err(AppError::InvalidOperation(format!(
                "Game is already lent out during the requested period (approved request {})",
                conflicts[0]
            )));
        }

        let created = sqlx::query_as::<_, BorrowRequest>(
            r#"
            INSERT INTO borrow_requests (start_date, end_date, status, request_date, game_id, instance_id, requester_id)
            VALUES ($1, $2, 'PENDING', $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(Utc::now())
        .bind(request.game_id)
        .bind(request.instance_id)
        .bind(requester_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Approve a pending request and open its lending record.
    /// Returns the updated request and the new lending record id.
    pub async fn approve(&self, id: i32, responder_id: i32) -> AppResult<(BorrowRequest, i32)> {
        let mut tx = self.pool.begin().await?;

        let game_id = sqlx::query_scalar::<_, i32>("SELECT game_id FROM borrow_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow request with id {} not found", id)))?;
        let owner_id = lock_game(&mut tx, game_id).await?;

        let request = sqlx::query_as::<_, BorrowRequest>(
            "SELECT * FROM borrow_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if request.status != BorrowRequestStatus::Pending {
            return Err(AppError::InvalidOperation(format!(
                "Borrow request is already {}",
                request.status
            )));
        }

        let conflict = approved_overlapping(&mut tx, request.game_id, request.start_date, request.end_date)
            .await?
            .into_iter()
            .find(|other| request.conflicts_with(other));
        if let Some(other) = conflict {
            return Err(AppError::InvalidOperation(format!(
                "Request overlaps approved request {}",
                other.id
            )));
        }

        let approved = sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET status = 'APPROVED', responder_id = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(responder_id)
        .fetch_one(&mut *tx)
        .await?;

        let record_id =
            lending_records::insert_for_request(&mut tx, &approved, owner_id, responder_id).await?;

        tx.commit().await?;
        Ok((approved, record_id))
    }

    /// Move the end date of an open lending together with the request it came
    /// from. Fails if the new range overlaps another approved request.
    pub async fn extend_lending(
        &self,
        request_id: i32,
        record_id: i32,
        end_date: DateTime<Utc>,
        actor_id: i32,
        reason: &str,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let game_id =
            sqlx::query_scalar::<_, i32>("SELECT game_id FROM borrow_requests WHERE id = $1")
                .bind(request_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Borrow request with id {} not found", request_id))
                })?;
        lock_game(&mut tx, game_id).await?;

        let request = sqlx::query_as::<_, BorrowRequest>(
            "SELECT * FROM borrow_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        let extended = request.extended_to(end_date);
        let conflict = approved_overlapping(&mut tx, game_id, extended.start_date, extended.end_date)
            .await?
            .into_iter()
            .find(|other| extended.conflicts_with(other));
        if let Some(other) = conflict {
            return Err(AppError::InvalidOperation(format!(
                "New end date overlaps approved request {}",
                other.id
            )));
        }

        let rows = lending_records::set_end_date(&mut tx, record_id, end_date, actor_id, reason).await?;
        if rows == 0 {
            return Err(AppError::InvalidOperation(format!(
                "Lending record {} is closed or starts after the new end date",
                record_id
            )));
        }

        sqlx::query("UPDATE borrow_requests SET end_date = $2 WHERE id = $1")
            .bind(request_id)
            .bind(end_date)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Decline a pending request
    pub async fn decline(&self, id: i32, responder_id: i32) -> AppResult<BorrowRequest> {
        let declined = sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET status = 'DECLINED', responder_id = $2
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(responder_id)
        .fetch_optional(&self.pool)
        .await?;

        match declined {
            Some(request) => Ok(request),
            None => {
                let current = self.get_by_id(id).await?;
                Err(AppError::InvalidOperation(format!(
                    "Borrow request is already {}",
                    current.status
                )))
            }
        }
    }

    /// Delete a request; a closed lending record attached to it goes with it
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM borrow_requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Borrow request with id {} not found", id)));
        }
        Ok(())
    }
}

//! Lending record lifecycle
//!
//! Every status change goes through [`LendingStatus::apply`], then is written
//! with a compare-and-set on the status it was computed from.

use crate::{
    error::{AppError, AppResult},
    models::{
        account::AccountClaims,
        borrow_request::{check_date_range, BorrowRequestStatus},
        lending_record::{
            ConfirmReturn, DamageAssessment, ExtendEndDate, LendingEvent, LendingRecord,
            LendingRecordQuery, LendingStats, LendingStatus, UpdateLendingStatus,
        },
    },
    repository::Repository,
};

const BORROWER_RETURNED_REASON: &str =
    "Borrower marked the game as returned, awaiting owner confirmation";

#[derive(Clone)]
pub struct LendingService {
    repository: Repository,
}

fn require_owner(record: &LendingRecord, claims: &AccountClaims) -> AppResult<()> {
    if record.record_owner_id != claims.account_id {
        return Err(AppError::Authorization(
            "Only the owner of the game can do this".to_string(),
        ));
    }
    Ok(())
}

fn require_reason(reason: &str) -> AppResult<&str> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::Validation("A reason is required".to_string()));
    }
    Ok(reason)
}

fn next_status(record: &LendingRecord, event: LendingEvent) -> AppResult<LendingStatus> {
    record.status.apply(event).map_err(AppError::InvalidOperation)
}

impl LendingService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &LendingRecordQuery) -> AppResult<(Vec<LendingRecord>, i64)> {
        let status = query
            .status
            .as_deref()
            .map(|s| s.parse::<LendingStatus>())
            .transpose()
            .map_err(AppError::BadRequest)?;
        let order_by = query.order_by().map_err(AppError::BadRequest)?;
        self.repository.lending_records.list(query, status, &order_by).await
    }

    /// ACTIVE records past their end date
    pub async fn list_overdue(&self, mut query: LendingRecordQuery) -> AppResult<(Vec<LendingRecord>, i64)> {
        query.overdue_only = Some(true);
        query.status = None;
        if query.sort.is_none() {
            query.sort = Some("endDate".to_string());
        }
        self.list(&query).await
    }

    /// Statistics over the records the caller lends out
    pub async fn stats(&self, claims: &AccountClaims) -> AppResult<LendingStats> {
        self.repository.lending_records.stats(Some(claims.account_id)).await
    }

    pub async fn get(&self, id: i32) -> AppResult<LendingRecord> {
        self.repository.lending_records.get_by_id(id).await
    }

    /// Open the record of an approved request that has none yet
    pub async fn create_from_request(&self, claims: &AccountClaims, request_id: i32) -> AppResult<LendingRecord> {
        let request = self.repository.borrow_requests.get_details(request_id).await?;
        if request.game_owner_id != claims.account_id {
            return Err(AppError::Authorization(
                "Only the game owner can open a lending record".to_string(),
            ));
        }
        if let Some(existing) = self.repository.lending_records.find_id_by_request(request_id).await? {
            return Err(AppError::Conflict(format!(
                "Lending record {} already exists for borrow request {}",
                existing, request_id
            )));
        }
        if request.status != BorrowRequestStatus::Approved {
            return Err(AppError::InvalidOperation(format!(
                "Borrow request {} is {}, not APPROVED",
                request_id, request.status
            )));
        }

        let borrow_request = self.repository.borrow_requests.get_by_id(request_id).await?;
        let record = self
            .repository
            .lending_records
            .create_for_request(&borrow_request, request.game_owner_id, claims.account_id)
            .await?;
        tracing::info!("Lending record {} opened for borrow request {}", record.id, request_id);
        Ok(record)
    }

    /// Borrower reports the game as given back
    pub async fn mark_returned(&self, claims: &AccountClaims, id: i32) -> AppResult<LendingRecord> {
        let record = self.repository.lending_records.get_by_id(id).await?;
        if record.borrower_id != claims.account_id {
            return Err(AppError::Authorization(
                "Only the borrower can mark the game as returned".to_string(),
            ));
        }

        let next = next_status(&record, LendingEvent::BorrowerReturned)?;
        let updated = self
            .repository
            .lending_records
            .transition(id, record.status, next, claims.account_id, BORROWER_RETURNED_REASON)
            .await?;
        tracing::info!("Lending record {}: {} -> {}", id, record.status, next);
        Ok(updated)
    }

    /// Owner checks the returned game and closes the record
    pub async fn confirm_return(
        &self,
        claims: &AccountClaims,
        id: i32,
        confirmation: ConfirmReturn,
    ) -> AppResult<LendingRecord> {
        let record = self.repository.lending_records.get_by_id(id).await?;
        require_owner(&record, claims)?;
        next_status(&record, LendingEvent::OwnerConfirmedReturn)?;

        let damage = DamageAssessment::new(
            confirmation.is_damaged,
            confirmation.damage_notes,
            confirmation.damage_severity,
        );
        let closing_reason = confirmation
            .closing_reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or("Return confirmed by owner");

        let updated = self
            .repository
            .lending_records
            .confirm_return(id, record.status, &damage, claims.account_id, Some(closing_reason))
            .await?;
        tracing::info!(
            "Lending record {} closed (damaged: {}, severity {})",
            id,
            damage.is_damaged,
            damage.severity
        );
        Ok(updated)
    }

    /// Manual status change by the owner (OVERDUE or CLOSED)
    pub async fn update_status(
        &self,
        claims: &AccountClaims,
        id: i32,
        update: UpdateLendingStatus,
    ) -> AppResult<LendingRecord> {
        let target = update
            .status
            .parse::<LendingStatus>()
            .map_err(AppError::BadRequest)?;
        let reason = require_reason(&update.reason)?;

        let record = self.repository.lending_records.get_by_id(id).await?;
        require_owner(&record, claims)?;

        let next = match next_status(&record, LendingEvent::OwnerSetStatus(target)) {
            Ok(next) => next,
            Err(e) => {
                tracing::warn!("Lending record {}: rejected {} -> {}", id, record.status, target);
                return Err(e);
            }
        };

        let updated = self
            .repository
            .lending_records
            .transition(id, record.status, next, claims.account_id, reason)
            .await?;
        tracing::info!("Lending record {}: {} -> {} ({})", id, record.status, next, reason);
        Ok(updated)
    }

    /// Owner moves the end date of an open record
    pub async fn extend_end_date(
        &self,
        claims: &AccountClaims,
        id: i32,
        extension: ExtendEndDate,
    ) -> AppResult<LendingRecord> {
        let reason = require_reason(&extension.reason)?;

        let record = self.repository.lending_records.get_by_id(id).await?;
        require_owner(&record, claims)?;
        if !record.status.is_open() {
            return Err(AppError::InvalidOperation(
                "Cannot change the end date of a closed lending record".to_string(),
            ));
        }
        check_date_range(record.start_date, extension.end_date).map_err(AppError::BadRequest)?;

        if let Err(e) = self
            .repository
            .borrow_requests
            .extend_lending(record.request_id, id, extension.end_date, claims.account_id, reason)
            .await
        {
            tracing::warn!("Lending record {}: end date change rejected: {}", id, e);
            return Err(e);
        }

        let updated = self.repository.lending_records.get_by_id(id).await?;
        tracing::info!("Lending record {} now ends on {}", id, updated.end_date);
        Ok(updated)
    }

    /// Delete a closed record
    pub async fn delete(&self, claims: &AccountClaims, id: i32) -> AppResult<()> {
        let record = self.repository.lending_records.get_by_id(id).await?;
        require_owner(&record, claims)?;
        if record.status.is_open() {
            return Err(AppError::InvalidOperation(
                "Only closed lending records can be deleted".to_string(),
            ));
        }
        self.repository.lending_records.delete(id).await?;
        tracing::info!("Lending record {} deleted", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_reason() {
        assert_eq!(require_reason("  lost box  ").unwrap(), "lost box");
        assert!(matches!(require_reason("   "), Err(AppError::Validation(_))));
    }
}

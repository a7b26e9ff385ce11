//! Borrow request workflow: creation, approval and decline

use crate::{
    error::{AppError, AppResult},
    models::{
        account::AccountClaims,
        borrow_request::{
            check_date_range, BorrowRequestDetails, BorrowRequestQuery, BorrowRequestStatus,
            CreateBorrowRequest,
        },
        lending_record::LendingStatus,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowRequestsService {
    repository: Repository,
}

/// Parse a status coming from a request body or query string
fn parse_status(value: &str) -> AppResult<BorrowRequestStatus> {
    value.parse::<BorrowRequestStatus>().map_err(AppError::BadRequest)
}

impl BorrowRequestsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &BorrowRequestQuery) -> AppResult<(Vec<BorrowRequestDetails>, i64)> {
        let status = query.status.as_deref().map(parse_status).transpose()?;
        self.repository.borrow_requests.list(query, status).await
    }

    /// Get a request; visible to its requester and to the game owner
    pub async fn get(&self, claims: &AccountClaims, id: i32) -> AppResult<BorrowRequestDetails> {
        let request = self.repository.borrow_requests.get_details(id).await?;
        if request.requester_id != claims.account_id && request.game_owner_id != claims.account_id {
            return Err(AppError::Authorization(
                "Only the requester or the game owner can see this request".to_string(),
            ));
        }
        Ok(request)
    }

    /// Ask to borrow a game (optionally a specific copy) over `[start, end)`
    pub async fn create(
        &self,
        claims: &AccountClaims,
        request: CreateBorrowRequest,
    ) -> AppResult<BorrowRequestDetails> {
        check_date_range(request.start_date, request.end_date).map_err(AppError::BadRequest)?;

        let game = self.repository.games.get_by_id(request.game_id).await?;
        if game.owner_id == claims.account_id {
            return Err(AppError::BadRequest("You cannot borrow your own game".to_string()));
        }

        if let Some(instance_id) = request.instance_id {
            let instance = self.repository.games.get_instance(instance_id).await?;
            if instance.game_id != game.id {
                return Err(AppError::BadRequest(format!(
                    "Game instance {} is not a copy of game {}",
                    instance_id, game.id
                )));
            }
            if !instance.available {
                return Err(AppError::BadRequest(format!(
                    "Game instance {} is not available for lending",
                    instance_id
                )));
            }
        }

        let created = match self
            .repository
            .borrow_requests
            .create(claims.account_id, &request)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                tracing::warn!(
                    "Borrow request by account {} for game {} rejected: {}",
                    claims.account_id,
                    game.id,
                    e
                );
                return Err(e);
            }
        };

        tracing::info!(
            "Borrow request {} created for game {} by account {}",
            created.id,
            game.id,
            claims.account_id
        );
        self.repository.borrow_requests.get_details(created.id).await
    }

    /// Approve or decline a pending request. Only the game owner may answer.
    pub async fn update_status(
        &self,
        claims: &AccountClaims,
        id: i32,
        status: &str,
    ) -> AppResult<BorrowRequestDetails> {
        let next = parse_status(status)?;

        let request = self.repository.borrow_requests.get_details(id).await?;
        if request.game_owner_id != claims.account_id {
            return Err(AppError::Authorization(
                "Only the game owner can answer this request".to_string(),
            ));
        }
        if request.status.is_terminal() {
            return Err(AppError::InvalidOperation(format!(
                "Borrow request is already {}",
                request.status
            )));
        }
        if !request.status.can_transition_to(next) {
            return Err(AppError::InvalidOperation(format!(
                "Cannot change borrow request status from {} to {}",
                request.status, next
            )));
        }

        if next == BorrowRequestStatus::Approved {
            let (_, record_id) = self
                .repository
                .borrow_requests
                .approve(id, claims.account_id)
                .await?;
            tracing::info!("Borrow request {} approved, lending record {} opened", id, record_id);
        } else {
            self.repository.borrow_requests.decline(id, claims.account_id).await?;
            tracing::info!("Borrow request {} declined", id);
        }

        self.repository.borrow_requests.get_details(id).await
    }

    /// Withdraw or discard a request; refused while its lending is in progress
    pub async fn delete(&self, claims: &AccountClaims, id: i32) -> AppResult<()> {
        let request = self.repository.borrow_requests.get_details(id).await?;
        if request.requester_id != claims.account_id && request.game_owner_id != claims.account_id {
            return Err(AppError::Authorization(
                "Only the requester or the game owner can delete this request".to_string(),
            ));
        }

        if let Some(record_id) = request.lending_record_id {
            let record = self.repository.lending_records.get_by_id(record_id).await?;
            if record.status != LendingStatus::Closed {
                return Err(AppError::InvalidOperation(format!(
                    "Lending record {} of this request is still {}",
                    record_id, record.status
                )));
            }
        }

        self.repository.borrow_requests.delete(id).await?;
        tracing::info!("Borrow request {} deleted by account {}", id, claims.account_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("approved").unwrap(), BorrowRequestStatus::Approved);
        assert!(matches!(parse_status("maybe"), Err(AppError::BadRequest(_))));
    }
}

//! Repository layer for database operations

pub mod accounts;
pub mod borrow_requests;
pub mod events;
pub mod games;
pub mod lending_records;
pub mod registrations;
pub mod reviews;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub accounts: accounts::AccountsRepository,
    pub games: games::GamesRepository,
    pub borrow_requests: borrow_requests::BorrowRequestsRepository,
    pub lending_records: lending_records::LendingRecordsRepository,
    pub events: events::EventsRepository,
    pub registrations: registrations::RegistrationsRepository,
    pub reviews: reviews::ReviewsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            accounts: accounts::AccountsRepository::new(pool.clone()),
            games: games::GamesRepository::new(pool.clone()),
            borrow_requests: borrow_requests::BorrowRequestsRepository::new(pool.clone()),
            lending_records: lending_records::LendingRecordsRepository::new(pool.clone()),
            events: events::EventsRepository::new(pool.clone()),
            registrations: registrations::RegistrationsRepository::new(pool.clone()),
            reviews: reviews::ReviewsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Check database connectivity
    pub async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

//! Business logic services

pub mod accounts;
pub mod auth;
pub mod borrow_requests;
pub mod catalog;
pub mod email;
pub mod events;
pub mod lending;
pub mod redis;
pub mod reviews;

use std::sync::Arc;

use crate::{
    config::{AuthConfig, EmailConfig},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub accounts: accounts::AccountsService,
    pub catalog: catalog::CatalogService,
    pub borrow_requests: borrow_requests::BorrowRequestsService,
    pub lending: lending::LendingService,
    pub events: events::EventsService,
    pub reviews: reviews::ReviewsService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        auth_config: AuthConfig,
        email_config: EmailConfig,
        redis_service: redis::RedisService,
    ) -> Self {
        let mailer: Arc<dyn email::Mailer> = Arc::new(email::EmailService::new(email_config));

        Self {
            auth: auth::AuthService::new(repository.clone(), auth_config, redis_service, mailer),
            accounts: accounts::AccountsService::new(repository.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            borrow_requests: borrow_requests::BorrowRequestsService::new(repository.clone()),
            lending: lending::LendingService::new(repository.clone()),
            events: events::EventsService::new(repository.clone()),
            reviews: reviews::ReviewsService::new(repository.clone()),
            repository,
        }
    }

    /// Database connectivity, for the readiness check
    pub async fn database_ready(&self) -> bool {
        self.repository.ping().await
    }
}

//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{
    accounts, auth, borrow_requests, events, games, health, lending_records, registrations,
    reviews,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "GameLend API",
        version = "1.0.0",
        description = "Board game lending and community events REST API"
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::logout,
        auth::me,
        auth::request_password_reset,
        auth::perform_password_reset,
        // Accounts
        accounts::create_account,
        accounts::update_account,
        accounts::get_account,
        accounts::promote_account,
        accounts::delete_account,
        // Games
        games::list_games,
        games::get_game,
        games::create_game,
        games::update_game,
        games::delete_game,
        games::list_instances,
        games::create_instance,
        games::get_instance,
        games::update_instance,
        games::delete_instance,
        games::list_game_reviews,
        games::create_game_review,
        games::get_rating,
        games::get_availability,
        // Borrow requests
        borrow_requests::list_requests,
        borrow_requests::create_request,
        borrow_requests::get_request,
        borrow_requests::update_request_status,
        borrow_requests::delete_request,
        // Lending records
        lending_records::list_records,
        lending_records::list_overdue,
        lending_records::get_stats,
        lending_records::create_record,
        lending_records::get_record,
        lending_records::update_status,
        lending_records::mark_returned,
        lending_records::confirm_return,
        lending_records::extend_end_date,
        lending_records::delete_record,
        // Events
        events::list_events,
        events::get_event,
        events::create_event,
        events::update_event,
        events::delete_event,
        events::list_event_registrations,
        // Registrations
        registrations::list_registrations,
        registrations::create_registration,
        registrations::get_registration,
        registrations::update_registration,
        registrations::delete_registration,
        // Reviews
        reviews::list_reviews,
        reviews::create_review,
        reviews::get_review,
        reviews::update_review,
        reviews::delete_review,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::RequestPasswordReset,
            auth::PerformPasswordReset,
            auth::MessageResponse,
            // Accounts
            crate::models::account::Account,
            crate::models::account::AccountShort,
            crate::models::account::CreateAccount,
            crate::models::account::UpdateAccount,
            // Games
            crate::models::game::Game,
            crate::models::game::GameInstance,
            crate::models::game::CreateGame,
            crate::models::game::UpdateGame,
            crate::models::game::CreateGameInstance,
            crate::models::game::UpdateGameInstance,
            crate::models::game::Availability,
            crate::models::game::GameRating,
            // Borrow requests
            crate::models::borrow_request::BorrowRequestStatus,
            crate::models::borrow_request::BorrowRequestDetails,
            crate::models::borrow_request::CreateBorrowRequest,
            crate::models::borrow_request::UpdateBorrowRequestStatus,
            // Lending records
            crate::models::lending_record::LendingStatus,
            crate::models::lending_record::LendingRecord,
            crate::models::lending_record::LendingStats,
            crate::models::lending_record::CreateLendingRecord,
            crate::models::lending_record::UpdateLendingStatus,
            crate::models::lending_record::ConfirmReturn,
            crate::models::lending_record::ExtendEndDate,
            // Events
            crate::models::event::Event,
            crate::models::event::CreateEvent,
            crate::models::event::UpdateEvent,
            crate::models::registration::Registration,
            crate::models::registration::CreateRegistration,
            crate::models::registration::UpdateRegistration,
            // Reviews
            crate::models::review::Review,
            crate::models::review::CreateReview,
            crate::models::review::CreateGameReview,
            crate::models::review::UpdateReview,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "accounts", description = "Account management"),
        (name = "games", description = "Game catalog, copies, ratings and availability"),
        (name = "borrow-requests", description = "Borrow requests between members"),
        (name = "lending-records", description = "Lending lifecycle"),
        (name = "events", description = "Game nights and other events"),
        (name = "registrations", description = "Event registrations"),
        (name = "reviews", description = "Game reviews")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_declares_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn document_lists_lending_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/lending-records/{id}/confirm-return"));
        assert!(doc.paths.paths.contains_key("/api/borrowrequests/{id}"));
    }
}

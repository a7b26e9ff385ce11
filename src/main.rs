//! GameLend Server
//!
//! Board game lending and events REST API server.

use anyhow::Context;
use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gamelend_server::{
    api,
    config::{AppConfig, LoggingConfig},
    repository::Repository,
    services::{redis::RedisService, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.logging);

    tracing::info!("Starting GameLend Server v{}", env!("CARGO_PKG_VERSION"));

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    let redis_service = RedisService::new(&config.redis.url)
        .await
        .context("Failed to connect to Redis")?;

    tracing::info!("Connected to Redis");

    let addr = SocketAddr::new(
        config
            .server
            .host
            .parse()
            .context("Invalid server host address")?,
        config.server.port,
    );

    let repository = Repository::new(pool);
    let services = Services::new(
        repository,
        config.auth.clone(),
        config.email.clone(),
        redis_service,
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("gamelend_server={},tower_http=debug", logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/login", post(api::auth::login))
        .route("/auth/logout", post(api::auth::logout))
        .route("/auth/me", get(api::auth::me))
        .route(
            "/auth/request-password-reset",
            post(api::auth::request_password_reset),
        )
        .route(
            "/auth/perform-password-reset",
            post(api::auth::perform_password_reset),
        )
        // Accounts
        .route(
            "/api/account",
            post(api::accounts::create_account).put(api::accounts::update_account),
        )
        .route(
            "/api/account/:email",
            get(api::accounts::get_account)
                .put(api::accounts::promote_account)
                .delete(api::accounts::delete_account),
        )
        // Games
        .route(
            "/api/games",
            get(api::games::list_games).post(api::games::create_game),
        )
        .route(
            "/api/games/:id",
            get(api::games::get_game)
                .put(api::games::update_game)
                .delete(api::games::delete_game),
        )
        .route(
            "/api/games/:id/instances",
            get(api::games::list_instances).post(api::games::create_instance),
        )
        .route(
            "/api/games/:id/instances/:instance_id",
            get(api::games::get_instance)
                .put(api::games::update_instance)
                .delete(api::games::delete_instance),
        )
        .route(
            "/api/games/:id/reviews",
            get(api::games::list_game_reviews).post(api::games::create_game_review),
        )
        .route("/api/games/:id/rating", get(api::games::get_rating))
        .route("/api/games/:id/availability", get(api::games::get_availability))
        // Borrow requests
        .route(
            "/api/borrowrequests",
            get(api::borrow_requests::list_requests).post(api::borrow_requests::create_request),
        )
        .route(
            "/api/borrowrequests/:id",
            get(api::borrow_requests::get_request)
                .put(api::borrow_requests::update_request_status)
                .delete(api::borrow_requests::delete_request),
        )
        // Lending records
        .route(
            "/api/lending-records",
            get(api::lending_records::list_records).post(api::lending_records::create_record),
        )
        .route(
            "/api/lending-records/overdue",
            get(api::lending_records::list_overdue),
        )
        .route("/api/lending-records/stats", get(api::lending_records::get_stats))
        .route(
            "/api/lending-records/:id",
            get(api::lending_records::get_record).delete(api::lending_records::delete_record),
        )
        .route(
            "/api/lending-records/:id/status",
            put(api::lending_records::update_status),
        )
        .route(
            "/api/lending-records/:id/mark-returned",
            post(api::lending_records::mark_returned),
        )
        .route(
            "/api/lending-records/:id/confirm-return",
            post(api::lending_records::confirm_return),
        )
        .route(
            "/api/lending-records/:id/end-date",
            put(api::lending_records::extend_end_date),
        )
        // Events
        .route(
            "/api/events",
            get(api::events::list_events).post(api::events::create_event),
        )
        .route(
            "/api/events/:id",
            get(api::events::get_event)
                .put(api::events::update_event)
                .delete(api::events::delete_event),
        )
        .route(
            "/api/events/:id/registrations",
            get(api::events::list_event_registrations),
        )
        // Registrations
        .route(
            "/api/registrations",
            get(api::registrations::list_registrations)
                .post(api::registrations::create_registration),
        )
        .route(
            "/api/registrations/:id",
            get(api::registrations::get_registration)
                .put(api::registrations::update_registration)
                .delete(api::registrations::delete_registration),
        )
        // Reviews
        .route(
            "/api/reviews",
            get(api::reviews::list_reviews).post(api::reviews::create_review),
        )
        .route(
            "/api/reviews/:id",
            get(api::reviews::get_review)
                .put(api::reviews::update_review)
                .delete(api::reviews::delete_review),
        )
        .with_state(state);

    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .merge(routes)
        .merge(openapi)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
}

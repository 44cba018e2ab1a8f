// Court Availability API v0.1
use axum::http::Uri;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod courts;
mod errors;
mod helpers;
mod models;
mod routes;
mod services;

use config::AppConfig;
use courts::CourtRegistry;
use errors::AppError;
use routes::availability::AppState;
use services::browser::WebDriverLauncher;

/// OpenAPI document for the Court Availability API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Court Availability API",
        version = "0.1.0",
        description = "Weekly court availability for the membership reservation portal. \
            Each request drives a headless Chrome through the portal's date picker for \
            every court of a sport, parses the bookable time slots and aggregates them \
            into a time × date matrix of open spots.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Availability", description = "Scraped court availability"),
        (name = "Sports", description = "Configured sports and courts"),
    ),
    paths(
        routes::health::health_check,
        routes::availability::get_availability,
        routes::sports::list_sports,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::sports::SportResponse,
            routes::sports::CourtLink,
            services::availability::AvailabilityResponse,
            services::availability::AvailabilityStats,
            models::CourtAvailability,
            models::TimeSlot,
            models::WeeklyView,
            models::SlotSummary,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "court_availability_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    let registry = CourtRegistry::builtin();
    for (sport, sport_config) in registry.sports() {
        tracing::info!(
            "Registered sport '{}' with {} courts",
            sport,
            sport_config.courts.len()
        );
    }

    tracing::info!(
        "Scraping {} via WebDriver at {} (concurrency {})",
        config.scrape.base_url,
        config.webdriver_url,
        config.scrape.concurrency
    );

    let app_state = AppState {
        launcher: Arc::new(WebDriverLauncher::from_config(&config)),
        registry: Arc::new(registry),
        settings: Arc::new(config.scrape.clone()),
    };

    // CORS: read-only API, restrict methods to GET
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    // Build router
    let api_routes = Router::new()
        .route(
            "/availability",
            get(routes::availability::get_availability),
        )
        .route("/sports", get(routes::sports::list_sports))
        .with_state(app_state);

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .merge(api_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

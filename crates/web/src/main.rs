use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::HeaderValue;
use storage::{
    Database,
    repository::{
        ContestStore, MemoryContestStore, MemoryPostDirectory, PgContestStore, PgPostDirectory,
        PostDirectory,
    },
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod events;
mod extractors;
mod features;
mod middleware;
mod routes;
mod state;
mod tasks;

use config::Config;
use events::EventBus;
use features::contests::services::ContestService;
use middleware::auth::{AdminTokenVerifier, UserTokenVerifier};
use state::AppState;

const EVENT_BUS_CAPACITY: usize = 256;

#[derive(OpenApi)]
#[openapi(
    paths(
        features::contests::handlers::list_contests,
        features::contests::handlers::list_all_contests,
        features::contests::handlers::get_contest,
        features::contests::handlers::submit_entry,
        features::contests::handlers::vote,
        features::contests::handlers::user_entries,
        features::contests::handlers::remove_entry,
        features::contests::handlers::leaderboard,
        features::contests::handlers::update_statuses,
        features::contests::handlers::stream_events,
        features::admin::handlers::create_contest,
        features::admin::handlers::update_contest,
        features::admin::handlers::delete_contest,
        features::admin::handlers::calculate_winners,
    ),
    components(
        schemas(
            storage::dto::contest::CreateContestRequest,
            storage::dto::contest::UpdateContestRequest,
            storage::dto::contest::SubmitEntryRequest,
            storage::dto::contest::VoteRequest,
            storage::dto::contest::VoteResponse,
            storage::dto::contest::PostRef,
            storage::dto::contest::EntryView,
            storage::dto::contest::WinnerView,
            storage::dto::contest::ContestDetailResponse,
            storage::dto::contest::UserEntrySummary,
            storage::dto::contest::LeaderboardEntry,
            storage::dto::contest::StatusChange,
            storage::dto::contest::RefreshSummary,
            storage::dto::common::SuccessResponse,
            storage::dto::common::ErrorResponse,
            storage::models::Contest,
            storage::models::ContestStatus,
            storage::models::Entry,
            storage::models::Vote,
            storage::models::Winner,
            storage::models::PostSummary,
        )
    ),
    tags(
        (name = "contests", description = "Public and user contest endpoints"),
        (name = "admin", description = "Contest administration"),
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Identity provider access token"))
                        .build(),
                ),
            );
            components.add_security_scheme(
                "admin_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Admin token with role \"admin\""))
                        .build(),
                ),
            );
        }
    }
}

async fn open_stores(
    config: &Config,
) -> anyhow::Result<(Arc<dyn ContestStore>, Arc<dyn PostDirectory>)> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set, contests are kept in memory and lost on restart");
        return Ok((
            Arc::new(MemoryContestStore::new()),
            Arc::new(MemoryPostDirectory::new()),
        ));
    };

    tracing::info!(
        "Connecting to database at: {}",
        database_url.split('@').next_back().unwrap_or("unknown")
    );
    let db = Database::new(database_url)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations");
    db.run_migrations()
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database migrations completed successfully");

    Ok((
        Arc::new(PgContestStore::new(db.pool().clone())),
        Arc::new(PgPostDirectory::new(db.pool().clone())),
    ))
}

fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origin = match config.cors_allow_origin.as_deref() {
        Some(origin) => AllowOrigin::exact(
            HeaderValue::from_str(origin).context("CORS_ALLOW_ORIGIN is not a valid origin")?,
        ),
        None => AllowOrigin::from(Any),
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting PixelPost contest API");

    let config = Config::from_env().context("Failed to load API configuration")?;
    tracing::info!("Configuration loaded successfully");

    let (store, posts) = open_stores(&config).await?;

    let user_auth = UserTokenVerifier::from_rsa_pem(
        config.auth_public_key_pem.as_bytes(),
        config.auth_issuer.as_deref(),
        config.auth_audience.as_deref(),
    )
    .context("Failed to load AUTH_PUBLIC_KEY_PEM")?;
    let admin_auth = AdminTokenVerifier::new(config.admin_jwt_secret.as_bytes());

    let events = EventBus::new(EVENT_BUS_CAPACITY);
    let contests = ContestService::new(store, posts, events.clone());

    let refresher = match config.status_refresh_interval {
        Some(period) => {
            tracing::info!(period_secs = period.as_secs(), "Starting status refresher");
            Some(tasks::spawn_status_refresher(contests.clone(), period))
        }
        None => {
            tracing::info!("Status refresher disabled");
            None
        }
    };

    let state = AppState {
        contests,
        events,
        user_auth: Arc::new(user_auth),
        admin_auth: Arc::new(admin_auth),
    };

    let app = routes::app(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer(&config)?)
        .layer(TraceLayer::new_for_http());

    let bind_address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    tracing::info!("Starting server at http://{}", bind_address);
    tracing::info!(
        "Swagger UI available at http://{}/swagger-ui/",
        bind_address
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(refresher) = refresher {
        refresher.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}

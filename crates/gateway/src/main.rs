//! Yamdb API Gateway
//!
//! The HTTP entry point for the review aggregation API.
//! Handles:
//! - Authentication and authorization
//! - Rate limiting
//! - Request routing
//! - Observability (logging, metrics, tracing)

mod extract;
mod handlers;
mod middleware;


use anyhow::Context;
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use yamdb_common::{
    auth::{AuthBackend, JwtManager},
    config::{AppConfig, ObservabilityConfig},
    db::{DbPool, Repository},
    errors::Result,
    mail::{create_mailer, Mailer},
    metrics,
    pagination::{PageParams, PageRequest},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub jwt: Arc<JwtManager>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn repo(&self) -> Repository {
        Repository::new(self.db.clone())
    }

    /// Validate the requested page against the configured page size
    pub fn page(&self, params: PageParams) -> Result<PageRequest> {
        PageRequest::new(params, self.config.pagination.page_size)
    }
}

impl AuthBackend for AppState {
    fn jwt(&self) -> &JwtManager {
        &self.jwt
    }

    fn repository(&self) -> Repository {
        self.repo()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load().context("Failed to load configuration")?);

    init_tracing(&config.observability);
    info!("Starting Yamdb API Gateway v{}", yamdb_common::VERSION);

    // Initialize metrics
    init_metrics(&config.observability)?;
    metrics::register_metrics();

    // Initialize database connection
    let db = DbPool::bootstrap(&config.database).await?;

    let state = AppState {
        config: config.clone(),
        db,
        jwt: Arc::new(JwtManager::from_config(&config.auth)),
        mailer: create_mailer(&config.mail),
    };
    info!(mailer = state.mailer.name(), "Mail delivery configured");

    // Build the router
    let app = create_router(state)?;

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn init_metrics(config: &ObservabilityConfig) -> anyhow::Result<()> {
    if config.metrics_port == 0 {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            metrics::LATENCY_BUCKETS,
        )?
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!(%addr, "Metrics exporter listening");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Result<Router> {
    use handlers::{auth, categories, comments, genres, health, reviews, titles, users};

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Registration
        .route("/auth/signup/", post(auth::signup))
        .route("/auth/token/", post(auth::token))

        // Users
        .route("/users/", get(users::list_users).post(users::create_user))
        .route("/users/me/", get(users::me).patch(users::update_me))
        .route(
            "/users/{username}/",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )

        // Catalog
        .route("/categories/", get(categories::list_categories).post(categories::create_category))
        .route("/categories/{slug}/", delete(categories::delete_category))
        .route("/genres/", get(genres::list_genres).post(genres::create_genre))
        .route("/genres/{slug}/", delete(genres::delete_genre))
        .route("/titles/", get(titles::list_titles).post(titles::create_title))
        .route(
            "/titles/{title_id}/",
            get(titles::get_title)
                .patch(titles::update_title)
                .delete(titles::delete_title),
        )

        // Reviews and comments
        .route(
            "/titles/{title_id}/reviews/",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/",
            get(reviews::get_review)
                .patch(reviews::update_review)
                .delete(reviews::delete_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}/",
            get(comments::get_comment)
                .patch(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route_layer(from_fn(middleware::metrics::track_metrics));

    let mut app = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .nest("/v1", api_routes);

    let rate_limit = &state.config.rate_limit;
    if rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            rate_limit.requests_per_second,
            rate_limit.burst,
        )?;
        app = app.layer(from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit_middleware,
        ));
    }

    // Compose the app; the request id is set before anything else sees the request
    Ok(app
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

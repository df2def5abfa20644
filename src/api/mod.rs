use crate::auth::{AuthConfig, Authenticator, PostgresStore, SystemClock};
use anyhow::{Context, Result, bail};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
};
use sqlx::postgres::PgPoolOptions;
use std::{fmt, str::FromStr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;

pub mod handlers;
mod openapi;

pub use openapi::openapi;

/// Deployment mode; development responses include diagnostic detail.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
        }
    }

    #[must_use]
    pub const fn exposes_error_detail(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "development" => Ok(Self::Development),
            other => bail!("unknown environment: {other}"),
        }
    }
}

/// Shared state for every handler.
#[derive(Debug)]
pub struct AppState {
    authenticator: Authenticator,
    environment: Environment,
}

impl AppState {
    #[must_use]
    pub fn new(authenticator: Authenticator, environment: Environment) -> Self {
        Self {
            authenticator,
            environment,
        }
    }

    #[must_use]
    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }
}

/// Build the application router with request-id and tracing layers.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/v1/auth/register", post(handlers::register::register))
        .route("/v1/auth/login", post(handlers::login::login))
        .route("/v1/auth/refresh-token", post(handlers::refresh::refresh))
        .route("/v1/auth/logout", post(handlers::logout::logout))
        .route("/v1/auth/me", get(handlers::me::me))
        .route("/v1/auth/users", get(handlers::users::users))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

/// Start the server
/// # Errors
/// Return error if the database is unreachable, the schema cannot be applied,
/// or the listener fails.
pub async fn new(
    port: u16,
    dsn: String,
    auth_config: AuthConfig,
    environment: Environment,
) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .acquire_timeout(auth_config.store_timeout())
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let store = PostgresStore::new(pool);
    store.apply_schema().await?;

    let authenticator = Authenticator::new(&auth_config, Arc::new(store), Arc::new(SystemClock))
        .context("Invalid authentication settings")?;
    let state = Arc::new(AppState::new(authenticator, environment));

    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{} ({})", port, environment);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

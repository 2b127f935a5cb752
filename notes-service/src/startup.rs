//! Application startup and lifecycle management.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use service_core::error::AppError;
use service_core::middleware::{
    make_request_span, request_id_middleware, security_headers_middleware,
};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::NotesConfig;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::auth::build_auth_provider;
use crate::services::providers::openai::{OpenAiProvider, OpenAiProviderConfig};
use crate::services::providers::ChatProvider;
use crate::services::{AuthProvider, GenerationGateway, NotesDb};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: NotesConfig,
    pub db: NotesDb,
    pub gateway: GenerationGateway,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    /// Connect to the database, run migrations and wire the providers.
    pub async fn from_config(config: NotesConfig) -> Result<Self, AppError> {
        let db = NotesDb::connect(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;

        db.run_migrations().await?;

        let provider: Arc<dyn ChatProvider> = Arc::new(OpenAiProvider::new(OpenAiProviderConfig {
            base_url: config.openai.base_url.clone(),
            model: config.openai.model.clone(),
        }));
        let gateway = GenerationGateway::new(provider, config.openai.api_key.clone());

        if config.openai.api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set - AI note generation will fail");
        }
        tracing::info!(model = %gateway.model(), "Initialized OpenAI chat provider");

        let auth = build_auth_provider(&config.auth)?;

        Ok(Self {
            config,
            db,
            gateway,
            auth,
        })
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// All routes with the middleware stack applied.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics_endpoint))
        .route("/api/ai/generate", post(handlers::ai::generate_note))
        .route(
            "/api/notes",
            get(handlers::notes::list_notes).post(handlers::notes::create_note),
        )
        .route(
            "/api/notes/:id",
            get(handlers::notes::get_note)
                .put(handlers::notes::update_note)
                .delete(handlers::notes::delete_note),
        )
        .route(
            "/api/notebooks",
            get(handlers::notebooks::list_notebooks).post(handlers::notebooks::create_notebook),
        )
        .route("/api/webhooks/auth", post(handlers::webhooks::auth_webhook))
        .route_layer(from_fn(http_metrics_middleware))
        .layer(cors)
        .layer(from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: NotesConfig) -> Result<Self, AppError> {
        let port = config.common.port;
        let state = AppState::from_config(config).await?;
        Self::with_state(state, port).await
    }

    /// Bind to `port` (0 picks a free port) and serve `state`.
    pub async fn with_state(state: AppState, port: u16) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, auth = state.auth.name(), "Notes service listening");

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

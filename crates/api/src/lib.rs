//! Interview Proctoring API Server
//!
//! REST API for interview session proctoring: session lifecycle routes,
//! frame ingest into the behavior analyzer, and report delivery.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use behavior::{BehaviorConfig, BehaviorError, FaceMeshDetector, LandmarkProvider};
use notifier::EmailNotifier;
use serde::Serialize;
use session_store::{InMemorySessionStore, SessionRepository};
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod rate_limit;
mod routes;
mod settings;

pub use rate_limit::RateLimitConfig;
pub use settings::Settings;

/// Constructor for per-session landmark providers. Each session gets its own
/// provider instance, so a non-reentrant inference runtime is never shared.
pub type ProviderFactory =
    Arc<dyn Fn() -> Result<Box<dyn LandmarkProvider + Send>, BehaviorError> + Send + Sync>;

/// Application state shared across handlers
pub struct AppState {
    /// Live session repository
    pub repository: Arc<dyn SessionRepository>,
    /// Per-session landmark provider constructor
    pub provider_factory: ProviderFactory,
    /// Outbound email notifier (disabled when unconfigured)
    pub notifier: Option<Arc<EmailNotifier>>,
    /// Recipient for completed-session reports
    pub report_recipient: Option<String>,
    /// Analyzer configuration applied to new sessions
    pub behavior_config: BehaviorConfig,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create application state with the ONNX-backed detector factory
    pub fn new(settings: &Settings) -> Self {
        let factory_config = settings.behavior.clone();
        let factory: ProviderFactory = Arc::new(move || {
            FaceMeshDetector::new(&factory_config)
                .map(|d| Box::new(d) as Box<dyn LandmarkProvider + Send>)
        });
        Self::with_provider_factory(settings, factory)
    }

    /// Create application state with an injected provider factory
    pub fn with_provider_factory(settings: &Settings, provider_factory: ProviderFactory) -> Self {
        Self {
            repository: Arc::new(InMemorySessionStore::new()),
            provider_factory,
            notifier: settings
                .email
                .clone()
                .map(|cfg| Arc::new(EmailNotifier::new(cfg))),
            report_recipient: settings.report_recipient.clone(),
            behavior_config: settings.behavior.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentStatus,
    pub metrics: SystemMetrics,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub detector: ComponentHealth,
    pub session_store: ComponentHealth,
    pub notifier: ComponentHealth,
}

/// Individual component health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: String,
}

/// System metrics
#[derive(Debug, Serialize)]
pub struct SystemMetrics {
    pub active_sessions: usize,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/session/start", post(routes::session::start_session))
        .route("/api/v1/session/frames", post(routes::session::ingest_frame))
        .route("/api/v1/session/status", get(routes::session::session_status))
        .route("/api/v1/session/report", get(routes::session::session_report))
        .route("/api/v1/session/end", post(routes::session::end_session))
        .route("/api/v1/notify/test", post(routes::notify::send_test))
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let response = HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: ComponentStatus {
            detector: ComponentHealth {
                status: if state.behavior_config.model_path.is_some() {
                    "model".to_string()
                } else {
                    "synthetic".to_string()
                },
            },
            session_store: ComponentHealth {
                status: "ok".to_string(),
            },
            notifier: ComponentHealth {
                status: if state.notifier.is_some() {
                    "configured".to_string()
                } else {
                    "disabled".to_string()
                },
            },
        },
        metrics: SystemMetrics {
            active_sessions: state.repository.active_count(),
        },
    };

    (StatusCode::OK, Json(response))
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Run the server
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let addr = settings.bind_addr.clone();
    let state = Arc::new(AppState::new(&settings));

    let mut app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    match rate_limit::create_governor_config(&settings.rate_limit) {
        Some(governor) => {
            app = app.layer(GovernorLayer { config: governor });
        }
        None => warn!("Invalid rate limit settings; limiter disabled"),
    }

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use behavior::ScriptedProvider;
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        let factory: ProviderFactory = Arc::new(|| {
            Ok(Box::new(ScriptedProvider::new(Vec::new())) as Box<dyn LandmarkProvider + Send>)
        });
        Arc::new(AppState::with_provider_factory(&Settings::default(), factory))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["components"]["detector"]["status"], "synthetic");
        assert_eq!(json["metrics"]["active_sessions"], 0);
    }
}

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{error, info};

use paylink_backend::api::links::LinksState;
use paylink_backend::api::webhooks::WebhookState;
use paylink_backend::config::AppConfig;
use paylink_backend::database::contact_repository::ContactRepository;
use paylink_backend::database::gateway_config_repository::GatewayConfigRepository;
use paylink_backend::database::payment_link_repository::PaymentLinkRepository;
use paylink_backend::database::settings_repository::SettingsRepository;
use paylink_backend::database::{init_pool, PoolConfig};
use paylink_backend::gateways::factory::GatewayFactory;
use paylink_backend::gateways::http::GatewayHttpClient;
use paylink_backend::health::{HealthChecker, HealthState, HealthStatus};
use paylink_backend::logging::init_tracing;
use paylink_backend::middleware::logging::{request_logging_middleware, UuidRequestId};
use paylink_backend::services::notification::NotificationService;
use paylink_backend::services::orchestrator::LinkOrchestrator;
use paylink_backend::services::reconciler::WebhookReconciler;

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    config.validate()?;
    init_tracing(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        sandbox = config.gateway.sandbox,
        "🚀 Starting paylink backend service"
    );

    let pool = init_pool(
        &config.database.url,
        Some(PoolConfig::from_config(&config.database)),
    )
    .await
    .map_err(|e| {
        error!("Failed to initialize database pool: {}", e);
        anyhow::anyhow!(e)
    })?;

    let settings = Arc::new(SettingsRepository::new(pool.clone()));
    let contacts = Arc::new(ContactRepository::new(pool.clone()));
    let links = Arc::new(PaymentLinkRepository::new(pool.clone()));
    let gateway_configs = Arc::new(GatewayConfigRepository::new(pool.clone()));

    let http = GatewayHttpClient::new(
        Duration::from_secs(config.gateway.request_timeout),
        config.gateway.max_retries,
    )
    .map_err(|e| anyhow::anyhow!("failed to build gateway HTTP client: {}", e))?;

    let factory = Arc::new(GatewayFactory::new(
        gateway_configs,
        settings.clone(),
        http,
        config.gateway.sandbox,
    ));

    let notifications = Arc::new(NotificationService::with_logging_senders());

    let orchestrator = Arc::new(LinkOrchestrator::new(
        contacts,
        links.clone(),
        settings.clone(),
        factory,
        notifications,
    ));

    let reconciler = Arc::new(WebhookReconciler::new(links.clone(), settings));

    let links_state = Arc::new(LinksState {
        orchestrator,
        links,
    });
    let webhook_state = Arc::new(WebhookState { reconciler });
    let health_checker = HealthChecker::new(pool);

    let links_routes = Router::new()
        .route(
            "/api/links/payment",
            post(paylink_backend::api::links::create_payment_link),
        )
        .route(
            "/api/links/payment/{reference_id}",
            get(paylink_backend::api::links::get_payment_link),
        )
        .route(
            "/api/links/payout",
            post(paylink_backend::api::links::create_payout_link),
        )
        .route(
            "/api/links/types",
            get(paylink_backend::api::links::get_payment_types),
        )
        .with_state(links_state);

    let webhook_routes = Router::new()
        .route(
            "/api/webhooks/payment-links",
            post(paylink_backend::api::webhooks::handle_payment_link_webhook),
        )
        .with_state(webhook_state);

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/health/ready", get(health))
        .route("/health/live", get(liveness))
        .with_state(health_checker)
        .merge(links_routes)
        .merge(webhook_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(axum::middleware::from_fn(request_logging_middleware))
                .layer(PropagateRequestIdLayer::x_request_id()),
        );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to address {}: {}", addr, e);
        e
    })?;

    info!(address = %addr, "✅ Server is ready to accept connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

async fn root() -> &'static str {
    "Paylink Backend API"
}

async fn health(
    State(checker): State<HealthChecker>,
) -> Result<Json<HealthStatus>, (StatusCode, String)> {
    let status = checker.check_health().await;
    if matches!(status.status, HealthState::Unhealthy) {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "Service Unavailable".to_string(),
        ));
    }
    Ok(Json(status))
}

async fn liveness() -> &'static str {
    "OK"
}

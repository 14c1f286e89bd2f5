use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vitashop_api::background::token_cleanup;
use vitashop_api::config::ServerConfig;
use vitashop_api::integrations::llm::{ChatModel, OpenAiChatModel};
use vitashop_api::integrations::payments::StripeProvider;
use vitashop_api::integrations::storage::build_object_store;
use vitashop_api::router::build_app_router;
use vitashop_api::state::AppState;
use vitashop_events::{EmailConfig, EmailNotifier, EventBus, Mailer};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "vitashop_api=debug,vitashop_events=debug,tower_http=debug".into()
    });
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = vitashop_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    vitashop_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    vitashop_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Integrations ---
    let object_store = build_object_store(&config.storage)
        .await
        .expect("Failed to initialise object storage");
    tracing::info!(backend = ?config.storage.backend, "Object storage ready");

    if config.payment.secret_key.is_none() {
        tracing::warn!("STRIPE_SECRET_KEY not set; checkout will return 503");
    }
    if config.payment.webhook_secret.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set; webhooks will be rejected");
    }
    let payments = Arc::new(
        StripeProvider::new(&config.payment).expect("Failed to build payment client"),
    );

    let chat_model: Option<Arc<dyn ChatModel>> = match &config.llm {
        Some(llm) => {
            let model = OpenAiChatModel::new(llm).expect("Failed to build LLM client");
            tracing::info!(model = %llm.model, "Advisory chat uses the language model");
            Some(Arc::new(model))
        }
        None => {
            tracing::info!("LLM_API_KEY not set; advisory chat uses template replies");
            None
        }
    };

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());

    let mailer = EmailConfig::from_env()
        .map(|cfg| Mailer::new(&cfg).expect("Invalid SMTP configuration"));
    if mailer.is_none() {
        tracing::info!("SMTP_HOST not set; emails will be logged instead of sent");
    }
    let notifier = EmailNotifier::new(mailer, config.public_url.clone());
    let notifier_handle = tokio::spawn(notifier.run(event_bus.subscribe()));

    // --- Background jobs ---
    let cancel = CancellationToken::new();
    let cleanup_handle = tokio::spawn(token_cleanup::run(
        pool.clone(),
        Duration::from_secs(config.token_cleanup_interval_secs),
        cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
        payments,
        chat_model,
        object_store,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let grace = Duration::from_secs(config.shutdown_timeout_secs);

    cancel.cancel();
    if tokio::time::timeout(grace, cleanup_handle).await.is_err() {
        tracing::warn!("Token cleanup job did not stop in time");
    }

    // Dropping the last sender closes the channel and ends the notifier
    // once queued emails are handled.
    drop(event_bus);
    if tokio::time::timeout(grace, notifier_handle).await.is_err() {
        tracing::warn!("Email notifier did not drain in time");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

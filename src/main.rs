use axum::{extract::Extension, http::StatusCode, response::Json, routing::get, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

mod completion_client;
mod config;
mod db;
mod handlers;
mod middleware;
mod models;

// Shared across every handler: database pool, settings, and the completion client when a key is set
pub struct AppState {
    pub db_pool: sqlx::PgPool,
    pub config: config::Config,
    pub completion_client: Option<completion_client::CompletionClient>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging()?;

    let config = config::Config::from_env()?;

    let db_pool = db::create_pool(&config).await.map_err(|e| {
        tracing::error!("Failed to create database pool: {}", e);
        e
    })?;

    let completion_client = config.openai_api_key.clone().map(|api_key| {
        tracing::info!("Initializing completion relay ({})...", config.openai_base_url);
        completion_client::CompletionClient::new(api_key, config.openai_base_url.clone())
    });

    let bind_addr = config.bind_addr.clone();
    let shared_state = Arc::new(AppState {
        db_pool,
        config,
        completion_client,
    });

    let app = Router::new()
        .merge(handlers::assets::asset_routes())
        .merge(handlers::auth::auth_routes())
        .merge(handlers::chat::chat_routes())
        .merge(handlers::tasks::task_routes())
        .merge(handlers::admin::admin_routes())
        .route("/api/status", get(api_status))
        .layer(axum::middleware::from_fn(middleware::logging::request_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(Extension(shared_state));

    // ConnectInfo supplies the client address the rate limiters key on
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,ai_todo=trace,sqlx=info,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,ai_todo=info,sqlx=warn,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("AI To-Do server starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Build mode: {}", if cfg!(debug_assertions) { "development" } else { "production" });
    tracing::info!("Log level: {}", log_level);

    Ok(())
}

async fn api_status(Extension(state): Extension<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let database = match sqlx::query("SELECT 1").execute(&state.db_pool).await {
        Ok(_) => "healthy",
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            "unhealthy"
        }
    };

    let status = if database == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if status == StatusCode::OK { "ok" } else { "degraded" },
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now(),
            "services": {
                "database": database,
                "completion_relay": if state.completion_client.is_some() { "configured" } else { "not_configured" }
            }
        })),
    )
}

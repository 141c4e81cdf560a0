//! checkgate - Attendance Check-in Gate Server
//!
//! Main entry point.

use checkgate::{
    attendance_log::AttendanceRepository,
    audit_log::AuditLog,
    checkin::CheckinService,
    directory::{run_feed_listener, DirectoryStore},
    realtime_hub::RealtimeHub,
    scanner::{DecodeClient, RtspCameraSource, ScanLoopController, ScannerPolicy},
    state::{AppConfig, AppState},
    web_api,
};
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "checkgate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting checkgate v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        database_url = %config.database_url,
        decode_url = %config.decode_url,
        camera_rtsp_url = %config.camera_rtsp_url,
        "Configuration loaded"
    );

    // Create database pool
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await?;

    tracing::info!("Database connected");

    // Initialize components
    let directory = Arc::new(DirectoryStore::new());
    let attendance = Arc::new(AttendanceRepository::new(pool.clone()));
    let audit = Arc::new(AuditLog::default());
    let realtime = Arc::new(RealtimeHub::new());
    let decode_client = Arc::new(DecodeClient::new(config.decode_url.clone()));

    let checkin = Arc::new(CheckinService::new(
        directory.clone(),
        attendance.clone(),
        audit.clone(),
        realtime.clone(),
    ));
    tracing::info!("CheckinService initialized");

    let camera = Arc::new(RtspCameraSource::new(
        config.camera_devices(),
        config.grab_timeout_sec,
    ));
    let scanner = Arc::new(ScanLoopController::new(
        camera,
        decode_client.clone(),
        checkin.clone(),
        realtime.clone(),
        ScannerPolicy::default(),
    ));
    tracing::info!("ScanLoopController initialized");

    // Directory feed: sync routes push snapshots into this channel
    let (feed_tx, feed_rx) = mpsc::channel(16);
    tokio::spawn(run_feed_listener(directory.clone(), feed_rx));
    tracing::info!("Directory feed listener started");

    // Create application state
    let state = AppState {
        pool,
        config,
        directory,
        attendance,
        audit,
        checkin,
        scanner,
        decode_client,
        realtime,
        feed_tx,
    };

    // Create router
    let app = web_api::create_router(state.clone())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

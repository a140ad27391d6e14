use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use khatmah_api::quran::QuranClient;
use khatmah_api::state::{AppState, AppStateInner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "khatmah=debug,khatmah_api=debug,khatmah_db=debug,tower_http=debug".into()
            }),
        )
        .init();

    // Config
    let db_path = std::env::var("KHATMAH_DB_PATH").unwrap_or_else(|_| "khatmah.db".into());
    let media_dir = std::env::var("KHATMAH_MEDIA_DIR").unwrap_or_else(|_| "./media".into());
    let quran_api = std::env::var("KHATMAH_QURAN_API")
        .unwrap_or_else(|_| "http://api.alquran.cloud/v1".into());
    let host = std::env::var("KHATMAH_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("KHATMAH_PORT")
        .unwrap_or_else(|_| "8000".into())
        .parse()?;

    let media_dir = PathBuf::from(media_dir);
    tokio::fs::create_dir_all(&media_dir).await?;

    // Init database
    let db = khatmah_db::Database::open(&PathBuf::from(&db_path))?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        media_dir,
        quran: QuranClient::new(quran_api)?,
    });

    let app = khatmah_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Khatmah server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}

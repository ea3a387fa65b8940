//! eksporyuk-server: the affiliate ledger HTTP service.

use tracing::{error, info};

use eksporyuk_server::config::ServerConfig;
use eksporyuk_server::{bootstrap_admin, router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = ServerConfig::load()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("eksporyuk={}", config.logging.level).parse()?)
                .add_directive(format!("tower_http={}", config.logging.level).parse()?),
        )
        .init();

    info!("Eksporyuk server starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open database
    let db_path = data_dir.join("eksporyuk.db");
    let conn = eksporyuk_db::open(&db_path)?;
    info!(path = %db_path.display(), "database open");

    // 3. First-run admin
    bootstrap_admin(&conn, &config.bootstrap)?;

    // 4. Serve
    let addr = config.listen_addr()?;
    let state = AppState::new(conn, config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP API listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("HTTP server error: {}", e);
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Ctrl-C received, shutting down");
    }
}

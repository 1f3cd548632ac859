use std::env;

use anyhow::Context;
use tokio::net::TcpListener;

use ragpipe_backend::config::AppConfig;
use ragpipe_backend::server::router;
use ragpipe_backend::state::AppState;
use ragpipe_backend::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("configuration error")?;
    logging::init(&config.log_dir);

    let state = AppState::initialize(config);

    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(8080);
    let bind_addr = format!("0.0.0.0:{port}");

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind to {bind_addr}"))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    let app = router::router(state);
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::routes::create_api_routes;
use crate::state::AppState;

/// Serve the web API until `shutdown` is cancelled.
pub async fn start_web_server(bind_addr: SocketAddr, state: AppState, shutdown: CancellationToken) -> anyhow::Result<()> {
    info!(bind_address = %bind_addr, api_url = format!("http://{}/api", bind_addr), "Starting web server");

    let app = create_api_routes(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Web server started successfully");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}

/// Cancel `shutdown` on Ctrl-C.
pub async fn cancel_on_ctrl_c(shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
    shutdown.cancel();
}

use crate::app::routes::router;
use crate::domain::ports::PlantDataSource;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Serve the facade on `bind_addr` until SIGINT/SIGTERM.
///
/// In-flight requests complete before the function returns.
pub async fn run_http(source: Arc<dyn PlantDataSource>, bind_addr: &str) -> anyhow::Result<()> {
    let app = router(source);
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!(
        "gpm-bridge listening on {} (Ctrl+C/SIGTERM to stop)",
        listener.local_addr()?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("gpm-bridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown signal received");
}

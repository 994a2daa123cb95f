//! Process lifecycle: serve until a shutdown trigger, drain within a bounded
//! window, then shut the store down.

use std::future::{Future, IntoFuture};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::{app_state::AppState, router};

/// Serve `state` on `listener` until `shutdown` resolves.
///
/// On shutdown the server stops accepting, readiness flips to draining, and
/// in-flight requests get `server.shutdown_grace_ms` to finish. Connections
/// still open after that are dropped. The store is then closed with whatever
/// is left of the same window.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let grace = state.cfg().server.shutdown_grace();
    let app = router::build_router(state.clone());

    let (drain_tx, drain_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = drain_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    let mut drain_started: Option<Instant> = None;
    let served = tokio::select! {
        res = &mut server => res,
        _ = shutdown => {
            tracing::info!("shutdown requested, draining connections");
            state.set_draining();
            drain_started = Some(Instant::now());
            let _ = drain_tx.send(());
            match tokio::time::timeout(grace, &mut server).await {
                Ok(res) => res,
                Err(_) => {
                    tracing::warn!(grace_ms = grace.as_millis() as u64, "could not gracefully drain connections in time");
                    Ok(())
                }
            }
        }
    };

    let remaining = drain_started
        .map(|t| grace.saturating_sub(t.elapsed()))
        .unwrap_or(grace)
        .max(Duration::from_millis(10));
    let report = state.store().shutdown(remaining).await;
    tracing::info!(
        cancelled = report.cancelled,
        abandoned = report.abandoned,
        "server stopped"
    );

    served
}

/// Resolves on Ctrl+C or SIGTERM. A handler that cannot be installed is
/// logged and simply never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}

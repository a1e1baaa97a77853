//! HTTP listeners for the webhook
//!
//! Two independent listeners run concurrently: the TLS-protected webhook
//! endpoint, and an insecure endpoint exposing `/healthz` and `/metrics`.
//! Both shut down on the same lifecycle signal, each within a bounded grace
//! period. The review pipeline itself is agnostic to this mechanism.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::{debug, info};

use crate::admission::Reviewer;
use crate::webhook::webhook_router;
use crate::{Error, Result};

/// Grace period granted to in-flight requests on shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Listener configuration for [`serve`]
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address of the TLS-protected webhook listener
    pub webhook_addr: SocketAddr,

    /// Address of the insecure health/metrics listener
    pub insecure_addr: SocketAddr,

    /// PEM-encoded certificate presented by the webhook listener
    pub cert_file: PathBuf,

    /// PEM-encoded private key for the webhook listener
    pub key_file: PathBuf,
}

/// Create the insecure router exposing `/healthz` and `/metrics`
pub fn insecure_router(metrics: PrometheusHandle) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(render_metrics))
        .with_state(metrics)
}

/// Handle `GET /healthz` - liveness only, always responds 200 empty
async fn healthz() {}

/// Handle `GET /metrics` - render the Prometheus exposition text
async fn render_metrics(State(metrics): State<PrometheusHandle>) -> String {
    metrics.render()
}

/// Serve the webhook and the insecure endpoints until shutdown.
///
/// Returns once both listeners have stopped, or with the first listener
/// error.
pub async fn serve<R>(
    reviewer: Arc<R>,
    metrics: PrometheusHandle,
    config: ServerConfig,
) -> Result<()>
where
    R: Reviewer + 'static,
{
    let tls = RustlsConfig::from_pem_file(&config.cert_file, &config.key_file)
        .await
        .map_err(|e| Error::tls(format!("cannot load certificate or key: {e}")))?;

    let webhook_handle = Handle::new();
    let insecure_handle = Handle::new();
    tokio::spawn(shutdown_on_signal(webhook_handle.clone(), insecure_handle.clone()));

    debug!(listen = %config.webhook_addr, "listening for webhook requests");
    let webhook = axum_server::bind_rustls(config.webhook_addr, tls)
        .handle(webhook_handle)
        .serve(webhook_router(reviewer).into_make_service());

    debug!(listen = %config.insecure_addr, "listening for insecure requests");
    let insecure = axum_server::bind(config.insecure_addr)
        .handle(insecure_handle)
        .serve(insecure_router(metrics).into_make_service());

    tokio::try_join!(
        async { webhook.await.map_err(|e| Error::serve(format!("cannot serve webhook requests: {e}"))) },
        async { insecure.await.map_err(|e| Error::serve(format!("cannot serve insecure requests: {e}"))) },
    )?;
    Ok(())
}

/// Wait for SIGINT/SIGTERM, then drain both listeners within the grace period
async fn shutdown_on_signal(webhook: Handle, insecure: Handle) {
    shutdown_signal().await;
    info!(grace = ?SHUTDOWN_GRACE, "shutting down");
    webhook.graceful_shutdown(Some(SHUTDOWN_GRACE));
    insecure.graceful_shutdown(Some(SHUTDOWN_GRACE));
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

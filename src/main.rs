//! Phalanx - mutating admission webhook for pods

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use phalanx::admission::ignore::IgnoreChain;
use phalanx::admission::{MutatorConfig, PodMutator};
use phalanx::mutation::PodMutation;
use phalanx::server::{serve, ServerConfig};

/// Serves an admission webhook that mutates pods according to the provided
/// config
#[derive(Parser, Debug)]
#[command(name = "phalanx", version, about, long_about = None)]
struct Cli {
    /// Run with debug logging
    #[arg(short = 'd', long, env = "PHALANX_DEBUG")]
    debug: bool,

    /// File containing a PEM encoded certificate presented by the webhook
    /// listener
    #[arg(long, env = "PHALANX_CERT", default_value = "cert.pem")]
    cert: PathBuf,

    /// File containing a PEM encoded key for the webhook listener
    #[arg(long, env = "PHALANX_KEY", default_value = "key.pem")]
    key: PathBuf,

    /// Address at which to expose /webhook via HTTPS
    #[arg(long, env = "PHALANX_LISTEN_WEBHOOK", default_value = "0.0.0.0:10002")]
    listen_webhook: SocketAddr,

    /// Address at which to expose /metrics and /healthz via HTTP
    #[arg(long, env = "PHALANX_LISTEN_INSECURE", default_value = "0.0.0.0:10003")]
    listen_insecure: SocketAddr,

    /// Do not mutate pods running in the host network namespace
    #[arg(long, env = "PHALANX_IGNORE_PODS_WITH_HOST_NETWORK")]
    ignore_pods_with_host_network: bool,

    /// Do not mutate pods with the specified annotation (repeatable)
    #[arg(long, value_name = "KEY=VALUE", value_parser = parse_key_value)]
    ignore_pods_with_annotation: Vec<(String, String)>,

    /// Do not mutate pods without the specified annotation (repeatable)
    #[arg(long, value_name = "KEY=VALUE", value_parser = parse_key_value)]
    ignore_pods_without_annotation: Vec<(String, String)>,

    /// A PodMutation encoded as YAML or JSON
    config_file: PathBuf,
}

/// Parse a `KEY=VALUE` pair from the command line
fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {raw:?}")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The webhook cannot operate securely without a working TLS
    // implementation, so a provider conflict is fatal.
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("CRITICAL: failed to install rustls crypto provider: {e:?}");
        std::process::exit(1);
    }

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.debug { "debug" } else { "info" }));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let data = tokio::fs::read(&cli.config_file)
        .await
        .map_err(|e| anyhow::anyhow!("cannot read configuration file {:?}: {}", cli.config_file, e))?;
    let mutation = PodMutation::decode(&data)
        .map_err(|e| anyhow::anyhow!("cannot decode configuration file: {}", e))?;

    let ignore = IgnoreChain::from_settings(
        cli.ignore_pods_with_host_network,
        &cli.ignore_pods_with_annotation,
        &cli.ignore_pods_without_annotation,
    );
    tracing::info!(
        config = ?cli.config_file,
        ignore_predicates = ignore.len(),
        "loaded pod mutation"
    );

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("cannot install metrics recorder: {}", e))?;

    let reviewer = Arc::new(PodMutator::new(Arc::new(mutation), MutatorConfig { ignore }));

    serve(
        reviewer,
        metrics,
        ServerConfig {
            webhook_addr: cli.listen_webhook,
            insecure_addr: cli.listen_insecure,
            cert_file: cli.cert,
            key_file: cli.key,
        },
    )
    .await
    .map_err(|e| anyhow::anyhow!("cannot serve HTTP requests: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_pairs_parse() {
        assert_eq!(
            parse_key_value("cool=true").unwrap(),
            ("cool".to_string(), "true".to_string())
        );
        assert_eq!(
            parse_key_value("phalanx.dev/mutation=disabled").unwrap(),
            ("phalanx.dev/mutation".to_string(), "disabled".to_string())
        );
    }

    #[test]
    fn key_value_pairs_reject_missing_separator_or_key() {
        assert!(parse_key_value("coolvalue").is_err());
        assert!(parse_key_value("=value").is_err());
    }

    #[test]
    fn cli_parses_repeatable_ignore_flags() {
        let cli = Cli::parse_from([
            "phalanx",
            "--ignore-pods-with-host-network",
            "--ignore-pods-with-annotation",
            "a=1",
            "--ignore-pods-with-annotation",
            "b=2",
            "--ignore-pods-without-annotation",
            "c=3",
            "mutation.yaml",
        ]);
        assert!(cli.ignore_pods_with_host_network);
        assert_eq!(cli.ignore_pods_with_annotation.len(), 2);
        assert_eq!(cli.ignore_pods_without_annotation.len(), 1);
        assert_eq!(cli.config_file, PathBuf::from("mutation.yaml"));
    }
}

//! Process telemetry: tracing subscriber plus optional Prometheus exporter.

use anyhow::Result;
use data_runtime::configs::telemetry::TelemetryCfg;

/// Returned by `init_telemetry`; hold it for the life of the process.
pub struct TelemetryGuard {
    pub metrics_exported: bool,
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_telemetry(cfg: &TelemetryCfg) -> Result<TelemetryGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};
    let filter = EnvFilter::try_new(cfg.filter()).unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = if cfg.json() {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install subscriber: {e}"))?;

    let metrics_exported = match cfg.metrics_socket() {
        Ok(Some(addr)) => match metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(target: "telemetry", %addr, error = %e, "metrics exporter not installed");
                false
            }
        },
        Ok(None) => false,
        Err(e) => {
            metrics::counter!("server.errors_total", "site" => "telemetry.parse_addr").increment(1);
            tracing::warn!(target: "telemetry", addr = ?cfg.metrics_addr, error = %e, "bad metrics address");
            false
        }
    };
    describe_metrics();
    tracing::info!(
        target: "telemetry",
        filter = cfg.filter(),
        json_logs = cfg.json(),
        metrics_addr = ?cfg.metrics_addr,
        metrics_exported,
        "telemetry initialized"
    );
    Ok(TelemetryGuard { metrics_exported })
}

fn describe_metrics() {
    metrics::describe_counter!("self_view.saves_total", "players.json writes that succeeded");
    metrics::describe_counter!("self_view.save_failures_total", "players.json writes that failed and stayed dirty");
    metrics::describe_counter!("self_view.invalidate_total", "equipment resyncs dispatched, by mode");
    metrics::describe_counter!("self_view.packets_rewritten_total", "outbound packets with own armor blanked");
    metrics::describe_counter!("server.errors_total", "swallowed host failures, by call site");
}

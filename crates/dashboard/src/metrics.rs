use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn describe() {
    describe_gauge!(
        "dashboard_build_info",
        "Build info for the trader dashboard (value is always 1)."
    );
    describe_histogram!(
        "dashboard_store_query_latency_ms",
        "ClickHouse query latency in milliseconds, by query name and outcome."
    );
    describe_counter!(
        "dashboard_store_query_errors_total",
        "ClickHouse queries that failed, by query name."
    );
    describe_counter!(
        "tracing_error_events",
        "ERROR-level tracing events emitted by the process."
    );
}

/// Install the global Prometheus recorder once and return a handle for `/metrics`.
///
/// The recorder needs periodic upkeep; [`render`] runs it on every scrape.
pub fn init_global() -> Result<PrometheusHandle> {
    if let Some(handle) = PROM_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    let handle = PROM_HANDLE.get_or_init(|| handle).clone();
    describe();

    let git_sha = std::env::var("GIT_SHA").unwrap_or_else(|_| "unknown".to_string());
    ::metrics::gauge!(
        "dashboard_build_info",
        "version" => env!("CARGO_PKG_VERSION"),
        "git_sha" => git_sha,
    )
    .set(1.0);

    Ok(handle)
}

/// Prometheus text exposition for the current recorder state.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.run_upkeep();
    handle.render()
}

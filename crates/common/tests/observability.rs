use metrics_exporter_prometheus::PrometheusBuilder;

#[test]
fn tracing_error_events_counter_increments_on_error_event() {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    metrics::with_local_recorder(&recorder, || {
        let (dispatch, _otel_guard) =
            common::observability::build_dispatch("test-dashboard", "info");

        tracing::dispatcher::with_default(&dispatch, || {
            tracing::info!("not counted");
            tracing::error!(op = "traders_by_period", "store query failed");
        });
    });

    let rendered = handle.render();
    assert!(
        rendered.contains("tracing_error_events 1"),
        "expected exactly one tracing_error_events, got:\n{rendered}"
    );
}

use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_submission(mode: &'static str, auto_graded: bool) {
    metrics::counter!(
        "quiz_submissions_total",
        "mode" => mode,
        "graded" => if auto_graded { "auto" } else { "pending" }
    )
    .increment(1);
}

pub(crate) fn record_grading(submission_type: &'static str) {
    metrics::counter!("quiz_gradings_total", "submission_type" => submission_type).increment(1);
}

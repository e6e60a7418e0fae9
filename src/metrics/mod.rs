//! Prometheus recorder for the run counters, histograms and gauges emitted by
//! the orchestrator, the cache decorator and the route finder.

use crate::utils::error::Error;
use crate::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the global Prometheus recorder. Calling it again after a success
/// is a no-op.
pub fn init() -> Result<()> {
    if PROM_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::Other(format!("metrics recorder: {e}")))?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

/// The global handle, if [`init`] has run.
pub fn handle() -> Option<&'static PrometheusHandle> {
    PROM_HANDLE.get()
}

/// Prometheus exposition text, empty when the recorder was never installed.
pub fn render() -> String {
    handle().map(PrometheusHandle::render).unwrap_or_default()
}

//! Process-wide tokio runtime backing the blocking API.

use crate::error::{Result, TuyaError};
use std::future::Future;
use std::sync::OnceLock;
use tokio::runtime::{Builder, Handle, Runtime};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

fn get_runtime() -> Result<&'static Runtime> {
    if let Some(rt) = RUNTIME.get() {
        return Ok(rt);
    }
    let rt = Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("tuya31-sync")
        .enable_all()
        .build()
        .map_err(|e| TuyaError::Runtime(format!("failed to start runtime: {}", e)))?;
    // A concurrent caller may have won the race; its runtime is used and ours dropped.
    Ok(RUNTIME.get_or_init(|| rt))
}

/// Runs `fut` to completion on the shared runtime.
///
/// Returns `TuyaError::Runtime` when called from inside an async context,
/// where blocking the thread would panic.
pub fn block_on<F: Future>(fut: F) -> Result<F::Output> {
    if Handle::try_current().is_ok() {
        return Err(TuyaError::Runtime(
            "blocking call made from inside an async runtime; use the async Device".into(),
        ));
    }
    Ok(get_runtime()?.block_on(fut))
}

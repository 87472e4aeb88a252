//! Common startup plumbing: logging, shutdown flag, CPU pinning.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;

pub use skew_core::utils::logger::init_logger;

/// Install SIGINT/SIGTERM handling and return the flag it clears.
///
/// Services loop on this flag and exit 0 once it drops.
pub fn shutdown_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || {
        tracing::warn!("Received shutdown signal");
        handler_flag.store(false, Ordering::Release);
    })?;
    Ok(running)
}

/// Pin the current thread to a CPU core when requested.
pub fn pin_to_core(core: Option<usize>) {
    let Some(core) = core else {
        return;
    };
    if core_affinity::set_for_current(core_affinity::CoreId { id: core }) {
        tracing::info!("Pinned to CPU core {}", core);
    } else {
        tracing::warn!("Failed to pin to CPU core {}", core);
    }
}

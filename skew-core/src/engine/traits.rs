//! Strategy capability contract.

use crate::core::AlphaSignal;
use crate::data::CanonicalTick;

/// A single alpha strategy.
///
/// The engine owns strategies through this trait and guarantees that
/// `on_tick` is never entered concurrently for the same strategy, and that
/// a strategy observes ticks in `process_tick` order. Implementations
/// therefore need no internal synchronization.
pub trait Alpha: Send {
    /// Stable identifier for the strategy's lifetime.
    fn alpha_id(&self) -> &str;

    /// Clear history and mark the strategy ready.
    fn initialize(&mut self);

    /// Clear history and mark the strategy inactive.
    fn shutdown(&mut self);

    /// Whether the engine should feed this strategy. Defaults to true;
    /// concrete strategies may gate on initialization state.
    fn is_active(&self) -> bool {
        true
    }

    /// The only hot-path method: consume a tick, optionally emit a signal.
    fn on_tick(&mut self, tick: &CanonicalTick) -> Option<AlphaSignal>;
}

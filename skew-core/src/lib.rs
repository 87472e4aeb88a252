//! Skew Core - Low-Latency Quantitative Trading Pipeline
//!
//! The concurrent processing fabric of a four-stage trading pipeline:
//!
//! ```text
//! raw bytes ──▶ Normalizer ──▶ CanonicalTick ──▶ AlphaEngine (parallel)
//!                                                      │
//!                                                 AlphaSignal
//!                                                      ▼
//!            approved order ◀── RiskGuardian ◀── SignalAggregator
//! ```
//!
//! ## Stages
//!
//! - [`data`] - multicast ingestion and exchange-specific packet
//!   normalization. Frames decode by fixed little-endian offsets; the first
//!   normalizer to produce a tick wins. Malformed packets drop silently.
//! - [`engine`] - the alpha fan-out. Every tick is offered to every active
//!   strategy on a fixed worker pool. A strategy is never entered
//!   concurrently and sees ticks in submission order; distinct strategies
//!   run in parallel.
//! - [`aggregator`] - per-symbol signal buffers collapsed by a pluggable
//!   policy (confidence-weighted average or median) into target positions.
//! - [`risk`] - the pre-trade battery (fat-finger, drawdown, concentration)
//!   with a 50us latency budget and the authoritative position book.
//!
//! ## Concurrency contract
//!
//! Multiple OS threads, no async runtime. Locks are short-held and never
//! cross an I/O call or a user callback: every component snapshots its
//! listener list under lock and invokes outside it. `stop()` is idempotent
//! everywhere and returns only after background threads have exited.
//!
//! ## What lives elsewhere
//!
//! Process supervision, plugin loading, config files, metrics export, and
//! the inter-service transport are collaborators, not core. The strategy
//! surface this crate exposes is the [`engine::Alpha`] trait and
//! [`engine::AlphaEngine::add_alpha`]; the transport surface is plain
//! callbacks and serializable value types.

pub mod aggregator;
pub mod core;
pub mod data;
pub mod engine;
pub mod monitoring;
pub mod risk;
pub mod utils;

pub use crate::core::{AlphaSignal, AssetType, Exchange, Side, TargetPosition};
pub use crate::data::{CanonicalTick, FeedDispatcher};
pub use crate::engine::{Alpha, AlphaEngine};
pub use crate::risk::{Order, RiskCheckResult, RiskGuardian};

pub use anyhow::{Error, Result};

/// Convenient imports for binaries and tests.
pub mod prelude {
    pub use crate::aggregator::{AggregationPolicy, Median, SignalAggregator, WeightedAverage};
    pub use crate::core::{AlphaSignal, AssetType, Exchange, Side, TargetPosition};
    pub use crate::data::{
        CanonicalTick, FeedDispatcher, NasdaqNormalizer, Normalizer, NyseNormalizer,
    };
    pub use crate::engine::{Alpha, AlphaEngine};
    pub use crate::risk::{Order, RiskCheckResult, RiskGuardian, Violation, ViolationKind};
    pub use crate::{Error, Result};
}

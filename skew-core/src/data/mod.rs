//! Market data ingestion: wire-format normalization and multicast dispatch.
//!
//! Raw exchange frames enter through [`FeedDispatcher`], are decoded by the
//! registered [`Normalizer`]s in registration order (first success wins),
//! and leave as [`CanonicalTick`]s pushed to every subscribed callback.
//! Malformed frames are dropped silently; multicast is lossy by contract and
//! a bad packet is never worth stalling the feed for.

pub mod constants;
pub mod dispatcher;
pub mod normalizer;
pub mod types;

pub use dispatcher::FeedDispatcher;
pub use normalizer::{NasdaqNormalizer, Normalizer, NyseNormalizer};
pub use types::CanonicalTick;

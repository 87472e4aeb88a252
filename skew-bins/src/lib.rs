//! Shared plumbing for the skew service binaries.

pub mod common;

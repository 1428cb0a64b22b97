//! Shared test utilities for schemata integration tests.
//!
//! This crate provides:
//! - [`RecordingStore`]: In-memory catalog store with operation recording,
//!   failure injection, and latency injection
//! - Fixture functions for callers, payloads, and services
//!
//! # Example
//!
//! ```rust,ignore
//! use schemata_test_utils::{RecordingStore, StoreOp, alice, create_entity, service_over};
//!
//! let store = RecordingStore::new();
//! let service = service_over(&store);
//! service.create(&alice(), create_entity("e1", "Book")).await?;
//! assert!(matches!(store.operations()[0], StoreOp::Put { .. }));
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod fixtures;
pub mod storage;

pub use fixtures::*;
pub use storage::*;

/// Routes `tracing` output to the test harness.
///
/// Both schemata crates log at `debug` unless `RUST_LOG` says otherwise.
/// Repeated calls keep the first subscriber.
pub fn init_test_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(TEST_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

const TEST_FILTER: &str = "info,schemata_core=debug,schemata_catalog=debug";

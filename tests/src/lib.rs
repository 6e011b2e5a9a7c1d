//! # CVM Compatibility Test Suite
//!
//! Unified test crate for `cvm-compat`.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── detector_benchmarks.rs   # criterion: detector, cache, dispatch
//! └── src/
//!     ├── fixtures.rs              # sample bytecode and transactions
//!     └── integration/
//!         ├── compat_flows.rs      # deploy → activate → block flows
//!         └── properties.rs        # randomised invariants
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p cvm-tests
//!
//! # With logs
//! RUST_LOG=cvm_compat=debug cargo test -p cvm-tests -- --nocapture
//!
//! # Benchmarks
//! cargo bench -p cvm-tests
//! ```

#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(dead_code)]

pub mod fixtures;
pub mod integration;

use std::sync::Once;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static TRACING: Once = Once::new();

/// Install a test-writer subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_test_writer().with_target(true))
            .try_init();
    });
}

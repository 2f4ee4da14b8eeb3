//! Logging and tracing initialization for Fennec.
//!
//! Fennec logs through `tracing`. Nothing is printed until a subscriber is
//! installed, so call one of these functions once at startup.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fennec_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     fennec_core::logging::init_logging();
//!
//!     let services = ServiceCollection::new().build();
//!     Fennec::new(services).discover().serve().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! The level is controlled by `RUST_LOG`:
//!
//! ```bash
//! # Binding failures and scope lifetimes
//! RUST_LOG=fennec_core=trace cargo run
//!
//! # Production
//! RUST_LOG=warn cargo run
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn filter_or(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize logging with sensible defaults (`info` unless `RUST_LOG` is set).
///
/// # Panics
///
/// Panics if a global subscriber is already installed. Only call it once
/// at application startup.
pub fn init_logging() {
    init_logging_with_level("info");
}

/// Initialize logging with a specific default level.
///
/// `RUST_LOG` still wins when present.
///
/// # Common Levels
///
/// - `"trace"` - scope creation/release and lifecycle transitions
/// - `"debug"` - binding failures and route registration details
/// - `"info"` - startup and discovered routes
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging_with_level(level: &str) {
    tracing_subscriber::registry()
        .with(filter_or(level))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize pretty-formatted logging (recommended for development).
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging_pretty() {
    tracing_subscriber::registry()
        .with(filter_or("info"))
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_line_number(true)
                .with_thread_ids(true)
                .with_target(true),
        )
        .init();
}

/// Initialize JSON-formatted logging (recommended for production).
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging_json() {
    tracing_subscriber::registry()
        .with(filter_or("info"))
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Like [`init_logging`], but returns `false` instead of panicking when a
/// subscriber is already installed. Output goes through the test writer,
/// so it is captured per test.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(filter_or("info"))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init()
        .is_ok()
}

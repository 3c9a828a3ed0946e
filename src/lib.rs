//! Pipeline for Brazilian municipal population data.
//!
//! Seven stages run as separate binaries and hand data to each other as
//! CSV files: fetch the municipality register, fetch the estimate pages,
//! extract population figures, merge the two tables, describe the result,
//! chart it, and map it. The library holds everything the binaries share.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod br;
pub mod chart;
pub mod config;
pub mod extract;
pub mod getter;
pub mod http;
pub mod map;
pub mod merge;
pub mod stats;
pub mod table;

/// Log setup shared by every stage binary. `RUST_LOG` overrides the
/// default level.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "popbr=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

//! Observability - tracing subscriber の初期化
//!
//! The library only emits events; binaries decide where they go.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Installs a global `fmt` subscriber.
///
/// `filter` wins over `RUST_LOG`; with neither set the level is `info`.
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(filter: Option<&str>, json: bool) -> bool {
    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry.with(fmt::layer().json().with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };
    installed.is_ok()
}

//! Diagnostics setup.
//!
//! Progress lines and model JSON own stdout, so every `tracing` event goes to stderr. The
//! level is taken from `RUST_LOG` and defaults to `info`.

use std::io;

use anyhow::Context as _;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber.
pub(crate) fn init() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stderr_layer = fmt::layer().with_target(false).with_writer(io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install global tracing subscriber")?;
    Ok(())
}

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub const LOG_ENV: &str = "GAPCAST_LOG";

static INIT: Once = Once::new();

/// Installs the stderr subscriber once. Filter comes from `GAPCAST_LOG`
/// (e.g. `gapcast=debug`), falling back to `gapcast=info`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("gapcast=info"));
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(filter)
            .init();
    });
}

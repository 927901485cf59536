//! Log output for debugging the analysis.
//!
//! ```bash
//! PIKE_LINT_LOG=debug pike-lint check src/
//! PIKE_LINT_LOG="pike_analysis=trace" pike-lint check file.pike
//! ```
//!
//! Nothing is installed unless `PIKE_LINT_LOG` or `RUST_LOG` is set.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// `PIKE_LINT_LOG` wins over `RUST_LOG` when both are set.
fn build_filter() -> EnvFilter {
    match std::env::var("PIKE_LINT_LOG") {
        Ok(value) => EnvFilter::builder().parse_lossy(value),
        Err(_) => EnvFilter::from_default_env(),
    }
}

/// Installs the global subscriber. Output goes to stderr so it never mixes
/// with JSON written to stdout.
pub fn init_tracing() {
    let requested =
        std::env::var("PIKE_LINT_LOG").is_ok() || std::env::var("RUST_LOG").is_ok();
    if !requested {
        return;
    }

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .without_time();
    let _ = Registry::default()
        .with(build_filter())
        .with(layer)
        .try_init();
}

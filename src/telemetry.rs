//! Logging setup

/// Directive used when `RUST_LOG` is unset or invalid
pub const DEFAULT_DIRECTIVE: &str = "legal_rag=info";

/// Install a `tracing` subscriber filtered by `RUST_LOG`, or by `default_directive`
/// when the variable is unset
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging(default_directive: Option<&str>) -> bool {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive.unwrap_or(DEFAULT_DIRECTIVE)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    fmt().with_env_filter(filter).with_target(false).try_init().is_ok()
}

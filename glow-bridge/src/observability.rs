use tracing_subscriber::EnvFilter;

/// Directives used when `RUST_LOG` is unset or empty.
pub const DEFAULT_DIRECTIVES: &str = "glow_bridge=info";

/// Install the global subscriber. `RUST_LOG` replaces the
/// `glow_bridge=info` default entirely when set.
pub fn init_tracing() {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    // Entity records may go to stdout, so logs stay on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(rust_log.as_deref()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn env_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

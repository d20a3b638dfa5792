use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Noisy dependencies kept at warn unless RUST_LOG says otherwise
const QUIET_MODULES: &[&str] = &["hyper", "rustls", "reqwest", "hudsucker"];

/// Build the filter: RUST_LOG wins, otherwise `level` plus quiet dependencies.
pub fn build_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let base = if levels::is_valid_level(level) { level } else { "info" };
    let mut filter = EnvFilter::new(base);
    for module in QUIET_MODULES {
        if let Ok(directive) = format!("{}=warn", module).parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Install the global subscriber. Logs go to stderr.
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init_logging(level: &str, json: bool) {
    let filter = build_filter(level);

    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Logging already initialized, skipping");
    }
}

pub mod levels {
    pub fn is_valid_level(level: &str) -> bool {
        matches!(
            level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        )
    }
}

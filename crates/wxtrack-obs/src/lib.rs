use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info,wxtrack=debug";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable lines for local runs
    Pretty,
}

impl LogFormat {
    /// Anything other than `pretty` (case-insensitive) means JSON
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("pretty") {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

/// Filter directives from `RUST_LOG`, falling back to [`DEFAULT_FILTER`]
pub fn filter_directives(rust_log: Option<String>) -> String {
    rust_log
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Initialize logging with JSON output.
/// - RUST_LOG respected; default to "info,wxtrack=debug"
pub fn init(service_name: &str) {
    init_with(service_name, LogFormat::Json);
}

/// Initialize logging in the given format. A second call is a no-op.
pub fn init_with(service_name: &str, format: LogFormat) {
    let env_filter = EnvFilter::new(filter_directives(std::env::var("RUST_LOG").ok()));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };

    if installed.is_ok() {
        tracing::info!(service = %service_name, ?format, "Logging initialized");
    }
}

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Used when `RUST_LOG` is unset or unparsable. Targets match by prefix, so
/// `pagepilot` covers every workspace crate.
pub const DEFAULT_LOG_FILTER: &str = "pagepilot=info,tower_http=info";

/// Installs the global fmt subscriber. Logs go to stderr so `chat --json`
/// output stays machine-readable. A second call is a no-op.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

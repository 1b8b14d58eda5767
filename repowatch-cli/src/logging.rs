//! Logging initialization for the repowatch binary.
//!
//! Configures `tracing-subscriber` from the `[general]` section of
//! `RepowatchConfig`. Log lines go to stderr so that `--output json`
//! keeps stdout machine-readable.
//!
//! Configuration is loaded before the global subscriber exists, so warnings
//! raised while applying env overrides go through [`with_bootstrap_logging`].

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use repowatch_core::config::GeneralConfig;

/// Initialize the global tracing subscriber.
///
/// Must be called once, before the first repository is processed. `RUST_LOG`
/// takes precedence over the configured level.
///
/// # Formats
///
/// * `"json"` - JSON lines; the `repository` span (repo, url) is attached
///   to every event as `span`
/// * `"pretty"` - human-readable output
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let layer = format_layer(&config.log_format, std::io::stderr)?;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_lowercase()));

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {}", e))
}

/// Run `f` with a warn-level stderr subscriber installed on this thread.
///
/// Used while the configuration itself is being assembled.
pub fn with_bootstrap_logging<T>(f: impl FnOnce() -> T) -> T {
    with_bootstrap_writer(std::io::stderr, f)
}

fn with_bootstrap_writer<W, T>(make_writer: W, f: impl FnOnce() -> T) -> T
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::WARN)
        .without_time()
        .with_target(false)
        .with_ansi(false)
        .with_writer(make_writer)
        .finish();
    tracing::subscriber::with_default(subscriber, f)
}

fn format_layer<W>(format: &str, make_writer: W) -> Result<Box<dyn Layer<Registry> + Send + Sync>>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let base = tracing_subscriber::fmt::layer().with_writer(make_writer);
    match format {
        "json" => Ok(base
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed()),
        "pretty" => Ok(base.pretty().boxed()),
        other => Err(anyhow::anyhow!(
            "unknown log format '{}', expected 'json' or 'pretty'",
            other
        )),
    }
}

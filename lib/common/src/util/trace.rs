use anyhow::Result;
use tracing::instrument;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// Log lines go to stderr so that stdout stays reserved for metric output.
/// The filter is taken from `RUST_LOG` and falls back to `default_directive`.
#[instrument]
pub fn initialize_tracing(default_directive: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}

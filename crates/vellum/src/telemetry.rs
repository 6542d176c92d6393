use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "info,vellum=debug";

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `default_directive` selects what is
/// logged. Set `json` for one JSON object per event instead of human-readable
/// lines.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_telemetry(
    default_directive: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let subscriber = tracing_subscriber::registry().with(env_filter);
    if json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        subscriber.with(tracing_subscriber::fmt::layer()).try_init()?;
    }

    info!(json, "Telemetry initialized");
    Ok(())
}

/// Initialize console logging with [`DEFAULT_DIRECTIVE`].
pub fn init_console_telemetry() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_telemetry(DEFAULT_DIRECTIVE, false)
}

use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Install the process-wide fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` (the config's `log_level`) is used.
/// Calling this twice returns `LOGGING_INIT_FAILED` instead of panicking.
pub fn init(level: &str) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.to_ascii_lowercase()))
        .map_err(|e| {
            AppError::new("LOGGING_INIT_FAILED", "Invalid log level")
                .with_details(format!("level={level}; err={e}"))
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| {
            AppError::new("LOGGING_INIT_FAILED", "Failed to install log subscriber")
                .with_details(e.to_string())
        })
}

//! Process-wide `tracing` setup.
//!
//! Level filtering comes from `RUST_LOG` (default `info`); the output format from
//! [`LogFormat`].

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;
use crate::error::RuntimeError;

const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_tracing(format: LogFormat) -> Result<(), RuntimeError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    let res = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
    res.map_err(|e| RuntimeError::Telemetry {
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_fails() {
        let _ = init_tracing(LogFormat::Text);
        let err = init_tracing(LogFormat::Json).unwrap_err();
        assert_eq!(err.as_label(), "telemetry");
    }
}

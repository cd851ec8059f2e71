//! Kitchen service configuration

use thiserror::Error;

/// Kitchen configuration, loaded from the environment.
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | MQTT_BROKER_URL | (required) | broker connection URI, e.g. `mqtt://localhost:1883` |
/// | MIN_ORDER_WAIT_SECS | 5 | minimum simulated preparation time |
/// | MAX_ORDER_WAIT_SECS | 10 | maximum simulated preparation time |
#[derive(Debug, Clone)]
pub struct Config {
    /// Broker connection URI, passed through to the transport unparsed.
    pub broker_url: String,
    /// Minimum simulated preparation time in seconds.
    pub min_order_wait: f64,
    /// Maximum simulated preparation time in seconds.
    pub max_order_wait: f64,
}

/// Error raised when the environment cannot produce a [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("environment variable '{0}' is not set")]
    MissingVar(&'static str),

    /// The wait bounds are negative or inverted
    #[error("invalid wait range: MIN_ORDER_WAIT_SECS = {min}, MAX_ORDER_WAIT_SECS = {max}")]
    InvalidWaitRange { min: f64, max: f64 },
}

impl Config {
    /// Create a config with explicit values.
    pub fn new(
        broker_url: impl Into<String>,
        min_order_wait: f64,
        max_order_wait: f64,
    ) -> Result<Self, ConfigError> {
        if min_order_wait < 0.0 || min_order_wait > max_order_wait {
            return Err(ConfigError::InvalidWaitRange {
                min: min_order_wait,
                max: max_order_wait,
            });
        }
        Ok(Self {
            broker_url: broker_url.into(),
            min_order_wait,
            max_order_wait,
        })
    }

    /// Load the config from environment variables.
    ///
    /// Wait bounds fall back to their defaults when unset or unparseable;
    /// the broker URL is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        let broker_url = std::env::var("MQTT_BROKER_URL")
            .map_err(|_| ConfigError::MissingVar("MQTT_BROKER_URL"))?;
        Self::new(
            broker_url,
            env_f64("MIN_ORDER_WAIT_SECS", 5.0),
            env_f64("MAX_ORDER_WAIT_SECS", 10.0),
        )
    }
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

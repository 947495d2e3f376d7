use crate::motion::smoothing::SMOOTHING_FACTOR;
use crate::motion::DEFAULT_TICK_INTERVAL;
use reqwest::Url;
use std::env;
use std::time::Duration;

/// Fixed delay between a disconnect and the next connection attempt
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(2000);

/// Default ground station address
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

const STREAM_PATH: &str = "/ws";
const TRACK_PATH: &str = "/api/track";

/// Client configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the ground station (http, https, ws or wss)
    pub server_url: String,
    /// Delay before reconnecting after the stream closes
    pub reconnect_delay: Duration,
    /// Instrument tick period
    pub tick_interval: Duration,
    /// Per-tick smoothing factor, in (0, 1]
    pub smoothing_factor: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            tick_interval: DEFAULT_TICK_INTERVAL,
            smoothing_factor: SMOOTHING_FACTOR,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            server_url: env::var("FPV_SERVER_URL").unwrap_or(defaults.server_url),
            reconnect_delay: duration_ms_var("FPV_RECONNECT_DELAY_MS")?
                .unwrap_or(defaults.reconnect_delay),
            tick_interval: duration_ms_var("FPV_TICK_INTERVAL_MS")?
                .unwrap_or(defaults.tick_interval),
            smoothing_factor: match env::var("FPV_SMOOTHING_FACTOR") {
                Ok(v) => v
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(format!("FPV_SMOOTHING_FACTOR={}", v)))?,
                Err(_) => defaults.smoothing_factor,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check ranges and that the server URL can be turned into endpoints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.smoothing_factor > 0.0 && self.smoothing_factor <= 1.0) {
            return Err(ConfigError::InvalidValue(format!(
                "smoothing factor must be in (0, 1], got {}",
                self.smoothing_factor
            )));
        }

        if self.tick_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "tick interval must be greater than zero".to_string(),
            ));
        }

        self.websocket_url()?;
        Ok(())
    }

    /// Telemetry stream endpoint: `http(s)://host` becomes `ws(s)://host/ws`
    ///
    /// A `ws://` or `wss://` URL is used unchanged.
    pub fn websocket_url(&self) -> Result<String, ConfigError> {
        let mut url = self.parse_base()?;

        let scheme = match url.scheme() {
            "ws" | "wss" => return Ok(url.to_string()),
            "http" => "ws",
            "https" => "wss",
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };

        url.set_scheme(scheme)
            .map_err(|_| ConfigError::InvalidUrl(self.server_url.clone()))?;
        url.set_path(STREAM_PATH);
        Ok(url.to_string())
    }

    /// Track history endpoint
    pub fn track_url(&self) -> Result<String, ConfigError> {
        let mut url = self.parse_base()?;

        let scheme = match url.scheme() {
            "http" | "ws" => "http",
            "https" | "wss" => "https",
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };

        url.set_scheme(scheme)
            .map_err(|_| ConfigError::InvalidUrl(self.server_url.clone()))?;
        url.set_path(TRACK_PATH);
        Ok(url.to_string())
    }

    fn parse_base(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.server_url).map_err(|_| ConfigError::InvalidUrl(self.server_url.clone()))
    }
}

fn duration_ms_var(key: &str) -> Result<Option<Duration>, ConfigError> {
    match env::var(key) {
        Ok(v) => v
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| ConfigError::InvalidValue(format!("{}={}", key, v))),
        Err(_) => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

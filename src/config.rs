use std::env;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("QUIZ_API_TIMEOUT_SECS must be a positive number of seconds, got {0:?}")]
    InvalidTimeout(String),
    #[error("QUIZ_API_URL must not be empty")]
    EmptyApiUrl,
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the quiz-storage API, e.g. `http://localhost:5000/api`.
    pub api_url: String,
    pub request_timeout: Duration,
}

impl Config {
    /// Reads `QUIZ_API_URL` and `QUIZ_API_TIMEOUT_SECS`, falling back to defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(
            env::var("QUIZ_API_URL").ok(),
            env::var("QUIZ_API_TIMEOUT_SECS").ok(),
        )
    }

    fn from_vars(api_url: Option<String>, timeout: Option<String>) -> Result<Self, ConfigError> {
        let api_url = api_url.unwrap_or_else(|| DEFAULT_API_URL.into());
        if api_url.trim().is_empty() {
            return Err(ConfigError::EmptyApiUrl);
        }

        let request_timeout = match timeout {
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
        };

        Ok(Self {
            api_url: api_url.trim().to_string(),
            request_timeout,
        })
    }
}

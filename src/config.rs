//! Application configuration loaded from environment variables.
//!
//! Endpoints default to Bitstamp's public servers and can be overridden:
//! - `BITSTAMP_REST_URL` - REST API base URL
//! - `BITSTAMP_WEBSOCKET_URL` - native websocket endpoint
//! - `BITSTAMP_PUSHER_URL` - push-service websocket endpoint
//!
//! Credentials are optional. They come either from `BITSTAMP_USER` and
//! `BITSTAMP_PASSWORD`, or from a JSON file named by `BITSTAMP_CONFIG`.
//! No public market-data call uses them.

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use zeroize::Zeroizing;

use crate::rest::BITSTAMP_API_URL;
use crate::websocket::protocol::{BITSTAMP_WS_URL, PUSHER_WS_URL};

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub rest_url: String,
    pub websocket_url: String,
    pub pusher_url: String,
    pub credentials: Option<Credentials>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            rest_url: BITSTAMP_API_URL.to_string(),
            websocket_url: BITSTAMP_WS_URL.to_string(),
            pusher_url: PUSHER_WS_URL.to_string(),
            credentials: None,
        }
    }
}

/// Account credentials. Accepted and kept, never sent anywhere.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(alias = "User")]
    pub user: String,
    #[serde(alias = "Password")]
    pub password: Zeroizing<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// Loads credentials from a JSON file with `user` and `password` keys
    /// (`User`/`Password` are accepted too).
    ///
    /// # Errors
    ///
    /// Returns [`StampedeError::Config`](crate::StampedeError::Config) if the
    /// file cannot be read or either value is empty, and
    /// [`StampedeError::Json`](crate::StampedeError::Json) if it is not valid.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            crate::StampedeError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let credentials: Self = serde_json::from_str(&contents)?;

        if credentials.user.is_empty() || credentials.password.is_empty() {
            return Err(crate::StampedeError::Config(format!(
                "{} must set both user and password",
                path.display()
            )));
        }

        Ok(credentials)
    }
}

/// Loads the application configuration from environment variables.
///
/// # Errors
///
/// Returns [`StampedeError::Config`](crate::StampedeError::Config) if only
/// one of `BITSTAMP_USER`/`BITSTAMP_PASSWORD` is set, or if the file named by
/// `BITSTAMP_CONFIG` cannot be loaded.
pub fn fetch_config() -> crate::Result<ApiConfig> {
    let defaults = ApiConfig::default();

    let user = non_empty_var("BITSTAMP_USER");
    let password = non_empty_var("BITSTAMP_PASSWORD");

    let credentials = match (user, password) {
        (Some(user), Some(password)) => Some(Credentials::new(user, password)),
        (Some(_), None) => {
            return Err(crate::StampedeError::Config(
                "BITSTAMP_USER is set but BITSTAMP_PASSWORD is missing".to_string(),
            ));
        }
        (None, Some(_)) => {
            return Err(crate::StampedeError::Config(
                "BITSTAMP_PASSWORD is set but BITSTAMP_USER is missing".to_string(),
            ));
        }
        (None, None) => match non_empty_var("BITSTAMP_CONFIG") {
            Some(path) => Some(Credentials::load(Path::new(&path))?),
            None => None,
        },
    };

    Ok(ApiConfig {
        rest_url: non_empty_var("BITSTAMP_REST_URL").unwrap_or(defaults.rest_url),
        websocket_url: non_empty_var("BITSTAMP_WEBSOCKET_URL").unwrap_or(defaults.websocket_url),
        pusher_url: non_empty_var("BITSTAMP_PUSHER_URL").unwrap_or(defaults.pusher_url),
        credentials,
    })
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

//! Session manager configuration.

use crate::error::{SessionError, SessionResult};
use std::env;
use std::time::Duration;

/// Environment variable overriding the idle timeout, in seconds.
pub const ENV_TIMEOUT: &str = "ARMATURE_SESSION_TIMEOUT";

/// Environment variable overriding the cookie path.
pub const ENV_COOKIE_PATH: &str = "ARMATURE_SESSION_COOKIE_PATH";

/// Environment variable overriding the reaper period, in milliseconds.
pub const ENV_SWEEP_INTERVAL_MS: &str = "ARMATURE_SESSION_SWEEP_INTERVAL_MS";

/// Session manager configuration.
///
/// All fields are fixed once the store is built; there is no
/// reconfiguration while requests are in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Idle time after which an untouched session expires
    pub timeout: Duration,
    /// Path attribute emitted on the session cookie
    pub cookie_path: String,
    /// How often the reaper scans for expired sessions
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300), // 5 minutes
            cookie_path: "/".to_string(),
            sweep_interval: Duration::from_secs(1),
        }
    }
}

impl SessionConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration from the process environment.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use armature_session_manager::SessionConfig;
    ///
    /// let config = SessionConfig::from_env().unwrap();
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn from_env() -> SessionResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create a configuration from an arbitrary key lookup.
    ///
    /// Uses the same variable names as [`SessionConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> SessionResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_TIMEOUT) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                SessionError::Config(format!("{} must be whole seconds, got '{}'", ENV_TIMEOUT, raw))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(path) = lookup(ENV_COOKIE_PATH) {
            config.cookie_path = path.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_SWEEP_INTERVAL_MS) {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                SessionError::Config(format!(
                    "{} must be whole milliseconds, got '{}'",
                    ENV_SWEEP_INTERVAL_MS, raw
                ))
            })?;
            config.sweep_interval = Duration::from_millis(millis);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the idle timeout.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Time a session survives without being accessed
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the cookie path.
    ///
    /// # Arguments
    ///
    /// * `path` - Path attribute for the `SessionId` cookie
    pub fn with_cookie_path(mut self, path: &str) -> Self {
        self.cookie_path = path.to_string();
        self
    }

    /// Set the reaper period.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Check that the configuration can drive a store.
    pub fn validate(&self) -> SessionResult<()> {
        if self.timeout.is_zero() {
            return Err(SessionError::Config("timeout must be non-zero".to_string()));
        }

        if chrono::Duration::from_std(self.timeout).is_err() {
            return Err(SessionError::Config(format!(
                "timeout {:?} is out of range",
                self.timeout
            )));
        }

        if self.sweep_interval.is_zero() {
            return Err(SessionError::Config(
                "sweep interval must be non-zero".to_string(),
            ));
        }

        if !self.cookie_path.starts_with('/') {
            return Err(SessionError::Config(format!(
                "cookie path must start with '/', got '{}'",
                self.cookie_path
            )));
        }

        if self.cookie_path.contains(';') {
            return Err(SessionError::Config(
                "cookie path must not contain ';'".to_string(),
            ));
        }

        if self.cookie_path.chars().any(|c| c.is_ascii_control()) {
            return Err(SessionError::Config(
                "cookie path must not contain control characters".to_string(),
            ));
        }

        Ok(())
    }

    /// Idle timeout as a chrono duration, for computing expiry instants.
    pub(crate) fn ttl(&self) -> SessionResult<chrono::Duration> {
        chrono::Duration::from_std(self.timeout)
            .map_err(|e| SessionError::Config(format!("timeout out of range: {}", e)))
    }
}

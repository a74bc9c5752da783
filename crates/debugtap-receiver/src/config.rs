//! Receiver configuration.
//!
//! Configuration is validated at load time, with defaults that match the
//! well-known `DBWIN_*` protocol.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ReceiverError, Result};

/// Largest wait the OS accepts before the value turns into "wait forever".
const MAX_WAIT_MS: u128 = (u32::MAX - 1) as u128;

/// Shortest wait the OS can express; anything below turns into a poll.
const MIN_WAIT: Duration = Duration::from_millis(1);

/// Converts a wait to the whole milliseconds the OS wait call takes,
/// never zero and never "wait forever".
pub(crate) fn wait_millis(timeout: Duration) -> u32 {
    let millis = timeout.as_millis().clamp(1, MAX_WAIT_MS);
    u32::try_from(millis).unwrap_or(u32::MAX - 1)
}

/// Receiver configuration.
///
/// ```rust
/// use std::time::Duration;
/// use debugtap_receiver::{ReceiverConfig, Scope};
///
/// let config = ReceiverConfig::builder()
///     .wait_timeout(Duration::from_millis(250))
///     .scope(Scope::Global)
///     .build();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Bounded wait on the data-ready signal; also the shutdown latency.
    #[serde(default = "default_wait_timeout")]
    #[serde(with = "humantime_serde")]
    pub wait_timeout: Duration,

    /// Session scope of the shared objects.
    #[serde(default)]
    pub scope: Scope,

    /// Refuse to attach when another monitor already owns the segment.
    #[serde(default = "default_exclusive")]
    pub exclusive: bool,

    /// Object names. The defaults are the wire protocol.
    #[serde(default)]
    pub names: ChannelNames,
}

fn default_wait_timeout() -> Duration {
    Duration::from_millis(500)
}

const fn default_exclusive() -> bool {
    true
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            wait_timeout: default_wait_timeout(),
            scope: Scope::default(),
            exclusive: default_exclusive(),
            names: ChannelNames::default(),
        }
    }
}

impl ReceiverConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ReceiverConfigBuilder {
        ReceiverConfigBuilder::new()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.wait_timeout < MIN_WAIT {
            return Err(ReceiverError::config("wait_timeout must be at least 1ms"));
        }
        if self.wait_timeout.as_millis() > MAX_WAIT_MS {
            return Err(ReceiverError::config(format!(
                "wait_timeout must be below {MAX_WAIT_MS}ms"
            )));
        }
        self.names.validate()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ReceiverError::config(format!("failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the string cannot be parsed or validated.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ReceiverError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Wait timeout in whole milliseconds, as the OS wait call expects.
    #[must_use]
    pub fn wait_timeout_ms(&self) -> u32 {
        wait_millis(self.wait_timeout)
    }

    /// Fully qualified object names for the configured scope.
    #[must_use]
    pub fn resolved_names(&self) -> ChannelNames {
        self.names.scoped(self.scope)
    }
}

/// Session scope of the shared objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Current session only.
    #[default]
    Local,
    /// All sessions (`Global\` prefix). Needs `SeCreateGlobalPrivilege`.
    Global,
}

impl Scope {
    /// Returns the kernel namespace prefix.
    #[must_use]
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::Local => "",
            Self::Global => "Global\\",
        }
    }
}

/// Names of the segment and the two signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelNames {
    /// Shared memory segment.
    #[serde(default = "default_buffer")]
    pub buffer: String,
    /// Signal set by the receiver when the slot may be written.
    #[serde(default = "default_buffer_ready")]
    pub buffer_ready: String,
    /// Signal set by a producer after it filled the slot.
    #[serde(default = "default_data_ready")]
    pub data_ready: String,
}

fn default_buffer() -> String {
    "DBWIN_BUFFER".to_string()
}

fn default_buffer_ready() -> String {
    "DBWIN_BUFFER_READY".to_string()
}

fn default_data_ready() -> String {
    "DBWIN_DATA_READY".to_string()
}

impl Default for ChannelNames {
    fn default() -> Self {
        Self {
            buffer: default_buffer(),
            buffer_ready: default_buffer_ready(),
            data_ready: default_data_ready(),
        }
    }
}

impl ChannelNames {
    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("buffer", &self.buffer),
            ("buffer_ready", &self.buffer_ready),
            ("data_ready", &self.data_ready),
        ] {
            if value.is_empty() {
                return Err(ReceiverError::config(format!("names.{field} cannot be empty")));
            }
            if value.contains('\0') {
                return Err(ReceiverError::config(format!(
                    "names.{field} cannot contain NUL"
                )));
            }
        }
        if self.buffer_ready == self.data_ready {
            return Err(ReceiverError::config(
                "names.buffer_ready and names.data_ready must differ",
            ));
        }
        Ok(())
    }

    fn scoped(&self, scope: Scope) -> Self {
        let prefix = scope.prefix();
        Self {
            buffer: format!("{prefix}{}", self.buffer),
            buffer_ready: format!("{prefix}{}", self.buffer_ready),
            data_ready: format!("{prefix}{}", self.data_ready),
        }
    }
}

/// Builder for [`ReceiverConfig`].
#[derive(Debug, Clone, Default)]
pub struct ReceiverConfigBuilder {
    config: ReceiverConfig,
}

impl ReceiverConfigBuilder {
    /// Creates a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bounded wait on the data-ready signal.
    #[must_use]
    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.config.wait_timeout = timeout;
        self
    }

    /// Sets the session scope.
    #[must_use]
    pub fn scope(mut self, scope: Scope) -> Self {
        self.config.scope = scope;
        self
    }

    /// Sets whether an already-owned segment is rejected.
    #[must_use]
    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.config.exclusive = exclusive;
        self
    }

    /// Overrides the object names.
    #[must_use]
    pub fn names(mut self, names: ChannelNames) -> Self {
        self.config.names = names;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ReceiverConfig {
        self.config
    }
}

/// Serde helper for humantime durations.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

//! Configuration error types.

/// Ways loading or validating engine configuration can fail.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ConfigErrorKind {
    /// A configuration source could not be read or merged
    #[display("Failed to load configuration: {}", _0)]
    Load(String),
    /// The merged sources do not deserialize into the expected shape
    #[display("Failed to parse configuration: {}", _0)]
    Parse(String),
    /// A key holds a value the engine cannot run with
    #[display("Invalid value for {}: {}", key, reason)]
    Invalid {
        /// Configuration key
        key: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Configuration error with source location.
///
/// # Examples
///
/// ```
/// use vellum_error::{ConfigError, ConfigErrorKind};
///
/// let err = ConfigError::invalid("storage_root", "must not be empty");
/// assert_eq!(err.key(), Some("storage_root"));
/// assert!(matches!(err.kind, ConfigErrorKind::Invalid { .. }));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", kind, line, file)]
pub struct ConfigError {
    /// What went wrong
    pub kind: ConfigErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create a new ConfigError at the current location.
    #[track_caller]
    pub fn new(kind: ConfigErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// A rejected value for `key`.
    #[track_caller]
    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Invalid {
            key,
            reason: reason.into(),
        })
    }

    /// The offending key, for validation failures.
    pub fn key(&self) -> Option<&'static str> {
        match self.kind {
            ConfigErrorKind::Invalid { key, .. } => Some(key),
            _ => None,
        }
    }
}

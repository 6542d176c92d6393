//! Engine configuration.
//!
//! The configuration system supports:
//! - Bundled defaults (include_str! from vellum.toml)
//! - User overrides (~/.config/vellum/vellum.toml, then ./vellum.toml)
//! - `VELLUM_*` environment variables with the highest precedence

use config::{Config, Environment, File, FileFormat};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, instrument};
use vellum_error::{ConfigError, ConfigErrorKind, VellumResult};

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../../../vellum.toml");

/// Settings the media engine consumes.
///
/// # Example
///
/// ```toml
/// max_file_size_bytes = 10_485_760
/// allowed_mime_prefixes = ["image/", "application/pdf"]
/// storage_root = "/var/lib/vellum/uploads"
/// public_base_url = "https://cdn.example.com/uploads"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct MediaConfig {
    /// Largest accepted upload in bytes
    #[serde(default = "default_max_file_size")]
    max_file_size_bytes: u64,

    /// MIME prefixes accepted on upload (e.g., "image/")
    #[serde(default = "default_allowed_prefixes")]
    #[setters(into)]
    allowed_mime_prefixes: Vec<String>,

    /// Directory that owns every stored byte
    #[serde(default = "default_storage_root")]
    #[setters(into)]
    storage_root: PathBuf,

    /// URL prefix that maps onto `storage_root`
    #[serde(default = "default_public_base_url")]
    #[setters(into)]
    public_base_url: String,

    /// Blocking threads for image transforms (defaults to available cores)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[setters(strip_option)]
    transform_workers: Option<usize>,

    /// Blocking threads and concurrent disk writes for ingestion
    #[serde(default = "default_io_workers")]
    io_workers: usize,

    /// Deadline for a single ingest or transform call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[setters(strip_option)]
    operation_timeout_secs: Option<u64>,
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_allowed_prefixes() -> Vec<String> {
    ["image/", "video/", "audio/", "application/pdf", "text/"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./uploads")
}

fn default_public_base_url() -> String {
    "/uploads".to_string()
}

fn default_io_workers() -> usize {
    16
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: default_max_file_size(),
            allowed_mime_prefixes: default_allowed_prefixes(),
            storage_root: default_storage_root(),
            public_base_url: default_public_base_url(),
            transform_workers: None,
            io_workers: default_io_workers(),
            operation_timeout_secs: None,
        }
    }
}

impl MediaConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> VellumResult<Self> {
        debug!("Loading configuration from file");

        let built = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                ConfigError::new(ConfigErrorKind::Load(format!(
                    "{}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?;
        Self::finish(built)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(toml: &str) -> VellumResult<Self> {
        let built = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .map_err(|e| ConfigError::new(ConfigErrorKind::Load(e.to_string())))?;
        Self::finish(built)
    }

    /// Load configuration with precedence: environment > current dir > home dir > bundled.
    ///
    /// User config files are optional and silently skipped when absent.
    #[instrument]
    pub fn load() -> VellumResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/vellum/vellum.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("vellum").required(false))
            .add_source(
                Environment::with_prefix("VELLUM")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_mime_prefixes"),
            );

        let built = builder
            .build()
            .map_err(|e| ConfigError::new(ConfigErrorKind::Load(e.to_string())))?;
        Self::finish(built)
    }

    fn finish(built: Config) -> VellumResult<Self> {
        let config: Self = built
            .try_deserialize()
            .map_err(|e| ConfigError::new(ConfigErrorKind::Parse(e.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values can drive an engine.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero size limit, an empty allow-list, an empty
    /// storage root, or a zero worker count.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_file_size_bytes == 0 {
            return Err(ConfigError::invalid("max_file_size_bytes", "must be greater than zero"));
        }
        if self.allowed_mime_prefixes.iter().all(|p| p.trim().is_empty()) {
            return Err(ConfigError::invalid("allowed_mime_prefixes", "must not be empty"));
        }
        if self.storage_root.as_os_str().is_empty() {
            return Err(ConfigError::invalid("storage_root", "must not be empty"));
        }
        if self.io_workers == 0 {
            return Err(ConfigError::invalid("io_workers", "must be greater than zero"));
        }
        if self.transform_workers == Some(0) {
            return Err(ConfigError::invalid("transform_workers", "must be greater than zero"));
        }
        Ok(())
    }

    /// Whether a MIME type starts with one of the allowed prefixes.
    ///
    /// ```
    /// use vellum_core::MediaConfig;
    ///
    /// let config = MediaConfig::default().with_allowed_mime_prefixes(vec!["image/".to_string()]);
    /// assert!(config.is_mime_allowed("image/png"));
    /// assert!(!config.is_mime_allowed("application/zip"));
    /// ```
    pub fn is_mime_allowed(&self, mime: &str) -> bool {
        let mime = mime.to_ascii_lowercase();
        self.allowed_mime_prefixes
            .iter()
            .map(|prefix| prefix.trim().to_ascii_lowercase())
            .any(|prefix| !prefix.is_empty() && mime.starts_with(&prefix))
    }

    /// Transform pool size, falling back to the number of available cores.
    pub fn effective_transform_workers(&self) -> usize {
        self.transform_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }

    /// Per-call deadline, when one is configured.
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_defaults_match_default_impl() {
        let bundled = MediaConfig::from_toml_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(bundled, MediaConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = MediaConfig::from_toml_str(
            r#"
            max_file_size_bytes = 2048
            allowed_mime_prefixes = ["image/"]
            operation_timeout_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(*config.max_file_size_bytes(), 2048);
        assert_eq!(config.allowed_mime_prefixes(), &vec!["image/".to_string()]);
        assert_eq!(config.public_base_url(), "/uploads");
        assert_eq!(config.operation_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vellum.toml");
        std::fs::write(&path, "storage_root = \"/srv/media\"\nio_workers = 4\n").unwrap();

        let config = MediaConfig::from_file(&path).unwrap();
        assert_eq!(config.storage_root(), &PathBuf::from("/srv/media"));
        assert_eq!(*config.io_workers(), 4);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(MediaConfig::default().with_max_file_size_bytes(0).validate().is_err());
        assert!(
            MediaConfig::default()
                .with_allowed_mime_prefixes(Vec::<String>::new())
                .validate()
                .is_err()
        );
        let err = MediaConfig::default().with_transform_workers(0).validate().unwrap_err();
        assert_eq!(err.key(), Some("transform_workers"));
        assert!(MediaConfig::from_toml_str("io_workers = 0").is_err());
    }

    #[test]
    fn test_mime_prefix_matching_is_case_insensitive() {
        let config = MediaConfig::default();
        assert!(config.is_mime_allowed("IMAGE/PNG"));
        assert!(config.is_mime_allowed("application/pdf"));
        assert!(!config.is_mime_allowed("application/zip"));
    }
}

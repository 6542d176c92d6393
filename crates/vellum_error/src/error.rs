//! Top-level error wrapper types.

use crate::{ConfigError, DatabaseError, MediaError, MediaErrorKind};

/// Every error the engine can surface.
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum VellumErrorKind {
    /// Media engine error
    #[from(MediaError)]
    Media(MediaError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Database backend error
    #[from(DatabaseError)]
    Database(DatabaseError),
}

/// Vellum error with kind discrimination.
///
/// # Examples
///
/// ```
/// use vellum_error::{ConfigError, VellumError, VellumErrorKind};
///
/// let err: VellumError = ConfigError::invalid("io_workers", "must be greater than zero").into();
/// assert!(matches!(err.kind(), VellumErrorKind::Config(_)));
/// assert!(err.media_kind().is_none());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Vellum Error: {}", _0)]
pub struct VellumError(Box<VellumErrorKind>);

impl VellumError {
    /// Create a new error from a kind.
    pub fn new(kind: VellumErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &VellumErrorKind {
        &self.0
    }

    /// Get the media error kind, if this is a media error.
    pub fn media_kind(&self) -> Option<&MediaErrorKind> {
        match self.kind() {
            VellumErrorKind::Media(err) => Some(err.kind()),
            _ => None,
        }
    }

    /// True when this is a `DuplicateFingerprint` media error.
    pub fn is_duplicate_fingerprint(&self) -> bool {
        matches!(
            self.media_kind(),
            Some(MediaErrorKind::DuplicateFingerprint(_))
        )
    }

    /// True when this is a `NotFound` media error.
    pub fn is_not_found(&self) -> bool {
        matches!(self.media_kind(), Some(MediaErrorKind::NotFound(_)))
    }
}

// Generic From implementation for any type that converts to VellumErrorKind
impl<T> From<T> for VellumError
where
    T: Into<VellumErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Vellum operations.
pub type VellumResult<T> = std::result::Result<T, VellumError>;

//! Media engine error types.

/// Kinds of media engine errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum MediaErrorKind {
    /// Upload exceeds the configured size limit
    #[display("File of {} bytes exceeds the {} byte limit", size, limit)]
    FileTooLarge {
        /// Size of the rejected content in bytes
        size: u64,
        /// Configured maximum in bytes
        limit: u64,
    },
    /// MIME type is not on the allow-list, or the operation does not apply to it
    #[display("Unsupported file type: {}", _0)]
    UnsupportedType(String),
    /// Stored image could not be decoded
    #[display("Failed to decode image: {}", _0)]
    DecodeFailure(String),
    /// Derived image could not be encoded
    #[display("Failed to encode image: {}", _0)]
    EncodeFailure(String),
    /// Disk write failed
    #[display("Failed to write file: {}", _0)]
    WriteFailure(String),
    /// Disk read failed or bytes did not match their fingerprint
    #[display("Failed to read file: {}", _0)]
    ReadFailure(String),
    /// A record with this fingerprint already exists
    #[display("Duplicate fingerprint: {}", _0)]
    DuplicateFingerprint(String),
    /// Lookup miss by ID or fingerprint
    #[display("Not found: {}", _0)]
    NotFound(String),
    /// Transform request parameters are unusable
    #[display("Invalid transform parameters: {}", _0)]
    InvalidTransformParameters(String),
    /// Operation is not valid for the record's current lifecycle state
    #[display("Invalid state: {}", _0)]
    InvalidState(String),
    /// Operation exceeded its deadline
    #[display("Operation timed out after {} ms", _0)]
    Timeout(u64),
    /// Batch request is empty or exceeds the batch limit
    #[display("Invalid batch: {}", _0)]
    InvalidBatch(String),
    /// Blocking work could not be scheduled or joined
    #[display("Worker pool error: {}", _0)]
    WorkerPool(String),
}

/// Media engine error with location tracking.
///
/// # Examples
///
/// ```
/// use vellum_error::{MediaError, MediaErrorKind};
///
/// let err = MediaError::new(MediaErrorKind::NotFound("media 7".to_string()));
/// assert!(format!("{}", err).contains("Not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Media Error: {} at line {} in {}", kind, line, file)]
pub struct MediaError {
    /// The kind of error that occurred
    pub kind: MediaErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl MediaError {
    /// Create a new media error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: MediaErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &MediaErrorKind {
        &self.kind
    }
}

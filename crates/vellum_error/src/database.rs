//! Registry backend error types.

/// Failures of a database-backed registry.
///
/// Constraint violations that carry meaning (a duplicate fingerprint, a row
/// still referenced by usages) are translated to [`MediaErrorKind`] by the
/// backend; what remains here is infrastructure failure.
///
/// [`MediaErrorKind`]: crate::MediaErrorKind
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum DatabaseErrorKind {
    /// Could not reach or configure the database
    #[display("Database connection error: {}", _0)]
    Connection(String),
    /// No pooled connection became available
    #[display("Connection pool error: {}", _0)]
    Pool(String),
    /// A statement failed
    #[display("Database query error: {}", _0)]
    Query(String),
    /// Schema migrations failed
    #[display("Migration error: {}", _0)]
    Migration(String),
}

/// Registry backend error with source location tracking.
///
/// # Examples
///
/// ```
/// use vellum_error::{DatabaseError, DatabaseErrorKind};
///
/// let err = DatabaseError::new(DatabaseErrorKind::Pool("timed out".to_string()));
/// assert!(err.is_transient());
/// assert!(format!("{}", err).contains("timed out"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Database Error: {} at line {} in {}", kind, line, file)]
pub struct DatabaseError {
    /// The kind of error that occurred
    pub kind: DatabaseErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl DatabaseError {
    /// Create a new DatabaseError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: DatabaseErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            DatabaseErrorKind::Connection(_) | DatabaseErrorKind::Pool(_)
        )
    }
}

#[cfg(feature = "database")]
impl From<diesel::result::Error> for DatabaseError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::Error;
        let kind = match &err {
            Error::DatabaseError(_, info) => match info.constraint_name() {
                Some(constraint) => DatabaseErrorKind::Query(format!(
                    "{} (constraint {})",
                    info.message(),
                    constraint
                )),
                None => DatabaseErrorKind::Query(info.message().to_string()),
            },
            Error::BrokenTransactionManager => DatabaseErrorKind::Connection(err.to_string()),
            _ => DatabaseErrorKind::Query(err.to_string()),
        };
        DatabaseError::new(kind)
    }
}

#[cfg(feature = "database")]
impl From<diesel::ConnectionError> for DatabaseError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        DatabaseError::new(DatabaseErrorKind::Connection(err.to_string()))
    }
}

#[cfg(feature = "database")]
impl From<diesel::r2d2::PoolError> for DatabaseError {
    #[track_caller]
    fn from(err: diesel::r2d2::PoolError) -> Self {
        DatabaseError::new(DatabaseErrorKind::Pool(err.to_string()))
    }
}

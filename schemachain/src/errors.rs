use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

/// Error kinds for schema migration operations.
///
/// The kinds fall into three groups. Authoring defects (`DuplicateId`, `UnknownParent`,
/// `BrokenChain`) and bad targets (`Unreachable`) are raised before the database is touched.
/// Execution failures (`StructuralMismatch`, `TransactionFailure`, `LockTimeout`) are raised
/// while a run is in progress. The remaining kinds cover the ambient plumbing.
///
/// # Examples
///
/// ```rust,ignore
/// use schemachain::errors::{SchemaError, ErrorKind, SchemaResult};
///
/// fn example() -> SchemaResult<()> {
///     Err(SchemaError::new("revision r1 not found", ErrorKind::NotFound))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Authoring errors
    /// A revision with the same id is already registered
    DuplicateId,
    /// A revision names a parent that is not registered
    UnknownParent,
    /// The revision graph branches or cannot be linearized
    BrokenChain,
    /// The requested revision does not exist
    NotFound,

    // Path resolution errors
    /// The requested target cannot be reached from the current marker
    Unreachable,

    // Execution errors
    /// An operation's structural precondition does not hold in the live database
    StructuralMismatch,
    /// DDL execution failed and the step was rolled back
    TransactionFailure,
    /// The migration lock could not be acquired in time
    LockTimeout,

    // Ambient errors
    /// A revision or operation is malformed
    ValidationError,
    /// Generic IO error
    IOError,
    /// Revision records could not be encoded or decoded
    EncodingError,
    /// Error reported by the database engine outside of a migration step
    BackendError,
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::DuplicateId => write!(f, "Duplicate revision id"),
            ErrorKind::UnknownParent => write!(f, "Unknown parent revision"),
            ErrorKind::BrokenChain => write!(f, "Broken revision chain"),
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::Unreachable => write!(f, "Unreachable target"),
            ErrorKind::StructuralMismatch => write!(f, "Structural mismatch"),
            ErrorKind::TransactionFailure => write!(f, "Transaction failure"),
            ErrorKind::LockTimeout => write!(f, "Lock timeout"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::BackendError => write!(f, "Backend error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Error type for schema migration operations.
///
/// `SchemaError` carries a message, a kind, an optional cause and the backtrace captured at
/// construction. Use [`SchemaError::kind`] to branch on the failure category.
///
/// # Examples
///
/// ```rust,ignore
/// use schemachain::errors::{SchemaError, ErrorKind};
///
/// let cause = SchemaError::new("no such column: endpoint_url", ErrorKind::BackendError);
/// let err = SchemaError::new_with_cause("step r3 failed", ErrorKind::TransactionFailure, cause);
/// ```
#[derive(Clone)]
pub struct SchemaError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<SchemaError>>,
    backtrace: Arc<Backtrace>,
}

impl SchemaError {
    /// Creates a new `SchemaError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        SchemaError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    /// Creates a new `SchemaError` that keeps `cause` in its error chain.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: SchemaError) -> Self {
        SchemaError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&SchemaError> {
        self.cause.as_deref()
    }
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace),
        }
    }
}

impl Error for SchemaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for schema migration operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

impl From<rusqlite::Error> for SchemaError {
    fn from(err: rusqlite::Error) -> Self {
        SchemaError::new(&format!("Database error: {}", err), ErrorKind::BackendError)
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        SchemaError::new(
            &format!("Revision encoding error: {}", err),
            ErrorKind::EncodingError,
        )
    }
}

impl From<std::io::Error> for SchemaError {
    fn from(err: std::io::Error) -> Self {
        SchemaError::new(&format!("IO error: {}", err), ErrorKind::IOError)
    }
}

impl From<chrono::ParseError> for SchemaError {
    fn from(err: chrono::ParseError) -> Self {
        SchemaError::new(
            &format!("Timestamp parsing error: {}", err),
            ErrorKind::EncodingError,
        )
    }
}

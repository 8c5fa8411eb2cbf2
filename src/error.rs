//! Error types for rgmux operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`RgmuxError`].
pub type Result<T> = std::result::Result<T, RgmuxError>;

/// Coarse classification of an [`RgmuxError`].
///
/// Callers that only need to decide how to report a failure can match on the
/// kind instead of every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A call to the management API (or its credential source) failed.
    Remote,
    /// The export destination already exists.
    AlreadyExists,
    /// Serializing or writing an export failed locally.
    Write,
    /// Configuration or input was rejected before any remote call.
    Config,
    /// Anything else.
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            Self::AlreadyExists => write!(f, "already-exists"),
            Self::Write => write!(f, "write"),
            Self::Config => write!(f, "config"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Errors that can occur during resource management operations.
///
/// All errors implement `std::error::Error` and can be chained with `source()`.
#[derive(Debug, Error)]
pub enum RgmuxError {
    /// A remote call failed (transport, authorization, or server side).
    #[error("remote call failed: {0}")]
    Remote(String),

    /// The management API answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// Fetching one page of a listing failed.
    #[error("listing failed on page {page}: {source}")]
    PageFetch {
        /// 1-based index of the page that failed
        page: usize,
        /// Underlying error
        #[source]
        source: Box<RgmuxError>,
    },

    /// A listing needed more pages than the configured cap allows.
    #[error("listing exceeded the limit of {limit} pages")]
    PageLimitExceeded {
        /// Configured maximum number of pages
        limit: usize,
    },

    /// Group or resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Not authenticated with the backend.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Export destination already exists and will not be overwritten.
    #[error("file '{}' already exists", .0.display())]
    AlreadyExists(PathBuf),

    /// Serializing or writing an export failed.
    #[error("writing {}: {source}", .path.display())]
    Write {
        /// Destination that was being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Required environment variables are not set.
    #[error("missing environment variables: {}", .0.join(", "))]
    MissingEnvironment(Vec<String>),

    /// Group or resource name is not acceptable to the provider.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Operation is not supported by this backend.
    #[error("operation not supported by backend: {0}")]
    NotSupported(String),

    /// Backend operation failed with context.
    #[error("{backend}: {operation} {target}: {source}")]
    BackendOperation {
        /// Backend name
        backend: String,
        /// Operation name (create-group, list-groups, export, etc.)
        operation: String,
        /// Group or resource the operation targeted
        target: String,
        /// Underlying error
        #[source]
        source: Box<RgmuxError>,
    },

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error (catch-all).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RgmuxError {
    /// Creates a backend operation error with context.
    ///
    /// # Example
    ///
    /// ```
    /// use rgmux::RgmuxError;
    ///
    /// let err = RgmuxError::NotFound("azure-sample-group".to_string());
    /// let wrapped = RgmuxError::backend_op("mock", "delete-group", "azure-sample-group", err);
    ///
    /// assert_eq!(
    ///     wrapped.to_string(),
    ///     "mock: delete-group azure-sample-group: not found: azure-sample-group"
    /// );
    /// ```
    pub fn backend_op(
        backend: impl Into<String>,
        operation: impl Into<String>,
        target: impl Into<String>,
        err: RgmuxError,
    ) -> Self {
        Self::BackendOperation {
            backend: backend.into(),
            operation: operation.into(),
            target: target.into(),
            source: Box::new(err),
        }
    }

    /// Classifies the error. Wrapping variants report the kind of their source.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Remote(_)
            | Self::Http { .. }
            | Self::PageFetch { .. }
            | Self::PageLimitExceeded { .. }
            | Self::NotFound(_)
            | Self::NotAuthenticated => ErrorKind::Remote,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::Write { .. } => ErrorKind::Write,
            Self::MissingEnvironment(_) | Self::InvalidName(_) | Self::NotSupported(_) => {
                ErrorKind::Config
            }
            Self::BackendOperation { source, .. } => source.kind(),
            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorKind::Other,
        }
    }
}

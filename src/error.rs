use thiserror::Error;

/// Classification of a [`FileError`], independent of its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    Unsupported,
    BackendRejected,
    Io,
    InvariantViolation,
}

/// Errors surfaced by every file handle operation
#[derive(Debug, Error)]
pub enum FileError {
    /// No row or path matches the handle's coordinate
    #[error("not found: {0}")]
    NotFound(String),

    /// Blank name, or an operation called on the wrong node kind
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The backend does not model this operation
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The catalog refused to insert the row
    #[error("catalog rejected insert: {0}")]
    BackendRejected(String),

    /// Every MIME candidate was refused while creating a catalog row
    #[error("no acceptable MIME type for {0}")]
    NoAcceptableMime(String),

    /// Opening, reading, writing or closing a stream failed
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A handle was constructed with inconsistent path state. This is a bug in
    /// the caller or in this crate, never a runtime condition.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl FileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FileError::NotFound(_) => ErrorKind::NotFound,
            FileError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            FileError::Unsupported(_) => ErrorKind::Unsupported,
            FileError::BackendRejected(_) | FileError::NoAcceptableMime(_) => {
                ErrorKind::BackendRejected
            }
            FileError::Io { .. } => ErrorKind::Io,
            FileError::InvariantViolation(_) => ErrorKind::InvariantViolation,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        FileError::Io {
            context: context.into(),
            source,
        }
    }

    /// Map a host I/O error, keeping `NotFound` distinguishable from other failures
    pub(crate) fn from_io(context: impl Into<String>, source: std::io::Error) -> Self {
        let context = context.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            FileError::NotFound(format!("{context}: {source}"))
        } else {
            FileError::io(context, source)
        }
    }
}

pub type Result<T> = std::result::Result<T, FileError>;

/// Non-throwing form of the handle contract.
///
/// Collapses any error into `None` after logging the cause, so call sites that
/// only care about success can write `file.length().quietly()`.
pub trait Quietly<T> {
    fn quietly(self) -> Option<T>;
}

impl<T> Quietly<T> for Result<T> {
    fn quietly(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                log_error(&err);
                None
            }
        }
    }
}

/// Log an error with its full source chain
pub fn log_error(err: &FileError) {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": caused by ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    if err.kind() == ErrorKind::InvariantViolation {
        log::error!("{message}");
    } else {
        log::debug!("{message}");
    }
}

use std::convert::From;
use std::sync::Arc;
use std::{fmt, io};

use thiserror::Error;

/// A unified result type representing the outcome of any operation performed by this crate's
/// readers and writers.
pub type IonResult<T> = Result<T, IonError>;

/// Represents the different types of failure that can occur while reading or writing Ion data.
///
/// With the exception of [IonError::IllegalOperation], an error returned by a reader or writer
/// is _sticky_: the instance stores the error and returns it from every subsequent call without
/// consuming any more input or producing any more output. Illegal operations (caller misuse) do
/// not poison the instance; the application may correct its usage and continue.
#[derive(Debug, Error)]
pub enum IonError {
    /// Indicates that an IO error was encountered while reading from the byte source or writing
    /// to the byte sink.
    #[error("{source:?}")]
    IoError {
        // io::Error is not Clone, so we hold it in an Arc. Sticky error reporting hands the
        // same underlying error back to the caller on every call.
        source: Arc<io::Error>,
    },

    /// Indicates that the input was malformed at the framing level: an unrecognizable token,
    /// an invalid escape sequence, an unbalanced container, or similar.
    #[error("syntax error: {description} at offset {offset}")]
    SyntaxError { description: String, offset: usize },

    /// Indicates that the input was well-formed at the framing level but violated the format's
    /// semantics: a negative zero integer, an annotation wrapper around a NOP pad, a timestamp
    /// field out of range, an oversized variable-length integer, and so on.
    #[error("invalid encoding: {description} at offset {offset}")]
    InvalidEncodingError { description: String, offset: usize },

    /// Indicates that the stream declared an Ion version that this crate does not implement.
    #[error("unsupported Ion version v{major}.{minor} at offset {offset}")]
    UnsupportedVersionError {
        major: u8,
        minor: u8,
        offset: usize,
    },

    /// Indicates that a local symbol table imported a shared table that the catalog could not
    /// supply and that the import did not carry a `max_id` to fall back on.
    #[error("unresolved import of shared symbol table '{name}' version {version}")]
    UnresolvedImportError { name: String, version: u32 },

    /// Indicates that the caller invoked an operation that is not legal in the reader's or
    /// writer's current state; for example, stepping out of a container while at the top level.
    #[error("the user has performed an operation that is not legal in the current state: {operation}")]
    IllegalOperation { operation: String },
}

impl IonError {
    /// Fatal errors poison the reader or writer that produced them; every subsequent operation
    /// on that instance will return the same error. Only caller misuse is recoverable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, IonError::IllegalOperation { .. })
    }

    /// The encoding primitives don't know their position within the overall stream, so the
    /// errors they construct carry an offset of zero. Readers patch in the real offset with
    /// this method as errors propagate upward.
    pub(crate) fn with_default_offset(mut self, default_offset: usize) -> IonError {
        match &mut self {
            IonError::SyntaxError { offset, .. }
            | IonError::InvalidEncodingError { offset, .. }
            | IonError::UnsupportedVersionError { offset, .. } => {
                if *offset == 0 {
                    *offset = default_offset;
                }
            }
            _ => {}
        }
        self
    }
}

impl From<io::Error> for IonError {
    fn from(io_error: io::Error) -> Self {
        IonError::IoError {
            source: Arc::new(io_error),
        }
    }
}

impl From<fmt::Error> for IonError {
    fn from(error: fmt::Error) -> Self {
        IonError::IoError {
            source: Arc::new(io::Error::new(io::ErrorKind::Other, error.to_string())),
        }
    }
}

impl Clone for IonError {
    fn clone(&self) -> Self {
        use IonError::*;
        match self {
            IoError { source } => IoError {
                source: Arc::clone(source),
            },
            SyntaxError {
                description,
                offset,
            } => SyntaxError {
                description: description.clone(),
                offset: *offset,
            },
            InvalidEncodingError {
                description,
                offset,
            } => InvalidEncodingError {
                description: description.clone(),
                offset: *offset,
            },
            UnsupportedVersionError {
                major,
                minor,
                offset,
            } => UnsupportedVersionError {
                major: *major,
                minor: *minor,
                offset: *offset,
            },
            UnresolvedImportError { name, version } => UnresolvedImportError {
                name: name.clone(),
                version: *version,
            },
            IllegalOperation { operation } => IllegalOperation {
                operation: operation.clone(),
            },
        }
    }
}

// Errors of different kinds are never equal to one another. IO errors are compared by their
// ErrorKind; everything else is compared field-wise. This makes assertions in tests practical.
impl PartialEq for IonError {
    fn eq(&self, other: &Self) -> bool {
        use IonError::*;
        match (self, other) {
            (IoError { source: s1 }, IoError { source: s2 }) => s1.kind() == s2.kind(),
            (
                SyntaxError {
                    description: d1,
                    offset: o1,
                },
                SyntaxError {
                    description: d2,
                    offset: o2,
                },
            ) => d1 == d2 && o1 == o2,
            (
                InvalidEncodingError {
                    description: d1,
                    offset: o1,
                },
                InvalidEncodingError {
                    description: d2,
                    offset: o2,
                },
            ) => d1 == d2 && o1 == o2,
            (
                UnsupportedVersionError {
                    major: maj1,
                    minor: min1,
                    offset: o1,
                },
                UnsupportedVersionError {
                    major: maj2,
                    minor: min2,
                    offset: o2,
                },
            ) => maj1 == maj2 && min1 == min2 && o1 == o2,
            (
                UnresolvedImportError {
                    name: n1,
                    version: v1,
                },
                UnresolvedImportError {
                    name: n2,
                    version: v2,
                },
            ) => n1 == n2 && v1 == v2,
            (IllegalOperation { operation: op1 }, IllegalOperation { operation: op2 }) => {
                op1 == op2
            }
            _ => false,
        }
    }
}

/// A convenience method for creating an IonResult containing an IonError::SyntaxError with the
/// provided description and stream offset.
pub fn syntax_error<T, S: Into<String>>(description: S, offset: usize) -> IonResult<T> {
    Err(syntax_error_raw(description, offset))
}

/// A convenience method for creating an IonError::SyntaxError with the provided description
/// and stream offset. Useful in contexts where the only thing that can fail is syntax.
pub fn syntax_error_raw<S: Into<String>>(description: S, offset: usize) -> IonError {
    IonError::SyntaxError {
        description: description.into(),
        offset,
    }
}

/// A convenience method for creating an IonResult containing an IonError::InvalidEncodingError
/// with the provided description and stream offset.
pub fn invalid_encoding_error<T, S: Into<String>>(description: S, offset: usize) -> IonResult<T> {
    Err(invalid_encoding_error_raw(description, offset))
}

/// A convenience method for creating an IonError::InvalidEncodingError with the provided
/// description and stream offset.
pub fn invalid_encoding_error_raw<S: Into<String>>(description: S, offset: usize) -> IonError {
    IonError::InvalidEncodingError {
        description: description.into(),
        offset,
    }
}

/// A convenience method for creating an IonResult containing an
/// IonError::UnsupportedVersionError.
pub fn unsupported_version_error<T>(major: u8, minor: u8, offset: usize) -> IonResult<T> {
    Err(IonError::UnsupportedVersionError {
        major,
        minor,
        offset,
    })
}

/// A convenience method for creating an IonResult containing an IonError::UnresolvedImportError.
pub fn unresolved_import_error<T, S: Into<String>>(name: S, version: u32) -> IonResult<T> {
    Err(IonError::UnresolvedImportError {
        name: name.into(),
        version,
    })
}

/// A convenience method for creating an IonResult containing an IonError::IllegalOperation with
/// the provided operation description.
pub fn illegal_operation<T, S: Into<String>>(operation: S) -> IonResult<T> {
    Err(illegal_operation_raw(operation))
}

/// A convenience method for creating an IonError::IllegalOperation with the provided operation
/// description.
pub fn illegal_operation_raw<S: Into<String>>(operation: S) -> IonError {
    IonError::IllegalOperation {
        operation: operation.into(),
    }
}

/// A convenience method for creating an IonResult containing a decoding failure. Decoding
/// errors surface as syntax errors with no meaningful offset; callers that know the stream
/// offset should prefer [syntax_error] or [invalid_encoding_error].
pub fn decoding_error<T, S: Into<String>>(description: S) -> IonResult<T> {
    Err(decoding_error_raw(description))
}

/// A convenience method for creating an IonError describing a decoding failure.
pub fn decoding_error_raw<S: Into<String>>(description: S) -> IonError {
    IonError::SyntaxError {
        description: description.into(),
        offset: 0,
    }
}

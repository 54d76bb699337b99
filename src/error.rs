use std::{error, fmt, io, result};

use crate::schema::ElementType;

/// The stage of a decode session where an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading bytes and splitting them into rows.
    Decode,
    /// Validating the record shape and resolving column positions.
    Resolve,
    /// Converting cells and appending them to destination buffers.
    Bind,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Decode => "decode",
            Self::Resolve => "resolve",
            Self::Bind => "bind",
        })
    }
}

/// The specific type of an error.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Wrap a [std::io::Error] raised by the byte source.
    Io {
        err: io::Error,
        /// Byte offset reached in the stream when the error occurred, if known
        byte: Option<u64>,
    },

    /// Indicate that a record shape declared a column with an element type
    /// that cannot be bound.
    UnsupportedType {
        /// Destination field
        field: String,
        /// Type tag as it was declared
        tag: String,
    },

    /// Indicate that a record shape declared the same destination field twice.
    DuplicateField {
        /// Destination field
        field: String,
    },

    /// Indicate that a column specification could not be parsed.
    InvalidSpec {
        /// The faulty specification
        spec: String,
    },

    /// Indicate that a cell could not be converted to its column's element
    /// type.
    Conversion {
        /// Zero-based index of the data row (header excluded)
        row: u64,
        /// Zero-based index of the column in the row
        column: usize,
        /// Destination field
        field: String,
        /// Element type of the destination
        expected: ElementType,
        /// Offending cell, lossily decoded
        value: String,
    },

    /// Indicate that a [`RowSink`](crate::RowSink) refused a row.
    Sink(Box<dyn error::Error + Send + Sync>),
}

/// An error occurring when decoding or binding CSV data.
#[derive(Debug)]
pub struct Error(ErrorKind);

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self(kind)
    }

    /// Wrap an arbitrary error raised by a [`RowSink`](crate::RowSink).
    pub fn sink<E>(err: E) -> Self
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Self(ErrorKind::Sink(err.into()))
    }

    pub(crate) fn at_byte(self, byte: u64) -> Self {
        match self.0 {
            ErrorKind::Io { err, byte: None } => Self(ErrorKind::Io {
                err,
                byte: Some(byte),
            }),
            kind => Self(kind),
        }
    }

    /// Return whether the wrapped error is a [`std::io::Error`].
    pub fn is_io_error(&self) -> bool {
        matches!(self.0, ErrorKind::Io { .. })
    }

    /// Return whether the error is a cell conversion failure.
    pub fn is_conversion_error(&self) -> bool {
        matches!(self.0, ErrorKind::Conversion { .. })
    }

    /// Return whether the error was raised while validating the record shape,
    /// i.e. before any byte was read.
    pub fn is_structural_error(&self) -> bool {
        matches!(
            self.0,
            ErrorKind::UnsupportedType { .. }
                | ErrorKind::DuplicateField { .. }
                | ErrorKind::InvalidSpec { .. }
        )
    }

    /// Return the stage of the session where the error occurred.
    pub fn stage(&self) -> Stage {
        match self.0 {
            ErrorKind::Io { .. } | ErrorKind::Sink(_) => Stage::Decode,
            ErrorKind::UnsupportedType { .. }
            | ErrorKind::DuplicateField { .. }
            | ErrorKind::InvalidSpec { .. } => Stage::Resolve,
            ErrorKind::Conversion { .. } => Stage::Bind,
        }
    }

    /// Return a reference to the underlying [`ErrorKind`].
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Unwraps the error into its underlying [`ErrorKind`].
    pub fn into_kind(self) -> ErrorKind {
        self.0
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self(ErrorKind::Io { err, byte: None })
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err.0 {
            ErrorKind::Io { err, .. } => err,
            kind => Self::new(io::ErrorKind::InvalidData, Error(kind)),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self.0 {
            ErrorKind::Io { ref err, .. } => Some(err),
            ErrorKind::Sink(ref err) => Some(&**err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            ErrorKind::Io {
                ref err,
                byte: Some(byte),
            } => write!(f, "{} error (byte: {}): {}", self.stage(), byte, err),
            ErrorKind::Io { ref err, byte: None } => fmt::Display::fmt(err, f),
            ErrorKind::UnsupportedType { ref field, ref tag } => write!(
                f,
                "{} error: field {:?} declares unsupported element type {:?}",
                self.stage(),
                field,
                tag
            ),
            ErrorKind::DuplicateField { ref field } => write!(
                f,
                "{} error: field {:?} is declared more than once",
                self.stage(),
                field
            ),
            ErrorKind::InvalidSpec { ref spec } => write!(
                f,
                "{} error: invalid column specification {:?} (expected field:type[:column])",
                self.stage(),
                spec
            ),
            ErrorKind::Conversion {
                row,
                column,
                ref field,
                expected,
                ref value,
            } => write!(
                f,
                "{} error: row {} column {}: could not convert {:?} to {} for field {:?}",
                self.stage(),
                row,
                column,
                value,
                expected,
                field
            ),
            ErrorKind::Sink(ref err) => {
                write!(f, "{} error: row sink failed: {}", self.stage(), err)
            }
        }
    }
}

/// A type alias for `Result<T, columnar_csv::Error>`.
pub type Result<T> = result::Result<T, Error>;

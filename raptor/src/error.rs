use rio_raptor_api::ModelError;
use rio_turtle::TurtleError;
use std::error::Error;
use std::fmt;
use std::io;

/// Error that might be returned by a Raptor backed parser or serializer.
///
/// It might wrap an IO error, be a document error reported by the engine, or
/// report that the engine is not usable at all.
#[derive(Debug)]
pub struct RaptorError {
    pub(crate) kind: RaptorErrorKind,
}

#[derive(Debug)]
pub enum RaptorErrorKind {
    /// Neither `libraptor2` nor `rapper` could be used as configured.
    EngineUnavailable(String),
    /// The engine rejected the input document.
    Parse {
        message: String,
        line: Option<u64>,
        column: Option<u64>,
    },
    /// The engine failed to serialize the statements it was given.
    Serialize { message: String, line: Option<u64> },
    IO(io::Error),
    /// The application asked for something the engine cannot represent.
    Argument(String),
    Model(ModelError),
}

impl RaptorError {
    pub(crate) fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: RaptorErrorKind::EngineUnavailable(message.into()),
        }
    }

    pub(crate) fn parse(message: impl Into<String>, line: Option<u64>, column: Option<u64>) -> Self {
        Self {
            kind: RaptorErrorKind::Parse {
                message: message.into(),
                line,
                column,
            },
        }
    }

    pub(crate) fn serialize(message: impl Into<String>, line: Option<u64>) -> Self {
        Self {
            kind: RaptorErrorKind::Serialize {
                message: message.into(),
                line,
            },
        }
    }

    pub(crate) fn argument(message: impl Into<String>) -> Self {
        Self {
            kind: RaptorErrorKind::Argument(message.into()),
        }
    }

    pub(crate) fn io_other(message: impl Into<String>) -> Self {
        io::Error::new(io::ErrorKind::Other, message.into()).into()
    }

    pub fn kind(&self) -> &RaptorErrorKind {
        &self.kind
    }

    /// The line of the document the error is about, starting at 1, if known.
    pub fn line(&self) -> Option<u64> {
        match &self.kind {
            RaptorErrorKind::Parse { line, .. } | RaptorErrorKind::Serialize { line, .. } => *line,
            _ => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.kind, RaptorErrorKind::EngineUnavailable(_))
    }

    pub fn is_parse(&self) -> bool {
        matches!(self.kind, RaptorErrorKind::Parse { .. })
    }

    pub fn is_serialize(&self) -> bool {
        matches!(self.kind, RaptorErrorKind::Serialize { .. })
    }

    pub fn is_io(&self) -> bool {
        matches!(self.kind, RaptorErrorKind::IO(_))
    }

    pub fn is_argument(&self) -> bool {
        matches!(
            self.kind,
            RaptorErrorKind::Argument(_) | RaptorErrorKind::Model(_)
        )
    }
}

impl fmt::Display for RaptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RaptorErrorKind::EngineUnavailable(message) => {
                write!(f, "the Raptor engine is not available: {}", message)
            }
            RaptorErrorKind::Parse {
                message,
                line,
                column,
            } => {
                f.write_str(message)?;
                if let Some(line) = line {
                    write!(f, " on line {}", line)?;
                    if let Some(column) = column {
                        write!(f, " at column {}", column)?;
                    }
                }
                Ok(())
            }
            RaptorErrorKind::Serialize { message, line } => {
                f.write_str(message)?;
                if let Some(line) = line {
                    write!(f, " on line {}", line)?;
                }
                Ok(())
            }
            RaptorErrorKind::IO(error) => error.fmt(f),
            RaptorErrorKind::Argument(message) => f.write_str(message),
            RaptorErrorKind::Model(error) => error.fmt(f),
        }
    }
}

impl Error for RaptorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            RaptorErrorKind::IO(error) => Some(error),
            RaptorErrorKind::Model(error) => Some(error),
            _ => None,
        }
    }
}

impl From<io::Error> for RaptorError {
    fn from(error: io::Error) -> Self {
        Self {
            kind: RaptorErrorKind::IO(error),
        }
    }
}

impl From<ModelError> for RaptorError {
    fn from(error: ModelError) -> Self {
        Self {
            kind: RaptorErrorKind::Model(error),
        }
    }
}

impl From<TurtleError> for RaptorError {
    fn from(error: TurtleError) -> Self {
        io::Error::from(error).into()
    }
}

impl From<RaptorError> for io::Error {
    fn from(error: RaptorError) -> Self {
        match error.kind {
            RaptorErrorKind::IO(error) => error,
            RaptorErrorKind::EngineUnavailable(_) => {
                io::Error::new(io::ErrorKind::NotFound, error)
            }
            RaptorErrorKind::Argument(_) | RaptorErrorKind::Model(_) => {
                io::Error::new(io::ErrorKind::InvalidInput, error)
            }
            _ => io::Error::new(io::ErrorKind::InvalidData, error),
        }
    }
}

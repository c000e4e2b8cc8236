//! Error types for the edl-core crate.

use std::fmt;

/// Result type for edl-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or interpreting story data.
#[derive(Debug)]
pub enum Error {
    /// The timeline document could not be parsed.
    Json {
        /// Context for where the error occurred.
        context: &'static str,
        /// The error message.
        message: String,
    },
    /// The timeline contains no phases.
    EmptyTimeline,
    /// Two consecutive phases are not strictly increasing in time.
    UnorderedPhases {
        /// Id of the earlier phase.
        previous: String,
        /// Id of the phase that does not come after it.
        phase: String,
    },
    /// A time value could not be interpreted.
    InvalidTime {
        /// The raw input.
        input: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Json { context, message } => {
                write!(f, "failed to parse {context}: {message}")
            }
            Error::EmptyTimeline => write!(f, "timeline contains no phases"),
            Error::UnorderedPhases { previous, phase } => {
                write!(
                    f,
                    "phase '{phase}' does not start strictly after phase '{previous}'"
                )
            }
            Error::InvalidTime { input } => write!(f, "invalid time value '{input}'"),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json {
            context: "timeline",
            message: e.to_string(),
        }
    }
}

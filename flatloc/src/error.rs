//! All error types for the flatloc crate.
//!
//! Every fatal condition maps to one variant; there is no retry layer, and a
//! failure anywhere aborts the whole run before any output is written.

use thiserror::Error;

use crate::types::KeyPath;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("comment error: {0}")]
    Comment(String),

    #[error("invalid message: {0}")]
    Message(String),

    #[error("invalid link: {0}")]
    Link(String),

    #[error("invalid composite group: {0}")]
    Composite(String),

    #[error("remap conflict: {0}")]
    Remap(String),

    #[error("invalid translation: {0}")]
    Translation(String),
}

impl Error {
    pub fn syntax(message: impl Into<String>) -> Self {
        Error::Syntax(message.into())
    }

    pub fn comment(message: impl Into<String>) -> Self {
        Error::Comment(message.into())
    }

    pub fn message(message: impl Into<String>) -> Self {
        Error::Message(message.into())
    }

    pub fn remap(message: impl Into<String>) -> Self {
        Error::Remap(message.into())
    }

    pub fn translation(message: impl Into<String>) -> Self {
        Error::Translation(message.into())
    }

    /// Prefixes the offending key path onto the message of a string-carrying
    /// variant. I/O and JSON errors pass through unchanged.
    pub(crate) fn at(self, path: &KeyPath) -> Self {
        match self {
            Error::Syntax(m) => Error::Syntax(format!("`{}`: {}", path, m)),
            Error::Comment(m) => Error::Comment(format!("`{}`: {}", path, m)),
            Error::Message(m) => Error::Message(format!("`{}`: {}", path, m)),
            Error::Link(m) => Error::Link(format!("`{}`: {}", path, m)),
            Error::Composite(m) => Error::Composite(format!("`{}`: {}", path, m)),
            Error::Remap(m) => Error::Remap(format!("`{}`: {}", path, m)),
            Error::Translation(m) => Error::Translation(format!("`{}`: {}", path, m)),
            other => other,
        }
    }
}

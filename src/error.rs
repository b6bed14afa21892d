//! Structured stream errors and their severity kinds.

use std::fmt;

use crate::item::StreamItem;

/// Severity tag deciding how the pipeline reacts to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Reported and skipped; the stream keeps flowing.
    General,
    /// Reported, then the whole stream is cancelled and drains to a close.
    Cancel,
    /// Reported, then the raising stage terminates and closes its output.
    Panic,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::General => write!(f, "general"),
            ErrorKind::Cancel => write!(f, "cancel"),
            ErrorKind::Panic => write!(f, "panic"),
        }
    }
}

/// Error raised by a stage or a user transform, optionally carrying the
/// offending item.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} stream error: {message}")]
pub struct StreamError {
    kind: ErrorKind,
    message: String,
    item: Option<Box<StreamItem>>,
}

impl StreamError {
    pub fn general(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::General,
            message: message.into(),
            item: None,
        }
    }

    pub fn cancel(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Cancel,
            message: message.into(),
            item: None,
        }
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Panic,
            message: message.into(),
            item: None,
        }
    }

    /// Wrap an untyped error as a general stream error.
    pub fn wrap(err: impl fmt::Display) -> Self {
        Self::general(err.to_string())
    }

    /// Attach the item that triggered the error.
    pub fn with_item(mut self, item: StreamItem) -> Self {
        self.item = Some(Box::new(item));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn item(&self) -> Option<&StreamItem> {
        self.item.as_deref()
    }
}

use serde::{Deserialize, Serialize};

/// A lex or parse failure. Carries enough location data to be surfaced
/// as a host diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, thiserror::Error)]
#[error("{file}:{line}: {message}")]
pub struct ParseError {
    pub file: String,
    pub line: u32,
    /// Byte offset of the offending token.
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(file: &str, line: u32, offset: usize, message: impl Into<String>) -> Self {
        ParseError {
            file: file.to_owned(),
            line,
            offset,
            message: message.into(),
        }
    }

    pub fn lex(file: &str, line: u32, offset: usize, message: impl Into<String>) -> Self {
        ParseError::new(file, line, offset, format!("lex error: {}", message.into()))
    }

    pub fn parse(file: &str, line: u32, offset: usize, message: impl Into<String>) -> Self {
        ParseError::new(file, line, offset, message)
    }
}

//! Error types for the TOP compiler

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TopError {
    #[error("Parse error at line {line}, column {column}: {message}")]
    Parser {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Codegen error: {message}")]
    Codegen { message: String },

    #[error("Tooling error: {message}")]
    Tooling { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TopError {
    pub fn parser(message: impl Into<String>, line: usize, column: usize) -> Self {
        TopError::Parser {
            message: message.into(),
            line,
            column,
        }
    }

    pub fn codegen(message: impl Into<String>) -> Self {
        TopError::Codegen {
            message: message.into(),
        }
    }

    pub fn tooling(message: impl Into<String>) -> Self {
        TopError::Tooling {
            message: message.into(),
        }
    }
}

/// Result type for TOP compiler operations
pub type TopResult<T> = Result<T, TopError>;

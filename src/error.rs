//! Error types for the nginx configuration parser.
//!
//! All parse failures are fatal; the parser never returns a partial tree.
//! Syntax-level errors carry the file name and 1-based line where they were
//! detected, so that messages can point at the offending statement even when
//! the directive came from an included file.

use std::io;
use thiserror::Error;

/// An error produced while parsing a configuration.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A character appeared where the grammar does not allow it
    /// (a `{` with no directive name, or a `}` in argument position).
    #[error("{file}:{line}: unexpected '{found}'")]
    UnexpectedChar {
        file: String,
        line: usize,
        found: char,
    },

    /// Non-whitespace input remained after the top-level block was closed.
    #[error("{file}:{line}: unexpected end")]
    UnexpectedEnd { file: String, line: usize },

    /// The input ended inside a quoted string, an opaque block body, a
    /// `${…}` reference, or an unclosed block.
    #[error("{file}:{line}: unexpected end of file")]
    UnexpectedEof { file: String, line: usize },

    /// An `include` used a relative pattern but no root directory was
    /// configured.
    #[error("not found root dir in options")]
    MissingRoot,

    /// An I/O failure from the byte source, the open capability, or the
    /// glob capability.
    #[error("{file}: {source}")]
    Io {
        file: String,
        #[source]
        source: io::Error,
    },
}

impl ParseError {
    /// Returns the file and line where this error occurred, if known.
    ///
    /// [`MissingRoot`](ParseError::MissingRoot) and [`Io`](ParseError::Io)
    /// have no source line.
    pub fn location(&self) -> Option<(&str, usize)> {
        match self {
            ParseError::UnexpectedChar { file, line, .. }
            | ParseError::UnexpectedEnd { file, line }
            | ParseError::UnexpectedEof { file, line } => Some((file.as_str(), *line)),
            ParseError::MissingRoot | ParseError::Io { .. } => None,
        }
    }
}

/// Result type alias for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

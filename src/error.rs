//! Error taxonomy (SPEC_FULL §7) and the single point every phase reports through.

use std::fmt;
use thiserror::Error;

/// A line number plus the literal source line, attached to every fatal error
/// so the top-level report can always print `Error: <msg>` followed by the
/// offending line, the way the original tool does.
#[derive(Debug, Clone)]
pub struct SourceLoc {
    pub line: u32,
    pub text: String,
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.line, self.text)
    }
}

#[derive(Debug, Error)]
pub enum CcError {
    #[error("{loc}: {msg}")]
    Lexical { loc: SourceLoc, msg: String },

    #[error("{loc}: {msg}")]
    Syntax { loc: SourceLoc, msg: String },

    #[error("{loc}: {msg}")]
    Semantic { loc: SourceLoc, msg: String },

    #[error("{loc}: {msg}")]
    Resource { loc: SourceLoc, msg: String },

    #[error("runtime error at pc={pc}: {msg}")]
    Runtime { pc: usize, msg: String },

    #[error("host function error: {0}")]
    Host(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CcError {
    pub fn lexical(loc: SourceLoc, msg: impl Into<String>) -> Self {
        CcError::Lexical { loc, msg: msg.into() }
    }
    pub fn syntax(loc: SourceLoc, msg: impl Into<String>) -> Self {
        CcError::Syntax { loc, msg: msg.into() }
    }
    pub fn semantic(loc: SourceLoc, msg: impl Into<String>) -> Self {
        CcError::Semantic { loc, msg: msg.into() }
    }
    pub fn resource(loc: SourceLoc, msg: impl Into<String>) -> Self {
        CcError::Resource { loc, msg: msg.into() }
    }
    pub fn runtime(pc: usize, msg: impl Into<String>) -> Self {
        CcError::Runtime { pc, msg: msg.into() }
    }

    /// Render the way the original prints diagnostics: a bold `Error:` tag
    /// followed by the line number and the offending source line.
    pub fn report(&self) -> String {
        format!("Error: {}", self)
    }
}

pub type CcResult<T> = Result<T, CcError>;

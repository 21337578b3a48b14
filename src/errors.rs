use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// What was wrong with a single script line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// The line is not a directive the script language knows about
    #[error("this line seems fishy")]
    UnrecognizedLine,
    /// A directive is missing one of its fields
    #[error("`{directive}` is missing its {field}")]
    MissingField {
        directive: &'static str,
        field: &'static str,
    },
    /// `text`, `resp` or `trig` showed up before any `node`
    #[error("`{0}` appears outside of a node")]
    NoCurrentNode(&'static str),
    /// The kind of a `node` directive is neither `s` nor `q`
    #[error("unknown node kind `{0}`")]
    UnknownNodeKind(String),
    /// A node was closed without ever receiving a `text` directive
    #[error("node `{0}` has no text")]
    MissingText(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{file}:{line}: {kind}: {raw}")]
pub struct ParseError {
    pub file: String,
    /// One-based line number.
    pub line: usize,
    pub raw: String,
    pub kind: ParseErrorKind,
}

/// Failure to compile a single script. Never fatal to a whole build.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl CompileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
#[error("cache file {}: {source}", path.display())]
pub struct CacheError {
    pub path: PathBuf,
    #[source]
    pub source: csv::Error,
}

/// Failures that abort a whole build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("input directory does not exist: {}", .0.display())]
    MissingInputDirectory(PathBuf),
    #[error("error with directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no .{extension} files found in {}", dir.display())]
    NoInputFiles {
        dir: PathBuf,
        extension: &'static str,
    },
    #[error("error saving cache: {0}")]
    Cache(#[from] CacheError),
}

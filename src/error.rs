//! Central error types for patscout.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic
//! `Display` and `From` implementations.
//!
//! Two tiers of failure exist, and they propagate differently:
//!
//! - [`RegistryError`] is a startup-time authoring bug in a pattern or
//!   heuristic document. It is fatal: no analysis runs against a
//!   partially-validated registry.
//! - Per-file conditions (parse failures, search budget exhaustion) are
//!   recovered locally by the analyzer and surfaced as structured entries
//!   inside the `AnalysisResult`, never as a run-aborting `Err`.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum ScoutError {
    /// IO operation failed (without path context - prefer IoWithPath when path is available)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// IO operation failed with path context for better error messages
    #[error("IO error at {path}: {error}")]
    IoWithPath {
        error: std::io::Error,
        path: PathBuf,
    },

    /// Source file could not be parsed into a consistent tree
    #[error("Parse error in {file}: {message}")]
    Parse { file: String, message: String },

    /// Requested language is not supported
    #[error("Language not supported: {0}")]
    UnsupportedLanguage(String),

    /// Tree-sitter grammar/loading error
    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),

    /// Pattern or heuristic definition failed validation at load time
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Invalid argument provided to a function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience type alias for Results using ScoutError.
pub type Result<T> = std::result::Result<T, ScoutError>;

impl ScoutError {
    /// Create an IO error with path context.
    ///
    /// Use this when reading files so the error message names the path
    /// that failed.
    #[inline]
    pub fn io_with_path(error: std::io::Error, path: impl AsRef<Path>) -> Self {
        ScoutError::IoWithPath {
            error,
            path: path.as_ref().to_path_buf(),
        }
    }
}

/// Validation failure in a pattern or opportunity-heuristic document.
///
/// Raised during `PatternRegistry` load, before any file is analyzed.
/// Every variant indicates an authoring bug in a definition document,
/// not a property of the code under analysis.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A clause references a role that no earlier clause introduced.
    #[error("pattern '{pattern}': clause {clause} references unbound role '{role}'")]
    UnboundRole {
        pattern: String,
        clause: usize,
        role: String,
    },

    /// A clause references a role that is not in the pattern's role list.
    #[error("pattern '{pattern}': clause {clause} references undeclared role '{role}'")]
    UndeclaredRole {
        pattern: String,
        clause: usize,
        role: String,
    },

    /// A declared role is never introduced by any clause.
    #[error("pattern '{pattern}': role '{role}' is declared but never introduced")]
    UnintroducedRole { pattern: String, role: String },

    /// The first clause must introduce the root role by kind enumeration.
    #[error("pattern '{pattern}': first clause must be a kind-equality introduction")]
    BadRootClause { pattern: String },

    /// A pattern has no clauses at all.
    #[error("pattern '{pattern}' has no clauses")]
    EmptyPattern { pattern: String },

    /// Two definitions share the same id.
    #[error("duplicate definition id '{id}'")]
    DuplicateId { id: String },

    /// A regex in a clause or signal failed to compile.
    #[error("pattern '{pattern}': invalid regex '{source_text}': {message}")]
    BadRegex {
        pattern: String,
        source_text: String,
        message: String,
    },

    /// The document itself could not be deserialized (covers unknown
    /// predicate or signal tags, which serde rejects).
    #[error("malformed definition document: {0}")]
    Malformed(#[from] serde_json::Error),
}

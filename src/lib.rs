//! Structural design-pattern detection over normalized syntax trees.
//!
//! patscout parses source files with tree-sitter, normalizes each parse
//! tree into a language-neutral node vocabulary, and evaluates declarative
//! pattern definitions against it with a backtracking match engine. Two
//! kinds of findings come out: pattern instances (an Adapter, a Factory
//! Method) with a confidence score and supporting evidence, and pattern
//! opportunities where the code's shape suggests a pattern is missing.
//!
//! # Quick start
//!
//! ```no_run
//! use patscout::{Analyzer, PatternRegistry};
//!
//! let analyzer = Analyzer::new(PatternRegistry::builtin());
//! let result = analyzer.analyze_path(std::path::Path::new("./src")).unwrap();
//! for m in &result.matches {
//!     println!("{} {} at {}:{}", m.pattern_name, m.confidence, m.file, m.location);
//! }
//! ```
//!
//! Custom pattern sets load from JSON with
//! [`PatternRegistry::from_json_str`]; the analyzer takes the registry by
//! value, so different analyzers can run different pattern sets at once.

pub mod aggregate;
pub mod analyzer;
pub mod ast;
pub mod engine;
pub mod error;
pub mod lang;
pub mod opportunity;
pub mod registry;
pub mod score;

pub use aggregate::{AnalysisResult, AnalysisStats, Opportunity, PatternMatch, RoleBinding};
pub use analyzer::{Analyzer, AnalyzerConfig};
pub use ast::{Location, Node};
pub use error::{RegistryError, Result, ScoutError};
pub use registry::{PatternCategory, PatternRegistry};

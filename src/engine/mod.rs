//! Structural match engine.
//!
//! Evaluates compiled pattern plans against a single file's normalized
//! tree using backtracking search over role bindings. Enumeration follows
//! document order and results carry a fixed ordering, so the same input
//! always yields the same matches.

mod matcher;

pub use matcher::{
    KindIndex, MatchEngine, SearchLimitExceeded, StructuralMatch, DEFAULT_MAX_EXPANSIONS,
};

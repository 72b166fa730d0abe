//! Analysis driver.
//!
//! Ties the pipeline together: file discovery, parsing, matching, scoring,
//! opportunity detection and aggregation. Directory runs fan out across a
//! rayon pool once enough files are involved; every per-file outcome is
//! independent, so one broken file never poisons the run.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::aggregate::{
    AnalysisResult, Opportunity, ParseFailure, PatternMatch, SearchFailure,
};
use crate::ast::{parse_named, Node};
use crate::engine::{KindIndex, MatchEngine, DEFAULT_MAX_EXPANSIONS};
use crate::error::{Result, ScoutError};
use crate::lang::LanguageRegistry;
use crate::opportunity::detect_opportunities;
use crate::registry::PatternRegistry;
use crate::score::score_match;

/// Directory runs with fewer files than this stay sequential; the rayon
/// pool only pays off once there is real fan-out.
const PARALLEL_THRESHOLD: usize = 8;

/// Default minimum confidence for a match to be reported.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// Default per-file size cap, in bytes.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

/// Tunables for one analyzer instance.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Matches scoring below this are discarded.
    pub min_confidence: f64,
    /// Files larger than this are skipped, not failed.
    pub max_file_size: u64,
    /// Expansion budget per (file, pattern) search.
    pub max_expansions: usize,
    /// Force every file through one language front-end instead of
    /// detecting by extension.
    pub language: Option<String>,
    /// Cooperative cancellation flag, checked between files.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_expansions: DEFAULT_MAX_EXPANSIONS,
            language: None,
            cancel: None,
        }
    }
}

impl AnalyzerConfig {
    #[must_use]
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    #[must_use]
    pub fn with_max_expansions(mut self, max_expansions: usize) -> Self {
        self.max_expansions = max_expansions;
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Pattern analysis entry point.
///
/// Holds an immutable compiled registry; two analyzers with different
/// registries can run concurrently without interfering.
pub struct Analyzer {
    registry: PatternRegistry,
    config: AnalyzerConfig,
}

impl Analyzer {
    #[must_use]
    pub fn new(registry: PatternRegistry) -> Self {
        Self::with_config(registry, AnalyzerConfig::default())
    }

    #[must_use]
    pub fn with_config(registry: PatternRegistry, config: AnalyzerConfig) -> Self {
        Self { registry, config }
    }

    #[must_use]
    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    /// Analyze one in-memory source string.
    ///
    /// Fails on unsupported languages and on syntax errors; use
    /// [`Analyzer::analyze_path`] for the degrade-per-file behavior.
    pub fn analyze_source(
        &self,
        source: &str,
        language: &str,
        display_name: &str,
    ) -> Result<AnalysisResult> {
        let tree = parse_named(source, language, display_name)?;
        let mut result = AnalysisResult::default();
        result.stats.files_scanned = 1;
        result.stats.files_analyzed = 1;
        self.analyze_tree(&tree, display_name, &mut result);
        result.finalize();
        Ok(result)
    }

    /// Analyze a file or directory tree.
    pub fn analyze_path(&self, path: &Path) -> Result<AnalysisResult> {
        if !path.exists() {
            return Err(ScoutError::InvalidArgument(format!(
                "path does not exist: {}",
                path.display()
            )));
        }

        let files = self.collect_files(path)?;
        debug!(files = files.len(), "starting analysis");

        let mut result = if files.len() >= PARALLEL_THRESHOLD {
            let total = Mutex::new(AnalysisResult::default());
            files.par_iter().for_each(|file| {
                if self.config.is_cancelled() {
                    return;
                }
                let report = self.analyze_file(file);
                if let Ok(mut guard) = total.lock() {
                    guard.merge(report);
                }
            });
            total.into_inner().unwrap_or_else(|e| e.into_inner())
        } else {
            let mut total = AnalysisResult::default();
            for file in &files {
                if self.config.is_cancelled() {
                    break;
                }
                total.merge(self.analyze_file(file));
            }
            total
        };

        result.finalize();
        Ok(result)
    }

    /// Discover analyzable files under `path`, honoring ignore files.
    fn collect_files(&self, path: &Path) -> Result<Vec<std::path::PathBuf>> {
        let languages = LanguageRegistry::global();
        if path.is_file() {
            return Ok(vec![path.to_path_buf()]);
        }

        let mut files = Vec::new();
        for entry in ignore::WalkBuilder::new(path).build() {
            let entry = entry.map_err(|e| ScoutError::InvalidArgument(e.to_string()))?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let file = entry.path();
            let supported =
                self.config.language.is_some() || languages.detect_language(file).is_some();
            if !supported {
                continue;
            }
            if let Ok(meta) = fs::metadata(file) {
                if meta.len() > self.config.max_file_size {
                    trace!(file = %file.display(), size = meta.len(), "skipping oversized file");
                    continue;
                }
            }
            files.push(file.to_path_buf());
        }
        // Walk order varies by platform; fix it before any fan-out.
        files.sort();
        Ok(files)
    }

    /// Analyze one file, converting every failure into a report entry.
    fn analyze_file(&self, path: &Path) -> AnalysisResult {
        let mut result = AnalysisResult::default();
        result.stats.files_scanned = 1;
        let display_name = path.display().to_string();

        let language = match &self.config.language {
            Some(lang) => lang.clone(),
            None => {
                let detected = LanguageRegistry::global()
                    .detect_language(path)
                    .map(|l| l.name().to_string());
                match detected {
                    Some(lang) => lang,
                    None => {
                        result.stats.files_failed += 1;
                        result.parse_failures.push(ParseFailure {
                            file: display_name,
                            message: "no language front-end for this file".to_string(),
                        });
                        return result;
                    }
                }
            }
        };

        let source = match fs::read_to_string(path).map_err(|e| ScoutError::io_with_path(e, path)) {
            Ok(source) => source,
            Err(e) => {
                warn!(file = %display_name, error = %e, "unreadable file skipped");
                result.stats.files_failed += 1;
                result.parse_failures.push(ParseFailure {
                    file: display_name,
                    message: e.to_string(),
                });
                return result;
            }
        };

        match parse_named(&source, &language, &display_name) {
            Ok(tree) => {
                result.stats.files_analyzed += 1;
                self.analyze_tree(&tree, &display_name, &mut result);
            }
            Err(e) => {
                warn!(file = %display_name, error = %e, "parse failure skipped");
                result.stats.files_failed += 1;
                result.parse_failures.push(ParseFailure {
                    file: display_name,
                    message: e.to_string(),
                });
            }
        }
        result
    }

    /// Run matching, scoring and opportunity detection over one tree.
    fn analyze_tree(&self, tree: &Node, file: &str, result: &mut AnalysisResult) {
        let index = KindIndex::build(tree);
        let engine = MatchEngine::new(self.config.max_expansions);

        for pattern in self.registry.patterns() {
            match engine.find_matches(pattern, &index) {
                Ok(matches) => {
                    for m in &matches {
                        let score = score_match(m);
                        if score.confidence < self.config.min_confidence {
                            continue;
                        }
                        trace!(
                            file,
                            pattern = %pattern.id,
                            confidence = score.confidence,
                            "match accepted"
                        );
                        result
                            .matches
                            .push(PatternMatch::from_structural(m, score, file));
                    }
                }
                Err(limit) => {
                    warn!(file, pattern = %pattern.id, %limit, "search budget exhausted");
                    result.search_failures.push(SearchFailure {
                        file: file.to_string(),
                        pattern_id: pattern.id.clone(),
                        limit: limit.limit,
                    });
                }
            }
        }

        for hit in detect_opportunities(tree, &self.registry) {
            if hit.confidence < self.config.min_confidence {
                continue;
            }
            result.opportunities.push(Opportunity::from_hit(hit, file));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADAPTER_SRC: &str = r#"
class PaymentAdapter:
    def __init__(self, gateway):
        self.gateway = gateway

    def charge(self, amount):
        return self.gateway.submit(amount)
"#;

    #[test]
    fn analyze_source_reports_adapter() {
        let analyzer = Analyzer::new(PatternRegistry::builtin());
        let result = analyzer
            .analyze_source(ADAPTER_SRC, "python", "payment.py")
            .unwrap();
        assert!(result
            .matches
            .iter()
            .any(|m| m.pattern_id == "adapter" && m.file == "payment.py"));
        assert_eq!(result.stats.files_analyzed, 1);
    }

    #[test]
    fn min_confidence_filters_matches() {
        let config = AnalyzerConfig::default().with_min_confidence(0.99);
        let analyzer = Analyzer::with_config(PatternRegistry::builtin(), config);
        let result = analyzer
            .analyze_source(ADAPTER_SRC, "python", "payment.py")
            .unwrap();
        assert!(result.matches.is_empty());
    }

    #[test]
    fn unsupported_language_is_an_error() {
        let analyzer = Analyzer::new(PatternRegistry::builtin());
        let err = analyzer
            .analyze_source("class A {}", "cobol", "a.cob")
            .unwrap_err();
        assert!(matches!(err, ScoutError::UnsupportedLanguage(_)));
    }

    #[test]
    fn cancelled_run_stops_early() {
        let cancel = Arc::new(AtomicBool::new(true));
        let config = AnalyzerConfig::default().with_cancel_flag(Arc::clone(&cancel));
        let analyzer = Analyzer::with_config(PatternRegistry::builtin(), config);

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), ADAPTER_SRC).unwrap();
        let result = analyzer.analyze_path(dir.path()).unwrap();
        assert_eq!(result.stats.files_scanned, 0);
    }
}

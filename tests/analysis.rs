//! End-to-end analysis behavior over real fixture sources.

use std::path::Path;

use patscout::{Analyzer, AnalyzerConfig, PatternRegistry, RegistryError};

fn analyzer() -> Analyzer {
    Analyzer::new(PatternRegistry::builtin())
}

const PY_ADAPTER: &str = r#"
class PaymentAdapter:
    def __init__(self, gateway):
        self.gateway = gateway

    def charge(self, amount):
        return self.gateway.submit(amount)
"#;

#[test]
fn canonical_adapter_is_detected_with_confidence() {
    let result = analyzer()
        .analyze_source(PY_ADAPTER, "python", "payment.py")
        .unwrap();
    let m = result
        .matches
        .iter()
        .find(|m| m.pattern_id == "adapter")
        .expect("adapter not detected");
    assert!(m.confidence >= 0.6, "confidence was {}", m.confidence);
    assert!(!m.evidence.is_empty());
    let adapter_role = m.roles.iter().find(|r| r.role == "adapter").unwrap();
    assert_eq!(adapter_role.name, "PaymentAdapter");
}

#[test]
fn plain_code_produces_no_findings() {
    let src = r#"
def total(items):
    acc = 0
    for item in items:
        acc = acc + item
    return acc

class Point:
    def __init__(self, x, y):
        self.x = x
        self.y = y
"#;
    let result = analyzer().analyze_source(src, "python", "plain.py").unwrap();
    assert!(result.matches.is_empty(), "matches: {:?}", result.matches);
    assert!(result.opportunities.is_empty());
}

#[test]
fn adapter_is_detected_in_typescript() {
    let src = r#"
class PaymentAdapter {
  private gateway: Gateway;

  constructor(gateway: Gateway) {
    this.gateway = gateway;
  }

  charge(amount: number): Receipt {
    return this.gateway.submit(amount);
  }
}
"#;
    let result = analyzer()
        .analyze_source(src, "typescript", "payment.ts")
        .unwrap();
    assert!(result.matches.iter().any(|m| m.pattern_id == "adapter"));
}

#[test]
fn adapter_is_detected_in_rust() {
    let src = r#"
struct PaymentAdapter {
    gateway: Gateway,
}

impl PaymentAdapter {
    fn charge(&self, amount: u32) -> Receipt {
        self.gateway.submit(amount)
    }
}
"#;
    let result = analyzer()
        .analyze_source(src, "rust", "payment.rs")
        .unwrap();
    assert!(result.matches.iter().any(|m| m.pattern_id == "adapter"));
}

#[test]
fn factory_method_is_detected_in_rust() {
    // The creating method returns via a trailing match, not an explicit
    // `return`; the implicit tail still counts as the factory's return.
    let src = r#"
struct ShapeFactory {
    default_radius: f64,
}

impl ShapeFactory {
    fn make(&self, kind: &str) -> Shape {
        match kind {
            "circle" => Circle::new(self.default_radius),
            "square" => Square::new(1.0),
            _ => Blob::new(),
        }
    }
}
"#;
    let result = analyzer()
        .analyze_source(src, "rust", "shapes.rs")
        .unwrap();
    let m = result
        .matches
        .iter()
        .find(|m| m.pattern_id == "factory-method")
        .expect("factory-method not detected");
    let create = m.roles.iter().find(|r| r.role == "create").unwrap();
    assert_eq!(create.name, "make");
}

#[test]
fn strategy_family_is_detected() {
    let src = r#"
class PricingStrategy:
    def execute(self, base):
        raise NotImplementedError

class FlatPricing(PricingStrategy):
    def execute(self, base):
        return base

class SurgePricing(PricingStrategy):
    def execute(self, base):
        return base

class PriceEngine:
    def __init__(self, strategy):
        self.strategy = strategy

    def run(self, base):
        return self.strategy.execute(base)
"#;
    let result = analyzer()
        .analyze_source(src, "python", "pricing.py")
        .unwrap();
    let m = result
        .matches
        .iter()
        .find(|m| m.pattern_id == "strategy")
        .expect("strategy not detected");
    let iface = m.roles.iter().find(|r| r.role == "strategy").unwrap();
    assert_eq!(iface.name, "PricingStrategy");
}

#[test]
fn observer_and_singleton_are_detected() {
    let src = r#"
class EventBus:
    def __init__(self):
        self.listeners = []

    def subscribe(self, fn):
        self.listeners.append(fn)

    def notify(self, event):
        for fn in self.listeners:
            fn(event)

class Config:
    _instance = None

    @classmethod
    def get_instance(cls):
        return cls._instance
"#;
    let result = analyzer().analyze_source(src, "python", "infra.py").unwrap();
    assert!(result.matches.iter().any(|m| m.pattern_id == "observer"));
    assert!(result.matches.iter().any(|m| m.pattern_id == "singleton"));
}

#[test]
fn wider_branching_raises_opportunity_confidence() {
    let two = r#"
def build(kind):
    if kind == "a":
        return Circle()
    else:
        return Square()
"#;
    let four = r#"
def build(kind):
    if kind == "a":
        return Circle()
    elif kind == "b":
        return Square()
    elif kind == "c":
        return Hexagon()
    else:
        return Blob()
"#;
    let a = analyzer();
    let low = a.analyze_source(two, "python", "two.py").unwrap();
    let high = a.analyze_source(four, "python", "four.py").unwrap();

    let low_conf = low
        .opportunities
        .iter()
        .find(|o| o.heuristic_id == "branchy-construction")
        .unwrap()
        .confidence;
    let high_conf = high
        .opportunities
        .iter()
        .find(|o| o.heuristic_id == "branchy-construction")
        .unwrap()
        .confidence;
    assert!(high_conf > low_conf);
    assert!(high_conf <= 0.95);
}

#[test]
fn detected_factory_suppresses_its_own_opportunity() {
    let src = r#"
class ShapeFactory:
    def create(self, kind):
        if kind == "circle":
            return Circle()
        else:
            return Square()
"#;
    let result = analyzer()
        .analyze_source(src, "python", "shapes.py")
        .unwrap();
    assert!(result.matches.iter().any(|m| m.pattern_id == "factory-method"));
    assert!(
        result
            .opportunities
            .iter()
            .all(|o| o.suggests != "factory-method"),
        "opportunity should be subsumed by the detected pattern"
    );
}

#[test]
fn free_function_factory_opportunity_survives() {
    let src = r#"
def build(kind):
    if kind == "circle":
        return Circle()
    else:
        return Square()
"#;
    let result = analyzer()
        .analyze_source(src, "python", "shapes.py")
        .unwrap();
    assert!(result.matches.is_empty());
    assert!(result
        .opportunities
        .iter()
        .any(|o| o.suggests == "factory-method"));
}

#[test]
fn broken_file_degrades_gracefully() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("good.py"), PY_ADAPTER).unwrap();
    std::fs::write(dir.path().join("broken.py"), "def broken(:\n").unwrap();
    std::fs::write(dir.path().join("plain.py"), "x = 1\n").unwrap();

    let result = analyzer().analyze_path(dir.path()).unwrap();
    assert_eq!(result.stats.files_scanned, 3);
    assert_eq!(result.stats.files_analyzed, 2);
    assert_eq!(result.stats.files_failed, 1);
    assert_eq!(result.parse_failures.len(), 1);
    assert!(result.parse_failures[0].file.ends_with("broken.py"));
    assert!(result.matches.iter().any(|m| m.pattern_id == "adapter"));
}

#[test]
fn repeated_runs_serialize_identically() {
    let dir = tempfile::tempdir().unwrap();
    // Enough files to push the run onto the parallel path.
    for i in 0..9 {
        let body = format!(
            "class Adapter{i}:\n    def __init__(self, inner):\n        self.inner = inner\n\n    def go(self):\n        return self.inner.go()\n"
        );
        std::fs::write(dir.path().join(format!("m{i}.py")), body).unwrap();
    }

    let a = analyzer();
    let first = serde_json::to_string(&a.analyze_path(dir.path()).unwrap()).unwrap();
    let second = serde_json::to_string(&a.analyze_path(dir.path()).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn missing_path_is_an_error() {
    let err = analyzer()
        .analyze_path(Path::new("/definitely/not/here"))
        .unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[test]
fn custom_registry_reshapes_the_analysis() {
    let json = r#"{
        "patterns": [{
            "id": "any-class",
            "name": "Any Class",
            "category": "structural",
            "roles": ["it"],
            "clauses": [
                {"pred": "kind-equality", "role": "it", "kind": "class_definition"}
            ]
        }]
    }"#;
    let registry = PatternRegistry::from_json_str(json).unwrap();
    let analyzer = Analyzer::new(registry);
    let result = analyzer
        .analyze_source("class A:\n    pass\n", "python", "a.py")
        .unwrap();
    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.matches[0].pattern_id, "any-class");
    // No heuristics loaded, so no opportunities either.
    assert!(result.opportunities.is_empty());
}

#[test]
fn invalid_definitions_are_rejected_at_load() {
    let json = r#"{
        "patterns": [{
            "id": "bad",
            "name": "Bad",
            "category": "structural",
            "roles": ["a", "ghost"],
            "clauses": [
                {"pred": "kind-equality", "role": "a", "kind": "class_definition"},
                {"pred": "delegates-to-role", "role": "a", "to": "ghost"}
            ]
        }]
    }"#;
    let err = PatternRegistry::from_json_str(json).unwrap_err();
    assert!(matches!(err, RegistryError::UnboundRole { ref role, .. } if role == "ghost"));
}

#[test]
fn low_threshold_admits_opportunities_high_threshold_rejects() {
    let src = r#"
def build(kind):
    if kind == "a":
        return Circle()
    else:
        return Square()
"#;
    let strict = Analyzer::with_config(
        PatternRegistry::builtin(),
        AnalyzerConfig::default().with_min_confidence(0.9),
    );
    let result = strict.analyze_source(src, "python", "b.py").unwrap();
    assert!(result.opportunities.is_empty());

    let lax = Analyzer::with_config(
        PatternRegistry::builtin(),
        AnalyzerConfig::default().with_min_confidence(0.3),
    );
    let result = lax.analyze_source(src, "python", "b.py").unwrap();
    assert!(!result.opportunities.is_empty());
}

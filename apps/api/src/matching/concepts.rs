//! Concept registry: the fixed, typed set of weighted concepts a resume is scored against.
//!
//! Built once at startup (either the built-in catalog or a JSON file) and shared read-only
//! by every evaluation. All validation happens in `ConceptRegistry::new`, so a registry that
//! exists is always internally consistent: unique keys, positive weights, at least one usable
//! synonym per concept, and an advanced signal that points at a real concept.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matching::normalize::normalize_text;

/// Concept tier. Ordering matters: `Basic < Core < Advanced` drives tier inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Basic,
    Core,
    Advanced,
}

/// A single registry entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub key: String,
    pub label: String,
    pub tier: Tier,
    pub weight: f64,
    pub synonyms: Vec<String>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("concept at position {0} has an empty key")]
    EmptyKey(usize),

    #[error("concept '{0}' has an empty label")]
    EmptyLabel(String),

    #[error("duplicate concept key '{0}'")]
    DuplicateKey(String),

    #[error("concept '{key}' has invalid weight {weight}; weights must be positive and finite")]
    InvalidWeight { key: String, weight: f64 },

    #[error("concept '{0}' has no usable synonym after normalization")]
    NoSynonyms(String),

    #[error("advanced signal '{0}' is not a registered concept")]
    UnknownSignal(String),

    #[error("advanced signal '{0}' must be an advanced-tier concept")]
    SignalNotAdvanced(String),

    #[error("concept '{0}' implied by the advanced signal is not registered")]
    UnknownImplied(String),

    #[error("failed to read concept registry: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse concept registry: {0}")]
    Parse(#[from] serde_json::Error),
}

/// On-disk registry layout (`CONCEPTS_PATH`).
#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    advanced_signal: Option<String>,
    #[serde(default)]
    implied_by_signal: Vec<String>,
    concepts: Vec<Concept>,
}

/// Immutable, validated concept registry.
#[derive(Debug, Clone, Serialize)]
pub struct ConceptRegistry {
    concepts: Vec<Concept>,
    advanced_signal: Option<String>,
    implied_by_signal: Vec<String>,
    /// Normalized synonyms, parallel to `concepts`. Each pair is (original, normalized).
    #[serde(skip)]
    phrases: Vec<Vec<(String, String)>>,
}

impl ConceptRegistry {
    /// Validates and builds a registry.
    ///
    /// Synonyms are deduplicated (first occurrence wins) and pre-normalized so the matcher
    /// never re-normalizes a phrase per evaluation.
    pub fn new(
        concepts: Vec<Concept>,
        advanced_signal: Option<String>,
        implied_by_signal: Vec<String>,
    ) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        let mut phrases = Vec::with_capacity(concepts.len());

        for (idx, concept) in concepts.iter().enumerate() {
            if concept.key.trim().is_empty() {
                return Err(RegistryError::EmptyKey(idx));
            }
            if concept.label.trim().is_empty() {
                return Err(RegistryError::EmptyLabel(concept.key.clone()));
            }
            if !seen.insert(concept.key.as_str()) {
                return Err(RegistryError::DuplicateKey(concept.key.clone()));
            }
            if !concept.weight.is_finite() || concept.weight <= 0.0 {
                return Err(RegistryError::InvalidWeight {
                    key: concept.key.clone(),
                    weight: concept.weight,
                });
            }

            let compiled = compile_phrases(&concept.synonyms);
            if compiled.is_empty() {
                return Err(RegistryError::NoSynonyms(concept.key.clone()));
            }
            phrases.push(compiled);
        }

        if let Some(signal) = &advanced_signal {
            let concept = concepts
                .iter()
                .find(|c| &c.key == signal)
                .ok_or_else(|| RegistryError::UnknownSignal(signal.clone()))?;
            if concept.tier != Tier::Advanced {
                return Err(RegistryError::SignalNotAdvanced(signal.clone()));
            }
        }

        if let Some(missing) = implied_by_signal.iter().find(|k| !seen.contains(k.as_str())) {
            return Err(RegistryError::UnknownImplied(missing.clone()));
        }

        Ok(Self {
            concepts,
            advanced_signal,
            implied_by_signal,
            phrases,
        })
    }

    /// Loads a registry from a JSON file and validates it.
    pub fn from_path(path: &Path) -> Result<Self, RegistryError> {
        let raw = std::fs::read_to_string(path)?;
        let file: RegistryFile = serde_json::from_str(&raw)?;
        Self::new(file.concepts, file.advanced_signal, file.implied_by_signal)
    }

    /// The built-in catalog used when no registry file is configured.
    pub fn builtin() -> Self {
        let concepts = builtin_concepts();
        let phrases = concepts.iter().map(|c| compile_phrases(&c.synonyms)).collect();
        Self {
            concepts,
            advanced_signal: Some(ADVANCED_SIGNAL.to_string()),
            implied_by_signal: IMPLIED_BY_SIGNAL.iter().map(|k| k.to_string()).collect(),
            phrases,
        }
    }

    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Concept> {
        self.concepts.iter().find(|c| c.key == key)
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.concepts.iter().position(|c| c.key == key)
    }

    pub fn advanced_signal(&self) -> Option<&str> {
        self.advanced_signal.as_deref()
    }

    pub fn implied_by_signal(&self) -> &[String] {
        &self.implied_by_signal
    }

    /// (original, normalized) synonym pairs for the concept at `idx`.
    pub(crate) fn phrases(&self, idx: usize) -> &[(String, String)] {
        &self.phrases[idx]
    }

    /// Sum of raw (unscaled) weights.
    pub fn total_weight(&self) -> f64 {
        self.concepts.iter().map(|c| c.weight).sum()
    }
}

fn compile_phrases(synonyms: &[String]) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    synonyms
        .iter()
        .filter_map(|s| {
            let normalized = normalize_text(s);
            if normalized.is_empty() || !seen.insert(normalized.clone()) {
                return None;
            }
            Some((s.clone(), normalized))
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Built-in catalog
// ────────────────────────────────────────────────────────────────────────────

pub const ADVANCED_SIGNAL: &str = "advanced_engineering";

/// Core practices that advanced engineering evidence implies.
///
/// Coupled to concept keys by name; `ConceptRegistry::new` rejects a registry where any of
/// these keys is missing.
pub const IMPLIED_BY_SIGNAL: &[&str] = &["debugging", "testing", "version_control", "clean_code"];

type CatalogRow = (&'static str, &'static str, Tier, f64, &'static [&'static str]);

const CATALOG: &[CatalogRow] = &[
    (
        "debugging",
        "Debugging / fixing issues",
        Tier::Core,
        1.0,
        &[
            "debugging", "debugged", "fix bugs", "fixed bugs", "fix issues", "bug fixes",
            "bug-fixes", "bug fixing", "resolved defects", "troubleshoot", "troubleshooting",
            "resolve issues", "resolved issues", "fixing issues", "bugfix", "bug fix", "bug-fix",
            "bugfixes", "fixing technical issues", "technical issues", "api errors",
            "reduce api errors", "production issues", "issue resolution", "bug triage",
            "fixing code", "stability fixes",
        ],
    ),
    (
        "testing",
        "Testing / writing tests",
        Tier::Core,
        1.0,
        &[
            "unit test", "unit tests", "integration test", "integration tests", "automated tests",
            "qa testing", "qa", "test coverage", "tested features", "wrote tests", "test cases",
            "verification", "unit testing", "test automation", "quality assurance",
            "testing features", "tests", "testing", "test suites", "playwright", "pytest", "jest",
            "smoke tests", "regression tests", "test plan", "test scripts",
        ],
    ),
    (
        "version_control",
        "Version control (Git/GitHub)",
        Tier::Core,
        1.0,
        &[
            "git", "github", "gitlab", "bitbucket", "version control", "git workflow",
            "git workflows", "git flow", "github flow", "git version control", "source control",
            "merge request", "pull request", "git branching", "git repos", "git repository",
            "git repositories", "git commits", "branch strategy", "code reviews", "pr reviews",
            "git operations",
        ],
    ),
    (
        "teamwork",
        "Team collaboration",
        Tier::Core,
        0.9,
        &[
            "collaborated", "cross functional", "team meetings", "team meeting", "standups",
            "standup", "scrum meetings", "scrum", "pair programming", "paired with",
            "worked with team", "worked with teammates", "collaboration", "team sync",
            "collaborated in team meetings", "teamwork", "teammates meetings",
            "stakeholder updates", "project updates", "sprint ceremonies",
        ],
    ),
    (
        "assigned_tasks",
        "Assigned tasks / feature work",
        Tier::Basic,
        0.6,
        &[
            "assigned tasks", "assigned work", "project tasks", "feature work",
            "implement features", "ticket", "jira ticket", "story points", "backlog item",
            "user stories", "tasks", "task list", "deliverables", "sprint tasks", "work items",
        ],
    ),
    (
        "clean_code",
        "Clean, maintainable code",
        Tier::Core,
        0.7,
        &[
            "clean code", "maintainable code", "readable code", "refactored code", "code quality",
            "linting", "code cleanup", "refactoring", "codebase hygiene", "style guide",
        ],
    ),
    (
        "learning_mindset",
        "Learning mindset",
        Tier::Basic,
        0.5,
        &[
            "learning new tools", "self learning", "self-taught", "curious", "eager to learn",
            "willingness to learn", "explore new tools", "research new tech", "learning mindset",
            "continuous learning",
        ],
    ),
    (
        "programming_fundamentals",
        "Programming fundamentals",
        Tier::Basic,
        1.0,
        &[
            "python", "javascript", "typescript", "java", "c++", "c#", "go", "loops", "functions",
            "data structures", "algorithms", "variables", "control flow", "conditionals",
            "recursion", "object oriented", "oop", "classes", "ds&a", "fundamentals",
        ],
    ),
    (
        "web_fundamentals",
        "Web/app fundamentals",
        Tier::Basic,
        0.8,
        &[
            "html", "css", "frontend", "backend", "api", "rest api", "database", "sql", "nosql",
            "express", "react", "django", "flask", "full stack", "client server", "http",
            "deployment", "hosting", "web app", "web application", "server side", "client side",
        ],
    ),
    (
        "advanced_engineering",
        "Advanced engineering experience",
        Tier::Advanced,
        0.6,
        &[
            "production", "deployment", "scalability", "microservices", "distributed systems",
            "cloud", "kubernetes", "docker", "cicd", "continuous integration",
            "continuous deployment", "mlops", "devops", "system design", "architecture",
            "high availability",
        ],
    ),
];

fn builtin_concepts() -> Vec<Concept> {
    CATALOG
        .iter()
        .map(|(key, label, tier, weight, synonyms)| Concept {
            key: key.to_string(),
            label: label.to_string(),
            tier: *tier,
            weight: *weight,
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn concept(key: &str, tier: Tier, weight: f64, synonyms: &[&str]) -> Concept {
        Concept {
            key: key.to_string(),
            label: format!("{key} label"),
            tier,
            weight,
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_builtin_catalog_passes_validation() {
        let validated = ConceptRegistry::new(
            builtin_concepts(),
            Some(ADVANCED_SIGNAL.to_string()),
            IMPLIED_BY_SIGNAL.iter().map(|k| k.to_string()).collect(),
        );
        assert!(validated.is_ok(), "{:?}", validated.err());
    }

    #[test]
    fn test_builtin_has_ten_concepts_and_signal() {
        let registry = ConceptRegistry::builtin();
        assert_eq!(registry.len(), 10);
        assert_eq!(registry.advanced_signal(), Some("advanced_engineering"));
        assert_eq!(registry.get("advanced_engineering").unwrap().tier, Tier::Advanced);
        assert!((registry.total_weight() - 8.1).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_synonyms_collapse() {
        let registry = ConceptRegistry::builtin();
        let idx = registry.index_of("version_control").unwrap();
        let workflows = registry
            .phrases(idx)
            .iter()
            .filter(|(_, n)| n == "git workflows")
            .count();
        assert_eq!(workflows, 1);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let err = ConceptRegistry::new(
            vec![
                concept("rust", Tier::Core, 1.0, &["rust"]),
                concept("rust", Tier::Basic, 1.0, &["cargo"]),
            ],
            None,
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateKey(k) if k == "rust"));
    }

    #[test]
    fn test_non_positive_weight_rejected() {
        let err = ConceptRegistry::new(vec![concept("rust", Tier::Core, 0.0, &["rust"])], None, vec![])
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidWeight { .. }));

        let err =
            ConceptRegistry::new(vec![concept("rust", Tier::Core, f64::NAN, &["rust"])], None, vec![])
                .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidWeight { .. }));
    }

    #[test]
    fn test_concept_without_usable_synonym_rejected() {
        let err = ConceptRegistry::new(vec![concept("noise", Tier::Core, 1.0, &["!!!", "  "])], None, vec![])
            .unwrap_err();
        assert!(matches!(err, RegistryError::NoSynonyms(k) if k == "noise"));
    }

    #[test]
    fn test_signal_must_exist_and_be_advanced() {
        let err = ConceptRegistry::new(
            vec![concept("rust", Tier::Core, 1.0, &["rust"])],
            Some("cloud".to_string()),
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownSignal(_)));

        let err = ConceptRegistry::new(
            vec![concept("rust", Tier::Core, 1.0, &["rust"])],
            Some("rust".to_string()),
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::SignalNotAdvanced(_)));
    }

    #[test]
    fn test_implied_keys_must_exist() {
        let err = ConceptRegistry::new(
            vec![concept("cloud", Tier::Advanced, 1.0, &["cloud"])],
            Some("cloud".to_string()),
            vec!["debugging".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownImplied(k) if k == "debugging"));
    }

    #[test]
    fn test_empty_registry_is_allowed() {
        let registry = ConceptRegistry::new(vec![], None, vec![]).unwrap();
        assert!(registry.is_empty());
        assert_eq!(registry.total_weight(), 0.0);
    }

    #[test]
    fn test_from_path_loads_json_registry() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "advanced_signal": "cloud",
                "implied_by_signal": ["ops"],
                "concepts": [
                    {{"key": "ops", "label": "Operations", "tier": "core", "weight": 1.0, "synonyms": ["on-call"]}},
                    {{"key": "cloud", "label": "Cloud", "tier": "advanced", "weight": 2.0, "synonyms": ["AWS", "gcp"]}}
                ]
            }}"#
        )
        .unwrap();

        let registry = ConceptRegistry::from_path(file.path()).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.advanced_signal(), Some("cloud"));
        let idx = registry.index_of("cloud").unwrap();
        assert_eq!(registry.phrases(idx)[0], ("AWS".to_string(), "aws".to_string()));
    }

    #[test]
    fn test_from_path_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = ConceptRegistry::from_path(file.path()).unwrap_err();
        assert!(matches!(err, RegistryError::Parse(_)));
    }

    #[test]
    fn test_from_path_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConceptRegistry::from_path(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, RegistryError::Io(_)));
    }
}

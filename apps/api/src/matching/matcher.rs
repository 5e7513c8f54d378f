//! Concept Matcher: scores resume text against the concept registry.
//!
//! `ConceptMatcher` is the default `FitScorer`. It is pure with respect to its inputs: the
//! registry is immutable after construction and the only shared mutable state is the
//! embedding memo inside `EmbeddingService`, which is internally locked.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embedding::EmbeddingService;
use crate::matching::concepts::{ConceptRegistry, Tier};
use crate::matching::levels::{resolve_level, InternLevel, LevelMultipliers};
use crate::matching::normalize::{chunk_text, normalize_text, phrase_present};

// ────────────────────────────────────────────────────────────────────────────
// Output data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    None,
    Exact,
    Semantic,
}

/// Outcome of matching one concept against the resume, before tier inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub key: String,
    pub label: String,
    pub found: bool,
    pub method: MatchMethod,
    pub matched_phrase: Option<String>,
    /// Similarity in [0, 1]; 0 unless `method == Semantic`.
    pub semantic_score: f32,
}

impl MatchResult {
    fn unmatched(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            found: false,
            method: MatchMethod::None,
            matched_phrase: None,
            semantic_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    /// 0 – 100
    pub score: u32,
    /// Labels of concepts still unmatched after tier inference.
    pub missing: Vec<String>,
    /// Concepts found directly in the resume (exact or semantic).
    pub matches: Vec<MatchResult>,
    /// Keys of concepts credited only through tier inference.
    pub inferred: Vec<String>,
    pub level: InternLevel,
    pub recency_boost: bool,
    pub impact_boost: bool,
    pub scorer_backend: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Fit scoring seam used by the evaluator. Swap implementations without touching callers.
pub trait FitScorer: Send + Sync {
    fn evaluate(&self, resume_text: &str, job_text: &str, level_hint: &str) -> FitReport;

    /// Stable identifier folded into result cache keys.
    fn fingerprint(&self) -> String;
}

// ────────────────────────────────────────────────────────────────────────────
// Scoring constants
// ────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_SEMANTIC_THRESHOLD: f32 = 0.62;

const RECENCY_BOOST: u32 = 4;
const IMPACT_BOOST: u32 = 5;
const ENTRY_TIER_FLOOR: u32 = 98;
const GENERAL_FLOOR: u32 = 95;

struct BoostPatterns {
    recent_year: Regex,
    impact_metric: Regex,
}

static BOOST_PATTERNS: OnceLock<BoostPatterns> = OnceLock::new();

fn boost_patterns() -> &'static BoostPatterns {
    BOOST_PATTERNS.get_or_init(|| BoostPatterns {
        // 2023 to 2039, also glued to letters as in "FY2024" or "2024Q1", never inside a longer number
        recent_year: Regex::new(r"(?:^|\D)20(?:2[3-9]|3[0-9])(?:\D|$)").expect("recent_year regex must compile"),
        impact_metric: Regex::new(r"\b\d+(?:\.\d+)?\s?(?:%|percent\b|k\b|m\b|million\b|billion\b)")
            .expect("impact_metric regex must compile"),
    })
}

/// (has a recent year, has a quantified outcome)
pub fn detect_recency_and_impact(resume_text: &str) -> (bool, bool) {
    let patterns = boost_patterns();
    let lower = resume_text.to_lowercase();
    (
        patterns.recent_year.is_match(resume_text),
        patterns.impact_metric.is_match(&lower),
    )
}

// ────────────────────────────────────────────────────────────────────────────
// ConceptMatcher
// ────────────────────────────────────────────────────────────────────────────

pub struct ConceptMatcher {
    registry: Arc<ConceptRegistry>,
    embeddings: Arc<EmbeddingService>,
    semantic_threshold: f32,
    multipliers: LevelMultipliers,
}

impl ConceptMatcher {
    pub fn new(
        registry: Arc<ConceptRegistry>,
        embeddings: Arc<EmbeddingService>,
        semantic_threshold: f32,
        multipliers: LevelMultipliers,
    ) -> Self {
        if !embeddings.is_available() {
            tracing::warn!("Semantic model unavailable; concept matching is exact-only");
        }
        Self {
            registry,
            embeddings,
            semantic_threshold,
            multipliers,
        }
    }

    fn match_concept(&self, idx: usize, normalized_resume: &str, chunks: &[String]) -> MatchResult {
        let concept = &self.registry.concepts()[idx];
        let phrases = self.registry.phrases(idx);

        // only the resume can satisfy a concept; job text never does
        if let Some((original, _)) = phrases
            .iter()
            .find(|(_, normalized)| phrase_present(normalized_resume, normalized))
        {
            return MatchResult {
                found: true,
                method: MatchMethod::Exact,
                matched_phrase: Some(original.clone()),
                ..MatchResult::unmatched(&concept.key, &concept.label)
            };
        }

        if chunks.is_empty() {
            return MatchResult::unmatched(&concept.key, &concept.label);
        }

        let mut best: Option<(f32, String)> = None;
        for (original, _) in phrases {
            let hit = self
                .embeddings
                .any_above_threshold(original, chunks, self.semantic_threshold);
            if !hit.hit {
                continue;
            }
            if best.as_ref().map_or(true, |(score, _)| hit.score > *score) {
                best = hit.phrase.map(|phrase| (hit.score, phrase));
            }
        }

        match best {
            Some((score, phrase)) => MatchResult {
                found: true,
                method: MatchMethod::Semantic,
                matched_phrase: Some(phrase),
                semantic_score: score.clamp(0.0, 1.0),
                ..MatchResult::unmatched(&concept.key, &concept.label)
            },
            None => MatchResult::unmatched(&concept.key, &concept.label),
        }
    }
}

/// Applies the tier-inference rules to the directly matched set.
///
/// 1. The advanced signal implies the registry's designated core practices.
/// 2. Any core-or-higher match implies every basic concept.
/// 3. Any advanced match implies every core concept.
///
/// Rules only add; the result is always a superset of `direct`.
pub fn infer_tiers(registry: &ConceptRegistry, direct: &[bool]) -> Vec<bool> {
    let mut found = direct.to_vec();
    let concepts = registry.concepts();

    let highest = concepts
        .iter()
        .zip(direct)
        .filter(|&(_, &hit)| hit)
        .map(|(c, _)| c.tier)
        .max();

    let signal_hit = registry
        .advanced_signal()
        .and_then(|key| registry.index_of(key))
        .is_some_and(|idx| direct[idx]);
    if signal_hit {
        for key in registry.implied_by_signal() {
            if let Some(idx) = registry.index_of(key) {
                found[idx] = true;
            }
        }
    }

    if highest >= Some(Tier::Core) {
        for (idx, concept) in concepts.iter().enumerate() {
            if concept.tier == Tier::Basic {
                found[idx] = true;
            }
        }
    }

    if highest >= Some(Tier::Advanced) {
        for (idx, concept) in concepts.iter().enumerate() {
            if concept.tier == Tier::Core {
                found[idx] = true;
            }
        }
    }

    found
}

/// `round(100 × matched / total)` clamped to [0, 100]; 0 when there is no weight at all.
fn coverage_score(matched_weight: f64, total_weight: f64) -> u32 {
    if total_weight <= 0.0 {
        return 0;
    }
    ((matched_weight / total_weight) * 100.0).clamp(0.0, 100.0).round() as u32
}

impl FitScorer for ConceptMatcher {
    fn evaluate(&self, resume_text: &str, job_text: &str, level_hint: &str) -> FitReport {
        let normalized_resume = normalize_text(resume_text);
        let normalized_job = normalize_text(job_text);

        let level = resolve_level(level_hint, &normalized_resume, &normalized_job);
        let multiplier = self.multipliers.get(level);

        let chunks = if self.embeddings.is_available() {
            chunk_text(resume_text)
        } else {
            Vec::new()
        };

        let results: Vec<MatchResult> = (0..self.registry.len())
            .map(|idx| self.match_concept(idx, &normalized_resume, &chunks))
            .collect();
        let direct: Vec<bool> = results.iter().map(|r| r.found).collect();
        let found = infer_tiers(&self.registry, &direct);

        let concepts = self.registry.concepts();
        let total_weight: f64 = concepts.iter().map(|c| c.weight * multiplier).sum();
        let matched_weight: f64 = concepts
            .iter()
            .zip(&found)
            .filter(|&(_, &hit)| hit)
            .map(|(c, _)| c.weight * multiplier)
            .sum();

        let mut score = coverage_score(matched_weight, total_weight);

        let (recent, impact) = detect_recency_and_impact(resume_text);
        if recent {
            score = (score + RECENCY_BOOST).min(100);
        }
        if impact {
            score = (score + IMPACT_BOOST).min(100);
        }

        let advanced_hit = concepts
            .iter()
            .zip(&direct)
            .any(|(c, &hit)| hit && c.tier == Tier::Advanced);
        if advanced_hit {
            let floor = if level.is_entry_tier() {
                Some(ENTRY_TIER_FLOOR)
            } else if level == InternLevel::General {
                Some(GENERAL_FLOOR)
            } else {
                None
            };
            if let Some(floor) = floor {
                score = score.max(floor).min(100);
            }
        }

        let missing = concepts
            .iter()
            .zip(&found)
            .filter(|&(_, &hit)| !hit)
            .map(|(c, _)| c.label.clone())
            .collect();
        let inferred = concepts
            .iter()
            .zip(direct.iter().zip(&found))
            .filter(|&(_, (&was, &now))| now && !was)
            .map(|(c, _)| c.key.clone())
            .collect();

        debug!(
            level = %level,
            direct = direct.iter().filter(|&&d| d).count(),
            after_inference = found.iter().filter(|&&f| f).count(),
            recent,
            impact,
            score,
            "concept evaluation complete"
        );

        FitReport {
            score,
            missing,
            matches: results.into_iter().filter(|r| r.found).collect(),
            inferred,
            level,
            recency_boost: recent,
            impact_boost: impact,
            scorer_backend: if self.embeddings.is_available() {
                "exact+semantic".to_string()
            } else {
                "exact".to_string()
            },
        }
    }

    fn fingerprint(&self) -> String {
        format!(
            "concepts:{}:{}|threshold:{}|levels:{:?}|embeddings:{}",
            self.registry.len(),
            self.registry.total_weight(),
            self.semantic_threshold,
            self.multipliers,
            self.embeddings.model_id()
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

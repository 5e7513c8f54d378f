use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::cache::TtlCache;
use crate::config::EngineConfig;
use crate::embedding::{EmbeddingService, SimilarityProvider};
use crate::matching::concepts::ConceptRegistry;
use crate::matching::matcher::{ConceptMatcher, FitReport, FitScorer};
use crate::quality::gate::{QualityGate, QualityReport};
use crate::quality::pii::scrub_pii;

/// Folded into every cache key so a new release never serves results from an older engine.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

const KEY_SEPARATOR: &[u8] = b"\x1f";
const LOG_PREVIEW_CHARS: usize = 80;
const MAX_SUGGESTED_LABELS: usize = 4;
const MAX_RECOMMENDED_LABELS: usize = 3;

pub const SUMMARY: &str = "Concept-coverage analysis. Improve by covering missing concepts, \
quantifying outcomes, and highlighting tests/debugging.";

// Fixed sub-scores for dimensions plain text cannot measure.
const STRUCTURE_SCORE: u32 = 75;
const CLARITY_SCORE: u32 = 78;
const PRESENTATION_SCORE: u32 = 76;

// ────────────────────────────────────────────────────────────────────────────
// Request / response models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationRequest {
    #[serde(default)]
    pub resume_text: String,
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub intern_level: Option<String>,
    #[serde(default)]
    pub bypass_cache: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Hit,
    Miss,
    Bypass,
}

/// Per-dimension scores derived from the concept coverage score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub job_compatibility: u32,
    pub structure: u32,
    pub skills_relevance: u32,
    pub experience_relevance: u32,
    pub keyword_match: u32,
    pub clarity: u32,
    pub strength_comparison: u32,
    pub presentation: u32,
    pub improvement_readiness: u32,
    pub overall_impact: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub evaluation_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    pub scores: ScoreBreakdown,
    pub summary: String,
    pub fit: FitReport,
    pub quality: QualityReport,
    pub suggestions: Vec<String>,
    pub recommendation: String,
    pub cache_status: CacheStatus,
}

// ────────────────────────────────────────────────────────────────────────────
// Evaluator
// ────────────────────────────────────────────────────────────────────────────

/// Runs one evaluation end to end. Shared across requests; internally synchronized.
pub struct Evaluator {
    scorer: Arc<dyn FitScorer>,
    gate: QualityGate,
    cache: TtlCache<EvaluationResult>,
    max_text_length: usize,
    embedding_model_id: String,
}

impl Evaluator {
    /// Wires the default `ConceptMatcher` over `registry` with the configured embedding model.
    pub fn new(config: &EngineConfig, registry: Arc<ConceptRegistry>) -> Self {
        let provider = SimilarityProvider::load(&config.embedding_model);
        let embeddings = Arc::new(EmbeddingService::new(provider, config.embedding_cache_capacity));
        let matcher = ConceptMatcher::new(
            registry,
            embeddings,
            config.semantic_threshold,
            config.level_multipliers.clone(),
        );
        Self::with_scorer(config, Arc::new(matcher))
    }

    pub fn with_scorer(config: &EngineConfig, scorer: Arc<dyn FitScorer>) -> Self {
        let embedding_model_id = if config.embedding_model.trim().is_empty() {
            "none".to_string()
        } else {
            config.embedding_model.trim().to_lowercase()
        };
        Self {
            scorer,
            gate: QualityGate::new(
                config.max_text_length,
                config.hallucination_floor,
                config.location_keywords.clone(),
            ),
            cache: TtlCache::new(config.cache_ttl, config.cache_capacity),
            max_text_length: config.max_text_length,
            embedding_model_id,
        }
    }

    pub fn evaluate(&self, request: &EvaluationRequest) -> EvaluationResult {
        let resume = truncate_chars(&request.resume_text, self.max_text_length);
        let level_hint = request.intern_level.as_deref().unwrap_or("");
        let key = self.cache_key(&request.job_description, resume, level_hint);

        if !request.bypass_cache {
            if let Some(mut cached) = self.cache.get(&key) {
                debug!(cache_key = %&key[..12], "evaluation cache hit");
                cached.cache_status = CacheStatus::Hit;
                return cached;
            }
        }

        debug!(
            cache_key = %&key[..12],
            bypass = request.bypass_cache,
            resume_preview = %preview(resume),
            "evaluating resume"
        );

        let fit = self.scorer.evaluate(resume, &request.job_description, level_hint);
        let quality = self
            .gate
            .run(&request.resume_text, &request.job_description, &fit.matches);
        let suggestions = build_suggestions(&fit);
        let recommendation = build_recommendation(fit.score, &fit.missing);

        let result = EvaluationResult {
            evaluation_id: Uuid::new_v4(),
            evaluated_at: Utc::now(),
            scores: build_score_breakdown(fit.score),
            summary: SUMMARY.to_string(),
            fit,
            quality,
            suggestions,
            recommendation,
            cache_status: if request.bypass_cache {
                CacheStatus::Bypass
            } else {
                CacheStatus::Miss
            },
        };

        self.cache.set(key, result.clone());
        debug!(cached_results = self.cache.entry_count(), score = result.fit.score, "evaluation stored");
        result
    }

    /// SHA-256 hex over every input that can change the result.
    fn cache_key(&self, job_text: &str, resume_text: &str, level_hint: &str) -> String {
        let fingerprint = self.scorer.fingerprint();
        let mut hasher = Sha256::new();
        for part in [
            job_text,
            resume_text,
            level_hint.trim(),
            self.embedding_model_id.as_str(),
            ENGINE_VERSION,
            fingerprint.as_str(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update(KEY_SEPARATOR);
        }
        let digest = hasher.finalize();

        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(hex, "{byte:02x}");
        }
        hex
    }
}

/// Longest prefix of `text` with at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn preview(text: &str) -> String {
    scrub_pii(truncate_chars(text, LOG_PREVIEW_CHARS)).replace('\n', " ")
}

// ────────────────────────────────────────────────────────────────────────────
// Suggestions and recommendation
// ────────────────────────────────────────────────────────────────────────────

pub fn build_suggestions(fit: &FitReport) -> Vec<String> {
    let mut suggestions = Vec::new();
    if !fit.missing.is_empty() {
        let labels: Vec<&str> = fit
            .missing
            .iter()
            .take(MAX_SUGGESTED_LABELS)
            .map(String::as_str)
            .collect();
        suggestions.push(format!(
            "Add 2-3 bullets demonstrating {} with ownership + metrics.",
            labels.join(", ")
        ));
    }
    if fit.score < 85 {
        suggestions.push("Add 1-2 lines on testing/debugging (e.g., unit tests, root-cause fixes).".to_string());
    }
    if fit.score < 90 {
        suggestions.push("Quantify impact (latency, users, revenue, error-rate) per project.".to_string());
    }
    suggestions.push("Ensure each project lists tech stack, tests, and debugging outcomes.".to_string());
    suggestions
}

/// `round(coverage × factor + offset)` clamped to `[lo, hi]`. Ties round to even.
fn scaled(coverage: u32, factor: f64, offset: f64, lo: u32, hi: u32) -> u32 {
    let value = (f64::from(coverage) * factor + offset).round_ties_even();
    (value.max(0.0) as u32).clamp(lo, hi)
}

pub fn build_score_breakdown(coverage: u32) -> ScoreBreakdown {
    let job_compatibility = scaled(coverage, 0.8, 20.0, 40, 95);
    let skills_relevance = scaled(coverage, 0.85, 15.0, 40, 95);
    let experience_relevance = scaled(coverage, 0.75, 20.0, 40, 95);
    let overall = f64::from(job_compatibility + skills_relevance + experience_relevance + coverage) / 4.0;

    ScoreBreakdown {
        job_compatibility,
        structure: STRUCTURE_SCORE,
        skills_relevance,
        experience_relevance,
        keyword_match: coverage,
        clarity: CLARITY_SCORE,
        strength_comparison: scaled(coverage, 0.6, 25.0, 35, 90),
        presentation: PRESENTATION_SCORE,
        improvement_readiness: (100_u32.saturating_sub(coverage / 2)).clamp(30, 90),
        overall_impact: (overall.round_ties_even() as u32).clamp(40, 95),
    }
}

/// Builds a human-readable recommendation string from score and missing concepts.
pub fn build_recommendation(score: u32, missing: &[String]) -> String {
    let top_missing: Vec<&str> = missing
        .iter()
        .take(MAX_RECOMMENDED_LABELS)
        .map(String::as_str)
        .collect();

    if score >= 80 {
        "Strong fit. The resume covers the key concepts for this role.".to_string()
    } else if score >= 60 {
        format!(
            "Moderate fit ({score}/100). Consider adding evidence for: {}.",
            top_missing.join(", ")
        )
    } else {
        format!(
            "Low fit ({score}/100). Significant gaps: {}. Tailor the resume before applying.",
            top_missing.join(", ")
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

//! Quality Gate: post-hoc checks over the same inputs the matcher saw.
//!
//! Depends only on the public shape of `MatchResult` (key, label, method, score); it never
//! reaches into matcher internals.

use serde::{Deserialize, Serialize};

use crate::matching::matcher::{MatchMethod, MatchResult};
use crate::quality::lint::lint_resume;
use crate::quality::pii::{detect_pii_presence, PiiPresence};

pub const DEFAULT_HALLUCINATION_FLOOR: f32 = 0.6;
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 20_000;

pub const MISSING_EMAIL: &str = "Add a contact email so recruiters can reach you.";
pub const MISSING_PHONE: &str = "Add a phone number for fast scheduling.";
pub const MISSING_LOCATION: &str =
    "Job requires onsite/hybrid work; include your city/region to confirm location fit.";

/// Labels listed in the consolidated low-confidence warning.
const MAX_LISTED_LOW_CONFIDENCE: usize = 5;

pub fn default_location_keywords() -> Vec<String> {
    ["onsite", "on site", "in-office", "in office", "hybrid"]
        .iter()
        .map(|k| k.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub warnings: Vec<String>,
    /// Labels of low-confidence semantic matches.
    pub hallucinated: Vec<String>,
    pub pii_detected: PiiPresence,
}

#[derive(Debug, Clone)]
pub struct QualityGate {
    max_text_length: usize,
    hallucination_floor: f32,
    location_keywords: Vec<String>,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_TEXT_LENGTH,
            DEFAULT_HALLUCINATION_FLOOR,
            default_location_keywords(),
        )
    }
}

impl QualityGate {
    pub fn new(max_text_length: usize, hallucination_floor: f32, location_keywords: Vec<String>) -> Self {
        Self {
            max_text_length,
            hallucination_floor,
            location_keywords: location_keywords
                .into_iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// True if the job text mentions any on-site/hybrid keyword.
    pub fn requires_location(&self, job_text: &str) -> bool {
        let lower = job_text.to_lowercase();
        self.location_keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    /// Labels of semantic matches scored below the confidence floor.
    pub fn low_confidence_matches(&self, matches: &[MatchResult]) -> Vec<String> {
        matches
            .iter()
            .filter(|m| m.method == MatchMethod::Semantic && m.semantic_score < self.hallucination_floor)
            .map(|m| m.label.clone())
            .collect()
    }

    fn contact_and_location_warnings(&self, job_text: &str, pii: PiiPresence) -> Vec<String> {
        let mut warnings = Vec::new();
        if !pii.email {
            warnings.push(MISSING_EMAIL.to_string());
        }
        if !pii.phone {
            warnings.push(MISSING_PHONE.to_string());
        }
        if self.requires_location(job_text) && !pii.location {
            warnings.push(MISSING_LOCATION.to_string());
        }
        warnings
    }

    pub fn run(&self, resume_text: &str, job_text: &str, matches: &[MatchResult]) -> QualityReport {
        let pii = detect_pii_presence(resume_text);

        let mut warnings = lint_resume(resume_text, self.max_text_length);
        warnings.extend(self.contact_and_location_warnings(job_text, pii));

        let hallucinated = self.low_confidence_matches(matches);
        if !hallucinated.is_empty() {
            let listed: Vec<&str> = hallucinated
                .iter()
                .take(MAX_LISTED_LOW_CONFIDENCE)
                .map(String::as_str)
                .collect();
            warnings.push(format!(
                "Low-confidence matches for: {}. Clarify with concrete bullets.",
                listed.join(", ")
            ));
        }

        QualityReport {
            warnings,
            hallucinated,
            pii_detected: pii,
        }
    }
}

//! Candidate level resolution and the per-level weight multiplier table.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matching::normalize::phrase_present;

/// Level hint for intern roles. `General` is the neutral level used for every non-intern role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternLevel {
    Freshman,
    Sophomore,
    Junior,
    Senior,
    #[default]
    General,
}

impl InternLevel {
    pub const ALL: [InternLevel; 5] = [
        InternLevel::Freshman,
        InternLevel::Sophomore,
        InternLevel::Junior,
        InternLevel::Senior,
        InternLevel::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InternLevel::Freshman => "freshman",
            InternLevel::Sophomore => "sophomore",
            InternLevel::Junior => "junior",
            InternLevel::Senior => "senior",
            InternLevel::General => "general",
        }
    }

    /// Entry-tier levels get the strongest overqualification floor.
    pub fn is_entry_tier(&self) -> bool {
        matches!(self, InternLevel::Freshman | InternLevel::Sophomore)
    }
}

impl fmt::Display for InternLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown intern level '{0}'")]
pub struct UnknownLevel(pub String);

impl FromStr for InternLevel {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        InternLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == key)
            .ok_or(UnknownLevel(key))
    }
}

/// Tokens that mark a text as being about an internship.
const INTERN_TOKENS: &[&str] = &["intern", "interns", "internship", "internships"];

/// Resolves the level used for scoring.
///
/// When neither normalized text mentions an internship the level is forced to `General`,
/// whatever the hint says. Otherwise the hint is used, falling back to `General` when it is
/// empty or unrecognized.
pub fn resolve_level(hint: &str, normalized_resume: &str, normalized_job: &str) -> InternLevel {
    let mentions_intern = INTERN_TOKENS
        .iter()
        .any(|t| phrase_present(normalized_job, t) || phrase_present(normalized_resume, t));
    if !mentions_intern {
        return InternLevel::General;
    }

    if hint.trim().is_empty() {
        return InternLevel::General;
    }

    hint.parse().unwrap_or_else(|e: UnknownLevel| {
        tracing::warn!("{e}; scoring with the general level");
        InternLevel::General
    })
}

/// Per-level multiplier applied uniformly to every concept weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelMultipliers {
    pub freshman: f64,
    pub sophomore: f64,
    pub junior: f64,
    pub senior: f64,
    pub general: f64,
}

impl Default for LevelMultipliers {
    fn default() -> Self {
        Self {
            freshman: 0.85,
            sophomore: 0.95,
            junior: 1.0,
            senior: 1.1,
            general: 1.0,
        }
    }
}

impl LevelMultipliers {
    pub fn get(&self, level: InternLevel) -> f64 {
        match level {
            InternLevel::Freshman => self.freshman,
            InternLevel::Sophomore => self.sophomore,
            InternLevel::Junior => self.junior,
            InternLevel::Senior => self.senior,
            InternLevel::General => self.general,
        }
    }

    fn slot(&mut self, level: InternLevel) -> &mut f64 {
        match level {
            InternLevel::Freshman => &mut self.freshman,
            InternLevel::Sophomore => &mut self.sophomore,
            InternLevel::Junior => &mut self.junior,
            InternLevel::Senior => &mut self.senior,
            InternLevel::General => &mut self.general,
        }
    }

    /// Parses `level:value` pairs separated by commas, e.g. `freshman:0.8,senior:1.2`.
    /// Levels not mentioned keep their default multiplier.
    pub fn parse_overrides(raw: &str) -> Result<Self> {
        let mut table = Self::default();
        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, value) = pair
                .split_once(':')
                .with_context(|| format!("expected 'level:multiplier', got '{pair}'"))?;
            let level: InternLevel = name.parse()?;
            let value: f64 = value
                .trim()
                .parse()
                .with_context(|| format!("invalid multiplier for '{level}'"))?;
            if !value.is_finite() || value <= 0.0 {
                bail!("multiplier for '{level}' must be positive, got {value}");
            }
            *table.slot(level) = value;
        }
        Ok(table)
    }
}

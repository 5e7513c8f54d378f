use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::embedding::ngram;
use crate::matching::levels::LevelMultipliers;
use crate::matching::matcher::DEFAULT_SEMANTIC_THRESHOLD;
use crate::quality::gate::{default_location_keywords, DEFAULT_HALLUCINATION_FLOOR, DEFAULT_MAX_TEXT_LENGTH};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CACHE_TTL_SECONDS: u64 = 900;
const DEFAULT_CACHE_CAPACITY: usize = 256;
const DEFAULT_EMBEDDING_CACHE_CAPACITY: usize = 1024;

/// Engine parameters. Passed by reference into the evaluator; there is no global copy.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub max_text_length: usize,
    pub semantic_threshold: f32,
    pub hallucination_floor: f32,
    pub cache_ttl: Duration,
    /// Zero disables the result cache.
    pub cache_capacity: usize,
    /// `none` disables semantic matching.
    pub embedding_model: String,
    pub embedding_cache_capacity: usize,
    pub level_multipliers: LevelMultipliers,
    pub location_keywords: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            semantic_threshold: DEFAULT_SEMANTIC_THRESHOLD,
            hallucination_floor: DEFAULT_HALLUCINATION_FLOOR,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            embedding_model: ngram::MODEL_ID.to_string(),
            embedding_cache_capacity: DEFAULT_EMBEDDING_CACHE_CAPACITY,
            level_multipliers: LevelMultipliers::default(),
            location_keywords: default_location_keywords(),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Every variable is optional; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Registry file replacing the built-in concepts.
    pub concepts_path: Option<PathBuf>,
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests never touch process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let max_text_length: usize = parse_or(&var, "MAX_TEXT_LENGTH", DEFAULT_MAX_TEXT_LENGTH)?;
        if max_text_length == 0 {
            bail!("MAX_TEXT_LENGTH must be greater than zero");
        }

        let semantic_threshold = unit_interval(
            "SEMANTIC_THRESHOLD",
            parse_or(&var, "SEMANTIC_THRESHOLD", DEFAULT_SEMANTIC_THRESHOLD)?,
        )?;
        let hallucination_floor = unit_interval(
            "HALLUCINATION_FLOOR",
            parse_or(&var, "HALLUCINATION_FLOOR", DEFAULT_HALLUCINATION_FLOOR)?,
        )?;

        let level_multipliers = match var("LEVEL_MULTIPLIERS") {
            Some(raw) => LevelMultipliers::parse_overrides(&raw).context("LEVEL_MULTIPLIERS is malformed")?,
            None => LevelMultipliers::default(),
        };

        let location_keywords = match var("LOCATION_REQUIRED_KEYWORDS") {
            Some(raw) => raw
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            None => default_location_keywords(),
        };

        let engine = EngineConfig {
            max_text_length,
            semantic_threshold,
            hallucination_floor,
            cache_ttl: Duration::from_secs(parse_or(&var, "CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL_SECONDS)?),
            cache_capacity: parse_or(&var, "CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY)?,
            embedding_model: var("EMBEDDING_MODEL").unwrap_or_else(|| ngram::MODEL_ID.to_string()),
            embedding_cache_capacity: parse_or(&var, "EMBEDDING_CACHE_CAPACITY", DEFAULT_EMBEDDING_CACHE_CAPACITY)?,
            level_multipliers,
            location_keywords,
        };

        Ok(Config {
            port: parse_or(&var, "PORT", DEFAULT_PORT).context("PORT must be a valid port number")?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            concepts_path: var("CONCEPTS_PATH").map(PathBuf::from),
            engine,
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn unit_interval(key: &str, value: f32) -> Result<f32> {
    if !(0.0..=1.0).contains(&value) {
        bail!("{key} must be within [0, 1], got {value}");
    }
    Ok(value)
}

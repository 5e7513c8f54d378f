//! Embedding Service: local text-to-vector encoding and cosine similarity.
//!
//! Semantic support is optional. Whether a model is usable is decided once, at construction,
//! and captured in `SimilarityProvider`. An `Unavailable` provider answers every query with a
//! zero score so callers fall back to exact matching without any error path.
//!
//! Encodings are memoized per exact text in a bounded moka cache with a time-to-live.

pub mod ngram;

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use ngram::NgramModel;

/// How long a memoized encoding stays valid.
const MEMO_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("no similarity model is loaded")]
    Unavailable,

    #[error("cannot embed empty text")]
    EmptyInput,

    #[error("embedding has zero magnitude")]
    ZeroVector,

    #[error("dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// A local embedding model. Implementations must be deterministic for a given `model_id`.
pub trait EmbeddingModel: Send + Sync {
    fn model_id(&self) -> &str;
    fn dimensions(&self) -> usize;
    fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Capability decided at startup: either a working model handle or nothing.
#[derive(Clone)]
pub enum SimilarityProvider {
    Available(Arc<dyn EmbeddingModel>),
    Unavailable,
}

impl SimilarityProvider {
    /// Resolves a configured model name. Unknown names fail closed to `Unavailable`.
    pub fn load(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "" | "none" | "off" => {
                info!("Semantic matching disabled by configuration");
                SimilarityProvider::Unavailable
            }
            ngram::MODEL_ID => {
                let model = NgramModel::default();
                info!("Loaded local embedding model {} ({} dims)", ngram::MODEL_ID, model.dimensions());
                SimilarityProvider::Available(Arc::new(model))
            }
            other => {
                warn!("Unknown embedding model '{other}'; semantic matching unavailable");
                SimilarityProvider::Unavailable
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SimilarityProvider::Available(_))
    }

    pub fn model_id(&self) -> &str {
        match self {
            SimilarityProvider::Available(model) => model.model_id(),
            SimilarityProvider::Unavailable => "none",
        }
    }
}

impl std::fmt::Debug for SimilarityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimilarityProvider::Available(model) => {
                f.debug_tuple("Available").field(&model.model_id()).finish()
            }
            SimilarityProvider::Unavailable => f.write_str("Unavailable"),
        }
    }
}

/// Best candidate for a text. `phrase` is `None` when nothing could be scored.
#[derive(Debug, Clone, PartialEq)]
pub struct Similarity {
    pub score: f32,
    pub phrase: Option<String>,
}

impl Similarity {
    fn none() -> Self {
        Self {
            score: 0.0,
            phrase: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdHit {
    pub hit: bool,
    pub score: f32,
    pub phrase: Option<String>,
}

pub struct EmbeddingService {
    provider: SimilarityProvider,
    memo: Cache<String, Arc<Vec<f32>>>,
}

impl std::fmt::Debug for EmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingService")
            .field("provider", &self.provider)
            .field("memoized", &self.memo.entry_count())
            .finish()
    }
}

impl EmbeddingService {
    pub fn new(provider: SimilarityProvider, memo_capacity: usize) -> Self {
        let memo = Cache::builder()
            .max_capacity(memo_capacity as u64)
            .time_to_live(MEMO_TTL)
            .build();
        Self { provider, memo }
    }

    #[cfg(test)]
    pub fn unavailable() -> Self {
        Self::new(SimilarityProvider::Unavailable, 0)
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_available()
    }

    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    fn encode(&self, text: &str) -> Result<Arc<Vec<f32>>, EmbeddingError> {
        let SimilarityProvider::Available(model) = &self.provider else {
            return Err(EmbeddingError::Unavailable);
        };
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        if let Some(hit) = self.memo.get(text) {
            return Ok(hit);
        }
        let vector = model.encode(text)?;
        if vector.len() != model.dimensions() {
            return Err(EmbeddingError::DimensionMismatch {
                left: vector.len(),
                right: model.dimensions(),
            });
        }
        let vector = Arc::new(vector);
        self.memo.insert(text.to_string(), Arc::clone(&vector));
        Ok(vector)
    }

    /// Cosine similarity between two texts.
    #[cfg(test)]
    pub fn pair_similarity(&self, a: &str, b: &str) -> Result<f32, EmbeddingError> {
        let left = self.encode(a)?;
        let right = self.encode(b)?;
        cosine_similarity(&left, &right)
    }

    /// Returns the candidate most similar to `text`.
    ///
    /// A candidate that fails to encode is skipped; it never aborts the search.
    pub fn similarity<S: AsRef<str>>(&self, text: &str, candidates: &[S]) -> Similarity {
        if !self.is_available() {
            return Similarity::none();
        }
        let base = match self.encode(text) {
            Ok(v) => v,
            Err(e) => {
                debug!("skipping similarity for unencodable text: {e}");
                return Similarity::none();
            }
        };

        let mut best = Similarity::none();
        for candidate in candidates {
            let candidate = candidate.as_ref();
            let score = match self
                .encode(candidate)
                .and_then(|emb| cosine_similarity(&base, &emb))
            {
                Ok(score) => score,
                Err(e) => {
                    debug!("similarity pair treated as no match: {e}");
                    continue;
                }
            };
            if score > best.score {
                best = Similarity {
                    score,
                    phrase: Some(candidate.to_string()),
                };
            }
        }
        best
    }

    pub fn any_above_threshold<S: AsRef<str>>(
        &self,
        text: &str,
        candidates: &[S],
        threshold: f32,
    ) -> ThresholdHit {
        let Similarity { score, phrase } = self.similarity(text, candidates);
        ThresholdHit {
            hit: phrase.is_some() && score >= threshold,
            score,
            phrase,
        }
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, EmbeddingError> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(EmbeddingError::ZeroVector);
    }
    Ok((dot / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic fixture model: each text maps to the axis of the first keyword it contains.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct AxisModel {
        pub axes: Vec<&'static str>,
        pub calls: AtomicUsize,
    }

    impl AxisModel {
        pub fn new(axes: Vec<&'static str>) -> Self {
            Self {
                axes,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl EmbeddingModel for AxisModel {
        fn model_id(&self) -> &str {
            "axis-test"
        }

        fn dimensions(&self) -> usize {
            self.axes.len() + 1
        }

        fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let lower = text.to_lowercase();
            if lower.contains("explode") {
                return Err(EmbeddingError::ZeroVector);
            }
            if lower.contains("warp") {
                // wrong width on purpose
                return Ok(vec![1.0; self.dimensions() + 1]);
            }
            let mut v = vec![0.0; self.dimensions()];
            match self.axes.iter().position(|axis| lower.contains(axis)) {
                Some(i) => v[i] = 1.0,
                None => v[self.axes.len()] = 1.0,
            }
            Ok(v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::AxisModel;
    use super::*;
    use std::sync::atomic::Ordering;

    fn service_with(model: Arc<AxisModel>) -> EmbeddingService {
        EmbeddingService::new(SimilarityProvider::Available(model), 64)
    }

    #[test]
    fn test_unavailable_returns_zero_without_error() {
        let service = EmbeddingService::unavailable();
        let result = service.similarity("testing", &["wrote tests"]);
        assert_eq!(result, Similarity::none());
        let hit = service.any_above_threshold("testing", &["wrote tests"], 0.0);
        assert!(!hit.hit);
        assert_eq!(service.model_id(), "none");
    }

    #[test]
    fn test_similarity_picks_best_candidate() {
        let service = service_with(Arc::new(AxisModel::new(vec!["kube", "test"])));
        let result = service.similarity("kubernetes", &["wrote unit tests", "ran kube clusters"]);
        assert_eq!(result.phrase.as_deref(), Some("ran kube clusters"));
        assert!((result.score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let service = service_with(Arc::new(AxisModel::new(vec!["kube"])));
        let hit = service.any_above_threshold("kube", &["kube ops"], 1.0);
        assert!(hit.hit);
        let miss = service.any_above_threshold("kube", &["plain words"], 0.62);
        assert!(!miss.hit);
        assert_eq!(miss.score, 0.0);
    }

    #[test]
    fn test_failing_candidate_is_skipped() {
        let service = service_with(Arc::new(AxisModel::new(vec!["kube"])));
        let result = service.similarity("kube", &["explode here", "kube cluster"]);
        assert_eq!(result.phrase.as_deref(), Some("kube cluster"));
    }

    #[test]
    fn test_failing_base_text_yields_no_match() {
        let service = service_with(Arc::new(AxisModel::new(vec!["kube"])));
        let result = service.similarity("explode", &["kube cluster"]);
        assert_eq!(result, Similarity::none());
    }

    #[test]
    fn test_encodings_are_memoized() {
        let model = Arc::new(AxisModel::new(vec!["kube"]));
        let service = service_with(Arc::clone(&model));
        service.similarity("kube", &["kube cluster"]);
        service.similarity("kube", &["kube cluster"]);
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_wrong_width_encoding_is_rejected_and_not_memoized() {
        let model = Arc::new(AxisModel::new(vec!["kube"]));
        let service = service_with(Arc::clone(&model));
        let result = service.similarity("kube", &["warp drive", "kube cluster"]);
        assert_eq!(result.phrase.as_deref(), Some("kube cluster"));

        service.similarity("kube", &["warp drive"]);
        // "kube" and "kube cluster" memoized; "warp drive" encoded on both calls
        assert_eq!(model.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_empty_candidates_are_skipped() {
        let model = Arc::new(AxisModel::new(vec!["kube"]));
        let service = service_with(Arc::clone(&model));
        let result = service.similarity("kube", &["", "   "]);
        assert_eq!(result, Similarity::none());
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cosine_rejects_mismatch_and_zero() {
        assert!(matches!(
            cosine_similarity(&[1.0], &[1.0, 0.0]),
            Err(EmbeddingError::DimensionMismatch { left: 1, right: 2 })
        ));
        assert!(matches!(
            cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]),
            Err(EmbeddingError::ZeroVector)
        ));
        let score = cosine_similarity(&[0.6, 0.8], &[0.6, 0.8]).unwrap();
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_load_resolves_names() {
        assert!(SimilarityProvider::load("ngram-v1").is_available());
        assert!(!SimilarityProvider::load("none").is_available());
        assert!(!SimilarityProvider::load("all-MiniLM-L6-v2").is_available());
    }
}

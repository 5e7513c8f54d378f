//! `ngram-v1`, the built-in local embedding model.
//!
//! Feature-hashes word unigrams and padded character trigrams into a fixed-size signed
//! vector, then L2-normalizes it. Buckets come from xxh64 with a fixed seed, whose output is
//! specified independently of the Rust release, so scores are reproducible across restarts
//! and rebuilds. Changing the feature set, seed or dimensions is a model change and must
//! bump `MODEL_ID` (cached results are keyed on it).

use xxhash_rust::xxh64::xxh64;

use crate::embedding::{EmbeddingError, EmbeddingModel};

pub const MODEL_ID: &str = "ngram-v1";
pub const DEFAULT_DIMENSIONS: usize = 384;

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;
const HASH_SEED: u64 = 0;

#[derive(Debug, Clone)]
pub struct NgramModel {
    dimensions: usize,
}

impl Default for NgramModel {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
        }
    }
}

impl NgramModel {
    fn bucket(&self, feature: &str) -> (usize, f32) {
        let hash = xxh64(feature.as_bytes(), HASH_SEED);
        let index = (hash % self.dimensions as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }

    fn add(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let (index, sign) = self.bucket(feature);
        vector[index] += sign * weight;
    }
}

impl EmbeddingModel for NgramModel {
    fn model_id(&self) -> &str {
        MODEL_ID
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric() && !matches!(c, '+' | '#'))
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut vector = vec![0.0_f32; self.dimensions];
        for word in &words {
            self.add(&mut vector, &format!("w:{word}"), WORD_WEIGHT);

            let padded: Vec<char> = format!(" {word} ").chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                self.add(&mut vector, &format!("c:{trigram}"), TRIGRAM_WEIGHT);
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            return Err(EmbeddingError::ZeroVector);
        }
        vector.iter_mut().for_each(|v| *v /= norm);
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingService, SimilarityProvider};
    use std::sync::Arc;

    fn service() -> EmbeddingService {
        EmbeddingService::new(SimilarityProvider::Available(Arc::new(NgramModel::default())), 32)
    }

    #[test]
    fn test_encode_is_normalized_and_deterministic() {
        let model = NgramModel::default();
        let a = model.encode("Deployed microservices to Kubernetes").unwrap();
        let b = model.encode("Deployed microservices to Kubernetes").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_DIMENSIONS);
        let norm = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_buckets_are_pinned_to_xxh64() {
        let model = NgramModel::default();
        let hash = xxh64(b"w:rust", HASH_SEED);
        let (index, sign) = model.bucket("w:rust");
        assert_eq!(index, (hash % DEFAULT_DIMENSIONS as u64) as usize);
        assert_eq!(sign, if hash >> 63 == 0 { 1.0 } else { -1.0 });
        // xxh64 reference value for empty input with seed 0
        assert_eq!(xxh64(b"", 0), 0xEF46_DB37_51D8_E999);
    }

    #[test]
    fn test_encode_rejects_text_without_words() {
        let model = NgramModel::default();
        assert!(matches!(model.encode(" -- ... "), Err(EmbeddingError::EmptyInput)));
    }

    #[test]
    fn test_identical_text_has_unit_similarity() {
        let score = service().pair_similarity("unit testing", "Unit Testing").unwrap();
        assert!((score - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_related_text_scores_above_unrelated() {
        let service = service();
        let related = service
            .pair_similarity("distributed systems", "built distributed systems at scale")
            .unwrap();
        let unrelated = service
            .pair_similarity("distributed systems", "painted watercolor portraits")
            .unwrap();
        assert!(related > unrelated, "related={related} unrelated={unrelated}");
    }
}

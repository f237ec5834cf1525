//! Concept embeddings.
//!
//! Embeddings give the graph a similarity signal that does not depend on
//! topology. The default embedder hashes character trigrams of the concept
//! name with FNV-1a, so embeddings are stable across runs and toolchain
//! versions, and concepts with overlapping names land close together. A learned embedding source can be swapped in
//! through the [`Embedder`] trait.

use evolve_core::Context;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(FNV_OFFSET, |h, &b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME))
}

/// Default embedding dimension.
pub const DEFAULT_DIMENSION: usize = 128;

/// Turns a concept into a fixed-size vector.
pub trait Embedder: Send + Sync {
    /// Output dimension.
    fn dimension(&self) -> usize;

    /// Embed a concept. The result should be unit-normalized (or all zeros).
    fn embed(&self, concept: &str, properties: &Context) -> Vec<f64>;
}

/// Feature-hashing embedder over character trigrams of the concept name.
///
/// Properties are ignored: they may change after a concept is created,
/// while its embedding is fixed.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Create an embedder with the given dimension (minimum 1).
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, concept: &str, _properties: &Context) -> Vec<f64> {
        let mut vector = vec![0.0; self.dimension];
        let chars: Vec<char> = concept.trim().to_lowercase().chars().collect();
        if chars.is_empty() {
            return vector;
        }

        let grams: Vec<String> = if chars.len() < 3 {
            vec![chars.iter().collect()]
        } else {
            chars.windows(3).map(|w| w.iter().collect()).collect()
        };

        for gram in grams {
            let h = fnv1a(gram.as_bytes());
            let bucket = (h % self.dimension as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        normalize(&mut vector);
        vector
    }
}

/// Scale a vector to unit length in place. Zero vectors are left alone.
pub fn normalize(vector: &mut [f64]) {
    let norm = vector.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c) - 0.0).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) - (-1.0)).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_single_trigram_lands_in_fixed_bucket() {
        let h = fnv1a(b"abc");
        let bucket = (h % DEFAULT_DIMENSION as u64) as usize;
        let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
        let v = HashEmbedder::default().embed("abc", &Context::new());
        assert_eq!(v[bucket], sign);
        assert_eq!(v.iter().filter(|x| **x != 0.0).count(), 1);
    }

    #[test]
    fn test_hash_embedding_is_deterministic_and_unit() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed("task:search: rust", &Context::new());
        let b = embedder.embed("task:search: rust", &Context::new());
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_DIMENSION);
        let norm: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_overlapping_names_are_closer() {
        let embedder = HashEmbedder::default();
        let base = embedder.embed("task:search: rust async runtime", &Context::new());
        let near = embedder.embed("task:search: rust async runtimes", &Context::new());
        let far = embedder.embed("action:calculate", &Context::new());
        assert!(cosine_similarity(&base, &near) > cosine_similarity(&base, &far));
    }

    #[test]
    fn test_empty_name_embeds_to_zero() {
        let embedder = HashEmbedder::new(8);
        assert_eq!(embedder.embed("   ", &Context::new()), vec![0.0; 8]);
    }
}

use anyhow::Result;
use rayon::prelude::*;

pub const DEFAULT_EMBEDDING_DIM: usize = 768;

pub trait EmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts. The default maps serially; providers that are
    /// cheap and thread-safe override this.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

impl EmbeddingProvider for Box<dyn EmbeddingProvider> {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }
}

/// Deterministic bag-of-words embedding over FNV-hashed token buckets,
/// L2-normalised. A stand-in when no model weights are available: scores are
/// lexical overlap, not semantics, but the whole pipeline stays runnable.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dim: usize,
}

impl HashEmbeddingProvider {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(8) }
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIM)
    }
}

fn fnv1a(token: &str) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for b in token.as_bytes() {
        h ^= u64::from(*b);
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

impl EmbeddingProvider for HashEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dim];

        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            v[(fnv1a(token) as usize) % self.dim] += 1.0;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }

        Ok(v)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.par_iter().map(|t| self.embed(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeddings_are_deterministic_and_normalised() {
        let provider = HashEmbeddingProvider::new(64);
        let a = provider.embed("how do I enrol at the university").expect("embed");
        let b = provider.embed("how do I enrol at the university").expect("embed");
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let provider = HashEmbeddingProvider::new(16);
        let v = provider.embed("   ").expect("embed");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn batch_matches_serial() {
        let provider = HashEmbeddingProvider::new(32);
        let texts = vec![
            "first question".to_string(),
            "second question".to_string(),
            String::new(),
        ];
        let batch = provider.embed_batch(&texts).expect("batch");
        for (text, emb) in texts.iter().zip(&batch) {
            assert_eq!(emb, &provider.embed(text).expect("embed"));
        }
    }

    #[test]
    fn dim_floor_is_applied() {
        let provider = HashEmbeddingProvider::new(1);
        assert_eq!(provider.embed("x").expect("embed").len(), 8);
    }
}

// src/index/embedding.rs
// Deterministic 384-dimension sentence embedding used by the vector store.
// A hashed bag-of-tokens encoder (SHA-256 bucketing, signed counts,
// L2-normalised) keeps the store fully embedded: no model download, no
// network, stable across runs.

use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

pub const EMBEDDING_DIM: usize = 384;

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"[A-Za-z0-9_]+").unwrap();
}

pub fn embed(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; EMBEDDING_DIM];
    for token in TOKEN_RE.find_iter(text) {
        let token = token.as_str().to_lowercase();
        let digest = Sha256::digest(token.as_bytes());
        let bucket = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize
            % EMBEDDING_DIM;
        let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

/// Cosine distance between two embeddings (0 = identical direction).
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    1.0 - dot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_is_deterministic_and_normalised() {
        let a = embed("def parse_config(path): return json.load(path)");
        let b = embed("def parse_config(path): return json.load(path)");
        assert_eq!(a, b);
        assert_eq!(a.len(), EMBEDDING_DIM);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn related_text_is_closer_than_unrelated() {
        let query = embed("read the contacts from the database");
        let related = embed("def read_contacts(db): return db.query(Contact)");
        let unrelated = embed("fn blit_sprite(frame, x, y) -> TextureHandle");
        assert!(cosine_distance(&query, &related) < cosine_distance(&query, &unrelated));
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let zero = embed("");
        assert!(zero.iter().all(|v| *v == 0.0));
    }
}

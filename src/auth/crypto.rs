// src/auth/crypto.rs
// At-rest encryption for provider API keys (ChaCha20-Poly1305).
// Stored form is base64(nonce || ciphertext || tag).

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, CHACHA20_POLY1305, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

fn derive_key(encryption_key: &str) -> Result<LessSafeKey> {
    let digest = Sha256::digest(encryption_key.as_bytes());
    let unbound = UnboundKey::new(&CHACHA20_POLY1305, &digest)
        .map_err(|_| anyhow!("failed to derive encryption key"))?;
    Ok(LessSafeKey::new(unbound))
}

pub fn encrypt(plaintext: &[u8], encryption_key: &str) -> Result<String> {
    let key = derive_key(encryption_key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| anyhow!("failed to generate nonce"))?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| anyhow!("encryption failed"))?;

    let mut payload = nonce_bytes.to_vec();
    payload.extend_from_slice(&in_out);
    Ok(BASE64.encode(payload))
}

pub fn decrypt(encoded: &str, encryption_key: &str) -> Result<Vec<u8>> {
    let payload = BASE64
        .decode(encoded)
        .map_err(|e| anyhow!("invalid encrypted payload: {}", e))?;
    if payload.len() <= NONCE_LEN {
        return Err(anyhow!("encrypted payload too short"));
    }

    let key = derive_key(encryption_key)?;
    let nonce_bytes: [u8; NONCE_LEN] = payload[..NONCE_LEN].try_into()?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let mut in_out = payload[NONCE_LEN..].to_vec();
    let plaintext = key
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| anyhow!("decryption failed (wrong key or corrupted data)"))?;
    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let encrypted = encrypt(b"sk-live-abcdef", "master-key").unwrap();
        let decrypted = decrypt(&encrypted, "master-key").unwrap();
        assert_eq!(decrypted, b"sk-live-abcdef");
    }

    #[test]
    fn wrong_key_fails() {
        let encrypted = encrypt(b"sk-live-abcdef", "master-key").unwrap();
        assert!(decrypt(&encrypted, "other-key").is_err());
    }

    #[test]
    fn nonces_differ_between_calls() {
        let a = encrypt(b"same", "master-key").unwrap();
        let b = encrypt(b"same", "master-key").unwrap();
        assert_ne!(a, b);
    }
}

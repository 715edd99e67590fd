//! Vault-keyed message encryption.
//!
//! Envelope format: `enc:v1:<base64url(nonce || ciphertext)>` with
//! ChaCha20-Poly1305. The key is held outside the repository (env var or key
//! file); decryption fails closed with `VaultLocked` when no key is
//! available, never returning plaintext-shaped garbage.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit, Nonce};
use serde::{Deserialize, Serialize};

use super::error::ChatError;
use crate::config::VaultConfig;

const ENVELOPE_PREFIX: &str = "enc:v1:";
const KEY_ENV: &str = "OPSLOG_VAULT_KEY";
const NONCE_LEN: usize = 12;

/// Read-only handle on the vault key. Many concurrent readers, no writers.
#[derive(Clone)]
pub struct Vault {
    key: Option<[u8; 32]>,
}

impl Vault {
    /// Resolve the key: `OPSLOG_VAULT_KEY` (base64) wins over the configured
    /// key file. Absence is not an error; the vault is simply locked.
    pub fn open(config: &VaultConfig) -> Self {
        let raw = std::env::var(KEY_ENV).ok().or_else(|| {
            config
                .key_path
                .as_ref()
                .and_then(|path| std::fs::read_to_string(path).ok())
        });
        let key = raw.and_then(|encoded| {
            let bytes = URL_SAFE_NO_PAD.decode(encoded.trim()).ok()?;
            <[u8; 32]>::try_from(bytes.as_slice()).ok()
        });
        if key.is_none() {
            tracing::debug!("vault locked: no key material found");
        }
        Self { key }
    }

    /// A vault that always fails closed; for callers that never decrypt.
    pub fn locked() -> Self {
        Self { key: None }
    }

    pub fn is_locked(&self) -> bool {
        self.key.is_none()
    }

    fn cipher(&self) -> Result<ChaCha20Poly1305, ChatError> {
        let key = self.key.as_ref().ok_or(ChatError::VaultLocked)?;
        Ok(ChaCha20Poly1305::new(Key::from_slice(key)))
    }

    /// Seal plaintext into an envelope string.
    pub fn seal(&self, plaintext: &[u8]) -> Result<String, ChatError> {
        use rand::RngCore;
        let cipher = self.cipher()?;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| ChatError::MalformedEnvelope("aead encryption failed".into()))?;
        let mut body = nonce_bytes.to_vec();
        body.extend_from_slice(&ciphertext);
        Ok(format!("{ENVELOPE_PREFIX}{}", URL_SAFE_NO_PAD.encode(body)))
    }

    /// Open an envelope string back into plaintext.
    pub fn unseal(&self, envelope: &str) -> Result<Vec<u8>, ChatError> {
        let cipher = self.cipher()?;
        let encoded = envelope
            .strip_prefix(ENVELOPE_PREFIX)
            .ok_or_else(|| ChatError::MalformedEnvelope("missing enc:v1: prefix".into()))?;
        let body = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| ChatError::MalformedEnvelope(e.to_string()))?;
        if body.len() < NONCE_LEN {
            return Err(ChatError::MalformedEnvelope("body shorter than nonce".into()));
        }
        let (nonce_bytes, ciphertext) = body.split_at(NONCE_LEN);
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| ChatError::DecryptFailed)
    }
}

/// The encrypted portion of a message: `text` and `refs` travel together so
/// neither leaks when `flags.encrypted` is set.
#[derive(Serialize, Deserialize)]
struct SealedContent {
    text: String,
    refs: Vec<String>,
}

pub fn seal_content(vault: &Vault, text: &str, refs: &[String]) -> Result<String, ChatError> {
    let payload = SealedContent {
        text: text.to_string(),
        refs: refs.to_vec(),
    };
    let bytes = serde_json::to_vec(&payload)
        .map_err(|e| ChatError::MalformedEnvelope(e.to_string()))?;
    vault.seal(&bytes)
}

pub fn unseal_content(vault: &Vault, envelope: &str) -> Result<(String, Vec<String>), ChatError> {
    let bytes = vault.unseal(envelope)?;
    let payload: SealedContent = serde_json::from_slice(&bytes)
        .map_err(|e| ChatError::MalformedEnvelope(e.to_string()))?;
    Ok((payload.text, payload.refs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vault() -> Vault {
        Vault {
            key: Some([7u8; 32]),
        }
    }

    #[test]
    fn seal_unseal_roundtrip() {
        let vault = test_vault();
        let refs = vec!["@run:0001724970000-ab12".to_string()];
        let envelope = seal_content(&vault, "secret text", &refs).unwrap();
        assert!(envelope.starts_with("enc:v1:"));
        let (text, got_refs) = unseal_content(&vault, &envelope).unwrap();
        assert_eq!(text, "secret text");
        assert_eq!(got_refs, refs);
    }

    #[test]
    fn locked_vault_fails_closed() {
        let vault = Vault::locked();
        assert!(matches!(
            vault.seal(b"x"),
            Err(ChatError::VaultLocked)
        ));
        let sealed = seal_content(&test_vault(), "x", &[]).unwrap();
        assert!(matches!(
            unseal_content(&vault, &sealed),
            Err(ChatError::VaultLocked)
        ));
    }

    #[test]
    fn wrong_key_is_decrypt_failed_not_garbage() {
        let sealed = seal_content(&test_vault(), "x", &[]).unwrap();
        let other = Vault {
            key: Some([9u8; 32]),
        };
        assert!(matches!(
            unseal_content(&other, &sealed),
            Err(ChatError::DecryptFailed)
        ));
    }

    #[test]
    fn garbage_envelope_is_malformed() {
        let vault = test_vault();
        assert!(matches!(
            vault.unseal("plaintext"),
            Err(ChatError::MalformedEnvelope(_))
        ));
        assert!(matches!(
            vault.unseal("enc:v1:!!!"),
            Err(ChatError::MalformedEnvelope(_))
        ));
    }
}

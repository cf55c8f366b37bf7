//! Credential vault: authenticated encryption of secret fields at rest.
//!
//! Every vault id gets its own AES-256-GCM key derived from the process
//! secret, and the id is bound into each envelope as associated data, so
//! ciphertext produced under one id never opens under another.
//!
//! Envelope layout:
//!
//! ```text
//! $FLEET_VAULT;1.0;AES256-GCM;<vault_id>
//! <base64(nonce || ciphertext || tag)>
//! ```

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sha2::{Digest, Sha256};

use crate::conf::VaultConfig;
use crate::error::{EngineError, Result};
use crate::model::CertKind;

pub const DEFAULT_VAULT_ID: &str = "ssm";

/// Placeholder returned instead of any stored secret.
pub const REDACTED: &str = "REDACTED";

const HEADER_PREFIX: &str = "$FLEET_VAULT;1.0;AES256-GCM;";
const NONCE_LEN: usize = 12;

pub struct Vault {
    secret: Vec<u8>,
    default_vault_id: String,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("default_vault_id", &self.default_vault_id)
            .finish_non_exhaustive()
    }
}

impl Vault {
    pub fn new(secret: &str, default_vault_id: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            default_vault_id: default_vault_id.to_string(),
        }
    }

    pub fn from_config(config: &VaultConfig) -> Self {
        Self::new(&config.secret, &config.default_vault_id)
    }

    pub fn default_vault_id(&self) -> &str {
        &self.default_vault_id
    }

    fn cipher(&self, vault_id: &str) -> Aes256Gcm {
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update([0u8]);
        hasher.update(vault_id.as_bytes());
        let digest = hasher.finalize();
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(digest.as_slice()))
    }

    pub fn encrypt(&self, plaintext: &str, vault_id: &str) -> Result<String> {
        let cipher = self.cipher(vault_id);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(
                &nonce,
                Payload { msg: plaintext.as_bytes(), aad: vault_id.as_bytes() },
            )
            .map_err(|e| EngineError::Configuration(format!("Vault encryption failed: {}", e)))?;

        let mut body = nonce.to_vec();
        body.extend_from_slice(&ciphertext);

        Ok(format!("{}{}\n{}", HEADER_PREFIX, vault_id, BASE64.encode(body)))
    }

    pub fn decrypt(&self, envelope: &str, vault_id: &str) -> Result<String> {
        let (header, body) = envelope
            .split_once('\n')
            .ok_or_else(|| EngineError::Configuration("Malformed vault envelope".to_string()))?;

        let sealed_for = header
            .strip_prefix(HEADER_PREFIX)
            .ok_or_else(|| EngineError::Configuration("Unknown vault envelope header".to_string()))?;
        if sealed_for != vault_id {
            return Err(EngineError::Configuration(format!(
                "Secret was sealed for vault '{}', not '{}'",
                sealed_for, vault_id
            )));
        }

        let bytes = BASE64
            .decode(body.trim())
            .map_err(|e| EngineError::Configuration(format!("Invalid vault body: {}", e)))?;
        if bytes.len() <= NONCE_LEN {
            return Err(EngineError::Configuration("Vault body too short".to_string()));
        }
        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);

        let plaintext = self
            .cipher(vault_id)
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload { msg: ciphertext, aad: vault_id.as_bytes() },
            )
            .map_err(|_| {
                EngineError::Configuration("Vault decryption failed (tampered or wrong key)".to_string())
            })?;

        String::from_utf8(plaintext)
            .map_err(|e| EngineError::Configuration(format!("Decrypted secret is not UTF-8: {}", e)))
    }

    pub fn encrypt_default(&self, plaintext: &str) -> Result<String> {
        self.encrypt(plaintext, &self.default_vault_id)
    }

    pub fn decrypt_default(&self, envelope: &str) -> Result<String> {
        self.decrypt(envelope, &self.default_vault_id)
    }

    /// Decrypts an optional stored field.
    pub fn reveal(&self, stored: Option<&str>) -> Result<Option<String>> {
        stored
            .filter(|s| !s.is_empty())
            .map(|s| self.decrypt_default(s))
            .transpose()
    }

    /// Value to persist for a secret field given the caller's input.
    ///
    /// No input clears the field. The redaction marker keeps the stored
    /// ciphertext untouched. Anything else is sealed under the default
    /// vault id.
    pub fn prepare_write(&self, incoming: Option<&str>, stored: Option<&str>) -> Result<Option<String>> {
        match incoming {
            None | Some("") => Ok(None),
            Some(REDACTED) => match stored {
                Some(existing) if !existing.is_empty() => Ok(Some(existing.to_string())),
                _ => Err(EngineError::Configuration(
                    "Received a redacted secret, but no original value is stored".to_string(),
                )),
            },
            Some(plaintext) => self.encrypt_default(plaintext).map(Some),
        }
    }
}

/// Display form of a secret field. Never decrypts.
pub fn redact(stored: Option<&str>) -> Option<String> {
    match stored {
        Some(s) if !s.is_empty() => Some(REDACTED.to_string()),
        _ => None,
    }
}

/// Display form of an uploaded TLS blob.
pub fn redact_blob(stored: Option<&[u8]>, kind: CertKind) -> Option<String> {
    match stored {
        Some(b) if !b.is_empty() => Some(kind.label().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> Vault {
        Vault::new("unit-test-process-secret", DEFAULT_VAULT_ID)
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let v = vault();
        let sealed = v.encrypt("hunter2", DEFAULT_VAULT_ID).unwrap();
        assert!(sealed.starts_with("$FLEET_VAULT;1.0;AES256-GCM;ssm\n"));
        assert!(!sealed.contains("hunter2"));
        assert_eq!(v.decrypt(&sealed, DEFAULT_VAULT_ID).unwrap(), "hunter2");
    }

    #[test]
    fn test_nonce_differs_per_encryption() {
        let v = vault();
        let a = v.encrypt_default("same").unwrap();
        let b = v.encrypt_default("same").unwrap();
        assert_ne!(a, b);
        assert_eq!(v.decrypt_default(&a).unwrap(), v.decrypt_default(&b).unwrap());
    }

    #[test]
    fn test_wrong_vault_id_is_rejected() {
        let v = vault();
        let sealed = v.encrypt("s", "alpha").unwrap();
        assert!(matches!(v.decrypt(&sealed, "beta"), Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_relabelled_header_fails_authentication() {
        let v = vault();
        let sealed = v.encrypt("s", "alpha").unwrap();
        let forged = sealed.replacen(";alpha\n", ";beta\n", 1);
        assert!(matches!(v.decrypt(&forged, "beta"), Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let v = vault();
        let sealed = v.encrypt_default("secret").unwrap();
        let (header, body) = sealed.split_once('\n').unwrap();
        let mut raw = BASE64.decode(body).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = format!("{}\n{}", header, BASE64.encode(raw));
        assert!(v.decrypt_default(&tampered).is_err());
    }

    #[test]
    fn test_different_process_secret_cannot_decrypt() {
        let sealed = vault().encrypt_default("secret").unwrap();
        let other = Vault::new("another-process-secret", DEFAULT_VAULT_ID);
        assert!(other.decrypt_default(&sealed).is_err());
    }

    #[test]
    fn test_redact_never_returns_plaintext() {
        assert_eq!(redact(Some("$FLEET_VAULT;...")).as_deref(), Some(REDACTED));
        assert_eq!(redact(Some("")), None);
        assert_eq!(redact(None), None);
        assert_eq!(redact_blob(Some(b"pem"), CertKind::Ca).as_deref(), Some("MY_CA.pem"));
        assert_eq!(redact_blob(None, CertKind::Key), None);
    }

    #[test]
    fn test_prepare_write_clears_on_absent_input() {
        let v = vault();
        assert_eq!(v.prepare_write(None, Some("old")).unwrap(), None);
        assert_eq!(v.prepare_write(Some(""), Some("old")).unwrap(), None);
    }

    #[test]
    fn test_prepare_write_marker_keeps_stored_ciphertext() {
        let v = vault();
        let stored = v.encrypt_default("s1").unwrap();
        let written = v.prepare_write(Some(REDACTED), Some(&stored)).unwrap();
        assert_eq!(written.as_deref(), Some(stored.as_str()));
    }

    #[test]
    fn test_prepare_write_marker_without_original_fails() {
        let v = vault();
        let err = v.prepare_write(Some(REDACTED), None).unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_prepare_write_encrypts_new_value() {
        let v = vault();
        let written = v.prepare_write(Some("s2"), None).unwrap().unwrap();
        assert_eq!(v.decrypt_default(&written).unwrap(), "s2");
    }

    #[test]
    fn test_debug_does_not_print_secret() {
        let printed = format!("{:?}", vault());
        assert!(!printed.contains("unit-test-process-secret"));
    }
}

//! Credential envelope encryption with AES-256-GCM
//!
//! Tenant API tokens are stored sealed by a single master key supplied
//! through `ENCRYPTION_KEY` (base64 of 32 bytes).
//!
//! Format: base64(nonce_12bytes || ciphertext || tag_16bytes)

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::Engine;
use shared::{ReportError, ReportResult};
use zeroize::{Zeroize, Zeroizing};

use super::collaborators::CredentialVault;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Master encryption key (32 bytes for AES-256-GCM)
#[derive(Clone)]
pub struct MasterKey {
    key: [u8; KEY_LEN],
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(***)")
    }
}

impl MasterKey {
    /// Parse a base64-encoded 32-byte key
    pub fn from_base64(encoded: &str) -> Result<Self, String> {
        let mut bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| "Master key is not valid base64".to_string())?;
        if bytes.len() != KEY_LEN {
            let len = bytes.len();
            bytes.zeroize();
            return Err(format!("Master key wrong length: {len} (expected {KEY_LEN})"));
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self { key })
    }

    /// Fresh random key
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut key);
        Self { key }
    }

    /// Base64 form suitable for `ENCRYPTION_KEY`
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(base64::engine::general_purpose::STANDARD.encode(self.key))
    }

    /// Encrypt plaintext → base64(nonce || ciphertext || tag)
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, &'static str> {
        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| "Invalid key")?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| "Encryption failed")?;

        let mut result = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);

        Ok(base64::engine::general_purpose::STANDARD.encode(&result))
    }

    /// Decrypt base64(nonce || ciphertext || tag) → plaintext
    pub fn decrypt(&self, encrypted_b64: &str) -> Result<Zeroizing<Vec<u8>>, &'static str> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(encrypted_b64.trim())
            .map_err(|_| "Invalid base64")?;

        if data.len() < NONCE_LEN + TAG_LEN {
            return Err("Ciphertext too short");
        }

        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| "Invalid key")?;
        let nonce = Nonce::from_slice(&data[..NONCE_LEN]);

        cipher
            .decrypt(nonce, &data[NONCE_LEN..])
            .map(Zeroizing::new)
            .map_err(|_| "Decryption failed (wrong key or tampered data)")
    }

    pub fn encrypt_string(&self, plaintext: &str) -> Result<String, &'static str> {
        self.encrypt(plaintext.as_bytes())
    }

    pub fn decrypt_string(&self, encrypted_b64: &str) -> Result<Zeroizing<String>, &'static str> {
        let bytes = self.decrypt(encrypted_b64)?;
        let text = std::str::from_utf8(&bytes).map_err(|_| "Invalid UTF-8 in decrypted data")?;
        Ok(Zeroizing::new(text.to_owned()))
    }
}

impl CredentialVault for MasterKey {
    fn decrypt(&self, blob: &str) -> ReportResult<Zeroizing<String>> {
        let token = self
            .decrypt_string(blob)
            .map_err(|e| ReportError::DecryptionFailure(e.to_string()))?;
        if token.trim().is_empty() {
            return Err(ReportError::DecryptionFailure("empty credential".into()));
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_round_trip() {
        let key = MasterKey::generate();
        let sealed = key.encrypt_string("tenant-token").unwrap();
        assert_ne!(sealed, "tenant-token");
        assert_eq!(key.decrypt_string(&sealed).unwrap().as_str(), "tenant-token");
    }

    #[test]
    fn test_nonce_is_random() {
        let key = MasterKey::generate();
        assert_ne!(key.encrypt_string("x").unwrap(), key.encrypt_string("x").unwrap());
    }

    #[test]
    fn test_wrong_key_is_decryption_failure() {
        let sealed = MasterKey::generate().encrypt_string("secret").unwrap();
        let other = MasterKey::generate();
        let err = CredentialVault::decrypt(&other, &sealed).unwrap_err();
        assert_eq!(err.code(), "decryption_failure");
    }

    #[test]
    fn test_tampered_and_garbage_blobs() {
        let key = MasterKey::generate();
        let sealed = key.encrypt_string("secret").unwrap();
        let mut raw = base64::engine::general_purpose::STANDARD.decode(&sealed).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = base64::engine::general_purpose::STANDARD.encode(raw);

        assert!(key.decrypt(&tampered).is_err());
        assert_eq!(key.decrypt("not base64!").unwrap_err(), "Invalid base64");
        assert_eq!(key.decrypt("AAAA").unwrap_err(), "Ciphertext too short");
    }

    #[test]
    fn test_empty_credential_rejected() {
        let key = MasterKey::generate();
        let sealed = key.encrypt_string("  ").unwrap();
        assert!(CredentialVault::decrypt(&key, &sealed).is_err());
    }

    #[test]
    fn test_from_base64_validates_length() {
        let key = MasterKey::generate();
        let restored = MasterKey::from_base64(&key.to_base64()).unwrap();
        let sealed = key.encrypt_string("t").unwrap();
        assert_eq!(restored.decrypt_string(&sealed).unwrap().as_str(), "t");

        assert!(MasterKey::from_base64("c2hvcnQ=").is_err());
        assert!(MasterKey::from_base64("%%%").is_err());
        assert_eq!(format!("{key:?}"), "MasterKey(***)");
    }
}

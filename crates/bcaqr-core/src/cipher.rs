//! Password cipher matching the portal's client-side `encryptMessi` routine.
//!
//! The login endpoint does not accept plaintext passwords: the web client
//! encrypts them with AES-256-CBC under a key shipped in its JavaScript bundle,
//! prefixes the random IV and base64-encodes the result. This module
//! reproduces that transform.
//!
//! The key is a public protocol constant, not a secret. Anyone holding the
//! web client (including the portal operator) can decrypt the output, so this
//! provides no confidentiality beyond what TLS already gives.

use aes::Aes256;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::{rngs::OsRng, RngCore};

use crate::api::ApiError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Key extracted from the portal's web client. Rotating it means changing
/// this constant only.
const PORTAL_CIPHER_KEY: &[u8; 32] = b"9C0XAVRJ6PQB86TVTAD6SK6XD01PSCIK";

/// AES block size, also the IV length.
pub const BLOCK_SIZE: usize = 16;

/// Encrypt a plaintext password into the format the login endpoint expects.
///
/// Output is `base64(iv || ciphertext)`. A fresh IV is drawn from the OS
/// random source on every call, so encrypting the same password twice gives
/// different output.
pub fn encrypt_password(plaintext: &str) -> Result<String, ApiError> {
    let mut iv = [0u8; BLOCK_SIZE];
    OsRng
        .try_fill_bytes(&mut iv)
        .map_err(|e| ApiError::Cipher(format!("failed to generate IV: {}", e)))?;

    let ciphertext = Aes256CbcEnc::new_from_slices(PORTAL_CIPHER_KEY, &iv)
        .map_err(|e| ApiError::Cipher(format!("failed to create cipher: {}", e)))?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    let mut payload = Vec::with_capacity(BLOCK_SIZE + ciphertext.len());
    payload.extend_from_slice(&iv);
    payload.extend_from_slice(&ciphertext);

    Ok(STANDARD.encode(payload))
}

/// Reverse of [`encrypt_password`].
pub fn decrypt_password(encoded: &str) -> Result<String, ApiError> {
    let payload = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ApiError::Cipher(format!("invalid base64: {}", e)))?;

    // IV plus at least one block of ciphertext
    if payload.len() < 2 * BLOCK_SIZE || payload.len() % BLOCK_SIZE != 0 {
        return Err(ApiError::Cipher(format!(
            "ciphertext length {} is not a whole number of blocks",
            payload.len()
        )));
    }

    let (iv, ciphertext) = payload.split_at(BLOCK_SIZE);
    let plaintext = Aes256CbcDec::new_from_slices(PORTAL_CIPHER_KEY, iv)
        .map_err(|e| ApiError::Cipher(format!("failed to create cipher: {}", e)))?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| ApiError::Cipher("invalid padding".to_string()))?;

    String::from_utf8(plaintext)
        .map_err(|e| ApiError::Cipher(format!("plaintext is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbc::cipher::block_padding::NoPadding;

    /// Decrypt without stripping padding so the pad bytes can be inspected.
    fn decrypt_raw(encoded: &str) -> Vec<u8> {
        let payload = STANDARD.decode(encoded).unwrap();
        let (iv, ciphertext) = payload.split_at(BLOCK_SIZE);
        Aes256CbcDec::new_from_slices(PORTAL_CIPHER_KEY, iv)
            .unwrap()
            .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
            .unwrap()
    }

    #[test]
    fn test_round_trip() {
        let long = "x".repeat(100);
        for plaintext in ["", "a", "hunter2", "exactly16bytes!!", "pässwörd with ünïcode", long.as_str()] {
            let encrypted = encrypt_password(plaintext).unwrap();
            assert_eq!(decrypt_password(&encrypted).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_random_iv_changes_output() {
        let first = encrypt_password("same-password").unwrap();
        let second = encrypt_password("same-password").unwrap();
        assert_ne!(first, second);

        let payload1 = STANDARD.decode(&first).unwrap();
        let payload2 = STANDARD.decode(&second).unwrap();
        assert_ne!(payload1[..BLOCK_SIZE], payload2[..BLOCK_SIZE]);

        assert_eq!(decrypt_password(&first).unwrap(), "same-password");
        assert_eq!(decrypt_password(&second).unwrap(), "same-password");
    }

    #[test]
    fn test_output_layout() {
        // 5 bytes pad to one block, plus the IV
        let payload = STANDARD.decode(encrypt_password("hello").unwrap()).unwrap();
        assert_eq!(payload.len(), 2 * BLOCK_SIZE);
    }

    #[test]
    fn test_block_aligned_input_gets_full_padding_block() {
        let plaintext = "0123456789abcdef";
        assert_eq!(plaintext.len(), BLOCK_SIZE);

        let encrypted = encrypt_password(plaintext).unwrap();
        let padded = decrypt_raw(&encrypted);
        assert_eq!(padded.len(), 2 * BLOCK_SIZE);
        assert_eq!(&padded[..BLOCK_SIZE], plaintext.as_bytes());
        assert!(padded[BLOCK_SIZE..].iter().all(|&b| b as usize == BLOCK_SIZE));
    }

    #[test]
    fn test_pad_value_equals_pad_length() {
        let padded = decrypt_raw(&encrypt_password("abc").unwrap());
        let pad = *padded.last().unwrap() as usize;
        assert_eq!(pad, BLOCK_SIZE - 3);
        assert!(padded[padded.len() - pad..].iter().all(|&b| b as usize == pad));
        assert_eq!(&padded[..padded.len() - pad], b"abc");
    }

    #[test]
    fn test_empty_plaintext_is_one_padding_block() {
        let encrypted = encrypt_password("").unwrap();
        let padded = decrypt_raw(&encrypted);
        assert_eq!(padded, vec![BLOCK_SIZE as u8; BLOCK_SIZE]);
        assert_eq!(decrypt_password(&encrypted).unwrap(), "");
    }

    #[test]
    fn test_decrypt_rejects_malformed_input() {
        assert!(matches!(decrypt_password("not base64!"), Err(ApiError::Cipher(_))));
        // Only an IV, no ciphertext
        let short = STANDARD.encode([0u8; BLOCK_SIZE]);
        assert!(matches!(decrypt_password(&short), Err(ApiError::Cipher(_))));
        // Not block aligned
        let ragged = STANDARD.encode([0u8; BLOCK_SIZE * 2 + 3]);
        assert!(matches!(decrypt_password(&ragged), Err(ApiError::Cipher(_))));
    }
}

//! Shared secret handling: strict RFC 4648 base32 decoding and CSPRNG generation.
//!
//! # Examples
//!
//! - Decode a base32 secret
//! ```
//! use dotp::Secret;
//!
//! let secret = Secret::from_base32("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ").unwrap();
//! assert_eq!(secret.as_bytes(), b"12345678901234567890");
//! ```
//!
//! - Generate a new secret and print it for the user
//! ```
//! use dotp::Secret;
//!
//! let secret = Secret::generate().unwrap();
//! assert_eq!(secret.as_bytes().len(), 10);
//! println!("new secret:\t{}", secret.to_encoded());
//! ```

use base32::Alphabet;
use constant_time_eq::constant_time_eq;
use rand::rngs::OsRng;
use rand::TryRngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Number of random bytes drawn for a new secret.
pub const GENERATED_SECRET_LEN: usize = 10;

const PAD: u8 = b'=';

/// Ways a base32 secret can be malformed. Positions are byte offsets into the
/// input; the offending text itself is never carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// Byte outside the uppercase RFC 4648 alphabet.
    Character(usize),
    /// Padding is missing, or does not complete the final 8-character group.
    Padding,
}

impl std::fmt::Display for EncodingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodingError::Character(position) => write!(
                f,
                "Invalid base32 character at position {}",
                position
            ),
            EncodingError::Padding => write!(f, "Invalid base32 padding"),
        }
    }
}

/// Different ways obtaining a secret failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretError {
    /// Input is not valid base32.
    InvalidEncoding(EncodingError),
    /// The operating system entropy source could not supply bytes.
    RandomSourceUnavailable(String),
}

impl std::error::Error for SecretError {}

impl std::fmt::Display for SecretError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretError::InvalidEncoding(e) => write!(f, "Could not decode base32 secret: {}", e),
            SecretError::RandomSourceUnavailable(reason) => {
                write!(f, "Secure random source unavailable: {}", reason)
            }
        }
    }
}

impl From<EncodingError> for SecretError {
    fn from(e: EncodingError) -> Self {
        SecretError::InvalidEncoding(e)
    }
}

/// Raw key material shared between the authenticator and the verifier.
///
/// The bytes are wiped on drop and `Debug` never prints them.
#[derive(Clone, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret(Vec<u8>);

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret(<{} bytes redacted>)", self.0.len())
    }
}

impl From<Vec<u8>> for Secret {
    fn from(bytes: Vec<u8>) -> Self {
        Secret(bytes)
    }
}

impl AsRef<[u8]> for Secret {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Secret {
    /// Decode standard base32 text. Lowercase letters are rejected, and the
    /// final group must be completed with `=` padding.
    pub fn from_base32(encoded: &str) -> Result<Secret, SecretError> {
        let data = strip_padding(encoded.as_bytes())?;
        if data.is_empty() {
            return Ok(Secret(Vec::new()));
        }
        let data = std::str::from_utf8(data).map_err(|e| EncodingError::Character(e.valid_up_to()))?;
        // Alphabet and padding are already checked, the decoder only does the bit packing.
        base32::decode(Alphabet::Rfc4648 { padding: false }, data)
            .map(Secret)
            .ok_or_else(|| EncodingError::Padding.into())
    }

    /// Draw [`GENERATED_SECRET_LEN`] bytes from the operating system CSPRNG.
    pub fn generate() -> Result<Secret, SecretError> {
        let mut bytes = vec![0u8; GENERATED_SECRET_LEN];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| SecretError::RandomSourceUnavailable(e.to_string()))?;
        Ok(Secret(bytes))
    }

    /// Padded uppercase base32 representation. This is plaintext key material.
    pub fn to_encoded(&self) -> String {
        base32::encode(Alphabet::Rfc4648 { padding: true }, &self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Decode base32 text into raw key bytes.
pub fn decode(encoded: &str) -> Result<Vec<u8>, SecretError> {
    Secret::from_base32(encoded).map(|secret| secret.as_bytes().to_vec())
}

/// Generate a new base32-encoded secret.
pub fn generate() -> Result<String, SecretError> {
    Secret::generate().map(|secret| secret.to_encoded())
}

/// Validate alphabet and padding, returning the data characters only.
fn strip_padding(input: &[u8]) -> Result<&[u8], EncodingError> {
    let data_len = input.iter().position(|&b| b == PAD).unwrap_or(input.len());
    let (data, padding) = input.split_at(data_len);

    if let Some(position) = data.iter().position(|b| !is_alphabet(*b)) {
        return Err(EncodingError::Character(position));
    }
    if let Some(position) = padding.iter().position(|&b| b != PAD) {
        return Err(EncodingError::Character(data_len + position));
    }

    // A short final group needs exactly the padding that completes it.
    match (data.len() % 8, padding.len()) {
        (0, 0) | (2, 6) | (4, 4) | (5, 3) | (7, 1) => Ok(data),
        _ => Err(EncodingError::Padding),
    }
}

fn is_alphabet(b: u8) -> bool {
    b.is_ascii_uppercase() || (b'2'..=b'7').contains(&b)
}

//! This library derives 2FA codes per TOTP ([rfc-6238](https://tools.ietf.org/html/rfc6238)) with the parameters every authenticator app understands: HMAC-SHA1, 6 digits and a 30 seconds step. It also ships the window arithmetic, the `otpauth://` provisioning URI and the live countdown renderer used by the `dotp` binary.
//!
//! # Examples
//!
//! ```rust
//! use std::time::{Duration, UNIX_EPOCH};
//! use dotp::{derive_code, validate, Secret};
//!
//! let secret = Secret::from_base32("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ").unwrap();
//! let instant = UNIX_EPOCH + Duration::from_secs(59);
//! let code = derive_code(secret.as_bytes(), instant);
//! assert_eq!(code.as_str(), "287082");
//! assert!(validate(secret.as_bytes(), "287082", instant));
//! ```
//!
//! ```rust
//! use dotp::{provisioning_uri, Secret};
//!
//! let secret = Secret::from(b"TestSecretSuperSecret".to_vec());
//! let uri = provisioning_uri(&secret.to_encoded(), "constantoine@github.com", "Github");
//! println!("{}", uri);
//! ```

mod render;
mod secret;
mod uri;
mod window;

pub use render::{progress_bar, watch, Clock, Palette, Renderer, SystemClock, Urgency};
pub use secret::{decode, generate, EncodingError, Secret, SecretError, GENERATED_SECRET_LEN};
pub use uri::provisioning_uri;
pub use window::{progress, remaining_seconds, WindowState};

use constant_time_eq::constant_time_eq;
use core::fmt;
use hmac::Mac;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

type HmacSha1 = hmac::Hmac<sha1::Sha1>;

/// Duration in seconds of a step, the recommended value per [rfc-6238](https://tools.ietf.org/html/rfc6238#section-5.2).
pub const STEP: u64 = 30;

/// Number of digits composing a code.
pub const DIGITS: usize = 6;

const MODULUS: u32 = 1_000_000;

/// A 6-digit zero-padded code. Only meaningful while the step that produced it is current.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TotpCode(String);

impl TotpCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TotpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TotpCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for TotpCode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TotpCode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Time elapsed since the Unix epoch. Instants before the epoch are clamped to it.
pub(crate) fn since_epoch(instant: SystemTime) -> Duration {
    instant.duration_since(UNIX_EPOCH).unwrap_or_default()
}

/// The moving factor: number of whole steps since the Unix epoch.
pub fn time_counter(instant: SystemTime) -> u64 {
    since_epoch(instant).as_secs() / STEP
}

/// HMAC-SHA1 of the big-endian counter.
fn sign(key: &[u8], counter: u64) -> [u8; 20] {
    // HMAC pads or hashes the key, so every length (including 0) is valid.
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(&counter.to_be_bytes());
    let mut digest = [0u8; 20];
    digest.copy_from_slice(&mac.finalize().into_bytes());
    digest
}

/// Dynamic truncation per [rfc-4226](https://tools.ietf.org/html/rfc4226#section-5.3): the low
/// nibble of the last byte selects 4 bytes, the sign bit is cleared.
fn truncate(digest: &[u8; 20]) -> u32 {
    let offset = (digest[19] & 0x0f) as usize;
    let bytes = [
        digest[offset],
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ];
    u32::from_be_bytes(bytes) & 0x7fff_ffff
}

/// Will generate the code for the step containing `instant`
pub fn derive_code(secret: &[u8], instant: SystemTime) -> TotpCode {
    let binary = truncate(&sign(secret, time_counter(instant)));
    TotpCode(format!("{:0width$}", binary % MODULUS, width = DIGITS))
}

/// Will check if `candidate` is exactly the code of the step containing `instant`.
///
/// No adjacent step is accepted: a code is only valid during its own 30 seconds.
/// The comparison is done on the formatted text, so `"12345"` never matches `"012345"`.
pub fn validate(secret: &[u8], candidate: &str, instant: SystemTime) -> bool {
    let expected = derive_code(secret, instant);
    constant_time_eq(expected.as_str().as_bytes(), candidate.as_bytes())
}

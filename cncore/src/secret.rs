//! Authentication secret minting.
//!
//! A secret is the base64 encoding of a 12-byte header followed by 16 random
//! key bytes, the layout Ceph expects inside a keyring `key = ...` line:
//!
//! ```text
//! offset  size  field
//! 0       2     format version   (u16 LE, always 1)
//! 2       4     created, seconds (u32 LE, truncated epoch)
//! 6       4     expires, seconds (u32 LE, always 0)
//! 10      2     key length       (u16 LE, always 16)
//! 12      16    key bytes
//! ```
//!
//! Encoded secrets are always 40 characters and decode to 28 bytes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cncore_shared::errors::{CncoreError, CncoreResult};
use rand::TryRngCore;
use rand::rngs::OsRng;

/// Header size in bytes.
pub const HEADER_LEN: usize = 12;

/// Random key size in bytes.
pub const KEY_LEN: usize = 16;

/// Length of a base64-encoded secret.
pub const ENCODED_SECRET_LEN: usize = 40;

/// Format version written by every secret we mint.
pub const FORMAT_VERSION: u16 = 1;

/// Expiry value meaning "never expires".
pub const NO_EXPIRY: u32 = 0;

/// Fixed-layout secret header.
///
/// Version and expiry are kept as fields rather than folded into the
/// encoder so that a future format can vary them without a new codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretHeader {
    pub version: u16,
    pub created: u32,
    pub expires: u32,
    pub key_len: u16,
}

impl SecretHeader {
    /// Header for a key minted at `created` (epoch seconds, truncated to 32 bits).
    pub fn new(created: u32) -> Self {
        Self {
            version: FORMAT_VERSION,
            created,
            expires: NO_EXPIRY,
            key_len: KEY_LEN as u16,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..2].copy_from_slice(&self.version.to_le_bytes());
        buf[2..6].copy_from_slice(&self.created.to_le_bytes());
        buf[6..10].copy_from_slice(&self.expires.to_le_bytes());
        buf[10..12].copy_from_slice(&self.key_len.to_le_bytes());
        buf
    }

    /// Parse the header at the start of `bytes`.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let bytes: &[u8; HEADER_LEN] = bytes.get(..HEADER_LEN)?.try_into().ok()?;
        Some(Self {
            version: u16::from_le_bytes([bytes[0], bytes[1]]),
            created: u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]),
            expires: u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]),
            key_len: u16::from_le_bytes([bytes[10], bytes[11]]),
        })
    }
}

/// Header stamped with the current time.
pub fn generate_header() -> [u8; HEADER_LEN] {
    let now = chrono::Utc::now().timestamp();
    SecretHeader::new(now as u32).encode()
}

/// Mint a new 40-character secret.
///
/// Fails only if the OS entropy source is unavailable, which is an
/// environment fault rather than something worth retrying.
pub fn generate_secret() -> CncoreResult<String> {
    let mut key = [0u8; KEY_LEN];
    OsRng
        .try_fill_bytes(&mut key)
        .map_err(|e| CncoreError::Environment(format!("entropy source unavailable: {}", e)))?;

    let mut secret = Vec::with_capacity(HEADER_LEN + KEY_LEN);
    secret.extend_from_slice(&generate_header());
    secret.extend_from_slice(&key);

    Ok(STANDARD.encode(secret))
}

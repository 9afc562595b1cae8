//! Salted PBKDF2-HMAC-SHA256 password hashes
//!
//! Stored form: `pbkdf2-sha256$<iterations>$<salt>$<hash>` with base64 salt and hash.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SCHEME: &str = "pbkdf2-sha256";
pub const DEFAULT_ITERATIONS: u32 = 50_000;

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    hash_password_with(password, DEFAULT_ITERATIONS)
}

pub fn hash_password_with(password: &str, iterations: u32) -> Result<String> {
    let salt = uuid::Uuid::new_v4();
    let hash = pbkdf2(password.as_bytes(), salt.as_bytes(), iterations)?;
    Ok(format!(
        "{}${}${}${}",
        SCHEME,
        iterations,
        STANDARD_NO_PAD.encode(salt.as_bytes()),
        STANDARD_NO_PAD.encode(hash)
    ))
}

/// Check `password` against a stored hash. Malformed hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match check(password, stored) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!("Unreadable password hash: {:#}", e);
            false
        }
    }
}

fn check(password: &str, stored: &str) -> Result<bool> {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        anyhow::bail!("Expected four fields");
    };
    if scheme != SCHEME {
        anyhow::bail!("Unknown scheme: {}", scheme);
    }

    let iterations: u32 = iterations.parse().context("Bad iteration count")?;
    let salt = STANDARD_NO_PAD.decode(salt).context("Bad salt")?;
    let expected = STANDARD_NO_PAD.decode(expected).context("Bad hash")?;

    let actual = pbkdf2(password.as_bytes(), &salt, iterations)?;
    Ok(constant_time_eq(&actual, &expected))
}

/// Single-block PBKDF2 (RFC 8018) with HMAC-SHA256
fn pbkdf2(password: &[u8], salt: &[u8], iterations: u32) -> Result<[u8; 32]> {
    if iterations == 0 {
        anyhow::bail!("Iteration count must be positive");
    }

    let prf = HmacSha256::new_from_slice(password)
        .map_err(|_| anyhow::anyhow!("Invalid HMAC key length"))?;

    let mut mac = prf.clone();
    mac.update(salt);
    mac.update(&1u32.to_be_bytes());
    let mut block: [u8; 32] = mac.finalize().into_bytes().into();
    let mut output = block;

    for _ in 1..iterations {
        let mut mac = prf.clone();
        mac.update(&block);
        block = mac.finalize().into_bytes().into();
        for (out, b) in output.iter_mut().zip(block.iter()) {
            *out ^= b;
        }
    }

    Ok(output)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

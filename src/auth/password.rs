//! Password Hashing
//!
//! PBKDF2-HMAC-SHA256 with a random per-user salt. Stored form:
//! `pbkdf2-sha256$<iterations>$<salt hex>$<hash hex>`.

use rand::RngCore;
use sha2::Sha256;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_BYTES: usize = 16;
const HASH_BYTES: usize = 32;

/// Iteration count used when nothing else is configured
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str, iterations: u32) -> String {
    let mut salt = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt);
    let hash = derive(password, &salt, iterations);
    format!("{}${}${}${}", SCHEME, iterations, hex::encode(salt), hex::encode(hash))
}

/// Check a password against a stored hash. Unparseable hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((iterations, salt, expected)) = parse(stored) else {
        return false;
    };
    let actual = derive(password, &salt, iterations);
    constant_time_eq(&actual, &expected)
}

/// Burn the same work as a real verification, for unknown usernames
pub fn dummy_verify(password: &str, iterations: u32) {
    let _ = derive(password, &[0u8; SALT_BYTES], iterations);
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_BYTES] {
    let mut out = [0u8; HASH_BYTES];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

fn parse(stored: &str) -> Option<(u32, Vec<u8>, Vec<u8>)> {
    let mut parts = stored.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let iterations = parts.next()?.parse::<u32>().ok().filter(|n| *n > 0)?;
    let salt = hex::decode(parts.next()?).ok()?;
    let hash = hex::decode(parts.next()?).ok()?;
    if parts.next().is_some() || hash.len() != HASH_BYTES {
        return None;
    }
    Some((iterations, salt, hash))
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

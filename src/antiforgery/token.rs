//! Request token signing.
//!
//! Request token format: `<nonce>.<hmac>` where the HMAC-SHA256 covers the
//! session id, the session's cookie token and the nonce.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Returns `len` random bytes, hex encoded.
pub fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn signature(secret: &[u8], session_id: &str, cookie_token: &str, nonce: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(session_id.as_bytes());
    mac.update(b"|");
    mac.update(cookie_token.as_bytes());
    mac.update(b"|");
    mac.update(nonce.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Signs a fresh request token bound to the session's cookie token.
pub fn sign(secret: &[u8], session_id: &str, cookie_token: &str) -> Option<String> {
    let nonce = random_hex(16);
    let sig = signature(secret, session_id, cookie_token, &nonce)?;
    Some(format!("{nonce}.{sig}"))
}

/// Checks that `token` was signed for this session and cookie token.
pub fn verify(secret: &[u8], session_id: &str, cookie_token: &str, token: &str) -> bool {
    let Some((nonce, sig)) = token.split_once('.') else {
        return false;
    };
    if nonce.is_empty() || sig.is_empty() {
        return false;
    }
    match signature(secret, session_id, cookie_token, nonce) {
        Some(expected) => expected.as_bytes().ct_eq(sig.as_bytes()).into(),
        None => false,
    }
}

//! HMAC-SHA256 signatures for inbound webhooks.
//!
//! The sender signs the raw request body with the shared secret and puts
//! the lowercase hex digest in the `X-LiveKit-Signature` header.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex-encoded body signature.
pub const SIGNATURE_HEADER: &str = "X-LiveKit-Signature";

fn mac_for(secret: &[u8], payload: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC key length is valid");
    mac.update(payload);
    mac
}

/// Returns the lowercase hex HMAC-SHA256 of `payload`.
pub fn sign(secret: &[u8], payload: &[u8]) -> String {
    hex::encode(mac_for(secret, payload).finalize().into_bytes())
}

/// Checks `signature` against the HMAC of `payload` in constant time.
///
/// Malformed hex never matches.
pub fn verify(secret: &[u8], payload: &[u8], signature: &str) -> bool {
    let Ok(provided) = hex::decode(signature.trim()) else {
        return false;
    };
    mac_for(secret, payload).verify_slice(&provided).is_ok()
}

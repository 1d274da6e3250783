use crate::error::{Error, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 signature over an outgoing notification body, hex encoded.
/// The notification server verifies it against the shared secret.
pub fn sign_payload(secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Internal(format!("Invalid signing key: {}", e)))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

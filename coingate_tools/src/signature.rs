//! Payment callbacks carry an HMAC-SHA256 of the raw request body, keyed with the callback secret and hex-encoded in
//! the [`SIGNATURE_HEADER`] header.
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;

use crate::CoinGateApiError;

pub const SIGNATURE_HEADER: &str = "X-CoinGate-Signature";

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `body`
pub fn sign_callback(secret: &str, body: &[u8]) -> Result<String, CoinGateApiError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| CoinGateApiError::Initialization(format!("Invalid callback secret. {e}")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks the signature of a callback body. The comparison runs in constant time.
///
/// An empty secret never verifies anything, so a misconfigured server rejects every callback rather than accepting
/// forged ones.
pub fn verify_callback_signature(secret: &str, body: &[u8], signature: Option<&str>) -> Result<(), CoinGateApiError> {
    if secret.is_empty() {
        warn!("💳️ No callback secret is configured. Rejecting callback.");
        return Err(CoinGateApiError::InvalidSignature);
    }
    let signature = signature.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
        debug!("💳️ Callback has no signature");
        CoinGateApiError::InvalidSignature
    })?;
    let expected = hex::decode(signature).map_err(|e| {
        debug!("💳️ Callback signature is not valid hex. {e}");
        CoinGateApiError::InvalidSignature
    })?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| CoinGateApiError::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| {
        warn!("💳️ Callback signature does not match");
        CoinGateApiError::InvalidSignature
    })
}

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::payment_provider::{PaymentProvider, SignatureEncoding},
};

type HmacSha256 = Hmac<Sha256>;

/// Verify an HMAC-SHA256 signature computed over the raw request body.
///
/// The comparison runs in constant time via `Mac::verify_slice`.
pub fn verify_signature(
    provider: PaymentProvider,
    secret: &SecretString,
    body: &[u8],
    header_value: &str,
) -> AppResult<()> {
    let supplied = decode_signature(header_value.trim(), provider.signature_encoding())
        .ok_or(AppError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|_| AppError::Internal("HMAC error".into()))?;
    mac.update(body);
    mac.verify_slice(&supplied)
        .map_err(|_| AppError::InvalidSignature)
}

/// Produce the header value a provider would send for `body`.
pub fn sign(secret: &str, body: &[u8], encoding: SignatureEncoding) -> String {
    // HMAC accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
    mac.update(body);
    let bytes = mac.finalize().into_bytes();
    match encoding {
        SignatureEncoding::Hex => hex::encode(bytes),
        SignatureEncoding::Base64 => BASE64.encode(bytes),
    }
}

fn decode_signature(value: &str, encoding: SignatureEncoding) -> Option<Vec<u8>> {
    if value.is_empty() {
        return None;
    }
    match encoding {
        SignatureEncoding::Hex => hex::decode(value).ok(),
        SignatureEncoding::Base64 => BASE64.decode(value).ok(),
    }
}

//! Shareable record payloads.
//!
//! A record travels as `<origin><path>?pid=<id>#view=<payload>`, where the
//! payload is the record's JSON encoded as unpadded URL-safe base64. The
//! `pid` parameter is informational; the fragment is authoritative.
//!
//! Decoding also accepts the standard base64 alphabet with or without
//! padding, so slips printed by older clients still verify.

mod qr;
mod verify;

pub use qr::*;
pub use verify::*;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use thiserror::Error;

use crate::models::PatientRecord;

/// Prefix of the authoritative URL fragment.
pub const VIEW_FRAGMENT_PREFIX: &str = "#view=";

/// Payload encoding/decoding errors.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Invalid record JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record has no id")]
    MissingId,

    #[error("QR rendering failed: {0}")]
    Qr(String),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Encode a record as a URL-safe payload.
pub fn encode_payload(record: &PatientRecord) -> CodecResult<String> {
    let json = serde_json::to_string(record)?;
    Ok(URL_SAFE_NO_PAD.encode(json.as_bytes()))
}

/// Decode a payload back into a record.
pub fn decode_payload(payload: &str) -> CodecResult<PatientRecord> {
    let bytes = URL_SAFE_NO_PAD.decode(normalize_payload(payload))?;
    let json = String::from_utf8(bytes)?;
    let record: PatientRecord = serde_json::from_str(&json)?;

    if record.id.trim().is_empty() {
        return Err(CodecError::MissingId);
    }
    Ok(record)
}

/// Decode a payload, logging and discarding any failure.
pub fn decode(payload: &str) -> Option<PatientRecord> {
    match decode_payload(payload) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to decode shared record");
            None
        }
    }
}

/// Map standard-alphabet and padded payloads onto unpadded URL-safe base64.
fn normalize_payload(payload: &str) -> String {
    let mut trimmed = payload.trim();
    while let Some(rest) = trimmed
        .strip_suffix('=')
        .or_else(|| trimmed.strip_suffix("%3D"))
        .or_else(|| trimmed.strip_suffix("%3d"))
    {
        trimmed = rest;
    }

    trimmed
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect()
}

/// Origin and path of a URL, without query or fragment.
pub fn strip_location(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// Build the shareable URL for a record.
pub fn share_url(base_url: &str, record: &PatientRecord) -> CodecResult<String> {
    let payload = encode_payload(record)?;
    Ok(format!(
        "{}?pid={}{}{}",
        strip_location(base_url),
        record.id,
        VIEW_FRAGMENT_PREFIX,
        payload
    ))
}

/// Shareable URL, falling back to the bare record id if encoding fails.
pub fn shareable_url_or_id(base_url: &str, record: &PatientRecord) -> String {
    share_url(base_url, record).unwrap_or_else(|e| {
        tracing::warn!(id = %record.id, error = %e, "Failed to encode record for QR code");
        record.id.clone()
    })
}

/// Payload carried in a `#view=` fragment of a URL or bare hash.
pub fn view_fragment(url_or_hash: &str) -> Option<&str> {
    let hash_start = url_or_hash.find('#')?;
    url_or_hash[hash_start..].strip_prefix(VIEW_FRAGMENT_PREFIX)
}

//! Reversible identifier codecs.
//!
//! [`encode_id`] maps an arbitrary UTF-8 remote id onto the alphabet
//! `[a-z0-9_=]`, byte by byte:
//!
//! | input byte  | output                          |
//! |-------------|---------------------------------|
//! | `_`         | `__`                            |
//! | `a-z`, `0-9`| unchanged                       |
//! | `A-Z`       | `_` + the lowercase letter      |
//! | anything    | `=` + two lowercase hex digits  |
//!
//! Suffixes embed a remote key into a home-network identifier:
//! `"{puppet}_{encoded}"` for isolated puppets, `"_{encoded}"` for the shared
//! global bucket.

use pb_types::PuppetId;

use crate::error::{NamespaceError, NamespaceResult};

/// Encode a remote id into the identifier-safe alphabet.
pub fn encode_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for &byte in id.as_bytes() {
        match byte {
            b'_' => out.push_str("__"),
            b'a'..=b'z' | b'0'..=b'9' => out.push(byte as char),
            b'A'..=b'Z' => {
                out.push('_');
                out.push(byte.to_ascii_lowercase() as char);
            }
            _ => {
                out.push('=');
                out.push_str(&format!("{byte:02x}"));
            }
        }
    }
    out
}

/// Reverse [`encode_id`]. Fails on any sequence `encode_id` cannot produce.
pub fn decode_id(encoded: &str) -> NamespaceResult<String> {
    let malformed = |reason: &str| NamespaceError::MalformedEncodedId {
        input: encoded.to_string(),
        reason: reason.to_string(),
    };
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                match bytes.get(i + 1).copied() {
                    Some(b'_') => out.push(b'_'),
                    Some(c) if c.is_ascii_lowercase() => out.push(c.to_ascii_uppercase()),
                    _ => return Err(malformed("dangling escape '_'")),
                }
                i += 2;
            }
            b'=' => {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .ok_or_else(|| malformed("truncated escape '='"))?;
                if !hex.iter().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
                    return Err(malformed("escape '=' needs two lowercase hex digits"));
                }
                let hex = std::str::from_utf8(hex).map_err(|_| malformed("invalid escape"))?;
                let byte = u8::from_str_radix(hex, 16).map_err(|_| malformed("invalid escape"))?;
                out.push(byte);
                i += 3;
            }
            c @ (b'a'..=b'z' | b'0'..=b'9') => {
                out.push(c);
                i += 1;
            }
            _ => return Err(malformed("character outside the encoded alphabet")),
        }
    }
    String::from_utf8(out).map_err(|_| malformed("decoded bytes are not UTF-8"))
}

/// Build the suffix for `(puppet, remote_id)`.
///
/// The shared bucket ([`PuppetId::GLOBAL`]) is only addressable when the
/// global namespace is enabled.
pub fn make_suffix(puppet: PuppetId, remote_id: &str, global_enabled: bool) -> NamespaceResult<String> {
    if puppet.is_global() {
        if !global_enabled {
            return Err(NamespaceError::GlobalNamespaceDisabled);
        }
        return Ok(format!("_{}", encode_id(remote_id)));
    }
    if puppet.get() < 0 {
        return Err(NamespaceError::InvalidPuppetId(puppet));
    }
    Ok(format!("{}_{}", puppet, encode_id(remote_id)))
}

/// Split a suffix back into `(puppet, remote_id)`.
pub fn decode_suffix(suffix: &str, global_enabled: bool) -> NamespaceResult<(PuppetId, String)> {
    if let Some(encoded) = suffix.strip_prefix('_') {
        if !global_enabled {
            return Err(NamespaceError::GlobalNamespaceDisabled);
        }
        return Ok((PuppetId::GLOBAL, decode_id(encoded)?));
    }
    let digits = suffix.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || suffix.as_bytes().get(digits) != Some(&b'_') {
        return Err(NamespaceError::MalformedSuffix(suffix.to_string()));
    }
    let puppet: i64 = suffix[..digits]
        .parse()
        .map_err(|_| NamespaceError::MalformedSuffix(suffix.to_string()))?;
    let remote_id = decode_id(&suffix[digits + 1..])?;
    Ok((PuppetId::new(puppet), remote_id))
}

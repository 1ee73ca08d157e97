// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Blob-reference codec.
//!
//! A blob href is `<base>/blob/<token>` where the token is the standard
//! base64 (padded) of a compact JSON object with exactly four single-letter
//! keys: `O` offset, `S` size, `M` permission bits, `P` server-relative
//! path. The token is opaque to clients but carries no authentication;
//! anyone able to synthesize one can address arbitrary offsets under the
//! server root.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::BlobInfo;

#[derive(Debug, thiserror::Error)]
pub enum BlobCodecError {
    #[error("invalid blob token encoding: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid blob token payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// The token payload. Field order matters: it fixes the JSON key order and
/// therefore the token bytes.
#[derive(Serialize, Deserialize)]
struct BlobHref {
    #[serde(rename = "O")]
    offset: i64,
    #[serde(rename = "S")]
    size: i64,
    #[serde(rename = "M")]
    perm: u32,
    #[serde(rename = "P")]
    path: String,
}

/// Encode a blob reference as an absolute URL under `base`.
pub fn encode_href(base: &Url, bi: &BlobInfo) -> String {
    let payload = BlobHref {
        offset: bi.offset,
        size: bi.size,
        perm: bi.perm,
        path: bi.path.clone(),
    };
    // BlobHref has no map keys and no non-string keys, so serialization
    // cannot fail.
    let json = serde_json::to_vec(&payload).unwrap_or_default();
    let token = BASE64.encode(json);
    format!("{}/blob/{}", base.as_str().trim_end_matches('/'), token)
}

/// Decode a bare token into a [`BlobInfo`] with an empty `href`.
pub fn decode_token(token: &str) -> Result<BlobInfo, BlobCodecError> {
    let bytes = BASE64.decode(token)?;
    let payload: BlobHref = serde_json::from_slice(&bytes)?;
    Ok(BlobInfo {
        path: payload.path,
        offset: payload.offset,
        size: payload.size,
        perm: payload.perm,
        href: String::new(),
    })
}

/// Decode an href (absolute URL or bare path) relative to `base`. The
/// base's path prefix and any leading separator are stripped before the
/// token is decoded.
pub fn decode_href(base: &Url, href: &str) -> Result<BlobInfo, BlobCodecError> {
    let path = match Url::parse(href) {
        Ok(url) => url.path().to_string(),
        Err(_) => href.to_string(),
    };
    let token = path
        .strip_prefix(base.path())
        .unwrap_or(&path)
        .trim_start_matches('/');
    decode_token(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bi(offset: i64, size: i64, perm: u32, path: &str) -> BlobInfo {
        BlobInfo {
            path: path.to_string(),
            offset,
            size,
            perm,
            href: String::new(),
        }
    }

    const TOKEN: &str = "eyJPIjoxMDAsIlMiOjY0LCJNIjo1MTEsIlAiOiIvdG1wL2ZpbGUifQ==";

    #[test]
    fn encode_known_vectors() {
        let expected = format!("http://localhost:58080/blob/{}", TOKEN);
        for base in ["http://localhost:58080", "http://localhost:58080/"] {
            let base = Url::parse(base).unwrap();
            let href = encode_href(&base, &bi(100, 64, 0o777, "/tmp/file"));
            assert_eq!(href, expected);
        }
    }

    #[test]
    fn decode_known_vectors() {
        let full = format!("http://localhost:58080/blob/{}", TOKEN);
        let bare = format!("/blob/{}", TOKEN);
        let cases = [
            ("http://localhost:58080/blob", full.as_str()),
            ("http://localhost:58080/blob/", full.as_str()),
            ("http://localhost:58080/blob", bare.as_str()),
            ("http://localhost:58080/blob/", bare.as_str()),
        ];
        for (base, href) in cases {
            let base = Url::parse(base).unwrap();
            let decoded = decode_href(&base, href).unwrap();
            assert_eq!(decoded, bi(100, 64, 511, "/tmp/file"));
        }
    }

    #[test]
    fn round_trip_preserves_fields() {
        let base = Url::parse("http://h:1/").unwrap();
        let cases = [
            bi(0, 0, 0, "x"),
            bi(900, 100, 0o444, "/deep/ly/nested/file.bin"),
            bi(i64::MAX, 1, 0o222, "spaces in name"),
        ];
        for want in cases {
            let href = encode_href(&base, &want);
            let got = decode_href(&Url::parse("http://h:1/blob").unwrap(), &href).unwrap();
            assert_eq!(got, want);
        }
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_token("not base64 at all!").is_err());
        // Valid base64, but the payload is not a token.
        let token = BASE64.encode(b"[1,2,3]");
        assert!(decode_token(&token).is_err());
    }
}

// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Bulk-transfer endpoints.
//!
//! `/blob/<token>` carries file payloads out of band from the metadata RPC:
//! GET streams a byte range described by the token, POST writes a multipart
//! part at the token's offset. `/volumes/<path>` serves whole files for
//! direct download.

use axum::body::Body;
use axum::extract::{Multipart, Path as UrlPath, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use std::io;
use std::io::SeekFrom;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::debug;

use webfs_proto::blob::decode_token;

use crate::respond::{internal_server_error, not_found};
use crate::server::AppState;

/// Upper bound on a single blob upload request.
pub const MAX_UPLOAD_SIZE: usize = 100 * 1024 * 1024;

const BLOB_FIELD: &str = "blob";

fn resolve(root: &Path, name: &str) -> PathBuf {
    root.join(name.trim_start_matches('/'))
}

pub(crate) async fn download(
    State(state): State<AppState>,
    UrlPath(token): UrlPath<String>,
) -> Response {
    let bi = match decode_token(&token) {
        Ok(bi) => bi,
        Err(err) => return internal_server_error(err),
    };
    debug!(offset = bi.offset, size = bi.size, path = %bi.path, "blob download");

    let path = resolve(&state.root, &bi.path);
    serve_range(&path, bi.offset.max(0) as u64, Some(bi.size.max(0) as u64)).await
}

pub(crate) async fn volume_download(
    State(state): State<AppState>,
    UrlPath(name): UrlPath<String>,
) -> Response {
    let path = resolve(&state.root, &name);
    serve_range(&path, 0, None).await
}

/// Stream `len` bytes of `path` starting at `offset`; `None` means the
/// whole file. The content type is sniffed from the leading bytes and the
/// basename rides along as a `;`-suffix.
async fn serve_range(path: &Path, offset: u64, len: Option<u64>) -> Response {
    let mut file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(_) => return not_found(path.display()),
    };

    let mut head = vec![0u8; 512];
    let n = file.read(&mut head).await.unwrap_or(0);
    head.truncate(n);
    let content_type = detect_content_type(&head);

    let total = match file.metadata().await {
        Ok(meta) => meta.len(),
        Err(err) => return internal_server_error(err),
    };
    let len = len
        .unwrap_or(total)
        .min(total.saturating_sub(offset.min(total)));

    if let Err(err) = file.seek(SeekFrom::Start(offset)).await {
        return internal_server_error(err);
    }

    let basename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stream = ReaderStream::new(file.take(len));

    (
        [
            (
                header::CONTENT_TYPE,
                format!("{};{}", content_type, basename),
            ),
            (header::CONTENT_LENGTH, len.to_string()),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

pub(crate) async fn upload(
    State(state): State<AppState>,
    UrlPath(token): UrlPath<String>,
    mut multipart: Multipart,
) -> Response {
    let bi = match decode_token(&token) {
        Ok(bi) => bi,
        Err(err) => return internal_server_error(err),
    };
    debug!(offset = bi.offset, size = bi.size, path = %bi.path, "blob upload");

    // A single part named `blob` carries the payload; the part's filename
    // is not significant.
    let data = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(BLOB_FIELD) => match field.bytes().await {
                Ok(bytes) => break bytes,
                Err(err) => return internal_server_error(err),
            },
            Ok(Some(_)) => continue,
            Ok(None) => return internal_server_error("missing multipart field \"blob\""),
            Err(err) => return internal_server_error(err),
        }
    };

    let path = resolve(&state.root, &bi.path);
    let offset = bi.offset.max(0) as u64;
    let written = tokio::task::spawn_blocking(move || -> io::Result<usize> {
        let file = std::fs::OpenOptions::new().read(true).write(true).open(&path)?;
        file.write_all_at(&data, offset)?;
        Ok(data.len())
    })
    .await;

    match written {
        Ok(Ok(n)) => Json(json!({ "N": n })).into_response(),
        Ok(Err(err)) => internal_server_error(err),
        Err(err) => internal_server_error(err),
    }
}

/// Content sniffing from the leading bytes: known magic numbers first,
/// then a UTF-8 check. An incomplete multi-byte sequence at the cut-off
/// still counts as text.
fn detect_content_type(head: &[u8]) -> &'static str {
    if head.is_empty() {
        return "text/plain; charset=utf-8";
    }
    if let Some(kind) = infer::get(head) {
        return kind.mime_type();
    }
    match std::str::from_utf8(head) {
        Ok(_) => "text/plain; charset=utf-8",
        Err(err) if err.error_len().is_none() => "text/plain; charset=utf-8",
        Err(_) => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_text_and_binary() {
        assert_eq!(detect_content_type(b"hello world"), "text/plain; charset=utf-8");
        assert_eq!(detect_content_type(&[0x00, 0xff, 0x13, 0x37]), "application/octet-stream");
        assert_eq!(detect_content_type(b""), "text/plain; charset=utf-8");
    }

    #[test]
    fn sniffs_known_magic() {
        let png = [0x89u8, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0];
        assert_eq!(detect_content_type(&png), "image/png");
    }

    #[test]
    fn truncated_utf8_tail_is_still_text() {
        // "é" is two bytes; cut it in half.
        let mut head = b"caf".to_vec();
        head.push(0xc3);
        assert_eq!(detect_content_type(&head), "text/plain; charset=utf-8");
    }
}

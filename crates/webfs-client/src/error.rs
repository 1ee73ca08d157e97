// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Client error taxonomy.
//!
//! Transport and parse failures are distinct from remote POSIX failures:
//! the former have no meaningful errno and degrade to EIO at the kernel
//! boundary, the latter carry the server's errno verbatim.

use webfs_proto::Errno;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("malformed reply: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unexpected http status: {0}")]
    Status(reqwest::StatusCode),

    /// HTTP 404 on a resource lookup, kept apart from plain status errors
    /// so pollers can stop early on a vanished resource.
    #[error("not found: {0}")]
    NotFound(String),

    /// POSIX failure reported by the server inside the reply envelope.
    #[error(transparent)]
    Remote(Errno),
}

impl ClientError {
    /// The errno to surface to a kernel caller; `None` means the failure
    /// has no POSIX identity.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            ClientError::Remote(errno) => Some(*errno),
            _ => None,
        }
    }
}

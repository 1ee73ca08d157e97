// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Plain-text failure responses.
//!
//! Transport-level failures use HTTP status codes; POSIX failures never do
//! (those travel inside the `CallResult` envelope with HTTP 200).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt::Display;
use tracing::warn;

pub(crate) fn internal_server_error(err: impl Display) -> Response {
    let body = format!("internal server error: {}\n", err);
    warn!("{}", body.trim_end());
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

pub(crate) fn not_found(what: impl Display) -> Response {
    let body = format!("not found: {}\n", what);
    warn!("{}", body.trim_end());
    (StatusCode::NOT_FOUND, body).into_response()
}

pub(crate) fn not_supported(method: &axum::http::Method, what: impl Display) -> Response {
    let body = format!("not supported: {:?} {}\n", method.as_str(), what);
    warn!("{}", body.trim_end());
    (StatusCode::NOT_FOUND, body).into_response()
}

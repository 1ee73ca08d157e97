// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Blocking RPC client for the webfs protocol.
//!
//! Wraps the `/fs/<op>` envelope surface, the `/blob/<token>` transfer
//! endpoints and the `/procs` supervisor behind typed methods.

mod client;
mod error;

pub use client::Client;
pub use error::{ClientError, ClientResult};

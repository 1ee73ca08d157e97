// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! webfs protocol — wire types shared by the server, the RPC client and
//! the mount adapter.
//!
//! Every `/fs/<op>` request carries a [`CallArgs`] envelope and every reply
//! a [`CallResult`] envelope; bulk data travels out-of-band through
//! `/blob/<token>` URLs produced by the [`blob`] codec.

pub mod blob;
pub mod errno;
pub mod types;

pub use blob::{decode_href, decode_token, encode_href, BlobCodecError};
pub use errno::Errno;
pub use types::{
    is_regular, Attr, BlobInfo, CallArgs, CallResult, DirEntry, FileInfo, Owner, Proc, RunResult,
    RunState, StatData, StatfsData, TimespecData,
};

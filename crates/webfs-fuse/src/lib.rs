// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! webfs FUSE host — mounts a remote webfs server as a local filesystem.
//!
//! Every kernel operation on the mount becomes a request through the
//! blocking RPC client; file payloads travel through the blob endpoints.

pub mod adapter;
pub mod handle;
pub mod mount;

pub use adapter::WebFs;
pub use handle::RemoteFile;
pub use mount::{mount, MountConfig, MountError};

// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! webfs server — exports a host directory over HTTP.
//!
//! The metadata surface lives under `/fs/<op>` and mirrors the POSIX
//! syscall set one endpoint per operation; bulk payloads travel through
//! `/blob/<token>` references minted by the node. `/procs` supervises
//! remote command execution and `/root/` offers plain file browsing.

mod blob;
pub mod node;
pub mod procs;
mod respond;
pub mod server;

pub use node::FileNode;
pub use procs::resolve_args;
pub use server::{Server, ServerConfig, ServerError};

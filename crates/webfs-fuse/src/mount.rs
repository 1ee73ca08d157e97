// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Mount lifecycle.
//!
//! Wires the adapter into the kernel and blocks until unmount. SIGINT and
//! SIGTERM trigger an unmount rather than killing the process outright, so
//! the kernel mount never dangles.

use fuser::MountOption;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use webfs_client::{Client, ClientError};

use crate::adapter::WebFs;

#[derive(Debug, Clone, Default)]
pub struct MountConfig {
    pub allow_other: bool,
    pub read_only: bool,
    pub auto_unmount: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("remote connection failed: {0}")]
    Client(#[from] ClientError),
    #[error("mount failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("signal handler installation failed: {0}")]
    Signal(#[from] ctrlc::Error),
}

/// Mount `remote_url` at `mountpoint` and block until the filesystem is
/// unmounted.
pub fn mount(mountpoint: &Path, remote_url: &str, config: &MountConfig) -> Result<(), MountError> {
    let client = Arc::new(Client::new(remote_url)?);
    let root_path = client.base_url().path().to_string();
    let fs = WebFs::new(client, &root_path)?;

    let mut options = vec![
        MountOption::FSName(remote_url.to_string()),
        MountOption::Subtype("webfs".to_string()),
    ];
    if config.allow_other {
        options.push(MountOption::AllowOther);
        // Let the kernel check file permissions for us.
        options.push(MountOption::DefaultPermissions);
    }
    if config.read_only {
        options.push(MountOption::RO);
    }
    if config.auto_unmount {
        options.push(MountOption::AutoUnmount);
    }

    let mut session = fuser::Session::new(fs, mountpoint, &options)?;
    let mut unmounter = session.unmount_callable();
    ctrlc::set_handler(move || {
        info!("caught termination signal, unmounting");
        let _ = unmounter.unmount();
    })?;

    info!(mountpoint = %mountpoint.display(), remote = remote_url, "mounted");
    session.run()?;
    info!("unmounted");
    Ok(())
}

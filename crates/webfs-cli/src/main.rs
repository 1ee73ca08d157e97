// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! webfs binary.
//!
//! `webfs serve` exports a host directory over HTTP; `webfs mount` mounts
//! a remote export into the kernel.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use url::Url;

use webfs_fuse::MountConfig;
use webfs_server::{Server, ServerConfig};

#[derive(Parser)]
#[command(name = "webfs", version, about = "Remote directory trees over HTTP")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export a host directory over HTTP
    Serve {
        /// Port the server listens on
        #[arg(short, long, default_value_t = 58080)]
        port: u16,

        /// Base directory for resolving file paths
        #[arg(long, default_value_os_t = default_root())]
        root: PathBuf,

        /// Public service URL used for blob upload/download references
        #[arg(long, default_value = "http://localhost:58080/")]
        url: Url,
    },

    /// Mount a remote export as a local filesystem
    Mount {
        /// Where to mount
        mountpoint: PathBuf,

        /// Remote server URL, e.g. http://host:58080/
        remote: String,

        /// Print debugging messages
        #[arg(long)]
        debug: bool,

        /// Mount with -o allow_other
        #[arg(long)]
        allow_other: bool,

        /// Mount the filesystem read-only
        #[arg(short = 'r', long)]
        read_only: bool,

        /// Unmount automatically when the process exits
        #[arg(long)]
        auto_unmount: bool,

        /// Quiet
        #[arg(short, long)]
        quiet: bool,
    },
}

fn default_root() -> PathBuf {
    std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("/"))
}

fn init_logging(default: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { port, root, url } => {
            init_logging("info");
            let server = Server::new(ServerConfig { port, root, url })?;
            tokio::runtime::Runtime::new()?.block_on(server.run())?;
        }
        Command::Mount {
            mountpoint,
            remote,
            debug,
            allow_other,
            read_only,
            auto_unmount,
            quiet,
        } => {
            init_logging(if quiet {
                "error"
            } else if debug {
                "debug"
            } else {
                "info"
            });
            let config = MountConfig {
                allow_other,
                read_only,
                auto_unmount,
            };
            webfs_fuse::mount(&mountpoint, &remote, &config)?;
        }
    }

    Ok(())
}

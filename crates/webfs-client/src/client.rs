// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Blocking RPC client, one method per `/fs/<op>` plus the blob and proc
//! surfaces. All methods block on HTTP I/O; the kernel bridge calls them
//! from its own worker threads.

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client as HttpClient;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use webfs_proto::{
    Attr, BlobInfo, CallArgs, CallResult, DirEntry, Owner, Proc, RunResult, StatData, StatfsData,
};

use crate::error::{ClientError, ClientResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// RPC client bound to one server base URL. A single HTTP client is shared
/// across all operations so connections get reused.
#[derive(Debug, Clone)]
pub struct Client {
    base: Url,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let base = Url::parse(base_url)?;
        let http = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Client { base, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// POST one `/fs/<op>` envelope and decode the reply payload.
    fn call<T: DeserializeOwned>(&self, op: &str, args: &CallArgs) -> ClientResult<T> {
        let result = self.call_raw(op, args)?;
        let data = result.data.unwrap_or(serde_json::Value::Null);
        Ok(serde_json::from_value(data)?)
    }

    /// Same as [`Client::call`] for ops whose success payload is empty.
    fn call_unit(&self, op: &str, args: &CallArgs) -> ClientResult<()> {
        self.call_raw(op, args).map(|_| ())
    }

    fn call_raw(&self, op: &str, args: &CallArgs) -> ClientResult<CallResult> {
        debug!(op, path = %args.path, "fs call");
        let url = self.base.join(&format!("/fs/{}", op))?;

        let response = self.http.post(url).json(args).send()?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }

        let result: CallResult = serde_json::from_slice(&response.bytes()?)?;
        if !result.status.is_ok() {
            return Err(ClientError::Remote(result.status));
        }
        Ok(result)
    }

    pub fn statfs(&self, path: &str) -> ClientResult<StatfsData> {
        self.call("statfs", &path_args(path))
    }

    pub fn stat(&self, path: &str) -> ClientResult<StatData> {
        self.call("stat", &path_args(path))
    }

    pub fn lstat(&self, path: &str) -> ClientResult<StatData> {
        self.call("lstat", &path_args(path))
    }

    pub fn setattr(&self, path: &str, attr: Attr) -> ClientResult<StatData> {
        self.call(
            "setattr",
            &CallArgs {
                path: path.to_string(),
                attr: Some(attr),
                ..CallArgs::default()
            },
        )
    }

    pub fn readdir(&self, path: &str) -> ClientResult<Vec<DirEntry>> {
        self.call("readdir", &path_args(path))
    }

    pub fn open(&self, path: &str, mode: u32, perm: u32) -> ClientResult<StatData> {
        self.call("open", &open_args(path, mode, perm))
    }

    pub fn create(&self, path: &str, mode: u32, perm: u32) -> ClientResult<StatData> {
        self.call("create", &open_args(path, mode, perm))
    }

    pub fn opendir(&self, path: &str) -> ClientResult<()> {
        self.call_unit("opendir", &path_args(path))
    }

    pub fn readlink(&self, path: &str) -> ClientResult<String> {
        self.call("readlink", &path_args(path))
    }

    pub fn link(&self, path: &str, link: &str) -> ClientResult<StatData> {
        self.call(
            "link",
            &CallArgs {
                path: path.to_string(),
                link: link.to_string(),
                ..CallArgs::default()
            },
        )
    }

    pub fn mkdir(&self, path: &str, mode: u32) -> ClientResult<StatData> {
        self.call(
            "mkdir",
            &CallArgs {
                path: path.to_string(),
                attr: Some(Attr {
                    mode: Some(mode),
                    ..Attr::default()
                }),
                ..CallArgs::default()
            },
        )
    }

    pub fn mknod(&self, path: &str, mode: u32) -> ClientResult<StatData> {
        self.call(
            "mknod",
            &CallArgs {
                path: path.to_string(),
                attr: Some(Attr {
                    mode: Some(mode),
                    ..Attr::default()
                }),
                ..CallArgs::default()
            },
        )
    }

    pub fn rmdir(&self, path: &str) -> ClientResult<()> {
        self.call_unit("rmdir", &path_args(path))
    }

    pub fn unlink(&self, path: &str) -> ClientResult<()> {
        self.call_unit("unlink", &path_args(path))
    }

    pub fn rename(&self, path: &str, to: &str) -> ClientResult<()> {
        self.call_unit(
            "rename",
            &CallArgs {
                path: path.to_string(),
                to: to.to_string(),
                ..CallArgs::default()
            },
        )
    }

    pub fn symlink(&self, target: &str, link: &str) -> ClientResult<StatData> {
        self.call(
            "symlink",
            &CallArgs {
                path: target.to_string(),
                link: link.to_string(),
                ..CallArgs::default()
            },
        )
    }

    pub fn chmod(&self, path: &str, mode: u32) -> ClientResult<()> {
        self.call_unit(
            "chmod",
            &CallArgs {
                path: path.to_string(),
                attr: Some(Attr {
                    mode: Some(mode),
                    ..Attr::default()
                }),
                ..CallArgs::default()
            },
        )
    }

    pub fn chown(&self, path: &str, uid: i64, gid: i64) -> ClientResult<()> {
        self.call_unit(
            "chown",
            &CallArgs {
                path: path.to_string(),
                attr: Some(Attr {
                    owner: Some(Owner { uid, gid }),
                    ..Attr::default()
                }),
                ..CallArgs::default()
            },
        )
    }

    pub fn truncate(&self, path: &str, size: i64) -> ClientResult<()> {
        self.call_unit(
            "truncate",
            &CallArgs {
                path: path.to_string(),
                attr: Some(Attr {
                    size: Some(size),
                    ..Attr::default()
                }),
                ..CallArgs::default()
            },
        )
    }

    /// Obtain a read blob reference for `size` bytes at `offset`.
    pub fn read(&self, path: &str, offset: i64, size: i64) -> ClientResult<BlobInfo> {
        self.call("read", &range_args(path, offset, size))
    }

    /// Obtain a write blob reference for `size` bytes at `offset`.
    pub fn write(&self, path: &str, offset: i64, size: i64) -> ClientResult<BlobInfo> {
        self.call("write", &range_args(path, offset, size))
    }

    /// Fetch a blob and copy up to `buf.len()` bytes of it, returning the
    /// number copied.
    pub fn download(&self, href: &str, buf: &mut [u8]) -> ClientResult<usize> {
        debug!(href, len = buf.len(), "download");
        let response = self.http.get(href).send()?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        let body = response.bytes()?;
        let n = body.len().min(buf.len());
        buf[..n].copy_from_slice(&body[..n]);
        Ok(n)
    }

    /// Push bytes through a write blob reference, returning the count the
    /// server reports written.
    pub fn upload(&self, href: &str, data: &[u8]) -> ClientResult<usize> {
        debug!(href, len = data.len(), "upload");

        #[derive(Deserialize)]
        struct BlobWritten {
            #[serde(rename = "N")]
            n: usize,
        }

        let part = Part::bytes(data.to_vec()).file_name("blob");
        let form = Form::new().part("blob", part);

        let response = self.http.post(href).multipart(form).send()?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        let written: BlobWritten = serde_json::from_slice(&response.bytes()?)?;
        Ok(written.n)
    }

    /// Run a command on the server. Background requests come back as the
    /// tracked proc record re-read through the redirect.
    pub fn exec(&self, request: &Proc) -> ClientResult<RunResult> {
        debug!(command = %request.command, "exec");
        let url = self.base.join("/procs/")?;
        let response = self.http.post(url).json(request).send()?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        Ok(serde_json::from_slice(&response.bytes()?)?)
    }

    pub fn ps(&self) -> ClientResult<Vec<Proc>> {
        let url = self.base.join("/procs/")?;
        let response = self.http.get(url).send()?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        Ok(serde_json::from_slice(&response.bytes()?)?)
    }

    /// Fetch one proc; a 404 is reported as [`ClientError::NotFound`] so a
    /// poller can terminate early.
    pub fn ps1(&self, id: &str) -> ClientResult<Proc> {
        let url = self.base.join(&format!("/procs/{}", id))?;
        let response = self.http.get(url).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(format!("proc {}", id)));
        }
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        Ok(serde_json::from_slice(&response.bytes()?)?)
    }

    pub fn kill(&self, id: &str) -> ClientResult<()> {
        debug!(id, "kill");
        let url = self.base.join(&format!("/procs/{}", id))?;
        let response = self.http.delete(url).send()?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        Ok(())
    }
}

fn path_args(path: &str) -> CallArgs {
    CallArgs {
        path: path.to_string(),
        ..CallArgs::default()
    }
}

fn open_args(path: &str, mode: u32, perm: u32) -> CallArgs {
    CallArgs {
        path: path.to_string(),
        attr: Some(Attr {
            mode: Some(mode),
            perm: Some(perm),
            ..Attr::default()
        }),
        ..CallArgs::default()
    }
}

fn range_args(path: &str, offset: i64, size: i64) -> CallArgs {
    CallArgs {
        path: path.to_string(),
        attr: Some(Attr {
            offset: Some(offset),
            size: Some(size),
            ..Attr::default()
        }),
        ..CallArgs::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webfs_proto::Errno;

    #[test]
    fn base_url_round_trips() {
        let client = Client::new("http://localhost:58080/").unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:58080/");
        assert!(Client::new("not a url").is_err());
    }

    #[test]
    fn remote_errors_expose_their_errno() {
        let err = ClientError::Remote(Errno(libc::ENOENT));
        assert_eq!(err.errno(), Some(Errno(libc::ENOENT)));
        let err = ClientError::NotFound("proc x".into());
        assert_eq!(err.errno(), None);
    }
}

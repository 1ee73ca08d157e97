// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Open-file handles.
//!
//! A handle owns nothing on the server; it only carries the remote path
//! into per-handle operations and serializes them behind a mutex. Release
//! nulls the path, so a second release reports EBADF.

use libc::{c_int, EBADF, EIO};
use std::sync::{Arc, Mutex};

use webfs_client::{Client, ClientError};
use webfs_proto::{Attr, StatData};

pub(crate) fn errno_of(err: &ClientError) -> c_int {
    err.errno().map(|e| e.0).unwrap_or(EIO)
}

pub struct RemoteFile {
    client: Arc<Client>,
    path: Mutex<Option<String>>,
}

impl RemoteFile {
    pub fn new(client: Arc<Client>, path: String) -> Arc<Self> {
        Arc::new(RemoteFile {
            client,
            path: Mutex::new(Some(path)),
        })
    }

    fn with_path<T>(&self, op: impl FnOnce(&str) -> Result<T, c_int>) -> Result<T, c_int> {
        let guard = self.path.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_deref() {
            Some(path) => op(path),
            None => Err(EBADF),
        }
    }

    /// Metadata RPC for a blob reference, then the bulk GET.
    pub fn read(&self, offset: i64, size: u32) -> Result<Vec<u8>, c_int> {
        self.with_path(|path| {
            let bi = self
                .client
                .read(path, offset, size as i64)
                .map_err(|e| errno_of(&e))?;
            let mut buf = vec![0u8; bi.size.max(0) as usize];
            let n = self
                .client
                .download(&bi.href, &mut buf)
                .map_err(|e| errno_of(&e))?;
            buf.truncate(n);
            Ok(buf)
        })
    }

    /// Metadata RPC for a write reference, then the bulk POST.
    pub fn write(&self, offset: i64, data: &[u8]) -> Result<u32, c_int> {
        self.with_path(|path| {
            let bi = self
                .client
                .write(path, offset, data.len() as i64)
                .map_err(|e| errno_of(&e))?;
            let n = self
                .client
                .upload(&bi.href, data)
                .map_err(|e| errno_of(&e))?;
            Ok(n as u32)
        })
    }

    pub fn getattr(&self) -> Result<StatData, c_int> {
        self.with_path(|path| self.client.stat(path).map_err(|e| errno_of(&e)))
    }

    pub fn setattr(&self, attr: Attr) -> Result<StatData, c_int> {
        self.with_path(|path| self.client.setattr(path, attr).map_err(|e| errno_of(&e)))
    }

    pub fn release(&self) -> Result<(), c_int> {
        let mut guard = self.path.lock().unwrap_or_else(|e| e.into_inner());
        match guard.take() {
            Some(_) => Ok(()),
            None => Err(EBADF),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_release_is_ebadf() {
        let client = Arc::new(Client::new("http://localhost:1/").unwrap());
        let file = RemoteFile::new(client, "/x".to_string());
        assert!(file.release().is_ok());
        assert_eq!(file.release().unwrap_err(), EBADF);
        // Every operation after release fails the same way.
        assert_eq!(file.getattr().unwrap_err(), EBADF);
        assert_eq!(file.read(0, 1).unwrap_err(), EBADF);
    }

    #[test]
    fn transport_failures_are_eio() {
        let err = ClientError::NotFound("gone".into());
        assert_eq!(errno_of(&err), EIO);
        let err = ClientError::Remote(webfs_proto::Errno(libc::ENOENT));
        assert_eq!(errno_of(&err), libc::ENOENT);
    }
}

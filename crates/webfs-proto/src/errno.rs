// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Errno carried inside the reply envelope.
//!
//! The wire value is the platform's raw errno; `0` means success. Errors
//! that cannot be traced back to a syscall map to `ENOSYS` so the far side
//! still receives a well-formed code.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

/// Numeric errno as it appears in [`crate::CallResult::status`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Errno(pub i32);

impl Errno {
    pub const OK: Errno = Errno(0);

    pub fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// Human-readable description of the errno, used for the envelope's
    /// `error` field.
    pub fn desc(self) -> &'static str {
        nix::errno::Errno::from_raw(self.0).desc()
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "errno {} ({})", self.0, self.desc())
    }
}

impl std::error::Error for Errno {}

impl From<nix::errno::Errno> for Errno {
    fn from(err: nix::errno::Errno) -> Self {
        Errno(err as i32)
    }
}

impl From<&io::Error> for Errno {
    fn from(err: &io::Error) -> Self {
        if let Some(code) = err.raw_os_error() {
            return Errno(code);
        }
        match err.kind() {
            io::ErrorKind::PermissionDenied => Errno(libc::EPERM),
            io::ErrorKind::AlreadyExists => Errno(libc::EEXIST),
            io::ErrorKind::NotFound => Errno(libc::ENOENT),
            io::ErrorKind::InvalidInput => Errno(libc::EINVAL),
            _ => Errno(libc::ENOSYS),
        }
    }
}

impl From<io::Error> for Errno {
    fn from(err: io::Error) -> Self {
        Errno::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_os_error_passes_through() {
        let err = io::Error::from_raw_os_error(libc::ENOTEMPTY);
        assert_eq!(Errno::from(err), Errno(libc::ENOTEMPTY));
    }

    #[test]
    fn wrapped_kinds_map_to_posix_codes() {
        let cases = [
            (io::ErrorKind::PermissionDenied, libc::EPERM),
            (io::ErrorKind::AlreadyExists, libc::EEXIST),
            (io::ErrorKind::NotFound, libc::ENOENT),
            (io::ErrorKind::InvalidInput, libc::EINVAL),
        ];
        for (kind, expected) in cases {
            let err = io::Error::new(kind, "synthetic");
            assert_eq!(Errno::from(err), Errno(expected));
        }
    }

    #[test]
    fn unknown_errors_become_enosys() {
        let err = io::Error::new(io::ErrorKind::Other, "no errno here");
        assert_eq!(Errno::from(err), Errno(libc::ENOSYS));
    }

    #[test]
    fn serializes_as_bare_integer() {
        let json = serde_json::to_string(&Errno(libc::ENOENT)).unwrap();
        assert_eq!(json, libc::ENOENT.to_string());
    }
}

// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Request/reply envelopes and the structures they carry.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::os::unix::fs::MetadataExt;

use crate::errno::Errno;

/// Ownership delta for chown/setattr. `-1` on either side means "leave
/// unchanged" and is passed straight through to the chown syscall layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub uid: i64,
    pub gid: i64,
}

/// Seconds/nanoseconds pair used everywhere a timestamp crosses the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimespecData {
    pub secs: i64,
    pub nanos: i64,
}

impl TimespecData {
    pub fn new(secs: i64, nanos: i64) -> Self {
        TimespecData { secs, nanos }
    }
}

/// Attribute delta. A present field means "apply this"; an absent field
/// means "leave unchanged". Absence must survive serialization — a missing
/// atime/mtime becomes the utimensat omit sentinel on the server, which is
/// not the same thing as epoch zero.
///
/// `mode` is overloaded the way the syscalls overload it: open flags for
/// open/create, file-type-or-permission bits for chmod/mknod/mkdir.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attr {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perm: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub atime: Option<TimespecData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime: Option<TimespecData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctime: Option<TimespecData>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,
}

/// Uniform request envelope for every `/fs/<op>` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallArgs {
    /// File path, or target/from for symlink/rename.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub link: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub to: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attr: Option<Attr>,
}

/// Uniform reply envelope. A zero `status` guarantees `data` is well formed
/// for ops that return one; on failure `data` is undefined and must not be
/// parsed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CallResult {
    pub status: Errno,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CallResult {
    pub fn ok(data: Value) -> Self {
        CallResult {
            status: Errno::OK,
            error: String::new(),
            data: Some(data),
        }
    }

    pub fn err(errno: Errno) -> Self {
        CallResult {
            status: errno,
            error: errno.desc().to_string(),
            data: None,
        }
    }
}

/// Metadata attached to each directory entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size: i64,
    pub mode: u32,
    #[serde(rename = "modtime")]
    pub mtime: TimespecData,
    #[serde(rename = "isdir")]
    pub is_dir: bool,
}

/// One readdir entry. `type_bits` carries the file-type bits of the mode
/// (`mode & S_IFMT`). Entries come back in the backend's natural order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    #[serde(rename = "isdir")]
    pub is_dir: bool,
    #[serde(rename = "type")]
    pub type_bits: u32,
    pub info: FileInfo,
}

/// Self-describing reference to a bulk transfer. Obtaining one creates no
/// server-side state; the `href` alone locates and bounds the transfer.
///
/// `perm` carries the file's read-permission bits on a read response and
/// its write-permission bits on a write response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlobInfo {
    pub path: String,
    pub offset: i64,
    pub size: i64,
    pub perm: u32,

    pub href: String,
}

/// Stat structure as it crosses the wire; converted from the host stat on
/// the server and into kernel attributes on the mount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatData {
    pub dev: u64,
    pub ino: u64,
    pub nlink: u64,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u64,
    pub size: i64,
    pub blksize: i64,
    pub blocks: i64,
    pub atim: TimespecData,
    pub mtim: TimespecData,
    pub ctim: TimespecData,
}

impl StatData {
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        StatData {
            dev: meta.dev(),
            ino: meta.ino(),
            nlink: meta.nlink(),
            mode: meta.mode(),
            uid: meta.uid(),
            gid: meta.gid(),
            rdev: meta.rdev(),
            size: meta.size() as i64,
            blksize: meta.blksize() as i64,
            blocks: meta.blocks() as i64,
            atim: TimespecData::new(meta.atime(), meta.atime_nsec()),
            mtim: TimespecData::new(meta.mtime(), meta.mtime_nsec()),
            ctim: TimespecData::new(meta.ctime(), meta.ctime_nsec()),
        }
    }

    pub fn is_dir(&self) -> bool {
        (self.mode & libc::S_IFMT) == libc::S_IFDIR
    }
}

/// Filesystem statistics for statfs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatfsData {
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub bsize: u32,
    pub namelen: u32,
    pub frsize: u32,
}

/// Regular-file check on a raw mode word.
pub fn is_regular(mode: u32) -> bool {
    (mode & libc::S_IFREG) != 0
}

/// Lifecycle state of a supervised process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunState(pub i32);

impl RunState {
    pub const UNKNOWN: RunState = RunState(0);
    pub const RUNNING: RunState = RunState(1);
    pub const DONE: RunState = RunState(2);
    pub const FAILED: RunState = RunState(3);
}

/// A supervised process as tracked by `/procs`. Doubles as the run request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Proc {
    pub id: String,

    pub command: String,
    pub args: Vec<String>,
    pub dir: String,
    pub env: Vec<String>,

    #[serde(rename = "bg")]
    pub background: bool,

    /// stdout/stderr redirect targets, root-relative.
    pub outfile: String,
    pub errfile: String,

    /// Option flags whose following argument is resolved against the root.
    pub resolve: Vec<String>,

    /// Seconds; `<= 0` selects the server default.
    pub timeout: i64,

    pub meta: HashMap<String, String>,

    pub pid: i32,
    pub state: RunState,

    pub status: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,

    /// Creation time, seconds since the epoch.
    pub created: i64,
    /// Seconds since creation, refreshed on fetch.
    pub elapsed: i64,
}

/// Outcome of a foreground `/procs` run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunResult {
    pub id: String,

    pub command: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(rename = "bg")]
    pub background: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub outfile: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub errfile: String,

    pub status: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_regular_matches_known_modes() {
        let cases: [(u32, bool); 6] = [
            (0x81a4, true),
            (33188, true),
            (32768, true),
            (0xffff0fff, false),
            (0xffff8fff, true),
            (0x71a4, false),
        ];
        for (mode, expected) in cases {
            assert_eq!(is_regular(mode), expected, "mode {:#x}", mode);
        }
    }

    #[test]
    fn absent_attr_fields_are_omitted() {
        let attr = Attr {
            size: Some(10),
            ..Attr::default()
        };
        let json = serde_json::to_string(&attr).unwrap();
        assert_eq!(json, r#"{"size":10}"#);
    }

    #[test]
    fn absent_timestamp_is_distinct_from_epoch_zero() {
        let omitted = serde_json::to_value(Attr::default()).unwrap();
        let epoch = serde_json::to_value(Attr {
            atime: Some(TimespecData::default()),
            ..Attr::default()
        })
        .unwrap();
        assert!(omitted.get("atime").is_none());
        assert!(epoch.get("atime").is_some());

        let decoded: Attr = serde_json::from_value(omitted).unwrap();
        assert!(decoded.atime.is_none());
    }

    #[test]
    fn call_args_round_trip() {
        let args = CallArgs {
            path: "/a/b".into(),
            to: "/c".into(),
            ..CallArgs::default()
        };
        let json = serde_json::to_string(&args).unwrap();
        assert_eq!(json, r#"{"path":"/a/b","to":"/c"}"#);
        let back: CallArgs = serde_json::from_str(&json).unwrap();
        assert_eq!(back, args);
    }

    #[test]
    fn error_envelope_has_no_data() {
        let res = CallResult::err(Errno(libc::ENOTEMPTY));
        assert_eq!(res.status, Errno(libc::ENOTEMPTY));
        assert!(res.data.is_none());
        assert!(!res.error.is_empty());
    }
}

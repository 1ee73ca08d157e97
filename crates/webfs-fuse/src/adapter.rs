// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! FUSE adapter.
//!
//! Maps kernel filesystem operations onto the RPC client. The adapter owns
//! two tables: inode number to server-relative path, and file handle to
//! [`RemoteFile`]. Inode numbers are synthesized from the backend's
//! `(device, inode)` pair so they stay stable for the lifetime of a mount.

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyLock, ReplyOpen, ReplyStatfs, ReplyWrite, Request, TimeOrNow, FUSE_ROOT_ID,
};
use libc::{c_int, EBADF, EINVAL, ENOENT};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

use webfs_client::{Client, ClientError};
use webfs_proto::{Attr, Owner, StatData, TimespecData};

use crate::handle::{errno_of, RemoteFile};

/// Inode number attached to readdir entries; the wire carries no entry
/// inos, and the kernel treats this value as "not known".
const UNKNOWN_INO: u64 = u64::MAX;

/// Kernel-visible attribute and entry cache lifetime.
const CACHE_TTL: Duration = Duration::from_secs(1);

/// Inode generation; inode numbers are never recycled within a mount.
const GENERATION: u64 = 1;

struct InodeEntry {
    path: String,
    lookups: u64,
}

/// The mounted filesystem. All kernel requests funnel through here on the
/// session loop; per-handle operations additionally serialize on their own
/// handle.
pub struct WebFs {
    client: Arc<Client>,
    root_dev: u64,
    inodes: HashMap<u64, InodeEntry>,
    handles: HashMap<u64, Arc<RemoteFile>>,
    next_fh: u64,
}

impl WebFs {
    /// Build the adapter for a server whose exported tree is rooted at
    /// `root_path` (the path component of the remote URL). The root must
    /// stat successfully before anything mounts.
    pub fn new(client: Arc<Client>, root_path: &str) -> Result<Self, ClientError> {
        let root_path = if root_path.is_empty() { "/" } else { root_path };
        let st = client.stat(root_path)?;

        let mut inodes = HashMap::new();
        inodes.insert(
            FUSE_ROOT_ID,
            InodeEntry {
                path: root_path.to_string(),
                lookups: 1,
            },
        );

        Ok(WebFs {
            client,
            root_dev: st.dev,
            inodes,
            handles: HashMap::new(),
            next_fh: 1,
        })
    }

    /// Compose a kernel inode id from the backing stat. The device bits of
    /// entry and root are each byte-swapped into the high half and folded
    /// together, so a single-device tree keeps the backend's inode numbers
    /// verbatim.
    fn id_from_stat(&self, st: &StatData) -> u64 {
        let swapped = (st.dev << 32) | (st.dev >> 32);
        let swapped_root = (self.root_dev << 32) | (self.root_dev >> 32);
        (swapped ^ swapped_root) ^ st.ino
    }

    fn path_of(&self, ino: u64) -> Result<String, c_int> {
        self.inodes.get(&ino).map(|e| e.path.clone()).ok_or(ENOENT)
    }

    /// Parent path plus one component. Wire paths are UTF-8 JSON strings,
    /// so names the kernel hands us must decode.
    fn child_path(&self, parent: u64, name: &OsStr) -> Result<String, c_int> {
        let base = self.path_of(parent)?;
        let name = name.to_str().ok_or(EINVAL)?;
        Ok(join_path(&base, name))
    }

    /// Record (or refresh) the path for a synthesized inode id and count
    /// the kernel's reference.
    fn remember(&mut self, st: &StatData, path: String) -> u64 {
        let ino = self.id_from_stat(st);
        let entry = self.inodes.entry(ino).or_insert(InodeEntry {
            path: String::new(),
            lookups: 0,
        });
        entry.path = path;
        entry.lookups += 1;
        ino
    }

    /// Rewrite tracked paths after a rename so live inodes keep resolving.
    fn rewrite_paths(&mut self, old: &str, new: &str) {
        for entry in self.inodes.values_mut() {
            if entry.path == old {
                entry.path = new.to_string();
            } else if let Some(rest) = entry.path.strip_prefix(old) {
                if rest.starts_with('/') {
                    entry.path = format!("{}{}", new, rest);
                }
            }
        }
    }

    /// Drop kernel references; the entry goes away when none remain. The
    /// root mapping is permanent.
    fn drop_lookups(&mut self, ino: u64, nlookup: u64) {
        if ino == FUSE_ROOT_ID {
            return;
        }
        let gone = match self.inodes.get_mut(&ino) {
            Some(entry) => {
                entry.lookups = entry.lookups.saturating_sub(nlookup);
                entry.lookups == 0
            }
            None => false,
        };
        if gone {
            self.inodes.remove(&ino);
        }
    }

    fn new_handle(&mut self, path: String) -> u64 {
        let fh = self.next_fh;
        self.next_fh += 1;
        self.handles
            .insert(fh, RemoteFile::new(self.client.clone(), path));
        fh
    }

    fn handle(&self, fh: u64) -> Result<Arc<RemoteFile>, c_int> {
        self.handles.get(&fh).cloned().ok_or(EBADF)
    }

    fn file_attr(&self, st: &StatData, ino: u64) -> FileAttr {
        FileAttr {
            ino,
            size: st.size.max(0) as u64,
            blocks: st.blocks.max(0) as u64,
            atime: system_time(st.atim),
            mtime: system_time(st.mtim),
            ctime: system_time(st.ctim),
            crtime: UNIX_EPOCH,
            kind: kind_of(st.mode),
            perm: (st.mode & 0o7777) as u16,
            nlink: st.nlink as u32,
            uid: st.uid,
            gid: st.gid,
            rdev: st.rdev as u32,
            blksize: st.blksize.max(0) as u32,
            flags: 0,
        }
    }

    /// Look up a child, synthesize its inode and reply with the entry.
    fn reply_entry(&mut self, st: &StatData, path: String, reply: ReplyEntry) {
        let ino = self.remember(st, path);
        let attr = self.file_attr(st, ino);
        reply.entry(&CACHE_TTL, &attr, GENERATION);
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}

fn kind_of(mode: u32) -> FileType {
    match mode & libc::S_IFMT as u32 {
        m if m == libc::S_IFDIR as u32 => FileType::Directory,
        m if m == libc::S_IFLNK as u32 => FileType::Symlink,
        m if m == libc::S_IFCHR as u32 => FileType::CharDevice,
        m if m == libc::S_IFBLK as u32 => FileType::BlockDevice,
        m if m == libc::S_IFIFO as u32 => FileType::NamedPipe,
        m if m == libc::S_IFSOCK as u32 => FileType::Socket,
        _ => FileType::RegularFile,
    }
}

fn system_time(ts: TimespecData) -> SystemTime {
    if ts.secs >= 0 {
        UNIX_EPOCH + Duration::new(ts.secs as u64, ts.nanos.max(0) as u32)
    } else {
        UNIX_EPOCH - Duration::from_secs(ts.secs.unsigned_abs())
    }
}

fn timespec(t: SystemTime) -> TimespecData {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => TimespecData::new(d.as_secs() as i64, d.subsec_nanos() as i64),
        // Pre-epoch timestamps clamp to zero; the server requires a
        // non-negative epoch.
        Err(_) => TimespecData::default(),
    }
}

fn time_or_now(t: TimeOrNow) -> TimespecData {
    match t {
        TimeOrNow::SpecificTime(t) => timespec(t),
        TimeOrNow::Now => timespec(SystemTime::now()),
    }
}

/// Translate the kernel's setattr fields into an attribute delta. Fields
/// the kernel did not mark valid stay absent. Ownership folds into one
/// `Owner`, with `-1` standing in for the side not being changed.
#[allow(clippy::too_many_arguments)]
fn to_attr(
    mode: Option<u32>,
    uid: Option<u32>,
    gid: Option<u32>,
    size: Option<u64>,
    atime: Option<TimeOrNow>,
    mtime: Option<TimeOrNow>,
    ctime: Option<SystemTime>,
) -> Attr {
    let owner = if uid.is_some() || gid.is_some() {
        Some(Owner {
            uid: uid.map(i64::from).unwrap_or(-1),
            gid: gid.map(i64::from).unwrap_or(-1),
        })
    } else {
        None
    };

    Attr {
        mode,
        perm: None,
        size: size.map(|s| s as i64),
        offset: None,
        atime: atime.map(time_or_now),
        mtime: mtime.map(time_or_now),
        ctime: ctime.map(timespec),
        owner,
    }
}

impl Filesystem for WebFs {
    fn forget(&mut self, _req: &Request<'_>, ino: u64, nlookup: u64) {
        self.drop_lookups(ino, nlookup);
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let path = match self.child_path(parent, name) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };
        debug!(%path, "lookup");
        match self.client.lstat(&path) {
            Ok(st) => self.reply_entry(&st, path, reply),
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, fh: Option<u64>, reply: ReplyAttr) {
        if let Some(fh) = fh {
            match self.handle(fh).and_then(|h| h.getattr()) {
                Ok(st) => {
                    let attr = self.file_attr(&st, ino);
                    return reply.attr(&CACHE_TTL, &attr);
                }
                Err(errno) => return reply.error(errno),
            }
        }

        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };
        // The mount root follows symlinks; everything below it does not.
        let st = if ino == FUSE_ROOT_ID {
            self.client.stat(&path)
        } else {
            self.client.lstat(&path)
        };
        match st {
            Ok(st) => {
                let attr = self.file_attr(&st, ino);
                reply.attr(&CACHE_TTL, &attr);
            }
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        ctime: Option<SystemTime>,
        fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let attr = to_attr(mode, uid, gid, size, atime, mtime, ctime);

        let result = if let Some(fh) = fh {
            self.handle(fh).and_then(|h| h.setattr(attr))
        } else {
            match self.path_of(ino) {
                Ok(path) => self.client.setattr(&path, attr).map_err(|e| errno_of(&e)),
                Err(errno) => Err(errno),
            }
        };

        match result {
            Ok(st) => {
                let fuse_attr = self.file_attr(&st, ino);
                reply.attr(&CACHE_TTL, &fuse_attr);
            }
            Err(errno) => reply.error(errno),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };
        match self.client.readlink(&path) {
            Ok(target) => reply.data(target.as_bytes()),
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        let path = match self.child_path(parent, name) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };
        match self.client.mknod(&path, mode) {
            Ok(st) => self.reply_entry(&st, path, reply),
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let path = match self.child_path(parent, name) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };
        match self.client.mkdir(&path, mode) {
            Ok(st) => self.reply_entry(&st, path, reply),
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = match self.child_path(parent, name) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };
        match self.client.unlink(&path) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = match self.child_path(parent, name) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };
        match self.client.rmdir(&path) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn symlink(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
        reply: ReplyEntry,
    ) {
        let path = match self.child_path(parent, link_name) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };
        let target = match target.to_str() {
            Some(t) => t,
            None => return reply.error(EINVAL),
        };
        match self.client.symlink(target, &path) {
            Ok(st) => self.reply_entry(&st, path, reply),
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let from = match self.child_path(parent, name) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };
        let to = match self.child_path(newparent, newname) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };
        match self.client.rename(&from, &to) {
            Ok(()) => {
                self.rewrite_paths(&from, &to);
                reply.ok();
            }
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn link(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        newparent: u64,
        newname: &OsStr,
        reply: ReplyEntry,
    ) {
        let existing = match self.path_of(ino) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };
        let path = match self.child_path(newparent, newname) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };
        match self.client.link(&existing, &path) {
            Ok(st) => self.reply_entry(&st, path, reply),
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };
        debug!(%path, flags, "open");
        match self.client.open(&path, flags as u32, 0) {
            Ok(_) => {
                let fh = self.new_handle(path);
                reply.opened(fh, 0);
            }
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        let path = match self.child_path(parent, name) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };
        debug!(%path, mode, flags, "create");
        match self.client.create(&path, flags as u32, mode) {
            Ok(st) => {
                let ino = self.remember(&st, path.clone());
                let attr = self.file_attr(&st, ino);
                let fh = self.new_handle(path);
                reply.created(&CACHE_TTL, &attr, GENERATION, fh, 0);
            }
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        match self.handle(fh).and_then(|h| h.read(offset, size)) {
            Ok(data) => reply.data(&data),
            Err(errno) => reply.error(errno),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        match self.handle(fh).and_then(|h| h.write(offset, data)) {
            Ok(written) => reply.written(written),
            Err(errno) => reply.error(errno),
        }
    }

    fn flush(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        reply.ok();
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        match self.handles.remove(&fh) {
            Some(handle) => match handle.release() {
                Ok(()) => reply.ok(),
                Err(errno) => reply.error(errno),
            },
            None => reply.error(EBADF),
        }
    }

    fn fsync(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _datasync: bool, reply: ReplyEmpty) {
        reply.ok();
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };
        match self.client.opendir(&path) {
            Ok(()) => reply.opened(0, 0),
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };
        let entries = match self.client.readdir(&path) {
            Ok(entries) => entries,
            Err(err) => return reply.error(errno_of(&err)),
        };
        for (i, entry) in entries.iter().enumerate().skip(offset.max(0) as usize) {
            let kind = kind_of(entry.info.mode);
            if reply.add(UNKNOWN_INO, (i + 1) as i64, kind, &entry.name) {
                break;
            }
        }
        reply.ok();
    }

    fn releasedir(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyStatfs) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(errno) => return reply.error(errno),
        };
        match self.client.statfs(&path) {
            Ok(st) => reply.statfs(
                st.blocks, st.bfree, st.bavail, st.files, st.ffree, st.bsize, st.namelen,
                st.frsize,
            ),
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    // Advisory locks are accepted and ignored.
    fn getlk(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _lock_owner: u64,
        start: u64,
        end: u64,
        _typ: i32,
        pid: u32,
        reply: ReplyLock,
    ) {
        reply.locked(start, end, libc::F_UNLCK, pid);
    }

    fn setlk(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _lock_owner: u64,
        _start: u64,
        _end: u64,
        _typ: i32,
        _pid: u32,
        _sleep: bool,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter_with_root_dev(dev: u64) -> WebFs {
        let client = Arc::new(Client::new("http://localhost:1/").unwrap());
        let mut inodes = HashMap::new();
        inodes.insert(
            FUSE_ROOT_ID,
            InodeEntry {
                path: "/".to_string(),
                lookups: 1,
            },
        );
        WebFs {
            client,
            root_dev: dev,
            inodes,
            handles: HashMap::new(),
            next_fh: 1,
        }
    }

    fn st(dev: u64, ino: u64) -> StatData {
        StatData {
            dev,
            ino,
            ..StatData::default()
        }
    }

    #[test]
    fn same_device_id_is_the_backend_inode() {
        let fs = adapter_with_root_dev(0x1234);
        assert_eq!(fs.id_from_stat(&st(0x1234, 42)), 42);
        assert_eq!(fs.id_from_stat(&st(0x1234, u64::MAX)), u64::MAX);
    }

    #[test]
    fn cross_device_ids_mix_device_bits() {
        let fs = adapter_with_root_dev(0x1234);
        let foreign = fs.id_from_stat(&st(0x9999, 42));
        assert_ne!(foreign, 42);
        // Idempotent: the mapping is a function of (dev, ino).
        assert_eq!(foreign, fs.id_from_stat(&st(0x9999, 42)));
        // The device bits land in the high half.
        assert_eq!(foreign & 0xffff_ffff, 42);
    }

    #[test]
    fn mode_maps_to_kernel_file_type() {
        assert_eq!(kind_of(libc::S_IFDIR as u32 | 0o755), FileType::Directory);
        assert_eq!(kind_of(libc::S_IFLNK as u32 | 0o777), FileType::Symlink);
        assert_eq!(kind_of(libc::S_IFREG as u32 | 0o644), FileType::RegularFile);
        assert_eq!(kind_of(libc::S_IFSOCK as u32), FileType::Socket);
    }

    #[test]
    fn file_attr_carries_permission_bits() {
        let fs = adapter_with_root_dev(1);
        let stat = StatData {
            dev: 1,
            ino: 7,
            mode: libc::S_IFREG as u32 | 0o640,
            size: 123,
            nlink: 1,
            ..StatData::default()
        };
        let attr = fs.file_attr(&stat, 7);
        assert_eq!(attr.perm, 0o640);
        assert_eq!(attr.size, 123);
        assert_eq!(attr.kind, FileType::RegularFile);
    }

    #[test]
    fn join_path_handles_root_and_nested() {
        assert_eq!(join_path("/", "a"), "/a");
        assert_eq!(join_path("/a", "b"), "/a/b");
    }

    #[test]
    fn setattr_translation_keeps_absent_fields_absent() {
        let attr = to_attr(None, None, None, Some(10), None, None, None);
        assert_eq!(attr.size, Some(10));
        assert!(attr.mode.is_none());
        assert!(attr.atime.is_none());
        assert!(attr.owner.is_none());
    }

    #[test]
    fn setattr_translation_fills_missing_owner_side() {
        let attr = to_attr(None, Some(1000), None, None, None, None, None);
        assert_eq!(
            attr.owner,
            Some(Owner {
                uid: 1000,
                gid: -1
            })
        );
        let attr = to_attr(None, None, Some(100), None, None, None, None);
        assert_eq!(
            attr.owner,
            Some(Owner {
                uid: -1,
                gid: 100
            })
        );
    }

    #[test]
    fn rename_rewrites_descendant_paths() {
        let mut fs = adapter_with_root_dev(1);
        fs.inodes.insert(
            10,
            InodeEntry {
                path: "/a/x".into(),
                lookups: 1,
            },
        );
        fs.inodes.insert(
            11,
            InodeEntry {
                path: "/a/x/deep".into(),
                lookups: 1,
            },
        );
        fs.inodes.insert(
            12,
            InodeEntry {
                path: "/a/xy".into(),
                lookups: 1,
            },
        );

        fs.rewrite_paths("/a/x", "/b/x");

        assert_eq!(fs.inodes[&10].path, "/b/x");
        assert_eq!(fs.inodes[&11].path, "/b/x/deep");
        // A sibling sharing the prefix but not the component is untouched.
        assert_eq!(fs.inodes[&12].path, "/a/xy");
    }

    #[test]
    fn forget_drops_unreferenced_inodes_but_not_root() {
        let mut fs = adapter_with_root_dev(1);
        let ino = fs.remember(&st(1, 5), "/f".into());
        fs.remember(&st(1, 5), "/f".into());
        assert_eq!(fs.inodes[&ino].lookups, 2);

        fs.drop_lookups(ino, 2);
        assert!(!fs.inodes.contains_key(&ino));

        fs.drop_lookups(FUSE_ROOT_ID, 99);
        assert!(fs.inodes.contains_key(&FUSE_ROOT_ID));
    }

    #[test]
    fn timespec_round_trip_clamps_negatives() {
        let t = system_time(TimespecData::new(100, 500));
        assert_eq!(timespec(t), TimespecData::new(100, 500));
        assert_eq!(timespec(UNIX_EPOCH - Duration::from_secs(5)), TimespecData::default());
    }
}

// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Server-side filesystem node.
//!
//! A [`FileNode`] is a stateless object bound to the exported root. Each
//! operation resolves a root-relative path, performs the syscall sequence
//! within the call and returns either a result or an [`Errno`]; no file
//! descriptor survives a call.

use std::ffi::CString;
use std::fs::{DirBuilder, File, OpenOptions, Permissions};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use nix::unistd::{Gid, Uid};
use tracing::debug;
use url::Url;

use webfs_proto::{
    blob, is_regular, Attr, BlobInfo, CallArgs, CallResult, DirEntry, Errno, FileInfo, Owner,
    StatData, StatfsData, TimespecData,
};

/// Read-permission bits masked into a read blob reference.
const ALL_READ: u32 = (libc::S_IRUSR | libc::S_IRGRP | libc::S_IROTH) as u32;
/// Write-permission bits masked into a write blob reference.
const ALL_WRITE: u32 = (libc::S_IWUSR | libc::S_IWGRP | libc::S_IWOTH) as u32;

/// Stateless POSIX surface over a single exported root directory.
pub struct FileNode {
    root: PathBuf,
    /// Device the root lives on, recorded for cross-device diagnostics.
    dev: u64,
    base_url: Url,
}

impl FileNode {
    /// Bind a node to `root`. The root must stat successfully.
    pub fn new(root: impl Into<PathBuf>, base_url: Url) -> Result<Self, Errno> {
        let root = root.into();
        let meta = std::fs::metadata(&root)?;
        Ok(FileNode {
            dev: StatData::from_metadata(&meta).dev,
            root,
            base_url,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dev(&self) -> u64 {
        self.dev
    }

    /// Resolve a root-relative wire path to a host path.
    fn abs(&self, rel: &str) -> PathBuf {
        self.root.join(rel.trim_start_matches('/'))
    }

    /// Make a host path root-relative again; `None` when it lies outside
    /// the root.
    fn rel(&self, path: &Path) -> Option<String> {
        path.strip_prefix(&self.root)
            .ok()
            .map(|p| p.to_string_lossy().into_owned())
    }

    pub fn statfs(&self, rel: &str) -> Result<StatfsData, Errno> {
        let st = nix::sys::statvfs::statvfs(&self.abs(rel))?;
        Ok(StatfsData {
            blocks: st.blocks() as u64,
            bfree: st.blocks_free() as u64,
            bavail: st.blocks_available() as u64,
            files: st.files() as u64,
            ffree: st.files_free() as u64,
            bsize: st.block_size() as u32,
            namelen: st.name_max() as u32,
            frsize: st.fragment_size() as u32,
        })
    }

    pub fn lstat(&self, rel: &str) -> Result<StatData, Errno> {
        let meta = std::fs::symlink_metadata(self.abs(rel))?;
        Ok(StatData::from_metadata(&meta))
    }

    pub fn stat(&self, rel: &str) -> Result<StatData, Errno> {
        let meta = std::fs::metadata(self.abs(rel))?;
        Ok(StatData::from_metadata(&meta))
    }

    /// Only regular files can be created this way; device and fifo nodes
    /// would need privileges the server does not assume.
    pub fn mknod(&self, rel: &str, attr: Option<&Attr>) -> Result<StatData, Errno> {
        let mode = required(attr.and_then(|a| a.mode))?;
        if !is_regular(mode) {
            return Err(Errno(libc::ENOTSUP));
        }
        let path = self.abs(rel);

        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        self.lstat(rel).map_err(|err| {
            let _ = std::fs::remove_file(&path);
            err
        })
    }

    pub fn mkdir(&self, rel: &str, attr: Option<&Attr>) -> Result<StatData, Errno> {
        let mode = required(attr.and_then(|a| a.mode))?;
        let path = self.abs(rel);

        DirBuilder::new().mode(mode).create(&path)?;

        self.lstat(rel).map_err(|err| {
            let _ = std::fs::remove_dir(&path);
            err
        })
    }

    pub fn rmdir(&self, rel: &str) -> Result<(), Errno> {
        std::fs::remove_dir(self.abs(rel))?;
        Ok(())
    }

    pub fn unlink(&self, rel: &str) -> Result<(), Errno> {
        std::fs::remove_file(self.abs(rel))?;
        Ok(())
    }

    pub fn rename(&self, rel: &str, to: &str) -> Result<(), Errno> {
        std::fs::rename(self.abs(rel), self.abs(to))?;
        Ok(())
    }

    /// `rel` is the link target, `dir` the location of the new link. The
    /// target is joined with the root so links resolve inside the export,
    /// and is stored without canonicalization.
    pub fn symlink(&self, rel: &str, dir: &str) -> Result<StatData, Errno> {
        let target = self.abs(rel);
        let link = self.abs(dir);

        std::os::unix::fs::symlink(&target, &link)?;

        self.lstat(dir).map_err(|err| {
            let _ = std::fs::remove_file(&link);
            err
        })
    }

    pub fn link(&self, rel: &str, dir: &str) -> Result<StatData, Errno> {
        let path = self.abs(rel);
        let link = self.abs(dir);

        std::fs::hard_link(&path, &link)?;

        self.lstat(dir).map_err(|err| {
            let _ = std::fs::remove_file(&link);
            err
        })
    }

    /// An absolute target under the root comes back root-relative; anything
    /// else is returned verbatim.
    pub fn readlink(&self, rel: &str) -> Result<String, Errno> {
        let target = std::fs::read_link(self.abs(rel))?;
        Ok(self
            .rel(&target)
            .unwrap_or_else(|| target.to_string_lossy().into_owned()))
    }

    /// Open with the caller's flags, fstat, close. No handle is retained.
    pub fn open(&self, rel: &str, attr: Option<&Attr>) -> Result<StatData, Errno> {
        let mode = required(attr.and_then(|a| a.mode))?;
        let perm = required(attr.and_then(|a| a.perm))?;

        let file = open_with_flags(&self.abs(rel), mode as i32, perm)?;
        let meta = file.metadata()?;
        Ok(StatData::from_metadata(&meta))
    }

    /// Same as [`FileNode::open`] with `O_CREAT` forced on.
    pub fn create(&self, rel: &str, attr: Option<&Attr>) -> Result<StatData, Errno> {
        let mode = required(attr.and_then(|a| a.mode))?;
        let perm = required(attr.and_then(|a| a.perm))?;

        let file = open_with_flags(&self.abs(rel), mode as i32 | libc::O_CREAT, perm)?;
        let meta = file.metadata()?;
        Ok(StatData::from_metadata(&meta))
    }

    pub fn opendir(&self, rel: &str) -> Result<(), Errno> {
        OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_DIRECTORY)
            .open(self.abs(rel))?;
        Ok(())
    }

    /// Entries come back in the backend's natural order.
    pub fn readdir(&self, rel: &str) -> Result<Vec<DirEntry>, Errno> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(self.abs(rel))? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            // Per-entry stat failures degrade to an empty info block, the
            // entry itself is still listed.
            let meta = entry.metadata().ok();
            let (mode, size, mtime) = match &meta {
                Some(m) => {
                    let st = StatData::from_metadata(m);
                    (st.mode, st.size, st.mtim)
                }
                None => (0, 0, TimespecData::default()),
            };
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            entries.push(DirEntry {
                name: name.clone(),
                is_dir,
                type_bits: mode & libc::S_IFMT as u32,
                info: FileInfo {
                    name,
                    size,
                    mode,
                    mtime,
                    is_dir,
                },
            });
        }
        Ok(entries)
    }

    pub fn chmod(&self, rel: &str, attr: Option<&Attr>) -> Result<(), Errno> {
        let mode = required(attr.and_then(|a| a.mode))?;
        std::fs::set_permissions(self.abs(rel), Permissions::from_mode(mode))?;
        Ok(())
    }

    pub fn chown(&self, rel: &str, attr: Option<&Attr>) -> Result<(), Errno> {
        let owner = required(attr.and_then(|a| a.owner))?;
        nix::unistd::chown(&self.abs(rel), owner_uid(&owner), owner_gid(&owner))?;
        Ok(())
    }

    pub fn truncate(&self, rel: &str, attr: Option<&Attr>) -> Result<(), Errno> {
        let size = required(attr.and_then(|a| a.size))?;
        nix::unistd::truncate(&self.abs(rel), size)?;
        Ok(())
    }

    /// Apply present fields in order: chmod, chown, utimes, truncate, then
    /// restat. The first failing step short-circuits with its errno.
    pub fn setattr(&self, rel: &str, attr: Option<&Attr>) -> Result<StatData, Errno> {
        let attr = attr.ok_or(Errno(libc::EINVAL))?;
        let path = self.abs(rel);

        if let Some(mode) = attr.mode {
            std::fs::set_permissions(&path, Permissions::from_mode(mode))?;
        }

        if let Some(owner) = attr.owner {
            nix::unistd::chown(&path, owner_uid(&owner), owner_gid(&owner))?;
        }

        utimens(&path, attr.atime, attr.mtime)?;

        if let Some(size) = attr.size {
            nix::unistd::truncate(&path, size)?;
        }

        self.lstat(rel)
    }

    /// Produce a read blob reference. The size is clamped to the file end;
    /// an offset past the end fails rather than describing an empty read.
    pub fn read(&self, rel: &str, attr: Option<&Attr>) -> Result<BlobInfo, Errno> {
        let offset = required(attr.and_then(|a| a.offset))?;
        let size = required(attr.and_then(|a| a.size))?;

        let st = self.stat(rel)?;
        if offset > st.size {
            return Err(Errno(libc::EINVAL));
        }

        let mut bi = BlobInfo {
            path: rel.to_string(),
            offset,
            size: size.min(st.size - offset),
            perm: st.mode & ALL_READ,
            href: String::new(),
        };
        bi.href = blob::encode_href(&self.base_url, &bi);
        Ok(bi)
    }

    /// Produce a write blob reference carrying the write-permission bits.
    pub fn write(&self, rel: &str, attr: Option<&Attr>) -> Result<BlobInfo, Errno> {
        let offset = required(attr.and_then(|a| a.offset))?;
        let size = required(attr.and_then(|a| a.size))?;

        let st = self.stat(rel)?;

        let mut bi = BlobInfo {
            path: rel.to_string(),
            offset,
            size,
            perm: st.mode & ALL_WRITE,
            href: String::new(),
        };
        bi.href = blob::encode_href(&self.base_url, &bi);
        Ok(bi)
    }

    /// Dispatch one `/fs/<op>` call. `None` means the op is unknown and the
    /// transport should answer 404.
    pub fn dispatch(&self, op: &str, args: &CallArgs) -> Option<CallResult> {
        debug!(op, path = %args.path, "fs call");
        let attr = args.attr.as_ref();
        let outcome = match op {
            "statfs" => self.statfs(&args.path).map(to_value),
            "lstat" => self.lstat(&args.path).map(to_value),
            "stat" => self.stat(&args.path).map(to_value),
            "mknod" => self.mknod(&args.path, attr).map(to_value),
            "mkdir" => self.mkdir(&args.path, attr).map(to_value),
            "rmdir" => self.rmdir(&args.path).map(empty),
            "unlink" => self.unlink(&args.path).map(empty),
            "rename" => self.rename(&args.path, &args.to).map(empty),
            "symlink" => self.symlink(&args.path, &args.link).map(to_value),
            "link" => self.link(&args.path, &args.link).map(to_value),
            "readlink" => self.readlink(&args.path).map(to_value),
            "open" => self.open(&args.path, attr).map(to_value),
            "create" => self.create(&args.path, attr).map(to_value),
            "opendir" => self.opendir(&args.path).map(empty),
            "readdir" => self.readdir(&args.path).map(to_value),
            "chmod" => self.chmod(&args.path, attr).map(empty),
            "chown" => self.chown(&args.path, attr).map(empty),
            "truncate" => self.truncate(&args.path, attr).map(empty),
            "setattr" => self.setattr(&args.path, attr).map(to_value),
            "read" => self.read(&args.path, attr).map(to_value),
            "write" => self.write(&args.path, attr).map(to_value),
            _ => return None,
        };
        Some(match outcome {
            Ok(data) => CallResult::ok(data),
            Err(errno) => CallResult::err(errno),
        })
    }
}

/// Required-attr-field precondition: absence is EINVAL.
fn required<T>(field: Option<T>) -> Result<T, Errno> {
    field.ok_or(Errno(libc::EINVAL))
}

fn to_value<T: serde::Serialize>(value: T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

fn empty(_: ()) -> serde_json::Value {
    serde_json::Value::String(String::new())
}

fn owner_uid(owner: &Owner) -> Option<Uid> {
    (owner.uid >= 0).then(|| Uid::from_raw(owner.uid as u32))
}

fn owner_gid(owner: &Owner) -> Option<Gid> {
    (owner.gid >= 0).then(|| Gid::from_raw(owner.gid as u32))
}

/// Open honoring a raw open-flags bitmask from the wire. The access mode
/// and creation bits go through `OpenOptions`, everything else through
/// `custom_flags`.
fn open_with_flags(path: &Path, flags: i32, perm: u32) -> Result<File, Errno> {
    let mut opts = OpenOptions::new();
    match flags & libc::O_ACCMODE {
        libc::O_WRONLY => {
            opts.write(true);
        }
        libc::O_RDWR => {
            opts.read(true).write(true);
        }
        _ => {
            opts.read(true);
        }
    }
    if flags & libc::O_CREAT != 0 {
        opts.create(true);
    }
    if flags & libc::O_TRUNC != 0 {
        opts.truncate(true);
    }
    if flags & libc::O_APPEND != 0 {
        opts.append(true);
    }
    if flags & libc::O_EXCL != 0 {
        opts.create_new(true);
    }
    opts.custom_flags(
        flags & !(libc::O_ACCMODE | libc::O_CREAT | libc::O_TRUNC | libc::O_APPEND | libc::O_EXCL),
    );
    opts.mode(perm);
    Ok(opts.open(path)?)
}

/// The nanoseconds sentinel utimensat understands as "leave unchanged".
const UTIME_OMIT: i64 = (1 << 30) - 2;

fn to_timespec(t: Option<TimespecData>) -> libc::timespec {
    match t {
        // Negative nanoseconds can fall out of pre-epoch timestamp math;
        // the syscall rejects them.
        Some(ts) => libc::timespec {
            tv_sec: ts.secs,
            tv_nsec: ts.nanos.max(0),
        },
        None => libc::timespec {
            tv_sec: 0,
            tv_nsec: UTIME_OMIT,
        },
    }
}

/// utimensat with omit semantics for absent timestamps. Always invoked by
/// setattr; two omitted timestamps make it a no-op.
fn utimens(
    path: &Path,
    atime: Option<TimespecData>,
    mtime: Option<TimespecData>,
) -> Result<(), Errno> {
    let times = [to_timespec(atime), to_timespec(mtime)];
    let cpath =
        CString::new(path.as_os_str().as_bytes()).map_err(|_| Errno(libc::EINVAL))?;
    let rc = unsafe { libc::utimensat(libc::AT_FDCWD, cpath.as_ptr(), times.as_ptr(), 0) };
    if rc < 0 {
        return Err(Errno::from(io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn node() -> (FileNode, TempDir) {
        let dir = TempDir::new().unwrap();
        let url = Url::parse("http://localhost:58080/").unwrap();
        let node = FileNode::new(dir.path(), url).unwrap();
        (node, dir)
    }

    fn attr() -> Attr {
        Attr::default()
    }

    fn touch(dir: &TempDir, name: &str, contents: &[u8]) {
        std::fs::write(dir.path().join(name), contents).unwrap();
    }

    #[test]
    fn new_requires_existing_root() {
        let url = Url::parse("http://localhost:58080/").unwrap();
        assert!(FileNode::new("/no/such/directory/anywhere", url).is_err());
    }

    #[test]
    fn read_clamps_to_file_end() {
        let (node, dir) = node();
        touch(&dir, "f", &vec![7u8; 1000]);

        let bi = node
            .read(
                "/f",
                Some(&Attr {
                    offset: Some(900),
                    size: Some(200),
                    ..attr()
                }),
            )
            .unwrap();
        assert_eq!(bi.size, 100);
        assert_eq!(bi.offset, 900);
        assert!(!bi.href.is_empty());
    }

    #[test]
    fn read_past_end_is_einval() {
        let (node, dir) = node();
        touch(&dir, "f", &vec![7u8; 1000]);

        let err = node
            .read(
                "/f",
                Some(&Attr {
                    offset: Some(1001),
                    size: Some(1),
                    ..attr()
                }),
            )
            .unwrap_err();
        assert_eq!(err, Errno(libc::EINVAL));
    }

    #[test]
    fn zero_sized_read_is_valid() {
        let (node, dir) = node();
        touch(&dir, "f", b"x");

        let bi = node
            .read(
                "/f",
                Some(&Attr {
                    offset: Some(0),
                    size: Some(0),
                    ..attr()
                }),
            )
            .unwrap();
        assert_eq!(bi.size, 0);
        assert!(!bi.href.is_empty());
    }

    #[test]
    fn read_perm_masks_read_bits() {
        let (node, dir) = node();
        touch(&dir, "f", b"data");
        std::fs::set_permissions(dir.path().join("f"), Permissions::from_mode(0o640)).unwrap();

        let bi = node
            .read(
                "/f",
                Some(&Attr {
                    offset: Some(0),
                    size: Some(4),
                    ..attr()
                }),
            )
            .unwrap();
        assert_eq!(bi.perm, 0o440);

        let bi = node
            .write(
                "/f",
                Some(&Attr {
                    offset: Some(0),
                    size: Some(4),
                    ..attr()
                }),
            )
            .unwrap();
        assert_eq!(bi.perm, 0o200);
    }

    #[test]
    fn mknod_rejects_special_files() {
        let (node, _dir) = node();
        let err = node
            .mknod(
                "/dev0",
                Some(&Attr {
                    mode: Some(libc::S_IFCHR as u32 | 0o644),
                    ..attr()
                }),
            )
            .unwrap_err();
        assert_eq!(err, Errno(libc::ENOTSUP));
    }

    #[test]
    fn mknod_creates_regular_file() {
        let (node, dir) = node();
        let st = node
            .mknod(
                "/plain",
                Some(&Attr {
                    mode: Some(libc::S_IFREG as u32 | 0o644),
                    ..attr()
                }),
            )
            .unwrap();
        assert!(is_regular(st.mode));
        assert!(dir.path().join("plain").exists());
    }

    #[test]
    fn missing_attr_fields_are_einval() {
        let (node, dir) = node();
        touch(&dir, "f", b"x");

        assert_eq!(node.mknod("/a", None).unwrap_err(), Errno(libc::EINVAL));
        assert_eq!(
            node.mkdir("/d", Some(&attr())).unwrap_err(),
            Errno(libc::EINVAL)
        );
        assert_eq!(
            node.chmod("/f", Some(&attr())).unwrap_err(),
            Errno(libc::EINVAL)
        );
        assert_eq!(
            node.chown("/f", Some(&attr())).unwrap_err(),
            Errno(libc::EINVAL)
        );
        assert_eq!(
            node.truncate("/f", Some(&attr())).unwrap_err(),
            Errno(libc::EINVAL)
        );
        assert_eq!(node.setattr("/f", None).unwrap_err(), Errno(libc::EINVAL));
        assert_eq!(
            node.read("/f", Some(&Attr { offset: Some(0), ..attr() }))
                .unwrap_err(),
            Errno(libc::EINVAL)
        );
        assert_eq!(
            node.open("/f", Some(&Attr { mode: Some(0), ..attr() }))
                .unwrap_err(),
            Errno(libc::EINVAL)
        );
    }

    #[test]
    fn mkdir_then_readdir() {
        let (node, _dir) = node();
        node.mkdir(
            "/d",
            Some(&Attr {
                mode: Some(0o755),
                ..attr()
            }),
        )
        .unwrap();

        let entries = node.readdir("/").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "d");
        assert!(entries[0].is_dir);
        assert_eq!(entries[0].type_bits, libc::S_IFDIR as u32);
    }

    #[test]
    fn readdir_of_file_fails() {
        let (node, dir) = node();
        touch(&dir, "f", b"x");
        assert!(node.readdir("/f").is_err());
    }

    #[test]
    fn readlink_relativizes_targets_under_root() {
        let (node, _dir) = node();
        // A target inside the root: stored absolute, returned relative.
        node.mkdir(
            "/a",
            Some(&Attr {
                mode: Some(0o755),
                ..attr()
            }),
        )
        .unwrap();
        std::fs::write(node.root().join("a/b"), b"x").unwrap();
        node.symlink("/a/b", "/lnk").unwrap();
        assert_eq!(node.readlink("/lnk").unwrap(), "a/b");
    }

    #[test]
    fn readlink_returns_outside_targets_verbatim() {
        let (node, dir) = node();
        std::os::unix::fs::symlink("/etc/hostname", dir.path().join("out")).unwrap();
        assert_eq!(node.readlink("/out").unwrap(), "/etc/hostname");
    }

    #[test]
    fn setattr_size_only_preserves_mode_and_times() {
        let (node, dir) = node();
        touch(&dir, "f", &vec![1u8; 100]);
        std::fs::set_permissions(dir.path().join("f"), Permissions::from_mode(0o640)).unwrap();
        let before = node.lstat("/f").unwrap();

        let st = node
            .setattr(
                "/f",
                Some(&Attr {
                    size: Some(10),
                    ..attr()
                }),
            )
            .unwrap();

        assert_eq!(st.size, 10);
        assert_eq!(st.mode & 0o7777, before.mode & 0o7777);
        assert_eq!(st.atim, before.atim);
    }

    #[test]
    fn setattr_atime_only_preserves_mtime() {
        let (node, dir) = node();
        touch(&dir, "f", b"content");
        let before = node.lstat("/f").unwrap();

        let st = node
            .setattr(
                "/f",
                Some(&Attr {
                    atime: Some(TimespecData::new(1000, 500)),
                    ..attr()
                }),
            )
            .unwrap();

        assert_eq!(st.atim, TimespecData::new(1000, 500));
        assert_eq!(st.mtim, before.mtim);
    }

    #[test]
    fn setattr_negative_nanos_clamp_to_zero() {
        let (node, dir) = node();
        touch(&dir, "f", b"x");

        let st = node
            .setattr(
                "/f",
                Some(&Attr {
                    mtime: Some(TimespecData::new(42, -7)),
                    ..attr()
                }),
            )
            .unwrap();
        assert_eq!(st.mtim, TimespecData::new(42, 0));
    }

    #[test]
    fn create_then_truncate() {
        let (node, dir) = node();
        node.create(
            "/f",
            Some(&Attr {
                mode: Some((libc::O_CREAT | libc::O_RDWR) as u32),
                perm: Some(0o644),
                ..attr()
            }),
        )
        .unwrap();
        std::fs::write(dir.path().join("f"), vec![9u8; 100]).unwrap();

        node.truncate(
            "/f",
            Some(&Attr {
                size: Some(10),
                ..attr()
            }),
        )
        .unwrap();
        assert_eq!(node.lstat("/f").unwrap().size, 10);
    }

    #[test]
    fn rename_across_directories() {
        let (node, dir) = node();
        let mkdir = |p: &str| {
            node.mkdir(
                p,
                Some(&Attr {
                    mode: Some(0o755),
                    ..attr()
                }),
            )
            .unwrap()
        };
        mkdir("/a");
        mkdir("/b");
        touch(&dir, "a/x", b"payload");

        node.rename("/a/x", "/b/x").unwrap();

        assert!(node.readdir("/a").unwrap().is_empty());
        let names: Vec<_> = node.readdir("/b").unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["x"]);
    }

    #[test]
    fn link_counts_both_names() {
        let (node, dir) = node();
        touch(&dir, "orig", b"shared");

        let st = node.link("/orig", "/copy").unwrap();
        assert!(st.nlink >= 2);
        assert_eq!(std::fs::read(dir.path().join("copy")).unwrap(), b"shared");
    }

    #[test]
    fn opendir_rejects_files() {
        let (node, dir) = node();
        touch(&dir, "f", b"x");
        assert!(node.opendir("/").is_ok());
        assert_eq!(node.opendir("/f").unwrap_err(), Errno(libc::ENOTDIR));
    }

    #[test]
    fn statfs_reports_nonzero_geometry() {
        let (node, _dir) = node();
        let st = node.statfs("/").unwrap();
        assert!(st.bsize > 0);
        assert!(st.blocks > 0);
    }

    #[test]
    fn dispatch_unknown_op_is_none() {
        let (node, _dir) = node();
        assert!(node.dispatch("frobnicate", &CallArgs::default()).is_none());
    }

    #[test]
    fn dispatch_maps_errno_into_envelope() {
        let (node, dir) = node();
        node.mkdir(
            "/d",
            Some(&Attr {
                mode: Some(0o755),
                ..attr()
            }),
        )
        .unwrap();
        touch(&dir, "d/child", b"x");

        let res = node
            .dispatch(
                "rmdir",
                &CallArgs {
                    path: "/d".into(),
                    ..CallArgs::default()
                },
            )
            .unwrap();
        assert_eq!(res.status, Errno(libc::ENOTEMPTY));
        assert!(res.data.is_none());
    }
}

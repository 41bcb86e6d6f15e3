//! In-memory volume: a tree of directories and byte-vector files behind one
//! lock, standing in for the block-device backing on hosted runs.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::{FileInfo, OpenMode, Vfs, VfsDir, VfsError, VfsFile, VfsResult};

/// Every entry carries the same fixed stamp; the volume has no clock.
const RAMDISK_DATE: u16 = FileInfo::pack_date(2024, 1, 1);
const RAMDISK_TIME: u16 = FileInfo::pack_time(12, 0, 0);

#[derive(Default, Debug)]
struct DirNode {
    entries: BTreeMap<String, Node>,
}

#[derive(Debug)]
struct FileNode {
    data: Vec<u8>,
}

#[derive(Debug)]
enum Node {
    File(FileNode),
    Dir(DirNode),
}

#[derive(Debug)]
struct DiskState {
    root: Node,
    cwd: Vec<String>,
}

/// A whole volume held in memory.
pub struct RamDisk {
    state: Arc<Mutex<DiskState>>,
}

/// Splits a path into components against the current directory. `..` at the
/// root stays at the root.
fn resolve(cwd: &[String], path: &str) -> VfsResult<Vec<String>> {
    if path.is_empty() {
        return Err(VfsError::InvalidName);
    }
    let mut parts: Vec<String> = if path.starts_with('/') {
        Vec::new()
    } else {
        cwd.to_vec()
    };
    for comp in path.split('/') {
        match comp {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name => parts.push(name.to_string()),
        }
    }
    Ok(parts)
}

fn lookup<'a>(root: &'a Node, parts: &[String]) -> Option<&'a Node> {
    let mut cur = root;
    for part in parts {
        match cur {
            Node::Dir(dir) => cur = dir.entries.get(part)?,
            Node::File(_) => return None,
        }
    }
    Some(cur)
}

fn lookup_mut<'a>(root: &'a mut Node, parts: &[String]) -> Option<&'a mut Node> {
    let mut cur = root;
    for part in parts {
        match cur {
            Node::Dir(dir) => cur = dir.entries.get_mut(part)?,
            Node::File(_) => return None,
        }
    }
    Some(cur)
}

/// The directory that would contain `parts`, plus the final name.
fn parent_dir_mut<'a>(
    root: &'a mut Node,
    parts: &[String],
) -> VfsResult<(&'a mut DirNode, String)> {
    let (last, dir_parts) = parts.split_last().ok_or(VfsError::InvalidName)?;
    match lookup_mut(root, dir_parts) {
        Some(Node::Dir(dir)) => Ok((dir, last.clone())),
        _ => Err(VfsError::NoPath),
    }
}

fn info_for(name: &str, node: &Node) -> FileInfo {
    match node {
        Node::Dir(_) => FileInfo {
            name: name.to_string(),
            is_dir: true,
            fdate: RAMDISK_DATE,
            ftime: RAMDISK_TIME,
            ..FileInfo::default()
        },
        Node::File(file) => FileInfo {
            name: name.to_string(),
            size: file.data.len() as u64,
            archive: true,
            fdate: RAMDISK_DATE,
            ftime: RAMDISK_TIME,
            ..FileInfo::default()
        },
    }
}

impl RamDisk {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DiskState {
                root: Node::Dir(DirNode::default()),
                cwd: Vec::new(),
            })),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut DiskState) -> VfsResult<T>) -> VfsResult<T> {
        let mut st = self.state.lock().map_err(|_| VfsError::InvalidObject)?;
        f(&mut st)
    }
}

impl Default for RamDisk {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs for RamDisk {
    fn chdir(&self, path: &str) -> VfsResult<()> {
        self.with_state(|st| {
            let parts = resolve(&st.cwd, path)?;
            match lookup(&st.root, &parts) {
                Some(Node::Dir(_)) => {
                    st.cwd = parts;
                    Ok(())
                }
                _ => Err(VfsError::NoPath),
            }
        })
    }

    fn getcwd(&self) -> VfsResult<String> {
        self.with_state(|st| {
            if st.cwd.is_empty() {
                Ok("/".to_string())
            } else {
                Ok(format!("/{}", st.cwd.join("/")))
            }
        })
    }

    fn mkdir(&self, path: &str) -> VfsResult<()> {
        self.with_state(|st| {
            let parts = resolve(&st.cwd, path)?;
            let (dir, name) = parent_dir_mut(&mut st.root, &parts)?;
            if dir.entries.contains_key(&name) {
                return Err(VfsError::Exists);
            }
            dir.entries.insert(name, Node::Dir(DirNode::default()));
            Ok(())
        })
    }

    fn rmdir(&self, path: &str) -> VfsResult<()> {
        self.with_state(|st| {
            let parts = resolve(&st.cwd, path)?;
            let (dir, name) = parent_dir_mut(&mut st.root, &parts)?;
            match dir.entries.get(&name) {
                Some(Node::Dir(sub)) if sub.entries.is_empty() => {}
                Some(Node::Dir(_)) => return Err(VfsError::Denied),
                Some(Node::File(_)) => return Err(VfsError::InvalidName),
                None => return Err(VfsError::NotFound),
            }
            dir.entries.remove(&name);
            Ok(())
        })
    }

    fn remove(&self, path: &str) -> VfsResult<()> {
        self.with_state(|st| {
            let parts = resolve(&st.cwd, path)?;
            let (dir, name) = parent_dir_mut(&mut st.root, &parts)?;
            match dir.entries.get(&name) {
                Some(Node::File(_)) => {}
                Some(Node::Dir(sub)) if sub.entries.is_empty() => {}
                Some(Node::Dir(_)) => return Err(VfsError::Denied),
                None => return Err(VfsError::NotFound),
            }
            dir.entries.remove(&name);
            Ok(())
        })
    }

    fn rename(&self, from: &str, to: &str) -> VfsResult<()> {
        self.with_state(|st| {
            let from_parts = resolve(&st.cwd, from)?;
            let to_parts = resolve(&st.cwd, to)?;
            if lookup(&st.root, &from_parts).is_none() {
                return Err(VfsError::NotFound);
            }
            if lookup(&st.root, &to_parts).is_some() {
                return Err(VfsError::Exists);
            }
            // A node cannot move underneath itself.
            if to_parts.starts_with(&from_parts) {
                return Err(VfsError::InvalidName);
            }
            let (to_name, to_dir_parts) = to_parts.split_last().ok_or(VfsError::InvalidName)?;
            match lookup(&st.root, to_dir_parts) {
                Some(Node::Dir(_)) => {}
                _ => return Err(VfsError::NoPath),
            }

            let (from_dir, from_name) = parent_dir_mut(&mut st.root, &from_parts)?;
            let node = from_dir.entries.remove(&from_name).ok_or(VfsError::NotFound)?;
            let (to_dir, _) = parent_dir_mut(&mut st.root, &to_parts)?;
            to_dir.entries.insert(to_name.clone(), node);
            Ok(())
        })
    }

    fn stat(&self, path: &str) -> VfsResult<FileInfo> {
        self.with_state(|st| {
            let parts = resolve(&st.cwd, path)?;
            if parts.is_empty() {
                return Ok(FileInfo {
                    name: "/".to_string(),
                    is_dir: true,
                    fdate: RAMDISK_DATE,
                    ftime: RAMDISK_TIME,
                    ..FileInfo::default()
                });
            }
            let node = lookup(&st.root, &parts).ok_or(VfsError::NotFound)?;
            Ok(info_for(parts.last().unwrap(), node))
        })
    }

    fn open(&self, path: &str, mode: OpenMode) -> VfsResult<Box<dyn VfsFile>> {
        let (parts, pos) = self.with_state(|st| {
            let parts = resolve(&st.cwd, path)?;
            match mode {
                OpenMode::Read => match lookup(&st.root, &parts) {
                    Some(Node::File(_)) => Ok((parts, 0)),
                    _ => Err(VfsError::NotFound),
                },
                OpenMode::CreateAlways => {
                    let (dir, name) = parent_dir_mut(&mut st.root, &parts)?;
                    match dir.entries.get_mut(&name) {
                        Some(Node::File(file)) => {
                            file.data.clear();
                        }
                        Some(Node::Dir(_)) => return Err(VfsError::Denied),
                        None => {
                            dir.entries.insert(name, Node::File(FileNode { data: Vec::new() }));
                        }
                    }
                    Ok((parts, 0))
                }
                OpenMode::Append => {
                    let (dir, name) = parent_dir_mut(&mut st.root, &parts)?;
                    let pos = match dir.entries.get(&name) {
                        Some(Node::File(file)) => file.data.len(),
                        Some(Node::Dir(_)) => return Err(VfsError::Denied),
                        None => {
                            dir.entries.insert(name, Node::File(FileNode { data: Vec::new() }));
                            0
                        }
                    };
                    Ok((parts, pos))
                }
            }
        })?;

        Ok(Box::new(RamFile {
            state: self.state.clone(),
            parts,
            pos,
            writable: mode != OpenMode::Read,
        }))
    }

    fn opendir(&self, path: &str) -> VfsResult<Box<dyn VfsDir>> {
        self.with_state(|st| {
            let parts = resolve(&st.cwd, path)?;
            let entries = match lookup(&st.root, &parts) {
                Some(Node::Dir(dir)) => dir
                    .entries
                    .iter()
                    .map(|(name, node)| info_for(name, node))
                    .collect(),
                Some(Node::File(_)) => return Err(VfsError::NoPath),
                None => return Err(VfsError::NoPath),
            };
            Ok(Box::new(RamDir { entries, next: 0 }) as Box<dyn VfsDir>)
        })
    }
}

/// An open handle into the volume; the node is re-resolved on every access,
/// so a handle whose file was unlinked reports an invalid object.
#[derive(Debug)]
struct RamFile {
    state: Arc<Mutex<DiskState>>,
    parts: Vec<String>,
    pos: usize,
    writable: bool,
}

impl RamFile {
    fn with_file<T>(&self, f: impl FnOnce(&mut FileNode) -> T) -> VfsResult<T> {
        let mut st = self.state.lock().map_err(|_| VfsError::InvalidObject)?;
        match lookup_mut(&mut st.root, &self.parts) {
            Some(Node::File(file)) => Ok(f(file)),
            _ => Err(VfsError::InvalidObject),
        }
    }
}

impl VfsFile for RamFile {
    fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize> {
        let pos = self.pos;
        let n = self.with_file(|file| {
            if pos >= file.data.len() {
                return 0;
            }
            let n = buf.len().min(file.data.len() - pos);
            buf[..n].copy_from_slice(&file.data[pos..pos + n]);
            n
        })?;
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> VfsResult<usize> {
        if !self.writable {
            return Err(VfsError::Denied);
        }
        let pos = self.pos;
        self.with_file(|file| {
            if file.data.len() < pos {
                file.data.resize(pos, 0);
            }
            let overlap = (file.data.len() - pos).min(buf.len());
            file.data[pos..pos + overlap].copy_from_slice(&buf[..overlap]);
            file.data.extend_from_slice(&buf[overlap..]);
        })?;
        self.pos += buf.len();
        Ok(buf.len())
    }

    fn seek(&mut self, pos: u64) -> VfsResult<()> {
        self.pos = pos as usize;
        Ok(())
    }
}

/// Directory handle over a snapshot of the entries taken at open time.
#[derive(Debug)]
struct RamDir {
    entries: Vec<FileInfo>,
    next: usize,
}

impl VfsDir for RamDir {
    fn next_entry(&mut self) -> VfsResult<Option<FileInfo>> {
        let entry = self.entries.get(self.next).cloned();
        if entry.is_some() {
            self.next += 1;
        }
        Ok(entry)
    }
}

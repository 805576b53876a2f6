//! Collection of originals for a downloadable album archive.
//!
//! The assembler hands every successfully decoded original to an
//! [`ArchiveCollector`] in processing order, under the member name
//! `<destination dir name>/<basename>`. Packaging the members into a zip
//! is left to an external tool; [`StagingArchive`] lays them out on disk
//! for it, [`MemoryArchive`] keeps them in memory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Receives archive members one at a time, in the order they should appear.
pub trait ArchiveCollector: Send {
    fn append(&mut self, member: &str, bytes: &[u8]) -> io::Result<()>;

    /// Called once after the last member of a completed run.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes members below a staging directory, mirroring their member paths.
///
/// Also records the member order, which a directory listing can't give back.
#[derive(Debug)]
pub struct StagingArchive {
    root: PathBuf,
    members: Vec<String>,
}

/// File listing the staged members in archive order, written by `finish`.
pub const STAGING_INDEX: &str = "members.txt";

impl StagingArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            members: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }
}

impl ArchiveCollector for StagingArchive {
    fn append(&mut self, member: &str, bytes: &[u8]) -> io::Result<()> {
        let path = member_path(&self.root, member)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        self.members.push(member.to_string());
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        let mut index = self.members.join("\n");
        index.push('\n');
        fs::write(self.root.join(STAGING_INDEX), index)
    }
}

/// Member names are relative `/`-separated paths; anything that would escape
/// the staging root is refused.
fn member_path(root: &Path, member: &str) -> io::Result<PathBuf> {
    let mut path = root.to_path_buf();
    for part in member.split('/') {
        if part.is_empty() || part == "." || part == ".." {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid archive member name: {member}"),
            ));
        }
        path.push(part);
    }
    Ok(path)
}

/// Keeps members in memory.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    pub members: Vec<(String, Vec<u8>)>,
    pub finished: bool,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl ArchiveCollector for MemoryArchive {
    fn append(&mut self, member: &str, bytes: &[u8]) -> io::Result<()> {
        self.members.push((member.to_string(), bytes.to_vec()));
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// Shared collector, so the caller can still inspect it after handing a
/// clone to the assembler.
impl<T: ArchiveCollector> ArchiveCollector for Arc<Mutex<T>> {
    fn append(&mut self, member: &str, bytes: &[u8]) -> io::Result<()> {
        lock(self)?.append(member, bytes)
    }

    fn finish(&mut self) -> io::Result<()> {
        lock(self)?.finish()
    }
}

fn lock<T>(shared: &Mutex<T>) -> io::Result<std::sync::MutexGuard<'_, T>> {
    shared
        .lock()
        .map_err(|_| io::Error::other("archive collector lock poisoned"))
}

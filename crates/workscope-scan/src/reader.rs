//! Directory listing used by the crawler.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;

/// What a directory entry is, without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    Symlink,
    Other,
}

/// One immediate child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub name: OsString,
    pub kind: EntryKind,
}

impl ChildEntry {
    pub fn new(name: impl Into<OsString>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Source of directory listings.
///
/// Every filesystem touch the crawler makes goes through this trait, so a
/// wrapper can observe exactly which directories were opened.
pub trait DirReader {
    /// List the immediate children of `dir` with their types.
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<ChildEntry>>;

    /// Whether `path` is a directory, following symlinks. A missing path is `Ok(false)`.
    fn is_dir(&self, path: &Path) -> io::Result<bool>;

    /// Whether `path` exists.
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

impl<R: DirReader + ?Sized> DirReader for &R {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<ChildEntry>> {
        (**self).read_dir(dir)
    }

    fn is_dir(&self, path: &Path) -> io::Result<bool> {
        (**self).is_dir(path)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }
}

/// Reads the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl DirReader for FsReader {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<ChildEntry>> {
        let mut children = Vec::new();
        for entry in fs::read_dir(dir)? {
            // An entry can vanish between readdir and stat
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!("Skipping unreadable entry in {}: {err}", dir.display());
                    continue;
                }
            };
            let kind = match entry.file_type() {
                Ok(ft) if ft.is_symlink() => EntryKind::Symlink,
                Ok(ft) if ft.is_dir() => EntryKind::Directory,
                Ok(_) => EntryKind::Other,
                Err(err) => {
                    tracing::debug!("Cannot stat {}: {err}", entry.path().display());
                    continue;
                }
            };
            children.push(ChildEntry::new(entry.file_name(), kind));
        }
        Ok(children)
    }

    fn is_dir(&self, path: &Path) -> io::Result<bool> {
        match fs::metadata(path) {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fs_reader_kinds() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("file.txt"), "x").unwrap();

        let mut children = FsReader.read_dir(temp.path()).unwrap();
        children.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(
            children,
            vec![
                ChildEntry::new("file.txt", EntryKind::Other),
                ChildEntry::new("sub", EntryKind::Directory),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_fs_reader_reports_symlinks() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("real")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("real"), temp.path().join("link")).unwrap();

        let children = FsReader.read_dir(temp.path()).unwrap();
        let link = children.iter().find(|c| c.name == "link").unwrap();
        assert_eq!(link.kind, EntryKind::Symlink);
    }

    #[test]
    fn test_is_dir_missing_is_false() {
        let temp = TempDir::new().unwrap();
        assert!(FsReader.is_dir(temp.path()).unwrap());
        assert!(!FsReader.is_dir(&temp.path().join("nope")).unwrap());
    }

    #[test]
    fn test_read_dir_missing_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(FsReader.read_dir(&temp.path().join("gone")).is_err());
    }
}

//! Path normalization for scan roots.

use std::path::{Component, Path, PathBuf};

use crate::env::Platform;

/// Where drive letters are mounted on non drive-letter hosts (`C:` becomes `/mnt/c`).
pub const DRIVE_MOUNT_PREFIX: &str = "/mnt";

/// Normalize a user-supplied path spelling into one usable as a traversal root.
///
/// Whitespace is trimmed and blank input yields an empty string, which
/// callers filter out. On hosts without drive letters, `C:\Users\me` and
/// `c:/Users/me` become `/mnt/c/Users/me`. Everything else passes through,
/// so normalizing twice is the same as normalizing once.
pub fn normalize_input_path(raw: &str, platform: Platform) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || platform.uses_drive_letters() {
        return trimmed.to_string();
    }

    match split_drive(trimmed) {
        Some((drive, rest)) => {
            let rest = rest.replace('\\', "/");
            let rest = rest.strip_prefix('/').unwrap_or(&rest);
            let drive = drive.to_ascii_lowercase();
            if rest.is_empty() {
                format!("{DRIVE_MOUNT_PREFIX}/{drive}")
            } else {
                format!("{DRIVE_MOUNT_PREFIX}/{drive}/{rest}")
            }
        }
        None => trimmed.to_string(),
    }
}

/// Split `X:` or `X:<sep>rest` into the drive letter and the remainder.
fn split_drive(path: &str) -> Option<(char, &str)> {
    let mut chars = path.chars();
    let drive = chars.next().filter(char::is_ascii_alphabetic)?;
    if chars.next() != Some(':') {
        return None;
    }
    let after = &path[2..];
    if after.is_empty() {
        return Some((drive, ""));
    }
    let rest = after
        .strip_prefix('\\')
        .or_else(|| after.strip_prefix('/'))?;
    Some((drive, rest))
}

/// Split a delimited root list on commas, semicolons and line breaks.
pub fn split_roots_input(value: &str) -> Vec<String> {
    value
        .split([',', ';', '\n', '\r'])
        .map(str::trim)
        .filter(|root| !root.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve `path` against `cwd` and fold `.` and `..` segments lexically.
///
/// Symlinks are not resolved, so the result names the same spelling the
/// caller gave, only absolute.
pub fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        clean_path(path)
    } else {
        clean_path(&cwd.join(path))
    }
}

/// Fold `.` and `..` segments without touching the filesystem.
///
/// Relative paths stay relative; leading `..` segments that cannot be
/// folded are kept.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

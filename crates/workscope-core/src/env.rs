//! Process environment captured once at startup.

use std::collections::HashMap;
use std::ffi::OsString;

/// Environment variable names read by workscope.
pub mod vars {
    /// Delimited list of scan roots; used when no roots are given on the command line.
    pub const SCAN_ROOTS: &str = "AGENT_SCAN_ROOTS";
    /// Delimited list of roots that are always appended.
    pub const SCAN_EXTRA_ROOTS: &str = "AGENT_SCAN_EXTRA_ROOTS";
    /// Default maximum traversal depth.
    pub const SCAN_MAX_DEPTH: &str = "AGENT_SCAN_MAX_DEPTH";
    /// Set to `true` to include `/` in the default roots.
    pub const SCAN_INCLUDE_ROOT: &str = "AGENT_SCAN_INCLUDE_ROOT";
    /// Location of the workspace record file.
    pub const WORKSPACES_FILE: &str = "WORKSCOPE_WORKSPACES_FILE";
    pub const CONTAINER: &str = "WORKSCOPE_CONTAINER";
    pub const IMAGE: &str = "WORKSCOPE_IMAGE";
    pub const PORT: &str = "PORT";
    pub const DATA_VOLUME: &str = "WORKSCOPE_DATA_VOLUME";
    pub const WORKSPACES_VOLUME: &str = "WORKSCOPE_WORKSPACES_VOLUME";
    /// Windows home drive and path, joined to form the home directory.
    pub const HOME_DRIVE: &str = "HOMEDRIVE";
    pub const HOME_PATH: &str = "HOMEPATH";
    pub const USER_PROFILE: &str = "USERPROFILE";
}

/// Path conventions of the host operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Paths are spelled with drive letters (`C:\Users`).
    DriveLetter,
    /// Paths hang off a single `/` root.
    Posix,
}

impl Platform {
    /// Detect the platform this binary was compiled for.
    pub const fn current() -> Self {
        if cfg!(windows) {
            Self::DriveLetter
        } else {
            Self::Posix
        }
    }

    /// Whether drive-letter paths are native on this platform.
    pub const fn uses_drive_letters(self) -> bool {
        matches!(self, Self::DriveLetter)
    }
}

/// Immutable copy of the environment variables workscope cares about.
///
/// Captured once in `main` and handed to the resolvers by value so that
/// nothing downstream reads ambient state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    values: HashMap<String, String>,
}

impl EnvSnapshot {
    /// Snapshot the current process environment.
    pub fn capture() -> Self {
        Self::from_os_pairs(std::env::vars_os())
    }

    /// Build a snapshot from raw OS pairs, dropping any that are not UTF-8.
    pub fn from_os_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        Self::from_pairs(pairs.into_iter().filter_map(|(key, value)| {
            match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (Ok(key), Err(_)) => {
                    tracing::debug!("Ignoring non UTF-8 value of {key}");
                    None
                }
                (Err(key), _) => {
                    tracing::debug!("Ignoring non UTF-8 variable {}", key.to_string_lossy());
                    None
                }
            }
        }))
    }

    /// Build a snapshot from explicit key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Look up a variable, treating blank values as unset.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    /// Look up a variable with a fallback for missing or blank values.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_non_empty(key).unwrap_or(default)
    }

    /// Whether a variable is set to exactly `true`.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key) == Some("true")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_lookup() {
        let env = EnvSnapshot::from_pairs([("A", "1"), ("BLANK", "  ")]);
        assert_eq!(env.get("A"), Some("1"));
        assert_eq!(env.get("MISSING"), None);
        assert_eq!(env.get_non_empty("BLANK"), None);
        assert_eq!(env.get_or("BLANK", "fallback"), "fallback");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_pairs_are_dropped() {
        use std::os::unix::ffi::OsStringExt;

        let bad = || OsString::from_vec(vec![0xff, 0xfe]);
        let env = EnvSnapshot::from_os_pairs([
            (OsString::from("GOOD"), OsString::from("/srv")),
            (OsString::from("BAD_VALUE"), bad()),
            (bad(), OsString::from("x")),
        ]);

        assert_eq!(env.get("GOOD"), Some("/srv"));
        assert_eq!(env.get("BAD_VALUE"), None);
        assert_eq!(env, EnvSnapshot::from_pairs([("GOOD", "/srv")]));
    }

    #[test]
    fn test_flag_requires_exact_true() {
        let env = EnvSnapshot::from_pairs([("ON", "true"), ("YES", "yes"), ("UPPER", "TRUE")]);
        assert!(env.flag("ON"));
        assert!(!env.flag("YES"));
        assert!(!env.flag("UPPER"));
        assert!(!env.flag("MISSING"));
    }
}

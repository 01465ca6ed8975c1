//! Scan root resolution.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;

use workscope_core::{
    DEFAULT_MAX_DEPTH, EnvSnapshot, Platform, absolutize, normalize_input_path, split_roots_input,
    vars,
};

/// Common container and host mount points checked on POSIX hosts.
pub const POSIX_MOUNT_CANDIDATES: &[&str] = &[
    "/workspaces",
    "/workspace",
    "/workdir",
    "/host",
    "/host_mnt",
    "/data",
    "/opt",
];

const DRIVE_LETTERS: &str = "cdefghijklmnopqrstuvwxyz";

/// Roots and depth limit for one crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoots {
    /// Absolute, deduplicated roots. Never empty.
    pub roots: IndexSet<PathBuf>,
    pub max_depth: u32,
}

/// Decides where a crawl starts.
///
/// Roots come from the first non-empty of: command-line paths, the
/// `AGENT_SCAN_ROOTS` list, platform defaults. `AGENT_SCAN_EXTRA_ROOTS` is
/// always appended.
#[derive(Debug, Clone)]
pub struct RootResolver {
    platform: Platform,
    env: EnvSnapshot,
    cwd: PathBuf,
    home: PathBuf,
    candidates: Vec<PathBuf>,
}

impl RootResolver {
    /// Create a resolver from values captured at startup.
    pub fn new(platform: Platform, env: EnvSnapshot, cwd: PathBuf, home: PathBuf) -> Self {
        Self {
            platform,
            env,
            cwd,
            home,
            candidates: default_candidates(),
        }
    }

    /// Replace the POSIX mount point candidates.
    pub fn with_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Resolve roots and the depth limit.
    ///
    /// `cli_max_depth` is the raw `--max-depth` value; anything that is not
    /// a non-negative integer falls back to the environment default.
    pub fn resolve(&self, cli_roots: &[String], cli_max_depth: Option<&str>) -> ResolvedRoots {
        let cli = self.normalize_all(cli_roots.iter().map(String::as_str));
        let from_env = self.env_list(vars::SCAN_ROOTS);
        let extra = self.env_list(vars::SCAN_EXTRA_ROOTS);

        let base = if !cli.is_empty() {
            cli
        } else if !from_env.is_empty() {
            from_env
        } else {
            self.default_roots()
        };

        let mut roots: IndexSet<PathBuf> = base
            .iter()
            .chain(extra.iter())
            .map(|root| normalize_input_path(root, self.platform))
            .filter(|root| !root.is_empty())
            .map(|root| absolutize(&self.cwd, Path::new(&root)))
            .collect();

        if roots.is_empty() {
            roots.insert(self.home.clone());
        }

        ResolvedRoots {
            roots,
            max_depth: self.max_depth(cli_max_depth),
        }
    }

    /// Depth from the command line, else the environment, else the built-in default.
    pub fn max_depth(&self, cli_max_depth: Option<&str>) -> u32 {
        let env_default = parse_max_depth(self.env.get(vars::SCAN_MAX_DEPTH), DEFAULT_MAX_DEPTH);
        parse_max_depth(cli_max_depth, env_default)
    }

    /// Platform defaults: cwd, home, and drive roots or existing mount points.
    pub fn default_roots(&self) -> Vec<String> {
        let mut defaults: IndexSet<String> = IndexSet::new();
        defaults.insert(self.cwd.to_string_lossy().into_owned());
        defaults.insert(self.home.to_string_lossy().into_owned());

        match self.platform {
            Platform::DriveLetter => defaults.extend(self.drive_roots()),
            Platform::Posix => defaults.extend(
                self.candidates
                    .iter()
                    .filter(|candidate| candidate.exists())
                    .map(|candidate| candidate.to_string_lossy().into_owned()),
            ),
        }

        if self.env.flag(vars::SCAN_INCLUDE_ROOT)
            && self.platform == Platform::Posix
            && Path::new("/").exists()
        {
            defaults.insert("/".to_string());
        }

        defaults.into_iter().collect()
    }

    /// Existing drive roots plus the Windows home directory variables.
    fn drive_roots(&self) -> Vec<String> {
        let mut roots: Vec<String> = DRIVE_LETTERS
            .chars()
            .map(|letter| format!("{}:\\", letter.to_ascii_uppercase()))
            .filter(|candidate| Path::new(candidate).exists())
            .collect();

        if let (Some(drive), Some(path)) = (
            self.env.get_non_empty(vars::HOME_DRIVE),
            self.env.get_non_empty(vars::HOME_PATH),
        ) {
            let home = format!("{drive}{path}");
            if Path::new(&home).exists() {
                roots.push(home);
            }
        }
        if let Some(profile) = self.env.get_non_empty(vars::USER_PROFILE) {
            if Path::new(profile).exists() {
                roots.push(profile.to_string());
            }
        }
        roots
    }

    fn env_list(&self, key: &str) -> Vec<String> {
        let raw = self.env.get(key).unwrap_or_default();
        self.normalize_all(split_roots_input(raw).iter().map(String::as_str))
    }

    fn normalize_all<'a>(&self, raw: impl Iterator<Item = &'a str>) -> Vec<String> {
        raw.map(|root| normalize_input_path(root, self.platform))
            .filter(|root| !root.is_empty())
            .collect()
    }
}

/// Parse a depth value, falling back on missing, negative or non-numeric input.
pub fn parse_max_depth(value: Option<&str>, fallback: u32) -> u32 {
    value
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .unwrap_or(fallback)
}

fn default_candidates() -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = POSIX_MOUNT_CANDIDATES.iter().map(PathBuf::from).collect();
    for letter in DRIVE_LETTERS.chars() {
        candidates.push(PathBuf::from(format!("/mnt/{letter}")));
        candidates.push(PathBuf::from(format!("/host_mnt/{letter}")));
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_max_depth() {
        assert_eq!(parse_max_depth(Some("3"), 8), 3);
        assert_eq!(parse_max_depth(Some(" 0 "), 8), 0);
        assert_eq!(parse_max_depth(Some("-1"), 8), 8);
        assert_eq!(parse_max_depth(Some("deep"), 8), 8);
        assert_eq!(parse_max_depth(Some(""), 8), 8);
        assert_eq!(parse_max_depth(None, 5), 5);
    }

    #[test]
    fn test_default_candidates_cover_drive_mounts() {
        let candidates = default_candidates();
        assert!(candidates.contains(&PathBuf::from("/workspaces")));
        assert!(candidates.contains(&PathBuf::from("/mnt/c")));
        assert!(candidates.contains(&PathBuf::from("/host_mnt/z")));
        assert!(!candidates.contains(&PathBuf::from("/mnt/a")));
    }
}

use std::path::PathBuf;

use workscope_core::{
    CrawlConfig, EnvSnapshot, MountSpec, Platform, SkipRules, WorkspaceEntry, WorkspacesFile,
    dedupe_mounts, normalize_input_path, split_roots_input, vars,
};

#[test]
fn test_env_roots_normalize_to_drive_mounts() {
    let env = EnvSnapshot::from_pairs([(vars::SCAN_ROOTS, "C:\\code; d:/src ,/home/me")]);
    let roots: Vec<String> = split_roots_input(env.get(vars::SCAN_ROOTS).unwrap())
        .iter()
        .map(|root| normalize_input_path(root, Platform::Posix))
        .collect();

    assert_eq!(roots, vec!["/mnt/c/code", "/mnt/d/src", "/home/me"]);
}

#[test]
fn test_custom_skip_rules_in_config() {
    let skip = SkipRules::empty().with_name("Target").with_prefix("/srv/cache");
    let config = CrawlConfig::builder()
        .skip(skip)
        .marker_container(".agentdir")
        .build()
        .unwrap();

    assert!(config.skip.matches_name("target"));
    assert!(!config.skip.matches_name("node_modules"));
    assert!(config.skip.matches_prefix(&PathBuf::from("/srv/cache/x")));
    assert!(config.is_marker_container(".agentdir"));
    assert!(!config.is_marker_container(".claude"));
}

#[test]
fn test_record_file_round_trip_preserves_order() {
    let file = WorkspacesFile {
        version: 1,
        workspaces: vec![
            WorkspaceEntry::new("/b/second", 2),
            WorkspaceEntry::new("/a/first", 1),
        ],
    };
    let raw = serde_json::to_string_pretty(&file).unwrap();
    let parsed = WorkspacesFile::parse(&raw).unwrap();

    assert_eq!(parsed, file);
    assert!(parsed.find(&PathBuf::from("/a/first")).is_some());
    assert!(parsed.find(&PathBuf::from("/c/none")).is_none());
}

#[test]
fn test_mount_dedupe_is_pairwise() {
    let mounts = dedupe_mounts([
        MountSpec::new("/x", "/host/x"),
        MountSpec::new("/x", "/x"),
        MountSpec::new("/x", "/host/x"),
    ]);
    assert_eq!(mounts.len(), 2);
    assert_eq!(mounts[0].volume_arg(), "/x:/host/x");
}

//! End-to-end flow: config -> load source tree -> ensure target -> archive
//!
//! Every test starts from a source tree on disk and drives the public API
//! the way a front end would.

use std::io::Cursor;

use chrono::{TimeZone, Utc};
use dotstate_core::{
    Archiver, Config, EnsureOptions, Identity, RealSystem, RootState, SimpleEngine, SourceTree,
};
use dotstate_test_utils::{RecordingSystem, TestTree};
use pretty_assertions::assert_eq;
use serde_json::json;

/// A small dotfiles repository.
fn dotfiles() -> TestTree {
    let source = TestTree::new();
    source.file("dot_bashrc", "export EDITOR=vim\n", 0o644);
    source.file("dot_gitconfig.tmpl", "[user]\n\temail = {{ email }}\n", 0o644);
    source.file("executable_dot_local_bin_hello", "#!/bin/sh\necho hi\n", 0o644);
    source.dir("private_dot_ssh", 0o755);
    source.file("private_dot_ssh/private_config", "Host *\n", 0o644);
    source.file("dot_config/nvim/init.lua", "-- vim\n", 0o644);
    source.file(".git/HEAD", "ref: refs/heads/main\n", 0o644);
    source
}

fn load(source: &TestTree) -> RootState {
    SourceTree::new(source.root())
        .load(&SimpleEngine::new(), &json!({"email": "alice@example.com"}))
        .unwrap()
}

#[test]
fn load_ensure_and_converge() {
    let source = dotfiles();
    let target = TestTree::new();
    target.file("unrelated", "leave me", 0o600);

    let state = load(&source);
    state.ensure(&RealSystem::new(), target.root()).unwrap();

    target.assert_file(".bashrc", "export EDITOR=vim\n", 0o666);
    target.assert_file(".gitconfig", "[user]\n\temail = alice@example.com\n", 0o666);
    target.assert_file(".local_bin_hello", "#!/bin/sh\necho hi\n", 0o777);
    target.assert_dir(".ssh", 0o700);
    target.assert_file(".ssh/config", "Host *\n", 0o600);
    target.assert_dir(".config", 0o777);
    target.assert_file(".config/nvim/init.lua", "-- vim\n", 0o666);
    target.assert_file("unrelated", "leave me", 0o600);
    target.assert_missing(".git");

    let recording = RecordingSystem::new();
    let report = load(&source)
        .ensure_with(&recording, target.root(), EnsureOptions::default())
        .unwrap();
    assert!(report.is_converged(), "second run acted: {:?}", report.actions);
    assert_eq!(recording.calls(), vec![]);
}

#[test]
fn drift_is_repaired() {
    let source = dotfiles();
    let target = TestTree::new();
    load(&source).ensure(&RealSystem::new(), target.root()).unwrap();

    target.file(".bashrc", "tampered\n", 0o666);
    std::fs::remove_dir_all(target.path(".config")).unwrap();
    target.file(".config", "not a dir", 0o644);
    target.dir(".ssh", 0o755);

    let preview = load(&source)
        .ensure_with(&RealSystem::new(), target.root(), EnsureOptions { dry_run: true })
        .unwrap();
    assert!(!preview.is_converged());
    target.assert_file(".bashrc", "tampered\n", 0o666);

    let applied = load(&source)
        .ensure_with(&RealSystem::new(), target.root(), EnsureOptions::default())
        .unwrap();
    assert_eq!(applied.actions, preview.actions);

    target.assert_file(".bashrc", "export EDITOR=vim\n", 0o666);
    target.assert_file(".config/nvim/init.lua", "-- vim\n", 0o666);
    target.assert_dir(".ssh", 0o700);
}

#[test]
fn lookup_finds_rendered_template() {
    let state = load(&dotfiles());

    let file = state.find_source_file(".gitconfig").unwrap();
    assert_eq!(file.source_name.as_str(), "dot_gitconfig.tmpl");
    assert_eq!(file.contents, b"[user]\n\temail = alice@example.com\n");

    assert!(state.find_source_file(".config/nvim/init.lua").is_some());
    assert!(state.find_source_file(".config/nvim").is_none());
    assert!(state.find_source_file(".git/HEAD").is_none());
}

#[test]
fn archive_is_reproducible_across_loads() {
    let source = dotfiles();
    let archiver = Archiver::new(
        Identity {
            uid: 501,
            gid: 20,
            user_name: "alice".into(),
            group_name: "staff".into(),
        },
        Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
    );

    let first = archiver.archive_to_vec(&load(&source)).unwrap();
    let second = archiver.archive_to_vec(&load(&source)).unwrap();
    assert!(first == second, "archives differ");

    let mut archive = tar::Archive::new(Cursor::new(first));
    let paths: Vec<String> = archive
        .entries()
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            entry.path().unwrap().to_string_lossy().trim_end_matches('/').to_string()
        })
        .collect();
    assert_eq!(
        paths,
        vec![
            ".bashrc",
            ".gitconfig",
            ".local_bin_hello",
            ".config",
            ".config/nvim",
            ".config/nvim/init.lua",
            ".ssh",
            ".ssh/config",
        ]
    );
}

#[test]
fn config_drives_the_flow() {
    let source = dotfiles();
    let target = TestTree::new();
    let config_dir = TestTree::new();
    let config_path = config_dir.path("dotstate.toml");

    let config = Config {
        source_dir: source.root().to_path_buf(),
        target_dir: target.root().to_path_buf(),
        data: json!({"email": "bob@example.com"}),
    };
    config.save(&config_path).unwrap();

    let loaded = Config::load(&config_path).unwrap();
    assert_eq!(loaded, config);

    let state = loaded
        .source_tree()
        .load(&SimpleEngine::new(), &loaded.data)
        .unwrap();
    state.ensure(&RealSystem::new(), &loaded.target_dir).unwrap();

    target.assert_file(".gitconfig", "[user]\n\temail = bob@example.com\n", 0o666);
}

#[test]
fn add_then_apply_round_trips() {
    let home = TestTree::new();
    home.dir(".ssh", 0o700);
    home.file(".ssh/id_ed25519", "secret\n", 0o600);
    let source = TestTree::new();

    SourceTree::new(source.root())
        .add(home.root(), &home.path(".ssh/id_ed25519"), false)
        .unwrap();
    source.assert_file("private_dot_ssh/private_id_ed25519", "secret\n", 0o644);

    let fresh = TestTree::new();
    SourceTree::new(source.root())
        .load(&SimpleEngine::new(), &json!({}))
        .unwrap()
        .ensure(&RealSystem::new(), fresh.root())
        .unwrap();

    fresh.assert_dir(".ssh", 0o700);
    fresh.assert_file(".ssh/id_ed25519", "secret\n", 0o600);
}

//! Deterministic tar output

use std::io::Cursor;

use chrono::{TimeZone, Utc};
use dotstate_core::{Archiver, DirState, FileState, Identity, RealSystem, RootState};
use dotstate_test_utils::TestTree;
use pretty_assertions::assert_eq;

fn identity() -> Identity {
    Identity {
        uid: 1000,
        gid: 100,
        user_name: "alice".into(),
        group_name: "users".into(),
    }
}

fn archiver() -> Archiver {
    Archiver::new(identity(), Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
}

fn model() -> RootState {
    RootState::new()
        .with_file(".profile", FileState::new("dot_profile", 0o666, "export A=1\n"))
        .with_file("run.sh", FileState::new("executable_run.sh", 0o777, "#!/bin/sh\n"))
        .with_dir(
            ".config",
            DirState::new("dot_config", 0o777)
                .with_file("b.conf", FileState::new("dot_config/private_b.conf", 0o600, "b"))
                .with_file("a.conf", FileState::new("dot_config/a.conf", 0o666, "a\n"))
                .with_dir(
                    "nvim",
                    DirState::new("dot_config/nvim", 0o777).with_file(
                        "init.lua",
                        FileState::new("dot_config/nvim/init.lua", 0o666, ""),
                    ),
                ),
        )
        .with_dir(
            ".ssh",
            DirState::new("private_dot_ssh", 0o700).with_file(
                "config",
                FileState::new("private_dot_ssh/private_config", 0o600, "Host *\n"),
            ),
        )
}

/// Same tree as [`model`], inserted in reverse order.
fn model_reversed() -> RootState {
    RootState::new()
        .with_dir(
            ".ssh",
            DirState::new("private_dot_ssh", 0o700).with_file(
                "config",
                FileState::new("private_dot_ssh/private_config", 0o600, "Host *\n"),
            ),
        )
        .with_dir(
            ".config",
            DirState::new("dot_config", 0o777)
                .with_dir(
                    "nvim",
                    DirState::new("dot_config/nvim", 0o777).with_file(
                        "init.lua",
                        FileState::new("dot_config/nvim/init.lua", 0o666, ""),
                    ),
                )
                .with_file("a.conf", FileState::new("dot_config/a.conf", 0o666, "a\n"))
                .with_file("b.conf", FileState::new("dot_config/private_b.conf", 0o600, "b")),
        )
        .with_file("run.sh", FileState::new("executable_run.sh", 0o777, "#!/bin/sh\n"))
        .with_file(".profile", FileState::new("dot_profile", 0o666, "export A=1\n"))
}

/// One line per entry: type, mode, size, path, owner.
fn listing(bytes: &[u8]) -> String {
    let mut archive = tar::Archive::new(Cursor::new(bytes));
    let mut lines = Vec::new();
    for entry in archive.entries().unwrap() {
        let entry = entry.unwrap();
        let header = entry.header();
        let kind = if header.entry_type().is_dir() { "d" } else { "f" };
        let path = entry.path().unwrap().to_string_lossy().trim_end_matches('/').to_string();
        lines.push(format!(
            "{} {:o} {} {} {}:{}",
            kind,
            header.mode().unwrap(),
            header.size().unwrap(),
            path,
            header.username().unwrap().unwrap(),
            header.groupname().unwrap().unwrap(),
        ));
    }
    lines.join("\n")
}

#[test]
fn entries_are_in_traversal_order() {
    let bytes = archiver().archive_to_vec(&model()).unwrap();

    insta::assert_snapshot!(listing(&bytes), @r"
    f 666 11 .profile alice:users
    f 777 10 run.sh alice:users
    d 777 0 .config alice:users
    f 666 2 .config/a.conf alice:users
    f 600 1 .config/b.conf alice:users
    d 777 0 .config/nvim alice:users
    f 666 0 .config/nvim/init.lua alice:users
    d 700 0 .ssh alice:users
    f 600 7 .ssh/config alice:users
    ");
}

#[test]
fn output_is_independent_of_insertion_order() {
    let first = archiver().archive_to_vec(&model()).unwrap();
    let second = archiver().archive_to_vec(&model_reversed()).unwrap();

    assert!(first == second, "archives differ");
}

#[test]
fn every_entry_shares_identity_and_timestamp() {
    let bytes = archiver().archive_to_vec(&model()).unwrap();
    let expected = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap().timestamp() as u64;

    let mut archive = tar::Archive::new(Cursor::new(bytes));
    let mut count = 0;
    for entry in archive.entries().unwrap() {
        let entry = entry.unwrap();
        let header = entry.header();
        assert_eq!(header.uid().unwrap(), 1000);
        assert_eq!(header.gid().unwrap(), 100);
        assert_eq!(header.mtime().unwrap(), expected);
        let gnu = header.as_gnu().unwrap();
        assert_eq!(gnu.atime().unwrap(), expected);
        assert_eq!(gnu.ctime().unwrap(), expected);
        count += 1;
    }
    assert_eq!(count, 9);
}

#[test]
fn file_contents_are_stored() {
    let bytes = archiver().archive_to_vec(&model()).unwrap();

    let mut archive = tar::Archive::new(Cursor::new(bytes));
    let mut found = None;
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        if entry.path().unwrap().to_str() == Some(".ssh/config") {
            let mut contents = String::new();
            std::io::Read::read_to_string(&mut entry, &mut contents).unwrap();
            found = Some(contents);
        }
    }
    assert_eq!(found.as_deref(), Some("Host *\n"));
}

#[test]
fn unpacked_archive_matches_ensured_target() {
    let bytes = archiver().archive_to_vec(&model()).unwrap();
    let unpacked = TestTree::new();
    let mut archive = tar::Archive::new(Cursor::new(bytes));
    archive.set_preserve_permissions(true);
    archive.unpack(unpacked.root()).unwrap();

    let ensured = TestTree::new();
    model().ensure(&RealSystem::new(), ensured.root()).unwrap();

    for (rel, mode) in [(".config", 0o777), (".config/nvim", 0o777), (".ssh", 0o700)] {
        unpacked.assert_dir(rel, mode);
        ensured.assert_dir(rel, mode);
    }
    for rel in [".profile", "run.sh", ".config/a.conf", ".config/b.conf", ".ssh/config"] {
        unpacked.assert_file(rel, ensured.read(rel), ensured.mode(rel));
    }
}

#[test]
fn archive_into_caller_builder() {
    let mut builder = tar::Builder::new(Vec::new());
    archiver().archive(&model(), &mut builder).unwrap();
    let bytes = builder.into_inner().unwrap();

    assert_eq!(bytes, archiver().archive_to_vec(&model()).unwrap());
}

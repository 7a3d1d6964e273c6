use crate::common::file::{FileSpec, write_file};
use assert_cmd::Command;
use assert_fs::TempDir;
use rstest::fixture;
use std::path::Path;

pub const AUTHOR_NAME: &str = "fake_user";
pub const AUTHOR_EMAIL: &str = "fake_email@email.com";
pub const AUTHOR_DATE: &str = "2023-01-01 12:00:00 +0000";

#[fixture]
pub fn repository_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// Repository with `1.txt`, `a/2.txt` and `a/b/3.txt` committed on `main`.
#[fixture]
pub fn init_repository_dir(repository_dir: TempDir) -> TempDir {
    run_arbor_command(repository_dir.path(), &["init"])
        .assert()
        .success();

    write_file(FileSpec::new(
        repository_dir.path().join("1.txt"),
        "one".to_string(),
    ));
    write_file(FileSpec::new(
        repository_dir.path().join("a").join("2.txt"),
        "two".to_string(),
    ));
    write_file(FileSpec::new(
        repository_dir.path().join("a").join("b").join("3.txt"),
        "three".to_string(),
    ));

    run_arbor_command(repository_dir.path(), &["add", "."])
        .assert()
        .success();
    arbor_commit(repository_dir.path(), "Initial commit")
        .assert()
        .success();

    repository_dir
}

pub fn run_arbor_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("arbor").expect("Failed to find arbor binary");
    cmd.envs(vec![
        ("NO_PAGER", "1"),
        ("NO_COLOR", "1"),
        ("ARBOR_AUTHOR_NAME", AUTHOR_NAME),
        ("ARBOR_AUTHOR_EMAIL", AUTHOR_EMAIL),
        ("ARBOR_AUTHOR_DATE", AUTHOR_DATE),
    ]);
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

pub fn arbor_commit(dir: &Path, message: &str) -> Command {
    run_arbor_command(dir, &["commit", "-m", message])
}

pub fn stdout_of(dir: &Path, args: &[&str]) -> String {
    let output = run_arbor_command(dir, args).assert().success();
    String::from_utf8(output.get_output().stdout.clone()).expect("stdout is not UTF-8")
}

/// Digest `main` points at.
pub fn main_oid(dir: &Path) -> String {
    std::fs::read_to_string(dir.join(".arbor/refs/heads/main"))
        .expect("main has no commits")
        .trim()
        .to_string()
}

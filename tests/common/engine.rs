use crate::common::file::{FileSpec, write_file};
use arbor::areas::repository::Repository;
use arbor::artifacts::branch::branch_name::BranchName;
use arbor::artifacts::core::clock::FixedClock;
use arbor::artifacts::objects::object_id::ObjectId;
use assert_fs::TempDir;
use rstest::fixture;
use std::path::Path;

pub const AUTHOR: &str = "Ada Lovelace <ada@example.com>";

pub fn clock() -> FixedClock {
    FixedClock::from_timestamp(1_672_574_400).expect("valid timestamp")
}

pub struct TestRepository {
    // keeps the directory alive for the repository's lifetime
    pub dir: TempDir,
    pub repository: Repository,
}

#[fixture]
pub fn test_repository() -> TestRepository {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let repository =
        Repository::init(dir.path(), Box::new(std::io::sink())).expect("Failed to init repository");

    TestRepository { dir, repository }
}

/// Write `files` (path, content) into the working directory.
pub fn write_files(repository: &Repository, files: &[(&str, &str)]) {
    for (path, content) in files {
        write_file(FileSpec::new(
            repository.path().join(path),
            content.to_string(),
        ));
    }
}

/// Write and stage `files`, then commit the index.
pub fn commit_files(repository: &Repository, files: &[(&str, &str)], message: &str) -> ObjectId {
    write_files(repository, files);
    for (path, _) in files {
        repository
            .stage_path(Path::new(path))
            .expect("Failed to stage file");
    }

    repository
        .commit_index(AUTHOR, message, &clock())
        .expect("Failed to commit")
}

pub fn create_branch(repository: &Repository, name: &str) -> ObjectId {
    repository
        .refs()
        .create_branch(&branch(name), None)
        .expect("Failed to create branch")
}

/// Check out `name` and make HEAD follow it.
pub fn switch_branch(repository: &Repository, name: &str) {
    let branch = branch(name);
    let oid = repository
        .refs()
        .read_branch(&branch)
        .expect("Failed to read branch")
        .expect("branch has no commits");

    repository.checkout(&oid).expect("Failed to check out");
    repository
        .refs()
        .set_head_symbolic(&branch)
        .expect("Failed to move HEAD");
}

pub fn branch(name: &str) -> BranchName {
    BranchName::try_parse(name).expect("valid branch name")
}

pub fn read_working_file(repository: &Repository, path: &str) -> String {
    crate::common::file::read_file(&repository.path().join(path))
}

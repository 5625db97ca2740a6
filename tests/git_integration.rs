//! Integration tests for git operations

use semtagger::git::{GitTracker, TagRepository};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a temporary git repository with one commit
fn create_test_repo() -> TempDir {
    let temp_dir = TempDir::new().unwrap();

    let repo = git2::Repository::init(temp_dir.path()).unwrap();

    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();

    commit_file(temp_dir.path(), "README.md", "# Test Repo", "Initial commit");

    temp_dir
}

/// Writes `name`, stages it and commits on HEAD
fn commit_file(path: &Path, name: &str, contents: &str, message: &str) -> git2::Oid {
    let repo = git2::Repository::open(path).unwrap();
    fs::write(path.join(name), contents).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();

    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = repo.signature().unwrap();

    let parent = repo.head().ok().map(|head| head.peel_to_commit().unwrap());
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

/// Creates a bare repository and registers it as `origin` of `repo_path`
fn add_bare_remote(repo_path: &Path) -> TempDir {
    let remote_dir = TempDir::new().unwrap();
    git2::Repository::init_bare(remote_dir.path()).unwrap();

    let repo = git2::Repository::open(repo_path).unwrap();
    repo.remote("origin", remote_dir.path().to_str().unwrap())
        .unwrap();

    remote_dir
}

#[test]
fn test_git_tracker_open() {
    let temp_dir = create_test_repo();

    let tracker = GitTracker::open(temp_dir.path());
    assert!(tracker.is_ok());
}

#[test]
fn test_git_tracker_open_from_subdirectory() {
    let temp_dir = create_test_repo();
    let nested = temp_dir.path().join("nested/dir");
    fs::create_dir_all(&nested).unwrap();

    assert!(GitTracker::open(&nested).is_ok());
}

#[test]
fn test_git_tracker_open_non_repo_fails() {
    let temp_dir = TempDir::new().unwrap();

    let tracker = GitTracker::open(temp_dir.path());
    assert!(tracker.is_err());
}

#[test]
fn test_git_tracker_current_branch() {
    let temp_dir = create_test_repo();
    let tracker = GitTracker::open(temp_dir.path()).unwrap();

    let branch = tracker.current_branch().unwrap().unwrap();
    // Default branch is usually "master" or "main"
    assert!(branch == "master" || branch == "main");
}

#[test]
fn test_git_tracker_current_branch_detached() {
    let temp_dir = create_test_repo();
    let tracker = GitTracker::open(temp_dir.path()).unwrap();

    let head = tracker.repository.head().unwrap().target().unwrap();
    tracker.repository.set_head_detached(head).unwrap();

    assert_eq!(tracker.current_branch().unwrap(), None);
}

#[test]
fn test_git_tracker_current_branch_unborn() {
    let temp_dir = TempDir::new().unwrap();
    git2::Repository::init(temp_dir.path()).unwrap();
    let tracker = GitTracker::open(temp_dir.path()).unwrap();

    assert_eq!(tracker.current_branch().unwrap(), None);
}

#[test]
fn test_git_tracker_is_clean() {
    let temp_dir = create_test_repo();
    let tracker = GitTracker::open(temp_dir.path()).unwrap();
    assert!(tracker.is_clean().unwrap());

    // Untracked files do not count
    fs::write(temp_dir.path().join("scratch.txt"), "notes").unwrap();
    assert!(tracker.is_clean().unwrap());

    fs::write(temp_dir.path().join("README.md"), "# Changed").unwrap();
    assert!(!tracker.is_clean().unwrap());
}

#[test]
fn test_git_tracker_get_tags_empty() {
    let temp_dir = create_test_repo();
    let tracker = GitTracker::open(temp_dir.path()).unwrap();

    let tags = tracker.list_tags().unwrap();
    assert!(tags.is_empty());
}

#[test]
fn test_git_tracker_create_tag() {
    let temp_dir = create_test_repo();
    let tracker = GitTracker::open(temp_dir.path()).unwrap();

    tracker.create_tag("v1.0.0").unwrap();

    let tags = tracker.list_tags().unwrap();
    assert_eq!(tags, vec!["v1.0.0".to_string()]);

    let tag_ref = tracker.repository.find_reference("refs/tags/v1.0.0").unwrap();
    let tag = tag_ref.peel_to_tag().unwrap();
    assert_eq!(tag.message(), Some("Release v1.0.0"));

    let head = tracker.repository.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(tag.target_id(), head.id());
}

#[test]
fn test_git_tracker_get_tags_multiple() {
    let temp_dir = create_test_repo();
    let tracker = GitTracker::open(temp_dir.path()).unwrap();

    for version in ["1.0.0", "1.1.0", "2.0.0"] {
        let name = format!("{}.txt", version);
        commit_file(temp_dir.path(), &name, version, &format!("release {}", version));
        tracker.create_tag(&format!("v{}", version)).unwrap();
    }

    let tags = tracker.list_tags().unwrap();
    assert_eq!(tags.len(), 3);
    assert!(tags.contains(&"v1.0.0".to_string()));
    assert!(tags.contains(&"v1.1.0".to_string()));
    assert!(tags.contains(&"v2.0.0".to_string()));
}

#[test]
fn test_duplicate_tag_fails() {
    let temp_dir = create_test_repo();
    let tracker = GitTracker::open(temp_dir.path()).unwrap();

    tracker.create_tag("v1.0.0").unwrap();
    commit_file(temp_dir.path(), "v2.txt", "2", "second");

    let result = tracker.create_tag("v1.0.0");
    assert!(result.is_err());
}

#[test]
fn test_create_tag_without_commits_fails() {
    let temp_dir = TempDir::new().unwrap();
    let repo = git2::Repository::init(temp_dir.path()).unwrap();
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();

    let tracker = GitTracker::open(temp_dir.path()).unwrap();
    assert!(tracker.create_tag("v0.0.1").is_err());
}

#[test]
fn test_push_tag_to_bare_remote() {
    let temp_dir = create_test_repo();
    let remote_dir = add_bare_remote(temp_dir.path());
    let tracker = GitTracker::open(temp_dir.path()).unwrap();

    tracker.create_tag("v0.1.0").unwrap();
    tracker.push_tag("origin", "v0.1.0").unwrap();

    let remote = git2::Repository::open_bare(remote_dir.path()).unwrap();
    assert!(remote.find_reference("refs/tags/v0.1.0").is_ok());
}

#[test]
fn test_push_tag_unknown_remote_fails() {
    let temp_dir = create_test_repo();
    let tracker = GitTracker::open(temp_dir.path()).unwrap();

    tracker.create_tag("v0.1.0").unwrap();
    let err = tracker.push_tag("nowhere", "v0.1.0").unwrap_err();
    assert!(err.to_string().contains("nowhere"));
}

#[test]
fn test_pull_fast_forwards_and_fetches_tags() {
    let upstream_dir = create_test_repo();
    let remote_dir = add_bare_remote(upstream_dir.path());
    let upstream = GitTracker::open(upstream_dir.path()).unwrap();
    let branch = upstream.current_branch().unwrap().unwrap();

    let push_branch = |tracker: &GitTracker| {
        let refspec = format!("refs/heads/{}:refs/heads/{}", branch, branch);
        tracker.repository.find_remote("origin").unwrap().push(&[&refspec], None).unwrap();
    };
    push_branch(&upstream);

    let clone_dir = TempDir::new().unwrap();
    git2::Repository::clone(remote_dir.path().to_str().unwrap(), clone_dir.path()).unwrap();
    let clone = GitTracker::open(clone_dir.path()).unwrap();

    let new_head = commit_file(upstream_dir.path(), "CHANGELOG.md", "v1.0.0", "release");
    upstream.create_tag("v1.0.0").unwrap();
    push_branch(&upstream);
    upstream.push_tag("origin", "v1.0.0").unwrap();

    assert!(clone.list_tags().unwrap().is_empty());
    clone.pull("origin").unwrap();

    let head = clone.repository.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(head.id(), new_head);
    assert_eq!(clone.list_tags().unwrap(), vec!["v1.0.0".to_string()]);
    assert!(clone_dir.path().join("CHANGELOG.md").exists());

    // Nothing new upstream
    clone.pull("origin").unwrap();
}

#[test]
fn test_pull_without_remote_fails() {
    let temp_dir = create_test_repo();
    let tracker = GitTracker::open(temp_dir.path()).unwrap();

    assert!(tracker.pull("origin").is_err());
}

#[test]
fn test_pull_refuses_to_overwrite_local_edits() {
    let upstream_dir = create_test_repo();
    let remote_dir = add_bare_remote(upstream_dir.path());
    let upstream = GitTracker::open(upstream_dir.path()).unwrap();
    let branch = upstream.current_branch().unwrap().unwrap();
    let refspec = format!("refs/heads/{}:refs/heads/{}", branch, branch);
    upstream.repository.find_remote("origin").unwrap().push(&[&refspec], None).unwrap();

    let clone_dir = TempDir::new().unwrap();
    git2::Repository::clone(remote_dir.path().to_str().unwrap(), clone_dir.path()).unwrap();
    let clone = GitTracker::open(clone_dir.path()).unwrap();
    let old_head = clone.repository.head().unwrap().target().unwrap();

    commit_file(upstream_dir.path(), "README.md", "# Rewritten upstream", "rewrite readme");
    upstream.repository.find_remote("origin").unwrap().push(&[&refspec], None).unwrap();

    fs::write(clone_dir.path().join("README.md"), "# Edited locally").unwrap();
    assert!(clone.pull("origin").is_err());

    let readme = fs::read_to_string(clone_dir.path().join("README.md")).unwrap();
    assert_eq!(readme, "# Edited locally");
    assert_eq!(clone.repository.head().unwrap().target().unwrap(), old_head);
}

//! Shared test fixtures: a temp repository with a seeded primary history.

use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use git2::{Repository, Signature};
use tempfile::TempDir;

use opslog::config::Config;

/// Init a repository with one commit so HEAD resolves.
pub fn init_repo() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit_file(&repo, "README.md", "seed\n", "initial commit");
    dir
}

/// Add or update a file in the working tree and commit it to HEAD.
pub fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) -> git2::Oid {
    let workdir = repo.workdir().unwrap();
    std::fs::write(workdir.join(name), content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let sig = Signature::now("tester", "tester@localhost").unwrap();
    let parent = repo
        .head()
        .ok()
        .and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

/// Config whose vault key lives in a file under the temp dir.
pub fn config_with_vault(dir: &TempDir) -> Config {
    let key_path = dir.path().join("vault.key");
    std::fs::write(&key_path, URL_SAFE_NO_PAD.encode([42u8; 32])).unwrap();
    let mut config = Config::default();
    config.vault.key_path = Some(key_path);
    config
}

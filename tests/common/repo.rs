//! Throwaway git repository builder

use std::path::PathBuf;

use git2::{Oid, Repository};
use tempfile::TempDir;

/// A temporary code repository with tagged commits
pub struct TestRepo {
    pub dir: TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Initialize an empty repository in a temp directory
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let repo = Repository::init(dir.path()).expect("init repo");
        Self { dir, repo }
    }

    /// Commit `contents` into `site.pp` with `message`, returning the id
    pub fn commit(&self, contents: &str, message: &str) -> Oid {
        let workdir = self.repo.workdir().unwrap().to_path_buf();
        std::fs::write(workdir.join("site.pp"), contents).unwrap();

        let mut index = self.repo.index().unwrap();
        index.add_path(&PathBuf::from("site.pp")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();

        let sig = git2::Signature::now("Test Operator", "ops@example.com").unwrap();
        let parents: Vec<git2::Commit> = self
            .repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok())
            .into_iter()
            .collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
    }

    /// Tag a commit with a lightweight tag
    pub fn tag(&self, name: &str, oid: Oid) {
        let object = self.repo.find_object(oid, None).unwrap();
        self.repo.tag_lightweight(name, &object, false).unwrap();
    }
}

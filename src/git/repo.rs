use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use git2::{BranchType, Error, Repository, ResetType, Sort, build::RepoBuilder};

use crate::git::remote::fetch_options;

/// Distinct paths touched by a range of commits. Ordering carries no meaning.
pub type ChangeSet = BTreeSet<String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub short_id: String,
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collected {
    pub changes: ChangeSet,
    /// Most recent first.
    pub commits: Vec<CommitSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    Cloned,
    Updated,
}

/// Local clone reused across invocations, whatever repository the
/// current configuration points at. Two syncs on the same slot at once
/// are not guarded against.
#[derive(Debug, Clone)]
pub struct WorkingCopy {
    path: PathBuf,
}

impl WorkingCopy {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Brings the slot to the exact remote tip of `branch`.
    ///
    /// An existing slot is hard-reset: anything modified locally is lost.
    pub fn sync(&self, url: &str, branch: &str) -> Result<SyncKind, Error> {
        if !self.exists() {
            self.clone_branch(url, branch)?;
            return Ok(SyncKind::Cloned);
        }
        self.update(url, branch)?;
        Ok(SyncKind::Updated)
    }

    fn clone_branch(&self, url: &str, branch: &str) -> Result<(), Error> {
        let mut builder = RepoBuilder::new();
        builder.branch(branch).fetch_options(fetch_options());
        if let Err(e) = builder.clone(url, &self.path) {
            // a half-written slot would be opened as a repository next time
            let _ = std::fs::remove_dir_all(&self.path);
            return Err(e);
        }
        Ok(())
    }

    fn update(&self, url: &str, branch: &str) -> Result<(), Error> {
        let repo = Repository::open(&self.path)?;

        // the slot is shared, origin may still point at another configuration's repo
        let current_url = repo.find_remote("origin")?.url().map(str::to_owned);
        if current_url.as_deref() != Some(url) {
            repo.remote_set_url("origin", url)?;
        }

        let refspec = format!("+refs/heads/{branch}:refs/remotes/origin/{branch}");
        repo.find_remote("origin")?
            .fetch(&[refspec.as_str()], Some(&mut fetch_options()), None)?;

        let target = repo
            .find_reference(&format!("refs/remotes/origin/{branch}"))?
            .peel_to_commit()?;

        if repo.find_branch(branch, BranchType::Local).is_err() {
            repo.branch(branch, &target, true)?;
        }
        repo.set_head(&format!("refs/heads/{branch}"))?;
        repo.reset(target.as_object(), ResetType::Hard, None)?;
        Ok(())
    }

    /// Union of the paths touched by at most `max_commits` commits reachable
    /// from the local `branch`, walking newest first.
    ///
    /// Each commit is diffed against its first parent (the empty tree for a
    /// root commit) without rename detection, so a rename yields both paths.
    pub fn changed_files(&self, branch: &str, max_commits: usize) -> Result<Collected, Error> {
        let repo = Repository::open(&self.path)?;
        let tip = repo
            .find_reference(&format!("refs/heads/{branch}"))?
            .peel_to_commit()?;

        let mut walk = repo.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        walk.push(tip.id())?;

        let mut collected = Collected::default();
        for oid in walk.take(max_commits) {
            let commit = repo.find_commit(oid?)?;
            let tree = commit.tree()?;
            let parent_tree = match commit.parent_count() {
                0 => None,
                _ => Some(commit.parent(0)?.tree()?),
            };

            let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
            for delta in diff.deltas() {
                for file in [delta.old_file(), delta.new_file()] {
                    if let Some(bytes) = file.path_bytes() {
                        collected
                            .changes
                            .insert(String::from_utf8_lossy(bytes).into_owned());
                    }
                }
            }

            let id = commit.id().to_string();
            collected.commits.push(CommitSummary {
                short_id: id.chars().take(8).collect(),
                summary: commit.summary().unwrap_or_default().to_string(),
            });
        }

        Ok(collected)
    }
}

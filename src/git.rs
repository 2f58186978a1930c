//! Git history read through libgit2
//!
//! Outside a repository every query comes back empty instead of failing.
//! Paths given to `file_history` are relative to the indexed root, which may
//! sit below the repository's working directory.

use crate::Result;
use crate::model::CommitRecord;
use chrono::{DateTime, FixedOffset};
use git2::{Commit, ErrorCode, Oid, Repository, Revwalk, Sort, Time, Tree};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub struct GitHistory {
    repo: Option<Mutex<Repository>>,
    /// Indexed root relative to the repository's working directory
    prefix: PathBuf,
}

impl GitHistory {
    pub fn new(repo_path: impl AsRef<Path>) -> Self {
        let repo_path = repo_path.as_ref();
        match Repository::discover(repo_path) {
            Ok(repo) => {
                let prefix = root_prefix(&repo, repo_path);
                Self { repo: Some(Mutex::new(repo)), prefix }
            }
            Err(e) => {
                tracing::debug!("{} is not a git repository: {}", repo_path.display(), e.message());
                Self { repo: None, prefix: PathBuf::new() }
            }
        }
    }

    pub fn is_repository(&self) -> bool {
        self.repo.is_some()
    }

    /// Most recent commits across the repository, with the files each touched
    pub fn recent_commits(&self, limit: usize) -> Result<Vec<CommitRecord>> {
        let Some(repo) = self.repo() else {
            return Ok(Vec::new());
        };
        let Some(walk) = head_history(&repo)? else {
            return Ok(Vec::new());
        };

        let mut commits = Vec::new();
        for oid in walk.take(limit) {
            let commit = repo.find_commit(oid?)?;
            let files_changed = changed_files(&repo, &commit)?;
            commits.push(commit_record(&commit, files_changed));
        }
        Ok(commits)
    }

    /// Most recent commits touching `file_path`. `files_changed` is left empty.
    pub fn file_history(&self, file_path: &str, limit: usize) -> Result<Vec<CommitRecord>> {
        let Some(repo) = self.repo() else {
            return Ok(Vec::new());
        };
        let Some(walk) = head_history(&repo)? else {
            return Ok(Vec::new());
        };

        let path = self.prefix.join(file_path.trim_start_matches("./"));
        let mut commits = Vec::new();
        for oid in walk {
            if commits.len() >= limit {
                break;
            }
            let commit = repo.find_commit(oid?)?;
            if touches(&commit, &path)? {
                commits.push(commit_record(&commit, Vec::new()));
            }
        }
        Ok(commits)
    }

    /// Plain-text summary of the last ten commits touching `file_path`
    pub fn explain_changes(&self, file_path: &str) -> Result<String> {
        if !self.is_repository() {
            return Ok("Not a git repository.".to_string());
        }

        let history = self.file_history(file_path, 10)?;
        if history.is_empty() {
            return Ok(format!("No git history found for {}.", file_path));
        }

        let mut summary = format!("Recent changes to {}:\n\n", file_path);
        for commit in &history {
            let day = commit.date.get(..10).unwrap_or(&commit.date);
            summary.push_str(&format!("- {}: {}\n", day, commit.message));
        }
        Ok(summary)
    }

    fn repo(&self) -> Option<MutexGuard<'_, Repository>> {
        self.repo
            .as_ref()
            .map(|repo| repo.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }
}

/// Commits reachable from HEAD, newest first; `None` before the first commit
fn head_history(repo: &Repository) -> Result<Option<Revwalk<'_>>> {
    let mut walk = repo.revwalk()?;
    walk.set_sorting(Sort::TIME)?;
    match walk.push_head() {
        Ok(()) => Ok(Some(walk)),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Paths changed relative to the first parent (everything, for a root commit)
fn changed_files(repo: &Repository, commit: &Commit) -> Result<Vec<String>> {
    let tree = commit.tree()?;
    let parent_tree = if commit.parent_count() > 0 {
        Some(commit.parent(0)?.tree()?)
    } else {
        None
    };

    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
    Ok(diff
        .deltas()
        .filter_map(|delta| delta.new_file().path().or_else(|| delta.old_file().path()))
        .filter_map(Path::to_str)
        .map(String::from)
        .collect())
}

/// A commit touches `path` when its entry there differs from every parent's
fn touches(commit: &Commit, path: &Path) -> Result<bool> {
    let current = entry_id(&commit.tree()?, path);
    if commit.parent_count() == 0 {
        return Ok(current.is_some());
    }
    for parent in commit.parents() {
        if entry_id(&parent.tree()?, path) == current {
            return Ok(false);
        }
    }
    Ok(true)
}

fn entry_id(tree: &Tree, path: &Path) -> Option<Oid> {
    tree.get_path(path).ok().map(|entry| entry.id())
}

fn commit_record(commit: &Commit, files_changed: Vec<String>) -> CommitRecord {
    let author = commit.author();
    CommitRecord {
        hash: commit.id().to_string(),
        message: commit.message().unwrap_or("").trim().to_string(),
        author: author.name().unwrap_or("").to_string(),
        date: format_time(author.when()),
        files_changed,
    }
}

/// RFC 3339 in the author's own offset, like `git log --format=%aI`
fn format_time(time: Time) -> String {
    FixedOffset::east_opt(time.offset_minutes() * 60)
        .zip(DateTime::from_timestamp(time.seconds(), 0))
        .map(|(offset, utc)| utc.with_timezone(&offset).to_rfc3339())
        .unwrap_or_default()
}

fn root_prefix(repo: &Repository, root: &Path) -> PathBuf {
    let (Some(workdir), Ok(root)) = (repo.workdir(), root.canonicalize()) else {
        return PathBuf::new();
    };
    let workdir = workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf());
    root.strip_prefix(&workdir).map(Path::to_path_buf).unwrap_or_default()
}

//! First-parent commit history extraction.
//!
//! Walks from HEAD back to the root commit along first parents and records,
//! for every child/parent pair, which files the child added, deleted and
//! modified. The working tree is never touched.

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use git2::{Commit, Delta, Repository};
use serde::Serialize;

use crate::paths::IgnoreList;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitInfo {
    pub hash: String,
    pub author: String,
    pub message: String,
    pub committed_at: DateTime<Utc>,
}

/// Files changed by `child` relative to its first parent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transition {
    pub child: String,
    pub parent: String,
    pub added: Vec<String>,
    pub deleted: Vec<String>,
    pub modified: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitHistory {
    pub head: String,
    /// Newest first
    pub commits: Vec<CommitInfo>,
    pub transitions: Vec<Transition>,
}

pub fn collect_history(path: &Path, ignore: &IgnoreList) -> Result<CommitHistory, git2::Error> {
    let repo = Repository::open(path)?;
    let mut current = repo.head()?.peel_to_commit()?;
    let head = current.id().to_string();

    let mut commits = vec![commit_info(&current)];
    let mut transitions = Vec::new();

    while current.parent_count() > 0 {
        let parent = current.parent(0)?;
        tracing::debug!("Computing diff between {} and {}", current.id(), parent.id());

        transitions.push(transition(&repo, &current, &parent, ignore)?);
        commits.push(commit_info(&parent));
        current = parent;
    }

    tracing::info!("Collected {} commits from {}", commits.len(), path.display());

    Ok(CommitHistory {
        head,
        commits,
        transitions,
    })
}

fn commit_info(commit: &Commit<'_>) -> CommitInfo {
    let seconds = commit.time().seconds();
    CommitInfo {
        hash: commit.id().to_string(),
        author: commit.author().name().unwrap_or_default().to_string(),
        message: commit.message().unwrap_or_default().to_string(),
        committed_at: Utc
            .timestamp_opt(seconds, 0)
            .single()
            .unwrap_or_default(),
    }
}

fn transition(
    repo: &Repository,
    child: &Commit<'_>,
    parent: &Commit<'_>,
    ignore: &IgnoreList,
) -> Result<Transition, git2::Error> {
    let diff = repo.diff_tree_to_tree(Some(&parent.tree()?), Some(&child.tree()?), None)?;

    let mut transition = Transition {
        child: child.id().to_string(),
        parent: parent.id().to_string(),
        ..Default::default()
    };

    for delta in diff.deltas() {
        let file = match delta.status() {
            Delta::Deleted => delta.old_file(),
            _ => delta.new_file(),
        };
        let Some(path) = file.path() else {
            continue;
        };
        if ignore.is_ignored(path) {
            continue;
        }
        let path = path.to_string_lossy().replace('\\', "/");

        match delta.status() {
            Delta::Added => transition.added.push(path),
            Delta::Deleted => transition.deleted.push(path),
            Delta::Modified | Delta::Typechange => transition.modified.push(path),
            other => tracing::trace!("Skipping {:?} change to {}", other, path),
        }
    }

    Ok(transition)
}

//! Change publishing: canonical serialization, change detection, and the
//! commit → push → pull-request flow.
//!
//! The publisher only talks to the outside world when something actually
//! changed: identical input produces a byte-identical databag, a clean
//! worktree short-circuits to [`PublishOutcome::Unchanged`], and no
//! commit/push/PR collaborator is invoked.

mod git;
mod pr;

use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use rostersync_shared::{Result, RosterDocument, RosterSyncError};

pub use git::{Git, SystemGit};
pub use pr::{PullRequest, PullRequestClient, PullRequestOptions};

// ---------------------------------------------------------------------------
// Canonical serialization & databag writing
// ---------------------------------------------------------------------------

/// Serialize the document to canonical JSON: declared field order, four-space
/// indentation, byte-for-byte reproducible across runs with identical input.
pub fn to_canonical_json(document: &RosterDocument) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    document
        .serialize(&mut ser)
        .map_err(|e| RosterSyncError::validation(format!("databag serialization: {e}")))?;
    String::from_utf8(buf)
        .map_err(|e| RosterSyncError::validation(format!("databag serialization: {e}")))
}

/// Write the databag under `repo`, but only when its content digest differs
/// from what is already on disk. Returns whether a write happened.
pub fn write_databag(repo: &Path, rel_path: &str, document: &RosterDocument) -> Result<bool> {
    let rendered = to_canonical_json(document)?;
    let path = repo.join(rel_path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| RosterSyncError::io(parent, e))?;
    }

    let new_digest = content_digest(rendered.as_bytes());
    match std::fs::read(&path) {
        Ok(previous) if content_digest(&previous) == new_digest => {
            debug!(digest = %new_digest, "databag unchanged");
            return Ok(false);
        }
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            return Err(RosterSyncError::io(&path, e));
        }
        _ => {}
    }

    std::fs::write(&path, rendered).map_err(|e| RosterSyncError::io(&path, e))?;
    info!(path = %path.display(), digest = %new_digest, "databag written");
    Ok(true)
}

fn content_digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

// ---------------------------------------------------------------------------
// Publish flow
// ---------------------------------------------------------------------------

/// Inputs for one publish attempt.
#[derive(Debug)]
pub struct PublishRequest<'a> {
    /// Local clone of the site repository.
    pub repo_path: &'a Path,
    /// Branch the sync commits to and opens the PR from.
    pub branch: &'a str,
    /// Branch the PR targets.
    pub base_branch: &'a str,
    /// Repository-relative paths to stage (databag + image directory).
    pub stage_paths: &'a [String],
    pub commit_message: &'a str,
    pub pr_title: &'a str,
    pub pr_body: &'a str,
    /// Reviewers requested on a created PR. Best-effort.
    pub reviewers: &'a [String],
}

/// What happened to the pull request after a successful push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrStatus {
    /// A new pull request was opened.
    Created { number: u64 },
    /// An open pull request already targeted the branch; nothing created.
    AlreadyOpen { number: u64 },
    /// The PR API failed; the pushed branch stands without one.
    Failed,
}

/// Terminal state of a publish attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Nothing differed from the committed state; no collaborator invoked.
    Unchanged,
    /// Changes were committed and pushed.
    Pushed { pull_request: PrStatus },
}

impl PublishOutcome {
    /// Whether this run pushed anything.
    pub fn pushed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Run the publish flow against an already-written worktree.
///
/// A push rejected by the lease check gets exactly one pull-rebase retry;
/// failing again is fatal for the run. PR-side failures degrade to
/// [`PrStatus::Failed`] instead of failing the run.
#[instrument(skip_all, fields(branch = %request.branch))]
pub async fn publish(
    git: &impl Git,
    pr_client: &PullRequestClient,
    request: &PublishRequest<'_>,
) -> Result<PublishOutcome> {
    if !git.is_dirty(request.repo_path)? {
        info!("no changes against committed state, nothing to publish");
        return Ok(PublishOutcome::Unchanged);
    }

    git.stage(request.repo_path, request.stage_paths)?;
    git.commit(request.repo_path, request.commit_message)?;
    git.fetch(request.repo_path)?;

    if let Err(err) = git.push_with_lease(request.repo_path, request.branch) {
        match err {
            RosterSyncError::PublishConflict { .. } => {
                warn!("push rejected, remote moved; attempting one pull-rebase");
                git.pull_rebase(request.repo_path, request.branch)?;
                git.push_with_lease(request.repo_path, request.branch)?;
            }
            other => return Err(other),
        }
    }

    info!(branch = %request.branch, "changes pushed");

    let pull_request = match pr_client
        .list_open(request.branch, request.base_branch)
        .await
    {
        Ok(open) => match open.first() {
            Some(existing) => {
                info!(number = existing.number, "open pull request already targets branch");
                PrStatus::AlreadyOpen {
                    number: existing.number,
                }
            }
            None => {
                match pr_client
                    .create(
                        request.pr_title,
                        request.branch,
                        request.base_branch,
                        request.pr_body,
                    )
                    .await
                {
                    Ok(created) => {
                        if !request.reviewers.is_empty() {
                            if let Err(e) =
                                pr_client.add_reviewers(created.number, request.reviewers).await
                            {
                                warn!(error = %e, "reviewer assignment failed");
                            }
                        }
                        PrStatus::Created {
                            number: created.number,
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "pull request creation failed, branch pushed without PR");
                        PrStatus::Failed
                    }
                }
            }
        },
        Err(e) => {
            warn!(error = %e, "could not list open pull requests");
            PrStatus::Failed
        }
    };

    Ok(PublishOutcome::Pushed { pull_request })
}

//! Version-control port and the system `git` adapter.

use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use rostersync_shared::{Result, RosterSyncError};

/// Committer identity used for sync commits.
const BOT_NAME: &str = "rostersync";
const BOT_EMAIL: &str = "rostersync@localhost";

/// Narrow version-control interface the pipeline needs.
///
/// [`SystemGit`] shells out to the `git` binary; tests substitute in-memory
/// fakes so publish logic runs without a repository.
pub trait Git {
    /// Clone `url` into `dest`, authenticating with `token` embedded in the
    /// clone URL. The token must never appear in errors or logs.
    fn clone_repo(&self, url: &str, token: &str, dest: &Path) -> Result<()>;

    /// Check out `branch`, creating it when it does not exist yet.
    fn checkout(&self, repo: &Path, branch: &str) -> Result<()>;

    /// Fetch remote state for the lease check.
    fn fetch(&self, repo: &Path) -> Result<()>;

    /// True when the worktree has staged, unstaged, or untracked changes.
    fn is_dirty(&self, repo: &Path) -> Result<bool>;

    /// Stage the given repository-relative paths.
    fn stage(&self, repo: &Path, paths: &[String]) -> Result<()>;

    /// Create a single commit with the given message.
    fn commit(&self, repo: &Path, message: &str) -> Result<()>;

    /// Push `branch` with force-with-lease semantics. A push rejected because
    /// the remote moved surfaces as [`RosterSyncError::PublishConflict`].
    fn push_with_lease(&self, repo: &Path, branch: &str) -> Result<()>;

    /// Best-effort rebase onto the remote branch after a rejected push.
    fn pull_rebase(&self, repo: &Path, branch: &str) -> Result<()>;
}

/// Embed a token into an HTTPS clone URL.
fn authenticated_url(url: &str, token: &str) -> String {
    url.replacen("https://", &format!("https://{token}@"), 1)
}

// ---------------------------------------------------------------------------
// SystemGit
// ---------------------------------------------------------------------------

/// Adapter that runs the `git` binary.
#[derive(Debug, Default)]
pub struct SystemGit;

impl SystemGit {
    fn run(&self, repo: Option<&Path>, args: &[&str]) -> Result<std::process::Output> {
        let mut cmd = Command::new("git");
        if let Some(repo) = repo {
            cmd.current_dir(repo);
        }
        debug!(command = %args.join(" "), "running git");
        cmd.args(args)
            .output()
            .map_err(|e| RosterSyncError::git(format!("failed to run git: {e}")))
    }

    fn run_ok(&self, repo: Option<&Path>, args: &[&str]) -> Result<()> {
        let output = self.run(repo, args)?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(RosterSyncError::git(format!(
            "git {} exited with {}: {}",
            args.first().unwrap_or(&""),
            output.status,
            stderr.trim()
        )))
    }
}

impl Git for SystemGit {
    fn clone_repo(&self, url: &str, token: &str, dest: &Path) -> Result<()> {
        let authed = authenticated_url(url, token);
        let dest_str = dest.to_string_lossy();
        let output = self.run(None, &["clone", &authed, &dest_str])?;
        if output.status.success() {
            info!(%url, dest = %dest_str, "repository cloned");
            return Ok(());
        }
        // git echoes the clone URL on failure; scrub the token before it can
        // reach a log line.
        let stderr = String::from_utf8_lossy(&output.stderr).replace(token, "***");
        Err(RosterSyncError::git(format!(
            "git clone of {url} exited with {}: {}",
            output.status,
            stderr.trim()
        )))
    }

    fn checkout(&self, repo: &Path, branch: &str) -> Result<()> {
        if self.run_ok(Some(repo), &["checkout", branch]).is_ok() {
            return Ok(());
        }
        self.run_ok(Some(repo), &["checkout", "-b", branch])
    }

    fn fetch(&self, repo: &Path) -> Result<()> {
        self.run_ok(Some(repo), &["fetch", "origin"])
    }

    fn is_dirty(&self, repo: &Path) -> Result<bool> {
        let output = self.run(Some(repo), &["status", "--porcelain"])?;
        if !output.status.success() {
            return Err(RosterSyncError::git(format!(
                "git status exited with {}",
                output.status
            )));
        }
        Ok(!output.stdout.is_empty())
    }

    fn stage(&self, repo: &Path, paths: &[String]) -> Result<()> {
        let mut args = vec!["add", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.run_ok(Some(repo), &args)
    }

    fn commit(&self, repo: &Path, message: &str) -> Result<()> {
        self.run_ok(
            Some(repo),
            &[
                "-c",
                &format!("user.name={BOT_NAME}"),
                "-c",
                &format!("user.email={BOT_EMAIL}"),
                "commit",
                "-m",
                message,
            ],
        )
    }

    fn push_with_lease(&self, repo: &Path, branch: &str) -> Result<()> {
        let output = self.run(
            Some(repo),
            &[
                "push",
                "--force-with-lease",
                "--set-upstream",
                "origin",
                branch,
            ],
        )?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("stale info") || stderr.contains("[rejected]") {
            return Err(RosterSyncError::publish_conflict(format!(
                "remote {branch} moved since last fetch"
            )));
        }
        Err(RosterSyncError::git(format!(
            "git push exited with {}: {}",
            output.status,
            stderr.trim()
        )))
    }

    fn pull_rebase(&self, repo: &Path, branch: &str) -> Result<()> {
        self.run_ok(Some(repo), &["pull", "--rebase", "origin", branch])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticated_url_embeds_token_once() {
        assert_eq!(
            authenticated_url("https://github.com/example/website.git", "tok"),
            "https://tok@github.com/example/website.git"
        );
    }

    #[test]
    fn commit_cycle_in_fresh_repository() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = dir.path();
        let git = SystemGit;

        git.run_ok(Some(repo), &["init", "--initial-branch=main"])
            .expect("init");

        assert!(!git.is_dirty(repo).expect("clean status"));

        std::fs::write(repo.join("team.json"), "{}").expect("write");
        assert!(git.is_dirty(repo).expect("dirty status"));

        git.stage(repo, &["team.json".into()]).expect("stage");
        git.commit(repo, "Update team roster data").expect("commit");
        assert!(!git.is_dirty(repo).expect("clean after commit"));

        // Branch creation fallback
        git.checkout(repo, "team-roster-update").expect("checkout -b");
        git.checkout(repo, "main").expect("checkout existing");
    }
}

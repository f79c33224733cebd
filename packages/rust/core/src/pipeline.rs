//! End-to-end sync pipeline: clone → sheet → validate → images → databag →
//! publish.
//!
//! One run, one fresh clone, one document. Per-record failures stay inside
//! the roster builder; everything that reaches this level is fatal for the
//! run except the PR step, which degrades.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument};

use rostersync_images::{FetchOptions, ImageFetcher};
use rostersync_publish::{
    Git, PublishOutcome, PublishRequest, PullRequestClient, PullRequestOptions, SystemGit,
};
use rostersync_roster::{ResolveImage, RowRejection};
use rostersync_shared::{
    AppConfig, RawRow, Result, RosterSyncError, Secrets, TeamMember,
};
use rostersync_sheets::{SheetsClient, SheetsOptions};

/// Commit message for sync commits.
const COMMIT_MESSAGE: &str = "Update team roster data";

/// Title of auto-created pull requests.
const PR_TITLE: &str = "Team roster auto-update";

// ---------------------------------------------------------------------------
// Config, mode, result
// ---------------------------------------------------------------------------

/// Which half of the pipeline to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Clone and build the databag locally; never touch remote git/PR state.
    Local,
    /// Complete pipeline including commit, push, and pull request.
    Full,
}

/// Everything one sync run needs, resolved up front. No global state.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Application configuration (roster, columns, repo).
    pub app: AppConfig,
    /// Secrets resolved from the environment.
    pub secrets: Secrets,
    /// Local working directory the site repository is cloned into.
    pub work_dir: PathBuf,
}

/// Result of one sync run.
#[derive(Debug)]
pub struct SyncResult {
    /// Members in the published document.
    pub members: usize,
    /// Committees in the published document.
    pub committees: usize,
    /// Rows filtered by the include flag.
    pub excluded: usize,
    /// Rows skipped for schema violations.
    pub rejections: Vec<RowRejection>,
    /// Members with an attached image.
    pub images_attached: usize,
    /// Whether the databag file content changed this run.
    pub databag_changed: bool,
    /// Publish outcome; `None` in local mode.
    pub publish: Option<PublishOutcome>,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &SyncResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &SyncResult) {}
}

// ---------------------------------------------------------------------------
// Image resolution adapter
// ---------------------------------------------------------------------------

/// Adapts [`ImageFetcher`] to the builder's [`ResolveImage`] seam.
struct HttpImages<'a> {
    fetcher: &'a ImageFetcher,
    dir: &'a Path,
}

impl ResolveImage for HttpImages<'_> {
    async fn resolve(&mut self, member: &TeamMember) -> Result<Option<String>> {
        self.fetcher.resolve(member, self.dir).await
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the sync pipeline.
///
/// 1. Fresh clone of the site repository, sync branch checked out
/// 2. Read the worksheet (fatal on failure)
/// 3. Validate rows, resolve images, assemble the document
/// 4. Write the databag when its content changed
/// 5. Full mode only: commit, push, pull request
#[instrument(skip_all, fields(mode = ?mode))]
pub async fn run(
    mode: RunMode,
    config: &SyncConfig,
    progress: &dyn ProgressReporter,
) -> Result<SyncResult> {
    let start = Instant::now();
    let git = SystemGit;

    // --- Phase 1: repository ---
    progress.phase("Preparing repository");
    prepare_repo(&git, config)?;

    // --- Phase 2: spreadsheet ---
    progress.phase("Reading spreadsheet");
    let rows = read_rows(config).await?;
    info!(rows = rows.len(), "spreadsheet read");

    // --- Phase 3: roster ---
    progress.phase("Building roster");
    let image_dir = config.work_dir.join(&config.app.roster.image_dir);
    std::fs::create_dir_all(&image_dir).map_err(|e| RosterSyncError::io(&image_dir, e))?;

    let fetcher = ImageFetcher::new(&FetchOptions::default())?;
    let mut resolver = HttpImages {
        fetcher: &fetcher,
        dir: &image_dir,
    };
    let built = rostersync_roster::build(&rows, &config.app.roster, &mut resolver).await;

    // --- Phase 4: databag ---
    progress.phase("Writing databag");
    let databag_changed = rostersync_publish::write_databag(
        &config.work_dir,
        &config.app.roster.databag_path,
        &built.document,
    )?;

    // --- Phase 5: publish ---
    let publish = match mode {
        RunMode::Local => {
            info!("local mode, skipping commit/push/PR");
            None
        }
        RunMode::Full => {
            progress.phase("Publishing changes");
            Some(publish_changes(&git, config).await?)
        }
    };

    let result = SyncResult {
        members: built.accepted,
        committees: built.document.types.len(),
        excluded: built.excluded,
        rejections: built.rejections,
        images_attached: built.images_attached,
        databag_changed,
        publish,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        members = result.members,
        committees = result.committees,
        excluded = result.excluded,
        rejected = result.rejections.len(),
        images = result.images_attached,
        changed = result.databag_changed,
        elapsed_ms = result.elapsed.as_millis(),
        "sync complete"
    );

    Ok(result)
}

/// Remove any stale working directory and clone fresh.
///
/// Each run owns its clone exclusively; starting from scratch keeps the
/// change detection honest.
fn prepare_repo(git: &impl Git, config: &SyncConfig) -> Result<()> {
    let repo = &config.app.repo;
    if repo.url.is_empty() {
        return Err(RosterSyncError::config(
            "repo.url is not set; run `rostersync config init` and edit the config",
        ));
    }

    if config.work_dir.exists() {
        std::fs::remove_dir_all(&config.work_dir)
            .map_err(|e| RosterSyncError::io(&config.work_dir, e))?;
    }

    git.clone_repo(&repo.url, &config.secrets.git_token, &config.work_dir)?;
    git.checkout(&config.work_dir, &repo.branch)?;
    Ok(())
}

/// Download the worksheet and map it into rows. Fatal on any failure.
async fn read_rows(config: &SyncConfig) -> Result<Vec<RawRow>> {
    let client = SheetsClient::new(&SheetsOptions::default())?;
    let sheet = client
        .fetch(
            &config.secrets.sheet_id,
            &config.secrets.worksheet,
            &config.secrets.sheets_api_key,
        )
        .await?;
    Ok(sheet.into_rows(&config.app.columns))
}

/// Commit, push, and open a PR for whatever changed in the worktree.
async fn publish_changes(git: &impl Git, config: &SyncConfig) -> Result<PublishOutcome> {
    let repo = &config.app.repo;
    let pr_client = PullRequestClient::new(
        &PullRequestOptions::default(),
        &repo.owner,
        &repo.name,
        &config.secrets.api_token,
    )?;

    let stage_paths = vec![
        config.app.roster.databag_path.clone(),
        config.app.roster.image_dir.clone(),
    ];
    let pr_body = pr_body(Utc::now());

    let request = PublishRequest {
        repo_path: &config.work_dir,
        branch: &repo.branch,
        base_branch: &repo.base_branch,
        stage_paths: &stage_paths,
        commit_message: COMMIT_MESSAGE,
        pr_title: PR_TITLE,
        pr_body: &pr_body,
        reviewers: &repo.reviewers,
    };

    rostersync_publish::publish(git, &pr_client, &request).await
}

/// PR body with the sync date, so stale PRs are easy to spot.
fn pr_body(now: chrono::DateTime<Utc>) -> String {
    format!(
        "Automated update of the team databag from the roster sheet on {}.",
        now.format("%Y-%m-%d")
    )
}

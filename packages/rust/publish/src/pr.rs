//! Pull-request API client.
//!
//! Thin typed wrapper over the GitHub REST pulls endpoints. Callers treat
//! every failure here as degraded success: a pushed branch without a PR is
//! still a pushed branch.

use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument};
use url::Url;

use rostersync_shared::{Result, RosterSyncError};

/// Default API origin.
const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default timeout in seconds for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User-Agent string for API requests (required by the API).
const USER_AGENT: &str = concat!("RosterSync/", env!("CARGO_PKG_VERSION"));

/// Media type for the REST API.
const ACCEPT: &str = "application/vnd.github+json";

// ---------------------------------------------------------------------------
// Options & client
// ---------------------------------------------------------------------------

/// Configuration for the pull-request client.
#[derive(Debug, Clone)]
pub struct PullRequestOptions {
    /// API origin. Overridable for tests against a local mock server.
    pub api_base: String,
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
}

impl Default for PullRequestOptions {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// An open or created pull request, as much of it as the pipeline needs.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub html_url: String,
}

/// Bearer-token client for one repository's pulls endpoints.
pub struct PullRequestClient {
    client: Client,
    api_base: Url,
    owner: String,
    repo: String,
    token: String,
}

impl PullRequestClient {
    /// Create a client for `owner/repo`.
    pub fn new(opts: &PullRequestOptions, owner: &str, repo: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| RosterSyncError::Network(format!("failed to build HTTP client: {e}")))?;

        let api_base = Url::parse(&opts.api_base)
            .map_err(|e| RosterSyncError::config(format!("invalid API base URL: {e}")))?;

        Ok(Self {
            client,
            api_base,
            owner: owner.to_string(),
            repo: repo.to_string(),
            token: token.to_string(),
        })
    }

    /// Open pull requests from `head_branch` into `base_branch`.
    #[instrument(skip_all, fields(head = %head_branch, base = %base_branch))]
    pub async fn list_open(&self, head_branch: &str, base_branch: &str) -> Result<Vec<PullRequest>> {
        let mut url = self.pulls_url()?;
        url.query_pairs_mut()
            .append_pair("state", "open")
            .append_pair("head", &format!("{}:{head_branch}", self.owner))
            .append_pair("base", base_branch);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .send()
            .await
            .map_err(|e| RosterSyncError::PullRequest(format!("list failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RosterSyncError::PullRequest(format!(
                "list returned HTTP {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| RosterSyncError::PullRequest(format!("invalid list response: {e}")))
    }

    /// Create a pull request from `head` into `base`.
    #[instrument(skip_all, fields(head = %head, base = %base))]
    pub async fn create(
        &self,
        title: &str,
        head: &str,
        base: &str,
        body: &str,
    ) -> Result<PullRequest> {
        let payload = serde_json::json!({
            "title": title,
            "head": head,
            "base": base,
            "body": body,
        });

        let response = self
            .client
            .post(self.pulls_url()?)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RosterSyncError::PullRequest(format!("create failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RosterSyncError::PullRequest(format!(
                "create returned HTTP {status}: {}",
                detail.trim()
            )));
        }

        let pr: PullRequest = response
            .json()
            .await
            .map_err(|e| RosterSyncError::PullRequest(format!("invalid create response: {e}")))?;

        info!(number = pr.number, url = %pr.html_url, "pull request created");
        Ok(pr)
    }

    /// Request reviews on a pull request. Callers log failures and move on.
    #[instrument(skip_all, fields(number = number))]
    pub async fn add_reviewers(&self, number: u64, reviewers: &[String]) -> Result<()> {
        let mut url = self.pulls_url()?;
        url.path_segments_mut()
            .map_err(|_| RosterSyncError::config("API base URL cannot be a base"))?
            .extend([number.to_string().as_str(), "requested_reviewers"]);

        let payload = serde_json::json!({ "reviewers": reviewers });

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RosterSyncError::PullRequest(format!("add reviewers failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RosterSyncError::PullRequest(format!(
                "add reviewers returned HTTP {status}"
            )));
        }

        Ok(())
    }

    fn pulls_url(&self) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| RosterSyncError::config("API base URL cannot be a base"))?
            .extend(["repos", &self.owner, &self.repo, "pulls"]);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(server: &wiremock::MockServer) -> PullRequestClient {
        let opts = PullRequestOptions {
            api_base: server.uri(),
            ..Default::default()
        };
        PullRequestClient::new(&opts, "example", "website", "test-token").unwrap()
    }

    #[tokio::test]
    async fn list_open_queries_head_and_base() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/repos/example/website/pulls"))
            .and(wiremock::matchers::query_param(
                "head",
                "example:team-roster-update",
            ))
            .and(wiremock::matchers::query_param("base", "main"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_raw(
                r#"[{"number": 17, "html_url": "https://example.com/pr/17"}]"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let open = client(&server)
            .list_open("team-roster-update", "main")
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].number, 17);
    }

    #[tokio::test]
    async fn create_returns_pull_request() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/repos/example/website/pulls"))
            .respond_with(wiremock::ResponseTemplate::new(201).set_body_raw(
                r#"{"number": 18, "html_url": "https://example.com/pr/18"}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let pr = client(&server)
            .create("Team roster auto-update", "team-roster-update", "main", "body")
            .await
            .unwrap();
        assert_eq!(pr.number, 18);
    }

    #[tokio::test]
    async fn create_non_2xx_is_pull_request_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(422)
                    .set_body_string(r#"{"message": "Validation Failed"}"#),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .create("title", "head", "main", "body")
            .await
            .unwrap_err();
        assert!(matches!(err, RosterSyncError::PullRequest(_)));
        assert!(err.to_string().contains("422"));
    }

    #[tokio::test]
    async fn add_reviewers_hits_requested_reviewers_endpoint() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path(
                "/repos/example/website/pulls/18/requested_reviewers",
            ))
            .and(wiremock::matchers::body_partial_json(
                serde_json::json!({"reviewers": ["alice"]}),
            ))
            .respond_with(wiremock::ResponseTemplate::new(201).set_body_raw(
                r#"{"number": 18}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        client(&server)
            .add_reviewers(18, &["alice".to_string()])
            .await
            .unwrap();
    }
}

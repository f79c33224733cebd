//! Member image resolution.
//!
//! Given a member's remote image reference, decide whether a local copy
//! already exists in the site's image directory; if not, probe the resource's
//! content type, download it, and store it under a stable, name-derived file
//! name. Every failure here is soft for the batch: callers log and publish
//! the member without an image.

use std::path::Path;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, instrument};
use url::Url;

use rostersync_shared::{Result, RosterSyncError, TeamMember};

/// User-Agent string for image requests.
const USER_AGENT: &str = concat!("RosterSync/", env!("CARGO_PKG_VERSION"));

/// Default timeout in seconds for probe and download requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Share-link host that refuses direct GETs; see [`rewrite_drive_url`].
const CONSUMER_DRIVE_HOST: &str = "drive.google.com";

// ---------------------------------------------------------------------------
// Options & fetcher
// ---------------------------------------------------------------------------

/// Configuration for the image fetcher.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Downloads member images into the site's image directory.
pub struct ImageFetcher {
    client: Client,
}

impl ImageFetcher {
    /// Create a new fetcher with the given options.
    pub fn new(opts: &FetchOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(std::time::Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| RosterSyncError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Resolve a member's image into `dir`, returning the local file name.
    ///
    /// No-op for members without an image reference. Skips the network
    /// entirely when a file matching the member's normalized key already
    /// exists, so repeated runs never re-download and a manually replaced
    /// image in the site repo wins over the sheet.
    #[instrument(skip_all, fields(name = %member.name))]
    pub async fn resolve(&self, member: &TeamMember, dir: &Path) -> Result<Option<String>> {
        let Some(url) = member.image_url.as_ref() else {
            return Ok(None);
        };

        let key = normalized_key(&member.name);
        if let Some(existing) = existing_image(dir, &key)? {
            info!(file = %existing, "image already present, remove it from the site repo to refresh");
            return Ok(Some(existing));
        }

        let file_name = self.fetch(url, dir, &key).await?;
        Ok(Some(file_name))
    }

    /// Probe and download one image, writing `<key>.<ext>` into `dir`.
    pub async fn fetch(&self, url: &Url, dir: &Path, key: &str) -> Result<String> {
        let url = rewrite_drive_url(url);
        debug!(%url, "probing image");

        // Content-type probe before the download; a blind GET would happily
        // save an HTML error page as someone's photo.
        let probe = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(|e| RosterSyncError::Network(format!("{url}: probe failed: {e}")))?;

        let status = probe.status();
        if !status.is_success() {
            return Err(RosterSyncError::Network(format!("{url}: HTTP {status}")));
        }

        let content_type = probe
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .trim()
            .to_string();

        let Some(ext) = image_extension(&content_type) else {
            return Err(RosterSyncError::InvalidImage {
                url: url.to_string(),
                content_type,
            });
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| RosterSyncError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RosterSyncError::Network(format!("{url}: HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RosterSyncError::Network(format!("{url}: body read failed: {e}")))?;

        let file_name = format!("{key}.{ext}");
        let path = dir.join(&file_name);
        std::fs::write(&path, &bytes).map_err(|e| RosterSyncError::io(&path, e))?;

        info!(file = %file_name, bytes = bytes.len(), "image downloaded");

        Ok(file_name)
    }
}

// ---------------------------------------------------------------------------
// Naming & lookup
// ---------------------------------------------------------------------------

/// Filesystem-safe, case-insensitive key for a member's display name:
/// lowercased, spaces joined with underscores.
pub fn normalized_key(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// First file in `dir` whose name contains `key`, compared case-insensitively.
pub fn existing_image(dir: &Path, key: &str) -> Result<Option<String>> {
    if !dir.exists() {
        return Ok(None);
    }

    let entries = std::fs::read_dir(dir).map_err(|e| RosterSyncError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| RosterSyncError::io(dir, e))?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if file_name.to_lowercase().contains(key) {
            return Ok(Some(file_name));
        }
    }

    Ok(None)
}

// ---------------------------------------------------------------------------
// URL & content-type handling
// ---------------------------------------------------------------------------

/// Share links on the consumer drive host don't serve file bytes on a direct
/// GET. The file id from the query string must go through the `uc` download
/// endpoint instead. Links without an id are left untouched.
fn rewrite_drive_url(url: &Url) -> Url {
    if url.host_str() != Some(CONSUMER_DRIVE_HOST) {
        return url.clone();
    }

    let Some(id) = url
        .query_pairs()
        .find(|(k, _)| k == "id")
        .map(|(_, v)| v.into_owned())
    else {
        return url.clone();
    };

    let mut rewritten = url.clone();
    rewritten.set_path("/uc");
    rewritten.set_query(None);
    rewritten
        .query_pairs_mut()
        .append_pair("export", "download")
        .append_pair("id", &id);
    rewritten
}

/// Map an image content type to the file extension used on the site.
/// Returns `None` for anything that is not an image type.
fn image_extension(content_type: &str) -> Option<String> {
    let subtype = content_type.strip_prefix("image/")?;
    let subtype = subtype.split(';').next().unwrap_or(subtype).trim();
    let ext = match subtype {
        "jpeg" => "jpg",
        "svg+xml" => "svg",
        other => other,
    };
    (!ext.is_empty()).then(|| ext.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member_with_image(name: &str, url: &str) -> TeamMember {
        let mut member = TeamMember::named(name);
        member.image_url = Some(Url::parse(url).unwrap());
        member
    }

    #[test]
    fn normalized_key_lowercases_and_joins() {
        assert_eq!(normalized_key("Jane Doe"), "jane_doe");
        assert_eq!(normalized_key("Ada B Lovelace"), "ada_b_lovelace");
    }

    #[test]
    fn image_extension_mapping() {
        assert_eq!(image_extension("image/jpeg").as_deref(), Some("jpg"));
        assert_eq!(
            image_extension("image/jpeg; charset=utf-8").as_deref(),
            Some("jpg")
        );
        assert_eq!(image_extension("image/png").as_deref(), Some("png"));
        assert_eq!(image_extension("image/svg+xml").as_deref(), Some("svg"));
        assert_eq!(image_extension("image/webp").as_deref(), Some("webp"));
        assert_eq!(image_extension("text/html"), None);
        assert_eq!(image_extension(""), None);
    }

    #[test]
    fn drive_share_links_are_rewritten() {
        let url = Url::parse("https://drive.google.com/open?id=FILE123").unwrap();
        let rewritten = rewrite_drive_url(&url);
        assert_eq!(
            rewritten.as_str(),
            "https://drive.google.com/uc?export=download&id=FILE123"
        );

        // Non-drive hosts pass through
        let url = Url::parse("https://example.com/open?id=FILE123").unwrap();
        assert_eq!(rewrite_drive_url(&url), url);

        // Drive links without an id pass through
        let url = Url::parse("https://drive.google.com/file/d/abc/view").unwrap();
        assert_eq!(rewrite_drive_url(&url), url);
    }

    #[test]
    fn existing_image_matches_substring_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Jane_Doe.PNG"), b"png").unwrap();

        let found = existing_image(dir.path(), "jane_doe").unwrap();
        assert_eq!(found.as_deref(), Some("Jane_Doe.PNG"));

        let missing = existing_image(dir.path(), "john_roe").unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn resolve_skips_network_when_image_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("jane_doe.png"), b"png").unwrap();

        // Any fetch attempt would fail: the URL points at a closed port.
        let member = member_with_image("Jane Doe", "http://127.0.0.1:9/photo.jpg");
        let fetcher = ImageFetcher::new(&FetchOptions::default()).unwrap();

        let resolved = fetcher.resolve(&member, dir.path()).await.unwrap();
        assert_eq!(resolved.as_deref(), Some("jane_doe.png"));
    }

    #[tokio::test]
    async fn resolve_without_reference_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = ImageFetcher::new(&FetchOptions::default()).unwrap();

        let resolved = fetcher
            .resolve(&TeamMember::named("Jane Doe"), dir.path())
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn fetch_downloads_and_names_by_content_type() {
        let server = wiremock::MockServer::start().await;
        let body: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

        wiremock::Mock::given(wiremock::matchers::method("HEAD"))
            .and(wiremock::matchers::path("/photo"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).insert_header("content-type", "image/jpeg"),
            )
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/photo"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_raw(body, "image/jpeg"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = ImageFetcher::new(&FetchOptions::default()).unwrap();
        let url = Url::parse(&format!("{}/photo", server.uri())).unwrap();

        let file_name = fetcher.fetch(&url, dir.path(), "jane_doe").await.unwrap();
        assert_eq!(file_name, "jane_doe.jpg");

        let written = std::fs::read(dir.path().join("jane_doe.jpg")).unwrap();
        assert_eq!(written, body);
    }

    #[tokio::test]
    async fn fetch_rejects_non_image_content_type() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("HEAD"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = ImageFetcher::new(&FetchOptions::default()).unwrap();
        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();

        let err = fetcher.fetch(&url, dir.path(), "jane_doe").await.unwrap_err();
        assert!(matches!(err, RosterSyncError::InvalidImage { .. }));
        // Nothing written on failure
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn fetch_probe_http_error_is_network_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("HEAD"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = ImageFetcher::new(&FetchOptions::default()).unwrap();
        let url = Url::parse(&format!("{}/gone", server.uri())).unwrap();

        let err = fetcher.fetch(&url, dir.path(), "jane_doe").await.unwrap_err();
        assert!(matches!(err, RosterSyncError::Network(_)));
    }
}

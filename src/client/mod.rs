//! HTTP client for the Science Data Center's query, download and upload endpoints.
//!
//! Every operation validates its input locally first; nothing reaches the
//! network unless it already parses under the naming convention.

mod response;
mod user_agent;

pub use response::is_auth_failure;
pub use user_agent::{resolve_user_agent, USER_AGENT};

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::config::Settings;
use crate::naming::{ArchiveFile, ValidationErrors};
use crate::query::{endpoint_url, QueryError, QueryFilters, QueryParams};
use crate::results::{map_listing, MappedListing};
use response::check_status;

const DOWNLOAD_ENDPOINT: &str = "download";
const UPLOAD_ENDPOINT: &str = "upload";
const API_KEY_HEADER: &str = "X-api-key";

#[derive(Debug, Error)]
pub enum AccessError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("invalid service URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP {status} from {url}: {message}")]
    Http {
        status: StatusCode,
        url: String,
        message: String,
    },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected response from {url}: {message}")]
    UnexpectedResponse { url: String, message: String },

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a download did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded(PathBuf),
    /// The local file already existed; nothing was fetched.
    AlreadyPresent(PathBuf),
}

impl DownloadOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Downloaded(p) | Self::AlreadyPresent(p) => p,
        }
    }
}

/// Client for one data access service and one local data directory.
#[derive(Clone)]
pub struct ArchiveClient {
    client: Client,
    base_url: Url,
    data_dir: PathBuf,
    api_key: Option<String>,
    show_progress: bool,
}

impl ArchiveClient {
    pub fn new(settings: &Settings) -> Result<Self, AccessError> {
        let base_url = Url::parse(&settings.data_access_url)?;
        let client = Client::builder()
            .user_agent(resolve_user_agent(Some(&settings.user_agent)))
            .timeout(settings.timeout())
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            base_url,
            data_dir: settings.data_dir.clone(),
            api_key: settings.api_key.clone(),
            show_progress: false,
        })
    }

    /// Show a progress bar on stderr while downloading.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Validate filters, then query.
    pub async fn query_filters(&self, filters: &QueryFilters) -> Result<MappedListing, AccessError> {
        let params = QueryParams::normalize(filters)?;
        self.query(&params).await
    }

    /// Run a query and map the listing. With `version=latest` only the newest
    /// version of each product is kept.
    pub async fn query(&self, params: &QueryParams) -> Result<MappedListing, AccessError> {
        let url = params.to_url(&self.base_url)?;
        tracing::info!("Querying data archive with {}", url);

        let response = check_status(self.client.get(url.clone()).send().await?).await?;
        let body: Value = response.json().await?;
        let Value::Array(entries) = body else {
            return Err(AccessError::UnexpectedResponse {
                url: url.to_string(),
                message: "expected a JSON array of files".to_string(),
            });
        };
        tracing::debug!("Received {} listing entries", entries.len());

        let listing = map_listing(&entries);
        Ok(if params.wants_latest() {
            listing.latest_only()
        } else {
            listing
        })
    }

    /// Parse a filename or path, then download it.
    pub async fn download_path(&self, input: &str) -> Result<DownloadOutcome, AccessError> {
        let file = ArchiveFile::parse(input)?;
        self.download(&file).await
    }

    /// Download a file into the local mirror, unless it is already there.
    pub async fn download(&self, file: &ArchiveFile) -> Result<DownloadOutcome, AccessError> {
        let destination = file.local_path(&self.data_dir);
        if destination.exists() {
            tracing::info!(
                "The file {} already exists, skipping download",
                destination.display()
            );
            return Ok(DownloadOutcome::AlreadyPresent(destination));
        }

        let archive_path = file.archive_path();
        let url = endpoint_url(
            &self.base_url,
            &format!("{}/{}", DOWNLOAD_ENDPOINT, archive_path),
        )?;
        tracing::info!(
            "Downloading {} from {} to {}",
            archive_path,
            url,
            destination.display()
        );

        // Redirects to storage are followed by the client.
        let response = check_status(self.client.get(url).send().await?).await?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let partial = partial_path(&destination);
        if let Err(e) = self.stream_to(response, &partial, &file.filename()).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
        tokio::fs::rename(&partial, &destination).await?;

        Ok(DownloadOutcome::Downloaded(destination))
    }

    async fn stream_to(
        &self,
        mut response: reqwest::Response,
        path: &Path,
        label: &str,
    ) -> Result<u64, AccessError> {
        let progress = self.progress_bar(response.content_length(), label);
        let mut out = tokio::fs::File::create(path).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            out.write_all(&chunk).await?;
            written += chunk.len() as u64;
            progress.inc(chunk.len() as u64);
        }
        out.flush().await?;
        progress.finish_and_clear();
        tracing::debug!("Wrote {} bytes to {}", written, path.display());
        Ok(written)
    }

    fn progress_bar(&self, total: Option<u64>, label: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = match total {
            Some(len) => {
                let pb = ProgressBar::new(len);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("#>-"),
                );
                pb
            }
            None => ProgressBar::new_spinner(),
        };
        pb.set_message(label.to_string());
        pb
    }

    /// Upload a local file. Its name must parse as an archive file before
    /// anything is sent. `api_key` falls back to the configured key.
    pub async fn upload(
        &self,
        path: &Path,
        api_key: Option<&str>,
    ) -> Result<ArchiveFile, AccessError> {
        if !path.is_file() {
            return Err(AccessError::FileNotFound(path.to_path_buf()));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = ArchiveFile::parse(&name)?;

        let archive_path = file.archive_path();
        let url = endpoint_url(
            &self.base_url,
            &format!("{}/{}", UPLOAD_ENDPOINT, archive_path),
        )?;
        tracing::info!("Uploading {} to {}", path.display(), url);

        let mut request = self.client.get(url.clone());
        match api_key.or(self.api_key.as_deref()) {
            Some(key) => request = request.header(API_KEY_HEADER, key),
            None => tracing::warn!("No API key configured, the upload may be rejected"),
        }
        let response = check_status(request.send().await?).await?;
        let presigned: String =
            response
                .json()
                .await
                .map_err(|e| AccessError::UnexpectedResponse {
                    url: url.to_string(),
                    message: format!("expected a JSON string upload URL: {e}"),
                })?;
        tracing::debug!("Received presigned upload URL");

        let body = tokio::fs::read(path).await?;
        let response = self
            .client
            .put(&presigned)
            .header(CONTENT_TYPE, "")
            .body(body)
            .send()
            .await?;
        check_status(response).await?;
        tracing::info!("Uploaded {}", file.filename());

        Ok(file)
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name: OsString = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(url: &str) -> Settings {
        Settings {
            data_access_url: url.to_string(),
            ..Settings::with_data_dir(PathBuf::from("/tmp/imap-data"))
        }
    }

    #[test]
    fn test_new_rejects_bad_url() {
        assert!(matches!(
            ArchiveClient::new(&settings("not a url")),
            Err(AccessError::Url(_))
        ));
        let client = ArchiveClient::new(&settings("http://localhost:9000")).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:9000/");
        assert_eq!(client.data_dir(), Path::new("/tmp/imap-data"));
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/d/imap_swe_l0_sci_20240105_v001.pkts")),
            PathBuf::from("/d/imap_swe_l0_sci_20240105_v001.pkts.part")
        );
    }

    #[tokio::test]
    async fn test_invalid_input_fails_before_network() {
        // Nothing listens here; a request would fail with a transport error.
        let client = ArchiveClient::new(&settings("http://127.0.0.1:9")).unwrap();

        let err = client.download_path("imap_bad_l0_sci_20240105_v001.pkts").await.unwrap_err();
        assert!(matches!(err, AccessError::Invalid(_)));

        let err = client
            .query_filters(&QueryFilters {
                start_date: Some("20241231".into()),
                end_date: Some("20240101".into()),
                ..QueryFilters::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::Query(QueryError::Invalid(_))));

        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("notes.md");
        std::fs::write(&bad, "x").unwrap();
        let err = client.upload(&bad, Some("key")).await.unwrap_err();
        assert!(matches!(err, AccessError::Invalid(_)));

        let err = client
            .upload(&dir.path().join("missing.cdf"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::FileNotFound(_)));
    }
}

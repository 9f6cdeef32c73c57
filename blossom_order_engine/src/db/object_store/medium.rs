//! Storage media for the order document.
//!
//! The hosted medium is an HTTP blob endpoint that supports `ETag`s and conditional `PUT`s (`If-Match` /
//! `If-None-Match: *`). The local medium is a JSON file on disk, written through a temp file and a rename so a crash
//! never leaves a half-written document behind.
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use blossom_common::Secret;
use log::*;
use reqwest::{header, Client, StatusCode};

use crate::traits::StoreError;

/// The version of the document that a write is based on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentVersion {
    /// The document did not exist when it was read.
    Absent,
    /// The hosted store's entity tag for the version that was read.
    ETag(String),
    /// The medium has no versioning (local file).
    Unversioned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedDocument {
    pub bytes: Vec<u8>,
    pub version: DocumentVersion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Someone else wrote the document after we read it.
    VersionMismatch,
}

#[derive(Debug, Clone)]
pub struct HostedDocumentConfig {
    pub url: String,
    pub token: Secret<String>,
    /// How many times a 404 is retried before the document is considered absent.
    pub read_retries: u32,
    pub retry_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct HostedDocument {
    client: Client,
    config: HostedDocumentConfig,
}

impl HostedDocument {
    pub fn new(client: Client, config: HostedDocumentConfig) -> Self {
        Self { client, config }
    }

    fn authorised(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let token = self.config.token.reveal();
        if token.is_empty() {
            request
        } else {
            request.bearer_auth(token)
        }
    }

    /// Newly written blobs are not always visible straight away, so a 404 is retried a few times before the document
    /// is reported as absent.
    pub async fn read(&self) -> Result<Option<VersionedDocument>, StoreError> {
        let mut attempt = 0;
        loop {
            let response = self.authorised(self.client.get(&self.config.url)).send().await?;
            match response.status() {
                StatusCode::NOT_FOUND if attempt < self.config.read_retries => {
                    attempt += 1;
                    debug!(
                        "🪣️ Order document not found. Retrying in {}ms ({attempt}/{})",
                        self.config.retry_delay.as_millis(),
                        self.config.read_retries
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                },
                StatusCode::NOT_FOUND => {
                    info!("🪣️ Order document does not exist yet");
                    return Ok(None);
                },
                status if status.is_success() => {
                    let etag = response
                        .headers()
                        .get(header::ETAG)
                        .and_then(|v| v.to_str().ok())
                        .map(|s| DocumentVersion::ETag(s.to_string()))
                        .unwrap_or(DocumentVersion::Unversioned);
                    let bytes = response.bytes().await?.to_vec();
                    trace!("🪣️ Read {} bytes of order document", bytes.len());
                    return Ok(Some(VersionedDocument { bytes, version: etag }));
                },
                status => {
                    let body = response.text().await.unwrap_or_default();
                    let message = format!("Reading the order document failed ({status}). {body}");
                    return Err(StoreError::ObjectStoreError(message));
                },
            }
        }
    }

    pub async fn write(&self, bytes: Vec<u8>, based_on: &DocumentVersion) -> Result<WriteOutcome, StoreError> {
        let mut request = self
            .authorised(self.client.put(&self.config.url))
            .header(header::CONTENT_TYPE, "application/json")
            .body(bytes);
        request = match based_on {
            DocumentVersion::Absent => request.header(header::IF_NONE_MATCH, "*"),
            DocumentVersion::ETag(tag) => request.header(header::IF_MATCH, tag.as_str()),
            DocumentVersion::Unversioned => request,
        };
        let response = request.send().await?;
        match response.status() {
            StatusCode::PRECONDITION_FAILED => Ok(WriteOutcome::VersionMismatch),
            status if status.is_success() => Ok(WriteOutcome::Written),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::ObjectStoreError(format!("Writing the order document failed ({status}). {body}")))
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalDocument {
    path: PathBuf,
}

impl LocalDocument {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> Result<Option<VersionedDocument>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(VersionedDocument { bytes, version: DocumentVersion::Unversioned })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn write(&self, bytes: Vec<u8>) -> Result<WriteOutcome, StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, bytes).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(WriteOutcome::Written)
    }
}

/// Where the order document lives.
#[derive(Debug, Clone)]
pub enum DocumentMedium {
    Hosted(HostedDocument),
    Local(LocalDocument),
}

impl DocumentMedium {
    pub async fn read(&self) -> Result<Option<VersionedDocument>, StoreError> {
        match self {
            DocumentMedium::Hosted(doc) => doc.read().await,
            DocumentMedium::Local(doc) => doc.read().await,
        }
    }

    pub async fn write(&self, bytes: Vec<u8>, based_on: &DocumentVersion) -> Result<WriteOutcome, StoreError> {
        match self {
            DocumentMedium::Hosted(doc) => doc.write(bytes, based_on).await,
            DocumentMedium::Local(doc) => doc.write(bytes).await,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            DocumentMedium::Hosted(doc) => format!("hosted document at {}", doc.config.url),
            DocumentMedium::Local(doc) => format!("local file {}", doc.path.display()),
        }
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Upload transport
//!
//! [`Transport`] moves one artifact to the detection service and hands back
//! the raw response. [`HttpTransport`] streams the payload as a multipart body
//! with a single `file` field and reports progress as slices are consumed.

use crate::constants::detection;
use crate::errors::SubmitError;
use crate::media::MediaArtifact;
use async_trait::async_trait;
use reqwest::multipart;
use reqwest::{Body, Client, ClientBuilder, StatusCode, Url};
use std::sync::Arc;
use tracing::{debug, info};

/// One upload
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub url: Url,
    pub artifact: MediaArtifact,
}

/// Status and body of the service's answer
///
/// The body is only read for a 200 response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Option<String>,
}

impl TransportResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            body: Some(body.into()),
        }
    }

    pub fn status(status: u16) -> Self {
        Self { status, body: None }
    }
}

/// Receives bytes-sent updates and turns them into percentages
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Arc<dyn Fn(u8) + Send + Sync>,
}

impl ProgressReporter {
    pub fn new(callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Reporter that drops every update
    pub fn disabled() -> Self {
        Self::new(|_| {})
    }

    /// Report `sent` of `total` bytes; nothing is reported without a total
    pub fn report(&self, sent: u64, total: Option<u64>) {
        let Some(total) = total.filter(|t| *t > 0) else {
            return;
        };
        let percent = (sent.min(total) * 100 / total) as u8;
        (self.callback)(percent);
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ProgressReporter")
    }
}

/// Moves an upload to the service
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: UploadRequest,
        progress: ProgressReporter,
    ) -> Result<TransportResponse, SubmitError>;
}

/// `reqwest`-based transport
///
/// No client-side timeout is applied; the service decides how long a
/// detection may take.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, SubmitError> {
        let client = Self::client_builder().build()?;
        Ok(Self { client })
    }

    /// Client builder preset with the application's user agent
    pub fn client_builder() -> ClientBuilder {
        Client::builder().user_agent(concat!("detect-camera/", env!("GIT_VERSION")))
    }

    /// Use an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: UploadRequest,
        progress: ProgressReporter,
    ) -> Result<TransportResponse, SubmitError> {
        let artifact = request.artifact;
        let total = artifact.len() as u64;
        let data = Arc::clone(artifact.data());

        info!(
            url = %request.url,
            filename = artifact.filename(),
            mime = artifact.mime(),
            size = total,
            "Uploading media"
        );

        let body = async_stream::stream! {
            let mut offset = 0usize;
            while offset < data.len() {
                let end = (offset + detection::UPLOAD_CHUNK_SIZE).min(data.len());
                yield Ok::<_, std::io::Error>(data[offset..end].to_vec());
                offset = end;
                progress.report(offset as u64, Some(total));
            }
        };

        let part = multipart::Part::stream_with_length(Body::wrap_stream(body), total)
            .file_name(artifact.filename().to_string())
            .mime_str(artifact.mime())?;
        let form = multipart::Form::new().part(detection::FILE_FIELD, part);

        let response = self
            .client
            .post(request.url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        debug!(status = status.as_u16(), "Detection service responded");

        if status != StatusCode::OK {
            return Ok(TransportResponse::status(status.as_u16()));
        }
        let body = response.text().await?;
        Ok(TransportResponse {
            status: status.as_u16(),
            body: Some(body),
        })
    }
}

use crate::error::{TransportError, UploadResult};
use crate::upload::request::UploadRequest;
use crate::upload::response::extract_error_message;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Receives cumulative upload percentages for a single request.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

const CHUNK_SIZE: usize = 64 * 1024;

/// Sends one multipart upload and returns the parsed JSON body of a 2xx response.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn send(&self, request: UploadRequest, progress: ProgressFn)
        -> Result<Value, TransportError>;
}

pub struct ReqwestTransport {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(endpoint: Url, headers: HeaderMap, timeout: Duration) -> UploadResult<Self> {
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self::with_client(client, endpoint, timeout))
    }

    pub fn with_client(client: Client, endpoint: Url, timeout: Duration) -> Self {
        Self {
            client,
            endpoint,
            timeout,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn streamed_body(payload: Bytes, progress: ProgressFn) -> Body {
        let total = payload.len();
        let chunks: Vec<Bytes> = (0..total)
            .step_by(CHUNK_SIZE)
            .map(|start| payload.slice(start..(start + CHUNK_SIZE).min(total)))
            .collect();

        let mut sent = 0usize;
        let stream = futures::stream::iter(chunks).map(move |chunk| {
            sent += chunk.len();
            progress(percent(sent, total));
            Ok::<Bytes, std::io::Error>(chunk)
        });

        Body::wrap_stream(stream)
    }

    fn form(request: UploadRequest, progress: ProgressFn) -> Result<Form, TransportError> {
        let length = request.payload.len() as u64;
        let part = Part::stream_with_length(Self::streamed_body(request.payload, progress), length)
            .file_name(request.file_name)
            .mime_str(&request.mime_type)
            .map_err(|e| TransportError::InvalidRequest(format!("invalid MIME type: {}", e)))?;

        let form = request
            .fields
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));

        Ok(form.part("archivo", part))
    }
}

fn percent(sent: usize, total: usize) -> u8 {
    if total == 0 {
        100
    } else {
        ((sent as u128 * 100) / total as u128).min(100) as u8
    }
}

#[async_trait]
impl UploadTransport for ReqwestTransport {
    #[instrument(skip(self, request, progress), fields(file = %request.file_name, identity = %request.identity))]
    async fn send(
        &self,
        request: UploadRequest,
        progress: ProgressFn,
    ) -> Result<Value, TransportError> {
        let empty_payload = request.payload.is_empty();
        let form = Self::form(request, progress.clone())?;

        debug!(endpoint = %self.endpoint, "Sending upload request");

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(e, self.timeout))?;
        let body = serde_json::from_str::<Value>(&text).ok();

        debug!(status = status.as_u16(), "Received upload response");

        if !status.is_success() {
            return Err(TransportError::status(
                status.as_u16(),
                body.as_ref().and_then(extract_error_message),
            ));
        }

        if empty_payload {
            progress(100);
        }

        body.ok_or_else(|| TransportError::Decode("expected a JSON body".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::request::RequestSettings;
    use crate::upload::types::{UploadCandidate, UploadContext};

    fn request_with_mime(mime_type: &str) -> UploadRequest {
        let candidate = UploadCandidate::new("a.pdf", mime_type, vec![0u8; 8]);
        let context = UploadContext::new(42, 7).unwrap();
        UploadRequest::build(candidate, &context, &RequestSettings::default())
    }

    fn no_progress() -> ProgressFn {
        Arc::new(|_| {})
    }

    #[test]
    fn unparseable_mime_is_a_request_error() {
        let err = ReqwestTransport::form(request_with_mime("not a mime"), no_progress()).unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest(_)));
        assert!(err.to_string().starts_with("invalid request: invalid MIME type"));
    }

    #[test]
    fn valid_mime_builds_form() {
        assert!(ReqwestTransport::form(request_with_mime("application/pdf"), no_progress()).is_ok());
    }

    #[test]
    fn percent_is_cumulative_and_capped() {
        assert_eq!(percent(0, 0), 100);
        assert_eq!(percent(32, 128), 25);
        assert_eq!(percent(128, 128), 100);
        assert_eq!(percent(200, 128), 100);
    }
}

//! Streaming HTTP download into a local file.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use bundlecache_core::{FileHandle, ProgressFn, TransportError, TransportPort};

use crate::config::HttpTransportConfig;

/// `TransportPort` backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a transport from configuration.
    pub fn new(config: &HttpTransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| TransportError::other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TransportPort for HttpTransport {
    async fn download(
        &self,
        remote_uri: &str,
        destination: &FileHandle,
        progress: ProgressFn<'_>,
    ) -> Result<(), TransportError> {
        let response = self
            .client
            .get(remote_uri)
            .send()
            .await
            .map_err(|e| map_request_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(
                target: "bundlecache.http",
                uri = remote_uri,
                status = status.as_u16(),
                "Server rejected request"
            );
            return Err(TransportError::status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("unexpected status"),
            ));
        }

        let declared = response.content_length();
        let total = declared.unwrap_or(0);

        let mut file = File::create(destination.path())
            .await
            .map_err(|e| write_error(destination, &e))?;

        let mut loaded: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| map_request_error(&e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| write_error(destination, &e))?;
            loaded += chunk.len() as u64;
            progress(loaded, total);
        }
        file.flush()
            .await
            .map_err(|e| write_error(destination, &e))?;

        if total > 0 && loaded < total {
            return Err(TransportError::connection(format!(
                "body ended after {loaded} of {total} bytes"
            )));
        }
        if declared.is_none() && loaded == 0 {
            return Err(TransportError::other("server sent no data"));
        }

        tracing::trace!(
            target: "bundlecache.http",
            uri = remote_uri,
            bytes = loaded,
            "Download complete"
        );
        Ok(())
    }
}

fn write_error(destination: &FileHandle, err: &std::io::Error) -> TransportError {
    TransportError::write(format!("{}: {err}", destination.path().display()))
}

fn map_request_error(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if let Some(status) = err.status() {
        TransportError::status(status.as_u16(), err.to_string())
    } else if err.is_connect() || err.is_body() || err.is_request() || err.is_decode() {
        TransportError::connection(err.to_string())
    } else {
        TransportError::other(err.to_string())
    }
}

//! Scenario backend API client.
//!
//! Provides the HTTP client for the scenario generation backend,
//! including the streaming scenario response via Server-Sent Events.
//! Transport failures inside an open stream surface as
//! [`StreamEvent::Error`] items; HTTP-level failures before the stream
//! opens surface as [`ClientError`].

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use futures_util::stream::{self, Stream};
use futures_util::StreamExt;
use reqwest::Client;
use thiserror::Error;

use crate::config::ClientConfig;
use crate::models::{SaveScenarioRequest, ScenarioRequest};
use crate::sse::{classify, FrameDemux, StreamEvent};

/// Error type for scenario client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// Server returned an error status
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
}

/// Client for the scenario generation backend.
pub struct ScenarioClient {
    /// Base URL for the backend API
    pub base_url: String,
    /// Reusable HTTP client
    client: Client,
    idle_timeout: Duration,
}

impl ScenarioClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            client: Client::new(),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        }
    }

    /// Create a client with a custom base URL and default timeouts.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::new(&ClientConfig::default().with_base_url(base_url))
    }

    /// Stream a scenario generation response.
    ///
    /// Sends a POST to `/api/query/stream` and returns the classified
    /// event stream. Exactly one chunk read is in flight at a time.
    /// Natural end of input synthesizes a final [`StreamEvent::Done`]
    /// even when the backend never sent an explicit one; a chunk-level
    /// transport failure or an idle timeout yields a terminal
    /// [`StreamEvent::Error`].
    pub async fn stream_scenario(
        &self,
        request: &ScenarioRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = StreamEvent> + Send>>, ClientError> {
        let url = format!("{}/api/query/stream", self.base_url);
        tracing::debug!(%url, history_len = request.history.len(), "starting scenario stream");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::Server { status, message });
        }

        let idle_timeout = self.idle_timeout;
        let bytes_stream = response.bytes_stream();

        // Demultiplex and classify the byte stream. The transport slot
        // is dropped once the stream ends or fails; classified events
        // still queued drain out first.
        let event_stream = stream::unfold(
            (
                Some(bytes_stream),
                FrameDemux::new(),
                VecDeque::<StreamEvent>::new(),
            ),
            move |(mut transport, mut demux, mut pending)| async move {
                loop {
                    if let Some(event) = pending.pop_front() {
                        tracing::trace!(kind = event.event_type_name(), "yielding stream event");
                        return Some((event, (transport, demux, pending)));
                    }

                    let Some(chunks) = transport.as_mut() else {
                        return None;
                    };

                    match tokio::time::timeout(idle_timeout, chunks.next()).await {
                        Ok(Some(Ok(chunk))) => {
                            // Chunks split on byte boundaries; the demux
                            // carries any partial character over
                            for frame in demux.push_bytes(&chunk) {
                                if let Some(event) = classify(&frame) {
                                    pending.push_back(event);
                                }
                            }
                        }
                        Ok(Some(Err(e))) => {
                            demux.finish();
                            transport = None;
                            pending.push_back(StreamEvent::Error {
                                message: e.to_string(),
                            });
                        }
                        Ok(None) => {
                            // End of input: an unfinished line is dropped
                            // and a Done is synthesized unconditionally
                            demux.finish();
                            transport = None;
                            pending.push_back(StreamEvent::Done);
                        }
                        Err(_) => {
                            demux.finish();
                            transport = None;
                            pending.push_back(StreamEvent::Error {
                                message: format!(
                                    "no data received for {}s",
                                    idle_timeout.as_secs()
                                ),
                            });
                        }
                    }
                }
            },
        );

        Ok(Box::pin(event_stream))
    }

    /// Persist a completed session.
    pub async fn save_scenario(&self, request: &SaveScenarioRequest) -> Result<(), ClientError> {
        let url = format!("{}/api/scenario/save", self.base_url);

        let response = self.client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::Server { status, message });
        }

        Ok(())
    }

    /// Check whether the backend is healthy and reachable.
    pub async fn health_check(&self) -> Result<bool, ClientError> {
        let url = format!("{}/api/health", self.base_url);

        let response = self.client.get(&url).send().await?;

        Ok(response.status().is_success())
    }
}

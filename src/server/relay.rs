//! How a completion travels back to the HTTP caller.
//!
//! [`StreamingRelay`] forwards content deltas as a plain-text body and closes
//! with a sentinel line carrying the structured reply. [`BufferedRelay`] waits
//! for the whole completion and answers with the JSON envelope.

use std::future::Future;
use std::io;
use std::str::FromStr;

use axum::Json;
use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures::{Stream, StreamExt};
use tracing::warn;

use super::error::ApiError;
use crate::llm::provider::{AssistantInput, LlmProvider, TextStream};
use crate::neighborhood::LocationHint;
use crate::protocol::ChatEnvelope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    #[default]
    Streaming,
    Buffered,
}

impl FromStr for ResponseMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "streaming" => Ok(Self::Streaming),
            "buffered" => Ok(Self::Buffered),
            _ => Err(format!("unknown response mode '{value}'")),
        }
    }
}

pub trait CompletionRelay {
    fn relay<P: LlmProvider>(
        &self,
        provider: &P,
        input: AssistantInput,
        location: Option<LocationHint>,
    ) -> impl Future<Output = Result<Response, ApiError>> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BufferedRelay;

impl CompletionRelay for BufferedRelay {
    async fn relay<P: LlmProvider>(
        &self,
        provider: &P,
        input: AssistantInput,
        location: Option<LocationHint>,
    ) -> Result<Response, ApiError> {
        let output = provider.generate(input).await?;
        Ok(Json(ChatEnvelope::new(output.text, location)).into_response())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingRelay;

impl CompletionRelay for StreamingRelay {
    async fn relay<P: LlmProvider>(
        &self,
        provider: &P,
        input: AssistantInput,
        location: Option<LocationHint>,
    ) -> Result<Response, ApiError> {
        let mut upstream = provider.stream(input).await?;

        // Headers commit the status, so hold them until the model has produced
        // visible text. Leading whitespace is kept and sent with it.
        let mut first = String::new();
        loop {
            match upstream.next().await {
                Some(Ok(text)) => {
                    first.push_str(&text);
                    if !first.trim().is_empty() {
                        break;
                    }
                }
                Some(Err(err)) => return Err(err.into()),
                None => return Err(ApiError::EmptyResponse),
            }
        }

        let body = Body::from_stream(relay_body(first, upstream, location));
        Ok((
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            body,
        )
            .into_response())
    }
}

fn relay_body(
    first: String,
    mut upstream: TextStream,
    location: Option<LocationHint>,
) -> impl Stream<Item = io::Result<String>> + Send + 'static {
    async_stream::stream! {
        let mut full = first.clone();
        yield Ok(first);

        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(text) => {
                    full.push_str(&text);
                    yield Ok(text);
                }
                Err(err) => {
                    warn!(error = %err, "completion stream failed mid-response");
                    yield Err(io::Error::other(err.to_string()));
                    return;
                }
            }
        }

        match sentinel_trailer(&full, location) {
            Ok(trailer) => yield Ok(trailer),
            Err(err) => warn!(error = %err, "failed to encode reply trailer"),
        }
    }
}

fn sentinel_trailer(full: &str, location: Option<LocationHint>) -> serde_json::Result<String> {
    let envelope = ChatEnvelope::new(full.trim(), location);
    serde_json::to_string(&envelope).map(|json| format!("\n{json}\n"))
}

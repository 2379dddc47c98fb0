use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

use crate::protocol::{ChatEnvelope, ChatRequest, ErrorBody};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid reply: {0}")]
    Decode(String),
}

/// What the gateway answered with, depending on its response mode.
pub enum Reply {
    Envelope(ChatEnvelope),
    Stream(BoxStream<'static, Result<String, TransportError>>),
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(http: Client, server_url: &str) -> Self {
        Self {
            http,
            endpoint: format!("{}/api/chat", server_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn send(&self, request: &ChatRequest) -> Result<Reply, TransportError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|err| TransportError::Request(err.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|err| match err.details {
                    Some(details) => format!("{} ({details})", err.error),
                    None => err.error,
                })
                .unwrap_or(body);
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));
        if is_json {
            return resp
                .json::<ChatEnvelope>()
                .await
                .map(Reply::Envelope)
                .map_err(|err| TransportError::Decode(err.to_string()));
        }

        let mut bytes = resp.bytes_stream();
        let chunks = async_stream::stream! {
            let mut decoder = Utf8Decoder::default();
            while let Some(next) = bytes.next().await {
                match next {
                    Ok(raw) => {
                        let text = decoder.push(&raw);
                        if !text.is_empty() {
                            yield Ok(text);
                        }
                    }
                    Err(err) => {
                        yield Err(TransportError::Request(err.to_string()));
                        return;
                    }
                }
            }
            let rest = decoder.finish();
            if !rest.is_empty() {
                yield Ok(rest);
            }
        };

        Ok(Reply::Stream(chunks.boxed()))
    }
}

/// Holds back the tail of a multi-byte character split across chunks.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();
        let mut consumed = 0;
        while consumed < self.pending.len() {
            let rest = &self.pending[consumed..];
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    consumed = self.pending.len();
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    // An incomplete trailing sequence waits for the next chunk.
                    let Some(invalid) = err.error_len() else {
                        consumed += valid;
                        break;
                    };
                    out.push(char::REPLACEMENT_CHARACTER);
                    consumed += valid + invalid;
                }
            }
        }
        self.pending.drain(..consumed);
        out
    }

    fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&rest).into_owned()
    }
}

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::provider::{
    AssistantInput, AssistantOutput, GENERATION_PARAMS, LlmError, LlmProvider, LlmResult,
    TextStream,
};
use super::sse::SseDecoder;
use crate::http::client::HttpClient;

const MAX_ERROR_BODY_CHARS: usize = 400;
const STREAM_DONE: &str = "[DONE]";

/// Chat-completion provider speaking Groq's OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct GroqProvider {
    http: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
}

impl GroqProvider {
    pub fn new(
        http: HttpClient,
        api_key: Option<String>,
        model: String,
        base_url: String,
    ) -> LlmResult<Self> {
        let api_key = api_key
            .filter(|v| !v.trim().is_empty())
            .ok_or(LlmError::MissingApiKey)?;

        Ok(Self {
            http,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(&self, input: &AssistantInput, stream: bool) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &input.system_instruction {
            messages.push(WireMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(WireMessage {
            role: "user".to_string(),
            content: input.user_message.clone(),
        });

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: GENERATION_PARAMS.temperature,
            max_tokens: GENERATION_PARAMS.max_tokens,
            top_p: GENERATION_PARAMS.top_p,
            frequency_penalty: GENERATION_PARAMS.frequency_penalty,
            stream,
        }
    }

    fn extract_text(resp: ChatCompletionResponse) -> LlmResult<String> {
        resp.choices
            .into_iter()
            .filter_map(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .find(|text| !text.is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

impl LlmProvider for GroqProvider {
    async fn generate(&self, input: AssistantInput) -> LlmResult<AssistantOutput> {
        let payload = self.build_request(&input, false);
        debug!(model = %self.model, "requesting buffered completion");

        let resp = self
            .http
            .post_json(&self.endpoint(), &self.api_key, &payload)
            .await
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        if !(200..300).contains(&resp.status) {
            return Err(LlmError::HttpStatus {
                status: resp.status,
                body: resp.body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed = serde_json::from_str::<ChatCompletionResponse>(&resp.body)
            .map_err(|err| LlmError::Parse(err.to_string()))?;
        let text = Self::extract_text(parsed)?;
        Ok(AssistantOutput { text })
    }

    async fn stream(&self, input: AssistantInput) -> LlmResult<TextStream> {
        let payload = self.build_request(&input, true);
        debug!(model = %self.model, "requesting streamed completion");

        let resp = self
            .http
            .post_json_streaming(&self.endpoint(), &self.api_key, &payload)
            .await
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            return Err(LlmError::HttpStatus {
                status,
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let mut bytes = resp.bytes_stream();
        let deltas = async_stream::stream! {
            let mut decoder = SseDecoder::new();
            loop {
                let (events, mut done) = match bytes.next().await {
                    Some(Ok(chunk)) => (decoder.push(&chunk), false),
                    Some(Err(err)) => {
                        yield Err(LlmError::Transport(err.to_string()));
                        break;
                    }
                    None => (decoder.finish().into_iter().collect::<Vec<_>>(), true),
                };
                for data in events {
                    match parse_delta(&data) {
                        Ok(DeltaEvent::Done) => {
                            done = true;
                            break;
                        }
                        Ok(DeltaEvent::Content(text)) => {
                            if !text.is_empty() {
                                yield Ok(text);
                            }
                        }
                        Err(err) => {
                            warn!(error = %err, "malformed completion chunk");
                            yield Err(err);
                            done = true;
                            break;
                        }
                    }
                }
                if done {
                    break;
                }
            }
        };

        Ok(deltas.boxed())
    }
}

enum DeltaEvent {
    Content(String),
    Done,
}

fn parse_delta(data: &str) -> LlmResult<DeltaEvent> {
    if data.trim() == STREAM_DONE {
        return Ok(DeltaEvent::Done);
    }

    let chunk = serde_json::from_str::<ChatCompletionChunk>(data)
        .map_err(|err| LlmError::Parse(err.to_string()))?;
    let text = chunk
        .choices
        .into_iter()
        .filter_map(|choice| choice.delta.content)
        .collect::<String>();
    Ok(DeltaEvent::Content(text))
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    frequency_penalty: f32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

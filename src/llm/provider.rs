use futures::stream::BoxStream;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantInput {
    pub user_message: String,
    pub system_instruction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantOutput {
    pub text: String,
}

/// Sampling settings sent with every completion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
}

pub const GENERATION_PARAMS: GenerationParams = GenerationParams {
    temperature: 0.7,
    max_tokens: 4096,
    top_p: 0.9,
    frequency_penalty: 0.1,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    #[error("missing GROQ_API_KEY")]
    MissingApiKey,
    #[error("provider request failed with status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("provider transport error: {0}")]
    Transport(String),
    #[error("provider parse error: {0}")]
    Parse(String),
    #[error("provider returned empty response text")]
    EmptyResponse,
}

pub type LlmResult<T> = std::result::Result<T, LlmError>;

/// Content deltas in arrival order. Ends when the provider finishes.
pub type TextStream = BoxStream<'static, LlmResult<String>>;

pub trait LlmProvider: Send + Sync + 'static {
    fn generate(
        &self,
        input: AssistantInput,
    ) -> impl std::future::Future<Output = LlmResult<AssistantOutput>> + Send;

    fn stream(
        &self,
        input: AssistantInput,
    ) -> impl std::future::Future<Output = LlmResult<TextStream>> + Send;
}

//! watsonx.ai REST client.
//!
//! Implements [`ChatModel`] against `/ml/v1/text/generation` and
//! `/ml/v1/text/generation_stream`, and [`EmbeddingModel`] against
//! `/ml/v1/text/embeddings`. Every request carries an IAM bearer token.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::iam::IamAuthenticator;
use super::sse::SseDecoder;
use super::{
    ChatModel, ChatResponse, ChatStream, Embedding, EmbeddingModel, EmbeddingResponse,
    Generation, ModelError,
};
use crate::config::WatsonxConfig;
use crate::prompt::{ChatOptions, Prompt};

const GENERATION_PATH: &str = "/ml/v1/text/generation";
const GENERATION_STREAM_PATH: &str = "/ml/v1/text/generation_stream";
const EMBEDDINGS_PATH: &str = "/ml/v1/text/embeddings";

// ─── Wire types ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct TextGenerationRequest<'a> {
    input: String,
    model_id: &'a str,
    project_id: &'a str,
    parameters: GenerationParameters<'a>,
}

#[derive(Debug, Default, Serialize)]
struct GenerationParameters<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    decoding_method: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_new_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_new_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repetition_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    random_seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<&'a [String]>,
}

impl<'a> From<&'a ChatOptions> for GenerationParameters<'a> {
    fn from(options: &'a ChatOptions) -> Self {
        Self {
            decoding_method: options.decoding_method.as_deref(),
            max_new_tokens: options.max_new_tokens,
            min_new_tokens: options.min_new_tokens,
            temperature: options.temperature,
            top_k: options.top_k,
            top_p: options.top_p,
            repetition_penalty: options.repetition_penalty,
            random_seed: options.random_seed,
            stop_sequences: options.stop_sequences.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TextGenerationResponse {
    #[serde(default)]
    results: Vec<TextGenerationResult>,
    #[serde(default)]
    errors: Vec<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct TextGenerationResult {
    #[serde(default)]
    generated_text: String,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    inputs: &'a [String],
    model_id: &'a str,
    project_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    results: Vec<EmbeddingsResult>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResult {
    embedding: Vec<f64>,
}

impl TextGenerationResponse {
    fn into_chat_response(self) -> Result<ChatResponse, ModelError> {
        if !self.errors.is_empty() {
            let message = self
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ModelError::Provider(message));
        }
        Ok(ChatResponse::new(
            self.results
                .into_iter()
                .map(|r| Generation {
                    content: r.generated_text,
                    finish_reason: r.stop_reason,
                })
                .collect(),
        ))
    }
}

fn parse_generation(data: &str) -> Result<ChatResponse, ModelError> {
    serde_json::from_str::<TextGenerationResponse>(data)?.into_chat_response()
}

// ─── Client ────────────────────────────────────────────────────────────────

pub struct WatsonxClient {
    http: reqwest::Client,
    config: WatsonxConfig,
    chat_defaults: ChatOptions,
    embedding_model: String,
    auth: IamAuthenticator,
}

impl WatsonxClient {
    pub fn new(
        config: WatsonxConfig,
        chat_defaults: ChatOptions,
        embedding_model: impl Into<String>,
    ) -> Self {
        let http = reqwest::Client::new();
        let auth = IamAuthenticator::new(http.clone(), &config.iam_url, &config.api_key);
        Self {
            http,
            config,
            chat_defaults,
            embedding_model: embedding_model.into(),
            auth,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}{}?version={}",
            self.config.base_url.trim_end_matches('/'),
            path,
            self.config.version
        )
    }

    /// POST a JSON body with auth and return the response if it is 2xx.
    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        accept: &str,
    ) -> Result<reqwest::Response, ModelError> {
        let token = self.auth.token().await?;
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, accept)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status { status, body });
        }
        Ok(response)
    }

    async fn generate(
        &self,
        path: &str,
        prompt: &Prompt,
        accept: &str,
    ) -> Result<reqwest::Response, ModelError> {
        let options = match &prompt.options {
            Some(overrides) => self.chat_defaults.merge(overrides),
            None => self.chat_defaults.clone(),
        };
        let model_id = options.model.as_deref().unwrap_or_default();
        debug!(model = model_id, path, "Sending generation request");

        let request = TextGenerationRequest {
            input: prompt.to_input(),
            model_id,
            project_id: &self.config.project_id,
            parameters: GenerationParameters::from(&options),
        };
        self.post(path, &request, accept).await
    }
}

#[async_trait]
impl ChatModel for WatsonxClient {
    async fn call(&self, prompt: &Prompt) -> Result<ChatResponse, ModelError> {
        let response = self
            .generate(GENERATION_PATH, prompt, "application/json")
            .await?;
        let body = response.text().await?;
        parse_generation(&body)
    }

    async fn stream(&self, prompt: &Prompt) -> Result<ChatStream, ModelError> {
        let response = self
            .generate(GENERATION_STREAM_PATH, prompt, "text/event-stream")
            .await?;
        Ok(generation_stream(response.bytes_stream()))
    }
}

#[async_trait]
impl EmbeddingModel for WatsonxClient {
    async fn embed_for_response(&self, inputs: &[String]) -> Result<EmbeddingResponse, ModelError> {
        let request = EmbeddingsRequest {
            inputs,
            model_id: &self.embedding_model,
            project_id: &self.config.project_id,
        };
        let response = self
            .post(EMBEDDINGS_PATH, &request, "application/json")
            .await?;
        let body: EmbeddingsResponse = serde_json::from_str(&response.text().await?)?;

        Ok(EmbeddingResponse {
            results: body
                .results
                .into_iter()
                .enumerate()
                .map(|(index, r)| Embedding::new(r.embedding, index))
                .collect(),
        })
    }
}

/// Turn an SSE byte stream into generation chunks. The stream ends after the
/// first error.
fn generation_stream<S, B, E>(bytes: S) -> ChatStream
where
    S: futures::Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ModelError> + Send + 'static,
{
    struct State<S> {
        bytes: std::pin::Pin<Box<S>>,
        decoder: SseDecoder,
        done: bool,
    }

    let state = State {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(data) = state.decoder.next_data() {
                return Some((parse_generation(&data), state));
            }
            if state.done {
                return state
                    .decoder
                    .finish()
                    .map(|data| (parse_generation(&data), state));
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => state.decoder.push(chunk.as_ref()),
                Some(Err(e)) => {
                    state.done = true;
                    state.decoder = SseDecoder::new();
                    return Some((Err(e.into()), state));
                }
                None => state.done = true,
            }
        }
    })
    .boxed()
}

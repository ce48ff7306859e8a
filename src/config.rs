//! Runtime configuration for watsonx-facade.
//!
//! Configuration is loaded from a JSON file (every section optional) and then
//! patched with `WATSONX_AI_*` environment variables for the provider
//! credentials.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::prompt::{ChatOptions, PromptBuilder, TemplateError};

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "watsonx-facade", about = "HTTP facade over watsonx.ai chat and embeddings")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address (overrides `server.listen`).
    #[arg(long)]
    pub listen: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// watsonx.ai connection settings.
    pub watsonx: WatsonxConfig,

    /// Default text-generation options.
    pub chat: ChatOptions,

    /// Embedding settings.
    pub embedding: EmbeddingConfig,

    /// Prompt used by the `/api/v1/text` routes.
    pub prompt: PromptConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:8080").
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Provider connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatsonxConfig {
    /// Regional endpoint, without a trailing path.
    pub base_url: String,

    /// API version date passed as `?version=`.
    pub version: String,

    /// IAM token endpoint used to exchange the API key.
    pub iam_url: String,

    /// IBM Cloud API key.
    pub api_key: String,

    /// watsonx.ai project the requests are billed to.
    pub project_id: String,
}

impl Default for WatsonxConfig {
    fn default() -> Self {
        Self {
            base_url: "https://us-south.ml.cloud.ibm.com".to_string(),
            version: "2023-05-29".to_string(),
            iam_url: "https://iam.cloud.ibm.com/identity/token".to_string(),
            api_key: String::new(),
            project_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "ibm/slate-30m-english-rtrvr".to_string(),
        }
    }
}

/// System instruction and question template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub system: String,

    /// Must contain a `{question}` placeholder.
    pub template: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system: "You are a helpful, respectful and honest assistant. \
                     Answer as concisely as possible."
                .to_string(),
            template: "Answer the following question.\n\
                       If you don't know the answer, say that you don't know.\n\
                       \n\
                       Question: {question}\n\
                       Answer:"
                .to_string(),
        }
    }
}

/// Default generation options, applied under any per-prompt overrides.
pub fn default_chat_options() -> ChatOptions {
    ChatOptions {
        model: Some("google/flan-ul2".to_string()),
        decoding_method: Some("greedy".to_string()),
        max_new_tokens: Some(20),
        min_new_tokens: Some(0),
        temperature: Some(0.7),
        repetition_penalty: Some(1.0),
        ..Default::default()
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let data = std::fs::read_to_string(path)?;
            serde_json::from_str(&data)?
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Config::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Patch provider credentials from the environment. `lookup` is
    /// `std::env::var` in production.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("WATSONX_AI_API_KEY") {
            self.watsonx.api_key = key;
        }
        if let Some(project) = lookup("WATSONX_AI_PROJECT_ID") {
            self.watsonx.project_id = project;
        }
        if let Some(url) = lookup("WATSONX_AI_BASE_URL") {
            self.watsonx.base_url = url;
        }
    }

    pub fn validate(&self) -> Result<(), TemplateError> {
        self.prompt_builder().map(|_| ())
    }

    pub fn prompt_builder(&self) -> Result<PromptBuilder, TemplateError> {
        PromptBuilder::new(self.prompt.system.clone(), self.prompt.template.clone())
    }

    /// Configured chat options layered over the built-in defaults.
    pub fn chat_options(&self) -> ChatOptions {
        default_chat_options().merge(&self.chat)
    }
}

//! LLM provider abstraction layer.
//!
//! This module defines the provider trait and the request-side types the
//! compatibility layer reads and rewrites: the [`Model`] descriptor and the
//! per-call [`StreamOptions`].

use crate::compat::CompatConfig;
use crate::model::{Message, StreamEvent};
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::pin::Pin;

/// Boxed event stream returned by [`Provider::stream`].
pub type EventStream = Pin<Box<dyn Stream<Item = crate::error::Result<StreamEvent>> + Send>>;

// ============================================================================
// Provider Trait
// ============================================================================

/// A provider for LLM completions.
///
/// This is the request-issuing function an agent holds. Decorators such as
/// [`ParamInjectingProvider`](crate::extra_params::ParamInjectingProvider)
/// implement it too, so a wrapped provider is indistinguishable to callers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Get the API type.
    fn api(&self) -> &str;

    /// Get the model identifier used by this provider.
    fn model_id(&self) -> &str;

    /// Stream a completion.
    async fn stream(
        &self,
        context: &Context,
        options: &StreamOptions,
    ) -> crate::error::Result<EventStream>;
}

// ============================================================================
// Context
// ============================================================================

/// Context for a completion request.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub system_prompt: Option<String>,
    pub messages: Vec<Message>,
}

// ============================================================================
// Stream Options
// ============================================================================

/// Options for streaming completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub api_key: Option<String>,
    pub cache_retention: CacheRetention,
    pub session_id: Option<String>,
    pub headers: HashMap<String, String>,
    /// Provider-specific request body extensions, keyed by namespace
    /// (`gateway` for the Vercel AI Gateway, for example).
    pub provider_options: Map<String, Value>,
}

/// Cache retention policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheRetention {
    #[default]
    None,
    Short,
    Long, // 1 hour TTL on Anthropic
}

impl std::str::FromStr for CacheRetention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "short" | "5m" => Ok(Self::Short),
            "long" | "1h" => Ok(Self::Long),
            other => Err(format!("Invalid cache retention: {other}")),
        }
    }
}

// ============================================================================
// Model Definition
// ============================================================================

/// A model definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: String,
    pub name: String,
    pub api: String,
    pub provider: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub reasoning: bool,
    #[serde(default = "default_input")]
    pub input: Vec<InputType>,
    #[serde(default)]
    pub cost: ModelCost,
    #[serde(default)]
    pub context_window: u32,
    #[serde(default)]
    pub max_tokens: u32,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Backend-quirk overrides; see [`crate::compat`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compat: Option<CompatConfig>,
}

fn default_input() -> Vec<InputType> {
    vec![InputType::Text]
}

/// Input types supported by a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Image,
}

/// Model pricing per million tokens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCost {
    pub input: f64,
    pub output: f64,
    pub cache_read: f64,
    pub cache_write: f64,
}

impl Model {
    /// Whether this model speaks the given wire-protocol family.
    pub fn speaks(&self, api: &Api) -> bool {
        self.api.parse::<Api>().is_ok_and(|parsed| parsed == *api)
    }
}

// ============================================================================
// Known APIs and Providers
// ============================================================================

/// Known API types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Api {
    AnthropicMessages,
    OpenAICompletions,
    OpenAIResponses,
    AzureOpenAIResponses,
    BedrockConverseStream,
    GoogleGenerativeAI,
    GoogleVertex,
    Custom(String),
}

impl std::fmt::Display for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AnthropicMessages => write!(f, "anthropic-messages"),
            Self::OpenAICompletions => write!(f, "openai-completions"),
            Self::OpenAIResponses => write!(f, "openai-responses"),
            Self::AzureOpenAIResponses => write!(f, "azure-openai-responses"),
            Self::BedrockConverseStream => write!(f, "bedrock-converse-stream"),
            Self::GoogleGenerativeAI => write!(f, "google-generative-ai"),
            Self::GoogleVertex => write!(f, "google-vertex"),
            Self::Custom(s) => write!(f, "{s}"),
        }
    }
}

impl std::str::FromStr for Api {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anthropic-messages" => Ok(Self::AnthropicMessages),
            "openai-completions" => Ok(Self::OpenAICompletions),
            "openai-responses" => Ok(Self::OpenAIResponses),
            "azure-openai-responses" => Ok(Self::AzureOpenAIResponses),
            "bedrock-converse-stream" => Ok(Self::BedrockConverseStream),
            "google-generative-ai" => Ok(Self::GoogleGenerativeAI),
            "google-vertex" => Ok(Self::GoogleVertex),
            other if !other.is_empty() => Ok(Self::Custom(other.to_string())),
            _ => Err("API identifier cannot be empty".to_string()),
        }
    }
}

/// Providers whose quirks this crate knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnownProvider {
    Zai,
    OpenRouter,
    VercelAiGateway,
    OpenAI,
    Anthropic,
    Custom(String),
}

impl KnownProvider {
    /// Host fragment that identifies this backend in a base URL, if any.
    pub const fn host_fragment(&self) -> Option<&'static str> {
        match self {
            Self::Zai => Some("api.z.ai"),
            Self::OpenRouter => Some("openrouter.ai"),
            Self::VercelAiGateway => Some("ai-gateway.vercel.sh"),
            Self::OpenAI => Some("api.openai.com"),
            Self::Anthropic => Some("api.anthropic.com"),
            Self::Custom(_) => None,
        }
    }
}

impl std::fmt::Display for KnownProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zai => write!(f, "zai"),
            Self::OpenRouter => write!(f, "openrouter"),
            Self::VercelAiGateway => write!(f, "vercel-ai-gateway"),
            Self::OpenAI => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
            Self::Custom(s) => write!(f, "{s}"),
        }
    }
}

impl std::str::FromStr for KnownProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zai" => Ok(Self::Zai),
            "openrouter" => Ok(Self::OpenRouter),
            "vercel-ai-gateway" => Ok(Self::VercelAiGateway),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            other if !other.is_empty() => Ok(Self::Custom(other.to_string())),
            _ => Err("Provider identifier cannot be empty".to_string()),
        }
    }
}

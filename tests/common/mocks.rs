//! Spy provider and fixtures shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream;
use pi_compat::error::Result;
use pi_compat::model::{AssistantMessage, ContentBlock, StopReason, StreamEvent, TextContent};
use pi_compat::provider::{Context, EventStream, InputType, ModelCost};
use pi_compat::{Config, Model, Provider, StreamOptions};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Provider that records every call's options and answers with `reply`.
#[derive(Debug)]
pub struct SpyProvider {
    name: String,
    model_id: String,
    reply: String,
    calls: Mutex<Vec<StreamOptions>>,
}

impl SpyProvider {
    pub fn new(name: &str, model_id: &str) -> Self {
        Self {
            name: name.to_string(),
            model_id: model_id.to_string(),
            reply: "ok".to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_reply(mut self, reply: &str) -> Self {
        self.reply = reply.to_string();
        self
    }

    /// Options seen by each call, in order.
    pub fn calls(&self) -> Vec<StreamOptions> {
        self.calls.lock().expect("lock spy calls").clone()
    }
}

#[async_trait]
impl Provider for SpyProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn api(&self) -> &str {
        "openai-completions"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn stream(&self, _context: &Context, options: &StreamOptions) -> Result<EventStream> {
        self.calls.lock().expect("lock spy calls").push(options.clone());
        let message = AssistantMessage {
            content: vec![ContentBlock::Text(TextContent::new(self.reply.clone()))],
            api: "openai-completions".to_string(),
            provider: self.name.clone(),
            model: self.model_id.clone(),
            ..AssistantMessage::default()
        };
        let events: Vec<Result<StreamEvent>> = vec![
            Ok(StreamEvent::TextDelta {
                content_index: 0,
                delta: self.reply.clone(),
            }),
            Ok(StreamEvent::Done {
                reason: StopReason::Stop,
                message,
            }),
        ];
        Ok(Box::pin(stream::iter(events)))
    }
}

fn model(id: &str, provider: &str, base_url: &str) -> Model {
    Model {
        id: id.to_string(),
        name: id.to_string(),
        api: "openai-completions".to_string(),
        provider: provider.to_string(),
        base_url: base_url.to_string(),
        reasoning: false,
        input: vec![InputType::Text],
        cost: ModelCost::default(),
        context_window: 128_000,
        max_tokens: 8192,
        headers: HashMap::new(),
        compat: None,
    }
}

pub fn zai_model() -> Model {
    model("glm-4.7", "zai", "https://api.z.ai/api/coding/paas/v4")
}

pub fn openrouter_model() -> Model {
    model(
        "anthropic/claude-sonnet-4",
        "openrouter",
        "https://openrouter.ai/api/v1",
    )
}

pub fn gateway_model() -> Model {
    model(
        "anthropic/claude-opus-4.5",
        "vercel-ai-gateway",
        "https://ai-gateway.vercel.sh/v1",
    )
}

pub fn config_from(value: Value) -> Config {
    Config::from_value(value).expect("parse config fixture")
}

//! Agent handle - owns the provider every request goes through.
//!
//! The agent coordinates between:
//! - Provider: Makes LLM API calls (possibly wrapped, see [`crate::extra_params`])
//! - History: The messages exchanged so far
//!
//! A turn:
//! 1. Receive user input
//! 2. Build context (system prompt + history)
//! 3. Stream completion from provider
//! 4. Append the final assistant message

use crate::compat::normalize_model_compat;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extra_params::apply_extra_params_to_agent;
use crate::model::{AssistantMessage, Message, StreamEvent};
use crate::provider::{Context, EventStream, Model, Provider, StreamOptions};
use futures::StreamExt;
use std::sync::Arc;

// ============================================================================
// Provider Slot
// ============================================================================

/// Anything that holds the provider its requests are issued through.
///
/// The extra-params installer replaces the provider in this slot and touches
/// nothing else.
pub trait ProviderSlot {
    fn provider(&self) -> &Arc<dyn Provider>;

    fn set_provider(&mut self, provider: Arc<dyn Provider>);
}

// ============================================================================
// Agent Configuration
// ============================================================================

/// Configuration for the agent.
#[derive(Debug, Clone, Default)]
pub struct AgentConfig {
    /// System prompt to use for all requests.
    pub system_prompt: Option<String>,

    /// Default stream options.
    pub stream_options: StreamOptions,
}

// ============================================================================
// Agent Event
// ============================================================================

/// Events emitted by the agent during a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// Starting a new LLM request.
    RequestStart,

    /// Streaming text delta from the assistant.
    TextDelta { text: String },

    /// Error during execution.
    Error { error: String },

    /// Turn completed.
    Done { final_message: AssistantMessage },
}

// ============================================================================
// Agent
// ============================================================================

/// Minimal agent runtime: a provider, its options and the conversation.
pub struct Agent {
    /// The LLM provider.
    provider: Arc<dyn Provider>,

    /// Agent configuration.
    config: AgentConfig,

    /// Message history.
    messages: Vec<Message>,
}

impl Agent {
    /// Create a new agent with the given provider.
    pub fn new(provider: Arc<dyn Provider>, config: AgentConfig) -> Self {
        Self {
            provider,
            config,
            messages: Vec::new(),
        }
    }

    /// The provider requests currently go through.
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Get the current message history.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// System prompt and default per-call options this agent sends.
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn build_context(&self) -> Context {
        Context {
            system_prompt: self.config.system_prompt.clone(),
            messages: self.messages.clone(),
        }
    }

    /// Send one user message and stream the reply.
    pub async fn run(
        &mut self,
        prompt: impl Into<String>,
        on_event: impl Fn(AgentEvent) + Send + Sync,
    ) -> Result<AssistantMessage> {
        self.messages.push(Message::user(prompt));
        on_event(AgentEvent::RequestStart);

        let context = self.build_context();
        let mut stream = self
            .provider
            .stream(&context, &self.config.stream_options)
            .await?;

        let assistant_message = Self::process_stream(&mut stream, &on_event).await?;
        self.messages
            .push(Message::Assistant(assistant_message.clone()));
        on_event(AgentEvent::Done {
            final_message: assistant_message.clone(),
        });
        Ok(assistant_message)
    }

    /// Process a stream of events into an assistant message.
    async fn process_stream(
        stream: &mut EventStream,
        on_event: &(impl Fn(AgentEvent) + Send + Sync),
    ) -> Result<AssistantMessage> {
        let mut final_message: Option<AssistantMessage> = None;

        while let Some(event_result) = stream.next().await {
            match event_result? {
                StreamEvent::TextDelta { delta, .. } => {
                    on_event(AgentEvent::TextDelta { text: delta });
                }
                StreamEvent::Done { message, .. } => {
                    final_message = Some(message);
                }
                StreamEvent::Error { error, .. } => {
                    let error_msg = error
                        .error_message
                        .unwrap_or_else(|| "Unknown error".to_string());
                    on_event(AgentEvent::Error {
                        error: error_msg.clone(),
                    });
                    return Err(Error::api(error_msg));
                }
                StreamEvent::Start { .. } => {}
            }
        }

        final_message.ok_or_else(|| Error::api("Stream ended without Done event"))
    }
}

impl ProviderSlot for Agent {
    fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    fn set_provider(&mut self, provider: Arc<dyn Provider>) {
        self.provider = provider;
    }
}

/// Construct an agent for `model`: normalize its compat flags, build the
/// provider from the normalized descriptor, then install any configured
/// extra params keyed by the model's own provider name.
pub fn prepare_agent<F>(
    model: Model,
    cfg: Option<&Config>,
    config: AgentConfig,
    make_provider: F,
) -> (Model, Agent)
where
    F: FnOnce(&Model) -> Arc<dyn Provider>,
{
    let model = normalize_model_compat(model, cfg);
    let mut agent = Agent::new(make_provider(&model), config);
    apply_extra_params_to_agent(&mut agent, cfg, &model.provider, &model.id);
    (model, agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentBlock, StopReason, TextContent};
    use async_trait::async_trait;
    use futures::stream;
    use std::sync::Mutex;

    /// Replies with a fixed script of events and records what it was asked.
    struct ScriptedProvider {
        events: Vec<StreamEvent>,
        seen: Mutex<Vec<(usize, Option<f32>)>>,
    }

    impl ScriptedProvider {
        fn new(events: Vec<StreamEvent>) -> Self {
            Self {
                events,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn api(&self) -> &str {
            "openai-completions"
        }

        fn model_id(&self) -> &str {
            "scripted-1"
        }

        async fn stream(&self, context: &Context, options: &StreamOptions) -> Result<EventStream> {
            self.seen
                .lock()
                .expect("lock")
                .push((context.messages.len(), options.temperature));
            let events: Vec<Result<StreamEvent>> = self.events.iter().cloned().map(Ok).collect();
            Ok(Box::pin(stream::iter(events)))
        }
    }

    fn reply(text: &str) -> AssistantMessage {
        AssistantMessage {
            content: vec![ContentBlock::Text(TextContent::new(text))],
            provider: "scripted".to_string(),
            model: "scripted-1".to_string(),
            ..AssistantMessage::default()
        }
    }

    #[test]
    fn run_appends_user_and_assistant_messages() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            StreamEvent::Start {
                partial: AssistantMessage::default(),
            },
            StreamEvent::TextDelta {
                content_index: 0,
                delta: "hel".to_string(),
            },
            StreamEvent::Done {
                reason: StopReason::Stop,
                message: reply("hello"),
            },
        ]));
        let config = AgentConfig {
            system_prompt: Some("be brief".to_string()),
            stream_options: StreamOptions {
                temperature: Some(0.3),
                ..StreamOptions::default()
            },
        };
        let mut agent = Agent::new(provider.clone(), config);
        assert_eq!(agent.config().system_prompt.as_deref(), Some("be brief"));
        let events = Mutex::new(Vec::new());

        let message = futures::executor::block_on(agent.run("hi", |event| {
            events.lock().expect("lock").push(event);
        }))
        .expect("run");

        assert_eq!(message, reply("hello"));
        assert_eq!(agent.messages().len(), 2);
        assert_eq!(
            provider.seen.lock().expect("lock").as_slice(),
            &[(1, Some(0.3))]
        );
        let events = events.into_inner().expect("events");
        assert_eq!(events.first(), Some(&AgentEvent::RequestStart));
        assert!(events.contains(&AgentEvent::TextDelta {
            text: "hel".to_string()
        }));
    }

    #[test]
    fn run_surfaces_stream_errors() {
        let failed = AssistantMessage {
            error_message: Some("overloaded".to_string()),
            stop_reason: StopReason::Error,
            ..AssistantMessage::default()
        };
        let provider = Arc::new(ScriptedProvider::new(vec![StreamEvent::Error {
            reason: StopReason::Error,
            error: failed,
        }]));
        let mut agent = Agent::new(provider, AgentConfig::default());

        let err = futures::executor::block_on(agent.run("hi", |_| {})).expect_err("error");
        assert_eq!(err.to_string(), "API error: overloaded");
    }

    #[test]
    fn run_requires_done_event() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new()));
        let mut agent = Agent::new(provider, AgentConfig::default());
        let err = futures::executor::block_on(agent.run("hi", |_| {})).expect_err("error");
        assert!(err.to_string().contains("without Done"));
    }

    #[test]
    fn set_provider_swaps_the_slot() {
        let first: Arc<dyn Provider> = Arc::new(ScriptedProvider::new(Vec::new()));
        let second: Arc<dyn Provider> = Arc::new(ScriptedProvider::new(Vec::new()));
        let mut agent = Agent::new(Arc::clone(&first), AgentConfig::default());
        assert!(Arc::ptr_eq(agent.provider(), &first));

        ProviderSlot::set_provider(&mut agent, Arc::clone(&second));
        assert!(Arc::ptr_eq(agent.provider(), &second));
    }
}

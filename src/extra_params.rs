//! Per-model extra request parameters.
//!
//! `agents.defaults.models["<provider>/<model id>"].params` can carry request
//! overrides that should apply to every call an agent makes with that model:
//!
//! ```json
//! {
//!   "params": {
//!     "gateway": { "order": ["bedrock", "anthropic"], "only": ["bedrock"] },
//!     "temperature": 0.2,
//!     "maxTokens": 4096
//!   }
//! }
//! ```
//!
//! [`apply_extra_params_to_agent`] resolves that bag and, when it holds anything
//! actionable, swaps the agent's provider for a [`ParamInjectingProvider`] that
//! runs a fixed list of [`RequestStage`]s over each call's [`StreamOptions`]
//! before delegating to the original provider.
//!
//! Gateway routing only applies to the gateway backend (see
//! [`ExtraParamsInstaller`]); other providers get the request overrides alone.

use crate::agent::ProviderSlot;
use crate::config::{Config, model_config_key};
use crate::provider::{
    CacheRetention, Context, EventStream, KnownProvider, Provider, StreamOptions,
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Namespace under [`StreamOptions::provider_options`] for gateway routing.
pub const GATEWAY_OPTIONS_KEY: &str = "gateway";

/// Resolve the raw `params` bag for a provider/model pair.
///
/// The key is built from `provider` exactly as given. The value is returned as
/// stored, without any shape checks.
pub fn resolve_extra_params<'a>(
    cfg: Option<&'a Config>,
    provider: &str,
    model_id: &str,
) -> Option<&'a Value> {
    let key = model_config_key(provider, model_id);
    cfg?.agent_model(&key)?.params.as_ref()
}

// ============================================================================
// Parsed Params
// ============================================================================

/// Gateway routing preferences: which upstream providers to try, in what order.
///
/// Each list is `Some` only if the configured value was an array. An empty list
/// means "no preference", never "allow nothing".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayRouting {
    pub order: Option<Vec<String>>,
    pub only: Option<Vec<String>>,
    pub models: Option<Vec<String>>,
}

impl GatewayRouting {
    /// Read `order`/`only`/`models` from a `gateway` object, falling back to the
    /// flat `gatewayOrder`/`gatewayOnly`/`gatewayModels` spellings in `params`.
    fn from_params(params: &Map<String, Value>) -> Self {
        let nested = params.get(GATEWAY_OPTIONS_KEY).and_then(Value::as_object);
        let field = |name: &str, flat: &str| {
            nested
                .and_then(|gateway| gateway.get(name))
                .or_else(|| params.get(flat))
                .and_then(|value| string_list(value, name))
        };

        Self {
            order: field("order", "gatewayOrder"),
            only: field("only", "gatewayOnly"),
            models: field("models", "gatewayModels"),
        }
    }

    /// Whether at least one list carries an entry.
    pub fn has_preferences(&self) -> bool {
        self.entries().next().is_some()
    }

    /// Non-empty lists as `(field, value)` pairs.
    fn entries(&self) -> impl Iterator<Item = (&'static str, Value)> + '_ {
        [
            ("order", &self.order),
            ("only", &self.only),
            ("models", &self.models),
        ]
        .into_iter()
        .filter_map(|(name, list)| match list {
            Some(items) if !items.is_empty() => Some((name, Value::from(items.clone()))),
            _ => None,
        })
    }

    /// The JSON object injected under [`GATEWAY_OPTIONS_KEY`].
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.entries()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        )
    }
}

fn string_list(value: &Value, field: &str) -> Option<Vec<String>> {
    let Some(items) = value.as_array() else {
        tracing::debug!(field, "Ignoring non-array gateway option");
        return None;
    };
    Some(
        items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
    )
}

/// Scalar request overrides recognized in a params bag.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RequestOverrides {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub cache_retention: Option<CacheRetention>,
}

impl RequestOverrides {
    #[allow(clippy::cast_possible_truncation)] // temperatures are small
    fn from_params(params: &Map<String, Value>) -> Self {
        let temperature = params
            .get("temperature")
            .and_then(Value::as_f64)
            .filter(|t| t.is_finite())
            .map(|t| t as f32);
        let max_tokens = params
            .get("maxTokens")
            .or_else(|| params.get("max_tokens"))
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok());
        let cache_retention = params
            .get("cacheRetention")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse().ok());

        Self {
            temperature,
            max_tokens,
            cache_retention,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.max_tokens.is_none() && self.cache_retention.is_none()
    }
}

/// A params bag after defensive, per-field parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraParams {
    pub gateway: GatewayRouting,
    pub overrides: RequestOverrides,
}

impl ExtraParams {
    /// Parse a raw params value. Anything malformed is dropped field by field;
    /// a non-object value yields empty params.
    pub fn from_value(value: &Value) -> Self {
        let Some(params) = value.as_object() else {
            tracing::debug!("Ignoring extra params: expected an object");
            return Self::default();
        };
        Self {
            gateway: GatewayRouting::from_params(params),
            overrides: RequestOverrides::from_params(params),
        }
    }

    /// Whether these params justify wrapping the agent's provider.
    pub fn wants_wrapper(&self) -> bool {
        self.gateway.has_preferences() || !self.overrides.is_empty()
    }

    /// Injection stages for these params, in application order.
    pub fn stages(&self) -> Vec<Arc<dyn RequestStage>> {
        let mut stages: Vec<Arc<dyn RequestStage>> = Vec::new();
        if self.gateway.has_preferences() {
            stages.push(Arc::new(GatewayRoutingStage::new(self.gateway.clone())));
        }
        if !self.overrides.is_empty() {
            stages.push(Arc::new(RequestOverridesStage::new(self.overrides)));
        }
        stages
    }
}

// ============================================================================
// Request Stages
// ============================================================================

/// A pure transformation of one call's options.
pub trait RequestStage: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn apply(&self, options: StreamOptions) -> StreamOptions;
}

/// Adds gateway routing lists under `provider_options.gateway`.
///
/// Lists the call already sets are kept as-is.
#[derive(Debug, Clone)]
pub struct GatewayRoutingStage {
    routing: GatewayRouting,
}

impl GatewayRoutingStage {
    pub const fn new(routing: GatewayRouting) -> Self {
        Self { routing }
    }
}

impl RequestStage for GatewayRoutingStage {
    fn name(&self) -> &'static str {
        "gateway-routing"
    }

    fn apply(&self, mut options: StreamOptions) -> StreamOptions {
        let slot = options
            .provider_options
            .entry(GATEWAY_OPTIONS_KEY)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(gateway) = slot {
            for (name, value) in self.routing.entries() {
                gateway.entry(name).or_insert(value);
            }
        } else {
            tracing::debug!("Call supplied a non-object gateway option; leaving it as-is");
        }
        options
    }
}

/// Fills temperature, max tokens and cache retention the call left unset.
#[derive(Debug, Clone, Copy)]
pub struct RequestOverridesStage {
    overrides: RequestOverrides,
}

impl RequestOverridesStage {
    pub const fn new(overrides: RequestOverrides) -> Self {
        Self { overrides }
    }
}

impl RequestStage for RequestOverridesStage {
    fn name(&self) -> &'static str {
        "request-overrides"
    }

    fn apply(&self, mut options: StreamOptions) -> StreamOptions {
        options.temperature = options.temperature.or(self.overrides.temperature);
        options.max_tokens = options.max_tokens.or(self.overrides.max_tokens);
        if let (CacheRetention::None, Some(retention)) =
            (options.cache_retention, self.overrides.cache_retention)
        {
            options.cache_retention = retention;
        }
        options
    }
}

// ============================================================================
// Injecting Provider
// ============================================================================

/// Provider decorator that runs request stages before delegating.
///
/// Identity (`name`, `api`, `model_id`), the returned stream and any error all
/// come straight from the wrapped provider.
pub struct ParamInjectingProvider {
    inner: Arc<dyn Provider>,
    stages: Vec<Arc<dyn RequestStage>>,
}

impl ParamInjectingProvider {
    pub fn new(inner: Arc<dyn Provider>) -> Self {
        Self {
            inner,
            stages: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_stage(mut self, stage: Arc<dyn RequestStage>) -> Self {
        self.stages.push(stage);
        self
    }

    #[must_use]
    pub fn with_stages(mut self, stages: impl IntoIterator<Item = Arc<dyn RequestStage>>) -> Self {
        self.stages.extend(stages);
        self
    }

    /// The provider calls are forwarded to.
    pub fn inner(&self) -> &Arc<dyn Provider> {
        &self.inner
    }

    pub fn stages(&self) -> &[Arc<dyn RequestStage>] {
        &self.stages
    }

    /// Run every stage over a copy of `options`.
    pub fn prepare(&self, options: &StreamOptions) -> StreamOptions {
        self.stages
            .iter()
            .fold(options.clone(), |options, stage| stage.apply(options))
    }
}

impl std::fmt::Debug for ParamInjectingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamInjectingProvider")
            .field("provider", &self.inner.name())
            .field("model_id", &self.inner.model_id())
            .field("stages", &self.stages)
            .finish()
    }
}

#[async_trait]
impl Provider for ParamInjectingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn api(&self) -> &str {
        self.inner.api()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    async fn stream(
        &self,
        context: &Context,
        options: &StreamOptions,
    ) -> crate::error::Result<EventStream> {
        let options = self.prepare(options);
        self.inner.stream(context, &options).await
    }
}

// ============================================================================
// Installer
// ============================================================================

/// Installs extra-params wrappers on agents.
///
/// Gateway routing lists are only honoured for the gateway backend; for any
/// other provider they are ignored and only request overrides apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraParamsInstaller {
    gateway_provider: String,
}

impl Default for ExtraParamsInstaller {
    fn default() -> Self {
        Self {
            gateway_provider: KnownProvider::VercelAiGateway.to_string(),
        }
    }
}

impl ExtraParamsInstaller {
    /// Treat `provider` as the gateway backend instead of `vercel-ai-gateway`.
    #[must_use]
    pub fn with_gateway_provider(mut self, provider: impl Into<String>) -> Self {
        self.gateway_provider = provider.into();
        self
    }

    pub fn gateway_provider(&self) -> &str {
        &self.gateway_provider
    }

    /// Params for `provider`/`model_id` with gateway lists removed when
    /// `provider` is not the gateway backend.
    pub fn params_for(&self, cfg: Option<&Config>, provider: &str, model_id: &str) -> ExtraParams {
        let Some(raw) = resolve_extra_params(cfg, provider, model_id) else {
            return ExtraParams::default();
        };

        let mut params = ExtraParams::from_value(raw);
        if provider != self.gateway_provider && params.gateway.has_preferences() {
            tracing::debug!(provider, model_id, "Ignoring gateway options for non-gateway provider");
            params.gateway = GatewayRouting::default();
        }
        params
    }

    /// Wrap the agent's provider when the configured params for
    /// `provider`/`model_id` contain applicable gateway routing or request
    /// overrides.
    ///
    /// Returns `true` when a wrapper was installed. Otherwise the agent's
    /// provider is left exactly as it was (same `Arc`).
    pub fn install<S>(
        &self,
        agent: &mut S,
        cfg: Option<&Config>,
        provider: &str,
        model_id: &str,
    ) -> bool
    where
        S: ProviderSlot + ?Sized,
    {
        let params = self.params_for(cfg, provider, model_id);
        if !params.wants_wrapper() {
            return false;
        }

        let stages = params.stages();
        tracing::debug!(
            provider,
            model_id,
            stages = ?stages.iter().map(|stage| stage.name()).collect::<Vec<_>>(),
            "Installing extra params wrapper"
        );

        let original = Arc::clone(agent.provider());
        let wrapped = ParamInjectingProvider::new(original).with_stages(stages);
        agent.set_provider(Arc::new(wrapped));
        true
    }
}

/// [`ExtraParamsInstaller::install`] with `vercel-ai-gateway` as the gateway.
pub fn apply_extra_params_to_agent<S>(
    agent: &mut S,
    cfg: Option<&Config>,
    provider: &str,
    model_id: &str,
) -> bool
where
    S: ProviderSlot + ?Sized,
{
    ExtraParamsInstaller::default().install(agent, cfg, provider, model_id)
}

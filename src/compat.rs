//! Model compat normalization for provider-specific quirks.
//!
//! A [`CompatNormalizer`] is an ordered table of [`CompatRule`]s. Each rule pairs
//! a predicate over the model descriptor (provider name or base URL host, plus
//! wire-protocol family) with an action on its `compat` record. Rules are
//! evaluated in order and the first one whose predicate matches decides the
//! outcome; later rules are not consulted.
//!
//! The default table knows two backends:
//! - Z.ai: the `developer` chat role is rejected, so `supportsDeveloperRole` is
//!   forced off.
//! - OpenRouter: provider routing preferences configured under
//!   `agents.defaults.models["openrouter/<model id>"].provider` are copied into
//!   `compat.openRouterRouting`.

use crate::config::{Config, model_config_key};
use crate::provider::{Api, KnownProvider, Model};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Compat Record
// ============================================================================

/// Per-model overrides for deviations from a wire protocol's default behavior.
///
/// Keys this crate does not model are kept in [`CompatConfig::extra`] so they
/// survive normalization and serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_store: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_developer_role: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_reasoning_effort: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_usage_in_streaming: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_router_routing: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vercel_gateway_routing: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CompatConfig {
    /// Routing preferences stored for the given backend family.
    pub fn routing(&self, target: RoutingTarget) -> Option<&Value> {
        match target {
            RoutingTarget::OpenRouter => self.open_router_routing.as_ref(),
            RoutingTarget::VercelGateway => self.vercel_gateway_routing.as_ref(),
        }
    }

    fn routing_mut(&mut self, target: RoutingTarget) -> &mut Option<Value> {
        match target {
            RoutingTarget::OpenRouter => &mut self.open_router_routing,
            RoutingTarget::VercelGateway => &mut self.vercel_gateway_routing,
        }
    }
}

// ============================================================================
// Rules
// ============================================================================

/// Which `compat` routing slot a routing rule writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingTarget {
    /// `compat.openRouterRouting`
    OpenRouter,
    /// `compat.vercelGatewayRouting`
    VercelGateway,
}

/// What a matching rule does to the model's `compat` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompatAction {
    /// Force `supportsDeveloperRole` to `false`.
    DisableDeveloperRole,
    /// Copy `agents.defaults.models["<key_prefix>/<model id>"].provider` into
    /// the routing slot named by `target`.
    RoutingFromConfig {
        key_prefix: String,
        target: RoutingTarget,
    },
}

/// One entry of the normalization table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatRule {
    /// Provider name that selects this rule.
    pub provider: String,
    /// Base URL fragment that also selects this rule.
    pub host_fragment: Option<String>,
    /// Wire-protocol family the quirk applies to.
    pub api: Api,
    pub action: CompatAction,
}

impl CompatRule {
    /// Rule forcing `supportsDeveloperRole: false` for an OpenAI-completions backend.
    pub fn disable_developer_role(provider: &KnownProvider) -> Self {
        Self {
            provider: provider.to_string(),
            host_fragment: provider.host_fragment().map(str::to_string),
            api: Api::OpenAICompletions,
            action: CompatAction::DisableDeveloperRole,
        }
    }

    /// Rule copying configured routing preferences for an OpenAI-completions
    /// backend. The config key is prefixed with the backend's canonical name.
    pub fn routing_from_config(provider: &KnownProvider, target: RoutingTarget) -> Self {
        Self {
            provider: provider.to_string(),
            host_fragment: provider.host_fragment().map(str::to_string),
            api: Api::OpenAICompletions,
            action: CompatAction::RoutingFromConfig {
                key_prefix: provider.to_string(),
                target,
            },
        }
    }

    /// Use a different prefix when building the config key for a routing rule.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        if let CompatAction::RoutingFromConfig { key_prefix, .. } = &mut self.action {
            *key_prefix = prefix.into();
        }
        self
    }

    /// Whether this rule selects the given model.
    pub fn matches(&self, model: &Model) -> bool {
        let backend = model.provider == self.provider
            || self
                .host_fragment
                .as_deref()
                .is_some_and(|fragment| model.base_url.contains(fragment));
        backend && model.speaks(&self.api)
    }

    /// Apply the action. Returns `true` when `model.compat` changed.
    fn apply(&self, model: &mut Model, cfg: Option<&Config>) -> bool {
        match &self.action {
            CompatAction::DisableDeveloperRole => {
                if model
                    .compat
                    .as_ref()
                    .is_some_and(|compat| compat.supports_developer_role == Some(false))
                {
                    return false;
                }
                model
                    .compat
                    .get_or_insert_with(CompatConfig::default)
                    .supports_developer_role = Some(false);
                true
            }
            CompatAction::RoutingFromConfig { key_prefix, target } => {
                let key = model_config_key(key_prefix, &model.id);
                let Some(routing) = cfg
                    .and_then(|cfg| cfg.agent_model(&key))
                    .and_then(|entry| entry.provider.as_ref())
                    .filter(|value| is_present(value))
                else {
                    return false;
                };

                let slot = model
                    .compat
                    .get_or_insert_with(CompatConfig::default)
                    .routing_mut(*target);
                if slot.as_ref() == Some(routing) {
                    return false;
                }
                *slot = Some(routing.clone());
                true
            }
        }
    }
}

/// A routing value counts only when it carries something.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

// ============================================================================
// Normalizer
// ============================================================================

/// Ordered rule table; the first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatNormalizer {
    rules: Vec<CompatRule>,
}

impl Default for CompatNormalizer {
    fn default() -> Self {
        Self {
            rules: vec![
                CompatRule::disable_developer_role(&KnownProvider::Zai),
                CompatRule::routing_from_config(
                    &KnownProvider::OpenRouter,
                    RoutingTarget::OpenRouter,
                ),
            ],
        }
    }
}

impl CompatNormalizer {
    /// A normalizer with no rules; every model passes through unchanged.
    pub const fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule at the lowest priority.
    #[must_use]
    pub fn with_rule(mut self, rule: CompatRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[CompatRule] {
        &self.rules
    }

    /// Normalize `model` in place. Returns `true` when its `compat` changed.
    pub fn normalize_in_place(&self, model: &mut Model, cfg: Option<&Config>) -> bool {
        let Some(rule) = self.rules.iter().find(|rule| rule.matches(model)) else {
            return false;
        };

        let changed = rule.apply(model, cfg);
        if changed {
            tracing::debug!(
                provider = %rule.provider,
                action = ?rule.action,
                model = %model.id,
                "Normalized model compat"
            );
        }
        changed
    }

    /// Normalize and hand the model back.
    pub fn normalize(&self, mut model: Model, cfg: Option<&Config>) -> Model {
        self.normalize_in_place(&mut model, cfg);
        model
    }
}

/// Normalize model compat settings with the default rule table.
pub fn normalize_model_compat(model: Model, cfg: Option<&Config>) -> Model {
    CompatNormalizer::default().normalize(model, cfg)
}

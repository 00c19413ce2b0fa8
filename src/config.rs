//! Configuration tree consumed by the compat and extra-params layers.
//!
//! Only one path is read: `agents.defaults.models[<provider>/<model id>]`,
//! whose entries may carry a `provider` routing preference (passed through
//! verbatim) and a free-form `params` bag of request overrides.
//!
//! Sections that do not have the expected shape are dropped while loading
//! instead of failing the whole file, so a typo under one model entry never
//! disables every other entry.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Build the composite key used to index `agents.defaults.models`.
pub fn model_config_key(provider: &str, model_id: &str) -> String {
    format!("{provider}/{model_id}")
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub agents: Option<AgentsConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub defaults: Option<AgentDefaults>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentDefaults {
    /// Per-model entries keyed by [`model_config_key`].
    #[serde(
        deserialize_with = "lenient_models",
        skip_serializing_if = "Option::is_none"
    )]
    pub models: Option<BTreeMap<String, AgentModelConfig>>,
}

/// One entry of `agents.defaults.models`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentModelConfig {
    /// Display alias for the model. A non-string value loads as `None`.
    #[serde(
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub alias: Option<String>,
    /// Upstream routing preference (e.g. OpenRouter `provider` object).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<Value>,
    /// Extra request parameters; see [`crate::extra_params`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| parse_or_warn(value, "section")))
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Ok(Some(text)),
        Some(other) => {
            tracing::warn!(value = %other, "Ignoring non-string config value");
            Ok(None)
        }
        None => Ok(None),
    }
}

fn lenient_models<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<BTreeMap<String, AgentModelConfig>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let Value::Object(entries) = value else {
        tracing::warn!("Ignoring agents.defaults.models: expected an object");
        return Ok(None);
    };

    let models = entries
        .into_iter()
        .filter_map(|(key, entry)| parse_or_warn(entry, &key).map(|entry| (key, entry)))
        .collect();
    Ok(Some(models))
}

fn parse_or_warn<T: DeserializeOwned>(value: Value, what: &str) -> Option<T> {
    // serde would otherwise accept a JSON array as a struct in field order.
    if !value.is_object() {
        tracing::warn!(entry = what, "Ignoring config entry: expected an object");
        return None;
    }
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            tracing::warn!(entry = what, error = %err, "Ignoring malformed config entry");
            None
        }
    }
}

impl Config {
    /// Parse an already-loaded JSON document.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::validation("Settings root is not a JSON object"));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Get the project configuration directory.
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".pi")
    }

    /// Load settings from a specific path. Missing or blank files load as defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_json::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse settings file {}: {e}",
                path.display()
            ))
        })?;
        Ok(config)
    }

    /// Load from an explicit path, or merge `<global_dir>/settings.json` with
    /// `<cwd>/.pi/settings.json` (project entries win).
    pub fn load_with_roots(
        config_path: Option<&Path>,
        global_dir: &Path,
        cwd: &Path,
    ) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_path(path);
        }

        let global = Self::load_from_path(&global_dir.join("settings.json"))?;
        let project = Self::load_from_path(&cwd.join(Self::project_dir()).join("settings.json"))?;
        Ok(Self::merge(global, project))
    }

    /// Merge two configs, `other` taking precedence per model entry field.
    pub fn merge(base: Self, other: Self) -> Self {
        let base_models = base.into_models();
        let other_models = other.into_models();
        let models = merge_models(base_models, other_models);

        if models.is_none() {
            return Self::default();
        }
        Self {
            agents: Some(AgentsConfig {
                defaults: Some(AgentDefaults { models }),
            }),
        }
    }

    fn into_models(self) -> Option<BTreeMap<String, AgentModelConfig>> {
        self.agents?.defaults?.models
    }

    /// All configured model entries.
    pub fn agent_models(&self) -> Option<&BTreeMap<String, AgentModelConfig>> {
        self.agents.as_ref()?.defaults.as_ref()?.models.as_ref()
    }

    /// Look up one model entry by composite key.
    pub fn agent_model(&self, key: &str) -> Option<&AgentModelConfig> {
        self.agent_models()?.get(key)
    }

    /// Insert or replace a model entry.
    #[must_use]
    pub fn with_agent_model(mut self, key: impl Into<String>, entry: AgentModelConfig) -> Self {
        self.agents
            .get_or_insert_with(AgentsConfig::default)
            .defaults
            .get_or_insert_with(AgentDefaults::default)
            .models
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), entry);
        self
    }
}

fn merge_models(
    base: Option<BTreeMap<String, AgentModelConfig>>,
    other: Option<BTreeMap<String, AgentModelConfig>>,
) -> Option<BTreeMap<String, AgentModelConfig>> {
    match (base, other) {
        (Some(mut base), Some(other)) => {
            for (key, entry) in other {
                let merged = match base.remove(&key) {
                    Some(existing) => merge_model_entry(existing, entry),
                    None => entry,
                };
                base.insert(key, merged);
            }
            Some(base)
        }
        (None, Some(other)) => Some(other),
        (Some(base), None) => Some(base),
        (None, None) => None,
    }
}

fn merge_model_entry(base: AgentModelConfig, other: AgentModelConfig) -> AgentModelConfig {
    AgentModelConfig {
        alias: other.alias.or(base.alias),
        provider: other.provider.or(base.provider),
        params: other.params.or(base.params),
    }
}

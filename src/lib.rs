//! pi-compat - provider quirk normalization and per-model parameter injection.
//!
//! Two independent pieces meet when an agent is constructed:
//! - [`compat`] rewrites a [`Model`]'s `compat` flags for backends with known
//!   quirks (Z.ai rejects the `developer` role; OpenRouter accepts routing
//!   preferences from config).
//! - [`extra_params`] looks up `agents.defaults.models["<provider>/<model>"].params`
//!   and, when it carries gateway routing or request overrides, wraps the
//!   agent's [`Provider`] so every call picks them up.
//!
//! [`agent::prepare_agent`] shows the intended composition.
//!
//! Neither piece performs I/O or fails: absent or malformed configuration means
//! "nothing to do".

#![forbid(unsafe_code)]
#![allow(
    clippy::must_use_candidate,
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod agent;
pub mod compat;
pub mod config;
pub mod error;
pub mod extra_params;
pub mod model;
pub mod provider;

pub use agent::{Agent, AgentConfig, ProviderSlot, prepare_agent};
pub use compat::{CompatConfig, CompatNormalizer, CompatRule, normalize_model_compat};
pub use config::{Config, model_config_key};
pub use error::{Error, Result};
pub use extra_params::{
    ExtraParams, ExtraParamsInstaller, ParamInjectingProvider, apply_extra_params_to_agent,
    resolve_extra_params,
};
pub use provider::{Model, Provider, StreamOptions};

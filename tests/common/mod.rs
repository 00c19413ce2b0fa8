//! Common test infrastructure for pi-compat integration tests.
//!
//! - [`run_async`] drives a future to completion on the current thread
//! - [`mocks`] provides a spy provider and model/config fixtures

use std::future::Future;

pub mod mocks;

#[allow(unused_imports)]
pub use mocks::{SpyProvider, config_from, openrouter_model, zai_model};

/// Runs an async future to completion on the current thread.
#[allow(dead_code)]
pub fn run_async<T, Fut>(future: Fut) -> T
where
    Fut: Future<Output = T>,
{
    futures::executor::block_on(future)
}

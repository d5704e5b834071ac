use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::executor::types::{ArgMap, CapabilityError};

/// An external operation a task invokes (search, file I/O, code execution, ...).
#[async_trait]
pub trait Capability: Send + Sync {
    /// Registry name (matches `Task::capability`)
    fn name(&self) -> &str;

    /// Invoke with already-resolved arguments.
    async fn invoke(&self, args: &ArgMap) -> Result<Value, CapabilityError>;
}

/// Adapter turning a synchronous closure into a [`Capability`].
///
/// The closure runs on tokio's blocking pool, so a closure that blocks
/// still honors the per-task timeout and never stalls a runtime worker.
pub struct FnCapability<F> {
    name: String,
    func: Arc<F>,
}

impl<F> FnCapability<F>
where
    F: Fn(&ArgMap) -> Result<Value, CapabilityError> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }
}

#[async_trait]
impl<F> Capability for FnCapability<F>
where
    F: Fn(&ArgMap) -> Result<Value, CapabilityError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, args: &ArgMap) -> Result<Value, CapabilityError> {
        let func = self.func.clone();
        let args = args.clone();
        match tokio::task::spawn_blocking(move || func(&args)).await {
            Ok(result) => result,
            // Re-raise so the scheduler reports it like any other panic
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => Err(CapabilityError::Failed(err.to_string())),
        }
    }
}

pub type CapabilityFuture = Pin<Box<dyn Future<Output = Result<Value, CapabilityError>> + Send>>;

/// Adapter turning an async closure (taking owned args) into a [`Capability`].
pub struct AsyncFnCapability<F> {
    name: String,
    func: F,
}

impl<F> AsyncFnCapability<F>
where
    F: Fn(ArgMap) -> CapabilityFuture + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

#[async_trait]
impl<F> Capability for AsyncFnCapability<F>
where
    F: Fn(ArgMap) -> CapabilityFuture + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, args: &ArgMap) -> Result<Value, CapabilityError> {
        (self.func)(args.clone()).await
    }
}

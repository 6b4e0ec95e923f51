//! Executable steps: test bodies and hooks

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::error::StepResult;

/// A test body or hook
#[async_trait]
pub trait Step: Send + Sync {
    async fn invoke(&self, ctx: &ExecutionContext) -> StepResult;
}

/// Steps are shared between the tree and the scheduler
pub type SharedStep = Arc<dyn Step>;

/// Synchronous closure step
pub struct FnStep<F>(F);

#[async_trait]
impl<F> Step for FnStep<F>
where
    F: Fn(&ExecutionContext) -> StepResult + Send + Sync,
{
    async fn invoke(&self, ctx: &ExecutionContext) -> StepResult {
        (self.0)(ctx)
    }
}

/// Async closure step; receives its own copy of the context
pub struct AsyncFnStep<F>(F);

#[async_trait]
impl<F, Fut> Step for AsyncFnStep<F>
where
    F: Fn(ExecutionContext) -> Fut + Send + Sync,
    Fut: Future<Output = StepResult> + Send,
{
    async fn invoke(&self, ctx: &ExecutionContext) -> StepResult {
        (self.0)(ctx.clone()).await
    }
}

/// Wrap a synchronous closure as a step
pub fn from_fn<F>(f: F) -> SharedStep
where
    F: Fn(&ExecutionContext) -> StepResult + Send + Sync + 'static,
{
    Arc::new(FnStep(f))
}

/// Wrap an async closure as a step
pub fn from_async<F, Fut>(f: F) -> SharedStep
where
    F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StepResult> + Send + 'static,
{
    Arc::new(AsyncFnStep(f))
}

//! Tool Executor port
//!
//! Defines the interface for invoking tools under the uniform tool contract.

use async_trait::async_trait;
use sciquorum_domain::{ExecutionResult, ParamTemplate, Parameters, TemplateContext, ToolDescriptor};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One link of a tool chain: a tool plus the template for its parameters
#[derive(Debug, Clone)]
pub struct ChainLink {
    pub descriptor: Arc<ToolDescriptor>,
    pub template: ParamTemplate,
}

impl ChainLink {
    pub fn new(descriptor: Arc<ToolDescriptor>, template: ParamTemplate) -> Self {
        Self {
            descriptor,
            template,
        }
    }
}

/// Port for tool invocation
///
/// Failures are reported through [`ExecutionResult`] status, never as Rust
/// errors. Implementations do not retry.
#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// Invoke one tool, bounded by `timeout` and aborted when `cancel` fires.
    async fn invoke(
        &self,
        descriptor: &ToolDescriptor,
        params: &Parameters,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ExecutionResult;

    /// Invoke `links` in order, threading each payload into the next link's
    /// template as `{{prev}}`.
    ///
    /// The first non-`Ok` result halts the chain. Every result gathered so
    /// far, including the failing one, is returned.
    async fn invoke_chain(
        &self,
        links: &[ChainLink],
        seed: Value,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(links.len());
        let mut prev: Option<Value> = None;

        for link in links {
            let mut ctx = TemplateContext::new().with_seed(seed.clone());
            if let Some(p) = prev.take() {
                ctx = ctx.with_prev(p);
            }
            let params = link.template.render(&ctx);
            let result = self.invoke(&link.descriptor, &params, timeout, cancel).await;
            let halted = !result.is_ok();
            prev = result.payload().cloned();
            results.push(result);
            if halted {
                break;
            }
        }

        results
    }
}

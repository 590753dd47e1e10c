/*!
 * INFERENCE PROXY - Relays generate/chat/pull to a chosen node
 *
 * ROLE: resolve the node, forward the request (stream=false), time the call
 * and derive throughput from the endpoint's eval counters.
 *
 * CONTRACT: unlike the health prober, every failure propagates as a
 * `FleetError`. An empty reply is never fabricated for a failed request.
 */

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::TimeoutsConf;
use crate::error::{FleetError, FleetResult};
use crate::models::{ChatMessage, InferenceResult, NodeDescriptor, PullOutcome, PullStatus};
use crate::registry::NodeRegistry;
use crate::transport::HttpTransport;
use crate::wire::{ChatRequest, CompletionResponse, GenerateRequest, PullRequest, PATH_CHAT, PATH_GENERATE, PATH_PULL};

const ERROR_BODY_PREVIEW: usize = 512;

#[derive(Debug, Clone, Copy)]
pub struct ProxySettings {
    pub completion_timeout: Duration,
    pub pull_timeout: Duration,
}

impl From<&TimeoutsConf> for ProxySettings {
    fn from(t: &TimeoutsConf) -> Self {
        Self {
            completion_timeout: t.generate(),
            pull_timeout: t.pull(),
        }
    }
}

#[derive(Clone)]
pub struct InferenceProxy {
    registry: Arc<NodeRegistry>,
    http: HttpTransport,
    settings: ProxySettings,
}

impl InferenceProxy {
    pub fn new(registry: Arc<NodeRegistry>, http: HttpTransport, settings: ProxySettings) -> Self {
        Self { registry, http, settings }
    }

    pub async fn generate(&self, node_id: &str, model: &str, prompt: &str) -> FleetResult<InferenceResult> {
        let node = self.registry.resolve(node_id)?;
        let body = GenerateRequest { model, prompt, stream: false };
        self.complete(node, PATH_GENERATE, &body, model).await
    }

    pub async fn chat(&self, node_id: &str, model: &str, messages: &[ChatMessage]) -> FleetResult<InferenceResult> {
        let node = self.registry.resolve(node_id)?;
        let body = ChatRequest { model, messages, stream: false };
        self.complete(node, PATH_CHAT, &body, model).await
    }

    /// `failed` on any non-200 answer, whatever the body says. Transport
    /// failures (timeout, refused) are errors, not a `failed` outcome.
    pub async fn pull_model(&self, node_id: &str, model: &str) -> FleetResult<PullOutcome> {
        let node = self.registry.resolve(node_id)?;
        let body = PullRequest { name: model, stream: false };
        let started = Instant::now();
        let resp = self
            .http
            .post_json(&node.url(PATH_PULL), &body, self.settings.pull_timeout)
            .await?;

        let status = if resp.status == 200 { PullStatus::Success } else { PullStatus::Failed };
        info!(
            "pull {model} on {}: {:?} (HTTP {}, {}ms)",
            node.id,
            status,
            resp.status,
            started.elapsed().as_millis()
        );
        Ok(PullOutcome { status, detail: resp.body })
    }

    async fn complete<T: Serialize + ?Sized>(
        &self,
        node: &NodeDescriptor,
        path: &str,
        body: &T,
        model: &str,
    ) -> FleetResult<InferenceResult> {
        let request_id = Uuid::new_v4();
        info!("[{request_id}] {path} -> {} ({model})", node.id);

        let started = Instant::now();
        let resp = self
            .http
            .post_json(&node.url(path), body, self.settings.completion_timeout)
            .await
            .inspect_err(|e| warn!("[{request_id}] {path} on {} failed: {e}", node.id))?;
        let latency_ms = started.elapsed().as_millis() as u64;

        if !resp.is_success() {
            let err = FleetError::Network(format!(
                "{path} returned HTTP {}: {}",
                resp.status,
                preview(&resp.body)
            ));
            warn!("[{request_id}] {err}");
            return Err(err);
        }

        let parsed: CompletionResponse = serde_json::from_str(&resp.body)
            .map_err(|e| FleetError::Parse(format!("{path} response: {e}")))?;
        let tokens_per_second = parsed.tokens_per_second();

        info!(
            "[{request_id}] {} answered in {latency_ms}ms ({} tok/s)",
            node.id,
            tokens_per_second.map(|t| t.to_string()).unwrap_or_else(|| "n/a".into())
        );

        Ok(InferenceResult {
            response: parsed.text(),
            model: parsed.model.clone().unwrap_or_else(|| model.to_string()),
            node_id: node.id.clone(),
            latency_ms,
            eval_count: parsed.eval_count,
            eval_duration: parsed.eval_duration,
            tokens_per_second,
        })
    }
}

fn preview(body: &str) -> &str {
    let body = body.trim();
    match body.char_indices().nth(ERROR_BODY_PREVIEW) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_cuts_long_bodies_on_char_boundaries() {
        let long = "é".repeat(ERROR_BODY_PREVIEW + 10);
        assert_eq!(preview(&long).chars().count(), ERROR_BODY_PREVIEW);
        assert_eq!(preview("  short \n"), "short");
    }
}

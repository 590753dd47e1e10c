#![allow(dead_code)]

use fleet_kernel::config::{FleetConfig, NodeConf, TimeoutsConf};
use fleet_kernel::{
    AppState, FleetAggregator, FleetError, FleetResult, HealthProber, HttpTransport, InferenceProxy,
    NodeRegistry, ProbeSettings, ProxySettings, RemoteShell, ShellOutput,
};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const UNREACHABLE: &str = "http://127.0.0.1:1";

/// One node of a test fleet: (id, endpoint, remote target).
pub struct TestNode {
    pub id: &'static str,
    pub endpoint: String,
    pub remote: Option<&'static str>,
}

pub fn node(id: &'static str, endpoint: impl Into<String>) -> TestNode {
    TestNode { id, endpoint: endpoint.into(), remote: None }
}

pub fn remote_node(id: &'static str, endpoint: impl Into<String>, target: &'static str) -> TestNode {
    TestNode { id, endpoint: endpoint.into(), remote: Some(target) }
}

pub fn fleet_config(nodes: Vec<TestNode>, timeouts: TimeoutsConf) -> FleetConfig {
    FleetConfig {
        nodes: nodes
            .into_iter()
            .map(|n| {
                (
                    n.id.to_string(),
                    NodeConf {
                        name: Some(format!("{} node", n.id)),
                        endpoint: n.endpoint,
                        remote: n.remote.map(String::from),
                        icon: String::new(),
                        gpu: "test-gpu".into(),
                        role: "Compute".into(),
                    },
                )
            })
            .collect(),
        timeouts,
        ..FleetConfig::default()
    }
}

pub fn fast_timeouts() -> TimeoutsConf {
    TimeoutsConf {
        probe_ms: 500,
        shell_ms: 500,
        generate_ms: 2_000,
        pull_ms: 2_000,
    }
}

pub fn registry(nodes: Vec<TestNode>) -> Arc<NodeRegistry> {
    Arc::new(NodeRegistry::from_config(&fleet_config(nodes, fast_timeouts())).unwrap())
}

pub fn aggregator(registry: Arc<NodeRegistry>, shell: Arc<dyn RemoteShell>) -> FleetAggregator {
    let prober = HealthProber::new(
        registry,
        HttpTransport::new().unwrap(),
        shell,
        ProbeSettings::from(&fast_timeouts()),
    );
    FleetAggregator::new(prober)
}

pub fn proxy(registry: Arc<NodeRegistry>) -> InferenceProxy {
    InferenceProxy::new(registry, HttpTransport::new().unwrap(), ProxySettings::from(&fast_timeouts()))
}

pub fn app_state(registry: Arc<NodeRegistry>, shell: Arc<dyn RemoteShell>) -> AppState {
    AppState::new(registry, HttpTransport::new().unwrap(), shell, &fast_timeouts())
}

/// Inference endpoint that answers liveness and lists the given models.
pub async fn healthy_endpoint(models: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Ollama is running"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "models": models })))
        .mount(&server)
        .await;
    server
}

/// Endpoint whose liveness answer arrives after `delay`.
pub async fn slow_endpoint(delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(delay))
        .mount(&server)
        .await;
    server
}

/// In-memory remote shell: canned output per target, honours the call timeout.
#[derive(Default)]
pub struct ScriptedShell {
    replies: HashMap<String, (Duration, FleetResult<String>)>,
    calls: AtomicUsize,
}

impl ScriptedShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, target: &str, stdout: &str) -> Self {
        self.replies.insert(target.into(), (Duration::ZERO, Ok(stdout.into())));
        self
    }

    pub fn fail(mut self, target: &str, err: FleetError) -> Self {
        self.replies.insert(target.into(), (Duration::ZERO, Err(err)));
        self
    }

    pub fn hang(mut self, target: &str, delay: Duration) -> Self {
        self.replies.insert(target.into(), (delay, Ok(String::new())));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RemoteShell for ScriptedShell {
    fn run<'a>(&'a self, target: &'a str, _command: &'a str, timeout: Duration) -> BoxFuture<'a, FleetResult<ShellOutput>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            let Some((delay, reply)) = self.replies.get(target) else {
                return Err(FleetError::Execution(format!("ssh: could not resolve {target}")));
            };
            if *delay > timeout {
                tokio::time::sleep(timeout).await;
                return Err(FleetError::Timeout(timeout));
            }
            tokio::time::sleep(*delay).await;
            reply.clone().map(|stdout| ShellOutput { stdout, stderr: String::new() })
        })
    }
}

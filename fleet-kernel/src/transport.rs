//! Transport adapters: bounded HTTP calls to inference endpoints and bounded
//! command execution over the remote shell.
//!
//! Single attempt per call, no retries. Whether a failure means "node offline"
//! or "request failed" is decided by the caller.

use futures::future::BoxFuture;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

use crate::config::ShellConf;
use crate::error::{FleetError, FleetResult};

/// Fully consumed HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Idle pooling is disabled so each call owns its connection end to end.
    pub fn new() -> FleetResult<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| FleetError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub async fn get(&self, url: &str, timeout: Duration) -> FleetResult<TransportResponse> {
        debug!("GET {url} (timeout: {}ms)", timeout.as_millis());
        self.send(self.client.get(url), timeout).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        timeout: Duration,
    ) -> FleetResult<TransportResponse> {
        debug!("POST {url} (timeout: {}ms)", timeout.as_millis());
        self.send(self.client.post(url).json(body), timeout).await
    }

    async fn send(&self, req: RequestBuilder, timeout: Duration) -> FleetResult<TransportResponse> {
        let exchange = async {
            let resp = req.send().await.map_err(network)?;
            let status = resp.status().as_u16();
            let body = resp.text().await.map_err(network)?;
            Ok::<_, FleetError>(TransportResponse { status, body })
        };
        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(FleetError::Timeout(timeout)),
        }
    }
}

fn read_failed(e: std::io::Error) -> FleetError {
    FleetError::Execution(format!("failed to read output: {e}"))
}

fn network(e: reqwest::Error) -> FleetError {
    FleetError::Network(e.to_string())
}

/// Trimmed output of a successful remote command.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Executes one command line against a shell target.
pub trait RemoteShell: Send + Sync {
    fn run<'a>(
        &'a self,
        target: &'a str,
        command: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, FleetResult<ShellOutput>>;
}

/// Remote shell backed by a local client program (`ssh` by default).
///
/// The invocation is `<program> <args..> <target> <command>`.
#[derive(Debug, Clone)]
pub struct SshShell {
    program: String,
    args: Vec<String>,
    max_output_bytes: usize,
}

impl SshShell {
    pub fn new(argv: Vec<String>, max_output_bytes: usize) -> FleetResult<Self> {
        let mut argv = argv.into_iter();
        let program = argv
            .next()
            .ok_or_else(|| FleetError::Config("remote shell program missing".into()))?;
        Ok(Self {
            program,
            args: argv.collect(),
            max_output_bytes,
        })
    }

    pub fn from_config(conf: &ShellConf) -> FleetResult<Self> {
        Self::new(conf.argv()?, conf.max_output_bytes)
    }

    async fn execute(&self, target: &str, command: &str, timeout: Duration) -> FleetResult<ShellOutput> {
        debug!("{} {} (timeout: {}ms)", self.program, target, timeout.as_millis());

        // kill_on_drop: the child is reaped on every exit path, timeout included
        let mut child = AsyncCommand::new(&self.program)
            .args(&self.args)
            .arg(target)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FleetError::Execution(format!("failed to spawn {}: {e}", self.program)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FleetError::Execution("stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| FleetError::Execution("stderr not captured".into()))?;
        let cap = self.max_output_bytes;
        let limit = cap as u64 + 1;

        let run = async {
            let read_out = async {
                let mut out = Vec::new();
                stdout.take(limit).read_to_end(&mut out).await.map_err(read_failed)?;
                if out.len() > cap {
                    return Err(FleetError::Execution(format!("output truncated at {cap} bytes")));
                }
                Ok::<_, FleetError>(out)
            };
            let read_err = async {
                let mut err = Vec::new();
                stderr.take(limit).read_to_end(&mut err).await.map_err(read_failed)?;
                Ok::<_, FleetError>(err)
            };
            let (out, err) = tokio::try_join!(read_out, read_err)?;
            let status = child
                .wait()
                .await
                .map_err(|e| FleetError::Execution(format!("failed to wait for command: {e}")))?;
            Ok::<_, FleetError>((out, err, status))
        };

        let (out, err, status) = match tokio::time::timeout(timeout, run).await {
            Ok(result) => result?,
            Err(_) => return Err(FleetError::Timeout(timeout)),
        };

        let stdout = String::from_utf8_lossy(&out).trim().to_string();
        let stderr = String::from_utf8_lossy(&err).trim().to_string();
        if !status.success() {
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".into());
            return Err(FleetError::Execution(format!("exit {code}: {stderr}")));
        }
        Ok(ShellOutput { stdout, stderr })
    }
}

impl RemoteShell for SshShell {
    fn run<'a>(
        &'a self,
        target: &'a str,
        command: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, FleetResult<ShellOutput>> {
        Box::pin(self.execute(target, command, timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sh(script: &str, max_output_bytes: usize) -> SshShell {
        SshShell::new(vec!["sh".into(), "-c".into(), script.into()], max_output_bytes).unwrap()
    }

    #[tokio::test]
    async fn get_returns_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Ollama is running"))
            .mount(&server)
            .await;

        let http = HttpTransport::new().unwrap();
        let resp = http.get(&server.uri(), Duration::from_secs(2)).await.unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.body, "Ollama is running");
    }

    #[tokio::test]
    async fn non_2xx_is_a_response_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let http = HttpTransport::new().unwrap();
        let resp = http
            .post_json(&format!("{}/api/pull", server.uri()), &serde_json::json!({"name": "x"}), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(resp.status, 500);
        assert!(!resp.is_success());
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let http = HttpTransport::new().unwrap();
        let started = std::time::Instant::now();
        let err = http.get(&server.uri(), Duration::from_millis(200)).await.unwrap_err();
        assert_eq!(err, FleetError::Timeout(Duration::from_millis(200)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn refused_connection_is_a_network_error() {
        let http = HttpTransport::new().unwrap();
        let err = http.get("http://127.0.0.1:1/", Duration::from_secs(2)).await.unwrap_err();
        assert_eq!(err.kind(), "network");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shell_passes_target_then_command() {
        let shell = sh("echo \"$0 | $1\"", 1024);
        let out = shell.run("root@vps", "uptime", Duration::from_secs(5)).await.unwrap();
        assert_eq!(out.stdout, "root@vps | uptime");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shell_non_zero_exit_is_execution_error() {
        let shell = sh("echo boom >&2; exit 3", 1024);
        let err = shell.run("t", "c", Duration::from_secs(5)).await.unwrap_err();
        assert_eq!(err, FleetError::Execution("exit 3: boom".into()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shell_timeout_kills_command() {
        let shell = sh("sleep 5", 1024);
        let started = std::time::Instant::now();
        let err = shell.run("t", "c", Duration::from_millis(200)).await.unwrap_err();
        assert_eq!(err.kind(), "timeout");
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shell_output_over_cap_is_rejected() {
        let shell = sh("yes", 64);
        let err = shell.run("t", "c", Duration::from_secs(5)).await.unwrap_err();
        assert_eq!(err, FleetError::Execution("output truncated at 64 bytes".into()));
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let shell = SshShell::new(vec!["/nonexistent/ssh-client".into()], 64).unwrap();
        let err = shell.run("t", "c", Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err.kind(), "execution");
    }
}

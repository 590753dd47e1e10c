//! Request/response bodies of the inference endpoint HTTP API.
//!
//! Everything the endpoint may omit is an `Option`; nothing here assumes a
//! field is present.

use serde::{Deserialize, Serialize};

use crate::models::{ChatMessage, ModelInfo};

pub const PATH_LIVENESS: &str = "/";
pub const PATH_TAGS: &str = "/api/tags";
pub const PATH_GENERATE: &str = "/api/generate";
pub const PATH_CHAT: &str = "/api/chat";
pub const PATH_PULL: &str = "/api/pull";

const UNKNOWN: &str = "unknown";

/// `GET /api/tags`
#[derive(Debug, Default, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<TagEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TagEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub details: Option<TagDetails>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TagDetails {
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub parameter_size: Option<String>,
    #[serde(default)]
    pub quantization_level: Option<String>,
}

impl From<TagEntry> for ModelInfo {
    fn from(entry: TagEntry) -> Self {
        let details = entry.details.unwrap_or_default();
        let or_unknown = |v: Option<String>| v.filter(|s| !s.is_empty()).unwrap_or_else(|| UNKNOWN.into());
        ModelInfo {
            name: or_unknown(entry.name),
            size_bytes: entry.size.unwrap_or(0),
            family: or_unknown(details.family),
            param_size: or_unknown(details.parameter_size),
            quantization_level: or_unknown(details.quantization_level),
        }
    }
}

/// `POST /api/generate`
#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
}

/// `POST /api/chat`
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
}

/// `POST /api/pull`
#[derive(Debug, Serialize)]
pub struct PullRequest<'a> {
    pub name: &'a str,
    pub stream: bool,
}

/// Non-streaming body of both `/api/generate` and `/api/chat`.
#[derive(Debug, Default, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub message: Option<CompletionMessage>,
    #[serde(default)]
    pub eval_count: Option<u64>,
    #[serde(default)]
    pub eval_duration: Option<u64>, // nanoseconds
}

#[derive(Debug, Default, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    /// Chat replies carry `message.content`; generate replies carry `response`.
    pub fn text(&self) -> String {
        self.message
            .as_ref()
            .and_then(|m| m.content.clone())
            .or_else(|| self.response.clone())
            .unwrap_or_default()
    }

    /// `eval_count / (eval_duration / 1e9)`, one decimal. Unset unless both are reported.
    pub fn tokens_per_second(&self) -> Option<f64> {
        let count = self.eval_count.filter(|c| *c > 0)?;
        let nanos = self.eval_duration.filter(|d| *d > 0)?;
        let tps = count as f64 / (nanos as f64 / 1e9);
        Some((tps * 10.0).round() / 10.0)
    }
}

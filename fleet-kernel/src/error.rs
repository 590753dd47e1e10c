use std::time::Duration;

/// Failures surfaced by the registry, the transports and the inference proxy.
///
/// The health prober never returns these: it folds them into snapshot fields.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FleetError {
    #[error("unknown node: {0}")]
    UnknownNode(String),
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("execution error: {0}")]
    Execution(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl FleetError {
    /// Short machine-readable tag, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            FleetError::UnknownNode(_) => "unknown_node",
            FleetError::Timeout(_) => "timeout",
            FleetError::Network(_) => "network",
            FleetError::Execution(_) => "execution",
            FleetError::Parse(_) => "parse",
            FleetError::Config(_) => "config",
            FleetError::BadRequest(_) => "bad_request",
        }
    }
}

pub type FleetResult<T> = Result<T, FleetError>;

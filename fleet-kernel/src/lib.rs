//! Fleet kernel: health aggregation and request relay for a small fleet of
//! inference nodes (local machine, LAN peers, remote hosts).
//!
//! - [`registry`]: static node table built from config
//! - [`transport`]: bounded HTTP calls and remote-shell execution
//! - [`health`] / [`fleet`]: per-node probes and their concurrent fan-out
//! - [`proxy`]: generate / chat / pull forwarding
//! - [`http`]: the JSON API in front of all of the above

pub mod config;
pub mod error;
pub mod fleet;
pub mod health;
pub mod http;
pub mod metrics;
pub mod models;
pub mod proxy;
pub mod registry;
pub mod system;
pub mod transport;
pub mod wire;

pub use config::{load_config, FleetConfig};
pub use error::{FleetError, FleetResult};
pub use fleet::FleetAggregator;
pub use health::{HealthProber, ProbeSettings};
pub use http::{build_router, AppState};
pub use models::{FleetSnapshot, HealthSnapshot, InferenceResult, InferenceStatus, ModelInfo, PullOutcome, PullStatus};
pub use proxy::{InferenceProxy, ProxySettings};
pub use registry::NodeRegistry;
pub use transport::{HttpTransport, RemoteShell, ShellOutput, SshShell};

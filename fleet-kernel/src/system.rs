//! Host-level system info, read either from the local OS or through one
//! remote-shell command whose `key:value` output is parsed leniently.

use std::time::Duration;
use sysinfo::System;
use tracing::debug;

use crate::error::FleetResult;
use crate::models::{MemoryInfo, NodeDescriptor, SystemInfo};
use crate::transport::RemoteShell;

/// Emits one `key:value` line per fact. Works on Linux and macOS hosts.
pub const REMOTE_INFO_COMMAND: &str = concat!(
    r#"echo "hostname:$(hostname)"; "#,
    r#"echo "uptime:$(uptime | sed 's/.*up //' | sed 's/,.*//')"; "#,
    r#"echo "load:$(cat /proc/loadavg 2>/dev/null || sysctl -n vm.loadavg 2>/dev/null)"; "#,
    r#"echo "cpus:$(nproc 2>/dev/null || sysctl -n hw.ncpu 2>/dev/null)"; "#,
    r#"echo "mem_total_kb:$(awk '/MemTotal/ {print $2}' /proc/meminfo 2>/dev/null)"; "#,
    r#"echo "mem_available_kb:$(awk '/MemAvailable/ {print $2}' /proc/meminfo 2>/dev/null)""#,
);

/// Where a node's system info comes from, decided by its descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemInfoSource<'a> {
    Local,
    Remote { target: &'a str },
}

impl<'a> SystemInfoSource<'a> {
    pub fn for_node(node: &'a NodeDescriptor) -> Self {
        match node.remote_target.as_deref() {
            Some(target) => SystemInfoSource::Remote { target },
            None => SystemInfoSource::Local,
        }
    }

    pub async fn collect(&self, shell: &dyn RemoteShell, timeout: Duration) -> FleetResult<SystemInfo> {
        match *self {
            SystemInfoSource::Local => Ok(local_system_info()),
            SystemInfoSource::Remote { target } => {
                let out = shell.run(target, REMOTE_INFO_COMMAND, timeout).await?;
                debug!("system info from {target}: {} bytes", out.stdout.len());
                Ok(parse_remote_report(&out.stdout))
            }
        }
    }
}

/// Direct OS read, no network hop.
pub fn local_system_info() -> SystemInfo {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.refresh_cpu();

    SystemInfo {
        hostname: Some(gethostname::gethostname().to_string_lossy().to_string()),
        uptime: Some(format_uptime(System::uptime())),
        cpu_load: Some(round2(System::load_average().one)),
        cpus: Some(sys.cpus().len()),
        memory: Some(MemoryInfo::from_bytes(sys.total_memory(), sys.available_memory())),
        error: None,
    }
}

/// Missing or malformed lines leave the matching field unset.
pub fn parse_remote_report(output: &str) -> SystemInfo {
    let mut info = SystemInfo::default();
    let mut mem_total_kb = None;
    let mut mem_available_kb = None;

    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else { continue };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.trim() {
            "hostname" => info.hostname = Some(value.to_string()),
            "uptime" => info.uptime = Some(value.to_string()),
            "load" => info.cpu_load = first_number(value).map(round2),
            "cpus" => info.cpus = value.parse().ok(),
            "mem_total_kb" => mem_total_kb = value.parse::<u64>().ok(),
            "mem_available_kb" => mem_available_kb = value.parse::<u64>().ok(),
            _ => {}
        }
    }

    if let (Some(total), Some(available)) = (mem_total_kb, mem_available_kb) {
        info.memory = Some(MemoryInfo::from_bytes(total * 1024, available * 1024));
    }
    info
}

// "/proc/loadavg" => "0.42 0.30 0.25 1/123 4567", sysctl => "{ 1.23 1.10 1.00 }"
fn first_number(value: &str) -> Option<f64> {
    value
        .split_whitespace()
        .map(|tok| tok.trim_matches(|c| c == '{' || c == '}' || c == ','))
        .find_map(|tok| tok.parse::<f64>().ok())
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn format_uptime(seconds: u64) -> String {
    let d = seconds / 86_400;
    let h = (seconds % 86_400) / 3_600;
    let m = (seconds % 3_600) / 60;
    if d > 0 {
        format!("{d}d {h}h")
    } else if h > 0 {
        format!("{h}h {m}m")
    } else {
        format!("{m}m")
    }
}

impl MemoryInfo {
    pub fn from_bytes(total_bytes: u64, free_bytes: u64) -> Self {
        let used_percent = if total_bytes > 0 {
            let free = free_bytes.min(total_bytes) as f64;
            ((1.0 - free / total_bytes as f64) * 100.0).round() as u8
        } else {
            0
        };
        Self { total_bytes, free_bytes, used_percent }
    }
}

//! Local host metrics served at `/api/metrics`
//!
//! Everything here is measured: CPU usage comes from two `sysinfo` samples,
//! not from a load-average estimate.

use serde::Serialize;
use sysinfo::System;
use tracing::debug;

use crate::models::MemoryInfo;
use crate::system::format_uptime;

#[derive(Debug, Serialize)]
pub struct LocalMetrics {
    pub hostname: String,
    pub platform: String,
    pub arch: String,
    pub uptime: String,
    pub uptime_seconds: u64,
    pub memory: MemoryInfo,
    pub cpu: CpuMetrics,
}

#[derive(Debug, Serialize)]
pub struct CpuMetrics {
    pub model: String,
    pub cores: usize,
    pub load_avg: [f64; 3], // [1min, 5min, 15min]
    pub usage_percent: f32,
}

impl LocalMetrics {
    pub async fn collect() -> Self {
        debug!("Collecting local metrics...");

        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu();
        // Usage is a delta between two refreshes
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        sys.refresh_cpu();

        let uptime_seconds = System::uptime();
        let load = System::load_average();

        LocalMetrics {
            hostname: gethostname::gethostname().to_string_lossy().to_string(),
            platform: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            uptime: format_uptime(uptime_seconds),
            uptime_seconds,
            memory: MemoryInfo::from_bytes(sys.total_memory(), sys.available_memory()),
            cpu: CpuMetrics {
                model: sys
                    .cpus()
                    .first()
                    .map(|c| c.brand().trim().to_string())
                    .filter(|b| !b.is_empty())
                    .unwrap_or_else(|| "Unknown".into()),
                cores: sys.cpus().len(),
                load_avg: [load.one, load.five, load.fifteen],
                usage_percent: sys.global_cpu_info().cpu_usage(),
            },
        }
    }
}

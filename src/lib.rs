//! cgroup-limits: effective CPU and memory limits of the current process.
//!
//! The library reads the Linux cgroup filesystem (v1 and v2) to find the limits that
//! actually apply to this process, which inside a container are usually much lower
//! than what the host offers. All locations come from a [`Config`], so the engine can
//! inspect a host root mounted elsewhere or a fixture directory.

use serde::Serialize;

pub mod cgroup;
pub mod config;
pub mod environment;
pub mod error;
pub mod fsutil;
pub mod mountinfo;

pub use config::Config;

use cgroup::MemoryLimits;
use cgroup::stats::MemoryStats;
use environment::RuntimeEnvironment;
use error::ResultOkLogExt;

/// Everything the engine knows about the current process, as printed by the binary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub environment: RuntimeEnvironment,
    pub run_in_docker: bool,
    pub cgroup_path: String,
    pub cpu_quota: f64,
    pub online_cpus: f64,
    pub cpu_set: String,
    pub recommended_workers: usize,
    pub memory: MemoryLimits,
    /// `None` if no `memory.stat` could be located.
    pub memory_stat: Option<MemoryStats>,
}

impl Report {
    /// Collects a report. Never fails; unknown values are zero or empty.
    pub fn collect(config: &Config) -> Self {
        Self {
            environment: environment::detect_runtime_environment(config),
            run_in_docker: environment::run_in_docker(config),
            cgroup_path: cgroup::cgroup_path(config),
            cpu_quota: cgroup::cpu_quota(config),
            online_cpus: cgroup::online_cpu_count(config),
            cpu_set: cgroup::cpu_set(config),
            recommended_workers: cgroup::recommended_workers(config),
            memory: cgroup::memory_limits(config),
            memory_stat: cgroup::memory_stats(config).ok_log(),
        }
    }
}

/// Runs the `cgroup-limits` binary: resolves the limits and prints them as JSON.
///
/// # Errors
///
/// Returns an error if the configured rootfs does not exist or the report cannot be
/// written to stdout.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    if !config.rootfs().exists() {
        return Err(format!(
            "Configured root filesystem `{}` does not exist!",
            config.rootfs().display()
        )
        .into());
    }

    let report = Report::collect(&config);
    log::debug!("Collected report: {report:?}");

    let stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(stdout, &report)?;
    println!();
    Ok(())
}

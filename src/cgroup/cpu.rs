//! Effective CPU budget of the current process.
//!
//! The quota is looked up in this order:
//!
//! 1. cgroup v1 `cpu.cfs_quota_us` / `cpu.cfs_period_us` under `<cgroup_root>/cpu`.
//! 2. cgroup v2 `cpu.max` under `<cgroup_root>`.
//! 3. The online CPU count, if no positive quota was found.

use crate::config::Config;
use crate::error::ResultOkLogExt;
use crate::fsutil;

use super::membership::ControllerHint;
use super::resolver::{read_file_contents, read_stat};
use super::stats::{CpuLimit, CpuQuota, count_online_cpus, parse_cpu_max};
use super::{Error, Result};

const CFS_QUOTA_FILE: &str = "cpu.cfs_quota_us";
const CFS_PERIOD_FILE: &str = "cpu.cfs_period_us";
const CPU_MAX_FILE: &str = "cpu.max";

/// Resolves the configured CPU quota without falling back to the CPU count.
///
/// A v1 quota of `-1` resolves to [`CpuQuota::Unlimited`]; v2 is only consulted when
/// the v1 files cannot be read.
///
/// # Errors
///
/// Returns the error of the v2 lookup when both generations fail.
pub fn resolve_cpu_quota(config: &Config) -> Result<CpuQuota> {
    match resolve_cfs_quota(config) {
        Ok(quota) => return Ok(quota),
        Err(err) => log::trace!("cgroup v1 CPU quota unavailable: {err}"),
    }
    resolve_cpu_max(config)
}

fn resolve_cfs_quota(config: &Config) -> Result<CpuQuota> {
    let root = config.controller_root("cpu");
    let hint = ControllerHint::Controller("cpu");

    let quota_us = read_stat(config, CFS_QUOTA_FILE, &root, hint)?;
    let period_us = read_stat(config, CFS_PERIOD_FILE, &root, hint)?;
    let limit = CpuLimit::from_cfs(quota_us, period_us)
        .map_err(|err| Error::parse(root.join(CFS_PERIOD_FILE), err))?;
    Ok(limit.quota())
}

fn resolve_cpu_max(config: &Config) -> Result<CpuQuota> {
    let file = read_file_contents(
        config,
        CPU_MAX_FILE,
        config.cgroup_root(),
        ControllerHint::Unified,
    )?;
    parse_cpu_max(&file.contents).map_err(|err| Error::parse(file.path(), err))
}

/// Returns the number of CPU cores available to the process.
///
/// Falls back to the online CPU count when no positive quota is configured. Never
/// fails: returns `0.0` if neither the quota nor the CPU count can be determined.
pub fn cpu_quota(config: &Config) -> f64 {
    if let Some(cores) = resolve_cpu_quota(config).ok_log().and_then(CpuQuota::cores) {
        return cores;
    }
    log::debug!("No CPU quota in effect, using the online CPU count");
    online_cpu_count(config)
}

/// Counts the CPUs listed in the online CPU file.
///
/// # Errors
///
/// [`Error::Read`] if the file cannot be read, [`Error::Parse`] if any entry is malformed.
pub fn resolve_online_cpu_count(config: &Config) -> Result<u32> {
    let path = config.cpu_online_file();
    let data = fsutil::read_to_string(path)?;
    count_online_cpus(&data).map_err(|err| Error::parse(path, err))
}

/// Returns the online CPU count, or `0.0` if it cannot be determined.
pub fn online_cpu_count(config: &Config) -> f64 {
    resolve_online_cpu_count(config)
        .ok_log()
        .map_or(0.0, f64::from)
}

/// Resolves the CPU list the process may run on, e.g. `0-3,6`.
///
/// Reads v1 `cpuset.cpus` under `<cgroup_root>/cpuset`, then v2 `cpuset.cpus.effective`.
pub fn resolve_cpu_set(config: &Config) -> Result<String> {
    let root = config.controller_root("cpuset");
    let file = read_file_contents(
        config,
        "cpuset.cpus",
        &root,
        ControllerHint::Controller("cpuset"),
    )
    .or_else(|err| {
        log::trace!("cgroup v1 cpuset unavailable: {err}");
        read_file_contents(
            config,
            "cpuset.cpus.effective",
            config.cgroup_root(),
            ControllerHint::Unified,
        )
    })?;
    Ok(file.contents.trim().to_owned())
}

/// Returns the CPU list the process may run on, or an empty string.
pub fn cpu_set(config: &Config) -> String {
    resolve_cpu_set(config).ok_log().unwrap_or_default()
}

/// Suggests a worker pool size: the CPU quota rounded to the nearest whole core,
/// at least one and at most the number of logical CPUs.
pub fn recommended_workers(config: &Config) -> usize {
    let quota = cpu_quota(config);
    let workers = workers_for_quota(quota, num_cpus::get());
    log::debug!("Recommended workers: {workers} (CPU quota: {quota:.2})");
    workers
}

fn workers_for_quota(quota: f64, logical_cpus: usize) -> usize {
    let rounded = (quota + 0.5).floor();
    let workers = if rounded >= 1.0 { rounded as usize } else { 1 };
    workers.min(logical_cpus.max(1))
}

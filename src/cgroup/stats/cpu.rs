//! This module provides parsing utilities for CPU limits as reported in Linux cgroup files.
//!
//! - **cgroup v1** expresses a CPU budget as two files, `cpu.cfs_quota_us` and
//!   `cpu.cfs_period_us`. A negative quota (normally `-1`) means no quota is set.
//! - **cgroup v2** uses a single `cpu.max` line, `"<quota> <period>"`, where the quota is
//!   either a decimal integer or the literal `max`.
//! - The online CPU list (`/sys/devices/system/cpu/online`, `cpuset.cpus`) is a
//!   comma-separated list of single CPUs and inclusive `a-b` ranges.
//!
//! # Examples
//!
//! ```rust
//! use cgroup_limits::cgroup::stats::{CpuQuota, count_online_cpus, parse_cpu_max};
//!
//! assert_eq!(parse_cpu_max("50000 100000").unwrap(), CpuQuota::Cores(0.5));
//! assert_eq!(parse_cpu_max("max 100000").unwrap(), CpuQuota::Unlimited);
//! assert_eq!(count_online_cpus("0-3,8").unwrap(), 5);
//! ```

use std::fmt;
use std::str::FromStr;

use super::ParseError;

/// The effective CPU quota of a cgroup, in cores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CpuQuota {
    /// No quota is configured (`max` in `cpu.max`, a negative `cpu.cfs_quota_us`).
    Unlimited,
    /// A fractional number of cores, e.g. `1.5`.
    Cores(f64),
}

impl CpuQuota {
    /// Sentinel value of [`CpuQuota::Unlimited`] in the numeric representation.
    pub const UNLIMITED: f64 = -1.0;

    /// Returns the quota as a number of cores, with `-1` standing for unlimited.
    pub fn as_f64(self) -> f64 {
        match self {
            CpuQuota::Unlimited => Self::UNLIMITED,
            CpuQuota::Cores(cores) => cores,
        }
    }

    /// Returns the number of cores if a positive quota is set.
    pub fn cores(self) -> Option<f64> {
        match self {
            CpuQuota::Cores(cores) if cores > 0.0 => Some(cores),
            _ => None,
        }
    }
}

impl fmt::Display for CpuQuota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuQuota::Unlimited => write!(f, "unlimited"),
            CpuQuota::Cores(cores) => write!(f, "{cores} cores"),
        }
    }
}

/// Represents a CPU bandwidth limit as a quota per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuLimit {
    /// Maximum allowed CPU time in microseconds over each period.
    ///
    /// A value of `None` represents no quota.
    pub quota: Option<u64>,
    /// Duration (in microseconds) of each enforcement period. Never zero.
    pub period: u64,
}

impl CpuLimit {
    /// Builds a limit from the raw cgroup v1 `cpu.cfs_quota_us` and `cpu.cfs_period_us` values.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::ZeroPeriod`] if the period is not positive.
    pub fn from_cfs(quota_us: i64, period_us: i64) -> Result<Self, ParseError> {
        let period = u64::try_from(period_us)
            .ok()
            .filter(|period| *period > 0)
            .ok_or(ParseError::ZeroPeriod)?;
        let quota = u64::try_from(quota_us).ok();
        Ok(Self { quota, period })
    }

    /// Returns the quota expressed in cores.
    pub fn quota(&self) -> CpuQuota {
        match self.quota {
            None => CpuQuota::Unlimited,
            Some(quota) => CpuQuota::Cores(quota as f64 / self.period as f64),
        }
    }
}

impl FromStr for CpuLimit {
    type Err = ParseError;

    /// Parses the contents of a `cpu.max` file.
    ///
    /// The trimmed input must be exactly two tokens separated by a single space.
    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let data = data.trim();
        let bounds: Vec<&str> = data.split(' ').collect();
        let [quota, period] = bounds.as_slice() else {
            return Err(ParseError::CpuMaxFormat {
                line: data.to_string(),
            });
        };

        let period = period
            .parse::<u64>()
            .map_err(|source| ParseError::invalid_value(period, source))?;
        if period == 0 {
            return Err(ParseError::ZeroPeriod);
        }

        let quota = match *quota {
            "max" => None,
            value => Some(
                value
                    .parse::<u64>()
                    .map_err(|source| ParseError::invalid_value(value, source))?,
            ),
        };

        Ok(Self { quota, period })
    }
}

/// Parses a `cpu.max` line into a [`CpuQuota`].
///
/// # Errors
///
/// Returns a [`ParseError`] if the line is not `"<quota|max> <period>"`.
pub fn parse_cpu_max(data: &str) -> Result<CpuQuota, ParseError> {
    data.parse::<CpuLimit>().map(|limit| limit.quota())
}

/// Counts the CPUs in a CPU list such as `0-3,5,7-9`.
///
/// Any malformed entry invalidates the whole list.
///
/// # Errors
///
/// Returns [`ParseError::CpuRange`] naming the first malformed entry.
pub fn count_online_cpus(data: &str) -> Result<u32, ParseError> {
    let data = data.trim();
    let mut count = 0u32;

    for entry in data.split(',') {
        let invalid = || ParseError::CpuRange {
            entry: entry.to_string(),
        };

        let cpus = match entry.split_once('-') {
            None => {
                entry.parse::<u32>().map_err(|_| invalid())?;
                1
            }
            Some((start, end)) => {
                let start = start.parse::<u32>().map_err(|_| invalid())?;
                let end = end.parse::<u32>().map_err(|_| invalid())?;
                if end < start {
                    return Err(invalid());
                }
                (end - start).checked_add(1).ok_or_else(invalid)?
            }
        };
        count = count.checked_add(cpus).ok_or_else(invalid)?;
    }

    Ok(count)
}

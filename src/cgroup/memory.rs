//! Memory limits and `memory.stat` snapshots of the current process.
//!
//! Every field is looked up on its own: the cgroup v1 file under
//! `<cgroup_root>/memory` first, then the cgroup v2 file under `<cgroup_root>` when the
//! field has a v2 counterpart. A failure on one field never affects another.

use serde::Serialize;

use crate::config::Config;
use crate::error::ResultOkLogExt;

use super::grep::grep_first_match;
use super::membership::ControllerHint;
use super::resolver::{ResolvedFile, read_file_contents, read_stat};
use super::stats::{
    KeyValueStat, MemoryStat, MemoryStatV2, MemoryStats, parse_first_integer, parse_stat_value,
};
use super::{Error, Result};

const MEMORY_STAT_FILE: &str = "memory.stat";
const HIERARCHICAL_LIMIT_KEY: &str = "hierarchical_memory_limit";

/// A single memory value with a v1 and, for most fields, a v2 source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryField {
    /// Hard limit in bytes.
    Limit,
    /// Current usage in bytes.
    Usage,
    /// Number of times usage hit the limit. v1 only.
    FailCount,
    /// High-water mark of usage in bytes.
    MaxUsage,
    /// Soft limit (v1) or throttling threshold `memory.high` (v2) in bytes.
    SoftLimit,
    /// `1` if the OOM killer is disabled for the cgroup.
    OomKillDisable,
    /// Most restrictive limit along the v1 hierarchy, from `memory.stat`. v1 only.
    HierarchicalLimit,
}

impl MemoryField {
    pub fn v1_file(self) -> &'static str {
        match self {
            MemoryField::Limit => "memory.limit_in_bytes",
            MemoryField::Usage => "memory.usage_in_bytes",
            MemoryField::FailCount => "memory.failcnt",
            MemoryField::MaxUsage => "memory.max_usage_in_bytes",
            MemoryField::SoftLimit => "memory.soft_limit_in_bytes",
            MemoryField::OomKillDisable => "memory.oom_control",
            MemoryField::HierarchicalLimit => MEMORY_STAT_FILE,
        }
    }

    pub fn v2_file(self) -> Option<&'static str> {
        match self {
            MemoryField::Limit => Some("memory.max"),
            MemoryField::Usage => Some("memory.current"),
            MemoryField::MaxUsage => Some("memory.peak"),
            MemoryField::SoftLimit => Some("memory.high"),
            MemoryField::OomKillDisable => Some("memory.oom_kill_disable"),
            MemoryField::FailCount | MemoryField::HierarchicalLimit => None,
        }
    }

    fn parse_v1(self, file: &ResolvedFile) -> Result<i64> {
        let parsed = match self {
            MemoryField::OomKillDisable => parse_first_integer(&file.contents),
            MemoryField::HierarchicalLimit => {
                let value = grep_first_match(&file.contents, HIERARCHICAL_LIMIT_KEY, 1, " ")
                    .ok_or_else(|| Error::KeyNotFound {
                        key: HIERARCHICAL_LIMIT_KEY.to_owned(),
                        path: file.path(),
                    })?;
                parse_stat_value(value)
            }
            _ => parse_stat_value(&file.contents),
        };
        parsed.map_err(|err| Error::parse(file.path(), err))
    }
}

fn resolve_v1(config: &Config, field: MemoryField) -> Result<i64> {
    let root = config.controller_root("memory");
    let file = read_file_contents(
        config,
        field.v1_file(),
        &root,
        ControllerHint::Controller("memory"),
    )?;
    field.parse_v1(&file)
}

/// Resolves one memory field, reporting why it could not be read.
///
/// # Errors
///
/// The v2 lookup error if the field has a v2 file, the v1 error otherwise.
pub fn resolve_memory_value(config: &Config, field: MemoryField) -> Result<i64> {
    let err = match resolve_v1(config, field) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };
    let Some(v2_file) = field.v2_file() else {
        return Err(err);
    };
    log::trace!("cgroup v1 {field:?} unavailable, trying {v2_file}: {err}");
    read_stat(config, v2_file, config.cgroup_root(), ControllerHint::Unified)
}

/// Returns the value of `field`, or `0` if it cannot be determined.
///
/// A v2 `memory.max` of `max` (no limit) also reads as `0`.
pub fn memory_value(config: &Config, field: MemoryField) -> i64 {
    resolve_memory_value(config, field).ok_log().unwrap_or(0)
}

pub fn memory_limit(config: &Config) -> i64 {
    memory_value(config, MemoryField::Limit)
}

pub fn memory_usage(config: &Config) -> i64 {
    memory_value(config, MemoryField::Usage)
}

pub fn memory_fail_count(config: &Config) -> i64 {
    memory_value(config, MemoryField::FailCount)
}

pub fn memory_max_usage(config: &Config) -> i64 {
    memory_value(config, MemoryField::MaxUsage)
}

pub fn memory_soft_limit(config: &Config) -> i64 {
    memory_value(config, MemoryField::SoftLimit)
}

pub fn memory_oom_kill_disable(config: &Config) -> i64 {
    memory_value(config, MemoryField::OomKillDisable)
}

/// The `hierarchical_memory_limit` entry of the v1 `memory.stat`, or `0`.
pub fn hierarchical_memory_limit(config: &Config) -> i64 {
    memory_value(config, MemoryField::HierarchicalLimit)
}

/// Every memory field, each resolved independently. Unknown values are `0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryLimits {
    pub limit: i64,
    pub usage: i64,
    pub fail_count: i64,
    pub max_usage: i64,
    pub soft_limit: i64,
    pub oom_kill_disable: i64,
    pub hierarchical_limit: i64,
}

pub fn memory_limits(config: &Config) -> MemoryLimits {
    MemoryLimits {
        limit: memory_limit(config),
        usage: memory_usage(config),
        fail_count: memory_fail_count(config),
        max_usage: memory_max_usage(config),
        soft_limit: memory_soft_limit(config),
        oom_kill_disable: memory_oom_kill_disable(config),
        hierarchical_limit: hierarchical_memory_limit(config),
    }
}

/// Parses the cgroup v1 `memory.stat` of the process.
///
/// # Errors
///
/// Fails only if the file cannot be located or read. Missing keys read as `0`.
pub fn memory_stat(config: &Config) -> Result<MemoryStat> {
    let root = config.controller_root("memory");
    let file = read_file_contents(
        config,
        MEMORY_STAT_FILE,
        &root,
        ControllerHint::Controller("memory"),
    )?;
    Ok(MemoryStat::from_str_lossy(&file.contents))
}

/// Parses the cgroup v2 `memory.stat` of the process.
///
/// # Errors
///
/// Fails only if the file cannot be located or read. Missing keys read as `0`.
pub fn memory_stat_v2(config: &Config) -> Result<MemoryStatV2> {
    let file = read_file_contents(
        config,
        MEMORY_STAT_FILE,
        config.cgroup_root(),
        ControllerHint::Unified,
    )?;
    Ok(MemoryStatV2::from_str_lossy(&file.contents))
}

/// Parses `memory.stat` with the schema of whichever generation provides it, v1 first.
pub fn memory_stats(config: &Config) -> Result<MemoryStats> {
    match memory_stat(config) {
        Ok(stat) => Ok(MemoryStats::V1(stat)),
        Err(err) => {
            log::trace!("cgroup v1 memory.stat unavailable: {err}");
            memory_stat_v2(config).map(MemoryStats::V2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::testutil::Fixture;

    fn v1_fixture() -> Fixture {
        let fixture = Fixture::new();
        fixture.membership("12:cpu,cpuacct:/docker/abc\n5:memory:/docker/abc\n0::/\n");
        fixture
    }

    #[test]
    fn test_v1_fields() {
        let fixture = v1_fixture();
        fixture.cgroup_file("memory/docker/abc/memory.limit_in_bytes", "536870912\n");
        fixture.cgroup_file("memory/docker/abc/memory.usage_in_bytes", "1048576\n");
        fixture.cgroup_file("memory/docker/abc/memory.failcnt", "3\n");
        fixture.cgroup_file("memory/docker/abc/memory.max_usage_in_bytes", "2097152\n");
        fixture.cgroup_file("memory/docker/abc/memory.soft_limit_in_bytes", "268435456\n");
        fixture.cgroup_file(
            "memory/docker/abc/memory.oom_control",
            "oom_kill_disable 1\nunder_oom 0\noom_kill 0\n",
        );
        fixture.cgroup_file(
            "memory/docker/abc/memory.stat",
            "cache 100\nrss 200\nhierarchical_memory_limit 536870912\n",
        );

        let limits = memory_limits(&fixture.config());
        assert_eq!(
            limits,
            MemoryLimits {
                limit: 536870912,
                usage: 1048576,
                fail_count: 3,
                max_usage: 2097152,
                soft_limit: 268435456,
                oom_kill_disable: 1,
                hierarchical_limit: 536870912,
            }
        );
    }

    #[test]
    fn test_v2_fields() {
        let fixture = Fixture::new();
        fixture.membership("0::/\n");
        fixture.cgroup_file("memory.max", "1073741824\n");
        fixture.cgroup_file("memory.current", "4096\n");
        fixture.cgroup_file("memory.peak", "8192\n");
        fixture.cgroup_file("memory.high", "max\n");
        fixture.cgroup_file("memory.oom_kill_disable", "0\n");

        let config = fixture.config();
        assert_eq!(memory_limit(&config), 1073741824);
        assert_eq!(memory_usage(&config), 4096);
        assert_eq!(memory_max_usage(&config), 8192);
        assert_eq!(memory_soft_limit(&config), 0);
        assert_eq!(memory_oom_kill_disable(&config), 0);
        assert_eq!(memory_fail_count(&config), 0);
        assert_eq!(hierarchical_memory_limit(&config), 0);
    }

    #[test]
    fn test_fields_fail_independently() {
        let fixture = v1_fixture();
        fixture.cgroup_file("memory/docker/abc/memory.limit_in_bytes", "not a number\n");
        fixture.cgroup_file("memory/docker/abc/memory.usage_in_bytes", "1024\n");

        let config = fixture.config();
        assert!(matches!(
            resolve_memory_value(&config, MemoryField::Limit),
            Err(Error::NotFound { .. })
        ));
        assert_eq!(memory_limit(&config), 0);
        assert_eq!(memory_usage(&config), 1024);
    }

    #[test]
    fn test_fail_count_has_no_v2_fallback() {
        let fixture = v1_fixture();
        fixture.cgroup_file("memory.failcnt", "7\n");

        let config = fixture.config();
        assert!(resolve_memory_value(&config, MemoryField::FailCount).is_err());
        assert_eq!(memory_fail_count(&config), 0);
    }

    #[test]
    fn test_hierarchical_limit_key_missing() {
        let fixture = v1_fixture();
        fixture.cgroup_file("memory/docker/abc/memory.stat", "cache 100\nrss 200\n");

        let err = resolve_memory_value(&fixture.config(), MemoryField::HierarchicalLimit)
            .unwrap_err();
        assert!(matches!(err, Error::KeyNotFound { .. }), "{err:?}");
    }

    #[test]
    fn test_memory_stat_v1() {
        let fixture = v1_fixture();
        fixture.cgroup_file(
            "memory/docker/abc/memory.stat",
            "cache 100\nrss 200\nbad_line\nshmem 0\n",
        );

        let config = fixture.config();
        let stat = memory_stat(&config).unwrap();
        assert_eq!(stat.cache, 100);
        assert_eq!(stat.rss, 200);
        assert_eq!(stat.shmem, 0);
        assert_eq!(stat.pgfault, 0);

        let stats = memory_stats(&config).unwrap();
        assert_eq!(stats.version(), 1);
        assert_eq!(stats, MemoryStats::V1(stat));
    }

    #[test]
    fn test_memory_stat_v2() {
        let fixture = Fixture::new();
        fixture.membership("0::/kubepods/pod1\n");
        fixture.cgroup_file(
            "kubepods/pod1/memory.stat",
            "anon 4096\nfile 8192\nworkingset_refault_file 3\n",
        );

        let config = fixture.config();
        let stat = memory_stat_v2(&config).unwrap();
        assert_eq!(stat.anon, 4096);
        assert_eq!(stat.file, 8192);
        assert_eq!(stat.kernel, 0);

        assert_eq!(memory_stats(&config).unwrap(), MemoryStats::V2(stat));
    }

    #[test]
    fn test_memory_stat_not_found() {
        let fixture = Fixture::new();
        fixture.membership("0::/\n");

        let config = fixture.config();
        assert!(memory_stat(&config).unwrap_err().is_not_found());
        assert!(memory_stat_v2(&config).unwrap_err().is_not_found());
        assert!(memory_stats(&config).is_err());
    }

    #[test]
    fn test_memory_resolvers_are_idempotent() {
        let fixture = v1_fixture();
        fixture.cgroup_file("memory/docker/abc/memory.limit_in_bytes", "536870912\n");
        fixture.cgroup_file("memory/docker/abc/memory.usage_in_bytes", "1048576\n");
        fixture.cgroup_file(
            "memory/docker/abc/memory.stat",
            "cache 100\nrss 200\nhierarchical_memory_limit 536870912\n",
        );

        let config = fixture.config();
        let limits = memory_limits(&config);
        assert_eq!(limits, memory_limits(&config));
        assert_eq!(limits.limit, 536870912);

        let stats = memory_stats(&config).unwrap();
        assert_eq!(stats, memory_stats(&config).unwrap());
        assert_eq!(stats.version(), 1);
    }

    #[test]
    fn test_memory_stat_empty_file() {
        let fixture = Fixture::new();
        fixture.membership("0::/\n");
        fixture.cgroup_file("memory.stat", "");

        assert_eq!(
            memory_stat_v2(&fixture.config()).unwrap(),
            MemoryStatV2::default()
        );
    }
}

//! Effective resource limits of the current process under Linux cgroups.
//!
//! This module finds the cgroup control files that apply to the current process and
//! turns their contents into CPU and memory limits. Both cgroup generations are
//! supported: v1 with one hierarchy per controller, and v2 with a single unified
//! hierarchy.
//!
//! # Resolution
//!
//! A control file is read from the first location that works:
//!
//! 1. `<root>/<file>`, the flattened layout seen inside most containers.
//! 2. `<root>/<subpath>/<file>`, where `<subpath>` comes from the membership file
//!    (`/proc/self/cgroup`) line of the matching controller.
//!
//! Every call re-reads the files involved; nothing is cached.
//!
//! # Error policy
//!
//! Public resolvers such as [`cpu_quota`] and [`memory_limit`] never fail. They log
//! the underlying [`Error`] at `debug` level and return `0` (or an empty value). The
//! `resolve_*` variants return the [`Result`] instead. Full `memory.stat` parsing
//! ([`memory_stat`], [`memory_stat_v2`]) is the exception: it reports a missing file
//! as an error, while missing keys read as `0`.
//!
//! # Key Components
//!
//! - [`ControllerTable`]: the parsed membership file.
//! - [`read_file_contents`] / [`read_stat`]: control file lookup.
//! - [`grep_first_match`]: field extraction from line-oriented files.
//! - [`stats`]: pure parsers for the individual file formats.
//!
//! # Platform Requirements
//!
//! Linux. Elsewhere the membership file is reported as [`Error::Unsupported`] and the
//! process is treated as unconfined.

mod cpu;
mod error;
mod grep;
mod membership;
mod memory;
mod resolver;
pub mod stats;

pub use cpu::{
    cpu_quota, cpu_set, online_cpu_count, recommended_workers, resolve_cpu_quota,
    resolve_cpu_set, resolve_online_cpu_count,
};
pub use error::{Error, Result};
pub use grep::grep_first_match;
pub use membership::{
    ControllerHint, ControllerLine, ControllerTable, UNIFIED_MARKER, cgroup_path, run_in_cgroup,
};
pub use memory::{
    MemoryField, MemoryLimits, hierarchical_memory_limit, memory_fail_count, memory_limit,
    memory_limits, memory_max_usage, memory_oom_kill_disable, memory_soft_limit, memory_stat,
    memory_stat_v2, memory_stats, memory_usage, memory_value, resolve_memory_value,
};
pub use resolver::{ResolvedFile, ResolvedPath, read_file_contents, read_stat};

//! Pure parsers for the textual formats of cgroup control files.
//!
//! Nothing in this module touches the filesystem; it turns file contents into typed
//! values. Locating the files is the job of [`crate::cgroup`].
//!
//! # Main types
//!
//! - [`CpuLimit`] / [`CpuQuota`]: `cpu.max` and `cpu.cfs_*_us` limits.
//! - [`MemoryStat`] / [`MemoryStatV2`]: the v1 and v2 `memory.stat` schemas,
//!   tagged by [`MemoryStats`].
//! - [`KeyValueStat`]: the projection of a `<key> <value>` file onto a struct.
//! - [`ParseError`]: what went wrong while parsing.

mod cpu;
mod error;
mod memory;
mod parser;

pub use cpu::{CpuLimit, CpuQuota, count_online_cpus, parse_cpu_max};
pub use error::ParseError;
pub use memory::{MemoryStat, MemoryStatV2, MemoryStats};
pub use parser::{
    KeyValueStat, parse_first_integer, parse_key_values, parse_key_values_str, parse_stat_value,
};

//! This module provides parsing utilities for the `memory.stat` file of both cgroup generations.
//!
//! cgroup v1 and cgroup v2 report disjoint sets of keys, so each generation gets its own
//! struct: [`MemoryStat`] for v1 (cache/rss/paging counters and hierarchical limits) and
//! [`MemoryStatV2`] for v2 (anon/file/kernel/working-set/page-scan counters).
//! [`MemoryStats`] tags a snapshot with the generation it came from.
//!
//! # Parsing assumptions
//!
//! - One `<key> <value>` pair per line; lines with any other shape are skipped.
//! - Keys that are not part of the schema are ignored.
//! - Keys that are missing from the file, or whose value is not an integer, read as `0`.
//!   A zero field therefore does not tell whether the kernel reported it.
//!
//! # Examples
//!
//! ```rust
//! use cgroup_limits::cgroup::stats::{KeyValueStat, MemoryStat, MemoryStatV2};
//!
//! let v1 = MemoryStat::from_str_lossy("cache 100\nrss 200\n");
//! assert_eq!(v1.rss, 200);
//!
//! let v2 = MemoryStatV2::from_str_lossy("anon 1000\nfile 2000\n");
//! assert_eq!(v2.file, 2000);
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use super::parser::KeyValueStat;

type Setter<T> = fn(&mut T, i64);

/// Memory statistics from a cgroup v1 `memory.stat` file.
///
/// See <https://www.kernel.org/doc/Documentation/cgroup-v1/memory.txt>.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct MemoryStat {
    /// Page cache, including tmpfs (shmem).
    pub cache: i64,
    /// Anonymous and swap cache memory, not including tmpfs.
    pub rss: i64,
    /// Anonymous transparent hugepages.
    pub rss_huge: i64,
    /// Shared memory, including tmpfs.
    pub shmem: i64,
    /// Size of memory-mapped files, including tmpfs.
    pub mapped_file: i64,
    /// Bytes waiting to be written back to disk.
    pub dirty: i64,
    /// Bytes of file/anon cache queued for syncing to disk.
    pub writeback: i64,
    /// Swap usage.
    pub swap: i64,
    /// Number of pages charged to the cgroup.
    pub pgpgin: i64,
    /// Number of pages uncharged from the cgroup.
    pub pgpgout: i64,
    /// Number of page faults.
    pub pgfault: i64,
    /// Number of major page faults.
    pub pgmajfault: i64,
    /// Anonymous and swap cache memory on the inactive LRU list.
    pub inactive_anon: i64,
    /// Anonymous and swap cache memory on the active LRU list.
    pub active_anon: i64,
    /// File-backed memory on the inactive LRU list.
    pub inactive_file: i64,
    /// File-backed memory on the active LRU list.
    pub active_file: i64,
    /// Memory that cannot be reclaimed (e.g. mlocked).
    pub unevictable: i64,
    /// Memory limit with regard to the hierarchy under which the cgroup sits.
    pub hierarchical_memory_limit: i64,
    /// Memory plus swap limit with regard to the hierarchy.
    pub hierarchical_memsw_limit: i64,
    /// Hierarchical `cache`, including all descendants.
    pub total_cache: i64,
    /// Hierarchical `rss`, including all descendants.
    pub total_rss: i64,
    /// Hierarchical `rss_huge`, including all descendants.
    pub total_rss_huge: i64,
    /// Hierarchical `shmem`, including all descendants.
    pub total_shmem: i64,
    /// Hierarchical `mapped_file`, including all descendants.
    pub total_mapped_file: i64,
    /// Hierarchical `dirty`, including all descendants.
    pub total_dirty: i64,
    /// Hierarchical `writeback`, including all descendants.
    pub total_writeback: i64,
    /// Hierarchical `swap`, including all descendants.
    pub total_swap: i64,
    /// Hierarchical `pgpgin`, including all descendants.
    pub total_pgpgin: i64,
    /// Hierarchical `pgpgout`, including all descendants.
    pub total_pgpgout: i64,
    /// Hierarchical `pgfault`, including all descendants.
    pub total_pgfault: i64,
    /// Hierarchical `pgmajfault`, including all descendants.
    pub total_pgmajfault: i64,
    /// Hierarchical `inactive_anon`, including all descendants.
    pub total_inactive_anon: i64,
    /// Hierarchical `active_anon`, including all descendants.
    pub total_active_anon: i64,
    /// Hierarchical `inactive_file`, including all descendants.
    pub total_inactive_file: i64,
    /// Hierarchical `active_file`, including all descendants.
    pub total_active_file: i64,
    /// Hierarchical `unevictable`, including all descendants.
    pub total_unevictable: i64,
}

static V1_SETTERS: LazyLock<HashMap<&'static str, Setter<MemoryStat>>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Setter<MemoryStat>> = HashMap::with_capacity(36);

    m.insert("cache", |s: &mut MemoryStat, v: i64| s.cache = v);
    m.insert("rss", |s: &mut MemoryStat, v: i64| s.rss = v);
    m.insert("rss_huge", |s: &mut MemoryStat, v: i64| s.rss_huge = v);
    m.insert("shmem", |s: &mut MemoryStat, v: i64| s.shmem = v);
    m.insert("mapped_file", |s: &mut MemoryStat, v: i64| s.mapped_file = v);
    m.insert("dirty", |s: &mut MemoryStat, v: i64| s.dirty = v);
    m.insert("writeback", |s: &mut MemoryStat, v: i64| s.writeback = v);
    m.insert("swap", |s: &mut MemoryStat, v: i64| s.swap = v);
    m.insert("pgpgin", |s: &mut MemoryStat, v: i64| s.pgpgin = v);
    m.insert("pgpgout", |s: &mut MemoryStat, v: i64| s.pgpgout = v);
    m.insert("pgfault", |s: &mut MemoryStat, v: i64| s.pgfault = v);
    m.insert("pgmajfault", |s: &mut MemoryStat, v: i64| s.pgmajfault = v);
    m.insert("inactive_anon", |s: &mut MemoryStat, v: i64| s.inactive_anon = v);
    m.insert("active_anon", |s: &mut MemoryStat, v: i64| s.active_anon = v);
    m.insert("inactive_file", |s: &mut MemoryStat, v: i64| s.inactive_file = v);
    m.insert("active_file", |s: &mut MemoryStat, v: i64| s.active_file = v);
    m.insert("unevictable", |s: &mut MemoryStat, v: i64| s.unevictable = v);
    m.insert("hierarchical_memory_limit", |s: &mut MemoryStat, v: i64| s.hierarchical_memory_limit = v);
    m.insert("hierarchical_memsw_limit", |s: &mut MemoryStat, v: i64| s.hierarchical_memsw_limit = v);
    m.insert("total_cache", |s: &mut MemoryStat, v: i64| s.total_cache = v);
    m.insert("total_rss", |s: &mut MemoryStat, v: i64| s.total_rss = v);
    m.insert("total_rss_huge", |s: &mut MemoryStat, v: i64| s.total_rss_huge = v);
    m.insert("total_shmem", |s: &mut MemoryStat, v: i64| s.total_shmem = v);
    m.insert("total_mapped_file", |s: &mut MemoryStat, v: i64| s.total_mapped_file = v);
    m.insert("total_dirty", |s: &mut MemoryStat, v: i64| s.total_dirty = v);
    m.insert("total_writeback", |s: &mut MemoryStat, v: i64| s.total_writeback = v);
    m.insert("total_swap", |s: &mut MemoryStat, v: i64| s.total_swap = v);
    m.insert("total_pgpgin", |s: &mut MemoryStat, v: i64| s.total_pgpgin = v);
    m.insert("total_pgpgout", |s: &mut MemoryStat, v: i64| s.total_pgpgout = v);
    m.insert("total_pgfault", |s: &mut MemoryStat, v: i64| s.total_pgfault = v);
    m.insert("total_pgmajfault", |s: &mut MemoryStat, v: i64| s.total_pgmajfault = v);
    m.insert("total_inactive_anon", |s: &mut MemoryStat, v: i64| s.total_inactive_anon = v);
    m.insert("total_active_anon", |s: &mut MemoryStat, v: i64| s.total_active_anon = v);
    m.insert("total_inactive_file", |s: &mut MemoryStat, v: i64| s.total_inactive_file = v);
    m.insert("total_active_file", |s: &mut MemoryStat, v: i64| s.total_active_file = v);
    m.insert("total_unevictable", |s: &mut MemoryStat, v: i64| s.total_unevictable = v);

    m
});

impl KeyValueStat for MemoryStat {
    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, i64)> {
        &V1_SETTERS
    }
}

/// Memory statistics from a cgroup v2 `memory.stat` file.
///
/// See <https://www.kernel.org/doc/html/latest/admin-guide/cgroup-v2.html#memory-interface-files>.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct MemoryStatV2 {
    /// Anonymous memory, including swap cache.
    pub anon: i64,
    /// Filesystem cache, including tmpfs and shared memory.
    pub file: i64,
    /// Total kernel memory, including stacks, page tables and slab.
    pub kernel: i64,
    /// Memory allocated to kernel stacks.
    pub kernel_stack: i64,
    /// Memory allocated for page tables.
    pub pagetables: i64,
    /// Memory allocated for secondary page tables.
    pub sec_pagetables: i64,
    /// Memory used for per-CPU kernel data structures.
    pub percpu: i64,
    /// Memory used in network transmission buffers.
    pub sock: i64,
    /// Memory used for vmap-backed memory.
    pub vmalloc: i64,
    /// Memory consumed by the zswap compression backend.
    pub zswap: i64,
    /// Application memory swapped out to zswap.
    pub zswapped: i64,
    /// Cached filesystem data mapped with `mmap`.
    pub file_mapped: i64,
    /// Cached filesystem data that was modified but not yet written back.
    pub file_dirty: i64,
    /// Cached filesystem data being written back to disk.
    pub file_writeback: i64,
    /// Swap cached in memory.
    pub swapcached: i64,
    /// Anonymous memory backed by transparent hugepages.
    pub anon_thp: i64,
    /// File cache backed by transparent hugepages.
    pub file_thp: i64,
    /// Shared memory backed by transparent hugepages.
    pub shmem_thp: i64,
    /// Part of slab that might be reclaimed.
    pub slab_reclaimable: i64,
    /// Part of slab that cannot be reclaimed under memory pressure.
    pub slab_unreclaimable: i64,
    /// Memory used for in-kernel data structures.
    pub slab: i64,
    /// Number of refaults of previously evicted anonymous pages.
    pub workingset_refault_anon: i64,
    /// Number of refaults of previously evicted file pages.
    pub workingset_refault_file: i64,
    /// Number of refaulted anonymous pages that were immediately activated.
    pub workingset_activate_anon: i64,
    /// Number of refaulted file pages that were immediately activated.
    pub workingset_activate_file: i64,
    /// Number of restored anonymous pages detected as active before reclaim.
    pub workingset_restore_anon: i64,
    /// Number of restored file pages detected as active before reclaim.
    pub workingset_restore_file: i64,
    /// Number of times a shadow node has been reclaimed.
    pub workingset_nodereclaim: i64,
    /// Amount of scanned pages.
    pub pgscan: i64,
    /// Amount of reclaimed pages.
    pub pgsteal: i64,
    /// Amount of pages scanned by kswapd.
    pub pgscan_kswapd: i64,
    /// Amount of pages scanned directly.
    pub pgscan_direct: i64,
    /// Amount of pages reclaimed by kswapd.
    pub pgsteal_kswapd: i64,
    /// Amount of pages reclaimed directly.
    pub pgsteal_direct: i64,
    /// Amount of scanned pages in an active LRU list.
    pub pgrefill: i64,
    /// Amount of pages moved to the active LRU list.
    pub pgactivate: i64,
    /// Amount of pages moved to the inactive LRU list.
    pub pgdeactivate: i64,
    /// Amount of pages postponed to be freed under memory pressure.
    pub pglazyfree: i64,
    /// Amount of reclaimed lazyfree pages.
    pub pglazyfreed: i64,
    /// Number of transparent hugepages allocated to satisfy a page fault.
    pub thp_fault_alloc: i64,
    /// Number of transparent hugepages allocated to collapse existing pages.
    pub thp_collapse_alloc: i64,
}

static V2_SETTERS: LazyLock<HashMap<&'static str, Setter<MemoryStatV2>>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Setter<MemoryStatV2>> = HashMap::with_capacity(41);

    m.insert("anon", |s: &mut MemoryStatV2, v: i64| s.anon = v);
    m.insert("file", |s: &mut MemoryStatV2, v: i64| s.file = v);
    m.insert("kernel", |s: &mut MemoryStatV2, v: i64| s.kernel = v);
    m.insert("kernel_stack", |s: &mut MemoryStatV2, v: i64| s.kernel_stack = v);
    m.insert("pagetables", |s: &mut MemoryStatV2, v: i64| s.pagetables = v);
    m.insert("sec_pagetables", |s: &mut MemoryStatV2, v: i64| s.sec_pagetables = v);
    m.insert("percpu", |s: &mut MemoryStatV2, v: i64| s.percpu = v);
    m.insert("sock", |s: &mut MemoryStatV2, v: i64| s.sock = v);
    m.insert("vmalloc", |s: &mut MemoryStatV2, v: i64| s.vmalloc = v);
    m.insert("zswap", |s: &mut MemoryStatV2, v: i64| s.zswap = v);
    m.insert("zswapped", |s: &mut MemoryStatV2, v: i64| s.zswapped = v);
    m.insert("file_mapped", |s: &mut MemoryStatV2, v: i64| s.file_mapped = v);
    m.insert("file_dirty", |s: &mut MemoryStatV2, v: i64| s.file_dirty = v);
    m.insert("file_writeback", |s: &mut MemoryStatV2, v: i64| s.file_writeback = v);
    m.insert("swapcached", |s: &mut MemoryStatV2, v: i64| s.swapcached = v);
    m.insert("anon_thp", |s: &mut MemoryStatV2, v: i64| s.anon_thp = v);
    m.insert("file_thp", |s: &mut MemoryStatV2, v: i64| s.file_thp = v);
    m.insert("shmem_thp", |s: &mut MemoryStatV2, v: i64| s.shmem_thp = v);
    m.insert("slab_reclaimable", |s: &mut MemoryStatV2, v: i64| s.slab_reclaimable = v);
    m.insert("slab_unreclaimable", |s: &mut MemoryStatV2, v: i64| s.slab_unreclaimable = v);
    m.insert("slab", |s: &mut MemoryStatV2, v: i64| s.slab = v);
    m.insert("workingset_refault_anon", |s: &mut MemoryStatV2, v: i64| s.workingset_refault_anon = v);
    m.insert("workingset_refault_file", |s: &mut MemoryStatV2, v: i64| s.workingset_refault_file = v);
    m.insert("workingset_activate_anon", |s: &mut MemoryStatV2, v: i64| s.workingset_activate_anon = v);
    m.insert("workingset_activate_file", |s: &mut MemoryStatV2, v: i64| s.workingset_activate_file = v);
    m.insert("workingset_restore_anon", |s: &mut MemoryStatV2, v: i64| s.workingset_restore_anon = v);
    m.insert("workingset_restore_file", |s: &mut MemoryStatV2, v: i64| s.workingset_restore_file = v);
    m.insert("workingset_nodereclaim", |s: &mut MemoryStatV2, v: i64| s.workingset_nodereclaim = v);
    m.insert("pgscan", |s: &mut MemoryStatV2, v: i64| s.pgscan = v);
    m.insert("pgsteal", |s: &mut MemoryStatV2, v: i64| s.pgsteal = v);
    m.insert("pgscan_kswapd", |s: &mut MemoryStatV2, v: i64| s.pgscan_kswapd = v);
    m.insert("pgscan_direct", |s: &mut MemoryStatV2, v: i64| s.pgscan_direct = v);
    m.insert("pgsteal_kswapd", |s: &mut MemoryStatV2, v: i64| s.pgsteal_kswapd = v);
    m.insert("pgsteal_direct", |s: &mut MemoryStatV2, v: i64| s.pgsteal_direct = v);
    m.insert("pgrefill", |s: &mut MemoryStatV2, v: i64| s.pgrefill = v);
    m.insert("pgactivate", |s: &mut MemoryStatV2, v: i64| s.pgactivate = v);
    m.insert("pgdeactivate", |s: &mut MemoryStatV2, v: i64| s.pgdeactivate = v);
    m.insert("pglazyfree", |s: &mut MemoryStatV2, v: i64| s.pglazyfree = v);
    m.insert("pglazyfreed", |s: &mut MemoryStatV2, v: i64| s.pglazyfreed = v);
    m.insert("thp_fault_alloc", |s: &mut MemoryStatV2, v: i64| s.thp_fault_alloc = v);
    m.insert("thp_collapse_alloc", |s: &mut MemoryStatV2, v: i64| s.thp_collapse_alloc = v);

    m
});

impl KeyValueStat for MemoryStatV2 {
    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, i64)> {
        &V2_SETTERS
    }
}

/// A `memory.stat` snapshot tagged with the cgroup generation it was read from.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "cgroup_version")]
pub enum MemoryStats {
    #[serde(rename = "v1")]
    V1(MemoryStat),
    #[serde(rename = "v2")]
    V2(MemoryStatV2),
}

impl MemoryStats {
    /// Returns the cgroup generation of this snapshot, `1` or `2`.
    pub fn version(&self) -> u8 {
        match self {
            MemoryStats::V1(_) => 1,
            MemoryStats::V2(_) => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_memory_stat() {
        assert_eq!(MemoryStat::from_str_lossy(""), MemoryStat::default());
        assert_eq!(MemoryStatV2::from_str_lossy(""), MemoryStatV2::default());
    }

    #[test]
    fn test_parse_v1_memory_stat_skips_malformed_line() {
        let data = "cache 100\nrss 200\nbad_line\nshmem 0\n";
        let stat = MemoryStat::from_reader(&mut data.as_bytes()).unwrap();

        assert_eq!(stat.cache, 100);
        assert_eq!(stat.rss, 200);
        assert_eq!(stat.shmem, 0);
        assert_eq!(
            stat,
            MemoryStat {
                cache: 100,
                rss: 200,
                ..MemoryStat::default()
            }
        );
    }

    #[test]
    fn test_parse_complete_v1_memory_stat() {
        let data = "\
cache 2162688
rss 929792
rss_huge 0
shmem 0
mapped_file 1351680
dirty 0
writeback 0
swap 0
pgpgin 2178
pgpgout 1421
pgfault 2871
pgmajfault 26
inactive_anon 925696
active_anon 0
inactive_file 1081344
active_file 1081344
unevictable 0
hierarchical_memory_limit 536870912
hierarchical_memsw_limit 9223372036854771712
total_cache 2162688
total_rss 929792
total_pgmajfault 26
total_unevictable 0
";
        let stat = MemoryStat::from_str_lossy(data);

        assert_eq!(stat.cache, 2_162_688);
        assert_eq!(stat.mapped_file, 1_351_680);
        assert_eq!(stat.pgmajfault, 26);
        assert_eq!(stat.inactive_anon, 925_696);
        assert_eq!(stat.active_file, 1_081_344);
        assert_eq!(stat.hierarchical_memory_limit, 536_870_912);
        assert_eq!(stat.hierarchical_memsw_limit, 9_223_372_036_854_771_712);
        assert_eq!(stat.total_cache, 2_162_688);
        assert_eq!(stat.total_rss, 929_792);
        assert_eq!(stat.total_pgmajfault, 26);
        assert_eq!(stat.total_swap, 0);
    }

    #[test]
    fn test_parse_v2_memory_stat() {
        let data = "\
anon 1000
file 2000
kernel 512
kernel_stack 300
slab 400
sock 500
shmem 600
file_mapped 700
workingset_refault_file 12
pgscan 34
pgsteal 30
pgfault 99
";
        let stat = MemoryStatV2::from_str_lossy(data);

        assert_eq!(stat.anon, 1000);
        assert_eq!(stat.file, 2000);
        assert_eq!(stat.kernel, 512);
        assert_eq!(stat.kernel_stack, 300);
        assert_eq!(stat.slab, 400);
        assert_eq!(stat.sock, 500);
        assert_eq!(stat.file_mapped, 700);
        assert_eq!(stat.workingset_refault_file, 12);
        assert_eq!(stat.pgscan, 34);
        assert_eq!(stat.pgsteal, 30);
        assert_eq!(stat.vmalloc, 0);
    }

    #[test]
    fn test_schemas_do_not_cross_read() {
        let v1_data = "cache 100\nrss 200\n";
        assert_eq!(MemoryStatV2::from_str_lossy(v1_data), MemoryStatV2::default());

        let v2_data = "anon 100\nfile 200\n";
        assert_eq!(MemoryStat::from_str_lossy(v2_data), MemoryStat::default());
    }

    #[test]
    fn test_schemas_share_no_keys() {
        let v1_keys = MemoryStat::field_handlers();
        for key in MemoryStatV2::field_handlers().keys() {
            assert!(!v1_keys.contains_key(key), "`{key}` is in both schemas");
        }
    }

    #[test]
    fn test_invalid_value_reads_as_zero() {
        let stat = MemoryStatV2::from_str_lossy("anon abc\nfile 2000\n");
        assert_eq!(stat.anon, 0);
        assert_eq!(stat.file, 2000);
    }

    #[test]
    fn test_memory_stats_serializes_with_version_tag() {
        let stats = MemoryStats::V2(MemoryStatV2 {
            anon: 1,
            ..MemoryStatV2::default()
        });
        assert_eq!(stats.version(), 2);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["cgroup_version"], "v2");
        assert_eq!(json["anon"], 1);
    }
}

use std::fs;
use std::path::Path;

use crate::cgroup::ControllerTable;
use crate::config::Config;
use crate::fsutil;

use super::{Error, Result};

const CONTAINER_MARKERS: [&str; 4] = ["docker", "kubepods", "containerd", "libpod"];

/// Returns true if `<rootfs>/proc` exists.
///
/// # Errors
///
/// Returns [`Error::ExistenceCheck`] if the existence of the directory cannot be checked.
pub(super) fn contains_proc_mount(rootfs: &Path) -> Result<bool> {
    let path = rootfs.join("proc");

    path.try_exists()
        .map_err(|source| Error::ExistenceCheck { path, source })
}

/// Returns true if the current process and PID 1 live in different PID namespaces.
///
/// Both links are resolved under `rootfs`.
///
/// # Errors
///
/// Returns [`Error::ReadSymlink`] if either namespace link cannot be read.
pub(super) fn is_pid_namespace_isolated(rootfs: &Path) -> Result<bool> {
    let read_ns = |relative: &str| {
        let path = rootfs.join(relative);
        fs::read_link(&path).map_err(|source| Error::ReadSymlink { path, source })
    };

    let self_ns = read_ns("proc/self/ns/pid")?;
    let init_ns = read_ns("proc/1/ns/pid")?;
    Ok(self_ns != init_ns)
}

/// Returns true if any cgroup path of the process names a container runtime or
/// contains a container id.
///
/// # Errors
///
/// Returns [`Error::Membership`] if the membership file cannot be read.
pub(super) fn matches_container_cgroup(config: &Config) -> Result<bool> {
    let data = fsutil::read_to_string(config.membership_file())?;
    let table = ControllerTable::parse(&data);

    Ok(table.lines().iter().any(|line| {
        CONTAINER_MARKERS
            .iter()
            .any(|marker| line.subpath.contains(marker))
            || line.subpath.split('/').any(is_container_id)
    }))
}

/// Returns true if marker files under `rootfs` or the `container` variable are present.
pub(super) fn has_container_indicators(rootfs: &Path) -> bool {
    rootfs.join(".dockerenv").exists()
        || rootfs.join("run/.containerenv").exists()
        || std::env::var_os("container").is_some()
}

/// Returns true if the Docker marker file `/.dockerenv` exists under the configured rootfs.
pub fn run_in_docker(config: &Config) -> bool {
    config.rootfs().join(".dockerenv").exists()
}

/// Returns true for a path segment that looks like a container id: at least 32 hex
/// digits, optionally wrapped as `docker-<id>.scope` or `cri-containerd-<id>.scope`.
pub fn is_container_id(segment: &str) -> bool {
    let id = segment.strip_suffix(".scope").unwrap_or(segment);
    let id = id.rsplit('-').next().unwrap_or(id);
    id.len() >= 32 && id.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "4f3c2b1a0e9d8c7b6a5f4e3d2c1b0a9f8e7d6c5b4a3f2e1d0c9b8a7f6e5d4c3b";

    #[test]
    fn test_is_container_id() {
        assert!(is_container_id(ID));
        assert!(is_container_id(&format!("docker-{ID}.scope")));
        assert!(is_container_id(&format!("cri-containerd-{ID}.scope")));
    }

    #[test]
    fn test_is_not_container_id() {
        assert!(!is_container_id(""));
        assert!(!is_container_id("user.slice"));
        assert!(!is_container_id("deadbeef"));
        assert!(!is_container_id(&format!("{}xyz", &ID[..40])));
    }

    #[test]
    fn test_matches_container_cgroup() {
        let rootfs = tempfile::tempdir().unwrap();
        let config = Config::with_rootfs(rootfs.path());
        fs::create_dir_all(rootfs.path().join("proc/self")).unwrap();

        fs::write(config.membership_file(), "0::/user.slice/user-1000.slice\n").unwrap();
        assert!(!matches_container_cgroup(&config).unwrap());

        fs::write(config.membership_file(), "0::/kubepods/burstable/pod1\n").unwrap();
        assert!(matches_container_cgroup(&config).unwrap());

        fs::write(config.membership_file(), format!("0::/system.slice/{ID}\n")).unwrap();
        assert!(matches_container_cgroup(&config).unwrap());
    }

    #[test]
    fn test_matches_container_cgroup_unreadable() {
        let rootfs = tempfile::tempdir().unwrap();
        let config = Config::with_rootfs(rootfs.path());
        assert!(matches!(
            matches_container_cgroup(&config),
            Err(Error::Membership(_))
        ));
    }

    #[test]
    fn test_run_in_docker() {
        let rootfs = tempfile::tempdir().unwrap();
        let config = Config::with_rootfs(rootfs.path());
        assert!(!run_in_docker(&config));

        fs::write(rootfs.path().join(".dockerenv"), "").unwrap();
        assert!(run_in_docker(&config));
    }

    #[test]
    fn test_contains_proc_mount() {
        let rootfs = tempfile::tempdir().unwrap();
        assert!(!contains_proc_mount(rootfs.path()).unwrap());
        fs::create_dir(rootfs.path().join("proc")).unwrap();
        assert!(contains_proc_mount(rootfs.path()).unwrap());
    }
}

//! Filesystem locations read by the cgroup engine.
//!
//! Nothing in this crate opens a hard-coded absolute path: every read goes
//! through a [`Config`], so the engine can be pointed at a host root mounted
//! into a container or at a fixture directory in tests.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::mountinfo;

const DEFAULT_ROOTFS: &str = "/";
const DEFAULT_CGROUP_ROOT: &str = "sys/fs/cgroup";
const DEFAULT_MEMBERSHIP_FILE: &str = "proc/self/cgroup";
const DEFAULT_CPU_ONLINE_FILE: &str = "sys/devices/system/cpu/online";
const DEFAULT_MOUNTINFO_FILE: &str = "proc/self/mountinfo";

/// Root-path configuration injected into every resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    rootfs: PathBuf,
    cgroup_root: PathBuf,
    membership_file: PathBuf,
    cpu_online_file: PathBuf,
    mountinfo_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_rootfs(DEFAULT_ROOTFS)
    }
}

impl Config {
    /// Builds a configuration with every default location placed under `rootfs`.
    ///
    /// # Example
    ///
    /// ```
    /// # use cgroup_limits::Config;
    /// let config = Config::with_rootfs("/rootfs");
    /// assert_eq!(config.cgroup_root(), std::path::Path::new("/rootfs/sys/fs/cgroup"));
    /// assert_eq!(config.membership_file(), std::path::Path::new("/rootfs/proc/self/cgroup"));
    /// ```
    pub fn with_rootfs(rootfs: impl Into<PathBuf>) -> Self {
        let rootfs = rootfs.into();
        Self {
            cgroup_root: rootfs.join(DEFAULT_CGROUP_ROOT),
            membership_file: rootfs.join(DEFAULT_MEMBERSHIP_FILE),
            cpu_online_file: rootfs.join(DEFAULT_CPU_ONLINE_FILE),
            mountinfo_file: rootfs.join(DEFAULT_MOUNTINFO_FILE),
            rootfs,
        }
    }

    /// Builds a configuration from environment variables.
    ///
    /// * `ROOTFS_MOUNT_PATH` - root under which all default locations are placed.
    /// * `CGROUP_ROOT` - cgroup filesystem mount point. When unset, the mount point is
    ///   discovered from `mountinfo`, falling back to `/sys/fs/cgroup`.
    /// * `CGROUP_MEMBERSHIP_FILE` - per-process cgroup membership file.
    /// * `CGROUP_CPU_ONLINE_FILE` - online CPU list.
    pub fn from_env() -> Self {
        let mut config = match std::env::var_os("ROOTFS_MOUNT_PATH") {
            Some(rootfs) => Self::with_rootfs(rootfs),
            None => Self::default(),
        };

        config = match env_path("CGROUP_ROOT") {
            Some(root) => config.with_cgroup_root(root),
            None => config.detect_cgroup_root(),
        };
        if let Some(path) = env_path("CGROUP_MEMBERSHIP_FILE") {
            config = config.with_membership_file(path);
        }
        if let Some(path) = env_path("CGROUP_CPU_ONLINE_FILE") {
            config = config.with_cpu_online_file(path);
        }

        log::debug!("Using cgroup configuration: {config:?}");
        config
    }

    /// Replaces the cgroup root with the mount point found in the `mountinfo` file.
    ///
    /// The configuration is returned unchanged if no usable cgroup mount is found.
    pub fn detect_cgroup_root(mut self) -> Self {
        let detected = mountinfo::detect_cgroup_root(&self.mountinfo_file)
            .and_then(|root| mountinfo::validate_cgroup_root(self.rebase(&root)));
        match detected {
            Ok(root) => {
                log::debug!("Detected cgroup root: {}", root.display());
                self.cgroup_root = root;
            }
            Err(err) => log::debug!(
                "Keeping cgroup root `{}`: {}",
                self.cgroup_root.display(),
                err
            ),
        }
        self
    }

    pub fn with_cgroup_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.cgroup_root = path.into();
        self
    }

    pub fn with_membership_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.membership_file = path.into();
        self
    }

    pub fn with_cpu_online_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cpu_online_file = path.into();
        self
    }

    pub fn with_mountinfo_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.mountinfo_file = path.into();
        self
    }

    pub fn rootfs(&self) -> &Path {
        &self.rootfs
    }

    /// Mount point of the cgroup filesystem, and the cgroup v2 root.
    pub fn cgroup_root(&self) -> &Path {
        &self.cgroup_root
    }

    /// The `/proc/self/cgroup` membership file.
    pub fn membership_file(&self) -> &Path {
        &self.membership_file
    }

    pub fn cpu_online_file(&self) -> &Path {
        &self.cpu_online_file
    }

    pub fn mountinfo_file(&self) -> &Path {
        &self.mountinfo_file
    }

    /// Root of a cgroup v1 controller hierarchy, e.g. `/sys/fs/cgroup/memory`.
    pub fn controller_root(&self, controller: &str) -> PathBuf {
        self.cgroup_root.join(controller)
    }

    /// Places an absolute host path under the configured rootfs.
    pub fn rebase(&self, path: &Path) -> PathBuf {
        self.rootfs.join(path.strip_prefix("/").unwrap_or(path))
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|value: &OsString| !value.is_empty())
        .map(PathBuf::from)
}

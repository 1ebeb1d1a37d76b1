use serde::Serialize;

use crate::config::Config;

use super::checks::{
    contains_proc_mount, has_container_indicators, is_pid_namespace_isolated,
    matches_container_cgroup,
};

/// Where the current process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Directly on the host.
    Host,
    /// Inside a container (Docker, Kubernetes, Podman, ...).
    Container,
}

/// Detects whether the current process runs in a container or on the host.
///
/// The checks run in order and the first positive one wins:
///
/// 1. `<rootfs>/proc` exists and PID 1 lives in another PID namespace.
/// 2. The membership file names a container runtime or a container id.
/// 3. A marker file (`/.dockerenv`, `/run/.containerenv`) or the `container`
///    variable is present.
///
/// A failing check is logged as a warning and counts as negative.
pub fn detect_runtime_environment(config: &Config) -> RuntimeEnvironment {
    let rootfs = config.rootfs();
    match contains_proc_mount(rootfs) {
        Ok(true) => match is_pid_namespace_isolated(rootfs) {
            Ok(true) => return RuntimeEnvironment::Container,
            Ok(false) => {}
            Err(err) => log::warn!(
                "Namespace check failed when detecting runtime environment: {}",
                err
            ),
        },
        Ok(false) => {}
        Err(err) => log::warn!("Failed to determine presence of /proc in rootfs: {}", err),
    }

    match matches_container_cgroup(config) {
        Ok(true) => return RuntimeEnvironment::Container,
        Ok(false) => {}
        Err(err) => log::warn!("Cgroup analysis failed during runtime detection: {}", err),
    }

    if has_container_indicators(rootfs) {
        return RuntimeEnvironment::Container;
    }

    RuntimeEnvironment::Host
}

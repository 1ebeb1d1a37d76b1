/// Entry point of the `cgroup-limits` binary.
///
/// Prints the effective CPU and memory limits of the current process as JSON.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=debug cargo run
/// ROOTFS_MOUNT_PATH=/rootfs cargo run
/// ```
fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    cgroup_limits::run()
}

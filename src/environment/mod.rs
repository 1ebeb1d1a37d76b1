//! Host or container?
//!
//! The cgroup engine works the same either way, but the answer explains the numbers it
//! reports: inside a container the limits usually come from the flattened layout.
mod checks;
mod detect;
mod error;

pub use checks::{is_container_id, run_in_docker};
pub use detect::{RuntimeEnvironment, detect_runtime_environment};
pub use error::{Error, Result};

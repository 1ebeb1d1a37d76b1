//! Discovery of the cgroup filesystem mount point from `/proc/<pid>/mountinfo`.
mod detect;
mod error;
mod parser;

pub use detect::{detect_cgroup_root, validate_cgroup_root};
pub use error::{Error, Result};
pub use parser::{MountInfo, ParseError, parse_mount_info_line};

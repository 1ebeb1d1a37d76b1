//! Mountinfo line parser for Linux systems.
//!
//! Parses lines in `/proc/[pid]/mountinfo` format. See
//! [`proc_pid_mountinfo(5)`](https://man7.org/linux/man-pages/man5/proc_pid_mountinfo.5.html)
//! for details on the structure:
//!
//! ```text
//! 36 35 98:0 /mnt1 /mnt2 rw,noatime master:1 - ext3 /dev/root rw,errors=continue
//! (1)(2)(3)   (4)   (5)      (6)      (7)   (8) (9)   (10)         (11)
//! ```

use std::borrow::Cow;

/// Represents a parsed mountinfo line.
#[derive(Debug, PartialEq, Eq)]
pub struct MountInfo<'a> {
    /// Root of the mount within the filesystem.
    pub root: Cow<'a, str>,
    /// Mount point relative to the process's root, with octal escapes decoded.
    pub mount_point: Cow<'a, str>,
    /// Per-mount options (e.g. `rw,nosuid`).
    pub mount_options: &'a str,
    /// Optional `tag[:value]` fields such as `shared:9`.
    pub optional_fields: Vec<&'a str>,
    /// Filesystem type (e.g., `cgroup`, `cgroup2`).
    pub fs_type: &'a str,
    /// Source of the mount (e.g., device).
    pub source: &'a str,
    /// Superblock options. For cgroup v1 mounts this lists the attached controllers.
    pub super_options: &'a str,
}

impl MountInfo<'_> {
    /// Returns `true` if this is a cgroup v1 hierarchy mount.
    pub fn is_cgroup_v1(&self) -> bool {
        self.fs_type == "cgroup"
    }

    /// Returns `true` if this is the cgroup v2 unified hierarchy mount.
    pub fn is_cgroup_v2(&self) -> bool {
        self.fs_type == "cgroup2"
    }
}

/// Errors that may occur when parsing a mountinfo line.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("missing separator ` - ` in line: `{0}`")]
    MissingSeparator(String),

    #[error("expected at least 6 fields before the separator in line: `{0}`")]
    TooFewFields(String),

    #[error("expected 3 fields after the separator in line: `{0}`")]
    TooFewFilesystemFields(String),
}

/// Parses a single line of mountinfo data.
///
/// # Errors
///
/// Returns [`ParseError`] if the separator or a required field is missing.
pub fn parse_mount_info_line(line: &str) -> Result<MountInfo<'_>, ParseError> {
    let line = line.trim_end_matches('\n');
    let (pre, post) = line
        .split_once(" - ")
        .ok_or_else(|| ParseError::MissingSeparator(line.to_owned()))?;

    let pre: Vec<&str> = pre.split_whitespace().collect();
    if pre.len() < 6 {
        return Err(ParseError::TooFewFields(line.to_owned()));
    }

    let post: Vec<&str> = post.split_whitespace().collect();
    if post.len() < 3 {
        return Err(ParseError::TooFewFilesystemFields(line.to_owned()));
    }

    Ok(MountInfo {
        root: unescape(pre[3]),
        mount_point: unescape(pre[4]),
        mount_options: pre[5],
        optional_fields: pre[6..].to_vec(),
        fs_type: post[0],
        source: post[1],
        super_options: post[2],
    })
}

/// Decodes the `\ooo` octal escapes the kernel uses for space, tab, newline and backslash.
fn unescape(field: &str) -> Cow<'_, str> {
    if !field.contains('\\') {
        return Cow::Borrowed(field);
    }

    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal_escape(&bytes[i + 1..i + 4]) {
            let value =
                (bytes[i + 1] - b'0') * 64 + (bytes[i + 2] - b'0') * 8 + (bytes[i + 3] - b'0');
            out.push(value);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Cow::Owned(String::from_utf8_lossy(&out).into_owned())
}

fn is_octal_escape(digits: &[u8]) -> bool {
    digits.len() == 3 && digits[0] <= b'3' && digits.iter().all(|d| (b'0'..=b'7').contains(d))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cgroup2_line() {
        let line = "35 24 0:30 / /sys/fs/cgroup rw,nosuid,nodev,noexec,relatime shared:9 - cgroup2 cgroup2 rw,nsdelegate\n";
        let info = parse_mount_info_line(line).unwrap();

        assert_eq!(info.root, "/");
        assert_eq!(info.mount_point, "/sys/fs/cgroup");
        assert_eq!(info.mount_options, "rw,nosuid,nodev,noexec,relatime");
        assert_eq!(info.optional_fields, vec!["shared:9"]);
        assert_eq!(info.fs_type, "cgroup2");
        assert_eq!(info.source, "cgroup2");
        assert_eq!(info.super_options, "rw,nsdelegate");
        assert!(info.is_cgroup_v2());
        assert!(!info.is_cgroup_v1());
    }

    #[test]
    fn parses_cgroup_v1_line_without_optional_fields() {
        let line = "30 25 0:26 / /sys/fs/cgroup/cpu,cpuacct rw,nosuid - cgroup cgroup rw,cpu,cpuacct";
        let info = parse_mount_info_line(line).unwrap();

        assert!(info.optional_fields.is_empty());
        assert_eq!(info.mount_point, "/sys/fs/cgroup/cpu,cpuacct");
        assert_eq!(info.super_options, "rw,cpu,cpuacct");
        assert!(info.is_cgroup_v1());
    }

    #[test]
    fn parses_multiple_optional_fields() {
        let line = "70 56 0:45 / /var rw,relatime shared:20 master:1 - ext4 /dev/sdb1 rw";
        let info = parse_mount_info_line(line).unwrap();
        assert_eq!(info.optional_fields, vec!["shared:20", "master:1"]);
        assert_eq!(info.fs_type, "ext4");
    }

    #[test]
    fn decodes_escaped_mount_point() {
        let line = r"40 25 0:50 / /mnt/with\040space rw - tmpfs tmpfs rw";
        let info = parse_mount_info_line(line).unwrap();
        assert_eq!(info.mount_point, "/mnt/with space");
    }

    #[test]
    fn leaves_invalid_escape_untouched() {
        assert_eq!(unescape(r"/a\9zz"), r"/a\9zz");
        assert_eq!(unescape(r"/trailing\04"), r"/trailing\04");
    }

    #[test]
    fn error_on_missing_separator() {
        let line = "42 35 0:22 / /mnt rw,nosuid ext4 /dev/sda1 rw";
        let err = parse_mount_info_line(line).unwrap_err();
        assert!(matches!(err, ParseError::MissingSeparator(_)));
    }

    #[test]
    fn error_on_missing_pre_separator_fields() {
        let line = "42 35 0:22 / /mnt - ext4 /dev/sda1 rw";
        let err = parse_mount_info_line(line).unwrap_err();
        assert!(matches!(err, ParseError::TooFewFields(_)));
    }

    #[test]
    fn error_on_missing_post_separator_fields() {
        let line = "42 35 0:22 / /mnt rw - ext4 /dev/sda1";
        let err = parse_mount_info_line(line).unwrap_err();
        assert!(matches!(err, ParseError::TooFewFilesystemFields(_)));
    }

    #[test]
    fn error_on_empty_line() {
        let err = parse_mount_info_line("").unwrap_err();
        assert!(matches!(err, ParseError::MissingSeparator(_)));
    }
}

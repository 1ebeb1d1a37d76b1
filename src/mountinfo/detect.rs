use crate::fsutil;

use super::parser::parse_mount_info_line;
use super::{Error, Result};
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Canonicalizes a cgroup root and checks that it is a directory.
///
/// # Errors
///
/// - [`Error::Canonicalization`] if the path cannot be canonicalized.
/// - [`Error::Metadata`] if the metadata of the resolved path cannot be read.
/// - [`Error::NotADirectory`] if the resolved path is not a directory.
pub fn validate_cgroup_root(path: impl AsRef<Path>) -> Result<PathBuf> {
    let raw = path.as_ref();
    let canonical = std::fs::canonicalize(raw).map_err(|e| Error::Canonicalization {
        path: raw.to_path_buf(),
        source: e,
    })?;

    let metadata = std::fs::metadata(&canonical).map_err(|e| Error::Metadata {
        path: canonical.clone(),
        source: e,
    })?;

    if !metadata.is_dir() {
        return Err(Error::NotADirectory { path: canonical });
    }

    Ok(canonical)
}

/// Detects the root of the cgroup filesystem by parsing a Linux `mountinfo` file.
///
/// cgroup v1 mounts one hierarchy per controller set below a shared root
/// (`/sys/fs/cgroup/cpu,cpuacct`, `/sys/fs/cgroup/memory`, ...), so when any v1
/// hierarchy is mounted the parent of its mount point is returned. Otherwise the
/// first `cgroup2` mount point is returned.
///
/// # Errors
///
/// - [`Error::FileOpen`] if the file can't be opened.
/// - [`Error::ReadLine`] if reading from the file fails.
/// - [`Error::Parse`] if parsing any line fails.
/// - [`Error::MissingCgroupMount`] if neither kind of cgroup mount is found.
///
/// # Example
///
/// ```no_run
/// use cgroup_limits::mountinfo::detect_cgroup_root;
///
/// let root = detect_cgroup_root("/proc/self/mountinfo").unwrap();
/// println!("cgroup root: {}", root.display());
/// ```
pub fn detect_cgroup_root(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let buf = fsutil::open_file_reader(path)?;

    detect_cgroup_root_from_reader(buf, path)
}

fn detect_cgroup_root_from_reader<R: BufRead>(mut reader: R, origin: &Path) -> Result<PathBuf> {
    let mut line = String::with_capacity(256);
    let mut lineno = 0;
    let mut unified = None;

    while reader
        .read_line(&mut line)
        .map_err(|source| Error::ReadLine {
            path: origin.to_path_buf(),
            source,
        })?
        != 0
    {
        lineno += 1;
        let mount_info = parse_mount_info_line(line.as_str()).map_err(|source| Error::Parse {
            path: origin.to_path_buf(),
            line: lineno,
            source,
        })?;

        if mount_info.is_cgroup_v1() {
            let mount_point = Path::new(mount_info.mount_point.as_ref());
            if let Some(parent) = mount_point.parent() {
                log::debug!(
                    "Found `cgroup` mount point `{}` with controllers `{}`",
                    mount_point.display(),
                    mount_info.super_options
                );
                return Ok(parent.to_path_buf());
            }
        } else if mount_info.is_cgroup_v2() && unified.is_none() {
            log::debug!(
                "Found `cgroup2` mount point with root `{}`: {}",
                mount_info.root,
                mount_info.mount_point
            );
            unified = Some(PathBuf::from(mount_info.mount_point.as_ref()));
        }

        line.clear();
    }

    unified.ok_or_else(|| Error::MissingCgroupMount {
        path: origin.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn new_cursor_from_contents(contents: &str) -> Cursor<Vec<u8>> {
        Cursor::new(contents.as_bytes().to_vec())
    }

    #[test]
    fn test_detect_unified_mount() {
        let input = "35 24 0:30 / /sys/fs/cgroup rw,nosuid,nodev,noexec,relatime shared:9 - cgroup2 cgroup2 rw\n";
        let reader = new_cursor_from_contents(input);

        let root = detect_cgroup_root_from_reader(reader, Path::new("/dummy")).unwrap();
        assert_eq!(root, PathBuf::from("/sys/fs/cgroup"));
    }

    #[test]
    fn test_detect_first_of_multiple_unified_mounts() {
        let input = "\
43 35 0:39 / /sys/fs/cgroup rw,nosuid - cgroup2 cgroup rw
42 35 0:39 / /ignored rw,nosuid - cgroup2 cgroup rw
";
        let reader = new_cursor_from_contents(input);

        let root = detect_cgroup_root_from_reader(reader, Path::new("/dummy")).unwrap();
        assert_eq!(root, PathBuf::from("/sys/fs/cgroup"));
    }

    #[test]
    fn test_detect_v1_root_in_hybrid_layout() {
        let input = "\
25 24 0:22 / /sys/fs/cgroup ro,nosuid shared:9 - tmpfs tmpfs ro,mode=755
26 25 0:23 / /sys/fs/cgroup/unified rw,nosuid shared:10 - cgroup2 cgroup2 rw
30 25 0:27 / /sys/fs/cgroup/cpu,cpuacct rw,nosuid shared:14 - cgroup cgroup rw,cpu,cpuacct
31 25 0:28 / /sys/fs/cgroup/memory rw,nosuid shared:15 - cgroup cgroup rw,memory
";
        let reader = new_cursor_from_contents(input);

        let root = detect_cgroup_root_from_reader(reader, Path::new("/dummy")).unwrap();
        assert_eq!(root, PathBuf::from("/sys/fs/cgroup"));
    }

    #[test]
    fn test_detect_missing_cgroup_mount() {
        let input = "25 1 0:24 / /proc rw,relatime - proc proc rw\n";
        let path = Path::new("/dummy");
        let reader = new_cursor_from_contents(input);

        let err = detect_cgroup_root_from_reader(reader, path).unwrap_err();
        match err {
            Error::MissingCgroupMount { path: err_path } => assert_eq!(err_path, path),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_detect_invalid_line() {
        let input = "25 1 0:24 / /proc rw,relatime - proc proc rw\ninvalid mountinfo line";
        let path = Path::new("/dummy");
        let reader = new_cursor_from_contents(input);

        let err = detect_cgroup_root_from_reader(reader, path).unwrap_err();
        match err {
            Error::Parse {
                path: err_path,
                line,
                ..
            } => {
                assert_eq!(err_path, path);
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_detect_from_tempfile() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(
            tmp,
            "42 35 0:39 / /sys/fs/cgroup rw,nosuid,nodev,noexec,relatime - cgroup2 cgroup rw"
        )
        .unwrap();

        let root = detect_cgroup_root(tmp.path()).unwrap();
        assert_eq!(root, PathBuf::from("/sys/fs/cgroup"));
    }

    #[test]
    fn test_detect_missing_file() {
        let err = detect_cgroup_root("/definitely/does/not/exist").unwrap_err();
        assert!(matches!(err, Error::FileOpen(_)));
    }

    #[test]
    #[cfg(target_family = "unix")]
    fn test_validate_cgroup_root_symlink() {
        use std::os::unix::fs as unix_fs;
        let tempdir = tempfile::tempdir().unwrap();

        let symlink_path = tempdir.path().join("symlink_dir");
        unix_fs::symlink(tempdir.path(), &symlink_path).unwrap();

        let resolved = validate_cgroup_root(&symlink_path).unwrap();
        assert_eq!(resolved, std::fs::canonicalize(&symlink_path).unwrap());
    }

    #[test]
    fn test_validate_cgroup_root_not_directory() {
        let tempdir = tempfile::tempdir().unwrap();
        let file_path = tempdir.path().join("file");
        std::fs::write(&file_path, "content").unwrap();

        let err = validate_cgroup_root(&file_path).unwrap_err();
        assert!(matches!(err, Error::NotADirectory { .. }));
    }

    #[test]
    fn test_validate_cgroup_root_missing() {
        let tempdir = tempfile::tempdir().unwrap();
        let err = validate_cgroup_root(tempdir.path().join("non_existent")).unwrap_err();
        assert!(matches!(err, Error::Canonicalization { .. }));
    }
}

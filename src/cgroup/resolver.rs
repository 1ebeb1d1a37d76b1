use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::fsutil;

use super::membership::{ControllerHint, ControllerTable};
use super::stats::parse_stat_value;
use super::{Error, Result};

/// A candidate location of a cgroup control file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub root: PathBuf,
    /// Cgroup path relative to `root`. Empty for the flattened layout.
    pub subpath: PathBuf,
    pub file_name: String,
}

impl ResolvedPath {
    fn flattened(root: &Path, file_name: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            subpath: PathBuf::new(),
            file_name: file_name.to_owned(),
        }
    }

    fn nested(root: &Path, subpath: &str, file_name: &str) -> Self {
        // The membership file reports absolute cgroup paths; `join` would discard `root`.
        let subpath = subpath.trim_start_matches('/');
        Self {
            root: root.to_path_buf(),
            subpath: PathBuf::from(subpath),
            file_name: file_name.to_owned(),
        }
    }

    /// The full path of the candidate file.
    pub fn path(&self) -> PathBuf {
        self.root.join(&self.subpath).join(&self.file_name)
    }
}

/// The contents of a control file and where they were found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub location: ResolvedPath,
    pub contents: String,
}

impl ResolvedFile {
    pub fn path(&self) -> PathBuf {
        self.location.path()
    }
}

fn try_read(location: ResolvedPath) -> std::result::Result<ResolvedFile, fsutil::FileReadError> {
    let path = location.path();
    log::trace!("Trying cgroup file {}", path.display());
    let contents = fsutil::read_to_string(&path)?;
    Ok(ResolvedFile { location, contents })
}

/// Reads `file_name` from the first location that can be read.
///
/// 1. `sysfs_root/file_name`, the flattened layout where the cgroup root is the
///    process's own cgroup.
/// 2. `sysfs_root/<subpath>/file_name`, where `<subpath>` is taken from the first
///    membership line matching `hint`.
///
/// The membership file is only read if the first candidate fails. Nothing is cached.
///
/// # Errors
///
/// - [`Error::NotFound`] if neither candidate exists.
/// - [`Error::ControllerNotFound`] if the first candidate is missing and no membership
///   line matches `hint`.
/// - [`Error::Read`] if the membership file or the nested candidate cannot be read for
///   a reason other than absence.
/// - [`Error::Unsupported`] on platforms without cgroups.
pub fn read_file_contents(
    config: &Config,
    file_name: &str,
    sysfs_root: &Path,
    hint: ControllerHint<'_>,
) -> Result<ResolvedFile> {
    match try_read(ResolvedPath::flattened(sysfs_root, file_name)) {
        Ok(file) => return Ok(file),
        Err(err) => log::trace!("{err}"),
    }

    let table = ControllerTable::load(config)?;
    let subpath = table.require_subpath(hint, config)?;

    try_read(ResolvedPath::nested(sysfs_root, subpath, file_name)).map_err(|err| {
        if err.is_not_found() {
            Error::NotFound {
                file_name: file_name.to_owned(),
                root: sysfs_root.to_path_buf(),
            }
        } else {
            Error::Read(err)
        }
    })
}

/// Reads a control file holding a single integer.
///
/// # Errors
///
/// Any error of [`read_file_contents`], or [`Error::Parse`] if the first readable
/// candidate does not hold an integer. A parse failure does not fall through to the
/// next candidate.
pub fn read_stat(
    config: &Config,
    file_name: &str,
    sysfs_root: &Path,
    hint: ControllerHint<'_>,
) -> Result<i64> {
    let file = read_file_contents(config, file_name, sysfs_root, hint)?;
    parse_stat_value(&file.contents).map_err(|err| Error::parse(file.path(), err))
}

//! The per-process cgroup membership file, `/proc/<pid>/cgroup`.
//!
//! ```text
//! <hierarchy-id>:<controller-list>:<cgroup-path>
//!   <hierarchy-id>:    v1: arbitrary number       v2: always `0`
//!   <controller-list>: v1: e.g. `cpu,cpuacct`     v2: always empty
//!   <cgroup-path>:     path relative to the mount point of the hierarchy
//! ```
//!
//! A pure cgroup v2 host has a single `0::<path>` line; v1 and hybrid hosts list one
//! line per mounted hierarchy.

use std::fmt;

use crate::config::Config;
use crate::error::ResultOkLogExt;

use super::{Error, Result};

/// Literal prefix of the unified hierarchy line.
pub const UNIFIED_MARKER: &str = "0::/";

/// Selects the membership line whose subpath applies to a control file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerHint<'a> {
    /// A cgroup v1 hierarchy that has the named controller attached, e.g. `memory`.
    Controller(&'a str),
    /// The cgroup v2 unified hierarchy.
    Unified,
}

impl<'a> From<&'a str> for ControllerHint<'a> {
    /// Maps the unified marker `0::/` (and the empty controller list) to
    /// [`ControllerHint::Unified`]; any other token names a controller.
    fn from(token: &'a str) -> Self {
        match token {
            "" | UNIFIED_MARKER => ControllerHint::Unified,
            name => ControllerHint::Controller(name),
        }
    }
}

impl fmt::Display for ControllerHint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerHint::Controller(name) => write!(f, "controller `{name}`"),
            ControllerHint::Unified => write!(f, "the unified hierarchy"),
        }
    }
}

/// One line of the membership file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerLine {
    pub hierarchy_id: u32,
    /// Controllers attached to the hierarchy. Empty for the unified hierarchy.
    pub controllers: Vec<String>,
    /// Path of the process's cgroup relative to the hierarchy root.
    pub subpath: String,
}

impl ControllerLine {
    /// Parses a `hierarchy-id:controllers:subpath` line.
    ///
    /// Returns `None` if the line does not have three fields or the id is not a number.
    /// The subpath may itself contain `:`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.trim_end().splitn(3, ':');
        let hierarchy_id = fields.next()?.parse::<u32>().ok()?;
        let controllers = fields
            .next()?
            .split(',')
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect();
        let subpath = fields.next()?.to_owned();

        Some(Self {
            hierarchy_id,
            controllers,
            subpath,
        })
    }

    /// Returns `true` for the `0::<path>` line of the unified hierarchy.
    pub fn is_unified(&self) -> bool {
        self.hierarchy_id == 0 && self.controllers.is_empty()
    }

    /// Controller names are compared whole, so `cpu` never selects a `cpuset` line.
    pub fn matches(&self, hint: ControllerHint<'_>) -> bool {
        match hint {
            ControllerHint::Controller(name) => self.controllers.iter().any(|c| c == name),
            ControllerHint::Unified => self.is_unified(),
        }
    }
}

/// The membership file as an ordered list of [`ControllerLine`]s.
///
/// Built fresh on every lookup; nothing is cached between calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerTable {
    lines: Vec<ControllerLine>,
}

impl ControllerTable {
    /// Parses the contents of a membership file. Malformed lines are skipped.
    pub fn parse(data: &str) -> Self {
        let lines = data
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                let parsed = ControllerLine::parse(line);
                if parsed.is_none() {
                    log::trace!("skipping malformed cgroup membership line: {line:?}");
                }
                parsed
            })
            .collect();
        Self { lines }
    }

    /// Reads and parses the membership file named by `config`.
    ///
    /// # Errors
    ///
    /// - [`Error::Read`] if the file cannot be read.
    /// - [`Error::Unsupported`] on platforms without cgroups.
    #[cfg(target_os = "linux")]
    pub fn load(config: &Config) -> Result<Self> {
        let data = crate::fsutil::read_to_string(config.membership_file())?;
        Ok(Self::parse(&data))
    }

    /// Cgroups only exist on Linux; everywhere else the process is unconfined.
    #[cfg(not(target_os = "linux"))]
    pub fn load(_config: &Config) -> Result<Self> {
        Err(Error::Unsupported)
    }

    pub fn lines(&self) -> &[ControllerLine] {
        &self.lines
    }

    /// Returns the subpath of the first line matching `hint`, in file order.
    pub fn find_subpath(&self, hint: ControllerHint<'_>) -> Option<&str> {
        self.lines
            .iter()
            .find(|line| line.matches(hint))
            .map(|line| line.subpath.as_str())
    }

    /// Like [`ControllerTable::find_subpath`], reporting a missing entry as an error.
    pub(crate) fn require_subpath(&self, hint: ControllerHint<'_>, config: &Config) -> Result<&str> {
        self.find_subpath(hint)
            .ok_or_else(|| Error::ControllerNotFound {
                hint: hint.to_string(),
                path: config.membership_file().to_path_buf(),
            })
    }
}

/// Returns the cgroup path of the current process, or `/` if it cannot be determined.
///
/// The unified hierarchy path is preferred; on v1-only hosts the path of the `memory`
/// hierarchy is used.
pub fn cgroup_path(config: &Config) -> String {
    let Some(table) = ControllerTable::load(config).ok_log() else {
        return "/".to_owned();
    };

    table
        .find_subpath(ControllerHint::Unified)
        .or_else(|| table.find_subpath(ControllerHint::Controller("memory")))
        .unwrap_or("/")
        .to_owned()
}

/// Returns `true` if the current process is confined to a cgroup other than the root.
pub fn run_in_cgroup(config: &Config) -> bool {
    cgroup_path(config) != "/"
}

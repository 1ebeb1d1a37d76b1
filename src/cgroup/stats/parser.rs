//! Generic parsing of cgroup control files into typed values.
//!
//! # Traits and functions
//!
//! - [`KeyValueStat`]: projects a `<key> <value>` per line file such as `memory.stat`
//!   onto a fixed struct schema. Lines that are not exactly two tokens are skipped,
//!   values that fail to parse count as `0`, and keys missing from the file leave the
//!   field at `0`.
//! - [`parse_stat_value`]: parses a single-value file such as `memory.usage_in_bytes`.
//! - [`parse_first_integer`]: parses the first numeric token of a multi-line file such
//!   as `memory.oom_control`.
//!
//! # Example: Implementing `KeyValueStat`
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::LazyLock;
//! use cgroup_limits::cgroup::stats::KeyValueStat;
//!
//! #[derive(Default)]
//! struct MyStat {
//!     foo: i64,
//!     bar: i64,
//! }
//!
//! type Setter = fn(&mut MyStat, i64);
//!
//! static SETTERS: LazyLock<HashMap<&'static str, Setter>> = LazyLock::new(|| {
//!     let mut map: HashMap<&'static str, Setter> = HashMap::new();
//!     map.insert("foo", |s: &mut MyStat, v: i64| s.foo = v);
//!     map.insert("bar", |s: &mut MyStat, v: i64| s.bar = v);
//!     map
//! });
//!
//! impl KeyValueStat for MyStat {
//!     fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, i64)> {
//!         &SETTERS
//!     }
//! }
//!
//! let stat = MyStat::from_str_lossy("foo 1\nbar 2\nbaz 3\n");
//! assert_eq!((stat.foo, stat.bar), (1, 2));
//! ```

use std::collections::HashMap;
use std::io::BufRead;

use super::ParseError;

/// A trait for structs that are filled from a key-value style `*.stat` file.
///
/// Implementors list the keys they care about and how to store each value.
/// The file is first read into a key to value map, which is then projected onto
/// `Self::default()` through [`KeyValueStat::field_handlers`].
pub trait KeyValueStat: Default
where
    Self: 'static,
{
    /// Returns a map of known keys and the setter that stores the value on `Self`.
    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, i64)>;

    /// Reads a key-value formatted buffer and projects it onto `Self`.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` only if reading from `buf` fails. Malformed content
    /// never produces an error.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let values = parse_key_values(buf)?;
        Ok(Self::from_values(&values))
    }

    /// Parses already loaded file contents.
    fn from_str_lossy(data: &str) -> Self {
        Self::from_values(&parse_key_values_str(data))
    }

    /// Projects a parsed key-value map onto `Self`. Absent keys are stored as `0`.
    fn from_values(values: &HashMap<String, i64>) -> Self {
        let mut stat = Self::default();
        for (key, handler) in Self::field_handlers() {
            handler(&mut stat, values.get(*key).copied().unwrap_or(0));
        }
        stat
    }
}

/// Reads `<key> <value>` lines into a map.
///
/// Lines that do not split into exactly two whitespace-separated tokens are skipped.
/// A value that is not a valid `i64` is stored as `0`. If a key repeats, the last
/// occurrence wins.
///
/// # Errors
///
/// Returns an `io::Error` if reading a line fails.
pub fn parse_key_values<R: BufRead>(buf: &mut R) -> std::io::Result<HashMap<String, i64>> {
    let mut values = HashMap::new();
    let mut line = String::new();
    let mut lineno = 0;

    while buf.read_line(&mut line)? != 0 {
        lineno += 1;
        insert_key_value(&mut values, &line, lineno);
        line.clear();
    }

    Ok(values)
}

/// Same as [`parse_key_values`] for data that is already in memory.
pub fn parse_key_values_str(data: &str) -> HashMap<String, i64> {
    let mut values = HashMap::new();
    for (idx, line) in data.lines().enumerate() {
        insert_key_value(&mut values, line, idx + 1);
    }
    values
}

fn insert_key_value(values: &mut HashMap<String, i64>, line: &str, lineno: usize) {
    let mut tokens = line.split_whitespace();
    let (Some(key), Some(value), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        if !line.trim().is_empty() {
            log::trace!("skipping malformed stat line {lineno}: {:?}", line.trim_end());
        }
        return;
    };

    let value = value.parse::<i64>().unwrap_or_else(|err| {
        log::trace!("value of `{key}` at line {lineno} is not an integer: {err}");
        0
    });
    values.insert(key.to_owned(), value);
}

/// Parses a file holding a single decimal integer, ignoring surrounding whitespace.
///
/// # Errors
///
/// Returns [`ParseError::InvalidValue`] if the trimmed content is not an `i64`.
pub fn parse_stat_value(data: &str) -> Result<i64, ParseError> {
    let data = data.trim();
    data.parse::<i64>()
        .map_err(|source| ParseError::invalid_value(data, source))
}

/// Returns the first whitespace-separated token of `data` that is an integer.
///
/// `memory.oom_control` reads `oom_kill_disable 0\nunder_oom 0\n...`, so this yields
/// the `oom_kill_disable` flag.
///
/// # Errors
///
/// Returns [`ParseError::EmptyValue`] if no token is an integer.
pub fn parse_first_integer(data: &str) -> Result<i64, ParseError> {
    data.split_whitespace()
        .find_map(|token| token.parse::<i64>().ok())
        .ok_or(ParseError::EmptyValue)
}

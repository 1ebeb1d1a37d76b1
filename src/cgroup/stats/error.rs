//! Defines structured error types for parsing cgroup control files.
//!
//! # Error Types
//!
//! - [`ParseError::InvalidValue`]: a numeric token (e.g. in `memory.limit_in_bytes`) failed to parse.
//! - [`ParseError::EmptyValue`]: a single-value file contained no token at all.
//! - [`ParseError::CpuMaxFormat`]: `cpu.max` was not exactly `<quota> <period>`.
//! - [`ParseError::ZeroPeriod`]: the CPU period was zero.
//! - [`ParseError::CpuRange`]: an entry of a CPU list such as `0-3,5` was malformed.
//!
//! # Example
//!
//! ```rust
//! use cgroup_limits::cgroup::stats::{ParseError, parse_stat_value};
//!
//! let err = parse_stat_value("max\n").unwrap_err();
//! assert!(matches!(err, ParseError::InvalidValue { .. }));
//! ```

use std::num::ParseIntError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid value '{value}': {source}")]
    InvalidValue {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("no value found")]
    EmptyValue,

    #[error("unexpected line format: want 'quota period'; got: '{line}'")]
    CpuMaxFormat { line: String },

    #[error("cpu period must not be zero")]
    ZeroPeriod,

    #[error("invalid cpu list entry '{entry}'")]
    CpuRange { entry: String },
}

impl ParseError {
    pub(crate) fn invalid_value(value: &str, source: ParseIntError) -> Self {
        Self::InvalidValue {
            value: value.to_string(),
            source,
        }
    }
}

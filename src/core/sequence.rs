//! Sequential per-hub codes for manifests and delivery run sheets
//!
//! Codes look like `BLRA000123`: the first three characters of the hub
//! name upper-cased, a series letter, and a six-digit serial. When the
//! serial passes `999999` the letter advances; past `Z` the series is
//! exhausted.
//!
//! Issuing a code is a read-compute-CAS loop against a dedicated counter
//! per series and prefix, so two concurrent creations for the same hub
//! never receive the same code.

use crate::core::error::{ConflictError, DocketResult, StorageError, ValidationError};
use crate::core::service::SequenceStore;
use std::fmt;
use std::sync::Arc;

const PREFIX_LEN: usize = 3;
const SERIAL_DIGITS: usize = 6;
const MAX_SERIAL: u32 = 999_999;

/// Which aggregate a code is issued for; each keeps its own counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeSeries {
    Manifest,
    Drs,
}

impl CodeSeries {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeSeries::Manifest => "manifest",
            CodeSeries::Drs => "drs",
        }
    }
}

impl fmt::Display for CodeSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prefix of every code issued for `hub_name`
pub fn code_prefix(hub_name: &str) -> Result<String, ValidationError> {
    let trimmed = hub_name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::field(
            "name",
            "hub name is required to issue a code",
        ));
    }
    Ok(trimmed
        .chars()
        .take(PREFIX_LEN)
        .collect::<String>()
        .to_uppercase())
}

/// The code following `last` for `hub_name`'s prefix
///
/// `last == None` starts the series at `<PREFIX>A000001`.
pub fn next_code(hub_name: &str, last: Option<&str>) -> DocketResult<String> {
    let prefix = code_prefix(hub_name)?;
    next_code_for_prefix(&prefix, last)
}

fn next_code_for_prefix(prefix: &str, last: Option<&str>) -> DocketResult<String> {
    let Some(last) = last else {
        return Ok(format_code(prefix, 'A', 1));
    };

    let malformed = || StorageError::Integrity {
        message: format!("stored code '{last}' does not follow the '{prefix}' series"),
    };

    let rest = last.strip_prefix(prefix).ok_or_else(malformed)?;
    let mut chars = rest.chars();
    let letter = chars
        .next()
        .filter(|c| c.is_ascii_uppercase())
        .ok_or_else(malformed)?;
    let tail = chars.as_str();
    if tail.is_empty() || !tail.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed().into());
    }
    let serial: u32 = tail.parse().map_err(|_| malformed())?;

    if serial < MAX_SERIAL {
        return Ok(format_code(prefix, letter, serial + 1));
    }
    if letter == 'Z' {
        return Err(ConflictError::SeriesExhausted {
            prefix: prefix.to_string(),
        }
        .into());
    }
    let next_letter = char::from(letter as u8 + 1);
    Ok(format_code(prefix, next_letter, 1))
}

fn format_code(prefix: &str, letter: char, serial: u32) -> String {
    format!("{prefix}{letter}{serial:0width$}", width = SERIAL_DIGITS)
}

/// Issues codes against a [`SequenceStore`]
#[derive(Clone)]
pub struct CodeGenerator {
    store: Arc<dyn SequenceStore>,
    max_attempts: u32,
}

impl CodeGenerator {
    pub fn new(store: Arc<dyn SequenceStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Issue the next code of `series` for `hub_name`
    ///
    /// A code is consumed even if the caller later fails to persist its
    /// aggregate; series may have gaps but never duplicates.
    pub async fn issue(&self, series: CodeSeries, hub_name: &str) -> DocketResult<String> {
        let prefix = code_prefix(hub_name)?;
        let key = format!("{series}:{prefix}");

        for attempt in 1..=self.max_attempts {
            let current = self.store.current(&key).await?;
            let next = next_code_for_prefix(&prefix, current.as_deref())?;

            if self
                .store
                .compare_and_set(&key, current.as_deref(), &next)
                .await?
            {
                tracing::debug!(%key, code = %next, attempt, "issued code");
                return Ok(next);
            }

            tracing::debug!(%key, attempt, "code counter moved, retrying");
        }

        Err(ConflictError::SequenceContention {
            key,
            attempts: self.max_attempts,
        }
        .into())
    }
}

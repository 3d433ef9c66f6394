//! Claim numbers
//!
//! Claim numbers have the form `WC-<year>-<sequence>`, the sequence being
//! zero-padded to six digits. The sequence comes from the claim store's
//! per-year counter, which is incremented atomically, so two concurrent
//! submissions never share a number.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

const PREFIX: &str = "WC";

/// Human-readable claim identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ClaimNumber {
    year: i32,
    sequence: u64,
}

impl ClaimNumber {
    pub fn new(year: i32, sequence: u64) -> Self {
        Self { year, sequence }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl fmt::Display for ClaimNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:04}-{:06}", PREFIX, self.year, self.sequence)
    }
}

impl FromStr for ClaimNumber {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || WorkflowError::validation(format!("Invalid claim number: {}", s));

        let mut parts = s.split('-');
        if parts.next() != Some(PREFIX) {
            return Err(invalid());
        }
        let year = parts.next().and_then(|y| y.parse::<i32>().ok()).ok_or_else(invalid)?;
        let sequence = parts.next().and_then(|n| n.parse::<u64>().ok()).ok_or_else(invalid)?;
        if parts.next().is_some() || sequence == 0 {
            return Err(invalid());
        }
        Ok(Self { year, sequence })
    }
}

impl From<ClaimNumber> for String {
    fn from(number: ClaimNumber) -> String {
        number.to_string()
    }
}

impl TryFrom<String> for ClaimNumber {
    type Error = WorkflowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

//! Fixed-point completion times
//!
//! Times are kept as whole hundredths of a second so that ranking and
//! display never see floating-point artifacts (12.34 stays 12.34).
//! Serialized as a decimal string: `"12.34"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hundredths per second (2 implied fractional digits)
const SCALE: i64 = 100;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimeError {
    #[error("completion time cannot be negative")]
    Negative,
    #[error("completion time must be finite")]
    NotFinite,
    #[error("completion time out of range")]
    Overflow,
    #[error("malformed completion time '{0}'")]
    Malformed(String),
}

/// Completion time with two decimal places, never negative
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompletionTime(i64);

impl CompletionTime {
    pub const ZERO: CompletionTime = CompletionTime(0);

    /// Create from whole hundredths of a second
    pub fn from_hundredths(hundredths: i64) -> Result<Self, TimeError> {
        if hundredths < 0 {
            return Err(TimeError::Negative);
        }
        Ok(CompletionTime(hundredths))
    }

    /// Create from seconds, rounded to two decimals (ties to even)
    pub fn from_seconds(seconds: f64) -> Result<Self, TimeError> {
        if !seconds.is_finite() {
            return Err(TimeError::NotFinite);
        }
        if seconds < 0.0 {
            return Err(TimeError::Negative);
        }
        let scaled = (seconds * SCALE as f64).round_ties_even();
        if scaled >= i64::MAX as f64 {
            return Err(TimeError::Overflow);
        }
        Ok(CompletionTime(scaled as i64))
    }

    pub fn hundredths(self) -> i64 {
        self.0
    }
}

impl fmt::Display for CompletionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / SCALE, self.0 % SCALE)
    }
}

impl FromStr for CompletionTime {
    type Err = TimeError;

    /// Accepts `S`, `S.H` and `S.HH`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || TimeError::Malformed(s.to_string());
        let s_trim = s.trim();
        if s_trim.starts_with('-') {
            return Err(TimeError::Negative);
        }

        let (whole, frac) = match s_trim.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s_trim, ""),
        };
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || frac.len() > 2 || !all_digits(frac) {
            return Err(malformed());
        }
        if s_trim.ends_with('.') {
            return Err(malformed());
        }

        let whole: i64 = whole.parse().map_err(|_| TimeError::Overflow)?;
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| malformed())? * 10,
            _ => frac.parse().map_err(|_| malformed())?,
        };

        whole
            .checked_mul(SCALE)
            .and_then(|v| v.checked_add(frac))
            .map(CompletionTime)
            .ok_or(TimeError::Overflow)
    }
}

impl TryFrom<String> for CompletionTime {
    type Error = TimeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CompletionTime> for String {
    fn from(t: CompletionTime) -> Self {
        t.to_string()
    }
}

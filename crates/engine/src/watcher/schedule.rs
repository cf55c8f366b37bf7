//! Tick schedules for watcher loops.
//!
//! Supported forms:
//! - `"30s"`, `"5m"`, `"1h"` or a bare number of seconds
//! - `"* * * * *"` (every minute) and `"*/N * * * *"` (every N minutes)
//! - `"*/N * * * * *"` (every N seconds, six-field form)

use std::fmt;
use std::time::Duration;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    every: Duration,
}

impl Schedule {
    pub fn every(every: Duration) -> Self {
        Self { every }
    }

    pub fn parse(expr: &str) -> Result<Self> {
        let expr = expr.trim();
        let invalid = || EngineError::Configuration(format!("Unsupported schedule '{}'", expr));

        let fields: Vec<&str> = expr.split_whitespace().collect();
        let secs = match fields.len() {
            1 => parse_duration(fields[0]).ok_or_else(invalid)?,
            5 | 6 => {
                if fields[1..].iter().any(|f| *f != "*") {
                    return Err(invalid());
                }
                let unit = if fields.len() == 6 { 1 } else { 60 };
                let step = match fields[0] {
                    "*" => 1,
                    step => step
                        .strip_prefix("*/")
                        .and_then(|n| n.parse::<u64>().ok())
                        .ok_or_else(invalid)?,
                };
                step * unit
            }
            _ => return Err(invalid()),
        };

        if secs == 0 {
            return Err(invalid());
        }
        Ok(Self::every(Duration::from_secs(secs)))
    }

    pub fn interval(&self) -> Duration {
        self.every
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "every {}s", self.every.as_secs())
    }
}

fn parse_duration(token: &str) -> Option<u64> {
    let split = token.find(|c: char| !c.is_ascii_digit()).unwrap_or(token.len());
    let (number, unit) = token.split_at(split);
    let n: u64 = number.parse().ok()?;
    let factor = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        _ => return None,
    };
    n.checked_mul(factor)
}

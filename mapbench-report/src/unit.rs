//! Output Time Units

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit durations are reported in; throughput is reported as operations per
/// this unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Nanoseconds
    Ns,
    /// Microseconds
    Us,
    /// Milliseconds
    #[default]
    Ms,
    /// Seconds
    S,
}

impl TimeUnit {
    /// Nanoseconds in one unit
    pub fn nanos(self) -> f64 {
        match self {
            TimeUnit::Ns => 1.0,
            TimeUnit::Us => 1e3,
            TimeUnit::Ms => 1e6,
            TimeUnit::S => 1e9,
        }
    }

    /// Factor turning nanoseconds into this unit
    pub fn duration_factor(self) -> f64 {
        1.0 / self.nanos()
    }

    /// Factor turning operations per second into operations per this unit
    pub fn rate_factor(self) -> f64 {
        self.nanos() / 1e9
    }

    /// Unit label for a mode's metric
    pub fn metric_label(self, is_rate: bool) -> String {
        if is_rate {
            format!("ops/{}", self)
        } else {
            format!("{}/op", self)
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeUnit::Ns => "ns",
            TimeUnit::Us => "us",
            TimeUnit::Ms => "ms",
            TimeUnit::S => "s",
        })
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ns" | "nanos" | "nanoseconds" => Ok(TimeUnit::Ns),
            "us" | "µs" | "micros" | "microseconds" => Ok(TimeUnit::Us),
            "ms" | "millis" | "milliseconds" => Ok(TimeUnit::Ms),
            "s" | "sec" | "seconds" => Ok(TimeUnit::S),
            other => Err(format!("Unknown time unit: {}", other)),
        }
    }
}

//! Flush policy evaluation.
//!
//! Pure functions of counters and thresholds. The write path asks
//! [`after_write`]; the interval scheduler only ever rotates on
//! [`Trigger::Interval`].

use crate::config::Config;
use crate::flush::Reason;
use std::time::Duration;

/// A kind of flush trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Write-count threshold.
    Writes,
    /// Byte-count threshold.
    Bytes,
    /// Rotation period.
    Interval,
}

impl Trigger {
    /// Returns the flush reason recorded when this trigger fires.
    #[must_use]
    pub const fn reason(self) -> Reason {
        match self {
            Trigger::Writes => Reason::Writes,
            Trigger::Bytes => Reason::Bytes,
            Trigger::Interval => Reason::Interval,
        }
    }
}

/// Counters of the currently open segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Writes since the segment opened.
    pub writes: u64,
    /// Bytes since the segment opened.
    pub bytes: u64,
}

/// The configured limits, zero meaning disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Thresholds {
    /// Write-count limit.
    pub writes: u64,
    /// Byte-count limit.
    pub bytes: u64,
    /// Rotation period.
    pub interval: Duration,
}

impl From<&Config> for Thresholds {
    fn from(config: &Config) -> Self {
        Self {
            writes: config.flush_writes,
            bytes: config.flush_bytes,
            interval: config.flush_interval,
        }
    }
}

/// Returns whether `trigger` calls for a flush.
///
/// Count triggers are due once their counter reaches a non-zero
/// threshold. The interval trigger is due on every tick when enabled.
#[must_use]
pub fn is_due(trigger: Trigger, counters: Counters, thresholds: &Thresholds) -> bool {
    match trigger {
        Trigger::Writes => thresholds.writes != 0 && counters.writes >= thresholds.writes,
        Trigger::Bytes => thresholds.bytes != 0 && counters.bytes >= thresholds.bytes,
        Trigger::Interval => !thresholds.interval.is_zero(),
    }
}

/// The triggers consulted after a successful write, in evaluation order.
pub const WRITE_TRIGGERS: [Trigger; 2] = [Trigger::Writes, Trigger::Bytes];

/// Returns the first write trigger that is due, if any.
#[must_use]
pub fn after_write(counters: Counters, thresholds: &Thresholds) -> Option<Trigger> {
    WRITE_TRIGGERS
        .into_iter()
        .find(|&trigger| is_due(trigger, counters, thresholds))
}

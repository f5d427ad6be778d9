//! Polling cadences

use std::fmt;
use std::time::Duration;
use watchtower_core::AppConfig;

/// Hot sources are cheap and high value; warm ones are expensive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadenceKind {
    Hot,
    Warm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub kind: CadenceKind,
    pub interval: Duration,
}

impl Cadence {
    pub fn hot(config: &AppConfig) -> Self {
        Self {
            kind: CadenceKind::Hot,
            interval: config.hot_interval,
        }
    }

    pub fn warm(config: &AppConfig) -> Self {
        Self {
            kind: CadenceKind::Warm,
            interval: config.warm_interval,
        }
    }

    /// A cadence with an explicit interval
    pub fn every(kind: CadenceKind, interval: Duration) -> Self {
        Self { kind, interval }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            CadenceKind::Hot => "hot",
            CadenceKind::Warm => "warm",
        };
        write!(f, "{kind}/{}ms", self.interval.as_millis())
    }
}

//! One-shot member directory synchronization between the primary and
//! secondary stores.

pub mod job;

pub use job::DirectorySyncJob;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::database::DatabaseError;

/// Which way(s) rows flow. The wire names are kept from the admin screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncDirection {
    #[serde(rename = "bidirectional")]
    Bidirectional,
    #[serde(rename = "source-to-dest")]
    PrimaryToSecondary,
    #[serde(rename = "dest-to-source")]
    SecondaryToPrimary,
}

/// A single copy pass from one store into the other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Leg {
    PrimaryToSecondary,
    SecondaryToPrimary,
}

impl SyncDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDirection::Bidirectional => "bidirectional",
            SyncDirection::PrimaryToSecondary => "source-to-dest",
            SyncDirection::SecondaryToPrimary => "dest-to-source",
        }
    }

    /// Legs in execution order; bidirectional pushes primary rows out first
    pub fn legs(&self) -> &'static [Leg] {
        match self {
            SyncDirection::Bidirectional => &[Leg::PrimaryToSecondary, Leg::SecondaryToPrimary],
            SyncDirection::PrimaryToSecondary => &[Leg::PrimaryToSecondary],
            SyncDirection::SecondaryToPrimary => &[Leg::SecondaryToPrimary],
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bidirectional" => Ok(SyncDirection::Bidirectional),
            "source-to-dest" => Ok(SyncDirection::PrimaryToSecondary),
            "dest-to-source" => Ok(SyncDirection::SecondaryToPrimary),
            other => Err(format!(
                "invalid sync direction '{}': expected bidirectional, source-to-dest or dest-to-source",
                other
            )),
        }
    }
}

/// A row that was read but not written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LegReport {
    pub leg: Leg,
    pub source: String,
    pub destination: String,
    pub read: usize,
    pub written: usize,
    pub failed: Vec<RowFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub direction: SyncDirection,
    pub legs: Vec<LegReport>,
}

impl SyncReport {
    pub fn written(&self) -> usize {
        self.legs.iter().map(|leg| leg.written).sum()
    }

    pub fn failed(&self) -> usize {
        self.legs.iter().map(|leg| leg.failed.len()).sum()
    }

    /// Operator-facing one line summary; row-level detail stays in the logs
    pub fn message(&self) -> String {
        let legs = self
            .legs
            .iter()
            .map(|leg| format!("{} -> {}: {}/{} rows", leg.source, leg.destination, leg.written, leg.read))
            .collect::<Vec<_>>()
            .join(", ");
        format!("Sync completed ({}): {}", self.direction, legs)
    }
}

/// Failures that abort a sync run. Per-row write failures never show up
/// here; they are recorded on the [`LegReport`].
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{store} store is unavailable: {source}")]
    Unavailable {
        store: String,
        #[source]
        source: DatabaseError,
    },

    #[error("failed to prepare {store} store: {source}")]
    Schema {
        store: String,
        #[source]
        source: DatabaseError,
    },

    #[error("failed to read members from {store} store: {source}")]
    Read {
        store: String,
        #[source]
        source: DatabaseError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_directions() {
        assert_eq!("bidirectional".parse::<SyncDirection>(), Ok(SyncDirection::Bidirectional));
        assert_eq!("source-to-dest".parse::<SyncDirection>(), Ok(SyncDirection::PrimaryToSecondary));
        assert_eq!("dest-to-source".parse::<SyncDirection>(), Ok(SyncDirection::SecondaryToPrimary));
        assert!("both".parse::<SyncDirection>().is_err());
    }

    #[test]
    fn serde_uses_wire_names() {
        let direction: SyncDirection = serde_json::from_str("\"dest-to-source\"").unwrap();
        assert_eq!(direction, SyncDirection::SecondaryToPrimary);
        assert_eq!(serde_json::to_string(&SyncDirection::PrimaryToSecondary).unwrap(), "\"source-to-dest\"");
    }

    #[test]
    fn bidirectional_runs_primary_leg_first() {
        assert_eq!(
            SyncDirection::Bidirectional.legs(),
            &[Leg::PrimaryToSecondary, Leg::SecondaryToPrimary]
        );
    }

    #[test]
    fn message_summarizes_each_leg() {
        let report = SyncReport {
            direction: SyncDirection::PrimaryToSecondary,
            legs: vec![LegReport {
                leg: Leg::PrimaryToSecondary,
                source: "primary".into(),
                destination: "secondary".into(),
                read: 3,
                written: 2,
                failed: vec![RowFailure { id: "m3".into(), reason: "duplicate email".into() }],
            }],
        };
        assert_eq!(report.message(), "Sync completed (source-to-dest): primary -> secondary: 2/3 rows");
        assert_eq!(report.failed(), 1);
        assert_eq!(report.written(), 2);
    }
}

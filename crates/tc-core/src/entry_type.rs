//! Entry type enum and the WORK/BREAK/OTHER classification.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::model::TimeEntry;

/// Category of a recorded time entry.
///
/// Unknown strings are kept verbatim in [`EntryType::Other`] so that new
/// categories introduced by the recording side never break aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryType {
    Work,
    Company,
    Office,
    Warehouse,
    Car,
    EmergencyService,
    Break,
    Vacation,
    Sick,
    Holiday,
    Other(String),
}

/// Aggregation bucket an entry falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryClass {
    Work,
    Break,
    Other,
}

impl EntryType {
    /// Returns the aggregation bucket for this type.
    pub const fn class(&self) -> EntryClass {
        match self {
            Self::Work
            | Self::Company
            | Self::Office
            | Self::Warehouse
            | Self::Car
            | Self::EmergencyService => EntryClass::Work,
            Self::Break => EntryClass::Break,
            Self::Vacation | Self::Sick | Self::Holiday | Self::Other(_) => EntryClass::Other,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Work => "work",
            Self::Company => "company",
            Self::Office => "office",
            Self::Warehouse => "warehouse",
            Self::Car => "car",
            Self::EmergencyService => "emergency_service",
            Self::Break => "break",
            Self::Vacation => "vacation",
            Self::Sick => "sick",
            Self::Holiday => "holiday",
            Self::Other(raw) => raw,
        }
    }
}

/// Classifies an entry into exactly one of WORK, BREAK or OTHER.
pub const fn classify(entry: &TimeEntry) -> EntryClass {
    entry.kind.class()
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for EntryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Work => "WORK",
            Self::Break => "BREAK",
            Self::Other => "OTHER",
        };
        write!(f, "{s}")
    }
}

impl FromStr for EntryType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "work" => Self::Work,
            "company" => Self::Company,
            "office" => Self::Office,
            "warehouse" => Self::Warehouse,
            "car" => Self::Car,
            "emergency_service" => Self::EmergencyService,
            "break" => Self::Break,
            "vacation" => Self::Vacation,
            "sick" => Self::Sick,
            "holiday" => Self::Holiday,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<&str> for EntryType {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl Serialize for EntryType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EntryType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // A missing or null type is treated like any other unknown category.
        let s = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(Self::from(s.as_str()))
    }
}

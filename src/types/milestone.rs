//! Milestone types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Identifier of a milestone within one text.
///
/// Milestone ids are non-negative and increase through a text, but they
/// need not be contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MilestoneId(u32);

impl MilestoneId {
    /// Create a milestone id.
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the raw id.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The id immediately after this one, if representable.
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for MilestoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for MilestoneId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl FromStr for MilestoneId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(Self)
    }
}

/// A segmented unit of a text: an id and the body that precedes its marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Milestone<'a> {
    /// Milestone id taken from the marker digits.
    pub id: MilestoneId,
    /// Raw, unnormalized body text.
    pub body: &'a str,
}

impl<'a> Milestone<'a> {
    /// Create a milestone.
    pub fn new(id: MilestoneId, body: &'a str) -> Self {
        Self { id, body }
    }
}

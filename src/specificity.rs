//! Specificity descriptors
//!
//! A candidate source applies to every client, to the members of one group
//! (ranked by a numeric priority), or to a single host. The descriptor is
//! carried in the candidate's filename and decides both whether it applies to
//! a client and which of several applicable candidates wins.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metadata::ClientMetadata;

/// How narrowly a candidate source applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Specificity {
    All,
    Group { name: String, priority: u32 },
    Host { name: String },
}

impl Specificity {
    pub fn group(name: impl Into<String>, priority: u32) -> Self {
        Specificity::Group {
            name: name.into(),
            priority,
        }
    }

    pub fn host(name: impl Into<String>) -> Self {
        Specificity::Host { name: name.into() }
    }

    /// Whether this descriptor applies to `client`.
    ///
    /// Group priority is only used for ranking, never for matching.
    pub fn matches(&self, client: &ClientMetadata) -> bool {
        match self {
            Specificity::All => true,
            Specificity::Group { name, .. } => client.in_group(name),
            Specificity::Host { name } => *name == client.hostname,
        }
    }

    /// Ranking key: hosts beat groups, groups beat the global default, and
    /// among groups the higher priority wins.
    pub fn rank(&self) -> (u8, u32) {
        match self {
            Specificity::All => (0, 0),
            Specificity::Group { priority, .. } => (1, *priority),
            Specificity::Host { .. } => (2, 0),
        }
    }

    /// `true` if `self` is strictly more specific than `other`.
    pub fn more_specific(&self, other: &Specificity) -> bool {
        self.rank() > other.rank()
    }

    /// Partial specificity order.
    ///
    /// Two distinct descriptors of equal rank (e.g. groups with the same
    /// priority, or hosts with different names) are incomparable.
    pub fn compare(&self, other: &Specificity) -> Option<Ordering> {
        match self.rank().cmp(&other.rank()) {
            Ordering::Equal if self != other => None,
            ordering => Some(ordering),
        }
    }

    /// Filename suffix for this descriptor: empty, `.G50_group` or `.H_host`.
    pub fn suffix(&self) -> String {
        match self {
            Specificity::All => String::new(),
            Specificity::Group { name, priority } => format!(".G{:02}_{}", priority, name),
            Specificity::Host { name } => format!(".H_{}", name),
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self, Specificity::Host { .. })
    }
}

impl fmt::Display for Specificity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Specificity::All => write!(f, "all"),
            Specificity::Group { name, priority } => write!(f, "group {} (priority {})", name, priority),
            Specificity::Host { name } => write!(f, "host {}", name),
        }
    }
}

//! Client identity as seen by the repository.
//!
//! Group memberships are computed elsewhere; this is only the read-only view
//! the matching and binding code needs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Hostname and group memberships of the client an entry is bound for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMetadata {
    /// Fully qualified hostname of the client
    pub hostname: String,
    /// Group name to membership priority
    #[serde(default)]
    pub groups: BTreeMap<String, u32>,
}

impl ClientMetadata {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            groups: BTreeMap::new(),
        }
    }

    /// Builder-style helper to add a group membership
    pub fn with_group(mut self, name: impl Into<String>, priority: u32) -> Self {
        self.groups.insert(name.into(), priority);
        self
    }

    pub fn in_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Group names in sorted order
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }
}

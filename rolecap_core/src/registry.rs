use crate::capability::{role_set, RoleSet};
use std::collections::btree_map::{self, BTreeMap};
use tracing::debug;

/// In-memory mapping of capability name to the roles it is registered for.
///
/// The registry only stages declarations. Nothing here touches a role store;
/// the managers read it when they apply or retract capabilities.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: BTreeMap<String, RoleSet>,
}

impl CapabilityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability for a list of roles.
    ///
    /// With `overwrite` set, or when the capability is new, the entry becomes
    /// exactly `roles`. Otherwise the roles are merged into the existing entry.
    /// An empty capability name is ignored.
    pub fn register<I, R>(&mut self, capability: &str, roles: I, overwrite: bool)
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        if capability.is_empty() {
            debug!("Ignoring registration with an empty capability name");
            return;
        }

        let roles = role_set(roles);
        match self.capabilities.entry(capability.to_string()) {
            btree_map::Entry::Occupied(mut entry) if !overwrite => {
                debug!("Merging roles {:?} into capability {}", roles, capability);
                entry.get_mut().extend(roles);
            }
            btree_map::Entry::Occupied(mut entry) => {
                debug!("Overwriting capability {} with roles {:?}", capability, roles);
                entry.insert(roles);
            }
            btree_map::Entry::Vacant(entry) => {
                debug!("Registering capability {} for roles {:?}", capability, roles);
                entry.insert(roles);
            }
        }
    }

    /// Names of all registered capabilities
    pub fn get_capabilities(&self) -> Vec<String> {
        self.capabilities.keys().cloned().collect()
    }

    /// Roles registered for a capability
    pub fn roles_for(&self, capability: &str) -> Option<&RoleSet> {
        self.capabilities.get(capability)
    }

    pub fn contains(&self, capability: &str) -> bool {
        self.capabilities.contains_key(capability)
    }

    /// Iterate over `(capability, roles)` entries
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RoleSet)> {
        self.capabilities
            .iter()
            .map(|(capability, roles)| (capability.as_str(), roles))
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

//! Host role store interfaces.
//!
//! The registry never owns roles. It talks to whatever store the host platform
//! provides through these traits. [`InMemoryRoleStore`] implements all of them
//! and backs the CLI and the tests.

use crate::capability::RoleSet;
use crate::error::StoreError;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// A mutable handle on a single role.
pub trait RoleHandle: Send + Sync {
    fn name(&self) -> &str;

    /// Grant one capability to this role.
    fn grant(&self, capability: &str) -> Result<(), StoreError>;

    /// Revoke one capability from this role.
    fn revoke(&self, capability: &str) -> Result<(), StoreError>;
}

/// Role lookup on the host platform.
pub trait RoleStore: Send + Sync {
    /// Resolve a role name to a handle, `None` if the store does not know it.
    fn get_role(&self, name: &str) -> Option<Arc<dyn RoleHandle>>;

    /// Every role name the store currently knows.
    fn all_role_names(&self) -> RoleSet;

    /// Expose the batch API if this store has one.
    ///
    /// Used by [`crate::manager::select_manager`] to pick the bulk manager.
    fn bulk(self: Arc<Self>) -> Option<Arc<dyn BulkRoleStore>> {
        None
    }
}

/// A store that can grant or revoke many capabilities on a role in one call.
pub trait BulkRoleStore: RoleStore {
    fn bulk_grant(&self, role: &str, capabilities: &[String]) -> Result<(), StoreError>;

    fn bulk_revoke(&self, role: &str, capabilities: &[String]) -> Result<(), StoreError>;
}

/// Capability checks for the actor performing the current request.
pub trait ActorCapabilities: Send + Sync {
    fn actor_has_capability(&self, capability: &str) -> bool;
}

/// A role held by [`InMemoryRoleStore`].
#[derive(Debug)]
pub struct InMemoryRole {
    name: String,
    capabilities: RwLock<RoleSet>,
}

impl InMemoryRole {
    fn new(name: String, capabilities: RoleSet) -> Self {
        Self {
            name,
            capabilities: RwLock::new(capabilities),
        }
    }

    /// Snapshot of the capabilities this role holds
    pub fn capabilities(&self) -> RoleSet {
        self.capabilities
            .read()
            .map(|caps| caps.clone())
            .unwrap_or_default()
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities
            .read()
            .map(|caps| caps.contains(capability))
            .unwrap_or(false)
    }

    fn update<F>(&self, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut RoleSet),
    {
        let mut caps = self
            .capabilities
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        apply(&mut caps);
        Ok(())
    }
}

impl RoleHandle for InMemoryRole {
    fn name(&self) -> &str {
        &self.name
    }

    fn grant(&self, capability: &str) -> Result<(), StoreError> {
        debug!("Granting {} to role {}", capability, self.name);
        self.update(|caps| {
            caps.insert(capability.to_string());
        })
    }

    fn revoke(&self, capability: &str) -> Result<(), StoreError> {
        debug!("Revoking {} from role {}", capability, self.name);
        self.update(|caps| {
            caps.remove(capability);
        })
    }
}

/// In-process role store. Clones share the same underlying roles.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRoleStore {
    roles: Arc<RwLock<BTreeMap<String, Arc<InMemoryRole>>>>,
    actor_roles: Arc<RwLock<RoleSet>>,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given roles, each with no capabilities
    pub fn with_roles<I, R>(names: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        let store = Self::new();
        for name in names {
            store.add_role(name, RoleSet::new());
        }
        store
    }

    /// Add a role, replacing any role with the same name.
    pub fn add_role(&self, name: impl Into<String>, capabilities: RoleSet) {
        let name = name.into();
        if let Ok(mut roles) = self.roles.write() {
            roles.insert(name.clone(), Arc::new(InMemoryRole::new(name, capabilities)));
        }
    }

    /// Capabilities currently held by a role
    pub fn role_capabilities(&self, name: &str) -> Option<RoleSet> {
        self.role(name).map(|role| role.capabilities())
    }

    /// Set the roles held by the current actor
    pub fn set_actor_roles<I, R>(&self, roles: I)
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        if let Ok(mut actor_roles) = self.actor_roles.write() {
            *actor_roles = roles.into_iter().map(Into::into).collect();
        }
    }

    fn role(&self, name: &str) -> Option<Arc<InMemoryRole>> {
        self.roles.read().ok()?.get(name).cloned()
    }

    fn update_many(
        &self,
        role: &str,
        capabilities: &[String],
        grant: bool,
    ) -> Result<(), StoreError> {
        let Some(handle) = self.role(role) else {
            debug!("Ignoring batch call for unknown role {}", role);
            return Ok(());
        };
        handle.update(|caps| {
            for capability in capabilities {
                if grant {
                    caps.insert(capability.clone());
                } else {
                    caps.remove(capability);
                }
            }
        })
    }
}

impl RoleStore for InMemoryRoleStore {
    fn get_role(&self, name: &str) -> Option<Arc<dyn RoleHandle>> {
        self.role(name).map(|role| role as Arc<dyn RoleHandle>)
    }

    fn all_role_names(&self) -> RoleSet {
        self.roles
            .read()
            .map(|roles| roles.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn bulk(self: Arc<Self>) -> Option<Arc<dyn BulkRoleStore>> {
        Some(self)
    }
}

impl BulkRoleStore for InMemoryRoleStore {
    fn bulk_grant(&self, role: &str, capabilities: &[String]) -> Result<(), StoreError> {
        debug!("Granting {:?} to role {}", capabilities, role);
        self.update_many(role, capabilities, true)
    }

    fn bulk_revoke(&self, role: &str, capabilities: &[String]) -> Result<(), StoreError> {
        debug!("Revoking {:?} from role {}", capabilities, role);
        self.update_many(role, capabilities, false)
    }
}

impl ActorCapabilities for InMemoryRoleStore {
    fn actor_has_capability(&self, capability: &str) -> bool {
        let Ok(actor_roles) = self.actor_roles.read() else {
            return false;
        };
        actor_roles
            .iter()
            .filter_map(|name| self.role(name))
            .any(|role| role.has_capability(capability))
    }
}

//! Capability managers.
//!
//! A manager owns a [`CapabilityRegistry`] and a [`RoleFilter`] and knows how
//! to push the registered capabilities into a host role store, or pull them
//! back out. The two variants differ only in which store API they drive.

mod bulk;
mod direct;

pub use bulk::{BulkCapabilityManager, RoleCapabilityIndex};
pub use direct::DirectCapabilityManager;

use crate::capability::RoleSet;
use crate::filter::RoleFilter;
use crate::registry::CapabilityRegistry;
use crate::report::SyncReport;
use crate::role_store::{RoleHandle, RoleStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagerKind {
    /// One grant or revoke call per role and capability
    Direct,
    /// One batch call per role
    Bulk,
}

impl fmt::Display for ManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerKind::Direct => write!(f, "direct"),
            ManagerKind::Bulk => write!(f, "bulk"),
        }
    }
}

/// Common interface of the direct and bulk managers.
pub trait CapabilityManager: Send + Sync {
    fn kind(&self) -> ManagerKind;

    fn registry(&self) -> &CapabilityRegistry;

    fn registry_mut(&mut self) -> &mut CapabilityRegistry;

    fn filter(&self) -> &RoleFilter;

    /// Observers attached here see every `add()` and `remove()` run.
    fn filter_mut(&mut self) -> &mut RoleFilter;

    /// Register a capability for the given roles. See [`CapabilityRegistry::register`].
    fn register(&mut self, capability: &str, roles: &[&str], overwrite: bool) {
        self.registry_mut()
            .register(capability, roles.iter().copied(), overwrite);
    }

    /// Names of all registered capabilities
    fn get_capabilities(&self) -> Vec<String> {
        self.registry().get_capabilities()
    }

    /// Apply every registered capability to the role store.
    fn add(&self) -> SyncReport;

    /// Retract every registered capability from all roles the store knows.
    fn remove(&self) -> SyncReport;
}

/// Pick the manager matching what the store supports.
///
/// Stores exposing a batch API get the bulk manager, everything else the
/// direct one.
pub fn select_manager(store: Arc<dyn RoleStore>) -> Box<dyn CapabilityManager> {
    match store.clone().bulk() {
        Some(bulk) => {
            info!("Role store supports batch updates, using bulk capability manager");
            Box::new(BulkCapabilityManager::new(bulk))
        }
        None => {
            info!("Using direct capability manager");
            Box::new(DirectCapabilityManager::new(store))
        }
    }
}

/// Resolve role names to handles, recording names the store does not know.
pub(crate) fn resolve_roles(
    store: &dyn RoleStore,
    roles: &RoleSet,
    report: &mut SyncReport,
) -> Vec<Arc<dyn RoleHandle>> {
    roles
        .iter()
        .filter_map(|name| {
            let handle = store.get_role(name);
            if handle.is_none() {
                debug!("Skipping unknown role {}", name);
                report.record_unresolved(name);
            }
            handle
        })
        .collect()
}

pub(crate) fn log_summary(kind: ManagerKind, report: &SyncReport) {
    info!(
        "{} {} finished: {} store calls, {} roles touched, {} failures",
        kind,
        report.operation,
        report.store_calls,
        report.applied.len(),
        report.failures.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role_store::InMemoryRoleStore;

    struct DirectOnlyStore(InMemoryRoleStore);

    impl RoleStore for DirectOnlyStore {
        fn get_role(&self, name: &str) -> Option<Arc<dyn RoleHandle>> {
            self.0.get_role(name)
        }

        fn all_role_names(&self) -> RoleSet {
            self.0.all_role_names()
        }
    }

    #[test]
    fn test_select_bulk_manager() {
        let manager = select_manager(Arc::new(InMemoryRoleStore::new()));
        assert_eq!(manager.kind(), ManagerKind::Bulk);
    }

    #[test]
    fn test_select_direct_manager() {
        let manager = select_manager(Arc::new(DirectOnlyStore(InMemoryRoleStore::new())));
        assert_eq!(manager.kind(), ManagerKind::Direct);
    }

    #[test]
    fn test_register_through_trait_object() {
        let mut manager = select_manager(Arc::new(InMemoryRoleStore::new()));
        manager.register("app_edit", &["editor"], false);
        manager.register("app_edit", &["author"], false);
        manager.register("app_view", &[], false);

        assert_eq!(manager.get_capabilities().len(), 2);
        assert_eq!(manager.registry().roles_for("app_edit").unwrap().len(), 2);
    }

    #[test]
    fn test_resolve_roles_skips_unknown() {
        let store = InMemoryRoleStore::with_roles(["editor"]);
        let mut report = SyncReport::new(crate::report::SyncOperation::Add);
        let roles: RoleSet = ["editor", "ghost"].into_iter().map(String::from).collect();

        let handles = resolve_roles(&store, &roles, &mut report);
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].name(), "editor");
        assert!(report.unresolved_roles.contains("ghost"));
    }
}

use super::{log_summary, resolve_roles, CapabilityManager, ManagerKind};
use crate::capability::{RoleSet, ADMINISTRATOR_ROLE};
use crate::filter::RoleFilter;
use crate::registry::CapabilityRegistry;
use crate::report::{SyncOperation, SyncReport};
use crate::role_store::RoleStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Manager for stores that grant one capability to one role per call.
///
/// Every capability is also granted to the administrator role on `add()`.
pub struct DirectCapabilityManager {
    store: Arc<dyn RoleStore>,
    registry: CapabilityRegistry,
    filter: RoleFilter,
}

impl DirectCapabilityManager {
    pub fn new(store: Arc<dyn RoleStore>) -> Self {
        Self::with_filter(store, RoleFilter::new())
    }

    pub fn with_filter(store: Arc<dyn RoleStore>, filter: RoleFilter) -> Self {
        Self {
            store,
            registry: CapabilityRegistry::new(),
            filter,
        }
    }
}

impl CapabilityManager for DirectCapabilityManager {
    fn kind(&self) -> ManagerKind {
        ManagerKind::Direct
    }

    fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut CapabilityRegistry {
        &mut self.registry
    }

    fn filter(&self) -> &RoleFilter {
        &self.filter
    }

    fn filter_mut(&mut self) -> &mut RoleFilter {
        &mut self.filter
    }

    fn add(&self) -> SyncReport {
        let mut report = SyncReport::new(SyncOperation::Add);

        for (capability, roles) in self.registry.iter() {
            let mut roles = roles.clone();
            roles.insert(ADMINISTRATOR_ROLE.to_string());

            let filtered = self.filter.filter_roles(capability, &roles);
            debug!("Adding {} to roles {:?}", capability, filtered);

            for role in resolve_roles(self.store.as_ref(), &filtered, &mut report) {
                match role.grant(capability) {
                    Ok(()) => report.record_success(role.name(), [capability]),
                    Err(e) => {
                        warn!(
                            "Failed to grant {} to role {}: {}",
                            capability,
                            role.name(),
                            e
                        );
                        report.record_failure(
                            role.name(),
                            vec![capability.to_string()],
                            e.to_string(),
                        );
                    }
                }
            }
        }

        log_summary(self.kind(), &report);
        report
    }

    fn remove(&self) -> SyncReport {
        let mut report = SyncReport::new(SyncOperation::Remove);
        if self.registry.is_empty() {
            return report;
        }

        // Every known role, not just the registered ones, so roles that were
        // granted a capability and later filtered out still lose it.
        let all_roles = self.store.all_role_names();

        for (capability, registered) in self.registry.iter() {
            let candidates: RoleSet = registered.union(&all_roles).cloned().collect();

            let filtered = self.filter.filter_roles(capability, &candidates);
            debug!("Removing {} from roles {:?}", capability, filtered);

            for role in resolve_roles(self.store.as_ref(), &filtered, &mut report) {
                match role.revoke(capability) {
                    Ok(()) => report.record_success(role.name(), [capability]),
                    Err(e) => {
                        warn!(
                            "Failed to revoke {} from role {}: {}",
                            capability,
                            role.name(),
                            e
                        );
                        report.record_failure(
                            role.name(),
                            vec![capability.to_string()],
                            e.to_string(),
                        );
                    }
                }
            }
        }

        log_summary(self.kind(), &report);
        report
    }
}

use super::{log_summary, CapabilityManager, ManagerKind};
use crate::capability::RoleSet;
use crate::filter::RoleFilter;
use crate::registry::CapabilityRegistry;
use crate::report::{SyncOperation, SyncReport};
use crate::role_store::BulkRoleStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Role name to the capabilities that should be applied to it.
///
/// Built fresh for every `add()` or `remove()` and dropped afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleCapabilityIndex {
    roles: BTreeMap<String, RoleSet>,
}

impl RoleCapabilityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `capability` against every role in `roles`.
    pub fn insert(&mut self, capability: &str, roles: &RoleSet) {
        for role in roles {
            self.roles
                .entry(role.clone())
                .or_default()
                .insert(capability.to_string());
        }
    }

    /// Capabilities indexed for a role
    pub fn capabilities_for(&self, role: &str) -> Option<&RoleSet> {
        self.roles.get(role)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RoleSet)> {
        self.roles.iter().map(|(role, caps)| (role.as_str(), caps))
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Manager for stores with a per-role batch API.
///
/// Issues one call per role that ends up in the index. Roles every capability
/// was filtered away from are never called.
pub struct BulkCapabilityManager {
    store: Arc<dyn BulkRoleStore>,
    registry: CapabilityRegistry,
    filter: RoleFilter,
}

impl BulkCapabilityManager {
    pub fn new(store: Arc<dyn BulkRoleStore>) -> Self {
        Self::with_filter(store, RoleFilter::new())
    }

    pub fn with_filter(store: Arc<dyn BulkRoleStore>, filter: RoleFilter) -> Self {
        Self {
            store,
            registry: CapabilityRegistry::new(),
            filter,
        }
    }

    /// Index each capability's registered roles, after filtering.
    pub fn add_index(&self) -> RoleCapabilityIndex {
        let mut index = RoleCapabilityIndex::new();
        for (capability, roles) in self.registry.iter() {
            index.insert(capability, &self.filter.filter_roles(capability, roles));
        }
        index
    }

    /// Index every capability against `all_roles`, after filtering.
    pub fn remove_index(&self, all_roles: &RoleSet) -> RoleCapabilityIndex {
        let mut index = RoleCapabilityIndex::new();
        for (capability, _) in self.registry.iter() {
            index.insert(capability, &self.filter.filter_roles(capability, all_roles));
        }
        index
    }

    fn apply(&self, index: &RoleCapabilityIndex, operation: SyncOperation) -> SyncReport {
        let mut report = SyncReport::new(operation);

        for (role, capabilities) in index.iter() {
            let capabilities: Vec<String> = capabilities.iter().cloned().collect();
            debug!("{} {:?} for role {}", operation, capabilities, role);

            let result = match operation {
                SyncOperation::Add => self.store.bulk_grant(role, &capabilities),
                SyncOperation::Remove => self.store.bulk_revoke(role, &capabilities),
            };

            match result {
                Ok(()) => report.record_success(role, &capabilities),
                Err(e) => {
                    warn!("Batch {} failed for role {}: {}", operation, role, e);
                    report.record_failure(role, capabilities, e.to_string());
                }
            }
        }

        log_summary(self.kind(), &report);
        report
    }
}

impl CapabilityManager for BulkCapabilityManager {
    fn kind(&self) -> ManagerKind {
        ManagerKind::Bulk
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
        self.apply(&self.add_index(), SyncOperation::Add)
    }

    fn remove(&self) -> SyncReport {
        if self.registry.is_empty() {
            return SyncReport::new(SyncOperation::Remove);
        }
        let all_roles = self.store.all_role_names();
        self.apply(&self.remove_index(&all_roles), SyncOperation::Remove)
    }
}

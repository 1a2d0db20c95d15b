//! Process-wide capability context.
//!
//! Built once at startup and handed to whoever needs to register, apply or
//! check capabilities. It owns the manager chosen for the role store and the
//! gate for the current actor.

use crate::config::CapabilityConfig;
use crate::gate::CapabilityGate;
use crate::manager::{select_manager, CapabilityManager};
use crate::report::SyncReport;
use crate::role_store::{ActorCapabilities, RoleStore};
use std::sync::Arc;
use tracing::{debug, info};

type Registrar = Box<dyn FnOnce(&mut dyn CapabilityManager) + Send>;

pub struct CapabilityContext {
    manager: Box<dyn CapabilityManager>,
    gate: CapabilityGate,
    registrars: Vec<Registrar>,
    registered: bool,
}

impl CapabilityContext {
    /// Select a manager for `store` and register the configured capabilities.
    pub fn new(
        config: &CapabilityConfig,
        store: Arc<dyn RoleStore>,
        actor: Arc<dyn ActorCapabilities>,
    ) -> Self {
        let mut manager = select_manager(store);
        config.apply_to(manager.as_mut());
        info!(
            "Capability context ready: {} manager, {} capabilities declared",
            manager.kind(),
            manager.get_capabilities().len()
        );
        Self::with_manager(&config.prefix, manager, actor)
    }

    pub fn with_manager(
        prefix: &str,
        manager: Box<dyn CapabilityManager>,
        actor: Arc<dyn ActorCapabilities>,
    ) -> Self {
        Self {
            manager,
            gate: CapabilityGate::new(prefix, actor),
            registrars: Vec::new(),
            registered: false,
        }
    }

    /// Queue a registration callback for the setup phase.
    ///
    /// Callbacks run once, on the first [`CapabilityContext::ensure_registered`].
    /// A callback queued after that point runs immediately.
    pub fn on_register<F>(&mut self, registrar: F)
    where
        F: FnOnce(&mut dyn CapabilityManager) + Send + 'static,
    {
        if self.registered {
            registrar(self.manager.as_mut());
        } else {
            self.registrars.push(Box::new(registrar));
        }
    }

    /// Run the queued registration callbacks if they have not run yet.
    ///
    /// Returns `true` when this call performed the setup phase.
    pub fn ensure_registered(&mut self) -> bool {
        if self.registered {
            return false;
        }
        self.registered = true;

        debug!("Running {} capability registrars", self.registrars.len());
        for registrar in self.registrars.drain(..) {
            registrar(self.manager.as_mut());
        }
        true
    }

    pub fn manager(&self) -> &dyn CapabilityManager {
        self.manager.as_ref()
    }

    pub fn manager_mut(&mut self) -> &mut dyn CapabilityManager {
        self.manager.as_mut()
    }

    pub fn gate(&self) -> &CapabilityGate {
        &self.gate
    }

    /// Registered capability names, after the setup phase
    pub fn capabilities(&mut self) -> Vec<String> {
        self.ensure_registered();
        self.manager.get_capabilities()
    }

    pub fn add(&mut self) -> SyncReport {
        self.ensure_registered();
        self.manager.add()
    }

    pub fn remove(&mut self) -> SyncReport {
        self.ensure_registered();
        self.manager.remove()
    }

    pub fn current_actor_can(&self, capability: &str) -> bool {
        self.gate.current_actor_can(capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::role_set;
    use crate::manager::ManagerKind;
    use crate::role_store::InMemoryRoleStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn context(store: &InMemoryRoleStore) -> CapabilityContext {
        let config = CapabilityConfig::from_toml(
            r#"
            [[capabilities]]
            name = "app_edit"
            roles = ["editor"]
            "#,
        )
        .unwrap();
        CapabilityContext::new(&config, Arc::new(store.clone()), Arc::new(store.clone()))
    }

    #[test]
    fn test_context_uses_configured_capabilities() {
        let store = InMemoryRoleStore::with_roles(["editor", "administrator"]);
        let mut ctx = context(&store);

        assert_eq!(ctx.manager().kind(), ManagerKind::Bulk);
        assert_eq!(ctx.capabilities(), vec!["app_edit"]);
        assert_eq!(ctx.gate().super_capability(), "app_manage_options");
    }

    #[test]
    fn test_registrars_run_once() {
        let store = InMemoryRoleStore::with_roles(["editor"]);
        let mut ctx = context(&store);
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = runs.clone();
        ctx.on_register(move |manager| {
            counter.fetch_add(1, Ordering::SeqCst);
            manager.register("app_view", &["subscriber"], false);
        });

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(ctx.ensure_registered());
        assert!(!ctx.ensure_registered());
        ctx.capabilities();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(ctx.manager().registry().contains("app_view"));
    }

    #[test]
    fn test_late_registrar_runs_immediately() {
        let store = InMemoryRoleStore::with_roles(["editor"]);
        let mut ctx = context(&store);
        ctx.ensure_registered();

        ctx.on_register(|manager| manager.register("app_late", &["editor"], false));
        assert!(ctx.manager().registry().contains("app_late"));
    }

    #[test]
    fn test_add_remove_and_gate() {
        let store = InMemoryRoleStore::with_roles(["editor", "administrator"]);
        store.set_actor_roles(["editor"]);
        let mut ctx = context(&store);

        assert!(!ctx.current_actor_can("app_edit"));

        ctx.add();
        assert_eq!(store.role_capabilities("editor"), Some(role_set(["app_edit"])));
        assert!(ctx.current_actor_can("app_edit"));
        assert!(!ctx.current_actor_can("app_manage_options"));

        ctx.remove();
        assert!(!ctx.current_actor_can("app_edit"));
    }
}

use crate::capability::super_capability;
use crate::role_store::ActorCapabilities;
use std::sync::Arc;
use tracing::debug;

/// Answers whether the current actor may use a capability.
///
/// Holding the `<prefix>_manage_options` super-capability passes every check.
/// Reads go straight to the actor source; nothing is cached here.
#[derive(Clone)]
pub struct CapabilityGate {
    super_capability: String,
    actor: Arc<dyn ActorCapabilities>,
}

impl CapabilityGate {
    pub fn new(prefix: &str, actor: Arc<dyn ActorCapabilities>) -> Self {
        Self {
            super_capability: super_capability(prefix),
            actor,
        }
    }

    pub fn super_capability(&self) -> &str {
        &self.super_capability
    }

    /// Check a capability, letting the super-capability stand in for it.
    pub fn current_actor_can(&self, capability: &str) -> bool {
        if capability == self.super_capability {
            return self.has(capability);
        }

        self.has_any(&[self.super_capability.as_str(), capability])
    }

    /// True if the actor holds at least one of `capabilities`, checked in order.
    pub fn has_any(&self, capabilities: &[&str]) -> bool {
        capabilities.iter().any(|capability| self.has(capability))
    }

    pub fn has(&self, capability: &str) -> bool {
        let allowed = self.actor.actor_has_capability(capability);
        debug!("Actor capability check {}: {}", capability, allowed);
        allowed
    }
}

use rolecap_core::{CapabilityConfig, ConfigError, InMemoryRoleStore};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A capability configuration plus the role store it should run against.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(flatten)]
    pub config: CapabilityConfig,

    /// Role name to the capabilities it starts with
    #[serde(default)]
    pub roles: BTreeMap<String, Vec<String>>,

    /// Roles held by the actor used for `can` checks
    #[serde(default)]
    pub actor_roles: Vec<String>,
}

impl Manifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_toml(&fs::read_to_string(path)?)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let manifest: Self = toml::from_str(text)?;
        manifest.config.validate()?;
        if manifest.roles.keys().any(|name| name.is_empty()) {
            return Err(ConfigError::Invalid("role names cannot be empty".to_string()));
        }
        Ok(manifest)
    }

    /// Build an in-memory store seeded with the manifest's roles
    pub fn role_store(&self) -> InMemoryRoleStore {
        let store = InMemoryRoleStore::new();
        for (name, capabilities) in &self.roles {
            store.add_role(name.clone(), capabilities.iter().cloned().collect());
        }
        store.set_actor_roles(self.actor_roles.iter().cloned());
        store
    }
}

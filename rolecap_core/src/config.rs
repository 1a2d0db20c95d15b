use crate::error::ConfigError;
use crate::manager::CapabilityManager;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Default prefix for the super-capability (`app_manage_options`).
pub const DEFAULT_PREFIX: &str = "app";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityConfig {
    /// Prefix shared by the application's capabilities
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Capability declarations, applied in order
    #[serde(default)]
    pub capabilities: Vec<CapabilityDeclaration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityDeclaration {
    /// The capability name
    pub name: String,

    /// Roles the capability is registered for
    #[serde(default)]
    pub roles: Vec<String>,

    /// Replace earlier declarations of the same capability instead of merging
    #[serde(default)]
    pub overwrite: bool,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            capabilities: Vec::new(),
        }
    }
}

impl CapabilityConfig {
    /// Parse and validate a configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading capability configuration from {:?}", path);
        Self::from_toml(&fs::read_to_string(path)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.is_empty() {
            return Err(ConfigError::Invalid("prefix cannot be empty".to_string()));
        }
        if let Some(index) = self.capabilities.iter().position(|c| c.name.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "capability #{} has an empty name",
                index + 1
            )));
        }
        Ok(())
    }

    /// Register every declared capability with a manager
    pub fn apply_to(&self, manager: &mut dyn CapabilityManager) {
        for declaration in &self.capabilities {
            debug!("Applying declaration for {}", declaration.name);
            let roles: Vec<&str> = declaration.roles.iter().map(String::as_str).collect();
            manager.register(&declaration.name, &roles, declaration.overwrite);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::DirectCapabilityManager;
    use crate::role_store::InMemoryRoleStore;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    const CONFIG: &str = r#"
        prefix = "shop"

        [[capabilities]]
        name = "shop_edit"
        roles = ["editor", "author"]

        [[capabilities]]
        name = "shop_edit"
        roles = ["shop_manager"]

        [[capabilities]]
        name = "shop_view"
        roles = ["editor"]

        [[capabilities]]
        name = "shop_view"
        roles = ["subscriber"]
        overwrite = true
    "#;

    #[test]
    fn test_parse_config() {
        let config = CapabilityConfig::from_toml(CONFIG).unwrap();
        assert_eq!(config.prefix, "shop");
        assert_eq!(config.capabilities.len(), 4);
        assert!(config.capabilities[3].overwrite);
        assert!(!config.capabilities[0].overwrite);
    }

    #[test]
    fn test_defaults() {
        let config = CapabilityConfig::from_toml("").unwrap();
        assert_eq!(config.prefix, DEFAULT_PREFIX);
        assert!(config.capabilities.is_empty());
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            CapabilityConfig::from_toml(r#"prefix = """#),
            Err(ConfigError::Invalid(_))
        ));

        let empty_name = r#"
            [[capabilities]]
            name = ""
            roles = ["editor"]
        "#;
        assert!(matches!(
            CapabilityConfig::from_toml(empty_name),
            Err(ConfigError::Invalid(_))
        ));

        assert!(matches!(
            CapabilityConfig::from_toml("capabilities = 3"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_apply_merges_and_overwrites() {
        let config = CapabilityConfig::from_toml(CONFIG).unwrap();
        let mut manager = DirectCapabilityManager::new(Arc::new(InMemoryRoleStore::new()));

        config.apply_to(&mut manager);

        let edit = manager.registry().roles_for("shop_edit").unwrap();
        assert_eq!(edit.len(), 3);
        let view = manager.registry().roles_for("shop_view").unwrap();
        assert_eq!(view.len(), 1);
        assert!(view.contains("subscriber"));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let config = CapabilityConfig::from_file(file.path()).unwrap();
        assert_eq!(config.prefix, "shop");

        let missing = CapabilityConfig::from_file(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}

mod manifest;

use clap::{Parser, Subcommand};
use manifest::Manifest;
use rolecap_core::{
    CapabilityContext, InMemoryRoleStore, RoleHandle, RoleSet, RoleStore, SyncReport,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "rolecap", version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the capabilities declared in a manifest
    List {
        /// Path to the TOML manifest
        #[arg(long)]
        manifest: PathBuf,
    },
    /// Grant the declared capabilities to their roles
    Apply {
        #[arg(long)]
        manifest: PathBuf,
        /// Use one call per role and capability instead of batch calls
        #[arg(long)]
        direct: bool,
    },
    /// Revoke the declared capabilities from every role
    Retract {
        #[arg(long)]
        manifest: PathBuf,
        #[arg(long)]
        direct: bool,
    },
    /// Check whether the manifest's actor holds a capability
    Can {
        #[arg(long)]
        manifest: PathBuf,
        #[arg(long)]
        capability: String,
    },
}

/// Hides the batch API so the direct manager gets selected.
struct DirectOnly(InMemoryRoleStore);

impl RoleStore for DirectOnly {
    fn get_role(&self, name: &str) -> Option<Arc<dyn RoleHandle>> {
        self.0.get_role(name)
    }

    fn all_role_names(&self) -> RoleSet {
        self.0.all_role_names()
    }
}

fn load(
    path: &Path,
    direct: bool,
) -> rolecap_core::Result<(CapabilityContext, InMemoryRoleStore)> {
    let manifest = Manifest::from_file(path)?;

    let store = manifest.role_store();
    let role_store: Arc<dyn RoleStore> = if direct {
        Arc::new(DirectOnly(store.clone()))
    } else {
        Arc::new(store.clone())
    };
    let context = CapabilityContext::new(&manifest.config, role_store, Arc::new(store.clone()));
    Ok((context, store))
}

fn load_or_exit(path: &Path, direct: bool) -> (CapabilityContext, InMemoryRoleStore) {
    match load(path, direct) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Failed to load manifest {:?}: {}", path, e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_outcome(report: &SyncReport, store: &InMemoryRoleStore) {
    let roles: serde_json::Map<String, serde_json::Value> = store
        .all_role_names()
        .into_iter()
        .map(|name| {
            let caps = store.role_capabilities(&name).unwrap_or_default();
            (name, json!(caps))
        })
        .collect();

    let output = json!({ "report": report, "roles": roles });
    match serde_json::to_string_pretty(&output) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            error!("Failed to render report: {}", e);
            std::process::exit(1);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List { manifest } => {
            let (mut context, _) = load_or_exit(&manifest, false);
            let capabilities = context.capabilities();
            if capabilities.is_empty() {
                println!("No capabilities declared.");
            } else {
                println!("Capabilities:");
                for capability in capabilities {
                    println!("  {}", capability);
                }
            }
        }
        Commands::Apply { manifest, direct } => {
            let (mut context, store) = load_or_exit(&manifest, direct);
            let report = context.add();
            info!("Applied capabilities in run {}", report.run_id);
            print_outcome(&report, &store);
        }
        Commands::Retract { manifest, direct } => {
            let (mut context, store) = load_or_exit(&manifest, direct);
            let report = context.remove();
            info!("Retracted capabilities in run {}", report.run_id);
            print_outcome(&report, &store);
        }
        Commands::Can {
            manifest,
            capability,
        } => {
            let (context, _) = load_or_exit(&manifest, false);
            let allowed = context.current_actor_can(&capability);
            println!("{}", if allowed { "yes" } else { "no" });
            if !allowed {
                std::process::exit(2);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolecap_core::ManagerKind;

    const MANIFEST: &str = r#"
        actor_roles = ["editor"]

        [roles]
        administrator = []
        editor = ["read"]
        subscriber = ["read"]

        [[capabilities]]
        name = "app_edit"
        roles = ["editor"]
    "#;

    #[test]
    fn test_direct_flag_selects_direct_manager() {
        let manifest = Manifest::from_toml(MANIFEST).unwrap();
        let store = manifest.role_store();

        let direct = CapabilityContext::new(
            &manifest.config,
            Arc::new(DirectOnly(store.clone())),
            Arc::new(store.clone()),
        );
        assert_eq!(direct.manager().kind(), ManagerKind::Direct);

        let bulk =
            CapabilityContext::new(&manifest.config, Arc::new(store.clone()), Arc::new(store));
        assert_eq!(bulk.manager().kind(), ManagerKind::Bulk);
    }

    #[test]
    fn test_missing_manifest() {
        let result = load(Path::new("does/not/exist.toml"), false);
        assert!(matches!(result, Err(rolecap_core::CapabilityError::Config(_))));
    }

    #[test]
    fn test_apply_then_check() {
        let manifest = Manifest::from_toml(MANIFEST).unwrap();
        let store = manifest.role_store();
        let mut context = CapabilityContext::new(
            &manifest.config,
            Arc::new(DirectOnly(store.clone())),
            Arc::new(store.clone()),
        );

        assert!(!context.current_actor_can("app_edit"));
        let report = context.add();

        assert!(report.is_clean());
        assert!(context.current_actor_can("app_edit"));
        assert!(store
            .role_capabilities("administrator")
            .unwrap()
            .contains("app_edit"));
    }
}

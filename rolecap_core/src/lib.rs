//! Role-based capability registry.
//!
//! Callers declare named capabilities and the roles that should hold them.
//! Declarations from several callers merge in a [`CapabilityRegistry`]; a
//! [`CapabilityManager`] then pushes the result into the host's role store
//! and can retract it again. A [`CapabilityGate`] answers whether the current
//! actor holds a capability.

pub mod capability;
pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod gate;
pub mod manager;
pub mod registry;
pub mod report;
pub mod role_store;

pub use capability::{RoleSet, ADMINISTRATOR_ROLE};
pub use config::{CapabilityConfig, CapabilityDeclaration};
pub use context::CapabilityContext;
pub use error::{CapabilityError, ConfigError, Result, StoreError};
pub use filter::RoleFilter;
pub use gate::CapabilityGate;
pub use manager::{
    select_manager, BulkCapabilityManager, CapabilityManager, DirectCapabilityManager,
    ManagerKind, RoleCapabilityIndex,
};
pub use registry::CapabilityRegistry;
pub use report::{SyncFailure, SyncOperation, SyncReport};
pub use role_store::{
    ActorCapabilities, BulkRoleStore, InMemoryRoleStore, RoleHandle, RoleStore,
};

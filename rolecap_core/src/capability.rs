use std::collections::BTreeSet;

/// A set of role names. Ordering is a convenience for stable output only.
pub type RoleSet = BTreeSet<String>;

/// Role that receives every capability on a direct `add()`.
pub const ADMINISTRATOR_ROLE: &str = "administrator";

/// Suffix appended to the configured prefix to form the super-capability.
pub const MANAGE_OPTIONS_SUFFIX: &str = "_manage_options";

/// Suffix appended to a capability name to form its role filter hook.
pub const ROLES_HOOK_SUFFIX: &str = "_roles";

/// Build the super-capability name for a prefix, e.g. `app` -> `app_manage_options`.
pub fn super_capability(prefix: &str) -> String {
    format!("{}{}", prefix, MANAGE_OPTIONS_SUFFIX)
}

/// Name of the filter hook consulted for a capability's roles.
pub fn filter_hook_name(capability: &str) -> String {
    format!("{}{}", capability, ROLES_HOOK_SUFFIX)
}

/// Collect role names into a set, dropping empty names.
pub fn role_set<I, R>(roles: I) -> RoleSet
where
    I: IntoIterator<Item = R>,
    R: Into<String>,
{
    roles
        .into_iter()
        .map(Into::into)
        .filter(|role: &String| !role.is_empty())
        .collect()
}

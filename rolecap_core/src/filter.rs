//! Role expansion filter.
//!
//! Embedding code can veto or extend the roles a capability is applied to by
//! attaching observers to that capability's hook (`<capability>_roles`).
//! Observers run in priority order and each one receives the previous
//! observer's output, so the value passed along is untyped JSON. Whatever
//! comes out of the chain is coerced back into a role set.

use crate::capability::{filter_hook_name, RoleSet};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

type Observer = Box<dyn Fn(Value) -> Value + Send + Sync>;

struct PrioritizedObserver {
    priority: i32,
    observer: Observer,
}

/// Observer chains keyed by hook name.
#[derive(Default)]
pub struct RoleFilter {
    hooks: HashMap<String, Vec<PrioritizedObserver>>,
}

impl RoleFilter {
    /// Priority used by [`RoleFilter::add_observer`].
    pub const DEFAULT_PRIORITY: i32 = 10;

    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an observer to a capability's roles hook at the default priority.
    pub fn add_observer<F>(&mut self, capability: &str, observer: F)
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.add_observer_with_priority(capability, Self::DEFAULT_PRIORITY, observer);
    }

    /// Attach an observer with an explicit priority. Lower priorities run first;
    /// observers sharing a priority run in the order they were added.
    pub fn add_observer_with_priority<F>(&mut self, capability: &str, priority: i32, observer: F)
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        let hook = filter_hook_name(capability);
        debug!("Adding observer to hook {} at priority {}", hook, priority);

        let chain = self.hooks.entry(hook).or_default();
        chain.push(PrioritizedObserver {
            priority,
            observer: Box::new(observer),
        });
        chain.sort_by_key(|entry| entry.priority);
    }

    /// Attach a typed observer that maps one role set to another.
    pub fn add_role_observer<F>(&mut self, capability: &str, observer: F)
    where
        F: Fn(&RoleSet) -> RoleSet + Send + Sync + 'static,
    {
        let hook = filter_hook_name(capability);
        self.add_observer(capability, move |value| {
            let roles = coerce_roles(&hook, value);
            roles_to_value(&observer(&roles))
        });
    }

    pub fn has_observers(&self, capability: &str) -> bool {
        self.hooks
            .get(&filter_hook_name(capability))
            .is_some_and(|chain| !chain.is_empty())
    }

    /// Detach every observer from a capability's hook
    pub fn clear(&mut self, capability: &str) {
        self.hooks.remove(&filter_hook_name(capability));
    }

    /// Run a capability's candidate roles through its observer chain.
    ///
    /// Without observers the input comes back unchanged. If the chain produces
    /// anything other than an array, the result is the empty set: every role
    /// is dropped for this capability.
    pub fn filter_roles(&self, capability: &str, roles: &RoleSet) -> RoleSet {
        let hook = filter_hook_name(capability);
        let Some(chain) = self.hooks.get(&hook) else {
            return roles.clone();
        };

        let filtered = chain
            .iter()
            .fold(roles_to_value(roles), |value, entry| (entry.observer)(value));

        coerce_roles(&hook, filtered)
    }
}

impl fmt::Debug for RoleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks: HashMap<&str, usize> = self
            .hooks
            .iter()
            .map(|(hook, chain)| (hook.as_str(), chain.len()))
            .collect();
        f.debug_struct("RoleFilter").field("hooks", &hooks).finish()
    }
}

fn roles_to_value(roles: &RoleSet) -> Value {
    Value::Array(roles.iter().cloned().map(Value::String).collect())
}

fn coerce_roles(hook: &str, value: Value) -> RoleSet {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(role) if !role.is_empty() => Some(role),
                _ => None,
            })
            .collect(),
        other => {
            warn!(
                "Hook {} returned {} instead of a role list, dropping all roles",
                hook, other
            );
            RoleSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::role_set;
    use serde_json::json;

    #[test]
    fn test_no_observers_is_identity() {
        let filter = RoleFilter::new();
        let roles = role_set(["editor", "author"]);

        assert_eq!(filter.filter_roles("app_edit", &roles), roles);
        assert!(!filter.has_observers("app_edit"));
    }

    #[test]
    fn test_observer_can_extend_roles() {
        let mut filter = RoleFilter::new();
        filter.add_role_observer("app_edit", |roles| {
            let mut roles = roles.clone();
            roles.insert("author".to_string());
            roles
        });

        let filtered = filter.filter_roles("app_edit", &role_set(["editor"]));
        assert_eq!(filtered, role_set(["editor", "author"]));
    }

    #[test]
    fn test_observer_only_applies_to_its_capability() {
        let mut filter = RoleFilter::new();
        filter.add_observer("app_edit", |_| json!([]));

        let roles = role_set(["editor"]);
        assert!(filter.filter_roles("app_edit", &roles).is_empty());
        assert_eq!(filter.filter_roles("app_view", &roles), roles);
    }

    #[test]
    fn test_non_array_result_drops_all_roles() {
        let mut filter = RoleFilter::new();
        filter.add_observer("app_edit", |_| json!("editor"));

        assert!(filter
            .filter_roles("app_edit", &role_set(["editor", "author"]))
            .is_empty());
    }

    #[test]
    fn test_null_result_drops_all_roles() {
        let mut filter = RoleFilter::new();
        filter.add_observer("app_edit", |_| Value::Null);

        assert!(filter.filter_roles("app_edit", &role_set(["editor"])).is_empty());
    }

    #[test]
    fn test_non_string_entries_are_dropped() {
        let mut filter = RoleFilter::new();
        filter.add_observer("app_edit", |_| json!(["editor", 42, null, "", "author"]));

        let filtered = filter.filter_roles("app_edit", &RoleSet::new());
        assert_eq!(filtered, role_set(["editor", "author"]));
    }

    #[test]
    fn test_observers_chain_in_priority_order() {
        let mut filter = RoleFilter::new();
        // Runs second, appending to the first observer's output.
        filter.add_observer_with_priority("app_edit", 20, |value| {
            let mut items = value.as_array().cloned().unwrap_or_default();
            items.push(json!("late"));
            Value::Array(items)
        });
        // Runs first and discards the input.
        filter.add_observer_with_priority("app_edit", 5, |_| json!(["early"]));

        let filtered = filter.filter_roles("app_edit", &role_set(["editor"]));
        assert_eq!(filtered, role_set(["early", "late"]));
    }

    #[test]
    fn test_clear_detaches_observers() {
        let mut filter = RoleFilter::new();
        filter.add_observer("app_edit", |_| json!([]));
        filter.clear("app_edit");

        let roles = role_set(["editor"]);
        assert_eq!(filter.filter_roles("app_edit", &roles), roles);
    }
}

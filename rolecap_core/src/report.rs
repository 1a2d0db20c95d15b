use crate::capability::RoleSet;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Add,
    Remove,
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOperation::Add => write!(f, "add"),
            SyncOperation::Remove => write!(f, "remove"),
        }
    }
}

/// A store call that failed during an add or remove run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub role: String,
    pub capabilities: Vec<String>,
    pub error: String,
}

/// Outcome of one `add()` or `remove()` run against a role store.
///
/// Store failures never abort a run; they are collected here instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    /// Unique identifier for this run
    pub run_id: Uuid,
    pub operation: SyncOperation,
    /// When the run started
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// Number of grant or revoke calls issued to the store
    pub store_calls: usize,
    /// Role name to the capabilities successfully applied to it
    pub applied: BTreeMap<String, RoleSet>,
    /// Role names the store did not recognise
    pub unresolved_roles: RoleSet,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn new(operation: SyncOperation) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            operation,
            started_at: Utc::now(),
            store_calls: 0,
            applied: BTreeMap::new(),
            unresolved_roles: RoleSet::new(),
            failures: Vec::new(),
        }
    }

    pub(crate) fn record_success<I, S>(&mut self, role: &str, capabilities: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.store_calls += 1;
        self.applied
            .entry(role.to_string())
            .or_default()
            .extend(capabilities.into_iter().map(|c| c.as_ref().to_string()));
    }

    pub(crate) fn record_failure(&mut self, role: &str, capabilities: Vec<String>, error: String) {
        self.store_calls += 1;
        self.failures.push(SyncFailure {
            role: role.to_string(),
            capabilities,
            error,
        });
    }

    pub(crate) fn record_unresolved(&mut self, role: &str) {
        self.unresolved_roles.insert(role.to_string());
    }

    /// Capabilities applied to a role during this run
    pub fn applied_to(&self, role: &str) -> Option<&RoleSet> {
        self.applied.get(role)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_records_calls() {
        let mut report = SyncReport::new(SyncOperation::Add);
        let caps = vec!["app_edit".to_string(), "app_view".to_string()];

        report.record_success("editor", &caps);
        report.record_failure("author", caps.clone(), "backend down".into());
        report.record_unresolved("ghost");

        assert_eq!(report.store_calls, 2);
        assert_eq!(report.applied_to("editor").unwrap().len(), 2);
        assert!(report.applied_to("author").is_none());
        assert!(report.unresolved_roles.contains("ghost"));
        assert!(!report.is_clean());
    }

    #[test]
    fn test_report_serialization() {
        let report = SyncReport::new(SyncOperation::Remove);
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["operation"], "remove");
        assert_eq!(value["store_calls"], 0);
    }
}

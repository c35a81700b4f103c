//! Per-tool approval bookkeeping.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Caller's decision on a paused tool call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    /// Approve this call only.
    Approve,
    /// Approve this call and every later call to the same tool.
    ApproveAlways,
    /// Reject this call only.
    Reject,
    /// Reject this call and every later call to the same tool.
    RejectAlways,
}

/// Result of looking a call up in the table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// No decision recorded; the call must pause.
    Unknown,
    Approved,
    Rejected,
}

/// Decisions recorded for one tool name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolApprovals {
    #[serde(default)]
    pub approved: HashSet<String>,
    #[serde(default)]
    pub rejected: HashSet<String>,
    /// `Some(true)` approves every call, `Some(false)` rejects every call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always: Option<bool>,
}

/// Approval table keyed by tool name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApprovalTable {
    #[serde(default)]
    tools: HashMap<String, ToolApprovals>,
}

impl ApprovalTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a call. A per-tool "always" flag wins over per-call entries.
    pub fn status(&self, tool_name: &str, tool_call_id: &str) -> ApprovalStatus {
        let Some(entry) = self.tools.get(tool_name) else {
            return ApprovalStatus::Unknown;
        };
        match entry.always {
            Some(true) => return ApprovalStatus::Approved,
            Some(false) => return ApprovalStatus::Rejected,
            None => {}
        }
        if entry.approved.contains(tool_call_id) {
            ApprovalStatus::Approved
        } else if entry.rejected.contains(tool_call_id) {
            ApprovalStatus::Rejected
        } else {
            ApprovalStatus::Unknown
        }
    }

    pub fn record(&mut self, tool_name: &str, tool_call_id: &str, decision: ApprovalDecision) {
        let entry = self.tools.entry(tool_name.to_string()).or_default();
        match decision {
            ApprovalDecision::Approve | ApprovalDecision::ApproveAlways => {
                entry.rejected.remove(tool_call_id);
                entry.approved.insert(tool_call_id.to_string());
            }
            ApprovalDecision::Reject | ApprovalDecision::RejectAlways => {
                entry.approved.remove(tool_call_id);
                entry.rejected.insert(tool_call_id.to_string());
            }
        }
        match decision {
            ApprovalDecision::ApproveAlways => entry.always = Some(true),
            ApprovalDecision::RejectAlways => entry.always = Some(false),
            _ => {}
        }
    }

    /// Set or clear the per-tool flag without touching per-call entries.
    pub fn set_always(&mut self, tool_name: &str, always: Option<bool>) {
        self.tools.entry(tool_name.to_string()).or_default().always = always;
    }

    pub fn tool(&self, tool_name: &str) -> Option<&ToolApprovals> {
        self.tools.get(tool_name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_until_decided() {
        let mut table = ApprovalTable::new();
        assert_eq!(table.status("rm", "c1"), ApprovalStatus::Unknown);

        table.record("rm", "c1", ApprovalDecision::Reject);
        assert_eq!(table.status("rm", "c1"), ApprovalStatus::Rejected);
        assert_eq!(table.status("rm", "c2"), ApprovalStatus::Unknown);

        table.record("rm", "c1", ApprovalDecision::Approve);
        assert_eq!(table.status("rm", "c1"), ApprovalStatus::Approved);
    }

    #[test]
    fn always_flag_covers_future_calls() {
        let mut table = ApprovalTable::new();
        table.record("deploy", "c1", ApprovalDecision::ApproveAlways);

        assert_eq!(table.status("deploy", "c9"), ApprovalStatus::Approved);
        assert_eq!(table.status("other", "c9"), ApprovalStatus::Unknown);

        table.record("deploy", "c2", ApprovalDecision::RejectAlways);
        assert_eq!(table.status("deploy", "c1"), ApprovalStatus::Rejected);
    }
}

//! Run context: caller payload, usage totals and approvals.
//!
//! A [`RunContext`] is cheap to clone; clones share state. Sharing one
//! context between concurrent runs is safe: usage accumulates under a lock
//! and approval updates are atomic per decision.

pub mod approvals;

pub use approvals::{ApprovalDecision, ApprovalStatus, ApprovalTable, ToolApprovals};

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::types::{ApprovalRequest, Usage};

#[derive(Clone)]
pub struct RunContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    payload: Option<Arc<dyn Any + Send + Sync>>,
    usage: Mutex<Usage>,
    approvals: RwLock<ApprovalTable>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("payload", &self.inner.payload.as_ref().map(|_| ".."))
            .field("usage", &self.usage())
            .field("approvals", &self.approvals())
            .finish()
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self::build(None, ApprovalTable::default())
    }

    /// Context carrying an opaque caller value, retrievable by type.
    pub fn with_payload<T: Any + Send + Sync>(payload: T) -> Self {
        Self::build(Some(Arc::new(payload)), ApprovalTable::default())
    }

    /// Same payload, fresh usage, the given approvals. Used to restore a
    /// persisted paused run.
    pub fn with_approvals(&self, approvals: ApprovalTable) -> Self {
        Self::build(self.inner.payload.clone(), approvals)
    }

    fn build(payload: Option<Arc<dyn Any + Send + Sync>>, approvals: ApprovalTable) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                payload,
                usage: Mutex::new(Usage::default()),
                approvals: RwLock::new(approvals),
            }),
        }
    }

    pub fn payload<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.inner.payload.as_ref()?.downcast_ref::<T>()
    }

    /// Accumulated usage across every run that used this context.
    pub fn usage(&self) -> Usage {
        *self
            .inner
            .usage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_usage(&self, usage: &Usage) {
        self.inner
            .usage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .merge(usage);
    }

    pub fn approval_status(&self, tool_name: &str, tool_call_id: &str) -> ApprovalStatus {
        self.inner
            .approvals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .status(tool_name, tool_call_id)
    }

    pub fn record_approval(&self, tool_name: &str, tool_call_id: &str, decision: ApprovalDecision) {
        self.inner
            .approvals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .record(tool_name, tool_call_id, decision);
    }

    /// Answer a paused call surfaced by a run.
    pub fn decide(&self, request: &ApprovalRequest, decision: ApprovalDecision) {
        self.record_approval(&request.tool_name, &request.tool_call_id, decision);
    }

    pub fn approve(&self, request: &ApprovalRequest) {
        self.decide(request, ApprovalDecision::Approve);
    }

    pub fn approve_always(&self, request: &ApprovalRequest) {
        self.decide(request, ApprovalDecision::ApproveAlways);
    }

    pub fn reject(&self, request: &ApprovalRequest) {
        self.decide(request, ApprovalDecision::Reject);
    }

    pub fn reject_always(&self, request: &ApprovalRequest) {
        self.decide(request, ApprovalDecision::RejectAlways);
    }

    /// Pre-approve (or pre-reject) every call to a tool before the run starts.
    pub fn set_tool_always(&self, tool_name: &str, approved: bool) {
        self.inner
            .approvals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_always(tool_name, Some(approved));
    }

    /// Snapshot of the approval table.
    pub fn approvals(&self) -> ApprovalTable {
        self.inner
            .approvals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Tenant(&'static str);

    #[test]
    fn payload_is_retrieved_by_type() {
        let ctx = RunContext::with_payload(Tenant("acme"));
        assert_eq!(ctx.payload::<Tenant>(), Some(&Tenant("acme")));
        assert_eq!(ctx.payload::<String>(), None);
        assert!(RunContext::new().payload::<Tenant>().is_none());
    }

    #[test]
    fn clones_share_usage() {
        let ctx = RunContext::new();
        let clone = ctx.clone();
        clone.add_usage(&Usage::new(3, 4));
        ctx.add_usage(&Usage::new(1, 1));
        assert_eq!(ctx.usage(), Usage::new(4, 5));
    }

    #[tokio::test]
    async fn concurrent_usage_updates_are_not_lost() {
        let ctx = RunContext::new();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    for _ in 0..100 {
                        ctx.add_usage(&Usage::new(1, 2));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(ctx.usage(), Usage::new(1600, 3200));
    }

    #[test]
    fn with_approvals_keeps_payload() {
        let ctx = RunContext::with_payload(Tenant("acme"));
        let mut table = ApprovalTable::new();
        table.set_always("deploy", Some(true));
        let restored = ctx.with_approvals(table);
        assert_eq!(restored.payload::<Tenant>(), Some(&Tenant("acme")));
        assert_eq!(
            restored.approval_status("deploy", "x"),
            ApprovalStatus::Approved
        );
    }
}

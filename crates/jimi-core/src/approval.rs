// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Approval Arbiter: decides whether a tool call may run, consulting (in
//! order) YOLO mode, the per-session approve-for-session cache, the
//! glob-based [`ToolPolicy`], the tool's own [`ApprovalPolicy`] default, and
//! finally — only if nothing above already decided — an interactive
//! `approval-request` round-trip over the [`Wire`].
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use jimi_tools::{ApprovalPolicy, Tool, ToolCall, ToolPolicy};

use crate::wire::{ApprovalResponse, Wire};

/// Why a tool call was rejected, for the error message surfaced back to the
/// model as the tool's output.
pub enum Rejection {
    /// A deny-pattern or the tool's own policy denied it outright.
    Denied,
    /// A human rejected it interactively.
    RejectedByUser,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Denied => write!(f, "tool call denied by policy"),
            Rejection::RejectedByUser => write!(f, "tool call rejected"),
        }
    }
}

pub struct ApprovalArbiter {
    yolo: bool,
    wire: Arc<Wire>,
    policy: ToolPolicy,
    /// Action labels approved for the remainder of the session.
    session_cache: Mutex<HashSet<String>>,
}

impl ApprovalArbiter {
    pub fn new(wire: Arc<Wire>, policy: ToolPolicy, yolo: bool) -> Self {
        Self {
            yolo,
            wire,
            policy,
            session_cache: Mutex::new(HashSet::new()),
        }
    }

    /// The human-readable action label used both for `ToolPolicy` glob
    /// matching and for session-cache keys. Prefers the call's "command" or
    /// "path" argument (the part a glob pattern would actually target),
    /// falling back to the bare tool name for argument-less tools.
    fn action_label(call: &ToolCall) -> String {
        call.args
            .get("command")
            .and_then(|v| v.as_str())
            .or_else(|| call.args.get("path").and_then(|v| v.as_str()))
            .map(|s| s.to_string())
            .unwrap_or_else(|| call.name.clone())
    }

    /// Decide whether `call` (dispatched to `tool`) may run. `Ok(())` means
    /// proceed; `Err(Rejection)` means the caller must synthesize an error
    /// tool-result instead of invoking the tool.
    pub async fn evaluate(&self, tool: &Arc<dyn Tool>, call: &ToolCall) -> Result<(), Rejection> {
        let label = Self::action_label(call);

        if self.yolo {
            return Ok(());
        }
        if self.session_cache.lock().unwrap().contains(&label) {
            return Ok(());
        }

        match self.policy.decide(&label) {
            ApprovalPolicy::Deny => return Err(Rejection::Denied),
            ApprovalPolicy::Auto => return Ok(()),
            ApprovalPolicy::Ask => {}
        }

        match tool.default_policy() {
            ApprovalPolicy::Deny => return Err(Rejection::Denied),
            ApprovalPolicy::Auto => return Ok(()),
            ApprovalPolicy::Ask => {}
        }

        match self.wire.request_approval(label.clone()).await {
            ApprovalResponse::Approve => Ok(()),
            ApprovalResponse::ApproveForSession => {
                self.session_cache.lock().unwrap().insert(label);
                Ok(())
            }
            ApprovalResponse::Reject => Err(Rejection::RejectedByUser),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jimi_config::ToolsConfig;
    use jimi_tools::ToolOutput;
    use serde_json::{json, Value};

    struct StubTool {
        policy: ApprovalPolicy,
    }

    #[async_trait]
    impl Tool for StubTool {
        fn name(&self) -> &str {
            "stub"
        }
        fn description(&self) -> &str {
            "stub"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }
        fn default_policy(&self) -> ApprovalPolicy {
            self.policy
        }
        async fn execute(&self, call: &ToolCall) -> ToolOutput {
            ToolOutput::ok(&call.id, "ok")
        }
    }

    fn call() -> ToolCall {
        ToolCall {
            id: "1".into(),
            name: "stub".into(),
            args: json!({"command": "do-thing"}),
        }
    }

    #[tokio::test]
    async fn yolo_approves_without_touching_wire() {
        let wire = Wire::new();
        let arbiter = ApprovalArbiter::new(wire, ToolPolicy::from_config(&ToolsConfig::default()), true);
        let tool: Arc<dyn Tool> = Arc::new(StubTool { policy: ApprovalPolicy::Ask });
        assert!(arbiter.evaluate(&tool, &call()).await.is_ok());
    }

    #[tokio::test]
    async fn tool_default_auto_approves_without_interactive_round_trip() {
        let wire = Wire::new();
        let arbiter = ApprovalArbiter::new(wire, ToolPolicy::from_config(&ToolsConfig::default()), false);
        let tool: Arc<dyn Tool> = Arc::new(StubTool { policy: ApprovalPolicy::Auto });
        assert!(arbiter.evaluate(&tool, &call()).await.is_ok());
    }

    #[tokio::test]
    async fn tool_default_deny_rejects_without_emitting_event() {
        let wire = Wire::new();
        let mut rx = wire.subscribe();
        let arbiter = ApprovalArbiter::new(Arc::clone(&wire), ToolPolicy::from_config(&ToolsConfig::default()), false);
        let tool: Arc<dyn Tool> = Arc::new(StubTool { policy: ApprovalPolicy::Deny });
        assert!(arbiter.evaluate(&tool, &call()).await.is_err());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn policy_deny_pattern_short_circuits_before_wire() {
        let wire = Wire::new();
        let mut rx = wire.subscribe();
        let policy = ToolPolicy::from_config(&ToolsConfig {
            deny_patterns: vec!["do-thing".into()],
            ..ToolsConfig::default()
        });
        let arbiter = ApprovalArbiter::new(Arc::clone(&wire), policy, false);
        let tool: Arc<dyn Tool> = Arc::new(StubTool { policy: ApprovalPolicy::Ask });
        assert!(arbiter.evaluate(&tool, &call()).await.is_err());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn ask_falls_through_to_interactive_wire_round_trip() {
        let wire = Wire::new();
        let mut rx = wire.subscribe();
        let arbiter = ApprovalArbiter::new(Arc::clone(&wire), ToolPolicy::from_config(&ToolsConfig::default()), false);
        let tool: Arc<dyn Tool> = Arc::new(StubTool { policy: ApprovalPolicy::Ask });

        let call = call();
        let handle = tokio::spawn(async move { arbiter.evaluate(&tool, &call).await.is_ok() });
        match rx.recv().await.unwrap() {
            crate::wire::WireEvent::ApprovalRequest { sink, .. } => {
                sink.resolve(ApprovalResponse::Approve)
            }
            _ => panic!("expected ApprovalRequest"),
        }
        assert!(handle.await.unwrap());
    }

    #[tokio::test]
    async fn approve_for_session_is_cached() {
        let wire = Wire::new();
        let wire_pub = Arc::clone(&wire);
        let arbiter = Arc::new(ApprovalArbiter::new(wire, ToolPolicy::from_config(&ToolsConfig::default()), false));
        let mut rx = wire_pub.subscribe();

        let a1 = Arc::clone(&arbiter);
        let tool: Arc<dyn Tool> = Arc::new(StubTool { policy: ApprovalPolicy::Ask });
        let t1 = Arc::clone(&tool);
        let c1 = call();
        let handle = tokio::spawn(async move { a1.evaluate(&t1, &c1).await.is_ok() });
        match rx.recv().await.unwrap() {
            crate::wire::WireEvent::ApprovalRequest { sink, .. } => {
                sink.resolve(ApprovalResponse::ApproveForSession)
            }
            _ => panic!("expected ApprovalRequest"),
        }
        assert!(handle.await.unwrap());

        // Second call for the same action must not round-trip through the
        // Wire at all.
        let c2 = call();
        assert!(arbiter.evaluate(&tool, &c2).await.is_ok());
        assert!(rx.try_recv().is_err());
    }
}

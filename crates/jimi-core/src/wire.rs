// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The event bus ("Wire") that fans a single producer's events out to any
//! number of subscribers — the TUI, a CI log, an MCP export session, and a
//! parent agent observing a delegated sub-agent can all subscribe
//! independently. Generalises the single-consumer `mpsc` channel already
//! used for [`crate::AgentEvent`] / `ToolEvent` to the multi-subscriber case.
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};

use jimi_tools::ToolCall;

/// Per-subscriber channel depth. Events beyond this are subject to the
/// drop policy in [`WireEvent::is_critical`].
const SUBSCRIBER_BUFFER: usize = 256;

/// The outcome of resolving an [`WireEvent::ApprovalRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalResponse {
    /// Run this one invocation, ask again next time.
    Approve,
    /// Run this invocation and auto-approve the same action for the rest
    /// of the session.
    ApproveForSession,
    /// Do not run the tool.
    Reject,
}

/// A pending approval decision. Cheaply `Clone`-able so the same request can
/// be broadcast to every subscriber; only the first subscriber to call
/// [`resolve`](Self::resolve) actually has any effect, the rest are no-ops.
#[derive(Clone)]
pub struct ApprovalSink(Arc<Mutex<Option<oneshot::Sender<ApprovalResponse>>>>);

impl ApprovalSink {
    fn new(tx: oneshot::Sender<ApprovalResponse>) -> Self {
        Self(Arc::new(Mutex::new(Some(tx))))
    }

    /// Resolve the request. Idempotent: only the first call has any effect.
    pub fn resolve(&self, response: ApprovalResponse) {
        if let Some(tx) = self.0.lock().unwrap().take() {
            let _ = tx.send(response);
        }
    }
}

impl std::fmt::Debug for ApprovalSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApprovalSink(..)")
    }
}

/// One event broadcast on the Wire.
#[derive(Debug, Clone)]
pub enum WireEvent {
    StepBegin { turn: u32 },
    StepInterrupted { turn: u32 },
    CompactionBegin,
    CompactionEnd,
    ToolCall(ToolCall),
    ToolResult {
        call_id: String,
        is_error: bool,
    },
    /// A tool invocation needs a human decision before it can run. `label`
    /// is the human-readable action description shown to the approver;
    /// resolve via `sink`.
    ApprovalRequest {
        label: String,
        sink: ApprovalSink,
    },
    /// A streamed chunk of assistant/thinking content. Dropped first on
    /// backpressure.
    ContentPart(String),
    /// A free-form status line (e.g. "compacting…", "retrying model call").
    StatusUpdate(String),
}

impl WireEvent {
    /// Critical events are never dropped; the publisher blocks instead.
    /// Everything else (`ContentPart`, `StatusUpdate`) is best-effort.
    fn is_critical(&self) -> bool {
        !matches!(self, WireEvent::ContentPart(_) | WireEvent::StatusUpdate(_))
    }
}

/// Multi-subscriber broadcast bus with a single logical producer per
/// session/sub-agent. `publish` never blocks the caller for non-critical
/// events; it always observes the single-producer ordering guarantee since
/// subscribers each see events in the order they were published.
pub struct Wire {
    subscribers: Mutex<Vec<mpsc::Sender<WireEvent>>>,
    closed: Mutex<bool>,
}

impl Wire {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            subscribers: Mutex::new(Vec::new()),
            closed: Mutex::new(false),
        })
    }

    /// Subscribe to future events. If the Wire is already closed, the
    /// returned receiver is immediately exhausted (its sender half is
    /// dropped without ever being stored).
    pub fn subscribe(&self) -> mpsc::Receiver<WireEvent> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        if !*self.closed.lock().unwrap() {
            self.subscribers.lock().unwrap().push(tx);
        }
        rx
    }

    /// Publish an event to every live subscriber. No-op (and silent) if the
    /// Wire is closed or has no subscribers.
    pub async fn publish(&self, event: WireEvent) {
        if *self.closed.lock().unwrap() {
            return;
        }
        let subs: Vec<mpsc::Sender<WireEvent>> = self.subscribers.lock().unwrap().clone();
        if subs.is_empty() {
            return;
        }
        if event.is_critical() {
            for sub in &subs {
                // Never drop a critical event: block the producer instead.
                let _ = sub.send(event.clone()).await;
            }
        } else {
            for sub in &subs {
                // Full buffer + non-critical event: drop it, don't block.
                let _ = sub.try_send(event.clone());
            }
        }
    }

    /// Resolve an approval request and publish it, returning the response.
    /// Convenience wrapper used by the Approval Arbiter.
    pub async fn request_approval(&self, label: String) -> ApprovalResponse {
        let (tx, rx) = oneshot::channel();
        let sink = ApprovalSink::new(tx);
        self.publish(WireEvent::ApprovalRequest { label, sink }).await;
        // Cancelled (no subscriber ever resolves it and the Wire is torn
        // down) resolves to Reject rather than hanging forever.
        rx.await.unwrap_or(ApprovalResponse::Reject)
    }

    /// Terminate all subscriber streams cleanly and make subsequent
    /// publishes/subscribes silent no-ops.
    pub fn close(&self) {
        *self.closed.lock().unwrap() = true;
        self.subscribers.lock().unwrap().clear();
    }
}

impl Default for Wire {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            closed: Mutex::new(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call() -> ToolCall {
        ToolCall {
            id: "1".into(),
            name: "shell".into(),
            args: json!({"command": "ls"}),
        }
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_is_silent() {
        let wire = Wire::new();
        wire.publish(WireEvent::ToolCall(call())).await;
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let wire = Wire::new();
        let mut rx = wire.subscribe();
        wire.publish(WireEvent::ToolCall(call())).await;
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, WireEvent::ToolCall(_)));
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive() {
        let wire = Wire::new();
        let mut a = wire.subscribe();
        let mut b = wire.subscribe();
        wire.publish(WireEvent::StatusUpdate("hi".into())).await;
        assert!(a.recv().await.is_some());
        assert!(b.recv().await.is_some());
    }

    #[tokio::test]
    async fn non_critical_event_dropped_when_buffer_full() {
        let wire = Wire::new();
        let rx = wire.subscribe();
        for i in 0..(SUBSCRIBER_BUFFER + 10) {
            wire.publish(WireEvent::StatusUpdate(format!("{i}"))).await;
        }
        // Does not deadlock: the buffer overflowed and excess events were
        // dropped rather than blocking the publisher.
        drop(rx);
    }

    #[tokio::test]
    async fn close_terminates_subscriber_stream() {
        let wire = Wire::new();
        let mut rx = wire.subscribe();
        wire.close();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn subscribe_after_close_yields_already_closed_stream() {
        let wire = Wire::new();
        wire.close();
        let mut rx = wire.subscribe();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn publish_after_close_is_silent_no_op() {
        let wire = Wire::new();
        let mut rx = wire.subscribe();
        wire.close();
        wire.publish(WireEvent::ToolCall(call())).await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn approval_request_resolves_through_sink() {
        let wire = Wire::new();
        let mut rx = wire.subscribe();
        let wire2 = Arc::clone(&wire);
        let handle = tokio::spawn(async move { wire2.request_approval("shell: ls".into()).await });
        match rx.recv().await.unwrap() {
            WireEvent::ApprovalRequest { sink, .. } => sink.resolve(ApprovalResponse::Approve),
            _ => panic!("expected ApprovalRequest"),
        }
        assert_eq!(handle.await.unwrap(), ApprovalResponse::Approve);
    }

    #[tokio::test]
    async fn approval_request_with_no_subscriber_rejects() {
        let wire = Wire::new();
        assert_eq!(wire.request_approval("x".into()).await, ApprovalResponse::Reject);
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! TaskTool — spawns a sub-agent to complete a focused sub-task.
//!
//! Lives in `jimi-bootstrap` so that TaskTool can use `build_tool_registry`
//! without creating a circular dependency (jimi-core -> jimi-tools,
//! jimi-bootstrap -> jimi-core + jimi-tools).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use jimi_config::{AgentConfig, Config};
use jimi_core::{Agent, AgentEvent, AgentRuntimeContext, Wire, WireEvent};

use jimi_tools::{
    events::{TodoItem, ToolEvent},
    policy::ApprovalPolicy,
    tool::{Tool, ToolCall, ToolOutput},
};

use crate::context::ToolSetProfile;
use crate::registry::build_tool_registry;

const MAX_DEPTH: usize = 3;

/// Below this length, a sub-agent's terminal reply is treated as too terse
/// to be useful and is re-prompted once with a request to elaborate.
const MIN_REPLY_CHARS: usize = 200;

/// Spawns a sub-agent to complete a focused task and returns its text output.
pub struct TaskTool {
    model: Arc<dyn jimi_model::ModelProvider>,
    config: Arc<Config>,
    depth: Arc<AtomicUsize>,
    /// Runtime context to pass to each sub-agent (project root, CI/git notes,
    /// AGENTS.md content). Sub-agents inherit the parent's context so they
    /// know where to operate.
    sub_agent_runtime: AgentRuntimeContext,
    /// The delegating agent's own Wire. Approval requests raised by the
    /// sub-agent are forwarded here so the same human approves both; no
    /// other sub-agent event crosses the boundary.
    parent_wire: Arc<Wire>,
}

impl TaskTool {
    pub fn new(
        model: Arc<dyn jimi_model::ModelProvider>,
        config: Arc<Config>,
        depth: Arc<AtomicUsize>,
        sub_agent_runtime: AgentRuntimeContext,
        parent_wire: Arc<Wire>,
    ) -> Self {
        Self {
            model,
            config,
            depth,
            sub_agent_runtime,
            parent_wire,
        }
    }
}

#[async_trait]
impl Tool for TaskTool {
    fn name(&self) -> &str {
        "task"
    }

    fn description(&self) -> &str {
        "Spawn a sub-agent to complete a focused task and return its final text output. \
         Useful for delegating isolated sub-tasks. The sub-agent has access to the standard \
         tool set, minus `task` itself. Maximum nesting depth is 3."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "The task description for the sub-agent"
                },
                "agent": {
                    "type": "string",
                    "description": "Name of the agent spec to delegate to (default: the parent's own spec)"
                },
                "max_rounds": {
                    "type": "integer",
                    "description": "Maximum tool-call rounds (default: from config)"
                }
            },
            "required": ["prompt"],
            "additionalProperties": false
        })
    }

    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Ask
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let prompt = match call.args.get("prompt").and_then(|v| v.as_str()) {
            Some(p) => p.to_string(),
            None => return ToolOutput::err(&call.id, "missing 'prompt'"),
        };

        let current_depth = self.depth.load(Ordering::Relaxed);
        if current_depth >= MAX_DEPTH {
            return ToolOutput::err(
                &call.id,
                format!("maximum sub-agent depth ({MAX_DEPTH}) reached"),
            );
        }

        self.depth.fetch_add(1, Ordering::Relaxed);
        debug!(prompt = %prompt, depth = current_depth + 1, "task: spawning sub-agent");

        let mut sub_config: AgentConfig = self.config.agent.clone();
        if let Some(max_rounds) = call.args.get("max_rounds").and_then(|v| v.as_u64()) {
            sub_config.max_tool_rounds = max_rounds as u32;
        }

        let todos: Arc<Mutex<Vec<TodoItem>>> = Arc::new(Mutex::new(Vec::new()));

        let profile = ToolSetProfile::SubAgent { todos };

        // Shared tool-event channel wired through to the agent so
        // TodoWriteTool updates are correctly observed.
        let (tool_event_tx, tool_event_rx) = mpsc::channel::<ToolEvent>(64);

        // Sub-agents use SubAgent profile (no TaskTool, so nesting is bounded
        // by MAX_DEPTH rather than by tool availability alone). The SubAgent
        // branch never registers TaskTool, so the sub-registry never forwards
        // approval requests itself — the wire passed here is unused.
        let tools = Arc::new(build_tool_registry(
            &self.config,
            self.model.clone(),
            profile,
            tool_event_tx,
            AgentRuntimeContext::default(),
            Wire::new(),
        ));

        let mut agent = Agent::new(
            self.model.clone(),
            tools,
            Arc::new(sub_config),
            self.sub_agent_runtime.clone(),
            tool_event_rx,
            128_000,
        );
        agent.enable_approval(&self.config.tools, false);

        // Forward ONLY approval-request events from the sub-agent's Wire up
        // to the parent's, so the same human resolves both; every other
        // sub-agent event (tool-call, step lifecycle, ...) stays local.
        let mut sub_wire_rx = agent.wire().subscribe();
        let parent_wire = Arc::clone(&self.parent_wire);
        let forward_task = tokio::spawn(async move {
            while let Some(event) = sub_wire_rx.recv().await {
                if matches!(event, WireEvent::ApprovalRequest { .. }) {
                    parent_wire.publish(event).await;
                }
            }
        });

        let (tx, mut rx) = mpsc::channel::<AgentEvent>(256);

        // The channel is bounded, so `submit` must run concurrently with the
        // drain below — otherwise a sub-agent turn emitting more than 256
        // streamed events (any turn with a few tool calls) blocks forever on
        // `tx.send(...).await` with nothing reading from `rx`.
        let submit_task = tokio::spawn(async move {
            let result = agent.submit(&prompt, tx).await;
            (agent, result)
        });

        let mut output = String::new();
        while let Some(event) = rx.recv().await {
            if let AgentEvent::TextDelta(delta) = event {
                output.push_str(&delta);
            }
        }

        let submit_result = submit_task.await;
        let (mut agent, submit_result) = match submit_result {
            Ok(pair) => pair,
            Err(e) => {
                self.depth.fetch_sub(1, Ordering::Relaxed);
                forward_task.abort();
                return ToolOutput::err(&call.id, format!("sub-agent task panicked: {e}"));
            }
        };
        if let Err(e) = submit_result {
            self.depth.fetch_sub(1, Ordering::Relaxed);
            forward_task.abort();
            return ToolOutput::err(&call.id, format!("sub-agent error: {e}"));
        }

        // A terse terminal reply is usually a sign the sub-agent stopped
        // before actually reporting its findings. Re-prompt once asking it
        // to elaborate, and use that reply instead if it says more.
        if output.trim().chars().count() < MIN_REPLY_CHARS {
            let (tx2, mut rx2) = mpsc::channel::<AgentEvent>(256);
            let elaborate_task = tokio::spawn(async move {
                let result = agent
                    .submit("Please elaborate: give the full detail of what you found or did.", tx2)
                    .await;
                (agent, result)
            });
            let mut elaborated = String::new();
            while let Some(event) = rx2.recv().await {
                if let AgentEvent::TextDelta(delta) = event {
                    elaborated.push_str(&delta);
                }
            }
            if let Ok((_agent, Ok(()))) = elaborate_task.await {
                if !elaborated.trim().is_empty() {
                    output = elaborated;
                }
            }
        }

        self.depth.fetch_sub(1, Ordering::Relaxed);
        forward_task.abort();

        if output.is_empty() {
            ToolOutput::ok(&call.id, "(sub-agent produced no text output)")
        } else {
            ToolOutput::ok(&call.id, output)
        }
    }
}

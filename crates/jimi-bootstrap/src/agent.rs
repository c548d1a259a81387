// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! [`AgentBuilder`] — single entry point for constructing a fully wired Agent.
//!
//! Callers pass a [`Config`], an optional [`RuntimeContext`], the desired
//! model, and a [`ToolSetProfile`].  The builder handles registry
//! construction and [`AgentRuntimeContext`] population internally.

use std::sync::Arc;

use tokio::sync::mpsc;

use jimi_config::Config;
use jimi_core::{Agent, AgentRuntimeContext, Wire};
use jimi_model::ModelProvider;
use jimi_runtime::{discover_agents, SharedAgents};
use jimi_tools::events::ToolEvent;

use crate::context::{RuntimeContext, ToolSetProfile};
use crate::registry::build_tool_registry;

/// Constructs a fully wired [`Agent`] from configuration and runtime context.
///
/// # Example
/// ```rust,ignore
/// let agent = AgentBuilder::new(config)
///     .with_runtime_context(RuntimeContext::auto_detect())
///     .build(model, ToolSetProfile::Full { ... });
/// ```
pub struct AgentBuilder {
    config: Arc<Config>,
    runtime_ctx: RuntimeContext,
    yolo: bool,
}

impl AgentBuilder {
    /// Create a builder with the given configuration.
    /// Runtime context defaults to empty (no project/git/CI detection).
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            runtime_ctx: RuntimeContext::empty(),
            yolo: false,
        }
    }

    /// Set the runtime context (project root, git, CI environment).
    pub fn with_runtime_context(mut self, ctx: RuntimeContext) -> Self {
        self.runtime_ctx = ctx;
        self
    }

    /// Bypass interactive tool approval entirely (`--yolo`).
    pub fn with_yolo(mut self, yolo: bool) -> Self {
        self.yolo = yolo;
        self
    }

    /// Build the [`Agent`] with the given model and tool-set profile.
    ///
    /// This method owns the creation of the shared tool-event channel so that
    /// `TodoWriteTool` and the agent loop operate on **the same** instance:
    ///
    /// 1. Creates `(tool_event_tx, tool_event_rx)` (tx -> tools, rx -> Agent).
    /// 2. Discovers sub-agents and converts [`RuntimeContext`] ->
    ///    [`AgentRuntimeContext`].
    /// 3. Builds a [`ToolRegistry`] via `build_tool_registry`.
    /// 4. Constructs `Agent::new(...)`.
    pub fn build(self, model: Arc<dyn ModelProvider>, profile: ToolSetProfile) -> Agent {
        // Shared event channel: tools send, agent drains.
        let (tool_event_tx, tool_event_rx) = mpsc::channel::<ToolEvent>(64);

        // Created up front and threaded into both the registry (so `task`
        // sub-agents forward their approval requests here) and the Agent
        // itself below.
        let wire = Wire::new();

        let agents = SharedAgents::new(discover_agents(self.runtime_ctx.project_root.as_deref()));

        // Convert RuntimeContext -> AgentRuntimeContext (the jimi-core type).
        let runtime = AgentRuntimeContext {
            project_root: self.runtime_ctx.project_root,
            git_context_note: self
                .runtime_ctx
                .git_context
                .and_then(|g| g.to_prompt_section()),
            ci_context_note: self
                .runtime_ctx
                .ci_context
                .and_then(|c| c.to_prompt_section()),
            project_context_file: self.runtime_ctx.project_context_file,
            append_system_prompt: self.runtime_ctx.append_system_prompt,
            system_prompt_override: self.runtime_ctx.system_prompt_override,
            agents,
        };

        // Pass runtime.clone() as sub_agent_runtime so TaskTool sub-agents
        // inherit the parent's project root, AGENTS.md, CI/git context.
        let registry = build_tool_registry(
            &self.config,
            model.clone(),
            profile,
            tool_event_tx,
            runtime.clone(),
            Arc::clone(&wire),
        );

        // Resolve context window from the static catalog; fall back to 128 000.
        let context_window = model.catalog_context_window().unwrap_or(128_000) as usize;

        let mut agent = Agent::new(
            model,
            Arc::new(registry),
            Arc::new(self.config.agent.clone()),
            runtime,
            tool_event_rx,
            context_window,
        );
        agent.attach_wire(wire);
        agent.enable_approval(&self.config.tools, self.yolo);
        agent
    }
}

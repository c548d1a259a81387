// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Centralised tool-registry builder.
//!
//! All callers (CI runner, conversation runner, TUI, sub-agents) use
//! `build_tool_registry` with the appropriate [`ToolSetProfile`] instead of
//! each inlining their own registration loop.

use std::sync::Arc;

use tokio::sync::mpsc;

use jimi_config::Config;
use jimi_model::ModelProvider;
use jimi_tools::{
    events::ToolEvent, EditFileTool, GlobTool, GrepTool, ListDirTool, ReadFileTool,
    RunTerminalCommandTool, ShellTool, ThinkTool, TodoWriteTool, ToolRegistry, UpdateMemoryTool,
    WebFetchTool, WebSearchTool, WriteTool,
};

use jimi_core::{AgentRuntimeContext, Wire};

use crate::context::ToolSetProfile;
use crate::task_tool::TaskTool;

/// Build a [`ToolRegistry`] populated according to the given `profile`.
///
/// This is the single canonical place where tools are wired up. Adding a
/// new tool means adding it here once and it appears in every appropriate
/// profile automatically.
///
/// ### Shared-state parameters
///
/// * `tool_event_tx` — the sending half of the channel whose receiving end
///   is passed to `Agent::new()`. `TodoWriteTool` sends events here; the
///   agent drains them after each tool execution.
/// * `sub_agent_runtime` — inherited by `TaskTool` sub-agents (project root,
///   CI/git notes, AGENTS.md). Only used for the `Full` profile; pass
///   `AgentRuntimeContext::default()` otherwise.
pub fn build_tool_registry(
    cfg: &Config,
    model: Arc<dyn ModelProvider>,
    profile: ToolSetProfile,
    tool_event_tx: mpsc::Sender<ToolEvent>,
    sub_agent_runtime: AgentRuntimeContext,
    parent_wire: Arc<Wire>,
) -> ToolRegistry {
    match profile {
        ToolSetProfile::Full { todos, task_depth } => {
            let mut reg = ToolRegistry::new();

            reg.register(ReadFileTool);
            reg.register(ListDirTool);
            reg.register(GlobTool);
            reg.register(GrepTool);
            reg.register(WebFetchTool);
            reg.register(WebSearchTool {
                api_key: cfg.tools.web.search.api_key.clone(),
            });
            reg.register(ThinkTool);
            reg.register(UpdateMemoryTool { memory_file: None });
            reg.register(TodoWriteTool::new(todos, tool_event_tx));
            reg.register(WriteTool);
            reg.register(EditFileTool);
            reg.register(RunTerminalCommandTool {
                timeout_secs: cfg.tools.timeout_secs,
            });
            reg.register(ShellTool {
                timeout_secs: cfg.tools.timeout_secs,
            });
            reg.register(TaskTool::new(
                model,
                Arc::new(cfg.clone()),
                task_depth,
                sub_agent_runtime,
                parent_wire,
            ));

            reg
        }

        ToolSetProfile::SubAgent { todos } => {
            let mut reg = ToolRegistry::new();

            reg.register(ReadFileTool);
            reg.register(ListDirTool);
            reg.register(GlobTool);
            reg.register(GrepTool);
            reg.register(WebFetchTool);
            reg.register(WebSearchTool {
                api_key: cfg.tools.web.search.api_key.clone(),
            });
            reg.register(ThinkTool);
            reg.register(UpdateMemoryTool { memory_file: None });
            reg.register(TodoWriteTool::new(todos, tool_event_tx));
            reg.register(WriteTool);
            reg.register(EditFileTool);
            reg.register(RunTerminalCommandTool {
                timeout_secs: cfg.tools.timeout_secs,
            });
            reg.register(ShellTool {
                timeout_secs: cfg.tools.timeout_secs,
            });
            // TaskTool intentionally omitted to bound sub-agent nesting depth.

            reg
        }
    }
}

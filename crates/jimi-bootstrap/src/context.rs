// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Runtime context types for agent construction.
//!
//! [`RuntimeContext`] holds environment-detected information (project root,
//! git state, CI environment) that is not part of the config file schema.
//!
//! [`ToolSetProfile`] selects which tools to register, and carries the
//! shared state needed by stateful tools (todos, sub-agent nesting depth).

use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tokio::sync::Mutex;

use jimi_runtime::{CiContext, GitContext};
use jimi_tools::events::TodoItem;

// ─── RuntimeContext ───────────────────────────────────────────────────────────

/// Environment-detected context for an agent session.
///
/// This is separate from [`jimi_config::AgentConfig`] (which holds only
/// config-file fields) so that the two concerns — "what the user configured"
/// and "what we found at runtime" — stay cleanly separated.
#[derive(Default)]
pub struct RuntimeContext {
    /// Absolute path to the project root (detected from `.git` walk-up).
    pub project_root: Option<PathBuf>,
    /// Live git metadata (branch, commit, dirty state).
    pub git_context: Option<GitContext>,
    /// CI environment metadata.
    pub ci_context: Option<CiContext>,
    /// Contents of `AGENTS.md` (or similar), concatenated up the directory tree.
    pub project_context_file: Option<String>,
    /// Text appended after the default system prompt's Guidelines section.
    pub append_system_prompt: Option<String>,
    /// Full system prompt override.
    pub system_prompt_override: Option<String>,
}

impl RuntimeContext {
    /// Create with auto-detected project, git, and CI context.
    pub fn auto_detect() -> Self {
        let project_root = jimi_runtime::find_project_root().ok();
        let git_context = project_root
            .as_ref()
            .map(|r| jimi_runtime::collect_git_context(r));
        let ci_context = Some(jimi_runtime::detect_ci_context());
        let project_context_file = project_root
            .as_ref()
            .and_then(|r| jimi_runtime::load_project_context_file(r));

        Self {
            project_root,
            git_context,
            ci_context,
            project_context_file,
            append_system_prompt: None,
            system_prompt_override: None,
        }
    }

    /// Create an empty context (no project/git/CI detection).
    pub fn empty() -> Self {
        Self::default()
    }
}

// ─── ToolSetProfile ───────────────────────────────────────────────────────────

/// Selects which tool set to register and carries the caller-owned shared
/// state that stateful tools require.
///
/// The tool-event channel is intentionally **not** part of this enum —
/// `AgentBuilder::build()` creates it, wires it into the registry, and passes
/// the same receiver to `Agent::new()` so that `TodoWriteTool` events are
/// correctly observed by the agent loop.
pub enum ToolSetProfile {
    /// Full tool set, including `task` for sub-agent delegation.
    Full {
        todos: Arc<Mutex<Vec<TodoItem>>>,
        task_depth: Arc<AtomicUsize>,
    },

    /// Sub-agent tool set (Full minus `task`, to bound delegation depth).
    SubAgent {
        todos: Arc<Mutex<Vec<TodoItem>>>,
    },
}

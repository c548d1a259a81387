// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Runtime context for an agent session.
//!
//! This is separate from [`jimi_config::AgentConfig`], which holds only
//! config-file fields.  [`AgentRuntimeContext`] carries values detected or
//! specified at runtime (project root, git/CI context, prompt overrides,
//! discovered subagents).

use std::path::PathBuf;

use jimi_runtime::SharedAgents;

/// Environment-detected context injected into an agent at construction time.
#[derive(Debug, Default, Clone)]
pub struct AgentRuntimeContext {
    /// Absolute path to the project root (found via `.git` walk-up).
    pub project_root: Option<PathBuf>,
    /// Pre-formatted git context block (branch, commit, dirty status).
    pub git_context_note: Option<String>,
    /// Pre-formatted CI environment context block.
    pub ci_context_note: Option<String>,
    /// Contents of the project context file (`AGENTS.md`, concatenated up the
    /// directory tree).
    pub project_context_file: Option<String>,
    /// Text appended to the default system prompt (from the agent spec's
    /// `append_system_prompt` field).
    pub append_system_prompt: Option<String>,
    /// Full system prompt override (from the agent spec's `system_prompt` field).
    /// When set, replaces the default system prompt entirely.
    pub system_prompt_override: Option<String>,
    /// Subagents discovered from the standard search hierarchy.
    ///
    /// Held as [`SharedAgents`] so a live refresh updates both the resolved
    /// agent spec's `sub_agents` table and the next agent turn's system
    /// prompt without restarting the engine.
    pub agents: SharedAgents,
}

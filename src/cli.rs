// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Thin CLI argument surface.
//!
//! Mirrors the boundary the engine expects: work-dir, continue-flag,
//! model-id, yolo-flag, agent-file, mcp-config-file[], command-text. This
//! module only parses arguments — `main.rs` makes the one call into the
//! engine; no engine logic belongs here.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "jimi",
    about = "An interactive LLM-driven coding agent engine",
    version,
    long_about = None,
)]
pub struct Cli {
    /// Working directory for the agent session (default: current directory)
    #[arg(long, short = 'C', value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Continue the most recent session in this working directory
    #[arg(long)]
    pub r#continue: bool,

    /// Model identifier, e.g. "anthropic/claude-opus-4-5"
    #[arg(long, short = 'm', env = "JIMI_MODEL", value_name = "ID")]
    pub model_id: Option<String>,

    /// Auto-approve every tool call, bypassing the approval arbiter
    #[arg(long)]
    pub yolo: bool,

    /// Path to an agent spec YAML file (resolved with its `extend:` chain)
    #[arg(long, value_name = "PATH")]
    pub agent_file: Option<PathBuf>,

    /// MCP server config file to import tools from. May be repeated.
    #[arg(long = "mcp-config", value_name = "PATH")]
    pub mcp_config_file: Vec<PathBuf>,

    /// Increase log verbosity (-v = debug, -vv = trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Initial command/task text. Omit to read from stdin when piped.
    #[arg(value_name = "COMMAND")]
    pub command_text: Option<String>,
}

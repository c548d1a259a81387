// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;

use std::io::{self, Read};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::Cli;
use jimi_bootstrap::{AgentBuilder, RuntimeContext, ToolSetProfile};
use jimi_config::Config;
use jimi_core::AgentEvent;
use jimi_model::ScriptedMockProvider;
use tokio::sync::{mpsc, Mutex};

/// Default config file name looked up in the working directory.
const CONFIG_FILE_NAME: &str = ".jimi.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(dir) = &cli.work_dir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("changing to work dir {}", dir.display()))?;
    }

    let config = Arc::new(load_config()?);

    let runtime_ctx = RuntimeContext::auto_detect();

    if !cli.mcp_config_file.is_empty() {
        for path in &cli.mcp_config_file {
            tracing::warn!(
                path = %path.display(),
                "MCP tool import is not wired into this build yet; ignoring --mcp-config"
            );
        }
    }

    if cli.r#continue {
        tracing::warn!("--continue is not yet supported (session persistence pending); starting a fresh session");
    }

    let command_text = match cli.command_text {
        Some(t) => t,
        None => read_stdin_if_piped()?,
    };

    if command_text.is_empty() {
        anyhow::bail!("no command text given; pass it as an argument or pipe it on stdin");
    }

    let resolved_agent = match &cli.agent_file {
        Some(path) => Some(
            jimi_config::load_agent_spec(path)
                .with_context(|| format!("resolving agent spec {}", path.display()))?,
        ),
        None => None,
    };

    let mut agent_config = (*config).clone();
    if let Some(spec) = &resolved_agent {
        if let Some(path) = &spec.system_prompt_path {
            let template = std::fs::read_to_string(path)
                .with_context(|| format!("reading system prompt {}", path.display()))?;
            agent_config.agent.system_prompt = Some(jimi_config::interpolate(
                &template,
                &spec.system_prompt_args,
            ));
        }
    }
    if cli.yolo {
        agent_config.tools.auto_approve_patterns.push("*".into());
    }

    let todos = Arc::new(Mutex::new(Vec::new()));
    let task_depth = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let profile = ToolSetProfile::Full { todos, task_depth };

    // Concrete `ChatProvider` HTTP implementations are an external
    // collaborator (out of scope for this engine). Embedding applications
    // hand `AgentBuilder::build` their own `Arc<dyn ModelProvider>`; this
    // standalone binary falls back to a scripted echo provider so the
    // wiring can be smoke-tested without network access.
    let model_name = cli.model_id.unwrap_or_else(|| "mock/echo".to_string());
    let model: Arc<dyn jimi_model::ModelProvider> = Arc::new(
        ScriptedMockProvider::always_text(format!(
            "(no ChatProvider configured for model '{model_name}'; echoing) {command_text}"
        )),
    );

    let mut agent = AgentBuilder::new(Arc::new(agent_config))
        .with_runtime_context(runtime_ctx)
        .with_yolo(cli.yolo)
        .build(model, profile);

    let (tx, mut rx) = mpsc::channel::<AgentEvent>(256);
    let submit = tokio::spawn(async move { agent.submit(&command_text, tx).await });

    while let Some(event) = rx.recv().await {
        match event {
            AgentEvent::TextDelta(delta) => print!("{delta}"),
            AgentEvent::ToolCallStarted(call) => {
                eprintln!("[tool] {} {}", call.name, call.args)
            }
            AgentEvent::ToolCallFinished {
                tool_name,
                is_error,
                ..
            } => {
                if is_error {
                    eprintln!("[tool] {tool_name} failed");
                }
            }
            AgentEvent::Error(msg) => eprintln!("[error] {msg}"),
            AgentEvent::TurnComplete => println!(),
            _ => {}
        }
    }

    submit.await.context("agent task panicked")?
}

/// Load `.jimi.yaml` from the current directory if present, falling back to
/// defaults. This is a single fixed-location convenience read, not a
/// generic multi-location config-file search (that search is out of scope).
fn load_config() -> anyhow::Result<Config> {
    match std::fs::read_to_string(CONFIG_FILE_NAME) {
        Ok(text) => serde_yaml::from_str(&text)
            .with_context(|| format!("parsing {CONFIG_FILE_NAME}")),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e).with_context(|| format!("reading {CONFIG_FILE_NAME}")),
    }
}

fn read_stdin_if_piped() -> anyhow::Result<String> {
    if is_stdin_tty() {
        return Ok(String::new());
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf).context("reading stdin")?;
    Ok(buf.trim().to_string())
}

fn is_stdin_tty() -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        unsafe { libc::isatty(io::stdin().as_raw_fd()) != 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

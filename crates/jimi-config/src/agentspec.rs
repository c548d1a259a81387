// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Agent Loader — YAML agent-spec resolution with `extend:` inheritance and
//! `${NAME}` system-prompt template interpolation.
//!
//! This is deliberately narrow: it resolves exactly one YAML shape (an agent
//! spec plus its `subagents:` table), not a generic application config. See
//! [`crate::schema`] for the separate, much smaller tuning-knob types the
//! engine reads (`AgentConfig`, `ToolsConfig`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::Local;
use serde::Deserialize;

/// On-disk shape of an agent spec file.
#[derive(Debug, Clone, Deserialize)]
struct AgentSpecFile {
    #[allow(dead_code)]
    version: u32,
    agent: RawAgent,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawAgent {
    extend: Option<String>,
    name: Option<String>,
    system_prompt_path: Option<String>,
    #[serde(default)]
    system_prompt_args: HashMap<String, String>,
    tools: Option<Vec<String>>,
    #[serde(default)]
    exclude_tools: Vec<String>,
    #[serde(default)]
    subagents: HashMap<String, SubAgentRef>,
}

#[derive(Debug, Clone, Deserialize)]
struct SubAgentRef {
    path: String,
    #[allow(dead_code)]
    description: Option<String>,
}

/// A fully resolved agent spec: `extend` chains collapsed, `exclude_tools`
/// already subtracted, subagent table recursively resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedAgentSpec {
    pub name: String,
    pub system_prompt_path: Option<PathBuf>,
    pub system_prompt_args: HashMap<String, String>,
    /// Final allowed tool names, in declaration order, with `exclude_tools`
    /// already removed.
    pub tools: Vec<String>,
    pub subagents: HashMap<String, ResolvedAgentSpec>,
}

/// Load and resolve the agent spec at `path`, following any `extend:` chain.
pub fn load_agent_spec(path: &Path) -> anyhow::Result<ResolvedAgentSpec> {
    let mut visited = Vec::new();
    resolve(path, &mut visited)
}

fn resolve(path: &Path, visited: &mut Vec<PathBuf>) -> anyhow::Result<ResolvedAgentSpec> {
    let canon = path
        .canonicalize()
        .with_context(|| format!("resolving agent spec path {}", path.display()))?;
    if visited.contains(&canon) {
        bail!(
            "agent spec extend cycle detected: {} already visited",
            canon.display()
        );
    }
    visited.push(canon.clone());

    let text = std::fs::read_to_string(&canon)
        .with_context(|| format!("reading agent spec {}", canon.display()))?;
    let file: AgentSpecFile = serde_yaml::from_str(&text)
        .with_context(|| format!("parsing agent spec {}", canon.display()))?;

    let base = match &file.agent.extend {
        Some(parent_rel) => {
            let parent_path = canon
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(parent_rel);
            Some(resolve(&parent_path, visited)?)
        }
        None => None,
    };

    let raw = file.agent;
    let spec_dir = canon.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();

    let name = raw.name.or_else(|| base.as_ref().map(|b| b.name.clone())).unwrap_or_default();

    let system_prompt_path = raw
        .system_prompt_path
        .map(|p| spec_dir.join(p))
        .or_else(|| base.as_ref().and_then(|b| b.system_prompt_path.clone()));

    // Scalars: child overrides. Maps: deep-merged, child wins per key.
    let mut system_prompt_args = base
        .as_ref()
        .map(|b| b.system_prompt_args.clone())
        .unwrap_or_default();
    system_prompt_args.extend(raw.system_prompt_args);

    // Lists of tool names are replaced wholesale, never concatenated.
    let tools_before_exclude = raw
        .tools
        .unwrap_or_else(|| base.as_ref().map(|b| b.tools.clone()).unwrap_or_default());

    // Subagent tables are merged key-wise, child precedence.
    let mut subagents = base.as_ref().map(|b| b.subagents.clone()).unwrap_or_default();
    for (sub_name, sub_ref) in raw.subagents {
        let sub_path = spec_dir.join(&sub_ref.path);
        let resolved_sub = resolve(&sub_path, visited)?;
        subagents.insert(sub_name, resolved_sub);
    }

    // exclude_tools is applied last, after extend merge and tool-list
    // replacement, to the final tool list — order preserved from the
    // surviving source list.
    let tools = tools_before_exclude
        .into_iter()
        .filter(|t| !raw.exclude_tools.contains(t))
        .collect();

    visited.pop();

    Ok(ResolvedAgentSpec {
        name,
        system_prompt_path,
        system_prompt_args,
        tools,
        subagents,
    })
}

/// Built-in template parameters available to every system prompt, named to
/// match the engine's external interface (`${KIMI_NOW}`, etc).
pub fn builtin_template_params(work_dir: &Path) -> HashMap<String, String> {
    let mut params = HashMap::new();
    params.insert("KIMI_NOW".into(), Local::now().to_rfc3339());
    params.insert("KIMI_WORK_DIR".into(), work_dir.display().to_string());
    params.insert("KIMI_WORK_DIR_LS".into(), shallow_dir_listing(work_dir));
    params.insert("KIMI_AGENTS_MD".into(), collect_agents_md(work_dir));
    params
}

fn shallow_dir_listing(dir: &Path) -> String {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return String::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names.join("\n")
}

/// Concatenate every `AGENTS.md` found walking up from `dir` to the
/// filesystem root, closest file first.
fn collect_agents_md(dir: &Path) -> String {
    let mut found = Vec::new();
    let mut current = Some(dir);
    while let Some(d) = current {
        let candidate = d.join("AGENTS.md");
        if let Ok(text) = std::fs::read_to_string(&candidate) {
            found.push(text);
        }
        current = d.parent();
    }
    found.join("\n\n---\n\n")
}

/// Substitute `${NAME}` placeholders in `template` using `params`.
/// Unresolved placeholders are left as-is, per contract.
pub fn interpolate(template: &str, params: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            if let Some(end) = template[i + 2..].find('}') {
                let name = &template[i + 2..i + 2 + end];
                match params.get(name) {
                    Some(value) => {
                        out.push_str(value);
                        i += 2 + end + 1;
                        continue;
                    }
                    None => {
                        out.push_str(&template[i..i + 2 + end + 1]);
                        i += 2 + end + 1;
                        continue;
                    }
                }
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::policy::ApprovalPolicy;
use crate::tool::{Tool, ToolCall, ToolOutput};

/// Records model rationale without touching the world. Useful for working
/// through a plan before acting, especially across several tool calls whose
/// results need to be weighed against each other.
pub struct ThinkTool;

#[async_trait]
impl Tool for ThinkTool {
    fn name(&self) -> &str { "think" }

    fn description(&self) -> &str {
        "Use this tool to reason through a problem before acting, or to weigh \
         several tool results against each other. Nothing is executed and \
         nothing is returned to you beyond an empty acknowledgement — the value \
         is in writing the thought down, not in the tool's output."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "thought": {
                    "type": "string",
                    "description": "The reasoning to record"
                }
            },
            "required": ["thought"],
            "additionalProperties": false
        })
    }

    fn default_policy(&self) -> ApprovalPolicy { ApprovalPolicy::Auto }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        if call.args.get("thought").and_then(|v| v.as_str()).is_none() {
            return ToolOutput::err(&call.id, "missing 'thought'");
        }
        ToolOutput::ok(&call.id, "")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::tool::{Tool, ToolCall};

    fn call(args: serde_json::Value) -> ToolCall {
        ToolCall { id: "th1".into(), name: "think".into(), args }
    }

    #[tokio::test]
    async fn produces_empty_output() {
        let out = ThinkTool.execute(&call(json!({"thought": "weighing two approaches"}))).await;
        assert!(!out.is_error);
        assert_eq!(out.content, "");
    }

    #[tokio::test]
    async fn missing_thought_is_error() {
        let out = ThinkTool.execute(&call(json!({}))).await;
        assert!(out.is_error);
    }

    #[test]
    fn never_requires_approval() {
        assert_eq!(ThinkTool.default_policy(), ApprovalPolicy::Auto);
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
mod agentspec;
mod schema;

pub use agentspec::{builtin_template_params, interpolate, load_agent_spec, ResolvedAgentSpec};
pub use schema::*;

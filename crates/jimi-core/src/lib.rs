// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod agent;
mod approval;
mod compact;
mod events;
mod prompts;
mod runtime_context;
mod session;
mod wire;

pub use agent::Agent;
pub use approval::{ApprovalArbiter, Rejection};
pub use compact::{
    compact_session, compact_session_with_strategy, emergency_compact, smart_truncate,
};
pub use events::{AgentEvent, CompactionStrategyUsed};
pub use prompts::system_prompt;
pub use runtime_context::AgentRuntimeContext;
pub use session::{Session, TurnRecord};
pub use wire::{ApprovalResponse, ApprovalSink, Wire, WireEvent};

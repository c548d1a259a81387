// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use jimi_model::Message;
use uuid::Uuid;

/// One saved turn in the conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub role: String,
    pub content: String,
}

/// In-memory conversation session.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub messages: Vec<Message>,
    /// Approximate total token count for the current message list
    pub token_count: usize,
    /// Maximum context tokens (set from model config / provider limits)
    pub max_tokens: usize,
    /// Maximum output tokens reserved for the model's reply (from the
    /// provider catalog). Subtracted from `max_tokens` to get the usable
    /// input budget.
    pub max_output_tokens: usize,
    /// Running total of prompt-cache-read tokens across the whole session.
    pub cache_read_total: u64,
    /// Running total of prompt-cache-write tokens across the whole session.
    pub cache_write_total: u64,
    /// Correction factor applied to the chars/4 token estimate, continuously
    /// refined from the provider's actual reported input token counts.
    pub calibration_factor: f32,
    /// Estimated tokens for content sent with every request but not tracked
    /// in `messages` (tool schemas, dynamic context block).
    pub schema_overhead: usize,
}

impl Session {
    pub fn new(max_tokens: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            messages: Vec::new(),
            token_count: 0,
            max_tokens,
            max_output_tokens: 0,
            cache_read_total: 0,
            cache_write_total: 0,
            calibration_factor: 1.0,
            schema_overhead: 0,
        }
    }

    /// Usable input budget: the context window minus the tokens reserved for
    /// the model's own reply. Zero when no context window is configured.
    pub fn input_budget(&self) -> usize {
        self.max_tokens.saturating_sub(self.max_output_tokens)
    }

    /// Record prompt-cache usage reported by the provider for the turn.
    pub fn add_cache_usage(&mut self, read_tokens: u32, write_tokens: u32) {
        self.cache_read_total += read_tokens as u64;
        self.cache_write_total += write_tokens as u64;
    }

    /// Refine the calibration factor from the provider's actual input token
    /// count vs. our chars/4 estimate, using an exponential moving average so
    /// a single noisy turn cannot swing the factor too far.
    pub fn update_calibration(&mut self, actual_input: u32, estimated: usize) {
        if estimated == 0 {
            return;
        }
        let observed = actual_input as f32 / estimated as f32;
        self.calibration_factor = self.calibration_factor * 0.7 + observed * 0.3;
    }

    pub fn push(&mut self, msg: Message) {
        self.token_count += msg.approx_tokens();
        self.messages.push(msg);
    }

    pub fn push_many(&mut self, msgs: impl IntoIterator<Item = Message>) {
        for m in msgs { self.push(m); }
    }

    /// Fraction of context window consumed (0.0–1.0)
    pub fn context_fraction(&self) -> f32 {
        if self.max_tokens == 0 { return 0.0; }
        (self.token_count as f32) / (self.max_tokens as f32)
    }

    pub fn is_near_limit(&self, threshold: f32) -> bool {
        self.context_fraction() >= threshold
    }

    /// Recalculate token count from scratch (call after compaction).
    pub fn recalculate_tokens(&mut self) {
        self.token_count = self.messages.iter().map(|m| m.approx_tokens()).sum();
    }

    /// Replace the message list and recalculate token count (for resubmit / edit).
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.recalculate_tokens();
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

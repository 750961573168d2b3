//! Typed lifecycle event definitions.
//!
//! This module defines the closed set of lifecycle events the host publishes
//! to extension handlers, plus their JSON-serializable payloads. The set is
//! fixed by the host; extensions cannot add to it, and an unknown event name
//! is unrepresentable by construction.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events that can be published to extension handlers.
///
/// The serialized representation is tagged with `type` in `snake_case`,
/// matching the string event name extensions subscribe to (e.g.
/// `"tool_result"`). Payload fields serialize in `camelCase`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Before the first API call in a run. Mutating: handlers may return
    /// `{ systemPromptAppend }`.
    #[serde(rename_all = "camelCase")]
    BeforeAgentStart { session_id: String },

    /// After the agent loop ends. Observational.
    #[serde(rename_all = "camelCase")]
    AgentEnd {
        session_id: String,
        error: Option<String>,
    },

    /// After a tool execution completes. Observational.
    #[serde(rename_all = "camelCase")]
    ToolResult {
        tool_name: String,
        input: Value,
        is_error: bool,
        output: Value,
    },
}

impl LifecycleEvent {
    /// Get the event name for dispatch.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        self.kind().event_name()
    }

    /// The subscription key for this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::BeforeAgentStart { .. } => EventKind::BeforeAgentStart,
            Self::AgentEnd { .. } => EventKind::AgentEnd,
            Self::ToolResult { .. } => EventKind::ToolResult,
        }
    }
}

/// Discriminant for [`LifecycleEvent`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    BeforeAgentStart,
    AgentEnd,
    ToolResult,
}

impl EventKind {
    /// All recognized lifecycle events, in lifecycle order.
    pub const ALL: [Self; 3] = [Self::BeforeAgentStart, Self::AgentEnd, Self::ToolResult];

    #[must_use]
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::BeforeAgentStart => "before_agent_start",
            Self::AgentEnd => "agent_end",
            Self::ToolResult => "tool_result",
        }
    }

    /// Whether handler results are collected and fed back into the agent
    /// loop ("fire-and-collect") rather than discarded ("fire-and-observe").
    #[must_use]
    pub const fn is_mutating(self) -> bool {
        matches!(self, Self::BeforeAgentStart)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.event_name())
    }
}

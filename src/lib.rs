//! exthost - extension/hook host for an interactive coding agent.
//!
//! Independently written extensions observe and influence one agent
//! session's lifecycle through this crate:
//! - [`bus::EventBus`]: typed publish/subscribe over a closed set of
//!   lifecycle events, with handler isolation as the central guarantee
//! - [`aggregate`]: merges the optional results of mutating-event handlers
//!   into the single mutation the agent loop applies
//! - [`commands::CommandRegistry`]: user-invocable commands, dispatched by
//!   the UI front end
//! - [`host::ExtensionHost`]: discovers and loads extensions, owns the bus,
//!   registry and notification channel for one process
//!
//! The agent's own reasoning/tool loop and the UI rendering are external
//! collaborators consumed through these interfaces.

#![forbid(unsafe_code)]
#![allow(
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions
)]

pub mod aggregate;
pub mod bus;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod notify;

pub use aggregate::AgentStartMutation;
pub use bus::{EventBus, HandlerOutput, SubscriptionHandle};
pub use commands::{CommandContext, CommandMeta, CommandRegistry};
pub use config::HostConfig;
pub use error::{Error, Result};
pub use events::{EventKind, LifecycleEvent};
pub use host::{
    discover_extensions, DiscoveredExtension, EntryFn, ExtensionApi, ExtensionHost,
    ExtensionSource, LoadedExtensionSet,
};
pub use notify::{MemoryNotifier, Notifier, Severity, TracingNotifier};

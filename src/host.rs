//! Extension loader and host wiring.
//!
//! [`ExtensionHost`] owns the event bus, command registry and notification
//! channel for one agent process. It is constructed explicitly and passed by
//! reference, never an ambient singleton, so multiple sessions (e.g. in
//! tests) run in isolation.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::aggregate::{aggregate_before_agent_start, AgentStartMutation};
use crate::bus::{boxed_handler, EventBus, SubscriptionHandle};
use crate::commands::{
    boxed_command, CommandContext, CommandDescriptor, CommandMeta, CommandRegistry,
};
use crate::config::HostConfig;
use crate::error::{Error, Result};
use crate::events::{EventKind, LifecycleEvent};
use crate::notify::{Notifier, Severity};

/// An extension's entry function: called exactly once per process with a
/// fresh capability object, during the synchronous setup phase.
pub type EntryFn = Box<dyn FnOnce(&mut ExtensionApi<'_>) -> Result<()> + Send>;

/// One extension ready to load.
pub struct ExtensionSource {
    pub name: String,
    pub entry: EntryFn,
}

impl ExtensionSource {
    pub fn new(name: impl Into<String>, entry: EntryFn) -> Self {
        Self {
            name: name.into(),
            entry,
        }
    }
}

/// An extension module found in a configured location, not yet instantiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredExtension {
    pub name: String,
    pub path: PathBuf,
}

/// Outcome of one load pass. A failed extension never blocks the rest of
/// the load sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedExtensionSet {
    pub loaded: Vec<String>,
    /// Extension name and failure message, in load order.
    pub failed: Vec<(String, String)>,
}

/// Capability object handed to an extension's entry function.
///
/// The surface is a fixed method set scoped to one extension: subscribe to
/// lifecycle events, register commands. Registration-phase warnings are
/// flushed as notifications after the entry function returns.
pub struct ExtensionApi<'a> {
    extension: String,
    bus: &'a EventBus,
    commands: &'a CommandRegistry,
    notices: Vec<(Severity, String)>,
}

impl ExtensionApi<'_> {
    /// Subscribe a handler to one lifecycle event.
    ///
    /// For mutating events the handler may return `Ok(Some(result))`; for
    /// observational events any returned value is ignored.
    pub fn on<F, Fut>(&mut self, kind: EventKind, handler: F) -> SubscriptionHandle
    where
        F: Fn(LifecycleEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
    {
        self.bus
            .subscribe(kind, self.extension.clone(), boxed_handler(handler))
    }

    /// Register a user-invocable command.
    ///
    /// Last registration for a name wins; a collision is a configuration
    /// smell reported as a warning, not a hard error.
    pub fn register_command<F, Fut>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) where
        F: Fn(String, CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        let displaced = self.commands.register(CommandDescriptor {
            name: name.clone(),
            description: description.into(),
            extension: self.extension.clone(),
            handler: boxed_command(handler),
        });
        if let Some(displaced) = displaced {
            self.notices.push((
                Severity::Warning,
                format!(
                    "Command '{name}' re-registered by extension {}; was owned by {}",
                    self.extension, displaced.extension
                ),
            ));
        }
    }

    /// The extension id this capability object is scoped to.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

/// Event bus, command registry and notification channel for one agent
/// process.
pub struct ExtensionHost {
    bus: EventBus,
    commands: CommandRegistry,
    notifier: Arc<dyn Notifier>,
    config: HostConfig,
}

impl ExtensionHost {
    #[must_use]
    pub fn new(config: HostConfig, notifier: Arc<dyn Notifier>) -> Self {
        let bus = EventBus::new(Arc::clone(&notifier), config.handler_timeout());
        Self {
            bus,
            commands: CommandRegistry::new(),
            notifier,
            config,
        }
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Registered commands for the UI's command palette.
    #[must_use]
    pub fn commands(&self) -> Vec<CommandMeta> {
        self.commands.list()
    }

    /// Load extensions in order, calling each entry function exactly once
    /// with a fresh capability object.
    ///
    /// An entry that fails is isolated: its failure is reported at error
    /// level and the remaining extensions still load.
    pub async fn load(&self, sources: Vec<ExtensionSource>) -> LoadedExtensionSet {
        let mut set = LoadedExtensionSet::default();
        for source in sources {
            let mut api = ExtensionApi {
                extension: source.name.clone(),
                bus: &self.bus,
                commands: &self.commands,
                notices: Vec::new(),
            };
            let outcome = (source.entry)(&mut api);
            let notices = std::mem::take(&mut api.notices);
            for (severity, message) in notices {
                tracing::warn!(extension = %source.name, "{message}");
                self.notifier.notify(severity, &message).await;
            }
            match outcome {
                Ok(()) => {
                    tracing::debug!(extension = %source.name, "Extension loaded");
                    set.loaded.push(source.name);
                }
                Err(err) => {
                    let report = Error::load(&source.name, err.to_string());
                    tracing::warn!(extension = %source.name, error = %report, "Extension failed to load");
                    self.notifier
                        .notify(Severity::Error, &report.to_string())
                        .await;
                    set.failed.push((source.name, err.to_string()));
                }
            }
        }
        set
    }

    /// Load discovered extension modules through an embedder-supplied
    /// resolver that turns a module path into an entry function.
    ///
    /// A resolver failure is a load failure for that extension only.
    pub async fn load_discovered<R>(
        &self,
        discovered: Vec<DiscoveredExtension>,
        mut resolve: R,
    ) -> LoadedExtensionSet
    where
        R: FnMut(&DiscoveredExtension) -> Result<EntryFn>,
    {
        let mut set = LoadedExtensionSet::default();
        for module in discovered {
            match resolve(&module) {
                Ok(entry) => {
                    let one = self.load(vec![ExtensionSource::new(&module.name, entry)]).await;
                    set.loaded.extend(one.loaded);
                    set.failed.extend(one.failed);
                }
                Err(err) => {
                    let report = Error::load(&module.name, err.to_string());
                    tracing::warn!(
                        extension = %module.name,
                        path = %module.path.display(),
                        error = %report,
                        "Extension failed to resolve"
                    );
                    self.notifier
                        .notify(Severity::Error, &report.to_string())
                        .await;
                    set.failed.push((module.name, err.to_string()));
                }
            }
        }
        set
    }

    /// Publish `before_agent_start` and merge handler results.
    ///
    /// Dropped result fields are reported as warnings; the merged mutation
    /// is what the agent loop applies before the run.
    pub async fn run_before_agent_start(&self, session_id: &str) -> AgentStartMutation {
        let event = LifecycleEvent::BeforeAgentStart {
            session_id: session_id.to_string(),
        };
        let outputs = self.bus.publish(&event).await;
        let (mutation, warnings) = aggregate_before_agent_start(&outputs);
        for warning in warnings {
            let message = warning.to_string();
            tracing::warn!(event = %EventKind::BeforeAgentStart, "{message}");
            self.notifier.notify(Severity::Warning, &message).await;
        }
        mutation
    }

    /// Publish `agent_end`. Fire-and-observe: handler results are ignored;
    /// detached work a handler spawned is not waited on.
    pub async fn run_agent_end(&self, session_id: &str, error: Option<String>) {
        let event = LifecycleEvent::AgentEnd {
            session_id: session_id.to_string(),
            error,
        };
        let _ = self.bus.publish(&event).await;
    }

    /// Publish `tool_result`. Fire-and-observe.
    pub async fn run_tool_result(
        &self,
        tool_name: &str,
        input: Value,
        is_error: bool,
        output: Value,
    ) {
        let event = LifecycleEvent::ToolResult {
            tool_name: tool_name.to_string(),
            input,
            is_error,
            output,
        };
        let _ = self.bus.publish(&event).await;
    }

    /// Dispatch a user-invoked command through the registry.
    ///
    /// Called by the UI/CLI front end on user input; may run concurrently
    /// with an active agent turn. Fails with [`Error::CommandNotFound`] for
    /// an unregistered name.
    pub async fn invoke_command(&self, name: &str, args: impl Into<String>) -> Result<()> {
        let ctx = CommandContext {
            ui: Arc::clone(&self.notifier),
        };
        self.commands.invoke(name, args.into(), ctx).await
    }
}

/// Scan configured locations for extension modules.
///
/// Locations are visited in the given order (global user directory first,
/// then project-local); within one location entries sort lexicographically
/// by relative path, so load order is deterministic across runs. Hidden
/// files and well-known junk directories are skipped. Missing locations are
/// not an error.
pub fn discover_extensions(locations: &[PathBuf]) -> Result<Vec<DiscoveredExtension>> {
    let mut discovered = Vec::new();
    for location in locations {
        if !location.exists() {
            continue;
        }
        let mut entries = Vec::new();
        collect_module_files(location, &mut entries)?;
        entries.sort_by_key(|path| relative_posix(location, path));
        discovered.extend(entries.into_iter().map(|path| DiscoveredExtension {
            name: module_name(&path),
            path,
        }));
    }
    Ok(discovered)
}

fn collect_module_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();
        if is_hidden(&path) {
            continue;
        }
        if file_type.is_dir() {
            if should_ignore_dir(&path) {
                continue;
            }
            collect_module_files(&path, out)?;
        } else if file_type.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

fn should_ignore_dir(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    matches!(name, "node_modules" | "target" | "dist")
}

fn module_name(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| path.display().to_string(), |stem| stem.to_string_lossy().into_owned())
}

fn relative_posix(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

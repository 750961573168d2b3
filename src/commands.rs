//! Command registry: maps user-invocable command names to handlers.
//!
//! Commands are registered by extensions during their setup phase and
//! invoked from a UI/command-line front end outside this crate. A command
//! handler failure is reported through the notification channel and never
//! crashes the invoking surface.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use crate::error::{Error, Result};
use crate::notify::{Notifier, Severity};

/// Future returned by a command handler.
pub type CommandFuture = BoxFuture<'static, Result<()>>;

/// Handler invoked with the raw argument string and an invocation context.
pub type CommandHandler = Arc<dyn Fn(String, CommandContext) -> CommandFuture + Send + Sync>;

/// Wrap an async closure into the boxed [`CommandHandler`] shape.
pub fn boxed_command<F, Fut>(handler: F) -> CommandHandler
where
    F: Fn(String, CommandContext) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |args, ctx| -> CommandFuture { Box::pin(handler(args, ctx)) })
}

/// Context passed to a command handler.
///
/// Exposes the notification channel; any mutable per-extension state is
/// whatever the handler closed over at registration time.
#[derive(Clone)]
pub struct CommandContext {
    /// Operator-visible feedback sink.
    pub ui: Arc<dyn Notifier>,
}

/// A registered command.
#[derive(Clone)]
pub struct CommandDescriptor {
    pub name: String,
    pub description: String,
    /// Extension that registered the command.
    pub extension: String,
    pub handler: CommandHandler,
}

/// Name, description and owner of a registered command, without the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMeta {
    pub name: String,
    pub description: String,
    pub extension: String,
}

impl CommandDescriptor {
    fn meta(&self) -> CommandMeta {
        CommandMeta {
            name: self.name.clone(),
            description: self.description.clone(),
            extension: self.extension.clone(),
        }
    }
}

/// Registry of user-invocable commands, unique by name.
///
/// Mutated during the synchronous load phase and read-only afterwards; the
/// mutex is held only across registration and lookup.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Mutex<HashMap<String, CommandDescriptor>>,
}

impl CommandRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. The last registration for a name wins; the
    /// displaced command is returned so the caller can warn about the
    /// collision (extensions are independent and may collide).
    pub fn register(&self, descriptor: CommandDescriptor) -> Option<CommandMeta> {
        let mut commands = self
            .commands
            .lock()
            .expect("command registry lock poisoned");
        commands
            .insert(descriptor.name.clone(), descriptor)
            .map(|displaced| displaced.meta())
    }

    /// Invoke a registered command.
    ///
    /// An unregistered name fails with [`Error::CommandNotFound`] and
    /// performs no side effect; the invoking surface decides what to show.
    /// A handler failure is caught here, reported at error level through
    /// the context's notifier, and does not propagate.
    pub async fn invoke(&self, name: &str, args: String, ctx: CommandContext) -> Result<()> {
        let descriptor = {
            let commands = self
                .commands
                .lock()
                .expect("command registry lock poisoned");
            commands.get(name).cloned()
        };
        let Some(descriptor) = descriptor else {
            return Err(Error::command_not_found(name));
        };

        let ui = Arc::clone(&ctx.ui);
        if let Err(err) = (descriptor.handler)(args, ctx).await {
            let report = Error::command_handler(&descriptor.name, err.to_string());
            tracing::warn!(
                command = %descriptor.name,
                extension = %descriptor.extension,
                error = %report,
                "Command handler failed"
            );
            ui.notify(Severity::Error, &report.to_string()).await;
        }
        Ok(())
    }

    /// Registered commands, sorted by name for the UI's command palette.
    #[must_use]
    pub fn list(&self) -> Vec<CommandMeta> {
        let commands = self
            .commands
            .lock()
            .expect("command registry lock poisoned");
        let mut metas: Vec<CommandMeta> = commands.values().map(CommandDescriptor::meta).collect();
        metas.sort_by(|a, b| a.name.cmp(&b.name));
        metas
    }

    /// Whether a command is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.commands
            .lock()
            .expect("command registry lock poisoned")
            .contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::notify::MemoryNotifier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_command(name: &str, extension: &str, hits: Arc<AtomicUsize>) -> CommandDescriptor {
        CommandDescriptor {
            name: name.to_string(),
            description: format!("test command {name}"),
            extension: extension.to_string(),
            handler: boxed_command(move |_args, _ctx| {
                let hits = Arc::clone(&hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        }
    }

    fn ctx(sink: &Arc<MemoryNotifier>) -> CommandContext {
        CommandContext {
            ui: Arc::clone(sink) as Arc<dyn Notifier>,
        }
    }

    #[tokio::test]
    async fn invoke_runs_the_registered_handler() {
        let registry = CommandRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        registry.register(counting_command("pirate", "pirate-ext", Arc::clone(&hits)));

        let sink = Arc::new(MemoryNotifier::new());
        registry
            .invoke("pirate", String::new(), ctx(&sink))
            .await
            .expect("invoke");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn unknown_command_fails_without_side_effect() {
        let registry = CommandRegistry::new();
        let sink = Arc::new(MemoryNotifier::new());

        let result = registry
            .invoke("nonexistent", String::new(), ctx(&sink))
            .await;
        assert!(matches!(
            result,
            Err(Error::CommandNotFound { name }) if name == "nonexistent"
        ));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn last_registration_wins_and_displaced_is_returned() {
        let registry = CommandRegistry::new();
        let first_hits = Arc::new(AtomicUsize::new(0));
        let second_hits = Arc::new(AtomicUsize::new(0));

        let displaced = registry.register(counting_command("x", "ext-a", Arc::clone(&first_hits)));
        assert!(displaced.is_none());

        let displaced = registry.register(counting_command("x", "ext-b", Arc::clone(&second_hits)));
        let displaced = displaced.expect("collision reported");
        assert_eq!(displaced.extension, "ext-a");

        let sink = Arc::new(MemoryNotifier::new());
        registry
            .invoke("x", String::new(), ctx(&sink))
            .await
            .expect("invoke");
        assert_eq!(first_hits.load(Ordering::SeqCst), 0);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
        assert_eq!(registry.list().len(), 1);
    }

    #[tokio::test]
    async fn handler_error_is_reported_not_propagated() {
        let registry = CommandRegistry::new();
        registry.register(CommandDescriptor {
            name: "broken".to_string(),
            description: "always fails".to_string(),
            extension: "flaky".to_string(),
            handler: boxed_command(|_args, _ctx| async { Err(Error::config("bad state")) }),
        });

        let sink = Arc::new(MemoryNotifier::new());
        let result = registry.invoke("broken", String::new(), ctx(&sink)).await;
        assert!(result.is_ok());

        let errors = sink.at(Severity::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("broken"), "report: {}", errors[0]);
    }

    #[tokio::test]
    async fn handler_sees_the_argument_string_and_context() {
        let registry = CommandRegistry::new();
        registry.register(CommandDescriptor {
            name: "echo".to_string(),
            description: "echo args".to_string(),
            extension: "demo".to_string(),
            handler: boxed_command(|args, ctx| async move {
                ctx.ui.notify(Severity::Info, &format!("args: {args}")).await;
                Ok(())
            }),
        });

        let sink = Arc::new(MemoryNotifier::new());
        registry
            .invoke("echo", "hello world".to_string(), ctx(&sink))
            .await
            .expect("invoke");
        assert_eq!(sink.at(Severity::Info), vec!["args: hello world".to_string()]);
    }

    #[test]
    fn list_is_sorted_by_name() {
        let registry = CommandRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(counting_command(name, "ext", Arc::new(AtomicUsize::new(0))));
        }
        let names: Vec<String> = registry.list().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
        assert!(registry.contains("mid"));
        assert!(!registry.contains("missing"));
    }
}

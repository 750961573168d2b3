//! Typed publish/subscribe core.
//!
//! Extensions subscribe handlers to lifecycle events during their setup
//! phase; the agent loop publishes events at defined lifecycle points and
//! collects handler results. Handler isolation is the bus's central
//! correctness property: one misbehaving handler cannot take down the agent
//! loop or its sibling handlers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::events::{EventKind, LifecycleEvent};
use crate::notify::{Notifier, Severity};

/// Future returned by an event handler.
///
/// `Ok(Some(value))` is an opinion, `Ok(None)` is "no opinion"; the two are
/// modeled as an optional value rather than a falsy one so an empty
/// contribution stays distinguishable from no contribution.
pub type HandlerFuture = BoxFuture<'static, Result<Option<Value>>>;

/// An event handler registered by one extension.
pub type EventHandler = Arc<dyn Fn(LifecycleEvent) -> HandlerFuture + Send + Sync>;

/// Wrap an async closure into the boxed [`EventHandler`] shape.
pub fn boxed_handler<F, Fut>(handler: F) -> EventHandler
where
    F: Fn(LifecycleEvent) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Option<Value>>> + Send + 'static,
{
    Arc::new(move |event| -> HandlerFuture { Box::pin(handler(event)) })
}

/// One handler's contribution to a publish, tagged with the owning
/// extension so aggregation warnings stay attributable.
#[derive(Debug, Clone)]
pub struct HandlerOutput {
    pub extension: String,
    pub value: Option<Value>,
}

/// Proof of a subscription. Handlers live for the process; there is no
/// unsubscribe (extensions never unload).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionHandle {
    pub kind: EventKind,
    pub id: u64,
}

struct Registration {
    extension: String,
    handler: EventHandler,
}

/// Typed publish/subscribe bus for lifecycle events.
///
/// The subscription list is mutated during the synchronous load phase and
/// append-only afterwards; the mutex is held only across registration and
/// snapshotting, never across a handler await.
pub struct EventBus {
    notifier: Arc<dyn Notifier>,
    handler_timeout: Option<Duration>,
    subscriptions: Mutex<HashMap<EventKind, Vec<Registration>>>,
    next_id: AtomicU64,
}

impl EventBus {
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>, handler_timeout: Option<Duration>) -> Self {
        Self {
            notifier,
            handler_timeout,
            subscriptions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Subscribe a handler to one lifecycle event.
    ///
    /// Handlers for the same event run in subscription order, so
    /// earlier-loaded extensions run first.
    pub fn subscribe(
        &self,
        kind: EventKind,
        extension: impl Into<String>,
        handler: EventHandler,
    ) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let registration = Registration {
            extension: extension.into(),
            handler,
        };
        self.subscriptions
            .lock()
            .expect("event bus subscription lock poisoned")
            .entry(kind)
            .or_default()
            .push(registration);
        SubscriptionHandle { kind, id }
    }

    /// Number of handlers subscribed to an event.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscriptions
            .lock()
            .expect("event bus subscription lock poisoned")
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Publish one lifecycle event to all subscribed handlers.
    ///
    /// Handlers run sequentially in subscription order and all complete (or
    /// fail, or time out) before this resolves. A failing or timed-out
    /// handler is reported through the notification channel at warning level
    /// and contributes no result; siblings still run. Callers of
    /// observational events ignore the returned outputs.
    pub async fn publish(&self, event: &LifecycleEvent) -> Vec<HandlerOutput> {
        let kind = event.kind();
        let snapshot: Vec<(String, EventHandler)> = {
            let subscriptions = self
                .subscriptions
                .lock()
                .expect("event bus subscription lock poisoned");
            subscriptions.get(&kind).map_or_else(Vec::new, |regs| {
                regs.iter()
                    .map(|r| (r.extension.clone(), Arc::clone(&r.handler)))
                    .collect()
            })
        };

        let mut outputs = Vec::with_capacity(snapshot.len());
        for (extension, handler) in snapshot {
            let value = self.run_handler(&extension, kind, handler, event).await;
            outputs.push(HandlerOutput { extension, value });
        }
        outputs
    }

    async fn run_handler(
        &self,
        extension: &str,
        kind: EventKind,
        handler: EventHandler,
        event: &LifecycleEvent,
    ) -> Option<Value> {
        let future = handler(event.clone());
        let result = match self.handler_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, future).await {
                Ok(result) => result,
                Err(_) => Err(Error::HandlerTimeout {
                    extension: extension.to_string(),
                    event: kind.event_name(),
                    timeout_ms: timeout.as_millis() as u64,
                }),
            },
            None => future.await,
        };

        match result {
            Ok(value) => value,
            Err(err) => {
                let report = match err {
                    Error::Handler { .. } | Error::HandlerTimeout { .. } => err,
                    other => Error::handler(extension, kind.event_name(), other.to_string()),
                };
                tracing::warn!(
                    extension = %extension,
                    event = %kind,
                    error = %report,
                    "Extension handler failed"
                );
                self.notifier
                    .notify(Severity::Warning, &report.to_string())
                    .await;
                None
            }
        }
    }
}

//! Publish/subscribe bus for conversion events.
//!
//! A [`crate::convert::Converter`] owns one [`EventBus`]. Callers register
//! handlers per [`EventKind`] and receive events synchronously on the
//! coordinator's task as pages complete:
//!
//! | Event | Fires | Payload |
//! |-------|-------|---------|
//! | [`EventKind::Progress`] | once per rendered page | [`ProgressEvent`] |
//! | [`EventKind::Page`] | once per rendered page | [`PageResult`] |
//! | [`EventKind::End`] | once per finished conversion | [`EndEvent`] |
//!
//! There is no buffering: a handler subscribed mid-conversion only sees events
//! emitted after it was registered.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2img::{ConversionEvent, EventBus, EventKind};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! let bus = EventBus::new();
//! let pages = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&pages);
//! let id = bus.subscribe(EventKind::Progress, move |event| {
//!     if let ConversionEvent::Progress(p) = event {
//!         eprintln!("{}/{} ({}%)", p.completed, p.total_pages, p.percent);
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     }
//! });
//! assert!(bus.unsubscribe(id));
//! ```

use crate::output::PageResult;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Category of event a handler subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Progress,
    Page,
    End,
}

/// Emitted once per successfully rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// 1-based number of the page that just completed.
    pub page_number: usize,
    /// Pages completed so far, including this one.
    pub completed: usize,
    /// Pages targeted by the conversion.
    pub total_pages: usize,
    /// `completed / total_pages` as a rounded percentage.
    pub percent: u8,
}

/// Emitted once when a conversion finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndEvent {
    /// Pages the conversion targeted. Pages skipped by the failure policy
    /// remain listed.
    pub converted: Vec<usize>,
}

/// Payload delivered to handlers.
#[derive(Debug, Clone)]
pub enum ConversionEvent {
    Progress(ProgressEvent),
    Page(PageResult),
    End(EndEvent),
}

impl ConversionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ConversionEvent::Progress(_) => EventKind::Progress,
            ConversionEvent::Page(_) => EventKind::Page,
            ConversionEvent::End(_) => EventKind::End,
        }
    }
}

/// Token returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&ConversionEvent) + Send + Sync>;

struct Listener {
    id: SubscriptionId,
    kind: EventKind,
    handler: Handler,
}

/// Multi-listener event bus.
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    listeners: Mutex<Vec<Listener>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.lock().len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&ConversionEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push(Listener {
            id,
            kind,
            handler: Arc::new(handler),
        });
        id
    }

    /// Remove a handler. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    /// Whether any handler listens for `kind`.
    pub fn has_listeners(&self, kind: EventKind) -> bool {
        self.lock().iter().any(|l| l.kind == kind)
    }

    /// Deliver `event` to every matching handler, in subscription order.
    ///
    /// Handlers run without the registry lock held, so they may subscribe or
    /// unsubscribe from inside a callback.
    pub fn emit(&self, event: &ConversionEvent) {
        let kind = event.kind();
        let handlers: Vec<Handler> = self
            .lock()
            .iter()
            .filter(|l| l.kind == kind)
            .map(|l| Arc::clone(&l.handler))
            .collect();
        for handler in handlers {
            handler(event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Listener>> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Per-conversion aggregator owned by the coordinator.
///
/// Turns page completions into ordered [`ProgressEvent`]s. Only the
/// coordinator calls it, so counters need no synchronisation.
pub struct ProgressReporter<'a> {
    bus: &'a EventBus,
    total: usize,
    completed: usize,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(bus: &'a EventBus, total: usize) -> Self {
        Self::resuming(bus, total, 0)
    }

    /// Reporter that continues counting from `completed` (used by resume).
    pub fn resuming(bus: &'a EventBus, total: usize, completed: usize) -> Self {
        Self {
            bus,
            total,
            completed,
        }
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Record one rendered page and notify listeners.
    pub fn page_completed(&mut self, result: &PageResult) {
        self.completed += 1;
        if self.bus.has_listeners(EventKind::Page) {
            self.bus.emit(&ConversionEvent::Page(result.clone()));
        }
        self.bus.emit(&ConversionEvent::Progress(ProgressEvent {
            page_number: result.page_index + 1,
            completed: self.completed,
            total_pages: self.total,
            percent: percent(self.completed, self.total),
        }));
    }

    /// Signal the end of the conversion.
    pub fn finished(&self, targeted: &[usize]) {
        self.bus.emit(&ConversionEvent::End(EndEvent {
            converted: targeted.to_vec(),
        }));
    }
}

/// Rounded completion percentage, capped at 100.
pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (completed as f64 * 100.0 / total as f64).round();
    pct.min(100.0) as u8
}

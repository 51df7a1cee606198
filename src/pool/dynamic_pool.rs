//! Dynamic strategy: workers pull one page at a time from a shared cursor.
//!
//! ## Protocol
//!
//! ```text
//! worker                         coordinator
//!   │── Ready ──────────────────────▶│  assign pages[cursor++]  (or End)
//!   │◀──────────────── Page(idx) ────│
//!   │── Rendered(result) ───────────▶│  record, report, assign next
//!   │── Failed(error) ──────────────▶│  FailurePolicy: abort | retry | skip
//!   │◀───────────────────── End ─────│
//!   │── Exited ─────────────────────▶│  active -= 1
//! ```
//!
//! A `Rendered` report doubles as the worker's next `Ready`. The document
//! handle is opened lazily on the first `Page` command and dropped when the
//! worker receives `End`.
//!
//! Aborting is just returning: the coordinator drops every command sender,
//! each worker's `blocking_recv` yields `None` after its current page, and
//! the thread exits without further work.

use super::{stopped, FailureAction, FailurePolicy, PoolJob, WorkerPool};
use crate::config::ResultOrder;
use crate::engine::{DocumentSource, RenderDocument, RenderEngine};
use crate::error::{PageError, Pdf2ImgError};
use crate::output::PageResult;
use crate::pipeline::render::{self, RenderSettings};
use crate::progress::ProgressReporter;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

/// Pull-based pool governed by a [`FailurePolicy`].
#[derive(Debug, Clone, Copy)]
pub struct DynamicPool {
    workers: usize,
    failure_policy: FailurePolicy,
    result_order: ResultOrder,
}

/// Coordinator → worker.
#[derive(Debug)]
enum WorkerCommand {
    Page(usize),
    End,
}

/// Worker → coordinator.
enum WorkerEvent {
    Ready { worker: usize },
    Rendered { worker: usize, result: PageResult },
    Failed { worker: usize, error: PageError },
    Exited { worker: usize },
    OpenFailed { worker: usize, error: Pdf2ImgError },
    Crashed { worker: usize, detail: String },
}

#[derive(Debug)]
struct PageAttempt {
    page: usize,
    started: Instant,
}

/// Coordinator-side bookkeeping for one worker.
struct WorkerState {
    commands: UnboundedSender<WorkerCommand>,
    has_retried_current_page: bool,
    processing_log: Vec<PageAttempt>,
}

impl WorkerState {
    fn assign(&mut self, worker: usize, page: usize) {
        debug!("Worker {} ← page {}", worker, page);
        self.processing_log.push(PageAttempt {
            page,
            started: Instant::now(),
        });
        // A closed channel means the thread died; its Crashed report follows.
        let _ = self.commands.send(WorkerCommand::Page(page));
    }

    fn end(&mut self, worker: usize) {
        debug!("Worker {} ← end", worker);
        let _ = self.commands.send(WorkerCommand::End);
    }

    /// Milliseconds since `page` was last handed to this worker.
    fn elapsed_ms(&self, page: usize) -> Option<u128> {
        self.processing_log
            .iter()
            .rev()
            .find(|attempt| attempt.page == page)
            .map(|attempt| attempt.started.elapsed().as_millis())
    }
}

/// Monotonic cursor over the resolved page set.
struct Cursor<'p> {
    pages: &'p [usize],
    next: usize,
}

impl Cursor<'_> {
    fn claim(&mut self) -> Option<usize> {
        let page = self.pages.get(self.next).copied()?;
        self.next += 1;
        Some(page)
    }
}

impl DynamicPool {
    pub fn new(workers: usize, failure_policy: FailurePolicy, result_order: ResultOrder) -> Self {
        Self {
            workers: workers.max(1),
            failure_policy,
            result_order,
        }
    }

    /// Hand `worker` its next page, or tell it to finish.
    fn dispatch(state: &mut WorkerState, worker: usize, cursor: &mut Cursor<'_>) {
        match cursor.claim() {
            Some(page) => {
                state.has_retried_current_page = false;
                state.assign(worker, page);
            }
            None => state.end(worker),
        }
    }
}

impl WorkerPool for DynamicPool {
    fn workers_for(&self, pages: usize) -> usize {
        self.workers.min(pages.max(1))
    }

    async fn run(
        &self,
        job: PoolJob,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<Vec<PageResult>, Pdf2ImgError> {
        let PoolJob {
            engine,
            source,
            password,
            settings,
            pages,
            mut control,
        } = job;

        let worker_count = self.workers_for(pages.len());
        info!(
            "Dynamic pool: {} pages across {} workers (on failure: {})",
            pages.len(),
            worker_count,
            self.failure_policy
        );

        let (event_tx, mut events) = mpsc::unbounded_channel();
        let mut states = Vec::with_capacity(worker_count);

        for worker in 0..worker_count {
            let (command_tx, command_rx) = mpsc::unbounded_channel();
            states.push(WorkerState {
                commands: command_tx,
                has_retried_current_page: false,
                processing_log: Vec::new(),
            });

            let engine = Arc::clone(&engine);
            let source = source.clone();
            let password = password.clone();
            let settings = Arc::clone(&settings);
            let tx = event_tx.clone();
            let handle = tokio::task::spawn_blocking(move || {
                worker_loop(
                    worker,
                    engine.as_ref(),
                    &source,
                    password.as_deref(),
                    &settings,
                    command_rx,
                    tx,
                )
            });

            let tx = event_tx.clone();
            tokio::spawn(async move {
                if let Err(e) = handle.await {
                    let _ = tx.send(WorkerEvent::Crashed {
                        worker,
                        detail: e.to_string(),
                    });
                }
            });
        }
        drop(event_tx);

        let mut cursor = Cursor {
            pages: &pages,
            next: 0,
        };
        let mut active = worker_count;
        let mut results = Vec::with_capacity(pages.len());
        let mut skipped = Vec::new();

        while active > 0 {
            let event = tokio::select! {
                _ = stopped(&mut control) => {
                    info!("Dynamic pool stopped after {} pages", results.len());
                    return Err(Pdf2ImgError::Stopped);
                }
                event = events.recv() => event,
            };
            let Some(event) = event else {
                return Err(Pdf2ImgError::Internal(format!(
                    "dynamic pool lost {} workers without an exit",
                    active
                )));
            };

            match event {
                WorkerEvent::Ready { worker } => {
                    Self::dispatch(&mut states[worker], worker, &mut cursor);
                }
                WorkerEvent::Rendered { worker, result } => {
                    let state = &mut states[worker];
                    if let Some(ms) = state.elapsed_ms(result.page_index) {
                        debug!("Worker {} rendered page {} in {}ms", worker, result.page_index, ms);
                    }
                    reporter.page_completed(&result);
                    results.push(result);
                    Self::dispatch(state, worker, &mut cursor);
                }
                WorkerEvent::Failed { worker, error } => {
                    let page = error.page();
                    let state = &mut states[worker];
                    match self.failure_policy.on_page_error(state.has_retried_current_page) {
                        FailureAction::Abort => {
                            error!("Worker {} failed page {}: {}; aborting", worker, page, error);
                            return Err(error.into_fatal());
                        }
                        FailureAction::Retry => {
                            warn!("Worker {} failed page {}: {}; retrying once", worker, page, error);
                            state.has_retried_current_page = true;
                            state.assign(worker, page);
                        }
                        FailureAction::Skip => {
                            warn!("Worker {} failed page {}: {}; skipping", worker, page, error);
                            skipped.push(page);
                            Self::dispatch(state, worker, &mut cursor);
                        }
                    }
                }
                WorkerEvent::Exited { worker } => {
                    active -= 1;
                    debug!("Worker {} exited ({} still active)", worker, active);
                }
                WorkerEvent::OpenFailed { worker, error } => {
                    error!("Worker {} could not open the document: {}", worker, error);
                    return Err(error);
                }
                WorkerEvent::Crashed { worker, detail } => {
                    error!("Worker {} crashed: {}", worker, detail);
                    return Err(Pdf2ImgError::WorkerCrashed { worker, detail });
                }
            }
        }

        if !skipped.is_empty() {
            warn!("Skipped {} failing pages: {:?}", skipped.len(), skipped);
        }
        if self.result_order == ResultOrder::PageIndex {
            results.sort_by_key(|r: &PageResult| r.page_index);
        }
        Ok(results)
    }
}

/// Body of one dynamic worker thread.
fn worker_loop(
    worker: usize,
    engine: &dyn RenderEngine,
    source: &DocumentSource,
    password: Option<&str>,
    settings: &RenderSettings,
    mut commands: UnboundedReceiver<WorkerCommand>,
    events: UnboundedSender<WorkerEvent>,
) {
    if events.send(WorkerEvent::Ready { worker }).is_err() {
        return;
    }

    let mut document: Option<Box<dyn RenderDocument + '_>> = None;

    while let Some(command) = commands.blocking_recv() {
        let page = match command {
            WorkerCommand::Page(page) => page,
            WorkerCommand::End => {
                drop(document.take());
                let _ = events.send(WorkerEvent::Exited { worker });
                return;
            }
        };

        if document.is_none() {
            match engine.open(source, password) {
                Ok(opened) => document = Some(opened),
                Err(error) => {
                    let _ = events.send(WorkerEvent::OpenFailed { worker, error });
                    return;
                }
            }
        }
        let Some(doc) = document.as_mut() else {
            return;
        };

        let event = match render::render_page(doc.as_mut(), page, settings) {
            Ok(result) => WorkerEvent::Rendered { worker, result },
            Err(error) => WorkerEvent::Failed { worker, error },
        };
        if events.send(event).is_err() {
            return;
        }
    }
}

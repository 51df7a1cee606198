//! Worker pools: where rendering runs once worker threads are enabled.
//!
//! ## Model
//!
//! Each worker is a `spawn_blocking` thread that opens its **own** document
//! handle and talks to the coordinator (the task awaiting
//! [`WorkerPool::run`]) over `tokio::sync::mpsc` channels. Workers never touch
//! the result list or the progress counters; only the coordinator does.
//!
//! ```text
//!             ┌──────────── coordinator (async task) ────────────┐
//!             │ results · progress · failure policy · cursor     │
//!             └───────▲────────────────▲────────────────▲────────┘
//!                     │ events         │                │
//!                 worker 0         worker 1    ...  worker N-1
//!              (own document)   (own document)   (own document)
//! ```
//!
//! Two strategies implement [`WorkerPool`]:
//!
//! | Strategy | Assignment | Failure handling | Output order |
//! |----------|------------|------------------|--------------|
//! | [`StaticPool`] | fixed round-robin chunks | any error is fatal | resolved page order |
//! | [`DynamicPool`] | pull-based, one page at a time | [`FailurePolicy`] | completion (or page index) |
//!
//! A `watch` channel carries the [`RunState`]; both pools abandon their
//! workers as soon as it flips to [`RunState::Stopped`].

mod dynamic_pool;
mod failure;
mod static_pool;

pub use dynamic_pool::DynamicPool;
pub use failure::{FailureAction, FailurePolicy};
pub use static_pool::StaticPool;

use crate::engine::{DocumentSource, RenderEngine};
use crate::error::Pdf2ImgError;
use crate::output::PageResult;
use crate::pipeline::render::RenderSettings;
use crate::progress::ProgressReporter;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Lifecycle signal shared by the converter and its workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
    Stopped,
}

/// Everything needed to render a resolved page set.
#[derive(Clone)]
pub struct PoolJob {
    pub engine: Arc<dyn RenderEngine>,
    pub source: DocumentSource,
    pub password: Option<String>,
    pub settings: Arc<RenderSettings>,
    /// Resolved page set, in request order.
    pub pages: Vec<usize>,
    pub control: watch::Receiver<RunState>,
}

/// A strategy for spreading a [`PoolJob`] over worker threads.
pub trait WorkerPool {
    /// Render every page of `job`, reporting each completion to `reporter`.
    ///
    /// Returns the rendered pages. Pages dropped by a tolerant failure policy
    /// are simply absent.
    fn run(
        &self,
        job: PoolJob,
        reporter: &mut ProgressReporter<'_>,
    ) -> impl Future<Output = Result<Vec<PageResult>, Pdf2ImgError>> + Send;

    /// Number of threads this pool will spawn for `pages` pages.
    fn workers_for(&self, pages: usize) -> usize;
}

/// Resolves once `control` reads [`RunState::Stopped`].
///
/// Never resolves if the sender is gone: nobody is left to stop us.
pub(crate) async fn stopped(control: &mut watch::Receiver<RunState>) {
    loop {
        if *control.borrow_and_update() == RunState::Stopped {
            return;
        }
        if control.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Non-blocking check used by worker threads between pages.
pub(crate) fn is_stopped(control: &watch::Receiver<RunState>) -> bool {
    *control.borrow() == RunState::Stopped
}

//! Static strategy: every worker gets its whole chunk up front.
//!
//! Pages are split with [`partition`], each chunk is rendered start to finish
//! on its own blocking thread, and the worker reports exactly once with the
//! full list. There is no retry or skip here: the first error of any kind
//! fails the conversion.

use super::{is_stopped, stopped, PoolJob, RunState, WorkerPool};
use crate::engine::{DocumentSource, RenderEngine};
use crate::error::{PageError, Pdf2ImgError};
use crate::output::PageResult;
use crate::pipeline::partition;
use crate::pipeline::render::{self, RenderSettings};
use crate::progress::ProgressReporter;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

/// Fixed-chunk pool.
#[derive(Debug, Clone, Copy)]
pub struct StaticPool {
    max_workers: usize,
    min_pages_per_worker: usize,
}

/// Terminal message of one static worker.
enum WorkerReport {
    Finished {
        worker: usize,
        result: Result<Vec<PageResult>, Pdf2ImgError>,
    },
    Crashed {
        worker: usize,
        detail: String,
    },
}

impl StaticPool {
    pub fn new(max_workers: usize, min_pages_per_worker: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            min_pages_per_worker: min_pages_per_worker.max(1),
        }
    }
}

impl WorkerPool for StaticPool {
    fn workers_for(&self, pages: usize) -> usize {
        partition::worker_count(pages, self.max_workers, self.min_pages_per_worker)
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

        let chunks = partition::partition(&pages, self.max_workers, self.min_pages_per_worker);
        info!(
            "Static pool: {} pages across {} workers",
            pages.len(),
            chunks.len()
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut active = chunks.len();

        for (worker, chunk) in chunks.into_iter().enumerate() {
            debug!("Worker {} assigned pages {:?}", worker, chunk);
            let engine = Arc::clone(&engine);
            let source = source.clone();
            let password = password.clone();
            let settings = Arc::clone(&settings);
            let worker_control = control.clone();

            let handle = tokio::task::spawn_blocking(move || {
                render_chunk(
                    engine.as_ref(),
                    &source,
                    password.as_deref(),
                    &chunk,
                    &settings,
                    &worker_control,
                )
            });

            // Watch the thread so a panic surfaces as a crash report.
            let tx = tx.clone();
            tokio::spawn(async move {
                let report = match handle.await {
                    Ok(result) => WorkerReport::Finished { worker, result },
                    Err(e) => WorkerReport::Crashed {
                        worker,
                        detail: e.to_string(),
                    },
                };
                let _ = tx.send(report);
            });
        }
        drop(tx);

        let mut by_page: HashMap<usize, PageResult> = HashMap::with_capacity(pages.len());

        while active > 0 {
            let report = tokio::select! {
                _ = stopped(&mut control) => {
                    info!("Static pool stopped with {} workers outstanding", active);
                    return Err(Pdf2ImgError::Stopped);
                }
                report = rx.recv() => report,
            };

            match report {
                Some(WorkerReport::Finished {
                    worker,
                    result: Ok(rendered),
                }) => {
                    active -= 1;
                    debug!("Worker {} finished {} pages", worker, rendered.len());
                    for page in rendered {
                        reporter.page_completed(&page);
                        by_page.insert(page.page_index, page);
                    }
                }
                Some(WorkerReport::Finished {
                    worker,
                    result: Err(e),
                }) => {
                    error!("Worker {} failed: {}", worker, e);
                    return Err(e);
                }
                Some(WorkerReport::Crashed { worker, detail }) => {
                    error!("Worker {} crashed: {}", worker, detail);
                    return Err(Pdf2ImgError::WorkerCrashed { worker, detail });
                }
                None => {
                    return Err(Pdf2ImgError::Internal(format!(
                        "static pool lost {} workers without a report",
                        active
                    )));
                }
            }
        }

        Ok(pages.iter().filter_map(|p| by_page.remove(p)).collect())
    }
}

/// Body of one static worker thread.
fn render_chunk(
    engine: &dyn RenderEngine,
    source: &DocumentSource,
    password: Option<&str>,
    pages: &[usize],
    settings: &RenderSettings,
    control: &watch::Receiver<RunState>,
) -> Result<Vec<PageResult>, Pdf2ImgError> {
    let mut document = engine.open(source, password)?;
    let mut rendered = Vec::with_capacity(pages.len());

    for &page in pages {
        if is_stopped(control) {
            return Err(Pdf2ImgError::Stopped);
        }
        let result =
            render::render_page(document.as_mut(), page, settings).map_err(PageError::into_fatal)?;
        rendered.push(result);
    }

    Ok(rendered)
}

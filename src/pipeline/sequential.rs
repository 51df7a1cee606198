//! In-process rendering without a worker pool.
//!
//! One blocking thread opens the document and walks the resolved pages in
//! order. Between pages it checks the [`RunState`]: `Paused` ends the walk
//! and reports where to resume, `Stopped` abandons it. Rendered pages are
//! sent back one at a time so the coordinator can report progress as they
//! complete. A page error is always fatal on this path.

use crate::error::{PageError, Pdf2ImgError};
use crate::output::PageResult;
use crate::pipeline::render;
use crate::pool::{stopped, PoolJob, RunState};
use crate::progress::ProgressReporter;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// How the walk ended.
#[derive(Debug)]
pub struct SequentialRun {
    /// Pages rendered during this walk, in page-set order.
    pub pages: Vec<PageResult>,
    /// Position in the page set to resume from, if the walk was paused.
    pub paused_at: Option<usize>,
}

/// Render `job.pages[start..]` in order on a single thread.
pub async fn run(
    job: &PoolJob,
    start: usize,
    reporter: &mut ProgressReporter<'_>,
) -> Result<SequentialRun, Pdf2ImgError> {
    let engine = Arc::clone(&job.engine);
    let source = job.source.clone();
    let password = job.password.clone();
    let settings = Arc::clone(&job.settings);
    let pages = job.pages.clone();
    let worker_control = job.control.clone();
    let mut control = job.control.clone();

    debug!("Sequential walk from position {} of {}", start, pages.len());

    let (tx, mut rx) = mpsc::unbounded_channel::<PageResult>();
    let handle = tokio::task::spawn_blocking(move || -> Result<Option<usize>, Pdf2ImgError> {
        let mut document = engine.open(&source, password.as_deref())?;

        for (position, &page) in pages.iter().enumerate().skip(start) {
            match *worker_control.borrow() {
                RunState::Running => {}
                RunState::Paused => return Ok(Some(position)),
                RunState::Stopped => return Err(Pdf2ImgError::Stopped),
            }
            let result = render::render_page(document.as_mut(), page, &settings)
                .map_err(PageError::into_fatal)?;
            if tx.send(result).is_err() {
                return Err(Pdf2ImgError::Stopped);
            }
        }
        Ok(None)
    });

    let mut rendered = Vec::new();
    loop {
        let next = tokio::select! {
            _ = stopped(&mut control) => return Err(Pdf2ImgError::Stopped),
            next = rx.recv() => next,
        };
        match next {
            Some(result) => {
                reporter.page_completed(&result);
                rendered.push(result);
            }
            None => break,
        }
    }

    let paused_at = handle
        .await
        .map_err(|e| Pdf2ImgError::WorkerCrashed {
            worker: 0,
            detail: e.to_string(),
        })??;

    if let Some(position) = paused_at {
        info!(
            "Paused after {} of {} pages",
            reporter.completed(),
            job.pages.len()
        );
        debug!("Next page to render: position {}", position);
    }

    Ok(SequentialRun {
        pages: rendered,
        paused_at,
    })
}

//! The conversion orchestrator.
//!
//! [`Converter`] ties the pieces together:
//!
//! 1. open the source once to validate it and count pages
//! 2. resolve the requested pages ([`crate::pipeline::pages`])
//! 3. create the output directory, if any
//! 4. render in-process, or hand the job to a [`StaticPool`] / [`DynamicPool`]
//! 5. assemble the [`ConversionOutput`] and emit the `End` event
//!
//! A converter runs one conversion at a time. It owns the [`EventBus`] that
//! listeners subscribe to and the run-state channel behind [`Converter::stop`],
//! [`Converter::pause`] and [`Converter::resume`].
//!
//! Use [`Converter::convert_stream`] instead when you want pages as they
//! complete rather than all at once, and [`Converter::text_content`] to read
//! page text without rendering.

use crate::config::{ConversionConfig, WorkerStrategy};
use crate::engine::{DocumentSource, PdfiumEngine, RenderEngine};
use crate::error::{PageError, Pdf2ImgError};
use crate::output::{ConversionOutput, ConversionState, ConversionStats, PageResult, PageText};
use crate::pipeline::render::RenderSettings;
use crate::pipeline::{pages, partition, sequential};
use crate::pool::{DynamicPool, PoolJob, RunState, StaticPool, WorkerPool};
use crate::progress::{ConversionEvent, EventBus, EventKind, ProgressReporter, SubscriptionId};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// An in-process conversion halted by [`Converter::pause`].
struct PausedConversion {
    job: PoolJob,
    rendered: Vec<PageResult>,
    next: usize,
    total_pages: usize,
    started: Instant,
}

/// Converts documents to images and publishes progress.
///
/// # Example
///
/// ```rust,no_run
/// use edgequake_pdf2img::{ConversionConfig, Converter, ConversionEvent, EventKind};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let converter = Converter::with_pdfium()?;
///     converter.subscribe(EventKind::Progress, |event| {
///         if let ConversionEvent::Progress(p) = event {
///             eprintln!("page {} ({}%)", p.page_number, p.percent);
///         }
///     });
///
///     let config = ConversionConfig::builder()
///         .output_dir("out")
///         .use_worker_threads(true)
///         .build()?;
///     let output = converter.convert("document.pdf", &config).await?;
///     println!("{} pages written", output.pages.len());
///     Ok(())
/// }
/// ```
pub struct Converter {
    engine: Arc<dyn RenderEngine>,
    bus: EventBus,
    control: watch::Sender<RunState>,
    paused: Mutex<Option<PausedConversion>>,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("bus", &self.bus)
            .field("state", &*self.control.borrow())
            .field("paused", &self.lock_paused().is_some())
            .finish()
    }
}

impl Converter {
    /// Converter backed by any [`RenderEngine`].
    pub fn new(engine: Arc<dyn RenderEngine>) -> Self {
        let (control, _) = watch::channel(RunState::Running);
        Self {
            engine,
            bus: EventBus::new(),
            control,
            paused: Mutex::new(None),
        }
    }

    /// Converter backed by pdfium, binding the library now so a missing
    /// pdfium fails here rather than mid-conversion.
    pub fn with_pdfium() -> Result<Self, Pdf2ImgError> {
        let engine = PdfiumEngine::new();
        engine.ensure_bound()?;
        Ok(Self::new(Arc::new(engine)))
    }

    /// Register an event handler. See [`EventBus::subscribe`].
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&ConversionEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(kind, handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Convert `source` to images according to `config`.
    ///
    /// # Returns
    /// A [`ConversionOutput`] whose `state` is [`ConversionState::Paused`]
    /// if [`Converter::pause`] halted an in-process run; call
    /// [`Converter::resume`] to finish it.
    ///
    /// # Errors
    /// - [`Pdf2ImgError::FileNotFound`], [`Pdf2ImgError::OpenFailed`],
    ///   [`Pdf2ImgError::PasswordRequired`], [`Pdf2ImgError::WrongPassword`]
    ///   before any page is rendered
    /// - [`Pdf2ImgError::PageFailed`] when a page error is not tolerated
    /// - [`Pdf2ImgError::WorkerCrashed`] when a worker thread dies
    /// - [`Pdf2ImgError::Stopped`] after [`Converter::stop`]
    pub async fn convert(
        &self,
        source: impl Into<DocumentSource>,
        config: &ConversionConfig,
    ) -> Result<ConversionOutput, Pdf2ImgError> {
        let started = Instant::now();
        let source = source.into();
        self.lock_paused().take();
        self.control.send_replace(RunState::Running);

        info!("Starting conversion: {}", source.display_name());

        // ── Open the document ────────────────────────────────────────────
        source.validate()?;
        let total_pages = self.probe(&source, config.password.clone()).await?;
        info!("Document has {} pages", total_pages);
        if *self.control.borrow() == RunState::Stopped {
            info!("Stopped while opening the document");
            return Err(Pdf2ImgError::Stopped);
        }

        // ── Resolve pages ────────────────────────────────────────────────
        let targeted = pages::resolve_pages(&config.pages, total_pages);
        debug!("Targeting {} pages", targeted.len());

        // ── Output directory ─────────────────────────────────────────────
        if let Some(dir) = &config.output_dir {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| Pdf2ImgError::OutputWriteFailed {
                    path: dir.clone(),
                    source,
                })?;
        }

        let job = PoolJob {
            engine: Arc::clone(&self.engine),
            settings: Arc::new(RenderSettings::new(config, &source, &targeted)),
            source,
            password: config.password.clone(),
            pages: targeted.clone(),
            control: self.control.subscribe(),
        };
        let mut reporter = ProgressReporter::new(&self.bus, targeted.len());

        if targeted.is_empty() {
            warn!("No requested page exists in the document; nothing to convert");
            reporter.finished(&targeted);
            return Ok(assemble(Vec::new(), targeted, total_pages, 0, None, started));
        }

        // ── Render ───────────────────────────────────────────────────────
        if !config.use_worker_threads {
            let run = sequential::run(&job, 0, &mut reporter).await?;
            return Ok(self.finish_sequential(job, run, Vec::new(), total_pages, started, &reporter));
        }

        let strategy = config.worker_strategy;
        let (rendered, workers) = match strategy {
            WorkerStrategy::Static => {
                let pool = StaticPool::new(config.max_worker_threads, config.min_pages_per_worker);
                let workers = pool.workers_for(targeted.len());
                (pool.run(job, &mut reporter).await?, workers)
            }
            WorkerStrategy::Dynamic => {
                let pool = DynamicPool::new(
                    partition::worker_count(
                        targeted.len(),
                        config.max_worker_threads,
                        config.min_pages_per_worker,
                    ),
                    config.failure_policy,
                    config.result_order,
                );
                let workers = pool.workers_for(targeted.len());
                (pool.run(job, &mut reporter).await?, workers)
            }
        };

        reporter.finished(&targeted);
        let output = assemble(rendered, targeted, total_pages, workers, Some(strategy), started);
        log_summary(&output);
        Ok(output)
    }

    /// Blocking wrapper around [`Converter::convert`] for non-async callers.
    ///
    /// Creates a dedicated runtime; do not call from inside one.
    pub fn convert_blocking(
        &self,
        source: impl Into<DocumentSource>,
        config: &ConversionConfig,
    ) -> Result<ConversionOutput, Pdf2ImgError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| Pdf2ImgError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.convert(source, config))
    }

    /// Page count of `source` without converting anything.
    pub async fn inspect(
        &self,
        source: impl Into<DocumentSource>,
        password: Option<&str>,
    ) -> Result<usize, Pdf2ImgError> {
        let source = source.into();
        source.validate()?;
        self.probe(&source, password.map(str::to_string)).await
    }

    /// Text of the requested pages, in resolved order.
    ///
    /// `pages` follows the same rules as [`ConversionConfig::pages`]: empty
    /// means every page and out-of-range entries are dropped with a warning.
    ///
    /// # Errors
    /// The open errors of [`Converter::convert`], and
    /// [`Pdf2ImgError::PageFailed`] when a page's text layer cannot be read.
    pub async fn text_content(
        &self,
        source: impl Into<DocumentSource>,
        pages: &[i64],
        password: Option<&str>,
    ) -> Result<Vec<PageText>, Pdf2ImgError> {
        let source = source.into();
        source.validate()?;

        let engine = Arc::clone(&self.engine);
        let requested = pages.to_vec();
        let password = password.map(str::to_string);
        tokio::task::spawn_blocking(move || -> Result<Vec<PageText>, Pdf2ImgError> {
            let mut document = engine.open(&source, password.as_deref())?;
            let targeted = pages::resolve_pages(&requested, document.page_count());
            let language = document.language().unwrap_or_else(|| "unknown".to_string());
            let name = source.file_name().map(str::to_string);
            debug!("Extracting text from {} pages", targeted.len());

            targeted
                .into_iter()
                .map(|page_index| -> Result<PageText, Pdf2ImgError> {
                    let text = document
                        .page_text(page_index)
                        .map_err(PageError::into_fatal)?;
                    Ok(PageText {
                        name: name.clone(),
                        page_index,
                        text,
                        language: language.clone(),
                    })
                })
                .collect()
        })
        .await
        .map_err(|e| Pdf2ImgError::Internal(format!("Text extraction task failed: {}", e)))?
    }

    /// Abandon the running conversion. It returns [`Pdf2ImgError::Stopped`]
    /// and any paused conversion is discarded.
    pub fn stop(&self) {
        info!("Stop requested");
        self.control.send_replace(RunState::Stopped);
        self.lock_paused().take();
    }

    /// Halt an in-process conversion after its current page.
    ///
    /// Worker pools are not pausable; on those paths the request has no
    /// effect.
    pub fn pause(&self) {
        let changed = self.control.send_if_modified(|state| {
            if *state == RunState::Running {
                *state = RunState::Paused;
                true
            } else {
                false
            }
        });
        if changed {
            debug!("Pause requested; honoured by in-process conversions only");
        }
    }

    /// Continue a paused conversion from the next unrendered page.
    ///
    /// The returned output covers the whole conversion, including pages
    /// rendered before the pause.
    pub async fn resume(&self) -> Result<ConversionOutput, Pdf2ImgError> {
        let paused = self.lock_paused().take().ok_or(Pdf2ImgError::NotPaused)?;
        self.control.send_replace(RunState::Running);

        let PausedConversion {
            job,
            rendered,
            next,
            total_pages,
            started,
        } = paused;
        info!("Resuming at position {} of {}", next, job.pages.len());

        let mut reporter = ProgressReporter::resuming(&self.bus, job.pages.len(), rendered.len());
        let run = sequential::run(&job, next, &mut reporter).await?;
        Ok(self.finish_sequential(job, run, rendered, total_pages, started, &reporter))
    }

    /// Merge an in-process walk into earlier pages and either park it as
    /// paused or complete it.
    fn finish_sequential(
        &self,
        job: PoolJob,
        run: sequential::SequentialRun,
        mut rendered: Vec<PageResult>,
        total_pages: usize,
        started: Instant,
        reporter: &ProgressReporter<'_>,
    ) -> ConversionOutput {
        rendered.extend(run.pages);
        let targeted = job.pages.clone();

        match run.paused_at {
            Some(next) => {
                let mut output =
                    assemble(rendered.clone(), targeted, total_pages, 0, None, started);
                output.state = ConversionState::Paused;
                *self.lock_paused() = Some(PausedConversion {
                    job,
                    rendered,
                    next,
                    total_pages,
                    started,
                });
                output
            }
            None => {
                reporter.finished(&targeted);
                let output = assemble(rendered, targeted, total_pages, 0, None, started);
                log_summary(&output);
                output
            }
        }
    }

    /// Open `source` on a blocking thread and count its pages.
    async fn probe(
        &self,
        source: &DocumentSource,
        password: Option<String>,
    ) -> Result<usize, Pdf2ImgError> {
        let engine = Arc::clone(&self.engine);
        let source = source.clone();
        tokio::task::spawn_blocking(move || -> Result<usize, Pdf2ImgError> {
            let document = engine.open(&source, password.as_deref())?;
            Ok(document.page_count())
        })
        .await
        .map_err(|e| Pdf2ImgError::Internal(format!("Document probe task failed: {}", e)))?
    }

    fn lock_paused(&self) -> MutexGuard<'_, Option<PausedConversion>> {
        self.paused.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn assemble(
    pages: Vec<PageResult>,
    targeted: Vec<usize>,
    total_pages: usize,
    worker_count: usize,
    strategy: Option<WorkerStrategy>,
    started: Instant,
) -> ConversionOutput {
    let stats = ConversionStats {
        total_pages,
        targeted_pages: targeted.len(),
        rendered_pages: pages.len(),
        skipped_pages: targeted.len().saturating_sub(pages.len()),
        worker_count,
        strategy,
        total_duration_ms: started.elapsed().as_millis() as u64,
    };
    ConversionOutput {
        pages,
        targeted,
        stats,
        state: ConversionState::Completed,
    }
}

fn log_summary(output: &ConversionOutput) {
    let stats = &output.stats;
    info!(
        "Conversion complete: {}/{} pages in {}ms ({} skipped)",
        stats.rendered_pages, stats.targeted_pages, stats.total_duration_ms, stats.skipped_pages
    );
}

//! # edgequake-pdf2img
//!
//! Convert PDF documents to PNG or JPEG images, page by page, optionally
//! spread across worker threads.
//!
//! ## Why this crate?
//!
//! Rasterising a page is CPU-bound and pdfium documents cannot be shared
//! between threads. Converting a long document quickly means opening one
//! handle per worker and feeding pages to them without losing track of
//! progress, ordering or failures. This crate does that bookkeeping: it
//! resolves which pages to render, picks a worker layout, applies a failure
//! policy, reports progress, and writes deterministically named files.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Open      validate the source, count pages (pdfium, spawn_blocking)
//!  ├─ 2. Resolve   requested pages → in-range, de-duplicated page set
//!  ├─ 3. Schedule  in-process │ static chunks │ dynamic pull queue
//!  ├─ 4. Render    rasterise + encode PNG/JPEG on worker threads
//!  ├─ 5. Persist   <base>_<padded index>.<ext> in the output directory
//!  └─ 6. Output    per-page results, stats, End event
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2img::{ConversionConfig, Converter, WorkerStrategy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::with_pdfium()?;
//!     let config = ConversionConfig::builder()
//!         .output_dir("images")
//!         .scale(2.0)
//!         .use_worker_threads(true)
//!         .worker_strategy(WorkerStrategy::Dynamic)
//!         .build()?;
//!     let output = converter.convert("document.pdf", &config).await?;
//!     for page in &output.pages {
//!         println!("{:?}", page.path);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2img` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2img = { version = "0.1", default-features = false }
//! ```
//!
//! ## Choosing a Strategy
//!
//! | Setup | Pausable | Failure policy | Output order |
//! |-------|----------|----------------|--------------|
//! | in-process (`use_worker_threads = false`) | yes | always abort | page-set order |
//! | `WorkerStrategy::Static` | no | always abort | page-set order |
//! | `WorkerStrategy::Dynamic` | no | abort / retry / next-page | completion order |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ColorSpace, ConversionConfig, ConversionConfigBuilder, ImageFormat, ResultOrder,
    WorkerStrategy,
};
pub use convert::Converter;
pub use engine::{DocumentSource, PdfiumEngine, RenderDocument, RenderEngine};
pub use error::{PageError, Pdf2ImgError};
pub use output::{ConversionOutput, ConversionState, ConversionStats, PageResult, PageText};
pub use pool::{FailurePolicy, RunState};
pub use progress::{
    ConversionEvent, EndEvent, EventBus, EventKind, ProgressEvent, SubscriptionId,
};
pub use stream::PageStream;

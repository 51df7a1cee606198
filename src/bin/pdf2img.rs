//! CLI binary for edgequake-pdf2img.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig`, drives a progress bar from the event bus and
//! prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2img::{
    ColorSpace, ConversionConfig, ConversionEvent, ConversionOutput, Converter, EventKind,
    FailurePolicy, ImageFormat, Pdf2ImgError, ResultOrder, WorkerStrategy,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

const AFTER_HELP: &str = r#"EXAMPLES:
  # Every page as PNG into the current directory
  pdf2img document.pdf

  # Pages 0-4 at double resolution into ./out
  pdf2img --pages 0-4 --scale 2 -o out document.pdf

  # Grayscale JPEGs on 4 worker threads, pulling pages dynamically
  pdf2img --format jpeg --gray --workers --max-workers 4 --strategy dynamic scan.pdf

  # Keep going when a page cannot be rendered
  pdf2img --workers --strategy dynamic --on-failure next-page damaged.pdf

  # Page count only
  pdf2img --inspect-only document.pdf

  # Text of the first three pages, as JSON
  pdf2img --text-only --json --pages 0-2 document.pdf

  # JSON description of the output, images embedded as base64
  pdf2img --json --include-content --pages 0 document.pdf > page0.json

PAGES:
  Page numbers are zero-based. Accepted forms: all, 3, 2-5 (inclusive), 0,4,7.
  Pages past the end of the document are skipped with a warning.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to an existing libpdfium (checked before ./ and
                    the system library path)
  RUST_LOG          Overrides the log filter chosen by -v / -q
  PDF2IMG_*         Every flag can also be set through its env variable
"#;

/// Convert PDF pages to PNG or JPEG images.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2img",
    version,
    about = "Convert PDF pages to PNG or JPEG images",
    long_about = "Convert PDF documents to one image per page using pdfium. Pages can be \
rendered in-process or spread over worker threads with a static or dynamic schedule.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Directory to write images into (created if missing).
    #[arg(short, long, env = "PDF2IMG_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Base name of written images. Default: the input file stem.
    #[arg(long, env = "PDF2IMG_FILE_NAME")]
    file_name: Option<String>,

    /// Page selection (zero-based): all, 3, 2-5, or 0,4,7.
    #[arg(long, env = "PDF2IMG_PAGES", default_value = "all")]
    pages: String,

    /// Render scale; 1.0 renders at 72 DPI.
    #[arg(long, env = "PDF2IMG_SCALE", default_value_t = 1.0)]
    scale: f32,

    /// Image format.
    #[arg(long, env = "PDF2IMG_FORMAT", value_enum, default_value = "png")]
    format: FormatArg,

    /// Render in grayscale.
    #[arg(long, env = "PDF2IMG_GRAY")]
    gray: bool,

    /// JPEG quality (1-100).
    #[arg(long, env = "PDF2IMG_JPEG_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2IMG_PASSWORD")]
    password: Option<String>,

    /// Render on worker threads instead of in-process.
    #[arg(long, env = "PDF2IMG_WORKERS")]
    workers: bool,

    /// Upper bound on worker threads. Default: CPU cores - 1.
    #[arg(long, env = "PDF2IMG_MAX_WORKERS")]
    max_workers: Option<usize>,

    /// Minimum pages per worker before another worker is added.
    #[arg(long, env = "PDF2IMG_MIN_PAGES_PER_WORKER", default_value_t = 2)]
    min_pages_per_worker: usize,

    /// Worker schedule.
    #[arg(long, env = "PDF2IMG_STRATEGY", value_enum, default_value = "static")]
    strategy: StrategyArg,

    /// What the dynamic schedule does when a page fails.
    #[arg(long, env = "PDF2IMG_ON_FAILURE", value_enum, default_value = "abort")]
    on_failure: FailureArg,

    /// Order of pages in the output of the dynamic schedule.
    #[arg(long, env = "PDF2IMG_PAGE_ORDER", value_enum, default_value = "completion")]
    page_order: OrderArg,

    /// Keep image bytes in the JSON output even though files are written.
    #[arg(long, env = "PDF2IMG_INCLUDE_CONTENT")]
    include_content: bool,

    /// Output structured JSON (ConversionOutput) on stdout.
    #[arg(long, env = "PDF2IMG_JSON")]
    json: bool,

    /// Print the page count only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Print the text of the selected pages instead of rendering them.
    #[arg(long, conflicts_with = "inspect_only")]
    text_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2IMG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2IMG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2IMG_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    Jpeg,
}

impl From<FormatArg> for ImageFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => ImageFormat::Png,
            FormatArg::Jpeg => ImageFormat::Jpeg,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    Static,
    Dynamic,
}

impl From<StrategyArg> for WorkerStrategy {
    fn from(v: StrategyArg) -> Self {
        match v {
            StrategyArg::Static => WorkerStrategy::Static,
            StrategyArg::Dynamic => WorkerStrategy::Dynamic,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FailureArg {
    Abort,
    Retry,
    NextPage,
}

impl From<FailureArg> for FailurePolicy {
    fn from(v: FailureArg) -> Self {
        match v {
            FailureArg::Abort => FailurePolicy::Abort,
            FailureArg::Retry => FailurePolicy::Retry,
            FailureArg::NextPage => FailurePolicy::NextPage,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OrderArg {
    Completion,
    PageIndex,
}

impl From<OrderArg> for ResultOrder {
    fn from(v: OrderArg) -> Self {
        match v {
            OrderArg::Completion => ResultOrder::Completion,
            OrderArg::PageIndex => ResultOrder::PageIndex,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs unless -v is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let converter = Arc::new(Converter::with_pdfium().context("PDF engine unavailable")?);

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let pages = converter
            .inspect(cli.input.as_path(), cli.password.as_deref())
            .await
            .context("Failed to inspect PDF")?;
        if cli.json {
            let doc = serde_json::json!({ "file": cli.input, "page_count": pages });
            println!(
                "{}",
                serde_json::to_string_pretty(&doc).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:   {}", cli.input.display());
            println!("Pages:  {}", pages);
        }
        return Ok(());
    }

    // ── Page selection ───────────────────────────────────────────────────
    let selection = parse_pages(&cli.pages)?;
    let pages = match selection {
        PageSelection::Range { .. } => {
            let page_count = converter
                .inspect(cli.input.as_path(), cli.password.as_deref())
                .await
                .context("Failed to inspect PDF")?;
            selection.to_indices(page_count)
        }
        _ => selection.to_indices(0),
    };

    // ── Text-only mode ───────────────────────────────────────────────────
    if cli.text_only {
        let texts = converter
            .text_content(cli.input.as_path(), &pages, cli.password.as_deref())
            .await
            .context("Failed to extract text")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&texts).context("Failed to serialise text")?
            );
        } else {
            for page in &texts {
                println!("{}", bold(&format!("── page {} ──", page.page_index)));
                println!("{}", page.text);
            }
        }
        return Ok(());
    }

    let config = build_config(&cli, pages)?;

    // ── Progress bar ─────────────────────────────────────────────────────
    let bar = show_progress.then(|| {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} pages  \
                 ⏱ {elapsed_precise}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });
    if let Some(bar) = bar.clone() {
        converter.subscribe(EventKind::Progress, move |event| {
            if let ConversionEvent::Progress(p) = event {
                if bar.length() != Some(p.total_pages as u64) {
                    bar.set_length(p.total_pages as u64);
                }
                bar.set_position(p.completed as u64);
                bar.set_message(format!("page {}", p.page_number));
            }
        });
    }

    // ── Ctrl-C ───────────────────────────────────────────────────────────
    let stopper = Arc::clone(&converter);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.stop();
        }
    });

    // ── Run conversion ───────────────────────────────────────────────────
    let result = converter.convert(cli.input.as_path(), &config).await;
    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }
    let output = match result {
        Err(Pdf2ImgError::Stopped) => anyhow::bail!("Interrupted"),
        other => other.context("Conversion failed")?,
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&output, &cli.output_dir);
    }

    Ok(())
}

fn print_summary(output: &ConversionOutput, output_dir: &std::path::Path) {
    let stats = &output.stats;
    let mode = match (stats.strategy, stats.worker_count) {
        (Some(strategy), workers) => format!("{strategy:?} pool, {workers} workers").to_lowercase(),
        (None, _) => "in-process".to_string(),
    };
    let written = match (output.pages.first(), output.total_size_on_disk()) {
        (Some(page), Ok(bytes)) => format!("{}, {}", page.format.mime_type(), human_size(bytes)),
        (Some(page), Err(_)) => page.format.mime_type().to_string(),
        (None, _) => "nothing written".to_string(),
    };
    eprintln!(
        "{}  {}/{} pages  {}ms  {}  {}  →  {}",
        if stats.skipped_pages == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        stats.rendered_pages,
        stats.targeted_pages,
        stats.total_duration_ms,
        dim(&mode),
        dim(&written),
        bold(&output_dir.display().to_string()),
    );
    let missing = output.missing_pages();
    if !missing.is_empty() {
        eprintln!("   skipped pages: {:?}", missing);
    }
}

fn human_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b >= KIB * KIB {
        format!("{:.2} MiB", b / (KIB * KIB))
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{bytes} B")
    }
}

/// Map CLI args to `ConversionConfig`. `pages` is the resolved `--pages`.
fn build_config(cli: &Cli, pages: Vec<i64>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .scale(cli.scale)
        .format(cli.format.into())
        .color_space(if cli.gray {
            ColorSpace::Gray
        } else {
            ColorSpace::Rgb
        })
        .jpeg_quality(cli.jpeg_quality)
        .output_dir(cli.output_dir.clone())
        .include_buffer_content(cli.include_content)
        .pages(pages)
        .use_worker_threads(cli.workers)
        .min_pages_per_worker(cli.min_pages_per_worker)
        .worker_strategy(cli.strategy.into())
        .failure_policy(cli.on_failure.into())
        .result_order(cli.page_order.into());

    if let Some(n) = cli.max_workers {
        builder = builder.max_worker_threads(n);
    }
    if let Some(name) = &cli.file_name {
        builder = builder.file_name(name.clone());
    }
    if let Some(pwd) = &cli.password {
        builder = builder.password(pwd.clone());
    }

    builder.build().context("Invalid configuration")
}

/// Parsed `--pages` value. Ranges stay unexpanded until the page count is
/// known.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PageSelection {
    All,
    Range { start: i64, end: i64 },
    Set(Vec<i64>),
}

impl PageSelection {
    /// Zero-based indices for the library. Empty means all pages.
    ///
    /// A range is clipped to `page_count`. A range lying entirely past the
    /// end keeps its start so the library reports it as out of range rather
    /// than converting every page.
    fn to_indices(&self, page_count: usize) -> Vec<i64> {
        match self {
            PageSelection::All => Vec::new(),
            PageSelection::Set(pages) => pages.clone(),
            PageSelection::Range { start, end } => {
                let last = i64::try_from(page_count).unwrap_or(i64::MAX) - 1;
                let clipped: Vec<i64> = (*start..=(*end).min(last)).collect();
                if clipped.is_empty() {
                    vec![*start]
                } else {
                    clipped
                }
            }
        }
    }
}

/// Parse `--pages`: `all`, `3`, `2-5` or `0,4,7`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "2-5"
    if let Some((start, end)) = s.split_once('-') {
        let start: i64 = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: i64 = end.trim().parse().context("Invalid end page in range")?;

        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range { start, end });
    }

    // Set: "0,4,7"
    s.split(',')
        .map(|p| {
            p.trim()
                .parse::<i64>()
                .with_context(|| format!("Invalid page number: '{}'", p.trim()))
        })
        .collect::<Result<Vec<_>>>()
        .map(PageSelection::Set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pages_forms() {
        assert_eq!(parse_pages("all").unwrap(), PageSelection::All);
        assert_eq!(parse_pages("3").unwrap(), PageSelection::Set(vec![3]));
        assert_eq!(
            parse_pages("2-5").unwrap(),
            PageSelection::Range { start: 2, end: 5 }
        );
        assert_eq!(
            parse_pages("0, 4,7").unwrap(),
            PageSelection::Set(vec![0, 4, 7])
        );
    }

    #[test]
    fn indices_for_each_form() {
        assert!(PageSelection::All.to_indices(10).is_empty());
        assert_eq!(PageSelection::Set(vec![12, 1]).to_indices(10), vec![12, 1]);
        assert_eq!(
            parse_pages("2-5").unwrap().to_indices(10),
            vec![2, 3, 4, 5]
        );
    }

    #[test]
    fn huge_range_is_clipped_to_document() {
        let selection = parse_pages("0-4000000000").unwrap();
        assert_eq!(
            selection,
            PageSelection::Range {
                start: 0,
                end: 4_000_000_000
            }
        );
        assert_eq!(selection.to_indices(3), vec![0, 1, 2]);
    }

    #[test]
    fn range_past_the_end_is_not_all_pages() {
        let selection = parse_pages("20-4000000000").unwrap();
        assert_eq!(selection.to_indices(15), vec![20]);
        assert_eq!(parse_pages("5-9").unwrap().to_indices(0), vec![5]);
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KiB");
        assert_eq!(human_size(3 * 1024 * 1024), "3.00 MiB");
    }

    #[test]
    fn parse_pages_rejects_garbage() {
        assert!(parse_pages("5-2").is_err());
        assert!(parse_pages("one").is_err());
        assert!(parse_pages("1,x").is_err());
    }

    #[test]
    fn text_only_conflicts_with_inspect_only() {
        assert!(Cli::try_parse_from(["pdf2img", "doc.pdf", "--text-only", "--inspect-only"]).is_err());
        let cli = Cli::parse_from(["pdf2img", "doc.pdf", "--text-only", "--pages", "1-3"]);
        assert!(cli.text_only);
    }

    #[test]
    fn cli_maps_to_config() {
        let cli = Cli::parse_from([
            "pdf2img",
            "doc.pdf",
            "--workers",
            "--strategy",
            "dynamic",
            "--on-failure",
            "next-page",
            "--format",
            "jpeg",
            "--gray",
            "--max-workers",
            "3",
        ]);
        let config = build_config(&cli, vec![0, 2]).unwrap();
        assert_eq!(config.pages, vec![0, 2]);
        assert!(config.use_worker_threads);
        assert_eq!(config.worker_strategy, WorkerStrategy::Dynamic);
        assert_eq!(config.failure_policy, FailurePolicy::NextPage);
        assert_eq!(config.format, ImageFormat::Jpeg);
        assert_eq!(config.color_space, ColorSpace::Gray);
        assert_eq!(config.max_worker_threads, 3);
    }
}

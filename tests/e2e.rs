//! End-to-end integration tests for edgequake-pdf2img.
//!
//! These tests render real PDF files from `./test_cases/` through pdfium.
//! They are gated behind the `E2E_ENABLED` environment variable so they do
//! not run in CI unless explicitly requested, and they need a pdfium library
//! (`PDFIUM_LIB_PATH`, `./`, or a system install).
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=./libpdfium.so cargo test --test e2e -- --nocapture
//!
//! To restrict to a specific test:
//!   E2E_ENABLED=1 cargo test --test e2e test_inspect -- --nocapture

use edgequake_pdf2img::{
    ColorSpace, ConversionConfig, Converter, FailurePolicy, ImageFormat, Pdf2ImgError,
    WorkerStrategy,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        p
    }};
}

fn converter() -> Converter {
    Converter::with_pdfium().expect("pdfium must be available for e2e tests")
}

/// Assert the bytes decode as an image of the given size.
fn assert_decodes(bytes: &[u8], width: u32, height: u32, context: &str) {
    let img = image::load_from_memory(bytes)
        .unwrap_or_else(|e| panic!("[{context}] output is not a valid image: {e}"));
    assert_eq!(
        (img.width(), img.height()),
        (width, height),
        "[{context}] decoded size must match the reported size"
    );
}

// ── Inspect tests (instant) ──────────────────────────────────────────────────

#[tokio::test]
async fn test_inspect_arxiv_paper() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));

    let pages = converter()
        .inspect(path.as_path(), None)
        .await
        .expect("inspect() should succeed");

    assert_eq!(pages, 15, "Attention paper should have 15 pages");
}

#[tokio::test]
async fn test_inspect_nonexistent() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP");
        return;
    }

    let result = converter().inspect("/definitely/not/a/real/file.pdf", None).await;
    assert!(matches!(result, Err(Pdf2ImgError::FileNotFound { .. })));
}

#[tokio::test]
async fn test_garbage_bytes_fail_to_open() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP");
        return;
    }

    let result = converter()
        .convert(b"not a pdf at all".to_vec(), &ConversionConfig::default())
        .await;
    assert!(
        matches!(result, Err(Pdf2ImgError::OpenFailed { .. })),
        "got {result:?}"
    );
}

// ── Conversion tests ─────────────────────────────────────────────────────────

/// Page 1 of the Attention paper, in memory, PNG at 2x.
#[tokio::test]
async fn test_convert_single_page_in_memory() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));

    let config = ConversionConfig::builder()
        .pages(vec![0])
        .scale(2.0)
        .build()
        .expect("valid config");

    let output = converter()
        .convert(path.as_path(), &config)
        .await
        .expect("conversion should succeed");

    assert_eq!(output.pages.len(), 1);
    let page = &output.pages[0];
    assert_eq!(page.page_index, 0);
    // US Letter at 72 DPI is 612x792 points.
    assert!(page.width > 1000 && page.height > 1000, "2x render: {}x{}", page.width, page.height);
    let bytes = page.content.as_deref().expect("in-memory render keeps content");
    assert_decodes(bytes, page.width, page.height, "arxiv_page0");
}

/// Every page to disk on the dynamic pool.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_convert_to_disk_dynamic_pool() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));
    let out = tempfile::tempdir().expect("tempdir");

    let config = ConversionConfig::builder()
        .output_dir(out.path())
        .use_worker_threads(true)
        .worker_strategy(WorkerStrategy::Dynamic)
        .max_worker_threads(3)
        .failure_policy(FailurePolicy::Abort)
        .build()
        .expect("valid config");

    let output = converter()
        .convert(path.as_path(), &config)
        .await
        .expect("conversion should succeed");

    assert_eq!(output.pages.len(), 15);
    for idx in 0..15 {
        let file = out.path().join(format!("attention_is_all_you_need_{idx:02}.png"));
        assert!(file.is_file(), "missing {}", file.display());
    }
    println!(
        "[dynamic] {} pages in {}ms on {} workers",
        output.stats.rendered_pages, output.stats.total_duration_ms, output.stats.worker_count
    );
}

/// Grayscale JPEG on the static pool, output in page order.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_convert_gray_jpeg_static_pool() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));

    let config = ConversionConfig::builder()
        .pages(vec![0, 1, 2, 3, 4, 5])
        .format(ImageFormat::Jpeg)
        .color_space(ColorSpace::Gray)
        .use_worker_threads(true)
        .worker_strategy(WorkerStrategy::Static)
        .max_worker_threads(2)
        .build()
        .expect("valid config");

    let output = converter()
        .convert(path.as_path(), &config)
        .await
        .expect("conversion should succeed");

    let order: Vec<usize> = output.pages.iter().map(|p| p.page_index).collect();
    assert_eq!(order, vec![0, 1, 2, 3, 4, 5]);
    for page in &output.pages {
        let bytes = page.content.as_deref().expect("content kept");
        assert_eq!(&bytes[..2], &[0xFF, 0xD8], "JPEG SOI marker");
        let img = image::load_from_memory(bytes).expect("decodes");
        assert_eq!(img.color(), image::ColorType::L8);
    }
}

#[tokio::test]
async fn test_convert_json_serialisable() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));

    let config = ConversionConfig::builder()
        .pages(vec![0])
        .build()
        .expect("valid config");
    let output = converter()
        .convert(path.as_path(), &config)
        .await
        .expect("conversion should succeed");

    let json = serde_json::to_string(&output).expect("serialises");
    let back: edgequake_pdf2img::ConversionOutput =
        serde_json::from_str(&json).expect("deserialises");
    assert_eq!(back, output);
}

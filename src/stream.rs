//! Streaming conversion API: emit pages as they complete.
//!
//! ## Why stream?
//!
//! Large documents take a while. A stream lets callers show partial results
//! immediately or hand pages to the next stage without waiting for the whole
//! batch to finish.
//!
//! Unlike [`Converter::convert`], which returns only after every page is
//! done, [`Converter::convert_stream`] yields each [`PageResult`] as soon as
//! the coordinator records it. With the dynamic pool pages may arrive out of
//! order; sort by `page_index` if order matters. A fatal error is delivered
//! as the last item.

use crate::config::ConversionConfig;
use crate::convert::Converter;
use crate::engine::DocumentSource;
use crate::error::Pdf2ImgError;
use crate::output::{ConversionState, PageResult};
use crate::progress::{ConversionEvent, EventKind};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::debug;

/// A boxed stream of page results.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<PageResult, Pdf2ImgError>> + Send>>;

impl Converter {
    /// Convert `source`, streaming pages as they are rendered.
    ///
    /// The conversion runs on a spawned task, so this must be called from
    /// within a tokio runtime. The stream ends when the conversion completes,
    /// pauses, or fails.
    ///
    /// A pause ends the stream exactly like completion does, with no marker
    /// item. Callers that pause must track it themselves and continue with
    /// [`Converter::resume`], whose pages arrive on the event bus rather than
    /// on this stream.
    pub fn convert_stream(
        self: &Arc<Self>,
        source: impl Into<DocumentSource>,
        config: &ConversionConfig,
    ) -> PageStream {
        let (tx, rx) = mpsc::unbounded_channel();

        let page_tx = tx.clone();
        let subscription = self.subscribe(EventKind::Page, move |event| {
            if let ConversionEvent::Page(page) = event {
                let _ = page_tx.send(Ok(page.clone()));
            }
        });

        let converter = Arc::clone(self);
        let source = source.into();
        let config = config.clone();
        tokio::spawn(async move {
            let outcome = converter.convert(source, &config).await;
            converter.unsubscribe(subscription);
            match outcome {
                Ok(output) if output.state == ConversionState::Paused => debug!(
                    "Stream ended on pause after {} of {} pages",
                    output.pages.len(),
                    output.targeted.len()
                ),
                Ok(output) => debug!("Stream finished with {} pages", output.pages.len()),
                Err(e) => {
                    let _ = tx.send(Err(e));
                }
            }
        });

        Box::pin(UnboundedReceiverStream::new(rx))
    }
}

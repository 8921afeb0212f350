//! Streaming classification API: emit records as documents finish.
//!
//! A directory of scanned contracts on a CPU-only vision model can take an
//! hour. [`classify_stream`] yields each [`ClassificationRecord`] as soon as
//! its document is done, so callers can print rows live or persist them
//! incrementally instead of waiting for the whole pass.
//!
//! Documents are processed strictly one at a time, in the order given, so
//! records arrive in that same order.

use crate::classify::Classifier;
use crate::output::ClassificationRecord;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;

/// A boxed stream of per-document records.
pub type RecordStream = Pin<Box<dyn Stream<Item = ClassificationRecord> + Send>>;

/// Classify `paths` sequentially, yielding one record per path.
///
/// Per-document progress events configured on the classifier fire as each
/// item is produced. Run-level events are the caller's concern (see
/// [`Classifier::classify_paths`]).
pub fn classify_stream(classifier: Arc<Classifier>, paths: Vec<PathBuf>) -> RecordStream {
    let total = paths.len();
    let s = stream::iter(paths.into_iter().enumerate()).then(move |(i, path)| {
        let classifier = Arc::clone(&classifier);
        async move {
            let index = i + 1;
            let callback = classifier.config().progress_callback.clone();
            if let Some(ref cb) = callback {
                let name = crate::pipeline::input::display_name(&path);
                cb.on_document_start(index, total, &name);
            }

            let record = classifier.classify_file(&path).await;

            if let Some(ref cb) = callback {
                cb.on_document_complete(index, total, &record);
            }
            record
        }
    });

    Box::pin(s)
}

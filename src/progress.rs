//! Progress-callback trait for per-document classification events.
//!
//! Inject an [`Arc<dyn ClassificationProgressCallback>`] via
//! [`crate::config::ClassifierConfigBuilder::progress_callback`] to receive
//! events as the orchestrator works through a directory.
//!
//! Documents are processed strictly one at a time, so events for a given run
//! arrive in order: `on_run_start`, then for each document
//! `on_document_start` followed by `on_document_complete`, then
//! `on_run_complete`.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfclassify::{ClassificationProgressCallback, ClassificationRecord, ClassifierConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct SentinelCounter {
//!     sentinels: AtomicUsize,
//! }
//!
//! impl ClassificationProgressCallback for SentinelCounter {
//!     fn on_document_complete(&self, _index: usize, _total: usize, record: &ClassificationRecord) {
//!         if record.result.is_sentinel() {
//!             self.sentinels.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let counter = Arc::new(SentinelCounter { sentinels: AtomicUsize::new(0) });
//!
//! let config = ClassifierConfig::builder()
//!     .progress_callback(counter as Arc<dyn ClassificationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{ClassificationRecord, RunSummary};
use std::sync::Arc;

/// Called by the orchestrator as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Indices are 1-based.
pub trait ClassificationProgressCallback: Send + Sync {
    /// Called once before the first document is opened.
    fn on_run_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called before a document is opened.
    fn on_document_start(&self, index: usize, total: usize, file_name: &str) {
        let _ = (index, total, file_name);
    }

    /// Called once a document has its result, sentinel or not.
    fn on_document_complete(&self, index: usize, total: usize, record: &ClassificationRecord) {
        let _ = (index, total, record);
    }

    /// Called once after every document has been attempted.
    fn on_run_complete(&self, summary: &RunSummary) {
        let _ = summary;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ClassificationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ClassifierConfig`].
pub type ProgressCallback = Arc<dyn ClassificationProgressCallback>;

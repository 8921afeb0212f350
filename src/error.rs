//! Error types for the edgequake-pdfclassify library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`ClassifyError`]: **Fatal**: the run cannot proceed at all (input
//!   directory missing, pdfium unavailable, report cannot be written).
//!   Returned as `Err(ClassifyError)` from the top-level `classify_*`
//!   functions.
//!
//! * [`DocumentFault`]: **Non-fatal**: a single document could not be
//!   classified substantively. Every fault maps to a sentinel
//!   [`Category`] and becomes that document's report row, so one bad file
//!   never aborts the rest of the pass.
//!
//! * [`InferenceError`]: raised by an [`crate::pipeline::llm::InferenceClient`]
//!   on transport, timeout or model failure. Wrapped into
//!   [`DocumentFault::Inference`] by the orchestrator.

use crate::category::Category;
use crate::output::ClassificationResult;
use crate::pipeline::extract::truncate_chars;
use std::path::PathBuf;
use thiserror::Error;

/// Longest corrupt-file detail kept in a report row.
pub const CORRUPT_DETAIL_CHARS: usize = 200;
/// Longest inference error kept in a report row.
pub const INFERENCE_DETAIL_CHARS: usize = 100;
/// Longest JSON parser message kept in a report row.
pub const JSON_DETAIL_CHARS: usize = 50;

/// All fatal errors returned by the edgequake-pdfclassify library.
///
/// Document-level failures use [`DocumentFault`] and are recorded as
/// sentinel rows rather than propagated here.
#[derive(Debug, Error)]
pub enum ClassifyError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input path does not exist.
    #[error("Input not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Input directory exists but could not be listed.
    #[error("Failed to read directory '{path}': {source}")]
    ReadDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the report file.
    #[error("Failed to write report '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Report rows could not be serialised.
    #[error("Failed to serialise report: {0}")]
    ReportSerialisation(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Install libpdfium system-wide, or place it next to the binary.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure raised by an inference backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InferenceError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Connection, DNS, TLS or body-decoding failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The completion contained no choice or no message content.
    #[error("model returned an empty completion")]
    EmptyResponse,

    /// An `edgequake-llm` provider reported an error.
    #[error("provider error: {0}")]
    Provider(String),
}

impl InferenceError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Timeouts, transport blips, rate limits (429) and server errors (5xx)
    /// are transient. Client errors such as a bad model name (404) or bad
    /// request (400) will fail identically on every attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            InferenceError::Timeout { .. } | InferenceError::Transport(_) => true,
            InferenceError::Status { status, .. } => *status == 429 || *status >= 500,
            InferenceError::EmptyResponse | InferenceError::Provider(_) => false,
        }
    }
}

/// A non-fatal, per-document failure.
///
/// Each variant resolves to exactly one sentinel [`Category`]:
///
/// | Variant | Sentinel |
/// |---------|----------|
/// | `Empty` | `VACIO` |
/// | `Corrupt` | `ARCHIVO_CORRUPTO` |
/// | `BelowTextThreshold` | `REVISION_MANUAL` |
/// | `MalformedResponse`, `InvalidJson`, `InvalidCategory` | `REVISION_MANUAL` |
/// | `Inference`, `UnparseableResponse`, `PipelineFault` | `ERROR` |
///
/// `REVISION_MANUAL` means the model was reachable but unhelpful (or there
/// was nothing worth sending); `ERROR` means the pipeline itself misbehaved.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DocumentFault {
    /// The document has zero pages.
    #[error("document has no pages")]
    Empty,

    /// The file could not be opened, decrypted or read.
    #[error("{detail}")]
    Corrupt { detail: String },

    /// Too little text to classify; most likely a scan without a text layer.
    #[error("document is an image without a text layer ({chars} of {min} required characters)")]
    BelowTextThreshold { chars: usize, min: usize },

    /// The inference backend failed.
    #[error("inference failed: {0}")]
    Inference(InferenceError),

    /// The response contained no `{ … }` object.
    #[error("model did not return valid JSON")]
    MalformedResponse,

    /// The response contained braces but was not valid JSON.
    #[error("invalid JSON syntax: {detail}")]
    InvalidJson { detail: String },

    /// Broken JSON syntax where the strategy treats it as a pipeline error.
    #[error("invalid JSON syntax: {detail}")]
    UnparseableResponse { detail: String },

    /// The model answered with a label outside the closed set.
    #[error("model answered with unknown category '{label}'")]
    InvalidCategory { label: String },

    /// Anything the pipeline did not anticipate.
    #[error("pipeline fault: {0}")]
    PipelineFault(String),
}

impl DocumentFault {
    /// Build a [`DocumentFault::Corrupt`] with the detail truncated for reporting.
    pub fn corrupt(detail: impl AsRef<str>) -> Self {
        DocumentFault::Corrupt {
            detail: truncate_chars(detail.as_ref(), CORRUPT_DETAIL_CHARS),
        }
    }

    /// Build a [`DocumentFault::InvalidJson`] with the parser message truncated.
    pub fn invalid_json(detail: impl AsRef<str>) -> Self {
        DocumentFault::InvalidJson {
            detail: truncate_chars(detail.as_ref(), JSON_DETAIL_CHARS),
        }
    }

    /// The sentinel category this fault resolves to.
    pub fn sentinel(&self) -> Category {
        match self {
            DocumentFault::Empty => Category::Vacio,
            DocumentFault::Corrupt { .. } => Category::ArchivoCorrupto,
            DocumentFault::BelowTextThreshold { .. }
            | DocumentFault::MalformedResponse
            | DocumentFault::InvalidJson { .. }
            | DocumentFault::InvalidCategory { .. } => Category::RevisionManual,
            DocumentFault::Inference(_)
            | DocumentFault::UnparseableResponse { .. }
            | DocumentFault::PipelineFault(_) => Category::Error,
        }
    }

    /// The terminal result for a document that hit this fault: the
    /// sentinel category, score 0.0 and the fault description as evidence.
    pub fn into_result(self) -> ClassificationResult {
        let evidence = match &self {
            DocumentFault::Inference(_)
            | DocumentFault::UnparseableResponse { .. }
            | DocumentFault::PipelineFault(_) => {
                truncate_chars(&self.to_string(), INFERENCE_DETAIL_CHARS)
            }
            _ => self.to_string(),
        };
        ClassificationResult::new(self.sentinel(), 0.0, evidence)
    }
}

impl From<InferenceError> for DocumentFault {
    fn from(e: InferenceError) -> Self {
        DocumentFault::Inference(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faults_map_to_sentinels() {
        assert_eq!(DocumentFault::Empty.sentinel(), Category::Vacio);
        assert_eq!(
            DocumentFault::corrupt("bad xref").sentinel(),
            Category::ArchivoCorrupto
        );
        assert_eq!(
            DocumentFault::BelowTextThreshold { chars: 49, min: 50 }.sentinel(),
            Category::RevisionManual
        );
        assert_eq!(
            DocumentFault::MalformedResponse.sentinel(),
            Category::RevisionManual
        );
        assert_eq!(
            DocumentFault::Inference(InferenceError::EmptyResponse).sentinel(),
            Category::Error
        );
        assert_eq!(
            DocumentFault::PipelineFault("boom".into()).sentinel(),
            Category::Error
        );
    }

    #[test]
    fn malformed_response_evidence_is_fixed() {
        let r = DocumentFault::MalformedResponse.into_result();
        assert_eq!(r.category(), Category::RevisionManual);
        assert_eq!(r.score(), 0.0);
        assert_eq!(r.evidence(), "model did not return valid JSON");
    }

    #[test]
    fn corrupt_detail_is_truncated() {
        let long = "x".repeat(1000);
        match DocumentFault::corrupt(&long) {
            DocumentFault::Corrupt { detail } => {
                assert_eq!(detail.chars().count(), CORRUPT_DETAIL_CHARS)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn inference_evidence_is_truncated() {
        let e = InferenceError::Transport("y".repeat(500));
        let r = DocumentFault::from(e).into_result();
        assert_eq!(r.category(), Category::Error);
        assert_eq!(r.evidence().chars().count(), INFERENCE_DETAIL_CHARS);
        assert!(r.evidence().starts_with("inference failed: transport error"));
    }

    #[test]
    fn unparseable_response_is_an_error_cut_at_one_hundred_chars() {
        let r = DocumentFault::UnparseableResponse { detail: "z".repeat(300) }.into_result();
        assert_eq!(r.category(), Category::Error);
        assert_eq!(r.score(), 0.0);
        assert_eq!(r.evidence().chars().count(), INFERENCE_DETAIL_CHARS);
        assert!(r.evidence().starts_with("invalid JSON syntax: zzz"));
    }

    #[test]
    fn retryable_classification() {
        assert!(InferenceError::Timeout { secs: 5 }.is_retryable());
        assert!(InferenceError::Transport("reset".into()).is_retryable());
        assert!(InferenceError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(InferenceError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(!InferenceError::Status { status: 404, body: String::new() }.is_retryable());
        assert!(!InferenceError::EmptyResponse.is_retryable());
    }

    #[test]
    fn invalid_config_display() {
        let e = ClassifyError::InvalidConfig("DPI must be 72–400, got 10".into());
        assert!(e.to_string().contains("DPI"));
    }

    #[test]
    fn input_not_found_display() {
        let e = ClassifyError::InputNotFound {
            path: PathBuf::from("/nope"),
        };
        assert!(e.to_string().contains("/nope"));
    }
}

//! # edgequake-pdfclassify
//!
//! Classify administrative PDF documents into five fixed categories with a
//! local or hosted language model.
//!
//! ## Why this crate?
//!
//! Public-sector inboxes fill up with complaints, contracts, resolutions,
//! technical reports and internal memos, all as PDF, many of them scans.
//! Keyword rules break on the first unusual layout; a model reading a
//! bounded excerpt (or the first page image) sorts them reliably. The hard
//! part is that the model's answer is untrusted free text, so this crate
//! puts a strict normalizer between the model and the report: every
//! document gets exactly one label from a closed set and a score in
//! `[0, 1]`, whatever the model said.
//!
//! ## Pipeline Overview
//!
//! ```text
//! directory
//!  │
//!  ├─ 1. Input      list *.pdf in name order
//!  ├─ 2. Extract    sample text (text-only) or page 1 image + text (hybrid)
//!  ├─ 3. Screen     empty / unreadable / too little text → sentinel, no model call
//!  ├─ 4. Infer      one chat-completion call per document, retried on 429/5xx
//!  ├─ 5. Normalize  fences, aliases, plurals, "0,87" → bounded result
//!  └─ 6. Report     file, category, score, evidence → CSV or JSON
//! ```
//!
//! ## Categories
//!
//! `QUEJA_RECLAMO`, `CONTRATO`, `RESOLUCION_ADMINISTRATIVA`,
//! `INFORME_TECNICO`, `COMUNICACION_INTERNA`, plus the sentinels
//! `REVISION_MANUAL`, `ERROR`, `VACIO` and `ARCHIVO_CORRUPTO`. See
//! [`category`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfclassify::{classify_to_file, ClassifierConfig, ReportFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Talks to Ollama at OLLAMA_HOST, or http://localhost:11434/v1
//!     let config = ClassifierConfig::default();
//!     let summary = classify_to_file("inbox/", "report.csv", ReportFormat::Csv, &config).await?;
//!     eprintln!("{} documents, {} need review",
//!         summary.total_documents,
//!         summary.sentinel_documents);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfclassify` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdfclassify = { version = "0.1", default-features = false }
//! ```
//!
//! ## Choosing a Mode
//!
//! | Mode | Default model | Input to the model | Best for |
//! |------|---------------|--------------------|----------|
//! | `TextOnly` | `qwen2.5-coder:7b` | pages 1, 2 (head) and last, ≤ 4000 chars | digital PDFs |
//! | `Hybrid` | `llama3.2-vision` | page 1 JPEG + page 1 text, ≤ 2000 chars | scans, letterheads, stamps |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod category;
pub mod classify;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use category::{Category, CategoryDefinition, DEFINITIONS};
pub use classify::{classify_directory, classify_to_file, Classifier, Completion, Stage};
pub use config::{ClassificationMode, ClassifierConfig, ClassifierConfigBuilder};
pub use error::{ClassifyError, DocumentFault, InferenceError};
pub use output::{ClassificationRecord, ClassificationResult, ClassificationRun, RunSummary};
pub use pipeline::document::PageSource;
pub use pipeline::extract::{ExtractedContent, ExtractionOutcome};
pub use pipeline::llm::{HttpInferenceClient, InferenceClient, ProviderInferenceClient};
pub use pipeline::normalize::{normalize, NormalizeOptions, ParseFailure};
pub use pipeline::strategy::{ClassificationRequest, ClassificationStrategy, InferenceOptions};
pub use progress::{ClassificationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use report::{write_report, ReportFormat};
pub use stream::{classify_stream, RecordStream};

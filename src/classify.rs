//! Per-document orchestration and whole-directory entry points.
//!
//! A [`Classifier`] owns the configuration, the strategy selected by
//! `config.mode` and an inference client. It walks each document through a
//! fixed sequence of [`Stage`]s and always comes back with exactly one
//! [`ClassificationRecord`]; document-level failures become sentinel rows,
//! never errors.
//!
//! ```text
//! Pending ──▶ Extracting ──┬──▶ ShortCircuited ─────────────────┬──▶ Done
//!                          └──▶ Inferring ──▶ Normalizing ───────┘
//! ```
//!
//! `ShortCircuited` covers empty files, unreadable files and text-only
//! excerpts below the minimum length: none of them reach the model.

use crate::config::{ClassificationMode, ClassifierConfig};
use crate::error::{ClassifyError, DocumentFault};
use crate::output::{ClassificationRecord, ClassificationResult, ClassificationRun, RunSummary};
use crate::pipeline::document::{check_pdfium, open_and_extract, PageSource};
use crate::pipeline::extract::ExtractionOutcome;
use crate::pipeline::input::{discover_pdfs, display_name};
use crate::pipeline::llm::{client_for, infer_with_retry, InferenceClient};
use crate::pipeline::normalize::normalize;
use crate::pipeline::strategy::{strategy_for, ClassificationStrategy};
use crate::report::{write_report, ReportFormat};
use crate::stream::classify_stream;
use futures::StreamExt;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where a document is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pending,
    Extracting,
    ShortCircuited,
    Inferring,
    Normalizing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Pending => "pending",
            Stage::Extracting => "extracting",
            Stage::ShortCircuited => "short-circuited",
            Stage::Inferring => "inferring",
            Stage::Normalizing => "normalizing",
            Stage::Done => "done",
        };
        f.write_str(s)
    }
}

fn enter(file_name: &str, stage: Stage) {
    debug!("[{}] {}", file_name, stage);
}

/// The result of finishing one document, before it is tied to a path.
#[derive(Debug, Clone)]
pub struct Completion {
    pub result: ClassificationResult,
    /// Whether the model was called.
    pub inferred: bool,
}

impl Completion {
    fn short_circuit(file_name: &str, fault: DocumentFault) -> Self {
        enter(file_name, Stage::ShortCircuited);
        info!("{}: {} → {}", file_name, fault, fault.sentinel());
        Self {
            result: fault.into_result(),
            inferred: false,
        }
    }
}

/// Classifies documents one at a time.
pub struct Classifier {
    config: ClassifierConfig,
    strategy: Arc<dyn ClassificationStrategy>,
    client: Arc<dyn InferenceClient>,
}

impl Classifier {
    /// Build a classifier whose client is resolved from `config`.
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifyError> {
        let client = client_for(&config)?;
        Ok(Self::with_client(config, client))
    }

    /// Build a classifier around an explicit client (mocks, custom backends).
    pub fn with_client(config: ClassifierConfig, client: Arc<dyn InferenceClient>) -> Self {
        let strategy = strategy_for(&config);
        Self {
            config,
            strategy,
            client,
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn mode(&self) -> ClassificationMode {
        self.strategy.mode()
    }

    /// Classify the PDF at `path`. Never fails; problems become sentinels.
    pub async fn classify_file(&self, path: &Path) -> ClassificationRecord {
        let started = Instant::now();
        let file_name = display_name(path);
        enter(&file_name, Stage::Pending);
        enter(&file_name, Stage::Extracting);

        let strategy = Arc::clone(&self.strategy);
        let extracted = open_and_extract(path, self.config.password.as_deref(), move |source| {
            strategy.extract(source)
        })
        .await;

        let completion = match extracted {
            Ok(outcome) => self.complete(&file_name, outcome).await,
            Err(fault @ (DocumentFault::Empty | DocumentFault::Corrupt { .. })) => {
                self.complete(&file_name, fault.into()).await
            }
            Err(fault) => Completion::short_circuit(&file_name, fault),
        };

        self.record(path.to_path_buf(), file_name, completion, started)
    }

    /// Classify an already-open document.
    pub async fn classify_source(
        &self,
        file_name: &str,
        source: &dyn PageSource,
    ) -> ClassificationRecord {
        let started = Instant::now();
        enter(file_name, Stage::Pending);
        enter(file_name, Stage::Extracting);
        let outcome = self.extract(source);
        let completion = self.complete(file_name, outcome).await;
        self.record(PathBuf::from(file_name), file_name.to_string(), completion, started)
    }

    /// Run the strategy's extraction policy against `source`.
    pub fn extract(&self, source: &dyn PageSource) -> ExtractionOutcome {
        self.strategy.extract(source)
    }

    /// Take an extraction outcome the rest of the way to a result.
    pub async fn complete(&self, file_name: &str, outcome: ExtractionOutcome) -> Completion {
        let content = match outcome.into_content() {
            Ok(content) => content,
            Err(fault) => return Completion::short_circuit(file_name, fault),
        };

        if let Err(fault) = self.strategy.screen(&content) {
            return Completion::short_circuit(file_name, fault);
        }

        let request = match self.strategy.build_request(content) {
            Ok(request) => request,
            Err(fault) => {
                warn!("{}: {}", file_name, fault);
                return Completion {
                    result: fault.into_result(),
                    inferred: false,
                };
            }
        };

        enter(file_name, Stage::Inferring);
        let raw = infer_with_retry(
            self.client.as_ref(),
            &request,
            self.config.max_retries,
            self.config.retry_backoff_ms,
        )
        .await;

        let result = match raw {
            Ok(raw) => {
                enter(file_name, Stage::Normalizing);
                normalize(&raw, &self.strategy.normalize_options())
            }
            Err(e) => {
                warn!("{}: inference failed: {}", file_name, e);
                DocumentFault::from(e).into_result()
            }
        };

        Completion {
            result,
            inferred: true,
        }
    }

    fn record(
        &self,
        path: PathBuf,
        file_name: String,
        completion: Completion,
        started: Instant,
    ) -> ClassificationRecord {
        enter(&file_name, Stage::Done);
        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "{}: {} ({:.2}) in {}ms",
            file_name,
            completion.result.category(),
            completion.result.score(),
            duration_ms
        );
        ClassificationRecord {
            file_name,
            path,
            result: completion.result,
            inferred: completion.inferred,
            duration_ms,
        }
    }

    /// Classify `paths` in order and tally the pass.
    ///
    /// Fires every progress event configured on the classifier.
    pub async fn classify_paths(self: Arc<Self>, paths: Vec<PathBuf>) -> ClassificationRun {
        let started = Instant::now();
        let callback = self.config.progress_callback.clone();
        if let Some(ref cb) = callback {
            cb.on_run_start(paths.len());
        }

        let records: Vec<ClassificationRecord> = classify_stream(self, paths).collect().await;

        let summary =
            RunSummary::from_records(&records, started.elapsed().as_millis() as u64);
        if let Some(ref cb) = callback {
            cb.on_run_complete(&summary);
        }
        info!(
            "Classified {} document(s): {} substantive, {} sentinel, {} model call(s)",
            summary.total_documents,
            summary.classified_documents(),
            summary.sentinel_documents,
            summary.inference_calls
        );

        ClassificationRun { records, summary }
    }

    /// Classify every PDF directly inside `dir`.
    pub async fn classify_directory(
        self: Arc<Self>,
        dir: &Path,
    ) -> Result<ClassificationRun, ClassifyError> {
        let paths = discover_pdfs(dir)?;
        if paths.is_empty() {
            warn!("No PDF files found in {}", dir.display());
        }
        Ok(self.classify_paths(paths).await)
    }
}

/// Classify every PDF directly inside `dir`.
///
/// This is the primary library entry point. pdfium is bound once up front
/// so a missing library is a fatal error rather than a column of
/// `ARCHIVO_CORRUPTO` rows.
///
/// # Errors
/// Returns `Err(ClassifyError)` only for fatal errors: missing or
/// unreadable directory, invalid provider configuration, pdfium missing.
pub async fn classify_directory(
    dir: impl AsRef<Path>,
    config: &ClassifierConfig,
) -> Result<ClassificationRun, ClassifyError> {
    let dir = dir.as_ref();
    info!("Starting classification of {}", dir.display());

    let paths = discover_pdfs(dir)?;
    if paths.is_empty() {
        warn!("No PDF files found in {}", dir.display());
        return Ok(ClassificationRun {
            records: Vec::new(),
            summary: RunSummary::default(),
        });
    }

    check_pdfium().await?;
    let classifier = Arc::new(Classifier::new(config.clone())?);
    Ok(classifier.classify_paths(paths).await)
}

/// Classify `dir` and write the report to `output`.
///
/// No report is written when the directory holds no PDFs.
pub async fn classify_to_file(
    dir: impl AsRef<Path>,
    output: impl AsRef<Path>,
    format: ReportFormat,
    config: &ClassifierConfig,
) -> Result<RunSummary, ClassifyError> {
    let run = classify_directory(dir, config).await?;
    if run.records.is_empty() {
        return Ok(run.summary);
    }

    let output = output.as_ref();
    write_report(&run.records, output, format)?;
    info!("Wrote {} row(s) to {}", run.records.len(), output.display());
    Ok(run.summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_display() {
        assert_eq!(Stage::ShortCircuited.to_string(), "short-circuited");
        assert_eq!(Stage::Done.to_string(), "done");
    }

    #[tokio::test]
    async fn empty_directory_yields_empty_run() {
        let dir = tempfile::tempdir().unwrap();
        let run = classify_directory(dir.path(), &ClassifierConfig::default())
            .await
            .unwrap();
        assert!(run.records.is_empty());
        assert_eq!(run.summary.total_documents, 0);
    }

    #[tokio::test]
    async fn empty_directory_writes_no_report() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report.csv");
        let summary = classify_to_file(dir.path(), &out, ReportFormat::Csv, &ClassifierConfig::default())
            .await
            .unwrap();
        assert_eq!(summary.total_documents, 0);
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn missing_directory_is_fatal() {
        let err = classify_directory("/no/such/dir", &ClassifierConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifyError::InputNotFound { .. }));
    }
}

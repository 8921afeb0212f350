//! Result types produced by a classification run.

use crate::category::Category;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The outcome for one document.
///
/// Immutable once built: the constructor enforces `0.0 <= score <= 1.0`, so
/// every value handed to a report satisfies the bound regardless of what the
/// model returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    category: Category,
    score: f64,
    evidence: String,
}

impl ClassificationResult {
    /// Build a result, clamping `score` into `[0.0, 1.0]` (NaN becomes 0.0).
    pub fn new(category: Category, score: f64, evidence: impl Into<String>) -> Self {
        let score = if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        };
        Self {
            category,
            score,
            evidence: evidence.into(),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn evidence(&self) -> &str {
        &self.evidence
    }

    /// `true` when the category is one of the sentinel outcomes.
    pub fn is_sentinel(&self) -> bool {
        self.category.is_sentinel()
    }
}

/// One report row: a document and its classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRecord {
    /// File name shown in the report (no directory).
    pub file_name: String,
    /// Full path the document was read from.
    pub path: PathBuf,
    pub result: ClassificationResult,
    /// Whether an inference call was made for this document.
    pub inferred: bool,
    /// Wall-clock time spent on the document, milliseconds.
    pub duration_ms: u64,
}

/// Aggregate counts for a completed pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_documents: usize,
    /// Documents per label, in label order.
    pub by_category: BTreeMap<Category, usize>,
    /// Documents that reached the inference stage.
    pub inference_calls: usize,
    /// Documents that ended in a sentinel outcome.
    pub sentinel_documents: usize,
    pub total_duration_ms: u64,
}

impl RunSummary {
    /// Tally a slice of records.
    pub fn from_records(records: &[ClassificationRecord], total_duration_ms: u64) -> Self {
        let mut summary = RunSummary {
            total_documents: records.len(),
            total_duration_ms,
            ..Default::default()
        };
        for record in records {
            *summary
                .by_category
                .entry(record.result.category())
                .or_insert(0) += 1;
            if record.inferred {
                summary.inference_calls += 1;
            }
            if record.result.is_sentinel() {
                summary.sentinel_documents += 1;
            }
        }
        summary
    }

    /// Documents that received a substantive category.
    pub fn classified_documents(&self) -> usize {
        self.total_documents - self.sentinel_documents
    }
}

/// Everything produced by [`crate::classify::classify_directory`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRun {
    /// One record per discovered document, in discovery order.
    pub records: Vec<ClassificationRecord>,
    pub summary: RunSummary,
}

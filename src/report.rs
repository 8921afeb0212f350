//! Report sink: one row per document, written once after the pass.
//!
//! Every format carries the same four columns in the same order:
//! `file`, `category`, `score`, `evidence`.
//!
//! The file is written to a temporary sibling and renamed into place, so an
//! interrupted run never leaves a half-written report where the previous
//! one used to be.

use crate::category::Category;
use crate::error::ClassifyError;
use crate::output::ClassificationRecord;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use tempfile::NamedTempFile;

/// Column names, in order.
pub const COLUMNS: [&str; 4] = ["file", "category", "score", "evidence"];

/// On-disk report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Comma-separated with a header row. (default)
    #[default]
    Csv,
    /// A JSON array of row objects.
    Json,
}

impl ReportFormat {
    /// Infer the format from a file extension; anything but `.json` is CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ReportFormat::Json,
            _ => ReportFormat::Csv,
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("unknown report format '{other}' (expected csv or json)")),
        }
    }
}

/// One serialised report row. Field order defines column order.
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    file: &'a str,
    category: Category,
    score: f64,
    evidence: &'a str,
}

impl<'a> From<&'a ClassificationRecord> for ReportRow<'a> {
    fn from(record: &'a ClassificationRecord) -> Self {
        Self {
            file: &record.file_name,
            category: record.result.category(),
            score: record.result.score(),
            evidence: record.result.evidence(),
        }
    }
}

/// Render `records` in `format` into memory.
pub fn render_report(
    records: &[ClassificationRecord],
    format: ReportFormat,
) -> Result<Vec<u8>, ClassifyError> {
    match format {
        ReportFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            if records.is_empty() {
                writer
                    .write_record(COLUMNS)
                    .map_err(|e| ClassifyError::ReportSerialisation(e.to_string()))?;
            }
            for record in records {
                writer
                    .serialize(ReportRow::from(record))
                    .map_err(|e| ClassifyError::ReportSerialisation(e.to_string()))?;
            }
            writer
                .into_inner()
                .map_err(|e| ClassifyError::ReportSerialisation(e.to_string()))
        }
        ReportFormat::Json => {
            let rows: Vec<ReportRow<'_>> = records.iter().map(ReportRow::from).collect();
            let mut bytes = serde_json::to_vec_pretty(&rows)
                .map_err(|e| ClassifyError::ReportSerialisation(e.to_string()))?;
            bytes.push(b'\n');
            Ok(bytes)
        }
    }
}

/// Write the report to `path` atomically.
pub fn write_report(
    records: &[ClassificationRecord],
    path: &Path,
    format: ReportFormat,
) -> Result<(), ClassifyError> {
    let bytes = render_report(records, format)?;

    let write_err = |source: std::io::Error| ClassifyError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(&bytes).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ClassificationResult;
    use std::path::PathBuf;

    fn record(name: &str, category: Category, score: f64, evidence: &str) -> ClassificationRecord {
        ClassificationRecord {
            file_name: name.into(),
            path: PathBuf::from(name),
            result: ClassificationResult::new(category, score, evidence),
            inferred: true,
            duration_ms: 0,
        }
    }

    #[test]
    fn csv_has_header_and_quoted_evidence() {
        let rows = vec![
            record("a.pdf", Category::Contrato, 0.91, "Cláusulas, Contratante"),
            record("b.pdf", Category::Vacio, 0.0, "document has no pages"),
        ];
        let out = String::from_utf8(render_report(&rows, ReportFormat::Csv).unwrap()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "file,category,score,evidence");
        assert_eq!(lines[1], "a.pdf,CONTRATO,0.91,\"Cláusulas, Contratante\"");
        assert_eq!(lines[2], "b.pdf,VACIO,0.0,document has no pages");
    }

    #[test]
    fn empty_csv_still_has_header() {
        let out = String::from_utf8(render_report(&[], ReportFormat::Csv).unwrap()).unwrap();
        assert_eq!(out.trim_end(), "file,category,score,evidence");
    }

    #[test]
    fn json_rows_keep_column_order() {
        let rows = vec![record("a.pdf", Category::InformeTecnico, 0.5, "Conclusiones")];
        let out = String::from_utf8(render_report(&rows, ReportFormat::Json).unwrap()).unwrap();
        let file = out.find("\"file\"").unwrap();
        let category = out.find("\"category\"").unwrap();
        let score = out.find("\"score\"").unwrap();
        let evidence = out.find("\"evidence\"").unwrap();
        assert!(file < category && category < score && score < evidence);

        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["category"], "INFORME_TECNICO");
    }

    #[test]
    fn write_is_atomic_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.csv");
        write_report(&[record("a.pdf", Category::Contrato, 1.0, "")], &path, ReportFormat::Csv)
            .unwrap();
        write_report(&[record("b.pdf", Category::Error, 0.0, "x")], &path, ReportFormat::Csv)
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("b.pdf"));
        assert!(!text.contains("a.pdf"));
        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn format_from_path_and_str() {
        assert_eq!(ReportFormat::from_path(Path::new("r.JSON")), ReportFormat::Json);
        assert_eq!(ReportFormat::from_path(Path::new("r.csv")), ReportFormat::Csv);
        assert_eq!(ReportFormat::from_path(Path::new("r")), ReportFormat::Csv);
        assert_eq!("Json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert!("xlsx".parse::<ReportFormat>().is_err());
    }
}

//! Input discovery: turn user-supplied paths into an ordered document list.
//!
//! A directory is listed non-recursively and filtered to files whose
//! extension is `pdf` in any case. Explicit file arguments are taken as
//! given; a mislabelled file still gets a report row (`ARCHIVO_CORRUPTO`)
//! instead of silently vanishing.
//!
//! Order is by file name so two passes over the same directory produce
//! reports that diff cleanly.

use crate::error::ClassifyError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// `true` when `path` has a `.pdf` extension, case-insensitively.
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// List the PDF files directly inside `dir`, sorted by file name.
pub fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>, ClassifyError> {
    if !dir.exists() {
        return Err(ClassifyError::InputNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|source| ClassifyError::ReadDirFailed {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut pdfs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ClassifyError::ReadDirFailed {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && has_pdf_extension(&path) {
            pdfs.push(path);
        } else {
            debug!("Skipping {}", path.display());
        }
    }

    pdfs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    info!("Found {} PDF(s) in {}", pdfs.len(), dir.display());
    Ok(pdfs)
}

/// Expand a mix of files and directories into one document list.
///
/// Directories contribute their sorted PDFs; files are kept in argument order.
pub fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, ClassifyError> {
    let mut documents = Vec::new();
    for input in inputs {
        if input.is_dir() {
            documents.extend(discover_pdfs(input)?);
        } else if input.is_file() {
            documents.push(input.clone());
        } else {
            return Err(ClassifyError::InputNotFound {
                path: input.clone(),
            });
        }
    }
    Ok(documents)
}

/// File name shown in reports, falling back to the full path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

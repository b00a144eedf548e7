//! Directory scanning for report files.

use super::{Assembler, Assembly};
use crate::errors::{AnalysisError, AnalysisResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Regular files directly inside `dir`, sorted by file name.
pub fn discover(dir: &Path) -> AnalysisResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| AnalysisError::io(dir.display().to_string(), e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AnalysisError::io(dir.display().to_string(), e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    tracing::debug!(dir = %dir.display(), files = files.len(), "discovered files");
    Ok(files)
}

/// Reads a report as text; invalid UTF-8 is replaced rather than rejected.
pub fn read_report(path: &Path) -> AnalysisResult<String> {
    let bytes = fs::read(path).map_err(|e| AnalysisError::io(path.display().to_string(), e))?;
    Ok(match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            tracing::debug!(file = %path.display(), "report is not valid UTF-8; decoding lossily");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    })
}

/// Parses every report in `dir`, one file at a time.
///
/// Fails with [`AnalysisError::EmptyDataset`] when no record survives.
pub fn load_dir(assembler: &Assembler, dir: &Path) -> AnalysisResult<Assembly> {
    let mut assembly = assembler.start();
    for path in discover(dir)? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let text = read_report(&path)?;
        assembler.add_file(&mut assembly, &name, &text)?;
    }

    tracing::info!(
        dir = %dir.display(),
        records = assembly.dataset().len(),
        files = assembly.files_parsed(),
        skipped = assembly.files_skipped(),
        diagnostics = assembly.diagnostics().len(),
        "loaded dataset"
    );
    assembly.require_records(dir.display().to_string())
}

//! Recoverable parse findings.
//!
//! Nothing here aborts a batch by default: each finding is recorded, logged and
//! the offending file, segment, line or record is skipped. A [`Diagnostics`]
//! sink built with `strict` or a `fatal` list turns selected warn-level
//! findings into [`AnalysisError::Fatal`].

use super::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Filename does not match any configured pattern.
    UnrecognizedFile,
    /// Segment without a header, or with a bad workload/trial.
    UnparsableSegment,
    /// Recognized metric whose value does not parse.
    UnparsableMetricLine,
    /// Segment without the mandatory metric(s).
    MissingMandatoryMetric,
    /// Same trial identity reported twice.
    DuplicateRecordKey,
}

impl DiagnosticKind {
    pub const ALL: [DiagnosticKind; 5] = [
        DiagnosticKind::UnrecognizedFile,
        DiagnosticKind::UnparsableSegment,
        DiagnosticKind::UnparsableMetricLine,
        DiagnosticKind::MissingMandatoryMetric,
        DiagnosticKind::DuplicateRecordKey,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::UnrecognizedFile => codes::W_FILE_UNRECOGNIZED,
            Self::UnparsableSegment => codes::W_SEGMENT_UNPARSABLE,
            Self::UnparsableMetricLine => codes::W_METRIC_LINE_UNPARSABLE,
            Self::MissingMandatoryMetric => codes::W_METRIC_MISSING,
            Self::DuplicateRecordKey => codes::W_RECORD_DUPLICATE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnrecognizedFile => "unrecognized_file",
            Self::UnparsableSegment => "unparsable_segment",
            Self::UnparsableMetricLine => "unparsable_metric_line",
            Self::MissingMandatoryMetric => "missing_mandatory_metric",
            Self::DuplicateRecordKey => "duplicate_record_key",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Note,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub code: &'static str,
    pub severity: Severity,
    pub source: String,
    pub message: String,
    pub context: serde_json::Value,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.code(),
            severity: Severity::Warn,
            source: "unknown".into(),
            message: message.into(),
            context: serde_json::json!({}),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }

    pub fn format_terminal(&self) -> String {
        let mut s = format!(
            "{}: [{}] {}\n",
            self.severity.as_str(),
            self.code,
            self.message
        );
        s.push_str(&format!("  source: {}\n", self.source));

        if self.context.as_object().is_some_and(|o| !o.is_empty()) {
            if let Ok(json) = serde_json::to_string_pretty(&self.context) {
                for line in json.lines() {
                    s.push_str(&format!("  {}\n", line));
                }
            }
        }
        s
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format_terminal())
    }
}

impl std::error::Error for Diagnostic {}

/// Collects diagnostics for one analysis pass and applies the strictness policy.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    strict: bool,
    fatal: Vec<DiagnosticKind>,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(strict: bool, fatal: &[DiagnosticKind]) -> Self {
        Self {
            strict,
            fatal: fatal.to_vec(),
            entries: Vec::new(),
        }
    }

    /// Records `diag`. Returns `Err` when the policy upgrades it to fatal;
    /// notes are never upgraded.
    pub fn report(&mut self, mut diag: Diagnostic) -> AnalysisResult<()> {
        match diag.severity {
            Severity::Note => {
                tracing::debug!(code = diag.code, source = %diag.source, "{}", diag.message)
            }
            _ => tracing::warn!(code = diag.code, source = %diag.source, "{}", diag.message),
        }

        if self.is_fatal(&diag) {
            diag.severity = Severity::Error;
            self.entries.push(diag.clone());
            return Err(AnalysisError::Fatal(Box::new(diag)));
        }
        self.entries.push(diag);
        Ok(())
    }

    fn is_fatal(&self, diag: &Diagnostic) -> bool {
        diag.severity >= Severity::Warn && (self.strict || self.fatal.contains(&diag.kind))
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of warn-or-worse entries.
    pub fn warning_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity >= Severity::Warn)
            .count()
    }

    pub fn count_by_kind(&self) -> BTreeMap<DiagnosticKind, usize> {
        let mut counts = BTreeMap::new();
        for d in &self.entries {
            *counts.entry(d.kind).or_insert(0) += 1;
        }
        counts
    }
}

pub mod codes {
    pub const W_FILE_UNRECOGNIZED: &str = "W_FILE_UNRECOGNIZED";
    pub const W_SEGMENT_UNPARSABLE: &str = "W_SEGMENT_UNPARSABLE";
    pub const W_METRIC_LINE_UNPARSABLE: &str = "W_METRIC_LINE_UNPARSABLE";
    pub const W_METRIC_MISSING: &str = "W_METRIC_MISSING";
    pub const W_RECORD_DUPLICATE: &str = "W_RECORD_DUPLICATE";
}

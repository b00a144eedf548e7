use crate::config::{AnalysisConfig, PhaseMetrics};
use crate::errors::{AnalysisResult, Diagnostic, DiagnosticKind, Diagnostics};
use crate::model::{MetricField, Phase, RunRecord, ValueKind};
use crate::parse::{LineClass, MetricClassifier, Segment, SegmentResult};
use std::collections::BTreeMap;

/// Turns segments into records using the metric set of each segment's phase.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    load: MetricClassifier,
    run: MetricClassifier,
    mandatory: Vec<MetricField>,
}

impl RecordBuilder {
    pub fn new(phases: &PhaseMetrics, mandatory: &[MetricField]) -> Self {
        Self {
            load: MetricClassifier::new(&phases.load),
            run: MetricClassifier::new(&phases.run),
            mandatory: mandatory.to_vec(),
        }
    }

    pub fn from_config(cfg: &AnalysisConfig) -> Self {
        Self::new(&cfg.phases, &cfg.mandatory)
    }

    fn classifier(&self, phase: Phase) -> &MetricClassifier {
        match phase {
            Phase::Load => &self.load,
            Phase::Run => &self.run,
        }
    }

    /// Builds one record per accepted segment. Rejected segments, unparsable
    /// metric lines and segments missing a mandatory metric are reported to
    /// `diags` and skipped.
    pub fn build<'a>(
        &self,
        system: &str,
        nodes: u32,
        source: &str,
        segments: impl IntoIterator<Item = SegmentResult<'a>>,
        diags: &mut Diagnostics,
    ) -> AnalysisResult<Vec<RunRecord>> {
        let mut records = Vec::new();
        for item in segments {
            match item {
                Ok(segment) => {
                    if let Some(record) =
                        self.build_segment(system, nodes, source, &segment, diags)?
                    {
                        records.push(record);
                    }
                }
                Err(diag) => diags.report(diag.with_source(source))?,
            }
        }
        Ok(records)
    }

    pub fn build_segment(
        &self,
        system: &str,
        nodes: u32,
        source: &str,
        segment: &Segment<'_>,
        diags: &mut Diagnostics,
    ) -> AnalysisResult<Option<RunRecord>> {
        let classifier = self.classifier(segment.phase);
        let mut metrics = BTreeMap::new();

        for (offset, line) in segment.lines.iter().enumerate() {
            match classifier.classify_line(line) {
                LineClass::Metric(sample) => {
                    if let Some(prev) = metrics.insert(sample.field, sample.value) {
                        tracing::debug!(
                            source,
                            segment = segment.index,
                            field = sample.field.column(),
                            "later {} value {} replaces {}",
                            sample.field,
                            sample.value,
                            prev
                        );
                    }
                }
                LineClass::Malformed { field, raw } => {
                    let expected = match field.kind() {
                        ValueKind::Int => "integer",
                        ValueKind::Float => "number",
                    };
                    diags.report(
                        Diagnostic::new(
                            DiagnosticKind::UnparsableMetricLine,
                            format!(
                                "workload {} try {}: {} value '{}' is not a valid {}; line skipped",
                                segment.workload, segment.trial, field, raw, expected
                            ),
                        )
                        .with_source(source)
                        .with_context(serde_json::json!({
                            "segment": segment.index,
                            "line": offset + 1,
                            "text": line,
                        })),
                    )?;
                }
                LineClass::Other => {}
            }
        }

        let missing: Vec<&str> = self
            .mandatory
            .iter()
            .filter(|f| !metrics.contains_key(*f))
            .map(|f| f.column())
            .collect();
        if !missing.is_empty() {
            diags.report(
                Diagnostic::new(
                    DiagnosticKind::MissingMandatoryMetric,
                    format!(
                        "workload {} try {}: missing {}; record dropped",
                        segment.workload,
                        segment.trial,
                        missing.join(", ")
                    ),
                )
                .with_source(source)
                .with_context(serde_json::json!({
                    "segment": segment.index,
                    "missing": missing,
                    "found": metrics.len(),
                })),
            )?;
            return Ok(None);
        }

        Ok(Some(RunRecord {
            phase: segment.phase,
            system: system.to_string(),
            nodes,
            workload: segment.workload.clone(),
            trial: segment.trial,
            metrics,
        }))
    }
}

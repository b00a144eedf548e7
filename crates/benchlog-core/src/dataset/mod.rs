//! Dataset assembly across report files.
//!
//! Each file is segmented and built into its own record list first; only the
//! finished list is merged. The merge keeps the first record for every
//! identity and reports later ones as duplicates.

pub mod discovery;
pub mod files;

pub use discovery::{discover, load_dir, read_report};
pub use files::{FilePattern, FilePatterns, SourceIdentity};

use crate::config::AnalysisConfig;
use crate::errors::{
    AnalysisError, AnalysisResult, ConfigError, Diagnostic, DiagnosticKind, Diagnostics,
};
use crate::model::{MetricField, Phase, RecordKey, RunRecord};
use crate::parse::Segmenter;
use crate::record::RecordBuilder;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

/// Read-only, ordered set of records with unique identities.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Dataset {
    records: Vec<RunRecord>,
}

impl Dataset {
    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RunRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn filter_phase(&self, phase: Phase) -> Dataset {
        Dataset {
            records: self
                .records
                .iter()
                .filter(|r| r.phase == phase)
                .cloned()
                .collect(),
        }
    }

    /// Turns an empty dataset into [`AnalysisError::EmptyDataset`].
    pub fn require_records(self, origin: impl Into<String>) -> AnalysisResult<Self> {
        if self.records.is_empty() {
            return Err(AnalysisError::EmptyDataset {
                origin: origin.into(),
            });
        }
        Ok(self)
    }

    /// Metric columns with at least one value, in column order.
    pub fn populated_metrics(&self) -> Vec<MetricField> {
        MetricField::ALL
            .into_iter()
            .filter(|f| self.records.iter().any(|r| r.metrics.contains_key(f)))
            .collect()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a RunRecord;
    type IntoIter = std::slice::Iter<'a, RunRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Result of one assembly pass.
#[derive(Debug, Clone)]
pub struct Assembly {
    dataset: Dataset,
    keys: HashSet<RecordKey>,
    diagnostics: Diagnostics,
    files_parsed: usize,
    files_skipped: usize,
}

impl Assembly {
    fn new(diagnostics: Diagnostics) -> Self {
        Self {
            dataset: Dataset::default(),
            keys: HashSet::new(),
            diagnostics,
            files_parsed: 0,
            files_skipped: 0,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn files_parsed(&self) -> usize {
        self.files_parsed
    }

    pub fn files_skipped(&self) -> usize {
        self.files_skipped
    }

    pub fn into_parts(self) -> (Dataset, Diagnostics) {
        (self.dataset, self.diagnostics)
    }

    /// Fails with [`AnalysisError::EmptyDataset`] when nothing was assembled.
    pub fn require_records(mut self, origin: impl Into<String>) -> AnalysisResult<Self> {
        self.dataset = self.dataset.require_records(origin)?;
        Ok(self)
    }

    fn merge(&mut self, records: Vec<RunRecord>, source: &str) -> AnalysisResult<usize> {
        let mut added = 0;
        for record in records {
            let key = record.key();
            if self.keys.contains(&key) {
                self.diagnostics.report(
                    Diagnostic::new(
                        DiagnosticKind::DuplicateRecordKey,
                        format!("{key} was already reported; keeping the first record"),
                    )
                    .with_source(source)
                    .with_context(serde_json::json!({
                        "phase": key.phase,
                        "system": key.system,
                        "nodes": key.nodes,
                        "workload": key.workload,
                        "trial": key.trial,
                    })),
                )?;
                continue;
            }
            self.keys.insert(key);
            self.dataset.records.push(record);
            added += 1;
        }
        Ok(added)
    }
}

/// Ties file identification, segmentation and record building together.
#[derive(Debug, Clone)]
pub struct Assembler {
    patterns: FilePatterns,
    segmenter: Segmenter,
    builder: RecordBuilder,
    strict: bool,
    fatal: Vec<DiagnosticKind>,
}

impl Assembler {
    pub fn new(cfg: &AnalysisConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            patterns: FilePatterns::compile(&cfg.files)?,
            segmenter: Segmenter::from_config(cfg)?,
            builder: RecordBuilder::from_config(cfg),
            strict: cfg.strict,
            fatal: cfg.fatal.clone(),
        })
    }

    /// Empty assembly carrying the configured diagnostic policy.
    pub fn start(&self) -> Assembly {
        Assembly::new(Diagnostics::with_policy(self.strict, &self.fatal))
    }

    pub fn assemble<N, T>(
        &self,
        files: impl IntoIterator<Item = (N, T)>,
    ) -> AnalysisResult<Assembly>
    where
        N: AsRef<str>,
        T: AsRef<str>,
    {
        let mut assembly = self.start();
        for (name, text) in files {
            self.add_file(&mut assembly, name.as_ref(), text.as_ref())?;
        }
        Ok(assembly)
    }

    /// Parses one file and merges its records. `name` may be a path; only the
    /// file name is matched against the configured patterns.
    pub fn add_file(&self, assembly: &mut Assembly, name: &str, text: &str) -> AnalysisResult<()> {
        let file_name = Path::new(name)
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(name);

        let Some(identity) = self.patterns.identify(file_name) else {
            assembly.files_skipped += 1;
            return assembly.diagnostics.report(
                Diagnostic::new(
                    DiagnosticKind::UnrecognizedFile,
                    format!("'{file_name}' does not match any report file pattern; skipped"),
                )
                .with_source(file_name),
            );
        };

        self.add_identified(assembly, &identity, text)
    }

    /// Parses a report whose identity is already known, bypassing the file
    /// name patterns.
    pub fn add_identified(
        &self,
        assembly: &mut Assembly,
        identity: &SourceIdentity,
        text: &str,
    ) -> AnalysisResult<()> {
        let records = self.builder.build(
            &identity.system,
            identity.nodes,
            &identity.file,
            self.segmenter.segment(text, identity.layout),
            &mut assembly.diagnostics,
        )?;
        if let Some(named) = identity.phase {
            let mismatched = records.iter().filter(|r| r.phase != named).count();
            if mismatched > 0 {
                tracing::debug!(
                    file = %identity.file,
                    records = mismatched,
                    "file name says {named} but headers say otherwise; header phase kept"
                );
            }
        }
        let added = assembly.merge(records, &identity.file)?;
        assembly.files_parsed += 1;

        tracing::debug!(
            file = %identity.file,
            system = %identity.system,
            nodes = identity.nodes,
            records = added,
            "parsed report"
        );
        Ok(())
    }
}

/// One-shot assembly with `cfg`.
pub fn assemble<N, T>(
    cfg: &AnalysisConfig,
    files: impl IntoIterator<Item = (N, T)>,
) -> AnalysisResult<Assembly>
where
    N: AsRef<str>,
    T: AsRef<str>,
{
    Assembler::new(cfg)?.assemble(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MetricValue, Workload};

    const LOAD_REDIS: &str = "\
Loading workload A try 1
[OVERALL], Throughput(ops/sec), 1500.5
[INSERT], AverageLatency(us), 200.25
";

    #[test]
    fn single_load_file_yields_one_record() {
        let assembly =
            assemble(&AnalysisConfig::default(), [("loadRedis3.csv", LOAD_REDIS)]).unwrap();
        assert!(assembly.diagnostics().is_empty());
        let ds = assembly.dataset();
        assert_eq!(ds.len(), 1);

        let r = &ds.records()[0];
        assert_eq!(r.system, "Redis");
        assert_eq!(r.nodes, 3);
        assert_eq!(r.workload, Workload::new("A"));
        assert_eq!(r.trial, 1);
        assert_eq!(r.metric(MetricField::Throughput), Some(MetricValue::Float(1500.5)));
        assert_eq!(
            r.metric(MetricField::InsertAvgLatencyUs),
            Some(MetricValue::Float(200.25))
        );
        for field in MetricField::ALL {
            if !matches!(field, MetricField::Throughput | MetricField::InsertAvgLatencyUs) {
                assert_eq!(r.metric(field), None, "{field}");
            }
        }
    }

    #[test]
    fn unrecognized_files_are_skipped() {
        let assembly = assemble(
            &AnalysisConfig::default(),
            [("README.md", "hello"), ("results/loadRedis3.csv", LOAD_REDIS)],
        )
        .unwrap();
        assert_eq!(assembly.files_skipped(), 1);
        assert_eq!(assembly.files_parsed(), 1);
        assert_eq!(assembly.dataset().len(), 1);
        let d = &assembly.diagnostics().entries()[0];
        assert_eq!(d.kind, DiagnosticKind::UnrecognizedFile);
        assert_eq!(d.source, "README.md");
    }

    #[test]
    fn duplicate_identity_keeps_first() {
        let text = "\
Loading workload A try 1
[OVERALL], Throughput(ops/sec), 1.0
####
Loading workload A try 1
[OVERALL], Throughput(ops/sec), 2.0
";
        let assembly = assemble(&AnalysisConfig::default(), [("loadRedis3.csv", text)]).unwrap();
        let ds = assembly.dataset();
        assert_eq!(ds.len(), 1);
        assert_eq!(
            ds.records()[0].metric(MetricField::Throughput),
            Some(MetricValue::Float(1.0))
        );
        assert_eq!(
            assembly.diagnostics().count_by_kind()[&DiagnosticKind::DuplicateRecordKey],
            1
        );
    }

    #[test]
    fn load_and_run_of_same_trial_coexist() {
        let run = "Running workload A try 1\n[OVERALL], Throughput(ops/sec), 9.0\n";
        let assembly = assemble(
            &AnalysisConfig::default(),
            [("loadRedis3.csv", LOAD_REDIS), ("runRedis3.csv", run)],
        )
        .unwrap();
        assert_eq!(assembly.dataset().len(), 2);
        assert!(assembly.diagnostics().is_empty());
        assert_eq!(assembly.dataset().filter_phase(Phase::Run).len(), 1);
    }

    #[test]
    fn dropped_flat_trial_leaves_a_gap_in_ordinals() {
        let log = "\
Log;
Running test workoad B;
[OVERALL], Throughput(ops/sec), 7.0;
Running test workoad B;
[OVERALL], RunTime(ms), 90;
Running test workoad B;
[OVERALL], Throughput(ops/sec), 9.0;
";
        let assembly =
            assemble(&AnalysisConfig::default(), [("outputRunRedis3.csv", log)]).unwrap();
        let trials: Vec<u32> = assembly.dataset().iter().map(|r| r.trial).collect();
        assert_eq!(trials, vec![1, 3]);
        assert_eq!(
            assembly.dataset().records()[1].metric(MetricField::Throughput),
            Some(MetricValue::Float(9.0))
        );
        assert_eq!(
            assembly.diagnostics().count_by_kind()[&DiagnosticKind::MissingMandatoryMetric],
            1
        );
    }

    #[test]
    fn strict_config_fails_on_first_warning() {
        let cfg = AnalysisConfig {
            strict: true,
            ..AnalysisConfig::default()
        };
        let err = assemble(&cfg, [("notes.txt", "")]).unwrap_err();
        assert!(err.is_fatal_diagnostic());
    }

    #[test]
    fn empty_dataset_is_an_error_when_required() {
        let assembly =
            assemble(&AnalysisConfig::default(), [("runRedis3.csv", "nothing here")]).unwrap();
        let err = assembly.require_records("results/").unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyDataset { .. }));
        assert!(err.to_string().contains("results/"));
    }

    #[test]
    fn phase_filter_can_empty_the_dataset() {
        let assembly =
            assemble(&AnalysisConfig::default(), [("loadRedis3.csv", LOAD_REDIS)]).unwrap();
        let (ds, _) = assembly.into_parts();
        let load = ds.filter_phase(Phase::Load).require_records("results/").unwrap();
        assert_eq!(load.len(), 1);
        let err = ds
            .filter_phase(Phase::Run)
            .require_records("results/ (run phase)")
            .unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyDataset { .. }));
        assert!(err.to_string().contains("(run phase)"));
    }

    #[test]
    fn populated_metrics_follow_column_order() {
        let assembly =
            assemble(&AnalysisConfig::default(), [("loadRedis3.csv", LOAD_REDIS)]).unwrap();
        assert_eq!(
            assembly.dataset().populated_metrics(),
            vec![MetricField::Throughput, MetricField::InsertAvgLatencyUs]
        );
    }
}

use crate::errors::{ConfigError, DiagnosticKind};
use crate::model::{Layout, MetricField, Phase};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "benchlog.yaml";

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Accepted workload identifiers. Default: A, B, C.
    pub workloads: Vec<String>,

    /// Confidence level used by `summary` when none is given on the command line.
    pub confidence: f64,

    /// A segment missing any of these metrics produces no record.
    pub mandatory: Vec<MetricField>,

    /// Upgrade every warn-level diagnostic to a hard failure.
    pub strict: bool,

    /// Upgrade only these diagnostic kinds.
    pub fatal: Vec<DiagnosticKind>,

    /// Leading segment lines containing any of these strings are dropped
    /// before the header search.
    pub noise: Vec<String>,

    pub headers: Vec<HeaderTemplateConfig>,

    pub files: Vec<FilePatternConfig>,

    pub phases: PhaseMetrics,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HeaderTemplateConfig {
    /// Literal header text with `{workload}` and optionally `{trial}`
    /// placeholders. Misspellings in producer output are matched as written.
    pub template: String,
    pub phase: Phase,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FilePatternConfig {
    /// Regex over the bare file name with named groups `phase`, `system`, `nodes`.
    pub pattern: String,
    #[serde(default)]
    pub layout: Layout,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PhaseMetrics {
    pub load: Vec<MetricField>,
    pub run: Vec<MetricField>,
}

impl PhaseMetrics {
    pub fn for_phase(&self, phase: Phase) -> &[MetricField] {
        match phase {
            Phase::Load => &self.load,
            Phase::Run => &self.run,
        }
    }
}

impl Default for PhaseMetrics {
    fn default() -> Self {
        Self {
            load: vec![
                MetricField::RunTimeMs,
                MetricField::Throughput,
                MetricField::InsertAvgLatencyUs,
                MetricField::CleanupAvgLatencyUs,
            ],
            run: vec![
                MetricField::RunTimeMs,
                MetricField::Throughput,
                MetricField::ReadAvgLatencyUs,
                MetricField::UpdateAvgLatencyUs,
                MetricField::CleanupAvgLatencyUs,
                MetricField::Read95thLatencyUs,
                MetricField::Update95thLatencyUs,
            ],
        }
    }
}

fn header(template: &str, phase: Phase) -> HeaderTemplateConfig {
    HeaderTemplateConfig {
        template: template.to_string(),
        phase,
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            workloads: vec!["A".into(), "B".into(), "C".into()],
            confidence: 0.95,
            mandatory: vec![MetricField::Throughput],
            strict: false,
            fatal: Vec::new(),
            noise: vec!["Initializing results".into()],
            headers: vec![
                header("Loading workload {workload} try {trial}", Phase::Load),
                header("Running workload {workload} try {trial}", Phase::Run),
                header("Loading data worload {workload}", Phase::Load),
                header("Running test workoad {workload}", Phase::Run),
            ],
            files: vec![
                FilePatternConfig {
                    pattern: r"^(?P<phase>load|run)(?P<system>\w+?)(?P<nodes>\d+)\.csv$".into(),
                    layout: Layout::Sectioned,
                },
                FilePatternConfig {
                    pattern: r"^output(?P<phase>Load|Run)(?P<system>\w+?)(?P<nodes>\d+)\.csv$"
                        .into(),
                    layout: Layout::Flat,
                },
            ],
            phases: PhaseMetrics::default(),
        }
    }
}

impl AnalysisConfig {
    /// Loads and validates a YAML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let cfg: Self = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: Some(path.display().to_string()),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// `load` when `path` is given, built-in defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self =
            serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse { path: None, source })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workloads.is_empty() {
            return Err(ConfigError::Invalid(
                "'workloads' must list at least one workload".into(),
            ));
        }
        if let Some(w) = self.workloads.iter().find(|w| w.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "workload identifier {w:?} is blank"
            )));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "'confidence' must be strictly between 0 and 1 (got {})",
                self.confidence
            )));
        }
        if self.headers.is_empty() {
            return Err(ConfigError::Invalid(
                "'headers' must contain at least one template".into(),
            ));
        }
        for phase in [Phase::Load, Phase::Run] {
            let extracted = self.phases.for_phase(phase);
            if let Some(m) = self.mandatory.iter().find(|m| !extracted.contains(m)) {
                return Err(ConfigError::Invalid(format!(
                    "mandatory metric {m} is not extracted in the {phase} phase"
                )));
            }
        }
        for h in &self.headers {
            crate::parse::header::HeaderTemplate::compile(h)?;
        }
        for f in &self.files {
            crate::dataset::files::FilePattern::compile(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        AnalysisConfig::default().validate().unwrap();
    }

    #[test]
    fn yaml_overrides_keep_other_defaults() {
        let cfg = AnalysisConfig::from_yaml_str(
            r#"
workloads: [A, B, C, D]
fatal: [duplicate_record_key]
phases:
  load: [Throughput]
"#,
        )
        .unwrap();
        assert_eq!(cfg.workloads.len(), 4);
        assert_eq!(cfg.fatal, vec![DiagnosticKind::DuplicateRecordKey]);
        assert_eq!(cfg.phases.load, vec![MetricField::Throughput]);
        assert_eq!(cfg.phases.run, PhaseMetrics::default().run);
        assert_eq!(cfg.headers.len(), 4);
        assert!((cfg.confidence - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_metric_column_is_rejected() {
        let err = AnalysisConfig::from_yaml_str("mandatory: [ScanAvgLatencyUs]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
    }

    #[test]
    fn confidence_out_of_range_is_rejected() {
        let err = AnalysisConfig::from_yaml_str("confidence: 1.0\n").unwrap_err();
        assert!(err.to_string().contains("confidence"), "{err}");
    }

    #[test]
    fn mandatory_metric_must_be_extracted_in_both_phases() {
        let err = AnalysisConfig::from_yaml_str("phases:\n  run: [RunTimeMs]\n").unwrap_err();
        assert!(err.to_string().contains("Throughput"), "{err}");
        assert!(err.to_string().contains("run phase"), "{err}");
    }

    #[test]
    fn header_without_workload_placeholder_is_rejected() {
        let err = AnalysisConfig::from_yaml_str(
            "headers:\n  - { template: \"Running try {trial}\", phase: run }\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::HeaderTemplate { .. }), "{err}");
    }

    #[test]
    fn file_pattern_without_nodes_group_is_rejected() {
        let err = AnalysisConfig::from_yaml_str(
            "files:\n  - { pattern: '^(?P<phase>run)(?P<system>\\w+)\\.csv$' }\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::FilePattern { .. }), "{err}");
    }

    #[test]
    fn load_reports_missing_file_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        let err = AnalysisConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains(DEFAULT_CONFIG_FILE));
    }
}

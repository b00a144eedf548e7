use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Benchmark phase a report (or a segment of one) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Load,
    Run,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Run => "run",
        }
    }

    /// Parses a filename prefix such as `load`, `run`, `Load` or `Run`.
    pub fn from_prefix(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("load") {
            Some(Self::Load)
        } else if s.eq_ignore_ascii_case("run") {
            Some(Self::Run)
        } else {
            None
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a report file is laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Trials separated by lines of `#`, each opened by a header line.
    #[default]
    Sectioned,
    /// `;`-delimited log where header lines alone mark the start of a trial.
    Flat,
}

/// Bracketed operation-group tag of a metric line, e.g. `[READ]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Overall,
    Insert,
    Read,
    Update,
    Cleanup,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Overall,
        Category::Insert,
        Category::Read,
        Category::Update,
        Category::Cleanup,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Overall => "OVERALL",
            Self::Insert => "INSERT",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Cleanup => "CLEANUP",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.tag() == tag)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Float,
}

/// Every metric the engine knows how to extract. The set is closed so the
/// output table keeps a stable schema; configuration only narrows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricField {
    RunTimeMs,
    Throughput,
    InsertAvgLatencyUs,
    ReadAvgLatencyUs,
    UpdateAvgLatencyUs,
    CleanupAvgLatencyUs,
    Read95thLatencyUs,
    Update95thLatencyUs,
}

impl MetricField {
    /// Column order of the normalized table.
    pub const ALL: [MetricField; 8] = [
        MetricField::RunTimeMs,
        MetricField::Throughput,
        MetricField::InsertAvgLatencyUs,
        MetricField::ReadAvgLatencyUs,
        MetricField::UpdateAvgLatencyUs,
        MetricField::CleanupAvgLatencyUs,
        MetricField::Read95thLatencyUs,
        MetricField::Update95thLatencyUs,
    ];

    pub fn category(self) -> Category {
        match self {
            Self::RunTimeMs | Self::Throughput => Category::Overall,
            Self::InsertAvgLatencyUs => Category::Insert,
            Self::ReadAvgLatencyUs | Self::Read95thLatencyUs => Category::Read,
            Self::UpdateAvgLatencyUs | Self::Update95thLatencyUs => Category::Update,
            Self::CleanupAvgLatencyUs => Category::Cleanup,
        }
    }

    /// Metric name as printed by the load generator.
    pub fn name(self) -> &'static str {
        match self {
            Self::RunTimeMs => "RunTime(ms)",
            Self::Throughput => "Throughput(ops/sec)",
            Self::InsertAvgLatencyUs
            | Self::ReadAvgLatencyUs
            | Self::UpdateAvgLatencyUs
            | Self::CleanupAvgLatencyUs => "AverageLatency(us)",
            Self::Read95thLatencyUs | Self::Update95thLatencyUs => "95thPercentileLatency(us)",
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            Self::RunTimeMs => ValueKind::Int,
            _ => ValueKind::Float,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::RunTimeMs => "RunTimeMs",
            Self::Throughput => "Throughput",
            Self::InsertAvgLatencyUs => "InsertAvgLatencyUs",
            Self::ReadAvgLatencyUs => "ReadAvgLatencyUs",
            Self::UpdateAvgLatencyUs => "UpdateAvgLatencyUs",
            Self::CleanupAvgLatencyUs => "CleanupAvgLatencyUs",
            Self::Read95thLatencyUs => "Read95thLatencyUs",
            Self::Update95thLatencyUs => "Update95thLatencyUs",
        }
    }

    pub fn from_column(column: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.column() == column)
    }

    pub fn lookup(category: Category, name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.category() == category && f.name() == name)
    }
}

impl fmt::Display for MetricField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
}

impl MetricValue {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
        }
    }
}

/// One recognized metric line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSample {
    pub field: MetricField,
    pub value: MetricValue,
}

impl MetricSample {
    pub fn category(&self) -> Category {
        self.field.category()
    }

    pub fn name(&self) -> &'static str {
        self.field.name()
    }
}

/// Workload identifier such as `A`. Membership in the configured set is
/// checked where headers are parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Workload(String);

impl Workload {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one trial inside a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub phase: Phase,
    pub system: String,
    pub nodes: u32,
    pub workload: Workload,
    pub trial: u32,
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}{}/workload {}/try {}",
            self.phase, self.system, self.nodes, self.workload, self.trial
        )
    }
}

/// One executed trial. Metrics missing from the report are absent from
/// `metrics`, never zero.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub phase: Phase,
    pub system: String,
    pub nodes: u32,
    pub workload: Workload,
    pub trial: u32,
    pub metrics: BTreeMap<MetricField, MetricValue>,
}

impl RunRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            phase: self.phase,
            system: self.system.clone(),
            nodes: self.nodes,
            workload: self.workload.clone(),
            trial: self.trial,
        }
    }

    pub fn metric(&self, field: MetricField) -> Option<MetricValue> {
        self.metrics.get(&field).copied()
    }
}

/// Serializes as one flat table row: identity columns first, then every
/// metric column (null when absent).
impl Serialize for RunRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut row = serializer.serialize_map(Some(5 + MetricField::ALL.len()))?;
        row.serialize_entry("Phase", &self.phase)?;
        row.serialize_entry("System", &self.system)?;
        row.serialize_entry("Nodes", &self.nodes)?;
        row.serialize_entry("Workload", &self.workload)?;
        row.serialize_entry("Try", &self.trial)?;
        for field in MetricField::ALL {
            row.serialize_entry(field.column(), &self.metric(field))?;
        }
        row.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_maps_category_and_name_to_field() {
        assert_eq!(
            MetricField::lookup(Category::Read, "95thPercentileLatency(us)"),
            Some(MetricField::Read95thLatencyUs)
        );
        assert_eq!(
            MetricField::lookup(Category::Cleanup, "AverageLatency(us)"),
            Some(MetricField::CleanupAvgLatencyUs)
        );
        assert_eq!(MetricField::lookup(Category::Insert, "RunTime(ms)"), None);
    }

    #[test]
    fn only_runtime_is_integer() {
        for field in MetricField::ALL {
            let expected = if field == MetricField::RunTimeMs {
                ValueKind::Int
            } else {
                ValueKind::Float
            };
            assert_eq!(field.kind(), expected, "{field}");
        }
    }

    #[test]
    fn record_row_has_every_column_with_nulls() {
        let mut metrics = BTreeMap::new();
        metrics.insert(MetricField::Throughput, MetricValue::Float(1500.5));
        metrics.insert(MetricField::RunTimeMs, MetricValue::Int(6663));
        let record = RunRecord {
            phase: Phase::Load,
            system: "Redis".into(),
            nodes: 3,
            workload: Workload::new("A"),
            trial: 1,
            metrics,
        };

        let row = serde_json::to_value(&record).unwrap();
        let obj = row.as_object().unwrap();
        assert_eq!(obj.len(), 13);
        assert_eq!(row["Phase"], "load");
        assert_eq!(row["Workload"], "A");
        assert_eq!(row["Throughput"], 1500.5);
        assert_eq!(row["RunTimeMs"], 6663);
        assert!(row["ReadAvgLatencyUs"].is_null());
    }

    #[test]
    fn phase_prefix_is_case_insensitive() {
        assert_eq!(Phase::from_prefix("Load"), Some(Phase::Load));
        assert_eq!(Phase::from_prefix("run"), Some(Phase::Run));
        assert_eq!(Phase::from_prefix("output"), None);
    }
}

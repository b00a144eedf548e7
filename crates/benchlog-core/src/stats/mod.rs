//! Confidence intervals over repeated trials.

pub mod student_t;

use crate::dataset::Dataset;
use crate::errors::{AnalysisError, AnalysisResult};
use crate::model::{MetricField, RunRecord};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Record columns a summary can be grouped by. Declaration order is the
/// canonical order of a grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GroupField {
    Phase,
    System,
    Nodes,
    Workload,
    Try,
}

impl GroupField {
    pub const ALL: [GroupField; 5] = [
        GroupField::Phase,
        GroupField::System,
        GroupField::Nodes,
        GroupField::Workload,
        GroupField::Try,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phase => "Phase",
            Self::System => "System",
            Self::Nodes => "Nodes",
            Self::Workload => "Workload",
            Self::Try => "Try",
        }
    }

    fn value(self, record: &RunRecord) -> GroupValue {
        match self {
            Self::Phase => GroupValue::Text(record.phase.as_str().to_string()),
            Self::System => GroupValue::Text(record.system.clone()),
            Self::Nodes => GroupValue::Number(record.nodes),
            Self::Workload => GroupValue::Text(record.workload.to_string()),
            Self::Try => GroupValue::Number(record.trial),
        }
    }

    /// Sorted into canonical order with duplicates removed.
    pub fn canonicalize(fields: &[GroupField]) -> Vec<GroupField> {
        let mut out = fields.to_vec();
        out.sort();
        out.dedup();
        out
    }
}

impl fmt::Display for GroupField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!("unknown group field '{s}' (expected Phase, System, Nodes, Workload or Try)")
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum GroupValue {
    Text(String),
    Number(u32),
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Values of the grouping fields for one group, in canonical field order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    entries: Vec<(GroupField, GroupValue)>,
}

impl GroupKey {
    pub fn entries(&self) -> &[(GroupField, GroupValue)] {
        &self.entries
    }

    pub fn get(&self, field: GroupField) -> Option<&GroupValue> {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return f.write_str("(all)");
        }
        for (i, (field, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}={value}")?;
        }
        Ok(())
    }
}

impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, value) in &self.entries {
            map.serialize_entry(field.as_str(), value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateStat {
    pub mean: Option<f64>,
    #[serde(rename = "ci")]
    pub half_width: Option<f64>,
    pub n: usize,
}

impl AggregateStat {
    /// Mean and t-based confidence half-width of `values`. Both are `None`
    /// with fewer than two samples; identical samples give a half-width of 0.
    pub fn from_samples(values: &[f64], confidence: f64) -> AnalysisResult<Self> {
        check_confidence(confidence)?;
        let n = values.len();
        if n < 2 {
            return Ok(Self {
                mean: None,
                half_width: None,
                n,
            });
        }

        let first = values[0];
        if values.iter().all(|v| *v == first) {
            return Ok(Self {
                mean: Some(first),
                half_width: Some(0.0),
                n,
            });
        }

        let nf = n as f64;
        let (mean, std_dev) = mean_and_std_dev(values);
        let sem = std_dev / nf.sqrt();
        let critical = student_t::two_tailed_critical(confidence, nf - 1.0)
            .ok_or(AnalysisError::InvalidConfidence(confidence))?;

        Ok(Self {
            mean: Some(mean),
            half_width: Some(sem * critical),
            n,
        })
    }
}

/// Welford's running mean and sample standard deviation. Values are first
/// scaled by a power of two near the largest magnitude so squared deviations
/// stay finite.
fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    let max_abs = values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let scale = if max_abs > 0.0 {
        2.0_f64.powi(max_abs.log2().floor() as i32)
    } else {
        1.0
    };

    let mut mean = 0.0;
    let mut m2 = 0.0;
    for (i, v) in values.iter().enumerate() {
        let x = v / scale;
        let delta = x - mean;
        mean += delta / (i + 1) as f64;
        m2 += delta * (x - mean);
    }
    let variance = m2 / (values.len() - 1) as f64;
    (mean * scale, variance.sqrt() * scale)
}

fn check_confidence(confidence: f64) -> AnalysisResult<()> {
    if confidence > 0.0 && confidence < 1.0 {
        Ok(())
    } else {
        Err(AnalysisError::InvalidConfidence(confidence))
    }
}

/// Records partitioned by a grouping key, groups in first-seen order.
#[derive(Debug, Clone)]
pub struct Grouping<'a> {
    fields: Vec<GroupField>,
    groups: Vec<(GroupKey, Vec<&'a RunRecord>)>,
}

impl<'a> Grouping<'a> {
    pub fn new(dataset: &'a Dataset, group_by: &[GroupField]) -> Self {
        let fields = GroupField::canonicalize(group_by);
        let mut index: HashMap<GroupKey, usize> = HashMap::new();
        let mut groups: Vec<(GroupKey, Vec<&'a RunRecord>)> = Vec::new();

        for record in dataset {
            let key = GroupKey {
                entries: fields.iter().map(|f| (*f, f.value(record))).collect(),
            };
            match index.get(&key) {
                Some(&i) => groups[i].1.push(record),
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push((key, vec![record]));
                }
            }
        }
        Self { fields, groups }
    }

    pub fn fields(&self) -> &[GroupField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn stat(
        &self,
        metric: MetricField,
        confidence: f64,
    ) -> AnalysisResult<Vec<(GroupKey, AggregateStat)>> {
        check_confidence(confidence)?;
        self.groups
            .iter()
            .map(|(key, records)| -> AnalysisResult<(GroupKey, AggregateStat)> {
                let values: Vec<f64> = records
                    .iter()
                    .filter_map(|r| r.metric(metric))
                    .map(|v| v.as_f64())
                    .collect();
                Ok((key.clone(), AggregateStat::from_samples(&values, confidence)?))
            })
            .collect()
    }
}

/// Per-group statistics of one metric.
pub fn aggregate(
    dataset: &Dataset,
    group_by: &[GroupField],
    metric: MetricField,
    confidence: f64,
) -> AnalysisResult<Vec<(GroupKey, AggregateStat)>> {
    Grouping::new(dataset, group_by).stat(metric, confidence)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub group: GroupKey,
    pub metric: MetricField,
    pub stat: AggregateStat,
}

impl Serialize for SummaryRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = self.group.entries();
        let mut row = serializer.serialize_map(Some(entries.len() + 4))?;
        for (field, value) in entries {
            row.serialize_entry(field.as_str(), value)?;
        }
        row.serialize_entry("Metric", self.metric.column())?;
        row.serialize_entry("mean", &self.stat.mean)?;
        row.serialize_entry("ci", &self.stat.half_width)?;
        row.serialize_entry("n", &self.stat.n)?;
        row.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    pub group_by: Vec<GroupField>,
    pub metrics: Vec<MetricField>,
    pub confidence: f64,
    pub rows: Vec<SummaryRow>,
}

/// Summary over `metrics` (every populated column when empty). Rows are in
/// group first-seen order, then metric column order.
pub fn summarize(
    dataset: &Dataset,
    group_by: &[GroupField],
    metrics: &[MetricField],
    confidence: f64,
) -> AnalysisResult<SummaryTable> {
    check_confidence(confidence)?;
    let metrics = if metrics.is_empty() {
        dataset.populated_metrics()
    } else {
        let mut m = metrics.to_vec();
        m.sort();
        m.dedup();
        m
    };

    let grouping = Grouping::new(dataset, group_by);
    let per_metric = metrics
        .iter()
        .map(|m| grouping.stat(*m, confidence))
        .collect::<AnalysisResult<Vec<_>>>()?;

    let mut rows = Vec::with_capacity(grouping.len() * metrics.len());
    for g in 0..grouping.len() {
        for (m, stats) in metrics.iter().zip(&per_metric) {
            let (group, stat) = &stats[g];
            rows.push(SummaryRow {
                group: group.clone(),
                metric: *m,
                stat: *stat,
            });
        }
    }

    tracing::debug!(
        groups = grouping.len(),
        metrics = metrics.len(),
        confidence,
        "summarized dataset"
    );
    Ok(SummaryTable {
        group_by: grouping.fields().to_vec(),
        metrics,
        confidence,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::dataset::assemble;

    fn stat(values: &[f64]) -> AggregateStat {
        AggregateStat::from_samples(values, 0.95).unwrap()
    }

    #[test]
    fn three_samples() {
        let s = stat(&[10.0, 12.0, 11.0]);
        assert_eq!(s.n, 3);
        assert_eq!(s.mean, Some(11.0));
        let expected = 4.302_652_729_911_275 / 3f64.sqrt();
        assert!((s.half_width.unwrap() - expected).abs() < 1e-6);
        assert!((s.half_width.unwrap() - 2.4841).abs() < 1e-4);
    }

    #[test]
    fn single_sample_has_no_interval() {
        let s = stat(&[5.0]);
        assert_eq!((s.mean, s.half_width, s.n), (None, None, 1));
        let s = stat(&[]);
        assert_eq!((s.mean, s.half_width, s.n), (None, None, 0));
    }

    #[test]
    fn identical_samples_have_zero_width() {
        let s = stat(&[7.0, 7.0]);
        assert_eq!((s.mean, s.half_width, s.n), (Some(7.0), Some(0.0), 2));
        let s = stat(&[0.1, 0.1, 0.1]);
        assert_eq!(s.half_width, Some(0.0));
    }

    #[test]
    fn confidence_must_be_open_unit_interval() {
        for c in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let err = AggregateStat::from_samples(&[1.0, 2.0], c).unwrap_err();
            assert!(matches!(err, AnalysisError::InvalidConfidence(_)));
        }
        let ds = Dataset::default();
        assert!(aggregate(&ds, &[], MetricField::Throughput, 1.0).is_err());
    }

    #[test]
    fn huge_magnitudes_keep_a_finite_interval() {
        let big = stat(&[1e300, 1e300, 1.000_000_1e300]);
        let unit = stat(&[1.0, 1.0, 1.000_000_1]);
        let hw = big.half_width.unwrap();
        assert!(hw.is_finite());
        assert!((hw / 1e300 - unit.half_width.unwrap()).abs() < 1e-12);
        assert!((big.mean.unwrap() / 1e300 - unit.mean.unwrap()).abs() < 1e-12);

        let s = stat(&[f64::MAX, f64::MAX / 2.0, f64::MAX / 4.0]);
        assert!(s.mean.unwrap().is_finite());
    }

    #[test]
    fn higher_confidence_widens_interval() {
        let values = [10.0, 12.0, 11.0, 14.0];
        let narrow = AggregateStat::from_samples(&values, 0.8).unwrap();
        let wide = AggregateStat::from_samples(&values, 0.99).unwrap();
        assert!(wide.half_width.unwrap() > narrow.half_width.unwrap());
    }

    #[test]
    fn group_field_parsing_and_canonical_order() {
        assert_eq!("workload".parse::<GroupField>(), Ok(GroupField::Workload));
        assert!("Scan".parse::<GroupField>().is_err());
        assert_eq!(
            GroupField::canonicalize(&[
                GroupField::Workload,
                GroupField::System,
                GroupField::Workload,
            ]),
            vec![GroupField::System, GroupField::Workload]
        );
    }

    fn dataset() -> Dataset {
        let redis = "\
Running workload A try 1
[OVERALL], Throughput(ops/sec), 10.0
####
Running workload A try 2
[OVERALL], Throughput(ops/sec), 12.0
####
Running workload B try 1
[OVERALL], Throughput(ops/sec), 3.0
[READ], AverageLatency(us), 8.0
####
Running workload A try 3
[OVERALL], Throughput(ops/sec), 11.0
";
        let mongo = "Running workload A try 1\n[OVERALL], Throughput(ops/sec), 50.0\n";
        let (ds, _) = assemble(
            &AnalysisConfig::default(),
            [("runRedis3.csv", redis), ("runMongo3.csv", mongo)],
        )
        .unwrap()
        .into_parts();
        ds
    }

    #[test]
    fn groups_are_first_seen_and_order_insensitive() {
        let ds = dataset();
        let a = aggregate(
            &ds,
            &[GroupField::Workload, GroupField::System],
            MetricField::Throughput,
            0.95,
        )
        .unwrap();
        let b = aggregate(
            &ds,
            &[GroupField::System, GroupField::Workload],
            MetricField::Throughput,
            0.95,
        )
        .unwrap();
        assert_eq!(a, b);

        let keys: Vec<String> = a.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(
            keys,
            vec![
                "System=Redis, Workload=A",
                "System=Redis, Workload=B",
                "System=Mongo, Workload=A"
            ]
        );
        assert_eq!(a[0].1.n, 3);
        assert_eq!(a[0].1.mean, Some(11.0));
        assert_eq!(a[1].1.mean, None);
    }

    #[test]
    fn missing_values_are_excluded_from_samples() {
        let ds = dataset();
        let stats = aggregate(
            &ds,
            &[GroupField::Workload],
            MetricField::ReadAvgLatencyUs,
            0.95,
        )
        .unwrap();
        assert_eq!(stats[0].1.n, 0);
        assert_eq!(stats[1].1.n, 1);
    }

    #[test]
    fn summary_rows_by_group_then_metric() {
        let ds = dataset();
        let table = summarize(&ds, &[GroupField::Workload], &[], 0.95).unwrap();
        assert_eq!(
            table.metrics,
            vec![MetricField::Throughput, MetricField::ReadAvgLatencyUs]
        );
        let rows: Vec<(String, MetricField, usize)> = table
            .rows
            .iter()
            .map(|r| (r.group.to_string(), r.metric, r.stat.n))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("Workload=A".to_string(), MetricField::Throughput, 4),
                ("Workload=A".to_string(), MetricField::ReadAvgLatencyUs, 0),
                ("Workload=B".to_string(), MetricField::Throughput, 1),
                ("Workload=B".to_string(), MetricField::ReadAvgLatencyUs, 1),
            ]
        );

        let json = serde_json::to_value(&table.rows[0]).unwrap();
        assert_eq!(json["Workload"], "A");
        assert_eq!(json["Metric"], "Throughput");
        assert_eq!(json["n"], 4);
    }

    #[test]
    fn empty_grouping_is_one_group() {
        let ds = dataset();
        let stats = aggregate(&ds, &[], MetricField::Throughput, 0.95).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].0.to_string(), "(all)");
        assert_eq!(stats[0].1.n, 5);
    }
}

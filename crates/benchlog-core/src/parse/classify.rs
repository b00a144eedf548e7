use crate::model::{Category, MetricField, MetricSample, MetricValue, ValueKind};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `[CATEGORY], Name,` anywhere on the line; the value is taken separately
    /// as the last comma-delimited field.
    static ref METRIC_MARKER: Regex =
        Regex::new(r"\[(?P<category>[A-Za-z0-9_-]+)\]\s*,\s*(?P<name>[^,]*?)\s*,").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineClass {
    Metric(MetricSample),
    /// Known category and name, but the trailing field is not a valid number
    /// of the expected kind.
    Malformed { field: MetricField, raw: String },
    Other,
}

/// Recognizes metric lines for an explicit set of fields.
#[derive(Debug, Clone)]
pub struct MetricClassifier {
    fields: Vec<MetricField>,
}

impl MetricClassifier {
    pub fn new(fields: &[MetricField]) -> Self {
        Self {
            fields: fields.to_vec(),
        }
    }

    /// Classifier for every known field.
    pub fn all() -> Self {
        Self::new(&MetricField::ALL)
    }

    pub fn fields(&self) -> &[MetricField] {
        &self.fields
    }

    pub fn classify(&self, line: &str) -> Option<MetricSample> {
        match self.classify_line(line) {
            LineClass::Metric(sample) => Some(sample),
            _ => None,
        }
    }

    pub fn classify_line(&self, line: &str) -> LineClass {
        let Some(caps) = METRIC_MARKER.captures(line) else {
            return LineClass::Other;
        };
        let Some(category) = Category::from_tag(&caps["category"]) else {
            return LineClass::Other;
        };
        let Some(field) = MetricField::lookup(category, &caps["name"]) else {
            return LineClass::Other;
        };
        if !self.fields.contains(&field) {
            return LineClass::Other;
        }

        let raw = line.rsplit(',').next().unwrap_or_default().trim();
        match parse_value(field.kind(), raw) {
            Some(value) => LineClass::Metric(MetricSample { field, value }),
            None => LineClass::Malformed {
                field,
                raw: raw.to_string(),
            },
        }
    }
}

fn parse_value(kind: ValueKind, raw: &str) -> Option<MetricValue> {
    match kind {
        ValueKind::Int => raw.parse::<i64>().ok().map(MetricValue::Int),
        ValueKind::Float => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(MetricValue::Float),
    }
}

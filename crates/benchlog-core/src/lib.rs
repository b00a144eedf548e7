pub mod config;
pub mod dataset;
pub mod errors;
pub mod model;
pub mod parse;
pub mod record;
pub mod report;
pub mod stats;

// Convenience re-exports
pub use config::{AnalysisConfig, DEFAULT_CONFIG_FILE};
pub use dataset::{assemble, discover, load_dir, Assembler, Assembly, Dataset, SourceIdentity};
pub use errors::{
    AnalysisError, AnalysisResult, ConfigError, Diagnostic, DiagnosticKind, Diagnostics, Severity,
};
pub use model::{Layout, MetricField, MetricValue, Phase, RecordKey, RunRecord, Workload};
pub use record::RecordBuilder;
pub use stats::{aggregate, summarize, AggregateStat, GroupField, GroupKey, SummaryTable};

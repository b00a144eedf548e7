use benchlog_core::{GroupField, MetricField, Phase};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "benchlog",
    version,
    about = "Normalize YCSB-style benchmark reports and summarize repeated trials"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the normalized per-trial table of a results directory
    Dataset(DatasetArgs),
    /// Per-group mean and confidence half-width of each metric
    Summary(SummaryArgs),
    /// Summarize a single flat-layout log per workload
    Flat(FlatArgs),
    Version,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseArg {
    Load,
    Run,
}

impl From<PhaseArg> for Phase {
    fn from(p: PhaseArg) -> Self {
        match p {
            PhaseArg::Load => Phase::Load,
            PhaseArg::Run => Phase::Run,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(clap::Args, Debug, Clone)]
pub struct InputArgs {
    /// Directory holding the report files
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Keep only records of this phase
    #[arg(long, value_enum)]
    pub phase: Option<PhaseArg>,

    /// Analysis config (YAML); built-in defaults when omitted
    #[arg(long, env = "BENCHLOG_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Write to this file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Exit with code 1 when any warning-level diagnostic was reported
    #[arg(long)]
    pub deny_warnings: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct DatasetArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Grouping fields (Phase, System, Nodes, Workload, Try); order does not matter
    #[arg(long, value_delimiter = ',', default_value = "Workload,System,Nodes")]
    pub group_by: Vec<GroupField>,

    /// Metric column to summarize (repeatable); every populated column by default
    #[arg(long = "metric", value_parser = parse_metric)]
    pub metrics: Vec<MetricField>,

    /// Confidence level in (0, 1); overrides the config value
    #[arg(long)]
    pub confidence: Option<f64>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct FlatArgs {
    /// Flat-layout log file
    pub file: PathBuf,

    /// System under test
    #[arg(long)]
    pub system: String,

    /// Cluster node count
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub nodes: u32,

    #[arg(long, env = "BENCHLOG_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub confidence: Option<f64>,

    #[command(flatten)]
    pub output: OutputArgs,
}

fn parse_metric(s: &str) -> Result<MetricField, String> {
    MetricField::from_column(s.trim()).ok_or_else(|| {
        let known: Vec<&str> = MetricField::ALL.iter().map(|m| m.column()).collect();
        format!("unknown metric '{s}' (expected one of {})", known.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn summary_defaults() {
        let cli = Cli::try_parse_from(["benchlog", "summary", "--dir", "results"]).unwrap();
        let Command::Summary(args) = cli.cmd else {
            panic!("expected summary");
        };
        assert_eq!(
            args.group_by,
            vec![GroupField::Workload, GroupField::System, GroupField::Nodes]
        );
        assert!(args.metrics.is_empty());
        assert_eq!(args.confidence, None);
        assert_eq!(args.output.format, OutputFormat::Text);
    }

    #[test]
    fn summary_metric_and_group_parsing() {
        let cli = Cli::try_parse_from([
            "benchlog",
            "summary",
            "--group-by",
            "system,try",
            "--metric",
            "Throughput",
            "--metric",
            "Read95thLatencyUs",
        ])
        .unwrap();
        let Command::Summary(args) = cli.cmd else {
            panic!("expected summary");
        };
        assert_eq!(args.group_by, vec![GroupField::System, GroupField::Try]);
        assert_eq!(
            args.metrics,
            vec![MetricField::Throughput, MetricField::Read95thLatencyUs]
        );
    }

    #[test]
    fn unknown_metric_is_rejected() {
        assert!(Cli::try_parse_from(["benchlog", "summary", "--metric", "ScanLatency"]).is_err());
    }

    #[test]
    fn flat_takes_phase_from_headers_only() {
        let cli = Cli::try_parse_from([
            "benchlog", "flat", "log.csv", "--system", "Redis", "--nodes", "3",
        ])
        .unwrap();
        assert!(matches!(cli.cmd, Command::Flat(_)));
        assert!(Cli::try_parse_from([
            "benchlog", "flat", "log.csv", "--system", "Redis", "--nodes", "3", "--phase", "load",
        ])
        .is_err());
    }

    #[test]
    fn flat_requires_positive_nodes() {
        assert!(Cli::try_parse_from([
            "benchlog", "flat", "log.csv", "--system", "Redis", "--nodes", "0"
        ])
        .is_err());
    }
}

use super::common::{emit, finish, load_input};
use crate::cli::args::{OutputArgs, OutputFormat, SummaryArgs};
use benchlog_core::report::{summary_text, to_json};
use benchlog_core::{summarize, Dataset, GroupField, MetricField};

pub fn run(args: SummaryArgs) -> anyhow::Result<i32> {
    let (cfg, dataset, diags) = load_input(&args.input)?;
    let confidence = args.confidence.unwrap_or(cfg.confidence);

    render(&dataset, &args.group_by, &args.metrics, confidence, &args.output)?;
    Ok(finish(&args.output, &diags))
}

pub(crate) fn render(
    dataset: &Dataset,
    group_by: &[GroupField],
    metrics: &[MetricField],
    confidence: f64,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    let table = summarize(dataset, group_by, metrics, confidence)?;
    let body = match output.format {
        OutputFormat::Text => summary_text(&table),
        OutputFormat::Json => to_json(&table)?,
    };
    emit(output, &body)
}

use super::common::{emit, finish, load_input};
use crate::cli::args::{DatasetArgs, OutputFormat};
use benchlog_core::report::{dataset_text, to_json};

pub fn run(args: DatasetArgs) -> anyhow::Result<i32> {
    let (_, dataset, diags) = load_input(&args.input)?;

    let body = match args.output.format {
        OutputFormat::Text => dataset_text(&dataset),
        OutputFormat::Json => to_json(&dataset)?,
    };
    emit(&args.output, &body)?;
    Ok(finish(&args.output, &diags))
}

use super::common::{finish, load_config};
use crate::cli::args::FlatArgs;
use anyhow::Context;
use benchlog_core::dataset::read_report;
use benchlog_core::{Assembler, GroupField, Layout, SourceIdentity};

/// Single-file analysis: the identity comes from the command line instead of
/// the file name, and trials are summarized per workload.
pub fn run(args: FlatArgs) -> anyhow::Result<i32> {
    let cfg = load_config(args.config.as_deref())?;
    let confidence = args.confidence.unwrap_or(cfg.confidence);
    let assembler = Assembler::new(&cfg)?;

    let file = args.file.display().to_string();
    let text = read_report(&args.file)?;
    let identity = SourceIdentity {
        file: file.clone(),
        phase: None,
        system: args.system.clone(),
        nodes: args.nodes,
        layout: Layout::Flat,
    };

    let mut assembly = assembler.start();
    assembler
        .add_identified(&mut assembly, &identity, &text)
        .with_context(|| format!("parsing {file}"))?;
    let (dataset, diags) = assembly.require_records(file.as_str())?.into_parts();

    super::summary::render(&dataset, &[GroupField::Workload], &[], confidence, &args.output)?;
    Ok(finish(&args.output, &diags))
}

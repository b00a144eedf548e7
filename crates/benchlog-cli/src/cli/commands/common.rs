use crate::cli::args::{InputArgs, OutputArgs};
use crate::exit_codes::{SUCCESS, WARNINGS};
use anyhow::Context;
use benchlog_core::report::diagnostics_summary;
use benchlog_core::{load_dir, AnalysisConfig, Assembler, Dataset, Diagnostics, Phase};
use std::io::Write;
use std::path::Path;

pub(crate) fn load_config(path: Option<&Path>) -> anyhow::Result<AnalysisConfig> {
    let cfg = AnalysisConfig::load_or_default(path)?;
    if let Some(p) = path {
        tracing::debug!(config = %p.display(), "loaded analysis config");
    }
    Ok(cfg)
}

/// Loads the results directory and applies the phase filter. A filter that
/// leaves no record is an empty dataset, same as an empty directory.
pub(crate) fn load_input(
    input: &InputArgs,
) -> anyhow::Result<(AnalysisConfig, Dataset, Diagnostics)> {
    let cfg = load_config(input.config.as_deref())?;
    let assembler = Assembler::new(&cfg)?;
    let (dataset, diags) = load_dir(&assembler, &input.dir)
        .with_context(|| format!("loading reports from {}", input.dir.display()))?
        .into_parts();
    let dataset = match input.phase {
        Some(p) => {
            let phase = Phase::from(p);
            dataset
                .filter_phase(phase)
                .require_records(format!("{} for phase {phase}", input.dir.display()))?
        }
        None => dataset,
    };
    Ok((cfg, dataset, diags))
}

/// Writes `body` to `--out` or stdout.
pub(crate) fn emit(output: &OutputArgs, body: &str) -> anyhow::Result<()> {
    match &output.out {
        Some(path) => {
            std::fs::write(path, body)
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(body.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Prints the diagnostic counts and picks the exit code.
pub(crate) fn finish(output: &OutputArgs, diags: &Diagnostics) -> i32 {
    if let Some(line) = diagnostics_summary(diags) {
        eprintln!("{line}");
    }
    if output.deny_warnings && diags.warning_count() > 0 {
        WARNINGS
    } else {
        SUCCESS
    }
}

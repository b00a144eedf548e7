//! Splits a report into per-trial segments.
//!
//! Sectioned reports are cut at full lines of `#`. Inside each block the
//! leading noise is dropped and the first header line opens the segment;
//! anything before it is stray output. Flat reports have no separators: each
//! header line opens a segment that runs to the next header.
//!
//! Headers without a trial number get the per-workload position of their
//! segment. A segment the record builder later drops still holds its number,
//! so surviving trials can have gaps.
//!
//! Iteration is lazy and borrows the report text, so calling
//! [`Segmenter::segment`] again restarts from the top.

use super::header::HeaderSet;
use crate::config::AnalysisConfig;
use crate::errors::{ConfigError, Diagnostic, DiagnosticKind, Severity};
use crate::model::{Layout, Phase, Workload};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Segment<'a> {
    pub phase: Phase,
    pub workload: Workload,
    pub trial: u32,
    /// Effective content, header line first.
    pub lines: Vec<&'a str>,
    /// 1-based block number within the report.
    pub index: usize,
}

/// A rejected block comes back as the diagnostic explaining why.
pub type SegmentResult<'a> = Result<Segment<'a>, Diagnostic>;

#[derive(Debug, Clone)]
pub struct Segmenter {
    headers: HeaderSet,
    noise: Vec<String>,
    workloads: Vec<String>,
}

impl Segmenter {
    pub fn new(headers: HeaderSet, noise: Vec<String>, workloads: Vec<String>) -> Self {
        Self {
            headers,
            noise,
            workloads,
        }
    }

    pub fn from_config(cfg: &AnalysisConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            HeaderSet::compile(&cfg.headers)?,
            cfg.noise.clone(),
            cfg.workloads.clone(),
        ))
    }

    pub fn segment<'s, 'a>(&'s self, text: &'a str, layout: Layout) -> Segments<'s, 'a> {
        Segments {
            segmenter: self,
            layout,
            lines: text.lines(),
            pending: None,
            done: false,
            block_index: 0,
            ordinals: HashMap::new(),
        }
    }

    fn is_noise(&self, line: &str) -> bool {
        self.noise.iter().any(|n| line.contains(n.as_str()))
    }

    fn parse_block<'a>(
        &self,
        block: &[&'a str],
        index: usize,
        ordinals: &mut HashMap<String, u32>,
    ) -> Option<SegmentResult<'a>> {
        let start = block
            .iter()
            .position(|l| !l.trim().is_empty() && !self.is_noise(l))?;
        let lines = &block[start..];

        let Some((pos, header)) = lines
            .iter()
            .copied()
            .enumerate()
            .find_map(|(i, l)| self.headers.find(l).map(|m| (i, m)))
        else {
            return Some(Err(Diagnostic::new(
                DiagnosticKind::UnparsableSegment,
                format!("segment {index} has no workload header; skipped"),
            )
            .with_severity(Severity::Note)
            .with_context(serde_json::json!({
                "segment": index,
                "first_line": preview(lines[0]),
            }))));
        };

        if !self.workloads.iter().any(|w| w == header.workload) {
            return Some(Err(Diagnostic::new(
                DiagnosticKind::UnparsableSegment,
                format!(
                    "segment {index}: unknown workload '{}' (expected one of {})",
                    header.workload,
                    self.workloads.join(", ")
                ),
            )
            .with_context(serde_json::json!({
                "segment": index,
                "header": preview(lines[pos]),
            }))));
        }

        let trial = match header.trial {
            Some(token) => match token.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Some(Err(Diagnostic::new(
                        DiagnosticKind::UnparsableSegment,
                        format!(
                            "segment {index}: trial '{token}' is not a positive integer"
                        ),
                    )
                    .with_context(serde_json::json!({
                        "segment": index,
                        "header": preview(lines[pos]),
                    }))));
                }
            },
            None => {
                let n = ordinals.entry(header.workload.to_string()).or_insert(0);
                *n += 1;
                *n
            }
        };

        Some(Ok(Segment {
            phase: header.phase,
            workload: Workload::new(header.workload),
            trial,
            lines: lines[pos..].iter().copied().map(str::trim).collect(),
            index,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct Segments<'s, 'a> {
    segmenter: &'s Segmenter,
    layout: Layout,
    lines: std::str::Lines<'a>,
    /// Flat layout: header row already read that opens the next block.
    pending: Option<&'a str>,
    done: bool,
    block_index: usize,
    ordinals: HashMap<String, u32>,
}

impl<'a> Segments<'_, 'a> {
    fn next_section(&mut self) -> Option<Vec<&'a str>> {
        if self.done {
            return None;
        }
        let mut block = Vec::new();
        loop {
            match self.lines.next() {
                None => {
                    self.done = true;
                    return Some(block);
                }
                Some(line) if is_separator(line) => return Some(block),
                Some(line) => block.push(line),
            }
        }
    }

    fn next_flat_block(&mut self) -> Option<Vec<&'a str>> {
        let header = match self.pending.take() {
            Some(h) => h,
            None => {
                if self.done {
                    return None;
                }
                loop {
                    let Some(raw) = self.lines.next() else {
                        self.done = true;
                        return None;
                    };
                    let row = flat_row(raw);
                    if self.segmenter.headers.find(row).is_some() {
                        break row;
                    }
                }
            }
        };

        let mut block = vec![header];
        loop {
            let Some(raw) = self.lines.next() else {
                self.done = true;
                return Some(block);
            };
            let row = flat_row(raw);
            if self.segmenter.headers.find(row).is_some() {
                self.pending = Some(row);
                return Some(block);
            }
            block.push(row);
        }
    }
}

impl<'a> Iterator for Segments<'_, 'a> {
    type Item = SegmentResult<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let block = match self.layout {
                Layout::Sectioned => self.next_section()?,
                Layout::Flat => self.next_flat_block()?,
            };
            self.block_index += 1;
            if let Some(item) =
                self.segmenter
                    .parse_block(&block, self.block_index, &mut self.ordinals)
            {
                return Some(item);
            }
        }
    }
}

/// A full line of one or more `#`.
fn is_separator(line: &str) -> bool {
    let t = line.trim_end();
    !t.is_empty() && t.bytes().all(|b| b == b'#')
}

/// First `;` field of a flat-layout row, unquoted.
fn flat_row(raw: &str) -> &str {
    let field = raw.split(';').next().unwrap_or_default().trim();
    if field.len() >= 2 && field.starts_with('"') && field.ends_with('"') {
        field[1..field.len() - 1].trim()
    } else {
        field
    }
}

fn preview(line: &str) -> String {
    line.trim().chars().take(60).collect()
}

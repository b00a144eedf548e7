//! Declarative header templates.
//!
//! A template such as `Running workload {workload} try {trial}` compiles to an
//! anchored regex: literal text is escaped, whitespace runs match `\s+`, and
//! each placeholder captures one token (no whitespace, `,` or `;`). Values are
//! validated by the segmenter, not here, so a bad token still identifies the
//! line as a header.

use crate::config::HeaderTemplateConfig;
use crate::errors::ConfigError;
use crate::model::Phase;
use regex::Regex;

const WORKLOAD: &str = "{workload}";
const TRIAL: &str = "{trial}";
const TOKEN: &str = r"[^\s,;]+";

#[derive(Debug, Clone)]
pub struct HeaderTemplate {
    template: String,
    phase: Phase,
    regex: Regex,
    has_trial: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderMatch<'a> {
    pub phase: Phase,
    pub workload: &'a str,
    /// `None` for templates without `{trial}`; the trial is then ordinal.
    pub trial: Option<&'a str>,
}

impl HeaderTemplate {
    pub fn compile(cfg: &HeaderTemplateConfig) -> Result<Self, ConfigError> {
        let template = cfg.template.trim();
        let invalid = |reason: &str| ConfigError::HeaderTemplate {
            template: cfg.template.clone(),
            reason: reason.to_string(),
        };

        if template.matches(WORKLOAD).count() != 1 {
            return Err(invalid("expected exactly one {workload} placeholder"));
        }
        let trial_count = template.matches(TRIAL).count();
        if trial_count > 1 {
            return Err(invalid("at most one {trial} placeholder is allowed"));
        }

        let mut pattern = String::from("^");
        let mut rest = template;
        while let Some((idx, placeholder)) = next_placeholder(rest) {
            let literal = &rest[..idx];
            if literal.contains(['{', '}']) {
                return Err(invalid("unknown placeholder"));
            }
            pattern.push_str(&literal_pattern(literal));
            let group = if placeholder == WORKLOAD {
                "workload"
            } else {
                "trial"
            };
            pattern.push_str(&format!("(?P<{group}>{TOKEN})"));
            rest = &rest[idx + placeholder.len()..];
        }
        if rest.contains(['{', '}']) {
            return Err(invalid("unknown placeholder"));
        }
        pattern.push_str(&literal_pattern(rest));

        let regex = Regex::new(&pattern).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self {
            template: template.to_string(),
            phase: cfg.phase,
            regex,
            has_trial: trial_count == 1,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn has_trial(&self) -> bool {
        self.has_trial
    }

    pub fn match_line<'a>(&self, line: &'a str) -> Option<HeaderMatch<'a>> {
        let caps = self.regex.captures(line.trim())?;
        let workload = caps.name("workload")?.as_str();
        let trial = caps.name("trial").map(|m| m.as_str());
        Some(HeaderMatch {
            phase: self.phase,
            workload,
            trial,
        })
    }
}

fn next_placeholder(s: &str) -> Option<(usize, &'static str)> {
    [WORKLOAD, TRIAL]
        .into_iter()
        .filter_map(|p| s.find(p).map(|idx| (idx, p)))
        .min_by_key(|(idx, _)| *idx)
}

fn literal_pattern(literal: &str) -> String {
    let mut out = String::new();
    let mut in_space = false;
    let mut buf = [0u8; 4];
    for ch in literal.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push_str(r"\s+");
                in_space = true;
            }
        } else {
            in_space = false;
            out.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
        }
    }
    out
}

/// Ordered template table; the first matching template wins.
#[derive(Debug, Clone)]
pub struct HeaderSet {
    templates: Vec<HeaderTemplate>,
}

impl HeaderSet {
    pub fn compile(configs: &[HeaderTemplateConfig]) -> Result<Self, ConfigError> {
        let templates = configs
            .iter()
            .map(HeaderTemplate::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { templates })
    }

    pub fn find<'a>(&self, line: &'a str) -> Option<HeaderMatch<'a>> {
        self.templates.iter().find_map(|t| t.match_line(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;

    fn defaults() -> HeaderSet {
        HeaderSet::compile(&AnalysisConfig::default().headers).unwrap()
    }

    #[test]
    fn matches_all_default_phrasings() {
        let set = defaults();

        let m = set.find("Loading workload A try 1").unwrap();
        assert_eq!((m.phase, m.workload, m.trial), (Phase::Load, "A", Some("1")));

        let m = set.find("  Running workload C try 12").unwrap();
        assert_eq!((m.phase, m.workload, m.trial), (Phase::Run, "C", Some("12")));

        let m = set.find("Loading data worload B").unwrap();
        assert_eq!((m.phase, m.workload, m.trial), (Phase::Load, "B", None));

        let m = set.find("Running test workoad A").unwrap();
        assert_eq!((m.phase, m.workload, m.trial), (Phase::Run, "A", None));
    }

    #[test]
    fn misspelling_is_literal() {
        let set = defaults();
        assert!(set.find("Loading data workload A").is_none());
        assert!(set.find("Running test workload A").is_none());
    }

    #[test]
    fn header_must_start_the_line() {
        let set = defaults();
        assert!(set.find("note: Running workload A try 1").is_none());
    }

    #[test]
    fn tolerates_extra_whitespace_and_trailing_text() {
        let set = defaults();
        let m = set.find("Running   workload B  try 3, started").unwrap();
        assert_eq!((m.workload, m.trial), ("B", Some("3")));
    }

    #[test]
    fn captures_bad_tokens_for_later_validation() {
        let set = defaults();
        let m = set.find("Running workload Z try x").unwrap();
        assert_eq!((m.workload, m.trial), ("Z", Some("x")));
    }

    #[test]
    fn regex_metacharacters_in_template_are_escaped() {
        let t = HeaderTemplate::compile(&HeaderTemplateConfig {
            template: "[run] (workload) {workload}.{trial}".into(),
            phase: Phase::Run,
        })
        .unwrap();
        let m = t.match_line("[run] (workload) A.2").unwrap();
        assert_eq!((m.workload, m.trial), ("A", Some("2")));
        assert!(t.match_line("xrunx (workload) A.2").is_none());
    }

    #[test]
    fn unknown_placeholder_is_rejected() {
        let err = HeaderTemplate::compile(&HeaderTemplateConfig {
            template: "Running {workload} on {system}".into(),
            phase: Phase::Run,
        })
        .unwrap_err();
        assert!(err.to_string().contains("unknown placeholder"));
    }
}

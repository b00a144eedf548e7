use crate::config::FilePatternConfig;
use crate::errors::ConfigError;
use crate::model::{Layout, Phase};
use regex::Regex;

const REQUIRED_GROUPS: [&str; 3] = ["phase", "system", "nodes"];

/// What a report's file name says about its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceIdentity {
    pub file: String,
    /// Phase implied by the file name, if any. Header lines still decide the
    /// phase of every record.
    pub phase: Option<Phase>,
    pub system: String,
    pub nodes: u32,
    pub layout: Layout,
}

#[derive(Debug, Clone)]
pub struct FilePattern {
    regex: Regex,
    layout: Layout,
}

impl FilePattern {
    pub fn compile(cfg: &FilePatternConfig) -> Result<Self, ConfigError> {
        let regex = Regex::new(&cfg.pattern).map_err(|e| ConfigError::FilePattern {
            pattern: cfg.pattern.clone(),
            reason: e.to_string(),
        })?;
        let names: Vec<&str> = regex.capture_names().flatten().collect();
        if let Some(missing) = REQUIRED_GROUPS.iter().find(|g| !names.contains(*g)) {
            return Err(ConfigError::FilePattern {
                pattern: cfg.pattern.clone(),
                reason: format!("missing named group '{missing}'"),
            });
        }
        Ok(Self {
            regex,
            layout: cfg.layout,
        })
    }

    /// `None` unless the whole identity can be read from `file_name`; the node
    /// count must be a positive integer.
    pub fn identify(&self, file_name: &str) -> Option<SourceIdentity> {
        let caps = self.regex.captures(file_name)?;
        let phase = Phase::from_prefix(caps.name("phase")?.as_str())?;
        let system = caps.name("system")?.as_str();
        let nodes = caps.name("nodes")?.as_str().parse::<u32>().ok()?;
        if system.is_empty() || nodes == 0 {
            return None;
        }
        Some(SourceIdentity {
            file: file_name.to_string(),
            phase: Some(phase),
            system: system.to_string(),
            nodes,
            layout: self.layout,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FilePatterns {
    patterns: Vec<FilePattern>,
}

impl FilePatterns {
    pub fn compile(configs: &[FilePatternConfig]) -> Result<Self, ConfigError> {
        let patterns = configs
            .iter()
            .map(FilePattern::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn identify(&self, file_name: &str) -> Option<SourceIdentity> {
        self.patterns.iter().find_map(|p| p.identify(file_name))
    }
}

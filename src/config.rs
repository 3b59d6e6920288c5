use crate::error::{Result, UpkeepError};
use crate::registry::packagist::DEFAULT_REGISTRY;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const CONFIG_FILE: &str = "upkeep.toml";

/// Settings read from `upkeep.toml`; every key is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Composer v2 metadata mirror
    pub registry: String,
    /// Per-request registry timeout
    pub timeout_secs: u64,
    /// Max depth of the transitive impact walk
    pub impact_depth: usize,
    /// Consider `require-dev` packages as upgrade candidates
    pub include_dev: bool,
    /// Package names or `*`/`?` globs never proposed for upgrade
    pub ignore: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry: DEFAULT_REGISTRY.to_string(),
            timeout_secs: 5,
            impact_depth: 5,
            include_dev: true,
            ignore: Vec::new(),
        }
    }
}

impl Config {
    /// Load `upkeep.toml` from the project directory, falling back to defaults.
    pub fn load<P: AsRef<Path>>(project_path: P) -> Result<Self> {
        let path = project_path.as_ref().join(CONFIG_FILE);
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(UpkeepError::Config(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.impact_depth == 0 {
            return Err(UpkeepError::Config(
                "impact_depth must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ignore_list(&self) -> Result<IgnoreList> {
        IgnoreList::new(&self.ignore)
    }
}

/// Case-insensitive package name globs.
#[derive(Debug, Default)]
pub struct IgnoreList {
    patterns: Vec<Regex>,
}

impl IgnoreList {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(Self::compile_glob)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(name))
    }

    fn compile_glob(pattern: &str) -> Result<Regex> {
        let mut regex = String::from("(?i)^");
        for ch in pattern.chars() {
            match ch {
                '*' => regex.push_str(".*"),
                '?' => regex.push('.'),
                '.' | '+' | '(' | ')' | '|' | '^' | '$' | '{' | '}' | '[' | ']' | '\\' => {
                    regex.push('\\');
                    regex.push(ch);
                }
                _ => regex.push(ch),
            }
        }
        regex.push('$');

        Regex::new(&regex).map_err(|e| {
            UpkeepError::Config(format!("Invalid ignore pattern '{}': {}", pattern, e))
        })
    }
}

//! Project configuration: recognised runner methods, file selection, and per-rule settings.
//!
//! Loaded from TOML. Every table is optional; missing keys fall back to the
//! defaults shown below.
//!
//! ```toml
//! [language]
//! runners = ["to", "not_to", "to_not"]
//!
//! [files]
//! include = ["_spec.rb"]
//! exclude = ["vendor", ".git", "node_modules", "tmp"]
//!
//! [rules."RSpec/ExpectationTargetMethod"]
//! enabled = true
//! severity = "convention"
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::Severity;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SPECWARDEN_CONFIG";

/// Config file looked up in the current directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = ".specwarden.toml";

const DEFAULT_RUNNERS: &[&str] = &["to", "not_to", "to_not"];
const DEFAULT_INCLUDE: &[&str] = &["_spec.rb"];
const DEFAULT_EXCLUDE: &[&str] = &["vendor", ".git", "node_modules", "tmp"];

/// Errors produced while locating, reading, or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading the config file.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// The file is not valid TOML or does not match the schema.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// `language.runners` was configured as an empty list.
    #[error("`language.runners` must name at least one runner method")]
    EmptyRunners,
}

/// The closed set of method names that turn an expectation target into an assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerSet {
    names: BTreeSet<String>,
}

impl RunnerSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if `method` is a recognised runner.
    pub fn is_runner(&self, method: &str) -> bool {
        self.names.contains(method)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for RunnerSet {
    fn default() -> Self {
        Self::new(DEFAULT_RUNNERS.iter().copied())
    }
}

/// Which files a project scan inspects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// File-name suffixes that are inspected (e.g. `_spec.rb`).
    pub include: Vec<String>,
    /// Directory names that are never entered.
    pub exclude: Vec<String>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            include: DEFAULT_INCLUDE.iter().map(|s| s.to_string()).collect(),
            exclude: DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FileConfig {
    /// Returns `true` if `file_name` ends with one of the include suffixes.
    pub fn includes(&self, file_name: &str) -> bool {
        self.include.iter().any(|suffix| file_name.ends_with(suffix.as_str()))
    }

    /// Returns `true` if a directory called `dir_name` must be skipped.
    pub fn excludes_dir(&self, dir_name: &str) -> bool {
        self.exclude.iter().any(|d| d == dir_name)
    }
}

/// Per-rule switches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleConfig {
    pub enabled: bool,
    /// Overrides the rule's default severity when set.
    pub severity: Option<Severity>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            severity: None,
        }
    }
}

/// Fully resolved configuration for one analysis run.
#[derive(Debug, Clone, Default)]
pub struct LintConfig {
    pub runners: RunnerSet,
    pub files: FileConfig,
    pub rules: HashMap<String, RuleConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    language: RawLanguage,
    files: FileConfig,
    rules: HashMap<String, RuleConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawLanguage {
    runners: Option<Vec<String>>,
}

impl LintConfig {
    /// Parses configuration from TOML text. `origin` is only used in error messages.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

        let runners = match raw.language.runners {
            Some(names) if names.is_empty() => return Err(ConfigError::EmptyRunners),
            Some(names) => RunnerSet::new(names),
            None => RunnerSet::default(),
        };

        Ok(Self {
            runners,
            files: raw.files,
            rules: raw.rules,
        })
    }

    /// Reads and parses a config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text, path)?;
        debug!(path = %path.display(), runners = config.runners.len(), "config loaded");
        Ok(config)
    }

    /// Loads configuration.
    ///
    /// Lookup order:
    /// 1. `explicit`, if given (must exist)
    /// 2. the path in `SPECWARDEN_CONFIG`, if set (must exist)
    /// 3. `.specwarden.toml` in the current directory (defaults if absent)
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            debug!("Loading config from {CONFIG_ENV}={path:?}");
            return Self::load_from(Path::new(&path));
        }
        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        if fallback.exists() {
            Self::load_from(fallback)
        } else {
            debug!("no {DEFAULT_CONFIG_FILE} found; using defaults");
            Ok(Self::default())
        }
    }

    /// Settings for the rule called `name` (defaults when unconfigured).
    pub fn rule(&self, name: &str) -> RuleConfig {
        self.rules.get(name).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use test_case::test_case;

    fn parse(text: &str) -> Result<LintConfig, ConfigError> {
        LintConfig::from_toml(text, Path::new("test.toml"))
    }

    #[test]
    fn test_default_runners() {
        let runners = RunnerSet::default();
        assert!(runners.is_runner("to"));
        assert!(runners.is_runner("not_to"));
        assert!(runners.is_runner("to_not"));
        assert!(!runners.is_runner("kind_of?"));
        assert!(!runners.is_runner("=="));
        assert_eq!(runners.len(), 3);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.runners, RunnerSet::default());
        assert_eq!(config.files, FileConfig::default());
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_custom_runners_replace_defaults() {
        let config = parse("[language]\nrunners = [\"to\", \"should\"]\n").unwrap();
        assert!(config.runners.is_runner("should"));
        assert!(!config.runners.is_runner("not_to"));
    }

    #[test]
    fn test_empty_runners_rejected() {
        let err = parse("[language]\nrunners = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyRunners));
    }

    #[test]
    fn test_unknown_table_rejected() {
        let err = parse("[mystery]\nkey = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test_case("[language]\nrunner = [\"should\"]\n" ; "misspelled runners")]
    #[test_case("[rules.\"RSpec/ExpectationTargetMethod\"]\nenable = false\n" ; "misspelled enabled")]
    #[test_case("[files]\nincludes = [\"_test.rb\"]\n" ; "misspelled include")]
    fn test_unknown_key_rejected(text: &str) {
        let err = parse(text).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_rule_overrides() {
        let config = parse(
            "[rules.\"RSpec/ExpectationTargetMethod\"]\nenabled = false\nseverity = \"error\"\n",
        )
        .unwrap();
        let rule = config.rule("RSpec/ExpectationTargetMethod");
        assert!(!rule.enabled);
        assert_eq!(rule.severity, Some(Severity::Error));

        // Unconfigured rules are enabled with their default severity.
        assert_eq!(config.rule("RSpec/Other"), RuleConfig::default());
    }

    #[test]
    fn test_file_selection() {
        let files = FileConfig::default();
        assert!(files.includes("user_spec.rb"));
        assert!(!files.includes("user.rb"));
        assert!(files.excludes_dir("vendor"));
        assert!(!files.excludes_dir("spec"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[files]\ninclude = [\"_test.rb\"]").unwrap();

        let config = LintConfig::load_from(file.path()).unwrap();
        assert!(config.files.includes("user_test.rb"));
        assert!(!config.files.includes("user_spec.rb"));
        // Untouched keys keep defaults.
        assert!(config.files.excludes_dir("vendor"));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let err = LintConfig::load(Some(Path::new("/this/does/not/exist.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}

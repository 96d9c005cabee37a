//! Configuration loading and parsing for kensa
//!
//! Provides functionality to load and parse `kensa.toml` configuration files.
//! Rule option tables are kept as raw values and handed to each rule, which
//! deserializes them into its own option record.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::rules::Severity;

pub const CONFIG_FILENAME: &str = "kensa.toml";

const KNOWN_TOP_LEVEL_KEYS: &[&str] = &["include", "exclude", "rules", "compiler"];
const KNOWN_RULES_KEYS: &[&str] = &["disabled", "severity", "options"];
const KNOWN_COMPILER_KEYS: &[&str] = &["strict_null_checks"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid TOML in '{path}': {message}")]
    ParseError { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Default)]
pub struct ConfigResult {
    pub config: Config,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub rules: RulesConfig,
    pub compiler: CompilerConfig,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    pub disabled: Vec<String>,
    pub severity: HashMap<String, SeverityValue>,
    pub options: HashMap<String, toml::Value>,
}

impl RulesConfig {
    /// Option table for a rule, looked up by id first and then by name.
    ///
    /// Returns `Value::Null` when the rule has no table, which every rule
    /// treats as "use defaults".
    pub fn options_for(&self, id: &str, name: &str) -> serde_json::Value {
        self.options
            .get(id)
            .or_else(|| self.options.get(name))
            .and_then(|value| serde_json::to_value(value).ok())
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Settings of the host type system that rules depend on.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompilerConfig {
    pub strict_null_checks: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            strict_null_checks: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SeverityValue {
    Error,
    Warning,
    Info,
    Hint,
}

impl From<SeverityValue> for Severity {
    fn from(value: SeverityValue) -> Self {
        match value {
            SeverityValue::Error => Severity::Error,
            SeverityValue::Warning => Severity::Warning,
            SeverityValue::Info => Severity::Info,
            SeverityValue::Hint => Severity::Hint,
        }
    }
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if !current.pop() {
            return None;
        }
    }
}

fn read_config(path: &Path) -> Result<(String, Config), ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })?;

    Ok((content, config))
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    read_config(path).map(|(_, config)| config)
}

pub fn load_config_with_warnings(path: &Path) -> Result<ConfigResult, ConfigError> {
    let (content, config) = read_config(path)?;
    let warnings = detect_unknown_keys(&content);

    Ok(ConfigResult { config, warnings })
}

fn detect_unknown_keys(content: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    let table: toml::Table = match content.parse() {
        Ok(t) => t,
        Err(_) => return warnings,
    };

    check_section(&table, None, KNOWN_TOP_LEVEL_KEYS, &mut warnings);

    if let Some(toml::Value::Table(rules)) = table.get("rules") {
        check_section(rules, Some("rules"), KNOWN_RULES_KEYS, &mut warnings);
    }
    if let Some(toml::Value::Table(compiler)) = table.get("compiler") {
        check_section(compiler, Some("compiler"), KNOWN_COMPILER_KEYS, &mut warnings);
    }

    warnings
}

fn check_section(
    table: &toml::Table,
    section: Option<&str>,
    known: &[&str],
    warnings: &mut Vec<String>,
) {
    let known: HashSet<&str> = known.iter().copied().collect();
    for key in table.keys() {
        if known.contains(key.as_str()) {
            continue;
        }
        match section {
            Some(section) => {
                warnings.push(format!("Unknown config option in [{}]: '{}'", section, key))
            }
            None => warnings.push(format!("Unknown config option: '{}'", key)),
        }
    }
}

pub fn load_config_or_default(start_dir: &Path) -> Config {
    find_config_file(start_dir)
        .and_then(|path| load_config(&path).ok())
        .unwrap_or_default()
}

pub fn load_config_or_default_with_warnings(start_dir: &Path) -> ConfigResult {
    match find_config_file(start_dir) {
        Some(path) => load_config_with_warnings(&path).unwrap_or_default(),
        None => ConfigResult::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn create_temp_dir() -> tempfile::TempDir {
        tempfile::tempdir().expect("Failed to create temp dir")
    }

    #[test]
    fn load_config_from_file() {
        let dir = create_temp_dir();
        let config_path = dir.path().join(CONFIG_FILENAME);
        fs::write(
            &config_path,
            r#"
include = ["src/**/*.ts"]
exclude = ["**/*.test.ts"]

[rules]
disabled = ["strict-boolean-expressions"]

[rules.severity]
no-unused-vars = "error"

[rules.options.no-unused-vars]
args = "all"
varsIgnorePattern = "^_"
"#,
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();

        assert_eq!(config.include, vec!["src/**/*.ts"]);
        assert_eq!(config.exclude, vec!["**/*.test.ts"]);
        assert_eq!(config.rules.disabled, vec!["strict-boolean-expressions"]);
        assert_eq!(
            config.rules.severity.get("no-unused-vars"),
            Some(&SeverityValue::Error)
        );
        assert!(config.rules.options.contains_key("no-unused-vars"));
    }

    #[test]
    fn default_config_when_missing() {
        let dir = create_temp_dir();
        let config = load_config_or_default(dir.path());

        assert_eq!(config, Config::default());
        assert!(config.include.is_empty());
        assert!(config.rules.disabled.is_empty());
        assert!(config.compiler.strict_null_checks);
    }

    #[test]
    fn error_on_invalid_toml() {
        let dir = create_temp_dir();
        let config_path = dir.path().join(CONFIG_FILENAME);
        fs::write(&config_path, "this is not valid { toml }").unwrap();

        let result = load_config(&config_path);

        match result {
            Err(ConfigError::ParseError { path, message }) => {
                assert_eq!(path, config_path);
                assert!(!message.is_empty());
            }
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn find_config_file_in_parent_directory() {
        let dir = create_temp_dir();
        let config_path = dir.path().join(CONFIG_FILENAME);
        fs::write(&config_path, "").unwrap();
        let nested = dir.path().join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();

        let found = find_config_file(&nested);

        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn compiler_section_disables_strict_null_checks() {
        let dir = create_temp_dir();
        let config_path = dir.path().join(CONFIG_FILENAME);
        fs::write(&config_path, "[compiler]\nstrict_null_checks = false\n").unwrap();

        let config = load_config(&config_path).unwrap();

        assert!(!config.compiler.strict_null_checks);
    }

    #[test]
    fn options_for_converts_table_to_json() {
        let config: Config = toml::from_str(
            r#"
[rules.options.strict-boolean-expressions]
allowString = false
"#,
        )
        .unwrap();

        let options = config
            .rules
            .options_for("Q002", "strict-boolean-expressions");

        assert_eq!(options["allowString"], serde_json::Value::Bool(false));
        assert!(config.rules.options_for("Q001", "no-unused-vars").is_null());
    }

    #[test]
    fn warns_on_unknown_keys() {
        let dir = create_temp_dir();
        let config_path = dir.path().join(CONFIG_FILENAME);
        fs::write(
            &config_path,
            "verbose = true\n[rules]\nenabled = []\n[compiler]\nstrict = true\n",
        )
        .unwrap();

        let result = load_config_with_warnings(&config_path).unwrap();

        assert_eq!(result.warnings.len(), 3);
        assert!(result.warnings.iter().any(|w| w.contains("'verbose'")));
        assert!(result.warnings.iter().any(|w| w.contains("[rules]: 'enabled'")));
        assert!(result.warnings.iter().any(|w| w.contains("[compiler]: 'strict'")));
    }

    #[test]
    fn load_config_or_default_with_warnings_returns_empty_when_no_config() {
        let dir = create_temp_dir();

        let result = load_config_or_default_with_warnings(dir.path());

        assert!(result.warnings.is_empty());
        assert_eq!(result.config, Config::default());
    }
}

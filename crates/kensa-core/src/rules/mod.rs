//! Rule system for code analysis
//!
//! Rules consume the per-file [`RuleContext`] (program model, binding index,
//! def/use chains, condition sites) and report [`Diagnostic`]s.

pub mod context;
pub mod helpers;
pub mod quality;

use std::collections::{HashMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::Serialize;
use tracing::{debug, error, warn};

use crate::config::{CompilerConfig, Config};
use crate::diagnostic::Diagnostic;
use crate::parser::ParsedFile;
use crate::program::ProgramModel;
use crate::semantic::{BindingIndex, DefUseResolver, ResolvedSite};

pub use context::RuleContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleCategory {
    Quality,
    /// Needs type information; only runs on TypeScript sources.
    TypeAware,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMetadata {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: RuleCategory,
    pub severity: Severity,
    pub docs_url: Option<&'static str>,
}

#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("invalid options for rule '{rule}': {source}")]
    Malformed {
        rule: &'static str,
        source: serde_json::Error,
    },
    #[error("invalid pattern '{pattern}' in option '{option}' of rule '{rule}': {source}")]
    Pattern {
        rule: &'static str,
        option: &'static str,
        pattern: String,
        source: regex::Error,
    },
}

pub trait Rule: Send + Sync {
    fn metadata(&self) -> &RuleMetadata;

    /// Applies an already-parsed option record. On error the rule keeps its
    /// previous options.
    fn configure(&mut self, _options: &serde_json::Value) -> Result<(), OptionsError> {
        Ok(())
    }

    fn check(&self, ctx: &RuleContext<'_, '_, '_>) -> Vec<Diagnostic>;
}

pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
    disabled_rules: HashSet<String>,
    severity_overrides: HashMap<String, Severity>,
    compiler: CompilerConfig,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            disabled_rules: HashSet::new(),
            severity_overrides: HashMap::new(),
            compiler: CompilerConfig::default(),
        }
    }

    /// Registry holding every rule shipped with the crate.
    pub fn with_builtin_rules() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(quality::NoUnusedVars::new()));
        registry.register(Box::new(quality::StrictBooleanExpressions::new()));
        registry
    }

    pub fn register(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn configure(&mut self, config: &Config) {
        self.disabled_rules = config.rules.disabled.iter().cloned().collect();
        self.severity_overrides = config
            .rules
            .severity
            .iter()
            .map(|(rule_ref, severity)| (rule_ref.clone(), (*severity).into()))
            .collect();
        self.compiler = config.compiler.clone();

        for rule in &mut self.rules {
            let (id, name) = (rule.metadata().id, rule.metadata().name);
            let options = config.rules.options_for(id, name);
            if options.is_null() {
                continue;
            }
            if let Err(err) = rule.configure(&options) {
                warn!(rule = id, error = %err, "ignoring invalid rule options");
            }
        }
    }

    pub fn compiler(&self) -> &CompilerConfig {
        &self.compiler
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Builds the shared analysis for `file` and runs every enabled rule.
    pub fn run_all(&self, file: &ParsedFile) -> Vec<Diagnostic> {
        let Some(model) = ProgramModel::build(file) else {
            return Vec::new();
        };
        let index = BindingIndex::build(&model);
        let defuse = DefUseResolver::build(&index);
        let sites = ResolvedSite::resolve_all(&model);
        let ctx = RuleContext::new(&model, &index, &defuse, &sites, &self.compiler);
        self.run_with(&ctx)
    }

    /// Runs every enabled rule against prepared analysis state. A rule that
    /// panics is logged and skipped.
    pub fn run_with(&self, ctx: &RuleContext<'_, '_, '_>) -> Vec<Diagnostic> {
        let is_typescript = ctx.file().metadata().language.is_typescript();

        self.rules
            .iter()
            .filter(|rule| self.should_run_rule(rule.as_ref(), is_typescript))
            .flat_map(|rule| {
                let metadata = rule.metadata();
                debug!(rule = metadata.id, file = ctx.filename(), "running rule");
                match catch_unwind(AssertUnwindSafe(|| rule.check(ctx))) {
                    Ok(mut diagnostics) => {
                        self.apply_severity_overrides(rule.as_ref(), &mut diagnostics);
                        diagnostics
                    }
                    Err(_) => {
                        error!(
                            rule = metadata.id,
                            file = ctx.filename(),
                            "rule panicked, skipping its findings for this file"
                        );
                        Vec::new()
                    }
                }
            })
            .collect()
    }

    fn should_run_rule(&self, rule: &dyn Rule, is_typescript: bool) -> bool {
        let metadata = rule.metadata();
        if metadata.category == RuleCategory::TypeAware && !is_typescript {
            return false;
        }
        !self.is_rule_disabled(metadata)
    }

    fn is_rule_disabled(&self, metadata: &RuleMetadata) -> bool {
        self.disabled_rules.contains(metadata.id) || self.disabled_rules.contains(metadata.name)
    }

    fn apply_severity_overrides(&self, rule: &dyn Rule, diagnostics: &mut [Diagnostic]) {
        let metadata = rule.metadata();

        let override_severity = self
            .severity_overrides
            .get(metadata.id)
            .or_else(|| self.severity_overrides.get(metadata.name));

        if let Some(severity) = override_severity {
            for diag in diagnostics.iter_mut() {
                diag.severity = *severity;
            }
        }
    }

    pub fn is_rule_enabled(&self, id_or_name: &str) -> bool {
        self.get_rule(id_or_name)
            .or_else(|| self.get_rule_by_name(id_or_name))
            .is_some_and(|rule| !self.is_rule_disabled(rule.metadata()))
    }

    pub fn get_rule(&self, id: &str) -> Option<&dyn Rule> {
        self.rules
            .iter()
            .find(|r| r.metadata().id == id)
            .map(|r| r.as_ref())
    }

    pub fn get_rule_by_name(&self, name: &str) -> Option<&dyn Rule> {
        self.rules
            .iter()
            .find(|r| r.metadata().name == name)
            .map(|r| r.as_ref())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Declares a rule struct with its metadata and, optionally, an options
/// field initialized from `Default`.
#[macro_export]
macro_rules! declare_rule {
    (
        $name:ident,
        id = $id:literal,
        name = $rule_name:literal,
        description = $desc:literal,
        category = $cat:ident,
        severity = $sev:ident,
        options = $options:ty
        $(, docs_url = $url:literal)?
    ) => {
        pub struct $name {
            metadata: $crate::rules::RuleMetadata,
            options: $options,
        }

        impl $name {
            pub fn new() -> Self {
                Self {
                    metadata: $crate::declare_rule!(@metadata $id, $rule_name, $desc, $cat, $sev $(, $url)?),
                    options: <$options>::default(),
                }
            }

            pub fn with_options(options: $options) -> Self {
                Self {
                    options,
                    ..Self::new()
                }
            }

            pub fn options(&self) -> &$options {
                &self.options
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
    (
        $name:ident,
        id = $id:literal,
        name = $rule_name:literal,
        description = $desc:literal,
        category = $cat:ident,
        severity = $sev:ident
        $(, docs_url = $url:literal)?
    ) => {
        pub struct $name {
            metadata: $crate::rules::RuleMetadata,
        }

        impl $name {
            pub fn new() -> Self {
                Self {
                    metadata: $crate::declare_rule!(@metadata $id, $rule_name, $desc, $cat, $sev $(, $url)?),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
    (@metadata $id:literal, $rule_name:literal, $desc:literal, $cat:ident, $sev:ident $(, $url:literal)?) => {
        $crate::rules::RuleMetadata {
            id: $id,
            name: $rule_name,
            description: $desc,
            category: $crate::rules::RuleCategory::$cat,
            severity: $crate::rules::Severity::$sev,
            docs_url: $crate::declare_rule!(@docs_url $($url)?),
        }
    };
    (@docs_url $url:literal) => { Some($url) };
    (@docs_url) => { None };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeverityValue;

    struct TestRule {
        metadata: RuleMetadata,
        diagnostics_to_return: Vec<Diagnostic>,
        panics: bool,
    }

    impl TestRule {
        fn new(id: &'static str) -> Self {
            Self {
                metadata: RuleMetadata {
                    id,
                    name: "test-rule",
                    description: "A test rule",
                    category: RuleCategory::Quality,
                    severity: Severity::Warning,
                    docs_url: None,
                },
                diagnostics_to_return: Vec::new(),
                panics: false,
            }
        }

        fn with_name(mut self, name: &'static str) -> Self {
            self.metadata.name = name;
            self
        }

        fn with_category(mut self, category: RuleCategory) -> Self {
            self.metadata.category = category;
            self
        }

        fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
            self.diagnostics_to_return.push(diagnostic);
            self
        }

        fn panicking(mut self) -> Self {
            self.panics = true;
            self
        }
    }

    impl Rule for TestRule {
        fn metadata(&self) -> &RuleMetadata {
            &self.metadata
        }

        fn check(&self, _ctx: &RuleContext<'_, '_, '_>) -> Vec<Diagnostic> {
            if self.panics {
                panic!("unexpected node shape");
            }
            self.diagnostics_to_return.clone()
        }
    }

    fn diagnostic(id: &str, line: usize) -> Diagnostic {
        Diagnostic::new(id, Severity::Warning, "Issue", "test.ts", line, 1)
    }

    #[test]
    fn run_all_collects_diagnostics_in_registration_order() {
        let mut registry = RuleRegistry::new();
        registry.register(Box::new(TestRule::new("T001").with_diagnostic(diagnostic("T001", 1))));
        registry.register(Box::new(TestRule::new("T002").with_diagnostic(diagnostic("T002", 2))));

        let file = ParsedFile::from_source("test.ts", "const x = 1;\nconst y = 2;");
        let diagnostics = registry.run_all(&file);

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].rule_id, "T001");
        assert_eq!(diagnostics[1].rule_id, "T002");
    }

    #[test]
    fn panicking_rule_does_not_affect_others() {
        let mut registry = RuleRegistry::new();
        registry.register(Box::new(TestRule::new("T001").panicking()));
        registry.register(Box::new(TestRule::new("T002").with_diagnostic(diagnostic("T002", 1))));

        let file = ParsedFile::from_source("test.ts", "let a = 1;");
        let diagnostics = registry.run_all(&file);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].rule_id, "T002");
    }

    #[test]
    fn type_aware_rules_skip_javascript() {
        let mut registry = RuleRegistry::new();
        registry.register(Box::new(
            TestRule::new("T001")
                .with_category(RuleCategory::TypeAware)
                .with_diagnostic(diagnostic("T001", 1)),
        ));

        let js = ParsedFile::from_source("test.js", "let a = 1;");
        let ts = ParsedFile::from_source("test.ts", "let a = 1;");

        assert!(registry.run_all(&js).is_empty());
        assert_eq!(registry.run_all(&ts).len(), 1);
    }

    #[test]
    fn configure_disables_by_id_or_name() {
        let mut registry = RuleRegistry::new();
        registry.register(Box::new(TestRule::new("T001").with_name("first")));
        registry.register(Box::new(TestRule::new("T002").with_name("second")));

        let mut config = Config::default();
        config.rules.disabled = vec!["T001".to_string(), "second".to_string()];
        registry.configure(&config);

        assert!(!registry.is_rule_enabled("T001"));
        assert!(!registry.is_rule_enabled("first"));
        assert!(!registry.is_rule_enabled("T002"));
        assert!(!registry.is_rule_enabled("unknown"));
    }

    #[test]
    fn configure_overrides_severity() {
        let mut registry = RuleRegistry::new();
        registry.register(Box::new(TestRule::new("T001").with_diagnostic(diagnostic("T001", 1))));

        let mut config = Config::default();
        config
            .rules
            .severity
            .insert("test-rule".to_string(), SeverityValue::Error);
        registry.configure(&config);

        let file = ParsedFile::from_source("test.ts", "let a = 1;");
        let diagnostics = registry.run_all(&file);
        assert_eq!(diagnostics[0].severity, Severity::Error);
    }

    #[test]
    fn invalid_options_keep_defaults() {
        let mut registry = RuleRegistry::with_builtin_rules();
        let config: Config = toml::from_str(
            r#"
[rules.options.no-unused-vars]
varsIgnorePattern = "(unclosed"
"#,
        )
        .expect("valid toml");
        registry.configure(&config);

        let file = ParsedFile::from_source("test.ts", "let unused = 1;");
        let diagnostics = registry.run_all(&file);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "'unused' is assigned a value but never used.");
    }

    #[test]
    fn builtin_rules_are_registered() {
        let registry = RuleRegistry::with_builtin_rules();

        assert_eq!(registry.len(), 2);
        assert!(registry.get_rule("Q001").is_some());
        assert_eq!(
            registry
                .get_rule_by_name("strict-boolean-expressions")
                .map(|rule| rule.metadata().category),
            Some(RuleCategory::TypeAware)
        );
    }

    declare_rule!(
        MacroTestRule,
        id = "M001",
        name = "macro-test",
        description = "Tests the declare_rule! macro",
        category = Quality,
        severity = Info
    );

    impl Rule for MacroTestRule {
        fn metadata(&self) -> &RuleMetadata {
            &self.metadata
        }

        fn check(&self, _ctx: &RuleContext<'_, '_, '_>) -> Vec<Diagnostic> {
            Vec::new()
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct MacroOptions {
        limit: usize,
    }

    declare_rule!(
        MacroOptionsRule,
        id = "M002",
        name = "macro-options",
        description = "Tests the declare_rule! macro with options",
        category = TypeAware,
        severity = Error,
        options = MacroOptions,
        docs_url = "https://example.com/rules/M002"
    );

    #[test]
    fn declare_rule_macro_creates_rule() {
        let rule = MacroTestRule::new();
        let metadata = rule.metadata();

        assert_eq!(metadata.id, "M001");
        assert_eq!(metadata.name, "macro-test");
        assert_eq!(metadata.category, RuleCategory::Quality);
        assert_eq!(metadata.severity, Severity::Info);
        assert!(metadata.docs_url.is_none());
    }

    #[test]
    fn declare_rule_macro_with_options() {
        let rule = MacroOptionsRule::with_options(MacroOptions { limit: 3 });

        assert_eq!(rule.metadata.id, "M002");
        assert_eq!(rule.metadata.docs_url, Some("https://example.com/rules/M002"));
        assert_eq!(rule.options().limit, 3);
        assert_eq!(MacroOptionsRule::new().options(), &MacroOptions::default());
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Severity::Warning).expect("serializable"),
            "\"warning\""
        );
    }
}

//! no-unused-vars rule (Q001): Detects bindings that are declared but never read
//!
//! Liveness comes from the def/use resolver, so it handles:
//! - Reads through closures and nested scopes
//! - Self-modifying writes (`x++`, `x = x + 1`) that never read the value
//! - Elements of destructured parameters, one finding per element
//! - Functions that only reference themselves
//! - `args: after-used`, caught errors and the ignore patterns

use std::collections::HashSet;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, span, trace, Level};

use crate::declare_rule;
use crate::diagnostic::Diagnostic;
use crate::program::{DeclKind, Provenance};
use crate::rules::helpers::describe_pattern;
use crate::rules::{OptionsError, Rule, RuleContext, RuleMetadata};
use crate::semantic::{Binding, BindingId, LocalBinding, SearchScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarsOption {
    #[default]
    All,
    /// Top-level bindings are not checked.
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgsOption {
    /// Parameters before the last used one are not checked.
    #[default]
    AfterUsed,
    All,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaughtErrorsOption {
    #[default]
    All,
    None,
}

/// Option record as written in configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawOptions {
    vars: VarsOption,
    vars_ignore_pattern: Option<String>,
    args: ArgsOption,
    args_ignore_pattern: Option<String>,
    caught_errors: CaughtErrorsOption,
    caught_errors_ignore_pattern: Option<String>,
    destructured_array_ignore_pattern: Option<String>,
    ignore_rest_siblings: bool,
    ignore_class_with_static_init_block: bool,
    report_used_ignore_pattern: bool,
}

/// Options with their ignore patterns compiled.
#[derive(Debug, Clone, Default)]
pub struct NoUnusedVarsOptions {
    pub vars: VarsOption,
    pub vars_ignore_pattern: Option<Regex>,
    pub args: ArgsOption,
    pub args_ignore_pattern: Option<Regex>,
    pub caught_errors: CaughtErrorsOption,
    pub caught_errors_ignore_pattern: Option<Regex>,
    pub destructured_array_ignore_pattern: Option<Regex>,
    pub ignore_rest_siblings: bool,
    pub ignore_class_with_static_init_block: bool,
    pub report_used_ignore_pattern: bool,
}

impl NoUnusedVarsOptions {
    pub fn from_value(value: &serde_json::Value) -> Result<Self, OptionsError> {
        let raw = match value {
            // A bare string is shorthand for `vars`.
            serde_json::Value::String(_) => RawOptions {
                vars: serde_json::from_value(value.clone()).map_err(malformed)?,
                ..RawOptions::default()
            },
            _ => serde_json::from_value(value.clone()).map_err(malformed)?,
        };

        Ok(Self {
            vars: raw.vars,
            vars_ignore_pattern: compile("varsIgnorePattern", raw.vars_ignore_pattern)?,
            args: raw.args,
            args_ignore_pattern: compile("argsIgnorePattern", raw.args_ignore_pattern)?,
            caught_errors: raw.caught_errors,
            caught_errors_ignore_pattern: compile(
                "caughtErrorsIgnorePattern",
                raw.caught_errors_ignore_pattern,
            )?,
            destructured_array_ignore_pattern: compile(
                "destructuredArrayIgnorePattern",
                raw.destructured_array_ignore_pattern,
            )?,
            ignore_rest_siblings: raw.ignore_rest_siblings,
            ignore_class_with_static_init_block: raw.ignore_class_with_static_init_block,
            report_used_ignore_pattern: raw.report_used_ignore_pattern,
        })
    }
}

fn malformed(source: serde_json::Error) -> OptionsError {
    OptionsError::Malformed {
        rule: "no-unused-vars",
        source,
    }
}

fn compile(option: &'static str, pattern: Option<String>) -> Result<Option<Regex>, OptionsError> {
    pattern
        .map(|pattern| {
            Regex::new(&pattern).map_err(|source| OptionsError::Pattern {
                rule: "no-unused-vars",
                option,
                pattern,
                source,
            })
        })
        .transpose()
}

declare_rule!(
    NoUnusedVars,
    id = "Q001",
    name = "no-unused-vars",
    description = "Disallow unused variables",
    category = Quality,
    severity = Warning,
    options = NoUnusedVarsOptions,
    docs_url = "https://eslint.org/docs/latest/rules/no-unused-vars"
);

/// Which ignore pattern and message wording applies to a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingRole {
    Var,
    Arg,
    CaughtError,
    ArrayElement,
}

impl BindingRole {
    fn noun(self) -> &'static str {
        match self {
            BindingRole::Var => "vars",
            BindingRole::Arg => "args",
            BindingRole::CaughtError => "caught errors",
            BindingRole::ArrayElement => "elements of array destructuring",
        }
    }
}

impl NoUnusedVars {
    fn role(binding: &LocalBinding) -> BindingRole {
        match binding.kind {
            DeclKind::CatchParam => BindingRole::CaughtError,
            DeclKind::Param => BindingRole::Arg,
            _ if binding.provenance == Provenance::ArrayElement => BindingRole::ArrayElement,
            _ => BindingRole::Var,
        }
    }

    fn ignore_pattern(&self, role: BindingRole) -> Option<&Regex> {
        let options = &self.options;
        match role {
            BindingRole::Var => options.vars_ignore_pattern.as_ref(),
            BindingRole::Arg => options.args_ignore_pattern.as_ref(),
            BindingRole::CaughtError => options.caught_errors_ignore_pattern.as_ref(),
            BindingRole::ArrayElement => options
                .destructured_array_ignore_pattern
                .as_ref()
                .or(options.vars_ignore_pattern.as_ref()),
        }
    }

    /// Bindings never reported whatever their liveness.
    fn is_exempt(&self, ctx: &RuleContext<'_, '_, '_>, binding: &LocalBinding) -> bool {
        let model = ctx.model();
        let decl = model.decl(binding.decl);

        if decl.exported || decl.ambient || decl.param_property {
            return true;
        }
        match binding.kind {
            DeclKind::TypeParam => return true,
            DeclKind::Class if decl.decorated => return true,
            DeclKind::Import if binding.name == "React" && model.has_jsx() => return true,
            // Overload signatures share the name of the implementation.
            DeclKind::Function if decl.body_unit.is_none() => return true,
            DeclKind::Param => {
                // Parameters of signatures without a body have nothing to use them.
                let unit = model.unit(binding.unit);
                if !unit.has_body || unit.ambient {
                    return true;
                }
            }
            _ => {}
        }

        if self.options.ignore_class_with_static_init_block
            && binding.kind == DeclKind::Class
            && decl
                .class
                .is_some_and(|class| model.class(class).has_static_block)
        {
            return true;
        }
        false
    }

    /// Whether the configuration turns off checking for this binding.
    fn is_unchecked(&self, ctx: &RuleContext<'_, '_, '_>, binding: &LocalBinding) -> bool {
        match binding.kind {
            DeclKind::CatchParam => self.options.caught_errors == CaughtErrorsOption::None,
            DeclKind::Param => match self.options.args {
                ArgsOption::None => true,
                ArgsOption::All => false,
                ArgsOption::AfterUsed => self.later_param_used(ctx, binding),
            },
            _ => {
                if self.options.ignore_rest_siblings && binding.provenance == Provenance::RestSibling
                {
                    return true;
                }
                self.options.vars == VarsOption::Local
                    && ctx.model().scopes().root() == Some(binding.scope)
            }
        }
    }

    /// `args: after-used`: some parameter declared after this one is read.
    fn later_param_used(&self, ctx: &RuleContext<'_, '_, '_>, binding: &LocalBinding) -> bool {
        let position = |b: &LocalBinding| (b.param_index.unwrap_or(usize::MAX), b.span.lo);
        let own = position(binding);
        ctx.index()
            .bindings()
            .filter(|other| {
                other.kind == DeclKind::Param
                    && other.unit == binding.unit
                    && other.param_index.is_some()
                    && position(other) > own
            })
            .any(|other| ctx.is_used(Binding::Real(other.id)))
    }

    fn report(
        &self,
        ctx: &RuleContext<'_, '_, '_>,
        id: BindingId,
        message_id: &str,
        message: String,
    ) -> Option<Diagnostic> {
        let binding = ctx.index().get(id);
        let model = ctx.model();
        let defuse = ctx.defuse();
        let unit = model.unit(binding.unit);

        let anchor = defuse.report_site(id);
        let statement = defuse
            .defs(id)
            .iter()
            .find(|def| def.span == anchor)
            .map(|def| model.stmt(def.stmt).origin);
        let scope = SearchScope {
            anchor: Some(anchor),
            statement,
            construct: Some(unit.span),
            construct_name: unit.name_span,
        };

        let Some(position) = ctx.locate(&binding.name, scope) else {
            debug!(name = %binding.name, "no source position for finding, suppressing");
            return None;
        };

        Some(
            Diagnostic::at(
                self.metadata.id,
                self.metadata.severity,
                message,
                ctx.filename(),
                &position,
            )
            .with_message_id(message_id)
            .with_suggestion(format!(
                "Remove unused variable '{}' or prefix with underscore if intentionally unused",
                binding.name
            )),
        )
    }
}

impl Rule for NoUnusedVars {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn configure(&mut self, options: &serde_json::Value) -> Result<(), OptionsError> {
        self.options = NoUnusedVarsOptions::from_value(options)?;
        Ok(())
    }

    fn check(&self, ctx: &RuleContext<'_, '_, '_>) -> Vec<Diagnostic> {
        let _span = span!(Level::TRACE, "no_unused_vars", file = ctx.filename()).entered();
        if ctx.file().metadata().is_declaration_file {
            return Vec::new();
        }

        let defuse = ctx.defuse();
        let mut diagnostics = Vec::new();
        let mut reported = HashSet::new();

        for binding in ctx.index().bindings() {
            if self.is_exempt(ctx, binding) {
                continue;
            }

            let role = Self::role(binding);
            let pattern = self.ignore_pattern(role);
            let ignored = pattern.is_some_and(|pattern| pattern.is_match(&binding.name));
            let used = ctx.is_used(Binding::Real(binding.id));
            trace!(name = %binding.name, used, ignored, "binding liveness");

            let finding = if used {
                if !(ignored && self.options.report_used_ignore_pattern) {
                    continue;
                }
                let additional = pattern
                    .map(|pattern| {
                        format!(". Used {} must not match {}", role.noun(), describe_pattern(pattern))
                    })
                    .unwrap_or_default();
                (
                    "usedIgnoredVar",
                    format!("'{}' is marked as ignored but is used{}.", binding.name, additional),
                )
            } else {
                if ignored || self.is_unchecked(ctx, binding) {
                    continue;
                }
                let is_variable = matches!(
                    binding.kind,
                    DeclKind::Var | DeclKind::Let | DeclKind::Const | DeclKind::Using
                );
                let action = if is_variable && defuse.was_assigned_real_value(binding.id)
                {
                    "assigned a value"
                } else {
                    "defined"
                };
                let additional = pattern
                    .map(|pattern| {
                        format!(
                            ". Allowed unused {} must match {}",
                            role.noun(),
                            describe_pattern(pattern)
                        )
                    })
                    .unwrap_or_default();
                (
                    "unusedVar",
                    format!("'{}' is {} but never used{}.", binding.name, action, additional),
                )
            };

            let (message_id, message) = finding;
            if let Some(diagnostic) = self.report(ctx, binding.id, message_id, message) {
                if reported.insert((diagnostic.line, diagnostic.column, binding.name.clone())) {
                    diagnostics.push(diagnostic);
                }
            }
        }

        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use crate::parser::ParsedFile;
    use crate::program::ProgramModel;
    use crate::semantic::{BindingIndex, DefUseResolver, ResolvedSite};
    use serde_json::json;

    fn run_with(filename: &str, code: &str, options: serde_json::Value) -> Vec<Diagnostic> {
        let file = ParsedFile::from_source(filename, code);
        let model = ProgramModel::build(&file).expect("model");
        let index = BindingIndex::build(&model);
        let defuse = DefUseResolver::build(&index);
        let sites = ResolvedSite::resolve_all(&model);
        let compiler = CompilerConfig::default();
        let ctx = RuleContext::new(&model, &index, &defuse, &sites, &compiler);

        let mut rule = NoUnusedVars::new();
        if !options.is_null() {
            rule.configure(&options).expect("valid options");
        }
        rule.check(&ctx)
    }

    fn run_no_unused_vars(code: &str) -> Vec<Diagnostic> {
        run_with("test.js", code, serde_json::Value::Null)
    }

    fn messages(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics.iter().map(|d| d.message.as_str()).collect()
    }

    #[test]
    fn detects_unused_const() {
        let diagnostics = run_no_unused_vars("const x = 1;");

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].rule_id, "Q001");
        assert_eq!(diagnostics[0].message_id.as_deref(), Some("unusedVar"));
        assert_eq!(diagnostics[0].message, "'x' is assigned a value but never used.");
    }

    #[test]
    fn declared_without_value_is_defined() {
        let diagnostics = run_no_unused_vars("let x; console.log('hi');");

        assert_eq!(messages(&diagnostics), vec!["'x' is defined but never used."]);
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (1, 5));
    }

    #[test]
    fn ignores_used_variable() {
        assert!(run_no_unused_vars("const x = 1; console.log(x);").is_empty());
    }

    #[test]
    fn returned_parameter_is_used() {
        assert!(run_no_unused_vars("function f(a) { return a; }\nf(1);").is_empty());
    }

    #[test]
    fn detects_unused_param_after_last_used() {
        let code = "function foo(used, unusedParam) {\n    return used;\n}\nfoo();";
        let diagnostics = run_no_unused_vars(code);

        assert_eq!(messages(&diagnostics), vec!["'unusedParam' is defined but never used."]);
    }

    #[test]
    fn ignores_unused_param_before_used_param() {
        let code = "function handler(req, res) { res.send('ok'); }\nhandler();";
        assert!(run_no_unused_vars(code).is_empty());
    }

    #[test]
    fn args_all_reports_every_unused_param() {
        let code = "function handler(req, res) { res.send('ok'); }\nhandler();";
        let diagnostics = run_with("test.js", code, json!({ "args": "all" }));

        assert_eq!(messages(&diagnostics), vec!["'req' is defined but never used."]);
    }

    #[test]
    fn args_none_skips_parameters() {
        let code = "function f(a) {}\nf();";
        assert!(run_with("test.js", code, json!({ "args": "none" })).is_empty());
    }

    #[test]
    fn ignores_exported_variable() {
        assert!(run_no_unused_vars("export const x = 1;").is_empty());
        assert!(run_no_unused_vars("const y = 1;\nexport { y };").is_empty());
    }

    #[test]
    fn export_specifiers_mark_their_declaration() {
        let code = "function helper() {}\nclass Store {}\nexport { helper as api, Store };";
        assert!(run_no_unused_vars(code).is_empty());

        let shadowed = "let y = 1;\nfunction f() { let y = 2; }\nf();\nexport { y };";
        let diagnostics = run_no_unused_vars(shadowed);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, 2);
    }

    #[test]
    fn self_updates_are_not_uses() {
        let diagnostics = run_no_unused_vars("let count = 0;\ncount++;\ncount += 2;");

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "'count' is assigned a value but never used.");
        // Reported at the last write.
        assert_eq!(diagnostics[0].line, 3);
    }

    #[test]
    fn write_then_read_is_used() {
        assert!(run_no_unused_vars("let x;\nx = 1;\nconsole.log(x);").is_empty());
    }

    #[test]
    fn closure_reads_count() {
        let code = "const counter = 0;\nconst read = () => counter;\nread();";
        assert!(run_no_unused_vars(code).is_empty());
    }

    #[test]
    fn recursive_function_without_callers_is_unused() {
        let diagnostics = run_no_unused_vars("function loop(n) { if (n) { loop(n - 1); } }");

        assert_eq!(messages(&diagnostics), vec!["'loop' is defined but never used."]);
    }

    #[test]
    fn array_destructuring_reports_each_element() {
        let diagnostics = run_no_unused_vars("const [a, b] = pair;\nuse(a);");

        assert_eq!(messages(&diagnostics), vec!["'b' is assigned a value but never used."]);
    }

    #[test]
    fn destructured_array_ignore_pattern() {
        let code = "const [_first, second] = pair;\nuse(second);";
        let options = json!({ "destructuredArrayIgnorePattern": "^_" });
        assert!(run_with("test.js", code, options).is_empty());
    }

    #[test]
    fn destructured_params_report_elements() {
        let code = "function f({ a, b }) { return a; }\nf();";
        let diagnostics = run_with("test.js", code, json!({ "args": "all" }));

        assert_eq!(messages(&diagnostics), vec!["'b' is defined but never used."]);
        let source = "function f({ a, b }) { return a; }\nf();";
        let column = diagnostics[0].column - 1;
        assert_eq!(&source[column..column + 1], "b");
    }

    #[test]
    fn rest_siblings_can_be_ignored() {
        let code = "const { skipped, ...rest } = props;\nuse(rest);";
        assert_eq!(run_no_unused_vars(code).len(), 1);
        assert!(run_with("test.js", code, json!({ "ignoreRestSiblings": true })).is_empty());
    }

    #[test]
    fn caught_errors_option() {
        let code = "try {} catch (e) {}";
        assert_eq!(
            messages(&run_no_unused_vars(code)),
            vec!["'e' is defined but never used."]
        );
        assert!(run_with("test.js", code, json!({ "caughtErrors": "none" })).is_empty());
        assert!(
            run_with("test.js", code, json!({ "caughtErrorsIgnorePattern": "^e$" })).is_empty()
        );
    }

    #[test]
    fn vars_ignore_pattern_names_the_pattern() {
        let code = "const unused = 1;\nconst _ignored = 2;";
        let diagnostics = run_with("test.js", code, json!({ "varsIgnorePattern": "^_" }));

        assert_eq!(
            messages(&diagnostics),
            vec!["'unused' is assigned a value but never used. Allowed unused vars must match /^_/u."]
        );
    }

    #[test]
    fn report_used_ignore_pattern() {
        let code = "const _value = 1;\nconsole.log(_value);";
        let options = json!({ "varsIgnorePattern": "^_", "reportUsedIgnorePattern": true });
        let diagnostics = run_with("test.js", code, options);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message_id.as_deref(), Some("usedIgnoredVar"));
        assert_eq!(
            diagnostics[0].message,
            "'_value' is marked as ignored but is used. Used vars must not match /^_/u."
        );
    }

    #[test]
    fn vars_local_skips_top_level() {
        let code = "const top = 1;\nfunction f() { const inner = 2; }\nf();";
        let diagnostics = run_with("test.js", code, json!("local"));

        assert_eq!(messages(&diagnostics), vec!["'inner' is assigned a value but never used."]);
    }

    #[test]
    fn allows_react_import_in_jsx() {
        let code = "import React from 'react';\nexport const App = () => <div />;";
        assert!(run_with("test.jsx", code, serde_json::Value::Null).is_empty());

        let plain = "import React from 'react';\nexport const n = 1;";
        assert_eq!(run_with("test.js", plain, serde_json::Value::Null).len(), 1);
    }

    #[test]
    fn typescript_exemptions() {
        let code = "declare const injected: string;\n\
                    function overload(a: string): void;\n\
                    function overload(a: any) { return a; }\n\
                    overload('x');\n\
                    class Service { constructor(private readonly repo: string) {} }\n\
                    export { Service };\n\
                    @Component class Widget {}";
        assert!(run_with("test.ts", code, serde_json::Value::Null).is_empty());
    }

    #[test]
    fn type_only_usage_counts() {
        let code = "interface Shape { size: number }\n\
                    type Alias = Shape;\n\
                    const sizes = [1];\n\
                    export function area(s: Alias): typeof sizes { return [s.size]; }";
        assert!(run_with("test.ts", code, serde_json::Value::Null).is_empty());
    }

    #[test]
    fn static_init_block_classes_can_be_ignored() {
        let code = "class Registry { static { console.log('init'); } }";
        assert_eq!(run_no_unused_vars(code).len(), 1);
        let options = json!({ "ignoreClassWithStaticInitBlock": true });
        assert!(run_with("test.js", code, options).is_empty());
    }

    #[test]
    fn invalid_pattern_is_an_options_error() {
        let mut rule = NoUnusedVars::new();
        let err = rule
            .configure(&json!({ "varsIgnorePattern": "(" }))
            .expect_err("invalid regex");

        assert!(matches!(err, OptionsError::Pattern { option: "varsIgnorePattern", .. }));
        assert!(rule.options().vars_ignore_pattern.is_none());
    }

    #[test]
    fn repeated_runs_are_identical() {
        let code = "let a = 1;\nlet b;\nb = a;\nfunction g(x, y) { return y; }";
        let first = run_no_unused_vars(code);
        let second = run_no_unused_vars(code);

        assert_eq!(first, second);
        assert!(!first.is_empty());
    }
}

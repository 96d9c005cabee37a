//! Shared helper functions for rule implementations.

use regex::Regex;
use swc_ecma_ast::Expr;

/// Operators that, directly before an edit, would bind to part of the
/// replacement.
const OPERATORS_BEFORE: &[&str] = &[
    "&&", "||", "??", "!", "<", ">", "+", "-", "*", "/", "%", "&", "|", "^", "~",
];

/// Comparisons ending in `=`; a lone `=` is an assignment.
const COMPARISONS_BEFORE: &[&str] = &["==", "!=", "<=", ">="];

/// Operators that, directly after an edit, would bind to part of the
/// replacement.
const OPERATORS_AFTER: &[&str] = &[
    "&&", "||", "??", "==", "!=", "<", ">", "+", "-", "*", "/", "%", "&", "|", "^",
];

/// Whether replacing `source[start..end]` with an expression containing a
/// binary operator needs parentheses.
///
/// Looks at up to three non-blank characters on either side of the edit.
pub fn needs_parens(source: &str, start: usize, end: usize) -> bool {
    let before = tail(source.get(..start).unwrap_or_default().trim_end(), 3);
    let after = head(source.get(end..).unwrap_or_default().trim_start(), 3);

    let before_binds = if before.ends_with("=>") {
        false
    } else if before.ends_with('=') {
        COMPARISONS_BEFORE.iter().any(|op| before.ends_with(op))
    } else {
        OPERATORS_BEFORE.iter().any(|op| before.ends_with(op))
    };
    let after_binds = OPERATORS_AFTER.iter().any(|op| after.starts_with(op));

    before_binds || after_binds
}

fn tail(text: &str, chars: usize) -> &str {
    let start = text
        .char_indices()
        .rev()
        .nth(chars.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    &text[start..]
}

fn head(text: &str, chars: usize) -> &str {
    let end = text
        .char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    &text[..end]
}

pub fn parenthesize(text: &str) -> String {
    format!("({text})")
}

/// Expressions that can take a binary operator on either side without
/// changing how they parse.
pub fn is_primary_expr(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Ident(_)
            | Expr::Member(_)
            | Expr::SuperProp(_)
            | Expr::Call(_)
            | Expr::New(_)
            | Expr::Lit(_)
            | Expr::Paren(_)
            | Expr::This(_)
            | Expr::OptChain(_)
            | Expr::TsNonNull(_)
            | Expr::Tpl(_)
            | Expr::Array(_)
            | Expr::Object(_)
    )
}

/// Pattern as reported in messages, in the `/source/u` form users configure.
pub fn describe_pattern(pattern: &Regex) -> String {
    format!("/{}/u", pattern.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parens_at(source: &str, target: &str) -> bool {
        let start = source.find(target).expect("target in source");
        needs_parens(source, start, start + target.len())
    }

    #[test]
    fn bare_conditions_need_no_parens() {
        assert!(!parens_at("if (value) {}", "value"));
        assert!(!parens_at("while (value)\n{}", "value"));
        assert!(!parens_at("const x = value ? 1 : 2;", "value"));
    }

    #[test]
    fn adjacent_operators_need_parens() {
        assert!(parens_at("if (!value) {}", "value"));
        assert!(parens_at("if (a && value) {}", "value"));
        assert!(parens_at("if (value || b) {}", "value"));
        assert!(parens_at("if (value ?? b) {}", "value"));
    }

    #[test]
    fn assignments_and_arrows_are_not_operators() {
        assert!(!parens_at("const x = value;", "value"));
        assert!(!parens_at("items.filter((i) => value);", "value"));
        assert!(parens_at("if (a == value) {}", "value"));
    }

    #[test]
    fn primary_expressions() {
        let file = crate::parser::ParsedFile::from_source("test.ts", "a.b; a + b;");
        let module = file.module().expect("module");
        let exprs: Vec<&Expr> = module
            .body
            .iter()
            .filter_map(|item| item.as_stmt()?.as_expr().map(|stmt| &*stmt.expr))
            .collect();

        assert!(is_primary_expr(exprs[0]));
        assert!(!is_primary_expr(exprs[1]));
    }

    #[test]
    fn patterns_are_described_with_unicode_flag() {
        let pattern = Regex::new("^_").expect("valid regex");
        assert_eq!(describe_pattern(&pattern), "/^_/u");
    }
}

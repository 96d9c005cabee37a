//! Diagnostics emitted by rules and the fixes attached to them.

use serde::Serialize;

use crate::rules::Severity;
use crate::semantic::position::SourcePosition;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FixKind {
    ReplaceWith { new_text: String },
}

/// A byte-range replacement in the original source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fix {
    pub title: String,
    pub kind: FixKind,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl Fix {
    pub fn replace(
        title: impl Into<String>,
        new_text: impl Into<String>,
        position: &SourcePosition,
    ) -> Self {
        Self {
            title: title.into(),
            kind: FixKind::ReplaceWith {
                new_text: new_text.into(),
            },
            start: position.start,
            end: position.end,
            line: position.line,
            column: position.column,
            end_line: position.end_line,
            end_column: position.end_column,
        }
    }

    /// Applies the fix to `source`, returning `None` when the range no longer fits.
    pub fn apply(&self, source: &str) -> Option<String> {
        let FixKind::ReplaceWith { new_text } = &self.kind;
        if self.start > self.end
            || self.end > source.len()
            || !source.is_char_boundary(self.start)
            || !source.is_char_boundary(self.end)
        {
            return None;
        }

        let mut fixed = String::with_capacity(source.len() + new_text.len());
        fixed.push_str(&source[..self.start]);
        fixed.push_str(new_text);
        fixed.push_str(&source[self.end..]);
        Some(fixed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub rule_id: String,
    pub severity: Severity,
    pub message_id: Option<String>,
    pub message: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub suggestion: Option<String>,
    pub fixes: Vec<Fix>,
}

impl Diagnostic {
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        file: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            message_id: None,
            message: message.into(),
            file: file.into(),
            line,
            column,
            end_line: line,
            end_column: column,
            suggestion: None,
            fixes: Vec::new(),
        }
    }

    pub fn at(
        rule_id: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        file: impl Into<String>,
        position: &SourcePosition,
    ) -> Self {
        Self::new(
            rule_id,
            severity,
            message,
            file,
            position.line,
            position.column,
        )
        .with_end(position.end_line, position.end_column)
    }

    pub fn with_end(mut self, end_line: usize, end_column: usize) -> Self {
        self.end_line = end_line;
        self.end_column = end_column;
        self
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.fixes.push(fix);
        self
    }

    /// Report-time ordering: line, column, then rule id.
    pub fn sort_key(&self) -> (usize, usize, &str) {
        (self.line, self.column, self.rule_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(start: usize, end: usize) -> SourcePosition {
        SourcePosition {
            line: 1,
            column: start + 1,
            end_line: 1,
            end_column: end + 1,
            start,
            end,
        }
    }

    #[test]
    fn diagnostic_at_uses_position_range() {
        let diag = Diagnostic::at("Q001", Severity::Warning, "msg", "a.ts", &position(4, 9));

        assert_eq!(diag.line, 1);
        assert_eq!(diag.column, 5);
        assert_eq!(diag.end_column, 10);
        assert!(diag.fixes.is_empty());
    }

    #[test]
    fn fix_replaces_byte_range() {
        let source = "if (value) {}";
        let fix = Fix::replace("Cast", "Boolean(value)", &position(4, 9));

        assert_eq!(fix.apply(source).as_deref(), Some("if (Boolean(value)) {}"));
    }

    #[test]
    fn fix_out_of_range_is_rejected() {
        let fix = Fix::replace("Cast", "x", &position(4, 40));

        assert_eq!(fix.apply("short"), None);
    }

    #[test]
    fn diagnostic_serializes_message_id() {
        let diag = Diagnostic::new("Q002", Severity::Error, "msg", "a.ts", 1, 1)
            .with_message_id("conditionErrorString");

        let json = serde_json::to_value(&diag).unwrap();

        assert_eq!(json["message_id"], "conditionErrorString");
        assert_eq!(json["severity"], "error");
    }
}

//! Mapping findings back to original source coordinates.
//!
//! Lowered statements keep the span of the syntax they came from, but a
//! finding about a binding often needs the exact token of that binding
//! inside a larger snippet. The reconciler searches progressively wider
//! snippets and gives up (returns `None`) rather than guess.

use std::ops::Range;

use regex::Regex;
use serde::Serialize;
use swc_common::Span;
use tracing::trace;

use crate::parser::ParsedFile;

/// A range in original source, 1-based line/column plus byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub start: usize,
    pub end: usize,
}

impl SourcePosition {
    pub fn from_range(file: &ParsedFile, range: Range<usize>) -> Option<Self> {
        let (line, column) = file.line_col(range.start)?;
        let (end_line, end_column) = file.line_col(range.end)?;
        Some(Self {
            line,
            column,
            end_line,
            end_column,
            start: range.start,
            end: range.end,
        })
    }

    pub fn of_span(file: &ParsedFile, span: Span) -> Option<Self> {
        Self::from_range(file, file.byte_range(span)?)
    }

    /// Empty range at the very start of a file.
    pub fn file_start() -> Self {
        Self {
            line: 1,
            column: 1,
            end_line: 1,
            end_column: 1,
            start: 0,
            end: 0,
        }
    }
}

/// Where to look for a target identifier, narrowest first.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchScope {
    /// Span the finding is anchored on, if the lowering kept one.
    pub anchor: Option<Span>,
    /// Originating syntax statement.
    pub statement: Option<Span>,
    /// Enclosing construct (function, method, class, file).
    pub construct: Option<Span>,
    /// Declared name of the enclosing construct.
    pub construct_name: Option<Span>,
}

pub struct PositionReconciler<'a> {
    file: &'a ParsedFile,
}

impl<'a> PositionReconciler<'a> {
    pub fn new(file: &'a ParsedFile) -> Self {
        Self { file }
    }

    /// Position of `span` when it is a valid range of the source.
    pub fn span_position(&self, span: Span) -> Option<SourcePosition> {
        SourcePosition::of_span(self.file, span)
    }

    /// Locates `target` in original source.
    ///
    /// Tries, in order: the anchor span itself, a word-bounded search of the
    /// statement snippet, the same search over the construct snippet, and
    /// the construct's declared name. Every candidate must slice to exactly
    /// `target`, otherwise the next one is tried.
    pub fn locate(&self, target: &str, scope: SearchScope) -> Option<SourcePosition> {
        if target.is_empty() {
            return None;
        }

        if let Some(position) = scope.anchor.and_then(|span| self.exact(span, target)) {
            return Some(position);
        }

        let pattern = word_pattern(target)?;
        for snippet in [scope.statement, scope.construct].into_iter().flatten() {
            if let Some(position) = self.search(snippet, &pattern) {
                trace!(target, "reconciled position by snippet search");
                return Some(position);
            }
        }

        let fallback = scope.construct_name.and_then(|span| self.exact(span, target));
        if fallback.is_none() {
            trace!(target, "no position recovered, finding suppressed");
        }
        fallback
    }

    fn exact(&self, span: Span, target: &str) -> Option<SourcePosition> {
        let range = self.file.byte_range(span)?;
        let text = self.file.source().get(range.clone())?;
        (text == target).then(|| SourcePosition::from_range(self.file, range))?
    }

    /// Scans a snippet line by line, accumulating the byte offset of each line.
    fn search(&self, span: Span, pattern: &Regex) -> Option<SourcePosition> {
        let range = self.file.byte_range(span)?;
        let snippet = self.file.source().get(range.clone())?;

        let mut line_offset = range.start;
        for line in snippet.split_inclusive('\n') {
            if let Some(found) = pattern.captures(line).and_then(|caps| caps.get(1)) {
                let start = line_offset + found.start();
                return SourcePosition::from_range(self.file, start..found.end() + line_offset);
            }
            line_offset += line.len();
        }
        None
    }
}

/// Matches `target` not preceded or followed by an identifier character.
fn word_pattern(target: &str) -> Option<Regex> {
    let escaped = regex::escape(target);
    Regex::new(&format!(r"(?:^|[^\w$])({escaped})(?:[^\w$]|$)")).ok()
}

//! Parser module for JavaScript/TypeScript source code
//!
//! Integrates with SWC for parsing source files into AST, and keeps the
//! source map base so spans can be mapped back to byte offsets and
//! line/column positions of the original text.

use std::ops::Range;
use std::sync::OnceLock;

use swc_common::sync::Lrc;
use swc_common::{BytePos, FileName, SourceMap, Span, Spanned};
use swc_ecma_parser::{EsSyntax, Syntax, TsSyntax, parse_file_as_module};

pub use swc_ecma_ast::{EsVersion, Module};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    JavaScript,
    TypeScript,
    Jsx,
    Tsx,
}

impl Language {
    pub fn is_typescript(self) -> bool {
        matches!(self, Language::TypeScript | Language::Tsx)
    }
}

pub fn detect_language(filename: &str) -> Language {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();

    match ext.as_str() {
        "ts" | "mts" | "cts" => Language::TypeScript,
        "tsx" => Language::Tsx,
        "jsx" => Language::Jsx,
        _ => Language::JavaScript,
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} at {line}:{column}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub span_lo: u32,
    pub span_hi: u32,
    pub message: String,
}

#[derive(Debug)]
pub struct ParseResult {
    pub module: Option<Module>,
    pub errors: Vec<ParseError>,
    /// Position of the first byte of the source inside the source map.
    pub base: u32,
}

impl ParseResult {
    pub fn is_ok(&self) -> bool {
        self.module.is_some()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub filename: String,
    pub language: Language,
    pub line_count: usize,
    pub has_errors: bool,
    pub is_declaration_file: bool,
}

pub struct ParsedFile {
    source: String,
    metadata: FileMetadata,
    ast_module: Option<Module>,
    errors: Vec<ParseError>,
    base: u32,
    line_ranges: OnceLock<Vec<Range<usize>>>,
}

impl std::fmt::Debug for ParsedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedFile")
            .field("metadata", &self.metadata)
            .field("has_module", &self.ast_module.is_some())
            .field("error_count", &self.errors.len())
            .finish()
    }
}

impl ParsedFile {
    pub fn from_source(filename: &str, source: &str) -> Self {
        let language = detect_language(filename);
        let parser = Parser::for_file(filename);
        let parse_result = parser.parse_module_recovering(source);

        let line_count = if source.is_empty() {
            0
        } else {
            source.lines().count()
        };

        let metadata = FileMetadata {
            filename: filename.to_string(),
            language,
            line_count,
            has_errors: parse_result.has_errors(),
            is_declaration_file: filename.ends_with(".d.ts")
                || filename.ends_with(".d.mts")
                || filename.ends_with(".d.cts"),
        };

        Self {
            source: source.to_string(),
            metadata,
            ast_module: parse_result.module,
            errors: parse_result.errors,
            base: parse_result.base,
            line_ranges: OnceLock::new(),
        }
    }

    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    pub fn module(&self) -> Option<&Module> {
        self.ast_module.as_ref()
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn get_line(&self, line_number: usize) -> Option<&str> {
        if line_number == 0 {
            return None;
        }

        let ranges = self.line_ranges();
        ranges
            .get(line_number - 1)
            .map(|range| &self.source[range.clone()])
    }

    /// Byte offset of a source-map position, or `None` for dummy positions.
    pub fn offset(&self, pos: BytePos) -> Option<usize> {
        let offset = pos.0.checked_sub(self.base)? as usize;
        (offset <= self.source.len()).then_some(offset)
    }

    /// Byte range of a span in the source text.
    pub fn byte_range(&self, span: Span) -> Option<Range<usize>> {
        let lo = self.offset(span.lo)?;
        let hi = self.offset(span.hi)?;
        (lo <= hi).then_some(lo..hi)
    }

    /// Source-map span covering a byte range of the source text.
    pub fn span_of_range(&self, range: Range<usize>) -> Span {
        Span::new(
            BytePos(self.base + range.start as u32),
            BytePos(self.base + range.end as u32),
        )
    }

    pub fn span_text(&self, span: Span) -> Option<&str> {
        let range = self.byte_range(span)?;
        self.source.get(range)
    }

    /// 1-based line and character column for a byte offset.
    pub fn line_col(&self, offset: usize) -> Option<(usize, usize)> {
        if offset > self.source.len() || !self.source.is_char_boundary(offset) {
            return None;
        }
        let ranges = self.line_ranges();
        let index = ranges
            .partition_point(|range| range.end < offset)
            .min(ranges.len().saturating_sub(1));
        let start = ranges.get(index).map(|range| range.start).unwrap_or(0);
        let column = self.source.get(start..offset)?.chars().count() + 1;
        Some((index + 1, column))
    }

    /// Byte offset of a 1-based line start.
    pub fn line_start(&self, line_number: usize) -> Option<usize> {
        if line_number == 0 {
            return None;
        }
        self.line_ranges()
            .get(line_number - 1)
            .map(|range| range.start)
    }

    fn line_ranges(&self) -> &[Range<usize>] {
        self.line_ranges.get_or_init(|| self.build_line_ranges())
    }

    fn build_line_ranges(&self) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut start = 0;

        for (i, c) in self.source.char_indices() {
            if c == '\n' {
                ranges.push(start..i);
                start = i + 1;
            }
        }

        ranges.push(start..self.source.len());
        ranges
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParserBuilder {
    jsx: bool,
    typescript: bool,
    decorators: bool,
}

impl ParserBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jsx(mut self, enabled: bool) -> Self {
        self.jsx = enabled;
        self
    }

    pub fn typescript(mut self, enabled: bool) -> Self {
        self.typescript = enabled;
        self
    }

    pub fn decorators(mut self, enabled: bool) -> Self {
        self.decorators = enabled;
        self
    }

    pub fn build(self) -> Parser {
        let syntax = if self.typescript {
            Syntax::Typescript(TsSyntax {
                tsx: self.jsx,
                decorators: self.decorators,
                ..Default::default()
            })
        } else {
            Syntax::Es(EsSyntax {
                jsx: self.jsx,
                decorators: self.decorators,
                ..Default::default()
            })
        };

        Parser { syntax }
    }
}

#[derive(Debug, Clone)]
pub struct Parser {
    syntax: Syntax,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            syntax: Syntax::Es(Default::default()),
        }
    }

    pub fn for_file(filename: &str) -> Self {
        let language = detect_language(filename);
        let builder = Self::builder().decorators(true);
        match language {
            Language::JavaScript => builder.build(),
            Language::TypeScript => builder.typescript(true).build(),
            Language::Jsx => builder.jsx(true).build(),
            Language::Tsx => builder.typescript(true).jsx(true).build(),
        }
    }

    pub fn builder() -> ParserBuilder {
        ParserBuilder::new()
    }

    pub fn parse_module_recovering(&self, code: &str) -> ParseResult {
        let source_map: Lrc<SourceMap> = Default::default();
        let fm = source_map
            .new_source_file(FileName::Custom("input.js".into()).into(), code.to_string());
        let base = fm.start_pos.0;

        let mut recovered_errors = Vec::new();

        let result = parse_file_as_module(
            &fm,
            self.syntax,
            EsVersion::latest(),
            None,
            &mut recovered_errors,
        );

        let to_error = |e: swc_ecma_parser::error::Error| {
            let span = e.span();
            let loc = source_map.lookup_char_pos(span.lo);
            ParseError {
                line: loc.line,
                column: loc.col_display + 1,
                span_lo: span.lo.0.saturating_sub(base),
                span_hi: span.hi.0.saturating_sub(base),
                message: e.kind().msg().to_string(),
            }
        };

        let mut errors: Vec<ParseError> = recovered_errors.into_iter().map(to_error).collect();

        match result {
            Ok(module) => ParseResult {
                module: Some(module),
                errors,
                base,
            },
            Err(e) => {
                errors.push(to_error(e));
                ParseResult {
                    module: None,
                    errors,
                    base,
                }
            }
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_language_from_extension() {
        assert_eq!(detect_language("file.js"), Language::JavaScript);
        assert_eq!(detect_language("file.mjs"), Language::JavaScript);
        assert_eq!(detect_language("file.jsx"), Language::Jsx);
        assert_eq!(detect_language("file.ts"), Language::TypeScript);
        assert_eq!(detect_language("file.cts"), Language::TypeScript);
        assert_eq!(detect_language("file.tsx"), Language::Tsx);
        assert_eq!(detect_language("unknown"), Language::JavaScript);
    }

    #[test]
    fn parse_recovering_valid_code_has_no_errors() {
        let parser = Parser::new();
        let code = "const x = 1;\nfunction add(a, b) { return a + b; }\n";

        let result = parser.parse_module_recovering(code);

        assert!(result.is_ok());
        assert!(!result.has_errors());
    }

    #[test]
    fn parse_incomplete_code_reports_error() {
        let parser = Parser::new();

        let result = parser.parse_module_recovering("const x =");

        assert!(result.has_errors());
        assert_eq!(result.errors[0].line, 1);
        assert!(!result.errors[0].message.is_empty());
    }

    #[test]
    fn typescript_parser_accepts_annotations_and_decorators() {
        let parser = Parser::for_file("model.ts");
        let code = "@sealed class A { @field() x: string | null = null; }";

        let result = parser.parse_module_recovering(code);

        assert!(result.is_ok());
        assert!(!result.has_errors());
    }

    #[test]
    fn parsed_file_metadata() {
        let parsed = ParsedFile::from_source("types.d.ts", "declare const x: number;\n");

        assert_eq!(parsed.metadata().language, Language::TypeScript);
        assert_eq!(parsed.metadata().line_count, 1);
        assert!(parsed.metadata().is_declaration_file);
        assert!(!parsed.metadata().has_errors);
    }

    #[test]
    fn span_text_maps_through_source_map_base() {
        let code = "const answer = 42;";
        let parsed = ParsedFile::from_source("test.js", code);
        let module = parsed.module().unwrap();

        let span = module.body[0].span();

        assert_eq!(parsed.span_text(span), Some(code));
        assert_eq!(parsed.offset(span.lo), Some(0));
    }

    #[test]
    fn line_col_counts_lines_and_columns_from_one() {
        let parsed = ParsedFile::from_source("test.js", "let a;\nlet bb = a;\n");

        assert_eq!(parsed.line_col(0), Some((1, 1)));
        assert_eq!(parsed.line_col(4), Some((1, 5)));
        assert_eq!(parsed.line_col(7), Some((2, 1)));
        assert_eq!(parsed.line_col(11), Some((2, 5)));
        assert_eq!(parsed.line_start(2), Some(7));
    }

    #[test]
    fn get_line_returns_content() {
        let parsed = ParsedFile::from_source("test.js", "const x = 1;\nconst y = 2;");

        assert_eq!(parsed.get_line(1), Some("const x = 1;"));
        assert_eq!(parsed.get_line(2), Some("const y = 2;"));
        assert_eq!(parsed.get_line(0), None);
        assert_eq!(parsed.get_line(3), None);
    }

    #[test]
    fn span_text_rejects_out_of_range_spans() {
        let parsed = ParsedFile::from_source("test.js", "let a;");

        assert_eq!(parsed.span_text(Span::new(BytePos(500), BytePos(600))), None);
    }
}

//! Properties that must hold for every fixture: stable results, alias
//! collapse, non-empty classifications and findings that point at the
//! identifier they name.

use std::fs;
use std::path::Path;

use kensa_core::parser::ParsedFile;
use kensa_core::program::{Operand, Place, ProgramModel, Rvalue, StmtKind};
use kensa_core::semantic::{
    Binding, BindingIndex, DefUseResolver, NarrowingEngine, ResolvedSite, VariantKind, Verdict,
};
use kensa_core::{AnalysisEngine, Diagnostic};

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../tests/fixtures");

const FIXTURES: &[&str] = &[
    "unused/mixed.ts",
    "unused/closures.js",
    "conditions/mixed.ts",
];

fn read_fixture(relative_path: &str) -> String {
    let path = Path::new(FIXTURES_DIR).join(relative_path);
    fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e))
}

fn fixture_files() -> Vec<(String, ParsedFile)> {
    FIXTURES
        .iter()
        .map(|&relative| {
            let source = read_fixture(relative);
            let filename = relative.rsplit('/').next().unwrap_or(relative);
            (relative.to_string(), ParsedFile::from_source(filename, &source))
        })
        .collect()
}

fn quoted_name(message: &str) -> Option<&str> {
    let rest = message.strip_prefix('\'')?;
    rest.split('\'').next()
}

fn covered_text(source: &str, diagnostic: &Diagnostic) -> Option<String> {
    let line = source.lines().nth(diagnostic.line.checked_sub(1)?)?;
    Some(
        line.chars()
            .skip(diagnostic.column.checked_sub(1)?)
            .take(diagnostic.end_column.checked_sub(diagnostic.column)?)
            .collect(),
    )
}

#[test]
fn analysis_is_idempotent() {
    let engine = AnalysisEngine::new();
    for (name, file) in fixture_files() {
        let first = engine.analyze(&file);
        let second = engine.analyze(&file);
        assert_eq!(first, second, "results differ between runs for {name}");
    }
}

#[test]
fn findings_cover_the_identifier_they_name() {
    let engine = AnalysisEngine::new();
    for (name, file) in fixture_files() {
        for diagnostic in engine.analyze(&file).iter().filter(|d| d.rule_id == "Q001") {
            let expected = quoted_name(&diagnostic.message).expect("message names a binding");
            assert_eq!(diagnostic.line, diagnostic.end_line, "{name}: {diagnostic:?}");
            assert_eq!(
                covered_text(file.source(), diagnostic).as_deref(),
                Some(expected),
                "{name}: {diagnostic:?}"
            );
        }
    }
}

#[test]
fn aliases_are_as_used_as_their_source() {
    for (name, file) in fixture_files() {
        let model = ProgramModel::build(&file).expect("fixture lowers");
        let index = BindingIndex::build(&model);
        let defuse = DefUseResolver::build(&index);

        for stmt in model.stmts() {
            let StmtKind::Assign {
                target: Place::Temp(temp),
                value: Rvalue::Use(Operand::Local(source)),
            } = &stmt.kind
            else {
                continue;
            };
            let Some(real) = index.resolve_binding(&source.name, stmt.scope) else {
                continue;
            };
            assert_eq!(
                defuse.is_used(Binding::Alias(*temp)),
                defuse.is_used(Binding::Real(real)),
                "{name}: alias {} of '{}'",
                temp.name(),
                source.name
            );
        }
    }
}

#[test]
fn every_condition_has_a_classification() {
    for (name, file) in fixture_files() {
        let model = ProgramModel::build(&file).expect("fixture lowers");
        let index = BindingIndex::build(&model);
        let defuse = DefUseResolver::build(&index);
        let engine = NarrowingEngine::new(&index, &defuse);

        for site in ResolvedSite::resolve_all(&model) {
            let classification = engine.classify_condition(&site);
            assert!(
                !classification.kinds.is_empty(),
                "{name}: empty kinds for {:?}",
                model.span_text(site.span)
            );
        }
    }
}

#[test]
fn non_empty_string_literal_is_truthy() {
    let file = ParsedFile::from_source("literal.ts", "if (\"ready\") {}\nwhile ('') { break; }\n");
    let model = ProgramModel::build(&file).expect("lowers");
    let index = BindingIndex::build(&model);
    let defuse = DefUseResolver::build(&index);
    let engine = NarrowingEngine::new(&index, &defuse);
    let sites = ResolvedSite::resolve_all(&model);

    let truthy = engine.classify_condition(&sites[0]);
    assert!(truthy.kinds.is(&[VariantKind::TruthyString]));
    assert_eq!(truthy.verdict, Verdict::RequiresPolicy);
    assert!(!truthy.kinds.contains(VariantKind::Nullish));

    let empty = engine.classify_condition(&sites[1]);
    assert!(empty.kinds.is(&[VariantKind::String]));

    assert!(AnalysisEngine::new().analyze(&file).is_empty());
}

#[test]
fn parallel_analysis_matches_sequential() {
    let engine = AnalysisEngine::new();
    let sources: Vec<(String, String)> = FIXTURES
        .iter()
        .map(|relative| (relative.to_string(), read_fixture(relative)))
        .collect();

    let mut sequential: Vec<Diagnostic> = sources
        .iter()
        .flat_map(|(filename, source)| engine.analyze_source(filename, source))
        .collect();
    sequential.sort_by(|a, b| a.file.cmp(&b.file).then_with(|| a.sort_key().cmp(&b.sort_key())));

    assert_eq!(engine.analyze_sources(&sources), sequential);
}

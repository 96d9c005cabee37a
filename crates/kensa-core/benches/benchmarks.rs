use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use kensa_core::analysis::AnalysisEngine;
use kensa_core::parser::ParsedFile;
use kensa_core::program::ProgramModel;
use kensa_core::rules::RuleRegistry;
use kensa_core::rules::quality::{NoUnusedVars, StrictBooleanExpressions};
use kensa_core::semantic::{Binding, BindingIndex, DefUseResolver};

fn generate_500_loc_typescript() -> String {
    let mut code = String::with_capacity(20000);
    code.push_str("// Generated 500 LOC TypeScript file for benchmarking\n\n");

    for i in 0..25 {
        code.push_str(&format!(
            r#"interface Entity{i} {{
    id: number;
    name: string | null;
    tags?: string[];
}}

function processEntity{i}(entity: Entity{i}, unusedFlag: boolean): string {{
    let label = entity.name;
    const [head, spare] = entity.tags ?? [];
    if (label) {{
        return label;
    }}
    if (entity.tags && entity.id) {{
        label = head;
    }}
    return String(entity.id);
}}

async function fetchEntity{i}(id: number): Promise<Entity{i} | null> {{
    const response = await fetch(`/api/entities/{i}/${{id}}`);
    if (!response.ok) {{
        return null;
    }}
    return response.json();
}}

"#,
            i = i
        ));
    }

    code
}

fn generate_100_files() -> Vec<(String, String)> {
    (0..100)
        .map(|i| {
            let filename = format!("file_{}.ts", i);
            let content = format!(
                r#"interface Item{i} {{
    id: number;
    value: string | undefined;
}}

export function process{i}(item: Item{i}): Item{i} {{
    const unused = item.id;
    return item.value ? item : {{ ...item, value: "" }};
}}
"#,
                i = i
            );
            (filename, content)
        })
        .collect()
}

fn bench_lowering(c: &mut Criterion) {
    let mut group = c.benchmark_group("lowering");

    let code = generate_500_loc_typescript();
    let file = ParsedFile::from_source("benchmark.ts", &code);
    group.throughput(Throughput::Elements(code.lines().count() as u64));

    group.bench_function("parse_500_loc", |b| {
        b.iter(|| ParsedFile::from_source(black_box("benchmark.ts"), black_box(&code)))
    });
    group.bench_function("lower_500_loc", |b| {
        b.iter(|| ProgramModel::build(black_box(&file)))
    });
    group.bench_function("resolve_500_loc", |b| {
        let Some(model) = ProgramModel::build(&file) else {
            return;
        };
        b.iter(|| {
            let index = BindingIndex::build(black_box(&model));
            let defuse = DefUseResolver::build(&index);
            index
                .bindings()
                .filter(|binding| defuse.is_used(Binding::Real(binding.id)))
                .count()
        })
    });

    group.finish();
}

fn bench_rules(c: &mut Criterion) {
    let mut group = c.benchmark_group("rules");

    let code = generate_500_loc_typescript();
    let file = ParsedFile::from_source("benchmark.ts", &code);
    group.throughput(Throughput::Elements(code.lines().count() as u64));

    let mut unused_vars = RuleRegistry::new();
    unused_vars.register(Box::new(NoUnusedVars::new()));
    group.bench_function("no_unused_vars_500_loc", |b| {
        b.iter(|| unused_vars.run_all(black_box(&file)))
    });

    let mut strict_boolean = RuleRegistry::new();
    strict_boolean.register(Box::new(StrictBooleanExpressions::new()));
    group.bench_function("strict_boolean_expressions_500_loc", |b| {
        b.iter(|| strict_boolean.run_all(black_box(&file)))
    });

    let engine = AnalysisEngine::new();
    group.bench_function("all_rules_500_loc", |b| {
        b.iter(|| engine.analyze(black_box(&file)))
    });

    group.finish();
}

fn bench_multi_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi_file");
    group.sample_size(20);

    let files = generate_100_files();
    let engine = AnalysisEngine::new();
    group.throughput(Throughput::Elements(files.len() as u64));

    group.bench_function("analyze_100_files_sequential", |b| {
        b.iter(|| {
            files
                .iter()
                .map(|(name, source)| engine.analyze_source(name, source).len())
                .sum::<usize>()
        })
    });
    group.bench_function("analyze_100_files_parallel", |b| {
        b.iter(|| engine.analyze_sources(black_box(&files)))
    });

    group.finish();
}

criterion_group!(benches, bench_lowering, bench_rules, bench_multi_file);
criterion_main!(benches);

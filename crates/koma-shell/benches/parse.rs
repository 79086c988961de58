//! Benchmarks for line tokenizing, pipeline parsing and execution.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use koma_shell::parser::{parse_pipeline, split_by_semicolon};
use koma_shell::{BufferIo, CommandRegistry, Executor, ShellState, tokenize};
use koma_vfs::{MemoryVfs, Vfs};

const LINES: [(&str, &str); 3] = [
    ("simple", "ls -la /home"),
    ("pipeline", "cat log.txt | grep -i error | head -n 20 > out.txt"),
    ("quoted", r#"echo "a | b; c" 'x > y' foo"bar baz" >> notes.txt"#),
];

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");
    for (label, line) in LINES {
        group.bench_function(BenchmarkId::new("tokenize", label), |b| {
            b.iter(|| tokenize(line));
        });
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (label, line) in LINES {
        group.bench_function(BenchmarkId::new("parse_pipeline", label), |b| {
            b.iter(|| parse_pipeline(line));
        });
    }
    let plan: String = (0..50).map(|i| format!("echo {i} \"a;b\"; ")).collect();
    group.bench_function("split_by_semicolon_50", |b| {
        b.iter(|| split_by_semicolon(&plan));
    });
    group.finish();
}

fn bench_execute(c: &mut Criterion) {
    let registry = CommandRegistry::with_builtins();
    let executor = Executor::new(&registry);
    let mut vfs = MemoryVfs::new();
    vfs.mkdir("/home").unwrap();
    let text: String = (0..1_000).map(|i| format!("line {i} {}\n", if i % 3 == 0 { "error" } else { "ok" })).collect();
    vfs.write("/home/log.txt", text.as_bytes()).unwrap();

    c.bench_function("execute_grep_pipeline_1000", |b| {
        b.iter(|| {
            let mut state = ShellState::new("/home");
            let mut io = BufferIo::new();
            executor.execute_line("cat log.txt | grep error | wc -l", &mut state, &mut vfs, &mut io)
        });
    });
}

criterion_group!(benches, bench_tokenize, bench_parse, bench_execute);
criterion_main!(benches);

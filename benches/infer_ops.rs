//! Benchmarks for the inference primitives: unification, discrimination
//! index retrieval, and an end-to-end transitive-closure query.

use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use evibus::engine::Engine;
use evibus::index::DiscIndex;
use evibus::interpret::NoInterpretation;
use evibus::parser;
use evibus::term::{Clause, Literal, Reason, Term};
use evibus::unify;

fn bench_unify(c: &mut Criterion) {
    let l1: Vec<i64> = vec![1, -1, -2, 5, -3, 7];
    let l2: Vec<i64> = vec![1, 4, -5, 5, -6, 7];
    c.bench_function("unify_arity_5", |bench| {
        bench.iter(|| black_box(unify::unify(&l1, &l2)))
    });
}

fn bench_index_matchings(c: &mut Criterion) {
    let mut index: DiscIndex<u64> = DiscIndex::new();
    for i in 0..1_000i64 {
        index.insert(&vec![1, i + 2, (i % 7) + 2], i as u64);
        index.insert(&vec![1, -1, (i % 7) + 2], (i + 1_000) as u64);
    }
    let probe: Vec<i64> = vec![1, 500, -4];
    c.bench_function("index_matchings_2k_entries", |bench| {
        bench.iter(|| black_box(index.matchings(&probe)))
    });
}

fn bench_transitive_closure(c: &mut Criterion) {
    c.bench_function("path_query_chain_50", |bench| {
        bench.iter(|| {
            let engine = Engine::new(Arc::new(NoInterpretation));
            for i in 0..50u32 {
                let fact = Clause::fact(Literal::new(
                    "edge",
                    vec![Term::id(format!("n{i}")), Term::id(format!("n{}", i + 1))],
                ));
                engine.add_rule(&fact, Reason::Axiom).unwrap();
            }
            for rule in parser::parse_program(
                "path(X, Y) :- edge(X, Y). path(X, Y) :- edge(X, Z), path(Z, Y).",
            )
            .unwrap()
            {
                engine.add_rule(&rule, Reason::Axiom).unwrap();
            }
            let goal = parser::parse_literal("path(n0, X)").unwrap();
            engine.add_goal(&goal).unwrap();
            black_box(engine.get_substitutions(&goal).len())
        })
    });
}

criterion_group!(
    benches,
    bench_unify,
    bench_index_matchings,
    bench_transitive_closure
);
criterion_main!(benches);

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use rio_raptor::{BackendKind, Engine, RaptorConfig, Syntax};
use rio_raptor_api::model::{Literal, NamedNode, Statement};

fn ntriples_data(count: usize) -> Vec<u8> {
    let mut data = Vec::new();
    for i in 0..count {
        data.extend_from_slice(
            format!(
                "<http://example.com/s{}> <http://example.com/p{}> \"value {}\"@en .\n_:b{} <http://example.com/p> <http://example.com/o{}> .\n",
                i,
                i % 10,
                i,
                i,
                i
            )
            .as_bytes(),
        );
    }
    data
}

fn engine(backend: BackendKind) -> Option<Engine> {
    match Engine::new(&RaptorConfig::new().backend(backend)) {
        Ok(engine) => Some(engine),
        Err(error) => {
            eprintln!("skipping the {:?} backend: {}", backend, error);
            None
        }
    }
}

fn bench_native_decoding(c: &mut Criterion) {
    let engine = match engine(BackendKind::Native) {
        Some(engine) => engine,
        None => return,
    };
    let data = ntriples_data(10_000);
    let mut group = c.benchmark_group("native decoding");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("materialized", |b| {
        b.iter(|| {
            engine
                .parser(Syntax::NTriples)
                .parse(data.as_slice())
                .unwrap()
                .count()
        })
    });
    group.bench_function("raw", |b| {
        b.iter(|| {
            let mut count = 0;
            engine
                .native_parser(Syntax::NTriples)
                .unwrap()
                .parse_raw(data.as_slice(), |statement| {
                    statement.object()?;
                    count += 1;
                    Ok(())
                })
                .unwrap();
            count
        })
    });
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let engine = match engine(BackendKind::Cli) {
        Some(engine) => engine,
        None => return,
    };
    let data = ntriples_data(10_000);
    let statements = engine
        .parser(Syntax::NTriples)
        .parse(data.as_slice())
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let mut group = c.benchmark_group("rapper pipeline");
    group.sample_size(10);
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("parse", |b| {
        b.iter(|| {
            engine
                .parser(Syntax::NTriples)
                .parse(data.as_slice())
                .unwrap()
                .count()
        })
    });
    group.bench_function("serialize", |b| {
        b.iter(|| {
            let mut writer = engine
                .serializer(Syntax::NTriples)
                .serialize(Vec::new())
                .unwrap();
            for statement in &statements {
                writer.format(statement).unwrap();
            }
            writer.finish().unwrap().len()
        })
    });
    group.finish();
}

fn bench_formatting(c: &mut Criterion) {
    let statement = Statement::new(
        NamedNode::new("http://example.com/s").unwrap(),
        NamedNode::new("http://example.com/p").unwrap(),
        Literal::new_language_tagged_literal("a \"quoted\"\nvalue", "en").unwrap(),
    );
    c.bench_function("statement to N-Triples", |b| b.iter(|| statement.to_string()));
}

criterion_group!(decode, bench_native_decoding, bench_pipeline, bench_formatting);

criterion_main!(decode);

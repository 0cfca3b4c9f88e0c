use rio_raptor::{BackendKind, Engine, RaptorConfig, Syntax};
use rio_raptor_testsuite::{are_datasets_isomorphic, Dataset};

const TURTLE: &str = r#"@prefix ex: <http://example.com/> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

ex:alice ex:knows [ ex:name "Bob"@en ; ex:age "42"^^xsd:integer ] ;
    ex:knows _:carol ;
    ex:comment "multi\nline \"quoted\"" .
_:carol ex:knows ex:alice ; ex:name "Carol" .
"#;

const TRIG: &str = r#"@prefix ex: <http://example.com/> .

ex:g { ex:s ex:p [ ex:q "o" ] . }
ex:s ex:p ex:o .
"#;

fn engine(backend: BackendKind) -> Option<Engine> {
    match Engine::new(&RaptorConfig::new().backend(backend)) {
        Ok(engine) => Some(engine),
        Err(error) => {
            eprintln!("skipping the {:?} backend: {}", backend, error);
            None
        }
    }
}

fn engines() -> Vec<Engine> {
    [BackendKind::Native, BackendKind::Cli]
        .iter()
        .filter_map(|backend| engine(*backend))
        .collect()
}

fn parse(engine: &Engine, syntax: Syntax, data: impl Into<Vec<u8>>) -> Dataset {
    Dataset::parse(&engine.parser(syntax), data.into()).unwrap()
}

fn serialize(engine: &Engine, syntax: Syntax, dataset: &Dataset) -> Vec<u8> {
    let mut writer = engine
        .serializer(syntax)
        .with_prefix("ex", "http://example.com/")
        .unwrap()
        .serialize(Vec::new())
        .unwrap();
    for statement in dataset.iter() {
        writer.format(statement).unwrap();
    }
    writer.finish().unwrap()
}

#[test]
fn backends_agree() {
    let engines = engines();
    if engines.len() < 2 {
        return;
    }
    for (syntax, data) in [(Syntax::Turtle, TURTLE), (Syntax::TriG, TRIG)] {
        let native = parse(&engines[0], syntax, data);
        let cli = parse(&engines[1], syntax, data);
        assert!(
            are_datasets_isomorphic(&native, &cli),
            "libraptor2 parsed\n{}\nbut rapper parsed\n{}",
            native,
            cli
        );
    }
}

#[test]
fn triple_round_trips() {
    for engine in engines() {
        let expected = parse(&engine, Syntax::Turtle, TURTLE);
        assert_eq!(expected.len(), 7);
        for syntax in [
            Syntax::NTriples,
            Syntax::Turtle,
            Syntax::RdfXml,
            Syntax::RdfXmlAbbrev,
            Syntax::Json,
        ] {
            let data = serialize(&engine, syntax, &expected);
            let read_as = if syntax == Syntax::RdfXmlAbbrev {
                Syntax::RdfXml
            } else {
                syntax
            };
            let actual = parse(&engine, read_as, data);
            assert!(
                are_datasets_isomorphic(&expected, &actual),
                "{:?} through {} gave\n{}\ninstead of\n{}",
                engine,
                syntax,
                actual,
                expected
            );
        }
    }
}

#[test]
fn quad_round_trips() {
    for engine in engines() {
        let expected = parse(&engine, Syntax::TriG, TRIG);
        assert_eq!(expected.len(), 3);
        for syntax in [Syntax::NQuads, Syntax::TriG] {
            if !engine.supports_serializer(syntax) {
                continue;
            }
            let data = serialize(&engine, syntax, &expected);
            let actual = parse(&engine, syntax, data);
            assert!(
                are_datasets_isomorphic(&expected, &actual),
                "{:?} through {} gave\n{}\ninstead of\n{}",
                engine,
                syntax,
                actual,
                expected
            );
        }
    }
}

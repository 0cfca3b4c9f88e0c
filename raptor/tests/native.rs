#![cfg(unix)]
//! Tests against the `libraptor2` of the host. They are skipped when it cannot be loaded.

mod common;

use common::native_engine;
use rio_api::model::{Literal as RawLiteral, Term as RawTerm};
use rio_raptor::{ParseInput, Syntax};
use rio_raptor_api::model::{BlankNode, Literal, NamedNode, Statement, Subject, Term};
use std::thread;

const TURTLE: &str = "@prefix ex: <http://example.com/> .\nex:s ex:p \"v\"@en ; ex:q [ ex:r 1 ] .\n";

#[test]
fn turtle_is_parsed() {
    let engine = match native_engine() {
        Some(engine) => engine,
        None => return,
    };
    let mut reader = engine.parser(Syntax::Turtle).parse(TURTLE.as_bytes()).unwrap();
    let statements = reader.by_ref().collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(statements.len(), 3);
    assert!(statements.contains(&Statement::new(
        NamedNode::new("http://example.com/s").unwrap(),
        NamedNode::new("http://example.com/p").unwrap(),
        Literal::new_language_tagged_literal("v", "en").unwrap(),
    )));
    assert_eq!(
        reader.prefixes(),
        [("ex".to_owned(), "http://example.com/".to_owned())]
    );
}

#[test]
fn blank_nodes_are_stable_within_a_document() {
    let engine = match native_engine() {
        Some(engine) => engine,
        None => return,
    };
    let parse = || {
        engine
            .parser(Syntax::Turtle)
            .parse(TURTLE.as_bytes())
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    };
    let first = parse();
    let object = first
        .iter()
        .find(|s| s.predicate.as_str() == "http://example.com/q")
        .map(|s| s.object.clone())
        .unwrap();
    let subject = first
        .iter()
        .find(|s| s.predicate.as_str() == "http://example.com/r")
        .map(|s| Term::from(s.subject.clone()))
        .unwrap();
    assert_eq!(object, subject);

    let second = parse();
    let other = second
        .iter()
        .find(|s| s.predicate.as_str() == "http://example.com/r")
        .map(|s| s.subject.clone())
        .unwrap();
    assert_ne!(Term::from(other), object);
}

#[test]
fn malformed_input_is_located() {
    let engine = match native_engine() {
        Some(engine) => engine,
        None => return,
    };
    let error = engine
        .parser(Syntax::Turtle)
        .parse(b"<http://e/a> <http://e/b> <http://e/c> .\n<http://e/a> <http://e/b> .\n".as_ref())
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap_err();
    assert!(error.is_parse());
    assert_eq!(error.line(), Some(2));
}

#[test]
fn streamed_input_is_chunked() {
    let engine = match native_engine() {
        Some(engine) => engine,
        None => return,
    };
    let mut data = Vec::new();
    for i in 0..10_000 {
        data.extend_from_slice(
            format!("<http://e/s{}> <http://e/p> \"{}\" .\n", i, i).as_bytes(),
        );
    }
    let count = engine
        .parser(Syntax::NTriples)
        .parse(ParseInput::from_reader(std::io::Cursor::new(data)))
        .unwrap()
        .filter(|s| s.is_ok())
        .count();
    assert_eq!(count, 10_000);
}

#[test]
fn round_trip_through_turtle() {
    let engine = match native_engine() {
        Some(engine) => engine,
        None => return,
    };
    let statement = Statement::new(
        BlankNode::new_unchecked("b0"),
        NamedNode::new("http://example.com/p").unwrap(),
        Literal::new_typed_literal(
            "1",
            NamedNode::new("http://www.w3.org/2001/XMLSchema#integer").unwrap(),
        ),
    );
    let mut writer = engine
        .serializer(Syntax::Turtle)
        .with_prefix("ex", "http://example.com/")
        .unwrap()
        .serialize(Vec::new())
        .unwrap();
    writer.format(&statement).unwrap();
    let turtle = writer.finish().unwrap();
    assert!(String::from_utf8_lossy(&turtle).contains("@prefix ex:"));

    let parsed = engine
        .parser(Syntax::Turtle)
        .parse(turtle)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(parsed.len(), 1);
    assert!(matches!(parsed[0].subject, Subject::BlankNode(_)));
    assert_eq!(parsed[0].object, statement.object);
}

#[test]
fn raw_statements_borrow_engine_memory() {
    let engine = match native_engine() {
        Some(engine) => engine,
        None => return,
    };
    let mut languages = Vec::new();
    let warnings = engine
        .native_parser(Syntax::Turtle)
        .unwrap()
        .parse_raw(TURTLE.as_bytes(), |statement| {
            if let RawTerm::Literal(RawLiteral::LanguageTaggedString { language, .. }) =
                statement.object()?
            {
                languages.push(language.to_owned());
            }
            Ok(())
        })
        .unwrap();
    assert!(warnings.is_empty());
    assert_eq!(languages, ["en"]);
}

#[test]
fn concurrent_parses() {
    if native_engine().is_none() {
        return;
    }
    let threads = (0..4)
        .map(|_| {
            thread::spawn(|| {
                let engine = native_engine().unwrap();
                engine
                    .parser(Syntax::Turtle)
                    .parse(TURTLE.as_bytes())
                    .unwrap()
                    .count()
            })
        })
        .collect::<Vec<_>>();
    for thread in threads {
        assert_eq!(thread.join().unwrap(), 3);
    }
}

#[test]
fn version_is_reported() {
    let engine = match native_engine() {
        Some(engine) => engine,
        None => return,
    };
    let version = engine.version().unwrap();
    assert_eq!(version.major, 2);
    let native = engine.native().unwrap();
    assert!(native.version_string().starts_with("2."));
    assert!(native.supports_parser(Syntax::Turtle));
    assert!(!native.supports_parser(Syntax::Dot));
}

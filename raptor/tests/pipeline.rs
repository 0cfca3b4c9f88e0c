#![cfg(unix)]

mod common;

use common::*;
use rio_raptor::{ParseInput, RaptorErrorKind, Syntax, Version};
use rio_raptor_api::model::{BlankNode, Literal, NamedNode, Statement, Term};
use rio_raptor_api::parser::StatementsParser;
use std::io::Write;
use std::time::{Duration, Instant};

#[test]
fn language_tagged_literal_round_trip() {
    let engine = cli_engine("identity");
    let data = "<http://e/a> <http://e/b> \"v\"@en .\n";

    let statements = engine
        .parser(Syntax::Turtle)
        .parse(data.as_bytes())
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(
        statements,
        vec![Statement::new(
            NamedNode::new("http://e/a").unwrap(),
            NamedNode::new("http://e/b").unwrap(),
            Literal::new_language_tagged_literal("v", "en").unwrap(),
        )]
    );

    let mut writer = engine.serializer(Syntax::NTriples).serialize(Vec::new()).unwrap();
    for statement in &statements {
        writer.format(statement).unwrap();
    }
    assert_eq!(String::from_utf8(writer.finish().unwrap()).unwrap(), data);
}

#[test]
fn located_parse_error() {
    let engine = cli_engine("failing");
    let mut reader = engine
        .parser(Syntax::Turtle)
        .parse(b"whatever".as_ref())
        .unwrap();

    assert!(reader.next().unwrap().is_ok());
    let error = reader.next().unwrap().unwrap_err();
    assert!(error.is_parse());
    assert_eq!(error.line(), Some(3));
    match error.kind() {
        RaptorErrorKind::Parse { column, message, .. } => {
            assert_eq!(*column, Some(5));
            assert_eq!(message, "syntax error");
        }
        kind => panic!("unexpected error {:?}", kind),
    }
    assert_eq!(reader.warnings().len(), 1);
    assert_eq!(reader.warnings()[0].line, Some(1));
    assert!(reader.next().is_none());
}

#[test]
fn exit_without_diagnostic_is_io() {
    let engine = cli_engine("crashing");
    let error = engine
        .parser(Syntax::NTriples)
        .parse(b"<http://e/a> <http://e/b> <http://e/c> .".as_ref())
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap_err();
    assert!(error.is_io());
    assert!(!error.is_parse());
}

#[test]
fn early_failure_while_streaming_input() {
    let engine = cli_engine("early-failing");
    let error = engine
        .parser(Syntax::RdfXml)
        .parse(ParseInput::from_reader(Endless::new()))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap_err();
    assert!(error.is_parse());
    assert_eq!(error.line(), Some(1));
}

#[test]
fn early_failure_while_serializing() {
    let engine = cli_engine("early-failing");
    let statement = Statement::new(
        NamedNode::new("http://e/a").unwrap(),
        NamedNode::new("http://e/b").unwrap(),
        NamedNode::new("http://e/c").unwrap(),
    );
    let mut writer = engine.serializer(Syntax::Turtle).serialize(Vec::new()).unwrap();
    let mut result = Ok(());
    for _ in 0..100_000 {
        result = writer.format(&statement);
        if result.is_err() {
            break;
        }
    }
    let error = match result {
        Ok(()) => writer.finish().unwrap_err(),
        Err(error) => error,
    };
    assert!(error.is_serialize());
    assert_eq!(error.line(), Some(1));
}

#[test]
fn serializing_more_than_a_pipe_buffer() {
    let engine = cli_engine("identity");
    let mut writer = engine.serializer(Syntax::NTriples).serialize(Vec::new()).unwrap();
    for i in 0..20_000 {
        writer
            .format(&Statement::new(
                NamedNode::new(format!("http://example.com/subject/{}", i)).unwrap(),
                NamedNode::new("http://example.com/predicate").unwrap(),
                Literal::new_simple_literal(format!("value number {}", i)),
            ))
            .unwrap();
        if i % 5000 == 0 {
            writer.flush().unwrap();
        }
    }
    let output = String::from_utf8(writer.finish().unwrap()).unwrap();
    assert_eq!(output.lines().count(), 20_000);
    assert!(output.ends_with("\"value number 19999\" .\n"));
}

#[test]
fn close_stops_an_endless_parse() {
    let engine = cli_engine("identity");
    let mut reader = engine
        .parser(Syntax::NTriples)
        .parse(ParseInput::from_reader(Endless::new()))
        .unwrap();
    for _ in 0..10 {
        reader.next().unwrap().unwrap();
    }
    reader.close();
    assert!(reader.next().is_none());
}

#[test]
fn undecodable_output_stops_a_stalled_process() {
    let engine = cli_engine("garbling");
    let start = Instant::now();
    let mut reader = engine
        .parser(Syntax::NTriples)
        .parse(ParseInput::from_reader(Endless::new()))
        .unwrap();
    let error = reader.next().unwrap().unwrap_err();
    assert!(error.is_io(), "{}", error);
    assert!(reader.next().is_none());
    assert!(start.elapsed() < Duration::from_secs(60));
}

#[test]
fn undecodable_output_reports_the_process_error() {
    let engine = cli_engine("garbling-with-error");
    let start = Instant::now();
    let error = engine
        .parser(Syntax::Turtle)
        .parse(ParseInput::from_reader(Endless::new()))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap_err();
    assert!(error.is_parse(), "{}", error);
    assert_eq!(error.line(), Some(2));
    assert!(error.to_string().contains("bad output"));
    assert!(start.elapsed() < Duration::from_secs(60));
}

#[test]
fn graph_names_survive_quad_syntaxes() {
    let engine = cli_engine("identity");
    let data = "<http://e/a> <http://e/b> _:x <http://e/g> .\n<http://e/a> <http://e/b> <http://e/c> .\n";

    let statements = engine
        .parser(Syntax::TriG)
        .parse(data.as_bytes())
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(statements.len(), 2);
    assert_eq!(
        statements[0].graph_name,
        Some(NamedNode::new("http://e/g").unwrap().into())
    );
    assert_eq!(statements[0].object, Term::from(BlankNode::new_unchecked("x")));
    assert_eq!(statements[1].graph_name, None);

    let mut writer = engine.serializer(Syntax::NQuads).serialize(Vec::new()).unwrap();
    for statement in &statements {
        writer.format(statement).unwrap();
    }
    assert_eq!(String::from_utf8(writer.finish().unwrap()).unwrap(), data);
}

#[test]
fn graph_names_are_rejected_by_triple_syntaxes() {
    let engine = cli_engine("identity");
    let mut writer = engine.serializer(Syntax::Turtle).serialize(Vec::new()).unwrap();
    let error = writer
        .format(
            &Statement::new(
                NamedNode::new("http://e/a").unwrap(),
                NamedNode::new("http://e/b").unwrap(),
                NamedNode::new("http://e/c").unwrap(),
            )
            .in_graph(NamedNode::new("http://e/g").unwrap()),
        )
        .unwrap_err();
    assert!(error.is_argument());
}

#[test]
fn files_are_read_by_the_process() {
    let engine = cli_engine("identity");
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "<http://e/a> <http://e/b> \"1\"^^<http://www.w3.org/2001/XMLSchema#integer> .").unwrap();
    file.flush().unwrap();

    let statements = engine
        .parser(Syntax::Turtle)
        .parse(file.path())
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    match &statements[0].object {
        Term::Literal(literal) => assert_eq!(
            literal.datatype().map(NamedNode::as_str),
            Some("http://www.w3.org/2001/XMLSchema#integer")
        ),
        object => panic!("unexpected object {}", object),
    }
}

#[test]
fn missing_files_are_io_errors() {
    let engine = cli_engine("identity");
    let error = engine
        .parser(Syntax::Turtle)
        .parse(std::path::Path::new("/nonexistent/file.ttl"))
        .err()
        .unwrap();
    assert!(error.is_io());
}

#[test]
fn unreachable_iris_are_reported_by_the_process() {
    let engine = cli_engine("identity");
    let error = engine
        .parser(Syntax::RdfXml)
        .parse(ParseInput::iri("http://example.com/missing.rdf"))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap_err();
    assert!(error.is_parse());
    assert_eq!(error.line(), None);
}

#[test]
fn invalid_arguments_are_rejected_before_spawning() {
    let engine = cli_engine("identity");
    assert!(engine
        .parser(Syntax::Turtle)
        .parse(ParseInput::iri("not an iri"))
        .err()
        .unwrap()
        .is_argument());
    assert!(engine
        .parser(Syntax::Dot)
        .parse(b"".as_ref())
        .err()
        .unwrap()
        .is_argument());
    assert!(engine
        .serializer(Syntax::RdfA)
        .serialize(Vec::new())
        .err()
        .unwrap()
        .is_argument());
    assert!(engine
        .serializer(Syntax::Turtle)
        .with_prefix("bad prefix", "http://e/")
        .is_err());
}

#[test]
fn statements_parser_interface() {
    let engine = cli_engine("identity");
    let mut reader = engine
        .parser(Syntax::NTriples)
        .parse(b"<http://e/a> <http://e/b> <http://e/c> .\n<http://e/a> <http://e/b> <http://e/d> .\n".to_vec())
        .unwrap();
    let mut count = 0;
    reader
        .parse_all(&mut |_| {
            count += 1;
            Ok(())
        })
        .unwrap();
    assert_eq!(count, 2);
    assert!(reader.is_end());
}

#[test]
fn version_and_capabilities() {
    let engine = cli_engine("identity");
    assert_eq!(
        engine.version().unwrap(),
        Version {
            major: 2,
            minor: 0,
            release: 15
        }
    );
    assert!(engine.is_available());
    assert!(engine.native().is_none());
    assert!(engine.supports_parser(Syntax::RdfA));
    assert!(!engine.supports_parser(Syntax::Dot));
    assert!(engine.supports_serializer(Syntax::Dot));
    assert!(engine.native_parser(Syntax::Turtle).err().unwrap().is_unavailable());
}

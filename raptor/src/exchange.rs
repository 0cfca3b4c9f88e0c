//! The line based syntax statements travel in between this crate and `rapper`.

use crate::error::RaptorError;
use crate::marshal::DecodingSession;
use crate::syntax::Syntax;
use rio_api::parser::{QuadsParser, TriplesParser};
use rio_raptor_api::model::Statement;
use rio_turtle::{NQuadsParser, NTriplesParser};
use std::collections::VecDeque;
use std::io::{BufRead, Write};

/// Streaming decoder of N-Triples or N-Quads produced by the engine.
pub(crate) enum ExchangeDecoder<R: BufRead> {
    NTriples(NTriplesParser<R>),
    NQuads(NQuadsParser<R>),
}

impl<R: BufRead> ExchangeDecoder<R> {
    pub(crate) fn new(exchange: Syntax, read: R) -> Self {
        if exchange == Syntax::NQuads {
            ExchangeDecoder::NQuads(NQuadsParser::new(read))
        } else {
            ExchangeDecoder::NTriples(NTriplesParser::new(read))
        }
    }

    pub(crate) fn is_end(&self) -> bool {
        match self {
            ExchangeDecoder::NTriples(parser) => parser.is_end(),
            ExchangeDecoder::NQuads(parser) => parser.is_end(),
        }
    }

    /// Decodes the next line, pushing what it contains to `queue`.
    pub(crate) fn step(
        &mut self,
        session: &mut DecodingSession,
        queue: &mut VecDeque<Statement>,
    ) -> Result<(), RaptorError> {
        match self {
            ExchangeDecoder::NTriples(parser) => parser.parse_step(&mut |t| {
                queue.push_back(session.triple(t)?);
                Ok(())
            }),
            ExchangeDecoder::NQuads(parser) => parser.parse_step(&mut |q| {
                queue.push_back(session.quad(q)?);
                Ok(())
            }),
        }
    }
}

/// Writes `statement` as one line of the `exchange` syntax.
pub(crate) fn encode_line(
    statement: &Statement,
    exchange: Syntax,
    out: &mut impl Write,
) -> Result<(), RaptorError> {
    if statement.graph_name.is_some() && exchange != Syntax::NQuads {
        return Err(RaptorError::argument(format!(
            "the statement {} has a graph name but the target syntax only supports triples",
            statement
        )));
    }
    writeln!(out, "{}", statement)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rio_raptor_api::model::{NamedNode, Term};

    fn decode_all(exchange: Syntax, data: &str) -> Result<Vec<Statement>, RaptorError> {
        let mut decoder = ExchangeDecoder::new(exchange, data.as_bytes());
        let mut session = DecodingSession::new();
        let mut queue = VecDeque::new();
        while !decoder.is_end() {
            decoder.step(&mut session, &mut queue)?;
        }
        Ok(queue.into_iter().collect())
    }

    #[test]
    fn decodes_language_tagged_literals() {
        let statements =
            decode_all(Syntax::NTriples, "<http://e/a> <http://e/b> \"v\"@en .\n").unwrap();
        assert_eq!(statements.len(), 1);
        match &statements[0].object {
            Term::Literal(literal) => {
                assert_eq!(literal.value(), "v");
                assert_eq!(literal.language(), Some("en"));
            }
            other => panic!("unexpected object {}", other),
        }
    }

    #[test]
    fn decodes_quads() {
        let statements = decode_all(
            Syntax::NQuads,
            "<http://e/a> <http://e/b> <http://e/c> <http://e/g> .\n<http://e/a> <http://e/b> <http://e/c> .\n",
        )
        .unwrap();
        assert_eq!(
            statements[0].graph_name,
            Some(NamedNode::new_unchecked("http://e/g").into())
        );
        assert_eq!(statements[1].graph_name, None);
    }

    #[test]
    fn garbage_is_an_io_error() {
        let error = decode_all(Syntax::NTriples, "this is not n-triples\n").unwrap_err();
        assert!(error.is_io());
    }

    #[test]
    fn graph_names_need_a_quad_exchange() {
        let statement = Statement::new(
            NamedNode::new_unchecked("http://e/a"),
            NamedNode::new_unchecked("http://e/b"),
            NamedNode::new_unchecked("http://e/c"),
        )
        .in_graph(NamedNode::new_unchecked("http://e/g"));
        let mut out = Vec::new();
        assert!(encode_line(&statement, Syntax::NTriples, &mut out)
            .unwrap_err()
            .is_argument());
        encode_line(&statement, Syntax::NQuads, &mut out).unwrap();
        assert_eq!(
            out,
            b"<http://e/a> <http://e/b> <http://e/c> <http://e/g> .\n".to_vec()
        );
    }
}

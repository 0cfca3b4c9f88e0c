//! Conversion of the borrowed statements produced by both backends into the owned model.

use crate::error::RaptorError;
use rio_api::model as rio;
use rio_raptor_api::model::{
    BlankNode, GraphName, Literal, NamedNode, Statement, Subject, Term,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Prefix of the labels the engine makes up for blank nodes without one.
const SYNTHESIZED_PREFIX: &str = "genid";

/// Whether `label` follows the pattern the engine uses for the labels it synthesizes.
pub(crate) fn is_synthesized_label(label: &str) -> bool {
    label
        .strip_prefix(SYNTHESIZED_PREFIX)
        .map_or(false, |digits| {
            !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
        })
}

/// Blank node identities of one parse session.
///
/// Document labels are kept as they are. Synthesized labels get a fresh node the
/// first time they are seen and the same node afterwards, so that two sessions
/// both emitting `genid1` never produce the same node.
#[derive(Default)]
pub(crate) struct BlankNodeMap {
    synthesized: HashMap<String, BlankNode>,
}

impl BlankNodeMap {
    pub(crate) fn get(&mut self, label: &str) -> BlankNode {
        if !is_synthesized_label(label) {
            return BlankNode::new_unchecked(label);
        }
        if let Some(node) = self.synthesized.get(label) {
            return node.clone();
        }
        let node = BlankNode::fresh();
        self.synthesized.insert(label.to_owned(), node.clone());
        node
    }
}

/// State shared by all the statements decoded during one parse.
#[derive(Default)]
pub(crate) struct DecodingSession {
    iris: HashSet<Arc<str>>,
    blank_nodes: BlankNodeMap,
}

impl DecodingSession {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn named_node(&mut self, node: rio::NamedNode<'_>) -> NamedNode {
        if let Some(iri) = self.iris.get(node.iri) {
            return NamedNode::new_unchecked(Arc::clone(iri));
        }
        let iri: Arc<str> = node.iri.into();
        self.iris.insert(Arc::clone(&iri));
        NamedNode::new_unchecked(iri)
    }

    pub(crate) fn blank_node(&mut self, node: rio::BlankNode<'_>) -> BlankNode {
        self.blank_nodes.get(node.id)
    }

    pub(crate) fn literal(&mut self, literal: rio::Literal<'_>) -> Literal {
        match literal {
            rio::Literal::Simple { value } => Literal::Simple {
                value: value.to_owned(),
            },
            rio::Literal::LanguageTaggedString { value, language } => {
                Literal::LanguageTaggedString {
                    value: value.to_owned(),
                    language: language.to_ascii_lowercase(),
                }
            }
            rio::Literal::Typed { value, datatype } => Literal::Typed {
                value: value.to_owned(),
                datatype: self.named_node(datatype),
            },
        }
    }

    pub(crate) fn subject(&mut self, subject: rio::Subject<'_>) -> Result<Subject, RaptorError> {
        Ok(match subject {
            rio::Subject::NamedNode(node) => self.named_node(node).into(),
            rio::Subject::BlankNode(node) => self.blank_node(node).into(),
            _ => return Err(quoted_triple()),
        })
    }

    pub(crate) fn term(&mut self, term: rio::Term<'_>) -> Result<Term, RaptorError> {
        Ok(match term {
            rio::Term::NamedNode(node) => self.named_node(node).into(),
            rio::Term::BlankNode(node) => self.blank_node(node).into(),
            rio::Term::Literal(literal) => self.literal(literal).into(),
            _ => return Err(quoted_triple()),
        })
    }

    pub(crate) fn graph_name(&mut self, graph_name: rio::GraphName<'_>) -> GraphName {
        match graph_name {
            rio::GraphName::NamedNode(node) => self.named_node(node).into(),
            rio::GraphName::BlankNode(node) => self.blank_node(node).into(),
        }
    }

    pub(crate) fn triple(&mut self, triple: rio::Triple<'_>) -> Result<Statement, RaptorError> {
        Ok(Statement {
            subject: self.subject(triple.subject)?,
            predicate: self.named_node(triple.predicate),
            object: self.term(triple.object)?,
            graph_name: None,
        })
    }

    pub(crate) fn quad(&mut self, quad: rio::Quad<'_>) -> Result<Statement, RaptorError> {
        Ok(Statement {
            subject: self.subject(quad.subject)?,
            predicate: self.named_node(quad.predicate),
            object: self.term(quad.object)?,
            graph_name: quad.graph_name.map(|g| self.graph_name(g)),
        })
    }
}

fn quoted_triple() -> RaptorError {
    RaptorError::argument("quoted triples are not supported by Raptor 2")
}

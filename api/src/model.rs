//! Owned data structures for [RDF 1.1 Concepts](https://www.w3.org/TR/rdf11-concepts/) statements.
//!
//! The values defined here outlive any parse or serialize session: they are what an
//! application gets out of a reader and hands to a writer, whatever engine backend is
//! used underneath.

use crate::error::{ModelError, ModelErrorKind};
use oxilangtag::LanguageTag;
use oxiri::Iri;
use std::fmt;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// An RDF [IRI](https://www.w3.org/TR/rdf11-concepts/#dfn-iri).
///
/// The IRI string is reference counted so that decoders may intern it and share one
/// allocation between every statement mentioning the same resource.
///
/// The default string formatter is returning an N-Triples, Turtle and SPARQL compatible representation.
///
/// ```
/// use rio_raptor_api::model::NamedNode;
///
/// assert_eq!(
///     "<http://example.com/foo>",
///     NamedNode::new("http://example.com/foo")?.to_string()
/// );
/// # Result::<_, rio_raptor_api::ModelError>::Ok(())
/// ```
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub struct NamedNode {
    iri: Arc<str>,
}

impl NamedNode {
    /// Builds a node from an absolute IRI, validating it first.
    pub fn new(iri: impl Into<String>) -> Result<Self, ModelError> {
        let iri = iri.into();
        if let Err(error) = Iri::parse(iri.as_str()) {
            return Err(ModelError {
                kind: ModelErrorKind::InvalidIri { iri, error },
            });
        }
        Ok(Self { iri: iri.into() })
    }

    /// Builds a node without validation.
    ///
    /// The caller guarantees that `iri` is a valid absolute IRI, typically because it
    /// was produced by the engine itself.
    pub fn new_unchecked(iri: impl Into<Arc<str>>) -> Self {
        Self { iri: iri.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.iri
    }

    /// The shared IRI string.
    pub fn as_arc(&self) -> &Arc<str> {
        &self.iri
    }
}

impl fmt::Display for NamedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.iri)
    }
}

static NEXT_ANONYMOUS_ID: AtomicU64 = AtomicU64::new(1);

/// An RDF [blank node](https://www.w3.org/TR/rdf11-concepts/#dfn-blank-node).
///
/// Labels written in a document are kept verbatim in [`BlankNode::Named`].
/// Nodes the engine invented a label for are [`BlankNode::Anonymous`]: their identity
/// is a process-wide counter value so that two parse sessions never collide.
///
/// ```
/// use rio_raptor_api::model::BlankNode;
///
/// assert_eq!("_:a1", BlankNode::new("a1")?.to_string());
/// assert!(BlankNode::new("a b").is_err());
/// assert_ne!(BlankNode::fresh(), BlankNode::fresh());
/// # Result::<_, rio_raptor_api::ModelError>::Ok(())
/// ```
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub enum BlankNode {
    /// A node with a document supplied label.
    Named {
        /// The [blank node identifier](https://www.w3.org/TR/rdf11-concepts/#dfn-blank-node-identifier).
        id: String,
    },
    /// A node with a generated, process unique identity.
    Anonymous { id: u64 },
}

impl BlankNode {
    /// Builds a node from a document label, checked against the N-Triples
    /// `BLANK_NODE_LABEL` production (without the `_:` prefix).
    pub fn new(id: impl Into<String>) -> Result<Self, ModelError> {
        let id = id.into();
        if is_blank_node_label(&id) {
            Ok(BlankNode::Named { id })
        } else {
            Err(ModelError {
                kind: ModelErrorKind::InvalidBlankNodeLabel { label: id },
            })
        }
    }

    /// Builds a node from a label that is already known to be valid, such as
    /// one returned by the engine.
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        BlankNode::Named { id: id.into() }
    }

    /// Mints a blank node that is distinct from every other node of this process.
    pub fn fresh() -> Self {
        BlankNode::Anonymous {
            id: NEXT_ANONYMOUS_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// The label to write in a serialization.
    ///
    /// Anonymous nodes use an `anon` prefix so that their label can never be
    /// mistaken for a label the engine synthesized itself.
    pub fn label(&self) -> String {
        match self {
            BlankNode::Named { id } => id.clone(),
            BlankNode::Anonymous { id } => format!("anon{}", id),
        }
    }
}

impl fmt::Display for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlankNode::Named { id } => write!(f, "_:{}", id),
            BlankNode::Anonymous { id } => write!(f, "_:anon{}", id),
        }
    }
}

// [141s] BLANK_NODE_LABEL ::= '_:' (PN_CHARS_U | [0-9]) ((PN_CHARS | '.')* PN_CHARS)?
fn is_blank_node_label(label: &str) -> bool {
    let mut chars = label.chars();
    match chars.next() {
        Some(c) if is_pn_chars_u(c) || c.is_ascii_digit() => (),
        _ => return false,
    }
    let rest = chars.as_str();
    rest.chars().all(|c| is_pn_chars(c) || c == '.') && !rest.ends_with('.')
}

// [157s] PN_CHARS_BASE
fn is_pn_chars_base(c: char) -> bool {
    matches!(c,
        'A'..='Z'
        | 'a'..='z'
        | '\u{00C0}'..='\u{00D6}'
        | '\u{00D8}'..='\u{00F6}'
        | '\u{00F8}'..='\u{02FF}'
        | '\u{0370}'..='\u{037D}'
        | '\u{037F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

// [158s] PN_CHARS_U ::= PN_CHARS_BASE | '_' | ':'
fn is_pn_chars_u(c: char) -> bool {
    is_pn_chars_base(c) || c == '_' || c == ':'
}

// [160s] PN_CHARS ::= PN_CHARS_U | '-' | [0-9] | #x00B7 | [#x0300-#x036F] | [#x203F-#x2040]
fn is_pn_chars(c: char) -> bool {
    is_pn_chars_u(c)
        || matches!(c, '-' | '0'..='9' | '\u{00B7}' | '\u{0300}'..='\u{036F}' | '\u{203F}'..='\u{2040}')
}

/// An RDF [literal](https://www.w3.org/TR/rdf11-concepts/#dfn-literal).
///
/// A literal carries at most one of a language tag and a datatype.
///
/// The default string formatter is returning an N-Triples, Turtle and SPARQL compatible representation.
///
/// ```
/// use rio_raptor_api::model::{Literal, NamedNode};
///
/// assert_eq!(
///     "\"foo\\nbar\"",
///     Literal::new("foo\nbar", None, None)?.to_string()
/// );
/// assert_eq!(
///     "\"foo\"@en",
///     Literal::new("foo", Some("en"), None)?.to_string()
/// );
/// assert!(Literal::new(
///     "foo",
///     Some("en"),
///     Some(NamedNode::new("http://www.w3.org/2001/XMLSchema#string")?)
/// ).is_err());
/// # Result::<_, rio_raptor_api::ModelError>::Ok(())
/// ```
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub enum Literal {
    /// A [simple literal](https://www.w3.org/TR/rdf11-concepts/#dfn-simple-literal) without datatype or language form.
    Simple {
        /// The [lexical form](https://www.w3.org/TR/rdf11-concepts/#dfn-lexical-form).
        value: String,
    },
    /// A [language-tagged string](https://www.w3.org/TR/rdf11-concepts/#dfn-language-tagged-string)
    LanguageTaggedString {
        /// The [lexical form](https://www.w3.org/TR/rdf11-concepts/#dfn-lexical-form).
        value: String,
        /// The [language tag](https://www.w3.org/TR/rdf11-concepts/#dfn-language-tag).
        language: String,
    },
    /// A literal with an explicit datatype
    Typed {
        /// The [lexical form](https://www.w3.org/TR/rdf11-concepts/#dfn-lexical-form).
        value: String,
        /// The [datatype IRI](https://www.w3.org/TR/rdf11-concepts/#dfn-datatype-iri).
        datatype: NamedNode,
    },
}

impl Literal {
    /// Builds a literal from its parts.
    ///
    /// Fails when both a language tag and a datatype are given, or when the language
    /// tag is not well formed.
    pub fn new(
        value: impl Into<String>,
        language: Option<&str>,
        datatype: Option<NamedNode>,
    ) -> Result<Self, ModelError> {
        let value = value.into();
        match (language, datatype) {
            (Some(language), Some(datatype)) => Err(ModelError {
                kind: ModelErrorKind::LanguageAndDatatype {
                    language: language.to_owned(),
                    datatype: datatype.as_str().to_owned(),
                },
            }),
            (Some(language), None) => Self::new_language_tagged_literal(value, language),
            (None, Some(datatype)) => Ok(Literal::Typed { value, datatype }),
            (None, None) => Ok(Literal::Simple { value }),
        }
    }

    pub fn new_simple_literal(value: impl Into<String>) -> Self {
        Literal::Simple {
            value: value.into(),
        }
    }

    /// Builds a language-tagged string, validating and lowercasing the tag.
    pub fn new_language_tagged_literal(
        value: impl Into<String>,
        language: &str,
    ) -> Result<Self, ModelError> {
        if let Err(error) = LanguageTag::parse(language) {
            return Err(ModelError {
                kind: ModelErrorKind::InvalidLanguageTag {
                    tag: language.to_owned(),
                    error,
                },
            });
        }
        Ok(Literal::LanguageTaggedString {
            value: value.into(),
            language: language.to_ascii_lowercase(),
        })
    }

    pub fn new_typed_literal(value: impl Into<String>, datatype: NamedNode) -> Self {
        Literal::Typed {
            value: value.into(),
            datatype,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Literal::Simple { value }
            | Literal::LanguageTaggedString { value, .. }
            | Literal::Typed { value, .. } => value,
        }
    }

    pub fn language(&self) -> Option<&str> {
        match self {
            Literal::LanguageTaggedString { language, .. } => Some(language),
            _ => None,
        }
    }

    pub fn datatype(&self) -> Option<&NamedNode> {
        match self {
            Literal::Typed { datatype, .. } => Some(datatype),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('"')?;
        escape(self.value()).try_for_each(|c| f.write_char(c))?;
        f.write_char('"')?;
        match self {
            Literal::Simple { .. } => Ok(()),
            Literal::LanguageTaggedString { language, .. } => write!(f, "@{}", language),
            Literal::Typed { datatype, .. } => write!(f, "^^{}", datatype),
        }
    }
}

/// The union of [IRIs](https://www.w3.org/TR/rdf11-concepts/#dfn-iri) and [blank nodes](https://www.w3.org/TR/rdf11-concepts/#dfn-blank-node)
/// allowed in subject position.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub enum Subject {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::NamedNode(node) => node.fmt(f),
            Subject::BlankNode(node) => node.fmt(f),
        }
    }
}

impl From<NamedNode> for Subject {
    fn from(node: NamedNode) -> Self {
        Subject::NamedNode(node)
    }
}

impl From<BlankNode> for Subject {
    fn from(node: BlankNode) -> Self {
        Subject::BlankNode(node)
    }
}

/// An RDF [term](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-term).
///
/// It is the union of [IRIs](https://www.w3.org/TR/rdf11-concepts/#dfn-iri), [blank nodes](https://www.w3.org/TR/rdf11-concepts/#dfn-blank-node) and [literals](https://www.w3.org/TR/rdf11-concepts/#dfn-literal).
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub enum Term {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
    Literal(Literal),
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::NamedNode(node) => node.fmt(f),
            Term::BlankNode(node) => node.fmt(f),
            Term::Literal(literal) => literal.fmt(f),
        }
    }
}

impl From<NamedNode> for Term {
    fn from(node: NamedNode) -> Self {
        Term::NamedNode(node)
    }
}

impl From<BlankNode> for Term {
    fn from(node: BlankNode) -> Self {
        Term::BlankNode(node)
    }
}

impl From<Literal> for Term {
    fn from(literal: Literal) -> Self {
        Term::Literal(literal)
    }
}

impl From<Subject> for Term {
    fn from(resource: Subject) -> Self {
        match resource {
            Subject::NamedNode(node) => Term::NamedNode(node),
            Subject::BlankNode(node) => Term::BlankNode(node),
        }
    }
}

/// The name of the graph a statement belongs to.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub enum GraphName {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
}

impl fmt::Display for GraphName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphName::NamedNode(node) => node.fmt(f),
            GraphName::BlankNode(node) => node.fmt(f),
        }
    }
}

impl From<NamedNode> for GraphName {
    fn from(node: NamedNode) -> Self {
        GraphName::NamedNode(node)
    }
}

impl From<BlankNode> for GraphName {
    fn from(node: BlankNode) -> Self {
        GraphName::BlankNode(node)
    }
}

/// An RDF statement: a [triple](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-triple),
/// optionally in a named graph.
///
/// The default string formatter is returning an N-Triples line, or an N-Quads line
/// when the statement has a graph name.
///
/// ```
/// use rio_raptor_api::model::{Literal, NamedNode, Statement};
///
/// assert_eq!(
///     "<http://e/a> <http://e/b> \"v\"@en .",
///     Statement::new(
///         NamedNode::new("http://e/a")?,
///         NamedNode::new("http://e/b")?,
///         Literal::new("v", Some("en"), None)?,
///     ).to_string()
/// );
/// # Result::<_, rio_raptor_api::ModelError>::Ok(())
/// ```
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub struct Statement {
    pub subject: Subject,
    pub predicate: NamedNode,
    pub object: Term,
    pub graph_name: Option<GraphName>,
}

impl Statement {
    pub fn new(
        subject: impl Into<Subject>,
        predicate: NamedNode,
        object: impl Into<Term>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate,
            object: object.into(),
            graph_name: None,
        }
    }

    pub fn in_graph(mut self, graph_name: impl Into<GraphName>) -> Self {
        self.graph_name = Some(graph_name.into());
        self
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.graph_name {
            Some(graph_name) => write!(
                f,
                "{} {} {} {} .",
                self.subject, self.predicate, self.object, graph_name
            ),
            None => write!(f, "{} {} {} .", self.subject, self.predicate, self.object),
        }
    }
}

fn escape(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(EscapeRDF::new)
}

/// A customized version of EscapeDefault of the Rust standard library
struct EscapeRDF {
    state: EscapeRdfState,
}

enum EscapeRdfState {
    Done,
    Char(char),
    Backslash(char),
}

impl EscapeRDF {
    fn new(c: char) -> Self {
        Self {
            state: match c {
                '\n' => EscapeRdfState::Backslash('n'),
                '\r' => EscapeRdfState::Backslash('r'),
                '"' => EscapeRdfState::Backslash('"'),
                '\\' => EscapeRdfState::Backslash('\\'),
                c => EscapeRdfState::Char(c),
            },
        }
    }
}

impl Iterator for EscapeRDF {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        match self.state {
            EscapeRdfState::Backslash(c) => {
                self.state = EscapeRdfState::Char(c);
                Some('\\')
            }
            EscapeRdfState::Char(c) => {
                self.state = EscapeRdfState::Done;
                Some(c)
            }
            EscapeRdfState::Done => None,
        }
    }
}

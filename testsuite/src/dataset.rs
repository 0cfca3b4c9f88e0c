use rio_raptor::{ParseInput, RaptorError, RaptorParser};
use rio_raptor_api::model::*;
use std::collections::HashSet;
use std::fmt;
use std::iter::FromIterator;

/// A set of statements, blank nodes compared by label.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    inner: HashSet<Statement>,
}

impl Dataset {
    /// Parses a complete document.
    pub fn parse(parser: &RaptorParser, input: impl Into<ParseInput>) -> Result<Self, RaptorError> {
        parser.parse(input)?.collect()
    }

    pub fn insert(&mut self, statement: Statement) {
        self.inner.insert(statement);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Statement> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn contains(&self, statement: &Statement) -> bool {
        self.inner.contains(statement)
    }

    /// Statements where `node` is the subject, the object or the graph name.
    pub fn statements_mentioning<'a>(
        &'a self,
        node: &'a BlankNode,
    ) -> impl Iterator<Item = &'a Statement> + 'a {
        self.inner.iter().filter(move |s| mentions(s, node))
    }

    /// Every blank node label used by the dataset.
    pub fn blank_nodes(&self) -> HashSet<&BlankNode> {
        let mut nodes = HashSet::new();
        for statement in &self.inner {
            if let Subject::BlankNode(node) = &statement.subject {
                nodes.insert(node);
            }
            if let Term::BlankNode(node) = &statement.object {
                nodes.insert(node);
            }
            if let Some(GraphName::BlankNode(node)) = &statement.graph_name {
                nodes.insert(node);
            }
        }
        nodes
    }
}

pub(crate) fn mentions(statement: &Statement, node: &BlankNode) -> bool {
    matches!(&statement.subject, Subject::BlankNode(n) if n == node)
        || matches!(&statement.object, Term::BlankNode(n) if n == node)
        || matches!(&statement.graph_name, Some(GraphName::BlankNode(n)) if n == node)
}

impl IntoIterator for Dataset {
    type Item = Statement;
    type IntoIter = <HashSet<Statement> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl FromIterator<Statement> for Dataset {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        Self {
            inner: HashSet::from_iter(iter),
        }
    }
}

impl Extend<Statement> for Dataset {
    fn extend<I: IntoIterator<Item = Statement>>(&mut self, iter: I) {
        self.inner.extend(iter)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = self.inner.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        lines.sort();
        for line in lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

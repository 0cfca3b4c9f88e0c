use crate::error::RaptorError;
use std::fmt;
use std::str::FromStr;

/// A concrete RDF syntax known to Raptor.
///
/// The names are the ones `rapper -i`/`-o` and `raptor_new_parser` accept.
///
/// ```
/// use rio_raptor::Syntax;
///
/// assert_eq!("rdfxml", Syntax::RdfXml.name());
/// assert_eq!(Syntax::Turtle, "turtle".parse()?);
/// assert!(!Syntax::Dot.can_parse());
/// # Result::<_, rio_raptor::RaptorError>::Ok(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syntax {
    NTriples,
    NQuads,
    Turtle,
    TriG,
    RdfXml,
    /// RDF/XML with nested and typed node elements, write only.
    RdfXmlAbbrev,
    /// RDFa embedded in (X)HTML, read only.
    RdfA,
    /// RDF/JSON resource centric serialization.
    Json,
    /// Graphviz DOT, write only.
    Dot,
}

impl Syntax {
    pub const ALL: [Syntax; 9] = [
        Syntax::NTriples,
        Syntax::NQuads,
        Syntax::Turtle,
        Syntax::TriG,
        Syntax::RdfXml,
        Syntax::RdfXmlAbbrev,
        Syntax::RdfA,
        Syntax::Json,
        Syntax::Dot,
    ];

    /// The engine name of this syntax.
    pub fn name(self) -> &'static str {
        match self {
            Syntax::NTriples => "ntriples",
            Syntax::NQuads => "nquads",
            Syntax::Turtle => "turtle",
            Syntax::TriG => "trig",
            Syntax::RdfXml => "rdfxml",
            Syntax::RdfXmlAbbrev => "rdfxml-abbrev",
            Syntax::RdfA => "rdfa",
            Syntax::Json => "json",
            Syntax::Dot => "dot",
        }
    }

    pub fn can_parse(self) -> bool {
        !matches!(self, Syntax::RdfXmlAbbrev | Syntax::Dot)
    }

    pub fn can_serialize(self) -> bool {
        !matches!(self, Syntax::RdfA)
    }

    /// Whether statements in this syntax may carry a graph name.
    pub fn supports_graphs(self) -> bool {
        matches!(self, Syntax::NQuads | Syntax::TriG)
    }

    /// The line based syntax statements travel in between this crate and `rapper`.
    pub(crate) fn exchange(self) -> Syntax {
        if self.supports_graphs() {
            Syntax::NQuads
        } else {
            Syntax::NTriples
        }
    }

    pub(crate) fn check_parse(self) -> Result<(), RaptorError> {
        if self.can_parse() {
            Ok(())
        } else {
            Err(RaptorError::argument(format!(
                "Raptor cannot parse the {} syntax",
                self
            )))
        }
    }

    pub(crate) fn check_serialize(self) -> Result<(), RaptorError> {
        if self.can_serialize() {
            Ok(())
        } else {
            Err(RaptorError::argument(format!(
                "Raptor cannot serialize to the {} syntax",
                self
            )))
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Syntax {
    type Err = RaptorError;

    fn from_str(name: &str) -> Result<Self, RaptorError> {
        Syntax::ALL
            .iter()
            .copied()
            .find(|syntax| syntax.name() == name)
            .ok_or_else(|| RaptorError::argument(format!("unknown Raptor syntax '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for syntax in Syntax::ALL.iter() {
            assert_eq!(syntax.name().parse::<Syntax>().unwrap(), *syntax);
        }
        assert!("n3-ish".parse::<Syntax>().unwrap_err().is_argument());
    }

    #[test]
    fn quad_syntaxes_exchange_nquads() {
        assert_eq!(Syntax::TriG.exchange(), Syntax::NQuads);
        assert_eq!(Syntax::NQuads.exchange(), Syntax::NQuads);
        assert_eq!(Syntax::RdfXml.exchange(), Syntax::NTriples);
    }

    #[test]
    fn capabilities_are_checked() {
        assert!(Syntax::Dot.check_parse().unwrap_err().is_argument());
        assert!(Syntax::RdfA.check_serialize().unwrap_err().is_argument());
        assert!(Syntax::Turtle.check_parse().is_ok());
    }
}

use oxilangtag::LanguageTagParseError;
use oxiri::IriParseError;
use std::error::Error;
use std::fmt;

/// Error returned when a term is built from invalid parts.
///
/// Every variant describes a value the application handed to a constructor,
/// never a failure of the engine.
#[derive(Debug)]
pub struct ModelError {
    pub(crate) kind: ModelErrorKind,
}

#[derive(Debug)]
pub enum ModelErrorKind {
    InvalidIri {
        iri: String,
        error: IriParseError,
    },
    InvalidLanguageTag {
        tag: String,
        error: LanguageTagParseError,
    },
    LanguageAndDatatype {
        language: String,
        datatype: String,
    },
    InvalidBlankNodeLabel {
        label: String,
    },
}

impl ModelError {
    pub fn kind(&self) -> &ModelErrorKind {
        &self.kind
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ModelErrorKind::InvalidIri { iri, error } => {
                write!(f, "error while parsing IRI '{}': {}", iri, error)
            }
            ModelErrorKind::InvalidLanguageTag { tag, error } => {
                write!(f, "error while parsing language tag '{}': {}", tag, error)
            }
            ModelErrorKind::LanguageAndDatatype { language, datatype } => write!(
                f,
                "a literal cannot have both the language tag '{}' and the datatype <{}>",
                language, datatype
            ),
            ModelErrorKind::InvalidBlankNodeLabel { label } => {
                write!(f, "'{}' is not a valid blank node label", label)
            }
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            ModelErrorKind::InvalidIri { error, .. } => Some(error),
            ModelErrorKind::InvalidLanguageTag { error, .. } => Some(error),
            ModelErrorKind::LanguageAndDatatype { .. }
            | ModelErrorKind::InvalidBlankNodeLabel { .. } => None,
        }
    }
}

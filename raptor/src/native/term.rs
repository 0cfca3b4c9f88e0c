use super::ffi::*;
use super::world::WorldGuard;
use crate::error::RaptorError;
use rio_api::model as rio;
use rio_raptor_api::model::{BlankNode, GraphName, Literal, NamedNode, Subject, Term};
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_uchar, c_void};
use std::path::Path;
use std::ptr::{self, NonNull};
use std::{slice, str};

/// An owned `raptor_uri`, freed when dropped.
///
/// It borrows the world guard so it is always freed while the lock is held.
pub(crate) struct Uri<'g> {
    guard: &'g WorldGuard<'g>,
    ptr: NonNull<raptor_uri>,
}

impl<'g> Uri<'g> {
    pub(crate) fn new(guard: &'g WorldGuard<'g>, iri: &str) -> Result<Self, RaptorError> {
        let string = CString::new(iri)
            .map_err(|_| RaptorError::argument(format!("the IRI '{}' contains a NUL byte", iri)))?;
        // SAFETY: the world is open, the lock is held and the string is NUL terminated.
        let ptr = unsafe {
            (guard.api().new_uri)(guard.world(), string.as_ptr() as *const c_uchar)
        };
        NonNull::new(ptr)
            .map(|ptr| Self { guard, ptr })
            .ok_or_else(|| RaptorError::argument(format!("Raptor rejected the IRI '{}'", iri)))
    }

    /// The `file:` URI of a local file.
    pub(crate) fn from_path(guard: &'g WorldGuard<'g>, path: &Path) -> Result<Self, RaptorError> {
        let name = path
            .to_str()
            .and_then(|name| CString::new(name).ok())
            .ok_or_else(|| {
                RaptorError::argument(format!("unsupported file name {}", path.display()))
            })?;
        let api = guard.api();
        // SAFETY: the returned string is owned by us and released with raptor_free_memory.
        let iri = unsafe {
            let string = (api.uri_filename_to_uri_string)(name.as_ptr());
            if string.is_null() {
                return Err(RaptorError::argument(format!(
                    "cannot build a URI for {}",
                    path.display()
                )));
            }
            let iri = CStr::from_ptr(string as *const c_char)
                .to_string_lossy()
                .into_owned();
            (api.free_memory)(string as *mut c_void);
            iri
        };
        Self::new(guard, &iri)
    }

    pub(crate) fn as_ptr(&self) -> *mut raptor_uri {
        self.ptr.as_ptr()
    }
}

impl Drop for Uri<'_> {
    fn drop(&mut self) {
        // SAFETY: the URI is owned and the lock is held for the lifetime of the guard.
        unsafe { (self.guard.api().free_uri)(self.ptr.as_ptr()) }
    }
}

/// The pointer to pass for an optional URI argument.
pub(crate) fn uri_ptr(uri: &Option<Uri<'_>>) -> *mut raptor_uri {
    uri.as_ref().map_or(ptr::null_mut(), Uri::as_ptr)
}

/// Native terms built for one serializer call, all freed together.
pub(crate) struct TermArena<'g> {
    guard: &'g WorldGuard<'g>,
    terms: Vec<NonNull<raptor_term>>,
}

impl<'g> TermArena<'g> {
    pub(crate) fn new(guard: &'g WorldGuard<'g>) -> Self {
        Self {
            guard,
            terms: Vec::with_capacity(4),
        }
    }

    fn track(&mut self, term: *mut raptor_term, what: &str) -> Result<*mut raptor_term, RaptorError> {
        let term = NonNull::new(term)
            .ok_or_else(|| RaptorError::argument(format!("Raptor rejected the term {}", what)))?;
        self.terms.push(term);
        Ok(term.as_ptr())
    }

    pub(crate) fn named_node(&mut self, node: &NamedNode) -> Result<*mut raptor_term, RaptorError> {
        let iri = node.as_str();
        // SAFETY: the term copies the counted string, the lock is held.
        let term = unsafe {
            (self.guard.api().new_term_from_counted_uri_string)(
                self.guard.world(),
                iri.as_ptr(),
                iri.len(),
            )
        };
        self.track(term, iri)
    }

    pub(crate) fn blank_node(&mut self, node: &BlankNode) -> Result<*mut raptor_term, RaptorError> {
        let label = node.label();
        // SAFETY: the term copies the counted string, the lock is held.
        let term = unsafe {
            (self.guard.api().new_term_from_counted_blank)(
                self.guard.world(),
                label.as_ptr(),
                label.len(),
            )
        };
        self.track(term, &label)
    }

    pub(crate) fn literal(&mut self, literal: &Literal) -> Result<*mut raptor_term, RaptorError> {
        let value = literal.value();
        let datatype = match literal.datatype() {
            Some(datatype) => Some(Uri::new(self.guard, datatype.as_str())?),
            None => None,
        };
        let (language, language_len) = match literal.language() {
            Some(language) => {
                let len = c_uchar::try_from(language.len()).map_err(|_| {
                    RaptorError::argument(format!("the language tag '{}' is too long", language))
                })?;
                (language.as_ptr(), len)
            }
            None => (ptr::null(), 0),
        };
        // SAFETY: the term copies the value, the language and the datatype URI. The
        // URI is released afterwards by its own Drop.
        let term = unsafe {
            (self.guard.api().new_term_from_counted_literal)(
                self.guard.world(),
                value.as_ptr(),
                value.len(),
                uri_ptr(&datatype),
                language,
                language_len,
            )
        };
        self.track(term, &literal.to_string())
    }

    pub(crate) fn subject(&mut self, subject: &Subject) -> Result<*mut raptor_term, RaptorError> {
        match subject {
            Subject::NamedNode(node) => self.named_node(node),
            Subject::BlankNode(node) => self.blank_node(node),
        }
    }

    pub(crate) fn term(&mut self, term: &Term) -> Result<*mut raptor_term, RaptorError> {
        match term {
            Term::NamedNode(node) => self.named_node(node),
            Term::BlankNode(node) => self.blank_node(node),
            Term::Literal(literal) => self.literal(literal),
        }
    }

    pub(crate) fn graph_name(&mut self, graph_name: &GraphName) -> Result<*mut raptor_term, RaptorError> {
        match graph_name {
            GraphName::NamedNode(node) => self.named_node(node),
            GraphName::BlankNode(node) => self.blank_node(node),
        }
    }
}

impl Drop for TermArena<'_> {
    fn drop(&mut self) {
        for term in self.terms.drain(..) {
            // SAFETY: each term was created by this arena and is freed once.
            unsafe { (self.guard.api().free_term)(term.as_ptr()) }
        }
    }
}

/// A statement as the engine delivered it to the statement handler.
///
/// Fields are decoded on access and borrow the engine memory: the value only
/// lives for the duration of the callback it was handed to.
#[derive(Clone, Copy)]
pub struct RawStatement<'a> {
    api: &'a RaptorApi,
    statement: &'a raptor_statement,
}

impl<'a> RawStatement<'a> {
    /// # Safety
    ///
    /// `statement` and all the terms it points to must stay valid for `'a`.
    pub(crate) unsafe fn new(api: &'a RaptorApi, statement: &'a raptor_statement) -> Self {
        Self { api, statement }
    }

    pub fn subject(&self) -> Result<rio::Subject<'a>, RaptorError> {
        match self.decode(self.statement.subject, "subject")? {
            RawTerm::Uri(iri) => Ok(rio::Subject::NamedNode(rio::NamedNode { iri })),
            RawTerm::Blank(id) => Ok(rio::Subject::BlankNode(rio::BlankNode { id })),
            RawTerm::Literal(_) => Err(RaptorError::argument("a literal cannot be a subject")),
        }
    }

    pub fn predicate(&self) -> Result<rio::NamedNode<'a>, RaptorError> {
        match self.decode(self.statement.predicate, "predicate")? {
            RawTerm::Uri(iri) => Ok(rio::NamedNode { iri }),
            _ => Err(RaptorError::argument("a predicate must be an IRI")),
        }
    }

    pub fn object(&self) -> Result<rio::Term<'a>, RaptorError> {
        Ok(match self.decode(self.statement.object, "object")? {
            RawTerm::Uri(iri) => rio::Term::NamedNode(rio::NamedNode { iri }),
            RawTerm::Blank(id) => rio::Term::BlankNode(rio::BlankNode { id }),
            RawTerm::Literal(literal) => rio::Term::Literal(literal),
        })
    }

    pub fn graph_name(&self) -> Result<Option<rio::GraphName<'a>>, RaptorError> {
        if self.statement.graph.is_null() {
            return Ok(None);
        }
        match self.decode(self.statement.graph, "graph")? {
            RawTerm::Uri(iri) => Ok(Some(rio::GraphName::NamedNode(rio::NamedNode { iri }))),
            RawTerm::Blank(id) => Ok(Some(rio::GraphName::BlankNode(rio::BlankNode { id }))),
            RawTerm::Literal(_) => Err(RaptorError::argument("a literal cannot be a graph name")),
        }
    }

    fn decode(&self, term: *mut raptor_term, position: &str) -> Result<RawTerm<'a>, RaptorError> {
        // SAFETY: the terms of the statement live as long as the statement, see `new`.
        let term = unsafe { term.as_ref() }
            .ok_or_else(|| RaptorError::argument(format!("the statement has no {}", position)))?;
        unsafe { decode_term(self.api, term) }
    }
}

#[derive(Debug)]
enum RawTerm<'a> {
    Uri(&'a str),
    Blank(&'a str),
    Literal(rio::Literal<'a>),
}

unsafe fn counted_str<'a>(ptr: *const c_uchar, len: usize) -> Result<&'a str, RaptorError> {
    if ptr.is_null() {
        return Ok("");
    }
    str::from_utf8(slice::from_raw_parts(ptr, len))
        .map_err(|e| RaptorError::parse(format!("Raptor returned invalid UTF-8: {}", e), None, None))
}

unsafe fn uri_str<'a>(api: &RaptorApi, uri: *mut raptor_uri) -> Result<&'a str, RaptorError> {
    if uri.is_null() {
        return Err(RaptorError::argument("Raptor returned a null URI"));
    }
    let mut len = 0;
    let ptr = (api.uri_as_counted_string)(uri, &mut len);
    counted_str(ptr, len)
}

/// Decodes a tagged native term into borrowed strings.
///
/// # Safety
///
/// The term and the memory it points to must stay valid for `'a`.
unsafe fn decode_term<'a>(api: &RaptorApi, term: &'a raptor_term) -> Result<RawTerm<'a>, RaptorError> {
    decode_term_with(term, |uri| uri_str(api, uri))
}

/// Same as `decode_term`, `resolve` turning the URIs of the term into strings.
unsafe fn decode_term_with<'a>(
    term: &'a raptor_term,
    resolve: impl Fn(*mut raptor_uri) -> Result<&'a str, RaptorError>,
) -> Result<RawTerm<'a>, RaptorError> {
    match term.type_ {
        RAPTOR_TERM_TYPE_URI => Ok(RawTerm::Uri(resolve(term.value.uri)?)),
        RAPTOR_TERM_TYPE_BLANK => {
            let blank = term.value.blank;
            Ok(RawTerm::Blank(counted_str(blank.string, blank.string_len as usize)?))
        }
        RAPTOR_TERM_TYPE_LITERAL => {
            let literal = term.value.literal;
            let value = counted_str(literal.string, literal.string_len as usize)?;
            Ok(RawTerm::Literal(match literal_shape(&literal, value)? {
                LiteralShape::Simple => rio::Literal::Simple { value },
                LiteralShape::LanguageTagged => rio::Literal::LanguageTaggedString {
                    value,
                    language: counted_str(literal.language, usize::from(literal.language_len))?,
                },
                LiteralShape::Typed => rio::Literal::Typed {
                    value,
                    datatype: rio::NamedNode {
                        iri: resolve(literal.datatype)?,
                    },
                },
            }))
        }
        other => Err(RaptorError::argument(format!(
            "Raptor returned a term of unknown type {}",
            other
        ))),
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum LiteralShape {
    Simple,
    LanguageTagged,
    Typed,
}

/// Which kind of literal the engine handed over, failing if it carries both a
/// language tag and a datatype.
fn literal_shape(literal: &raptor_term_literal_value, value: &str) -> Result<LiteralShape, RaptorError> {
    let has_language = !literal.language.is_null() && literal.language_len > 0;
    match (has_language, literal.datatype.is_null()) {
        (true, false) => Err(RaptorError::argument(format!(
            "Raptor returned the literal \"{}\" with both a language tag and a datatype",
            value
        ))),
        (true, true) => Ok(LiteralShape::LanguageTagged),
        (false, false) => Ok(LiteralShape::Typed),
        (false, true) => Ok(LiteralShape::Simple),
    }
}

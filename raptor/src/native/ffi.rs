//! Raptor 2 C ABI: struct layouts and the table of entry points resolved at runtime.
#![allow(non_camel_case_types)]

use libloading::Library;
use std::os::raw::{c_char, c_int, c_uchar, c_uint, c_void};

pub(crate) enum raptor_world {}
pub(crate) enum raptor_uri {}
pub(crate) enum raptor_parser {}
pub(crate) enum raptor_serializer {}
pub(crate) enum raptor_iostream {}
pub(crate) enum raptor_namespace {}

pub(crate) const RAPTOR_TERM_TYPE_URI: c_int = 1;
pub(crate) const RAPTOR_TERM_TYPE_LITERAL: c_int = 2;
pub(crate) const RAPTOR_TERM_TYPE_BLANK: c_int = 4;

pub(crate) const RAPTOR_LOG_LEVEL_WARN: c_int = 4;
pub(crate) const RAPTOR_LOG_LEVEL_ERROR: c_int = 5;
pub(crate) const RAPTOR_LOG_LEVEL_FATAL: c_int = 6;

#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct raptor_term_literal_value {
    pub string: *mut c_uchar,
    pub string_len: c_uint,
    pub datatype: *mut raptor_uri,
    pub language: *mut c_uchar,
    pub language_len: c_uchar,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct raptor_term_blank_value {
    pub string: *mut c_uchar,
    pub string_len: c_uint,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) union raptor_term_value {
    pub uri: *mut raptor_uri,
    pub literal: raptor_term_literal_value,
    pub blank: raptor_term_blank_value,
}

#[repr(C)]
pub(crate) struct raptor_term {
    pub world: *mut raptor_world,
    pub usage: c_int,
    pub type_: c_int,
    pub value: raptor_term_value,
}

#[repr(C)]
pub(crate) struct raptor_statement {
    pub world: *mut raptor_world,
    pub usage: c_int,
    pub subject: *mut raptor_term,
    pub predicate: *mut raptor_term,
    pub object: *mut raptor_term,
    pub graph: *mut raptor_term,
}

#[repr(C)]
pub(crate) struct raptor_locator {
    pub uri: *mut raptor_uri,
    pub file: *const c_char,
    pub line: c_int,
    pub column: c_int,
    pub byte: c_int,
}

#[repr(C)]
pub(crate) struct raptor_log_message {
    pub code: c_int,
    pub domain: c_int,
    pub level: c_int,
    pub locator: *mut raptor_locator,
    pub text: *const c_char,
}

pub(crate) type raptor_statement_handler =
    Option<unsafe extern "C" fn(user_data: *mut c_void, statement: *mut raptor_statement)>;
pub(crate) type raptor_namespace_handler =
    Option<unsafe extern "C" fn(user_data: *mut c_void, nspace: *mut raptor_namespace)>;
pub(crate) type raptor_log_handler =
    Option<unsafe extern "C" fn(user_data: *mut c_void, message: *mut raptor_log_message)>;

#[repr(C)]
pub(crate) struct raptor_iostream_handler {
    pub version: c_int,
    pub init: Option<unsafe extern "C" fn(context: *mut c_void) -> c_int>,
    pub finish: Option<unsafe extern "C" fn(context: *mut c_void)>,
    pub write_byte: Option<unsafe extern "C" fn(context: *mut c_void, byte: c_int) -> c_int>,
    pub write_bytes: Option<
        unsafe extern "C" fn(context: *mut c_void, ptr: *const c_void, size: usize, nmemb: usize) -> c_int,
    >,
    pub write_end: Option<unsafe extern "C" fn(context: *mut c_void) -> c_int>,
    pub read_bytes: Option<
        unsafe extern "C" fn(context: *mut c_void, ptr: *mut c_void, size: usize, nmemb: usize) -> c_int,
    >,
    pub read_eof: Option<unsafe extern "C" fn(context: *mut c_void) -> c_int>,
}

/// Entry points of a loaded `libraptor2`.
///
/// The pointers are only valid while `library` is loaded, which is why they live
/// in the same struct and are never handed out separately.
pub(crate) struct RaptorApi {
    pub new_world_internal: unsafe extern "C" fn(version_decimal: c_uint) -> *mut raptor_world,
    pub world_open: unsafe extern "C" fn(world: *mut raptor_world) -> c_int,
    pub world_set_log_handler: unsafe extern "C" fn(
        world: *mut raptor_world,
        user_data: *mut c_void,
        handler: raptor_log_handler,
    ) -> c_int,
    pub world_is_parser_name:
        unsafe extern "C" fn(world: *mut raptor_world, name: *const c_char) -> c_int,
    pub world_is_serializer_name:
        unsafe extern "C" fn(world: *mut raptor_world, name: *const c_char) -> c_int,
    pub new_uri:
        unsafe extern "C" fn(world: *mut raptor_world, uri_string: *const c_uchar) -> *mut raptor_uri,
    pub uri_as_counted_string:
        unsafe extern "C" fn(uri: *mut raptor_uri, len_p: *mut usize) -> *mut c_uchar,
    pub free_uri: unsafe extern "C" fn(uri: *mut raptor_uri),
    pub uri_filename_to_uri_string: unsafe extern "C" fn(filename: *const c_char) -> *mut c_uchar,
    pub free_memory: unsafe extern "C" fn(ptr: *mut c_void),
    pub new_term_from_counted_uri_string: unsafe extern "C" fn(
        world: *mut raptor_world,
        uri_string: *const c_uchar,
        length: usize,
    ) -> *mut raptor_term,
    pub new_term_from_counted_literal: unsafe extern "C" fn(
        world: *mut raptor_world,
        literal: *const c_uchar,
        literal_len: usize,
        datatype: *mut raptor_uri,
        language: *const c_uchar,
        language_len: c_uchar,
    ) -> *mut raptor_term,
    pub new_term_from_counted_blank: unsafe extern "C" fn(
        world: *mut raptor_world,
        blank: *const c_uchar,
        length: usize,
    ) -> *mut raptor_term,
    pub free_term: unsafe extern "C" fn(term: *mut raptor_term),
    pub statement_init:
        unsafe extern "C" fn(statement: *mut raptor_statement, world: *mut raptor_world),
    pub new_parser:
        unsafe extern "C" fn(world: *mut raptor_world, name: *const c_char) -> *mut raptor_parser,
    pub parser_set_statement_handler: unsafe extern "C" fn(
        parser: *mut raptor_parser,
        user_data: *mut c_void,
        handler: raptor_statement_handler,
    ),
    pub parser_set_namespace_handler: unsafe extern "C" fn(
        parser: *mut raptor_parser,
        user_data: *mut c_void,
        handler: raptor_namespace_handler,
    ),
    pub parser_parse_start:
        unsafe extern "C" fn(parser: *mut raptor_parser, uri: *mut raptor_uri) -> c_int,
    pub parser_parse_chunk: unsafe extern "C" fn(
        parser: *mut raptor_parser,
        buffer: *const c_uchar,
        len: usize,
        is_end: c_int,
    ) -> c_int,
    pub parser_parse_uri: unsafe extern "C" fn(
        parser: *mut raptor_parser,
        uri: *mut raptor_uri,
        base_uri: *mut raptor_uri,
    ) -> c_int,
    pub parser_parse_file: unsafe extern "C" fn(
        parser: *mut raptor_parser,
        uri: *mut raptor_uri,
        base_uri: *mut raptor_uri,
    ) -> c_int,
    pub parser_parse_iostream: unsafe extern "C" fn(
        parser: *mut raptor_parser,
        iostream: *mut raptor_iostream,
        base_uri: *mut raptor_uri,
    ) -> c_int,
    pub parser_parse_abort: unsafe extern "C" fn(parser: *mut raptor_parser),
    pub free_parser: unsafe extern "C" fn(parser: *mut raptor_parser),
    pub new_serializer: unsafe extern "C" fn(
        world: *mut raptor_world,
        name: *const c_char,
    ) -> *mut raptor_serializer,
    pub serializer_start_to_iostream: unsafe extern "C" fn(
        serializer: *mut raptor_serializer,
        uri: *mut raptor_uri,
        iostream: *mut raptor_iostream,
    ) -> c_int,
    pub serializer_set_namespace: unsafe extern "C" fn(
        serializer: *mut raptor_serializer,
        uri: *mut raptor_uri,
        prefix: *const c_uchar,
    ) -> c_int,
    pub serializer_serialize_statement: unsafe extern "C" fn(
        serializer: *mut raptor_serializer,
        statement: *mut raptor_statement,
    ) -> c_int,
    pub serializer_flush: unsafe extern "C" fn(serializer: *mut raptor_serializer) -> c_int,
    pub serializer_serialize_end: unsafe extern "C" fn(serializer: *mut raptor_serializer) -> c_int,
    pub free_serializer: unsafe extern "C" fn(serializer: *mut raptor_serializer),
    pub new_iostream_from_handler: unsafe extern "C" fn(
        world: *mut raptor_world,
        user_data: *mut c_void,
        handler: *const raptor_iostream_handler,
    ) -> *mut raptor_iostream,
    pub free_iostream: unsafe extern "C" fn(iostream: *mut raptor_iostream),
    pub namespace_get_uri: unsafe extern "C" fn(nspace: *const raptor_namespace) -> *mut raptor_uri,
    pub namespace_get_counted_prefix:
        unsafe extern "C" fn(nspace: *const raptor_namespace, length_p: *mut usize) -> *const c_uchar,
    pub version_string: *const *const c_char,
    pub version_decimal: *const c_uint,
    _library: Library,
}

/// Copies a symbol out of `library`.
///
/// # Safety
///
/// `T` must be the exact type of the symbol: a function pointer with the C
/// signature, or a pointer to the data for data symbols.
unsafe fn symbol<T: Copy>(library: &Library, name: &[u8]) -> Result<T, libloading::Error> {
    Ok(*library.get::<T>(name)?)
}

impl RaptorApi {
    /// Resolves every entry point this crate uses.
    ///
    /// # Safety
    ///
    /// `library` must be a Raptor 2 build, whose symbols have the signatures declared above.
    pub(crate) unsafe fn load(library: Library) -> Result<Self, libloading::Error> {
        Ok(Self {
            new_world_internal: symbol(&library, b"raptor_new_world_internal\0")?,
            world_open: symbol(&library, b"raptor_world_open\0")?,
            world_set_log_handler: symbol(&library, b"raptor_world_set_log_handler\0")?,
            world_is_parser_name: symbol(&library, b"raptor_world_is_parser_name\0")?,
            world_is_serializer_name: symbol(&library, b"raptor_world_is_serializer_name\0")?,
            new_uri: symbol(&library, b"raptor_new_uri\0")?,
            uri_as_counted_string: symbol(&library, b"raptor_uri_as_counted_string\0")?,
            free_uri: symbol(&library, b"raptor_free_uri\0")?,
            uri_filename_to_uri_string: symbol(&library, b"raptor_uri_filename_to_uri_string\0")?,
            free_memory: symbol(&library, b"raptor_free_memory\0")?,
            new_term_from_counted_uri_string: symbol(
                &library,
                b"raptor_new_term_from_counted_uri_string\0",
            )?,
            new_term_from_counted_literal: symbol(
                &library,
                b"raptor_new_term_from_counted_literal\0",
            )?,
            new_term_from_counted_blank: symbol(&library, b"raptor_new_term_from_counted_blank\0")?,
            free_term: symbol(&library, b"raptor_free_term\0")?,
            statement_init: symbol(&library, b"raptor_statement_init\0")?,
            new_parser: symbol(&library, b"raptor_new_parser\0")?,
            parser_set_statement_handler: symbol(
                &library,
                b"raptor_parser_set_statement_handler\0",
            )?,
            parser_set_namespace_handler: symbol(
                &library,
                b"raptor_parser_set_namespace_handler\0",
            )?,
            parser_parse_start: symbol(&library, b"raptor_parser_parse_start\0")?,
            parser_parse_chunk: symbol(&library, b"raptor_parser_parse_chunk\0")?,
            parser_parse_uri: symbol(&library, b"raptor_parser_parse_uri\0")?,
            parser_parse_file: symbol(&library, b"raptor_parser_parse_file\0")?,
            parser_parse_iostream: symbol(&library, b"raptor_parser_parse_iostream\0")?,
            parser_parse_abort: symbol(&library, b"raptor_parser_parse_abort\0")?,
            free_parser: symbol(&library, b"raptor_free_parser\0")?,
            new_serializer: symbol(&library, b"raptor_new_serializer\0")?,
            serializer_start_to_iostream: symbol(
                &library,
                b"raptor_serializer_start_to_iostream\0",
            )?,
            serializer_set_namespace: symbol(&library, b"raptor_serializer_set_namespace\0")?,
            serializer_serialize_statement: symbol(
                &library,
                b"raptor_serializer_serialize_statement\0",
            )?,
            serializer_flush: symbol(&library, b"raptor_serializer_flush\0")?,
            serializer_serialize_end: symbol(&library, b"raptor_serializer_serialize_end\0")?,
            free_serializer: symbol(&library, b"raptor_free_serializer\0")?,
            new_iostream_from_handler: symbol(&library, b"raptor_new_iostream_from_handler\0")?,
            free_iostream: symbol(&library, b"raptor_free_iostream\0")?,
            namespace_get_uri: symbol(&library, b"raptor_namespace_get_uri\0")?,
            namespace_get_counted_prefix: symbol(
                &library,
                b"raptor_namespace_get_counted_prefix\0",
            )?,
            version_string: symbol(&library, b"raptor_version_string\0")?,
            version_decimal: symbol(&library, b"raptor_version_decimal\0")?,
            _library: library,
        })
    }
}

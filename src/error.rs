/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::error::Error;
use std::fmt::Display;

use crate::handler::HandlerError;
use crate::source::Position;

/// Category of an [XmlError].
///
/// Every error aborts the parse. The kind tells which construct was
/// malformed, the [position](XmlError::position) tells where it started.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// Input ended in the middle of a construct.
    UnexpectedEndOfInput,
    /// A character is not allowed at this point.
    InvalidCharacter,
    /// The byte stream is not valid in its encoding.
    InvalidEncoding,
    /// The encoding is unknown, or contradicts the detected byte layout.
    UnsupportedEncoding,
    MalformedXmlDeclaration,
    MalformedDocType,
    MalformedEntityDeclaration,
    MalformedElementDeclaration,
    MalformedAttributeDeclaration,
    MalformedNotationDeclaration,
    MalformedComment,
    MalformedProcessingInstruction,
    MalformedCDataSection,
    /// Document structure is broken: duplicate or misplaced DOCTYPE,
    /// mismatched end tag, unbound namespace prefix and similar.
    StructuralError,
    /// Bad numeric character reference.
    MalformedNumber,
    /// The underlying byte source failed.
    Io,
    /// A SYSTEM identifier cannot be used as a URL.
    MalformedUrl,
    /// A handler callback returned an error.
    HandlerAbort,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnexpectedEndOfInput => "unexpected end of input",
            ErrorKind::InvalidCharacter => "invalid character",
            ErrorKind::InvalidEncoding => "invalid encoding",
            ErrorKind::UnsupportedEncoding => "unsupported encoding",
            ErrorKind::MalformedXmlDeclaration => "malformed xml declaration",
            ErrorKind::MalformedDocType => "malformed document type declaration",
            ErrorKind::MalformedEntityDeclaration => "malformed entity declaration",
            ErrorKind::MalformedElementDeclaration => "malformed element declaration",
            ErrorKind::MalformedAttributeDeclaration => "malformed attribute declaration",
            ErrorKind::MalformedNotationDeclaration => "malformed notation declaration",
            ErrorKind::MalformedComment => "malformed comment",
            ErrorKind::MalformedProcessingInstruction => "malformed processing instruction",
            ErrorKind::MalformedCDataSection => "malformed cdata section",
            ErrorKind::StructuralError => "structural error",
            ErrorKind::MalformedNumber => "malformed character reference",
            ErrorKind::Io => "i/o error",
            ErrorKind::MalformedUrl => "malformed url",
            ErrorKind::HandlerAbort => "aborted by handler",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error which aborted the parse.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct XmlError {
    kind: ErrorKind,
    position: Position,
    message: String,
    system_id: Option<String>,
}

impl XmlError {
    pub fn new(kind: ErrorKind, position: Position, message: impl Into<String>) -> Self {
        XmlError {
            kind,
            position,
            message: message.into(),
            system_id: None,
        }
    }

    pub(crate) fn io(position: Position, err: &std::io::Error) -> Self {
        XmlError::new(ErrorKind::Io, position, err.to_string())
    }

    pub(crate) fn with_system_id(mut self, system_id: Option<&str>) -> Self {
        if self.system_id.is_none() {
            self.system_id = system_id.map(str::to_string);
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Start of the malformed construct.
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Identifier of the entity or external subset the error is in.
    ///
    /// `None` means the document entity, unless the document itself was
    /// given a system identifier in the configuration.
    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    pub(crate) fn from_handler(position: Position, err: HandlerError) -> Self {
        XmlError::new(ErrorKind::HandlerAbort, position, err.to_string())
    }
}

impl Display for XmlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(id) = &self.system_id {
            write!(f, "{}: ", id)?;
        }
        write!(f, "{}: {} ({})", self.position, self.message, self.kind)
    }
}

impl Error for XmlError {}

pub type Result<T> = std::result::Result<T, XmlError>;

pub(crate) mod description {
    pub(crate) const EOF_IN_MARKUP: &str = "input ended inside markup";
    pub(crate) const EOF_IN_COMMENT: &str = "comment is not terminated";
    pub(crate) const EOF_IN_PI: &str = "processing instruction is not terminated";
    pub(crate) const EOF_IN_CDATA: &str = "cdata section is not terminated";
    pub(crate) const EOF_IN_ELEMENT: &str = "element is not closed before the end of input";
    pub(crate) const EOF_IN_ATTRIBUTE: &str = "attribute value is not terminated";
    pub(crate) const EOF_IN_DOCTYPE: &str = "document type declaration is not terminated";
    pub(crate) const EOF_IN_DECLARATION: &str = "markup declaration is not terminated";
    pub(crate) const EOF_IN_LITERAL: &str = "quoted literal is not terminated";
    pub(crate) const EOF_IN_REFERENCE: &str = "reference is not terminated";
    pub(crate) const NO_ROOT: &str = "document has no root element";

    pub(crate) const CHAR_INVALID: &str = "character is not allowed in XML";
    pub(crate) const CHAR_CDATA_END: &str = "']]>' is not allowed in character data";
    pub(crate) const CHAR_LT_IN_VALUE: &str = "'<' is not allowed in attribute values";
    pub(crate) const NAME_EXPECTED: &str = "a name was expected";
    pub(crate) const WHITESPACE_EXPECTED: &str = "whitespace was expected";
    pub(crate) const QUOTE_EXPECTED: &str = "a quoted value was expected";
    pub(crate) const EQ_EXPECTED: &str = "'=' was expected after the attribute name";
    pub(crate) const TAG_END_EXPECTED: &str = "'>' or '/>' was expected";
    pub(crate) const END_TAG_END_EXPECTED: &str = "'>' was expected to close the end tag";
    pub(crate) const CONTENT_AFTER_ROOT: &str = "character data is not allowed outside of the root element";
    pub(crate) const MARKUP_UNRECOGNIZED: &str =
        "markup is not a comment, cdata section or document type declaration";

    pub(crate) const XML_DECL_BAD_START: &str = "xml declaration must start with '<?xml'";
    pub(crate) const XML_DECL_NOT_FIRST: &str = "xml declaration is only allowed at the start of the input";
    pub(crate) const XML_DECL_NO_VERSION: &str = "xml declaration has no version";
    pub(crate) const XML_DECL_BAD_VERSION: &str = "xml version must be \"1.0\" or \"1.1\"";
    pub(crate) const XML_DECL_BAD_STANDALONE: &str = "standalone must be \"yes\" or \"no\"";
    pub(crate) const XML_DECL_BAD_ENCODING: &str = "encoding name is not valid";
    pub(crate) const XML_DECL_DUPLICATE: &str = "pseudo-attribute appears more than once";
    pub(crate) const XML_DECL_UNKNOWN: &str = "unknown pseudo-attribute";
    pub(crate) const XML_DECL_NO_END: &str = "xml declaration must end with '?>'";
    pub(crate) const TEXT_DECL_NO_ENCODING: &str = "text declaration must have an encoding";
    pub(crate) const TEXT_DECL_STANDALONE: &str = "text declaration cannot have standalone";

    pub(crate) const ENCODING_UNKNOWN: &str = "encoding is not supported";
    pub(crate) const ENCODING_WIDTH_MISMATCH: &str =
        "declared encoding does not match the byte layout of the input";
    pub(crate) const ENCODING_INVALID_BYTES: &str =
        "byte sequence is not valid for the encoding of the input";
    pub(crate) const ENCODING_TRUNCATED: &str = "input ends inside an encoded character";

    pub(crate) const COMMENT_DOUBLE_DASH: &str = "'--' is not allowed inside a comment";
    pub(crate) const PI_RESERVED_TARGET: &str = "processing instruction target cannot be 'xml'";
    pub(crate) const PI_BAD_TARGET_END: &str =
        "whitespace or '?>' must follow the processing instruction target";
    pub(crate) const CDATA_OUTSIDE_ROOT: &str = "cdata sections are not allowed outside of the root element";

    pub(crate) const DOCTYPE_DUPLICATE: &str = "document has more than one document type declaration";
    pub(crate) const DOCTYPE_AFTER_ROOT: &str = "document type declaration must precede the root element";
    pub(crate) const DOCTYPE_BAD_START: &str = "document type declaration must start with '<!DOCTYPE'";
    pub(crate) const DOCTYPE_BAD_EXTERNAL_ID: &str = "SYSTEM or PUBLIC was expected";
    pub(crate) const DOCTYPE_NO_END: &str = "'>' was expected to close the document type declaration";
    pub(crate) const DTD_UNEXPECTED: &str = "only markup declarations, comments and whitespace are allowed in a DTD";
    pub(crate) const DTD_PE_RECURSION: &str = "parameter entity references itself";
    pub(crate) const DTD_PE_DEPTH: &str = "parameter entities are nested too deeply";
    pub(crate) const DTD_CONDITIONAL: &str = "conditional section must be INCLUDE or IGNORE";
    pub(crate) const DTD_CONDITIONAL_END: &str = "conditional section is not terminated";
    pub(crate) const DTD_BAD_PUBID: &str = "public identifier contains an illegal character";
    pub(crate) const DECL_END_EXPECTED: &str = "'>' was expected to close the declaration";

    pub(crate) const ENTITY_BAD_VALUE: &str = "entity value or external identifier was expected";
    pub(crate) const ENTITY_NDATA_PARAMETER: &str = "parameter entities cannot be unparsed";
    pub(crate) const ELEMENT_BAD_CONTENT: &str = "EMPTY, ANY or a content model was expected";
    pub(crate) const ELEMENT_MIXED_CONJUNCTION: &str = "',' and '|' cannot be mixed in one group";
    pub(crate) const ELEMENT_PCDATA_POSITION: &str =
        "#PCDATA is only allowed first in the outermost group";
    pub(crate) const ELEMENT_PCDATA_SEQUENCE: &str = "#PCDATA can only be combined with '|'";
    pub(crate) const ELEMENT_MIXED_STAR: &str = "mixed content with element names must end with ')*'";
    pub(crate) const ELEMENT_MIXED_MULTIPLICITY: &str =
        "element names in mixed content cannot have a multiplicity";
    pub(crate) const ELEMENT_EMPTY_GROUP: &str = "content model group is empty";
    pub(crate) const ELEMENT_GROUP_END: &str = "',', '|' or ')' was expected";
    pub(crate) const ATTRIBUTE_BAD_TYPE: &str = "attribute type was expected";
    pub(crate) const ATTRIBUTE_BAD_DEFAULT: &str =
        "#REQUIRED, #IMPLIED, #FIXED or a default value was expected";
    pub(crate) const ATTRIBUTE_BAD_ENUMERATION: &str = "enumeration must be '(' name ('|' name)* ')'";
    pub(crate) const NOTATION_BAD_ID: &str = "notation needs a SYSTEM or PUBLIC identifier";

    pub(crate) const TAG_MISMATCH: &str = "end tag does not match the start tag";
    pub(crate) const TAG_OUTSIDE_ENTITY: &str = "element must start and end in the same entity";
    pub(crate) const ROOT_DUPLICATE: &str = "document has more than one root element";
    pub(crate) const ATTRIBUTE_DUPLICATE: &str = "attribute appears more than once in the tag";
    pub(crate) const PREFIX_UNBOUND: &str = "namespace prefix is not bound to a URI";
    pub(crate) const PREFIX_EMPTY_URI: &str = "namespace prefix cannot be bound to an empty URI";
    pub(crate) const PREFIX_RESERVED: &str = "reserved namespace prefix or URI is misused";
    pub(crate) const PREFIX_BAD_QNAME: &str = "name is not a valid qualified name";
    pub(crate) const ENTITY_RECURSION: &str = "entity references itself";
    pub(crate) const ENTITY_DEPTH: &str = "entities are nested too deeply";
    pub(crate) const ENTITY_UNPARSED: &str = "unparsed entity cannot be referenced in content";
    pub(crate) const ENTITY_EXTERNAL_IN_VALUE: &str =
        "external entity cannot be referenced in an attribute value";

    pub(crate) const REFERENCE_BAD_DECIMAL: &str = "non digit in decimal character reference";
    pub(crate) const REFERENCE_BAD_HEX: &str = "non hex digit in hexadecimal character reference";
    pub(crate) const REFERENCE_BAD_CHAR: &str = "character reference is not a valid XML character";
    pub(crate) const REFERENCE_NO_NAME: &str = "reference has no name";
    pub(crate) const REFERENCE_NO_SEMICOLON: &str = "reference must end with ';'";

    pub(crate) const URL_FRAGMENT: &str = "system identifier cannot have a fragment";
    pub(crate) const URL_BAD_CHAR: &str = "system identifier contains an illegal character";
    pub(crate) const URL_EMPTY: &str = "system identifier is empty";
    pub(crate) const RESOLVER_MISSING: &str = "no resolver is available for external resources";
}

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
use std::io::Read;

use crate::dtd::{AttributeDecl, ElementDecl, Entity, Notation};
use crate::error::{XmlError, description};

/// An element or attribute name.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct QName {
    /// The name as written in the document, e.g. `svg:rect`.
    pub name: String,
    pub prefix: Option<String>,
    pub local_name: String,
    /// Bound namespace, `None` if there is none or namespaces are disabled.
    pub namespace_uri: Option<String>,
}

impl QName {
    /// Name without namespace information.
    pub fn plain(name: &str) -> Self {
        QName {
            name: name.to_string(),
            prefix: None,
            local_name: name.to_string(),
            namespace_uri: None,
        }
    }
}

impl Display for QName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attribute {
    pub name: QName,
    /// Value with references replaced and whitespace normalised.
    pub value: String,
    /// False for values added from a DTD default.
    pub specified: bool,
}

/// A notification from the parser, in document order.
#[derive(Debug, Eq, PartialEq)]
pub enum SaxEvent<'a> {
    BeginDocument,
    EndDocument,
    BeginElement {
        name: &'a QName,
        attributes: &'a [Attribute],
    },
    EndElement {
        name: &'a QName,
    },
    /// Sent before the element declaring the prefix begins.
    BeginPrefixMapping {
        prefix: &'a str,
        uri: &'a str,
    },
    /// Sent after the element declaring the prefix ends.
    EndPrefixMapping {
        prefix: &'a str,
    },
    /// Character data.
    ///
    /// Adjacent text, including text coming from entity references, is
    /// delivered as a single event.
    Text(&'a str),
    CDataSection(&'a str),
    Comment(&'a str),
    ProcessingInstruction {
        target: &'a str,
        data: &'a str,
    },
    InternalEntityDecl {
        name: &'a str,
        value: &'a str,
        parameter: bool,
    },
    ExternalEntityDecl {
        name: &'a str,
        public_id: Option<&'a str>,
        system_id: &'a str,
        parameter: bool,
    },
    UnparsedEntityDecl {
        name: &'a str,
        public_id: Option<&'a str>,
        system_id: &'a str,
        notation: &'a str,
    },
    NotationDecl(&'a Notation),
    ElementDecl(&'a ElementDecl),
    AttributeDecl(&'a AttributeDecl),
}

/// Error returned from a handler to stop the parse.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        HandlerError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for HandlerError {}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        HandlerError::new(err.to_string())
    }
}

/// Receiver of parser events.
///
/// Only [handle_event](SaxHandler::handle_event) is required. External
/// resources are only available when
/// [resolve_entity](SaxHandler::resolve_entity) is implemented.
pub trait SaxHandler {
    fn handle_event(&mut self, event: &SaxEvent) -> Result<(), HandlerError>;

    /// Opens an external entity or DTD subset.
    ///
    /// `system_id` is already resolved against the identifier of the
    /// source containing the reference.
    fn resolve_entity(
        &mut self,
        _public_id: Option<&str>,
        _system_id: &str,
    ) -> Result<Box<dyn Read>, HandlerError> {
        Err(HandlerError::new(description::RESOLVER_MISSING))
    }

    /// Supplies a parameter entity ahead of the DTD declarations.
    fn parameter_entity(&mut self, _name: &str) -> Option<Entity> {
        None
    }

    /// Sees every error once, right before the parse returns it.
    fn handle_error(&mut self, _error: &XmlError) {}
}

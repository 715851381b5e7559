/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

//! Streaming XML 1.0/1.1 parser.
//!
//! The parser detects the encoding of its input, checks well-formedness,
//! resolves namespaces, and reports the document to a [SaxHandler] one
//! event at a time. Document type declarations are processed as well:
//! parameter entities are substituted, conditional sections are honoured,
//! and the declared entities, notations, element content models and
//! attribute lists end up in a [DeclarationRegistry].

mod macros;

mod chars;
mod config;
mod dtd;
mod encoding;
mod error;
mod handler;
mod namespace;
mod parser;
mod source;
mod uri;

pub use config::ParserConfig;

pub use error::ErrorKind;
pub use error::Result;
pub use error::XmlError;

pub use handler::Attribute;
pub use handler::HandlerError;
pub use handler::QName;
pub use handler::SaxEvent;
pub use handler::SaxHandler;

pub use parser::ParseSession;
pub use parser::XmlParser;

pub use source::DEFAULT_TAB_WIDTH;
pub use source::ParseProgress;
pub use source::Position;

pub use encoding::Detected;
pub use encoding::Encoding;
pub use encoding::XmlDeclaration;
pub use encoding::detect;

pub use namespace::NS_XML_PREFIX;
pub use namespace::NS_XML_URI;
pub use namespace::NS_XMLNS_PREFIX;
pub use namespace::NS_XMLNS_URI;

pub use dtd::AttributeDecl;
pub use dtd::AttributeType;
pub use dtd::Conjunction;
pub use dtd::ContentSpec;
pub use dtd::DeclarationRegistry;
pub use dtd::DefaultKind;
pub use dtd::ElementDecl;
pub use dtd::Entity;
pub use dtd::EntityKind;
pub use dtd::EntityOrigin;
pub use dtd::Multiplicity;
pub use dtd::Notation;
pub use dtd::Particle;

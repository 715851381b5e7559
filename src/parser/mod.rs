/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

mod reference;

use std::io::{Cursor, Read};
use std::sync::Arc;

use log::{debug, warn};

pub(crate) use reference::expand_char_refs;
use reference::{Reference, predefined};

use crate::chars::{is_name_char, is_name_start_char, is_whitespace};
use crate::config::ParserConfig;
use crate::dtd::{DeclarationRegistry, EntityOrigin};
use crate::error::{ErrorKind, Result, XmlError, description};
use crate::handler::{Attribute, QName, SaxEvent, SaxHandler};
use crate::namespace::{NamespaceStack, split_qname};
use crate::source::{CharSource, ParseProgress, Position, Role, SourceStack};

/// What a parse learned about the document, besides the events.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParseSession {
    /// Version from the XML declaration.
    pub version: Option<String>,
    /// Name of the encoding the document was decoded with.
    pub encoding: Option<String>,
    /// Standalone flag from the XML declaration.
    pub standalone: Option<bool>,
    /// Root element name given in the document type declaration.
    pub doctype_name: Option<String>,
    pub registry: DeclarationRegistry,
}

/// Streaming XML parser.
///
/// The parser pulls bytes from a reader, detects their encoding, and
/// invokes a [SaxHandler] for each construct in document order. Document
/// type declarations are parsed too: their declarations are reported to
/// the handler, entities are expanded, and declared attribute defaults
/// are added to start tags.
///
/// # Examples
///
/// ```
/// use iksxml::{HandlerError, ParserConfig, SaxEvent, SaxHandler, XmlParser};
///
/// // Example handler which just prints the events
/// struct Printer;
///
/// impl SaxHandler for Printer {
///     fn handle_event(&mut self, event: &SaxEvent) -> Result<(), HandlerError> {
///         println!("{:?}", event);
///         Ok(())
///     }
/// }
///
/// let mut parser = XmlParser::new(ParserConfig::new());
/// match parser.parse_str(&mut Printer, "<doc>example</doc>") {
///     Ok(()) => (),
///     Err(err) => println!("syntax error at {}: {}", err.position(), err.message()),
/// }
/// ```
pub struct XmlParser {
    config: ParserConfig,
    session: ParseSession,
    progress: Arc<ParseProgress>,
}

impl XmlParser {
    pub fn new(config: ParserConfig) -> XmlParser {
        XmlParser {
            config,
            session: ParseSession::default(),
            progress: Arc::new(ParseProgress::new()),
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Information about the last parsed document.
    ///
    /// After a failed parse this holds what was collected up to the error.
    pub fn session(&self) -> &ParseSession {
        &self.session
    }

    /// A handle other threads can use to follow the parse.
    pub fn progress(&self) -> Arc<ParseProgress> {
        Arc::clone(&self.progress)
    }

    /// Parses a whole document from `reader`.
    pub fn parse_reader<H, R>(&mut self, handler: &mut H, reader: R) -> Result<()>
    where
        H: SaxHandler + ?Sized,
        R: Read + 'static,
    {
        let source = CharSource::from_reader(Box::new(reader), Role::Document)
            .with_encoding(self.config.encoding.clone())
            .with_system_id(self.config.system_id.clone())
            .with_tab_width(self.config.tab_width);
        self.parse_source(handler, source)
    }

    /// Parses a whole document from memory.
    pub fn parse_bytes<H: SaxHandler + ?Sized>(&mut self, handler: &mut H, bytes: &[u8]) -> Result<()> {
        self.parse_reader(handler, Cursor::new(bytes.to_vec()))
    }

    /// Parses a document which is already text.
    ///
    /// The encoding named in the XML declaration is ignored.
    pub fn parse_str<H: SaxHandler + ?Sized>(&mut self, handler: &mut H, text: &str) -> Result<()> {
        let source = CharSource::from_reader(Box::new(Cursor::new(text.as_bytes().to_vec())), Role::Document)
            .with_encoding(Some("UTF-8".to_string()))
            .with_system_id(self.config.system_id.clone())
            .with_tab_width(self.config.tab_width);
        self.parse_source(handler, source)
    }

    fn parse_source<H: SaxHandler + ?Sized>(&mut self, handler: &mut H, source: CharSource) -> Result<()> {
        let mut engine = Engine {
            config: &self.config,
            handler,
            stack: SourceStack::new(Arc::clone(&self.progress)),
            session: ParseSession::default(),
            namespaces: NamespaceStack::new(),
            open: Vec::new(),
            expanding: Vec::new(),
            text: String::new(),
            seen_root: false,
            seen_doctype: false,
        };
        let result = engine.run(source);
        if let Err(err) = &result {
            debug!("parse failed: {}", err);
            engine.handler.handle_error(err);
        }
        engine.stack.close();
        debug_assert!(engine.stack.is_closed());
        self.session = engine.session;
        result
    }
}

impl Default for XmlParser {
    fn default() -> Self {
        XmlParser::new(ParserConfig::default())
    }
}

struct RawAttribute {
    name: String,
    value: String,
    specified: bool,
    position: Position,
}

struct OpenElement {
    name: QName,
    start: Position,
    /// Source stack depth of the start tag.
    depth: usize,
}

/// Collapses runs of spaces and trims the ends, as done for every
/// attribute type except CDATA.
pub(crate) fn normalize_tokens(value: &str) -> String {
    value
        .split(' ')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// State of one parse: the grammar over the source stack.
pub(crate) struct Engine<'a, H: SaxHandler + ?Sized> {
    pub(crate) config: &'a ParserConfig,
    pub(crate) handler: &'a mut H,
    pub(crate) stack: SourceStack,
    pub(crate) session: ParseSession,
    namespaces: NamespaceStack,
    open: Vec<OpenElement>,
    /// General entities being expanded, innermost last.
    expanding: Vec<String>,
    /// Character data not reported yet.
    text: String,
    pub(crate) seen_root: bool,
    pub(crate) seen_doctype: bool,
}

impl<H: SaxHandler + ?Sized> Engine<'_, H> {
    pub(crate) fn error(&self, kind: ErrorKind, position: Position, message: impl Into<String>) -> XmlError {
        XmlError::new(kind, position, message).with_system_id(self.stack.system_id())
    }

    pub(crate) fn fail<T>(&self, kind: ErrorKind, position: Position, message: impl Into<String>) -> Result<T> {
        Err(self.error(kind, position, message))
    }

    pub(crate) fn position(&self) -> Position {
        self.stack.position()
    }

    pub(crate) fn peek(&mut self) -> Result<Option<char>> {
        self.stack.peek()
    }

    pub(crate) fn next(&mut self) -> Result<Option<char>> {
        self.stack.read()
    }

    pub(crate) fn emit(&mut self, event: &SaxEvent) -> Result<()> {
        if let Err(err) = self.handler.handle_event(event) {
            return Err(XmlError::from_handler(self.position(), err).with_system_id(self.stack.system_id()));
        }
        Ok(())
    }

    /// Consumes `literal` if the input continues with it.
    pub(crate) fn looking_at(&mut self, literal: &str) -> Result<bool> {
        self.stack.mark_set();
        for expected in literal.chars() {
            match self.next()? {
                Some(c) if c == expected => (),
                _ => {
                    self.stack.mark_return();
                    return Ok(false);
                }
            }
        }
        self.stack.mark_delete();
        Ok(true)
    }

    /// Returns true if anything was skipped.
    pub(crate) fn skip_whitespace(&mut self) -> Result<bool> {
        let mut skipped = false;
        while let Some(c) = self.peek()? {
            if !is_whitespace(c) {
                break;
            }
            self.next()?;
            skipped = true;
        }
        Ok(skipped)
    }

    pub(crate) fn require_whitespace(&mut self, kind: ErrorKind) -> Result<()> {
        let position = self.position();
        if self.skip_whitespace()? {
            return Ok(());
        }
        match self.peek()? {
            None => self.fail(ErrorKind::UnexpectedEndOfInput, position, description::EOF_IN_MARKUP),
            Some(_) => self.fail(kind, position, description::WHITESPACE_EXPECTED),
        }
    }

    pub(crate) fn expect(&mut self, expected: char, kind: ErrorKind, desc: &'static str) -> Result<()> {
        let position = self.position();
        match self.next()? {
            Some(c) if c == expected => Ok(()),
            None => self.fail(ErrorKind::UnexpectedEndOfInput, position, desc),
            Some(_) => self.fail(kind, position, desc),
        }
    }

    pub(crate) fn read_name(&mut self, kind: ErrorKind) -> Result<String> {
        let position = self.position();
        match self.peek()? {
            Some(c) if is_name_start_char(c) => self.read_token(kind),
            None => self.fail(ErrorKind::UnexpectedEndOfInput, position, description::EOF_IN_MARKUP),
            Some(_) => self.fail(kind, position, description::NAME_EXPECTED),
        }
    }

    /// Reads a name token, which may start with any name character.
    pub(crate) fn read_token(&mut self, kind: ErrorKind) -> Result<String> {
        let position = self.position();
        let mut token = String::new();
        while let Some(c) = self.peek()? {
            if !is_name_char(c) {
                break;
            }
            self.next()?;
            token.push(c);
        }
        if token.is_empty() {
            return self.fail(kind, position, description::NAME_EXPECTED);
        }
        Ok(token)
    }

    fn flush_text(&mut self) -> Result<()> {
        if self.text.is_empty() {
            return Ok(());
        }
        let mut text = std::mem::take(&mut self.text);
        let result = self.emit(&SaxEvent::Text(&text));
        text.clear();
        self.text = text;
        result
    }

    fn run(&mut self, source: CharSource) -> Result<()> {
        self.stack.push(source)?;
        if let Some(source) = self.stack.active() {
            self.session.encoding = Some(source.encoding_name().to_string());
            if let Some(declaration) = source.declaration() {
                self.session.version = declaration.version.clone();
                self.session.standalone = declaration.standalone;
            }
        }
        self.emit(&SaxEvent::BeginDocument)?;
        self.document()?;
        self.emit(&SaxEvent::EndDocument)
    }

    fn document(&mut self) -> Result<()> {
        loop {
            let Some(c) = self.peek()? else {
                if self.stack.depth() > 0 {
                    self.end_entity()?;
                    continue;
                }
                break;
            };
            match c {
                '<' => self.markup()?,
                '&' => self.content_reference()?,
                _ => self.character_data()?,
            }
        }
        self.flush_text()?;
        if let Some(open) = self.open.last() {
            let message = format!(
                "{}: <{}> opened at {}",
                description::EOF_IN_ELEMENT,
                open.name,
                open.start
            );
            return self.fail(ErrorKind::UnexpectedEndOfInput, self.position(), message);
        }
        if !self.seen_root {
            return self.fail(ErrorKind::UnexpectedEndOfInput, self.position(), description::NO_ROOT);
        }
        Ok(())
    }

    fn end_entity(&mut self) -> Result<()> {
        if let Some(open) = self.open.last() {
            if open.depth == self.stack.depth() {
                let message = format!("{}: <{}>", description::TAG_OUTSIDE_ENTITY, open.name);
                return self.fail(ErrorKind::StructuralError, open.start, message);
            }
        }
        if let Some(name) = self.expanding.pop() {
            debug!("end of entity {}", name);
        }
        self.stack.pop();
        Ok(())
    }

    fn markup(&mut self) -> Result<()> {
        let start = self.position();
        self.stack.mark_set();
        self.next()?;
        match self.peek()? {
            Some('/') => {
                self.stack.mark_delete();
                self.next()?;
                self.end_tag(start)
            }
            Some('?') => {
                self.stack.mark_delete();
                self.next()?;
                let (target, data) = self.processing_instruction(start)?;
                self.flush_text()?;
                self.emit(&SaxEvent::ProcessingInstruction {
                    target: &target,
                    data: &data,
                })
            }
            Some('!') => {
                self.next()?;
                if self.looking_at("--")? {
                    self.stack.mark_delete();
                    let text = self.comment(start)?;
                    self.flush_text()?;
                    self.emit(&SaxEvent::Comment(&text))
                } else if self.looking_at("[CDATA[")? {
                    self.stack.mark_delete();
                    self.cdata_section(start)
                } else if self.looking_at("DOCTYPE")? {
                    self.stack.mark_delete();
                    self.doctype(start)
                } else {
                    self.stack.mark_return();
                    self.fail(
                        ErrorKind::InvalidCharacter,
                        self.position(),
                        description::MARKUP_UNRECOGNIZED,
                    )
                }
            }
            None => {
                self.stack.mark_delete();
                self.fail(ErrorKind::UnexpectedEndOfInput, start, description::EOF_IN_MARKUP)
            }
            Some(_) => {
                self.stack.mark_delete();
                self.start_tag(start)
            }
        }
    }

    fn start_tag(&mut self, start: Position) -> Result<()> {
        self.flush_text()?;
        if self.open.is_empty() {
            if self.seen_root {
                return self.fail(ErrorKind::StructuralError, start, description::ROOT_DUPLICATE);
            }
            self.seen_root = true;
        }
        let name = self.read_name(ErrorKind::InvalidCharacter)?;

        let mut attributes: Vec<RawAttribute> = Vec::new();
        let empty = loop {
            let had_space = self.skip_whitespace()?;
            let position = self.position();
            match self.peek()? {
                None => {
                    return self.fail(ErrorKind::UnexpectedEndOfInput, start, description::EOF_IN_MARKUP);
                }
                Some('>') => {
                    self.next()?;
                    break false;
                }
                Some('/') => {
                    self.next()?;
                    if self.next()? != Some('>') {
                        return self.fail(ErrorKind::InvalidCharacter, position, description::TAG_END_EXPECTED);
                    }
                    break true;
                }
                Some(c) => {
                    if !had_space || !is_name_start_char(c) {
                        return self.fail(ErrorKind::InvalidCharacter, position, description::TAG_END_EXPECTED);
                    }
                    let attr_name = self.read_name(ErrorKind::InvalidCharacter)?;
                    self.skip_whitespace()?;
                    self.expect('=', ErrorKind::InvalidCharacter, description::EQ_EXPECTED)?;
                    self.skip_whitespace()?;
                    let value = self.attribute_value()?;
                    if attributes.iter().any(|a| a.name == attr_name) {
                        let message = format!("{}: {}", description::ATTRIBUTE_DUPLICATE, attr_name);
                        return self.fail(ErrorKind::StructuralError, position, message);
                    }
                    attributes.push(RawAttribute {
                        name: attr_name,
                        value,
                        specified: true,
                        position,
                    });
                }
            }
        };

        let attributes = self.complete_attributes(&name, start, attributes);
        let (qname, attributes, declared) = if self.config.namespaces {
            self.bind_namespaces(&name, start, attributes)?
        } else {
            let attributes = attributes
                .into_iter()
                .map(|a| Attribute {
                    name: QName::plain(&a.name),
                    value: a.value,
                    specified: a.specified,
                })
                .collect();
            (QName::plain(&name), attributes, Vec::new())
        };

        for (prefix, uri) in &declared {
            self.emit(&SaxEvent::BeginPrefixMapping { prefix, uri })?;
        }
        self.emit(&SaxEvent::BeginElement {
            name: &qname,
            attributes: &attributes,
        })?;
        if empty {
            self.emit(&SaxEvent::EndElement { name: &qname })?;
            return self.end_prefix_mappings();
        }
        self.open.push(OpenElement {
            name: qname,
            start,
            depth: self.stack.depth(),
        });
        Ok(())
    }

    /// Normalises declared tokenized values and adds missing defaults.
    fn complete_attributes(&self, element: &str, start: Position, mut attributes: Vec<RawAttribute>) -> Vec<RawAttribute> {
        let registry = &self.session.registry;
        for attr in attributes.iter_mut() {
            if let Some(decl) = registry.attribute(element, &attr.name) {
                if decl.attribute_type.is_tokenized() {
                    attr.value = normalize_tokens(&attr.value);
                }
            }
        }
        if self.config.attribute_defaults {
            for decl in registry.attributes(element) {
                let Some(value) = &decl.default_value else {
                    continue;
                };
                if !attributes.iter().any(|a| a.name == decl.name) {
                    attributes.push(RawAttribute {
                        name: decl.name.clone(),
                        value: value.clone(),
                        specified: false,
                        position: start,
                    });
                }
            }
        }
        attributes
    }

    #[allow(clippy::type_complexity)]
    fn bind_namespaces(
        &mut self,
        name: &str,
        start: Position,
        attributes: Vec<RawAttribute>,
    ) -> Result<(QName, Vec<Attribute>, Vec<(String, String)>)> {
        self.namespaces.push_frame();
        let allow_unbinding = self.session.version.as_deref() == Some("1.1");
        let mut declared = Vec::new();
        let mut regular = Vec::new();
        for attr in attributes {
            let prefix = if attr.name == "xmlns" {
                ""
            } else if let Some(prefix) = attr.name.strip_prefix("xmlns:") {
                if prefix.is_empty() || prefix.contains(':') {
                    let message = format!("{}: {}", description::PREFIX_BAD_QNAME, attr.name);
                    return self.fail(ErrorKind::StructuralError, attr.position, message);
                }
                prefix
            } else {
                regular.push(attr);
                continue;
            };
            if let Err(desc) = self.namespaces.declare(prefix, &attr.value, allow_unbinding) {
                let message = format!("{}: {}", desc, attr.name);
                return self.fail(ErrorKind::StructuralError, attr.position, message);
            }
            declared.push((prefix.to_string(), attr.value.clone()));
        }

        let qname = self.qualify(name, true, start)?;
        let mut qualified: Vec<Attribute> = Vec::with_capacity(regular.len());
        for attr in regular {
            let attr_name = self.qualify(&attr.name, false, attr.position)?;
            if attr_name.namespace_uri.is_some()
                && qualified.iter().any(|a| {
                    a.name.namespace_uri == attr_name.namespace_uri && a.name.local_name == attr_name.local_name
                })
            {
                let message = format!("{}: {}", description::ATTRIBUTE_DUPLICATE, attr.name);
                return self.fail(ErrorKind::StructuralError, attr.position, message);
            }
            qualified.push(Attribute {
                name: attr_name,
                value: attr.value,
                specified: attr.specified,
            });
        }
        Ok((qname, qualified, declared))
    }

    fn qualify(&self, name: &str, is_element: bool, position: Position) -> Result<QName> {
        let (prefix, local_name) = match split_qname(name) {
            Ok(parts) => parts,
            Err(desc) => return self.fail(ErrorKind::StructuralError, position, format!("{}: {}", desc, name)),
        };
        let namespace_uri = match prefix {
            Some(prefix) => match self.namespaces.resolve(prefix) {
                Some(uri) => Some(uri.to_string()),
                None => {
                    let message = format!("{}: {}", description::PREFIX_UNBOUND, prefix);
                    return self.fail(ErrorKind::StructuralError, position, message);
                }
            },
            // unprefixed attributes are in no namespace
            None if is_element => self.namespaces.resolve("").map(str::to_string),
            None => None,
        };
        Ok(QName {
            name: name.to_string(),
            prefix: prefix.map(str::to_string),
            local_name: local_name.to_string(),
            namespace_uri,
        })
    }

    fn end_prefix_mappings(&mut self) -> Result<()> {
        if !self.config.namespaces {
            return Ok(());
        }
        let frame = self.namespaces.pop_frame();
        for (prefix, _) in frame.iter().rev() {
            self.emit(&SaxEvent::EndPrefixMapping { prefix })?;
        }
        Ok(())
    }

    fn end_tag(&mut self, start: Position) -> Result<()> {
        self.flush_text()?;
        let name = self.read_name(ErrorKind::InvalidCharacter)?;
        self.skip_whitespace()?;
        let position = self.position();
        match self.next()? {
            Some('>') => (),
            None => return self.fail(ErrorKind::UnexpectedEndOfInput, start, description::EOF_IN_MARKUP),
            Some(_) => {
                return self.fail(ErrorKind::InvalidCharacter, position, description::END_TAG_END_EXPECTED);
            }
        }
        let Some(open) = self.open.pop() else {
            let message = format!("{}: </{}> has no start tag", description::TAG_MISMATCH, name);
            return self.fail(ErrorKind::StructuralError, start, message);
        };
        if open.name.name != name {
            let message = format!(
                "{}: </{}> found, <{}> was opened at {}",
                description::TAG_MISMATCH,
                name,
                open.name,
                open.start
            );
            return self.fail(ErrorKind::StructuralError, start, message);
        }
        if open.depth != self.stack.depth() {
            let message = format!("{}: <{}>", description::TAG_OUTSIDE_ENTITY, name);
            return self.fail(ErrorKind::StructuralError, start, message);
        }
        self.emit(&SaxEvent::EndElement { name: &open.name })?;
        self.end_prefix_mappings()
    }

    /// Reads a comment after its `<!--`.
    pub(crate) fn comment(&mut self, start: Position) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.next()? {
                None => {
                    return self.fail(ErrorKind::UnexpectedEndOfInput, start, description::EOF_IN_COMMENT);
                }
                Some('-') if self.peek()? == Some('-') => {
                    self.next()?;
                    return match self.next()? {
                        Some('>') => Ok(text),
                        None => self.fail(ErrorKind::UnexpectedEndOfInput, start, description::EOF_IN_COMMENT),
                        Some(_) => self.fail(ErrorKind::MalformedComment, start, description::COMMENT_DOUBLE_DASH),
                    };
                }
                Some(c) => text.push(c),
            }
        }
    }

    /// Reads a processing instruction after its `<?`.
    pub(crate) fn processing_instruction(&mut self, start: Position) -> Result<(String, String)> {
        let target = self.read_name(ErrorKind::MalformedProcessingInstruction)?;
        if target.eq_ignore_ascii_case("xml") {
            return if target == "xml" {
                self.fail(ErrorKind::MalformedXmlDeclaration, start, description::XML_DECL_NOT_FIRST)
            } else {
                self.fail(ErrorKind::MalformedProcessingInstruction, start, description::PI_RESERVED_TARGET)
            };
        }
        if self.looking_at("?>")? {
            return Ok((target, String::new()));
        }
        let position = self.position();
        if !self.skip_whitespace()? {
            return match self.peek()? {
                None => self.fail(ErrorKind::UnexpectedEndOfInput, start, description::EOF_IN_PI),
                Some(_) => self.fail(
                    ErrorKind::MalformedProcessingInstruction,
                    position,
                    description::PI_BAD_TARGET_END,
                ),
            };
        }
        let mut data = String::new();
        loop {
            match self.next()? {
                None => return self.fail(ErrorKind::UnexpectedEndOfInput, start, description::EOF_IN_PI),
                Some('?') if self.peek()? == Some('>') => {
                    self.next()?;
                    return Ok((target, data));
                }
                Some(c) => data.push(c),
            }
        }
    }

    fn cdata_section(&mut self, start: Position) -> Result<()> {
        if self.open.is_empty() {
            return self.fail(ErrorKind::MalformedCDataSection, start, description::CDATA_OUTSIDE_ROOT);
        }
        self.flush_text()?;
        let mut text = String::new();
        loop {
            match self.next()? {
                None => return self.fail(ErrorKind::UnexpectedEndOfInput, start, description::EOF_IN_CDATA),
                Some(']') if self.looking_at("]>")? => break,
                Some(c) => text.push(c),
            }
        }
        self.emit(&SaxEvent::CDataSection(&text))
    }

    fn character_data(&mut self) -> Result<()> {
        let outside = self.open.is_empty();
        loop {
            let position = self.position();
            let c = match self.peek()? {
                None | Some('<') | Some('&') => return Ok(()),
                Some(c) => c,
            };
            if outside {
                self.next()?;
                if !is_whitespace(c) {
                    return self.fail(ErrorKind::InvalidCharacter, position, description::CONTENT_AFTER_ROOT);
                }
                continue;
            }
            if c == ']' {
                self.stack.mark_set();
                self.next()?;
                if self.looking_at("]>")? {
                    // report the first bracket
                    self.stack.mark_backup(3);
                    self.stack.mark_delete();
                    return self.fail(ErrorKind::InvalidCharacter, self.position(), description::CHAR_CDATA_END);
                }
                self.stack.mark_delete();
            } else {
                self.next()?;
            }
            self.text.push(c);
        }
    }

    fn content_reference(&mut self) -> Result<()> {
        let start = self.position();
        self.next()?;
        if self.open.is_empty() {
            return self.fail(ErrorKind::InvalidCharacter, start, description::CONTENT_AFTER_ROOT);
        }
        let name = match self.read_reference(start)? {
            Reference::Char(c) => {
                self.text.push(c);
                return Ok(());
            }
            Reference::Entity(name) => name,
        };
        if let Some(c) = predefined(&name) {
            self.text.push(c);
            return Ok(());
        }
        let Some(entity) = self.session.registry.general_entity(&name).cloned() else {
            warn!("entity &{}; is not declared, keeping it as text", name);
            self.text.push('&');
            self.text.push_str(&name);
            self.text.push(';');
            return Ok(());
        };
        match entity.origin {
            EntityOrigin::Internal(value) => {
                let source = CharSource::from_text_at(&value, start)
                    .with_system_id(self.stack.system_id().map(str::to_string));
                self.enter_entity(&name, start, source)
            }
            EntityOrigin::External { public_id, system_id } => {
                if !self.config.external_entities {
                    debug!("external entity &{}; is not expanded", name);
                    return Ok(());
                }
                self.check_entity(&name, start)?;
                let reader = self.open_external(public_id.as_deref(), &system_id, start)?;
                let source = CharSource::from_reader(reader, Role::External)
                    .with_system_id(Some(system_id))
                    .with_public_id(public_id)
                    .with_tab_width(self.config.tab_width);
                self.enter_entity(&name, start, source)
            }
            EntityOrigin::Unparsed { .. } => {
                let message = format!("{}: {}", description::ENTITY_UNPARSED, name);
                self.fail(ErrorKind::StructuralError, start, message)
            }
        }
    }

    fn check_entity(&self, name: &str, start: Position) -> Result<()> {
        if self.expanding.iter().any(|n| n == name) {
            let message = format!("{}: {}", description::ENTITY_RECURSION, name);
            return self.fail(ErrorKind::StructuralError, start, message);
        }
        if self.expanding.len() >= self.config.max_entity_depth {
            return self.fail(ErrorKind::StructuralError, start, description::ENTITY_DEPTH);
        }
        Ok(())
    }

    /// Continues reading from the replacement text of general entity `name`.
    fn enter_entity(&mut self, name: &str, start: Position, source: CharSource) -> Result<()> {
        self.check_entity(name, start)?;
        self.stack.push(source)?;
        self.expanding.push(name.to_string());
        Ok(())
    }

    pub(crate) fn open_external(
        &mut self,
        public_id: Option<&str>,
        system_id: &str,
        position: Position,
    ) -> Result<Box<dyn Read>> {
        match self.handler.resolve_entity(public_id, system_id) {
            Ok(reader) => Ok(reader),
            Err(err) => self.fail(ErrorKind::Io, position, format!("{}: {}", system_id, err)),
        }
    }

    /// Reads a quoted attribute value, or a default value in the DTD.
    pub(crate) fn attribute_value(&mut self) -> Result<String> {
        let start = self.position();
        let quote = match self.next()? {
            Some(q @ ('"' | '\'')) => q,
            None => return self.fail(ErrorKind::UnexpectedEndOfInput, start, description::EOF_IN_ATTRIBUTE),
            Some(_) => return self.fail(ErrorKind::InvalidCharacter, start, description::QUOTE_EXPECTED),
        };
        // quotes coming from entity text do not end the value
        let base = self.stack.depth();
        let mut value = String::new();
        loop {
            let position = self.position();
            match self.next()? {
                None if self.stack.depth() > base => {
                    self.expanding.pop();
                    self.stack.pop();
                }
                None => {
                    return self.fail(ErrorKind::UnexpectedEndOfInput, start, description::EOF_IN_ATTRIBUTE);
                }
                Some(c) if c == quote && self.stack.depth() == base => return Ok(value),
                Some('<') => {
                    return self.fail(ErrorKind::InvalidCharacter, position, description::CHAR_LT_IN_VALUE);
                }
                Some('&') => self.value_reference(position, &mut value)?,
                Some(c) if is_whitespace(c) => value.push(' '),
                Some(c) => value.push(c),
            }
        }
    }

    fn value_reference(&mut self, start: Position, value: &mut String) -> Result<()> {
        let name = match self.read_reference(start)? {
            Reference::Char(c) => {
                value.push(c);
                return Ok(());
            }
            Reference::Entity(name) => name,
        };
        if let Some(c) = predefined(&name) {
            value.push(c);
            return Ok(());
        }
        let origin = self.session.registry.general_entity(&name).map(|e| e.origin.clone());
        match origin {
            None => {
                warn!("entity &{}; is not declared, keeping it as text", name);
                value.push('&');
                value.push_str(&name);
                value.push(';');
                Ok(())
            }
            Some(EntityOrigin::Internal(text)) => {
                let source = CharSource::from_text_at(&text, start)
                    .with_system_id(self.stack.system_id().map(str::to_string));
                self.enter_entity(&name, start, source)
            }
            Some(EntityOrigin::External { .. }) => {
                let message = format!("{}: {}", description::ENTITY_EXTERNAL_IN_VALUE, name);
                self.fail(ErrorKind::StructuralError, start, message)
            }
            Some(EntityOrigin::Unparsed { .. }) => {
                let message = format!("{}: {}", description::ENTITY_UNPARSED, name);
                self.fail(ErrorKind::StructuralError, start, message)
            }
        }
    }
}

#[cfg(test)]
mod tests;

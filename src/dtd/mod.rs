/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

//! Document type declarations.
//!
//! A subset is read as raw text and goes through three passes. Parameter
//! entity declarations are registered first, then parameter entity
//! references are replaced by their text, and finally the remaining
//! markup declarations are parsed and reported to the handler.

mod content;
mod registry;

use std::io::Read;

use log::{debug, trace, warn};

pub use content::{Conjunction, ContentSpec, Multiplicity, Particle};
pub use registry::{
    AttributeDecl, AttributeType, DeclarationRegistry, DefaultKind, ElementDecl, Entity, EntityKind, EntityOrigin,
    Notation,
};

use content::parse_content_spec;

use crate::chars::{is_name_char, is_name_start_char, is_pubid_char, is_whitespace};
use crate::error::{ErrorKind, Result, description};
use crate::handler::{SaxEvent, SaxHandler};
use crate::parser::{Engine, expand_char_refs, normalize_tokens};
use crate::source::{CharSource, Position, Role};
use crate::uri;

/// A piece of raw subset text.
#[derive(Debug, Eq, PartialEq)]
enum Segment {
    Text(String),
    /// A top level `<!ENTITY % ...>` declaration.
    ParameterDecl { text: String, offset: usize },
    /// A `%name;` reference outside of quoted literals.
    Reference { name: String, offset: usize },
    /// A conditional section whose keyword is the reference `%name;`.
    ///
    /// `start..end` spans the whole section and `body` covers the text
    /// after its opening bracket.
    Section {
        name: String,
        offset: usize,
        start: usize,
        end: usize,
        body: Vec<Segment>,
    },
}

fn starts_with(chars: &[char], literal: &str) -> bool {
    let mut i = 0;
    for c in literal.chars() {
        if chars.get(i) != Some(&c) {
            return false;
        }
        i += 1;
    }
    true
}

/// Index right after the first `literal` at or after `from`.
fn find_end(chars: &[char], from: usize, literal: &str) -> usize {
    let len = literal.chars().count();
    (from..chars.len())
        .find(|&i| starts_with(&chars[i..], literal))
        .map_or(chars.len(), |i| i + len)
}

/// Index right after the `>` closing the declaration starting at `from`.
fn declaration_end(chars: &[char], from: usize) -> usize {
    let mut quote = None;
    for (i, &c) in chars.iter().enumerate().skip(from) {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => (),
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return i + 1,
            None => (),
        }
    }
    chars.len()
}

/// Index right after the `]]>` closing the conditional section at `from`.
fn section_end(chars: &[char], from: usize) -> usize {
    let mut depth = 0;
    let mut i = from;
    while i < chars.len() {
        if starts_with(&chars[i..], "<![") {
            depth += 1;
            i += 3;
        } else if starts_with(&chars[i..], "]]>") {
            depth -= 1;
            i += 3;
            if depth == 0 {
                return i;
            }
        } else {
            i += 1;
        }
    }
    chars.len()
}

fn is_parameter_decl(chars: &[char]) -> bool {
    if !starts_with(chars, "<!ENTITY") {
        return false;
    }
    let rest = &chars[8..];
    let spaces = rest.iter().take_while(|c| is_whitespace(**c)).count();
    spaces > 0
        && rest.get(spaces) == Some(&'%')
        && rest.get(spaces + 1).is_some_and(|c| is_whitespace(*c))
}

fn is_ignore_section(chars: &[char]) -> bool {
    let rest = &chars[3..];
    let spaces = rest.iter().take_while(|c| is_whitespace(**c)).count();
    starts_with(&rest[spaces..], "IGNORE")
}

fn is_ignore_keyword(value: &str) -> bool {
    value.trim_matches(is_whitespace) == "IGNORE"
}

/// Name, offset and body start of a `<![ %name; [` section head at `from`.
fn keyword_reference(chars: &[char], from: usize) -> Option<(String, usize, usize)> {
    let skip = |mut i: usize| {
        while chars.get(i).is_some_and(|c| is_whitespace(*c)) {
            i += 1;
        }
        i
    };
    let offset = skip(from + 3);
    if chars.get(offset) != Some(&'%') {
        return None;
    }
    let (name, end) = reference_at(chars, offset)?;
    let open = skip(end);
    (chars.get(open) == Some(&'[')).then_some((name, offset, open + 1))
}

/// Whitespace standing in for removed text, keeping its line breaks.
fn blank(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\n' || c == '\t' { c } else { ' ' })
        .collect()
}

/// Name and end index of a `%name;` reference at `from`.
fn reference_at(chars: &[char], from: usize) -> Option<(String, usize)> {
    if !chars.get(from + 1).is_some_and(|c| is_name_start_char(*c)) {
        return None;
    }
    let mut end = from + 1;
    while end < chars.len() && is_name_char(chars[end]) {
        end += 1;
    }
    if chars.get(end) != Some(&';') {
        return None;
    }
    Some((chars[from + 1..end].iter().collect(), end + 1))
}

/// Splits subset text into literal text, parameter entity declarations
/// and parameter entity references.
///
/// Unterminated constructs run to the end of the text; the declaration
/// parser reports them.
fn scan_subset(text: &str) -> Vec<Segment> {
    let chars: Vec<char> = text.chars().collect();
    scan_range(&chars, 0, chars.len())
}

fn scan_range(chars: &[char], from: usize, to: usize) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut buf = String::new();
    let mut in_decl = false;
    let mut i = from;
    while i < to {
        let rest = &chars[i..to];
        let end = if starts_with(rest, "<!--") {
            find_end(chars, i + 4, "-->")
        } else if starts_with(rest, "<?") {
            find_end(chars, i + 2, "?>")
        } else if !in_decl && starts_with(rest, "<![") {
            if is_ignore_section(rest) {
                section_end(chars, i)
            } else if let Some((name, offset, open)) = keyword_reference(chars, i) {
                let end = section_end(chars, i).min(to);
                if !buf.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut buf)));
                }
                segments.push(Segment::Section {
                    name,
                    offset,
                    start: i,
                    end,
                    body: scan_range(chars, open, end),
                });
                i = end;
                continue;
            } else {
                i + 3
            }
        } else if !in_decl && is_parameter_decl(rest) {
            let end = declaration_end(chars, i).min(to);
            if !buf.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut buf)));
            }
            segments.push(Segment::ParameterDecl {
                text: chars[i..end].iter().collect(),
                offset: i,
            });
            i = end;
            continue;
        } else {
            match chars[i] {
                '<' if starts_with(rest, "<!") => {
                    in_decl = true;
                    i + 1
                }
                '>' if in_decl => {
                    in_decl = false;
                    i + 1
                }
                '"' | '\'' if in_decl => find_end(chars, i + 1, &chars[i].to_string()),
                '%' => match reference_at(chars, i) {
                    Some((name, end)) => {
                        if !buf.is_empty() {
                            segments.push(Segment::Text(std::mem::take(&mut buf)));
                        }
                        segments.push(Segment::Reference { name, offset: i });
                        i = end;
                        continue;
                    }
                    None => i + 1,
                },
                _ => i + 1,
            }
        };
        let end = end.min(to);
        buf.extend(&chars[i..end]);
        i = end;
    }
    if !buf.is_empty() {
        segments.push(Segment::Text(buf));
    }
    segments
}

/// Identifiers of an external resource.
#[derive(Debug, Default)]
struct ExternalId {
    public_id: Option<String>,
    system_id: Option<String>,
}

impl<H: SaxHandler + ?Sized> Engine<'_, H> {
    fn locate(&self, text: &str, offset: usize, origin: Position) -> Position {
        let mut position = origin;
        for c in text.chars().take(offset) {
            position.advance(c, self.config.tab_width);
        }
        position
    }

    /// Reads a quoted literal without interpreting its content.
    fn quoted_literal(&mut self, kind: ErrorKind) -> Result<String> {
        let start = self.position();
        let quote = match self.next()? {
            Some(q @ ('"' | '\'')) => q,
            None => return self.fail(ErrorKind::UnexpectedEndOfInput, start, description::EOF_IN_LITERAL),
            Some(_) => return self.fail(kind, start, description::QUOTE_EXPECTED),
        };
        let mut text = String::new();
        loop {
            match self.next()? {
                None => return self.fail(ErrorKind::UnexpectedEndOfInput, start, description::EOF_IN_LITERAL),
                Some(c) if c == quote => return Ok(text),
                Some(c) => text.push(c),
            }
        }
    }

    fn pubid_literal(&mut self, kind: ErrorKind) -> Result<String> {
        let start = self.position();
        let literal = self.quoted_literal(kind)?;
        if let Some(offset) = literal.chars().position(|c| !is_pubid_char(c)) {
            let position = self.locate(&literal, offset + 1, start);
            return self.fail(kind, position, description::DTD_BAD_PUBID);
        }
        let spaced: String = literal
            .chars()
            .map(|c| if is_whitespace(c) { ' ' } else { c })
            .collect();
        Ok(normalize_tokens(&spaced))
    }

    /// Reads `SYSTEM "sys"` or `PUBLIC "pub" "sys"`.
    ///
    /// Notations may omit the system literal after a public one.
    fn external_id(&mut self, kind: ErrorKind, notation: bool, bad_keyword: &'static str) -> Result<ExternalId> {
        let position = self.position();
        let keyword = self.read_name(kind)?;
        match keyword.as_str() {
            "SYSTEM" => {
                self.require_whitespace(kind)?;
                Ok(ExternalId {
                    public_id: None,
                    system_id: Some(self.quoted_literal(kind)?),
                })
            }
            "PUBLIC" => {
                self.require_whitespace(kind)?;
                let public_id = Some(self.pubid_literal(kind)?);
                let system_id = if notation {
                    let had_space = self.skip_whitespace()?;
                    match self.peek()? {
                        Some('"' | '\'') if had_space => Some(self.quoted_literal(kind)?),
                        _ => None,
                    }
                } else {
                    self.require_whitespace(kind)?;
                    Some(self.quoted_literal(kind)?)
                };
                Ok(ExternalId { public_id, system_id })
            }
            _ => self.fail(kind, position, bad_keyword),
        }
    }

    fn resolve_system_id(&self, id: &str, position: Position) -> Result<String> {
        match uri::resolve(self.stack.base_id(), id) {
            Ok(resolved) => Ok(resolved),
            Err(desc) => self.fail(ErrorKind::MalformedUrl, position, format!("{}: {}", desc, id)),
        }
    }

    /// Reads a whole external resource, text declaration excluded.
    fn read_external(
        &mut self,
        reader: Box<dyn Read>,
        public_id: Option<String>,
        system_id: String,
    ) -> Result<(String, Position)> {
        let source = CharSource::from_reader(reader, Role::External)
            .with_system_id(Some(system_id))
            .with_public_id(public_id)
            .with_tab_width(self.config.tab_width);
        self.stack.push(source)?;
        let origin = self.position();
        let mut text = String::new();
        while let Some(c) = self.next()? {
            text.push(c);
        }
        self.stack.pop();
        Ok((text, origin))
    }

    /// Reads a document type declaration after its `<!DOCTYPE`.
    pub(crate) fn doctype(&mut self, start: Position) -> Result<()> {
        let kind = ErrorKind::MalformedDocType;
        if self.seen_root {
            return self.fail(ErrorKind::StructuralError, start, description::DOCTYPE_AFTER_ROOT);
        }
        if self.seen_doctype {
            return self.fail(ErrorKind::StructuralError, start, description::DOCTYPE_DUPLICATE);
        }
        self.seen_doctype = true;
        let position = self.position();
        if !self.skip_whitespace()? {
            return self.fail(kind, position, description::DOCTYPE_BAD_START);
        }
        let name = self.read_name(kind)?;
        debug!("document type {}", name);
        self.session.doctype_name = Some(name);

        let had_space = self.skip_whitespace()?;
        let id_position = self.position();
        let external = match self.peek()? {
            Some('[' | '>') | None => ExternalId::default(),
            Some(_) if had_space => {
                let id = self.external_id(kind, false, description::DOCTYPE_BAD_EXTERNAL_ID)?;
                self.skip_whitespace()?;
                id
            }
            Some(_) => return self.fail(kind, id_position, description::DOCTYPE_NO_END),
        };

        let mut internal = None;
        if self.peek()? == Some('[') {
            self.next()?;
            let origin = self.position();
            internal = Some((self.internal_subset(start)?, origin));
            self.skip_whitespace()?;
        }
        let position = self.position();
        match self.next()? {
            Some('>') => (),
            None => return self.fail(ErrorKind::UnexpectedEndOfInput, start, description::EOF_IN_DOCTYPE),
            Some(_) => return self.fail(kind, position, description::DOCTYPE_NO_END),
        }

        if let Some((text, origin)) = internal {
            let system_id = self.stack.system_id().map(str::to_string);
            self.process_subset(&text, origin, system_id)?;
        }
        if let Some(system_id) = external.system_id {
            let system_id = self.resolve_system_id(&system_id, id_position)?;
            if self.config.load_external_dtd {
                let reader = self.open_external(external.public_id.as_deref(), &system_id, id_position)?;
                let (text, origin) = self.read_external(reader, external.public_id, system_id.clone())?;
                self.process_subset(&text, origin, Some(system_id))?;
            } else {
                warn!("external DTD subset {} is not loaded", system_id);
            }
        }
        Ok(())
    }

    fn copy_until(&mut self, end: &str, text: &mut String, start: Position) -> Result<()> {
        loop {
            match self.next()? {
                None => return self.fail(ErrorKind::UnexpectedEndOfInput, start, description::EOF_IN_DOCTYPE),
                Some(c) => text.push(c),
            }
            if text.ends_with(end) {
                return Ok(());
            }
        }
    }

    /// Reads the raw internal subset up to its closing `]`.
    fn internal_subset(&mut self, start: Position) -> Result<String> {
        let mut text = String::new();
        let mut quote = None;
        let mut in_decl = false;
        let mut sections = 0;
        loop {
            let Some(c) = self.next()? else {
                return self.fail(ErrorKind::UnexpectedEndOfInput, start, description::EOF_IN_DOCTYPE);
            };
            if let Some(q) = quote {
                if c == q {
                    quote = None;
                }
                text.push(c);
                continue;
            }
            if c == ']' && !in_decl {
                if sections == 0 {
                    return Ok(text);
                }
                if self.looking_at("]>")? {
                    sections -= 1;
                    text.push_str("]]>");
                    continue;
                }
            } else if c == '<' {
                if self.looking_at("!--")? {
                    text.push_str("<!--");
                    self.copy_until("-->", &mut text, start)?;
                    continue;
                }
                if self.looking_at("?")? {
                    text.push_str("<?");
                    self.copy_until("?>", &mut text, start)?;
                    continue;
                }
                if self.looking_at("![")? {
                    sections += 1;
                    text.push_str("<![");
                    continue;
                }
                in_decl = true;
            } else if c == '>' && in_decl {
                in_decl = false;
            } else if (c == '"' || c == '\'') && in_decl {
                quote = Some(c);
            }
            text.push(c);
        }
    }

    /// Runs the declaration passes over one subset.
    pub(crate) fn process_subset(&mut self, text: &str, origin: Position, system_id: Option<String>) -> Result<()> {
        debug!("reading DTD subset of {}", system_id.as_deref().unwrap_or("document"));
        let segments = scan_subset(text);
        self.declare_parameters(&segments, text, origin, system_id.as_deref())?;
        let mut guard = Vec::new();
        let expanded = self.expand_segments(segments, text, origin, system_id.as_deref(), &mut guard)?;
        debug!("parameter entities replaced, parsing declarations");
        self.parse_declarations(&expanded, origin, system_id)
    }

    fn declare_parameters(
        &mut self,
        segments: &[Segment],
        text: &str,
        origin: Position,
        system_id: Option<&str>,
    ) -> Result<()> {
        for segment in segments {
            match segment {
                Segment::ParameterDecl { text: decl, offset } => {
                    let position = self.locate(text, *offset, origin);
                    let source =
                        CharSource::from_text_at(decl, position).with_system_id(system_id.map(str::to_string));
                    self.stack.push(source)?;
                    self.looking_at("<!ENTITY")?;
                    self.entity_declaration(position)?;
                    self.stack.pop();
                }
                Segment::Section { name, offset, body, .. } => {
                    let position = self.locate(text, *offset, origin);
                    let keyword = self.parameter_text(name, position, &[])?;
                    if !keyword.is_some_and(|(value, _)| is_ignore_keyword(&value)) {
                        self.declare_parameters(body, text, origin, system_id)?;
                    }
                }
                Segment::Text(_) | Segment::Reference { .. } => (),
            }
        }
        Ok(())
    }

    /// Text of parameter entity `name` and the identifier its own
    /// references resolve against, or None when it has no value.
    fn parameter_text(
        &mut self,
        name: &str,
        position: Position,
        guard: &[String],
    ) -> Result<Option<(String, Option<String>)>> {
        if guard.iter().any(|n| n == name) {
            let message = format!("{}: %{};", description::DTD_PE_RECURSION, name);
            return self.fail(ErrorKind::MalformedDocType, position, message);
        }
        if guard.len() >= self.config.max_entity_depth {
            return self.fail(ErrorKind::MalformedDocType, position, description::DTD_PE_DEPTH);
        }
        let entity = match self.handler.parameter_entity(name) {
            Some(entity) => Some(entity),
            None => self.session.registry.parameter_entity(name).cloned(),
        };
        match entity.map(|e| e.origin) {
            Some(EntityOrigin::Internal(value)) => Ok(Some((value, self.stack.system_id().map(str::to_string)))),
            Some(EntityOrigin::External { public_id, system_id }) => {
                match self.handler.resolve_entity(public_id.as_deref(), &system_id) {
                    Ok(reader) => {
                        let (text, _) = self.read_external(reader, public_id, system_id.clone())?;
                        Ok(Some((text, Some(system_id))))
                    }
                    Err(err) => {
                        warn!("parameter entity %{}; is not available: {}", name, err);
                        Ok(None)
                    }
                }
            }
            Some(EntityOrigin::Unparsed { .. }) | None => Ok(None),
        }
    }

    /// Replaces parameter entity references between declarations.
    ///
    /// Replacement text is padded with a space on both sides. Parameter
    /// entity declarations and ignored sections turn into whitespace so
    /// that later positions stay put.
    fn expand_segments(
        &mut self,
        segments: Vec<Segment>,
        text: &str,
        origin: Position,
        system_id: Option<&str>,
        guard: &mut Vec<String>,
    ) -> Result<String> {
        let mut out = String::new();
        for segment in segments {
            match segment {
                Segment::Text(part) => out.push_str(&part),
                Segment::ParameterDecl { text: decl, .. } => out.push_str(&blank(&decl)),
                Segment::Section {
                    name,
                    offset,
                    start,
                    end,
                    body,
                } => {
                    let position = self.locate(text, offset, origin);
                    let keyword = match self.parameter_text(&name, position, guard)? {
                        Some((value, _)) => value,
                        None => {
                            warn!("parameter entity %{}; is not declared, keeping it as text", name);
                            format!("%{};", name)
                        }
                    };
                    if is_ignore_keyword(&keyword) {
                        let section: String = text.chars().skip(start).take(end - start).collect();
                        out.push_str(&blank(&section));
                    } else {
                        out.push_str("<![ ");
                        out.push_str(&keyword);
                        out.push_str(" [");
                        let expanded = self.expand_segments(body, text, origin, system_id, guard)?;
                        out.push_str(&expanded);
                    }
                }
                Segment::Reference { name, offset } => {
                    let position = self.locate(text, offset, origin);
                    let Some((value, value_id)) = self.parameter_text(&name, position, guard)? else {
                        warn!("parameter entity %{}; is not declared, keeping it as text", name);
                        out.push('%');
                        out.push_str(&name);
                        out.push(';');
                        continue;
                    };
                    let value_id = value_id.or(system_id.map(str::to_string));
                    let inner = scan_subset(&value);
                    guard.push(name);
                    self.declare_parameters(&inner, &value, position, value_id.as_deref())?;
                    let expanded = self.expand_segments(inner, &value, position, value_id.as_deref(), guard)?;
                    guard.pop();
                    out.push(' ');
                    out.push_str(&expanded);
                    out.push(' ');
                }
            }
        }
        Ok(out)
    }

    /// Replaces parameter entity references inside an entity value.
    fn substitute_literal(&mut self, value: &str, position: Position, guard: &mut Vec<String>) -> Result<String> {
        let chars: Vec<char> = value.chars().collect();
        let mut out = String::new();
        let mut i = 0;
        while i < chars.len() {
            if chars[i] != '%' {
                out.push(chars[i]);
                i += 1;
                continue;
            }
            let Some((name, end)) = reference_at(&chars, i) else {
                out.push('%');
                i += 1;
                continue;
            };
            match self.parameter_text(&name, position, guard)? {
                Some((text, _)) => {
                    guard.push(name);
                    let text = self.substitute_literal(&text, position, guard)?;
                    guard.pop();
                    out.push_str(&text);
                }
                None => {
                    warn!("parameter entity %{}; is not declared, keeping it as text", name);
                    out.extend(&chars[i..end]);
                }
            }
            i = end;
        }
        Ok(out)
    }

    fn parse_declarations(&mut self, text: &str, origin: Position, system_id: Option<String>) -> Result<()> {
        let source = CharSource::from_text_at(text, origin).with_system_id(system_id);
        self.stack.push(source)?;
        let mut sections = Vec::new();
        loop {
            self.skip_whitespace()?;
            let start = self.position();
            match self.peek()? {
                None => break,
                Some('<') => {
                    if self.looking_at("<!--")? {
                        self.comment(start)?;
                    } else if self.looking_at("<?")? {
                        let (target, data) = self.processing_instruction(start)?;
                        self.emit(&SaxEvent::ProcessingInstruction {
                            target: &target,
                            data: &data,
                        })?;
                    } else if self.looking_at("<![")? {
                        if self.conditional_section(start)? {
                            sections.push(start);
                        }
                    } else if self.looking_at("<!ENTITY")? {
                        self.entity_declaration(start)?;
                    } else if self.looking_at("<!ELEMENT")? {
                        self.element_declaration(start)?;
                    } else if self.looking_at("<!ATTLIST")? {
                        self.attlist_declaration(start)?;
                    } else if self.looking_at("<!NOTATION")? {
                        self.notation_declaration(start)?;
                    } else {
                        return self.fail(ErrorKind::MalformedDocType, start, description::DTD_UNEXPECTED);
                    }
                }
                Some(']') if !sections.is_empty() => {
                    if !self.looking_at("]]>")? {
                        return self.fail(ErrorKind::MalformedDocType, start, description::DTD_CONDITIONAL_END);
                    }
                    sections.pop();
                }
                Some('%') => {
                    self.next()?;
                    let name = self.read_name(ErrorKind::MalformedDocType)?;
                    self.expect(';', ErrorKind::MalformedDocType, description::REFERENCE_NO_SEMICOLON)?;
                    debug!("skipping unresolved parameter entity %{};", name);
                }
                Some(_) => return self.fail(ErrorKind::MalformedDocType, start, description::DTD_UNEXPECTED),
            }
        }
        if let Some(start) = sections.pop() {
            return self.fail(ErrorKind::UnexpectedEndOfInput, start, description::DTD_CONDITIONAL_END);
        }
        self.stack.pop();
        Ok(())
    }

    /// Reads the head of a conditional section after its `<![`.
    ///
    /// Returns true for an included section; ignored sections are skipped
    /// entirely.
    fn conditional_section(&mut self, start: Position) -> Result<bool> {
        let kind = ErrorKind::MalformedDocType;
        self.skip_whitespace()?;
        let position = self.position();
        let keyword = self.read_name(kind)?;
        self.skip_whitespace()?;
        self.expect('[', kind, description::DTD_CONDITIONAL)?;
        match keyword.as_str() {
            "INCLUDE" => Ok(true),
            "IGNORE" => {
                let mut depth = 1;
                loop {
                    match self.next()? {
                        None => {
                            return self.fail(ErrorKind::UnexpectedEndOfInput, start, description::DTD_CONDITIONAL_END);
                        }
                        Some('<') if self.looking_at("![")? => depth += 1,
                        Some(']') if self.looking_at("]>")? => {
                            depth -= 1;
                            if depth == 0 {
                                return Ok(false);
                            }
                        }
                        Some(_) => (),
                    }
                }
            }
            _ => self.fail(kind, position, description::DTD_CONDITIONAL),
        }
    }

    fn end_declaration(&mut self, kind: ErrorKind, start: Position) -> Result<()> {
        self.skip_whitespace()?;
        let position = self.position();
        match self.next()? {
            Some('>') => Ok(()),
            None => self.fail(ErrorKind::UnexpectedEndOfInput, start, description::EOF_IN_DECLARATION),
            Some(_) => self.fail(kind, position, description::DECL_END_EXPECTED),
        }
    }

    /// Reads an entity declaration after its `<!ENTITY`.
    fn entity_declaration(&mut self, start: Position) -> Result<()> {
        let kind = ErrorKind::MalformedEntityDeclaration;
        self.require_whitespace(kind)?;
        let entity_kind = if self.peek()? == Some('%') {
            self.next()?;
            self.require_whitespace(kind)?;
            EntityKind::Parameter
        } else {
            EntityKind::General
        };
        let name = self.read_name(kind)?;
        self.require_whitespace(kind)?;

        let origin = match self.peek()? {
            Some('"' | '\'') => {
                let value_start = self.position();
                let raw = self.quoted_literal(kind)?;
                let mut guard = Vec::new();
                let value = self.substitute_literal(&raw, value_start, &mut guard)?;
                match expand_char_refs(&value) {
                    Ok(value) => EntityOrigin::Internal(value),
                    Err((_, desc)) => return self.fail(ErrorKind::MalformedNumber, value_start, desc),
                }
            }
            _ => {
                let id_position = self.position();
                let id = self.external_id(kind, false, description::ENTITY_BAD_VALUE)?;
                let system_id = self.resolve_system_id(id.system_id.as_deref().unwrap_or_default(), id_position)?;
                let had_space = self.skip_whitespace()?;
                if had_space && self.looking_at("NDATA")? {
                    if entity_kind == EntityKind::Parameter {
                        return self.fail(kind, start, description::ENTITY_NDATA_PARAMETER);
                    }
                    self.require_whitespace(kind)?;
                    EntityOrigin::Unparsed {
                        public_id: id.public_id,
                        system_id,
                        notation: self.read_name(kind)?,
                    }
                } else {
                    EntityOrigin::External {
                        public_id: id.public_id,
                        system_id,
                    }
                }
            }
        };
        self.end_declaration(kind, start)?;
        self.register_entity(Entity {
            name,
            kind: entity_kind,
            origin,
        })
    }

    fn register_entity(&mut self, entity: Entity) -> Result<()> {
        if self.session.registry.has_entity(&entity.name, entity.kind) {
            debug!("entity {} is already declared, ignoring the new declaration", entity.name);
            return Ok(());
        }
        let parameter = entity.kind == EntityKind::Parameter;
        let event = match &entity.origin {
            EntityOrigin::Internal(value) => SaxEvent::InternalEntityDecl {
                name: &entity.name,
                value,
                parameter,
            },
            EntityOrigin::External { public_id, system_id } => SaxEvent::ExternalEntityDecl {
                name: &entity.name,
                public_id: public_id.as_deref(),
                system_id,
                parameter,
            },
            EntityOrigin::Unparsed {
                public_id,
                system_id,
                notation,
            } => SaxEvent::UnparsedEntityDecl {
                name: &entity.name,
                public_id: public_id.as_deref(),
                system_id,
                notation,
            },
        };
        self.emit(&event)?;
        trace!("declared entity {}", entity.name);
        self.session.registry.add_entity(entity);
        Ok(())
    }

    /// Reads an element declaration after its `<!ELEMENT`.
    fn element_declaration(&mut self, start: Position) -> Result<()> {
        let kind = ErrorKind::MalformedElementDeclaration;
        self.require_whitespace(kind)?;
        let name = self.read_name(kind)?;
        self.require_whitespace(kind)?;
        let spec_start = self.position();
        let mut raw = String::new();
        loop {
            match self.next()? {
                None => return self.fail(ErrorKind::UnexpectedEndOfInput, start, description::EOF_IN_DECLARATION),
                Some('>') => break,
                Some(c) => raw.push(c),
            }
        }
        let content = match parse_content_spec(&raw) {
            Ok(content) => content,
            Err(err) => {
                let position = self.locate(&raw, err.offset, spec_start);
                return self.fail(kind, position, err.description);
            }
        };
        if self.session.registry.element(&name).is_some() {
            debug!("element {} is already declared, ignoring the new declaration", name);
            return Ok(());
        }
        let decl = ElementDecl { name, content };
        self.emit(&SaxEvent::ElementDecl(&decl))?;
        trace!("declared element {} {}", decl.name, decl.content);
        self.session.registry.add_element(decl);
        Ok(())
    }

    /// Reads `(a|b|c)`, with names or with name tokens.
    fn token_group(&mut self, names: bool) -> Result<Vec<String>> {
        let kind = ErrorKind::MalformedAttributeDeclaration;
        self.expect('(', kind, description::ATTRIBUTE_BAD_ENUMERATION)?;
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace()?;
            let token = if names { self.read_name(kind)? } else { self.read_token(kind)? };
            tokens.push(token);
            self.skip_whitespace()?;
            let position = self.position();
            match self.next()? {
                Some('|') => (),
                Some(')') => return Ok(tokens),
                None => return self.fail(ErrorKind::UnexpectedEndOfInput, position, description::EOF_IN_DECLARATION),
                Some(_) => return self.fail(kind, position, description::ATTRIBUTE_BAD_ENUMERATION),
            }
        }
    }

    fn attribute_type(&mut self) -> Result<AttributeType> {
        let kind = ErrorKind::MalformedAttributeDeclaration;
        if self.peek()? == Some('(') {
            return Ok(AttributeType::Enumeration(self.token_group(false)?));
        }
        let position = self.position();
        let keyword = self.read_name(kind)?;
        Ok(match keyword.as_str() {
            "CDATA" => AttributeType::CData,
            "ID" => AttributeType::Id,
            "IDREF" => AttributeType::IdRef,
            "IDREFS" => AttributeType::IdRefs,
            "ENTITY" => AttributeType::Entity,
            "ENTITIES" => AttributeType::Entities,
            "NMTOKEN" => AttributeType::NmToken,
            "NMTOKENS" => AttributeType::NmTokens,
            "NOTATION" => {
                self.require_whitespace(kind)?;
                AttributeType::Notation(self.token_group(true)?)
            }
            _ => return self.fail(kind, position, format!("{}: {}", description::ATTRIBUTE_BAD_TYPE, keyword)),
        })
    }

    fn attribute_default(&mut self, attribute_type: &AttributeType) -> Result<(DefaultKind, Option<String>)> {
        let kind = ErrorKind::MalformedAttributeDeclaration;
        let position = self.position();
        let default_kind = match self.peek()? {
            Some('#') => {
                self.next()?;
                match self.read_name(kind)?.as_str() {
                    "REQUIRED" => return Ok((DefaultKind::Required, None)),
                    "IMPLIED" => return Ok((DefaultKind::Implied, None)),
                    "FIXED" => {
                        self.require_whitespace(kind)?;
                        DefaultKind::Fixed
                    }
                    _ => return self.fail(kind, position, description::ATTRIBUTE_BAD_DEFAULT),
                }
            }
            Some('"' | '\'') => DefaultKind::Value,
            None => return self.fail(ErrorKind::UnexpectedEndOfInput, position, description::EOF_IN_DECLARATION),
            Some(_) => return self.fail(kind, position, description::ATTRIBUTE_BAD_DEFAULT),
        };
        let mut value = self.attribute_value()?;
        if attribute_type.is_tokenized() {
            value = normalize_tokens(&value);
        }
        Ok((default_kind, Some(value)))
    }

    /// Reads an attribute list declaration after its `<!ATTLIST`.
    fn attlist_declaration(&mut self, start: Position) -> Result<()> {
        let kind = ErrorKind::MalformedAttributeDeclaration;
        self.require_whitespace(kind)?;
        let element = self.read_name(kind)?;
        loop {
            let had_space = self.skip_whitespace()?;
            let position = self.position();
            match self.peek()? {
                Some('>') => {
                    self.next()?;
                    return Ok(());
                }
                None => return self.fail(ErrorKind::UnexpectedEndOfInput, start, description::EOF_IN_DECLARATION),
                Some(_) if !had_space => return self.fail(kind, position, description::WHITESPACE_EXPECTED),
                Some(_) => (),
            }
            let name = self.read_name(kind)?;
            self.require_whitespace(kind)?;
            let attribute_type = self.attribute_type()?;
            self.require_whitespace(kind)?;
            let (default_kind, default_value) = self.attribute_default(&attribute_type)?;
            if self.session.registry.attribute(&element, &name).is_some() {
                debug!("attribute {} of {} is already declared, ignoring", name, element);
                continue;
            }
            let decl = AttributeDecl {
                element: element.clone(),
                name,
                attribute_type,
                default_kind,
                default_value,
            };
            self.emit(&SaxEvent::AttributeDecl(&decl))?;
            trace!("declared attribute {} of {}", decl.name, element);
            self.session.registry.add_attribute(decl);
        }
    }

    /// Reads a notation declaration after its `<!NOTATION`.
    fn notation_declaration(&mut self, start: Position) -> Result<()> {
        let kind = ErrorKind::MalformedNotationDeclaration;
        self.require_whitespace(kind)?;
        let name = self.read_name(kind)?;
        self.require_whitespace(kind)?;
        let id = self.external_id(kind, true, description::NOTATION_BAD_ID)?;
        self.end_declaration(kind, start)?;
        if self.session.registry.notation(&name).is_some() {
            debug!("notation {} is already declared, ignoring the new declaration", name);
            return Ok(());
        }
        let notation = Notation {
            name,
            public_id: id.public_id,
            system_id: id.system_id,
        };
        self.emit(&SaxEvent::NotationDecl(&notation))?;
        trace!("declared notation {}", notation.name);
        self.session.registry.add_notation(notation);
        Ok(())
    }
}

/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

//! Positioned Unicode scalars with backtracking.

mod location;
mod mark;
mod stack;

use std::io::Read;

use log::debug;

use crate::chars::is_xml_char;
use crate::encoding::{self, DecodeError, ScalarDecoder, XmlDeclaration};
use crate::error::{ErrorKind, Result, XmlError, description};
use mark::MarkLedger;

pub use location::DEFAULT_TAB_WIDTH;
pub use location::Position;
pub use stack::ParseProgress;
pub(crate) use stack::SourceStack;

/// What the start of a byte stream may declare.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Role {
    /// The document entity, which may start with an XML declaration.
    Document,
    /// An external entity or subset, which may start with a text declaration.
    External,
}

enum Backing {
    /// A byte stream which is not opened yet.
    Pending(Box<dyn Read>),
    Stream {
        decoder: ScalarDecoder,
        /// Scalar read after a carriage return which was not a line feed.
        lookahead: Option<char>,
    },
    /// Already decoded text, such as entity replacement text.
    Memory { chars: Vec<char>, next: usize },
    Closed,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Pending,
    Open,
    Closed,
}

/// A single input the parser reads scalars from.
///
/// Streams are decoded lazily; nothing is read before the first call to
/// [open](CharSource::open) or to a reading method. Every scalar handed out
/// goes through the mark ledger, so the grammar can set marks and rewind
/// to them regardless of what is underneath.
pub(crate) struct CharSource {
    backing: Backing,
    state: State,
    role: Role,
    encoding_label: Option<String>,
    encoding_name: &'static str,
    system_id: Option<String>,
    public_id: Option<String>,
    declaration: Option<XmlDeclaration>,
    ledger: MarkLedger,
    position: Position,
    tab_width: u32,
}

impl CharSource {
    fn with_backing(backing: Backing, state: State, role: Role) -> Self {
        CharSource {
            backing,
            state,
            role,
            encoding_label: None,
            encoding_name: "UTF-8",
            system_id: None,
            public_id: None,
            declaration: None,
            ledger: MarkLedger::new(),
            position: Position::new(),
            tab_width: DEFAULT_TAB_WIDTH,
        }
    }

    pub(crate) fn from_reader(reader: Box<dyn Read>, role: Role) -> Self {
        CharSource::with_backing(Backing::Pending(reader), State::Pending, role)
    }

    pub(crate) fn from_text(text: &str) -> Self {
        CharSource::with_backing(
            Backing::Memory {
                chars: text.chars().collect(),
                next: 0,
            },
            State::Open,
            Role::External,
        )
    }

    /// Memory source whose positions continue from `position`.
    pub(crate) fn from_text_at(text: &str, position: Position) -> Self {
        let mut source = CharSource::from_text(text);
        source.position = position;
        source
    }

    pub(crate) fn with_encoding(mut self, label: Option<String>) -> Self {
        self.encoding_label = label;
        self
    }

    pub(crate) fn with_system_id(mut self, system_id: Option<String>) -> Self {
        self.system_id = system_id;
        self
    }

    pub(crate) fn with_public_id(mut self, public_id: Option<String>) -> Self {
        self.public_id = public_id;
        self
    }

    pub(crate) fn with_tab_width(mut self, tab_width: u32) -> Self {
        self.tab_width = tab_width;
        self
    }

    pub(crate) fn position(&self) -> Position {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub(crate) fn encoding_name(&self) -> &'static str {
        self.encoding_name
    }

    pub(crate) fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    pub(crate) fn public_id(&self) -> Option<&str> {
        self.public_id.as_deref()
    }

    pub(crate) fn declaration(&self) -> Option<&XmlDeclaration> {
        self.declaration.as_ref()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    fn error(&self, kind: ErrorKind, desc: &'static str) -> XmlError {
        XmlError::new(kind, self.position, desc).with_system_id(self.system_id())
    }

    /// Detects the encoding and consumes the XML or text declaration.
    pub(crate) fn open(&mut self) -> Result<()> {
        if self.state != State::Pending {
            return Ok(());
        }
        let Backing::Pending(reader) = std::mem::replace(&mut self.backing, Backing::Closed) else {
            self.state = State::Open;
            return Ok(());
        };
        let opened = encoding::open_stream(
            reader,
            self.encoding_label.as_deref(),
            self.role == Role::External,
        )
        .map_err(|e| e.with_system_id(self.system_id.as_deref()))?;
        for c in opened.declaration_text.chars() {
            self.position.advance(c, self.tab_width);
        }
        debug!(
            "opened {} as {}",
            self.system_id.as_deref().unwrap_or("document"),
            opened.encoding.name()
        );
        self.encoding_name = opened.encoding.name();
        self.declaration = opened.declaration;
        self.backing = Backing::Stream {
            decoder: opened.decoder,
            lookahead: None,
        };
        self.state = State::Open;
        Ok(())
    }

    // Pulls the next scalar from the backing, with line ends normalised.
    fn decode(&mut self) -> Result<Option<char>> {
        self.open()?;
        let result = match &mut self.backing {
            Backing::Memory { chars, next } => {
                let c = chars.get(*next).copied();
                if c.is_some() {
                    *next += 1;
                }
                return Ok(c);
            }
            Backing::Pending(_) | Backing::Closed => return Ok(None),
            Backing::Stream { decoder, lookahead } => {
                let next = match lookahead.take() {
                    Some(c) => Ok(Some(c)),
                    None => decoder.next_char(),
                };
                match next {
                    Ok(Some('\r')) => match decoder.next_char() {
                        Ok(Some('\n')) | Ok(None) => Ok(Some('\n')),
                        Ok(Some(c)) => {
                            // may be another carriage return
                            *lookahead = Some(c);
                            Ok(Some('\n'))
                        }
                        Err(e) => Err(e),
                    },
                    other => other,
                }
            }
        };
        match result {
            Ok(Some(c)) if !is_xml_char(c) => {
                Err(self.error(ErrorKind::InvalidCharacter, description::CHAR_INVALID))
            }
            Ok(c) => Ok(c),
            Err(DecodeError::Io(e)) => {
                Err(XmlError::io(self.position, &e).with_system_id(self.system_id()))
            }
            Err(DecodeError::Malformed) => Err(self.error(
                ErrorKind::InvalidEncoding,
                description::ENCODING_INVALID_BYTES,
            )),
            Err(DecodeError::Truncated) => Err(self.error(
                ErrorKind::InvalidEncoding,
                description::ENCODING_TRUNCATED,
            )),
        }
    }

    /// Returns the next scalar without consuming it.
    pub(crate) fn peek(&mut self) -> Result<Option<char>> {
        if let Some(c) = self.ledger.peek_pending() {
            return Ok(Some(c));
        }
        match self.decode()? {
            Some(c) => {
                self.ledger.push_pending(self.position, c);
                Ok(Some(c))
            }
            None => Ok(None),
        }
    }

    /// Consumes the next scalar, `None` at the end of this source.
    pub(crate) fn read(&mut self) -> Result<Option<char>> {
        let (pos, c) = match self.ledger.next_pending() {
            Some(item) => item,
            None => match self.decode()? {
                Some(c) => (self.position, c),
                None => return Ok(None),
            },
        };
        self.ledger.record(pos, c);
        self.position = pos;
        self.position.advance(c, self.tab_width);
        Ok(Some(c))
    }

    pub(crate) fn mark_set(&mut self) {
        self.ledger.set(self.position);
    }

    pub(crate) fn mark_delete(&mut self) -> bool {
        self.ledger.delete()
    }

    pub(crate) fn mark_return(&mut self) -> bool {
        self.ledger.rewind(&mut self.position)
    }

    pub(crate) fn mark_reset(&mut self) -> bool {
        self.ledger.reset(&mut self.position)
    }

    pub(crate) fn mark_update(&mut self) -> bool {
        self.ledger.update(self.position)
    }

    pub(crate) fn mark_backup(&mut self, n: usize) -> usize {
        self.ledger.backup(n, &mut self.position)
    }

    pub(crate) fn mark_depth(&self) -> usize {
        self.ledger.depth()
    }

    /// Releases the backing. Closing twice is harmless.
    pub(crate) fn close(&mut self) {
        if self.state == State::Closed {
            return;
        }
        self.state = State::Closed;
        self.backing = Backing::Closed;
        self.ledger.clear();
    }
}

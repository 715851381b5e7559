/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

//! Encoding detection and the XML declaration.
//!
//! The first four bytes of a byte source give a guess about the encoding
//! (byte order marks, then zero byte patterns, then UTF-8). The guess is
//! good enough to read the ASCII-only `<?xml ... ?>` declaration, whose
//! `encoding` pseudo-attribute then picks the final decoder. A declaration
//! may rename a single byte encoding, but it cannot change the code unit
//! width the bytes already revealed.

mod declaration;
mod decoder;

use std::io::{self, Cursor, Read};

use log::debug;

pub use declaration::XmlDeclaration;
pub(crate) use declaration::parse_declaration;
pub(crate) use decoder::{DecodeError, ScalarDecoder};

use crate::error::{ErrorKind, Result, XmlError, description};
use crate::source::Position;

/// Longest XML declaration the detector is willing to scan, in code units.
const MAX_DECLARATION_UNITS: usize = 512;

/// A character encoding the parser can decode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Encoding {
    Utf8,
    Utf16Be,
    Utf16Le,
    Utf32Be,
    Utf32Le,
    /// Any other ASCII compatible encoding known to `encoding_rs`.
    Other(&'static encoding_rs::Encoding),
}

impl Encoding {
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Utf16Be => "UTF-16BE",
            Encoding::Utf16Le => "UTF-16LE",
            Encoding::Utf32Be => "UTF-32BE",
            Encoding::Utf32Le => "UTF-32LE",
            Encoding::Other(e) => e.name(),
        }
    }

    /// Size of one code unit in bytes.
    pub fn unit_width(&self) -> usize {
        match self {
            Encoding::Utf16Be | Encoding::Utf16Le => 2,
            Encoding::Utf32Be | Encoding::Utf32Le => 4,
            Encoding::Utf8 | Encoding::Other(_) => 1,
        }
    }

    fn is_big_endian(&self) -> bool {
        matches!(self, Encoding::Utf16Be | Encoding::Utf32Be)
    }

    fn bom(&self) -> &'static [u8] {
        match self {
            Encoding::Utf8 => &[0xef, 0xbb, 0xbf],
            Encoding::Utf16Be => &[0xfe, 0xff],
            Encoding::Utf16Le => &[0xff, 0xfe],
            Encoding::Utf32Be => &[0x00, 0x00, 0xfe, 0xff],
            Encoding::Utf32Le => &[0xff, 0xfe, 0x00, 0x00],
            Encoding::Other(_) => &[],
        }
    }

    pub(crate) fn standard(&self) -> Option<&'static encoding_rs::Encoding> {
        match self {
            Encoding::Utf8 => Some(encoding_rs::UTF_8),
            Encoding::Utf16Be => Some(encoding_rs::UTF_16BE),
            Encoding::Utf16Le => Some(encoding_rs::UTF_16LE),
            Encoding::Utf32Be | Encoding::Utf32Le => None,
            Encoding::Other(e) => Some(e),
        }
    }
}

/// What an encoding label names.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Label {
    Exact(Encoding),
    /// UTF-16 with the byte order left to the input.
    AnyUtf16,
    /// UTF-32 with the byte order left to the input.
    AnyUtf32,
}

impl Label {
    fn unit_width(&self) -> usize {
        match self {
            Label::Exact(e) => e.unit_width(),
            Label::AnyUtf16 => 2,
            Label::AnyUtf32 => 4,
        }
    }
}

pub(crate) fn parse_label(label: &str) -> Option<Label> {
    let upper = label.trim().to_ascii_uppercase();
    match upper.as_str() {
        "UTF-32" | "UCS-4" | "ISO-10646-UCS-4" => return Some(Label::AnyUtf32),
        "UTF-32BE" => return Some(Label::Exact(Encoding::Utf32Be)),
        "UTF-32LE" => return Some(Label::Exact(Encoding::Utf32Le)),
        "UTF-16" | "UCS-2" | "ISO-10646-UCS-2" => return Some(Label::AnyUtf16),
        _ => (),
    }
    let standard = encoding_rs::Encoding::for_label_no_replacement(upper.as_bytes())?;
    if standard == encoding_rs::UTF_8 {
        Some(Label::Exact(Encoding::Utf8))
    } else if standard == encoding_rs::UTF_16BE {
        Some(Label::Exact(Encoding::Utf16Be))
    } else if standard == encoding_rs::UTF_16LE {
        Some(Label::Exact(Encoding::Utf16Le))
    } else if standard.is_single_byte() || standard.is_ascii_compatible() {
        Some(Label::Exact(Encoding::Other(standard)))
    } else {
        None
    }
}

/// Result of looking at the first bytes of an input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Detected {
    pub encoding: Encoding,
    /// Length of the byte order mark, zero if there is none.
    pub bom_len: usize,
}

/// Guesses the encoding from (up to) the first four bytes of an input.
pub fn detect(bytes: &[u8]) -> Detected {
    let b = |i: usize| bytes.get(i).copied();

    // byte order marks, four byte ones first
    match (b(0), b(1), b(2), b(3)) {
        (Some(0x00), Some(0x00), Some(0xfe), Some(0xff)) => {
            return Detected { encoding: Encoding::Utf32Be, bom_len: 4 };
        }
        (Some(0xff), Some(0xfe), Some(0x00), Some(0x00)) => {
            return Detected { encoding: Encoding::Utf32Le, bom_len: 4 };
        }
        (Some(0xfe), Some(0xff), _, _) => {
            return Detected { encoding: Encoding::Utf16Be, bom_len: 2 };
        }
        (Some(0xff), Some(0xfe), _, _) => {
            return Detected { encoding: Encoding::Utf16Le, bom_len: 2 };
        }
        (Some(0xef), Some(0xbb), Some(0xbf), _) => {
            return Detected { encoding: Encoding::Utf8, bom_len: 3 };
        }
        _ => (),
    }

    // zero byte patterns of an ASCII character encoded without a BOM
    let encoding = match (b(0), b(1), b(2), b(3)) {
        (Some(0), Some(0), Some(0), Some(x)) if x != 0 => Encoding::Utf32Be,
        (Some(x), Some(0), Some(0), Some(0)) if x != 0 => Encoding::Utf32Le,
        (Some(0), Some(x), Some(0), Some(y)) if x != 0 && y != 0 => Encoding::Utf16Be,
        (Some(x), Some(0), Some(y), Some(0)) if x != 0 && y != 0 => Encoding::Utf16Le,
        (Some(0), Some(x), None, None) if x != 0 => Encoding::Utf16Be,
        (Some(x), Some(0), None, None) if x != 0 => Encoding::Utf16Le,
        _ => Encoding::Utf8,
    };
    Detected { encoding, bom_len: 0 }
}

/// Decides the final encoding from the detected layout and the declared label.
pub(crate) fn reconcile(
    detected: Detected,
    declared: Option<&str>,
) -> std::result::Result<Encoding, &'static str> {
    let Some(label) = declared else {
        return Ok(detected.encoding);
    };
    let Some(label) = parse_label(label) else {
        return Err(description::ENCODING_UNKNOWN);
    };
    if label.unit_width() != detected.encoding.unit_width() {
        return Err(description::ENCODING_WIDTH_MISMATCH);
    }
    match label {
        Label::AnyUtf16 | Label::AnyUtf32 => Ok(detected.encoding),
        Label::Exact(encoding) => {
            if encoding.unit_width() > 1 {
                if encoding.is_big_endian() != detected.encoding.is_big_endian() {
                    return Err(description::ENCODING_WIDTH_MISMATCH);
                }
                Ok(detected.encoding)
            } else if detected.bom_len > 0 && encoding != Encoding::Utf8 {
                // a UTF-8 byte order mark pins UTF-8
                Err(description::ENCODING_WIDTH_MISMATCH)
            } else {
                Ok(encoding)
            }
        }
    }
}

fn resolve_override(label: &str, detected: Detected) -> std::result::Result<Encoding, &'static str> {
    match parse_label(label) {
        None => Err(description::ENCODING_UNKNOWN),
        Some(Label::Exact(e)) => Ok(e),
        Some(Label::AnyUtf16) => Ok(match detected.encoding {
            Encoding::Utf16Le => Encoding::Utf16Le,
            _ => Encoding::Utf16Be,
        }),
        Some(Label::AnyUtf32) => Ok(match detected.encoding {
            Encoding::Utf32Le => Encoding::Utf32Le,
            _ => Encoding::Utf32Be,
        }),
    }
}

/// A byte source after encoding detection.
pub(crate) struct OpenedStream {
    pub(crate) decoder: ScalarDecoder,
    pub(crate) encoding: Encoding,
    pub(crate) declaration: Option<XmlDeclaration>,
    /// Scalars of the declaration, for position bookkeeping.
    pub(crate) declaration_text: String,
}

/// Raw bytes read ahead of the decoder.
struct Prefix {
    reader: Box<dyn Read>,
    bytes: Vec<u8>,
    eof: bool,
}

impl Prefix {
    fn fill_to(&mut self, len: usize) -> io::Result<()> {
        let mut chunk = [0u8; 64];
        while self.bytes.len() < len && !self.eof {
            let want = (len - self.bytes.len()).min(chunk.len());
            match self.reader.read(&mut chunk[..want]) {
                Ok(0) => self.eof = true,
                Ok(n) => self.bytes.extend_from_slice(&chunk[..n]),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Reads the code unit `index` (after `start`) as an ASCII character.
    ///
    /// Returns `Ok(None)` at the end of input and `Some('\u{fffd}')` for a
    /// unit which is not ASCII, since a declaration never contains one.
    fn unit(&mut self, start: usize, index: usize, encoding: Encoding) -> io::Result<Option<char>> {
        let width = encoding.unit_width();
        let offset = start + index * width;
        self.fill_to(offset + width)?;
        if self.bytes.len() < offset + width {
            return Ok(None);
        }
        let unit = &self.bytes[offset..offset + width];
        let (ascii, rest) = if encoding.is_big_endian() {
            (unit[width - 1], &unit[..width - 1])
        } else {
            (unit[0], &unit[1..])
        };
        if ascii < 0x80 && rest.iter().all(|&b| b == 0) {
            Ok(Some(ascii as char))
        } else {
            Ok(Some('\u{fffd}'))
        }
    }
}

/// Detects the encoding of `reader`, consumes the byte order mark and the
/// XML (or text) declaration, and returns a decoder for the rest.
pub(crate) fn open_stream(
    reader: Box<dyn Read>,
    override_label: Option<&str>,
    is_external: bool,
) -> Result<OpenedStream> {
    let start = Position::new();
    let io_err = |e: io::Error| XmlError::io(start, &e);
    let encoding_err =
        |desc: &'static str| XmlError::new(ErrorKind::UnsupportedEncoding, start, desc);

    let mut prefix = Prefix {
        reader,
        bytes: Vec::with_capacity(64),
        eof: false,
    };
    prefix.fill_to(4).map_err(io_err)?;
    let detected = detect(&prefix.bytes);

    let scan_encoding = match override_label {
        None => detected.encoding,
        Some(label) => resolve_override(label, detected).map_err(encoding_err)?,
    };
    let bom_len = if override_label.is_none() {
        detected.bom_len
    } else if detected.bom_len > 0 && prefix.bytes.starts_with(scan_encoding.bom()) {
        scan_encoding.bom().len()
    } else {
        0
    };
    debug!(
        "detected encoding {} (byte order mark: {} bytes)",
        scan_encoding.name(),
        bom_len
    );

    // "<?xml" followed by whitespace starts a declaration
    let mut head = String::new();
    for i in 0..6 {
        match prefix.unit(bom_len, i, scan_encoding).map_err(io_err)? {
            Some(c) => head.push(c),
            None => break,
        }
    }
    let has_declaration = head.len() == 6
        && head.is_ascii()
        && head.starts_with("<?")
        && head[2..5].eq_ignore_ascii_case("xml")
        && matches!(head.as_bytes()[5], b' ' | b'\t' | b'\r' | b'\n');

    let mut declaration = None;
    let mut declaration_text = String::new();
    let mut units = 0;
    if has_declaration {
        loop {
            if units >= MAX_DECLARATION_UNITS {
                return Err(XmlError::new(
                    ErrorKind::MalformedXmlDeclaration,
                    start,
                    description::XML_DECL_NO_END,
                ));
            }
            match prefix.unit(bom_len, units, scan_encoding).map_err(io_err)? {
                None => {
                    return Err(XmlError::new(
                        ErrorKind::UnexpectedEndOfInput,
                        start,
                        description::XML_DECL_NO_END,
                    ));
                }
                Some(c) => {
                    declaration_text.push(c);
                    units += 1;
                    if declaration_text.ends_with("?>") {
                        break;
                    }
                }
            }
        }
        if declaration_text.contains('\u{fffd}') {
            let offset = declaration_text.chars().take_while(|&c| c != '\u{fffd}').count();
            return Err(XmlError::new(
                ErrorKind::InvalidCharacter,
                offset_position(&declaration_text, offset),
                description::CHAR_INVALID,
            ));
        }
        let parsed = parse_declaration(&declaration_text, is_external).map_err(|e| {
            XmlError::new(
                ErrorKind::MalformedXmlDeclaration,
                offset_position(&declaration_text, e.offset),
                e.description,
            )
        })?;
        declaration = Some(parsed);
    }

    let encoding = match override_label {
        Some(_) => scan_encoding,
        None => {
            let declared = declaration.as_ref().and_then(|d| d.encoding.as_deref());
            reconcile(detected, declared).map_err(encoding_err)?
        }
    };
    if encoding != scan_encoding {
        debug!("declaration switches encoding to {}", encoding.name());
    }

    let consumed = bom_len + units * scan_encoding.unit_width();
    let rest = prefix.bytes.split_off(consumed.min(prefix.bytes.len()));
    let input: Box<dyn Read> = Box::new(Cursor::new(rest).chain(prefix.reader));
    Ok(OpenedStream {
        decoder: ScalarDecoder::new(input, encoding),
        encoding,
        declaration,
        declaration_text,
    })
}

fn offset_position(text: &str, offset: usize) -> Position {
    let mut pos = Position::new();
    for c in text.chars().take(offset) {
        pos.advance(c, 0);
    }
    pos
}

#[cfg(test)]
mod tests;

/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use crate::chars::{is_name_start_char, is_xml_char};
use crate::error::{ErrorKind, Result, description};
use crate::handler::SaxHandler;
use crate::source::Position;

use super::Engine;

/// A reference after the `&`.
#[derive(Debug, Eq, PartialEq)]
pub(crate) enum Reference {
    Char(char),
    Entity(String),
}

/// The five entities every XML processor knows.
pub(crate) fn predefined(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        _ => None,
    }
}

fn bad_digit(hex: bool) -> &'static str {
    if hex {
        description::REFERENCE_BAD_HEX
    } else {
        description::REFERENCE_BAD_DECIMAL
    }
}

/// Converts the digits of `&#...;` or `&#x...;`.
pub(crate) fn char_from_digits(digits: &str, hex: bool) -> std::result::Result<char, &'static str> {
    let radix = if hex { 16 } else { 10 };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(bad_digit(hex));
    }
    let value = u32::from_str_radix(digits, radix).map_err(|_| description::REFERENCE_BAD_CHAR)?;
    match char::from_u32(value) {
        Some(c) if is_xml_char(c) => Ok(c),
        _ => Err(description::REFERENCE_BAD_CHAR),
    }
}

/// Replaces character references in an entity value.
///
/// Entity references are left alone; they are expanded where the entity
/// is used. Returns the scalar offset of the first bad reference on error.
pub(crate) fn expand_char_refs(text: &str) -> std::result::Result<String, (usize, &'static str)> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '&' && chars.get(i + 1) == Some(&'#') {
            let hex = chars.get(i + 2) == Some(&'x');
            let digits_start = if hex { i + 3 } else { i + 2 };
            let Some(len) = chars[digits_start..].iter().position(|&c| c == ';') else {
                return Err((i, description::EOF_IN_REFERENCE));
            };
            let digits: String = chars[digits_start..digits_start + len].iter().collect();
            out.push(char_from_digits(&digits, hex).map_err(|d| (i, d))?);
            i = digits_start + len + 1;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    Ok(out)
}

impl<H: SaxHandler + ?Sized> Engine<'_, H> {
    /// Reads a reference whose `&` (at `start`) is already consumed.
    pub(crate) fn read_reference(&mut self, start: Position) -> Result<Reference> {
        if self.peek()? == Some('#') {
            self.next()?;
            let hex = if self.peek()? == Some('x') {
                self.next()?;
                true
            } else {
                false
            };
            let radix = if hex { 16 } else { 10 };
            let mut digits = String::new();
            loop {
                match self.next()? {
                    None => {
                        return self.fail(
                            ErrorKind::UnexpectedEndOfInput,
                            start,
                            description::EOF_IN_REFERENCE,
                        );
                    }
                    Some(';') => break,
                    Some(c) if c.is_digit(radix) => digits.push(c),
                    Some(_) => return self.fail(ErrorKind::MalformedNumber, start, bad_digit(hex)),
                }
            }
            return match char_from_digits(&digits, hex) {
                Ok(c) => Ok(Reference::Char(c)),
                Err(desc) => self.fail(ErrorKind::MalformedNumber, start, desc),
            };
        }

        match self.peek()? {
            None => {
                return self.fail(
                    ErrorKind::UnexpectedEndOfInput,
                    start,
                    description::EOF_IN_REFERENCE,
                );
            }
            Some(c) if is_name_start_char(c) => (),
            Some(_) => {
                return self.fail(ErrorKind::InvalidCharacter, start, description::REFERENCE_NO_NAME);
            }
        }
        let name = self.read_name(ErrorKind::InvalidCharacter)?;
        match self.next()? {
            Some(';') => Ok(Reference::Entity(name)),
            None => self.fail(
                ErrorKind::UnexpectedEndOfInput,
                start,
                description::EOF_IN_REFERENCE,
            ),
            Some(_) => self.fail(
                ErrorKind::InvalidCharacter,
                start,
                description::REFERENCE_NO_SEMICOLON,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_refs() {
        assert_eq!(char_from_digits("60", false), Ok('<'));
        assert_eq!(char_from_digits("3c", true), Ok('<'));
        assert_eq!(char_from_digits("1D11E", true), Ok('𝄞'));
        assert_eq!(char_from_digits("", false), Err(description::REFERENCE_BAD_DECIMAL));
        assert_eq!(char_from_digits("1f", false), Err(description::REFERENCE_BAD_DECIMAL));
        assert_eq!(char_from_digits("g", true), Err(description::REFERENCE_BAD_HEX));
        assert_eq!(char_from_digits("0", false), Err(description::REFERENCE_BAD_CHAR));
        assert_eq!(char_from_digits("D800", true), Err(description::REFERENCE_BAD_CHAR));
        assert_eq!(
            char_from_digits("99999999999", false),
            Err(description::REFERENCE_BAD_CHAR)
        );
    }

    #[test]
    fn entity_values() {
        assert_eq!(expand_char_refs("a&#38;b&amp;c&#x3E;"), Ok("a&b&amp;c>".to_string()));
        assert_eq!(expand_char_refs("&#38"), Err((0, description::EOF_IN_REFERENCE)));
        assert_eq!(expand_char_refs("ab&#1;"), Err((2, description::REFERENCE_BAD_CHAR)));
    }

    #[test]
    fn predefined_entities() {
        assert_eq!(predefined("quot"), Some('"'));
        assert_eq!(predefined("nbsp"), None);
    }
}

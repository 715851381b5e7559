/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

//! Property tests over generated documents.

use std::io::Read;

use iksxml::{HandlerError, ParserConfig, SaxEvent, SaxHandler, XmlParser};
use proptest::prelude::*;

/// Keeps a printable trace of every event.
#[derive(Default)]
struct Recorder {
    events: Vec<String>,
}

impl SaxHandler for Recorder {
    fn handle_event(&mut self, event: &SaxEvent) -> Result<(), HandlerError> {
        self.events.push(format!("{:?}", event));
        Ok(())
    }
}

/// Checks that every end tag closes the innermost open element.
#[derive(Default)]
struct Balance {
    open: Vec<String>,
    elements: usize,
    max_depth: usize,
}

impl SaxHandler for Balance {
    fn handle_event(&mut self, event: &SaxEvent) -> Result<(), HandlerError> {
        match event {
            SaxEvent::BeginElement { name, .. } => {
                self.open.push(name.name.clone());
                self.elements += 1;
                self.max_depth = self.max_depth.max(self.open.len());
            }
            SaxEvent::EndElement { name } => match self.open.pop() {
                Some(open) if open == name.name => (),
                other => {
                    return Err(HandlerError::new(format!("{} closes {:?}", name, other)));
                }
            },
            _ => (),
        }
        Ok(())
    }
}

/// Hands out the input a few bytes at a time.
struct Trickle {
    data: Vec<u8>,
    pos: usize,
    step: usize,
}

impl Read for Trickle {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

fn events_of_bytes(bytes: &[u8]) -> Vec<String> {
    let mut recorder = Recorder::default();
    let mut parser = XmlParser::new(ParserConfig::new());
    if let Err(err) = parser.parse_bytes(&mut recorder, bytes) {
        panic!("parse failed: {}", err);
    }
    recorder.events
}

fn utf16(text: &str, big_endian: bool, bom: bool) -> Vec<u8> {
    let mut out = Vec::new();
    let units = bom.then_some(0xfeff).into_iter().chain(text.encode_utf16());
    for unit in units {
        if big_endian {
            out.extend_from_slice(&unit.to_be_bytes());
        } else {
            out.extend_from_slice(&unit.to_le_bytes());
        }
    }
    out
}

fn utf32(text: &str, big_endian: bool, bom: bool) -> Vec<u8> {
    let mut out = Vec::new();
    let scalars = bom.then_some(0xfeff).into_iter().chain(text.chars().map(u32::from));
    for scalar in scalars {
        if big_endian {
            out.extend_from_slice(&scalar.to_be_bytes());
        } else {
            out.extend_from_slice(&scalar.to_le_bytes());
        }
    }
    out
}

fn element() -> impl Strategy<Value = String> {
    let leaf = "[a-w][a-z0-9]{0,6}".prop_map(|name| format!("<{}/>", name));
    leaf.prop_recursive(4, 32, 4, |inner| {
        ("[a-w][a-z0-9]{0,6}", prop::collection::vec(inner, 0..4), "[a-z ]{0,5}")
            .prop_map(|(name, children, text)| format!("<{0}>{1}{2}</{0}>", name, text, children.concat()))
    })
}

fn xml_char() -> impl Strategy<Value = char> {
    any::<char>().prop_filter("not an XML character", |&c| {
        matches!(c, '\u{20}'..='\u{d7ff}' | '\u{e000}'..='\u{fffd}' | '\u{10000}'..='\u{10ffff}')
    })
}

proptest! {
    /// The same document gives the same events in every Unicode encoding.
    #[test]
    fn encodings_agree(text in "[a-zA-Z0-9 àéü漢😀]{0,40}", value in "[a-z 漢]{0,10}") {
        let doc = format!("<doc a='{}'>{}<e/></doc>", value, text);
        let expected = events_of_bytes(doc.as_bytes());

        let mut with_bom = vec![0xef, 0xbb, 0xbf];
        with_bom.extend_from_slice(doc.as_bytes());
        prop_assert_eq!(&events_of_bytes(&with_bom), &expected);

        for big_endian in [false, true] {
            for bom in [false, true] {
                prop_assert_eq!(&events_of_bytes(&utf16(&doc, big_endian, bom)), &expected);
                prop_assert_eq!(&events_of_bytes(&utf32(&doc, big_endian, bom)), &expected);
            }
        }
    }

    /// Events do not depend on how the reader splits the bytes.
    #[test]
    fn read_size_does_not_matter(body in element(), step in 1usize..8) {
        let doc = format!("<?xml version='1.0' encoding='UTF-16'?>{}", body);
        let bytes = utf16(&doc, false, true);
        let expected = events_of_bytes(&bytes);

        let mut recorder = Recorder::default();
        let reader = Trickle { data: bytes, pos: 0, step };
        XmlParser::new(ParserConfig::new()).parse_reader(&mut recorder, reader).unwrap();
        prop_assert_eq!(recorder.events, expected);
    }

    /// Every start tag gets a matching end tag.
    #[test]
    fn tags_balance(body in element()) {
        let mut balance = Balance::default();
        XmlParser::new(ParserConfig::new()).parse_str(&mut balance, &body).unwrap();
        prop_assert!(balance.open.is_empty());
        prop_assert_eq!(balance.elements, body.matches('<').count() - body.matches("</").count());
    }

    /// A character reference stands for the character it names.
    #[test]
    fn char_refs_round_trip(c in xml_char()) {
        let doc = format!("<a b='&#{};'>&#x{:X};</a>", u32::from(c), u32::from(c));
        let mut recorder = Recorder::default();
        XmlParser::new(ParserConfig::new()).parse_str(&mut recorder, &doc).unwrap();
        let text = format!("{:?}", SaxEvent::Text(&c.to_string()));
        prop_assert!(recorder.events.contains(&text), "{:?}", recorder.events);
        let value = format!("{:?}", c.to_string());
        prop_assert!(recorder.events[1].contains(&value), "{:?}", recorder.events);
    }
}

/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

//! Element content models.

use std::fmt::Display;

use crate::chars::{is_name_char, is_name_start_char, is_whitespace};
use crate::error::description;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Multiplicity {
    Once,
    /// `?`
    Optional,
    /// `*`
    ZeroOrMore,
    /// `+`
    OneOrMore,
}

impl Multiplicity {
    fn from_char(c: char) -> Option<Multiplicity> {
        match c {
            '?' => Some(Multiplicity::Optional),
            '*' => Some(Multiplicity::ZeroOrMore),
            '+' => Some(Multiplicity::OneOrMore),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Multiplicity::Once => "",
            Multiplicity::Optional => "?",
            Multiplicity::ZeroOrMore => "*",
            Multiplicity::OneOrMore => "+",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Conjunction {
    /// `,` sequence
    And,
    /// `|` choice
    Or,
}

/// A node of a content model tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Particle {
    Element {
        name: String,
        multiplicity: Multiplicity,
    },
    /// `#PCDATA`, only ever the first child of a mixed content group.
    PCData,
    Group {
        conjunction: Conjunction,
        multiplicity: Multiplicity,
        children: Vec<Particle>,
    },
}

impl Display for Particle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Particle::Element { name, multiplicity } => {
                write!(f, "{}{}", name, multiplicity.as_str())
            }
            Particle::PCData => f.write_str("#PCDATA"),
            Particle::Group {
                conjunction,
                multiplicity,
                children,
            } => {
                let separator = match conjunction {
                    Conjunction::And => ",",
                    Conjunction::Or => "|",
                };
                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(separator)?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, "){}", multiplicity.as_str())
            }
        }
    }
}

/// What an element declaration allows as content.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ContentSpec {
    Empty,
    Any,
    /// `(#PCDATA)` or `(#PCDATA)*`
    PCDataOnly,
    /// Element content, or mixed content with element names.
    Model(Particle),
}

impl Display for ContentSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentSpec::Empty => f.write_str("EMPTY"),
            ContentSpec::Any => f.write_str("ANY"),
            ContentSpec::PCDataOnly => f.write_str("(#PCDATA)"),
            ContentSpec::Model(particle) => write!(f, "{}", particle),
        }
    }
}

/// A content specification syntax problem, with its scalar offset.
#[derive(Debug, Eq, PartialEq)]
pub(crate) struct ContentError {
    pub(crate) offset: usize,
    pub(crate) description: &'static str,
}

struct ContentParser {
    chars: Vec<char>,
    pos: usize,
}

type ParseResult<T> = Result<T, ContentError>;

impl ContentParser {
    fn fail<T>(&self, description: &'static str) -> ParseResult<T> {
        Err(ContentError {
            offset: self.pos,
            description,
        })
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(is_whitespace) {
            self.pos += 1;
        }
    }

    fn looking_at(&self, word: &str) -> bool {
        let mut i = self.pos;
        for c in word.chars() {
            if self.chars.get(i) != Some(&c) {
                return false;
            }
            i += 1;
        }
        true
    }

    fn name(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some(c) if is_name_start_char(c) => (),
            _ => return self.fail(description::NAME_EXPECTED),
        }
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn multiplicity(&mut self) -> Multiplicity {
        match self.peek().and_then(Multiplicity::from_char) {
            Some(m) => {
                self.pos += 1;
                m
            }
            None => Multiplicity::Once,
        }
    }

    fn content_spec(&mut self) -> ParseResult<ContentSpec> {
        self.skip_whitespace();
        let spec = if self.looking_at("EMPTY") {
            self.pos += 5;
            ContentSpec::Empty
        } else if self.looking_at("ANY") {
            self.pos += 3;
            ContentSpec::Any
        } else if self.peek() == Some('(') {
            self.pos += 1;
            self.skip_whitespace();
            if self.looking_at("#PCDATA") {
                self.pos += 7;
                self.mixed()?
            } else {
                ContentSpec::Model(self.group()?)
            }
        } else {
            return self.fail(description::ELEMENT_BAD_CONTENT);
        };
        self.skip_whitespace();
        if self.pos < self.chars.len() {
            return self.fail(description::ELEMENT_BAD_CONTENT);
        }
        Ok(spec)
    }

    // after "(#PCDATA"
    fn mixed(&mut self) -> ParseResult<ContentSpec> {
        let mut children = vec![Particle::PCData];
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('|') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    if self.looking_at("#PCDATA") {
                        return self.fail(description::ELEMENT_PCDATA_POSITION);
                    }
                    let name = self.name()?;
                    if self.peek().and_then(Multiplicity::from_char).is_some() {
                        return self.fail(description::ELEMENT_MIXED_MULTIPLICITY);
                    }
                    children.push(Particle::Element {
                        name,
                        multiplicity: Multiplicity::Once,
                    });
                }
                Some(',') => return self.fail(description::ELEMENT_PCDATA_SEQUENCE),
                Some(')') => {
                    self.pos += 1;
                    break;
                }
                _ => return self.fail(description::ELEMENT_GROUP_END),
            }
        }
        if children.len() == 1 {
            if self.peek() == Some('*') {
                self.pos += 1;
            }
            return Ok(ContentSpec::PCDataOnly);
        }
        if self.peek() != Some('*') {
            return self.fail(description::ELEMENT_MIXED_STAR);
        }
        self.pos += 1;
        Ok(ContentSpec::Model(Particle::Group {
            conjunction: Conjunction::Or,
            multiplicity: Multiplicity::ZeroOrMore,
            children,
        }))
    }

    // after "(", whitespace skipped
    fn group(&mut self) -> ParseResult<Particle> {
        let mut children = Vec::new();
        let mut conjunction = None;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('(') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    if self.looking_at("#PCDATA") {
                        return self.fail(description::ELEMENT_PCDATA_POSITION);
                    }
                    children.push(self.group()?);
                }
                Some(')') if children.is_empty() => {
                    return self.fail(description::ELEMENT_EMPTY_GROUP);
                }
                Some('#') if self.looking_at("#PCDATA") => {
                    return self.fail(description::ELEMENT_PCDATA_POSITION);
                }
                _ => {
                    let name = self.name()?;
                    let multiplicity = self.multiplicity();
                    children.push(Particle::Element { name, multiplicity });
                }
            }
            self.skip_whitespace();
            let next = match self.peek() {
                Some(',') => Conjunction::And,
                Some('|') => Conjunction::Or,
                Some(')') => {
                    self.pos += 1;
                    break;
                }
                _ => return self.fail(description::ELEMENT_GROUP_END),
            };
            match conjunction {
                None => conjunction = Some(next),
                Some(c) if c != next => {
                    return self.fail(description::ELEMENT_MIXED_CONJUNCTION);
                }
                Some(_) => (),
            }
            self.pos += 1;
        }
        let multiplicity = self.multiplicity();
        Ok(Particle::Group {
            conjunction: conjunction.unwrap_or(Conjunction::And),
            multiplicity,
            children,
        })
    }
}

/// Parses the content specification of an `<!ELEMENT>` declaration.
pub(crate) fn parse_content_spec(text: &str) -> Result<ContentSpec, ContentError> {
    let mut parser = ContentParser {
        chars: text.chars().collect(),
        pos: 0,
    };
    parser.content_spec()
}

/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::fmt::Display;

/// Default distance between tab stops.
pub const DEFAULT_TAB_WIDTH: u32 = 8;

/// A position in a character source.
///
/// Lines and columns both start from 1. The column counts scalars
/// since the last newline, with tabs rounded up to the next tab stop.
///
/// Positions are plain values: the parser hands out copies and
/// never shares a live counter.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Position {
    /// Line number, starting from 1.
    pub line: u32,
    /// Column number, starting from 1.
    pub column: u32,
}

impl Position {
    /// Creates a position at the beginning of a source.
    pub fn new() -> Self {
        Position { line: 1, column: 1 }
    }

    pub fn at(line: u32, column: u32) -> Self {
        Position { line, column }
    }

    pub(crate) fn advance(&mut self, c: char, tab_width: u32) {
        match c {
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            '\t' if tab_width > 0 => {
                self.column = ((self.column - 1) / tab_width + 1) * tab_width + 1;
            }
            _ => self.column += 1,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::new()
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

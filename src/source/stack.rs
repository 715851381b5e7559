/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use log::debug;

use super::{CharSource, Position};
use crate::error::Result;

/// Read-only view of a running parse for other threads.
///
/// The parser updates it after every consumed scalar, so a monitoring
/// thread can report how far a long document has been read.
#[derive(Debug)]
pub struct ParseProgress {
    line: AtomicU32,
    column: AtomicU32,
    depth: AtomicUsize,
}

impl ParseProgress {
    pub fn new() -> Self {
        ParseProgress {
            line: AtomicU32::new(1),
            column: AtomicU32::new(1),
            depth: AtomicUsize::new(0),
        }
    }

    /// Position in the source being read right now.
    pub fn position(&self) -> Position {
        Position::at(
            self.line.load(Ordering::Relaxed),
            self.column.load(Ordering::Relaxed),
        )
    }

    /// Number of suspended sources (entities and subsets being read).
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    fn update(&self, position: Position, depth: usize) {
        self.line.store(position.line, Ordering::Relaxed);
        self.column.store(position.column, Ordering::Relaxed);
        self.depth.store(depth, Ordering::Relaxed);
    }
}

impl Default for ParseProgress {
    fn default() -> Self {
        ParseProgress::new()
    }
}

/// The active source plus the sources it interrupted.
///
/// Exhausting the active source never resumes a suspended one by itself;
/// the grammar decides with [pop](SourceStack::pop) when an inclusion ends.
pub(crate) struct SourceStack {
    active: Option<CharSource>,
    suspended: Vec<(Position, CharSource)>,
    progress: Arc<ParseProgress>,
}

impl SourceStack {
    pub(crate) fn new(progress: Arc<ParseProgress>) -> Self {
        SourceStack {
            active: None,
            suspended: Vec::new(),
            progress,
        }
    }

    /// Opens `source` and makes it active, suspending the current one.
    pub(crate) fn push(&mut self, mut source: CharSource) -> Result<()> {
        source.open()?;
        if let Some(current) = self.active.take() {
            self.suspended.push((current.position(), current));
        }
        debug!(
            "reading {} {}(depth {})",
            source.system_id().unwrap_or("text"),
            source.public_id().map(|id| format!("[{}] ", id)).unwrap_or_default(),
            self.suspended.len()
        );
        self.active = Some(source);
        self.report();
        Ok(())
    }

    /// Closes the active source and resumes the last suspended one.
    ///
    /// Returns false, leaving the outermost source active, when nothing is
    /// suspended.
    pub(crate) fn pop(&mut self) -> bool {
        let Some((position, mut resumed)) = self.suspended.pop() else {
            return false;
        };
        if let Some(mut finished) = self.active.take() {
            finished.close();
        }
        resumed.set_position(position);
        self.active = Some(resumed);
        self.report();
        true
    }

    /// Number of suspended sources under the active one.
    pub(crate) fn depth(&self) -> usize {
        self.suspended.len()
    }

    fn report(&self) {
        if let Some(source) = &self.active {
            self.progress.update(source.position(), self.suspended.len());
        }
    }

    pub(crate) fn peek(&mut self) -> Result<Option<char>> {
        match &mut self.active {
            Some(source) => source.peek(),
            None => Ok(None),
        }
    }

    pub(crate) fn read(&mut self) -> Result<Option<char>> {
        let Some(source) = &mut self.active else {
            return Ok(None);
        };
        let c = source.read()?;
        self.progress.update(source.position(), self.suspended.len());
        Ok(c)
    }

    pub(crate) fn position(&self) -> Position {
        match &self.active {
            Some(source) => source.position(),
            None => Position::new(),
        }
    }

    pub(crate) fn system_id(&self) -> Option<&str> {
        self.active.as_ref().and_then(|s| s.system_id())
    }

    /// Identifier relative references are resolved against: the innermost
    /// source which has one.
    pub(crate) fn base_id(&self) -> Option<&str> {
        self.active
            .iter()
            .chain(self.suspended.iter().rev().map(|(_, s)| s))
            .find_map(|s| s.system_id())
    }

    pub(crate) fn active(&self) -> Option<&CharSource> {
        self.active.as_ref()
    }

    pub(crate) fn mark_set(&mut self) {
        if let Some(source) = &mut self.active {
            source.mark_set();
        }
    }

    pub(crate) fn mark_delete(&mut self) -> bool {
        self.active.as_mut().is_some_and(|s| s.mark_delete())
    }

    pub(crate) fn mark_return(&mut self) -> bool {
        self.active.as_mut().is_some_and(|s| s.mark_return())
    }

    pub(crate) fn mark_backup(&mut self, n: usize) -> usize {
        self.active.as_mut().map_or(0, |s| s.mark_backup(n))
    }

    /// Closes every source, innermost first. Closing twice is harmless.
    pub(crate) fn close(&mut self) {
        if let Some(mut source) = self.active.take() {
            source.close();
        }
        while let Some((_, mut source)) = self.suspended.pop() {
            source.close();
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.active.as_ref().is_none_or(|s| s.is_closed()) && self.suspended.is_empty()
    }
}

/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::collections::VecDeque;

use super::Position;

/// Scalars consumed since a mark was set, each with the position it
/// was read from.
#[derive(Debug)]
struct MarkEntry {
    start: Position,
    consumed: Vec<(Position, char)>,
}

/// Nested save/restore points over a stream of scalars.
///
/// Only the innermost mark records consumed scalars. When it is deleted
/// its record moves to the enclosing mark, so every mark can still rewind
/// over everything read since it was set. Rewound scalars wait in the
/// replay queue and are always handed out, in their original order, before
/// anything new is decoded.
#[derive(Debug, Default)]
pub(crate) struct MarkLedger {
    marks: Vec<MarkEntry>,
    replay: VecDeque<(Position, char)>,
}

impl MarkLedger {
    pub(crate) fn new() -> Self {
        MarkLedger {
            marks: Vec::new(),
            replay: VecDeque::new(),
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.marks.len()
    }

    pub(crate) fn next_pending(&mut self) -> Option<(Position, char)> {
        self.replay.pop_front()
    }

    pub(crate) fn peek_pending(&self) -> Option<char> {
        self.replay.front().map(|&(_, c)| c)
    }

    /// Queues a freshly decoded scalar which has been looked at but not consumed.
    pub(crate) fn push_pending(&mut self, pos: Position, c: char) {
        self.replay.push_back((pos, c));
    }

    pub(crate) fn record(&mut self, pos: Position, c: char) {
        if let Some(mark) = self.marks.last_mut() {
            mark.consumed.push((pos, c));
        }
    }

    pub(crate) fn set(&mut self, pos: Position) {
        self.marks.push(MarkEntry {
            start: pos,
            consumed: Vec::new(),
        });
    }

    /// Commits everything read since the innermost mark and removes it.
    pub(crate) fn delete(&mut self) -> bool {
        match self.marks.pop() {
            None => false,
            Some(mark) => {
                if let Some(outer) = self.marks.last_mut() {
                    outer.consumed.extend(mark.consumed);
                }
                true
            }
        }
    }

    /// Removes the innermost mark and queues its scalars for re-reading.
    pub(crate) fn rewind(&mut self, pos: &mut Position) -> bool {
        match self.marks.pop() {
            None => false,
            Some(mark) => {
                self.requeue(mark.consumed);
                *pos = mark.start;
                true
            }
        }
    }

    /// Like [rewind](MarkLedger::rewind) but keeps the mark in place.
    pub(crate) fn reset(&mut self, pos: &mut Position) -> bool {
        match self.marks.last_mut() {
            None => false,
            Some(mark) => {
                let consumed = std::mem::take(&mut mark.consumed);
                *pos = mark.start;
                self.requeue(consumed);
                true
            }
        }
    }

    /// Moves the innermost mark forward to `pos`, committing what was read.
    pub(crate) fn update(&mut self, pos: Position) -> bool {
        match self.marks.pop() {
            None => false,
            Some(mark) => {
                if let Some(outer) = self.marks.last_mut() {
                    outer.consumed.extend(mark.consumed);
                }
                self.set(pos);
                true
            }
        }
    }

    /// Un-reads the last `n` scalars of the innermost mark, keeping the mark.
    ///
    /// Returns how many scalars were actually backed up, which is less than
    /// `n` when the mark has not seen that many.
    pub(crate) fn backup(&mut self, n: usize, pos: &mut Position) -> usize {
        let Some(mark) = self.marks.last_mut() else {
            return 0;
        };
        let n = n.min(mark.consumed.len());
        if n == 0 {
            return 0;
        }
        let tail = mark.consumed.split_off(mark.consumed.len() - n);
        *pos = tail[0].0;
        self.requeue(tail);
        n
    }

    fn requeue(&mut self, consumed: Vec<(Position, char)>) {
        for item in consumed.into_iter().rev() {
            self.replay.push_front(item);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.marks.clear();
        self.replay.clear();
    }
}

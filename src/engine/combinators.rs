//! Combinators over child parsers.
//!
//! Fatal failures are returned as soon as they are seen; only ordinary
//! failures are absorbed by alternatives, repetition and lookahead.

use log::trace;

use crate::callbacks::{Action, Predicate};
use crate::engine::{Fail, FailureKind, Match, Run, Step};
use crate::grammar::ParserId;
use crate::input::Cursor;
use crate::value::Value;

/// Stand-in handed to callbacks when the inner parser produced nothing.
static ABSENT: Value = Value::None;

impl<'g, 'i> Run<'g, 'i> {
    // ========================================================================
    // SEQUENCING
    // ========================================================================

    pub(super) fn sequence(&mut self, children: &[ParserId], at: Cursor) -> Step {
        let mut cursor = at;
        let mut values = Vec::with_capacity(children.len());
        for &child in children {
            let m = self.apply(child, cursor).map_err(|f| f.at(at))?;
            cursor = m.end;
            values.extend(m.value);
        }
        Ok(Match::new(cursor, Value::from(values)))
    }

    /// Runs `parts` in order and keeps the value of `parts[kept]`.
    pub(super) fn keep(&mut self, parts: &[ParserId], kept: usize, at: Cursor) -> Step {
        let mut cursor = at;
        let mut value = None;
        for (i, &part) in parts.iter().enumerate() {
            let m = self.apply(part, cursor).map_err(|f| f.at(at))?;
            cursor = m.end;
            if i == kept {
                value = m.value;
            }
        }
        Ok(Match { end: cursor, value })
    }

    // ========================================================================
    // ALTERNATION
    // ========================================================================

    pub(super) fn choice(&mut self, children: &[ParserId], at: Cursor) -> Step {
        let mut best: Option<Fail> = None;
        for &child in children {
            match self.apply(child, at) {
                Ok(m) => return Ok(m),
                Err(f) if f.is_fatal() => return Err(f),
                Err(f) => {
                    best = Some(match best {
                        Some(prev) => prev.deeper(f),
                        None => f,
                    });
                }
            }
        }
        Err(best.map_or_else(|| Fail::no_match(at), |f| f.at(at)))
    }

    pub(super) fn butnot(&mut self, a: ParserId, b: ParserId, at: Cursor) -> Step {
        let ma = self.apply(a, at)?;
        match self.apply(b, at) {
            Ok(mb) if mb.end >= ma.end => Err(Fail::no_match(at).reached(ma.end)),
            Ok(_) => Ok(ma),
            Err(f) if f.is_fatal() => Err(f),
            Err(_) => Ok(ma),
        }
    }

    pub(super) fn difference(&mut self, a: ParserId, b: ParserId, at: Cursor) -> Step {
        let ma = self.apply(a, at)?;
        match self.apply(b, at) {
            Ok(_) => Err(Fail::no_match(at).reached(ma.end)),
            Err(f) if f.is_fatal() => Err(f),
            Err(_) => Ok(ma),
        }
    }

    pub(super) fn xor(&mut self, a: ParserId, b: ParserId, at: Cursor) -> Step {
        let ra = self.apply(a, at);
        if let Err(f) = &ra {
            if f.is_fatal() {
                return ra;
            }
        }
        let rb = self.apply(b, at);
        if let Err(f) = &rb {
            if f.is_fatal() {
                return rb;
            }
        }
        match (ra, rb) {
            (Ok(m), Err(_)) | (Err(_), Ok(m)) => Ok(m),
            (Ok(ma), Ok(mb)) => Err(Fail::no_match(at).reached(ma.end.max(mb.end))),
            (Err(fa), Err(fb)) => Err(fa.deeper(fb).at(at)),
        }
    }

    // ========================================================================
    // REPETITION
    // ========================================================================

    /// `item*` or, with a separator, `item (sep item)*`; at least `min` items.
    ///
    /// Stops after an iteration that made no progress. A separator that is not
    /// followed by an item is not consumed.
    pub(super) fn repeat(
        &mut self,
        item: ParserId,
        sep: Option<ParserId>,
        min: usize,
        at: Cursor,
    ) -> Step {
        let mut cursor = at;
        let mut count = 0;
        let mut values = Vec::new();
        let mut stopped: Option<Fail> = None;

        loop {
            let item_at = match sep {
                Some(sep) if count > 0 => match self.apply(sep, cursor) {
                    Ok(m) => m.end,
                    Err(f) if f.is_fatal() => return Err(f),
                    Err(f) => {
                        stopped = Some(f);
                        break;
                    }
                },
                _ => cursor,
            };
            match self.apply(item, item_at) {
                Ok(m) => {
                    let progressed = m.end > cursor;
                    cursor = m.end;
                    count += 1;
                    values.extend(m.value);
                    if !progressed {
                        break;
                    }
                }
                Err(f) if f.is_fatal() => return Err(f),
                Err(f) => {
                    stopped = Some(f);
                    break;
                }
            }
        }

        if count < min {
            return Err(stopped.map_or_else(|| Fail::no_match(at), |f| f.at(at)));
        }
        Ok(Match::new(cursor, Value::from(values)))
    }

    /// Exactly `count` items; a shortfall fails where the missing item should start.
    pub(super) fn repeat_n(&mut self, inner: ParserId, count: usize, at: Cursor) -> Step {
        let mut cursor = at;
        let mut values = Vec::new();
        for _ in 0..count {
            let m = self.apply(inner, cursor).map_err(|f| f.at(cursor))?;
            cursor = m.end;
            values.extend(m.value);
        }
        Ok(Match::new(cursor, Value::from(values)))
    }

    pub(super) fn optional(&mut self, inner: ParserId, at: Cursor) -> Step {
        match self.apply(inner, at) {
            Ok(m) => Ok(m),
            Err(f) if f.is_fatal() => Err(f),
            Err(_) => Ok(Match::new(at, Value::None)),
        }
    }

    // ========================================================================
    // LOOKAHEAD
    // ========================================================================

    pub(super) fn and(&mut self, inner: ParserId, at: Cursor) -> Step {
        self.apply(inner, at).map(|_| Match::absent(at))
    }

    pub(super) fn not(&mut self, inner: ParserId, at: Cursor) -> Step {
        match self.apply(inner, at) {
            Ok(m) => Err(Fail::no_match(at).reached(m.end)),
            Err(f) if f.is_fatal() => Err(f),
            Err(_) => Ok(Match::absent(at)),
        }
    }

    // ========================================================================
    // LENGTH-PREFIXED WINDOWS
    // ========================================================================

    /// Reads a byte count, then runs `value` with the input narrowed to exactly
    /// that many bytes. `value` must consume the whole window.
    pub(super) fn length_value(&mut self, length: ParserId, value: ParserId, at: Cursor) -> Step {
        let lm = self.apply(length, at).map_err(|f| f.at(at))?;
        let window_end = lm
            .value
            .as_ref()
            .and_then(Value::as_integer)
            .and_then(|n| usize::try_from(n.as_i128()).ok())
            .and_then(|n| lm.end.advance_bytes(n))
            .filter(|end| *end <= self.limit);
        let Some(window_end) = window_end else {
            return Err(Fail::no_match(at).reached(lm.end));
        };

        let outer = std::mem::replace(&mut self.limit, window_end);
        let step = self.apply(value, lm.end);
        self.limit = outer;

        match step {
            Ok(m) if m.end == window_end => Ok(m),
            Ok(m) => Err(Fail::no_match(at).reached(m.end)),
            Err(f) => Err(f.at(at)),
        }
    }

    // ========================================================================
    // CALLBACKS
    // ========================================================================

    pub(super) fn action(&mut self, inner: ParserId, action: &Action, at: Cursor) -> Step {
        let m = self.apply(inner, at)?;
        match action.call(m.value.as_ref().unwrap_or(&ABSENT)) {
            Ok(value) => Ok(Match::new(m.end, value)),
            Err(e) => {
                trace!("action rejected match at {}: {}", at, e.message);
                Err(Fail::new(at, FailureKind::Callback { message: e.message }).reached(m.end))
            }
        }
    }

    pub(super) fn attr_bool(&mut self, inner: ParserId, predicate: &Predicate, at: Cursor) -> Step {
        let m = self.apply(inner, at)?;
        match predicate.call(m.value.as_ref().unwrap_or(&ABSENT)) {
            Ok(true) => Ok(m),
            Ok(false) => Err(Fail::no_match(at).reached(m.end)),
            Err(e) => {
                trace!("predicate rejected match at {}: {}", at, e.message);
                Err(Fail::new(at, FailureKind::Callback { message: e.message }).reached(m.end))
            }
        }
    }
}

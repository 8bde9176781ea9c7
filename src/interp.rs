// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The interpreter: `match_prefix`, one attempt to match the program
//! starting at a fixed position.
//!
//! One flat loop handles every opcode; failure always goes through
//! [`MatcherState::backtrack`], never a raw `return` mid-match, so every
//! undo (captures, `rep` counters) happens through the same choke point.

use crate::backtrack::{BacktrackStack, Frame, RepResume};
use crate::captures::Captures;
use crate::classify::Classifier;
use crate::cursor::{Cursor, Input};
use crate::error::{Error, Result};
use crate::flags::MatchFlags;
use crate::inst::{Inst, InstIdx, RepeatUnit};
use crate::program::Program;

/// One matching attempt against a fixed program, anchored at a fixed start
/// position. Constructed fresh (or reset) per attempt by the search driver
/// in `search.rs`; a `MatcherState` does not know about restart strategies
/// or where else in the input it might try next.
pub struct MatcherState<'p, I: Input> {
    program: &'p Program,
    classifier: &'p dyn Classifier,
    input: &'p I,
    flags: MatchFlags,
    base: I::Cur,
    end: I::Cur,
    search_base: I::Cur,
    captures: Captures,
    /// The best candidate found so far under POSIX leftmost-longest
    /// semantics. `None` under Perl semantics, where the first `Match`
    /// reached wins outright.
    best_match: Option<Captures>,
    rep_stack: Vec<(usize, u32, I::Cur)>,
    stack: BacktrackStack<I::Cur>,
    state_count: usize,
    max_state_count: usize,
    /// Set by a consuming handler (`literal`, `wild`, `set`, `long_set`,
    /// `backref`, the unit repeats) whenever it fails specifically because
    /// input ran out, rather than because a character mismatched. Consulted
    /// only when the whole attempt exhausts its alternatives, to decide
    /// whether `match_partial` should synthesize a trailing match.
    has_partial_match: bool,
    /// True iff the success just reported came from the `match_partial`
    /// synthesis path in [`MatcherState::finish_failed_attempt`] rather
    /// than a real `Match` opcode.
    partial_result: bool,
}

impl<'p, I: Input> MatcherState<'p, I> {
    pub fn new(
        program: &'p Program,
        classifier: &'p dyn Classifier,
        input: &'p I,
        flags: MatchFlags,
        max_state_count: usize,
    ) -> MatcherState<'p, I> {
        MatcherState {
            program,
            classifier,
            input,
            flags,
            base: input.base(),
            end: input.last(),
            search_base: input.base(),
            captures: Captures::new(program.mark_count()),
            best_match: None,
            rep_stack: Vec::new(),
            stack: BacktrackStack::new(None),
            state_count: 0,
            max_state_count,
            has_partial_match: false,
            partial_result: false,
        }
    }

    pub fn captures(&self) -> &Captures {
        &self.captures
    }

    /// The result of the attempt: the POSIX best candidate if one was
    /// recorded, otherwise whatever `captures` holds (meaningful only if
    /// the attempt returned `Ok(true)`).
    pub fn result(&self) -> &Captures {
        self.best_match.as_ref().unwrap_or(&self.captures)
    }

    /// True iff the last successful attempt was a synthesized
    /// `match_partial` trailing match rather than a real acceptance.
    pub fn is_partial(&self) -> bool {
        self.partial_result
    }

    pub fn state_count(&self) -> usize {
        self.state_count
    }

    /// Records that a consuming handler failed because input ran out at
    /// `cur`, not because of a content mismatch.
    fn note_partial(&mut self, cur: I::Cur) {
        if cur == self.end {
            self.has_partial_match = true;
        }
    }

    fn translate(&self, ch: char) -> char {
        self.classifier.translate(ch, self.program.icase_flag())
    }

    fn word_before(&self, pos: I::Cur) -> bool {
        match pos.previous() {
            Some(ch) => self.classifier.is_word_char(ch),
            // At or before the buffer start: MATCH_PREV_AVAIL promises a
            // real character lives just outside our view, but the cursor
            // has no way to read it, so we conservatively treat the edge as
            // non-word. See DESIGN.md.
            None => false,
        }
    }

    fn word_after(&self, pos: I::Cur) -> bool {
        match pos.current() {
            Some(ch) => self.classifier.is_word_char(ch),
            None => false,
        }
    }

    fn at_buffer_start_without_prev(&self, pos: I::Cur) -> bool {
        pos == self.base && !self.flags.contains(MatchFlags::MATCH_PREV_AVAIL)
    }

    /// `\b`, via a XOR formulation: `b` starts from the word-ness of the
    /// character at `position` (or `match_not_eow` at end-of-input), then
    /// gets XORed with the word-ness of the character before `position` —
    /// except right at the buffer start with no previous character
    /// available, where only `match_not_bow` can flip it.
    fn word_boundary_holds(&self, pos: I::Cur) -> bool {
        let mut b = match pos.current() {
            Some(ch) => self.classifier.is_word_char(ch),
            None => self.flags.contains(MatchFlags::MATCH_NOT_EOW),
        };
        if self.at_buffer_start_without_prev(pos) {
            if self.flags.contains(MatchFlags::MATCH_NOT_BOW) {
                b ^= true;
            }
        } else {
            b ^= self.word_before(pos);
        }
        b
    }

    /// `\B`-complement assertion (`within_word`): both neighbors must be
    /// word characters, and there must be a legible previous character.
    fn within_word_holds(&self, pos: I::Cur) -> bool {
        if pos == self.end {
            return false;
        }
        if !self.word_after(pos) {
            return false;
        }
        if self.at_buffer_start_without_prev(pos) {
            return false;
        }
        self.word_before(pos)
    }

    fn word_start_holds(&self, pos: I::Cur) -> bool {
        if pos == self.end || !self.word_after(pos) {
            return false;
        }
        if self.at_buffer_start_without_prev(pos) {
            !self.flags.contains(MatchFlags::MATCH_NOT_BOW)
        } else {
            !self.word_before(pos)
        }
    }

    fn word_end_holds(&self, pos: I::Cur) -> bool {
        if self.at_buffer_start_without_prev(pos) {
            return false;
        }
        if !self.word_before(pos) {
            return false;
        }
        if pos == self.end {
            !self.flags.contains(MatchFlags::MATCH_NOT_EOW)
        } else {
            !self.word_after(pos)
        }
    }

    /// `^` with multi-line semantics: true at the buffer start (subject to
    /// `match_not_bol`), or just after a separator that isn't the `\n` half
    /// of a `\r\n` pair — but never at end-of-input.
    fn start_line_holds(&self, pos: I::Cur) -> bool {
        if self.at_buffer_start_without_prev(pos) {
            return !self.flags.contains(MatchFlags::MATCH_NOT_BOL);
        }
        if pos == self.end {
            return false;
        }
        match pos.previous() {
            Some(prev) if self.classifier.is_separator(prev) => {
                !(prev == '\r' && pos.current() == Some('\n'))
            }
            _ => false,
        }
    }

    /// `$` with multi-line semantics: true at end-of-input (subject to
    /// `match_not_eol`), or just before a separator that isn't the `\n`
    /// half of a `\r\n` pair.
    fn end_line_holds(&self, pos: I::Cur) -> bool {
        if pos == self.end {
            return !self.flags.contains(MatchFlags::MATCH_NOT_EOL);
        }
        match pos.current() {
            Some(ch) if self.classifier.is_separator(ch) => {
                if self.at_buffer_start_without_prev(pos) {
                    true
                } else {
                    !(pos.previous() == Some('\r') && ch == '\n')
                }
            }
            _ => false,
        }
    }

    /// `\Z`: every remaining character up to `last` must be a separator.
    fn soft_buffer_end_holds(&self, pos: I::Cur) -> bool {
        if self.flags.contains(MatchFlags::MATCH_NOT_EOB) {
            return false;
        }
        let mut p = pos;
        while let Some(ch) = p.current() {
            if self.classifier.is_separator(ch) {
                p = p.step_forward();
            } else {
                return false;
            }
        }
        p == self.end
    }

    /// Sets the `\G`/`restart_continue` anchor for subsequent attempts.
    /// The search driver calls this once per `find`/`match` invocation,
    /// before running any of that invocation's candidate attempts — it is
    /// *not* reset by [`MatcherState::try_match`] itself, since a single
    /// `find` call may probe several candidate positions (via `restart_any`
    /// /`restart_word`/`restart_line`) while `\G` must keep referring to the
    /// one fixed point the whole `find` call resumed from.
    pub fn set_search_base(&mut self, search_base: I::Cur) {
        self.search_base = search_base;
    }

    /// Resets per-attempt mutable state and runs one match attempt starting
    /// at `start`.
    pub fn try_match(&mut self, start: I::Cur) -> Result<bool> {
        self.captures.clear();
        self.best_match = None;
        self.stack.clear();
        self.rep_stack.clear();
        self.state_count = 0;
        self.has_partial_match = false;
        self.partial_result = false;
        self.captures.set_first(0, start.offset());
        self.match_prefix(self.program.entry(), start)
    }

    /// Called once the backtracking stack is empty and no alternative
    /// remains. Under POSIX, the recorded `best_match` (if any) is the
    /// outcome. Otherwise, a `match_partial` trailing match is synthesized
    /// at `last` if any consuming handler failed purely because input ran
    /// out.
    fn finish_failed_attempt(&mut self) -> Result<bool> {
        if self.best_match.is_some() {
            return Ok(true);
        }
        if self.has_partial_match && self.flags.contains(MatchFlags::MATCH_PARTIAL) {
            self.captures.set_second(0, self.end.offset());
            self.partial_result = true;
            return Ok(true);
        }
        Ok(false)
    }

    fn backtrack(&mut self) -> Option<(InstIdx, I::Cur)> {
        loop {
            match self.stack.pop()? {
                Frame::StartCapture { index, prior } => {
                    self.captures.set_slot(index, prior);
                }
                Frame::PositionRestore { .. } => {}
                Frame::Alt { pc, pos } => return Some((pc, pos)),
                Frame::Assertion { pc, pos } => return Some((pc, pos)),
                Frame::RepIteration { rep_id, pc, pos, resume } => {
                    match resume {
                        RepResume::ExitLoop => {
                            if matches!(self.rep_stack.last(), Some(&(id, _, _)) if id == rep_id) {
                                self.rep_stack.pop();
                            }
                        }
                        RepResume::RetryBody { count } => {
                            self.rep_stack.push((rep_id, count, pos));
                        }
                    }
                    return Some((pc, pos));
                }
            }
        }
    }

    /// One match attempt: the iterative dispatch loop over the program's
    /// instructions, starting at `pc`/`pos`. Returns `Ok(true)` once an
    /// acceptable match is found (immediately under Perl semantics; after
    /// exhausting all alternatives under POSIX, keeping the best one),
    /// `Ok(false)` if every alternative fails, or `Err` if the work budget
    /// or backtracking memory is exhausted.
    pub fn match_prefix(&mut self, mut pc: InstIdx, mut pos: I::Cur) -> Result<bool> {
        macro_rules! backtrack_or_return {
            () => {
                match self.backtrack() {
                    Some((npc, npos)) => {
                        pc = npc;
                        pos = npos;
                    }
                    None => return self.finish_failed_attempt(),
                }
            };
        }

        loop {
            self.state_count += 1;
            if self.state_count > self.max_state_count {
                return Err(Error::ComplexityExceeded {
                    state_count: self.state_count,
                    limit: self.max_state_count,
                });
            }
            let inst = match self.program.inst(pc) {
                Some(inst) => inst.clone(),
                None => return Err(Error::InvalidProgram { pc }),
            };
            match inst {
                Inst::StartMark { index, next } => {
                    let prior = self.captures.get(index);
                    self.stack.push(Frame::StartCapture { index, prior })?;
                    self.captures.set_first(index, pos.offset());
                    pc = next;
                }
                Inst::EndMark { index, next } => {
                    if index >= 0 {
                        self.captures.set_second(index as usize, pos.offset());
                    }
                    pc = next;
                }
                Inst::Literal { chars, next } => {
                    let mut cur = pos;
                    let mut ok = true;
                    for &want in &chars {
                        match cur.current() {
                            Some(ch) if self.translate(ch) == self.translate(want) => {
                                cur = cur.step_forward();
                            }
                            _ => {
                                self.note_partial(cur);
                                ok = false;
                                break;
                            }
                        }
                    }
                    if ok {
                        pos = cur;
                        pc = next;
                    } else {
                        backtrack_or_return!();
                    }
                }
                Inst::StartLine { next } => {
                    if self.start_line_holds(pos) {
                        pc = next;
                    } else {
                        backtrack_or_return!();
                    }
                }
                Inst::EndLine { next } => {
                    if self.end_line_holds(pos) {
                        pc = next;
                    } else {
                        backtrack_or_return!();
                    }
                }
                Inst::Wild { next } => {
                    let not_newline = self.flags.contains(MatchFlags::MATCH_NOT_DOT_NEWLINE);
                    let not_null = self.flags.contains(MatchFlags::MATCH_NOT_DOT_NULL);
                    match pos.current() {
                        Some(ch)
                            if !(self.classifier.is_separator(ch) && not_newline)
                                && !(ch == '\u{0}' && not_null) =>
                        {
                            pos = pos.step_forward();
                            pc = next;
                        }
                        _ => {
                            self.note_partial(pos);
                            backtrack_or_return!();
                        }
                    }
                }
                Inst::Match => {
                    let first = self.captures.get(0).map_or(pos.offset(), |(first, _)| first);
                    let reject_null =
                        self.flags.contains(MatchFlags::MATCH_NOT_NULL) && pos.offset() == first;
                    let reject_all =
                        self.flags.contains(MatchFlags::MATCH_ALL) && pos != self.end;
                    if reject_null || reject_all {
                        backtrack_or_return!();
                    } else {
                        self.captures.set_second(0, pos.offset());
                        let posix_canonicalize = self.flags.contains(MatchFlags::MATCH_POSIX)
                            && !self.flags.contains(MatchFlags::MATCH_ANY);
                        if posix_canonicalize {
                            let (first, last) = self.captures.overall().unwrap();
                            let candidate_len = last - first;
                            let better = match &self.best_match {
                                None => true,
                                Some(best) => {
                                    let (bf, bl) = best.overall().unwrap();
                                    candidate_len > bl - bf
                                }
                            };
                            if better {
                                self.best_match = Some(self.captures.clone());
                            }
                            backtrack_or_return!();
                        } else {
                            return Ok(true);
                        }
                    }
                }
                Inst::WordBoundary { next } => {
                    if self.word_boundary_holds(pos) {
                        pc = next;
                    } else {
                        backtrack_or_return!();
                    }
                }
                Inst::WithinWord { next } => {
                    if self.within_word_holds(pos) {
                        pc = next;
                    } else {
                        backtrack_or_return!();
                    }
                }
                Inst::WordStart { next } => {
                    if self.word_start_holds(pos) {
                        pc = next;
                    } else {
                        backtrack_or_return!();
                    }
                }
                Inst::WordEnd { next } => {
                    if self.word_end_holds(pos) {
                        pc = next;
                    } else {
                        backtrack_or_return!();
                    }
                }
                Inst::BufferStart { next } => {
                    let holds = pos == self.base && !self.flags.contains(MatchFlags::MATCH_NOT_BOB);
                    if holds {
                        pc = next;
                    } else {
                        backtrack_or_return!();
                    }
                }
                Inst::BufferEnd { next } => {
                    let holds = pos == self.end && !self.flags.contains(MatchFlags::MATCH_NOT_EOB);
                    if holds {
                        pc = next;
                    } else {
                        backtrack_or_return!();
                    }
                }
                Inst::SoftBufferEnd { next } => {
                    if self.soft_buffer_end_holds(pos) {
                        pc = next;
                    } else {
                        backtrack_or_return!();
                    }
                }
                Inst::RestartContinue { next } => {
                    if pos == self.search_base {
                        pc = next;
                    } else {
                        backtrack_or_return!();
                    }
                }
                Inst::Combining { next } => match pos.current() {
                    Some(_) => {
                        let mut cur = pos.step_forward();
                        while let Some(ch) = cur.current() {
                            if self.classifier.is_combining(ch) {
                                cur = cur.step_forward();
                            } else {
                                break;
                            }
                        }
                        pos = cur;
                        pc = next;
                    }
                    None => backtrack_or_return!(),
                },
                Inst::Backref { index, next } => match self.captures.get(index) {
                    None => backtrack_or_return!(),
                    Some((first, last)) => {
                        let group_end = self.input.at(last);
                        let mut group_cur = self.input.at(first);
                        let mut cur = pos;
                        let mut ok = true;
                        while group_cur != group_end {
                            match (group_cur.current(), cur.current()) {
                                (Some(gc), Some(cc)) if self.translate(gc) == self.translate(cc) => {
                                    group_cur = group_cur.step_forward();
                                    cur = cur.step_forward();
                                }
                                _ => {
                                    self.note_partial(cur);
                                    ok = false;
                                    break;
                                }
                            }
                        }
                        if ok {
                            pos = cur;
                            pc = next;
                        } else {
                            backtrack_or_return!();
                        }
                    }
                },
                Inst::Set { set, next } => match pos.current() {
                    Some(ch) if set.matches(ch) => {
                        pos = pos.step_forward();
                        pc = next;
                    }
                    _ => {
                        self.note_partial(pos);
                        backtrack_or_return!();
                    }
                },
                Inst::LongSet { set, next } => match pos.current() {
                    Some(ch) if set.matches(ch, self.classifier) => {
                        pos = pos.step_forward();
                        pc = next;
                    }
                    _ => {
                        self.note_partial(pos);
                        backtrack_or_return!();
                    }
                },
                Inst::Jump { alt } => {
                    pc = alt;
                }
                Inst::Alt { next, alt } => {
                    self.stack.push(Frame::Alt { pc: alt, pos })?;
                    pc = next;
                }
                Inst::Rep { id, min, max, greedy, body, tail } => {
                    let (pc2, pos2) = self.step_rep(id, min, max, greedy, body, tail, pc, pos)?;
                    pc = pc2;
                    pos = pos2;
                }
                Inst::UnitRepeat { id: _, unit, min, max, greedy, tail } => {
                    match self.step_unit_repeat(&unit, min, max, greedy, tail, pos)? {
                        Some((pc2, pos2)) => {
                            pc = pc2;
                            pos = pos2;
                        }
                        None => backtrack_or_return!(),
                    }
                }
            }
        }
    }

    /// Advances a generic `rep` loop by one decision. `rep_stack` carries
    /// the live iteration count for each currently-open `rep`, keyed by
    /// `id`; its depth tracks pattern nesting, not iteration count, because
    /// an entry is only pushed on fresh entry into the loop and popped the
    /// moment control leaves it for `tail` (see `backtrack.rs`).
    #[allow(clippy::too_many_arguments)]
    fn step_rep(
        &mut self,
        id: usize,
        min: u32,
        max: Option<u32>,
        greedy: bool,
        body: InstIdx,
        tail: InstIdx,
        rep_pc: InstIdx,
        pos: I::Cur,
    ) -> Result<(InstIdx, I::Cur)> {
        let fresh = !matches!(self.rep_stack.last(), Some(&(id2, _, _)) if id2 == id);
        if fresh {
            self.rep_stack.push((id, 0, pos));
        }
        let (count, last_pos) = {
            let &(_, count, last_pos) = self.rep_stack.last().unwrap();
            (count, last_pos)
        };
        // Zero-width guard: a body that consumed nothing since the last
        // iteration can never make further progress, so further mandatory
        // iterations are waived and optional ones are refused, exactly as
        // if `max` had been reached.
        let zero_width = !fresh && pos == last_pos;
        let must_iterate = count < min && !zero_width;
        let may_iterate = !zero_width && max.map_or(true, |m| count < m);

        if must_iterate {
            self.rep_stack.last_mut().unwrap().1 = count + 1;
            self.rep_stack.last_mut().unwrap().2 = pos;
            Ok((body, pos))
        } else if greedy && may_iterate {
            self.stack.push(Frame::RepIteration {
                rep_id: id,
                pc: tail,
                pos,
                resume: RepResume::ExitLoop,
            })?;
            self.rep_stack.last_mut().unwrap().1 = count + 1;
            self.rep_stack.last_mut().unwrap().2 = pos;
            Ok((body, pos))
        } else if !greedy && may_iterate {
            self.stack.push(Frame::RepIteration {
                rep_id: id,
                pc: body,
                pos,
                resume: RepResume::RetryBody { count: count + 1 },
            })?;
            self.rep_stack.pop();
            Ok((tail, pos))
        } else {
            self.rep_stack.pop();
            Ok((tail, pos))
        }
    }

    /// Advances a specialized single-character repeat. Unlike `rep`, the
    /// body here can never match zero-width (each unit consumes exactly one
    /// character), so this scans eagerly up front and lays down one
    /// give-back-or-grow choice point per extra unit instead of
    /// re-dispatching through the loop one character at a time.
    fn step_unit_repeat(
        &mut self,
        unit: &RepeatUnit,
        min: u32,
        max: Option<u32>,
        greedy: bool,
        tail: InstIdx,
        pos: I::Cur,
    ) -> Result<Option<(InstIdx, I::Cur)>> {
        let not_newline = self.flags.contains(MatchFlags::MATCH_NOT_DOT_NEWLINE);
        let not_null = self.flags.contains(MatchFlags::MATCH_NOT_DOT_NULL);
        let mut positions = vec![pos];
        let mut cur = pos;
        let limit = max.unwrap_or(u32::MAX);
        let mut count = 0u32;
        while count < limit {
            let hit = match (unit, cur.current()) {
                (RepeatUnit::AnyChar, Some(ch)) => {
                    !(self.classifier.is_separator(ch) && not_newline) && !(ch == '\u{0}' && not_null)
                }
                (RepeatUnit::Char(want), Some(ch)) => self.translate(ch) == self.translate(*want),
                (RepeatUnit::Set(set), Some(ch)) => set.matches(ch),
                (RepeatUnit::LongSet(set), Some(ch)) => set.matches(ch, self.classifier),
                (_, None) => false,
            };
            if !hit {
                break;
            }
            cur = cur.step_forward();
            count += 1;
            positions.push(cur);
        }
        if count < min {
            self.note_partial(cur);
            return Ok(None);
        }
        if greedy {
            // Push in ascending order so popping (LIFO) gives back the
            // largest count first: try `count` now, and on failure give
            // back to `count - 1`, then `count - 2`, ..., down to `min`.
            for i in min..count {
                self.stack.push(Frame::Alt { pc: tail, pos: positions[i as usize] })?;
            }
            Ok(Some((tail, positions[count as usize])))
        } else {
            for i in ((min + 1)..=count).rev() {
                self.stack.push(Frame::Alt { pc: tail, pos: positions[i as usize] })?;
            }
            Ok(Some((tail, positions[min as usize])))
        }
    }
}

// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The search driver: repeatedly relocates the search base and asks the
//! interpreter to try a match there.
//!
//! This core only ever runs one engine, so `Matcher::find` goes straight
//! from "pick the next candidate start" to "try it" rather than dispatching
//! through an engine-selection layer.
//!
//! `Matcher` carries resume state (`position`, `search_base`, whether the
//! previous `find` succeeded on an empty match) across calls, the way a
//! `regex_iterator` or a tokenizer's underlying matcher does: a second call
//! to `find` continues the search from where the first left off rather than
//! starting over from the beginning of the input.

use crate::captures::Captures;
use crate::classify::Classifier;
use crate::cursor::{Cursor, Input};
use crate::error::Result;
use crate::flags::MatchFlags;
use crate::interp::MatcherState;
use crate::kmp::KmpInfo;
use crate::program::{Program, RestartStrategy};

/// Outcome of a single KMP scan for a required literal, used to drive both
/// `restart_lit` and `restart_fixed_lit`.
enum KmpOutcome<C> {
    /// The whole literal was found; `start..end` delimits it.
    Found { start: C, end: C },
    /// Input ran out partway through a candidate occurrence that had
    /// matched `j` characters so far; `start..end` delimits those `j`
    /// characters.
    PartialAtEnd { start: C, end: C },
    NotFound,
}

/// A ready-to-run pairing of a compiled program, a classification oracle,
/// and an input sequence, plus the resume state a multi-call `find` needs.
/// Construct one per search; it borrows everything and does no allocation
/// beyond what a single match attempt needs.
pub struct Matcher<'p, I: Input> {
    program: &'p Program,
    classifier: &'p dyn Classifier,
    input: &'p I,
    /// Where the next `find` call resumes from.
    position: I::Cur,
    /// The `\G` anchor for the *current* `find` call — fixed for the
    /// duration of that call even though several candidate positions at or
    /// after it may be probed.
    search_base: I::Cur,
    initialized: bool,
    last_was_empty: bool,
    last_was_partial: bool,
}

impl<'p, I: Input> Matcher<'p, I> {
    pub fn new(program: &'p Program, classifier: &'p dyn Classifier, input: &'p I) -> Matcher<'p, I> {
        let base = input.base();
        Matcher {
            program,
            classifier,
            input,
            position: base,
            search_base: base,
            initialized: false,
            last_was_empty: false,
            last_was_partial: false,
        }
    }

    /// Attempts a match anchored exactly at the input's start that must
    /// consume the entire input. Corresponds to the top-level `match`
    /// operation (as opposed to `find`, which may relocate and may accept a
    /// match shorter than the whole input).
    pub fn matches_whole_input(&self, flags: MatchFlags) -> Result<bool> {
        let base = self.input.base();
        let last = self.input.last();
        let max = self.program.estimate_max_state_count(self.input.distance(&base, &last));
        let mut state = MatcherState::new(self.program, self.classifier, self.input, flags, max);
        state.set_search_base(base);
        if !state.try_match(base)? {
            return Ok(false);
        }
        Ok(state.captures().overall() == Some((base.offset(), last.offset())))
    }

    /// True iff the last successful `find` call synthesized its result via
    /// the `match_partial` trailing-match path rather than a real `match`
    /// opcode.
    pub fn last_match_was_partial(&self) -> bool {
        self.last_was_partial
    }

    /// Searches the input for the next match at or after the current
    /// resume position, relocating the search base per the program's
    /// restart strategy on each failed attempt. A second call resumes from
    /// the end of the previous match (advancing by one first if that match
    /// was empty), the way a `regex_iterator` drives repeated matches over
    /// one input.
    pub fn find(&mut self, flags: MatchFlags) -> Result<Option<Captures>> {
        if self.initialized && self.last_was_empty && !flags.contains(MatchFlags::MATCH_NOT_NULL) {
            if self.position == self.input.last() {
                return Ok(None);
            }
            self.position = self.position.step_forward();
        }
        if !self.initialized {
            self.position = self.input.base();
            self.initialized = true;
        }
        self.search_base = self.position;
        let eff_flags = if self.position != self.input.base() {
            flags.with(MatchFlags::MATCH_PREV_AVAIL)
        } else {
            flags
        };

        let restart = if flags.contains(MatchFlags::MATCH_CONTINUOUS) {
            RestartStrategy::Continue
        } else {
            self.program.restart_type().clone()
        };

        let result = match restart {
            RestartStrategy::Buf => self.find_buf(eff_flags, flags),
            RestartStrategy::Continue => self.find_continue(eff_flags),
            RestartStrategy::Any => self.find_any(eff_flags),
            RestartStrategy::Word => self.find_word(eff_flags),
            RestartStrategy::Line => self.find_line(eff_flags),
            RestartStrategy::Lit(kmp) => self.find_lit(eff_flags, &kmp, false),
            RestartStrategy::FixedLit(kmp) => self.find_lit(eff_flags, &kmp, true),
        }?;

        if let Some(caps) = &result {
            let (_, end) = caps.overall().expect("a successful match always sets capture 0");
            self.position = self.input.at(end);
            self.last_was_empty = caps.overall() == Some((end, end));
        }
        Ok(result)
    }

    pub fn is_match(&mut self, flags: MatchFlags) -> Result<bool> {
        Ok(self.find(flags)?.is_some())
    }

    fn new_state(&self, flags: MatchFlags) -> MatcherState<'p, I> {
        let max = self.program.estimate_max_state_count(self.input.distance(&self.search_base, &self.input.last()));
        let mut state = MatcherState::new(self.program, self.classifier, self.input, flags, max);
        state.set_search_base(self.search_base);
        state
    }

    /// Attempt only at `search_base`, never relocating; fails immediately
    /// if the caller asserted the search base is not the real buffer start.
    fn find_buf(&mut self, eff_flags: MatchFlags, raw_flags: MatchFlags) -> Result<Option<Captures>> {
        if raw_flags.contains(MatchFlags::MATCH_NOT_BOB) {
            self.last_was_partial = false;
            return Ok(None);
        }
        self.try_once(eff_flags, self.search_base)
    }

    /// `\G`-anchored: attempt only at `search_base`.
    fn find_continue(&mut self, eff_flags: MatchFlags) -> Result<Option<Captures>> {
        self.try_once(eff_flags, self.search_base)
    }

    fn try_once(&mut self, eff_flags: MatchFlags, pos: I::Cur) -> Result<Option<Captures>> {
        let mut state = self.new_state(eff_flags);
        let found = state.try_match(pos)?;
        self.last_was_partial = found && state.is_partial();
        Ok(if found { Some(state.result().clone()) } else { None })
    }

    /// Scans via the program's start-character bitmap, attempting at every
    /// candidate byte; if the scan runs off the end without a hit and the
    /// pattern can match empty, makes one last attempt exactly at `last`.
    fn find_any(&mut self, eff_flags: MatchFlags) -> Result<Option<Captures>> {
        let mut state = self.new_state(eff_flags);
        let last = self.input.last();
        let mut pos = self.position;
        loop {
            if state.try_match(pos)? {
                self.last_was_partial = state.is_partial();
                return Ok(Some(state.result().clone()));
            }
            if pos == last {
                self.last_was_partial = false;
                return Ok(None);
            }
            pos = match self.restart_any(pos.step_forward()) {
                Some(next) => next,
                None => {
                    if self.program.can_be_null() && state.try_match(last)? {
                        self.last_was_partial = state.is_partial();
                        return Ok(Some(state.result().clone()));
                    }
                    self.last_was_partial = false;
                    return Ok(None);
                }
            };
        }
    }

    /// Attempts at the current position, then at every subsequent
    /// word-start boundary.
    fn find_word(&mut self, eff_flags: MatchFlags) -> Result<Option<Captures>> {
        let mut state = self.new_state(eff_flags);
        let mut pos = self.position;
        loop {
            if state.try_match(pos)? {
                self.last_was_partial = state.is_partial();
                return Ok(Some(state.result().clone()));
            }
            if pos == self.input.last() {
                self.last_was_partial = false;
                return Ok(None);
            }
            pos = match self.restart_word(pos.step_forward()) {
                Some(next) => next,
                None => {
                    self.last_was_partial = false;
                    return Ok(None);
                }
            };
        }
    }

    /// Attempts at the current position, then at the start of every
    /// subsequent line.
    fn find_line(&mut self, eff_flags: MatchFlags) -> Result<Option<Captures>> {
        let mut state = self.new_state(eff_flags);
        let mut pos = self.position;
        loop {
            if state.try_match(pos)? {
                self.last_was_partial = state.is_partial();
                return Ok(Some(state.result().clone()));
            }
            if pos == self.input.last() {
                self.last_was_partial = false;
                return Ok(None);
            }
            pos = match self.restart_line(pos) {
                Some(next) => next,
                None => {
                    self.last_was_partial = false;
                    return Ok(None);
                }
            };
        }
    }

    /// KMP-accelerated scan for the program's required literal. `fixed`
    /// distinguishes `restart_fixed_lit` (the literal *is* the whole
    /// pattern — a KMP hit is a match, no interpreter dispatch needed) from
    /// `restart_lit` (the literal is only a required prefix — a KMP hit
    /// just picks the next candidate start for `match_prefix`).
    fn find_lit(&mut self, eff_flags: MatchFlags, kmp: &KmpInfo, fixed: bool) -> Result<Option<Captures>> {
        let match_partial = eff_flags.contains(MatchFlags::MATCH_PARTIAL);
        let mut scan_from = self.position;
        loop {
            match self.kmp_scan(scan_from, kmp) {
                KmpOutcome::Found { start, end } => {
                    if fixed {
                        let mut caps = Captures::new(self.program.mark_count());
                        caps.set_first(0, start.offset());
                        caps.set_second(0, end.offset());
                        self.last_was_partial = false;
                        return Ok(Some(caps));
                    }
                    let mut state = self.new_state(eff_flags);
                    if state.try_match(start)? {
                        self.last_was_partial = state.is_partial();
                        return Ok(Some(state.result().clone()));
                    }
                    if start == self.input.last() {
                        self.last_was_partial = false;
                        return Ok(None);
                    }
                    scan_from = start.step_forward();
                }
                KmpOutcome::PartialAtEnd { start, .. } if match_partial && !fixed => {
                    let mut state = self.new_state(eff_flags);
                    let found = state.try_match(start)?;
                    self.last_was_partial = found && state.is_partial();
                    return Ok(if found { Some(state.result().clone()) } else { None });
                }
                _ => {
                    self.last_was_partial = false;
                    return Ok(None);
                }
            }
        }
    }

    /// Scans forward from `from` for the next byte in the program's
    /// start-character bitmap. Falls back to a linear character scan if the
    /// program has no bitmap at all (shouldn't happen for an `Any`-strategy
    /// program, but the interpreter doesn't enforce that invariant).
    fn restart_any(&self, from: I::Cur) -> Option<I::Cur> {
        let bitmap = self.program.start_character_bitmap()?;
        let bytes = self.input.as_bytes();
        let start = from.offset();
        if start >= bytes.len() {
            return None;
        }
        let set_bytes: Vec<u8> = (0u16..256).filter(|&b| bitmap.contains_byte(b as u8)).map(|b| b as u8).collect();
        let found = match set_bytes.as_slice() {
            [] => None,
            [only] => memchr::memchr(*only, &bytes[start..]),
            _ => bytes[start..].iter().position(|&b| bitmap.contains_byte(b)),
        };
        found.map(|offset| self.input.at(start + offset))
    }

    /// Scans forward from `from` for the next word-start boundary
    /// (`!word_before && word_after`).
    fn restart_word(&self, from: I::Cur) -> Option<I::Cur> {
        let mut cur = from;
        loop {
            let before = cur.previous().map_or(false, |c| self.classifier.is_word_char(c));
            let after = cur.current().map_or(false, |c| self.classifier.is_word_char(c));
            if !before && after {
                return Some(cur);
            }
            if !cur.has_current() {
                return None;
            }
            cur = cur.step_forward();
        }
    }

    /// Scans forward from `failed_pos` (the position that just failed) for
    /// the character right after the next `\n`, accelerated with `memchr`.
    /// The unconditional first attempt at the search base happens in each
    /// `find_*` driver's first loop iteration, so this only ever needs to
    /// produce *subsequent* candidates.
    fn restart_line(&self, failed_pos: I::Cur) -> Option<I::Cur> {
        let bytes = self.input.as_bytes();
        let start = failed_pos.offset();
        memchr::memchr(b'\n', bytes.get(start..)?).map(|i| self.input.at(start + i + 1))
    }

    /// KMP scan for `kmp`'s pattern starting from `from`. Unlike a rewind
    /// scheme that backs the candidate start up one character at a time,
    /// this keeps the standard KMP bookkeeping: `match_start` only moves
    /// forward by exactly the number of characters that fall out of the
    /// candidate prefix on each mismatch, so no input character is
    /// rescanned more than a small amortized number of times. See
    /// DESIGN.md.
    fn kmp_scan(&self, from: I::Cur, kmp: &KmpInfo) -> KmpOutcome<I::Cur> {
        let pattern = kmp.pattern();
        let n = pattern.len() as isize;
        let icase = self.program.icase_flag();
        let mut j: isize = 0;
        let mut cur = from;
        let mut match_start = from;
        loop {
            match cur.current() {
                None => {
                    return if j > 0 {
                        KmpOutcome::PartialAtEnd { start: match_start, end: cur }
                    } else {
                        KmpOutcome::NotFound
                    };
                }
                Some(ch) => {
                    let want = pattern[j as usize];
                    if self.classifier.translate(ch, icase) == self.classifier.translate(want, icase) {
                        cur = cur.step_forward();
                        j += 1;
                        if j == n {
                            return KmpOutcome::Found { start: match_start, end: cur };
                        }
                    } else if j == 0 {
                        cur = cur.step_forward();
                        match_start = cur;
                    } else {
                        let new_j = kmp.fallback(j).max(0);
                        for _ in 0..(j - new_j) {
                            match_start = match_start.step_forward();
                        }
                        j = new_j;
                    }
                }
            }
        }
    }
}

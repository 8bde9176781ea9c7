// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A hand-assembler for building [`Program`]s directly, for tests.
//!
//! Compiling a pattern string into a `Program` is out of scope for this
//! crate; the interpreter and search driver are tested by constructing
//! small instruction graphs with this builder instead, the same way an
//! execution engine can be exercised independently of whatever compiles
//! programs for it. Graphs with backward edges (loops) need a node's index
//! before the node exists, so this supports reserving a slot up front and
//! patching it in once the real instruction is known.
#![cfg(test)]

use crate::inst::{Inst, InstIdx};
use crate::program::{Program, RestartStrategy, StartCharBitmap};

/// Builds a flat instruction arena one node at a time.
pub struct Asm {
    insts: Vec<Inst>,
}

impl Asm {
    pub fn new() -> Asm {
        Asm { insts: Vec::new() }
    }

    /// Reserves a slot for an instruction whose contents aren't known yet
    /// (the target of a backward edge). Fill it in with [`Asm::patch`]
    /// before calling [`Asm::build`].
    pub fn reserve(&mut self) -> InstIdx {
        let idx = self.insts.len();
        self.insts.push(Inst::Jump { alt: InstIdx::MAX });
        idx
    }

    pub fn patch(&mut self, idx: InstIdx, inst: Inst) {
        self.insts[idx] = inst;
    }

    fn push(&mut self, inst: Inst) -> InstIdx {
        let idx = self.insts.len();
        self.insts.push(inst);
        idx
    }

    pub fn lit(&mut self, chars: &str, next: InstIdx) -> InstIdx {
        self.push(Inst::Literal { chars: chars.chars().collect(), next })
    }

    pub fn any(&mut self, next: InstIdx) -> InstIdx {
        self.push(Inst::Wild { next })
    }

    pub fn jump(&mut self, alt: InstIdx) -> InstIdx {
        self.push(Inst::Jump { alt })
    }

    pub fn alt(&mut self, next: InstIdx, alt: InstIdx) -> InstIdx {
        self.push(Inst::Alt { next, alt })
    }

    pub fn start_mark(&mut self, index: usize, next: InstIdx) -> InstIdx {
        self.push(Inst::StartMark { index, next })
    }

    pub fn end_mark(&mut self, index: isize, next: InstIdx) -> InstIdx {
        self.push(Inst::EndMark { index, next })
    }

    pub fn backref(&mut self, index: usize, next: InstIdx) -> InstIdx {
        self.push(Inst::Backref { index, next })
    }

    pub fn word_boundary(&mut self, next: InstIdx) -> InstIdx {
        self.push(Inst::WordBoundary { next })
    }

    pub fn buffer_start(&mut self, next: InstIdx) -> InstIdx {
        self.push(Inst::BufferStart { next })
    }

    pub fn buffer_end(&mut self, next: InstIdx) -> InstIdx {
        self.push(Inst::BufferEnd { next })
    }

    pub fn start_line(&mut self, next: InstIdx) -> InstIdx {
        self.push(Inst::StartLine { next })
    }

    pub fn end_line(&mut self, next: InstIdx) -> InstIdx {
        self.push(Inst::EndLine { next })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn rep(
        &mut self,
        id: usize,
        min: u32,
        max: Option<u32>,
        greedy: bool,
        body: InstIdx,
        tail: InstIdx,
    ) -> InstIdx {
        self.push(Inst::Rep { id, min, max, greedy, body, tail })
    }

    pub fn match_(&mut self) -> InstIdx {
        self.push(Inst::Match)
    }

    pub fn build(self, entry: InstIdx, mark_count: usize) -> Vec<Inst> {
        assert!(
            self.insts.iter().all(|inst| !matches!(inst, Inst::Jump { alt } if *alt == InstIdx::MAX)),
            "unpatched reserved instruction in assembled program"
        );
        let _ = entry;
        let _ = mark_count;
        self.insts
    }

    /// Convenience for the common case: build and wrap directly into a
    /// [`Program`] with a trivial unanchored restart strategy.
    pub fn into_program(self, entry: InstIdx, mark_count: usize) -> Program {
        let insts = self.build(entry, mark_count);
        Program::new(insts, entry, mark_count, RestartStrategy::Buf, None, false)
    }

    pub fn into_program_with_start_set(
        self,
        entry: InstIdx,
        mark_count: usize,
        start_chars: impl IntoIterator<Item = char>,
    ) -> Program {
        let insts = self.build(entry, mark_count);
        let bitmap = StartCharBitmap::from_chars(start_chars);
        Program::new(insts, entry, mark_count, RestartStrategy::Any, Some(bitmap), false)
    }
}

impl Default for Asm {
    fn default() -> Asm {
        Asm::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::AsciiClassifier;
    use crate::cursor::StrInput;
    use crate::flags::MatchFlags;
    use crate::interp::MatcherState;

    #[test]
    fn assembles_a_simple_literal_program() {
        let mut asm = Asm::new();
        let m = asm.match_();
        let lit = asm.lit("ok", m);
        let program = asm.into_program(lit, 0);
        let classifier = AsciiClassifier;
        let input = StrInput::new("ok");
        let max = program.estimate_max_state_count(Some(2));
        let mut state = MatcherState::new(&program, &classifier, &input, MatchFlags::MATCH_PERL, max);
        assert!(state.try_match(input.base()).unwrap());
    }

    #[test]
    fn assembles_a_loop_with_reserve_and_patch() {
        // /a*/ as an explicit rep loop: rep(body=literal 'a' -> jump back, tail=match)
        let mut asm = Asm::new();
        let rep_slot = asm.reserve();
        let m = asm.match_();
        let jump_back = asm.jump(rep_slot);
        let body = asm.lit("a", jump_back);
        asm.patch(rep_slot, Inst::Rep { id: 0, min: 0, max: None, greedy: true, body, tail: m });
        let program = asm.into_program(rep_slot, 0);
        let classifier = AsciiClassifier;
        let input = StrInput::new("aaa");
        let max = program.estimate_max_state_count(Some(3));
        let mut state = MatcherState::new(&program, &classifier, &input, MatchFlags::MATCH_PERL, max);
        assert!(state.try_match(input.base()).unwrap());
        assert_eq!(state.result().overall(), Some((0, 3)));
    }
}

// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Integration-level scenario tests against hand-built programs (pattern
//! compilation lives outside this crate, so each scenario builds its own
//! small instruction graph instead of calling a pattern parser).

use regex_core::{
    AsciiClassifier, CharClass, Inst, LongSet, MatchFlags, Matcher, Program, RestartStrategy,
    StartCharBitmap, StrInput,
};

#[test]
fn alternation_inside_a_group_finds_both_occurrences_in_turn() {
    // /a(b|c)d/ against "xabdxacdy"
    let insts = vec![
        Inst::Literal { chars: vec!['a'], next: 1 },
        Inst::StartMark { index: 1, next: 2 },
        Inst::Alt { next: 3, alt: 4 },
        Inst::Literal { chars: vec!['b'], next: 5 },
        Inst::Literal { chars: vec!['c'], next: 5 },
        Inst::EndMark { index: 1, next: 6 },
        Inst::Literal { chars: vec!['d'], next: 7 },
        Inst::Match,
    ];
    let bitmap = StartCharBitmap::from_chars(Some('a'));
    let program = Program::new(insts, 0, 1, RestartStrategy::Any, Some(bitmap), false);
    let classifier = AsciiClassifier;
    let input = StrInput::new("xabdxacdy");
    let mut matcher = Matcher::new(&program, &classifier, &input);

    let first = matcher.find(MatchFlags::MATCH_PERL).unwrap().expect("first occurrence");
    assert_eq!(first.overall(), Some((1, 4)));
    assert_eq!(first.get(1), Some((2, 3)));

    let second = matcher.find(MatchFlags::MATCH_PERL).unwrap().expect("second occurrence");
    assert_eq!(second.overall(), Some((5, 8)));
    assert_eq!(second.get(1), Some((6, 7)));

    assert!(matcher.find(MatchFlags::MATCH_PERL).unwrap().is_none());
}

#[test]
fn start_line_anchor_skips_to_the_next_line_start() {
    // /^hello/ against "say hello\nhello world": the first "hello" isn't at
    // a line start, only the second is.
    let insts = vec![
        Inst::StartLine { next: 1 },
        Inst::Literal { chars: "hello".chars().collect(), next: 2 },
        Inst::Match,
    ];
    let program = Program::new(insts, 0, 0, RestartStrategy::Line, None, false);
    let classifier = AsciiClassifier;
    let input = StrInput::new("say hello\nhello world");
    let mut matcher = Matcher::new(&program, &classifier, &input);
    let caps = matcher.find(MatchFlags::MATCH_PERL).unwrap().expect("should find the second hello");
    assert_eq!(caps.overall(), Some((10, 15)));
}

#[test]
fn start_line_anchor_with_not_bol_and_no_relocation_fails_at_the_buffer_start() {
    let insts = vec![
        Inst::StartLine { next: 1 },
        Inst::Literal { chars: "hello".chars().collect(), next: 2 },
        Inst::Match,
    ];
    let program = Program::new(insts, 0, 0, RestartStrategy::Buf, None, false);
    let classifier = AsciiClassifier;
    let input = StrInput::new("say hello\nhello world");
    let mut matcher = Matcher::new(&program, &classifier, &input);
    let flags = MatchFlags::MATCH_PERL | MatchFlags::MATCH_NOT_BOL;
    assert!(matcher.find(flags).unwrap().is_none());
}

#[test]
fn word_boundaries_find_successive_words_then_stop() {
    // /\b\w+\b/ against " foo bar "
    let insts = vec![
        Inst::WordBoundary { next: 1 },
        Inst::UnitRepeat {
            id: 0,
            unit: regex_core::RepeatUnit::LongSet(LongSet {
                ranges: vec![],
                classes: vec![CharClass::Word],
                negated: false,
            }),
            min: 1,
            max: None,
            greedy: true,
            tail: 2,
        },
        Inst::WordBoundary { next: 3 },
        Inst::Match,
    ];
    let program = Program::new(insts, 0, 0, RestartStrategy::Word, None, false);
    let classifier = AsciiClassifier;
    let input = StrInput::new(" foo bar ");
    let mut matcher = Matcher::new(&program, &classifier, &input);

    let first = matcher.find(MatchFlags::MATCH_PERL).unwrap().expect("foo");
    assert_eq!(first.overall(), Some((1, 4)));
    let second = matcher.find(MatchFlags::MATCH_PERL).unwrap().expect("bar");
    assert_eq!(second.overall(), Some((5, 8)));
    assert!(matcher.find(MatchFlags::MATCH_PERL).unwrap().is_none());
}

#[test]
fn backreference_finds_the_first_doubled_character() {
    // /(.)\1/ against "abccba"
    let insts = vec![
        Inst::StartMark { index: 1, next: 1 },
        Inst::Wild { next: 2 },
        Inst::EndMark { index: 1, next: 3 },
        Inst::Backref { index: 1, next: 4 },
        Inst::Match,
    ];
    let bitmap = StartCharBitmap::new([true; 256]);
    let program = Program::new(insts, 0, 1, RestartStrategy::Any, Some(bitmap), false);
    let classifier = AsciiClassifier;
    let input = StrInput::new("abccba");
    let mut matcher = Matcher::new(&program, &classifier, &input);
    let caps = matcher.find(MatchFlags::MATCH_PERL).unwrap().expect("should find the doubled c");
    assert_eq!(caps.overall(), Some((2, 4)));
    assert_eq!(caps.get(1), Some((2, 3)));
}

#[test]
fn dot_honors_not_dot_newline() {
    // /a.b/ against "a\nb"
    let insts = vec![
        Inst::Literal { chars: vec!['a'], next: 1 },
        Inst::Wild { next: 2 },
        Inst::Literal { chars: vec!['b'], next: 3 },
        Inst::Match,
    ];
    let program = Program::new(insts, 0, 0, RestartStrategy::Buf, None, false);
    let classifier = AsciiClassifier;
    let input = StrInput::new("a\nb");

    let mut without_flag = Matcher::new(&program, &classifier, &input);
    assert!(without_flag.find(MatchFlags::MATCH_PERL).unwrap().is_some());

    let mut with_flag = Matcher::new(&program, &classifier, &input);
    let flags = MatchFlags::MATCH_PERL | MatchFlags::MATCH_NOT_DOT_NEWLINE;
    assert!(with_flag.find(flags).unwrap().is_none());
}

#[test]
fn restart_strategies_agree_with_restart_any_on_where_a_literal_is_found() {
    // Restart equivalence: an optimized restart strategy (here, a literal
    // scan) must find the same offsets restart_any would, for the same
    // program.
    let text = "a dog and a cat and another cat";
    let insts = vec![
        Inst::Literal { chars: vec!['c', 'a', 't'], next: 1 },
        Inst::Match,
    ];

    let bitmap = StartCharBitmap::from_chars(Some('c'));
    let any_program = Program::new(insts.clone(), 0, 0, RestartStrategy::Any, Some(bitmap), false);
    let classifier = AsciiClassifier;
    let input = StrInput::new(text);
    let mut any_matcher = Matcher::new(&any_program, &classifier, &input);
    let mut any_hits = Vec::new();
    while let Some(caps) = any_matcher.find(MatchFlags::MATCH_PERL).unwrap() {
        any_hits.push(caps.overall().unwrap());
    }

    let kmp = regex_core::KmpInfo::new(vec!['c', 'a', 't']);
    let lit_program = Program::new(insts, 0, 0, RestartStrategy::Lit(kmp), None, false);
    let mut lit_matcher = Matcher::new(&lit_program, &classifier, &input);
    let mut lit_hits = Vec::new();
    while let Some(caps) = lit_matcher.find(MatchFlags::MATCH_PERL).unwrap() {
        lit_hits.push(caps.overall().unwrap());
    }

    assert_eq!(any_hits, lit_hits);
    assert_eq!(any_hits, vec![(12, 15), (28, 31)]);
}

// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::error;
use std::fmt;

/// An error raised by the matching core.
///
/// Ordinary "no match" is not an error — `Matcher::find`/`Matcher::is_match`
/// return `false` for that. `Error` is reserved for the cases where the
/// matcher cannot finish: it ran out of backtracking memory, blew through
/// its work budget, or was handed a program it can't execute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The backtracking stack could not grow any further (iterative
    /// engine), or the host call stack would have overflowed (recursive
    /// engine). The matcher's internal state is undefined after this;
    /// discard it.
    MemoryExhausted,
    /// `state_count` exceeded `max_state_count` before a match was found.
    /// Equivalent to memory exhaustion from the caller's point of view —
    /// it exists as a separate variant so callers can distinguish
    /// catastrophic backtracking from genuine memory pressure.
    ComplexityExceeded { state_count: usize, limit: usize },
    /// An instruction carried an opcode outside the dispatch table, or a
    /// `next`/`alt`/brace index pointed outside the program. This indicates
    /// a bug in the compiler that produced the program, not a user error.
    InvalidProgram { pc: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::MemoryExhausted => {
                write!(f, "backtracking stack exhausted")
            }
            Error::ComplexityExceeded { state_count, limit } => write!(
                f,
                "match exceeded complexity limit ({} states, limit {})",
                state_count, limit,
            ),
            Error::InvalidProgram { pc } => {
                write!(f, "invalid program: bad instruction at pc {}", pc)
            }
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = ::std::result::Result<T, Error>;

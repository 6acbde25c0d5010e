// TACK, a compact Lisp runtime for small machines.

// SPDX-FileCopyrightText: © 2021 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// TACK is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/lib.rs

// Crate root; error type and host facing entry points.

// <>

//! TACK, a compact Lisp runtime for small machines
//!
//! Values are tagged scalars or handles into a cell arena. Memory is
//! recovered by explicit release or by a mark and sweep pass between
//! top level forms. Builtins and user symbols share one index space.

use std::fmt;
use std::io::{self, BufRead};

pub mod eval;
pub mod iter;
pub mod lists;
pub mod memmgt;
pub mod parser;
pub mod printer;
pub mod session;
pub mod stdenv;
pub mod symtab;
pub mod table;
pub mod value;

pub use memmgt::{Heap, Unique};
pub use session::Session;
pub use symtab::{Builtin, Callable, NativeFn, SpecialFn};
pub use value::{SymId, Value};

pub enum TackErr {
    /// Source text could not be read
    Parse(String),
    /// A builtin catalog was malformed
    Catalog(String),
    TooManyBuiltins(usize),
    Io(io::Error),
}

impl fmt::Display for TackErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TackErr::Parse(msg) => write!(f, "parse error: {}", msg),
            TackErr::Catalog(msg) => write!(f, "catalog error: {}", msg),
            TackErr::TooManyBuiltins(n) => {
                write!(f, "{} builtins exceeds limit of {}", n, symtab::MAX_BUILTINS)
            }
            TackErr::Io(e) => write!(f, "i/o error: {}", e),
        }
    }
}

impl fmt::Debug for TackErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl std::error::Error for TackErr {}

impl From<io::Error> for TackErr {
    fn from(e: io::Error) -> Self {
        TackErr::Io(e)
    }
}

/// Reads lines from a stream, printing each result, until it ends
///
/// Parse errors are reported and the session carries on.
pub fn repl(stream_in: impl BufRead) -> Result<(), TackErr> {
    let mut ses = Session::startup()?;

    for line in stream_in.lines() {
        let line = line?;
        match ses.interpret(&line) {
            Ok(results) => {
                for out in results {
                    println!("{}", out);
                }
            }
            Err(e) => println!("{}", e),
        }
    }

    Ok(())
}

/// Interprets a whole file, returning the rendering of each result
pub fn run_file(filename: &str) -> Result<Vec<String>, TackErr> {
    let code = std::fs::read_to_string(filename)?;
    Session::startup()?.interpret(&code)
}

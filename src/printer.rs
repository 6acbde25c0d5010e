// TACK, a compact Lisp runtime for small machines.

// SPDX-FileCopyrightText: © 2021 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// TACK is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/printer.rs

// Renders values as text.

// <>

use crate::{
    session::Session,
    value::{CellRef, Value},
};

use std::fmt;

/// Nesting beyond this prints as an ellipsis
pub const PRINT_DEPTH: usize = 64;

/// Value paired with the session needed to render it
pub struct Shown<'a> {
    ses: &'a Session,
    val: Value,
}

impl<'a> Shown<'a> {
    pub fn new(ses: &'a Session, val: Value) -> Shown<'a> {
        Shown { ses, val }
    }
}

impl fmt::Display for Shown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut open = Vec::new();
        write_value(self.ses, f, self.val, 0, &mut open)
    }
}

/// `open` holds the tables currently being printed, so a table that
/// contains itself prints a marker instead of recursing
fn write_value(
    ses: &Session,
    f: &mut fmt::Formatter<'_>,
    val: Value,
    depth: usize,
    open: &mut Vec<CellRef>,
) -> fmt::Result {
    if depth > PRINT_DEPTH {
        return write!(f, "...");
    }

    match val {
        Value::Nil => write!(f, "nil"),
        Value::True => write!(f, "true"),
        Value::False => write!(f, "false"),
        Value::Undefined => write!(f, "undefined"),
        Value::TypeError => write!(f, "type-error"),
        Value::Integer(n) => write!(f, "{}", n),
        Value::Symbol(id) => match ses.symtab.get_name(id) {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "#<symbol {}>", id.0),
        },
        Value::Pair(_) => {
            write!(f, "(")?;
            let mut cur = val;
            let mut first = true;
            let mut budget = ses.heap.capacity();

            while let Some(item) = ses.heap.next(&mut cur) {
                if budget == 0 {
                    write!(f, " ...")?;
                    cur = Value::Nil;
                    break;
                }
                budget -= 1;

                if !first {
                    write!(f, " ")?;
                }
                first = false;
                write_value(ses, f, item, depth + 1, open)?;
            }

            if !cur.is_nil() {
                write!(f, " . ")?;
                write_value(ses, f, cur, depth + 1, open)?;
            }
            write!(f, ")")
        }
        Value::Table(r) => {
            if open.contains(&r) {
                return write!(f, "{{...}}");
            }
            open.push(r);

            write!(f, "{{")?;
            for (i, (key, item)) in ses.heap.table_entries(val).into_iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_value(ses, f, key, depth + 1, open)?;
                write!(f, " ")?;
                write_value(ses, f, item, depth + 1, open)?;
            }
            write!(f, "}}")?;

            open.pop();
            Ok(())
        }
    }
}

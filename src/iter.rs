// TACK, a compact Lisp runtime for small machines.

// SPDX-FileCopyrightText: © 2021 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// TACK is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/iter.rs

// Generic iteration. Any iterable source is pushed one item at a time
// through a callback which folds into an accumulator cell.

// <>

use crate::{memmgt::Unique, session::Session, value::Value};

impl Session {
    /// Feeds each item of `source` to `each` along with the context cell
    ///
    /// An integer n yields 0 through n - 1, and nothing when n is not
    /// positive. A proper list yields its elements in order. Returns
    /// false, without calling back, for anything else.
    pub fn iter_any<F>(&mut self, source: Value, ctx: &Unique, mut each: F) -> bool
    where
        F: FnMut(&mut Session, &Unique, Value),
    {
        match source {
            Value::Integer(n) => {
                for i in 0..n.max(0) {
                    each(self, ctx, Value::Integer(i));
                }
                true
            }
            Value::Nil | Value::Pair(_) if self.heap.is_list(source) => {
                let mut rest = source;
                // the cursor moves on before the callback can touch the cell
                while let Some(item) = self.heap.next(&mut rest) {
                    each(self, ctx, item);
                }
                true
            }
            _ => false,
        }
    }
}

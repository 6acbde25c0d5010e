// TACK, a compact Lisp runtime for small machines.

// SPDX-FileCopyrightText: © 2021 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// TACK is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/table.rs

// Tables, serving both as environments and as first class
// dictionaries. A table is a header cell holding its entry list on
// the left and an optional parent table on the right; lookups that
// miss locally continue into the parent. Path operations walk a list
// of keys through nested tables.

// <>

use crate::{memmgt::Heap, value::Value};

impl Heap {
    pub fn table_new(&mut self, parent: Value) -> Value {
        Value::Table(self.alloc(Value::Nil, parent))
    }

    pub fn table_parent(&self, tbl: Value) -> Value {
        match tbl {
            Value::Table(r) => self.right(r),
            _ => Value::Undefined,
        }
    }

    /// Entry pair for a key in this table alone
    fn table_entry(&self, tbl: Value, key: Value) -> Option<Value> {
        let r = match tbl {
            Value::Table(r) => r,
            _ => return None,
        };

        let mut entries = self.left(r);
        while let Some(entry) = self.next(&mut entries) {
            if self.car(entry) == key {
                return Some(entry);
            }
        }
        None
    }

    /// Local entries in insertion order, as (key, value)
    pub fn table_entries(&self, tbl: Value) -> Vec<(Value, Value)> {
        let entries = match tbl {
            Value::Table(r) => self.left(r),
            _ => return Vec::new(),
        };

        self.to_vec(entries)
            .into_iter()
            .rev()
            .map(|e| (self.car(e), self.cdr(e)))
            .collect()
    }

    pub fn table_get(&self, tbl: Value, key: Value) -> Value {
        if !tbl.is_table() {
            return Value::TypeError;
        }

        let mut cur = tbl;
        while cur.is_table() {
            if let Some(entry) = self.table_entry(cur, key) {
                return self.cdr(entry);
            }
            cur = self.table_parent(cur);
        }
        Value::Undefined
    }

    pub fn table_has(&self, tbl: Value, key: Value) -> bool {
        let mut cur = tbl;
        while cur.is_table() {
            if self.table_entry(cur, key).is_some() {
                return true;
            }
            cur = self.table_parent(cur);
        }
        false
    }

    /// Binds in this table only, never in a parent
    pub fn table_set(&mut self, tbl: Value, key: Value, val: Value) -> bool {
        let r = match tbl {
            Value::Table(r) => r,
            _ => return false,
        };

        if let Some(entry) = self.table_entry(tbl, key) {
            return self.set_cdr(entry, val);
        }

        let entry = self.cons(key, val);
        let entries = self.left(r);
        let spine = self.cons(entry, entries);
        self.set_left(r, spine)
    }

    /// Unbinds in this table only; the entry cells are released
    pub fn table_del(&mut self, tbl: Value, key: Value) -> bool {
        let r = match tbl {
            Value::Table(r) => r,
            _ => return false,
        };

        let mut prev = Value::Nil;
        let mut cur = self.left(r);
        while let Value::Pair(link) = cur {
            let entry = self.left(link);
            let rest = self.right(link);

            if self.car(entry) == key {
                match prev {
                    Value::Nil => self.set_left(r, rest),
                    _ => self.set_cdr(prev, rest),
                };
                // entry cells never escape the table
                if let Some(e) = entry.cell() {
                    self.release(e);
                }
                self.release(link);
                return true;
            }

            prev = cur;
            cur = rest;
        }
        false
    }

    /// Follows every key of a path
    ///
    /// A path that runs out of bindings gives Undefined; one that runs
    /// into a bound value which is not a table gives TypeError.
    pub fn table_aget(&self, tbl: Value, path: Value) -> Value {
        let mut cur = tbl;
        let mut keys = path;
        while let Some(key) = self.next(&mut keys) {
            cur = match cur {
                Value::Table(_) => self.table_get(cur, key),
                Value::Undefined => return Value::Undefined,
                _ => return Value::TypeError,
            };
        }
        cur
    }

    /// Value bound to a key in this table alone, Undefined if unbound
    fn table_local(&self, tbl: Value, key: Value) -> Value {
        match self.table_entry(tbl, key) {
            Some(entry) => self.cdr(entry),
            None => Value::Undefined,
        }
    }

    /// Table holding the final key of a path, found without creating
    ///
    /// When `local` is set the first segment must be bound in `tbl`
    /// itself rather than anywhere along its parent chain.
    fn path_parent(&self, tbl: Value, keys: &[Value], local: bool) -> Value {
        keys.iter().enumerate().fold(tbl, |cur, (i, &key)| match cur {
            Value::Table(_) if local && i == 0 => self.table_local(cur, key),
            Value::Table(_) => self.table_get(cur, key),
            Value::Undefined => Value::Undefined,
            _ => Value::TypeError,
        })
    }

    pub fn table_ahas(&self, tbl: Value, path: Value) -> bool {
        let keys = self.to_vec(path);
        match keys.split_last() {
            Some((&last, init)) => self.table_has(self.path_parent(tbl, init, false), last),
            None => false,
        }
    }

    /// Creates missing intermediate tables on the way down; refuses to
    /// pass through a bound value which is not a table
    ///
    /// Like `table_set` this never writes into a parent: a first segment
    /// bound only in a parent gets a fresh local table instead.
    pub fn table_aset(&mut self, tbl: Value, path: Value, val: Value) -> bool {
        let keys = self.to_vec(path);
        let (&last, init) = match keys.split_last() {
            Some(split) => split,
            None => return false,
        };

        let mut cur = tbl;
        for &key in init {
            if !cur.is_table() {
                return false;
            }
            cur = match self.table_local(cur, key) {
                Value::Undefined => {
                    let inner = self.table_new(Value::Nil);
                    self.table_set(cur, key, inner);
                    inner
                }
                found => found,
            };
        }

        self.table_set(cur, last, val)
    }

    /// Removes only the final key of a path, never through a parent
    pub fn table_adel(&mut self, tbl: Value, path: Value) -> bool {
        let keys = self.to_vec(path);
        match keys.split_last() {
            Some((&last, init)) => {
                let parent = self.path_parent(tbl, init, true);
                self.table_del(parent, last)
            }
            None => false,
        }
    }
}

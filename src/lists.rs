// TACK, a compact Lisp runtime for small machines.

// SPDX-FileCopyrightText: © 2021 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// TACK is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/lists.rs

// List operations over heap cells. The in-place variants relink the
// cells they are given rather than allocating.

// <>

use crate::{memmgt::Heap, value::Value};

impl Heap {
    /// Takes the head of a list and advances the cursor past it
    pub fn next(&self, cur: &mut Value) -> Option<Value> {
        match *cur {
            Value::Pair(r) => {
                let item = self.left(r);
                *cur = self.right(r);
                Some(item)
            }
            _ => None,
        }
    }

    pub fn list(&mut self, items: &[Value]) -> Value {
        items
            .iter()
            .rev()
            .fold(Value::Nil, |acc, &item| self.cons(item, acc))
    }

    pub fn to_vec(&self, list: Value) -> Vec<Value> {
        let mut out = Vec::new();
        let mut cur = list;
        while let Some(item) = self.next(&mut cur) {
            out.push(item);
        }
        out
    }

    /// Nil, or a chain of pairs ending in Nil
    pub fn is_list(&self, val: Value) -> bool {
        let mut cur = val;
        // a spine longer than the arena must be cyclic
        for _ in 0..=self.capacity() {
            match cur {
                Value::Nil => return true,
                Value::Pair(r) => cur = self.right(r),
                _ => return false,
            }
        }
        false
    }

    pub fn length(&self, list: Value) -> usize {
        let mut count = 0;
        let mut cur = list;
        while self.next(&mut cur).is_some() {
            count += 1;
        }
        count
    }

    /// Fresh reversed copy of the spine
    pub fn reverse(&mut self, list: Value) -> Value {
        let mut out = Value::Nil;
        let mut cur = list;
        while let Some(item) = self.next(&mut cur) {
            out = self.cons(item, out);
        }
        out
    }

    /// Reverses in place by relinking the existing cells
    pub fn ireverse(&mut self, list: Value) -> Value {
        let mut prev = Value::Nil;
        let mut cur = list;
        while let Value::Pair(r) = cur {
            let next = self.right(r);
            self.set_right(r, prev);
            prev = cur;
            cur = next;
        }
        prev
    }

    fn last_pair(&self, list: Value) -> Value {
        let mut cur = list;
        loop {
            match self.cdr(cur) {
                next @ Value::Pair(_) => cur = next,
                _ => return cur,
            }
        }
    }

    /// Links `tail` onto the end of `list`
    pub fn append(&mut self, list: Value, tail: Value) -> Value {
        if !list.is_pair() {
            return tail;
        }
        let last = self.last_pair(list);
        self.set_cdr(last, tail);
        list
    }

    pub fn nth(&self, list: Value, index: i32) -> Value {
        if index < 0 {
            return Value::Undefined;
        }
        let mut cur = list;
        for _ in 0..index {
            if self.next(&mut cur).is_none() {
                return Value::Undefined;
            }
        }
        self.next(&mut cur).unwrap_or(Value::Undefined)
    }

    pub fn set_nth(&mut self, list: Value, index: i32, val: Value) -> bool {
        if index < 0 {
            return false;
        }
        let mut cur = list;
        for _ in 0..index {
            if self.next(&mut cur).is_none() {
                return false;
            }
        }
        self.set_car(cur, val)
    }

    pub fn has(&self, list: Value, val: Value) -> bool {
        let mut cur = list;
        while let Some(item) = self.next(&mut cur) {
            if item == val {
                return true;
            }
        }
        false
    }

    /// Appends `val` unless already present
    pub fn add(&mut self, list: Value, val: Value) -> Value {
        if self.has(list, val) {
            return list;
        }
        let cell = self.cons(val, Value::Nil);
        self.append(list, cell)
    }

    /// Unlinks the first occurrence of `val`
    pub fn remove(&mut self, list: Value, val: Value) -> Value {
        if list.is_pair() && self.car(list) == val {
            return self.cdr(list);
        }

        let mut prev = list;
        let mut cur = self.cdr(list);
        while let Value::Pair(r) = cur {
            if self.left(r) == val {
                let rest = self.right(r);
                self.set_cdr(prev, rest);
                break;
            }
            prev = cur;
            cur = self.right(r);
        }
        list
    }

    /// Sorted fresh copy of a list of integers
    pub fn sort(&mut self, list: Value) -> Value {
        let mut nums = Vec::new();
        for item in self.to_vec(list) {
            match item {
                Value::Integer(n) => nums.push(n),
                _ => return Value::TypeError,
            }
        }
        nums.sort_unstable();

        let items: Vec<Value> = nums.into_iter().map(Value::Integer).collect();
        self.list(&items)
    }
}

// TACK, a compact Lisp runtime for small machines.

// SPDX-FileCopyrightText: © 2021 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// TACK is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/eval.rs

// The evaluator. Special forms are handed their environment and raw
// operands; every other callable gets its arguments evaluated left to
// right. User functions run in a fresh frame whose parent is the root
// environment, so they see their parameters and the globals only.

// <>

use crate::{session::Session, symtab::Callable, value::Value};

impl Session {
    pub fn eval(&mut self, env: Value, expr: Value) -> Value {
        match expr {
            // builtin names are self-evaluating
            Value::Symbol(id) if id.is_builtin() => expr,
            Value::Symbol(_) => self.heap.table_get(env, expr),
            Value::Pair(_) => {
                self.depth += 1;
                if cfg!(feature = "stkdbg") {
                    log::trace!("eval depth {}: {}", self.depth, self.show(expr));
                }
                let out = self.eval_call(env, expr);
                self.depth -= 1;
                out
            }
            _ => expr,
        }
    }

    fn eval_call(&mut self, env: Value, expr: Value) -> Value {
        let head = self.heap.car(expr);
        let raw = self.heap.cdr(expr);

        if let Value::Symbol(id) = head {
            if id.is_builtin() {
                return match self.symtab.get_fn(id) {
                    Some(Callable::Special(f)) => f(self, env, raw),
                    Some(Callable::Native(f)) => {
                        let args = self.eval_args(env, raw);
                        f(self, args)
                    }
                    None => Value::TypeError,
                };
            }
        }

        let func = self.eval(env, head);

        // `a.b.c` reads as (a b c); with a table at its head it is a path
        if func.is_table() && self.is_path_tail(raw) {
            return self.heap.table_aget(func, raw);
        }

        let args = self.eval_args(env, raw);
        self.apply(func, args)
    }

    fn is_path_tail(&self, raw: Value) -> bool {
        raw.is_pair()
            && self.heap.is_list(raw)
            && self
                .heap
                .to_vec(raw)
                .iter()
                .all(|k| matches!(k, Value::Symbol(id) if !id.is_builtin()))
    }

    /// Evaluates each operand in order into a fresh list
    pub fn eval_args(&mut self, env: Value, raw: Value) -> Value {
        let mut rest = raw;
        let mut acc = Value::Nil;
        while let Some(arg) = self.heap.next(&mut rest) {
            let val = self.eval(env, arg);
            acc = self.heap.cons(val, acc);
        }
        self.heap.ireverse(acc)
    }

    /// Calls a function value on already evaluated arguments
    pub fn apply(&mut self, func: Value, args: Value) -> Value {
        match func {
            Value::Symbol(id) if id.is_builtin() => match self.symtab.get_fn(id) {
                Some(Callable::Special(f)) => {
                    let root = self.root();
                    f(self, root, args)
                }
                Some(Callable::Native(f)) => f(self, args),
                None => Value::TypeError,
            },
            Value::Symbol(_) => match self.heap.table_get(self.root(), func) {
                // one hop only; a symbol naming a symbol is not callable
                Value::Symbol(id) if !id.is_builtin() => Value::TypeError,
                found => self.apply(found, args),
            },
            Value::Pair(_) => self.apply_user(func, args),
            _ => Value::TypeError,
        }
    }

    /// Calls a function value on a single argument
    pub fn apply_one(&mut self, func: Value, item: Value) -> Value {
        let args = self.heap.cons(item, Value::Nil);
        self.apply(func, args)
    }

    /// Runs a `(params body...)` definition
    ///
    /// Parameters bind positionally, missing arguments become Undefined
    /// and extras are dropped. A bare symbol in place of the parameter
    /// list receives the whole argument list.
    fn apply_user(&mut self, func: Value, args: Value) -> Value {
        let params = self.heap.car(func);
        let body = self.heap.cdr(func);
        let root = self.root();
        let frame = self.heap.table_new(root);

        match params {
            Value::Symbol(_) => {
                self.heap.table_set(frame, params, args);
            }
            _ => {
                let mut names = params;
                let mut vals = args;
                while let Some(name) = self.heap.next(&mut names) {
                    let val = self.heap.next(&mut vals).unwrap_or(Value::Undefined);
                    self.heap.table_set(frame, name, val);
                }
            }
        }

        self.block(frame, body)
    }

    /// Evaluates expressions in order, yielding the last result
    pub fn block(&mut self, env: Value, exprs: Value) -> Value {
        let mut rest = exprs;
        let mut result = Value::Undefined;
        while let Some(expr) = self.heap.next(&mut rest) {
            result = self.eval(env, expr);
        }
        result
    }
}

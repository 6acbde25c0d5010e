// TACK, a compact Lisp runtime for small machines.

// SPDX-FileCopyrightText: © 2021 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// TACK is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/stdenv.rs

// The core catalog: every builtin loaded into a fresh session, in
// registry order. Special forms come first.

// <>

use crate::{memmgt::Unique, session::Session, symtab::Builtin, value::Value};

/// Generates a constant slice of builtin descriptors from closures
///
/// Special forms bind the session, the calling environment and their
/// raw operand list. Natives bind the session and their evaluated
/// argument list, and may name leading arguments in brackets; those
/// are taken off the front of the list in order, Undefined when
/// absent, leaving the remainder in the list binding.
#[macro_export]
macro_rules! tack_fn {
    ( special $array:ident; $ses:ident $env:ident $args:ident;
      $( $name:literal $body:block )+
    ) => {
        pub const $array: &[$crate::symtab::Builtin] = &[$(
            $crate::symtab::Builtin {
                name: $name,
                call: $crate::symtab::Callable::Special(
                    |ses: &mut $crate::session::Session,
                     env: $crate::value::Value,
                     args: $crate::value::Value|
                     -> $crate::value::Value {
                        // not every form touches every binding
                        #[allow(unused_variables)]
                        let $ses = ses;
                        #[allow(unused_variables)]
                        let $env = env;
                        #[allow(unused_mut, unused_variables)]
                        let mut $args = args;
                        $body
                    },
                ),
            }
        ),+];
    };

    ( native $array:ident; $ses:ident $args:ident;
      $( $name:literal [ $($arg:ident),* ] $body:block )+
    ) => {
        pub const $array: &[$crate::symtab::Builtin] = &[$(
            $crate::symtab::Builtin {
                name: $name,
                call: $crate::symtab::Callable::Native(
                    |ses: &mut $crate::session::Session,
                     args: $crate::value::Value|
                     -> $crate::value::Value {
                        #[allow(unused_variables)]
                        let $ses = ses;
                        #[allow(unused_mut, unused_variables)]
                        let mut $args = args;
                        $(
                            let $arg = $ses
                                .heap
                                .next(&mut $args)
                                .unwrap_or($crate::value::Value::Undefined);
                        )*
                        $body
                    },
                ),
            }
        ),+];
    };
}

/// Every core builtin, special forms first
pub fn core_catalog() -> Vec<Builtin> {
    SPECIAL_FORMS.iter().chain(CORE_NATIVES).copied().collect()
}

/// Looks a key up in a table, treating a list key as a path
fn lookup(ses: &Session, tbl: Value, key: Value) -> Value {
    if ses.heap.is_list(key) {
        ses.heap.table_aget(tbl, key)
    } else {
        ses.heap.table_get(tbl, key)
    }
}

fn contains(ses: &Session, tbl: Value, key: Value) -> bool {
    if ses.heap.is_list(key) {
        ses.heap.table_ahas(tbl, key)
    } else {
        ses.heap.table_has(tbl, key)
    }
}

fn bind(ses: &mut Session, tbl: Value, key: Value, val: Value) -> bool {
    if ses.heap.is_list(key) {
        ses.heap.table_aset(tbl, key, val)
    } else {
        ses.heap.table_set(tbl, key, val)
    }
}

fn unbind(ses: &mut Session, tbl: Value, key: Value) -> bool {
    if ses.heap.is_list(key) {
        ses.heap.table_adel(tbl, key)
    } else {
        ses.heap.table_del(tbl, key)
    }
}

/// Left fold over integer arguments, TypeError on anything else
fn fold_ints(
    ses: &Session,
    args: Value,
    init: Option<i32>,
    f: fn(i32, i32) -> Option<i32>,
) -> Value {
    let mut rest = args;
    let mut acc = match init {
        Some(n) => n,
        None => match ses.heap.next(&mut rest) {
            Some(Value::Integer(n)) => n,
            _ => return Value::TypeError,
        },
    };

    while let Some(item) = ses.heap.next(&mut rest) {
        acc = match item {
            Value::Integer(n) => match f(acc, n) {
                Some(out) => out,
                None => return Value::TypeError,
            },
            _ => return Value::TypeError,
        };
    }
    Value::Integer(acc)
}

/// Checks that each adjacent pair of integer arguments is in order
fn chain_ints(ses: &Session, args: Value, ok: fn(i32, i32) -> bool) -> Value {
    let mut rest = args;
    let mut last = match ses.heap.next(&mut rest) {
        Some(Value::Integer(n)) => n,
        _ => return Value::TypeError,
    };

    while let Some(item) = ses.heap.next(&mut rest) {
        match item {
            Value::Integer(n) => {
                if !ok(last, n) {
                    return Value::False;
                }
                last = n;
            }
            _ => return Value::TypeError,
        }
    }
    Value::True
}

/// Runs a mapping callback over a source with a fresh context cell,
/// returning the accumulated list in source order
fn collect(
    ses: &mut Session,
    source: Value,
    func: Value,
    step: fn(&mut Session, &Unique, Value),
) -> Value {
    let ctx = ses.heap.cons_unique(func, Value::Nil);
    let ok = ses.iter_any(source, &ctx, step);
    let (_, acc) = ses.heap.free_cell(ctx);

    if ok {
        ses.heap.ireverse(acc)
    } else {
        Value::TypeError
    }
}

fn push_ctx(ses: &mut Session, ctx: &Unique, item: Value) {
    let acc = ses.heap.cdr(ctx.value());
    let acc = ses.heap.cons(item, acc);
    ses.heap.set_cdr(ctx.value(), acc);
}

tack_fn!(special SPECIAL_FORMS; ses env args;
    "get" {
        let key = ses.heap.next(&mut args).unwrap_or(Value::Nil);
        let key = ses.eval(env, key);
        lookup(ses, env, key)
    }

    "has" {
        while let Some(key) = ses.heap.next(&mut args) {
            let key = ses.eval(env, key);
            if !contains(ses, env, key) {
                return Value::False;
            }
        }
        Value::True
    }

    "del" {
        while let Some(key) = ses.heap.next(&mut args) {
            let key = ses.eval(env, key);
            unbind(ses, env, key);
        }
        Value::Undefined
    }

    "set" {
        let mut val = Value::Undefined;
        while let Some(key) = ses.heap.next(&mut args) {
            let key = ses.eval(env, key);
            val = match ses.heap.next(&mut args) {
                Some(expr) => ses.eval(env, expr),
                None => Value::Undefined,
            };
            if !bind(ses, env, key, val) {
                return Value::TypeError;
            }
        }
        val
    }

    "def" {
        let key = ses.heap.next(&mut args).unwrap_or(Value::Undefined);
        let def = ses.heap.copy(args);
        if !bind(ses, env, key, def) {
            return Value::TypeError;
        }
        key
    }

    "do" {
        ses.block(env, args)
    }

    "quote" {
        args
    }
);

tack_fn!(native CORE_NATIVES; ses args;
    "list" [] {
        args
    }

    "print" [] {
        let line = ses
            .heap
            .to_vec(args)
            .into_iter()
            .map(|v| ses.show(v).to_string())
            .collect::<Vec<String>>()
            .join(" ");
        ses.write_out(&line);
        ses.write_out("\n");
        Value::Undefined
    }

    "eval" [code, env] {
        if !env.is_table() {
            return Value::TypeError;
        }
        ses.eval(env, code)
    }

    "cons" [a, b] {
        ses.heap.cons(a, b)
    }

    "car" [a] {
        ses.heap.car(a)
    }

    "cdr" [a] {
        ses.heap.cdr(a)
    }

    "set-car" [a, b] {
        Value::bool(ses.heap.set_car(a, b))
    }

    "set-cdr" [a, b] {
        Value::bool(ses.heap.set_cdr(a, b))
    }

    "table" [] {
        ses.heap.table_new(Value::Nil)
    }

    "table?" [tbl] {
        Value::bool(tbl.is_table())
    }

    "t-get" [tbl, key] {
        if !tbl.is_table() {
            return Value::TypeError;
        }
        lookup(ses, tbl, key)
    }

    "t-has" [tbl] {
        if !tbl.is_table() {
            return Value::TypeError;
        }
        while let Some(key) = ses.heap.next(&mut args) {
            if !contains(ses, tbl, key) {
                return Value::False;
            }
        }
        Value::True
    }

    "t-del!" [tbl] {
        if !tbl.is_table() {
            return Value::TypeError;
        }
        while let Some(key) = ses.heap.next(&mut args) {
            unbind(ses, tbl, key);
        }
        tbl
    }

    "t-set!" [tbl] {
        if !tbl.is_table() {
            return Value::TypeError;
        }
        while let Some(key) = ses.heap.next(&mut args) {
            let val = ses.heap.next(&mut args).unwrap_or(Value::Undefined);
            if !bind(ses, tbl, key, val) {
                return Value::TypeError;
            }
        }
        tbl
    }

    "list?" [a] {
        Value::bool(ses.heap.is_list(a))
    }

    "length?" [list] {
        if !ses.heap.is_list(list) {
            return Value::TypeError;
        }
        Value::Integer(ses.heap.length(list) as i32)
    }

    "reverse" [list] {
        if !ses.heap.is_list(list) {
            return Value::TypeError;
        }
        ses.heap.reverse(list)
    }

    "reverse!" [list] {
        if !ses.heap.is_list(list) {
            return Value::TypeError;
        }
        ses.heap.ireverse(list)
    }

    "append!" [list] {
        if !ses.heap.is_list(list) {
            return Value::TypeError;
        }
        ses.heap.append(list, args)
    }

    "concat!" [] {
        let lists = ses.heap.to_vec(args);
        if !lists.iter().all(|&l| ses.heap.is_list(l)) {
            return Value::TypeError;
        }
        lists
            .into_iter()
            .rev()
            .fold(Value::Nil, |acc, l| ses.heap.append(l, acc))
    }

    "sort" [list] {
        if !ses.heap.is_list(list) {
            return Value::TypeError;
        }
        ses.heap.sort(list)
    }

    "iget" [list, index] {
        match index {
            Value::Integer(i) if ses.heap.is_list(list) => ses.heap.nth(list, i),
            _ => Value::TypeError,
        }
    }

    "iset!" [list, index, val] {
        match index {
            Value::Integer(i) if ses.heap.is_list(list) => {
                Value::bool(ses.heap.set_nth(list, i, val))
            }
            _ => Value::TypeError,
        }
    }

    "has?" [list] {
        if !ses.heap.is_list(list) {
            return Value::TypeError;
        }
        while let Some(item) = ses.heap.next(&mut args) {
            if !ses.heap.has(list, item) {
                return Value::False;
            }
        }
        Value::True
    }

    "add!" [list] {
        if !ses.heap.is_list(list) {
            return Value::TypeError;
        }
        let mut list = list;
        while let Some(item) = ses.heap.next(&mut args) {
            list = ses.heap.add(list, item);
        }
        list
    }

    "remove!" [list] {
        if !ses.heap.is_list(list) {
            return Value::TypeError;
        }
        let mut list = list;
        while let Some(item) = ses.heap.next(&mut args) {
            list = ses.heap.remove(list, item);
        }
        list
    }

    "+" [] {
        fold_ints(ses, args, Some(0), |a, b| Some(a.wrapping_add(b)))
    }

    "-" [] {
        fold_ints(ses, args, None, |a, b| Some(a.wrapping_sub(b)))
    }

    "*" [] {
        fold_ints(ses, args, Some(1), |a, b| Some(a.wrapping_mul(b)))
    }

    "/" [] {
        fold_ints(ses, args, None, |a, b| (b != 0).then(|| a.wrapping_div(b)))
    }

    "%" [a, b] {
        match (a, b) {
            (Value::Integer(a), Value::Integer(b)) => {
                match b {
                    0 => Value::TypeError,
                    _ => Value::Integer(a.wrapping_rem(b)),
                }
            }
            _ => Value::TypeError,
        }
    }

    "<" [] {
        chain_ints(ses, args, |a, b| a < b)
    }

    "<=" [] {
        chain_ints(ses, args, |a, b| a <= b)
    }

    ">" [] {
        chain_ints(ses, args, |a, b| a > b)
    }

    ">=" [] {
        chain_ints(ses, args, |a, b| a >= b)
    }

    "=" [first] {
        while let Some(item) = ses.heap.next(&mut args) {
            if item != first {
                return Value::False;
            }
        }
        Value::True
    }

    "!=" [first] {
        while let Some(item) = ses.heap.next(&mut args) {
            if item == first {
                return Value::False;
            }
        }
        Value::True
    }

    "each" [source, func] {
        let ctx = ses.heap.cons_unique(func, Value::Undefined);
        let ok = ses.iter_any(source, &ctx, |s, ctx, item| {
            let func = s.heap.car(ctx.value());
            s.apply_one(func, item);
        });
        ses.heap.free_cell(ctx);

        if ok {
            Value::Undefined
        } else {
            Value::TypeError
        }
    }

    "map" [source, func] {
        collect(ses, source, func, |s, ctx, item| {
            let func = s.heap.car(ctx.value());
            let out = s.apply_one(func, item);
            push_ctx(s, ctx, out);
        })
    }

    "filter" [source, func] {
        collect(ses, source, func, |s, ctx, item| {
            let func = s.heap.car(ctx.value());
            if s.apply_one(func, item).is_truthy() {
                push_ctx(s, ctx, item);
            }
        })
    }
);

// TACK, a compact Lisp runtime for small machines.

// SPDX-FileCopyrightText: © 2021 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// TACK is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/symtab.rs

// Symbol table. Builtin names occupy the non-negative half of the
// index space in registry order, a core segment followed by an
// optional host segment. User symbols are interned on first sight
// and numbered downward from -1.

// <>

use crate::{session::Session, value::SymId, value::Value, TackErr};

use string_interner::{DefaultBackend, DefaultSymbol, StringInterner, Symbol};

/// Ordinary native; receives its arguments already evaluated
pub type NativeFn = fn(&mut Session, Value) -> Value;

/// Special form; receives the calling environment and its raw operands
pub type SpecialFn = fn(&mut Session, Value, Value) -> Value;

#[derive(Clone, Copy)]
pub enum Callable {
    Special(SpecialFn),
    Native(NativeFn),
}

impl Callable {
    pub fn is_special(&self) -> bool {
        matches!(self, Callable::Special(_))
    }
}

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub call: Callable,
}

/// Builtins across both segments must fit in a byte
pub const MAX_BUILTINS: usize = 255;

pub struct SymbolTable {
    builtins: Vec<Builtin>,
    first_fn: usize,
    user_idx: usize,
    names: StringInterner<DefaultBackend>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable {
            builtins: Vec::new(),
            first_fn: 0,
            user_idx: 0,
            names: StringInterner::<DefaultBackend>::new(),
        }
    }

    /// Installs the core segment, which must list every special form
    /// ahead of every ordinary native
    pub fn init(&mut self, core: &[Builtin]) -> Result<(), TackErr> {
        if core.len() > MAX_BUILTINS {
            return Err(TackErr::TooManyBuiltins(core.len()));
        }

        let first_fn = core
            .iter()
            .position(|b| !b.call.is_special())
            .unwrap_or(core.len());

        if let Some(late) = core[first_fn..].iter().find(|b| b.call.is_special()) {
            return Err(TackErr::Catalog(format!(
                "special form '{}' follows an ordinary native",
                late.name
            )));
        }

        self.builtins = core.to_vec();
        self.first_fn = first_fn;
        self.user_idx = core.len();

        log::debug!(
            "symtab: {} core builtins, {} special forms",
            self.user_idx,
            self.first_fn
        );

        Ok(())
    }

    /// Replaces the host segment, which starts where the core ends
    pub fn set_user_fns(&mut self, fns: &[Builtin]) -> Result<(), TackErr> {
        if self.user_idx + fns.len() > MAX_BUILTINS {
            return Err(TackErr::TooManyBuiltins(self.user_idx + fns.len()));
        }

        if let Some(special) = fns.iter().find(|b| b.call.is_special()) {
            return Err(TackErr::Catalog(format!(
                "host function '{}' may not be a special form",
                special.name
            )));
        }

        self.builtins.truncate(self.user_idx);
        self.builtins.extend_from_slice(fns);

        log::debug!("symtab: {} host builtins", fns.len());

        Ok(())
    }

    /// Boundary between special forms and ordinary natives
    pub fn first_fn(&self) -> usize {
        self.first_fn
    }

    /// First index of the host segment
    pub fn user_idx(&self) -> usize {
        self.user_idx
    }

    pub fn builtin_count(&self) -> usize {
        self.builtins.len()
    }

    pub fn user_symbol_count(&self) -> usize {
        self.names.len()
    }

    pub fn get_fn(&self, id: SymId) -> Option<Callable> {
        if !id.is_builtin() {
            return None;
        }
        self.builtins.get(id.0 as usize).map(|b| b.call)
    }

    pub fn get_name(&self, id: SymId) -> Option<&str> {
        if id.is_builtin() {
            self.builtins.get(id.0 as usize).map(|b| b.name)
        } else {
            let sym = DefaultSymbol::try_from_usize((-(id.0 as i64) - 1) as usize)?;
            self.names.resolve(sym)
        }
    }

    fn find_builtin(&self, word: &str) -> Option<SymId> {
        self.builtins
            .iter()
            .position(|b| b.name == word)
            .map(|i| SymId(i as i32))
    }

    fn user_id(sym: DefaultSymbol) -> SymId {
        SymId(-(sym.to_usize() as i32) - 1)
    }

    /// Index for a name, if it is a builtin or already interned
    pub fn lookup(&self, word: &str) -> Option<SymId> {
        self.find_builtin(word)
            .or_else(|| self.names.get(word).map(Self::user_id))
    }

    /// Builtins take precedence; otherwise the name's user ordinal,
    /// allocating the next one down if it has not been seen
    pub fn intern(&mut self, word: &str) -> SymId {
        match self.find_builtin(word) {
            Some(id) => id,
            None => Self::user_id(self.names.get_or_intern(word)),
        }
    }

    /// Forgets every user symbol; ordinals restart at -1
    pub fn clear_user_symbols(&mut self) {
        self.names = StringInterner::<DefaultBackend>::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nop(_ses: &mut Session, _args: Value) -> Value {
        Value::Undefined
    }

    fn form(_ses: &mut Session, _env: Value, _args: Value) -> Value {
        Value::Undefined
    }

    fn table() -> SymbolTable {
        let mut tbl = SymbolTable::new();
        tbl.init(&[
            Builtin {
                name: "quote",
                call: Callable::Special(form),
            },
            Builtin {
                name: "list",
                call: Callable::Native(nop),
            },
        ])
        .unwrap();
        tbl
    }

    #[test]
    fn interning_is_idempotent() {
        let mut tbl = table();
        let a = tbl.intern("foo");
        let b = tbl.intern("foo");
        assert_eq!(a, b);
        assert_eq!(tbl.user_symbol_count(), 1);
    }

    #[test]
    fn user_ordinals_descend() {
        let mut tbl = table();
        assert_eq!(tbl.intern("a"), SymId(-1));
        assert_eq!(tbl.intern("b"), SymId(-2));
        assert_eq!(tbl.intern("a"), SymId(-1));
        assert_eq!(tbl.intern("c"), SymId(-3));

        assert_eq!(tbl.get_name(SymId(-2)), Some("b"));
        assert_eq!(tbl.get_name(SymId(-9)), None);
        assert_eq!(tbl.lookup("c"), Some(SymId(-3)));
        assert_eq!(tbl.lookup("d"), None);
    }

    #[test]
    fn builtins_win() {
        let mut tbl = table();
        assert_eq!(tbl.intern("quote"), SymId(0));
        assert_eq!(tbl.intern("list"), SymId(1));
        assert_eq!(tbl.user_symbol_count(), 0);
        assert_eq!(tbl.get_name(SymId(0)), Some("quote"));
        assert_eq!(tbl.first_fn(), 1);
        assert!(tbl.get_fn(SymId(0)).unwrap().is_special());
        assert!(tbl.get_fn(SymId(-1)).is_none());
    }

    #[test]
    fn host_segment() {
        let mut tbl = table();
        let host = [Builtin {
            name: "blink",
            call: Callable::Native(nop),
        }];

        tbl.set_user_fns(&host).unwrap();
        assert_eq!(tbl.user_idx(), 2);
        assert_eq!(tbl.intern("blink"), SymId(2));
        assert!(!tbl.get_fn(SymId(2)).unwrap().is_special());

        // replacing the host segment leaves the core alone
        tbl.set_user_fns(&[]).unwrap();
        assert_eq!(tbl.builtin_count(), 2);
        assert_eq!(tbl.intern("blink"), SymId(-1));

        let bad = [Builtin {
            name: "when",
            call: Callable::Special(form),
        }];
        assert!(tbl.set_user_fns(&bad).is_err());
    }

    #[test]
    fn rejects_misordered_core() {
        let mut tbl = SymbolTable::new();
        let res = tbl.init(&[
            Builtin {
                name: "list",
                call: Callable::Native(nop),
            },
            Builtin {
                name: "quote",
                call: Callable::Special(form),
            },
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn clearing_restarts_ordinals() {
        let mut tbl = table();
        tbl.intern("x");
        tbl.intern("y");
        tbl.clear_user_symbols();
        assert_eq!(tbl.user_symbol_count(), 0);
        assert_eq!(tbl.intern("y"), SymId(-1));
    }
}

// TACK, a compact Lisp runtime for small machines.

// SPDX-FileCopyrightText: © 2021 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// TACK is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/session.rs

// A session owns everything a running interpreter needs: the heap,
// the symbol table, the root environment and the output sink which
// natives print to. Collection only ever happens between top level
// forms, where the root environment is the single root.

// <>

use crate::{
    memmgt::Heap,
    parser,
    printer::Shown,
    stdenv,
    symtab::{Builtin, SymbolTable},
    value::{SymId, Value},
    TackErr,
};

use std::io::{self, Write};

pub struct Session {
    pub heap: Heap,
    pub symtab: SymbolTable,
    root: Value,
    quote_sym: SymId,
    list_sym: SymId,
    out: Box<dyn Write>,
    pub(crate) depth: usize,
}

impl Session {
    /// Session with the core catalog and nothing else
    pub fn startup() -> Result<Session, TackErr> {
        Session::with_user_fns(&[])
    }

    /// Session with the core catalog plus host supplied natives
    pub fn with_user_fns(fns: &[Builtin]) -> Result<Session, TackErr> {
        let mut symtab = SymbolTable::new();
        symtab.init(&stdenv::core_catalog())?;
        symtab.set_user_fns(fns)?;

        let quote_sym = symtab.intern("quote");
        let list_sym = symtab.intern("list");

        let mut ses = Session {
            heap: Heap::new(),
            symtab,
            root: Value::Nil,
            quote_sym,
            list_sym,
            out: Box::new(io::stdout()),
            depth: 0,
        };
        ses.init_root();

        log::debug!("session started");
        Ok(ses)
    }

    fn init_root(&mut self) {
        self.root = self.heap.table_new(Value::Nil);
        let env = self.intern("env");
        self.heap.table_set(self.root, env, self.root);
    }

    /// Drops every binding and user symbol and starts from a fresh
    /// root environment; returns how many cells were reclaimed
    pub fn restart(&mut self) -> usize {
        self.root = Value::Nil;
        let reclaimed = self.heap.collect_garbage(Value::Nil);
        self.symtab.clear_user_symbols();
        self.init_root();

        log::debug!("session restarted, {} cells reclaimed", reclaimed);
        reclaimed
    }

    pub fn root(&self) -> Value {
        self.root
    }

    pub fn quote_sym(&self) -> SymId {
        self.quote_sym
    }

    pub fn list_sym(&self) -> SymId {
        self.list_sym
    }

    pub fn intern(&mut self, word: &str) -> Value {
        Value::Symbol(self.symtab.intern(word))
    }

    pub fn set_output(&mut self, out: Box<dyn Write>) {
        self.out = out;
    }

    /// Writes to the session output; failures are logged, not raised
    pub fn write_out(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
            log::warn!("output failed: {}", e);
        }
    }

    /// Displayable rendering of a value
    pub fn show(&self, val: Value) -> Shown<'_> {
        Shown::new(self, val)
    }

    /// Parses source text into a list of top level forms
    pub fn read(&mut self, code: &str) -> Result<Value, TackErr> {
        parser::parse(self, code)
    }

    /// Evaluates every form against the root environment without
    /// collecting, returning the last result
    pub fn eval_str(&mut self, code: &str) -> Result<Value, TackErr> {
        let mut forms = self.read(code)?;
        let mut result = Value::Undefined;
        while let Some(form) = self.heap.next(&mut forms) {
            result = self.eval(self.root, form);
        }
        Ok(result)
    }

    /// Evaluates every form, renders each result, then collects
    pub fn interpret(&mut self, code: &str) -> Result<Vec<String>, TackErr> {
        let mut forms = self.read(code)?;
        let mut out = Vec::new();
        while let Some(form) = self.heap.next(&mut forms) {
            let result = self.eval(self.root, form);
            out.push(self.show(result).to_string());
        }
        self.collect_garbage();
        Ok(out)
    }

    pub fn collect_garbage(&mut self) -> usize {
        self.heap.collect_garbage(self.root)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::{cell::RefCell, rc::Rc};

    /// Output sink whose contents stay readable after being boxed
    #[derive(Clone, Default)]
    pub(crate) struct Capture(pub Rc<RefCell<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        pub(crate) fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    pub(crate) fn captured() -> (Session, Capture) {
        let mut ses = Session::startup().unwrap();
        let cap = Capture::default();
        ses.set_output(Box::new(cap.clone()));
        (ses, cap)
    }

    #[test]
    fn root_binds_itself() {
        let mut ses = Session::startup().unwrap();
        let env = ses.intern("env");
        assert_eq!(ses.heap.table_get(ses.root(), env), ses.root());
        assert!(ses.quote_sym().is_builtin());
        assert!(ses.list_sym().is_builtin());
    }

    #[test]
    fn interprets_and_collects() {
        let mut ses = Session::startup().unwrap();
        let out = ses.interpret("42 (+ 2 2) '(1 2)").unwrap();
        assert_eq!(out, vec!["42", "4", "(1 2)"]);

        // nothing from the read or the results survives collection
        assert_eq!(ses.collect_garbage(), 0);
        let live = ses.heap.live_count();
        ses.interpret("(list 1 2 3 4 5)").unwrap();
        assert_eq!(ses.heap.live_count(), live);
    }

    #[test]
    fn bindings_survive_collection() {
        let mut ses = Session::startup().unwrap();
        ses.interpret("(set 'xs [1 2 3])").unwrap();
        ses.collect_garbage();
        assert_eq!(ses.interpret("xs").unwrap(), vec!["(1 2 3)"]);
    }

    #[test]
    fn restart_wipes_everything() {
        let mut ses = Session::startup().unwrap();
        ses.interpret("(set 'a 1 'b 2) (def f (x) x)").unwrap();
        assert!(ses.symtab.user_symbol_count() > 1);

        let reclaimed = ses.restart();
        assert!(reclaimed > 0);
        // only the fresh root and its self binding remain
        assert_eq!(ses.heap.live_count(), 3);
        assert_eq!(ses.symtab.user_symbol_count(), 1);
        assert_eq!(ses.symtab.lookup("env"), Some(SymId(-1)));
        assert_eq!(ses.symtab.intern("a"), SymId(-2));
        assert_eq!(ses.interpret("a").unwrap(), vec!["undefined"]);
    }

    #[test]
    fn host_natives() {
        fn answer(_ses: &mut Session, _args: Value) -> Value {
            Value::Integer(42)
        }

        let host = [Builtin {
            name: "answer",
            call: crate::symtab::Callable::Native(answer),
        }];
        let mut ses = Session::with_user_fns(&host).unwrap();
        assert_eq!(ses.interpret("(+ 1 (answer))").unwrap(), vec!["43"]);
    }

    #[test]
    fn parse_errors_surface() {
        let mut ses = Session::startup().unwrap();
        assert!(ses.interpret("(+ 1 2").is_err());
        assert!(ses.eval_str(")").is_err());
    }
}

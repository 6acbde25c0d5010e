// TACK, a compact Lisp runtime for small machines.

// SPDX-FileCopyrightText: © 2021 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// TACK is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/value.rs

// The tagged value which flows through every part of the runtime,
// along with the symbol and cell handle types it may carry.

// <>

/// Index into the shared builtin / user symbol space
///
/// Non-negative indices name entries of the builtin registry; negative
/// indices name user symbols, the first being -1.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct SymId(pub i32);

impl SymId {
    pub fn is_builtin(self) -> bool {
        self.0 >= 0
    }
}

/// Handle to one cell of the heap
///
/// The generation is bumped whenever the slot is released, so a handle
/// which outlives its cell can be told apart from one to a newer cell
/// occupying the same slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CellRef {
    pub(crate) slot: u32,
    pub(crate) gen: u32,
}

impl CellRef {
    pub fn slot(self) -> u32 {
        self.slot
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Value {
    Nil,
    True,
    False,
    Integer(i32),
    Symbol(SymId),
    Pair(CellRef),
    Table(CellRef),
    /// No meaningful result; never equal to Nil
    Undefined,
    /// Returned by natives handed arguments of the wrong kind
    TypeError,
}

impl Value {
    pub fn bool(b: bool) -> Value {
        if b {
            Value::True
        } else {
            Value::False
        }
    }

    /// Only False is falsy; Nil, zero and the empty list all count as true
    pub fn is_truthy(self) -> bool {
        self != Value::False
    }

    pub fn is_nil(self) -> bool {
        self == Value::Nil
    }

    pub fn is_pair(self) -> bool {
        matches!(self, Value::Pair(_))
    }

    pub fn is_table(self) -> bool {
        matches!(self, Value::Table(_))
    }

    pub fn as_int(self) -> Option<i32> {
        match self {
            Value::Integer(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_sym(self) -> Option<SymId> {
        match self {
            Value::Symbol(id) => Some(id),
            _ => None,
        }
    }

    /// Cell behind a Pair or Table, if any
    pub fn cell(self) -> Option<CellRef> {
        match self {
            Value::Pair(r) | Value::Table(r) => Some(r),
            _ => None,
        }
    }
}

/// Identity comparison: tag and payload, never structure
pub fn eq(a: Value, b: Value) -> bool {
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::False.is_truthy());
        assert!(Value::Nil.is_truthy());
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::Undefined.is_truthy());
        assert!(Value::True.is_truthy());
    }

    #[test]
    fn identity() {
        let a = CellRef { slot: 3, gen: 0 };
        let b = CellRef { slot: 3, gen: 1 };

        assert!(eq(Value::Pair(a), Value::Pair(a)));
        assert!(!eq(Value::Pair(a), Value::Pair(b)));
        assert!(!eq(Value::Pair(a), Value::Table(a)));
        assert!(!eq(Value::Undefined, Value::Nil));
        assert!(eq(Value::Symbol(SymId(-2)), Value::Symbol(SymId(-2))));
    }
}

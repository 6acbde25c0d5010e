// TACK, a compact Lisp runtime for small machines.

// SPDX-FileCopyrightText: © 2021 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// TACK is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/memmgt.rs

// Memory management for TACK. An arena of two-slot cells addressed
// by generation-checked index, with explicit release of cells known
// to be unaliased and a mark and sweep collector for everything else.

// <>

use crate::value::{CellRef, Value};

/// Number of cells added to the arena whenever it runs dry
pub const PAIRS_BLOCK_SIZE: usize = 16;

#[derive(Clone, Copy)]
struct Cell {
    left: Value,
    right: Value,
    gen: u32,
    live: bool,
    mark: bool,
}

impl Cell {
    const EMPTY: Cell = Cell {
        left: Value::Nil,
        right: Value::Nil,
        gen: 0,
        live: false,
        mark: false,
    };
}

/// Proof that the holder has the only live reference to a cell
///
/// Cannot be cloned; consumed by the heap when the cell is released.
/// Obtained fresh from `Heap::cons_unique`; inside the crate an existing
/// value can also be asserted unique with `Unique::claim`.
#[derive(Debug, PartialEq, Eq)]
pub struct Unique(Value);

impl Unique {
    /// Caller asserts that no other reference to this cell survives
    ///
    /// Nothing verifies the claim. A wrong one is caught only later, when
    /// a surviving alias fails its generation check.
    pub(crate) fn claim(val: Value) -> Option<Unique> {
        match val {
            Value::Pair(_) | Value::Table(_) => Some(Unique(val)),
            _ => None,
        }
    }

    pub fn value(&self) -> Value {
        self.0
    }
}

pub struct Heap {
    cells: Vec<Cell>,
    free: Vec<u32>,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub fn new() -> Heap {
        Heap {
            cells: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Total cells in the arena, live or free
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    pub fn live_count(&self) -> usize {
        self.cells.len() - self.free.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    fn grow(&mut self) {
        let base = self.cells.len();

        if cfg!(feature = "memdbg") {
            log::debug!("Growing heap from {} cells", base);
        }

        self.cells.resize(base + PAIRS_BLOCK_SIZE, Cell::EMPTY);
        // lowest slot is handed out first
        self.free
            .extend((base..base + PAIRS_BLOCK_SIZE).rev().map(|s| s as u32));
    }

    pub(crate) fn alloc(&mut self, left: Value, right: Value) -> CellRef {
        let slot = match self.free.pop() {
            Some(s) => s,
            None => {
                self.grow();
                // grow always leaves a full block on the free stack
                self.free.pop().unwrap_or(0)
            }
        };

        let cell = &mut self.cells[slot as usize];
        cell.left = left;
        cell.right = right;
        cell.live = true;
        cell.mark = false;

        if cfg!(feature = "memdbg") {
            log::trace!("C {slot}.{} ALLOC", cell.gen);
        }

        CellRef {
            slot,
            gen: cell.gen,
        }
    }

    pub fn cons(&mut self, left: Value, right: Value) -> Value {
        Value::Pair(self.alloc(left, right))
    }

    /// Allocates a pair whose sole owner is the returned handle
    pub fn cons_unique(&mut self, left: Value, right: Value) -> Unique {
        Unique(self.cons(left, right))
    }

    fn cell(&self, r: CellRef) -> Option<&Cell> {
        match self.cells.get(r.slot as usize) {
            Some(c) if c.live && c.gen == r.gen => Some(c),
            _ => None,
        }
    }

    fn cell_mut(&mut self, r: CellRef) -> Option<&mut Cell> {
        match self.cells.get_mut(r.slot as usize) {
            Some(c) if c.live && c.gen == r.gen => Some(c),
            _ => None,
        }
    }

    /// Whether a handle still refers to the cell it was issued for
    pub fn is_live(&self, r: CellRef) -> bool {
        self.cell(r).is_some()
    }

    pub(crate) fn left(&self, r: CellRef) -> Value {
        match self.cell(r) {
            Some(c) => c.left,
            None => {
                log::warn!("read through stale handle to cell {}", r.slot);
                Value::Undefined
            }
        }
    }

    pub(crate) fn right(&self, r: CellRef) -> Value {
        match self.cell(r) {
            Some(c) => c.right,
            None => {
                log::warn!("read through stale handle to cell {}", r.slot);
                Value::Undefined
            }
        }
    }

    pub(crate) fn set_left(&mut self, r: CellRef, val: Value) -> bool {
        match self.cell_mut(r) {
            Some(c) => {
                c.left = val;
                true
            }
            None => {
                log::warn!("write through stale handle to cell {}", r.slot);
                false
            }
        }
    }

    pub(crate) fn set_right(&mut self, r: CellRef, val: Value) -> bool {
        match self.cell_mut(r) {
            Some(c) => {
                c.right = val;
                true
            }
            None => {
                log::warn!("write through stale handle to cell {}", r.slot);
                false
            }
        }
    }

    pub fn car(&self, val: Value) -> Value {
        match val {
            Value::Pair(r) => self.left(r),
            _ => Value::Undefined,
        }
    }

    pub fn cdr(&self, val: Value) -> Value {
        match val {
            Value::Pair(r) => self.right(r),
            _ => Value::Undefined,
        }
    }

    pub fn set_car(&mut self, pair: Value, val: Value) -> bool {
        match pair {
            Value::Pair(r) => self.set_left(r, val),
            _ => false,
        }
    }

    pub fn set_cdr(&mut self, pair: Value, val: Value) -> bool {
        match pair {
            Value::Pair(r) => self.set_right(r, val),
            _ => false,
        }
    }

    /// Returns a slot to the free pool; stale handles are ignored
    pub(crate) fn release(&mut self, r: CellRef) -> Option<(Value, Value)> {
        let cell = self.cell_mut(r)?;
        let out = (cell.left, cell.right);

        cell.live = false;
        cell.gen = cell.gen.wrapping_add(1);
        cell.left = Value::Nil;
        cell.right = Value::Nil;

        if cfg!(feature = "memdbg") {
            log::trace!("C {} RECLAIM", r.slot);
        }

        self.free.push(r.slot);
        Some(out)
    }

    /// Releases one cell ahead of collection, returning what it held
    pub fn free_cell(&mut self, owner: Unique) -> (Value, Value) {
        match owner.0.cell().and_then(|r| self.release(r)) {
            Some(contents) => contents,
            None => {
                log::warn!("free of stale or non-cell value {:?}", owner.0);
                (Value::Undefined, Value::Undefined)
            }
        }
    }

    /// Releases every cell of a list spine; the elements are untouched
    pub fn free_list(&mut self, owner: Unique) -> usize {
        let mut count = 0;
        let mut cur = owner.0;

        while let Value::Pair(r) = cur {
            match self.release(r) {
                Some((_, next)) => cur = next,
                None => break,
            }
            count += 1;
        }

        count
    }

    /// Full mark and sweep from a single root
    ///
    /// Returns how many live cells were found unreachable and reclaimed.
    pub fn collect_garbage(&mut self, root: Value) -> usize {
        for cell in self.cells.iter_mut() {
            cell.mark = false;
        }

        let mut work = vec![root];
        while let Some(val) = work.pop() {
            let r = match val.cell() {
                Some(r) => r,
                None => continue,
            };

            if let Some(cell) = self.cells.get_mut(r.slot as usize) {
                if cell.live && cell.gen == r.gen && !cell.mark {
                    cell.mark = true;
                    work.push(cell.left);
                    work.push(cell.right);
                }
            }
        }

        let mut reclaimed = 0;
        for (slot, cell) in self.cells.iter_mut().enumerate() {
            if cell.live && !cell.mark {
                cell.live = false;
                cell.gen = cell.gen.wrapping_add(1);
                cell.left = Value::Nil;
                cell.right = Value::Nil;
                self.free.push(slot as u32);
                reclaimed += 1;
            }
        }

        log::debug!(
            "gc: reclaimed {} cells, {} live, {} free",
            reclaimed,
            self.live_count(),
            self.free_count()
        );

        reclaimed
    }

    /// Deep copy of pair structure; leaves and tables are shared
    pub fn copy(&mut self, val: Value) -> Value {
        if !val.is_pair() {
            return val;
        }

        let mut items = Vec::new();
        let mut cur = val;
        while let Value::Pair(r) = cur {
            let item = self.left(r);
            items.push(self.copy(item));
            cur = self.right(r);
        }

        items
            .into_iter()
            .rev()
            .fold(cur, |acc, item| self.cons(item, acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cons_car_cdr() {
        let mut heap = Heap::new();
        let p = heap.cons(Value::Integer(1), Value::Integer(2));

        assert_eq!(heap.car(p), Value::Integer(1));
        assert_eq!(heap.cdr(p), Value::Integer(2));
        assert_eq!(heap.car(Value::Integer(1)), Value::Undefined);
        assert_eq!(heap.cdr(Value::Nil), Value::Undefined);

        assert!(heap.set_car(p, Value::True));
        assert!(heap.set_cdr(p, Value::Nil));
        assert!(!heap.set_car(Value::Nil, Value::True));
        assert_eq!(heap.car(p), Value::True);
        assert_eq!(heap.cdr(p), Value::Nil);
    }

    #[test]
    fn grows_in_blocks() {
        let mut heap = Heap::new();
        heap.cons(Value::Nil, Value::Nil);
        assert_eq!(heap.capacity(), PAIRS_BLOCK_SIZE);
        assert_eq!(heap.live_count(), 1);

        for _ in 0..PAIRS_BLOCK_SIZE {
            heap.cons(Value::Nil, Value::Nil);
        }
        assert_eq!(heap.capacity(), 2 * PAIRS_BLOCK_SIZE);
    }

    #[test]
    fn free_cell_detects_stale() {
        let mut heap = Heap::new();
        let owner = heap.cons_unique(Value::Integer(4), Value::Integer(5));
        let alias = owner.value();

        assert_eq!(
            heap.free_cell(owner),
            (Value::Integer(4), Value::Integer(5))
        );
        assert_eq!(heap.free_count(), PAIRS_BLOCK_SIZE);

        // slot is reused, old handle must not see the new contents
        let fresh = heap.cons(Value::Integer(6), Value::Nil);
        assert_eq!(alias.cell().map(|r| r.slot), fresh.cell().map(|r| r.slot));
        assert_ne!(alias, fresh);
        assert_eq!(heap.car(alias), Value::Undefined);
        assert!(!heap.set_car(alias, Value::Nil));
        assert_eq!(heap.car(fresh), Value::Integer(6));
    }

    #[test]
    fn free_list_spine_only() {
        let mut heap = Heap::new();
        let inner = heap.cons(Value::Integer(9), Value::Nil);
        let c = heap.cons(Value::Integer(3), Value::Nil);
        let b = heap.cons(inner, c);
        let a = heap.cons(Value::Integer(1), b);

        let count = heap.free_list(Unique::claim(a).unwrap());
        assert_eq!(count, 3);
        assert_eq!(heap.live_count(), 1);
        assert_eq!(heap.car(inner), Value::Integer(9));
    }

    #[test]
    fn collects_unreachable() {
        let mut heap = Heap::new();
        let kept_tail = heap.cons(Value::Integer(2), Value::Nil);
        let root = heap.cons(Value::Integer(1), kept_tail);

        let mut junk = Value::Nil;
        for i in 0..5 {
            junk = heap.cons(Value::Integer(i), junk);
        }
        let _ = junk;

        let live = heap.live_count();
        assert_eq!(heap.collect_garbage(root), 5);
        assert_eq!(heap.live_count(), live - 5);
        assert_eq!(heap.car(root), Value::Integer(1));
        assert_eq!(heap.car(heap.cdr(root)), Value::Integer(2));

        // reclaimed cells are reused before the arena grows
        let cap = heap.capacity();
        for i in 0..5 {
            heap.cons(Value::Integer(i), Value::Nil);
        }
        assert_eq!(heap.capacity(), cap);
        assert_eq!(heap.collect_garbage(root), 5);
    }

    #[test]
    fn swept_handles_are_stale() {
        let mut heap = Heap::new();
        let cell = heap.cons(Value::Integer(1), Value::Nil);
        let r = cell.cell().unwrap();

        assert_eq!(heap.collect_garbage(Value::Nil), 1);
        assert!(!heap.is_live(r));
        assert_eq!(heap.car(cell), Value::Undefined);
        assert!(!heap.set_car(cell, Value::Integer(2)));

        // a reused slot stays invisible through the swept handle
        let fresh = heap.cons(Value::Integer(3), Value::Nil);
        assert_eq!(fresh.cell().map(|f| f.slot), Some(r.slot));
        assert_eq!(heap.car(cell), Value::Undefined);
        assert_eq!(heap.car(fresh), Value::Integer(3));
    }

    #[test]
    fn collects_cycles() {
        let mut heap = Heap::new();
        let a = heap.cons(Value::Integer(1), Value::Nil);
        let b = heap.cons(a, a);
        heap.set_cdr(a, b);

        assert_eq!(heap.collect_garbage(a), 0);
        assert_eq!(heap.collect_garbage(Value::Nil), 2);
        assert_eq!(heap.live_count(), 0);
    }

    #[test]
    fn copies_structure() {
        let mut heap = Heap::new();
        let inner = heap.cons(Value::Integer(2), Value::Nil);
        let tail = heap.cons(inner, Value::Integer(3));
        let orig = heap.cons(Value::Integer(1), tail);

        let dup = heap.copy(orig);
        assert_ne!(dup, orig);
        assert_eq!(heap.car(dup), Value::Integer(1));

        let dup_inner = heap.car(heap.cdr(dup));
        assert_ne!(dup_inner, inner);
        assert_eq!(heap.car(dup_inner), Value::Integer(2));
        assert_eq!(heap.cdr(heap.cdr(dup)), Value::Integer(3));

        heap.set_car(inner, Value::Integer(7));
        assert_eq!(heap.car(dup_inner), Value::Integer(2));
        assert_eq!(heap.copy(Value::Integer(5)), Value::Integer(5));
    }
}

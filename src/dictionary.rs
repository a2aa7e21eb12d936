//! The heap-backed, chained symbol dictionary. Records live in the
//! GLOBAL bump heap as `{name: StringRef, value: Cell, prev: link}`
//! triples; `head` is the most recent record, so lookup is a linked-list
//! walk and a later definition shadows an earlier one of the same name.
//! `mark`/`revert` record a position in the chain and rewind `head` to
//! it later, without touching the heap bytes already allocated.

use crate::digest::Digest;
use crate::error::{Result, VmError};
use crate::heap::Heap;
use crate::memory::Memory;
use crate::tagged::{from_tagged, to_tagged_value, Cell, Tag, TaggedValue};

const RECORD_CELLS: usize = 3; // name, value, prev

/// Absolute cell index of the record preceding `head` in the chain, or
/// `None` for the empty dictionary. `None` is represented on disk as
/// `Tag::Sentinel(0)` so a prev-link is always a plain `Cell`.
///
/// Records are allocated through the shared [`Heap`] bump pointer rather
/// than a counter of their own: a single `GP` register governs the whole
/// GLOBAL segment, and `gmark`/`gsweep` must see dictionary records too,
/// or reverting a heap mark taken before a colon-definition would
/// silently leave the definition's storage allocated.
pub struct Dictionary {
    head: Option<usize>,
}

fn nil_link() -> Cell {
    to_tagged_value(0, Tag::Sentinel, false)
}

impl Dictionary {
    pub fn new() -> Self {
        Dictionary { head: None }
    }

    pub fn mark(&self) -> Option<usize> {
        self.head
    }

    /// Makes every definition added after `mark` invisible. Storage is
    /// not reclaimed here (the caller also rolls back the shared global
    /// heap's GP if it wants the cells back) — revert is a pure,
    /// non-destructive pointer move.
    pub fn revert(&mut self, mark: Option<usize>) {
        self.head = mark;
    }

    pub fn define(
        &mut self,
        mem: &mut Memory,
        heap: &mut Heap,
        base_cell: usize,
        digest: &mut Digest,
        name: &str,
        value: Cell,
    ) -> Result<()> {
        let name_offset = digest.intern(mem, name)?;
        let rel = heap.alloc(RECORD_CELLS)?;
        let record_cell = base_cell + rel;
        let prev = self.head.map_or(nil_link(), |h| {
            to_tagged_value(h as u16, Tag::Address, false)
        });
        mem.write_cell(record_cell, to_tagged_value(name_offset, Tag::String, false))?;
        mem.write_cell(record_cell + 1, value)?;
        mem.write_cell(record_cell + 2, prev)?;
        self.head = Some(record_cell);
        Ok(())
    }

    pub fn define_builtin(
        &mut self,
        mem: &mut Memory,
        heap: &mut Heap,
        base_cell: usize,
        digest: &mut Digest,
        name: &str,
        opcode: u16,
    ) -> Result<()> {
        self.define(mem, heap, base_cell, digest, name, to_tagged_value(opcode, Tag::Builtin, false))
    }

    pub fn define_code(
        &mut self,
        mem: &mut Memory,
        heap: &mut Heap,
        base_cell: usize,
        digest: &mut Digest,
        name: &str,
        addr: u16,
    ) -> Result<()> {
        self.define(mem, heap, base_cell, digest, name, to_tagged_value(addr, Tag::Code, false))
    }

    /// Walks the chain from `head`, comparing interned-string offsets.
    /// First match wins, implementing shadowing.
    pub fn lookup(&self, mem: &Memory, digest: &Digest, name: &str) -> Result<Option<Cell>> {
        let mut cursor = self.head;
        while let Some(record_cell) = cursor {
            let name_cell = mem.read_cell(record_cell)?;
            if let TaggedValue::String(offset) = from_tagged(name_cell) {
                if digest.get(mem, offset)? == name {
                    return Ok(Some(mem.read_cell(record_cell + 1)?));
                }
            }
            let prev_cell = mem.read_cell(record_cell + 2)?;
            cursor = match from_tagged(prev_cell) {
                TaggedValue::Address(a) => Some(a as usize),
                _ => None,
            };
        }
        Ok(None)
    }

    /// `lookup` plus dereferencing into a directly executable tagged
    /// value — for this dictionary the stored value already is the
    /// executable form (BUILTIN/CODE), so this is `lookup` with the
    /// `None` case mapped to `SymbolNotFound`.
    pub fn resolve_symbol(&self, mem: &Memory, digest: &Digest, name: &str) -> Result<Cell> {
        self.lookup(mem, digest, name)?
            .ok_or_else(|| VmError::SymbolNotFound(name.to_string()))
    }

    pub fn defined_names<'a>(&self, mem: &'a Memory, digest: &'a Digest) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut cursor = self.head;
        while let Some(record_cell) = cursor {
            let name_cell = mem.read_cell(record_cell)?;
            if let TaggedValue::String(offset) = from_tagged(name_cell) {
                names.push(digest.get(mem, offset)?);
            }
            let prev_cell = mem.read_cell(record_cell + 2)?;
            cursor = match from_tagged(prev_cell) {
                TaggedValue::Address(a) => Some(a as usize),
                _ => None,
            };
        }
        Ok(names)
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

//! Data and return stack operations. Both stacks are plain `Vec<Cell>`
//! shadowing a segment of [`Memory`](super::Memory) — pushes/pops mutate
//! the `Vec` and keep `Memory`'s segment in sync so `GLOBAL`-heap code
//! that reads stack cells through `Memory::read_cell` keeps working.

use crate::error::{Result, VmError};
use crate::tagged::{from_tagged, Cell, TaggedValue};

use super::{Memory, Segment};

pub struct Stack {
    segment: Segment,
    capacity: usize,
    cells: Vec<Cell>,
}

impl Stack {
    pub fn new(segment: Segment, capacity: usize) -> Self {
        Stack { segment, capacity, cells: Vec::with_capacity(capacity) }
    }

    pub fn depth(&self) -> usize {
        self.cells.len()
    }

    /// `RStack` boundary violations raise the dedicated return-stack
    /// error variants, distinct from the data stack's; every other
    /// segment's `Stack` (the data stack) raises the plain
    /// `StackOverflow`/`StackUnderflow` pair.
    fn overflow_error(&self, op: &'static str) -> VmError {
        match self.segment {
            Segment::RStack => VmError::ReturnStackOverflow,
            _ => VmError::StackOverflow { op },
        }
    }

    fn underflow_error(&self, op: &'static str, needed: usize, have: usize) -> VmError {
        match self.segment {
            Segment::RStack => VmError::ReturnStackUnderflow,
            _ => VmError::StackUnderflow { op, needed, have },
        }
    }

    pub fn push(&mut self, mem: &mut Memory, op: &'static str, cell: Cell) -> Result<()> {
        if self.cells.len() >= self.capacity {
            return Err(self.overflow_error(op));
        }
        let index = mem.segment_base_cell(self.segment) + self.cells.len();
        mem.write_cell(index, cell)?;
        self.cells.push(cell);
        Ok(())
    }

    pub fn pop(&mut self, op: &'static str) -> Result<Cell> {
        if self.cells.is_empty() {
            return Err(self.underflow_error(op, 1, 0));
        }
        Ok(self.cells.pop().expect("checked non-empty above"))
    }

    pub fn peek(&self, op: &'static str) -> Result<Cell> {
        self.peek_at(op, 0)
    }

    pub fn peek_at(&self, op: &'static str, depth_from_tos: usize) -> Result<Cell> {
        let len = self.cells.len();
        if depth_from_tos >= len {
            return Err(self.underflow_error(op, depth_from_tos + 1, len));
        }
        Ok(self.cells[len - 1 - depth_from_tos])
    }

    pub fn ensure_size(&self, op: &'static str, n: usize) -> Result<()> {
        if self.cells.len() < n {
            return Err(self.underflow_error(op, n, self.cells.len()));
        }
        Ok(())
    }

    /// Drops the top stack element as a whole: if TOS is a LIST header,
    /// drops the header plus its `slots` payload cells in one step.
    pub fn drop_list(&mut self, op: &'static str) -> Result<()> {
        let tos = self.peek(op)?;
        let span = match from_tagged(tos) {
            TaggedValue::List { slots } | TaggedValue::RList { slots } => {
                slots as usize + 1
            }
            _ => 1,
        };
        self.ensure_size(op, span)?;
        self.cells.truncate(self.cells.len() - span);
        Ok(())
    }

    /// Overwrites an already-pushed cell in place, given its absolute cell
    /// index in `Memory`'s unified address space (as produced by
    /// `list::element_address`). Updates `Memory` and this stack's own
    /// `Vec` together — a bare `Memory::write_cell` would leave `cells`
    /// stale, and every stack read (`peek`/`pop`/`as_slice`/`pop_span`)
    /// goes through `cells`, not `Memory`.
    pub fn write_at(&mut self, mem: &mut Memory, abs_cell_index: usize, value: Cell) -> Result<()> {
        let base = mem.segment_base_cell(self.segment);
        let local = abs_cell_index
            .checked_sub(base)
            .filter(|&l| l < self.cells.len())
            .ok_or(VmError::MemoryAccess { segment: self.segment, offset: abs_cell_index })?;
        mem.write_cell(abs_cell_index, value)?;
        self.cells[local] = value;
        Ok(())
    }

    /// Raw view of the stack, deepest element first — used for error
    /// snapshots and the REPL's stack printer.
    pub fn as_slice(&self) -> &[Cell] {
        &self.cells
    }

    /// Truncates the stack to `len` cells, used by `exit` to discard a
    /// frame's locals in one step (`RSP = BP`).
    pub fn truncate(&mut self, len: usize) {
        self.cells.truncate(len);
    }

    pub fn raw_push(&mut self, cell: Cell) {
        self.cells.push(cell);
    }
}

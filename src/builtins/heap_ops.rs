//! Global-heap bump-allocator builtins: `gmark`/`gsweep` bracket a scope
//! the way `dictionary::mark`/`revert` bracket definitions, and
//! `gpush`/`gpop`/`gpeek` move whole spans (scalar or list) between the
//! data stack and the heap.

use crate::error::{Result, VmError};
use crate::list::{pop_span, push_span};
use crate::memory::Memory;
use crate::tagged::{from_tagged, list_slots, to_tagged_value, Cell, Tag, TaggedValue};
use crate::vm::Vm;

fn read_heap_span(mem: &Memory, header_addr: usize) -> Result<Vec<Cell>> {
    let header = mem.read_cell(header_addr)?;
    let slots = match list_slots(header) {
        Some(s) => s as usize,
        None => return Ok(vec![header]),
    };
    let mut cells = Vec::with_capacity(slots + 1);
    for i in 0..slots {
        cells.push(mem.read_cell(header_addr - slots + i)?);
    }
    cells.push(header);
    Ok(cells)
}

fn address_of(cell: Cell, op: &'static str) -> Result<usize> {
    match from_tagged(cell) {
        TaggedValue::Address(a) => Ok(a as usize),
        other => Err(VmError::TypeError { op, found: other.tag() }),
    }
}

/// Stashes the heap mark on the return stack (not the data stack), so
/// arbitrary code between `gmark` and `gsweep` is free to push/pop data
/// without burying it — the same bracket-on-RSTACK idiom
/// `control::group_left`/`group_right` use.
pub fn gmark(vm: &mut Vm) -> Result<()> {
    let mark = vm.heap.mark();
    let cell = to_tagged_value(mark as u16, Tag::Integer, false);
    vm.rstack.push(&mut vm.memory, "gmark", cell)
}

pub fn gsweep(vm: &mut Vm) -> Result<()> {
    let mark_cell = vm.rstack.pop("gsweep")?;
    let mark = match from_tagged(mark_cell) {
        TaggedValue::Integer(v) => v as usize,
        other => return Err(VmError::InvalidTag { expected: "Integer(gmark)", found: other.tag() }),
    };
    vm.heap.sweep(mark);
    Ok(())
}

/// `(value -- ref)`: moves the whole top span (scalar or list) onto the
/// heap, leaving a DATA_REF on the stack.
pub fn gpush(vm: &mut Vm) -> Result<()> {
    let cells = pop_span(&mut vm.data, "gpush")?;
    let base = vm.global_base_cell();
    let data_ref = if cells.len() == 1 {
        vm.heap.gpush(&mut vm.memory, base, cells[0])?
    } else {
        let payload = &cells[..cells.len() - 1];
        vm.heap.gpush_list(&mut vm.memory, base, payload)?
    };
    vm.data.push(&mut vm.memory, "gpush", data_ref)
}

/// `(ref -- value)`: the inverse of `gpush` — reconstructs the whole span
/// (scalar or list) the ref points at back onto the data stack.
pub fn gpop(vm: &mut Vm) -> Result<()> {
    let ref_cell = vm.data.pop("gpop")?;
    let addr = address_of(ref_cell, "gpop")?;
    let cells = read_heap_span(&vm.memory, addr)?;
    push_span(&mut vm.memory, &mut vm.data, "gpop", &cells)
}

/// `(ref -- value)`: a single-cell, non-destructive read through a ref,
/// without the span reconstruction `gpop` does.
pub fn gpeek(vm: &mut Vm) -> Result<()> {
    let ref_cell = vm.data.pop("gpeek")?;
    let value = vm.heap.gpeek(&vm.memory, ref_cell)?;
    vm.data.push(&mut vm.memory, "gpeek", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::VmConfig;
    use crate::tagged::{to_tagged_value, Tag};

    #[test]
    fn gpush_then_gpop_round_trips_a_scalar() {
        let mut vm = Vm::new(VmConfig::default());
        let value = to_tagged_value(5, Tag::Integer, false);
        vm.data.push(&mut vm.memory, "lit", value).unwrap();
        gpush(&mut vm).unwrap();
        gpop(&mut vm).unwrap();
        assert_eq!(vm.data.peek("t").unwrap(), value);
    }

    #[test]
    fn gmark_then_gsweep_resets_heap_around_unrelated_data_stack_work() {
        let mut vm = Vm::new(VmConfig::default());
        let original_mark = vm.heap.mark();
        gmark(&mut vm).unwrap();
        vm.data.push(&mut vm.memory, "lit", to_tagged_value(1, Tag::Integer, false)).unwrap();
        gpush(&mut vm).unwrap();
        vm.data.push(&mut vm.memory, "lit", to_tagged_value(2, Tag::Integer, false)).unwrap();
        assert_ne!(vm.heap.mark(), original_mark);
        gsweep(&mut vm).unwrap();
        assert_eq!(vm.heap.mark(), original_mark);
    }
}

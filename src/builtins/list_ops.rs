//! List-construction and list-query builtins over the reverse-list
//! engine in `list.rs`. `(`/`)` bracket a run of pushes; the start depth
//! is stashed on the return stack between the two calls, the same
//! "save SP, recover it later" idiom `control::group_left`/`group_right`
//! use for variadic counting.

use crate::error::{Result, VmError};
use crate::list::{self, pop_span, push_span, OpenList};
use crate::memory::Segment;
use crate::tagged::{from_tagged, is_nil, list_slots, to_tagged_value, Cell, Tag, TaggedValue};
use crate::vm::Vm;

fn index_of(cell: Cell, op: &'static str) -> Result<usize> {
    match from_tagged(cell) {
        TaggedValue::Number(n) => Ok(n as usize),
        TaggedValue::Integer(v) => Ok(v.max(0) as usize),
        other => Err(VmError::TypeError { op, found: other.tag() }),
    }
}

fn header_cell_index(vm: &Vm) -> usize {
    vm.memory.segment_base_cell(Segment::Stack) + vm.data.depth() - 1
}

pub fn list_open(vm: &mut Vm) -> Result<()> {
    let open = list::open_list(&mut vm.memory, &mut vm.data)?;
    let marker = to_tagged_value(open.start_depth() as u16, Tag::Integer, false);
    vm.rstack.push(&mut vm.memory, "(", marker)
}

pub fn list_close(vm: &mut Vm) -> Result<()> {
    let marker = vm.rstack.pop(")")?;
    let start_depth = match from_tagged(marker) {
        TaggedValue::Integer(v) => v as usize,
        other => return Err(VmError::InvalidTag { expected: "Integer(list)", found: other.tag() }),
    };
    list::close_list(&mut vm.memory, &mut vm.data, OpenList::at_depth(start_depth))
}

/// `(list -- list n)`: the list's slot count, without consuming it.
pub fn length(vm: &mut Vm) -> Result<()> {
    let header = vm.data.peek("length")?;
    let slots = list_slots(header)
        .ok_or(VmError::TypeError { op: "length", found: from_tagged(header).tag() })?;
    let cell = to_tagged_value(slots, Tag::Integer, false);
    vm.data.push(&mut vm.memory, "length", cell)
}

/// `(list i -- value)`: the list is consumed either way; out-of-range or
/// the list itself not being a LIST header yields NIL.
pub fn get_at(vm: &mut Vm) -> Result<()> {
    let idx_cell = vm.data.pop("getAt")?;
    let idx = index_of(idx_cell, "getAt")?;
    let header_cell = header_cell_index(vm);
    let value = list::get_at(&vm.memory, header_cell, idx)?;
    vm.data.drop_list("getAt")?;
    vm.data.push(&mut vm.memory, "getAt", value)
}

/// `(list i value -- list')` on success: the element is mutated in place,
/// so the list already at TOS *is* `list'` and nothing further is pushed.
/// `(list i value -- NIL)` if `i` named a compound slot: the stale list is
/// dropped and NIL pushed instead.
pub fn set_at(vm: &mut Vm) -> Result<()> {
    let value = vm.data.pop("setAt")?;
    let idx_cell = vm.data.pop("setAt")?;
    let idx = index_of(idx_cell, "setAt")?;
    let header_cell = header_cell_index(vm);
    let result = list::set_at(&mut vm.memory, &mut vm.data, header_cell, idx, value)?;
    if is_nil(result) {
        vm.data.drop_list("setAt")?;
        vm.data.push(&mut vm.memory, "setAt", result)
    } else {
        Ok(())
    }
}

/// `(list value -- list')`: inserts `value` as the new logical front
/// element (the slot closest to the header) in O(1) — the header was
/// already TOS, so this is just pop-header/push-value/push-new-header.
pub fn prepend(vm: &mut Vm) -> Result<()> {
    let value_cells = pop_span(&mut vm.data, "prepend")?;
    let header = vm.data.pop("prepend")?;
    let slots = list_slots(header)
        .ok_or(VmError::TypeError { op: "prepend", found: from_tagged(header).tag() })?;
    push_span(&mut vm.memory, &mut vm.data, "prepend", &value_cells)?;
    let new_header = to_tagged_value(slots + value_cells.len() as u16, Tag::List, false);
    vm.data.push(&mut vm.memory, "prepend", new_header)
}

/// `(list value -- list')`: inserts `value` as the new logical last
/// element (the slot farthest from the header), O(slots) since the
/// existing payload has to shift to make room underneath it.
pub fn append(vm: &mut Vm) -> Result<()> {
    let value_cells = pop_span(&mut vm.data, "append")?;
    let header = vm.data.pop("append")?;
    let slots = list_slots(header)
        .ok_or(VmError::TypeError { op: "append", found: from_tagged(header).tag() })?;
    let mut scratch = Vec::with_capacity(slots as usize);
    for _ in 0..slots {
        scratch.push(vm.data.pop("append")?);
    }
    push_span(&mut vm.memory, &mut vm.data, "append", &value_cells)?;
    for cell in scratch.into_iter().rev() {
        vm.data.push(&mut vm.memory, "append", cell)?;
    }
    let new_header = to_tagged_value(slots + value_cells.len() as u16, Tag::List, false);
    vm.data.push(&mut vm.memory, "append", new_header)
}

/// Wraps the whole top span (scalar or list) into a fresh singleton list.
pub fn elem(vm: &mut Vm) -> Result<()> {
    let cells = pop_span(&mut vm.data, "elem")?;
    let len = cells.len() as u16;
    push_span(&mut vm.memory, &mut vm.data, "elem", &cells)?;
    let header = to_tagged_value(len, Tag::List, false);
    vm.data.push(&mut vm.memory, "elem", header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::VmConfig;

    fn push_int(vm: &mut Vm, v: u16) {
        vm.data.push(&mut vm.memory, "lit", to_tagged_value(v, Tag::Integer, false)).unwrap();
    }

    #[test]
    fn build_list_then_length() {
        let mut vm = Vm::new(VmConfig::default());
        list_open(&mut vm).unwrap();
        push_int(&mut vm, 1);
        push_int(&mut vm, 2);
        push_int(&mut vm, 3);
        list_close(&mut vm).unwrap();
        length(&mut vm).unwrap();
        match from_tagged(vm.data.peek("t").unwrap()) {
            TaggedValue::Integer(3) => {}
            other => panic!("expected Integer(3), got {other:?}"),
        }
    }

    #[test]
    fn get_at_reads_logical_front_as_index_zero() {
        let mut vm = Vm::new(VmConfig::default());
        list_open(&mut vm).unwrap();
        push_int(&mut vm, 10);
        push_int(&mut vm, 20);
        push_int(&mut vm, 30);
        list_close(&mut vm).unwrap();
        push_int(&mut vm, 1);
        get_at(&mut vm).unwrap();
        match from_tagged(vm.data.peek("t").unwrap()) {
            TaggedValue::Integer(20) => {}
            other => panic!("expected Integer(20), got {other:?}"),
        }
    }

    #[test]
    fn prepend_then_append_grow_slot_count() {
        let mut vm = Vm::new(VmConfig::default());
        list_open(&mut vm).unwrap();
        push_int(&mut vm, 1);
        list_close(&mut vm).unwrap();
        push_int(&mut vm, 99);
        prepend(&mut vm).unwrap();
        push_int(&mut vm, 42);
        append(&mut vm).unwrap();
        assert_eq!(list_slots(vm.data.peek("t").unwrap()), Some(3));
    }
}

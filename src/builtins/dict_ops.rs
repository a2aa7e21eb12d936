//! Runtime dictionary and reference builtins. `define`/`lookup` operate on
//! interned STRING refs already on the stack (colon-definitions compile
//! through the compiler/dictionary directly; these are the stack-facing
//! counterparts). `load`/`store` are the global-heap ref indirection the
//! dictionary's stored values point through.

use crate::error::{Result, VmError};
use crate::tagged::{from_tagged, nil, Cell, TaggedValue};
use crate::vm::Vm;

fn name_of(vm: &Vm, cell: Cell, op: &'static str) -> Result<String> {
    match from_tagged(cell) {
        TaggedValue::String(offset) => vm.digest.get(&vm.memory, offset),
        other => Err(VmError::TypeError { op, found: other.tag() }),
    }
}

fn address_of(cell: Cell, op: &'static str) -> Result<Cell> {
    match from_tagged(cell) {
        TaggedValue::Address(_) => Ok(cell),
        other => Err(VmError::TypeError { op, found: other.tag() }),
    }
}

/// `(value name -- )`: binds `name` (a STRING ref) to `value` in the
/// dictionary's current scope.
pub fn define(vm: &mut Vm) -> Result<()> {
    let name_cell = vm.data.pop("define")?;
    let value = vm.data.pop("define")?;
    let name = name_of(vm, name_cell, "define")?;
    let base = vm.global_base_cell();
    vm.dictionary.define(&mut vm.memory, &mut vm.heap, base, &mut vm.digest, &name, value)
}

/// `(name -- value)`: NIL if undefined.
pub fn lookup(vm: &mut Vm) -> Result<()> {
    let name_cell = vm.data.pop("lookup")?;
    let name = name_of(vm, name_cell, "lookup")?;
    let found = vm.dictionary.lookup(&vm.memory, &vm.digest, &name)?;
    vm.data.push(&mut vm.memory, "lookup", found.unwrap_or_else(nil))
}

/// `(ref -- value)`.
pub fn load(vm: &mut Vm) -> Result<()> {
    let ref_cell = vm.data.pop("load")?;
    let addr = address_of(ref_cell, "load")?;
    let value = vm.heap.gpeek(&vm.memory, addr)?;
    vm.data.push(&mut vm.memory, "load", value)
}

/// `(value ref -- )`.
pub fn store(vm: &mut Vm) -> Result<()> {
    let ref_cell = vm.data.pop("store")?;
    let value = vm.data.pop("store")?;
    let addr = address_of(ref_cell, "store")?;
    vm.heap.gpoke(&mut vm.memory, addr, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::VmConfig;
    use crate::tagged::{to_tagged_value, Tag};

    #[test]
    fn define_then_lookup_round_trips() {
        let mut vm = Vm::new(VmConfig::default());
        let name_offset = vm.digest.intern(&mut vm.memory, "answer").unwrap();
        let value = to_tagged_value(42, Tag::Integer, false);
        vm.data.push(&mut vm.memory, "lit", value).unwrap();
        vm.data
            .push(&mut vm.memory, "lit", to_tagged_value(name_offset, Tag::String, false))
            .unwrap();
        define(&mut vm).unwrap();

        vm.data
            .push(&mut vm.memory, "lit", to_tagged_value(name_offset, Tag::String, false))
            .unwrap();
        lookup(&mut vm).unwrap();
        assert_eq!(vm.data.peek("t").unwrap(), value);
    }

    #[test]
    fn store_then_load_round_trips() {
        let mut vm = Vm::new(VmConfig::default());
        let value = to_tagged_value(7, Tag::Integer, false);
        let base = vm.global_base_cell();
        let data_ref = vm.heap.gpush(&mut vm.memory, base, to_tagged_value(0, Tag::Integer, false)).unwrap();

        vm.data.push(&mut vm.memory, "lit", value).unwrap();
        vm.data.push(&mut vm.memory, "lit", data_ref).unwrap();
        store(&mut vm).unwrap();

        vm.data.push(&mut vm.memory, "lit", data_ref).unwrap();
        load(&mut vm).unwrap();
        assert_eq!(vm.data.peek("t").unwrap(), value);
    }
}

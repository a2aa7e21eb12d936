//! Comparison builtins. Results are `1.0`/`0.0` numbers so comparisons
//! compose with arithmetic and broadcasting without a separate boolean
//! tag, matching the stack's "everything is a cell" discipline.

use crate::broadcast::{binary, read_value, write_value};
use crate::error::Result;
use crate::list::{pop_span, push_span};
use crate::vm::Vm;

fn bool_cell(b: bool) -> f32 {
    if b { 1.0 } else { 0.0 }
}

fn cmp_op(vm: &mut Vm, op: &'static str, f: fn(f32, f32) -> bool) -> Result<()> {
    let rhs_cells = pop_span(&mut vm.data, op)?;
    let lhs_cells = pop_span(&mut vm.data, op)?;
    let lhs = read_value(&lhs_cells);
    let rhs = read_value(&rhs_cells);
    let result = binary(&lhs, &rhs, op, move |a, b| bool_cell(f(a, b)))?;
    push_span(&mut vm.memory, &mut vm.data, op, &write_value(&result))
}

pub fn eq(vm: &mut Vm) -> Result<()> {
    cmp_op(vm, "eq", |a, b| a == b)
}

pub fn neq(vm: &mut Vm) -> Result<()> {
    cmp_op(vm, "neq", |a, b| a != b)
}

pub fn lt(vm: &mut Vm) -> Result<()> {
    cmp_op(vm, "lt", |a, b| a < b)
}

pub fn le(vm: &mut Vm) -> Result<()> {
    cmp_op(vm, "le", |a, b| a <= b)
}

pub fn gt(vm: &mut Vm) -> Result<()> {
    cmp_op(vm, "gt", |a, b| a > b)
}

pub fn ge(vm: &mut Vm) -> Result<()> {
    cmp_op(vm, "ge", |a, b| a >= b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::VmConfig;
    use crate::tagged::{from_tagged, Cell, TaggedValue};

    #[test]
    fn lt_produces_boolean_number() {
        let mut vm = Vm::new(VmConfig::default());
        vm.data.push(&mut vm.memory, "lit", Cell::from_f32(1.0)).unwrap();
        vm.data.push(&mut vm.memory, "lit", Cell::from_f32(2.0)).unwrap();
        lt(&mut vm).unwrap();
        match from_tagged(vm.data.peek("t").unwrap()) {
            TaggedValue::Number(n) => assert_eq!(n, 1.0),
            other => panic!("expected Number, got {other:?}"),
        }
    }
}

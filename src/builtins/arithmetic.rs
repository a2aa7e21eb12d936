//! Arithmetic builtins, all broadcasting over lists.

use crate::broadcast::{binary, read_value, unary, write_value};
use crate::error::Result;
use crate::list::{pop_span, push_span};
use crate::vm::Vm;

fn unary_op(vm: &mut Vm, op: &'static str, f: fn(f32) -> f32) -> Result<()> {
    let cells = pop_span(&mut vm.data, op)?;
    let value = read_value(&cells);
    let result = unary(&value, op, f)?;
    push_span(&mut vm.memory, &mut vm.data, op, &write_value(&result))
}

fn binary_op(vm: &mut Vm, op: &'static str, f: fn(f32, f32) -> f32) -> Result<()> {
    let rhs_cells = pop_span(&mut vm.data, op)?;
    let lhs_cells = pop_span(&mut vm.data, op)?;
    let lhs = read_value(&lhs_cells);
    let rhs = read_value(&rhs_cells);
    let result = binary(&lhs, &rhs, op, f)?;
    push_span(&mut vm.memory, &mut vm.data, op, &write_value(&result))
}

pub fn add(vm: &mut Vm) -> Result<()> {
    binary_op(vm, "add", |a, b| a + b)
}

pub fn sub(vm: &mut Vm) -> Result<()> {
    binary_op(vm, "sub", |a, b| a - b)
}

pub fn mul(vm: &mut Vm) -> Result<()> {
    binary_op(vm, "mul", |a, b| a * b)
}

pub fn div(vm: &mut Vm) -> Result<()> {
    binary_op(vm, "div", |a, b| a / b)
}

pub fn modulo(vm: &mut Vm) -> Result<()> {
    binary_op(vm, "mod", |a, b| a % b)
}

pub fn min(vm: &mut Vm) -> Result<()> {
    binary_op(vm, "min", f32::min)
}

pub fn max(vm: &mut Vm) -> Result<()> {
    binary_op(vm, "max", f32::max)
}

pub fn pow(vm: &mut Vm) -> Result<()> {
    binary_op(vm, "pow", f32::powf)
}

pub fn abs(vm: &mut Vm) -> Result<()> {
    unary_op(vm, "abs", f32::abs)
}

pub fn neg(vm: &mut Vm) -> Result<()> {
    unary_op(vm, "neg", |a| -a)
}

pub fn sign(vm: &mut Vm) -> Result<()> {
    unary_op(vm, "sign", f32::signum)
}

pub fn exp(vm: &mut Vm) -> Result<()> {
    unary_op(vm, "exp", f32::exp)
}

pub fn ln(vm: &mut Vm) -> Result<()> {
    unary_op(vm, "ln", f32::ln)
}

pub fn log(vm: &mut Vm) -> Result<()> {
    unary_op(vm, "log", f32::log10)
}

pub fn sqrt(vm: &mut Vm) -> Result<()> {
    unary_op(vm, "sqrt", f32::sqrt)
}

pub fn recip(vm: &mut Vm) -> Result<()> {
    unary_op(vm, "recip", |a| 1.0 / a)
}

pub fn floor(vm: &mut Vm) -> Result<()> {
    unary_op(vm, "floor", f32::floor)
}

pub fn not(vm: &mut Vm) -> Result<()> {
    unary_op(vm, "not", |a| if a == 0.0 { 1.0 } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::VmConfig;
    use crate::tagged::{from_tagged, Cell, TaggedValue};

    fn push_number(vm: &mut Vm, n: f32) {
        vm.data.push(&mut vm.memory, "lit", Cell::from_f32(n)).unwrap();
    }

    fn top_number(vm: &Vm) -> f32 {
        match from_tagged(vm.data.peek("t").unwrap()) {
            TaggedValue::Number(n) => n,
            other => panic!("expected Number, got {other:?}"),
        }
    }

    #[test]
    fn add_two_scalars() {
        let mut vm = Vm::new(VmConfig::default());
        push_number(&mut vm, 5.0);
        push_number(&mut vm, 3.0);
        add(&mut vm).unwrap();
        assert_eq!(top_number(&vm), 8.0);
    }

    #[test]
    fn add_then_mul_chains() {
        let mut vm = Vm::new(VmConfig::default());
        push_number(&mut vm, 5.0);
        push_number(&mut vm, 3.0);
        add(&mut vm).unwrap();
        push_number(&mut vm, 2.0);
        mul(&mut vm).unwrap();
        assert_eq!(top_number(&vm), 16.0);
    }
}

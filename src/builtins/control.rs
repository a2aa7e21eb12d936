//! Frame/eval protocol, branches, literals, and the `case`/`do`/group
//! control words. Branch targets and literal payloads are inline operands
//! in CODE immediately following the opcode byte(s);
//! reading one always advances `vm.ip` past it, branch or not.

use crate::error::{Result, VmError};
use crate::memory::Segment;
use crate::tagged::{from_tagged, to_tagged_value, Cell, Tag, TaggedValue};
use crate::vm::Vm;

/// Marks a `case` construct on the return stack so `endcase` can confirm
/// it is unwinding the construct it thinks it is.
const CASE_MARKER: u16 = 1;

fn read_i16(vm: &mut Vm) -> Result<i16> {
    let raw = vm.memory.read16(Segment::Code, vm.ip)?;
    vm.ip += 2;
    Ok(raw as i16)
}

fn read_u16(vm: &mut Vm) -> Result<u16> {
    let raw = vm.memory.read16(Segment::Code, vm.ip)?;
    vm.ip += 2;
    Ok(raw)
}

fn read_f32(vm: &mut Vm) -> Result<f32> {
    let raw = vm.memory.read_float32(Segment::Code, vm.ip)?;
    vm.ip += 4;
    Ok(raw)
}

fn read_cell_operand(vm: &mut Vm) -> Result<Cell> {
    read_f32(vm).map(Cell::from_f32)
}

fn is_zero(cell: Cell) -> bool {
    match from_tagged(cell) {
        TaggedValue::Number(n) => n == 0.0,
        TaggedValue::Integer(v) => v == 0,
        _ => false,
    }
}

pub fn branch(vm: &mut Vm) -> Result<()> {
    let offset = read_i16(vm)?;
    vm.ip = (vm.ip as isize + offset as isize) as usize;
    Ok(())
}

/// Branches like [`branch`], additionally pushing a block-style return
/// address (a CODE,meta=1 cell) — the lightweight half of `eval`'s block
/// dispatch, reused here for the compiled form of the same construct.
pub fn branch_call(vm: &mut Vm) -> Result<()> {
    let offset = read_i16(vm)?;
    let return_ip = vm.ip;
    let return_cell = to_tagged_value(return_ip as u16, Tag::Code, true);
    vm.rstack.push(&mut vm.memory, "branch_call", return_cell)?;
    vm.ip = (return_ip as isize + offset as isize) as usize;
    Ok(())
}

/// Compiled word reference: absolute 16-bit CODE address, full call frame.
pub fn call(vm: &mut Vm) -> Result<()> {
    let addr = read_u16(vm)?;
    let return_ip = vm.ip;
    vm.call(return_ip, addr as usize)
}

pub fn exit(vm: &mut Vm) -> Result<()> {
    vm.exit()
}

/// Pops a status value and halts the VM unconditionally, leaving the
/// value on the data stack as the program's result.
pub fn exit_code(vm: &mut Vm) -> Result<()> {
    vm.data.peek("exit_code")?;
    vm.running = false;
    Ok(())
}

/// Immediately halts the VM, regardless of frame depth.
pub fn abort(vm: &mut Vm) -> Result<()> {
    vm.running = false;
    Ok(())
}

pub fn eval(vm: &mut Vm) -> Result<()> {
    vm.eval()
}

pub fn if_zero_branch(vm: &mut Vm) -> Result<()> {
    let offset = read_i16(vm)?;
    let test = vm.data.pop("if_zero_branch")?;
    if is_zero(test) {
        vm.ip = (vm.ip as isize + offset as isize) as usize;
    }
    Ok(())
}

/// `(n block -- )`: runs `block` `n` times. `n` is a scalar count; `block`
/// is a CODE reference, driven to completion via
/// [`Vm::eval_to_completion`] on each iteration (not plain `eval`, which
/// only arms the fetch loop rather than running it) so it works
/// uniformly for colon-definitions and `{ }` blocks.
pub fn do_op(vm: &mut Vm) -> Result<()> {
    let block = vm.data.pop("do")?;
    let count_cell = vm.data.pop("do")?;
    let count = match from_tagged(count_cell) {
        TaggedValue::Number(n) => n as i64,
        TaggedValue::Integer(v) => v as i64,
        other => return Err(VmError::TypeError { op: "do", found: other.tag() }),
    };
    for _ in 0..count.max(0) {
        vm.data.push(&mut vm.memory, "do", block)?;
        vm.eval_to_completion()?;
    }
    Ok(())
}

pub fn case_open(vm: &mut Vm) -> Result<()> {
    let marker = to_tagged_value(CASE_MARKER, Tag::Sentinel, false);
    vm.rstack.push(&mut vm.memory, "case", marker)
}

/// `(selector test -- selector | )` plus a trailing branch operand: pops
/// `test`, peeks the `selector` beneath it. On a match, consumes the
/// selector and falls into the arm body; otherwise branches past it.
pub fn case_of(vm: &mut Vm) -> Result<()> {
    let offset = read_i16(vm)?;
    let test = vm.data.pop("case_of")?;
    let selector = vm.data.peek("case_of")?;
    if selector.0 == test.0 {
        vm.data.pop("case_of")?;
    } else {
        vm.ip = (vm.ip as isize + offset as isize) as usize;
    }
    Ok(())
}

/// Unconditionally consumes the selector once no `of` arm matched.
pub fn case_default(vm: &mut Vm) -> Result<()> {
    vm.data.pop("case_default").map(|_| ())
}

/// Unwinds the `case` marker pushed by `case_open`, failing fatally if the
/// return stack does not hold the expected construct.
pub fn case_end(vm: &mut Vm) -> Result<()> {
    let marker = vm.rstack.pop("case_end")?;
    match from_tagged(marker) {
        TaggedValue::Sentinel(CASE_MARKER) => Ok(()),
        other => Err(VmError::InvalidTag { expected: "Sentinel(case)", found: other.tag() }),
    }
}

/// Saves the current data-stack depth on the return stack, so a matching
/// `group_right` can report how many items were produced in between.
pub fn group_left(vm: &mut Vm) -> Result<()> {
    let depth = vm.data.depth();
    let marker = to_tagged_value(depth as u16, Tag::Integer, false);
    vm.rstack.push(&mut vm.memory, "group_left", marker)
}

/// `( ... -- ... count)`: pops the matching marker and pushes the number
/// of items produced since `group_left`.
pub fn group_right(vm: &mut Vm) -> Result<()> {
    let marker = vm.rstack.pop("group_right")?;
    let start = match from_tagged(marker) {
        TaggedValue::Integer(v) => v as usize,
        other => return Err(VmError::InvalidTag { expected: "Integer(group)", found: other.tag() }),
    };
    let count = vm.data.depth().saturating_sub(start);
    let cell = to_tagged_value(count as u16, Tag::Integer, false);
    vm.data.push(&mut vm.memory, "group_right", cell)
}

pub fn literal_number(vm: &mut Vm) -> Result<()> {
    let value = read_f32(vm)?;
    vm.data.push(&mut vm.memory, "literal_number", Cell::from_f32(value))
}

pub fn literal_string(vm: &mut Vm) -> Result<()> {
    let offset = read_u16(vm)?;
    let cell = to_tagged_value(offset, Tag::String, false);
    vm.data.push(&mut vm.memory, "literal_string", cell)
}

pub fn literal_address(vm: &mut Vm) -> Result<()> {
    let cell = read_cell_operand(vm)?;
    vm.data.push(&mut vm.memory, "literal_address", cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::VmConfig;

    fn emit_i16(vm: &mut Vm, v: i16) {
        vm.compiler.emit_u16(&mut vm.memory, v as u16).unwrap();
    }

    #[test]
    fn branch_jumps_by_relative_offset() {
        let mut vm = Vm::new(VmConfig::default());
        vm.ip = vm.compiler.mark();
        emit_i16(&mut vm, 10);
        let after_operand = vm.ip + 2;
        branch(&mut vm).unwrap();
        assert_eq!(vm.ip, after_operand + 10);
    }

    #[test]
    fn if_zero_branch_skips_when_nonzero() {
        let mut vm = Vm::new(VmConfig::default());
        vm.data.push(&mut vm.memory, "lit", Cell::from_f32(1.0)).unwrap();
        vm.ip = vm.compiler.mark();
        emit_i16(&mut vm, 99);
        let after_operand = vm.ip + 2;
        if_zero_branch(&mut vm).unwrap();
        assert_eq!(vm.ip, after_operand);
    }

    #[test]
    fn if_zero_branch_jumps_when_zero() {
        let mut vm = Vm::new(VmConfig::default());
        vm.data.push(&mut vm.memory, "lit", Cell::from_f32(0.0)).unwrap();
        vm.ip = vm.compiler.mark();
        emit_i16(&mut vm, 7);
        let after_operand = vm.ip + 2;
        if_zero_branch(&mut vm).unwrap();
        assert_eq!(vm.ip, after_operand + 7);
    }

    #[test]
    fn group_left_then_right_counts_pushed_items() {
        let mut vm = Vm::new(VmConfig::default());
        group_left(&mut vm).unwrap();
        vm.data.push(&mut vm.memory, "lit", Cell::from_f32(1.0)).unwrap();
        vm.data.push(&mut vm.memory, "lit", Cell::from_f32(2.0)).unwrap();
        vm.data.push(&mut vm.memory, "lit", Cell::from_f32(3.0)).unwrap();
        group_right(&mut vm).unwrap();
        match from_tagged(vm.data.peek("t").unwrap()) {
            TaggedValue::Integer(3) => {}
            other => panic!("expected Integer(3), got {other:?}"),
        }
    }

    #[test]
    fn case_end_without_matching_open_fails() {
        let mut vm = Vm::new(VmConfig::default());
        assert!(case_end(&mut vm).is_err());
    }

    #[test]
    fn case_open_then_end_round_trips() {
        let mut vm = Vm::new(VmConfig::default());
        case_open(&mut vm).unwrap();
        case_end(&mut vm).unwrap();
    }
}

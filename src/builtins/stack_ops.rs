//! Stack-shuffling builtins. All are list-aware: "the top element" means
//! the whole span (header + payload) when TOS is a LIST header, not just
//! its header cell.

use crate::error::{Result, VmError};
use crate::list::{pop_span, push_span};
use crate::tagged::{from_tagged, TaggedValue};
use crate::vm::Vm;

fn pop_n_spans(vm: &mut Vm, op: &'static str, n: usize) -> Result<Vec<Vec<crate::tagged::Cell>>> {
    (0..n).map(|_| pop_span(&mut vm.data, op)).collect()
}

pub fn dup(vm: &mut Vm) -> Result<()> {
    let a = pop_span(&mut vm.data, "dup")?;
    push_span(&mut vm.memory, &mut vm.data, "dup", &a)?;
    push_span(&mut vm.memory, &mut vm.data, "dup", &a)
}

pub fn drop_op(vm: &mut Vm) -> Result<()> {
    pop_span(&mut vm.data, "drop").map(|_| ())
}

pub fn swap(vm: &mut Vm) -> Result<()> {
    let spans = pop_n_spans(vm, "swap", 2)?; // [b, a]
    push_span(&mut vm.memory, &mut vm.data, "swap", &spans[0])?;
    push_span(&mut vm.memory, &mut vm.data, "swap", &spans[1])
}

pub fn over(vm: &mut Vm) -> Result<()> {
    let spans = pop_n_spans(vm, "over", 2)?; // [b, a]
    push_span(&mut vm.memory, &mut vm.data, "over", &spans[1])?;
    push_span(&mut vm.memory, &mut vm.data, "over", &spans[0])?;
    push_span(&mut vm.memory, &mut vm.data, "over", &spans[1])
}

pub fn nip(vm: &mut Vm) -> Result<()> {
    let spans = pop_n_spans(vm, "nip", 2)?; // [b, a]
    push_span(&mut vm.memory, &mut vm.data, "nip", &spans[0])
}

pub fn tuck(vm: &mut Vm) -> Result<()> {
    let spans = pop_n_spans(vm, "tuck", 2)?; // [b, a]
    push_span(&mut vm.memory, &mut vm.data, "tuck", &spans[0])?;
    push_span(&mut vm.memory, &mut vm.data, "tuck", &spans[1])?;
    push_span(&mut vm.memory, &mut vm.data, "tuck", &spans[0])
}

pub fn rot(vm: &mut Vm) -> Result<()> {
    let spans = pop_n_spans(vm, "rot", 3)?; // [c, b, a]
    push_span(&mut vm.memory, &mut vm.data, "rot", &spans[1])?;
    push_span(&mut vm.memory, &mut vm.data, "rot", &spans[0])?;
    push_span(&mut vm.memory, &mut vm.data, "rot", &spans[2])
}

pub fn revrot(vm: &mut Vm) -> Result<()> {
    let spans = pop_n_spans(vm, "revrot", 3)?; // [c, b, a]
    push_span(&mut vm.memory, &mut vm.data, "revrot", &spans[0])?;
    push_span(&mut vm.memory, &mut vm.data, "revrot", &spans[2])?;
    push_span(&mut vm.memory, &mut vm.data, "revrot", &spans[1])
}

/// `(n -- value)`: copies the n-th span from TOS (0 = the item directly
/// below `n`) without removing it.
pub fn pick(vm: &mut Vm) -> Result<()> {
    let n_cells = pop_span(&mut vm.data, "pick")?;
    let n = match from_tagged(n_cells[0]) {
        TaggedValue::Number(v) => v as usize,
        TaggedValue::Integer(v) => v as usize,
        other => {
            return Err(VmError::TypeError { op: "pick", found: other.tag() })
        }
    };
    let spans = pop_n_spans(vm, "pick", n + 1)?;
    for span in spans.iter().rev() {
        push_span(&mut vm.memory, &mut vm.data, "pick", span)?;
    }
    push_span(&mut vm.memory, &mut vm.data, "pick", &spans[n])
}

//! `@name` symbol resolution and the `print` side-effect builtin.

use crate::error::Result;
use crate::list::pop_span;
use crate::memory::Segment;
use crate::tagged::from_tagged;
use crate::vm::Vm;

fn read_u16(vm: &mut Vm) -> Result<u16> {
    let raw = vm.memory.read16(Segment::Code, vm.ip)?;
    vm.ip += 2;
    Ok(raw)
}

/// `@name`: an inline STRING-table offset operand follows the opcode;
/// resolves it through the dictionary and pushes the definition itself
/// (a BUILTIN/CODE cell), so `eval` can dispatch it directly — this is
/// how `5 @add eval` reads the word `add` without calling it outright.
pub fn push_symbol_ref(vm: &mut Vm) -> Result<()> {
    let offset = read_u16(vm)?;
    let name = vm.digest.get(&vm.memory, offset)?;
    let resolved = vm.dictionary.resolve_symbol(&vm.memory, &vm.digest, &name)?;
    vm.data.push(&mut vm.memory, "@", resolved)
}

/// Pops and prints the whole top span (scalar or list) to stdout.
pub fn print(vm: &mut Vm) -> Result<()> {
    let cells = pop_span(&mut vm.data, "print")?;
    let rendered: Vec<String> =
        cells.iter().map(|c| format!("{:?}", from_tagged(*c))).collect();
    println!("[{}]", rendered.join(" "));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::VmConfig;
    use crate::tagged::{to_tagged_value, Tag};

    #[test]
    fn push_symbol_ref_resolves_builtin() {
        let mut vm = Vm::new(VmConfig::default());
        let offset = vm.digest.intern(&mut vm.memory, "dup").unwrap();
        vm.compiler.emit_u16(&mut vm.memory, offset).unwrap();
        vm.ip = 0;
        push_symbol_ref(&mut vm).unwrap();
        let resolved = vm.data.peek("t").unwrap();
        assert!(matches!(from_tagged(resolved), crate::tagged::TaggedValue::Builtin(_)));
    }

    #[test]
    fn print_consumes_top_value() {
        let mut vm = Vm::new(VmConfig::default());
        vm.data.push(&mut vm.memory, "lit", to_tagged_value(1, Tag::Integer, false)).unwrap();
        print(&mut vm).unwrap();
        assert_eq!(vm.data.depth(), 0);
    }
}

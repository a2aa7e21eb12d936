//! The register file, frame/eval protocol, and interpreter loop.
//! One top-level driver coordinating several sub-readers against shared,
//! explicitly-passed state, reshaped into an explicit, owned [`Vm`] struct
//! passed to every builtin — owned state by reference, never a global
//! singleton.

use crate::compiler::{decode_opcode, Compiler};
use crate::dictionary::Dictionary;
use crate::digest::Digest;
use crate::error::{Result, VmError};
use crate::heap::Heap;
use crate::memory::stack::Stack;
use crate::memory::{Memory, Segment, VmConfig};
use crate::opcode::DispatchTable;
use crate::tagged::{from_tagged, to_tagged_value, Cell, Tag, TaggedValue};

pub struct Vm {
    pub memory: Memory,
    pub data: Stack,
    pub rstack: Stack,
    pub compiler: Compiler,
    pub digest: Digest,
    pub dictionary: Dictionary,
    pub heap: Heap,
    dispatch: DispatchTable,

    pub ip: usize,
    /// Index into `rstack`'s cells marking the current frame root.
    pub bp: usize,
    pub list_depth: u32,
    pub running: bool,
    pub debug: bool,

    global_base_cell: usize,
}

impl Vm {
    pub fn new(config: VmConfig) -> Self {
        let memory = Memory::new(&config);
        let global_base_cell = memory.segment_base_cell(Segment::Global);
        let data = Stack::new(Segment::Stack, config.stack_cells);
        let rstack = Stack::new(Segment::RStack, config.rstack_cells);
        let compiler = Compiler::new(config.code_bytes);
        let digest = Digest::new();
        let dictionary = Dictionary::new();
        let heap = Heap::new(config.global_cells);
        let dispatch = DispatchTable::new();

        let mut vm = Vm {
            memory,
            data,
            rstack,
            compiler,
            digest,
            dictionary,
            heap,
            dispatch,
            ip: 0,
            bp: 0,
            list_depth: 0,
            running: true,
            debug: false,
            global_base_cell,
        };
        vm.install_builtins();
        vm
    }

    fn install_builtins(&mut self) {
        for (opcode, name) in crate::builtins::names() {
            let (mem, heap, gbase, digest, dict) = (
                &mut self.memory,
                &mut self.heap,
                self.global_base_cell,
                &mut self.digest,
                &mut self.dictionary,
            );
            dict.define_builtin(mem, heap, gbase, digest, name, opcode as u16)
                .expect("builtin table fits in the global heap");
        }
    }

    pub fn reset(&mut self) {
        self.ip = 0;
        self.bp = 0;
        self.list_depth = 0;
        self.running = true;
    }

    pub fn global_base_cell(&self) -> usize {
        self.global_base_cell
    }

    /// Full call convention: push return address, push BP, BP := RSP,
    /// IP := addr.
    pub fn call(&mut self, return_ip: usize, addr: usize) -> Result<()> {
        let return_cell = to_tagged_value(return_ip as u16, Tag::Code, true);
        self.rstack.push(&mut self.memory, "call", return_cell)?;
        let bp_cell = to_tagged_value(self.bp as u16, Tag::Integer, false);
        self.rstack.push(&mut self.memory, "call", bp_cell)?;
        self.bp = self.rstack.depth();
        self.ip = addr;
        Ok(())
    }

    /// Exit convention. An empty return stack means there is no frame
    /// left to tear down — the outermost top-level unit is finishing, so
    /// the VM halts. Otherwise the top return-stack cell's tag tells us
    /// which of the two call shapes (§4.7) is unwinding: this core has no
    /// runtime opcode that pushes locals onto RSTACK, so a full-frame
    /// call's RSP always sits exactly at BP when its body reaches `exit`,
    /// making the top cell deterministically the saved BP.
    /// - `Integer` (a saved BP): a full colon-definition frame. Pop it,
    ///   restore BP, then pop and restore the return address beneath it.
    /// - `Code` (a bare return address): a lightweight block return —
    ///   just resume IP there, no BP to restore.
    pub fn exit(&mut self) -> Result<()> {
        if self.rstack.depth() == 0 {
            self.running = false;
            return Ok(());
        }
        let top = self.rstack.pop("exit")?;
        match from_tagged(top) {
            TaggedValue::Integer(saved_bp) => {
                let return_cell = self.rstack.pop("exit")?;
                let return_ip = match from_tagged(return_cell) {
                    TaggedValue::Code { addr, .. } => addr as usize,
                    other => {
                        return Err(VmError::InvalidTag { expected: "Code", found: other.tag() })
                    }
                };
                self.bp = saved_bp as usize;
                self.ip = return_ip;
                Ok(())
            }
            TaggedValue::Code { addr, .. } => {
                self.ip = addr as usize;
                Ok(())
            }
            other => Err(VmError::InvalidTag {
                expected: "Integer (BP) or Code (block return)",
                found: other.tag(),
            }),
        }
    }

    /// `eval`: pops TOS and dispatches it. A non-executable value is
    /// pushed back unchanged (soft fallback, not an error).
    pub fn eval(&mut self) -> Result<()> {
        let value = self.data.pop("eval")?;
        match from_tagged(value) {
            TaggedValue::Code { addr, meta: true } => {
                let return_cell = to_tagged_value(self.ip as u16, Tag::Code, true);
                self.rstack.push(&mut self.memory, "eval", return_cell)?;
                self.ip = addr as usize;
                Ok(())
            }
            TaggedValue::Code { addr, meta: false } => self.call(self.ip, addr as usize),
            TaggedValue::Builtin(opcode) => self.dispatch(opcode),
            _ => self.data.push(&mut self.memory, "eval", value),
        }
    }

    /// Like [`Vm::eval`], but for CODE values drives the fetch-decode
    /// loop itself until the invoked call/block actually returns (the
    /// return stack falls back to its pre-call depth), rather than just
    /// setting `ip`/`rstack` for the caller's own loop to pick up later.
    /// Builtins that need to run a stack-supplied block to completion and
    /// see its effects before continuing — `do`'s loop body is the only
    /// one in this core — call this instead of `eval`.
    pub fn eval_to_completion(&mut self) -> Result<()> {
        let is_code = matches!(from_tagged(self.data.peek("eval")?), TaggedValue::Code { .. });
        if !is_code {
            return self.eval();
        }
        let rstack_before = self.rstack.depth();
        self.eval()?;
        while self.rstack.depth() > rstack_before {
            let (opcode, next_ip) = decode_opcode(&self.memory, self.ip)?;
            self.ip = next_ip;
            self.dispatch(opcode)?;
        }
        Ok(())
    }

    pub fn dispatch(&mut self, opcode: u16) -> Result<()> {
        self.dispatch.dispatch(self, opcode)
    }

    /// Fetch-decode-execute loop starting at `entry`. Wraps any builtin
    /// error with a stack snapshot.
    pub fn run(&mut self, entry: usize) -> std::result::Result<(), String> {
        self.ip = entry;
        self.running = true;
        while self.running {
            let (opcode, next_ip) = match decode_opcode(&self.memory, self.ip) {
                Ok(v) => v,
                Err(e) => return Err(self.wrap_error(&e)),
            };
            self.ip = next_ip;
            if let Err(e) = self.dispatch(opcode) {
                return Err(self.wrap_error(&e));
            }
        }
        if self.compiler.cp() >= self.compiler.bcp() {
            self.compiler.reset();
        }
        Ok(())
    }

    fn wrap_error(&self, e: &VmError) -> String {
        let snapshot = StackSnapshot::capture(self);
        let json = serde_json::to_string(&snapshot).unwrap_or_default();
        format!("Error executing word (stack: {json}): {e}")
    }

    /// Human-readable one-line rendering of the data stack for REPL
    /// output (distinct from the JSON error-snapshot formatter).
    pub fn format_stack(&self) -> String {
        let cells: Vec<String> = self
            .data
            .as_slice()
            .iter()
            .map(|c| format!("{:?}", from_tagged(*c)))
            .collect();
        format!("[{}]", cells.join(" "))
    }
}

#[derive(serde::Serialize)]
struct StackSnapshot {
    data: Vec<String>,
    depth: usize,
}

impl StackSnapshot {
    fn capture(vm: &Vm) -> Self {
        let data: Vec<String> = vm
            .data
            .as_slice()
            .iter()
            .map(|c| format!("{:?}", from_tagged(*c)))
            .collect();
        StackSnapshot { depth: data.len(), data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_then_exit_restores_ip_and_bp() {
        let mut vm = Vm::new(VmConfig::default());
        let saved_bp = vm.bp;
        vm.call(42, 100).unwrap();
        assert_eq!(vm.ip, 100);
        vm.exit().unwrap();
        assert_eq!(vm.ip, 42);
        assert_eq!(vm.bp, saved_bp);
    }

    #[test]
    fn exit_at_top_level_stops_the_vm() {
        let mut vm = Vm::new(VmConfig::default());
        vm.running = true;
        vm.exit().unwrap();
        assert!(!vm.running);
    }

    #[test]
    fn eval_pushes_back_non_executable_values() {
        let mut vm = Vm::new(VmConfig::default());
        let value = Cell::from_f32(3.5);
        vm.data.push(&mut vm.memory, "lit", value).unwrap();
        vm.eval().unwrap();
        assert_eq!(vm.data.peek("t").unwrap(), value);
    }
}

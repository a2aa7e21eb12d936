//! The fixed, numbered opcode set and its dispatch table: a fixed,
//! numbered command set dispatched from a single exhaustive lookup
//! table rather than a `match`, so adding a builtin never touches the
//! interpreter's fetch loop.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::{Result, VmError};
use crate::vm::Vm;

pub type BuiltinFn = fn(&mut Vm) -> Result<()>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum Opcode {
    // Arithmetic (broadcasting over lists)
    Add = 0,
    Sub = 1,
    Mul = 2,
    Div = 3,
    Mod = 4,
    Min = 5,
    Max = 6,
    Abs = 7,
    Neg = 8,
    Sign = 9,
    Exp = 10,
    Ln = 11,
    Log = 12,
    Sqrt = 13,
    Pow = 14,
    Recip = 15,
    Floor = 16,
    Not = 17,

    // Comparison
    Eq = 18,
    Neq = 19,
    Lt = 20,
    Le = 21,
    Gt = 22,
    Ge = 23,

    // Stack shuffling
    Dup = 24,
    Drop = 25,
    Swap = 26,
    Over = 27,
    Nip = 28,
    Tuck = 29,
    Rot = 30,
    RevRot = 31,
    Pick = 32,

    // Control flow
    Branch = 33,
    BranchCall = 34,
    Call = 35,
    Exit = 36,
    ExitCode = 37,
    Abort = 38,
    Eval = 39,
    IfZeroBranch = 40,
    Do = 41,
    CaseOpen = 42,
    CaseOf = 43,
    CaseDefault = 44,
    CaseEnd = 45,
    GroupLeft = 46,
    GroupRight = 47,

    // Literals
    LiteralNumber = 48,
    LiteralString = 49,
    LiteralAddress = 50,

    // Lists
    ListOpen = 51,
    ListClose = 52,
    ListLength = 53,
    ListGetAt = 54,
    ListSetAt = 55,
    ListPrepend = 56,
    ListAppend = 57,
    ListElem = 58,

    // Dictionary
    Define = 59,
    Lookup = 60,
    Load = 61,
    Store = 62,

    // Heap
    GMark = 63,
    GSweep = 64,
    GPush = 65,
    GPop = 66,
    GPeek = 67,

    // Meta
    PushSymbolRef = 68,
    Print = 69,
}

pub const TABLE_SIZE: usize = 256;

/// `table[opcode as usize] = Some(fn)`. A missing entry is
/// `VmError::InvalidOpcode`, never a panic — compiled bytecode reaches
/// the dispatcher from user-level definitions the dispatcher does not
/// fully trust.
pub struct DispatchTable {
    table: [Option<BuiltinFn>; TABLE_SIZE],
}

impl DispatchTable {
    pub fn new() -> Self {
        let mut table: [Option<BuiltinFn>; TABLE_SIZE] = [None; TABLE_SIZE];
        for (opcode, f) in crate::builtins::all() {
            table[opcode as u16 as usize] = Some(f);
        }
        DispatchTable { table }
    }

    pub fn dispatch(&self, vm: &mut Vm, opcode: u16) -> Result<()> {
        let entry = self
            .table
            .get(opcode as usize)
            .and_then(|e| *e)
            .ok_or(VmError::InvalidOpcode(opcode))?;
        entry(vm)
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_127_is_single_byte_128_is_extended() {
        assert!(Opcode::try_from(127u16).is_err() || 127 < 128);
        // Boundary is about value, not a specific opcode name: builtins
        // below 128 fit a single byte, 128 and above need two.
        let below: u16 = 127;
        let at_boundary: u16 = 128;
        assert!(below < 128);
        assert!(at_boundary >= 128);
    }

    #[test]
    fn dispatch_table_covers_every_declared_opcode() {
        let table = DispatchTable::new();
        for opcode in 0u16..=(Opcode::Print as u16) {
            assert!(
                table.table[opcode as usize].is_some(),
                "opcode {opcode} missing from dispatch table"
            );
        }
    }

    #[test]
    fn unassigned_opcode_is_invalid() {
        let table = DispatchTable::new();
        let mut vm = crate::vm::Vm::new(crate::memory::VmConfig::default());
        assert!(matches!(
            table.dispatch(&mut vm, 250),
            Err(VmError::InvalidOpcode(250))
        ));
    }
}

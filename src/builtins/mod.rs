//! One file per cohesive builtin family: arithmetic, comparison, stack
//! shuffling, control flow, lists, dictionary, heap, and meta ops.

mod arithmetic;
mod comparison;
mod control;
mod dict_ops;
mod heap_ops;
mod list_ops;
mod meta_ops;
mod stack_ops;

use crate::opcode::{BuiltinFn, Opcode};

/// `(opcode, name, function)` for every builtin — the single source of
/// truth the dictionary bootstrap and the dispatch table both read from.
const TABLE: &[(Opcode, &str, BuiltinFn)] = &[
    (Opcode::Add, "add", arithmetic::add),
    (Opcode::Sub, "sub", arithmetic::sub),
    (Opcode::Mul, "mul", arithmetic::mul),
    (Opcode::Div, "div", arithmetic::div),
    (Opcode::Mod, "mod", arithmetic::modulo),
    (Opcode::Min, "min", arithmetic::min),
    (Opcode::Max, "max", arithmetic::max),
    (Opcode::Abs, "abs", arithmetic::abs),
    (Opcode::Neg, "neg", arithmetic::neg),
    (Opcode::Sign, "sign", arithmetic::sign),
    (Opcode::Exp, "exp", arithmetic::exp),
    (Opcode::Ln, "ln", arithmetic::ln),
    (Opcode::Log, "log", arithmetic::log),
    (Opcode::Sqrt, "sqrt", arithmetic::sqrt),
    (Opcode::Pow, "pow", arithmetic::pow),
    (Opcode::Recip, "recip", arithmetic::recip),
    (Opcode::Floor, "floor", arithmetic::floor),
    (Opcode::Not, "not", arithmetic::not),
    (Opcode::Eq, "eq", comparison::eq),
    (Opcode::Neq, "neq", comparison::neq),
    (Opcode::Lt, "lt", comparison::lt),
    (Opcode::Le, "le", comparison::le),
    (Opcode::Gt, "gt", comparison::gt),
    (Opcode::Ge, "ge", comparison::ge),
    (Opcode::Dup, "dup", stack_ops::dup),
    (Opcode::Drop, "drop", stack_ops::drop_op),
    (Opcode::Swap, "swap", stack_ops::swap),
    (Opcode::Over, "over", stack_ops::over),
    (Opcode::Nip, "nip", stack_ops::nip),
    (Opcode::Tuck, "tuck", stack_ops::tuck),
    (Opcode::Rot, "rot", stack_ops::rot),
    (Opcode::RevRot, "revrot", stack_ops::revrot),
    (Opcode::Pick, "pick", stack_ops::pick),
    (Opcode::Branch, "branch", control::branch),
    (Opcode::BranchCall, "branch_call", control::branch_call),
    (Opcode::Call, "call", control::call),
    (Opcode::Exit, "exit", control::exit),
    (Opcode::ExitCode, "exit_code", control::exit_code),
    (Opcode::Abort, "abort", control::abort),
    (Opcode::Eval, "eval", control::eval),
    (Opcode::IfZeroBranch, "if_zero_branch", control::if_zero_branch),
    (Opcode::Do, "do", control::do_op),
    (Opcode::CaseOpen, "case_open", control::case_open),
    (Opcode::CaseOf, "case_of", control::case_of),
    (Opcode::CaseDefault, "case_default", control::case_default),
    (Opcode::CaseEnd, "case_end", control::case_end),
    (Opcode::GroupLeft, "group_left", control::group_left),
    (Opcode::GroupRight, "group_right", control::group_right),
    (Opcode::LiteralNumber, "literal_number", control::literal_number),
    (Opcode::LiteralString, "literal_string", control::literal_string),
    (Opcode::LiteralAddress, "literal_address", control::literal_address),
    (Opcode::ListOpen, "(", list_ops::list_open),
    (Opcode::ListClose, ")", list_ops::list_close),
    (Opcode::ListLength, "length", list_ops::length),
    (Opcode::ListGetAt, "getAt", list_ops::get_at),
    (Opcode::ListSetAt, "setAt", list_ops::set_at),
    (Opcode::ListPrepend, "prepend", list_ops::prepend),
    (Opcode::ListAppend, "append", list_ops::append),
    (Opcode::ListElem, "elem", list_ops::elem),
    (Opcode::Define, "define", dict_ops::define),
    (Opcode::Lookup, "lookup", dict_ops::lookup),
    (Opcode::Load, "load", dict_ops::load),
    (Opcode::Store, "store", dict_ops::store),
    (Opcode::GMark, "gmark", heap_ops::gmark),
    (Opcode::GSweep, "gsweep", heap_ops::gsweep),
    (Opcode::GPush, "gpush", heap_ops::gpush),
    (Opcode::GPop, "gpop", heap_ops::gpop),
    (Opcode::GPeek, "gpeek", heap_ops::gpeek),
    (Opcode::PushSymbolRef, "@", meta_ops::push_symbol_ref),
    (Opcode::Print, "print", meta_ops::print),
];

pub fn all() -> impl Iterator<Item = (Opcode, BuiltinFn)> {
    TABLE.iter().map(|(op, _, f)| (*op, *f))
}

pub fn names() -> impl Iterator<Item = (Opcode, &'static str)> {
    TABLE.iter().map(|(op, name, _)| (*op, *name))
}

//! Single-pass recursive-descent parser driving the compiler/dictionary
//! straight from the token stream: numbers, strings, `@name`, bare word
//! references, `:`/`;`, `{`/`}`, `(`/`)`/`[`/`]`, `if/else/;`, `do/;`,
//! `case/of/default/endcase`. No intermediate AST — every token either
//! emits bytecode immediately or reserves a branch placeholder patched
//! once its closing keyword is reached, mirroring the compiler's own
//! reserve-now/patch-later shape.

pub mod token;

use crate::error::{Result, VmError};
use crate::opcode::Opcode;
use crate::tagged::{from_tagged, TaggedValue};
use crate::vm::Vm;
use token::{tokenize, Token, TokenKind};

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Cursor { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_word(&self) -> Option<&str> {
        self.peek().and_then(|t| t.kind.as_word())
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }
}

fn unexpected(tok: &Token) -> VmError {
    VmError::UnexpectedToken { line: tok.line, column: tok.column, found: tok.kind.describe() }
}

fn unexpected_eof() -> VmError {
    VmError::Syntax { line: 0, column: 0, message: "unexpected end of input".to_string() }
}

fn is_word(kind: &TokenKind, words: &[&str]) -> bool {
    matches!(kind, TokenKind::Word(w) if words.contains(&w.as_str()))
}

fn expect_word(cursor: &mut Cursor, expected: &str) -> Result<()> {
    match cursor.advance() {
        Some(tok) if tok.kind.as_word() == Some(expected) => Ok(()),
        Some(tok) => Err(unexpected(tok)),
        None => Err(unexpected_eof()),
    }
}

/// Compiles `source` as the next top-level unit, starting at the
/// compiler's current CP, and appends a trailing `exit` so running the
/// unit from its start address halts the VM cleanly.
pub fn compile_source(vm: &mut Vm, source: &str) -> Result<()> {
    let tokens = tokenize(source)?;
    let mut cursor = Cursor::new(&tokens);
    compile_until(vm, &mut cursor, false, |_| false)?;
    if let Some(tok) = cursor.peek() {
        return Err(unexpected(tok));
    }
    vm.compiler.emit_opcode(&mut vm.memory, Opcode::Exit as u16)?;
    Ok(())
}

/// Compiles tokens until EOF or until the next token satisfies `stop`
/// (left unconsumed for the caller to inspect). `in_def` tracks whether a
/// colon-definition body is currently open, so a nested `:` is rejected.
fn compile_until(
    vm: &mut Vm,
    cursor: &mut Cursor,
    in_def: bool,
    stop: impl Fn(&TokenKind) -> bool,
) -> Result<()> {
    loop {
        match cursor.peek() {
            None => return Ok(()),
            Some(tok) if stop(&tok.kind) => return Ok(()),
            _ => {}
        }
        let tok = cursor.advance().expect("peek confirmed a token").clone();
        compile_token(vm, cursor, in_def, tok)?;
    }
}

fn compile_token(vm: &mut Vm, cursor: &mut Cursor, in_def: bool, tok: Token) -> Result<()> {
    match &tok.kind {
        TokenKind::Number(n) => compile_number(vm, *n),
        TokenKind::Str(s) => compile_string(vm, s),
        TokenKind::At(name) => compile_symbol_ref(vm, name),
        TokenKind::LBrace => compile_block(vm, cursor, in_def),
        TokenKind::LParen => compile_list(vm, cursor, in_def, TokenKind::RParen),
        TokenKind::LBracket => compile_list(vm, cursor, in_def, TokenKind::RBracket),
        TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => Err(unexpected(&tok)),
        TokenKind::Word(w) => compile_word_or_keyword(vm, cursor, in_def, &tok, w.clone()),
    }
}

fn compile_word_or_keyword(
    vm: &mut Vm,
    cursor: &mut Cursor,
    in_def: bool,
    tok: &Token,
    word: String,
) -> Result<()> {
    match word.as_str() {
        ":" => compile_colon_def(vm, cursor, in_def),
        "if" => compile_if(vm, cursor, in_def),
        "do" => compile_do(vm, cursor, in_def),
        "case" => compile_case(vm, cursor, in_def),
        ";" | "else" | "of" | "default" | "endcase" => Err(unexpected(tok)),
        other => compile_word(vm, other),
    }
}

fn compile_number(vm: &mut Vm, n: f32) -> Result<()> {
    vm.compiler.emit_opcode(&mut vm.memory, Opcode::LiteralNumber as u16)?;
    vm.compiler.emit_f32(&mut vm.memory, n)?;
    Ok(())
}

fn compile_string(vm: &mut Vm, s: &str) -> Result<()> {
    let offset = vm.digest.intern(&mut vm.memory, s)?;
    vm.compiler.emit_opcode(&mut vm.memory, Opcode::LiteralString as u16)?;
    vm.compiler.emit_u16(&mut vm.memory, offset)?;
    Ok(())
}

fn compile_symbol_ref(vm: &mut Vm, name: &str) -> Result<()> {
    let offset = vm.digest.intern(&mut vm.memory, name)?;
    vm.compiler.emit_opcode(&mut vm.memory, Opcode::PushSymbolRef as u16)?;
    vm.compiler.emit_u16(&mut vm.memory, offset)?;
    Ok(())
}

/// Bare word reference: resolved against the dictionary at compile time.
/// Only executable bindings (builtins and colon-definitions) compile
/// through a bare name — a name bound to a plain value via the `define`
/// builtin is a runtime concern, reached through `lookup`/`load` instead.
fn compile_word(vm: &mut Vm, name: &str) -> Result<()> {
    let resolved = vm.dictionary.lookup(&vm.memory, &vm.digest, name)?;
    match resolved.map(from_tagged) {
        Some(TaggedValue::Builtin(opcode)) => {
            vm.compiler.emit_opcode(&mut vm.memory, opcode)?;
            Ok(())
        }
        Some(TaggedValue::Code { addr, meta: false }) => {
            vm.compiler.emit_opcode(&mut vm.memory, Opcode::Call as u16)?;
            vm.compiler.emit_u16(&mut vm.memory, addr)?;
            Ok(())
        }
        _ => Err(VmError::UndefinedWord(name.to_string())),
    }
}

/// Emits `opcode` followed by a reserved 16-bit placeholder, returning
/// the placeholder's position and the reference point the eventual
/// runtime offset is relative to (the position immediately after the
/// operand, which is where `vm.ip` sits when the branch builtin reads
/// it).
fn emit_branch_placeholder(vm: &mut Vm, opcode: Opcode) -> Result<(usize, usize)> {
    vm.compiler.emit_opcode(&mut vm.memory, opcode as u16)?;
    let placeholder_pos = vm.compiler.mark();
    vm.compiler.emit_u16(&mut vm.memory, 0)?;
    let ref_point = vm.compiler.mark();
    Ok((placeholder_pos, ref_point))
}

fn patch_branch(vm: &mut Vm, placeholder_pos: usize, ref_point: usize, target: usize) -> Result<()> {
    let offset = target as i64 - ref_point as i64;
    vm.compiler.patch_u16(&mut vm.memory, placeholder_pos, offset as i16 as u16)
}

/// `: name ... ;` — a forward skip branch past the body (so straight-line
/// flow never falls into a definition), the name bound to the body's
/// start address before the body compiles (enabling recursion), then the
/// body itself terminated with `exit`.
fn compile_colon_def(vm: &mut Vm, cursor: &mut Cursor, in_def: bool) -> Result<()> {
    if in_def {
        return Err(VmError::NestedDefinition);
    }
    let name = match cursor.advance() {
        Some(Token { kind: TokenKind::Word(w), .. }) => w.clone(),
        Some(tok) => return Err(unexpected(tok)),
        None => return Err(unexpected_eof()),
    };
    let (placeholder_pos, body_start) = emit_branch_placeholder(vm, Opcode::Branch)?;

    let base = vm.global_base_cell();
    vm.dictionary.define_code(
        &mut vm.memory,
        &mut vm.heap,
        base,
        &mut vm.digest,
        &name,
        body_start as u16,
    )?;

    compile_until(vm, cursor, true, |k| is_word(k, &[";"]))?;
    if cursor.peek_word() != Some(";") {
        return Err(VmError::UnclosedDefinition);
    }
    cursor.advance();
    vm.compiler.emit_opcode(&mut vm.memory, Opcode::Exit as u16)?;
    let skip_target = vm.compiler.mark();
    patch_branch(vm, placeholder_pos, body_start, skip_target)
}

/// Compiles a branch-skipped, `exit`-terminated body and leaves behind a
/// literal push of its CODE,meta=1 address — the runtime value of `{ ...
/// }` when reached by ordinary sequential flow is the block reference
/// itself, not the result of running it.
fn compile_block_value(
    vm: &mut Vm,
    cursor: &mut Cursor,
    in_def: bool,
    stop: impl Fn(&TokenKind) -> bool,
) -> Result<()> {
    let (placeholder_pos, body_start) = emit_branch_placeholder(vm, Opcode::Branch)?;
    compile_until(vm, cursor, in_def, stop)?;
    vm.compiler.emit_opcode(&mut vm.memory, Opcode::Exit as u16)?;
    let skip_target = vm.compiler.mark();
    patch_branch(vm, placeholder_pos, body_start, skip_target)?;
    vm.compiler.emit_opcode(&mut vm.memory, Opcode::LiteralAddress as u16)?;
    vm.compiler.emit_tagged_address(&mut vm.memory, body_start as u16, true)?;
    Ok(())
}

fn compile_block(vm: &mut Vm, cursor: &mut Cursor, in_def: bool) -> Result<()> {
    compile_block_value(vm, cursor, in_def, |k| matches!(k, TokenKind::RBrace))?;
    match cursor.advance() {
        Some(tok) if tok.kind == TokenKind::RBrace => Ok(()),
        Some(tok) => Err(unexpected(tok)),
        None => Err(unexpected_eof()),
    }
}

/// `n do ... ;` sugar: compiles the body as an inline block literal (as
/// `{ ... }` would), then the `do` builtin itself, which pops the count
/// pushed by the code preceding this keyword along with the block just
/// pushed and runs it that many times.
fn compile_do(vm: &mut Vm, cursor: &mut Cursor, in_def: bool) -> Result<()> {
    compile_block_value(vm, cursor, in_def, |k| is_word(k, &[";"]))?;
    expect_word(cursor, ";")?;
    vm.compiler.emit_opcode(&mut vm.memory, Opcode::Do as u16)?;
    Ok(())
}

/// `cond if true-body ;` or `cond if true-body else false-body ;`.
fn compile_if(vm: &mut Vm, cursor: &mut Cursor, in_def: bool) -> Result<()> {
    let (if_pos, if_ref) = emit_branch_placeholder(vm, Opcode::IfZeroBranch)?;
    compile_until(vm, cursor, in_def, |k| is_word(k, &["else", ";"]))?;
    match cursor.peek_word() {
        Some("else") => {
            cursor.advance();
            let (else_pos, else_ref) = emit_branch_placeholder(vm, Opcode::Branch)?;
            let false_start = vm.compiler.mark();
            patch_branch(vm, if_pos, if_ref, false_start)?;
            compile_until(vm, cursor, in_def, |k| is_word(k, &[";"]))?;
            expect_word(cursor, ";")?;
            let end = vm.compiler.mark();
            patch_branch(vm, else_pos, else_ref, end)
        }
        Some(";") => {
            cursor.advance();
            let end = vm.compiler.mark();
            patch_branch(vm, if_pos, if_ref, end)
        }
        _ => Err(unexpected_eof()),
    }
}

/// `selector case test1 of body1 ; test2 of body2 ; [default bodyN ;] endcase`.
/// Every arm body (an `of` arm or `default`) is terminated by `;`, same as
/// `if`/`do` bodies — `of`/`default`/`endcase` alone aren't enough to mark
/// where a body ends and the next test begins, since both can be
/// arbitrary token runs. Each `of` arm branches past its own body on a
/// mismatch; on a match it falls through the body and then branches
/// unconditionally to `endcase` (collected in `end_patches` and patched
/// once that position is known).
fn compile_case(vm: &mut Vm, cursor: &mut Cursor, in_def: bool) -> Result<()> {
    vm.compiler.emit_opcode(&mut vm.memory, Opcode::CaseOpen as u16)?;
    let mut end_patches: Vec<(usize, usize)> = Vec::new();

    loop {
        match cursor.peek_word() {
            Some("default") => {
                cursor.advance();
                vm.compiler.emit_opcode(&mut vm.memory, Opcode::CaseDefault as u16)?;
                compile_until(vm, cursor, in_def, |k| is_word(k, &[";"]))?;
                expect_word(cursor, ";")?;
                break;
            }
            Some("endcase") => break,
            _ => {
                if cursor.peek().is_none() {
                    return Err(unexpected_eof());
                }
                compile_until(vm, cursor, in_def, |k| is_word(k, &["of"]))?;
                expect_word(cursor, "of")?;
                let (of_pos, of_ref) = emit_branch_placeholder(vm, Opcode::CaseOf)?;
                compile_until(vm, cursor, in_def, |k| is_word(k, &[";"]))?;
                expect_word(cursor, ";")?;
                let (branch_pos, branch_ref) = emit_branch_placeholder(vm, Opcode::Branch)?;
                end_patches.push((branch_pos, branch_ref));
                let next_arm = vm.compiler.mark();
                patch_branch(vm, of_pos, of_ref, next_arm)?;
            }
        }
    }

    expect_word(cursor, "endcase")?;
    let end_pos = vm.compiler.mark();
    for (pos, ref_point) in end_patches {
        patch_branch(vm, pos, ref_point, end_pos)?;
    }
    vm.compiler.emit_opcode(&mut vm.memory, Opcode::CaseEnd as u16)?;
    Ok(())
}

fn compile_list(vm: &mut Vm, cursor: &mut Cursor, in_def: bool, closer: TokenKind) -> Result<()> {
    vm.compiler.emit_opcode(&mut vm.memory, Opcode::ListOpen as u16)?;
    compile_until(vm, cursor, in_def, |k| *k == closer)?;
    match cursor.advance() {
        Some(tok) if tok.kind == closer => {}
        Some(tok) => return Err(unexpected(tok)),
        None => return Err(unexpected_eof()),
    }
    vm.compiler.emit_opcode(&mut vm.memory, Opcode::ListClose as u16)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::VmConfig;
    use crate::tagged::TaggedValue;

    fn run(source: &str) -> Vm {
        let mut vm = Vm::new(VmConfig::default());
        let entry = vm.compiler.mark();
        compile_source(&mut vm, source).unwrap();
        vm.run(entry).unwrap();
        vm
    }

    #[test]
    fn arithmetic_literal_sequence() {
        let vm = run("3 4 add");
        assert_eq!(vm.data.depth(), 1);
        match from_tagged(vm.data.peek("t").unwrap()) {
            TaggedValue::Number(n) => assert_eq!(n, 7.0),
            other => panic!("expected Number(7), got {other:?}"),
        }
    }

    #[test]
    fn colon_definition_then_call() {
        let mut vm = Vm::new(VmConfig::default());
        let entry = vm.compiler.mark();
        compile_source(&mut vm, ": square dup mul ; 5 square").unwrap();
        vm.run(entry).unwrap();
        match from_tagged(vm.data.peek("t").unwrap()) {
            TaggedValue::Number(n) => assert_eq!(n, 25.0),
            other => panic!("expected Number(25), got {other:?}"),
        }
    }

    #[test]
    fn block_pushes_reference_without_running_it() {
        let vm = run("{ 1 2 add }");
        assert_eq!(vm.data.depth(), 1);
        assert!(matches!(
            from_tagged(vm.data.peek("t").unwrap()),
            TaggedValue::Code { meta: true, .. }
        ));
    }

    #[test]
    fn eval_runs_a_pushed_block() {
        let vm = run("{ 1 2 add } eval");
        match from_tagged(vm.data.peek("t").unwrap()) {
            TaggedValue::Number(n) => assert_eq!(n, 3.0),
            other => panic!("expected Number(3), got {other:?}"),
        }
    }

    #[test]
    fn do_runs_a_block_n_times() {
        let vm = run("0 3 do 1 add ;");
        match from_tagged(vm.data.peek("t").unwrap()) {
            TaggedValue::Number(n) => assert_eq!(n, 3.0),
            other => panic!("expected Number(3), got {other:?}"),
        }
    }

    #[test]
    fn bare_do_is_reachable_through_a_symbol_ref() {
        // The structural `do ... ;` sugar owns the bare word; the raw
        // `(n block -- )` builtin is still reachable as an ordinary
        // dictionary symbol via `@do`.
        let vm = run("0 3 { 1 add } @do eval");
        match from_tagged(vm.data.peek("t").unwrap()) {
            TaggedValue::Number(n) => assert_eq!(n, 3.0),
            other => panic!("expected Number(3), got {other:?}"),
        }
    }

    #[test]
    fn if_without_else_skips_when_zero() {
        let vm = run("0 if 9 ; 1");
        assert_eq!(vm.data.depth(), 1);
        match from_tagged(vm.data.peek("t").unwrap()) {
            TaggedValue::Number(n) => assert_eq!(n, 1.0),
            other => panic!("expected Number(1), got {other:?}"),
        }
    }

    #[test]
    fn if_else_takes_true_branch() {
        let vm = run("1 if 9 else 8 ;");
        match from_tagged(vm.data.peek("t").unwrap()) {
            TaggedValue::Number(n) => assert_eq!(n, 9.0),
            other => panic!("expected Number(9), got {other:?}"),
        }
    }

    #[test]
    fn if_else_takes_false_branch() {
        let vm = run("0 if 9 else 8 ;");
        match from_tagged(vm.data.peek("t").unwrap()) {
            TaggedValue::Number(n) => assert_eq!(n, 8.0),
            other => panic!("expected Number(8), got {other:?}"),
        }
    }

    #[test]
    fn case_selects_matching_arm() {
        let vm = run("2 case 1 of 100 ; 2 of 200 ; default 900 ; endcase");
        match from_tagged(vm.data.peek("t").unwrap()) {
            TaggedValue::Number(n) => assert_eq!(n, 200.0),
            other => panic!("expected Number(200), got {other:?}"),
        }
    }

    #[test]
    fn case_falls_to_default_on_no_match() {
        let vm = run("5 case 1 of 100 ; 2 of 200 ; default 900 ; endcase");
        match from_tagged(vm.data.peek("t").unwrap()) {
            TaggedValue::Number(n) => assert_eq!(n, 900.0),
            other => panic!("expected Number(900), got {other:?}"),
        }
    }

    #[test]
    fn list_literal_compiles_a_list_value() {
        let vm = run("( 1 2 3 )");
        assert!(matches!(
            from_tagged(vm.data.peek("t").unwrap()),
            TaggedValue::List { .. }
        ));
    }

    #[test]
    fn string_and_symbol_ref_compile() {
        let vm = run(r#""hi" dup"#);
        assert_eq!(vm.data.depth(), 2);
    }

    #[test]
    fn at_name_pushes_the_resolved_builtin() {
        let vm = run("@dup");
        assert!(matches!(
            from_tagged(vm.data.peek("t").unwrap()),
            TaggedValue::Builtin(_)
        ));
    }

    #[test]
    fn undefined_word_is_an_error() {
        let mut vm = Vm::new(VmConfig::default());
        assert!(matches!(
            compile_source(&mut vm, "nonexistent_word"),
            Err(VmError::UndefinedWord(name)) if name == "nonexistent_word"
        ));
    }

    #[test]
    fn nested_colon_definition_is_rejected() {
        let mut vm = Vm::new(VmConfig::default());
        assert!(matches!(
            compile_source(&mut vm, ": outer : inner ;"),
            Err(VmError::NestedDefinition)
        ));
    }

    #[test]
    fn unclosed_definition_is_an_error() {
        let mut vm = Vm::new(VmConfig::default());
        assert!(matches!(
            compile_source(&mut vm, ": square dup mul"),
            Err(VmError::UnclosedDefinition)
        ));
    }

    #[test]
    fn stray_closing_brace_is_unexpected_token() {
        let mut vm = Vm::new(VmConfig::default());
        assert!(matches!(
            compile_source(&mut vm, "}"),
            Err(VmError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn preserve_semantics_keep_earlier_definitions_callable() {
        let mut vm = Vm::new(VmConfig::default());
        vm.compiler.set_preserve(true);
        let entry1 = vm.compiler.mark();
        compile_source(&mut vm, ": square dup mul ;").unwrap();
        vm.run(entry1).unwrap();

        vm.compiler.set_preserve(true);
        let entry2 = vm.compiler.mark();
        compile_source(&mut vm, "6 square").unwrap();
        vm.run(entry2).unwrap();

        match from_tagged(vm.data.peek("t").unwrap()) {
            TaggedValue::Number(n) => assert_eq!(n, 36.0),
            other => panic!("expected Number(36), got {other:?}"),
        }
    }

    #[test]
    fn named_define_round_trips_through_lookup() {
        let vm = run(r#"42 "answer" define"#);
        match from_tagged(
            vm.dictionary.lookup(&vm.memory, &vm.digest, "answer").unwrap().unwrap(),
        ) {
            TaggedValue::Number(n) => assert_eq!(n, 42.0),
            other => panic!("expected Number(42), got {other:?}"),
        }
    }
}

//! Line-oriented REPL: `> ` prompt, `exit` quits, otherwise each line is
//! parsed and run against a shared [`Vm`] with `preserve=true` compiler
//! semantics so words and values defined on one line stay callable on the
//! next, printing the stack after a clean run and the wrapped error
//! message after a failed one.

use std::io::{self, BufRead, Write};

use crate::parser;
use crate::vm::Vm;

pub const PROMPT: &str = "> ";
pub const QUIT_WORD: &str = "exit";

/// Runs the interactive loop against `vm`, reading lines from `input` and
/// writing the prompt/output to `output`. Returns once the user types
/// `exit` or the input stream ends.
pub fn run<R: BufRead, W: Write>(vm: &mut Vm, mut input: R, mut output: W) -> io::Result<()> {
    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        let mut line = String::new();
        let bytes_read = input.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(output)?;
            return Ok(());
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == QUIT_WORD {
            return Ok(());
        }

        match eval_line(vm, line) {
            Ok(()) => writeln!(output, "{}", vm.format_stack())?,
            Err(message) => writeln!(output, "{message}")?,
        }
    }
}

/// Compiles and runs one line against `vm`, using the REPL's
/// carry-definitions-forward compiler semantics.
fn eval_line(vm: &mut Vm, line: &str) -> Result<(), String> {
    vm.compiler.set_preserve(true);
    let entry = vm.compiler.mark();
    parser::compile_source(vm, line).map_err(|e| e.to_string())?;
    vm.run(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::VmConfig;

    #[test]
    fn exit_word_ends_the_loop_without_prompting_again() {
        let mut vm = Vm::new(VmConfig::default());
        let input = io::Cursor::new(b"exit\n".to_vec());
        let mut output = Vec::new();
        run(&mut vm, input, &mut output).unwrap();
        let rendered = String::from_utf8(output).unwrap();
        assert_eq!(rendered.matches(PROMPT).count(), 1);
    }

    #[test]
    fn definitions_persist_across_lines() {
        let mut vm = Vm::new(VmConfig::default());
        let input = io::Cursor::new(b": square dup mul ;\n6 square\nexit\n".to_vec());
        let mut output = Vec::new();
        run(&mut vm, input, &mut output).unwrap();
        let rendered = String::from_utf8(output).unwrap();
        assert!(rendered.contains("Number(36.0)"), "output was: {rendered}");
    }

    #[test]
    fn a_bad_line_reports_an_error_and_continues() {
        let mut vm = Vm::new(VmConfig::default());
        let input = io::Cursor::new(b"nonexistent_word\n1 1 add\nexit\n".to_vec());
        let mut output = Vec::new();
        run(&mut vm, input, &mut output).unwrap();
        let rendered = String::from_utf8(output).unwrap();
        assert!(rendered.contains("undefined word"), "output was: {rendered}");
        assert!(rendered.contains("Number(2.0)"), "output was: {rendered}");
    }
}

//! File-batch driver: runs a sequence of source files against a shared
//! [`Vm`], in argument order, each file's compiled code becoming the next
//! top-level unit (preserve semantics, exactly like the REPL, so a later
//! file can call words an earlier one defined). A thin collaborator
//! around the library that owns no VM semantics of its own.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::parser;
use crate::vm::Vm;

/// Runs `path`'s contents as the next top-level unit against `vm`.
pub fn run_file(vm: &mut Vm, path: &Path) -> Result<()> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    run_source(vm, &source).with_context(|| format!("running {}", path.display()))
}

/// Runs `source` (already read into memory) as the next top-level unit.
pub fn run_source(vm: &mut Vm, source: &str) -> Result<()> {
    vm.compiler.set_preserve(true);
    let entry = vm.compiler.mark();
    parser::compile_source(vm, source).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    vm.run(entry).map_err(|e| anyhow::anyhow!(e))
}

/// Runs every file in order, stopping (and returning the error) at the
/// first one that fails.
pub fn run_files(vm: &mut Vm, paths: &[impl AsRef<Path>]) -> Result<()> {
    for path in paths {
        run_file(vm, path.as_ref())?;
    }
    Ok(())
}

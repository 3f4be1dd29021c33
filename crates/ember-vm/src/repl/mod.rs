// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! REPL and file driver for the `ember` binary.
//!
//! The REPL feeds one line at a time into a persistent VM: globals
//! survive between lines, and a failed line leaves the session usable.
//! The file driver maps interpreter outcomes to conventional exit
//! codes: 65 for compile errors, 70 for runtime errors, 74 when the
//! script cannot be read.


use crate::vm::{InterpretError, Vm};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Exit code for a compile error.
pub const EXIT_COMPILE_ERROR: u8 = 65;
/// Exit code for a runtime error.
pub const EXIT_RUNTIME_ERROR: u8 = 70;
/// Exit code for an unreadable script file.
pub const EXIT_IO_ERROR: u8 = 74;

/// Run the interactive prompt until EOF or interrupt.
pub fn run_repl<W: Write>(vm: &mut Vm<W>) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(error) => {
            eprintln!("Could not initialize line editing: {error}");
            return;
        }
    };

    loop {
        match editor.readline("ember> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(&line);
                // Errors were already reported; the session continues.
                let _ = vm.interpret(&line);
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(error) => {
                eprintln!("Input error: {error}");
                break;
            }
        }
    }
}

/// Run a script file and return the process exit code.
pub fn run_file<W: Write>(vm: &mut Vm<W>, path: &Path) -> u8 {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("Could not read \"{}\": {error}", path.display());
            return EXIT_IO_ERROR;
        }
    };
    match vm.interpret(&source) {
        Ok(()) => 0,
        Err(InterpretError::Compile) => EXIT_COMPILE_ERROR,
        Err(InterpretError::Runtime) => EXIT_RUNTIME_ERROR,
    }
}

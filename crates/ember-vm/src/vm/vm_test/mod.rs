// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! End-to-end tests: source programs through the full pipeline,
//! asserting on captured output.
//!
//! Every successful program is run twice, once normally and once with
//! GC stress (collect on every allocation); both runs must succeed and
//! print the same thing.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod errors_test;
mod gc_stress_test;
mod variables_test;

use super::{InterpretError, Vm, VmOptions};

fn run_with(source: &str, options: VmOptions) -> (Result<(), InterpretError>, String) {
    let mut vm = Vm::with_output(Vec::new(), options);
    let result = vm.interpret(source);
    let output = String::from_utf8(vm.into_output()).expect("program output is UTF-8");
    (result, output)
}

/// Assert a program runs cleanly and prints `expected`, in both normal
/// and stress mode.
fn assert_output(source: &str, expected: &str) {
    for gc_stress in [false, true] {
        let options = VmOptions {
            gc_stress,
            ..VmOptions::default()
        };
        let (result, output) = run_with(source, options);
        assert_eq!(
            result,
            Ok(()),
            "unexpected failure (gc_stress={gc_stress}) for:\n{source}"
        );
        assert_eq!(
            output, expected,
            "wrong output (gc_stress={gc_stress}) for:\n{source}"
        );
    }
}

/// Assert a program fails at runtime, in both normal and stress mode.
/// Returns the output printed before the failure.
fn assert_runtime_error(source: &str) -> String {
    let mut first_output = None;
    for gc_stress in [false, true] {
        let options = VmOptions {
            gc_stress,
            ..VmOptions::default()
        };
        let (result, output) = run_with(source, options);
        assert_eq!(
            result,
            Err(InterpretError::Runtime),
            "expected runtime error (gc_stress={gc_stress}) for:\n{source}"
        );
        first_output.get_or_insert(output);
    }
    first_output.unwrap_or_default()
}

/// Assert a program is rejected by the compiler without executing.
fn assert_compile_error(source: &str) {
    let (result, output) = run_with(source, VmOptions::default());
    assert_eq!(
        result,
        Err(InterpretError::Compile),
        "expected compile error for:\n{source}"
    );
    assert_eq!(output, "", "compile errors must not execute:\n{source}");
}

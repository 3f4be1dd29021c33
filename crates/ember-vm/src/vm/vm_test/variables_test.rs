// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for global and local variables and lexical scoping.

use super::{assert_output, assert_runtime_error};
use crate::vm::{InterpretError, Vm, VmOptions};

#[test]
fn global_declaration_and_read() {
    assert_output("var a = 1; print a;", "1\n");
    assert_output("var a; print a;", "nil\n");
}

#[test]
fn global_assignment() {
    assert_output("var a = 1; a = 2; print a;", "2\n");
    assert_output("var a; a = 1; print a;", "1\n");
}

#[test]
fn assignment_is_an_expression() {
    assert_output("var a; print a = 7;", "7\n");
    assert_output("var a; var b; a = b = 3; print a; print b;", "3\n3\n");
}

#[test]
fn globals_are_late_bound() {
    // A function may reference a global defined after it.
    assert_output(
        "fun show() { print g; } var g = \"late\"; show();",
        "late\n",
    );
}

#[test]
fn block_shadowing_does_not_leak() {
    assert_output(
        "var x; x = 1; { var x = 2; print x; } print x;",
        "2\n1\n",
    );
}

#[test]
fn nested_block_scopes() {
    assert_output(
        "var a = \"global\";\n{\n  var a = \"outer\";\n  {\n    var a = \"inner\";\n    print a;\n  }\n  print a;\n}\nprint a;",
        "inner\nouter\nglobal\n",
    );
}

#[test]
fn locals_resolve_by_slot() {
    assert_output("{ var a = 1; var b = 2; print a + b; }", "3\n");
}

#[test]
fn local_assignment() {
    assert_output("{ var a = 1; a = a + 1; print a; }", "2\n");
}

#[test]
fn scope_exit_drops_locals() {
    assert_runtime_error("{ var x = 1; } print x;");
}

#[test]
fn undefined_variable_read_fails() {
    assert_runtime_error("print missing;");
}

#[test]
fn undefined_variable_assignment_fails() {
    assert_runtime_error("missing = 1;");
}

#[test]
fn failed_global_assignment_does_not_define_it() {
    // The failed assignment must not leave the name defined: in the
    // same session, a later read still fails.
    let mut vm = Vm::with_output(Vec::new(), VmOptions::default());
    assert_eq!(vm.interpret("ghost = 1;"), Err(InterpretError::Runtime));
    assert_eq!(vm.interpret("print ghost;"), Err(InterpretError::Runtime));
}

#[test]
fn globals_persist_across_interpret_calls() {
    let mut vm = Vm::with_output(Vec::new(), VmOptions::default());
    assert_eq!(vm.interpret("var kept = 41;"), Ok(()));
    assert_eq!(vm.interpret("kept = kept + 1;"), Ok(()));
    assert_eq!(vm.interpret("print kept;"), Ok(()));
    let output = String::from_utf8(vm.into_output()).unwrap();
    assert_eq!(output, "42\n");
}

#[test]
fn uninitialized_locals_are_nil() {
    assert_output("{ var a; print a; }", "nil\n");
}

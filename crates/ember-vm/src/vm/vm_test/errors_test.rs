// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for compile and runtime error handling.

use super::{assert_compile_error, assert_output, assert_runtime_error, run_with};
use crate::vm::{InterpretError, Vm, VmOptions};

// --- Runtime errors ---

#[test]
fn adding_number_and_string_fails() {
    assert_runtime_error("print 1 + \"a\";");
    assert_runtime_error("print \"a\" + 1;");
}

#[test]
fn arithmetic_requires_numbers() {
    assert_runtime_error("print 1 - \"a\";");
    assert_runtime_error("print true * 2;");
    assert_runtime_error("print nil / 1;");
    assert_runtime_error("print \"a\" < \"b\";");
    assert_runtime_error("print -\"a\";");
}

#[test]
fn output_before_the_error_is_kept() {
    let output = assert_runtime_error("print \"before\"; print 1 + \"a\"; print \"after\";");
    assert_eq!(output, "before\n");
}

#[test]
fn error_in_called_function_aborts_the_program() {
    assert_runtime_error("fun bad() { return 1 + nil; } bad();");
}

#[test]
fn vm_survives_a_runtime_error() {
    let mut vm = Vm::with_output(Vec::new(), VmOptions::default());
    assert_eq!(vm.interpret("print 1 + nil;"), Err(InterpretError::Runtime));
    // The next program runs on clean stacks.
    assert_eq!(vm.interpret("print \"recovered\";"), Ok(()));
    let output = String::from_utf8(vm.into_output()).unwrap();
    assert_eq!(output, "recovered\n");
}

#[test]
fn vm_survives_a_compile_error() {
    let mut vm = Vm::with_output(Vec::new(), VmOptions::default());
    assert_eq!(vm.interpret("var = ;"), Err(InterpretError::Compile));
    assert_eq!(vm.interpret("print 2;"), Ok(()));
    let output = String::from_utf8(vm.into_output()).unwrap();
    assert_eq!(output, "2\n");
}

// --- Compile errors ---

#[test]
fn invalid_assignment_target() {
    assert_compile_error("var a * b = 1;");
    assert_compile_error("var a; var b; var c; a * b = c + 1;");
    assert_compile_error("1 = 2;");
    assert_compile_error("var a; var b; (a) = b;");
}

#[test]
fn valid_assignment_still_parses() {
    // The canonical counter-case: only the bad targets are rejected.
    assert_output("var a; var b = 2; var c = 3; a = b + c; print a;", "5\n");
}

#[test]
fn return_outside_a_function() {
    assert_compile_error("return 1;");
    assert_compile_error("return;");
}

#[test]
fn returning_a_value_from_an_initializer() {
    assert_compile_error("class C { init() { return 1; } }");
}

#[test]
fn this_outside_a_class() {
    assert_compile_error("print this;");
    assert_compile_error("fun f() { return this; }");
}

#[test]
fn super_misuse() {
    assert_compile_error("print super.m;");
    assert_compile_error("class NoParent { m() { super.m(); } }");
}

#[test]
fn class_cannot_inherit_from_itself() {
    assert_compile_error("class Selfish < Selfish {}");
}

#[test]
fn duplicate_local_in_one_scope() {
    assert_compile_error("{ var a = 1; var a = 2; }");
}

#[test]
fn shadowing_in_an_inner_scope_is_fine() {
    assert_output("{ var a = 1; { var a = 2; print a; } print a; }", "2\n1\n");
}

#[test]
fn local_cannot_read_itself_in_its_initializer() {
    assert_compile_error("{ var a = 1; { var a = a; } }");
}

#[test]
fn missing_semicolon() {
    assert_compile_error("print 1");
}

#[test]
fn unbalanced_parens() {
    assert_compile_error("print (1 + 2;");
}

#[test]
fn unterminated_string() {
    assert_compile_error("print \"open;");
}

#[test]
fn unexpected_character() {
    assert_compile_error("print 1 @ 2;");
}

#[test]
fn several_errors_are_all_reported_in_one_pass() {
    // Synchronization lets compilation continue past the first error;
    // the program is still rejected as a whole.
    assert_compile_error("var 1; print 2 print 3; fun; print 4;");
}

#[test]
fn too_many_constants_in_one_chunk() {
    // 257 distinct number literals in the top-level chunk.
    let mut source = String::new();
    for i in 0..257 {
        source.push_str(&format!("print {i}.5;\n"));
    }
    assert_compile_error(&source);
}

#[test]
fn constants_under_the_limit_compile() {
    // Each declaration costs two constants (name and number), plus one
    // more for the final read: 201 in all, under the 256 cap.
    let mut source = String::new();
    for i in 0..100 {
        source.push_str(&format!("var v{i} = {i}.5;\n"));
    }
    source.push_str("print v99;");
    let (result, output) = run_with(&source, VmOptions::default());
    assert_eq!(result, Ok(()));
    assert_eq!(output, "99.5\n");
}

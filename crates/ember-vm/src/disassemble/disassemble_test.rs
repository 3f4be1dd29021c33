// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the disassembler.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::disassemble;
use crate::heap::{Heap, NoRoots};
use ember_core::chunk::{Chunk, op};
use ember_core::value::Value;

#[test]
fn header_and_simple_instructions() {
    let heap = Heap::new(false);
    let mut chunk = Chunk::new();
    chunk.write(op::NIL, 1);
    chunk.write(op::RETURN, 1);
    let listing = disassemble(&heap, &chunk, "test");
    assert!(listing.starts_with("== test ==\n"), "{listing}");
    assert!(listing.contains("NIL"), "{listing}");
    assert!(listing.contains("RETURN"), "{listing}");
}

#[test]
fn constants_render_their_value() {
    let mut heap = Heap::new(false);
    let s = heap.intern("greeting", &NoRoots);
    let mut chunk = Chunk::new();
    let index = chunk.add_constant(Value::from(s)).unwrap();
    chunk.write(op::CONSTANT, 3);
    chunk.write(index, 3);
    let listing = disassemble(&heap, &chunk, "c");
    assert!(listing.contains("CONSTANT"), "{listing}");
    assert!(listing.contains("'greeting'"), "{listing}");
}

#[test]
fn repeated_lines_show_a_bar() {
    let heap = Heap::new(false);
    let mut chunk = Chunk::new();
    chunk.write(op::NIL, 7);
    chunk.write(op::POP, 7);
    chunk.write(op::TRUE, 8);
    let listing = disassemble(&heap, &chunk, "lines");
    let lines: Vec<&str> = listing.lines().collect();
    assert!(lines[1].contains("   7 "), "{listing}");
    assert!(lines[2].contains("   | "), "{listing}");
    assert!(lines[3].contains("   8 "), "{listing}");
}

#[test]
fn jumps_show_their_target() {
    let heap = Heap::new(false);
    let mut chunk = Chunk::new();
    chunk.write(op::JUMP, 1);
    chunk.write(0, 1);
    chunk.write(4, 1);
    let listing = disassemble(&heap, &chunk, "j");
    // Offset 0, operand 4: target is 0 + 3 + 4 = 7.
    assert!(listing.contains("-> 7"), "{listing}");
}

#[test]
fn loops_jump_backward() {
    let heap = Heap::new(false);
    let mut chunk = Chunk::new();
    chunk.write(op::NIL, 1);
    chunk.write(op::LOOP, 1);
    chunk.write(0, 1);
    chunk.write(4, 1);
    let listing = disassemble(&heap, &chunk, "l");
    // Offset 1, operand 4: target is 1 + 3 - 4 = 0.
    assert!(listing.contains("-> 0"), "{listing}");
}

#[test]
fn byte_operand_instructions() {
    let heap = Heap::new(false);
    let mut chunk = Chunk::new();
    chunk.write(op::GET_LOCAL, 1);
    chunk.write(2, 1);
    chunk.write(op::CALL, 1);
    chunk.write(3, 1);
    let listing = disassemble(&heap, &chunk, "b");
    assert!(listing.contains("GET_LOCAL"), "{listing}");
    assert!(listing.contains("CALL"), "{listing}");
}

#[test]
fn unknown_opcode_is_reported_not_fatal() {
    let heap = Heap::new(false);
    let mut chunk = Chunk::new();
    chunk.write(200, 1);
    let listing = disassemble(&heap, &chunk, "u");
    assert!(listing.contains("Unknown opcode 200"), "{listing}");
}

// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Bytecode disassembler for debugging.

#[cfg(test)]
mod disassemble_test;

use crate::heap::Heap;
use crate::printer;
use ember_core::chunk::{self, Chunk, op};
use ember_core::object::Obj;
use ember_core::value::Value;
use std::fmt::Write;

/// Debug helper: disassemble a whole chunk to a string.
#[must_use]
pub fn disassemble(heap: &Heap, chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {name} ==");
    let mut offset = 0;
    while offset < chunk.code.len() {
        offset = disassemble_instruction(&mut out, heap, chunk, offset);
    }
    out
}

/// Disassemble the instruction at `offset`, returning the next offset.
pub fn disassemble_instruction(
    out: &mut String,
    heap: &Heap,
    chunk: &Chunk,
    offset: usize,
) -> usize {
    let _ = write!(out, "{offset:04} ");
    if offset > 0 && chunk.line(offset) == chunk.line(offset - 1) {
        let _ = write!(out, "   | ");
    } else {
        let _ = write!(out, "{:4} ", chunk.line(offset));
    }

    let opcode = chunk.code[offset];
    let mnemonic = chunk::name(opcode);
    match opcode {
        op::CONSTANT
        | op::GET_GLOBAL
        | op::DEFINE_GLOBAL
        | op::SET_GLOBAL
        | op::GET_PROPERTY
        | op::SET_PROPERTY
        | op::GET_SUPER
        | op::CLASS
        | op::METHOD => constant_instruction(out, heap, chunk, mnemonic, offset),
        op::GET_LOCAL | op::SET_LOCAL | op::GET_UPVALUE | op::SET_UPVALUE | op::CALL => {
            byte_instruction(out, chunk, mnemonic, offset)
        }
        op::JUMP | op::JUMP_IF_FALSE => jump_instruction(out, chunk, mnemonic, 1, offset),
        op::LOOP => jump_instruction(out, chunk, mnemonic, -1, offset),
        op::INVOKE | op::SUPER_INVOKE => invoke_instruction(out, heap, chunk, mnemonic, offset),
        op::CLOSURE => closure_instruction(out, heap, chunk, offset),
        op::NIL
        | op::TRUE
        | op::FALSE
        | op::POP
        | op::EQUAL
        | op::GREATER
        | op::LESS
        | op::ADD
        | op::SUBTRACT
        | op::MULTIPLY
        | op::DIVIDE
        | op::NOT
        | op::NEGATE
        | op::PRINT
        | op::CLOSE_UPVALUE
        | op::RETURN
        | op::INHERIT => {
            let _ = writeln!(out, "{mnemonic}");
            offset + 1
        }
        _ => {
            let _ = writeln!(out, "Unknown opcode {opcode}");
            offset + 1
        }
    }
}

fn constant_value(chunk: &Chunk, index: u8) -> Value {
    chunk.constants.get(index as usize).copied().unwrap_or(Value::Nil)
}

fn constant_instruction(
    out: &mut String,
    heap: &Heap,
    chunk: &Chunk,
    mnemonic: &str,
    offset: usize,
) -> usize {
    let index = chunk.code[offset + 1];
    let rendered = printer::value_to_string(heap, constant_value(chunk, index));
    let _ = writeln!(out, "{mnemonic:<16} {index:4} '{rendered}'");
    offset + 2
}

fn byte_instruction(out: &mut String, chunk: &Chunk, mnemonic: &str, offset: usize) -> usize {
    let operand = chunk.code[offset + 1];
    let _ = writeln!(out, "{mnemonic:<16} {operand:4}");
    offset + 2
}

fn jump_instruction(
    out: &mut String,
    chunk: &Chunk,
    mnemonic: &str,
    sign: i64,
    offset: usize,
) -> usize {
    let jump =
        i64::from(u16::from_be_bytes([chunk.code[offset + 1], chunk.code[offset + 2]]));
    let target = offset as i64 + 3 + sign * jump;
    let _ = writeln!(out, "{mnemonic:<16} {offset:4} -> {target}");
    offset + 3
}

fn invoke_instruction(
    out: &mut String,
    heap: &Heap,
    chunk: &Chunk,
    mnemonic: &str,
    offset: usize,
) -> usize {
    let index = chunk.code[offset + 1];
    let argc = chunk.code[offset + 2];
    let rendered = printer::value_to_string(heap, constant_value(chunk, index));
    let _ = writeln!(out, "{mnemonic:<16} ({argc} args) {index:4} '{rendered}'");
    offset + 3
}

fn closure_instruction(out: &mut String, heap: &Heap, chunk: &Chunk, offset: usize) -> usize {
    let index = chunk.code[offset + 1];
    let value = constant_value(chunk, index);
    let rendered = printer::value_to_string(heap, value);
    let _ = writeln!(out, "{:<16} {index:4} {rendered}", "CLOSURE");

    // The trailing (is_local, index) pairs, one per captured upvalue.
    let upvalue_count = match value.as_obj().map(|r| heap.get(r)) {
        Some(Obj::Function(f)) => f.upvalue_count,
        _ => 0,
    };
    let mut next = offset + 2;
    for _ in 0..upvalue_count {
        let is_local = chunk.code[next];
        let slot = chunk.code[next + 1];
        let kind = if is_local == 1 { "local" } else { "upvalue" };
        let _ = writeln!(out, "{next:04}    |                     {kind} {slot}");
        next += 2;
    }
    next
}

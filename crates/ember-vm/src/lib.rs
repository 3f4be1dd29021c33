// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # Ember VM
//!
//! Bytecode interpreter for the Ember language.
//!
//! This crate provides:
//! - Scanner turning source text into a token stream
//! - Single-pass Pratt compiler emitting bytecode (no AST)
//! - Heap arena with a precise mark-sweep garbage collector and
//!   string interning
//! - Stack-based virtual machine with closures, upvalues, and classes
//! - Bytecode disassembler for debugging
//! - REPL and file driver for the `ember` binary
//!
//! The pipeline: source text → tokens → a top-level function object →
//! the VM wraps it in a closure and executes it. The collector runs
//! opportunistically from the allocator, with roots supplied explicitly
//! by whoever holds live references (the VM at runtime, the compiler
//! chain mid-compilation).

pub mod compiler;
pub mod disassemble;
pub mod heap;
pub mod printer;
pub mod repl;
pub mod scanner;
pub mod vm;

pub use heap::Heap;
pub use vm::{InterpretError, Vm, VmOptions};

// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Bytecode virtual machine for Ember.
//!
//! The VM owns all mutable state: the value stack, call frames, the
//! open-upvalue list, the globals table, and the heap. A single
//! dispatch loop decodes one opcode at a time; there is no threading,
//! no reordering, and the only implicit suspension point is a
//! collection triggered from the allocator.
//!
//! Call frames alias a suffix of the value stack: slot 0 of every frame
//! holds the callee closure (or the receiver once a bound method or
//! initializer rebinds it) and is not user-visible.

#[cfg(test)]
mod vm_test;

pub mod natives;

use crate::compiler;
use crate::disassemble;
use crate::heap::{GcRoots, Heap, Marker, NoRoots};
use crate::printer;
use ember_core::chunk::{Chunk, op};
use ember_core::object::{
    NativeFn, Obj, ObjBoundMethod, ObjClass, ObjClosure, ObjInstance, ObjNative, ObjRef,
    ObjUpvalue, StrRef, UpvalueState,
};
use ember_core::table::Table;
use ember_core::value::Value;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;
use tracing::trace;

/// Maximum call depth.
const FRAMES_MAX: usize = 64;

/// Value stack bound: every frame addresses at most 256 slots.
const STACK_MAX: usize = FRAMES_MAX * 256;

/// Interpreter configuration, threaded in from the driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct VmOptions {
    /// Collect on every allocation.
    pub gc_stress: bool,
    /// Disassemble each function after compilation.
    pub dump_bytecode: bool,
}

/// Result of interpreting a source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretError {
    /// One or more compile errors were reported.
    Compile,
    /// Execution aborted with a runtime error.
    Runtime,
}

impl fmt::Display for InterpretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compile => write!(f, "compile error"),
            Self::Runtime => write!(f, "runtime error"),
        }
    }
}

impl std::error::Error for InterpretError {}

/// A runtime error raised by the dispatch loop. `Display` produces the
/// exact message printed before the stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    OperandMustBeNumber,
    OperandsMustBeNumbers,
    OperandsMustBeNumbersOrStrings,
    UndefinedVariable(String),
    UndefinedProperty(String),
    NotCallable,
    ArityMismatch { expected: u8, got: u8 },
    StackOverflow,
    OnlyInstancesHaveProperties,
    OnlyInstancesHaveFields,
    OnlyInstancesHaveMethods,
    SuperclassMustBeClass,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OperandMustBeNumber => write!(f, "Operand must be a number."),
            Self::OperandsMustBeNumbers => write!(f, "Operands must be numbers."),
            Self::OperandsMustBeNumbersOrStrings => {
                write!(f, "Operands must be two numbers or two strings.")
            }
            Self::UndefinedVariable(name) => write!(f, "Undefined variable '{name}'."),
            Self::UndefinedProperty(name) => write!(f, "Undefined property '{name}'."),
            Self::NotCallable => write!(f, "Can only call functions and classes."),
            Self::ArityMismatch { expected, got } => {
                write!(f, "Expected {expected} arguments but got {got}.")
            }
            Self::StackOverflow => write!(f, "Stack overflow."),
            Self::OnlyInstancesHaveProperties => write!(f, "Only instances have properties."),
            Self::OnlyInstancesHaveFields => write!(f, "Only instances have fields."),
            Self::OnlyInstancesHaveMethods => write!(f, "Only instances have methods."),
            Self::SuperclassMustBeClass => write!(f, "Superclass must be a class."),
        }
    }
}

/// An active call: the running closure, its instruction pointer, and
/// the stack slot where its window begins.
pub(crate) struct CallFrame {
    closure: ObjRef,
    /// Shared with the function object; chunks are immutable once
    /// compiled.
    chunk: Rc<Chunk>,
    ip: usize,
    base: usize,
}

/// The VM's roots, described for the collector.
struct VmRoots<'a> {
    stack: &'a [Value],
    frames: &'a [CallFrame],
    open_upvalues: &'a [ObjRef],
    globals: &'a Table,
    init_string: StrRef,
}

impl GcRoots for VmRoots<'_> {
    fn mark_roots(&self, marker: &mut Marker<'_>) {
        for &value in self.stack {
            marker.mark_value(value);
        }
        for frame in self.frames {
            marker.mark_obj(frame.closure);
        }
        for &upvalue in self.open_upvalues {
            marker.mark_obj(upvalue);
        }
        marker.mark_table(self.globals);
        marker.mark_str(self.init_string);
    }
}

/// How a callee dispatches, copied out of the heap before the call.
enum Callee {
    Bound(Value, ObjRef),
    Class(ObjRef),
    Closure(ObjRef),
    Native(NativeFn),
    NotCallable,
}

/// The Ember virtual machine. `W` receives program output (`print`).
pub struct Vm<W: Write> {
    heap: Heap,
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    /// Open upvalues, sorted by descending stack slot; at most one per
    /// slot.
    open_upvalues: Vec<ObjRef>,
    globals: Table,
    /// The interned name looked up on every class call.
    init_string: StrRef,
    options: VmOptions,
    out: W,
}

impl Vm<io::Stdout> {
    /// Create a VM printing to stdout.
    #[must_use]
    pub fn new(options: VmOptions) -> Self {
        Self::with_output(io::stdout(), options)
    }
}

impl<W: Write> Vm<W> {
    /// Create a VM printing to `out`.
    pub fn with_output(out: W, options: VmOptions) -> Self {
        let mut heap = Heap::new(options.gc_stress);
        let init_string = heap.intern("init", &NoRoots);
        let mut vm = Self {
            heap,
            stack: Vec::with_capacity(STACK_MAX),
            frames: Vec::with_capacity(FRAMES_MAX),
            open_upvalues: Vec::new(),
            globals: Table::new(),
            init_string,
            options,
            out,
        };
        vm.define_native("clock", natives::clock);
        vm
    }

    /// Consume the VM and return its output sink.
    pub fn into_output(self) -> W {
        self.out
    }

    /// Compile and execute `source`.
    ///
    /// Compile errors are reported before any execution. A runtime
    /// error prints its message and stack trace, resets the stacks, and
    /// leaves the VM usable for the next call (globals survive).
    ///
    /// # Errors
    ///
    /// Returns which phase failed; details have been printed to stderr.
    pub fn interpret(&mut self, source: &str) -> Result<(), InterpretError> {
        let function = compiler::compile(
            source,
            &mut self.heap,
            &VmRoots {
                stack: &self.stack,
                frames: &self.frames,
                open_upvalues: &self.open_upvalues,
                globals: &self.globals,
                init_string: self.init_string,
            },
            self.options.dump_bytecode,
        )
        .ok_or(InterpretError::Compile)?;

        // Keep the function rooted while its closure is allocated.
        self.push(Value::Obj(function));
        let closure = self.alloc(Obj::Closure(ObjClosure {
            function,
            upvalues: Vec::new(),
        }));
        self.pop();
        self.push(Value::Obj(closure));

        let result = self.call(closure, 0).and_then(|()| self.run());
        match result {
            Ok(()) => Ok(()),
            Err(error) => {
                self.report_runtime_error(&error);
                self.reset();
                Err(InterpretError::Runtime)
            }
        }
    }

    // --- Stack primitives ---

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Value {
        match self.stack.pop() {
            Some(value) => value,
            None => unreachable!("stack underflow"),
        }
    }

    fn peek(&self, depth: usize) -> Value {
        self.stack[self.stack.len() - 1 - depth]
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.frames.clear();
        self.open_upvalues.clear();
    }

    // --- Heap access with VM roots ---

    fn alloc(&mut self, obj: Obj) -> ObjRef {
        self.heap.alloc(
            obj,
            &VmRoots {
                stack: &self.stack,
                frames: &self.frames,
                open_upvalues: &self.open_upvalues,
                globals: &self.globals,
                init_string: self.init_string,
            },
        )
    }

    fn intern(&mut self, text: &str) -> StrRef {
        self.heap.intern(
            text,
            &VmRoots {
                stack: &self.stack,
                frames: &self.frames,
                open_upvalues: &self.open_upvalues,
                globals: &self.globals,
                init_string: self.init_string,
            },
        )
    }

    fn define_native(&mut self, name: &str, function: NativeFn) {
        let name_ref = self.intern(name);
        // Both objects stay stack-rooted until the globals entry exists.
        self.push(Value::from(name_ref));
        let native = self.alloc(Obj::Native(ObjNative { function }));
        self.push(Value::Obj(native));
        let hash = self.heap.string(name_ref).hash;
        self.globals.set(name_ref, hash, Value::Obj(native));
        self.pop();
        self.pop();
    }

    // --- Frame and bytecode primitives ---

    fn frame(&self) -> &CallFrame {
        match self.frames.last() {
            Some(frame) => frame,
            None => unreachable!("no active call frame"),
        }
    }

    fn frame_mut(&mut self) -> &mut CallFrame {
        match self.frames.last_mut() {
            Some(frame) => frame,
            None => unreachable!("no active call frame"),
        }
    }

    fn read_byte(&mut self) -> u8 {
        let frame = self.frame_mut();
        let byte = frame.chunk.code[frame.ip];
        frame.ip += 1;
        byte
    }

    fn read_short(&mut self) -> u16 {
        let frame = self.frame_mut();
        let short = u16::from_be_bytes([frame.chunk.code[frame.ip], frame.chunk.code[frame.ip + 1]]);
        frame.ip += 2;
        short
    }

    fn read_constant(&mut self) -> Value {
        let index = self.read_byte() as usize;
        self.frame().chunk.constants[index]
    }

    /// Read a name constant as a table key: handle plus cached hash.
    fn read_string(&mut self) -> (StrRef, u32) {
        match self.read_constant() {
            Value::Obj(r) => self.heap.str_key(r),
            _ => unreachable!("name constant is not a string"),
        }
    }

    // --- Dispatch ---

    #[expect(clippy::too_many_lines, reason = "one arm per opcode")]
    fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            if tracing::enabled!(tracing::Level::TRACE) {
                let frame = self.frame();
                let mut text = String::new();
                disassemble::disassemble_instruction(&mut text, &self.heap, &frame.chunk, frame.ip);
                trace!(depth = self.stack.len(), "{}", text.trim_end());
            }

            let opcode = self.read_byte();
            match opcode {
                op::CONSTANT => {
                    let value = self.read_constant();
                    self.push(value);
                }
                op::NIL => self.push(Value::Nil),
                op::TRUE => self.push(Value::Bool(true)),
                op::FALSE => self.push(Value::Bool(false)),
                op::POP => {
                    self.pop();
                }
                op::GET_LOCAL => {
                    let slot = self.read_byte() as usize;
                    let value = self.stack[self.frame().base + slot];
                    self.push(value);
                }
                op::SET_LOCAL => {
                    let slot = self.read_byte() as usize;
                    let base = self.frame().base;
                    let value = self.peek(0);
                    self.stack[base + slot] = value;
                }
                op::GET_GLOBAL => {
                    let (name, hash) = self.read_string();
                    match self.globals.get(name, hash) {
                        Some(value) => self.push(value),
                        None => return Err(self.undefined_variable(name)),
                    }
                }
                op::DEFINE_GLOBAL => {
                    let (name, hash) = self.read_string();
                    let value = self.peek(0);
                    self.globals.set(name, hash, value);
                    self.pop();
                }
                op::SET_GLOBAL => {
                    let (name, hash) = self.read_string();
                    let value = self.peek(0);
                    if self.globals.set(name, hash, value) {
                        // The assignment must not create the global.
                        self.globals.delete(name, hash);
                        return Err(self.undefined_variable(name));
                    }
                }
                op::GET_UPVALUE => {
                    let index = self.read_byte() as usize;
                    let upvalue = self.heap.closure(self.frame().closure).upvalues[index];
                    let value = match self.heap.upvalue(upvalue).state {
                        UpvalueState::Open(slot) => self.stack[slot],
                        UpvalueState::Closed(value) => value,
                    };
                    self.push(value);
                }
                op::SET_UPVALUE => {
                    let index = self.read_byte() as usize;
                    let upvalue = self.heap.closure(self.frame().closure).upvalues[index];
                    let value = self.peek(0);
                    match self.heap.upvalue(upvalue).state {
                        UpvalueState::Open(slot) => self.stack[slot] = value,
                        UpvalueState::Closed(_) => {
                            self.heap.upvalue_mut(upvalue).state = UpvalueState::Closed(value);
                        }
                    }
                }
                op::GET_PROPERTY => {
                    let (name, hash) = self.read_string();
                    let Some(instance) = self.as_instance(self.peek(0)) else {
                        return Err(RuntimeError::OnlyInstancesHaveProperties);
                    };
                    if let Some(value) = self.heap.instance(instance).fields.get(name, hash) {
                        self.pop();
                        self.push(value);
                    } else {
                        let class = self.heap.instance(instance).class;
                        self.bind_method(class, name, hash)?;
                    }
                }
                op::SET_PROPERTY => {
                    let (name, hash) = self.read_string();
                    let Some(instance) = self.as_instance(self.peek(1)) else {
                        return Err(RuntimeError::OnlyInstancesHaveFields);
                    };
                    let value = self.peek(0);
                    self.heap.instance_mut(instance).fields.set(name, hash, value);
                    // Leave the assigned value as the expression result.
                    let value = self.pop();
                    self.pop();
                    self.push(value);
                }
                op::GET_SUPER => {
                    let (name, hash) = self.read_string();
                    let superclass = match self.pop() {
                        Value::Obj(r) => r,
                        _ => unreachable!("superclass slot holds a class"),
                    };
                    self.bind_method(superclass, name, hash)?;
                }
                op::EQUAL => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(a == b));
                }
                op::GREATER => self.binary_number_op(|a, b| Value::Bool(a > b))?,
                op::LESS => self.binary_number_op(|a, b| Value::Bool(a < b))?,
                op::ADD => self.add()?,
                op::SUBTRACT => self.binary_number_op(|a, b| Value::Number(a - b))?,
                op::MULTIPLY => self.binary_number_op(|a, b| Value::Number(a * b))?,
                op::DIVIDE => self.binary_number_op(|a, b| Value::Number(a / b))?,
                op::NOT => {
                    let value = self.pop();
                    self.push(Value::Bool(value.is_falsey()));
                }
                op::NEGATE => {
                    let Some(n) = self.peek(0).as_number() else {
                        return Err(RuntimeError::OperandMustBeNumber);
                    };
                    self.pop();
                    self.push(Value::Number(-n));
                }
                op::PRINT => {
                    let value = self.pop();
                    let text = printer::value_to_string(&self.heap, value);
                    let _ = writeln!(self.out, "{text}");
                }
                op::JUMP => {
                    let offset = self.read_short() as usize;
                    self.frame_mut().ip += offset;
                }
                op::JUMP_IF_FALSE => {
                    let offset = self.read_short() as usize;
                    if self.peek(0).is_falsey() {
                        self.frame_mut().ip += offset;
                    }
                }
                op::LOOP => {
                    let offset = self.read_short() as usize;
                    self.frame_mut().ip -= offset;
                }
                op::CALL => {
                    let argc = self.read_byte();
                    let callee = self.peek(argc as usize);
                    self.call_value(callee, argc)?;
                }
                op::INVOKE => {
                    let (name, hash) = self.read_string();
                    let argc = self.read_byte();
                    self.invoke(name, hash, argc)?;
                }
                op::SUPER_INVOKE => {
                    let (name, hash) = self.read_string();
                    let argc = self.read_byte();
                    let superclass = match self.pop() {
                        Value::Obj(r) => r,
                        _ => unreachable!("superclass slot holds a class"),
                    };
                    self.invoke_from_class(superclass, name, hash, argc)?;
                }
                op::CLOSURE => {
                    let function = match self.read_constant() {
                        Value::Obj(r) => r,
                        _ => unreachable!("closure constant is not a function"),
                    };
                    let upvalue_count = self.heap.function(function).upvalue_count;
                    let closure = self.alloc(Obj::Closure(ObjClosure {
                        function,
                        upvalues: Vec::with_capacity(upvalue_count),
                    }));
                    self.push(Value::Obj(closure));
                    for _ in 0..upvalue_count {
                        let is_local = self.read_byte() != 0;
                        let index = self.read_byte() as usize;
                        let upvalue = if is_local {
                            let slot = self.frame().base + index;
                            self.capture_upvalue(slot)
                        } else {
                            self.heap.closure(self.frame().closure).upvalues[index]
                        };
                        self.heap.closure_mut(closure).upvalues.push(upvalue);
                    }
                }
                op::CLOSE_UPVALUE => {
                    self.close_upvalues(self.stack.len() - 1);
                    self.pop();
                }
                op::RETURN => {
                    let result = self.pop();
                    let frame = match self.frames.pop() {
                        Some(frame) => frame,
                        None => unreachable!("no active call frame"),
                    };
                    self.close_upvalues(frame.base);
                    if self.frames.is_empty() {
                        // Pop the script closure and halt.
                        self.pop();
                        return Ok(());
                    }
                    self.stack.truncate(frame.base);
                    self.push(result);
                }
                op::CLASS => {
                    let (name, _) = self.read_string();
                    let class = self.alloc(Obj::Class(ObjClass {
                        name,
                        methods: Table::new(),
                    }));
                    self.push(Value::Obj(class));
                }
                op::INHERIT => {
                    let Some(superclass) = self.as_class(self.peek(1)) else {
                        return Err(RuntimeError::SuperclassMustBeClass);
                    };
                    let subclass = match self.peek(0) {
                        Value::Obj(r) => r,
                        _ => unreachable!("subclass slot holds a class"),
                    };
                    self.heap.copy_methods(superclass, subclass);
                    self.pop();
                }
                op::METHOD => {
                    let (name, hash) = self.read_string();
                    let method = self.peek(0);
                    let class = match self.peek(1) {
                        Value::Obj(r) => r,
                        _ => unreachable!("method declaration outside a class"),
                    };
                    self.heap.class_mut(class).methods.set(name, hash, method);
                    self.pop();
                }
                _ => unreachable!("unknown opcode {opcode}"),
            }
        }
    }

    // --- Calls ---

    fn call_value(&mut self, callee: Value, argc: u8) -> Result<(), RuntimeError> {
        let Value::Obj(r) = callee else {
            return Err(RuntimeError::NotCallable);
        };
        let kind = match self.heap.get(r) {
            Obj::BoundMethod(b) => Callee::Bound(b.receiver, b.method),
            Obj::Class(_) => Callee::Class(r),
            Obj::Closure(_) => Callee::Closure(r),
            Obj::Native(n) => Callee::Native(n.function),
            _ => Callee::NotCallable,
        };
        match kind {
            Callee::Bound(receiver, method) => {
                let slot = self.stack.len() - argc as usize - 1;
                self.stack[slot] = receiver;
                self.call(method, argc)
            }
            Callee::Class(class) => {
                // The callee slot becomes the fresh instance; the class
                // value roots it until then.
                let instance = self.alloc(Obj::Instance(ObjInstance {
                    class,
                    fields: Table::new(),
                }));
                let slot = self.stack.len() - argc as usize - 1;
                self.stack[slot] = Value::Obj(instance);

                let hash = self.heap.string(self.init_string).hash;
                match self.heap.class(class).methods.get(self.init_string, hash) {
                    Some(Value::Obj(init)) => self.call(init, argc),
                    Some(_) => unreachable!("initializer is not a closure"),
                    None if argc != 0 => Err(RuntimeError::ArityMismatch {
                        expected: 0,
                        got: argc,
                    }),
                    None => Ok(()),
                }
            }
            Callee::Closure(closure) => self.call(closure, argc),
            Callee::Native(function) => {
                let first = self.stack.len() - argc as usize;
                let result = function(&self.stack[first..]);
                self.stack.truncate(first - 1);
                self.push(result);
                Ok(())
            }
            Callee::NotCallable => Err(RuntimeError::NotCallable),
        }
    }

    fn call(&mut self, closure: ObjRef, argc: u8) -> Result<(), RuntimeError> {
        let function_ref = self.heap.closure(closure).function;
        let function = self.heap.function(function_ref);
        if argc != function.arity {
            return Err(RuntimeError::ArityMismatch {
                expected: function.arity,
                got: argc,
            });
        }
        let chunk = Rc::clone(&function.chunk);
        if self.frames.len() == FRAMES_MAX {
            return Err(RuntimeError::StackOverflow);
        }
        self.frames.push(CallFrame {
            closure,
            chunk,
            ip: 0,
            base: self.stack.len() - argc as usize - 1,
        });
        Ok(())
    }

    fn invoke(&mut self, name: StrRef, hash: u32, argc: u8) -> Result<(), RuntimeError> {
        let receiver = self.peek(argc as usize);
        let Some(instance) = self.as_instance(receiver) else {
            return Err(RuntimeError::OnlyInstancesHaveMethods);
        };

        // A field holding a callable shadows any method of this name.
        if let Some(field) = self.heap.instance(instance).fields.get(name, hash) {
            let slot = self.stack.len() - argc as usize - 1;
            self.stack[slot] = field;
            return self.call_value(field, argc);
        }

        let class = self.heap.instance(instance).class;
        self.invoke_from_class(class, name, hash, argc)
    }

    fn invoke_from_class(
        &mut self,
        class: ObjRef,
        name: StrRef,
        hash: u32,
        argc: u8,
    ) -> Result<(), RuntimeError> {
        match self.heap.class(class).methods.get(name, hash) {
            Some(Value::Obj(method)) => self.call(method, argc),
            Some(_) => unreachable!("method is not a closure"),
            None => Err(self.undefined_property(name)),
        }
    }

    fn bind_method(&mut self, class: ObjRef, name: StrRef, hash: u32) -> Result<(), RuntimeError> {
        let Some(method) = self.heap.class(class).methods.get(name, hash) else {
            return Err(self.undefined_property(name));
        };
        let Value::Obj(method) = method else {
            unreachable!("method is not a closure");
        };
        // The receiver stays on the stack until the bound method exists.
        let receiver = self.peek(0);
        let bound = self.alloc(Obj::BoundMethod(ObjBoundMethod { receiver, method }));
        self.pop();
        self.push(Value::Obj(bound));
        Ok(())
    }

    // --- Upvalues ---

    fn capture_upvalue(&mut self, slot: usize) -> ObjRef {
        // The list is sorted by descending slot; find the first entry
        // at or below the target.
        let mut index = 0;
        while index < self.open_upvalues.len() {
            let upvalue = self.open_upvalues[index];
            let UpvalueState::Open(open_slot) = self.heap.upvalue(upvalue).state else {
                unreachable!("closed upvalue on the open list")
            };
            if open_slot > slot {
                index += 1;
                continue;
            }
            if open_slot == slot {
                return upvalue;
            }
            break;
        }

        let created = self.alloc(Obj::Upvalue(ObjUpvalue {
            state: UpvalueState::Open(slot),
        }));
        self.open_upvalues.insert(index, created);
        created
    }

    fn close_upvalues(&mut self, last: usize) {
        while let Some(&first) = self.open_upvalues.first() {
            let UpvalueState::Open(slot) = self.heap.upvalue(first).state else {
                unreachable!("closed upvalue on the open list")
            };
            if slot < last {
                break;
            }
            let value = self.stack[slot];
            self.heap.upvalue_mut(first).state = UpvalueState::Closed(value);
            self.open_upvalues.remove(0);
        }
    }

    // --- Operators ---

    fn binary_number_op(
        &mut self,
        apply: impl FnOnce(f64, f64) -> Value,
    ) -> Result<(), RuntimeError> {
        let (Some(b), Some(a)) = (self.peek(0).as_number(), self.peek(1).as_number()) else {
            return Err(RuntimeError::OperandsMustBeNumbers);
        };
        self.pop();
        self.pop();
        self.push(apply(a, b));
        Ok(())
    }

    fn add(&mut self) -> Result<(), RuntimeError> {
        if let (Some(a), Some(b)) = (self.peek(1).as_number(), self.peek(0).as_number()) {
            self.pop();
            self.pop();
            self.push(Value::Number(a + b));
            return Ok(());
        }
        if let (Some(a), Some(b)) = (
            self.as_string(self.peek(1)),
            self.as_string(self.peek(0)),
        ) {
            self.concatenate(a, b);
            return Ok(());
        }
        Err(RuntimeError::OperandsMustBeNumbersOrStrings)
    }

    fn concatenate(&mut self, a: StrRef, b: StrRef) {
        // Operands stay on the stack until the result is interned.
        let text = {
            let a = &self.heap.string(a).text;
            let b = &self.heap.string(b).text;
            let mut text = String::with_capacity(a.len() + b.len());
            text.push_str(a);
            text.push_str(b);
            text
        };
        let result = self.intern(&text);
        self.pop();
        self.pop();
        self.push(Value::from(result));
    }

    // --- Value classification ---

    fn as_string(&self, value: Value) -> Option<StrRef> {
        match value {
            Value::Obj(r) => match self.heap.get(r) {
                Obj::String(_) => Some(StrRef::new(r)),
                _ => None,
            },
            _ => None,
        }
    }

    fn as_instance(&self, value: Value) -> Option<ObjRef> {
        match value {
            Value::Obj(r) => match self.heap.get(r) {
                Obj::Instance(_) => Some(r),
                _ => None,
            },
            _ => None,
        }
    }

    fn as_class(&self, value: Value) -> Option<ObjRef> {
        match value {
            Value::Obj(r) => match self.heap.get(r) {
                Obj::Class(_) => Some(r),
                _ => None,
            },
            _ => None,
        }
    }

    // --- Errors ---

    fn undefined_variable(&self, name: StrRef) -> RuntimeError {
        RuntimeError::UndefinedVariable(self.heap.string(name).text.to_string())
    }

    fn undefined_property(&self, name: StrRef) -> RuntimeError {
        RuntimeError::UndefinedProperty(self.heap.string(name).text.to_string())
    }

    /// Print the error message and a stack trace, innermost frame
    /// first, to stderr.
    fn report_runtime_error(&self, error: &RuntimeError) {
        eprintln!("{error}");
        for frame in self.frames.iter().rev() {
            let function_ref = self.heap.closure(frame.closure).function;
            let function = self.heap.function(function_ref);
            // ip already advanced past the failing instruction.
            let line = function.chunk.line(frame.ip.saturating_sub(1));
            match function.name {
                Some(name) => {
                    eprintln!("[line {line}] in {}()", &self.heap.string(name).text);
                }
                None => eprintln!("[line {line}] in script"),
            }
        }
    }
}

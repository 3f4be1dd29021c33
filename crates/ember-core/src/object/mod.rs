// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Heap object variants.
//!
//! Every garbage-collected object is one arm of the `Obj` sum. The heap
//! arena in `ember-vm` owns the objects; the rest of the system refers to
//! them through `ObjRef` handles. `StrRef` is a handle that is known to
//! point at a string, which is what tables key on.
//!
//! Chunks are immutable once a function is finalized, so a function shares
//! its chunk with active call frames via `Rc`. All object-graph edges
//! (constants, upvalues, fields, methods) remain plain handles and are
//! traced by the collector; the `Rc` never forms a cycle.


use crate::chunk::Chunk;
use crate::table::Table;
use crate::value::Value;
use std::rc::Rc;

/// Handle to a heap object (index into the object arena).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ObjRef(u32);

impl ObjRef {
    /// Create a handle from an arena index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// The arena index this handle refers to.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a heap object that is known to be a string.
///
/// Only the interner mints these, so holding a `StrRef` is proof the
/// target is an interned `ObjString`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct StrRef(ObjRef);

impl StrRef {
    /// Wrap an object handle. The caller asserts the target is a string.
    #[inline]
    #[must_use]
    pub const fn new(r: ObjRef) -> Self {
        Self(r)
    }

    /// The underlying object handle.
    #[inline]
    #[must_use]
    pub const fn as_obj(self) -> ObjRef {
        self.0
    }
}

impl From<StrRef> for Value {
    fn from(s: StrRef) -> Self {
        Self::Obj(s.as_obj())
    }
}

/// FNV-1a hash over a byte string, as cached in every interned string.
#[must_use]
pub fn hash_str(s: &str) -> u32 {
    let mut hash: u32 = 2_166_136_261;
    for byte in s.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}

/// An interned, immutable string.
#[derive(Debug)]
pub struct ObjString {
    /// UTF-8 contents.
    pub text: Box<str>,
    /// Precomputed FNV-1a hash of `text`.
    pub hash: u32,
}

/// A compiled function. Created by the compiler, immutable at runtime.
#[derive(Debug)]
pub struct ObjFunction {
    /// Number of declared parameters.
    pub arity: u8,
    /// Number of upvalues the function captures.
    pub upvalue_count: usize,
    /// The function's bytecode.
    pub chunk: Rc<Chunk>,
    /// Function name; `None` for the top-level script.
    pub name: Option<StrRef>,
}

/// Signature of a native (host) function: receives the argument slice,
/// returns the result value.
pub type NativeFn = fn(&[Value]) -> Value;

/// A native function provided by the host.
pub struct ObjNative {
    /// The host callable.
    pub function: NativeFn,
}

impl std::fmt::Debug for ObjNative {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ObjNative")
    }
}

/// A function paired with its captured upvalues. Every call target at
/// runtime is a closure, including the top-level script.
#[derive(Debug)]
pub struct ObjClosure {
    /// Handle to the underlying `ObjFunction`.
    pub function: ObjRef,
    /// Captured upvalues, `function.upvalue_count` entries once built.
    pub upvalues: Vec<ObjRef>,
}

/// The runtime cell for a captured variable.
///
/// While the source slot is still live the upvalue is *open* and aliases
/// that absolute stack slot; once the slot leaves scope the value moves
/// into the cell and the upvalue is *closed*. Closing rewrites the state
/// in place, so every closure holding this cell observes the promotion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UpvalueState {
    /// Aliases an absolute slot in the VM value stack.
    Open(usize),
    /// Owns the value inline.
    Closed(Value),
}

/// A captured-variable cell.
#[derive(Debug)]
pub struct ObjUpvalue {
    /// Open or closed state.
    pub state: UpvalueState,
}

/// A class: a name and a method table.
#[derive(Debug)]
pub struct ObjClass {
    /// The class name.
    pub name: StrRef,
    /// Methods by name. Populated by `METHOD`, copied down by `INHERIT`.
    pub methods: Table,
}

/// An instance of a class with dynamically-added fields.
#[derive(Debug)]
pub struct ObjInstance {
    /// Handle to the instance's class.
    pub class: ObjRef,
    /// Per-instance fields by name.
    pub fields: Table,
}

/// A method bound to the receiver it was accessed through.
#[derive(Debug)]
pub struct ObjBoundMethod {
    /// The receiver (`this`) the method was read from.
    pub receiver: Value,
    /// Handle to the method closure.
    pub method: ObjRef,
}

/// A heap object: a tagged sum of the concrete variants.
#[derive(Debug)]
pub enum Obj {
    String(ObjString),
    Function(ObjFunction),
    Native(ObjNative),
    Closure(ObjClosure),
    Upvalue(ObjUpvalue),
    Class(ObjClass),
    Instance(ObjInstance),
    BoundMethod(ObjBoundMethod),
}

// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Heap arena and allocator for Ember objects.
//!
//! Objects live in a slot arena addressed by `ObjRef` handles; a free
//! list recycles swept slots. Slot occupancy is the canonical object
//! list: every live object sits in exactly one slot.
//!
//! Every allocation charges an estimated size against `bytes_allocated`.
//! When the running total passes `next_gc` (or always, in stress mode)
//! the allocator collects *before* inserting the new object, marking the
//! pending object's children along with the caller's roots so nothing
//! half-referenced is swept. See [`gc`] for the collection itself.
//!
//! Strings are interned: `vm.strings` maps string contents to the one
//! canonical handle. The table's keys are weak — the collector drops
//! entries whose strings died (see `gc::collect`).


pub mod gc;

pub use gc::{GcRoots, Marker, NoRoots};

use ember_core::chunk::Chunk;
use ember_core::object::{
    Obj, ObjRef, ObjString, StrRef, hash_str,
};
use ember_core::table::Table;
use ember_core::value::Value;

/// First collection triggers after this many bytes.
const INITIAL_GC_THRESHOLD: usize = 1024 * 1024;

/// The next threshold is the post-collection heap size times this.
const GC_GROWTH_FACTOR: usize = 2;

/// The object arena and allocation bookkeeping.
pub struct Heap {
    /// Object slots; `None` is a free slot.
    objects: Vec<Option<Obj>>,
    /// Mark bits, parallel to `objects`. All false between collections.
    marks: Vec<bool>,
    /// Bytes charged for each slot at allocation time.
    sizes: Vec<usize>,
    /// Indices of free slots.
    free: Vec<usize>,
    /// Intern table: string contents -> canonical handle. Weak keys.
    strings: Table,
    /// Estimated live bytes.
    bytes_allocated: usize,
    /// Collection trigger threshold.
    next_gc: usize,
    /// Collect on every allocation.
    stress: bool,
    /// Gray worklist, reused across collections.
    gray: Vec<ObjRef>,
}

impl Heap {
    /// Create an empty heap. With `stress` set, every allocation runs a
    /// full collection first.
    #[must_use]
    pub fn new(stress: bool) -> Self {
        Self {
            objects: Vec::new(),
            marks: Vec::new(),
            sizes: Vec::new(),
            free: Vec::new(),
            strings: Table::new(),
            bytes_allocated: 0,
            next_gc: INITIAL_GC_THRESHOLD,
            stress,
            gray: Vec::new(),
        }
    }

    /// Allocate an object, collecting first if the threshold is passed.
    ///
    /// `roots` must cover everything live outside this heap. The pending
    /// object's own references are marked by the collector, so it may
    /// refer to unrooted objects — but nothing else may refer to *it*
    /// yet, since it has no handle until this returns.
    pub fn alloc(&mut self, obj: Obj, roots: &dyn GcRoots) -> ObjRef {
        let size = obj_size(&obj);
        self.bytes_allocated += size;
        if self.stress || self.bytes_allocated > self.next_gc {
            self.collect(roots, Some(&obj));
        }

        let index = match self.free.pop() {
            Some(index) => {
                self.objects[index] = Some(obj);
                self.sizes[index] = size;
                index
            }
            None => {
                self.objects.push(Some(obj));
                self.marks.push(false);
                self.sizes.push(size);
                self.objects.len() - 1
            }
        };
        ObjRef::new(index as u32)
    }

    /// Intern a string: return the existing handle for equal contents,
    /// or allocate and register a new one.
    pub fn intern(&mut self, text: &str, roots: &dyn GcRoots) -> StrRef {
        let hash = hash_str(text);
        let found = {
            let Self {
                strings, objects, ..
            } = self;
            strings.find_key(hash, |candidate| {
                match &objects[candidate.as_obj().index()] {
                    Some(Obj::String(s)) => &*s.text == text,
                    _ => false,
                }
            })
        };
        if let Some(existing) = found {
            return existing;
        }

        let r = self.alloc(
            Obj::String(ObjString {
                text: text.into(),
                hash,
            }),
            roots,
        );
        let key = StrRef::new(r);
        self.strings.set(key, hash, Value::Nil);
        key
    }

    /// Run a collection now. Normally invoked from `alloc`; tests and
    /// the stress path call it directly.
    pub fn collect(&mut self, roots: &dyn GcRoots, pending: Option<&Obj>) {
        gc::collect(self, roots, pending);
    }

    /// Estimated live bytes.
    #[must_use]
    pub const fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    /// Number of live objects in the arena.
    #[must_use]
    pub fn live_objects(&self) -> usize {
        self.objects.iter().filter(|slot| slot.is_some()).count()
    }

    /// Borrow the object behind a handle.
    #[must_use]
    pub fn get(&self, r: ObjRef) -> &Obj {
        match &self.objects[r.index()] {
            Some(obj) => obj,
            None => unreachable!("dangling object handle"),
        }
    }

    /// Mutably borrow the object behind a handle.
    pub fn get_mut(&mut self, r: ObjRef) -> &mut Obj {
        match &mut self.objects[r.index()] {
            Some(obj) => obj,
            None => unreachable!("dangling object handle"),
        }
    }

    /// Borrow a string object.
    #[must_use]
    pub fn string(&self, s: StrRef) -> &ObjString {
        match self.get(s.as_obj()) {
            Obj::String(string) => string,
            _ => unreachable!("StrRef to non-string"),
        }
    }

    /// Key a table lookup from a handle known to be a string: the typed
    /// handle plus its cached hash.
    #[must_use]
    pub fn str_key(&self, r: ObjRef) -> (StrRef, u32) {
        match self.get(r) {
            Obj::String(s) => (StrRef::new(r), s.hash),
            _ => unreachable!("name constant is not a string"),
        }
    }

    /// Borrow a function object.
    #[must_use]
    pub fn function(&self, r: ObjRef) -> &ember_core::object::ObjFunction {
        match self.get(r) {
            Obj::Function(f) => f,
            _ => unreachable!("expected function"),
        }
    }

    /// Borrow a closure object.
    #[must_use]
    pub fn closure(&self, r: ObjRef) -> &ember_core::object::ObjClosure {
        match self.get(r) {
            Obj::Closure(c) => c,
            _ => unreachable!("expected closure"),
        }
    }

    /// Mutably borrow a closure object.
    pub fn closure_mut(&mut self, r: ObjRef) -> &mut ember_core::object::ObjClosure {
        match self.get_mut(r) {
            Obj::Closure(c) => c,
            _ => unreachable!("expected closure"),
        }
    }

    /// Borrow an upvalue object.
    #[must_use]
    pub fn upvalue(&self, r: ObjRef) -> &ember_core::object::ObjUpvalue {
        match self.get(r) {
            Obj::Upvalue(u) => u,
            _ => unreachable!("expected upvalue"),
        }
    }

    /// Mutably borrow an upvalue object.
    pub fn upvalue_mut(&mut self, r: ObjRef) -> &mut ember_core::object::ObjUpvalue {
        match self.get_mut(r) {
            Obj::Upvalue(u) => u,
            _ => unreachable!("expected upvalue"),
        }
    }

    /// Borrow a class object.
    #[must_use]
    pub fn class(&self, r: ObjRef) -> &ember_core::object::ObjClass {
        match self.get(r) {
            Obj::Class(c) => c,
            _ => unreachable!("expected class"),
        }
    }

    /// Mutably borrow a class object.
    pub fn class_mut(&mut self, r: ObjRef) -> &mut ember_core::object::ObjClass {
        match self.get_mut(r) {
            Obj::Class(c) => c,
            _ => unreachable!("expected class"),
        }
    }

    /// Borrow an instance object.
    #[must_use]
    pub fn instance(&self, r: ObjRef) -> &ember_core::object::ObjInstance {
        match self.get(r) {
            Obj::Instance(i) => i,
            _ => unreachable!("expected instance"),
        }
    }

    /// Mutably borrow an instance object.
    pub fn instance_mut(&mut self, r: ObjRef) -> &mut ember_core::object::ObjInstance {
        match self.get_mut(r) {
            Obj::Instance(i) => i,
            _ => unreachable!("expected instance"),
        }
    }

    /// Borrow a bound method object.
    #[must_use]
    pub fn bound_method(&self, r: ObjRef) -> &ember_core::object::ObjBoundMethod {
        match self.get(r) {
            Obj::BoundMethod(b) => b,
            _ => unreachable!("expected bound method"),
        }
    }

    /// Copy every method of class `from` into class `to`.
    pub fn copy_methods(&mut self, from: ObjRef, to: ObjRef) {
        let methods = self.class(from).methods.clone();
        self.class_mut(to).methods.add_all(&methods);
    }

}

/// Estimated heap charge for an object: the enum footprint plus its
/// owned payload at allocation time.
fn obj_size(obj: &Obj) -> usize {
    let payload = match obj {
        Obj::String(s) => s.text.len(),
        Obj::Function(f) => chunk_size(&f.chunk),
        Obj::Closure(c) => c.upvalues.capacity() * size_of::<ObjRef>(),
        Obj::Class(c) => table_size(&c.methods),
        Obj::Instance(i) => table_size(&i.fields),
        Obj::Native(_) | Obj::Upvalue(_) | Obj::BoundMethod(_) => 0,
    };
    size_of::<Obj>() + payload
}

fn chunk_size(chunk: &Chunk) -> usize {
    chunk.code.len() + chunk.lines.len() * size_of::<u32>() + chunk.constants.len() * size_of::<Value>()
}

fn table_size(table: &Table) -> usize {
    table.capacity() * (size_of::<Value>() + size_of::<StrRef>() + size_of::<u32>())
}

// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tri-color mark-sweep collection.
//!
//! A collection runs in five steps:
//!
//! 1. Mark roots. The caller describes its live references through the
//!    [`GcRoots`] trait; the allocator adds the children of the object
//!    it is about to insert.
//! 2. Trace: pop gray objects off the worklist and mark their children
//!    until the worklist drains.
//! 3. Weak sweep of the intern table: entries whose key string is
//!    unmarked are dropped, *before* slots are freed. This is what keeps
//!    the intern table from pinning every string forever.
//! 4. Sweep: free unmarked slots, clear marks on survivors.
//! 5. Retune the next trigger threshold from the surviving byte count.
//!
//! The gray worklist is a plain `Vec` owned by the heap and reused
//! between cycles; growing it goes through the system allocator and can
//! never re-enter the collector.

use super::Heap;
use ember_core::object::{Obj, ObjRef, StrRef, UpvalueState};
use ember_core::table::Table;
use ember_core::value::Value;
use tracing::debug;

/// Sources of GC roots outside the heap.
///
/// Implemented by the VM (stack, frames, open upvalues, globals) and by
/// the compiler chain (chunks under construction). Implementations call
/// back into the [`Marker`] for every reference they hold.
pub trait GcRoots {
    /// Mark every root reference this source holds.
    fn mark_roots(&self, marker: &mut Marker<'_>);
}

/// A root source with no roots, for contexts that hold no references
/// (heap bring-up, tests).
pub struct NoRoots;

impl GcRoots for NoRoots {
    fn mark_roots(&self, _marker: &mut Marker<'_>) {}
}

/// Handed to [`GcRoots::mark_roots`] to receive root references.
pub struct Marker<'h> {
    marks: &'h mut [bool],
    gray: &'h mut Vec<ObjRef>,
}

impl Marker<'_> {
    /// Mark a value; object payloads are queued for tracing.
    pub fn mark_value(&mut self, value: Value) {
        if let Value::Obj(r) = value {
            self.mark_obj(r);
        }
    }

    /// Mark an object and queue it for tracing.
    pub fn mark_obj(&mut self, r: ObjRef) {
        if !self.marks[r.index()] {
            self.marks[r.index()] = true;
            self.gray.push(r);
        }
    }

    /// Mark a string handle.
    pub fn mark_str(&mut self, s: StrRef) {
        self.mark_obj(s.as_obj());
    }

    /// Mark every key and value of a table.
    pub fn mark_table(&mut self, table: &Table) {
        for (key, value) in table.iter() {
            self.mark_str(key);
            self.mark_value(value);
        }
    }
}

/// Run a full collection over `heap`.
pub(super) fn collect(heap: &mut Heap, roots: &dyn GcRoots, pending: Option<&Obj>) {
    let before = heap.bytes_allocated;
    debug!(bytes = before, "gc begin");

    let Heap {
        objects,
        marks,
        sizes,
        free,
        strings,
        bytes_allocated,
        next_gc,
        gray,
        ..
    } = heap;

    // Mark roots, then the children of the object being allocated.
    {
        let mut marker = Marker {
            marks: marks.as_mut_slice(),
            gray: &mut *gray,
        };
        roots.mark_roots(&mut marker);
        if let Some(obj) = pending {
            mark_children(obj, &mut marker);
        }

        // Trace until the gray worklist drains.
        while let Some(r) = marker.gray.pop() {
            if let Some(obj) = &objects[r.index()] {
                mark_children(obj, &mut marker);
            }
        }
    }

    // Weak sweep of the intern table before freeing anything.
    strings.retain(|s| marks[s.as_obj().index()]);

    // Sweep: free unmarked slots, reset marks on survivors.
    let mut freed = 0_usize;
    for (index, slot) in objects.iter_mut().enumerate() {
        if slot.is_none() {
            continue;
        }
        if marks[index] {
            marks[index] = false;
        } else {
            *slot = None;
            free.push(index);
            *bytes_allocated = bytes_allocated.saturating_sub(sizes[index]);
            sizes[index] = 0;
            freed += 1;
        }
    }

    *next_gc = *bytes_allocated * super::GC_GROWTH_FACTOR;

    debug!(
        freed,
        reclaimed = before.saturating_sub(*bytes_allocated),
        bytes = *bytes_allocated,
        next_gc = *next_gc,
        "gc end"
    );
}

/// Mark every reference held by `obj` (blackening).
fn mark_children(obj: &Obj, marker: &mut Marker<'_>) {
    match obj {
        // Strings and natives hold no references.
        Obj::String(_) | Obj::Native(_) => {}
        Obj::Function(f) => {
            if let Some(name) = f.name {
                marker.mark_str(name);
            }
            for &constant in &f.chunk.constants {
                marker.mark_value(constant);
            }
        }
        Obj::Closure(c) => {
            marker.mark_obj(c.function);
            for &upvalue in &c.upvalues {
                marker.mark_obj(upvalue);
            }
        }
        Obj::Upvalue(u) => {
            // Open upvalues alias the VM stack, which is a root already.
            if let UpvalueState::Closed(value) = u.state {
                marker.mark_value(value);
            }
        }
        Obj::Class(c) => {
            marker.mark_str(c.name);
            marker.mark_table(&c.methods);
        }
        Obj::Instance(i) => {
            marker.mark_obj(i.class);
            marker.mark_table(&i.fields);
        }
        Obj::BoundMethod(b) => {
            marker.mark_value(b.receiver);
            marker.mark_obj(b.method);
        }
    }
}

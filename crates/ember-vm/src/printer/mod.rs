// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Printer for Ember values.
//!
//! Renders a value the way `print` shows it: `nil`, `true`/`false`,
//! numbers in C's `%g` double formatting, strings as their raw bytes,
//! `<fn NAME>` (or `<script>` for the top level), `<native fn>`,
//! classes as their name, instances as `NAME instance`. Closures and
//! bound methods print as their underlying function.


use crate::heap::Heap;
use ember_core::object::Obj;
use ember_core::value::Value;
use std::fmt::Write;

/// Write the printed form of `value` into `out`.
pub fn write_value(out: &mut String, heap: &Heap, value: Value) {
    match value {
        Value::Nil => out.push_str("nil"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => write_number(out, n),
        Value::Obj(r) => write_object(out, heap, r),
    }
}

/// Significant digits in the printed form of a number, matching `%g`.
const NUMBER_DIGITS: usize = 6;

/// Write a number the way C's `printf("%g", ...)` does: six significant
/// digits, trailing zeros stripped, scientific notation once the decimal
/// exponent leaves `[-4, 6)`.
fn write_number(out: &mut String, n: f64) {
    if n.is_nan() {
        out.push_str("nan");
        return;
    }
    if n.is_infinite() {
        out.push_str(if n < 0.0 { "-inf" } else { "inf" });
        return;
    }
    if n == 0.0 {
        out.push_str(if n.is_sign_negative() { "-0" } else { "0" });
        return;
    }

    // Round to the significant-digit budget first; the exponent of the
    // rounded value picks the notation (999999.5 tips over into 1e+06).
    let rounded = format!("{:.*e}", NUMBER_DIGITS - 1, n);
    let (mantissa, exponent) = match rounded.split_once('e') {
        Some(parts) => parts,
        None => unreachable!("{{:e}} always yields an exponent"),
    };
    let exponent: i32 = match exponent.parse() {
        Ok(e) => e,
        Err(_) => unreachable!("{{:e}} exponent is an integer"),
    };

    if exponent < -4 || exponent >= NUMBER_DIGITS as i32 {
        out.push_str(strip_trailing_zeros(mantissa));
        let sign = if exponent < 0 { '-' } else { '+' };
        let _ = write!(out, "e{sign}{:02}", exponent.unsigned_abs());
    } else {
        // Fixed notation with the decimals left in the digit budget.
        let decimals = (NUMBER_DIGITS as i32 - 1 - exponent).max(0) as usize;
        let fixed = format!("{n:.decimals$}");
        out.push_str(strip_trailing_zeros(&fixed));
    }
}

/// Drop trailing zeros of a decimal fraction, and the point itself if
/// nothing is left behind it.
fn strip_trailing_zeros(s: &str) -> &str {
    if !s.contains('.') {
        return s;
    }
    s.trim_end_matches('0').trim_end_matches('.')
}

/// The printed form of `value` as a fresh string.
#[must_use]
pub fn value_to_string(heap: &Heap, value: Value) -> String {
    let mut out = String::new();
    write_value(&mut out, heap, value);
    out
}

fn write_object(out: &mut String, heap: &Heap, r: ember_core::object::ObjRef) {
    match heap.get(r) {
        Obj::String(s) => out.push_str(&s.text),
        Obj::Function(f) => write_function(out, heap, f),
        Obj::Native(_) => out.push_str("<native fn>"),
        Obj::Closure(c) => write_function(out, heap, heap.function(c.function)),
        Obj::BoundMethod(b) => {
            let function = heap.closure(b.method).function;
            write_function(out, heap, heap.function(function));
        }
        // Upvalue cells never appear as stack values.
        Obj::Upvalue(_) => out.push_str("upvalue"),
        Obj::Class(c) => out.push_str(&heap.string(c.name).text),
        Obj::Instance(i) => {
            let name = heap.class(i.class).name;
            let _ = write!(out, "{} instance", &heap.string(name).text);
        }
    }
}

fn write_function(out: &mut String, heap: &Heap, function: &ember_core::object::ObjFunction) {
    match function.name {
        Some(name) => {
            let _ = write!(out, "<fn {}>", &heap.string(name).text);
        }
        None => out.push_str("<script>"),
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Native functions exposed to Ember programs.

use ember_core::value::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// `clock()`: seconds since the Unix epoch as a number.
pub fn clock(_args: &[Value]) -> Value {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0);
    Value::Number(seconds)
}

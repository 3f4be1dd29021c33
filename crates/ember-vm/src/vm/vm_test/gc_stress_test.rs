// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Garbage-collection behavior observed through whole programs.
//!
//! `assert_output` already replays every passing program under stress
//! mode; the tests here lean on allocation-heavy shapes where a
//! collector bug (missed root, over-eager intern sweep, dangling
//! upvalue) changes observable behavior.

use super::{assert_output, run_with};
use crate::vm::VmOptions;

#[test]
fn temporary_strings_are_garbage() {
    // Every iteration makes a fresh concatenation that immediately
    // becomes unreachable.
    assert_output(
        "var last;\n\
         for (var i = 0; i < 100; i = i + 1) {\n\
           last = \"chunk-\" + \"tail\";\n\
         }\n\
         print last;",
        "chunk-tail\n",
    );
}

#[test]
fn growing_string_survives_collection_pressure() {
    // Doubling concatenation: ~1 MiB of dead intermediates behind the
    // live result, enough to cross the default trigger threshold.
    assert_output(
        "var s = \"0123456789abcdef\";\n\
         for (var i = 0; i < 16; i = i + 1) {\n\
           s = s + s;\n\
         }\n\
         print s == s;\n\
         print \"done\";",
        "true\ndone\n",
    );
}

#[test]
fn closed_upvalues_survive_collections() {
    assert_output(
        "fun counter() { var n = 0; fun incr() { n = n + 1; return n; } return incr; }\n\
         var c = counter();\n\
         var waste = \"\";\n\
         for (var i = 0; i < 50; i = i + 1) { waste = \"x\" + \"y\"; }\n\
         print c(); print c();",
        "1\n2\n",
    );
}

#[test]
fn instances_referenced_only_through_globals_survive() {
    assert_output(
        "class Node {}\n\
         var head = Node();\n\
         head.label = \"head\";\n\
         for (var i = 0; i < 50; i = i + 1) {\n\
           var garbage = Node();\n\
           garbage.label = \"gone\" + \"gone\";\n\
         }\n\
         print head.label;",
        "head\n",
    );
}

#[test]
fn object_graph_cycles_do_not_break_collection() {
    // Mutually referencing instances become garbage together.
    assert_output(
        "class Node {}\n\
         for (var i = 0; i < 30; i = i + 1) {\n\
           var a = Node();\n\
           var b = Node();\n\
           a.next = b;\n\
           b.next = a;\n\
         }\n\
         print \"survived\";",
        "survived\n",
    );
}

#[test]
fn interning_still_holds_after_heavy_collection() {
    assert_output(
        "for (var i = 0; i < 50; i = i + 1) { var t = \"aa\" + \"bb\"; }\n\
         print \"aa\" + \"bb\" == \"aabb\";",
        "true\n",
    );
}

#[test]
fn methods_stay_reachable_through_their_class() {
    assert_output(
        "class Speaker { speak() { return \"still here\"; } }\n\
         var s = Speaker();\n\
         for (var i = 0; i < 50; i = i + 1) { var w = \"pad\" + \"ding\"; }\n\
         print s.speak();",
        "still here\n",
    );
}

#[test]
fn default_threshold_collects_during_long_runs() {
    // Without stress mode, the doubling loop crosses the 1 MiB trigger
    // and must retune rather than fail.
    let source = "var s = \"0123456789abcdef\";\n\
                  for (var i = 0; i < 17; i = i + 1) { s = s + s; }\n\
                  print \"grown\";";
    let (result, output) = run_with(source, VmOptions::default());
    assert_eq!(result, Ok(()));
    assert_eq!(output, "grown\n");
}

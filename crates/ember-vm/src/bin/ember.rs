// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The `ember` binary: run a script file or start the REPL.

use clap::Parser;
use ember_vm::repl;
use ember_vm::vm::{Vm, VmOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// The Ember interpreter.
#[derive(Parser)]
#[command(name = "ember", version, about = "The Ember interpreter")]
struct Cli {
    /// Script to run; starts the REPL when omitted.
    script: Option<PathBuf>,

    /// Run a garbage collection on every allocation.
    #[arg(long)]
    gc_stress: bool,

    /// Disassemble each function after compilation.
    #[arg(long)]
    dump_bytecode: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("EMBER_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let options = VmOptions {
        gc_stress: cli.gc_stress,
        dump_bytecode: cli.dump_bytecode,
    };
    let mut vm = Vm::new(options);

    match cli.script {
        Some(path) => ExitCode::from(repl::run_file(&mut vm, &path)),
        None => {
            repl::run_repl(&mut vm);
            ExitCode::SUCCESS
        }
    }
}

// BSD 2-Clause License
//
// Copyright (c) 2019, 2020 Alasdair Armstrong
//
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
// 1. Redistributions of source code must retain the above copyright
// notice, this list of conditions and the following disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright
// notice, this list of conditions and the following disclaimer in the
// documentation and/or other materials provided with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT
// HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE,
// DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY
// THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use std::io::Write;
use std::process::exit;
use std::time::Instant;

use symreplay_lib::config::TaggedLoads;
use symreplay_lib::events::{write_declarations, write_events};
use symreplay_lib::executor::{Invocation, Session};
use symreplay_lib::ir::serialize::load_module;
use symreplay_lib::log;
use symreplay_lib::replay::replay;
use symreplay_lib::trace::{open_trace, TraceEntry};

mod opts;

fn main() {
    let code = symreplay_main();
    exit(code)
}

fn symreplay_main() -> i32 {
    let mut opts = opts::common_opts();
    opts.optflag("p", "print", "print the event trace of each invocation");
    opts.optflag("s", "smt", "print the declared symbolic variables at the end");
    opts.optopt("", "tagged-loads", "what to do with tagged loads", "skip|abort");

    let (matches, mut config) = opts::parse(&opts, "<module> <trace>");

    if matches.free.len() != 2 {
        eprintln!("Expected a module and a trace file");
        opts::print_usage(&opts, "<module> <trace>", 1)
    }

    if let Some(policy) = matches.opt_str("tagged-loads") {
        match policy.parse::<TaggedLoads>() {
            Ok(policy) => config.tagged_loads = policy,
            Err(e) => {
                eprintln!("{}", e);
                return 1;
            }
        }
    }

    let module = match load_module(&matches.free[0]) {
        Ok(module) => module,
        Err(e) => {
            eprintln!("Error when loading module '{}': {}", matches.free[0], e);
            return 1;
        }
    };

    let trace = match open_trace(&matches.free[1]) {
        Ok(trace) => trace,
        Err(e) => {
            eprintln!("Error when opening trace '{}': {}", matches.free[1], e);
            return 1;
        }
    };

    let print = matches.opt_present("print");
    let mut session = Session::new(trace, config);

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    let mut output_error = None;
    let mut collector = |entry: &TraceEntry, invocation: &Invocation| {
        if print && output_error.is_none() {
            let result = writeln!(handle, "; {} {}", invocation.function, entry)
                .and_then(|_| write_events(&mut handle, &invocation.events));
            if let Err(e) = result {
                output_error = Some(e)
            }
        }
    };

    let now = Instant::now();
    let result = replay(&module, &mut session, &mut collector);
    log!(log::VERBOSE, format!("Replay took: {}ms", now.elapsed().as_millis()));

    if let Some(e) = output_error {
        eprintln!("Error when writing output: {}", e);
        return 1;
    }

    match result {
        Ok(stats) => {
            log!(
                log::VERBOSE,
                format!(
                    "Replayed {} invocations ({} blocks, {} trace entries)",
                    stats.invocations, stats.blocks, stats.entries
                )
            );
            if matches.opt_present("smt") {
                if let Err(e) = write_declarations(&mut handle, &session.ctx) {
                    eprintln!("Error when writing output: {}", e);
                    return 1;
                }
            }
            0
        }
        Err(e) => {
            eprintln!("Replay failed after {} trace entries: {}", session.cursor.consumed(), e);
            1
        }
    }
}

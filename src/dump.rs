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

use symreplay_lib::error::ExecError;
use symreplay_lib::ir::serialize::load_module;
use symreplay_lib::ir::Module;
use symreplay_lib::trace::{open_trace, TraceSource};

mod opts;

fn main() {
    let code = dump_main();
    exit(code)
}

fn dump_trace(file: &str, handle: &mut dyn Write) -> Result<(), ExecError> {
    let mut trace = open_trace(file)?;
    let mut i = 0;
    while let Some(entry) = trace.next_entry()? {
        writeln!(handle, "{:>8} {}", i, entry)?;
        i += 1
    }
    Ok(())
}

fn dump_module(module: &Module, handle: &mut dyn Write) -> Result<(), ExecError> {
    for function in module.functions() {
        writeln!(handle, "define {}({} params) {{", function.name, function.params)?;
        for block in &function.blocks {
            writeln!(handle, "{}:", block.name)?;
            for instr in &block.instrs {
                writeln!(handle, "  {}", instr)?
            }
        }
        writeln!(handle, "}}")?
    }
    Ok(())
}

fn dump_main() -> i32 {
    let mut opts = opts::common_opts();
    opts.optflag("m", "module", "the file is a module rather than a trace");

    let (matches, _) = opts::parse(&opts, "<file>");

    if matches.free.len() != 1 {
        eprintln!("Expected a single file to dump");
        opts::print_usage(&opts, "<file>", 1)
    }
    let file = &matches.free[0];

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let result = if matches.opt_present("module") {
        load_module(file).and_then(|module| dump_module(&module, &mut handle))
    } else {
        dump_trace(file, &mut handle)
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error when dumping '{}': {}", file, e);
            1
        }
    }
}

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

//! Each function invocation records a trace of events, which is the
//! output of a replay: which blocks ran, the value every instruction
//! was bound to, and the memory traffic that connects them.

use std::io::Write;

use crate::ir::InstrId;
use crate::smt::smtlib::Def;
use crate::smt::Context;
use crate::value::SymValue;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Block(String),
    Define(InstrId, SymValue),
    ReadMem { address: u64, value: SymValue },
    WriteMem { address: u64, value: SymValue },
    /// A call to an instrumentation function.
    Marker(String),
    Return,
}

pub fn write_events(buf: &mut dyn Write, events: &[Event]) -> std::io::Result<()> {
    use Event::*;
    write!(buf, "(trace")?;
    for event in events {
        match event {
            Block(name) => write!(buf, "\n  (block |{}|)", name)?,
            Define(id, value) => write!(buf, "\n  (define {} {})", id, value)?,
            ReadMem { address, value } => write!(buf, "\n  (read-mem #x{:016x} {})", address, value)?,
            WriteMem { address, value } => write!(buf, "\n  (write-mem #x{:016x} {})", address, value)?,
            Marker(name) => write!(buf, "\n  (call |{}|)", name)?,
            Return => write!(buf, "\n  (return)")?,
        }
    }
    writeln!(buf, ")")
}

pub fn write_declarations(buf: &mut dyn Write, ctx: &Context) -> std::io::Result<()> {
    for def in ctx.defs() {
        let Def::DeclareConst(v, _) = def;
        match ctx.name(*v) {
            Some(name) => writeln!(buf, "{} ; {}", def, name)?,
            None => writeln!(buf, "{}", def)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smt::smtlib::Ty;

    #[test]
    fn event_output() {
        let mut ctx = Context::new();
        let env = ctx.declare_const("env", Ty::BitVec(64));
        let events = vec![
            Event::Block("entry".to_string()),
            Event::Define(InstrId(1), SymValue::var(env)),
            Event::WriteMem { address: 0x10, value: SymValue::Concrete(1) },
            Event::Return,
        ];

        let mut buf = Vec::new();
        write_events(&mut buf, &events).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "(trace\n  (block |entry|)\n  (define %1 v0)\n  (write-mem #x0000000000000010 #x0000000000000001)\n  (return))\n"
        );

        let mut buf = Vec::new();
        write_declarations(&mut buf, &ctx).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "(declare-const v0 (_ BitVec 64)) ; env\n")
    }
}

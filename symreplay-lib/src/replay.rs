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

//! The top level replay loop. A trace is a sequence of translation
//! block executions, each announced by a function entry marker naming
//! the block's number and program counter. Each one is looked up in
//! the module and executed against the trace in turn.

use crate::error::ExecError;
use crate::executor::{execute_function, Invocation, Session};
use crate::ir::Module;
use crate::log;
use crate::trace::{EntryKind, TraceEntry, TraceSource};

/// The name the translator gives the function for a translation
/// block.
pub fn function_name(tb_num: u64, pc: u64) -> String {
    format!("tb-{}-{:x}", tb_num, pc)
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub invocations: usize,
    pub blocks: usize,
    /// Trace entries consumed, including the header.
    pub entries: usize,
}

/// Replay an entire trace. Each completed invocation is passed to the
/// collector along with the function entry marker that started it.
///
/// The trace may only end between invocations. Running out of
/// entries anywhere else is an error, as is any other kind of entry
/// where a function entry marker is expected.
pub fn replay<S: TraceSource>(
    module: &Module,
    session: &mut Session<S>,
    collector: &mut dyn FnMut(&TraceEntry, &Invocation),
) -> Result<ReplayStats, ExecError> {
    session.cursor.prime()?;

    let mut stats = ReplayStats::default();

    while let Some(entry) = session.cursor.try_next()? {
        if entry.kind != EntryKind::LlvmFn {
            return Err(ExecError::TraceDesync {
                expected: EntryKind::LlvmFn,
                found: entry.kind,
                position: session.cursor.consumed() - 1,
            });
        }

        let name = function_name(entry.tb_num, entry.pc);
        let function = match module.get_function(&name) {
            Some(function) => function,
            None => return Err(ExecError::UnknownFunction { name }),
        };

        log!(log::VERBOSE, format!("Executing {}", name));
        let invocation = execute_function(function, session)?;

        stats.invocations += 1;
        stats.blocks += invocation.blocks;
        collector(&entry, &invocation)
    }

    stats.entries = session.cursor.consumed();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_names() {
        assert_eq!(function_name(0, 0), "tb-0-0");
        assert_eq!(function_name(12, 0x400000), "tb-12-400000");
        assert_eq!(function_name(7, 0xffff_ffff_8100_00ab), "tb-7-ffffffff810000ab")
    }
}

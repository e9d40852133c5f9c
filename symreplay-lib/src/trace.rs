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

//! Execution traces. A trace file is a stream of bincode encoded
//! [`TraceEntry`] records, read strictly forwards. The first record
//! is a header that primes the reader and carries no meaning for
//! replay.
//!
//! The [`TraceCursor`] is how the executor consumes a trace. Each
//! time the executor reaches a point that left a record during the
//! recorded run (entering a translation block or basic block, a load,
//! a store) it asks the cursor for an entry of that kind, and any
//! mismatch is a desynchronization between trace and program.

use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ExecError;
use crate::if_logging;
use crate::log;

macro_rules! entry_kinds {
    ($($kind:ident = $code:literal => $name:expr),* $(,)?) => {
        /// The fixed vocabulary of trace entry tags, with the numeric
        /// codes used in trace files.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "u32", into = "u32")]
        pub enum EntryKind {
            $($kind),*
        }

        impl EntryKind {
            pub fn code(self) -> u32 {
                match self {
                    $(EntryKind::$kind => $code),*
                }
            }

            pub fn from_code(code: u32) -> Option<Self> {
                match code {
                    $($code => Some(EntryKind::$kind),)*
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(EntryKind::$kind => $name),*
                }
            }
        }
    };
}

entry_kinds! {
    DeclareBlocks = 1 => "declare-blocks",
    Binop = 2 => "binop",
    Cast = 3 => "cast",
    Gep = 4 => "gep",
    Select = 5 => "select",
    ExtractElt = 6 => "extractelt",
    InsertElt = 7 => "insertelt",
    ShuffleVec = 8 => "shufflevec",
    Cmp = 9 => "cmp",
    Ret = 10 => "ret",
    Br = 11 => "br",
    Switch = 12 => "switch",
    Invoke = 13 => "invoke",
    Unreachable = 15 => "unreachable",
    Phi = 16 => "phi",
    Alloca = 19 => "alloca",
    Load = 20 => "load",
    VaArg = 23 => "vaarg",
    Store = 24 => "store",
    ExtractVal = 26 => "extractval",
    InsertVal = 27 => "insertval",
    Cmp2 = 28 => "cmp2",
    VSelect = 29 => "vselect",
    InboundsGep = 30 => "inbounds-gep",
    IndirectBr = 31 => "indirectbr",
    DebugLocAgain = 33 => "debug-loc-again",
    Call = 34 => "call",
    DebugLoc = 35 => "debug-loc",
    Fence = 36 => "fence",
    CmpXchg = 37 => "cmpxchg",
    AtomicRmw = 38 => "atomicrmw",
    Resume = 39 => "resume",
    LandingPad = 40 => "landingpad",
    LoadAtomic = 41 => "load-atomic",
    StoreAtomic = 42 => "store-atomic",
    Bb = 43 => "basic-block",
    LlvmFn = 44 => "function",
    LlvmException = 45 => "exception",
}

impl From<EntryKind> for u32 {
    fn from(kind: EntryKind) -> u32 {
        kind.code()
    }
}

impl TryFrom<u32> for EntryKind {
    type Error = String;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        EntryKind::from_code(code).ok_or_else(|| format!("unknown trace entry kind {}", code))
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single record from a trace. Which of the fields are meaningful
/// depends on the kind: memory observations carry an `address`,
/// function entry markers carry the translation block number and
/// `pc`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub pc: u64,
    pub kind: EntryKind,
    pub address: u64,
    pub value: u64,
    pub tb_num: u64,
}

impl TraceEntry {
    pub fn new(kind: EntryKind) -> Self {
        TraceEntry { pc: 0, kind, address: 0, value: 0, tb_num: 0 }
    }

    /// The priming record written at the start of every trace.
    pub fn header() -> Self {
        TraceEntry::new(EntryKind::DeclareBlocks)
    }

    pub fn function(tb_num: u64, pc: u64) -> Self {
        TraceEntry { pc, tb_num, ..TraceEntry::new(EntryKind::LlvmFn) }
    }

    pub fn block() -> Self {
        TraceEntry::new(EntryKind::Bb)
    }

    pub fn load(address: u64) -> Self {
        TraceEntry { address, ..TraceEntry::new(EntryKind::Load) }
    }

    pub fn store(address: u64) -> Self {
        TraceEntry { address, ..TraceEntry::new(EntryKind::Store) }
    }
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use EntryKind::*;
        match self.kind {
            LlvmFn => write!(f, "{} tb={} pc={:#x}", self.kind, self.tb_num, self.pc),
            Load | Store | LoadAtomic | StoreAtomic => {
                write!(f, "{} address={:#x} value={:#x}", self.kind, self.address, self.value)
            }
            _ => write!(f, "{}", self.kind),
        }
    }
}

/// Anything that can produce trace entries in order.
pub trait TraceSource {
    /// Returns `Ok(None)` once the trace has ended.
    fn next_entry(&mut self) -> Result<Option<TraceEntry>, ExecError>;
}

impl TraceSource for VecDeque<TraceEntry> {
    fn next_entry(&mut self) -> Result<Option<TraceEntry>, ExecError> {
        Ok(self.pop_front())
    }
}

pub struct TraceReader<R> {
    reader: BufReader<R>,
}

impl<R: Read> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        TraceReader { reader: BufReader::new(reader) }
    }
}

impl<R: Read> TraceSource for TraceReader<R> {
    fn next_entry(&mut self) -> Result<Option<TraceEntry>, ExecError> {
        if self.reader.fill_buf()?.is_empty() {
            return Ok(None);
        }
        Ok(Some(bincode::deserialize_from(&mut self.reader)?))
    }
}

pub fn open_trace<P: AsRef<Path>>(path: P) -> Result<TraceReader<File>, ExecError> {
    Ok(TraceReader::new(File::open(path)?))
}

pub fn write_trace<W: Write>(mut writer: W, entries: &[TraceEntry]) -> Result<(), ExecError> {
    for entry in entries {
        bincode::serialize_into(&mut writer, entry)?
    }
    writer.flush()?;
    Ok(())
}

/// A forward-only view of a trace that checks every entry it hands
/// out against what the caller expected to see.
pub struct TraceCursor<S> {
    source: S,
    consumed: usize,
}

impl<S: TraceSource> TraceCursor<S> {
    pub fn new(source: S) -> Self {
        TraceCursor { source, consumed: 0 }
    }

    /// The next entry, or `None` if the trace has ended. This is only
    /// appropriate at the points where the trace may legitimately end.
    pub fn try_next(&mut self) -> Result<Option<TraceEntry>, ExecError> {
        let entry = self.source.next_entry()?;
        if let Some(entry) = &entry {
            self.consumed += 1;
            if_logging!(log::TRACE, {
                eprintln!("[trace {}]: {}", self.consumed - 1, entry)
            })
        }
        Ok(entry)
    }

    /// The next entry of any kind. Running out of entries here is an
    /// error, `expected` describes what we were waiting for.
    pub fn pull(&mut self, expected: &'static str) -> Result<TraceEntry, ExecError> {
        match self.try_next()? {
            Some(entry) => Ok(entry),
            None => Err(ExecError::TraceExhausted { expected, position: self.consumed }),
        }
    }

    pub fn expect(&mut self, kind: EntryKind) -> Result<TraceEntry, ExecError> {
        let entry = self.pull(kind.name())?;
        if entry.kind != kind {
            return Err(ExecError::TraceDesync { expected: kind, found: entry.kind, position: self.consumed - 1 });
        }
        Ok(entry)
    }

    /// Discard the header record.
    pub fn prime(&mut self) -> Result<(), ExecError> {
        self.pull("header record").map(|_| ())
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

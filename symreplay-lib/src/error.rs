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

//! Every error raised during replay is fatal. Once the trace and the
//! program disagree nothing computed afterwards can be trusted, so
//! errors are propagated to the driver and reported, never recovered.

use std::fmt;

use thiserror::Error;

use crate::ir::{Block, BlockId, Function, Instr, InstrId, Opcode, Operand};
use crate::trace::EntryKind;

/// The instruction an error was raised at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Site {
    pub function: String,
    pub block: String,
    pub instr: InstrId,
}

impl Site {
    pub fn new(function: &Function, block: &Block, instr: &Instr) -> Self {
        Site { function: function.name.clone(), block: block.name.clone(), instr: instr.id }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in block {} of {}", self.instr, self.block, self.function)
    }
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("trace desynchronized at entry {position}: expected {expected} but found {found}")]
    TraceDesync { expected: EntryKind, found: EntryKind, position: usize },
    #[error("trace exhausted after {position} entries while expecting {expected}")]
    TraceExhausted { expected: &'static str, position: usize },
    #[error("unimplemented opcode {opcode} at {site}")]
    UnimplementedOpcode { site: Site, opcode: Opcode },
    #[error("call to unknown function {callee} at {site}")]
    UnknownCallTarget { site: Site, callee: String },
    #[error("operand {operand} has no value at {site}")]
    UnboundOperand { site: Site, operand: InstrId },
    #[error("unsupported operand {operand} at {site}")]
    UnsupportedOperandKind { site: Site, operand: Operand },
    #[error("misaligned access to address {address:#x} at {site}")]
    MisalignedAccess { site: Site, address: u64 },
    #[error("branch condition {condition} is symbolic at {site}")]
    UnresolvedBranchCondition { site: Site, condition: String },
    #[error("unreachable executed at {site}")]
    UnreachableExecuted { site: Site },
    #[error("no function {name} in module")]
    UnknownFunction { name: String },
    #[error("malformed instruction at {site}: {reason}")]
    MalformedInstruction { site: Site, reason: &'static str },
    #[error("tagged load from address {address:#x} at {site} is not supported")]
    UnsupportedTaggedLoad { site: Site, address: u64 },
    #[error("no block {block} in {function}")]
    UnknownBlock { function: String, block: BlockId },
    #[error("block {block} of {function} has no terminator")]
    MissingTerminator { function: String, block: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode error: {0}")]
    Decode(#[from] bincode::Error),
}

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

use std::collections::HashMap;

use super::Invocation;
use crate::events::Event;
use crate::ir::{Block, BlockId, Function, InstrId, Operand};
use crate::smt::smtlib::Ty;
use crate::smt::{Context, Sym};
use crate::value::SymValue;

pub type Bindings = HashMap<InstrId, SymValue>;

/// The state of a single function invocation. A frame is created
/// when a translation block is entered and thrown away when it
/// returns, nothing in it is shared between invocations.
pub struct LocalFrame<'ir> {
    function: &'ir Function,
    vars: Bindings,
    env_ptr: Option<Operand>,
    env_sym: Option<Sym>,
    predecessor: Option<BlockId>,
    blocks: usize,
    events: Vec<Event>,
}

impl<'ir> LocalFrame<'ir> {
    /// The environment pointer is the function's first argument, if
    /// it has one.
    pub fn new(function: &'ir Function) -> Self {
        LocalFrame {
            function,
            vars: HashMap::new(),
            env_ptr: if function.params > 0 { Some(Operand::Arg(0)) } else { None },
            env_sym: None,
            predecessor: None,
            blocks: 0,
            events: Vec::new(),
        }
    }

    pub fn function(&self) -> &'ir Function {
        self.function
    }

    pub fn vars(&self) -> &Bindings {
        &self.vars
    }

    pub fn bind(&mut self, id: InstrId, value: SymValue) {
        self.events.push(Event::Define(id, value.clone()));
        self.vars.insert(id, value);
    }

    pub fn is_env_ptr(&self, operand: &Operand) -> bool {
        self.env_ptr.as_ref() == Some(operand)
    }

    /// The free variable standing for the environment pointer. It is
    /// declared the first time it is asked for, and every later cast
    /// of the environment pointer in this invocation sees the same
    /// variable.
    pub fn env_symbol(&mut self, ctx: &mut Context, name: &str) -> Sym {
        match self.env_sym {
            Some(sym) => sym,
            None => {
                let sym = ctx.declare_const(name, Ty::BitVec(64));
                self.env_sym = Some(sym);
                sym
            }
        }
    }

    pub fn predecessor(&self) -> Option<BlockId> {
        self.predecessor
    }

    pub(super) fn enter_block(&mut self, block: &Block) {
        self.blocks += 1;
        self.events.push(Event::Block(block.name.clone()))
    }

    pub(super) fn leave_block(&mut self, id: BlockId) {
        self.predecessor = Some(id)
    }

    pub fn record(&mut self, event: Event) {
        self.events.push(event)
    }

    pub fn into_invocation(self) -> Invocation {
        Invocation {
            function: self.function.name.clone(),
            env: self.env_sym,
            bindings: self.vars,
            events: self.events,
            blocks: self.blocks,
        }
    }
}

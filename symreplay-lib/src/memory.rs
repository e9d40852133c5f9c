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

//! The host memory model is a sparse map from 8-byte aligned
//! addresses to symbolic values. It lives for a whole replay session,
//! so stores made by one translation block are visible to loads in
//! any later one. Reads of locations that were never written return a
//! fixed sentinel rather than failing, as such memory was populated
//! outside of anything the trace can show us.

use std::collections::HashMap;

use crate::value::SymValue;

pub type Address = u64;

pub const ALIGNMENT: u64 = 8;

/// The sentinel returned for reads of memory we have no record of.
pub const UNHANDLED: u64 = 0xdead_beef_dead_beef;

pub fn is_aligned(address: Address) -> bool {
    address % ALIGNMENT == 0
}

pub struct HostMemory {
    contents: HashMap<Address, SymValue>,
    unhandled: u64,
}

impl Default for HostMemory {
    fn default() -> Self {
        HostMemory::new(UNHANDLED)
    }
}

impl HostMemory {
    pub fn new(unhandled: u64) -> Self {
        HostMemory { contents: HashMap::new(), unhandled }
    }

    /// Callers are responsible for checking alignment first, so the
    /// failure can be reported against the instruction that caused it.
    pub fn read(&self, address: Address) -> SymValue {
        debug_assert!(is_aligned(address));
        match self.contents.get(&address) {
            Some(value) => value.clone(),
            None => SymValue::Concrete(self.unhandled),
        }
    }

    pub fn write(&mut self, address: Address, value: SymValue) {
        debug_assert!(is_aligned(address));
        self.contents.insert(address, value);
    }

    pub fn contains(&self, address: Address) -> bool {
        self.contents.contains_key(&address)
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

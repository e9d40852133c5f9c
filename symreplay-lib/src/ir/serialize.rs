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

//! Modules are stored on disk as bincode. The name index is not
//! stored, it is rebuilt when the module is loaded.

use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::*;
use crate::error::ExecError;

#[derive(Serialize, Deserialize)]
struct SModule {
    functions: Vec<Function>,
}

pub fn serialize(module: &Module) -> Result<Vec<u8>, ExecError> {
    let smodule = SModule { functions: module.functions.clone() };
    Ok(bincode::serialize(&smodule)?)
}

pub fn deserialize(bytes: &[u8]) -> Result<Module, ExecError> {
    let smodule: SModule = bincode::deserialize(bytes)?;
    Ok(Module::new(smodule.functions))
}

pub fn load_module<P: AsRef<Path>>(path: P) -> Result<Module, ExecError> {
    let mut buf = Vec::new();
    File::open(path)?.read_to_end(&mut buf)?;
    deserialize(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_survives_reload() {
        let f = Function::new(
            "tb-0-1000",
            1,
            vec![Block::new("entry", vec![Instr::new(0, Opcode::Ret, vec![])])],
        );
        let bytes = serialize(&Module::new(vec![f])).unwrap();
        let module = deserialize(&bytes).unwrap();
        let f = module.get_function("tb-0-1000").unwrap();
        assert_eq!(f.blocks[0].instrs[0].opcode, Opcode::Ret)
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(deserialize(&[0xff, 0xff, 0xff]), Err(ExecError::Decode(_))))
    }
}

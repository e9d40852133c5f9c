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

//! The program representation consumed by the replay executor. A
//! module is a set of functions in SSA form, each a list of basic
//! blocks whose final instruction is a terminator. Modules are
//! produced by an external toolchain and arrive here serialized (see
//! [`serialize`]); nothing in this crate mutates them.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod serialize;

/// Identifies an instruction (and therefore the SSA value it
/// defines) within a function.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrId(pub u32);

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// The index of a basic block in its function's block list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

macro_rules! opcodes {
    ($($(#[$attr:meta])* $op:ident => $name:expr),* $(,)?) => {
        /// The closed vocabulary of instruction opcodes.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Opcode {
            $($(#[$attr])* $op),*
        }

        impl Opcode {
            pub const ALL: &'static [Opcode] = &[$(Opcode::$op),*];

            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$op => $name),*
                }
            }
        }
    };
}

opcodes! {
    /// `ret [value?]`
    Ret => "ret",
    /// `br [bb]` or `br [cond, then_bb, else_bb]`
    Br => "br",
    /// `switch [value, default_bb, (case_const, case_bb)*]`
    Switch => "switch",
    /// `indirectbr [address, bb*]`, the address selects a destination by index
    IndirectBr => "indirectbr",
    Invoke => "invoke",
    Resume => "resume",
    Unreachable => "unreachable",
    CleanupRet => "cleanupret",
    CatchRet => "catchret",
    CatchSwitch => "catchswitch",
    CallBr => "callbr",
    FNeg => "fneg",
    /// `add [lhs, rhs]`
    Add => "add",
    FAdd => "fadd",
    Sub => "sub",
    FSub => "fsub",
    Mul => "mul",
    FMul => "fmul",
    UDiv => "udiv",
    SDiv => "sdiv",
    FDiv => "fdiv",
    URem => "urem",
    SRem => "srem",
    FRem => "frem",
    Shl => "shl",
    LShr => "lshr",
    AShr => "ashr",
    And => "and",
    Or => "or",
    Xor => "xor",
    /// `alloca [count?]`
    Alloca => "alloca",
    /// `load [pointer]`
    Load => "load",
    /// `store [value, pointer]`
    Store => "store",
    GetElementPtr => "getelementptr",
    Fence => "fence",
    AtomicCmpXchg => "cmpxchg",
    AtomicRMW => "atomicrmw",
    Trunc => "trunc",
    ZExt => "zext",
    SExt => "sext",
    FPToUI => "fptoui",
    FPToSI => "fptosi",
    UIToFP => "uitofp",
    SIToFP => "sitofp",
    FPTrunc => "fptrunc",
    FPExt => "fpext",
    /// `ptrtoint [value]`
    PtrToInt => "ptrtoint",
    /// `inttoptr [value]`
    IntToPtr => "inttoptr",
    /// `bitcast [value]`
    BitCast => "bitcast",
    AddrSpaceCast => "addrspacecast",
    ICmp => "icmp",
    FCmp => "fcmp",
    /// `phi [(value, bb)*]`
    Phi => "phi",
    /// `call [callee, args*]`
    Call => "call",
    Select => "select",
    UserOp1 => "userop1",
    UserOp2 => "userop2",
    VAArg => "va_arg",
    ExtractElement => "extractelement",
    InsertElement => "insertelement",
    ShuffleVector => "shufflevector",
    ExtractValue => "extractvalue",
    InsertValue => "insertvalue",
    LandingPad => "landingpad",
    CleanupPad => "cleanuppad",
    CatchPad => "catchpad",
    Freeze => "freeze",
}

impl Opcode {
    pub fn is_terminator(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Ret | Br | Switch | IndirectBr | Invoke | Resume | Unreachable | CleanupRet | CatchRet | CatchSwitch | CallBr
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// The value defined by an earlier instruction.
    Instr(InstrId),
    /// A formal argument of the enclosing function.
    Arg(u32),
    /// An integer literal, `bits` holds the low `width` bits.
    Const { bits: u64, width: u32 },
    Block(BlockId),
    /// A function referenced by name, i.e. a direct call target.
    Function(String),
}

impl Operand {
    pub fn instr(id: u32) -> Self {
        Operand::Instr(InstrId(id))
    }

    pub fn block(id: u32) -> Self {
        Operand::Block(BlockId(id))
    }

    pub fn i64(bits: u64) -> Self {
        Operand::Const { bits, width: 64 }
    }

    pub fn as_block(&self) -> Option<BlockId> {
        match self {
            Operand::Block(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Instr(id) => write!(f, "{}", id),
            Operand::Arg(n) => write!(f, "%arg{}", n),
            Operand::Const { bits, width } => write!(f, "i{} {}", width, bits),
            Operand::Block(id) => write!(f, "label {}", id),
            Operand::Function(name) => write!(f, "@{}", name),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Instr {
    pub id: InstrId,
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    /// Named metadata nodes attached to the instruction, each with a
    /// list of string operands.
    pub metadata: Vec<(String, Vec<String>)>,
}

impl Instr {
    pub fn new(id: u32, opcode: Opcode, operands: Vec<Operand>) -> Self {
        Instr { id: InstrId(id), opcode, operands, metadata: Vec::new() }
    }

    pub fn with_metadata(mut self, key: &str, operands: &[&str]) -> Self {
        self.metadata.push((key.to_string(), operands.iter().map(|s| s.to_string()).collect()));
        self
    }

    pub fn metadata(&self, key: &str) -> Option<&[String]> {
        self.metadata.iter().find(|(k, _)| k == key).map(|(_, operands)| operands.as_slice())
    }

    pub fn operand(&self, n: usize) -> Option<&Operand> {
        self.operands.get(n)
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.id, self.opcode)?;
        for (i, op) in self.operands.iter().enumerate() {
            write!(f, "{}{}", if i == 0 { " " } else { ", " }, op)?
        }
        for (key, operands) in &self.metadata {
            write!(f, ", !{} !{{{}}}", key, operands.join(", "))?
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub instrs: Vec<Instr>,
}

impl Block {
    pub fn new(name: &str, instrs: Vec<Instr>) -> Self {
        Block { name: name.to_string(), instrs }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    /// The number of formal arguments.
    pub params: u32,
    /// The first block is the entry block.
    pub blocks: Vec<Block>,
}

impl Function {
    pub fn new(name: &str, params: u32, blocks: Vec<Block>) -> Self {
        Function { name: name.to_string(), params, blocks }
    }

    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    pub fn instr_count(&self) -> usize {
        self.blocks.iter().map(|b| b.instrs.len()).sum()
    }
}

pub struct Module {
    functions: Vec<Function>,
    by_name: HashMap<String, usize>,
}

impl Module {
    /// Later definitions of a name shadow earlier ones.
    pub fn new(functions: Vec<Function>) -> Self {
        let by_name = functions.iter().enumerate().map(|(i, f)| (f.name.clone(), i)).collect();
        Module { functions, by_name }
    }

    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.by_name.get(name).map(|i| &self.functions[*i])
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_names_are_unique() {
        let mut names: Vec<&str> = Opcode::ALL.iter().map(|op| op.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Opcode::ALL.len())
    }

    #[test]
    fn terminators() {
        assert!(Opcode::Ret.is_terminator());
        assert!(Opcode::IndirectBr.is_terminator());
        assert!(!Opcode::Call.is_terminator());
        assert!(!Opcode::Add.is_terminator())
    }

    #[test]
    fn metadata_lookup() {
        let load = Instr::new(2, Opcode::Load, vec![Operand::instr(1)]).with_metadata("host", &["rrupdate"]);
        assert_eq!(load.metadata("host"), Some(&["rrupdate".to_string()][..]));
        assert_eq!(load.metadata("dbg"), None);
        assert_eq!(load.to_string(), "%2 = load %1, !host !{rrupdate}")
    }

    #[test]
    fn function_lookup_is_exact() {
        let module = Module::new(vec![
            Function::new("tb-1-400000", 1, vec![]),
            Function::new("tb-1-40000", 1, vec![]),
        ]);
        assert_eq!(module.get_function("tb-1-400000").map(|f| f.name.as_str()), Some("tb-1-400000"));
        assert!(module.get_function("tb-1-4000").is_none());
        assert_eq!(module.functions().len(), 2)
    }
}

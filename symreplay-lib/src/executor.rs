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

//! This module implements the core of the replay engine. Control
//! flow is never explored here: which block runs next is decided by
//! concrete values, and every block entry, load, and store must line
//! up with the next entry of the trace.

use std::collections::HashMap;

use crate::config::{ReplayConfig, TaggedLoads};
use crate::error::{ExecError, Site};
use crate::events::Event;
use crate::ir::*;
use crate::log;
use crate::memory::{self, HostMemory};
use crate::smt::{Context, Sym};
use crate::trace::{EntryKind, TraceCursor, TraceSource};
use crate::value::SymValue;

pub mod frame;

use frame::{Bindings, LocalFrame};

/// Everything that outlives a single function invocation: the trace
/// position, host memory, and the declared symbolic variables.
pub struct Session<S> {
    pub cursor: TraceCursor<S>,
    pub memory: HostMemory,
    pub ctx: Context,
    pub config: ReplayConfig,
}

impl<S: TraceSource> Session<S> {
    pub fn new(source: S, config: ReplayConfig) -> Self {
        Session {
            cursor: TraceCursor::new(source),
            memory: HostMemory::new(config.unhandled),
            ctx: Context::new(),
            config,
        }
    }
}

/// Where control goes after a block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Successor {
    Goto(BlockId),
    Return,
}

/// The result of replaying one function invocation.
#[derive(Clone, Debug)]
pub struct Invocation {
    pub function: String,
    /// The environment variable, if the invocation ever cast the
    /// environment pointer to an integer.
    pub env: Option<Sym>,
    /// The last value bound to each instruction.
    pub bindings: HashMap<InstrId, SymValue>,
    pub events: Vec<Event>,
    pub blocks: usize,
}

impl Invocation {
    pub fn binding(&self, id: u32) -> Option<&SymValue> {
        self.bindings.get(&InstrId(id))
    }
}

/// Integer constants are zero-extended from their declared width.
fn constant(bits: u64, width: u32) -> Option<u64> {
    match width {
        1..=63 => Some(bits & ((1u64 << width) - 1)),
        64 => Some(bits),
        _ => None,
    }
}

/// Find the value of an operand. Instruction results must already be
/// bound, and integer constants become concrete values. Anything
/// else (arguments, labels, functions) has no value here.
pub fn resolve(operand: &Operand, vars: &Bindings, site: &dyn Fn() -> Site) -> Result<SymValue, ExecError> {
    match operand {
        Operand::Instr(id) => match vars.get(id) {
            Some(value) => Ok(value.clone()),
            None => Err(ExecError::UnboundOperand { site: site(), operand: *id }),
        },
        Operand::Const { bits, width } => match constant(*bits, *width) {
            Some(bits) => Ok(SymValue::Concrete(bits)),
            None => Err(ExecError::UnsupportedOperandKind { site: site(), operand: operand.clone() }),
        },
        _ => Err(ExecError::UnsupportedOperandKind { site: site(), operand: operand.clone() }),
    }
}

fn malformed(site: &dyn Fn() -> Site, reason: &'static str) -> ExecError {
    ExecError::MalformedInstruction { site: site(), reason }
}

fn operand<'ir>(instr: &'ir Instr, n: usize, site: &dyn Fn() -> Site) -> Result<&'ir Operand, ExecError> {
    instr.operand(n).ok_or_else(|| malformed(site, "missing operand"))
}

fn check_alignment(address: u64, site: &dyn Fn() -> Site) -> Result<(), ExecError> {
    if memory::is_aligned(address) {
        Ok(())
    } else {
        Err(ExecError::MisalignedAccess { site: site(), address })
    }
}

/// Control flow has to be decided by concrete values.
fn concrete_condition(value: SymValue, site: &dyn Fn() -> Site) -> Result<u64, ExecError> {
    match value {
        SymValue::Concrete(bits) => Ok(bits),
        SymValue::Symbolic(exp) => Err(ExecError::UnresolvedBranchCondition { site: site(), condition: exp.to_string() }),
    }
}

/// The entry block has no predecessors, so a branch to it is always
/// malformed. This also means every loop goes through a block that
/// consumes a trace entry.
fn goto(function: &Function, target: BlockId, site: &dyn Fn() -> Site) -> Result<Option<Successor>, ExecError> {
    if target == function.entry() {
        Err(malformed(site, "branch to entry block"))
    } else {
        Ok(Some(Successor::Goto(target)))
    }
}

fn phi_value(instr: &Instr, frame: &LocalFrame, site: &dyn Fn() -> Site) -> Result<SymValue, ExecError> {
    let predecessor = frame.predecessor().ok_or_else(|| malformed(site, "phi in entry block"))?;
    if instr.operands.len() % 2 != 0 {
        return Err(malformed(site, "phi operands must be value and block pairs"));
    }
    for incoming in instr.operands.chunks(2) {
        if incoming[1].as_block() == Some(predecessor) {
            return resolve(&incoming[0], frame.vars(), site);
        }
    }
    Err(malformed(site, "phi has no value for the predecessor block"))
}

fn execute_terminator(
    function: &Function,
    instr: &Instr,
    frame: &mut LocalFrame,
    site: &dyn Fn() -> Site,
) -> Result<Option<Successor>, ExecError> {
    match instr.opcode {
        Opcode::Ret => {
            frame.record(Event::Return);
            Ok(Some(Successor::Return))
        }

        Opcode::Br => match instr.operands.as_slice() {
            [Operand::Block(target)] => goto(function, *target, site),
            [cond, Operand::Block(then_bb), Operand::Block(else_bb)] => {
                let cond = concrete_condition(resolve(cond, frame.vars(), site)?, site)?;
                goto(function, if cond != 0 { *then_bb } else { *else_bb }, site)
            }
            _ => Err(malformed(site, "br takes a block or a condition and two blocks")),
        },

        Opcode::Switch => match instr.operands.as_slice() {
            [discriminant, Operand::Block(default), cases @ ..] if cases.len() % 2 == 0 => {
                let value = concrete_condition(resolve(discriminant, frame.vars(), site)?, site)?;
                let mut target = *default;
                for case in cases.chunks(2) {
                    match (&case[0], &case[1]) {
                        (Operand::Const { bits, width }, Operand::Block(bb)) => {
                            if constant(*bits, *width) == Some(value) {
                                target = *bb;
                                break;
                            }
                        }
                        _ => return Err(malformed(site, "switch cases must be constant and block pairs")),
                    }
                }
                goto(function, target, site)
            }
            _ => Err(malformed(site, "switch takes a value, a default block, and cases")),
        },

        Opcode::IndirectBr => match instr.operands.as_slice() {
            [address, destinations @ ..] => {
                let index = concrete_condition(resolve(address, frame.vars(), site)?, site)?;
                match usize::try_from(index).ok().and_then(|i| destinations.get(i)) {
                    Some(Operand::Block(target)) => goto(function, *target, site),
                    Some(_) => Err(malformed(site, "indirectbr destinations must be blocks")),
                    None => Err(malformed(site, "indirectbr address is out of range")),
                }
            }
            _ => Err(malformed(site, "indirectbr takes an address")),
        },

        Opcode::Unreachable => Err(ExecError::UnreachableExecuted { site: site() }),

        opcode => Err(ExecError::UnimplementedOpcode { site: site(), opcode }),
    }
}

/// Execute a single non-phi instruction, returning the successor if
/// the instruction was a terminator.
fn execute_instr<S: TraceSource>(
    function: &Function,
    instr: &Instr,
    frame: &mut LocalFrame,
    session: &mut Session<S>,
    site: &dyn Fn() -> Site,
) -> Result<Option<Successor>, ExecError> {
    use Opcode::*;
    match instr.opcode {
        Call => match instr.operand(0) {
            Some(Operand::Function(callee)) => {
                if !session.config.is_record_call(callee) {
                    return Err(ExecError::UnknownCallTarget { site: site(), callee: callee.clone() });
                }
                frame.record(Event::Marker(callee.clone()))
            }
            Some(indirect) => {
                return Err(ExecError::UnknownCallTarget { site: site(), callee: indirect.to_string() })
            }
            None => return Err(malformed(site, "call without a callee")),
        },

        // Stack slots are never dereferenced symbolically.
        Alloca => (),

        PtrToInt => {
            let op = operand(instr, 0, site)?;
            let value = if frame.is_env_ptr(op) {
                SymValue::var(frame.env_symbol(&mut session.ctx, &session.config.env_name))
            } else {
                resolve(op, frame.vars(), site)?
            };
            frame.bind(instr.id, value)
        }

        IntToPtr | BitCast => {
            let value = resolve(operand(instr, 0, site)?, frame.vars(), site)?;
            frame.bind(instr.id, value)
        }

        Load => {
            let entry = session.cursor.expect(EntryKind::Load)?;
            if session.config.is_tagged(instr) {
                match session.config.tagged_loads {
                    TaggedLoads::Skip => {
                        log!(log::MEMORY, format!("Skipping tagged load from {:#x}", entry.address))
                    }
                    TaggedLoads::Abort => {
                        return Err(ExecError::UnsupportedTaggedLoad { site: site(), address: entry.address })
                    }
                }
            } else {
                check_alignment(entry.address, site)?;
                let value = session.memory.read(entry.address);
                log!(log::MEMORY, format!("Load {:#x} -> {}", entry.address, value));
                frame.record(Event::ReadMem { address: entry.address, value: value.clone() });
                frame.bind(instr.id, value)
            }
        }

        Store => {
            let entry = session.cursor.expect(EntryKind::Store)?;
            check_alignment(entry.address, site)?;
            let value = resolve(operand(instr, 0, site)?, frame.vars(), site)?;
            log!(log::MEMORY, format!("Store {:#x} <- {}", entry.address, value));
            frame.record(Event::WriteMem { address: entry.address, value: value.clone() });
            session.memory.write(entry.address, value)
        }

        Add => {
            let lhs = resolve(operand(instr, 0, site)?, frame.vars(), site)?;
            let rhs = resolve(operand(instr, 1, site)?, frame.vars(), site)?;
            frame.bind(instr.id, lhs.add(&rhs))
        }

        // Phis are evaluated together on block entry.
        Phi => return Err(malformed(site, "phi after the start of a block")),

        Ret | Br | Switch | IndirectBr | Unreachable | Invoke | Resume | CleanupRet | CatchRet | CatchSwitch
        | CallBr => return execute_terminator(function, instr, frame, site),

        FNeg | FAdd | Sub | FSub | Mul | FMul | UDiv | SDiv | FDiv | URem | SRem | FRem | Shl | LShr | AShr | And
        | Or | Xor | GetElementPtr | Fence | AtomicCmpXchg | AtomicRMW | Trunc | ZExt | SExt | FPToUI | FPToSI
        | UIToFP | SIToFP | FPTrunc | FPExt | AddrSpaceCast | ICmp | FCmp | Select | UserOp1 | UserOp2 | VAArg
        | ExtractElement | InsertElement | ShuffleVector | ExtractValue | InsertValue | LandingPad | CleanupPad
        | CatchPad | Freeze => return Err(ExecError::UnimplementedOpcode { site: site(), opcode: instr.opcode }),
    }
    Ok(None)
}

/// Execute one basic block, returning where control goes next.
///
/// Unless it is the entry block (which is announced by the function
/// entry marker, see [`ReplayConfig::entry_block_marker`]) the block
/// must begin with a basic-block entry in the trace, which is checked
/// before any instruction runs.
pub fn execute_block<S: TraceSource>(
    function: &Function,
    id: BlockId,
    frame: &mut LocalFrame,
    session: &mut Session<S>,
) -> Result<Successor, ExecError> {
    let block = function.block(id).ok_or_else(|| ExecError::UnknownBlock { function: function.name.clone(), block: id })?;

    if id != function.entry() || session.config.entry_block_marker {
        session.cursor.expect(EntryKind::Bb)?;
    }
    log!(log::BLOCK, format!("{}: entering block {}", function.name, block.name));
    frame.enter_block(block);

    // All phis read their incoming values before any of them is bound.
    let phis = block.instrs.iter().take_while(|instr| instr.opcode == Opcode::Phi).count();
    let mut incoming = Vec::with_capacity(phis);
    for instr in &block.instrs[..phis] {
        let site = || Site::new(function, block, instr);
        incoming.push((instr.id, phi_value(instr, frame, &site)?))
    }
    for (id, value) in incoming {
        frame.bind(id, value)
    }

    let last = block.instrs.len().saturating_sub(1);
    for (i, instr) in block.instrs.iter().enumerate().skip(phis) {
        let site = || Site::new(function, block, instr);
        if instr.opcode.is_terminator() && i != last {
            return Err(malformed(&site, "terminator before the end of a block"));
        }
        if let Some(successor) = execute_instr(function, instr, frame, session, &site)? {
            frame.leave_block(id);
            return Ok(successor);
        }
    }

    Err(ExecError::MissingTerminator { function: function.name.clone(), block: block.name.clone() })
}

/// Replay one invocation of a function, starting from its entry block
/// and following successors until it returns.
pub fn execute_function<S: TraceSource>(function: &Function, session: &mut Session<S>) -> Result<Invocation, ExecError> {
    let mut frame = LocalFrame::new(function);
    let mut current = function.entry();
    loop {
        match execute_block(function, current, &mut frame, session)? {
            Successor::Goto(next) => current = next,
            Successor::Return => return Ok(frame.into_invocation()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::trace::TraceEntry;

    fn session(entries: Vec<TraceEntry>) -> Session<VecDeque<TraceEntry>> {
        Session::new(entries.into_iter().collect(), ReplayConfig::new().unwrap())
    }

    fn single_block(instrs: Vec<Instr>) -> Function {
        Function::new("tb-0-0", 1, vec![Block::new("entry", instrs)])
    }

    fn ret(id: u32) -> Instr {
        Instr::new(id, Opcode::Ret, vec![])
    }

    fn no_site() -> Site {
        Site { function: "f".to_string(), block: "b".to_string(), instr: InstrId(0) }
    }

    #[test]
    fn resolve_operands() {
        let mut vars = Bindings::new();
        vars.insert(InstrId(1), SymValue::Concrete(7));

        assert_eq!(resolve(&Operand::instr(1), &vars, &no_site).unwrap(), SymValue::Concrete(7));
        assert_eq!(
            resolve(&Operand::Const { bits: u64::MAX, width: 8 }, &vars, &no_site).unwrap(),
            SymValue::Concrete(0xff)
        );
        assert_eq!(resolve(&Operand::Const { bits: 1, width: 1 }, &vars, &no_site).unwrap(), SymValue::Concrete(1));
        assert!(matches!(
            resolve(&Operand::instr(2), &vars, &no_site),
            Err(ExecError::UnboundOperand { operand: InstrId(2), .. })
        ));
        assert!(matches!(
            resolve(&Operand::Arg(0), &vars, &no_site),
            Err(ExecError::UnsupportedOperandKind { .. })
        ));
        assert!(matches!(
            resolve(&Operand::Const { bits: 0, width: 128 }, &vars, &no_site),
            Err(ExecError::UnsupportedOperandKind { .. })
        ))
    }

    #[test]
    fn environment_pointer_is_one_variable() {
        let f = single_block(vec![
            Instr::new(1, Opcode::PtrToInt, vec![Operand::Arg(0)]),
            Instr::new(2, Opcode::PtrToInt, vec![Operand::Arg(0)]),
            Instr::new(3, Opcode::Add, vec![Operand::instr(1), Operand::i64(8)]),
            Instr::new(4, Opcode::Store, vec![Operand::instr(3), Operand::instr(1)]),
            Instr::new(5, Opcode::Load, vec![Operand::instr(1)]),
            ret(6),
        ]);
        let mut session = session(vec![TraceEntry::store(0x100), TraceEntry::load(0x100)]);
        let invocation = execute_function(&f, &mut session).unwrap();

        let env = invocation.env.unwrap();
        assert_eq!(invocation.binding(1), Some(&SymValue::var(env)));
        assert_eq!(invocation.binding(2), Some(&SymValue::var(env)));
        assert!(invocation.binding(3).unwrap().is_symbolic());
        assert_eq!(invocation.binding(5), invocation.binding(3));
        assert_eq!(session.ctx.declared(), 1);
        assert_eq!(session.ctx.name(env), Some("env"))
    }

    #[test]
    fn casts_pass_values_through() {
        let f = single_block(vec![
            Instr::new(1, Opcode::IntToPtr, vec![Operand::i64(0x1000)]),
            Instr::new(2, Opcode::BitCast, vec![Operand::instr(1)]),
            Instr::new(3, Opcode::PtrToInt, vec![Operand::instr(2)]),
            ret(4),
        ]);
        let invocation = execute_function(&f, &mut session(vec![])).unwrap();
        assert_eq!(invocation.binding(3), Some(&SymValue::Concrete(0x1000)));
        assert_eq!(invocation.env, None)
    }

    #[test]
    fn misaligned_store_leaves_memory_untouched() {
        let f = single_block(vec![Instr::new(1, Opcode::Store, vec![Operand::i64(1), Operand::instr(0)]), ret(2)]);
        let mut session = session(vec![TraceEntry::store(0x104)]);
        match execute_function(&f, &mut session) {
            Err(ExecError::MisalignedAccess { address: 0x104, site }) => assert_eq!(site.instr, InstrId(1)),
            other => panic!("unexpected {:?}", other),
        }
        assert!(session.memory.is_empty())
    }

    #[test]
    fn misaligned_load() {
        let f = single_block(vec![Instr::new(1, Opcode::Load, vec![Operand::instr(0)]), ret(2)]);
        let mut session = session(vec![TraceEntry::load(0x13)]);
        assert!(matches!(execute_function(&f, &mut session), Err(ExecError::MisalignedAccess { address: 0x13, .. })))
    }

    #[test]
    fn tagged_loads() {
        let f = single_block(vec![
            Instr::new(1, Opcode::Load, vec![Operand::instr(0)]).with_metadata("host", &["rrupdate"]),
            ret(2),
        ]);

        // Skipped loads still consume their entry, but bind nothing and
        // are not checked for alignment.
        let mut skip = session(vec![TraceEntry::load(0x13)]);
        let invocation = execute_function(&f, &mut skip).unwrap();
        assert_eq!(invocation.binding(1), None);
        assert_eq!(skip.cursor.consumed(), 1);

        let mut abort = session(vec![TraceEntry::load(0x10)]);
        abort.config.tagged_loads = TaggedLoads::Abort;
        assert!(matches!(
            execute_function(&f, &mut abort),
            Err(ExecError::UnsupportedTaggedLoad { address: 0x10, .. })
        ));

        // A skipped load still has to match the trace.
        let mut desync = session(vec![TraceEntry::store(0x10)]);
        assert!(matches!(execute_function(&f, &mut desync), Err(ExecError::TraceDesync { .. })))
    }

    #[test]
    fn calls() {
        let f = single_block(vec![
            Instr::new(1, Opcode::Call, vec![Operand::Function("record_store".to_string()), Operand::i64(0)]),
            Instr::new(2, Opcode::Alloca, vec![Operand::i64(1)]),
            ret(3),
        ]);
        let invocation = execute_function(&f, &mut session(vec![])).unwrap();
        assert!(invocation.events.contains(&Event::Marker("record_store".to_string())));

        let f = single_block(vec![Instr::new(1, Opcode::Call, vec![Operand::Function("helper_div".to_string())]), ret(2)]);
        match execute_function(&f, &mut session(vec![])) {
            Err(ExecError::UnknownCallTarget { callee, .. }) => assert_eq!(callee, "helper_div"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unimplemented_opcodes() {
        let f = single_block(vec![Instr::new(1, Opcode::Sub, vec![Operand::i64(1), Operand::i64(1)]), ret(2)]);
        assert!(matches!(
            execute_function(&f, &mut session(vec![])),
            Err(ExecError::UnimplementedOpcode { opcode: Opcode::Sub, .. })
        ));

        let f = single_block(vec![Instr::new(1, Opcode::Resume, vec![])]);
        assert!(matches!(
            execute_function(&f, &mut session(vec![])),
            Err(ExecError::UnimplementedOpcode { opcode: Opcode::Resume, .. })
        ))
    }

    fn diamond(branch: Instr) -> Function {
        Function::new(
            "tb-0-0",
            1,
            vec![
                Block::new("entry", vec![Instr::new(1, Opcode::Add, vec![Operand::i64(2), Operand::i64(3)]), branch]),
                Block::new("left", vec![Instr::new(10, Opcode::Br, vec![Operand::block(3)])]),
                Block::new("right", vec![Instr::new(20, Opcode::Br, vec![Operand::block(3)])]),
                Block::new(
                    "join",
                    vec![
                        Instr::new(
                            30,
                            Opcode::Phi,
                            vec![Operand::i64(100), Operand::block(1), Operand::i64(200), Operand::block(2)],
                        ),
                        ret(31),
                    ],
                ),
            ],
        )
    }

    fn taken(f: &Function) -> Result<Option<SymValue>, ExecError> {
        let mut session = session(vec![TraceEntry::block(), TraceEntry::block()]);
        let invocation = execute_function(f, &mut session)?;
        Ok(invocation.binding(30).cloned())
    }

    #[test]
    fn conditional_branches() {
        let br = |cond| Instr::new(2, Opcode::Br, vec![cond, Operand::block(1), Operand::block(2)]);
        assert_eq!(taken(&diamond(br(Operand::Const { bits: 1, width: 1 }))).unwrap(), Some(SymValue::Concrete(100)));
        assert_eq!(taken(&diamond(br(Operand::Const { bits: 0, width: 1 }))).unwrap(), Some(SymValue::Concrete(200)));
        assert_eq!(taken(&diamond(br(Operand::instr(1)))).unwrap(), Some(SymValue::Concrete(100)))
    }

    #[test]
    fn symbolic_condition() {
        let f = Function::new(
            "tb-0-0",
            1,
            vec![
                Block::new(
                    "entry",
                    vec![
                        Instr::new(1, Opcode::PtrToInt, vec![Operand::Arg(0)]),
                        Instr::new(2, Opcode::Br, vec![Operand::instr(1), Operand::block(1), Operand::block(1)]),
                    ],
                ),
                Block::new("exit", vec![ret(3)]),
            ],
        );
        match execute_function(&f, &mut session(vec![TraceEntry::block()])) {
            Err(ExecError::UnresolvedBranchCondition { condition, .. }) => assert_eq!(condition, "v0"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn switches() {
        let switch = |value| {
            Instr::new(
                2,
                Opcode::Switch,
                vec![
                    Operand::i64(value),
                    Operand::block(2),
                    Operand::Const { bits: 5, width: 32 },
                    Operand::block(1),
                ],
            )
        };
        assert_eq!(taken(&diamond(switch(5))).unwrap(), Some(SymValue::Concrete(100)));
        assert_eq!(taken(&diamond(switch(6))).unwrap(), Some(SymValue::Concrete(200)))
    }

    #[test]
    fn indirect_branches() {
        let indirect = |index| Instr::new(2, Opcode::IndirectBr, vec![Operand::i64(index), Operand::block(1), Operand::block(2)]);
        assert_eq!(taken(&diamond(indirect(1))).unwrap(), Some(SymValue::Concrete(200)));
        assert!(matches!(taken(&diamond(indirect(2))), Err(ExecError::MalformedInstruction { .. })))
    }

    #[test]
    fn phis_read_before_binding() {
        // A loop whose header swaps two values on the back edge.
        let f = Function::new(
            "tb-0-0",
            1,
            vec![
                Block::new("entry", vec![Instr::new(0, Opcode::Br, vec![Operand::block(1)])]),
                Block::new(
                    "loop",
                    vec![
                        Instr::new(1, Opcode::Phi, vec![Operand::i64(1), Operand::block(0), Operand::instr(2), Operand::block(1)]),
                        Instr::new(2, Opcode::Phi, vec![Operand::i64(2), Operand::block(0), Operand::instr(1), Operand::block(1)]),
                        Instr::new(3, Opcode::Load, vec![Operand::i64(0x10)]),
                        Instr::new(4, Opcode::Switch, vec![Operand::instr(3), Operand::block(2), Operand::i64(0), Operand::block(1)]),
                    ],
                ),
                Block::new("exit", vec![ret(5)]),
            ],
        );
        let mut session = session(vec![
            TraceEntry::block(),
            TraceEntry::load(0x10),
            TraceEntry::block(),
            TraceEntry::load(0x10),
        ]);
        session.memory.write(0x10, SymValue::Concrete(0));

        let mut frame = LocalFrame::new(&f);
        assert_eq!(execute_block(&f, BlockId(0), &mut frame, &mut session).unwrap(), Successor::Goto(BlockId(1)));
        assert_eq!(execute_block(&f, BlockId(1), &mut frame, &mut session).unwrap(), Successor::Goto(BlockId(1)));
        // Second time around the loop the load returns 1 and we leave.
        session.memory.write(0x10, SymValue::Concrete(1));
        assert_eq!(execute_block(&f, BlockId(1), &mut frame, &mut session).unwrap(), Successor::Goto(BlockId(2)));
        let invocation = frame.into_invocation();
        assert_eq!(invocation.binding(1), Some(&SymValue::Concrete(2)));
        assert_eq!(invocation.binding(2), Some(&SymValue::Concrete(1)))
    }

    #[test]
    fn malformed_blocks() {
        let f = single_block(vec![ret(1), Instr::new(2, Opcode::Add, vec![Operand::i64(1), Operand::i64(1)])]);
        assert!(matches!(execute_function(&f, &mut session(vec![])), Err(ExecError::MalformedInstruction { .. })));

        let f = single_block(vec![Instr::new(1, Opcode::Add, vec![Operand::i64(1), Operand::i64(1)])]);
        assert!(matches!(execute_function(&f, &mut session(vec![])), Err(ExecError::MissingTerminator { .. })));

        let f = single_block(vec![Instr::new(1, Opcode::Br, vec![Operand::block(0)])]);
        assert!(matches!(execute_function(&f, &mut session(vec![])), Err(ExecError::MalformedInstruction { .. })));

        let f = single_block(vec![Instr::new(1, Opcode::Br, vec![Operand::block(9)])]);
        assert!(matches!(
            execute_function(&f, &mut session(vec![TraceEntry::block()])),
            Err(ExecError::UnknownBlock { block: BlockId(9), .. })
        ));

        let f = Function::new("tb-0-0", 1, vec![]);
        assert!(matches!(execute_function(&f, &mut session(vec![])), Err(ExecError::UnknownBlock { .. })))
    }

    #[test]
    fn unreachable() {
        let f = single_block(vec![Instr::new(1, Opcode::Unreachable, vec![])]);
        assert!(matches!(execute_function(&f, &mut session(vec![])), Err(ExecError::UnreachableExecuted { .. })))
    }

    #[test]
    fn entry_block_marker() {
        let f = single_block(vec![ret(1)]);

        let mut session = session(vec![TraceEntry::block()]);
        session.config.entry_block_marker = true;
        let invocation = execute_function(&f, &mut session).unwrap();
        assert_eq!(invocation.blocks, 1);
        assert_eq!(session.cursor.consumed(), 1);

        let mut missing = self::session(vec![TraceEntry::load(0)]);
        missing.config.entry_block_marker = true;
        assert!(matches!(
            execute_function(&f, &mut missing),
            Err(ExecError::TraceDesync { expected: EntryKind::Bb, found: EntryKind::Load, .. })
        ))
    }
}

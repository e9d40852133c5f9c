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

use std::fmt;

use crate::smt::smtlib::{self, Exp};
use crate::smt::Sym;

/// The value bound to an SSA name during replay. Arithmetic between
/// two concrete values stays concrete, anything touching a symbolic
/// operand is symbolic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SymValue {
    Concrete(u64),
    Symbolic(Exp),
}

impl SymValue {
    pub fn var(sym: Sym) -> Self {
        SymValue::Symbolic(Exp::Var(sym))
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(self, SymValue::Symbolic(_))
    }

    pub fn as_concrete(&self) -> Option<u64> {
        match self {
            SymValue::Concrete(bits) => Some(*bits),
            SymValue::Symbolic(_) => None,
        }
    }

    pub fn to_exp(&self) -> Exp {
        match self {
            SymValue::Concrete(bits) => Exp::Bits64(*bits, 64),
            SymValue::Symbolic(exp) => exp.clone(),
        }
    }

    /// Modular 64-bit addition.
    pub fn add(&self, other: &SymValue) -> SymValue {
        use SymValue::*;
        match (self, other) {
            (Concrete(lhs), Concrete(rhs)) => Concrete(lhs.wrapping_add(*rhs)),
            (lhs, rhs) => Symbolic(Exp::Bvadd(Box::new(lhs.to_exp()), Box::new(rhs.to_exp()))),
        }
    }
}

impl fmt::Display for SymValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymValue::Concrete(bits) => smtlib::write_bits64(f, *bits, 64),
            SymValue::Symbolic(exp) => write!(f, "{}", exp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concrete_addition_wraps() {
        let cases = [(0, 0), (1, 2), (u64::MAX, 1), (u64::MAX, u64::MAX), (0x8000_0000_0000_0000, 0x8000_0000_0000_0000)];
        for (x, y) in cases.iter() {
            assert_eq!(SymValue::Concrete(*x).add(&SymValue::Concrete(*y)), SymValue::Concrete(x.wrapping_add(*y)))
        }
    }

    #[test]
    fn symbolic_addition_stays_symbolic() {
        let env = SymValue::var(Sym::from_u32(0));
        let zero = SymValue::Concrete(0);

        let lhs = env.add(&zero);
        let rhs = zero.add(&env);
        let both = env.add(&env);

        for v in [&lhs, &rhs, &both] {
            assert!(v.is_symbolic());
            assert_eq!(v.as_concrete(), None)
        }
        assert_eq!(lhs.to_string(), "(bvadd v0 #x0000000000000000)");
        assert_eq!(rhs.to_string(), "(bvadd #x0000000000000000 v0)")
    }
}

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

//! Symbolic expressions in the style of SMTLIB. Nothing in this crate
//! talks to a solver, the expressions built here are written out for
//! downstream constraint solving.

use std::collections::HashMap;
use std::fmt;

/// A symbolic variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sym {
    id: u32,
}

impl Sym {
    pub fn from_u32(id: u32) -> Self {
        Sym { id }
    }

    pub fn id(self) -> u32 {
        self.id
    }
}

impl fmt::Display for Sym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.id)
    }
}

pub mod smtlib {
    use std::collections::HashSet;
    use std::fmt;

    use super::Sym;

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Ty {
        Bool,
        BitVec(u32),
    }

    impl fmt::Display for Ty {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            use Ty::*;
            match self {
                Bool => write!(f, "Bool"),
                BitVec(sz) => write!(f, "(_ BitVec {})", sz),
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Exp {
        Var(Sym),
        Bits64(u64, u32),
        Bvadd(Box<Exp>, Box<Exp>),
    }

    impl Exp {
        /// Collect every variable mentioned in the expression.
        pub fn variables(&self) -> HashSet<Sym> {
            let mut vars = HashSet::new();
            self.collect_variables(&mut vars);
            vars
        }

        pub fn collect_variables(&self, vars: &mut HashSet<Sym>) {
            use Exp::*;
            match self {
                Var(v) => {
                    vars.insert(*v);
                }
                Bits64(_, _) => (),
                Bvadd(lhs, rhs) => {
                    lhs.collect_variables(vars);
                    rhs.collect_variables(vars)
                }
            }
        }
    }

    pub(crate) fn write_bits64(f: &mut fmt::Formatter<'_>, bits: u64, len: u32) -> fmt::Result {
        if len % 4 == 0 {
            write!(f, "#x{:0width$x}", bits, width = (len / 4) as usize)
        } else {
            write!(f, "#b{:0width$b}", bits, width = len as usize)
        }
    }

    impl fmt::Display for Exp {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            use Exp::*;
            match self {
                Var(v) => write!(f, "{}", v),
                Bits64(bits, len) => write_bits64(f, *bits, *len),
                Bvadd(lhs, rhs) => write!(f, "(bvadd {} {})", lhs, rhs),
            }
        }
    }

    #[derive(Clone, Debug)]
    pub enum Def {
        DeclareConst(Sym, Ty),
    }

    impl fmt::Display for Def {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Def::DeclareConst(v, ty) => write!(f, "(declare-const {} {})", v, ty),
            }
        }
    }
}

use smtlib::{Def, Ty};

/// The session-wide source of fresh symbolic variables. Every
/// variable that appears in an expression built during a replay was
/// declared here, along with a human readable name.
#[derive(Default)]
pub struct Context {
    next_var: u32,
    defs: Vec<Def>,
    names: HashMap<Sym, String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh(&mut self) -> Sym {
        let sym = Sym::from_u32(self.next_var);
        self.next_var += 1;
        sym
    }

    pub fn declare_const(&mut self, name: &str, ty: Ty) -> Sym {
        let sym = self.fresh();
        self.defs.push(Def::DeclareConst(sym, ty));
        self.names.insert(sym, name.to_string());
        sym
    }

    pub fn defs(&self) -> &[Def] {
        &self.defs
    }

    pub fn name(&self, sym: Sym) -> Option<&str> {
        self.names.get(&sym).map(String::as_str)
    }

    pub fn declared(&self) -> usize {
        self.defs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::smtlib::*;
    use super::*;

    #[test]
    fn fresh_symbols_are_distinct() {
        let mut ctx = Context::new();
        let a = ctx.declare_const("env", Ty::BitVec(64));
        let b = ctx.declare_const("env", Ty::BitVec(64));
        assert_ne!(a, b);
        assert_eq!(ctx.declared(), 2);
        assert_eq!(ctx.name(b), Some("env"));
        assert_eq!(format!("{}", ctx.defs()[0]), "(declare-const v0 (_ BitVec 64))")
    }

    #[test]
    fn expression_printing() {
        let exp = Exp::Bvadd(Box::new(Exp::Var(Sym::from_u32(3))), Box::new(Exp::Bits64(8, 64)));
        assert_eq!(exp.to_string(), "(bvadd v3 #x0000000000000008)");
        assert_eq!(Exp::Bits64(5, 3).to_string(), "#b101");
        assert!(exp.variables().contains(&Sym::from_u32(3)))
    }
}

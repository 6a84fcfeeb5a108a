//! Interning of external terms and literals into the compact integer
//! representation used by the inference core.
//!
//! Constants (including whole array and map terms) are assigned positive
//! integers counting up from 1; variables negative integers counting down
//! from -1. A literal becomes a vector `[pred, arg1, ..., argN]`; a clause
//! a vector of such vectors, head first. The factory keeps both directions
//! so every internal vector can be externalized at the boundary.

use std::collections::HashMap;

use crate::error::TermError;
use crate::term::{Clause, Literal, RuleKind, Term};

/// An interned symbol: positive for constants, negative for variables.
pub type Sym = i64;

/// An internal literal: `[pred, args...]`.
pub type IntLit = Vec<Sym>;

/// An internal clause: list of internal literals, head first.
pub type IntClause = Vec<IntLit>;

/// Bidirectional interner for terms, literals, and clauses.
#[derive(Debug)]
pub struct TermFactory {
    sym_to_int: HashMap<Term, Sym>,
    int_to_sym: HashMap<Sym, Term>,
    lit_to_int: HashMap<Literal, IntLit>,
    int_to_lit: HashMap<IntLit, Literal>,
    const_count: Sym,
    var_count: Sym,
}

impl Default for TermFactory {
    fn default() -> Self {
        TermFactory::new()
    }
}

impl TermFactory {
    pub fn new() -> Self {
        TermFactory {
            sym_to_int: HashMap::new(),
            int_to_sym: HashMap::new(),
            lit_to_int: HashMap::new(),
            int_to_lit: HashMap::new(),
            const_count: 1,
            var_count: -1,
        }
    }

    /// Reset all interning state. Used on engine reset.
    pub fn clear(&mut self) {
        self.sym_to_int.clear();
        self.int_to_sym.clear();
        self.lit_to_int.clear();
        self.int_to_lit.clear();
        self.const_count = 1;
        self.var_count = -1;
    }

    /// Intern a single term, reusing its integer when already known.
    /// Variables get negative integers; everything else (including whole
    /// arrays and maps) is treated as a constant symbol.
    pub fn intern_term(&mut self, term: &Term) -> Sym {
        if let Some(&i) = self.sym_to_int.get(term) {
            return i;
        }
        let i = if term.is_var() {
            let i = self.var_count;
            self.var_count -= 1;
            i
        } else {
            let i = self.const_count;
            self.const_count += 1;
            i
        };
        self.sym_to_int.insert(term.clone(), i);
        self.int_to_sym.insert(i, term.clone());
        i
    }

    /// The integer for a term already known to the factory.
    pub fn get_int(&self, term: &Term) -> Option<Sym> {
        self.sym_to_int.get(term).copied()
    }

    /// The external term for an internal symbol.
    ///
    /// Unknown negative integers are byproducts of variables synthesized
    /// during inference and materialize as a fresh `X<n>` variable. Unknown
    /// positive integers are a programmer error.
    pub fn symbol(&self, i: Sym) -> Result<Term, TermError> {
        if let Some(term) = self.int_to_sym.get(&i) {
            return Ok(term.clone());
        }
        if i < 0 {
            Ok(Term::Var(format!("X{i}")))
        } else {
            Err(TermError::UnknownSymbol { symbol: i })
        }
    }

    /// The external term for an internal symbol, when known.
    pub fn term_for(&self, i: Sym) -> Option<&Term> {
        self.int_to_sym.get(&i)
    }

    /// Intern a literal into `[pred, args...]`, caching both directions.
    pub fn intern_literal(&mut self, lit: &Literal) -> IntLit {
        if let Some(vec) = self.lit_to_int.get(lit) {
            return vec.clone();
        }
        let mut internal = Vec::with_capacity(1 + lit.args.len());
        internal.push(self.intern_term(&lit.pred));
        for arg in &lit.args {
            internal.push(self.intern_term(arg));
        }
        self.lit_to_int.insert(lit.clone(), internal.clone());
        self.int_to_lit.insert(internal.clone(), lit.clone());
        internal
    }

    /// Intern a clause: head first, then each body literal.
    pub fn intern_clause(&mut self, clause: &Clause) -> IntClause {
        let mut internal = Vec::with_capacity(1 + clause.body.len());
        internal.push(self.intern_literal(&clause.head));
        for lit in &clause.body {
            internal.push(self.intern_literal(lit));
        }
        internal
    }

    /// Externalize an internal literal.
    ///
    /// Cache hits return the stored literal; misses (literals synthesized
    /// during inference) are reconstructed symbol by symbol.
    pub fn externalize_literal(&self, internal: &IntLit) -> Result<Literal, TermError> {
        if let Some(lit) = self.int_to_lit.get(internal) {
            return Ok(lit.clone());
        }
        let mut iter = internal.iter();
        let pred = match iter.next() {
            Some(&p) => self.symbol(p)?,
            None => {
                return Err(TermError::BadPredicate {
                    term: "<empty literal>".into(),
                });
            }
        };
        let args = iter
            .map(|&a| self.symbol(a))
            .collect::<Result<Vec<_>, _>>()?;
        Literal::with_pred(pred, args)
    }

    /// Externalize each literal of an internal clause.
    pub fn externalize_clause(&self, internal: &IntClause) -> Result<Clause, TermError> {
        let mut lits = internal
            .iter()
            .map(|l| self.externalize_literal(l))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter();
        let head = lits.next().ok_or(TermError::BadPredicate {
            term: "<empty clause>".into(),
        })?;
        let body: Vec<Literal> = lits.collect();
        Ok(Clause {
            head,
            kind: if body.is_empty() {
                RuleKind::Fact
            } else {
                RuleKind::Derivation
            },
            body,
        })
    }

    /// Human-readable Datalog rendering of an internal clause, for logs and
    /// explanations.
    pub fn readable_clause(&self, internal: &IntClause) -> String {
        match self.externalize_clause(internal) {
            Ok(clause) => clause.to_string(),
            Err(_) => format!("{internal:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(pred: &str, args: Vec<Term>) -> Literal {
        Literal::new(pred, args)
    }

    #[test]
    fn constants_count_up_variables_down() {
        let mut f = TermFactory::new();
        let p = f.intern_term(&Term::id("p"));
        let a = f.intern_term(&Term::id("a"));
        let x = f.intern_term(&Term::var("X"));
        let y = f.intern_term(&Term::var("Y"));
        assert_eq!(p, 1);
        assert_eq!(a, 2);
        assert_eq!(x, -1);
        assert_eq!(y, -2);
    }

    #[test]
    fn interning_is_idempotent() {
        let mut f = TermFactory::new();
        let first = f.intern_literal(&lit("p", vec![Term::id("a"), Term::var("X")]));
        let second = f.intern_literal(&lit("p", vec![Term::id("a"), Term::var("X")]));
        assert_eq!(first, second);
    }

    #[test]
    fn shared_symbols_are_reused_across_literals() {
        let mut f = TermFactory::new();
        let l1 = f.intern_literal(&lit("p", vec![Term::id("a")]));
        let l2 = f.intern_literal(&lit("q", vec![Term::id("a")]));
        assert_eq!(l1[1], l2[1]);
    }

    #[test]
    fn externalize_round_trips() {
        let mut f = TermFactory::new();
        let external = lit(
            "p",
            vec![
                Term::id("a"),
                Term::var("X"),
                Term::array(vec![Term::int(1), Term::int(2)]),
            ],
        );
        let internal = f.intern_literal(&external);
        assert_eq!(f.externalize_literal(&internal).unwrap(), external);
    }

    #[test]
    fn externalize_reconstructs_synthesized_literals() {
        let mut f = TermFactory::new();
        let internal = f.intern_literal(&lit("p", vec![Term::var("X"), Term::id("a")]));
        // a vector never interned as a whole: swap the argument order
        let synthesized = vec![internal[0], internal[2], internal[1]];
        let external = f.externalize_literal(&synthesized).unwrap();
        assert_eq!(external, lit("p", vec![Term::id("a"), Term::var("X")]));
    }

    #[test]
    fn unseen_negative_becomes_fresh_variable() {
        let mut f = TermFactory::new();
        let internal = f.intern_literal(&lit("p", vec![Term::id("a")]));
        let shifted = vec![internal[0], -41];
        let external = f.externalize_literal(&shifted).unwrap();
        assert_eq!(external.args[0], Term::var("X-41"));
    }

    #[test]
    fn unseen_positive_is_an_error() {
        let f = TermFactory::new();
        assert!(matches!(
            f.symbol(99),
            Err(TermError::UnknownSymbol { symbol: 99 })
        ));
    }

    #[test]
    fn clause_interning_head_first() {
        let mut f = TermFactory::new();
        let clause = Clause::derivation(
            lit("p", vec![Term::var("X")]),
            vec![lit("q", vec![Term::var("X")])],
        );
        let internal = f.intern_clause(&clause);
        assert_eq!(internal.len(), 2);
        assert_eq!(internal[0][1], internal[1][1]);
        assert_eq!(f.readable_clause(&internal), "p(X) :- q(X).");
    }

    #[test]
    fn clear_resets_counters() {
        let mut f = TermFactory::new();
        f.intern_term(&Term::id("a"));
        f.intern_term(&Term::var("X"));
        f.clear();
        assert_eq!(f.intern_term(&Term::id("b")), 1);
        assert_eq!(f.intern_term(&Term::var("Y")), -1);
    }
}

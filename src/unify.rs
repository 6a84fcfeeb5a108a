//! Unification and substitution over the internal integer representation.
//!
//! A substitution maps variables (negative integers) to symbols, kept in a
//! sorted map for canonical form. Callers guarantee variable disjointness of
//! the two literals before unifying, using [`offset`] and [`shift_literal`].
//!
//! No occurs check is needed at this level: internal variables bind to flat
//! symbols, never to structure. Structured terms only appear behind positive
//! constants, and [`crate::term::Term::unify`] checks occurrence when those
//! are unified externally.

use std::collections::BTreeMap;

use crate::factory::{IntClause, IntLit, Sym, TermFactory};
use crate::term::Term;

/// A substitution over internal symbols, sorted by variable.
pub type IntSubst = BTreeMap<Sym, Sym>;

/// A literal is ground when every integer in it is positive.
pub fn is_ground(literal: &[Sym]) -> bool {
    literal.iter().all(|&x| x > 0)
}

/// A clause is a fact when it consists of the head only.
pub fn is_fact(clause: &IntClause) -> bool {
    clause.len() == 1
}

/// The offset of a clause: its lowest negative integer, or 0 when the
/// clause has no variables.
pub fn offset(clause: &IntClause) -> Sym {
    clause
        .iter()
        .flat_map(|lit| lit.iter().copied())
        .min()
        .filter(|&m| m < 0)
        .unwrap_or(0)
}

/// Shift the variables of a literal by `off` (a nonpositive integer),
/// leaving constants untouched.
pub fn shift_literal(literal: &[Sym], off: Sym) -> IntLit {
    literal
        .iter()
        .map(|&x| if x < 0 { x + off } else { x })
        .collect()
}

/// Unify two internal literals with disjoint variable sets.
///
/// Returns `None` on predicate, arity, or constant clash, otherwise the
/// substitution making them equal.
pub fn unify(l1: &[Sym], l2: &[Sym]) -> Option<IntSubst> {
    if l1.first() != l2.first() || l1.len() != l2.len() {
        return None;
    }
    if l1.is_empty() {
        return Some(IntSubst::new());
    }
    // variant of the standard solved-form algorithm: pop an equality, bind
    // the variable side, and rewrite the remaining pairs with the binding
    let mut equalities: Vec<(Sym, Sym)> = l1[1..]
        .iter()
        .zip(l2[1..].iter())
        .map(|(&a, &b)| (a, b))
        .collect();
    let mut bindings: Vec<(Sym, Sym)> = Vec::new();
    while let Some((first, second)) = equalities.pop() {
        if first == second {
            continue;
        }
        if first >= 0 && second >= 0 {
            return None;
        }
        let (var, val) = if first < 0 {
            (first, second)
        } else {
            (second, first)
        };
        rewrite(&mut equalities, var, val);
        rewrite(&mut bindings, var, val);
        bindings.push((var, val));
    }
    Some(bindings.into_iter().collect())
}

fn rewrite(pairs: &mut [(Sym, Sym)], from: Sym, to: Sym) {
    for (a, b) in pairs.iter_mut() {
        if *a == from {
            *a = to;
        } else if *b == from {
            *b = to;
        }
    }
}

/// Substitute one internal symbol. Array constants are rebuilt element by
/// element through the factory, so a substitution can reach inside a list
/// argument.
pub fn substitute(subst: &IntSubst, i: Sym, factory: &mut TermFactory) -> Sym {
    let mut value = i;
    if i < 0 {
        if let Some(&mapped) = subst.get(&i) {
            value = mapped;
        }
    }
    if value <= 0 {
        return value;
    }
    let elems = match factory.term_for(value) {
        Some(Term::Array(elems)) => elems.clone(),
        _ => return value,
    };
    let mut new_elems = Vec::with_capacity(elems.len());
    for elem in &elems {
        let j = factory.intern_term(elem);
        let sub = if j < 0 {
            subst.get(&j).copied().unwrap_or(j)
        } else {
            substitute(subst, j, factory)
        };
        match factory.term_for(sub) {
            Some(term) => new_elems.push(term.clone()),
            None => new_elems.push(Term::Var(format!("X{sub}"))),
        }
    }
    factory.intern_term(&Term::Array(new_elems))
}

/// Apply a substitution to every symbol of a literal.
pub fn apply_to_literal(subst: &IntSubst, literal: &[Sym], factory: &mut TermFactory) -> IntLit {
    literal
        .iter()
        .map(|&i| substitute(subst, i, factory))
        .collect()
}

/// Apply a substitution to every literal of a clause.
pub fn apply_to_clause(subst: &IntSubst, clause: &IntClause, factory: &mut TermFactory) -> IntClause {
    clause
        .iter()
        .map(|lit| apply_to_literal(subst, lit, factory))
        .collect()
}

/// Apply the substitution and drop the first body literal, yielding the
/// clause left after resolving that literal away.
pub fn remove_first_body_literal(
    clause: &IntClause,
    subst: &IntSubst,
    factory: &mut TermFactory,
) -> IntClause {
    let mut new_clause = clause.clone();
    new_clause.remove(1);
    new_clause
        .iter()
        .map(|lit| apply_to_literal(subst, lit, factory))
        .collect()
}

/// The first position where the two literals hold different variables,
/// reported as the (positive) shift distance between them. Constants and
/// agreeing variables are skipped.
fn first_variable_difference(l1: &[Sym], l2: &[Sym]) -> Sym {
    for (&a, &b) in l1.iter().zip(l2.iter()) {
        if a > 0 || b > 0 {
            continue;
        }
        if a != b {
            return (a - b).abs();
        }
    }
    0
}

/// Whether two literals are equal up to a uniform variable shift.
pub fn is_renaming(l1: &[Sym], l2: &[Sym]) -> bool {
    if l1.len() != l2.len() {
        return false;
    }
    let off = first_variable_difference(l1, l2);
    shift_literal(l1, off) == l2 || l1 == shift_literal(l2, off).as_slice()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    #[test]
    fn offset_is_lowest_variable() {
        let c = vec![vec![1, -1], vec![1, -2, -3]];
        assert_eq!(offset(&c), -3);
        let ground = vec![vec![1, 2], vec![3, 4]];
        assert_eq!(offset(&ground), 0);
    }

    #[test]
    fn shift_moves_variables_only() {
        assert_eq!(shift_literal(&[1, -1], -3), vec![1, -4]);
        assert_eq!(shift_literal(&[1, 5], -3), vec![1, 5]);
    }

    #[test]
    fn unify_binds_variables() {
        let s = unify(&[1, -1, -2], &[1, -3, 4]).unwrap();
        assert_eq!(s.get(&-2), Some(&4));
        assert_eq!(s.get(&-1), Some(&-3));
    }

    #[test]
    fn unify_repeated_variable() {
        let s = unify(&[1, -1, -1], &[1, -2, 3]).unwrap();
        assert_eq!(s.get(&-1), Some(&3));
        assert_eq!(s.get(&-2), Some(&3));
    }

    #[test]
    fn unify_fails_on_clash() {
        assert!(unify(&[1, 2], &[1, 3]).is_none());
        assert!(unify(&[1, 2], &[4, 2]).is_none());
        assert!(unify(&[1, 2], &[1, 2, 3]).is_none());
        assert!(unify(&[1, -1, -1], &[4, -2, 3]).is_none());
    }

    #[test]
    fn unify_ground_equal_is_empty() {
        let s = unify(&[1, 2, 3], &[1, 2, 3]).unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn apply_substitution_to_literal() {
        let mut factory = TermFactory::new();
        let s = unify(&[1, -1, -1, 5], &[1, -2, 3, -5]).unwrap();
        assert_eq!(apply_to_literal(&s, &[6, -1, -5], &mut factory), vec![6, 3, 5]);
    }

    #[test]
    fn apply_substitution_to_clause() {
        let mut factory = TermFactory::new();
        let mut s = IntSubst::new();
        s.insert(-1, 3);
        s.insert(-2, 3);
        let c = vec![vec![1, -1], vec![1, -2, -3]];
        assert_eq!(
            apply_to_clause(&s, &c, &mut factory),
            vec![vec![1, 3], vec![1, 3, -3]]
        );
    }

    #[test]
    fn substitution_reaches_into_arrays() {
        let mut factory = TermFactory::new();
        // p(X, [X, a])
        let lit = crate::term::Literal::new(
            "p",
            vec![
                Term::var("X"),
                Term::array(vec![Term::var("X"), Term::id("a")]),
            ],
        );
        let internal = factory.intern_literal(&lit);
        let x = factory.intern_term(&Term::var("X"));
        let a = factory.intern_term(&Term::id("a"));
        let mut s = IntSubst::new();
        s.insert(x, a);
        let substituted = apply_to_literal(&s, &internal, &mut factory);
        let external = factory.externalize_literal(&substituted).unwrap();
        assert_eq!(
            external,
            crate::term::Literal::new(
                "p",
                vec![Term::id("a"), Term::array(vec![Term::id("a"), Term::id("a")])]
            )
        );
    }

    #[test]
    fn remove_first_body_literal_resolves() {
        let mut factory = TermFactory::new();
        // p(X) :- q(X), r(X) resolved with q(a)
        let clause = vec![vec![1, -1], vec![2, -1], vec![3, -1]];
        let s = unify(&[2, 5], &[2, -1]).unwrap();
        let resolved = remove_first_body_literal(&clause, &s, &mut factory);
        assert_eq!(resolved, vec![vec![1, 5], vec![3, 5]]);
    }

    #[test]
    fn renaming_detection() {
        assert!(is_renaming(&[1, -1, -2], &[1, -3, -4]));
        assert!(is_renaming(&[1, -1, 2], &[1, -5, 2]));
        assert!(!is_renaming(&[1, -1, 2], &[1, -5, 3]));
        assert!(!is_renaming(&[1, -1], &[1, -1, -2]));
        assert!(is_renaming(&[1, 2], &[1, 2]));
    }

    #[test]
    fn ground_checks() {
        assert!(is_ground(&[1, 2, 3]));
        assert!(!is_ground(&[1, -1]));
        assert!(is_fact(&vec![vec![1, 2]]));
        assert!(!is_fact(&vec![vec![1, 2], vec![3]]));
    }
}

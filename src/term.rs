//! External data model: terms, literals, clauses, claims, and substitutions.
//!
//! These are the types that cross the engine boundary. Inference itself runs
//! on the compact integer representation produced by
//! [`crate::factory::TermFactory`]; the types here are what parsers, tool
//! wrappers, and clients see.
//!
//! All types round-trip through a compact JSON encoding tagged by variant
//! name (`__Var`, `__IdConst`, `__Literal`, ...) so logic state can be
//! persisted and exchanged with remote nodes.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TermError;

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

/// A numeric constant, integer or floating point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Num {
    Int(i64),
    Float(f64),
}

impl Eq for Num {}

impl Hash for Num {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Num::Int(i) => {
                state.write_u8(0);
                state.write_i64(*i);
            }
            Num::Float(f) => {
                state.write_u8(1);
                state.write_u64(f.to_bits());
            }
        }
    }
}

impl Num {
    pub fn as_f64(&self) -> f64 {
        match self {
            Num::Int(i) => *i as f64,
            Num::Float(f) => *f,
        }
    }
}

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Num::Int(i) => write!(f, "{i}"),
            Num::Float(x) => write!(f, "{x}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Terms
// ---------------------------------------------------------------------------

/// A Datalog+JSON term.
///
/// Terms are immutable values with structural equality; two structurally
/// equal terms are interchangeable everywhere. Map equality is keyset plus
/// per-key value equality (insertion order is irrelevant).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    /// A logic variable, identified by name (`X`, `Model`, `X-3`).
    #[serde(rename = "__Var")]
    Var(String),
    /// A bare identifier constant (`a`, `yices`, `file_ref`).
    #[serde(rename = "__IdConst")]
    IdConst(String),
    /// A quoted string constant.
    #[serde(rename = "__StringConst")]
    StringConst(String),
    /// A boolean constant.
    #[serde(rename = "__BoolConst")]
    BoolConst(bool),
    /// A numeric constant.
    #[serde(rename = "__NumberConst")]
    NumConst(Num),
    /// An ordered sequence of terms.
    #[serde(rename = "__Array")]
    Array(Vec<Term>),
    /// An unordered map from string keys to terms.
    #[serde(rename = "__Map")]
    Map(BTreeMap<String, Term>),
}

impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(name.into())
    }

    pub fn id(name: impl Into<String>) -> Self {
        Term::IdConst(name.into())
    }

    pub fn string(text: impl Into<String>) -> Self {
        Term::StringConst(text.into())
    }

    pub fn int(value: i64) -> Self {
        Term::NumConst(Num::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Term::NumConst(Num::Float(value))
    }

    pub fn bool(value: bool) -> Self {
        Term::BoolConst(value)
    }

    pub fn array(elems: Vec<Term>) -> Self {
        Term::Array(elems)
    }

    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Term)>) -> Self {
        Term::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Term::Var(_))
    }

    pub fn is_const(&self) -> bool {
        matches!(
            self,
            Term::IdConst(_) | Term::StringConst(_) | Term::BoolConst(_) | Term::NumConst(_)
        )
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Term::Array(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Term::Map(_))
    }

    /// A term is ground when it contains no variables.
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Var(_) => false,
            Term::IdConst(_) | Term::StringConst(_) | Term::BoolConst(_) | Term::NumConst(_) => {
                true
            }
            Term::Array(elems) => elems.iter().all(Term::is_ground),
            Term::Map(items) => items.values().all(Term::is_ground),
        }
    }

    /// Collect the free variable names of this term.
    pub fn free_vars(&self) -> std::collections::BTreeSet<String> {
        let mut out = std::collections::BTreeSet::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut std::collections::BTreeSet<String>) {
        match self {
            Term::Var(v) => {
                out.insert(v.clone());
            }
            Term::Array(elems) => {
                for e in elems {
                    e.collect_vars(out);
                }
            }
            Term::Map(items) => {
                for v in items.values() {
                    v.collect_vars(out);
                }
            }
            _ => {}
        }
    }

    /// Unify this term against another, returning a substitution on success.
    ///
    /// Unlike the classic presentation, an occurs check is performed: a
    /// variable never binds to a structured term containing itself. Plain
    /// Datalog never triggers it, but interpreted predicates may return
    /// arbitrarily structured terms.
    pub fn unify(&self, other: &Term) -> Option<Subst> {
        let mut bindings = Subst::new();
        let mut stack = vec![(self.clone(), other.clone())];
        while let Some((left, right)) = stack.pop() {
            let left = bindings.apply(&left);
            let right = bindings.apply(&right);
            if left == right {
                continue;
            }
            match (&left, &right) {
                (Term::Var(v), _) => {
                    if occurs(v, &right) {
                        return None;
                    }
                    bindings.bind(v.clone(), right.clone());
                }
                (_, Term::Var(v)) => {
                    if occurs(v, &left) {
                        return None;
                    }
                    bindings.bind(v.clone(), left.clone());
                }
                (Term::Array(l), Term::Array(r)) if l.len() == r.len() => {
                    for (a, b) in l.iter().zip(r.iter()) {
                        stack.push((a.clone(), b.clone()));
                    }
                }
                (Term::Map(l), Term::Map(r)) => {
                    // Only ground keys; keysets must coincide exactly.
                    if l.len() != r.len() || !l.keys().eq(r.keys()) {
                        return None;
                    }
                    for (k, v) in l {
                        stack.push((v.clone(), r[k].clone()));
                    }
                }
                _ => return None,
            }
        }
        Some(bindings)
    }
}

fn occurs(var: &str, term: &Term) -> bool {
    match term {
        Term::Var(v) => v == var,
        Term::Array(elems) => elems.iter().any(|t| occurs(var, t)),
        Term::Map(items) => items.values().any(|t| occurs(var, t)),
        _ => false,
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(v) => write!(f, "{v}"),
            Term::IdConst(c) => write!(f, "{c}"),
            Term::StringConst(s) => write!(f, "{s:?}"),
            Term::BoolConst(b) => write!(f, "{b}"),
            Term::NumConst(n) => write!(f, "{n}"),
            Term::Array(elems) => {
                write!(f, "[")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "]")
            }
            Term::Map(items) => {
                write!(f, "{{")?;
                for (i, (k, v)) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if is_id_like(k) {
                        write!(f, "{k}: {v}")?;
                    } else {
                        write!(f, "{k:?}: {v}")?;
                    }
                }
                write!(f, "}}")
            }
        }
    }
}

fn is_id_like(s: &str) -> bool {
    !s.is_empty()
        && s.chars().next().is_some_and(|c| c.is_ascii_lowercase())
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ---------------------------------------------------------------------------
// File references
// ---------------------------------------------------------------------------

/// A file reference is a map `{file: String, sha1: String}` handed over by
/// the content-addressed store. The core treats them as opaque ground terms.
pub fn is_fileref(term: &Term) -> bool {
    get_fileref(term).is_some()
}

/// Extract `(file, sha1)` from a file-reference map.
pub fn get_fileref(term: &Term) -> Option<(String, String)> {
    if let Term::Map(items) = term {
        if items.len() == 2 {
            if let (Some(Term::StringConst(file)), Some(Term::StringConst(sha1))) =
                (items.get("file"), items.get("sha1"))
            {
                return Some((file.clone(), sha1.clone()));
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Literals
// ---------------------------------------------------------------------------

/// A predicate applied to a tuple of terms.
///
/// The predicate is an id-constant or a string-constant. Ground literals
/// admit the role of facts and claims.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    pub pred: Term,
    pub args: Vec<Term>,
}

impl Literal {
    /// Build a literal with an id-constant predicate.
    pub fn new(pred: impl Into<String>, args: Vec<Term>) -> Self {
        Literal {
            pred: Term::IdConst(pred.into()),
            args,
        }
    }

    /// Build a literal from an arbitrary predicate term, which must be an
    /// id-constant or a string-constant.
    pub fn with_pred(pred: Term, args: Vec<Term>) -> Result<Self, TermError> {
        match pred {
            Term::IdConst(_) | Term::StringConst(_) => Ok(Literal { pred, args }),
            other => Err(TermError::BadPredicate {
                term: other.to_string(),
            }),
        }
    }

    /// The predicate name as a string.
    pub fn pred_name(&self) -> &str {
        match &self.pred {
            Term::IdConst(s) | Term::StringConst(s) => s,
            _ => "",
        }
    }

    pub fn is_ground(&self) -> bool {
        self.args.iter().all(Term::is_ground)
    }

    pub fn free_vars(&self) -> std::collections::BTreeSet<String> {
        let mut out = std::collections::BTreeSet::new();
        for a in &self.args {
            a.collect_vars(&mut out);
        }
        out
    }

    /// Unify two literals: predicates and arities must coincide, arguments
    /// unify pairwise under a single substitution.
    pub fn unify(&self, other: &Literal) -> Option<Subst> {
        if self.pred != other.pred || self.args.len() != other.args.len() {
            return None;
        }
        Term::Array(self.args.clone()).unify(&Term::Array(other.args.clone()))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pred)?;
        if !self.args.is_empty() {
            write!(f, "(")?;
            for (i, a) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{a}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl Serialize for Literal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut items: Vec<&Term> = Vec::with_capacity(1 + self.args.len());
        items.push(&self.pred);
        items.extend(self.args.iter());
        let mut m = serializer.serialize_map(Some(1))?;
        m.serialize_entry("__Literal", &items)?;
        m.end()
    }
}

impl<'de> Deserialize<'de> for Literal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Repr {
            #[serde(rename = "__Literal")]
            items: Vec<Term>,
        }
        let repr = Repr::deserialize(deserializer)?;
        let mut items = repr.items.into_iter();
        let pred = items
            .next()
            .ok_or_else(|| D::Error::custom("empty __Literal"))?;
        Literal::with_pred(pred, items.collect()).map_err(D::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Clauses
// ---------------------------------------------------------------------------

/// Provenance tag distinguishing how a clause entered the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    /// An empty-body clause with a ground head, loaded as an axiom.
    Fact,
    /// An ordinary `head :- body` rule.
    Derivation,
    /// A `head <= body` inference rule.
    Inference,
}

/// A head literal plus an ordered (possibly empty) list of body literals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Clause {
    pub head: Literal,
    pub body: Vec<Literal>,
    pub kind: RuleKind,
}

impl Clause {
    pub fn fact(head: Literal) -> Self {
        Clause {
            head,
            body: Vec::new(),
            kind: RuleKind::Fact,
        }
    }

    pub fn derivation(head: Literal, body: Vec<Literal>) -> Self {
        Clause {
            head,
            body,
            kind: RuleKind::Derivation,
        }
    }

    pub fn inference(head: Literal, body: Vec<Literal>) -> Self {
        Clause {
            head,
            body,
            kind: RuleKind::Inference,
        }
    }

    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }

    pub fn is_ground(&self) -> bool {
        self.head.is_ground() && self.body.iter().all(Literal::is_ground)
    }

    /// Datalog safety: every variable in the head occurs in the body.
    pub fn check_safety(&self) -> Result<(), TermError> {
        let head_vars = self.head.free_vars();
        let mut body_vars = std::collections::BTreeSet::new();
        for lit in &self.body {
            body_vars.extend(lit.free_vars());
        }
        for v in head_vars {
            if !body_vars.contains(&v) {
                return Err(TermError::UnsafeClause { var: v });
            }
        }
        Ok(())
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.is_empty() {
            return write!(f, "{}.", self.head);
        }
        let arrow = match self.kind {
            RuleKind::Inference => "<=",
            _ => ":-",
        };
        write!(f, "{} {} ", self.head, arrow)?;
        for (i, lit) in self.body.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{lit}")?;
        }
        write!(f, ".")
    }
}

impl Serialize for Clause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut items: Vec<&Literal> = Vec::with_capacity(1 + self.body.len());
        items.push(&self.head);
        items.extend(self.body.iter());
        let mut m = serializer.serialize_map(Some(1))?;
        m.serialize_entry("__Clause", &items)?;
        m.end()
    }
}

impl<'de> Deserialize<'de> for Clause {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Repr {
            #[serde(rename = "__Clause")]
            items: Vec<Literal>,
        }
        let repr = Repr::deserialize(deserializer)?;
        let mut items = repr.items.into_iter();
        let head = items
            .next()
            .ok_or_else(|| D::Error::custom("empty __Clause"))?;
        let body: Vec<Literal> = items.collect();
        Ok(if body.is_empty() {
            Clause::fact(head)
        } else {
            Clause::derivation(head, body)
        })
    }
}

// ---------------------------------------------------------------------------
// Reasons and claims
// ---------------------------------------------------------------------------

/// Why a claim holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ReasonRepr", into = "ReasonRepr")]
pub enum Reason {
    /// Loaded from a rule file as an axiom.
    Axiom,
    /// Produced by an interpreted predicate (a tool wrapper).
    External,
    /// Top-down resolution of a goal against a KB rule. The rule is absent
    /// when a wrapper pushed the pending rule directly.
    TopDown {
        rule: Option<Clause>,
        goal: Literal,
    },
    /// Bottom-up propagation of a claim through a pending rule.
    BottomUp {
        rule: Clause,
        claim: Literal,
        reason: Box<Reason>,
    },
    /// An opaque note, e.g. a reconstructed explanation string.
    Note(String),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ReasonRepr {
    TopDown {
        #[serde(rename = "__TopDown")]
        parts: (Option<Clause>, Literal),
    },
    BottomUp {
        #[serde(rename = "__BottomUp")]
        parts: (Clause, Literal, Box<Reason>),
    },
    Text(String),
}

impl From<ReasonRepr> for Reason {
    fn from(repr: ReasonRepr) -> Self {
        match repr {
            ReasonRepr::Text(s) => match s.as_str() {
                "Axiom" => Reason::Axiom,
                "External" => Reason::External,
                _ => Reason::Note(s),
            },
            ReasonRepr::TopDown { parts: (rule, goal) } => Reason::TopDown { rule, goal },
            ReasonRepr::BottomUp {
                parts: (rule, claim, reason),
            } => Reason::BottomUp {
                rule,
                claim,
                reason,
            },
        }
    }
}

impl From<Reason> for ReasonRepr {
    fn from(reason: Reason) -> Self {
        match reason {
            Reason::Axiom => ReasonRepr::Text("Axiom".into()),
            Reason::External => ReasonRepr::Text("External".into()),
            Reason::Note(s) => ReasonRepr::Text(s),
            Reason::TopDown { rule, goal } => ReasonRepr::TopDown { parts: (rule, goal) },
            Reason::BottomUp {
                rule,
                claim,
                reason,
            } => ReasonRepr::BottomUp {
                parts: (rule, claim, reason),
            },
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Axiom => write!(f, "Axiom"),
            Reason::External => write!(f, "External"),
            Reason::Note(s) => write!(f, "{s}"),
            Reason::TopDown { rule, goal } => match rule {
                Some(r) => write!(f, "ResolutionTopDown with {r} and {goal}"),
                None => write!(f, "ResolutionTopDown with {goal}"),
            },
            Reason::BottomUp { rule, claim, .. } => {
                write!(f, "ResolutionBottomUp with {rule} and {claim}.")
            }
        }
    }
}

/// A ground literal paired with a reason witnessing its derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    #[serde(rename = "__Claim")]
    pub literal: Literal,
    #[serde(rename = "__Reason")]
    pub reason: Reason,
}

impl Claim {
    pub fn new(literal: Literal, reason: Reason) -> Self {
        Claim { literal, reason }
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.literal)
    }
}

// ---------------------------------------------------------------------------
// Substitutions
// ---------------------------------------------------------------------------

/// A substitution mapping variable names to terms, kept sorted by variable
/// for canonical form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subst {
    bindings: BTreeMap<String, Term>,
}

impl Subst {
    pub fn new() -> Self {
        Subst::default()
    }

    pub fn bind(&mut self, var: String, term: Term) {
        self.bindings.insert(var, term);
    }

    pub fn get(&self, var: &str) -> Option<&Term> {
        self.bindings.get(var)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Term)> {
        self.bindings.iter()
    }

    /// Apply the substitution to a term, chasing variable chains.
    pub fn apply(&self, term: &Term) -> Term {
        match term {
            Term::Var(v) => match self.bindings.get(v) {
                Some(bound) if bound != term => self.apply(bound),
                Some(bound) => bound.clone(),
                None => term.clone(),
            },
            Term::Array(elems) => Term::Array(elems.iter().map(|t| self.apply(t)).collect()),
            Term::Map(items) => Term::Map(
                items
                    .iter()
                    .map(|(k, v)| (k.clone(), self.apply(v)))
                    .collect(),
            ),
            _ => term.clone(),
        }
    }

    pub fn apply_literal(&self, lit: &Literal) -> Literal {
        Literal {
            pred: lit.pred.clone(),
            args: lit.args.iter().map(|t| self.apply(t)).collect(),
        }
    }

    /// A renaming binds variables to pairwise-distinct variables only.
    pub fn is_renaming(&self) -> bool {
        let mut seen = std::collections::BTreeSet::new();
        self.bindings
            .values()
            .all(|t| matches!(t, Term::Var(v) if seen.insert(v.clone())))
    }
}

impl fmt::Display for Subst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subst(")?;
        for (i, (k, v)) in self.bindings.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k} = {v}")?;
        }
        write!(f, ")")
    }
}

impl Serialize for Subst {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let pairs: Vec<(Term, &Term)> = self
            .bindings
            .iter()
            .map(|(k, v)| (Term::Var(k.clone()), v))
            .collect();
        let mut m = serializer.serialize_map(Some(1))?;
        m.serialize_entry("__Subst", &pairs)?;
        m.end()
    }
}

impl<'de> Deserialize<'de> for Subst {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Repr {
            #[serde(rename = "__Subst")]
            pairs: Vec<(Term, Term)>,
        }
        let repr = Repr::deserialize(deserializer)?;
        let mut subst = Subst::new();
        for (var, term) in repr.pairs {
            match var {
                Term::Var(name) => subst.bind(name, term),
                other => {
                    return Err(D::Error::custom(format!(
                        "__Subst key must be a variable, got {other}"
                    )));
                }
            }
        }
        Ok(subst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(pred: &str, args: Vec<Term>) -> Literal {
        Literal::new(pred, args)
    }

    #[test]
    fn var_unifies_with_constant() {
        let s = Term::var("X").unify(&Term::id("p")).unwrap();
        assert_eq!(s.get("X"), Some(&Term::id("p")));
    }

    #[test]
    fn distinct_constants_do_not_unify() {
        assert!(Term::id("p").unify(&Term::id("q")).is_none());
    }

    #[test]
    fn array_unification_binds_elementwise() {
        let l = Term::array(vec![Term::id("p"), Term::id("a"), Term::var("X")]);
        let r = Term::array(vec![Term::id("p"), Term::id("a"), Term::id("c")]);
        let s = l.unify(&r).unwrap();
        assert_eq!(s.get("X"), Some(&Term::id("c")));
    }

    #[test]
    fn map_unification_requires_equal_keysets() {
        let l = Term::map([("a", Term::id("b")), ("c", Term::var("X"))]);
        let r = Term::map([("a", Term::id("b")), ("c", Term::id("d"))]);
        let s = l.unify(&r).unwrap();
        assert_eq!(s.get("X"), Some(&Term::id("d")));

        let r2 = Term::map([("a", Term::id("b"))]);
        assert!(l.unify(&r2).is_none());
    }

    #[test]
    fn occurs_check_rejects_cyclic_binding() {
        let l = Term::var("X");
        let r = Term::array(vec![Term::id("f"), Term::var("X")]);
        assert!(l.unify(&r).is_none());
    }

    #[test]
    fn literal_unification_checks_pred_and_arity() {
        let g = lit("p", vec![Term::var("X"), Term::id("b")]);
        let c = lit("p", vec![Term::id("a"), Term::id("b")]);
        let s = g.unify(&c).unwrap();
        assert_eq!(s.get("X"), Some(&Term::id("a")));

        let wrong_pred = lit("q", vec![Term::id("a"), Term::id("b")]);
        assert!(g.unify(&wrong_pred).is_none());
        let wrong_arity = lit("p", vec![Term::id("a")]);
        assert!(g.unify(&wrong_arity).is_none());
    }

    #[test]
    fn ground_literal_unification_yields_empty_subst() {
        let a = lit("p", vec![Term::id("a")]);
        let s = a.unify(&a.clone()).unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn clause_safety() {
        let safe = Clause::derivation(
            lit("p", vec![Term::var("X")]),
            vec![lit("q", vec![Term::var("X")])],
        );
        assert!(safe.check_safety().is_ok());

        let unsafe_clause = Clause::derivation(
            lit("p", vec![Term::var("Y")]),
            vec![lit("q", vec![Term::var("X")])],
        );
        assert!(unsafe_clause.check_safety().is_err());
    }

    #[test]
    fn fileref_detection() {
        let fr = Term::map([
            ("file", Term::string("out.txt")),
            ("sha1", Term::string("abc123")),
        ]);
        assert!(is_fileref(&fr));
        assert_eq!(
            get_fileref(&fr),
            Some(("out.txt".into(), "abc123".into()))
        );
        assert!(!is_fileref(&Term::id("a")));
    }

    #[test]
    fn display_forms() {
        let c = Clause::derivation(
            lit("path", vec![Term::var("X"), Term::var("Y")]),
            vec![
                lit("edge", vec![Term::var("X"), Term::var("Z")]),
                lit("path", vec![Term::var("Z"), Term::var("Y")]),
            ],
        );
        assert_eq!(c.to_string(), "path(X, Y) :- edge(X, Z), path(Z, Y).");
        let f = Clause::fact(lit("edge", vec![Term::id("a"), Term::id("b")]));
        assert_eq!(f.to_string(), "edge(a, b).");
    }

    #[test]
    fn json_round_trip_terms() {
        let terms = vec![
            Term::var("X"),
            Term::id("a"),
            Term::string("hello"),
            Term::bool(true),
            Term::int(42),
            Term::float(2.5),
            Term::array(vec![Term::id("a"), Term::var("Y")]),
            Term::map([("file", Term::string("f")), ("sha1", Term::string("s"))]),
        ];
        for t in terms {
            let json = serde_json::to_string(&t).unwrap();
            let back: Term = serde_json::from_str(&json).unwrap();
            assert_eq!(back, t, "round trip failed for {json}");
        }
    }

    #[test]
    fn json_uses_variant_tags() {
        let json = serde_json::to_string(&Term::var("X")).unwrap();
        assert_eq!(json, r#"{"__Var":"X"}"#);
        let json = serde_json::to_string(&Term::id("a")).unwrap();
        assert_eq!(json, r#"{"__IdConst":"a"}"#);
    }

    #[test]
    fn json_round_trip_literal_and_clause() {
        let l = lit("p", vec![Term::id("a"), Term::var("X")]);
        let json = serde_json::to_string(&l).unwrap();
        assert!(json.contains("__Literal"));
        let back: Literal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, l);

        let c = Clause::derivation(
            lit("p", vec![Term::var("X")]),
            vec![lit("q", vec![Term::var("X")])],
        );
        let json = serde_json::to_string(&c).unwrap();
        let back: Clause = serde_json::from_str(&json).unwrap();
        assert_eq!(back.head, c.head);
        assert_eq!(back.body, c.body);
    }

    #[test]
    fn json_round_trip_claim_and_subst() {
        let claim = Claim::new(lit("p", vec![Term::id("a")]), Reason::External);
        let json = serde_json::to_string(&claim).unwrap();
        assert!(json.contains("__Claim") && json.contains("__Reason"));
        let back: Claim = serde_json::from_str(&json).unwrap();
        assert_eq!(back, claim);

        let mut s = Subst::new();
        s.bind("X".into(), Term::id("a"));
        s.bind("Y".into(), Term::int(3));
        let json = serde_json::to_string(&s).unwrap();
        let back: Subst = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn json_round_trip_structured_reason() {
        let rule = Clause::derivation(
            lit("p", vec![Term::var("X")]),
            vec![lit("q", vec![Term::var("X")])],
        );
        let reason = Reason::BottomUp {
            rule: rule.clone(),
            claim: lit("q", vec![Term::id("a")]),
            reason: Box::new(Reason::Axiom),
        };
        let json = serde_json::to_string(&reason).unwrap();
        let back: Reason = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reason);

        let td = Reason::TopDown {
            rule: Some(rule),
            goal: lit("p", vec![Term::var("X")]),
        };
        let json = serde_json::to_string(&td).unwrap();
        let back: Reason = serde_json::from_str(&json).unwrap();
        assert_eq!(back, td);
    }

    #[test]
    fn subst_is_renaming() {
        let mut s = Subst::new();
        s.bind("X".into(), Term::var("A"));
        s.bind("Y".into(), Term::var("B"));
        assert!(s.is_renaming());
        s.bind("Z".into(), Term::id("c"));
        assert!(!s.is_renaming());
    }
}

//! The interpret-state seam: relaying goals on interpreted predicates to
//! tool wrappers and feeding their answers back into the engine.
//!
//! The core consumes three questions from an [`InterpretState`]: is this
//! predicate interpreted, are the argument modes valid, and — fire and
//! forget — interpret this goal. Implementations answer by calling back
//! into the [`Engine`](crate::engine::Engine) public entry points
//! (`add_claims`, `add_pending_rule`, `add_errors`, `push_no_solutions`),
//! possibly from a worker thread. The engine guarantees the state lock is
//! released before `interpret` runs, so wrappers may re-enter freely.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::engine::Engine;
use crate::error::InferError;
use crate::factory::IntLit;
use crate::term::{Claim, Clause, Literal, Reason, Term};

/// Argument mode of an interpreted predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgMode {
    /// Input: must be ground at call time.
    In,
    /// Output: must be an unbound variable at call time.
    Out,
    /// No constraint.
    Any,
}

/// Registered signature of an interpreted predicate.
#[derive(Debug, Clone)]
pub struct PredicateSpec {
    pub name: String,
    pub modes: Vec<ArgMode>,
}

impl PredicateSpec {
    pub fn new(name: impl Into<String>, modes: Vec<ArgMode>) -> Self {
        PredicateSpec {
            name: name.into(),
            modes,
        }
    }

    /// Check a goal against the declared modes.
    pub fn accepts(&self, goal: &Literal) -> bool {
        if goal.args.len() != self.modes.len() {
            return false;
        }
        goal.args
            .iter()
            .zip(self.modes.iter())
            .all(|(arg, mode)| match mode {
                ArgMode::In => arg.is_ground(),
                ArgMode::Out => arg.is_var(),
                ArgMode::Any => true,
            })
    }
}

/// What a wrapper produced for one interpreted goal.
#[derive(Debug, Clone)]
pub enum WrapperOutcome {
    /// Ground claims answering the goal.
    Claims(Vec<Claim>),
    /// Rule bodies to expand under the goal, instead of substitutions.
    Rules(Vec<Clause>),
    /// The wrapper finished and found nothing.
    NoSolutions,
    /// The tool failed; the message becomes an `error(tool, message)`
    /// claim attached to the goal.
    Failure(String),
}

type Handler = Arc<dyn Fn(&Literal) -> WrapperOutcome + Send + Sync>;

/// How the interpret state runs goals against tool wrappers.
pub trait InterpretState: Send + Sync {
    /// Is the goal's predicate handled externally?
    fn is_interpreted(&self, goal: &Literal) -> bool;

    /// Do the goal's arguments satisfy the registered modes?
    fn is_valid(&self, goal: &Literal) -> bool {
        let _ = goal;
        true
    }

    /// Solve the goal, eventually calling back into the engine. The engine
    /// never holds the state lock while calling this.
    fn interpret(&self, goal: &Literal, internal: &IntLit, engine: &Engine);

    /// The predicates this state can interpret.
    fn predicates(&self) -> Vec<String> {
        Vec::new()
    }
}

/// An interpret state with no interpreted predicates; plain Datalog.
pub struct NoInterpretation;

impl InterpretState for NoInterpretation {
    fn is_interpreted(&self, _goal: &Literal) -> bool {
        false
    }

    fn interpret(&self, _goal: &Literal, _internal: &IntLit, _engine: &Engine) {}
}

/// Registry of tool wrappers keyed by predicate name.
///
/// Handlers run inline by default; with `async_dispatch` they run on the
/// rayon pool and answer the engine from worker threads. Delivered claims
/// are mirrored in a per-goal results table for inspection.
#[derive(Default)]
pub struct ToolRegistry {
    specs: DashMap<String, PredicateSpec>,
    handlers: DashMap<String, Handler>,
    results: Arc<DashMap<Literal, Vec<Claim>>>,
    async_dispatch: bool,
}

impl ToolRegistry {
    pub fn new() -> Self {
        ToolRegistry::default()
    }

    /// A registry preloaded with the `=` and `!=` builtins.
    pub fn with_builtins() -> Self {
        let registry = ToolRegistry::new();
        registry.register_fn("=", vec![ArgMode::Any, ArgMode::Any], |goal| {
            let subst = match goal.args[0].unify(&goal.args[1]) {
                Some(s) => s,
                None => return WrapperOutcome::NoSolutions,
            };
            let resolved = subst.apply_literal(goal);
            if resolved.is_ground() {
                WrapperOutcome::Claims(vec![Claim::new(resolved, Reason::External)])
            } else {
                WrapperOutcome::NoSolutions
            }
        });
        registry.register_fn("!=", vec![ArgMode::In, ArgMode::In], |goal| {
            if goal.args[0] != goal.args[1] {
                WrapperOutcome::Claims(vec![Claim::new(goal.clone(), Reason::External)])
            } else {
                WrapperOutcome::NoSolutions
            }
        });
        registry
    }

    /// Dispatch wrappers on the rayon pool instead of inline.
    pub fn with_async_dispatch(mut self) -> Self {
        self.async_dispatch = true;
        self
    }

    /// Register a wrapper under its predicate spec.
    pub fn register<F>(&self, spec: PredicateSpec, handler: F)
    where
        F: Fn(&Literal) -> WrapperOutcome + Send + Sync + 'static,
    {
        self.handlers.insert(spec.name.clone(), Arc::new(handler));
        self.specs.insert(spec.name.clone(), spec);
    }

    /// Shorthand: register by name and modes.
    pub fn register_fn<F>(&self, name: &str, modes: Vec<ArgMode>, handler: F)
    where
        F: Fn(&Literal) -> WrapperOutcome + Send + Sync + 'static,
    {
        self.register(PredicateSpec::new(name, modes), handler);
    }

    /// The claims delivered so far for an interpreted goal.
    pub fn results_for(&self, goal: &Literal) -> Vec<Claim> {
        self.results
            .get(goal)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    fn run(&self, goal: &Literal, engine: &Engine) {
        let name = goal.pred_name().to_string();
        let Some(handler) = self.handlers.get(&name).map(|h| h.value().clone()) else {
            let err = InferError::NoWrapper {
                predicate: name.clone(),
            };
            warn!(%err, goal = %goal, "interpretation failed");
            let error = Literal::new(
                "error",
                vec![Term::string(name), Term::string(err.to_string())],
            );
            engine.add_errors(goal, vec![Claim::new(error, Reason::External)]);
            return;
        };
        let outcome = handler(goal);
        debug!(goal = %goal, "wrapper finished");
        match outcome {
            WrapperOutcome::Claims(claims) => {
                if claims.is_empty() {
                    engine.push_no_solutions(goal);
                    return;
                }
                self.results
                    .entry(goal.clone())
                    .or_default()
                    .extend(claims.iter().cloned());
                if let Err(err) = engine.add_claims(claims) {
                    warn!(%err, goal = %goal, "wrapper claims rejected");
                }
            }
            WrapperOutcome::Rules(rules) => {
                if rules.is_empty() {
                    engine.push_no_solutions(goal);
                    return;
                }
                for rule in rules {
                    engine.add_pending_rule(&rule, goal);
                }
            }
            WrapperOutcome::NoSolutions => engine.push_no_solutions(goal),
            WrapperOutcome::Failure(message) => {
                let error = Literal::new(
                    "error",
                    vec![Term::string(name), Term::string(message)],
                );
                engine.add_errors(goal, vec![Claim::new(error, Reason::External)]);
            }
        }
    }
}

impl InterpretState for ToolRegistry {
    fn is_interpreted(&self, goal: &Literal) -> bool {
        self.handlers.contains_key(goal.pred_name())
    }

    fn is_valid(&self, goal: &Literal) -> bool {
        match self.specs.get(goal.pred_name()) {
            Some(spec) => spec.accepts(goal),
            None => true,
        }
    }

    fn interpret(&self, goal: &Literal, _internal: &IntLit, engine: &Engine) {
        if self.async_dispatch {
            let engine = engine.clone();
            let goal = goal.clone();
            let handler = self.handlers.get(goal.pred_name()).map(|h| h.value().clone());
            let results = self.results.clone();
            rayon::spawn(move || {
                run_detached(handler, results, &goal, &engine);
            });
        } else {
            self.run(goal, engine);
        }
    }

    fn predicates(&self) -> Vec<String> {
        self.handlers.iter().map(|e| e.key().clone()).collect()
    }
}

/// Worker-side wrapper execution for async dispatch; mirrors
/// [`ToolRegistry::run`] without borrowing the registry.
fn run_detached(
    handler: Option<Handler>,
    results: Arc<DashMap<Literal, Vec<Claim>>>,
    goal: &Literal,
    engine: &Engine,
) {
    let name = goal.pred_name().to_string();
    let Some(handler) = handler else {
        let err = InferError::NoWrapper {
            predicate: name.clone(),
        };
        warn!(%err, goal = %goal, "interpretation failed");
        let error = Literal::new(
            "error",
            vec![Term::string(name), Term::string(err.to_string())],
        );
        engine.add_errors(goal, vec![Claim::new(error, Reason::External)]);
        return;
    };
    match handler(goal) {
        WrapperOutcome::Claims(claims) => {
            if claims.is_empty() {
                engine.push_no_solutions(goal);
                return;
            }
            results
                .entry(goal.clone())
                .or_default()
                .extend(claims.iter().cloned());
            if let Err(err) = engine.add_claims(claims) {
                warn!(%err, goal = %goal, "wrapper claims rejected");
            }
        }
        WrapperOutcome::Rules(rules) => {
            if rules.is_empty() {
                engine.push_no_solutions(goal);
                return;
            }
            for rule in rules {
                engine.add_pending_rule(&rule, goal);
            }
        }
        WrapperOutcome::NoSolutions => engine.push_no_solutions(goal),
        WrapperOutcome::Failure(message) => {
            let error = Literal::new("error", vec![Term::string(name), Term::string(message)]);
            engine.add_errors(goal, vec![Claim::new(error, Reason::External)]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_checks() {
        let spec = PredicateSpec::new("between", vec![ArgMode::In, ArgMode::In, ArgMode::Any]);
        let ok = Literal::new("between", vec![Term::int(1), Term::int(4), Term::var("V")]);
        assert!(spec.accepts(&ok));
        let bad = Literal::new("between", vec![Term::var("L"), Term::int(4), Term::var("V")]);
        assert!(!spec.accepts(&bad));
        let wrong_arity = Literal::new("between", vec![Term::int(1)]);
        assert!(!spec.accepts(&wrong_arity));
    }

    #[test]
    fn registry_knows_its_predicates() {
        let registry = ToolRegistry::with_builtins();
        assert!(registry.is_interpreted(&Literal::new("=", vec![Term::var("X"), Term::id("a")])));
        assert!(registry.is_interpreted(&Literal::new("!=", vec![Term::id("a"), Term::id("b")])));
        assert!(!registry.is_interpreted(&Literal::new("edge", vec![])));
        let mut preds = registry.predicates();
        preds.sort();
        assert_eq!(preds, vec!["!=", "="]);
    }

    #[test]
    fn disequality_modes_require_ground_args() {
        let registry = ToolRegistry::with_builtins();
        let bad = Literal::new("!=", vec![Term::var("X"), Term::id("a")]);
        assert!(!registry.is_valid(&bad));
        let ok = Literal::new("!=", vec![Term::id("b"), Term::id("a")]);
        assert!(registry.is_valid(&ok));
    }

    #[test]
    fn no_interpretation_interprets_nothing() {
        let none = NoInterpretation;
        assert!(!none.is_interpreted(&Literal::new("=", vec![])));
        assert!(none.is_valid(&Literal::new("anything", vec![])));
    }
}

//! Engine façade: the public interface to the Datalog inference core.
//!
//! The engine owns the term factory and logical state behind a single
//! mutex; every entry point locks once, runs the (freely recursive)
//! inference step, and hands any interpret dispatches queued during the
//! step to the interpret state *after* releasing the lock. Tool wrappers
//! answer through the same entry points, possibly from worker threads.
//!
//! All conversion between external terms and the internal integer
//! representation happens here; nothing beyond this module sees both.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{BusResult, TermError};
use crate::factory::{IntClause, IntLit};
use crate::graph::{NodeKey, ReasonInt, Status};
use crate::infer::Inference;
use crate::interpret::InterpretState;
use crate::parser;
use crate::persist::{self, SavedGoal, SavedState};
use crate::term::{Claim, Clause, Literal, Reason, RuleKind, Subst};

/// Tunables for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How often [`Engine::wait_completed`] re-runs the close/complete
    /// sweep while waiting for external answers.
    pub poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            poll_interval: Duration::from_millis(10),
        }
    }
}

struct EngineInner {
    core: Mutex<Inference>,
    interpret: Arc<dyn InterpretState>,
    config: EngineConfig,
}

/// The evidential-bus Datalog engine. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    pub fn new(interpret: Arc<dyn InterpretState>) -> Self {
        Engine::with_config(interpret, EngineConfig::default())
    }

    pub fn with_config(interpret: Arc<dyn InterpretState>, config: EngineConfig) -> Self {
        info!("initializing evibus engine");
        Engine {
            inner: Arc::new(EngineInner {
                core: Mutex::new(Inference::new()),
                interpret,
                config,
            }),
        }
    }

    /// Run one step under the state lock, then dispatch any interpreted
    /// goals the step queued. Wrapper callbacks re-enter through the
    /// public entry points and take the lock afresh.
    fn with_core<R>(&self, f: impl FnOnce(&mut Inference, &dyn InterpretState) -> R) -> R {
        let (result, dispatches) = {
            let mut core = self.inner.core.lock().expect("state lock poisoned");
            let result = f(&mut core, self.inner.interpret.as_ref());
            (result, core.take_dispatches())
        };
        for request in dispatches {
            self.inner
                .interpret
                .interpret(&request.external, &request.internal, self);
        }
        result
    }

    // ── Claims ──────────────────────────────────────────────────────────

    /// Add a single claim. The literal must be ground.
    pub fn add_claim(&self, claim: Claim) -> BusResult<()> {
        self.add_claims(vec![claim])
    }

    /// Add a batch of claims atomically: the close algorithm never sees a
    /// partial batch.
    pub fn add_claims(&self, claims: Vec<Claim>) -> BusResult<()> {
        for claim in &claims {
            if !claim.literal.is_ground() {
                return Err(TermError::NonGroundClaim {
                    literal: claim.literal.to_string(),
                }
                .into());
            }
        }
        debug!(count = claims.len(), "adding claims");
        self.with_core(|core, interp| {
            let batch: Vec<(IntLit, ReasonInt)> = claims
                .iter()
                .map(|c| {
                    let lit = core.factory.intern_literal(&c.literal);
                    let reason = intern_reason(core, &c.reason);
                    (lit, reason)
                })
                .collect();
            core.add_external_claims(batch, interp);
        });
        Ok(())
    }

    // ── Goals and rules ─────────────────────────────────────────────────

    /// Pose a goal: the engine seeks claims for it.
    ///
    /// An interpreted goal whose arguments violate the registered modes is
    /// a programmer error and is rejected outright.
    pub fn add_goal(&self, goal: &Literal) -> BusResult<()> {
        debug!(goal = %goal, "adding goal");
        self.with_core(|core, interp| {
            let internal = core.factory.intern_literal(goal);
            core.add_goal(internal, interp)
        })?;
        Ok(())
    }

    /// Add a KB rule. Datalog safety is enforced here.
    pub fn add_rule(&self, rule: &Clause, reason: Reason) -> BusResult<()> {
        rule.check_safety()?;
        self.with_core(|core, interp| {
            let internal = core.factory.intern_clause(rule);
            let reason = intern_reason(core, &reason);
            core.add_rule(internal, reason, interp);
        });
        Ok(())
    }

    /// Wrapper entry point: a tool answered with a rule body rather than
    /// plain substitutions. A fact is treated directly as a claim.
    pub fn add_pending_rule(&self, rule: &Clause, goal: &Literal) {
        if rule.is_fact() {
            if let Err(err) = self.add_claim(Claim::new(rule.head.clone(), Reason::External)) {
                warn!(%err, "pending fact rejected");
            }
            return;
        }
        self.with_core(|core, interp| {
            let internal = core.factory.intern_clause(rule);
            let internal_goal = core.factory.intern_literal(goal);
            core.add_pending_rule_for_goal(internal, internal_goal, interp);
        });
    }

    /// Attach error claims to a goal regardless of head matching.
    pub fn add_errors(&self, goal: &Literal, errors: Vec<Claim>) {
        self.with_core(|core, _| {
            let internal_goal = core.factory.intern_literal(goal);
            let batch: Vec<(IntLit, ReasonInt)> = errors
                .iter()
                .map(|c| {
                    let lit = core.factory.intern_literal(&c.literal);
                    let reason = intern_reason(core, &c.reason);
                    (lit, reason)
                })
                .collect();
            core.add_errors(&internal_goal, batch);
        });
    }

    /// The interpret state found no solutions for the goal; unstick it.
    pub fn push_no_solutions(&self, goal: &Literal) {
        self.with_core(|core, _| {
            let internal = core.factory.intern_literal(goal);
            core.push_no_solutions(&internal);
        });
    }

    /// Re-examine stuck goals after new predicates were registered.
    pub fn check_stuck_goals(&self, new_predicates: &[String]) {
        self.with_core(|core, interp| {
            core.check_stuck_goals(new_predicates, interp);
        });
    }

    // ── Saturation ──────────────────────────────────────────────────────

    /// Run the closing algorithm over the dependency graph.
    pub fn close(&self) {
        self.with_core(|core, _| core.close());
    }

    /// Run the completion algorithm over the dependency graph.
    pub fn complete(&self) {
        self.with_core(|core, _| core.complete());
    }

    pub fn is_completed(&self, goal: &Literal) -> bool {
        self.with_core(|core, _| {
            let internal = core.factory.intern_literal(goal);
            core.is_completed(&internal)
        })
    }

    /// Drive close/complete until the goal saturates or the timeout
    /// elapses. Returns whether the goal completed.
    pub fn wait_completed(&self, goal: &Literal, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            self.close();
            self.complete();
            if self.is_completed(goal) {
                return true;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            std::thread::sleep(self.inner.config.poll_interval);
        }
    }

    pub fn is_stuck_goal(&self, goal: &Literal) -> bool {
        self.with_core(|core, _| {
            let internal = core.factory.intern_literal(goal);
            core.state.is_stuck_goal(&internal)
        })
    }

    pub fn no_stuck_subgoals(&self, goal: &Literal) -> bool {
        self.with_core(|core, _| {
            let internal = core.factory.intern_literal(goal);
            core.state.no_stuck_subgoals(&internal)
        })
    }

    // ── Introspection ───────────────────────────────────────────────────

    /// All claims currently known, with reconstructed explanations.
    pub fn get_claims(&self) -> Vec<Claim> {
        self.with_core(|core, _| {
            core.state
                .all_claims()
                .into_iter()
                .filter_map(|internal| {
                    let literal = match core.factory.externalize_literal(&internal) {
                        Ok(lit) => lit,
                        Err(err) => {
                            warn!(%err, "claim cannot be externalized");
                            return None;
                        }
                    };
                    let explanation = explanation_for(core, &vec![internal]);
                    Some(Claim::new(literal, Reason::Note(explanation)))
                })
                .collect()
        })
    }

    pub fn get_goals(&self) -> Vec<Literal> {
        self.with_core(|core, _| {
            core.state
                .all_goals()
                .into_iter()
                .filter_map(|g| core.factory.externalize_literal(&g).ok())
                .collect()
        })
    }

    pub fn get_stuck_goals(&self) -> Vec<Literal> {
        self.with_core(|core, _| {
            core.state
                .all_stuck_goals()
                .into_iter()
                .filter_map(|g| core.factory.externalize_literal(&g).ok())
                .collect()
        })
    }

    /// The claims that answer a goal, with their derivation reasons.
    pub fn get_claims_matching_goal(&self, goal: &Literal) -> Vec<Claim> {
        self.with_core(|core, _| {
            let internal = core.factory.intern_literal(goal);
            core.claims_matching_goal(&internal)
                .into_iter()
                .filter_map(|(claim, reason)| {
                    let literal = core.factory.externalize_literal(&claim).ok()?;
                    let reason = externalize_reason(core, &reason).unwrap_or(Reason::External);
                    Some(Claim::new(literal, reason))
                })
                .collect()
        })
    }

    /// One substitution per claim matching the goal; a ground goal with a
    /// matching claim yields the empty substitution.
    pub fn get_substitutions(&self, goal: &Literal) -> Vec<Subst> {
        self.get_claims_matching_goal(goal)
            .into_iter()
            .filter_map(|claim| goal.unify(&claim.literal))
            .collect()
    }

    /// Human-readable explanation of how a claim was derived: the rule it
    /// fell out of and the facts that fed it.
    pub fn claim_explanation(&self, claim: &Literal) -> String {
        self.with_core(|core, _| {
            let internal = core.factory.intern_literal(claim);
            explanation_for(core, &vec![internal])
        })
    }

    // ── Rule files ──────────────────────────────────────────────────────

    /// Load a rule file: ground facts become axioms, `:-` and `<=`
    /// statements derivation and inference rules.
    pub fn load_rules(&self, path: &Path) -> BusResult<()> {
        let statements = parser::parse_file(path)?;
        let mut facts = 0usize;
        let mut derivations = 0usize;
        let mut inferences = 0usize;
        for clause in statements {
            if clause.is_fact() {
                if !clause.is_ground() {
                    warn!(fact = %clause, "fact is not ground, skipped");
                    continue;
                }
                facts += 1;
            } else {
                match clause.kind {
                    RuleKind::Inference => inferences += 1,
                    _ => derivations += 1,
                }
            }
            if let Err(err) = self.add_rule(&clause, Reason::Axiom) {
                warn!(%err, rule = %clause, "rule rejected, skipped");
            }
        }
        info!(
            file = %path.display(),
            facts, derivations, inferences,
            "rule file loaded"
        );
        Ok(())
    }

    /// Load every rule file in a directory. A file that fails to parse is
    /// logged and skipped; the others still load.
    pub fn load_rules_dir(&self, dir: &Path) -> BusResult<usize> {
        let entries = std::fs::read_dir(dir).map_err(|source| crate::error::ParseError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let mut loaded = 0usize;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match self.load_rules(&path) {
                Ok(()) => loaded += 1,
                Err(err) => warn!(%err, file = %path.display(), "rule file skipped"),
            }
        }
        Ok(loaded)
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Snapshot claims, goals, and completed-goal annotations to disk.
    pub fn save_state(&self, path: &Path) -> BusResult<()> {
        let state = self.with_core(|core, _| {
            let claims = core
                .state
                .all_claims()
                .into_iter()
                .filter_map(|internal| {
                    let literal = core.factory.externalize_literal(&internal).ok()?;
                    let explanation = explanation_for(core, &vec![internal]);
                    Some(Claim::new(literal, Reason::Note(explanation)))
                })
                .collect::<Vec<_>>();
            let goals = core
                .state
                .all_goals()
                .into_iter()
                .filter_map(|internal| {
                    let literal = core.factory.externalize_literal(&internal).ok()?;
                    let annotation = core
                        .state
                        .graph
                        .annotation(&NodeKey::Goal(internal.clone()))
                        .filter(|ann| ann.status == Status::Completed)
                        .map(|ann| {
                            let indices = ann
                                .claims
                                .iter()
                                .filter_map(|claim_lit| {
                                    let external =
                                        core.factory.externalize_literal(claim_lit).ok()?;
                                    claims.iter().position(|c| c.literal == external)
                                })
                                .collect();
                            persist::SavedAnnotation {
                                completed: true,
                                claims: indices,
                            }
                        });
                    Some(SavedGoal {
                        literal,
                        annotation,
                    })
                })
                .collect::<Vec<_>>();
            SavedState { claims, goals }
        });
        persist::write(path, &state)?;
        info!(
            path = %path.display(),
            claims = state.claims.len(),
            goals = state.goals.len(),
            "logic state saved"
        );
        Ok(())
    }

    /// Restore a snapshot: claims first, then goals, then annotations
    /// restoring each completed goal's claim list by index.
    pub fn load_state(&self, path: &Path) -> BusResult<()> {
        let state = persist::read(path)?;
        self.add_claims(state.claims.clone())?;
        self.with_core(|core, _| {
            for saved in &state.goals {
                let internal = core.factory.intern_literal(&saved.literal);
                core.state.add_goal(&internal);
                if let Some(annotation) = &saved.annotation {
                    let claim_lits: Vec<IntLit> = annotation
                        .claims
                        .iter()
                        .filter_map(|&i| state.claims.get(i))
                        .map(|c| core.factory.intern_literal(&c.literal))
                        .collect();
                    for lit in &claim_lits {
                        let reason = ReasonInt::Note("restored".into());
                        core.state.graph.add_claim_to_goal(&internal, lit, reason);
                    }
                    if annotation.completed {
                        if let Some(ann) = core
                            .state
                            .graph
                            .annotation_mut(&NodeKey::Goal(internal.clone()))
                        {
                            ann.status = Status::Completed;
                        }
                    }
                }
            }
        });
        info!(path = %path.display(), "logic state loaded");
        Ok(())
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Forget everything, including interned symbols.
    pub fn clear(&self) {
        self.with_core(|core, _| core.clear());
    }

    /// Forget claims, keep KB rules.
    pub fn reset(&self) {
        self.with_core(|core, _| core.reset());
    }
}

// ── Reason conversion ───────────────────────────────────────────────────

fn intern_reason(core: &mut Inference, reason: &Reason) -> ReasonInt {
    match reason {
        Reason::Axiom => ReasonInt::Axiom,
        Reason::External => ReasonInt::External,
        Reason::Note(s) => ReasonInt::Note(s.clone()),
        Reason::TopDown { rule, goal } => ReasonInt::TopDown {
            rule: rule.as_ref().map(|r| core.factory.intern_clause(r)),
            goal: core.factory.intern_literal(goal),
        },
        Reason::BottomUp {
            rule,
            claim,
            reason,
        } => ReasonInt::BottomUp {
            rule: core.factory.intern_clause(rule),
            claim: core.factory.intern_literal(claim),
            reason: Box::new(intern_reason(core, reason)),
        },
    }
}

fn externalize_reason(core: &Inference, reason: &ReasonInt) -> Result<Reason, TermError> {
    Ok(match reason {
        ReasonInt::Axiom => Reason::Axiom,
        ReasonInt::External => Reason::External,
        ReasonInt::Note(s) => Reason::Note(s.clone()),
        ReasonInt::TopDown { rule, goal } => Reason::TopDown {
            rule: match rule {
                Some(r) => Some(core.factory.externalize_clause(r)?),
                None => None,
            },
            goal: core.factory.externalize_literal(goal)?,
        },
        ReasonInt::BottomUp {
            rule,
            claim,
            reason,
        } => Reason::BottomUp {
            rule: core.factory.externalize_clause(rule)?,
            claim: core.factory.externalize_literal(claim)?,
            reason: Box::new(externalize_reason(core, reason)?),
        },
    })
}

// ── Explanation reconstruction ──────────────────────────────────────────

/// Walk the reason chain of a clause: axiom and external leaves collect
/// facts, a top-down reason names the rule, bottom-up reasons recurse into
/// the parent rule and the resolving claim.
fn explanation_for(core: &Inference, clause: &IntClause) -> String {
    let mut facts: Vec<String> = Vec::new();
    let mut rule: Option<String> = None;
    walk_explanation(core, clause, &mut facts, &mut rule);
    match rule {
        Some(rule) => format!("from rule {} with facts: {}", rule, facts.join(", ")),
        None if facts.len() == 1 => facts.remove(0),
        None => facts.join(", "),
    }
}

fn walk_explanation(
    core: &Inference,
    clause: &IntClause,
    facts: &mut Vec<String>,
    rule: &mut Option<String>,
) {
    match core.state.reason_for(clause) {
        Some(ReasonInt::Axiom) | Some(ReasonInt::External) | None => {
            if let Some(head) = clause.first() {
                match core.factory.externalize_literal(head) {
                    Ok(lit) => facts.push(lit.to_string()),
                    Err(_) => facts.push(format!("{head:?}")),
                }
            }
        }
        Some(ReasonInt::Note(s)) => facts.push(s.clone()),
        Some(ReasonInt::TopDown { .. }) => {
            *rule = Some(core.factory.readable_clause(clause));
        }
        Some(ReasonInt::BottomUp {
            rule: parent,
            claim,
            ..
        }) => {
            let parent = parent.clone();
            let claim = claim.clone();
            walk_explanation(core, &parent, facts, rule);
            walk_explanation(core, &vec![claim], facts, rule);
        }
    }
}

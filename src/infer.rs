//! The inference core: top-down goal expansion interleaved with bottom-up
//! claim propagation.
//!
//! Everything here runs on the internal integer representation and is
//! serialised by the engine lock; recursion between `add_goal`,
//! `add_pending_rule`, and claim propagation happens freely inside one
//! locked step. Interpreted goals are not expanded against KB rules:
//! they move to the stuck index and a dispatch request is queued, which
//! the engine hands to the interpret state after releasing the lock.
//! Long-running external work therefore never holds the state lock.

use tracing::{debug, info, warn};

use crate::error::{GraphError, InferError};
use crate::factory::{IntClause, IntLit, TermFactory};
use crate::graph::{NodeKey, PendingRuleId, ReasonInt, Status};
use crate::interpret::InterpretState;
use crate::state::LogicalState;
use crate::term::Literal;
use crate::unify;

/// A goal waiting to be handed to the interpret state once the engine
/// releases the lock.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub external: Literal,
    pub internal: IntLit,
}

/// Where a pending rule came from, for dependency-graph wiring.
#[derive(Debug, Clone, Copy)]
enum Origin {
    /// Expansion of a goal against a KB rule (or a wrapper-pushed rule).
    TopDown,
    /// Bottom-up propagation of a claim through the given parent rule.
    BottomUp(PendingRuleId),
}

/// The inference state: term factory, logical state, and the queue of
/// pending interpret dispatches.
pub struct Inference {
    pub factory: TermFactory,
    pub state: LogicalState,
    dispatch_queue: Vec<DispatchRequest>,
}

impl Inference {
    pub fn new() -> Self {
        Inference {
            factory: TermFactory::new(),
            state: LogicalState::new(),
            dispatch_queue: Vec::new(),
        }
    }

    /// Forget everything, including interned symbols.
    pub fn clear(&mut self) {
        self.state.clear();
        self.factory.clear();
        self.dispatch_queue.clear();
    }

    /// Forget claims, keep KB rules.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Take the queued interpret dispatches. Called by the engine after
    /// every locked step.
    pub fn take_dispatches(&mut self) -> Vec<DispatchRequest> {
        std::mem::take(&mut self.dispatch_queue)
    }

    fn set_goal_status(&mut self, goal: &IntLit, status: Status) {
        match self.state.graph.annotation_mut(&NodeKey::Goal(goal.clone())) {
            Some(ann) => ann.status = status,
            None => info!(goal = ?goal, "goal has no annotation"),
        }
    }

    fn set_goal_resolved(&mut self, goal: &IntLit) {
        self.set_goal_status(goal, Status::Resolved);
    }

    // ── Claims ──────────────────────────────────────────────────────────

    /// Record a claim in the claims index and the reason ledger.
    fn register_claim(&mut self, claim: &IntLit, reason: ReasonInt) {
        self.state.add_claim(claim);
        self.state.record_reason(vec![claim.clone()], reason);
    }

    /// A claim arriving from outside (a wrapper, a remote node, or an
    /// axiom fact): attach it to every goal it answers, unsticking stuck
    /// ones, and propagate through their pending rules.
    pub fn add_external_claim(
        &mut self,
        claim: IntLit,
        reason: ReasonInt,
        interp: &dyn InterpretState,
    ) {
        debug!(claim = %self.factory.readable_clause(&vec![claim.clone()]), "adding claim");
        self.register_claim(&claim, reason.clone());
        let mut targets: Vec<IntLit> = Vec::new();
        for candidate in self.state.goals.generalizations(&claim) {
            if unify::unify(&claim, &candidate).is_some() && !targets.contains(&candidate) {
                targets.push(candidate);
            }
        }
        for candidate in self.state.stuck_goals.generalizations(&claim) {
            if unify::unify(&claim, &candidate).is_some() && !targets.contains(&candidate) {
                targets.push(candidate);
            }
        }
        for goal in targets {
            self.move_stuck_goal_to_goal(&goal);
            self.attach_and_propagate(&goal, &claim, reason.clone(), interp);
        }
    }

    /// Add a batch of claims. The engine holds the lock across the whole
    /// batch, so the close algorithm never observes a partial one.
    pub fn add_external_claims(
        &mut self,
        claims: Vec<(IntLit, ReasonInt)>,
        interp: &dyn InterpretState,
    ) {
        for (claim, reason) in claims {
            self.add_external_claim(claim, reason, interp);
        }
    }

    /// Attach a claim to a goal and push it through every pending rule
    /// whose subgoal is that goal.
    fn attach_and_propagate(
        &mut self,
        goal: &IntLit,
        claim: &IntLit,
        reason: ReasonInt,
        interp: &dyn InterpretState,
    ) {
        self.state.graph.add_claim_to_goal(goal, claim, reason);
        for rule in self.state.graph.parent_rules_of_goal(goal) {
            self.propagate_claims(goal, rule, interp);
        }
    }

    /// Replay the subgoal's claims through the rule, resuming from the
    /// rule's consumption counter. Re-entrant calls pick up where the
    /// previous one stopped, so no claim is consumed twice.
    fn propagate_claims(
        &mut self,
        subgoal: &IntLit,
        rule: PendingRuleId,
        interp: &dyn InterpretState,
    ) {
        loop {
            let consumed = match self.state.graph.annotation(&NodeKey::Rule(rule)) {
                Some(ann) => ann.subgoal_index,
                None => {
                    let defect = GraphError::MissingAnnotation {
                        node: rule.to_string(),
                    };
                    warn!(%defect, "claim propagation skipped");
                    return;
                }
            };
            let next = {
                let Some(ann) = self
                    .state
                    .graph
                    .annotation(&NodeKey::Goal(subgoal.clone()))
                else {
                    return;
                };
                match ann.claims.get(consumed) {
                    Some(claim) => Some((claim.clone(), ann.claim_reasons[consumed].clone())),
                    None => None,
                }
            };
            let Some((claim, claim_reason)) = next else {
                return;
            };
            self.propagate_one(&claim, claim_reason, rule, interp);
        }
    }

    /// Consume one claim with one pending rule: on unification, resolve
    /// away the rule's first body literal and add the shorter rule with a
    /// bottom-up reason. The counter advances either way; a ground claim
    /// that fails to unify now can never unify later.
    fn propagate_one(
        &mut self,
        claim: &IntLit,
        claim_reason: ReasonInt,
        rule: PendingRuleId,
        interp: &dyn InterpretState,
    ) {
        let Some(clause) = self.state.graph.rule_clause(rule).cloned() else {
            return;
        };
        let Some(selected) = clause.get(1).cloned() else {
            warn!(%rule, "pending rule without a selected literal cannot consume claims");
            return;
        };
        let parent_goal = self
            .state
            .graph
            .annotation(&NodeKey::Rule(rule))
            .and_then(|ann| ann.goal.clone());
        if let Some(ann) = self.state.graph.annotation_mut(&NodeKey::Rule(rule)) {
            ann.subgoal_index += 1;
        }
        let Some(subst) = unify::unify(claim, &selected) else {
            return;
        };
        let new_clause = unify::remove_first_body_literal(&clause, &subst, &mut self.factory);
        let reason = ReasonInt::BottomUp {
            rule: clause,
            claim: claim.clone(),
            reason: Box::new(claim_reason),
        };
        let Some(parent_goal) = parent_goal else {
            warn!(%rule, "pending rule has no originating goal");
            return;
        };
        self.add_pending_rule(new_clause, reason, parent_goal, Origin::BottomUp(rule), interp);
    }

    // ── Goals ───────────────────────────────────────────────────────────

    /// Add a goal. A renaming of an existing goal is dropped; the existing
    /// node serves both. Interpreted goals become stuck and are queued for
    /// the interpret state; everything else resolves against the KB.
    ///
    /// An interpreted goal whose arguments violate the registered modes is
    /// a programmer error: the goal is not added and
    /// [`InferError::InvalidModes`] is returned.
    pub fn add_goal(&mut self, goal: IntLit, interp: &dyn InterpretState) -> Result<(), InferError> {
        if self.state.renaming_of_goal(&goal).is_some() {
            debug!(goal = ?goal, "renaming already present");
            return Ok(());
        }
        self.state.graph.add_goal(&goal);

        let external = self.factory.externalize_literal(&goal)?;

        if interp.is_interpreted(&external) {
            if !interp.is_valid(&external) {
                return Err(InferError::InvalidModes {
                    goal: external.to_string(),
                    predicate: external.pred_name().to_string(),
                });
            }
            debug!(goal = %external, "goal stuck awaiting interpretation");
            self.state.add_stuck_goal(&goal);
            self.resolve_goal_with_existing_claims(&goal);
            self.dispatch_queue.push(DispatchRequest {
                external,
                internal: goal,
            });
        } else {
            info!(goal = %external, "goal");
            self.state.add_goal(&goal);
            self.resolve_goal(&goal, interp);
        }
        Ok(())
    }

    /// Expand a goal against every KB rule whose head could match, and
    /// against the claims already known.
    fn resolve_goal(&mut self, goal: &IntLit, interp: &dyn InterpretState) -> bool {
        let mut result = false;
        let candidates = self.state.rule_heads.matchings(goal);
        for candidate in candidates {
            let off = unify::offset(&candidate);
            let shifted_goal = unify::shift_literal(goal, off);
            if let Some(subst) = unify::unify(&candidate[0], &shifted_goal) {
                result = true;
                let pending = unify::apply_to_clause(&subst, &candidate, &mut self.factory);
                debug!(
                    rule = %self.factory.readable_clause(&candidate),
                    pending = %self.factory.readable_clause(&pending),
                    "goal expansion"
                );
                let reason = ReasonInt::TopDown {
                    rule: Some(candidate),
                    goal: goal.clone(),
                };
                self.add_pending_rule(pending, reason, goal.clone(), Origin::TopDown, interp);
            }
        }
        if self.resolve_goal_with_existing_claims(goal) {
            result = true;
        }
        self.set_goal_resolved(goal);
        result
    }

    /// A claim delivered before the goal existed still answers it.
    fn resolve_goal_with_existing_claims(&mut self, goal: &IntLit) -> bool {
        let mut result = false;
        for candidate in self.state.claims.matchings(goal) {
            if unify::unify(&candidate, goal).is_some() {
                let reason = self
                    .state
                    .reason_for(&vec![candidate.clone()])
                    .cloned()
                    .unwrap_or(ReasonInt::External);
                self.state.graph.add_claim_to_goal(goal, &candidate, reason);
                result = true;
            }
        }
        result
    }

    /// Match one specific rule against one goal; used when a rule arrives
    /// after goals that could use it.
    fn resolve_goal_with_rule(
        &mut self,
        goal: &IntLit,
        rule: &IntClause,
        interp: &dyn InterpretState,
    ) -> bool {
        let off = unify::offset(rule);
        let shifted_goal = unify::shift_literal(goal, off);
        let mut result = false;
        if let Some(subst) = unify::unify(&shifted_goal, &rule[0]) {
            result = true;
            let pending = unify::apply_to_clause(&subst, rule, &mut self.factory);
            let reason = ReasonInt::TopDown {
                rule: Some(rule.clone()),
                goal: goal.clone(),
            };
            self.add_pending_rule(pending, reason, goal.clone(), Origin::TopDown, interp);
        }
        self.set_goal_resolved(goal);
        result
    }

    // ── Pending rules ───────────────────────────────────────────────────

    /// Add a pending rule created by resolution (or pushed by a wrapper).
    ///
    /// A fact is treated as a claim for its originating goal. Otherwise
    /// the rule's first body literal becomes its subgoal: a fresh goal
    /// triggers resolution, a known one replays its claims through the
    /// rule from the consumption counter onward.
    fn add_pending_rule(
        &mut self,
        rule: IntClause,
        reason: ReasonInt,
        parent_goal: IntLit,
        origin: Origin,
        interp: &dyn InterpretState,
    ) -> Option<PendingRuleId> {
        // drop a pending rule whose ground head the originating goal
        // already claims
        if unify::is_ground(&rule[0]) {
            let resolved_goal = self
                .state
                .renaming_of_goal(&parent_goal)
                .unwrap_or_else(|| parent_goal.clone());
            if let Some(ann) = self
                .state
                .graph
                .annotation(&NodeKey::Goal(resolved_goal))
            {
                if ann.claims.contains(&rule[0]) {
                    debug!("pending rule subsumed by existing claim");
                    return None;
                }
            }
        }

        let prule = self.state.add_pending_rule(rule.clone());
        self.state.record_reason(rule.clone(), reason.clone());

        // wire the graph according to where the rule came from, and set
        // the goal this rule ultimately serves
        let rule_goal = match origin {
            Origin::TopDown => {
                self.state.graph.add_goal_to_pending_rule(&parent_goal, prule);
                parent_goal.clone()
            }
            Origin::BottomUp(parent) => {
                self.state.graph.add_pending_rule_to_pending_rule(parent, prule);
                self.state
                    .graph
                    .annotation(&NodeKey::Rule(parent))
                    .and_then(|ann| ann.goal.clone())
                    .unwrap_or_else(|| parent_goal.clone())
            }
        };
        if let Some(ann) = self.state.graph.annotation_mut(&NodeKey::Rule(prule)) {
            ann.goal = Some(rule_goal);
        }

        if unify::is_fact(&rule) {
            let claim_goal = self
                .state
                .graph
                .annotation(&NodeKey::Rule(prule))
                .and_then(|ann| ann.goal.clone())
                .unwrap_or(parent_goal);
            self.register_claim(&rule[0], reason.clone());
            self.move_stuck_goal_to_goal(&claim_goal);
            self.attach_and_propagate(&claim_goal, &rule[0], reason, interp);
            return Some(prule);
        }

        // the subgoal is the first body literal, or a known renaming of it
        let (subgoal, is_new) = match self.state.renaming_of_goal(&rule[1]) {
            Some(existing) => (existing, false),
            None => (rule[1].clone(), true),
        };
        self.state.graph.add_pending_rule_to_goal(prule, &subgoal);
        self.update_g_t(&subgoal, prule);
        if is_new {
            // inference never raises across the lock boundary: a subgoal
            // rejected mid-resolution becomes a log record, and its parent
            // simply never saturates
            if let Err(err) = self.add_goal(subgoal.clone(), interp) {
                warn!(%err, "subgoal rejected during resolution");
            }
        }
        // replay claims that were present before this rule existed (or
        // that arrived during the recursive resolution above)
        self.propagate_claims(&subgoal, prule, interp);
        Some(prule)
    }

    /// Wrapper entry point: a tool returned a rule body instead of plain
    /// substitutions. The rule expands under the interpreted goal.
    pub fn add_pending_rule_for_goal(
        &mut self,
        rule: IntClause,
        goal: IntLit,
        interp: &dyn InterpretState,
    ) {
        let reason = ReasonInt::TopDown {
            rule: None,
            goal: goal.clone(),
        };
        let target = self.state.renaming_of_goal(&goal).unwrap_or(goal);
        self.add_pending_rule(rule, reason, target.clone(), Origin::TopDown, interp);
        self.move_stuck_goal_to_goal(&target);
    }

    /// Record `prule` under `subgoal` in the `g_t` of the goal the rule
    /// serves; the close algorithm walks these links.
    fn update_g_t(&mut self, subgoal: &IntLit, prule: PendingRuleId) {
        let Some(goal) = self
            .state
            .graph
            .annotation(&NodeKey::Rule(prule))
            .and_then(|ann| ann.goal.clone())
        else {
            return;
        };
        if let Some(goal_ann) = self.state.graph.annotation_mut(&NodeKey::Goal(goal)) {
            goal_ann
                .g_t
                .entry(subgoal.clone())
                .or_default()
                .push(prule);
        }
    }

    // ── KB rules ────────────────────────────────────────────────────────

    /// Add a KB rule and re-resolve the goals (live and stuck) its head
    /// now covers. A stuck goal matched by the new rule becomes unstuck.
    pub fn add_rule(&mut self, rule: IntClause, reason: ReasonInt, interp: &dyn InterpretState) {
        if self.state.has_clause(&rule) {
            return;
        }
        self.state.record_reason(rule.clone(), reason);
        self.state.add_rule(&rule);
        for candidate in self.state.goals.matchings(&rule[0]) {
            self.resolve_goal_with_rule(&candidate, &rule, interp);
        }
        for candidate in self.state.stuck_goals.matchings(&rule[0]) {
            if self.resolve_goal_with_rule(&candidate, &rule, interp) {
                self.move_stuck_goal_to_goal(&candidate);
            }
        }
    }

    // ── Stuck-goal lifecycle ────────────────────────────────────────────

    fn move_stuck_goal_to_goal(&mut self, goal: &IntLit) {
        if self.state.is_stuck_goal(goal) {
            self.state.move_stuck_goal_to_goal(goal);
            self.set_goal_resolved(goal);
        }
    }

    /// The interpret state finished without answers: the goal is handled,
    /// just unsatisfied.
    pub fn push_no_solutions(&mut self, goal: &IntLit) {
        let target = self
            .state
            .renaming_of_goal(goal)
            .unwrap_or_else(|| goal.clone());
        self.move_stuck_goal_to_goal(&target);
    }

    /// Attach error claims to a goal regardless of head-matching, and
    /// unstick it. Wrapper failures land here as `error(tool, message)`.
    pub fn add_errors(&mut self, goal: &IntLit, errors: Vec<(IntLit, ReasonInt)>) {
        let target = self
            .state
            .renaming_of_goal(goal)
            .unwrap_or_else(|| goal.clone());
        for (error, reason) in errors {
            if !self.state.has_claim(&error) {
                self.register_claim(&error, reason.clone());
            }
            self.state.graph.add_claim_to_goal(&target, &error, reason);
        }
        self.move_stuck_goal_to_goal(&target);
    }

    /// Re-examine stuck goals after new predicates were registered:
    /// re-dispatch the ones that are now interpretable and re-resolve all
    /// of them against the KB.
    pub fn check_stuck_goals(&mut self, new_predicates: &[String], interp: &dyn InterpretState) {
        for goal in self.state.all_stuck_goals() {
            let Ok(external) = self.factory.externalize_literal(&goal) else {
                continue;
            };
            if new_predicates.iter().any(|p| p == external.pred_name())
                && interp.is_interpreted(&external)
            {
                self.dispatch_queue.push(DispatchRequest {
                    external,
                    internal: goal.clone(),
                });
                self.set_goal_resolved(&goal);
            }
            if self.resolve_goal(&goal, interp) {
                self.move_stuck_goal_to_goal(&goal);
            }
        }
    }

    // ── Introspection ───────────────────────────────────────────────────

    /// The claims (with reasons) that have reached a goal, through a
    /// renaming when one is registered.
    pub fn claims_matching_goal(&self, goal: &IntLit) -> Vec<(IntLit, ReasonInt)> {
        let target = self
            .state
            .renaming_of_goal(goal)
            .unwrap_or_else(|| goal.clone());
        match self.state.graph.annotation(&NodeKey::Goal(target)) {
            Some(ann) => ann
                .claims
                .iter()
                .cloned()
                .zip(ann.claim_reasons.iter().cloned())
                .collect(),
            None => {
                info!(goal = ?goal, "no annotation for goal");
                Vec::new()
            }
        }
    }

    /// Does any known claim satisfy the goal?
    pub fn is_entailed(&self, goal: &IntLit) -> bool {
        self.state
            .claims
            .specializations(goal)
            .into_iter()
            .any(|claim| unify::unify(&claim, goal).is_some())
    }

    pub fn close(&mut self) {
        self.state.close();
    }

    pub fn complete(&mut self) {
        self.state.complete();
    }

    pub fn is_completed(&self, goal: &IntLit) -> bool {
        self.state.is_completed(goal)
    }
}

//! The logical state: indexed stores for claims, KB rules, pending rules,
//! goals, and stuck goals, plus the goal-dependency graph.
//!
//! Five discrimination indexes drive resolution:
//!
//! - `claims` is keyed on claim heads,
//! - `rule_heads` on the heads of KB rules (goal resolution only),
//! - `pending_selected` on the first body literal of pending rules,
//! - `goals` and `stuck_goals` on the goal literal itself.
//!
//! A goal is stuck iff it sits in the stuck index; the two goal indexes are
//! disjoint. The `reasons` ledger maps clauses to the reason they were
//! derived with and feeds explanation reconstruction.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;
use tracing::debug;

use crate::factory::{IntClause, IntLit};
use crate::graph::{DependencyGraph, NodeKey, PendingRuleId, ReasonInt, Status};
use crate::index::DiscIndex;
use crate::unify;

/// All mutable stores of one engine, mutated atomically under the engine
/// lock.
#[derive(Debug, Default)]
pub struct LogicalState {
    /// Claim head → claim literal.
    pub claims: DiscIndex<IntLit>,
    /// KB rule head → rule clause. Pending rules never land here.
    pub rule_heads: DiscIndex<IntClause>,
    /// First body literal of a pending rule → the rule's identity.
    pub pending_selected: DiscIndex<PendingRuleId>,
    /// Goals under active resolution.
    pub goals: DiscIndex<IntLit>,
    /// Goals dispatched to the interpret state, awaiting answers.
    pub stuck_goals: DiscIndex<IntLit>,
    /// Clause → the reason it was recorded with.
    reasons: HashMap<IntClause, ReasonInt>,
    /// Dependencies between goals and pending rules.
    pub graph: DependencyGraph,
}

impl LogicalState {
    pub fn new() -> Self {
        LogicalState::default()
    }

    /// Drop everything; used when reading a fresh Datalog program.
    pub fn clear(&mut self) {
        self.claims.clear();
        self.rule_heads.clear();
        self.pending_selected.clear();
        self.goals.clear();
        self.stuck_goals.clear();
        self.reasons.clear();
        self.graph.clear();
    }

    /// Reset keeps KB rules and only forgets claims.
    pub fn reset(&mut self) {
        self.claims.clear();
    }

    pub fn global_time(&self) -> u64 {
        self.graph.global_time()
    }

    // ── Reasons ─────────────────────────────────────────────────────────

    pub fn record_reason(&mut self, clause: IntClause, reason: ReasonInt) {
        self.reasons.insert(clause, reason);
    }

    pub fn reason_for(&self, clause: &IntClause) -> Option<&ReasonInt> {
        self.reasons.get(clause)
    }

    /// Is the clause already present in the reason ledger?
    pub fn has_clause(&self, clause: &IntClause) -> bool {
        self.reasons.contains_key(clause)
    }

    // ── Claims ──────────────────────────────────────────────────────────

    pub fn add_claim(&mut self, claim: &IntLit) {
        if !self.claims.contains(claim, claim) {
            self.claims.insert(claim, claim.clone());
        }
    }

    pub fn has_claim(&self, claim: &IntLit) -> bool {
        self.claims.contains(claim, claim)
    }

    pub fn all_claims(&self) -> Vec<IntLit> {
        self.claims.values()
    }

    // ── KB rules ────────────────────────────────────────────────────────

    pub fn add_rule(&mut self, clause: &IntClause) {
        self.rule_heads.insert(&clause[0], clause.clone());
    }

    pub fn all_rules(&self) -> Vec<IntClause> {
        self.rule_heads.values()
    }

    // ── Pending rules ───────────────────────────────────────────────────

    /// Register a pending rule: a fresh graph node, plus an index entry on
    /// the first body literal when the rule has a body.
    pub fn add_pending_rule(&mut self, clause: IntClause) -> PendingRuleId {
        let selected = clause.get(1).cloned();
        let id = self.graph.new_pending_rule(clause);
        if let Some(selected) = selected {
            self.pending_selected.insert(&selected, id);
        }
        id
    }

    pub fn all_pending_rules(&self) -> Vec<PendingRuleId> {
        self.pending_selected.values()
    }

    // ── Goals and stuck goals ───────────────────────────────────────────

    pub fn add_goal(&mut self, goal: &IntLit) {
        if !self.goals.contains(goal, goal) {
            self.goals.insert(goal, goal.clone());
        }
        self.graph.add_goal(goal);
    }

    pub fn is_goal(&self, goal: &IntLit) -> bool {
        self.goals.contains(goal, goal)
    }

    pub fn all_goals(&self) -> Vec<IntLit> {
        self.goals.values()
    }

    pub fn add_stuck_goal(&mut self, goal: &IntLit) {
        if !self.stuck_goals.contains(goal, goal) {
            self.stuck_goals.insert(goal, goal.clone());
        }
        self.graph.add_goal(goal);
    }

    pub fn is_stuck_goal(&self, goal: &IntLit) -> bool {
        self.stuck_goals.contains(goal, goal)
    }

    pub fn all_stuck_goals(&self) -> Vec<IntLit> {
        self.stuck_goals.values()
    }

    pub fn move_goal_to_stuck(&mut self, goal: &IntLit) {
        self.goals.remove(goal, goal);
        self.add_stuck_goal(goal);
    }

    /// Unstick a goal: move it from the stuck index back to the goal index.
    pub fn move_stuck_goal_to_goal(&mut self, goal: &IntLit) {
        if self.is_stuck_goal(goal) {
            self.stuck_goals.remove(goal, goal);
            self.add_goal(goal);
        }
    }

    /// Find a goal already registered that is a variable renaming of
    /// `goal`, looking through both the live and the stuck index.
    pub fn renaming_of_goal(&self, goal: &IntLit) -> Option<IntLit> {
        for candidate in self.goals.renamings(goal) {
            if unify::is_renaming(goal, &candidate) {
                return Some(candidate);
            }
        }
        for candidate in self.stuck_goals.renamings(goal) {
            if unify::is_renaming(goal, &candidate) {
                return Some(candidate);
            }
        }
        None
    }

    // ── Saturation ──────────────────────────────────────────────────────

    pub fn close(&mut self) {
        self.graph.close();
    }

    /// Mark closed goals with no stuck subgoals completed: either every
    /// `g_d` entry is undefined, or an immediate supergoal is already
    /// completed.
    pub fn complete(&mut self) {
        debug!(nodes = self.graph.all_nodes().len(), "completion sweep");
        for idx in self.graph.all_nodes() {
            if !self.no_stuck_subgoals_at(idx) {
                continue;
            }
            if self.graph.annotation_at(idx).status != Status::Closed {
                continue;
            }
            let everywhere_undefined = self
                .graph
                .annotation_at(idx)
                .g_d
                .values()
                .all(|v| !matches!(v, Some(t) if *t > 0));
            if everywhere_undefined {
                self.set_status_at(idx, Status::Completed);
                continue;
            }
            let completed_supergoal = self.graph.all_nodes().into_iter().any(|sup| {
                self.graph.annotation_at(sup).status == Status::Completed
                    && self.graph.is_immediate_subgoal(idx, sup)
            });
            if completed_supergoal {
                self.set_status_at(idx, Status::Completed);
            }
        }
    }

    fn set_status_at(&mut self, idx: NodeIndex, status: Status) {
        let key = self.graph.annotation_at(idx).key.clone();
        if let Some(ann) = self.graph.annotation_mut(&key) {
            debug!(index = ann.index, ?status, "status change");
            ann.status = status;
        }
    }

    /// Renaming-aware completion check.
    pub fn is_completed(&self, goal: &IntLit) -> bool {
        match self.renaming_of_goal(goal) {
            Some(renamed) => self.graph.is_completed(&renamed),
            None => self.graph.is_completed(goal),
        }
    }

    /// A goal has no stuck subgoals when no goal reachable through
    /// bigger-indexed children is stuck.
    pub fn no_stuck_subgoals(&self, goal: &IntLit) -> bool {
        let key = NodeKey::Goal(goal.clone());
        match self.graph.node(&key) {
            Some(idx) => self.no_stuck_subgoals_at(idx),
            None => !self.is_stuck_goal(goal),
        }
    }

    fn no_stuck_subgoals_at(&self, idx: NodeIndex) -> bool {
        let node_index = self.graph.annotation_at(idx).index;
        let bigger: Vec<NodeIndex> = self
            .graph
            .children(idx)
            .into_iter()
            .filter(|&c| self.graph.annotation_at(c).index > node_index)
            .collect();
        if !bigger.is_empty() {
            return bigger.iter().all(|&c| self.no_stuck_subgoals_at(c));
        }
        match &self.graph.annotation_at(idx).key {
            NodeKey::Goal(lit) => {
                if self.is_stuck_goal(lit) {
                    false
                } else {
                    // a goal in neither index (e.g. rejected as invalid)
                    // does not block completion
                    true
                }
            }
            // leaf pending rules (all children older) do not block either
            NodeKey::Rule(_) => true,
        }
    }
}

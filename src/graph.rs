//! Goal-dependency graph with per-node annotations and the close algorithm.
//!
//! Nodes are goals (keyed by their internal literal) and pending rules
//! (keyed by identity: two structurally equal pending rules born in
//! different goals are different nodes). Edges run goal→pending-rule (the
//! rule was produced by expanding the goal), pending-rule→subgoal (the
//! rule's first body literal), and pending-rule→pending-rule (bottom-up
//! propagation from parent to child).
//!
//! The closing algorithm decides when a goal is saturated: `Closed` means
//! no further claims can arrive under the current graph, `Completed` means
//! closed with all transitive dependencies closed. The sweep is total: a
//! node with missing bookkeeping is skipped and logged, never fatal.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, warn};

use crate::error::GraphError;
use crate::factory::{IntClause, IntLit};

// ── Node identity ───────────────────────────────────────────────────────

/// Identity of a pending rule, independent of its clause value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PendingRuleId(u64);

impl std::fmt::Display for PendingRuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rule:{}", self.0)
    }
}

/// Key of a node in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Goal(IntLit),
    Rule(PendingRuleId),
}

/// What a node annotation describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Goal,
    PendingRule,
}

/// Lifecycle of a goal or pending rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Not processed in any way.
    Open,
    /// Resolution took place.
    Resolved,
    /// The closing algorithm determined no further claims can arrive.
    Closed,
    /// Closed, and all transitive dependencies are closed.
    Completed,
}

// ── Reasons (internal form) ─────────────────────────────────────────────

/// Why an internal claim or pending rule exists. The external mirror is
/// [`crate::term::Reason`]; this form stays inside the integer
/// representation so inference never leaves it.
#[derive(Debug, Clone, PartialEq)]
pub enum ReasonInt {
    Axiom,
    External,
    /// Resolution of a goal against a KB rule; the rule is absent when a
    /// wrapper pushed the pending rule directly.
    TopDown {
        rule: Option<IntClause>,
        goal: IntLit,
    },
    /// A claim resolved away the first body literal of a pending rule.
    BottomUp {
        rule: IntClause,
        claim: IntLit,
        reason: Box<ReasonInt>,
    },
    Note(String),
}

// ── Annotations ─────────────────────────────────────────────────────────

/// Metadata attached to each graph node.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub key: NodeKey,
    pub kind: NodeKind,
    /// Monotone global sequence number assigned on first insertion.
    pub index: u64,
    pub status: Status,
    /// Claims that have reached this goal (goals only), with their reasons
    /// kept in step.
    pub claims: Vec<IntLit>,
    pub claim_reasons: Vec<ReasonInt>,
    /// For pending rules: how many claims of the immediate subgoal have
    /// been consumed.
    pub subgoal_index: usize,
    /// For pending rules: the goal this rule ultimately serves.
    pub goal: Option<IntLit>,
    /// Subgoal → pending rules derived from that subgoal's claims under
    /// this goal.
    pub g_t: BTreeMap<IntLit, Vec<PendingRuleId>>,
    /// Per-goal claim counts used by the closing algorithm; `None` is ⊥.
    pub g_d: BTreeMap<IntLit, Option<usize>>,
    /// The maximum index among open dependencies of this goal, or ⊥.
    pub g_unclosed: Option<u64>,
}

impl Annotation {
    fn new(key: NodeKey, kind: NodeKind, index: u64) -> Self {
        Annotation {
            key,
            kind,
            index,
            status: Status::Open,
            claims: Vec::new(),
            claim_reasons: Vec::new(),
            subgoal_index: 0,
            goal: None,
            g_t: BTreeMap::new(),
            g_d: BTreeMap::new(),
            g_unclosed: None,
        }
    }

    pub fn is_goal(&self) -> bool {
        self.kind == NodeKind::Goal
    }

    /// The goal literal this annotation describes, when it is a goal.
    pub fn goal_literal(&self) -> Option<&IntLit> {
        match &self.key {
            NodeKey::Goal(lit) => Some(lit),
            NodeKey::Rule(_) => None,
        }
    }
}

// ── The graph ───────────────────────────────────────────────────────────

/// Directed multigraph of goals and pending rules with annotations.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<Annotation, ()>,
    nodes: HashMap<NodeKey, NodeIndex>,
    rule_clauses: HashMap<PendingRuleId, IntClause>,
    next_rule: u64,
    /// Global time; annotation indexes reflect insertion order.
    time: u64,
    /// Partial map from goal nodes to per-goal claim-consumption counts,
    /// recomputed by the closing algorithm.
    tau: HashMap<NodeIndex, BTreeMap<IntLit, Option<usize>>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph::default()
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.nodes.clear();
        self.rule_clauses.clear();
        self.tau.clear();
        self.next_rule = 0;
        self.time = 0;
    }

    pub fn global_time(&self) -> u64 {
        self.time
    }

    fn next_index(&mut self) -> u64 {
        self.time += 1;
        self.time
    }

    /// Register a goal node, returning its index. Idempotent.
    pub fn add_goal(&mut self, goal: &IntLit) -> NodeIndex {
        let key = NodeKey::Goal(goal.clone());
        if let Some(&idx) = self.nodes.get(&key) {
            return idx;
        }
        let index = self.next_index();
        let idx = self
            .graph
            .add_node(Annotation::new(key.clone(), NodeKind::Goal, index));
        self.nodes.insert(key, idx);
        idx
    }

    /// Register a fresh pending-rule node. Each call creates a new node
    /// even for structurally equal clauses.
    pub fn new_pending_rule(&mut self, clause: IntClause) -> PendingRuleId {
        let id = PendingRuleId(self.next_rule);
        self.next_rule += 1;
        self.rule_clauses.insert(id, clause);
        let key = NodeKey::Rule(id);
        let index = self.next_index();
        let idx = self
            .graph
            .add_node(Annotation::new(key.clone(), NodeKind::PendingRule, index));
        self.nodes.insert(key, idx);
        id
    }

    pub fn rule_clause(&self, id: PendingRuleId) -> Option<&IntClause> {
        self.rule_clauses.get(&id)
    }

    pub fn node(&self, key: &NodeKey) -> Option<NodeIndex> {
        self.nodes.get(key).copied()
    }

    pub fn annotation(&self, key: &NodeKey) -> Option<&Annotation> {
        self.nodes.get(key).map(|&idx| &self.graph[idx])
    }

    pub fn annotation_mut(&mut self, key: &NodeKey) -> Option<&mut Annotation> {
        match self.nodes.get(key) {
            Some(&idx) => Some(&mut self.graph[idx]),
            None => None,
        }
    }

    pub fn annotation_at(&self, idx: NodeIndex) -> &Annotation {
        &self.graph[idx]
    }

    /// Edge: expanding `goal` produced `rule`.
    pub fn add_goal_to_pending_rule(&mut self, goal: &IntLit, rule: PendingRuleId) {
        let from = self.add_goal(goal);
        if let Some(&to) = self.nodes.get(&NodeKey::Rule(rule)) {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Edge: `rule`'s first body literal is `goal`.
    pub fn add_pending_rule_to_goal(&mut self, rule: PendingRuleId, goal: &IntLit) {
        let to = self.add_goal(goal);
        if let Some(&from) = self.nodes.get(&NodeKey::Rule(rule)) {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Edge: bottom-up propagation derived `child` from `parent`.
    pub fn add_pending_rule_to_pending_rule(&mut self, parent: PendingRuleId, child: PendingRuleId) {
        if let (Some(&from), Some(&to)) = (
            self.nodes.get(&NodeKey::Rule(parent)),
            self.nodes.get(&NodeKey::Rule(child)),
        ) {
            self.graph.add_edge(from, to, ());
        }
    }

    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.graph.neighbors_directed(idx, Direction::Outgoing).collect()
    }

    pub fn parents(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.graph.neighbors_directed(idx, Direction::Incoming).collect()
    }

    /// The pending rules whose first body literal is `goal`.
    pub fn parent_rules_of_goal(&self, goal: &IntLit) -> Vec<PendingRuleId> {
        match self.nodes.get(&NodeKey::Goal(goal.clone())) {
            Some(&idx) => self
                .parents(idx)
                .into_iter()
                .filter_map(|p| match &self.graph[p].key {
                    NodeKey::Rule(id) => Some(*id),
                    NodeKey::Goal(_) => None,
                })
                .collect(),
            None => Vec::new(),
        }
    }

    /// Append a claim (with its reason) to the goal's annotation.
    ///
    /// Duplicates are dropped. A completed goal's claim set is final; a
    /// late arrival is logged as a defect and dropped.
    pub fn add_claim_to_goal(&mut self, goal: &IntLit, claim: &IntLit, reason: ReasonInt) {
        let idx = self.add_goal(goal);
        let ann = &mut self.graph[idx];
        if ann.status == Status::Completed {
            let defect = GraphError::CompletedGoalMutated {
                goal: format!("{goal:?}"),
            };
            warn!(%defect, claim = ?claim, "claim dropped");
            return;
        }
        if !ann.claims.contains(claim) {
            ann.claims.push(claim.clone());
            ann.claim_reasons.push(reason);
        }
    }

    /// Does the node have a child that is a goal?
    pub fn has_subgoal(&self, idx: NodeIndex) -> bool {
        self.children(idx)
            .into_iter()
            .any(|c| self.graph[c].is_goal())
    }

    /// All goal nodes currently in the graph.
    pub fn goal_nodes(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph[idx].is_goal())
            .collect()
    }

    pub fn all_nodes(&self) -> Vec<NodeIndex> {
        self.graph.node_indices().collect()
    }

    pub fn is_completed(&self, goal: &IntLit) -> bool {
        self.annotation(&NodeKey::Goal(goal.clone()))
            .is_some_and(|ann| ann.status == Status::Completed)
    }

    // ── Closing algorithm ───────────────────────────────────────────────

    /// Sweep all goal nodes, newest first, attempting to close each.
    pub fn close(&mut self) {
        let mut goals = self.goal_nodes();
        goals.sort_by_key(|&idx| std::cmp::Reverse(self.graph[idx].index));
        for idx in goals {
            self.close_goal(idx);
        }
    }

    fn close_goal(&mut self, idx: NodeIndex) {
        if !self.can_close(idx) {
            return;
        }
        self.update_tau(idx);
        let ann = &self.graph[idx];
        let Some(node_lit) = ann.goal_literal().cloned() else {
            return;
        };
        let claims_len = ann.claims.len();
        let tau_gg = self
            .tau
            .get(&idx)
            .and_then(|row| row.get(&node_lit))
            .copied()
            .flatten();
        // τ(g)(g) undefined (or zero, meaning nothing was consumed through
        // g) closes immediately; otherwise it must account for every claim.
        let closes = match tau_gg {
            None | Some(0) => true,
            Some(n) => n == claims_len,
        };
        if closes {
            debug!(index = self.graph[idx].index, "goal closed");
            self.graph[idx].status = Status::Closed;
            self.close_node(idx);
        } else {
            self.graph[idx].status = Status::Resolved;
        }
    }

    /// The precondition of the close rule.
    fn can_close(&self, idx: NodeIndex) -> bool {
        let ann = &self.graph[idx];
        if !matches!(
            ann.status,
            Status::Resolved | Status::Closed | Status::Completed
        ) {
            return false;
        }
        // every child pending rule with a body must have its subgoal set
        for child in self.children(idx) {
            if let NodeKey::Rule(id) = &self.graph[child].key {
                let has_body = self
                    .rule_clauses
                    .get(id)
                    .is_some_and(|clause| clause.len() > 1);
                if has_body && !self.has_subgoal(child) {
                    return false;
                }
            }
        }
        for h_idx in self.goal_nodes() {
            let h_ann = &self.graph[h_idx];
            let Some(h_lit) = h_ann.goal_literal() else {
                continue;
            };
            let gth: &[PendingRuleId] = ann.g_t.get(h_lit).map(Vec::as_slice).unwrap_or(&[]);
            let h_is_older = h_ann.index <= ann.index;
            let h_closed_enough = h_ann.status == Status::Completed
                || (h_ann.status == Status::Closed
                    && h_ann.g_unclosed.is_none_or(|u| u <= ann.index));
            if !gth.is_empty() && !h_is_older && !h_closed_enough {
                return false;
            }
            for &j in gth {
                let Some(j_ann) = self.annotation(&NodeKey::Rule(j)) else {
                    let defect = GraphError::MissingAnnotation { node: j.to_string() };
                    warn!(%defect, "close precondition short-circuited");
                    return false;
                };
                if j_ann.subgoal_index != h_ann.claims.len() {
                    return false;
                }
                let Some(&j_idx) = self.nodes.get(&NodeKey::Rule(j)) else {
                    return false;
                };
                for j_child in self.children(j_idx) {
                    if let NodeKey::Rule(child_id) = &self.graph[j_child].key {
                        let unit = self
                            .rule_clauses
                            .get(child_id)
                            .is_some_and(|clause| clause.len() == 1);
                        if !unit && !self.has_subgoal(j_child) {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }

    /// Recompute τ(g): for each goal `h` no newer than `g`, the number of
    /// claims of `h` consumed by the closure transitively through `g`.
    fn update_tau(&mut self, idx: NodeIndex) {
        let node_index = self.graph[idx].index;
        let g_t = self.graph[idx].g_t.clone();
        let mut row: BTreeMap<IntLit, Option<usize>> = BTreeMap::new();
        for h_idx in self.goal_nodes() {
            let h_ann = &self.graph[h_idx];
            if h_ann.index > node_index {
                continue;
            }
            let Some(h_lit) = h_ann.goal_literal().cloned() else {
                continue;
            };
            let mut tau_g_h: Option<usize> = None;
            for (h_prime, rules) in &g_t {
                if rules.is_empty() {
                    continue;
                }
                let Some(hp_ann) = self.annotation(&NodeKey::Goal(h_prime.clone())) else {
                    continue;
                };
                if !matches!(hp_ann.status, Status::Closed | Status::Completed) {
                    continue;
                }
                if let Some(Some(v)) = hp_ann.g_d.get(&h_lit) {
                    tau_g_h = Some(match tau_g_h {
                        None => *v,
                        Some(prev) => prev.min(*v),
                    });
                }
            }
            row.insert(h_lit, tau_g_h);
        }
        self.tau.insert(idx, row);
    }

    /// Update `g_d` from τ(g) and either complete the goal transitively or
    /// recompute its unclosed horizon.
    fn close_node(&mut self, idx: NodeIndex) {
        let node_index = self.graph[idx].index;
        let tau_row = self.tau.get(&idx).cloned().unwrap_or_default();
        let g_t_nonempty: BTreeSet<IntLit> = self.graph[idx]
            .g_t
            .iter()
            .filter(|(_, rules)| !rules.is_empty())
            .map(|(lit, _)| lit.clone())
            .collect();

        // snapshot of the older goals before mutating this node
        let older: Vec<(IntLit, Status, usize)> = self
            .goal_nodes()
            .into_iter()
            .filter(|&h| self.graph[h].index < node_index)
            .filter_map(|h| {
                let ann = &self.graph[h];
                ann.goal_literal()
                    .map(|lit| (lit.clone(), ann.status, ann.claims.len()))
            })
            .collect();

        let mut g_d: BTreeMap<IntLit, Option<usize>> = BTreeMap::new();
        let mut everywhere_undefined = true;
        for (h_lit, h_status, h_claims) in older {
            let h_closed = matches!(h_status, Status::Closed | Status::Completed);
            let tau_h = tau_row.get(&h_lit).copied().flatten();
            if g_t_nonempty.contains(&h_lit) && !h_closed {
                let v = match tau_h {
                    Some(t) => h_claims.min(t),
                    None => h_claims,
                };
                g_d.insert(h_lit, Some(v));
                everywhere_undefined = false;
            } else if let Some(t) = tau_h.filter(|&t| t > 0) {
                if !h_closed {
                    g_d.insert(h_lit, Some(t));
                    everywhere_undefined = false;
                } else {
                    g_d.insert(h_lit, None);
                }
            } else {
                g_d.insert(h_lit, None);
            }
        }
        self.graph[idx].g_d = g_d;

        if everywhere_undefined {
            self.transitively_complete(idx);
        } else {
            self.recompute_unclosed(idx);
        }
    }

    /// Mark the node and every goal reachable through its `g_t` completed.
    fn transitively_complete(&mut self, idx: NodeIndex) {
        let mut work = vec![idx];
        while let Some(current) = work.pop() {
            self.graph[current].status = Status::Completed;
            debug!(index = self.graph[current].index, "goal completed");
            let dependents: Vec<NodeIndex> = self.graph[current]
                .g_t
                .keys()
                .filter_map(|h| self.nodes.get(&NodeKey::Goal(h.clone())).copied())
                .collect();
            for dep in dependents {
                if self.graph[dep].status != Status::Completed {
                    work.push(dep);
                }
            }
        }
    }

    /// `g_unclosed` is the maximum index among dependencies with a defined
    /// `g_d` entry.
    fn recompute_unclosed(&mut self, idx: NodeIndex) {
        let mut max_index: Option<u64> = None;
        let defined: Vec<IntLit> = self.graph[idx]
            .g_d
            .iter()
            .filter_map(|(h, v)| (*v).filter(|&t| t > 0).map(|_| h.clone()))
            .collect();
        for h in defined {
            if let Some(h_ann) = self.annotation(&NodeKey::Goal(h)) {
                max_index = Some(match max_index {
                    None => h_ann.index,
                    Some(m) => m.max(h_ann.index),
                });
            }
        }
        self.graph[idx].g_unclosed = max_index;
    }

    /// Is the node at `sub` the immediate subgoal of a rule produced by the
    /// node at `sup`?
    pub fn is_immediate_subgoal(&self, sub: NodeIndex, sup: NodeIndex) -> bool {
        for child in self.children(sup) {
            if !matches!(self.graph[child].key, NodeKey::Rule(_)) {
                continue;
            }
            for grandchild in self.children(child) {
                if self.graph[grandchild].is_goal() {
                    if grandchild == sub {
                        return true;
                    }
                    break;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_registration_is_idempotent() {
        let mut g = DependencyGraph::new();
        let a = g.add_goal(&vec![1, -1]);
        let b = g.add_goal(&vec![1, -1]);
        assert_eq!(a, b);
        assert_eq!(g.goal_nodes().len(), 1);
    }

    #[test]
    fn pending_rules_have_distinct_identity() {
        let mut g = DependencyGraph::new();
        let clause = vec![vec![1, -1], vec![2, -1]];
        let r1 = g.new_pending_rule(clause.clone());
        let r2 = g.new_pending_rule(clause);
        assert_ne!(r1, r2);
        assert_eq!(g.all_nodes().len(), 2);
    }

    #[test]
    fn annotation_indexes_follow_insertion_order() {
        let mut g = DependencyGraph::new();
        g.add_goal(&vec![1, -1]);
        let r = g.new_pending_rule(vec![vec![1, -1], vec![2, -1]]);
        g.add_goal(&vec![2, -1]);
        let goal1 = g.annotation(&NodeKey::Goal(vec![1, -1])).unwrap();
        let rule = g.annotation(&NodeKey::Rule(r)).unwrap();
        let goal2 = g.annotation(&NodeKey::Goal(vec![2, -1])).unwrap();
        assert!(goal1.index < rule.index);
        assert!(rule.index < goal2.index);
    }

    #[test]
    fn claims_are_deduplicated() {
        let mut g = DependencyGraph::new();
        g.add_goal(&vec![1, -1]);
        g.add_claim_to_goal(&vec![1, -1], &vec![1, 2], ReasonInt::Axiom);
        g.add_claim_to_goal(&vec![1, -1], &vec![1, 2], ReasonInt::External);
        let ann = g.annotation(&NodeKey::Goal(vec![1, -1])).unwrap();
        assert_eq!(ann.claims.len(), 1);
        assert_eq!(ann.claim_reasons.len(), 1);
    }

    #[test]
    fn completed_goal_claims_are_final() {
        let mut g = DependencyGraph::new();
        g.add_goal(&vec![1, -1]);
        g.annotation_mut(&NodeKey::Goal(vec![1, -1])).unwrap().status = Status::Completed;
        g.add_claim_to_goal(&vec![1, -1], &vec![1, 2], ReasonInt::Axiom);
        let ann = g.annotation(&NodeKey::Goal(vec![1, -1])).unwrap();
        assert!(ann.claims.is_empty());
    }

    #[test]
    fn isolated_resolved_goal_closes_and_completes() {
        let mut g = DependencyGraph::new();
        g.add_goal(&vec![1, 2]);
        g.annotation_mut(&NodeKey::Goal(vec![1, 2])).unwrap().status = Status::Resolved;
        g.close();
        assert!(g.is_completed(&vec![1, 2]));
    }

    #[test]
    fn open_goal_does_not_close() {
        let mut g = DependencyGraph::new();
        g.add_goal(&vec![1, 2]);
        g.close();
        assert!(!g.is_completed(&vec![1, 2]));
        let ann = g.annotation(&NodeKey::Goal(vec![1, 2])).unwrap();
        assert_eq!(ann.status, Status::Open);
    }

    #[test]
    fn goal_with_unconsumed_subgoal_claims_stays_open() {
        let mut g = DependencyGraph::new();
        let goal = vec![1, -1];
        let subgoal = vec![2, -1];
        g.add_goal(&goal);
        let rule = g.new_pending_rule(vec![vec![1, -1], vec![2, -1]]);
        g.add_goal_to_pending_rule(&goal, rule);
        g.add_pending_rule_to_goal(rule, &subgoal);
        g.annotation_mut(&NodeKey::Goal(goal.clone())).unwrap().status = Status::Resolved;
        g.annotation_mut(&NodeKey::Goal(subgoal.clone())).unwrap().status = Status::Resolved;
        g.annotation_mut(&NodeKey::Rule(rule)).unwrap().goal = Some(goal.clone());
        g.annotation_mut(&NodeKey::Goal(goal.clone()))
            .unwrap()
            .g_t
            .insert(subgoal.clone(), vec![rule]);
        // a claim arrived at the subgoal that the rule has not consumed
        g.add_claim_to_goal(&subgoal, &vec![2, 3], ReasonInt::Axiom);
        g.close();
        let ann = g.annotation(&NodeKey::Goal(goal)).unwrap();
        assert_ne!(ann.status, Status::Completed);
    }

    #[test]
    fn chain_closes_bottom_up() {
        let mut g = DependencyGraph::new();
        let goal = vec![1, -1];
        let subgoal = vec![2, -1];
        g.add_goal(&goal);
        let rule = g.new_pending_rule(vec![vec![1, -1], vec![2, -1]]);
        g.add_goal_to_pending_rule(&goal, rule);
        g.add_pending_rule_to_goal(rule, &subgoal);
        g.annotation_mut(&NodeKey::Goal(goal.clone())).unwrap().status = Status::Resolved;
        g.annotation_mut(&NodeKey::Goal(subgoal.clone())).unwrap().status = Status::Resolved;
        g.annotation_mut(&NodeKey::Rule(rule)).unwrap().goal = Some(goal.clone());
        g.annotation_mut(&NodeKey::Goal(goal.clone()))
            .unwrap()
            .g_t
            .insert(subgoal.clone(), vec![rule]);
        g.add_claim_to_goal(&subgoal, &vec![2, 3], ReasonInt::Axiom);
        g.annotation_mut(&NodeKey::Rule(rule)).unwrap().subgoal_index = 1;
        g.add_claim_to_goal(&goal, &vec![1, 3], ReasonInt::Axiom);
        g.close();
        assert!(g.is_completed(&subgoal));
        assert!(g.is_completed(&goal));
    }

    #[test]
    fn immediate_subgoal_detection() {
        let mut g = DependencyGraph::new();
        let goal = vec![1, -1];
        let subgoal = vec![2, -1];
        let sup = g.add_goal(&goal);
        let rule = g.new_pending_rule(vec![vec![1, -1], vec![2, -1]]);
        g.add_goal_to_pending_rule(&goal, rule);
        g.add_pending_rule_to_goal(rule, &subgoal);
        let sub = g.node(&NodeKey::Goal(subgoal)).unwrap();
        assert!(g.is_immediate_subgoal(sub, sup));
        assert!(!g.is_immediate_subgoal(sup, sub));
    }
}

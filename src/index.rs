//! Discrimination-tree index over internal literals.
//!
//! Based on non-perfect discrimination trees (McCune, "Experiments with
//! Discrimination-Tree Indexing and Path Indexing for Term Retrieval").
//! Keys are internal literals with every variable normalised to the single
//! wildcard `-1`; values are bags stored at the node the key path ends on.
//!
//! The four retrieval operations are syntactic supersets of the semantic
//! relations (different variables collapse to one wildcard), so callers
//! confirm candidates with a subsequent unification.

use std::collections::BTreeMap;

use crate::factory::{IntLit, Sym};

const WILDCARD: Sym = -1;

#[derive(Debug, Clone)]
struct Node<V> {
    children: BTreeMap<Sym, Node<V>>,
    values: Vec<V>,
}

impl<V> Default for Node<V> {
    fn default() -> Self {
        Node {
            children: BTreeMap::new(),
            values: Vec::new(),
        }
    }
}

/// Which retrieval relation a lookup walks the tree with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retrieval {
    /// Entries more general than the probe: wildcard matches wildcard,
    /// a constant matches the same constant or a wildcard.
    Generalizations,
    /// Ground entries more specific than the probe: wildcard matches every
    /// constant, a constant matches only itself.
    Specializations,
    /// Entries that could unify: wildcard matches anything, a constant
    /// matches itself or a wildcard.
    Matchings,
    /// Entries equal up to variable renaming: wildcard matches wildcard,
    /// a constant matches only itself.
    Renamings,
}

/// A discrimination-tree index from internal literals to bags of values.
#[derive(Debug, Clone)]
pub struct DiscIndex<V> {
    root: Node<V>,
    len: usize,
}

impl<V> Default for DiscIndex<V> {
    fn default() -> Self {
        DiscIndex {
            root: Node::default(),
            len: 0,
        }
    }
}

fn normalize(key: &[Sym]) -> Vec<Sym> {
    key.iter()
        .map(|&x| if x >= 0 { x } else { WILDCARD })
        .collect()
}

impl<V: Clone + PartialEq> DiscIndex<V> {
    pub fn new() -> Self {
        DiscIndex::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.root = Node::default();
        self.len = 0;
    }

    /// Add `value` at the node reached by the key path.
    pub fn insert(&mut self, key: &IntLit, value: V) {
        let mut node = &mut self.root;
        for k in normalize(key) {
            node = node.children.entry(k).or_default();
        }
        node.values.push(value);
        self.len += 1;
    }

    /// Remove every occurrence of `value` at the key path.
    pub fn remove(&mut self, key: &IntLit, value: &V) {
        let mut node = &mut self.root;
        for k in normalize(key) {
            match node.children.get_mut(&k) {
                Some(child) => node = child,
                None => return,
            }
        }
        let before = node.values.len();
        node.values.retain(|v| v != value);
        self.len -= before - node.values.len();
    }

    /// Is `value` present at the key path?
    pub fn contains(&self, key: &IntLit, value: &V) -> bool {
        let mut node = &self.root;
        for k in normalize(key) {
            match node.children.get(&k) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.values.contains(value)
    }

    /// All values in the index, in key order.
    pub fn values(&self) -> Vec<V> {
        let mut out = Vec::with_capacity(self.len);
        fn walk<V: Clone>(node: &Node<V>, out: &mut Vec<V>) {
            out.extend(node.values.iter().cloned());
            for child in node.children.values() {
                walk(child, out);
            }
        }
        walk(&self.root, &mut out);
        out
    }

    fn retrieve(&self, key: &IntLit, mode: Retrieval) -> Vec<V> {
        let mut out = Vec::new();
        let normalized = normalize(key);
        collect(&self.root, &normalized, mode, &mut out);
        out
    }

    /// Candidate entries more general than the probe literal.
    pub fn generalizations(&self, key: &IntLit) -> Vec<V> {
        self.retrieve(key, Retrieval::Generalizations)
    }

    /// Candidate ground entries more specific than the probe literal.
    pub fn specializations(&self, key: &IntLit) -> Vec<V> {
        self.retrieve(key, Retrieval::Specializations)
    }

    /// Candidate entries that could unify with the probe literal.
    pub fn matchings(&self, key: &IntLit) -> Vec<V> {
        self.retrieve(key, Retrieval::Matchings)
    }

    /// Candidate entries equal to the probe literal up to variable renaming.
    pub fn renamings(&self, key: &IntLit) -> Vec<V> {
        self.retrieve(key, Retrieval::Renamings)
    }
}

fn collect<V: Clone>(node: &Node<V>, key: &[Sym], mode: Retrieval, out: &mut Vec<V>) {
    let Some((&k, rest)) = key.split_first() else {
        out.extend(node.values.iter().cloned());
        return;
    };
    if k == WILDCARD {
        match mode {
            Retrieval::Generalizations | Retrieval::Renamings => {
                if let Some(child) = node.children.get(&WILDCARD) {
                    collect(child, rest, mode, out);
                }
            }
            Retrieval::Specializations => {
                for (&c, child) in &node.children {
                    if c > 0 {
                        collect(child, rest, mode, out);
                    }
                }
            }
            Retrieval::Matchings => {
                for child in node.children.values() {
                    collect(child, rest, mode, out);
                }
            }
        }
    } else {
        match mode {
            Retrieval::Generalizations | Retrieval::Matchings => {
                if let Some(child) = node.children.get(&WILDCARD) {
                    collect(child, rest, mode, out);
                }
                if let Some(child) = node.children.get(&k) {
                    collect(child, rest, mode, out);
                }
            }
            Retrieval::Specializations | Retrieval::Renamings => {
                if let Some(child) = node.children.get(&k) {
                    collect(child, rest, mode, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_contains() {
        let mut index: DiscIndex<&str> = DiscIndex::new();
        index.insert(&vec![-1, 3, 4], "a");
        index.insert(&vec![-1, 2, 4], "b");
        index.insert(&vec![-1, 3, 4], "c");
        assert!(index.contains(&vec![-1, 3, 4], &"a"));
        assert!(index.contains(&vec![-5, 3, 4], &"c"));
        assert!(!index.contains(&vec![-1, 3, 4], &"b"));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn remove_deletes_all_occurrences() {
        let mut index: DiscIndex<&str> = DiscIndex::new();
        index.insert(&vec![1, 2], "x");
        index.insert(&vec![1, 2], "x");
        index.insert(&vec![1, 2], "y");
        index.remove(&vec![1, 2], &"x");
        assert!(!index.contains(&vec![1, 2], &"x"));
        assert!(index.contains(&vec![1, 2], &"y"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn generalizations_match_wildcard_or_same_constant() {
        let mut index: DiscIndex<&str> = DiscIndex::new();
        index.insert(&vec![1, -2, -3], "b");
        index.insert(&vec![1, -2, 3], "a");
        let mut found = index.generalizations(&vec![1, 4, 3]);
        found.sort();
        assert_eq!(found, vec!["a", "b"]);
    }

    #[test]
    fn specializations_require_ground_constants() {
        let mut index: DiscIndex<&str> = DiscIndex::new();
        index.insert(&vec![1, 4, 2], "1");
        index.insert(&vec![1, 3, 2], "2");
        index.insert(&vec![1, -1, 2], "3");
        index.insert(&vec![1, 4, 3], "4");
        let mut found = index.specializations(&vec![1, -1, 2]);
        found.sort();
        assert_eq!(found, vec!["1", "2"]);
        assert_eq!(index.specializations(&vec![1, -1, 3]), vec!["4"]);
        assert!(index.specializations(&vec![1, -1, 5]).is_empty());
    }

    #[test]
    fn matchings_cover_unifiable_supersets() {
        let mut index: DiscIndex<&str> = DiscIndex::new();
        index.insert(&vec![1, 4, 2], "ground");
        index.insert(&vec![1, -1, 2], "var");
        let mut found = index.matchings(&vec![1, 4, 2]);
        found.sort();
        assert_eq!(found, vec!["ground", "var"]);
        // probe with a variable matches everything at that position
        let mut found = index.matchings(&vec![1, -7, 2]);
        found.sort();
        assert_eq!(found, vec!["ground", "var"]);
    }

    #[test]
    fn renamings_fix_constants_exactly() {
        let mut index: DiscIndex<&str> = DiscIndex::new();
        index.insert(&vec![1, -1, 2], "r");
        index.insert(&vec![1, 5, 2], "g");
        assert_eq!(index.renamings(&vec![1, -9, 2]), vec!["r"]);
        assert_eq!(index.renamings(&vec![1, 5, 2]), vec!["g"]);
        assert!(index.renamings(&vec![1, 6, 2]).is_empty());
    }

    #[test]
    fn different_predicates_do_not_mix() {
        let mut index: DiscIndex<&str> = DiscIndex::new();
        index.insert(&vec![1, 2], "p");
        index.insert(&vec![9, 2], "q");
        assert_eq!(index.matchings(&vec![1, 2]), vec!["p"]);
    }

    #[test]
    fn values_traverses_everything() {
        let mut index: DiscIndex<&str> = DiscIndex::new();
        index.insert(&vec![1, 2], "a");
        index.insert(&vec![1, -1], "b");
        index.insert(&vec![3], "c");
        let mut all = index.values();
        all.sort();
        assert_eq!(all, vec!["a", "b", "c"]);
    }
}

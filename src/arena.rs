use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::node::Node;

/// Arena-based storage for one specification tree.
///
/// Uses a generational arena for memory-safe node references: children are
/// owned through the arena, parent links are plain non-owning indices.
/// Nodes are never removed, so an index handed out once stays valid for the
/// life of the tree.
#[derive(Debug)]
pub struct SpecArena {
    arena: Arena<Node>,
    root: Option<Index>,
}

impl Default for SpecArena {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    #[instrument(level = "trace", skip(self, node))]
    pub fn insert_root(&mut self, node: Node) -> Index {
        let root = self.arena.insert(node);
        self.root = Some(root);
        root
    }

    /// Locates the attachment parent for a node placed with `rank`: the
    /// nearest ancestor-or-self of `from` whose kind ranks strictly below
    /// `rank`. Ancestors ranking at or above the new rank are skipped, which
    /// is what makes a second assertion chained off a first one land as its
    /// sibling rather than its child.
    #[instrument(level = "trace", skip(self))]
    pub fn placement_parent(&self, from: Index, rank: u8) -> Option<Index> {
        let mut cursor = Some(from);
        while let Some(idx) = cursor {
            let node = self.node(idx)?;
            if node.kind.rank() < rank {
                return Some(idx);
            }
            cursor = node.parent;
        }
        None
    }

    /// Attaches `node` beneath the placement parent computed from `from` and
    /// the node's own kind, returning the new index and the parent's index.
    #[instrument(level = "trace", skip(self, node))]
    pub fn attach(&mut self, from: Index, node: Node) -> Option<(Index, Index)> {
        let parent_idx = self.placement_parent(from, node.kind.rank())?;
        let mut node = node;
        node.parent = Some(parent_idx);
        let node_idx = self.arena.insert(node);
        if let Some(parent) = self.arena.get_mut(parent_idx) {
            parent.children.push(node_idx);
        }
        Some((node_idx, parent_idx))
    }

    pub fn node(&self, idx: Index) -> Option<&Node> {
        self.arena.get(idx)
    }

    pub fn node_mut(&mut self, idx: Index) -> Option<&mut Node> {
        self.arena.get_mut(idx)
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    /// Pre-order traversal from the root.
    #[instrument(level = "trace", skip(self))]
    pub fn iter(&self) -> TreeIterator {
        TreeIterator::new(self)
    }

    /// Collects every scenario as a root-to-node path, in attachment order.
    ///
    /// A scenario ends at each assertion node; the walk still recurses into
    /// that node's children, so a node can close one scenario and remain an
    /// ancestor of deeper ones.
    #[instrument(level = "debug", skip(self))]
    pub fn scenarios(&self) -> Vec<Vec<Index>> {
        let mut scenarios = Vec::new();
        if let Some(root) = self.root {
            let mut path = Vec::new();
            self.collect_scenarios(root, &mut path, &mut scenarios);
        }
        scenarios
    }

    fn collect_scenarios(&self, idx: Index, path: &mut Vec<Index>, out: &mut Vec<Vec<Index>>) {
        if let Some(node) = self.node(idx) {
            path.push(idx);
            if node.kind.is_assertion() {
                out.push(path.clone());
            }
            for &child in &node.children {
                self.collect_scenarios(child, path, out);
            }
            path.pop();
        }
    }
}

impl std::ops::Index<Index> for SpecArena {
    type Output = Node;

    fn index(&self, idx: Index) -> &Node {
        &self.arena[idx]
    }
}

pub struct TreeIterator<'a> {
    arena: &'a SpecArena,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(arena: &'a SpecArena) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = arena.root() {
            stack.push(root);
        }
        Self { arena, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.arena.node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Action, Kind};

    fn node(kind: Kind, description: &str) -> Node {
        Node::new(description.to_string(), Action::run(|| {}), kind)
    }

    fn sample_tree() -> (SpecArena, Index) {
        let mut arena = SpecArena::new();
        let root = arena.insert_root(node(Kind::Given, "g"));
        (arena, root)
    }

    #[test]
    fn given_when_node_when_attaching_assertion_then_becomes_its_child() {
        // Arrange
        let (mut arena, root) = sample_tree();
        let (when_idx, when_parent) = arena.attach(root, node(Kind::When, "w")).unwrap();

        // Act
        let (_, it_parent) = arena.attach(when_idx, node(Kind::It, "i")).unwrap();

        // Assert
        assert_eq!(when_parent, root);
        assert_eq!(it_parent, when_idx);
    }

    #[test]
    fn given_assertion_node_when_attaching_second_assertion_then_becomes_sibling() {
        // Arrange
        let (mut arena, root) = sample_tree();
        let (when_idx, _) = arena.attach(root, node(Kind::When, "w")).unwrap();
        let (it1, _) = arena.attach(when_idx, node(Kind::It, "i1")).unwrap();

        // Act: walk starts at the first assertion, which cannot parent it
        let (it2, it2_parent) = arena.attach(it1, node(Kind::It, "i2")).unwrap();

        // Assert
        assert_eq!(it2_parent, when_idx);
        let children = &arena[when_idx].children;
        assert_eq!(children, &vec![it1, it2]);
    }

    #[test]
    fn given_assertion_node_when_attaching_action_then_walks_to_the_root() {
        // Arrange
        let (mut arena, root) = sample_tree();
        let (when_idx, _) = arena.attach(root, node(Kind::When, "w1")).unwrap();
        let (it1, _) = arena.attach(when_idx, node(Kind::It, "i1")).unwrap();

        // Act
        let (_, when2_parent) = arena.attach(it1, node(Kind::When, "w2")).unwrap();

        // Assert
        assert_eq!(when2_parent, root);
    }

    #[test]
    fn given_branching_tree_when_iterating_then_yields_preorder() {
        let (mut arena, root) = sample_tree();
        let (w1, _) = arena.attach(root, node(Kind::When, "w1")).unwrap();
        let (i1, _) = arena.attach(w1, node(Kind::It, "i1")).unwrap();
        arena.attach(i1, node(Kind::When, "w2")).unwrap();
        arena.attach(w1, node(Kind::It, "i2")).unwrap();

        let order: Vec<String> = arena
            .iter()
            .map(|(_, node)| node.description.clone())
            .collect();

        assert_eq!(order, vec!["g", "w1", "i1", "i2", "w2"]);
    }

    #[test]
    fn given_two_assertions_under_one_when_then_scenarios_share_the_prefix() {
        let (mut arena, root) = sample_tree();
        let (w1, _) = arena.attach(root, node(Kind::When, "w1")).unwrap();
        let (i1, _) = arena.attach(w1, node(Kind::It, "i1")).unwrap();
        let (i2, _) = arena.attach(i1, node(Kind::It, "i2")).unwrap();

        let scenarios = arena.scenarios();

        assert_eq!(scenarios, vec![vec![root, w1, i1], vec![root, w1, i2]]);
    }

    #[test]
    fn given_sibling_whens_when_collecting_then_each_scenario_starts_at_root() {
        let (mut arena, root) = sample_tree();
        let (w1, _) = arena.attach(root, node(Kind::When, "w1")).unwrap();
        let (i1, _) = arena.attach(w1, node(Kind::It, "i1")).unwrap();
        let (w2, _) = arena.attach(i1, node(Kind::When, "w2")).unwrap();
        let (i2, _) = arena.attach(w2, node(Kind::It, "i2")).unwrap();

        let scenarios = arena.scenarios();

        assert_eq!(scenarios, vec![vec![root, w1, i1], vec![root, w2, i2]]);
    }

    #[test]
    fn given_tree_without_assertions_when_collecting_then_no_scenarios() {
        let (mut arena, root) = sample_tree();
        arena.attach(root, node(Kind::When, "w1")).unwrap();

        assert!(arena.scenarios().is_empty());
    }
}

use std::fmt::{self, Display};

use hashbrown::HashSet;
use itertools::Itertools;
use log::warn;

use NodeIdx::{Internal as Int, Leaf};

pub mod tree_node;
pub mod tree_parser;

pub use tree_node::Node;

#[derive(Debug, PartialEq, Clone, Copy, PartialOrd, Eq, Ord, Hash)]
pub enum NodeIdx {
    Internal(usize),
    Leaf(usize),
}

impl Display for NodeIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Int(idx) => write!(f, "Internal node {}", idx),
            Leaf(idx) => write!(f, "Leaf node {}", idx),
        }
    }
}

impl From<NodeIdx> for usize {
    fn from(node_idx: NodeIdx) -> usize {
        match node_idx {
            Int(idx) => idx,
            Leaf(idx) => idx,
        }
    }
}

impl From<&NodeIdx> for usize {
    fn from(node_idx: &NodeIdx) -> usize {
        usize::from(*node_idx)
    }
}

/// A rooted phylogenetic tree.
///
/// Nodes are stored in preorder in `nodes`; every node owns the ordered list of its
/// children. Leaves are the nodes without children, regardless of how many of them
/// carry a name.
#[derive(Debug, Clone)]
pub struct Tree {
    pub root: NodeIdx,
    pub nodes: Vec<Node>,
    pub postorder: Vec<NodeIdx>,
    pub preorder: Vec<NodeIdx>,
    /// Rooting as declared in the source (`[&R]`/`[&U]` in Newick, `rooted` in PhyloXML).
    pub rooted: Option<bool>,
    pub(crate) leaf_ids: Vec<String>,
}

impl Tree {
    pub(crate) fn new_empty() -> Self {
        Self {
            root: Leaf(0),
            nodes: Vec::new(),
            postorder: Vec::new(),
            preorder: Vec::new(),
            rooted: None,
            leaf_ids: Vec::new(),
        }
    }

    /// Appends a fresh node as the last child of `parent` and returns its index.
    /// Callers push nodes in preorder and decide up front whether the node is a leaf.
    pub(crate) fn push_node(&mut self, leaf: bool, parent: Option<NodeIdx>) -> NodeIdx {
        let idx = if leaf {
            Leaf(self.nodes.len())
        } else {
            Int(self.nodes.len())
        };
        self.nodes.push(Node::new_empty(idx, parent));
        if let Some(parent) = parent {
            self.node_mut(&parent).children.push(idx);
        }
        idx
    }

    pub(crate) fn node_mut(&mut self, node_idx: &NodeIdx) -> &mut Node {
        &mut self.nodes[usize::from(node_idx)]
    }

    pub(crate) fn complete(&mut self) {
        self.compute_postorder();
        self.compute_preorder();
        self.leaf_ids = self
            .leaves()
            .iter()
            .map(|node| node.id.clone())
            .collect();

        let mut seen = HashSet::with_capacity(self.leaf_ids.len());
        for id in self.leaf_ids.iter().filter(|id| !id.is_empty()) {
            if !seen.insert(id.as_str()) {
                warn!("Leaf name {} appears more than once in the tree.", id);
            }
        }
    }

    pub(crate) fn compute_postorder(&mut self) {
        let mut order = Vec::<NodeIdx>::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(cur_root) = stack.pop() {
            order.push(cur_root);
            stack.extend(self.children(&cur_root).iter().copied());
        }
        order.reverse();
        self.postorder = order;
    }

    pub(crate) fn compute_preorder(&mut self) {
        let mut order = Vec::<NodeIdx>::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(cur_root) = stack.pop() {
            order.push(cur_root);
            stack.extend(self.children(&cur_root).iter().rev().copied());
        }
        self.preorder = order;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, node_idx: &NodeIdx) -> &Node {
        &self.nodes[usize::from(node_idx)]
    }

    pub fn children(&self, node_idx: &NodeIdx) -> &[NodeIdx] {
        &self.node(node_idx).children
    }

    pub fn leaves(&self) -> Vec<&Node> {
        self.nodes.iter().filter(|node| node.is_leaf()).collect()
    }

    pub fn internals(&self) -> Vec<&Node> {
        self.nodes.iter().filter(|node| !node.is_leaf()).collect()
    }

    /// Names of the leaves in preorder, empty strings for anonymous leaves.
    pub fn leaf_ids(&self) -> &[String] {
        &self.leaf_ids
    }

    /// Serialises the tree into a single Newick statement, terminated by a semicolon.
    ///
    /// # Example
    /// ```
    /// use to_phyloxml::tree::tree_parser::from_newick;
    ///
    /// let trees = from_newick("((A:1.0,B:2.0)95:1,'C D':4);").unwrap();
    /// assert_eq!(trees[0].to_newick(), "((A:1,B:2)95:1,'C D':4);");
    /// ```
    pub fn to_newick(&self) -> String {
        let rooting = match self.rooted {
            Some(true) => "[&R] ",
            Some(false) => "[&U] ",
            None => "",
        };
        // Subtrees are assembled bottom-up, every child string is moved into its parent.
        let mut subtrees = vec![String::new(); self.nodes.len()];
        for node_idx in &self.postorder {
            let node = self.node(node_idx);
            let mut newick = String::new();
            if !node.children.is_empty() {
                newick.push('(');
                newick.push_str(
                    &node
                        .children
                        .iter()
                        .map(|child| std::mem::take(&mut subtrees[usize::from(child)]))
                        .join(","),
                );
                newick.push(')');
            }
            match node.support {
                Some(support) if node.id.is_empty() => newick.push_str(&support.to_string()),
                _ => newick.push_str(&newick_label(&node.id, !node.is_leaf())),
            }
            if let Some(blen) = node.blen {
                newick.push(':');
                newick.push_str(&blen.to_string());
            }
            subtrees[usize::from(node_idx)] = newick;
        }
        let root = subtrees
            .get_mut(usize::from(&self.root))
            .map(std::mem::take)
            .unwrap_or_default();
        format!("{}{};", rooting, root)
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_newick())
    }
}

const NEWICK_RESERVED: &[char] = &['(', ')', '[', ']', '\'', ':', ';', ','];

// Numeric labels on internal nodes would be read back as support values.
fn newick_label(id: &str, internal: bool) -> String {
    let needs_quotes = id
        .chars()
        .any(|c| c.is_whitespace() || NEWICK_RESERVED.contains(&c))
        || (internal && tree_parser::parse_support(id).is_some());
    if needs_quotes {
        format!("'{}'", id.replace('\'', "''"))
    } else {
        id.to_string()
    }
}

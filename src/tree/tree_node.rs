use std::fmt::{Debug, Display};

use approx::relative_eq;

use crate::tree::NodeIdx::{self, Leaf};

#[derive(Clone)]
pub struct Node {
    pub idx: NodeIdx,
    pub parent: Option<NodeIdx>,
    pub children: Vec<NodeIdx>,
    pub blen: Option<f64>,
    pub support: Option<f64>,
    pub id: String,
}

impl Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.id.is_empty() {
            write!(f, "{}", self.idx)
        } else {
            write!(f, "{} with id {}", self.idx, self.id)
        }
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.id.is_empty() {
            writeln!(
                f,
                "{:?}:{:?}, support: {:?}, parent: {:?}, children: {:?}",
                self.idx, self.blen, self.support, self.parent, self.children,
            )
        } else {
            writeln!(
                f,
                "({}) {:?}:{:?}, support: {:?}, parent: {:?}, children: {:?}",
                self.id, self.idx, self.blen, self.support, self.parent, self.children,
            )
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        (self.idx == other.idx)
            && (self.parent == other.parent)
            && (self.children == other.children)
            && (self.id == other.id)
            && opt_relative_eq(self.blen, other.blen)
            && opt_relative_eq(self.support, other.support)
    }
}

fn opt_relative_eq(lhs: Option<f64>, rhs: Option<f64>) -> bool {
    match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => relative_eq!(lhs, rhs),
        (None, None) => true,
        _ => false,
    }
}

impl Node {
    pub(crate) fn new_empty(idx: NodeIdx, parent: Option<NodeIdx>) -> Self {
        Self {
            idx,
            parent,
            children: Vec::new(),
            blen: None,
            support: None,
            id: String::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.idx, Leaf(_))
    }
}

#[cfg(test)]
impl Node {
    pub(crate) fn new_leaf(idx: usize, parent: Option<NodeIdx>, blen: Option<f64>, id: &str) -> Self {
        Self {
            idx: Leaf(idx),
            parent,
            children: Vec::new(),
            blen,
            support: None,
            id: id.to_string(),
        }
    }

    pub(crate) fn new_internal(
        idx: usize,
        parent: Option<NodeIdx>,
        children: Vec<NodeIdx>,
        blen: Option<f64>,
        id: &str,
    ) -> Self {
        Self {
            idx: NodeIdx::Internal(idx),
            parent,
            children,
            blen,
            support: None,
            id: id.to_string(),
        }
    }

    /// Sets the support value (e.g. bootstrap) of the branch above this node.
    pub(crate) fn with_support(mut self, support: f64) -> Self {
        self.support = Some(support);
        self
    }
}

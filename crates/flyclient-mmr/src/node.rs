//! Owned tree nodes with shared children.
//!
//! Children are held behind `Arc` so an appended revision reuses every
//! subtree left of the rightmost spine instead of copying it.

use crate::path::{ceil_log2, split_point};
use flyclient_crypto::{chain_hash, Digest};
use std::sync::Arc;

#[derive(Debug)]
pub(crate) enum Node {
    Leaf(Digest),
    Internal {
        left: Arc<Node>,
        right: Arc<Node>,
        root: Digest,
        n: u64,
    },
}

impl Node {
    #[inline]
    pub(crate) const fn root(&self) -> &Digest {
        match self {
            Self::Leaf(d) => d,
            Self::Internal { root, .. } => root,
        }
    }

    #[inline]
    pub(crate) const fn leaf_count(&self) -> u64 {
        match self {
            Self::Leaf(_) => 1,
            Self::Internal { n, .. } => *n,
        }
    }

    fn join(left: Arc<Self>, right: Arc<Self>) -> Arc<Self> {
        let root = chain_hash(left.root(), right.root());
        let n = left.leaf_count() + right.leaf_count();
        Arc::new(Self::Internal {
            left,
            right,
            root,
            n,
        })
    }

    /// Canonical tree over `leaves` (`None` when empty).
    pub(crate) fn build(leaves: &[Digest]) -> Option<Arc<Self>> {
        match leaves {
            [] => None,
            [d] => Some(Arc::new(Self::Leaf(*d))),
            _ => {
                let mid = split_point(leaves.len() as u64) as usize;
                let (l, r) = leaves.split_at(mid);
                Some(Self::join(Self::build(l)?, Self::build(r)?))
            }
        }
    }

    /// Append along the rightmost spine.
    ///
    /// A full (power-of-two) tree becomes the left child of a new root;
    /// otherwise the right child absorbs the leaf and the left is shared.
    pub(crate) fn append(self: &Arc<Self>, d: Digest) -> Arc<Self> {
        match self.as_ref() {
            Self::Internal { left, right, n, .. } if !n.is_power_of_two() => {
                Self::join(Arc::clone(left), right.append(d))
            }
            _ => Self::join(Arc::clone(self), Arc::new(Self::Leaf(d))),
        }
    }

    /// Depth of leaf `h` (1-based) below this node.
    pub(crate) fn path_size(&self, h: u64) -> usize {
        match self {
            Self::Leaf(_) => 0,
            Self::Internal { left, right, n, .. } => {
                if h <= left.leaf_count() {
                    ceil_log2(*n)
                } else {
                    1 + right.path_size(h - left.leaf_count())
                }
            }
        }
    }

    /// Sibling roots from leaf `h` up to this node (bottom-up order).
    pub(crate) fn path_into(&self, h: u64, out: &mut Vec<Digest>) {
        if let Self::Internal { left, right, .. } = self {
            if h <= left.leaf_count() {
                left.path_into(h, out);
                out.push(*right.root());
            } else {
                right.path_into(h - left.leaf_count(), out);
                out.push(*left.root());
            }
        }
    }
}

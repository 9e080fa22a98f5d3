//! The accumulator handle: leaf sequence plus its canonical tree.
//!
//! Every mutating operation returns a **new** accumulator. Appends extend the
//! rightmost spine and share the rest of the tree with the previous revision;
//! removals and replacements rebuild from the remaining leaves, since they
//! change the canonical shape of every node at or after the touched position.

use crate::node::Node;
use crate::path::{fold_path, path_size_for};
use crate::MmrError;
use flyclient_crypto::Digest;
use std::fmt;
use std::sync::Arc;

/// Leaf selector accepted by path, size, verification and removal.
///
/// `Height` is 1-based; negative values count from the end (`-1` is the
/// last leaf); `0` is always invalid. `Digest` selects the first leaf equal
/// to the digest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeafRef {
    /// Position in the leaf sequence.
    Height(i64),
    /// Leaf value.
    Digest(Digest),
}

impl From<i64> for LeafRef {
    fn from(h: i64) -> Self {
        Self::Height(h)
    }
}

impl From<i32> for LeafRef {
    fn from(h: i32) -> Self {
        Self::Height(i64::from(h))
    }
}

impl From<u64> for LeafRef {
    fn from(h: u64) -> Self {
        // Heights past i64::MAX are out of range for any real accumulator.
        Self::Height(i64::try_from(h).unwrap_or(i64::MAX))
    }
}

impl From<Digest> for LeafRef {
    fn from(d: Digest) -> Self {
        Self::Digest(d)
    }
}

impl From<&Digest> for LeafRef {
    fn from(d: &Digest) -> Self {
        Self::Digest(*d)
    }
}

/// Merkle Mountain Range accumulator over an ordered digest sequence.
///
/// Cloning is cheap for the tree (shared `Arc` nodes) and linear for the
/// leaf list.
#[derive(Clone, Default)]
pub struct MmrAccumulator {
    leaves: Vec<Digest>,
    tree: Option<Arc<Node>>,
}

impl MmrAccumulator {
    /// Empty accumulator (no root).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the canonical tree over `leaves`.
    #[must_use]
    pub fn build(leaves: &[Digest]) -> Self {
        Self::from_leaves(leaves.to_vec())
    }

    /// Build from an owned leaf vector.
    #[must_use]
    pub fn from_leaves(leaves: Vec<Digest>) -> Self {
        let tree = Node::build(&leaves);
        Self { leaves, tree }
    }

    /* ---------------- Queries ---------------- */

    /// Number of leaves.
    #[inline]
    #[must_use]
    pub fn leaf_count(&self) -> u64 {
        self.leaves.len() as u64
    }

    /// `true` when there are no leaves.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Root digest (`None` for the empty accumulator).
    #[inline]
    #[must_use]
    pub fn root(&self) -> Option<Digest> {
        self.tree.as_deref().map(|t| *t.root())
    }

    /// The leaf sequence, in order.
    #[inline]
    #[must_use]
    pub fn leaves(&self) -> &[Digest] {
        &self.leaves
    }

    /// `true` if `d` is one of the leaves.
    #[must_use]
    pub fn contains(&self, d: &Digest) -> bool {
        self.leaves.contains(d)
    }

    /// 1-based position of the first leaf equal to `d`.
    pub fn index_of(&self, d: &Digest) -> Result<u64, MmrError> {
        self.leaves
            .iter()
            .position(|x| x == d)
            .map(|i| i as u64 + 1)
            .ok_or(MmrError::NotFound(*d))
    }

    /// Leaf at `index` (1-based, or negative from the end).
    pub fn get(&self, index: i64) -> Result<&Digest, MmrError> {
        let i = self.position(index)?;
        Ok(&self.leaves[i])
    }

    /* ---------------- Revisions ---------------- */

    /// New accumulator with `d` appended.
    #[must_use]
    pub fn append(&self, d: Digest) -> Self {
        let mut leaves = Vec::with_capacity(self.leaves.len() + 1);
        leaves.extend_from_slice(&self.leaves);
        leaves.push(d);
        let tree = Some(match &self.tree {
            Some(t) => t.append(d),
            None => Arc::new(Node::Leaf(d)),
        });
        Self { leaves, tree }
    }

    /// New accumulator with every digest of `ds` appended in order.
    #[must_use]
    pub fn extend<I: IntoIterator<Item = Digest>>(&self, ds: I) -> Self {
        let mut leaves = self.leaves.clone();
        let mut tree = self.tree.clone();
        for d in ds {
            leaves.push(d);
            tree = Some(match tree {
                Some(t) => t.append(d),
                None => Arc::new(Node::Leaf(d)),
            });
        }
        Self { leaves, tree }
    }

    /// New accumulator without one leaf, rebuilt from scratch.
    ///
    /// By digest the first occurrence is removed; by height that position.
    pub fn remove(&self, target: impl Into<LeafRef>) -> Result<Self, MmrError> {
        let i = self.resolve(target.into())?;
        let mut leaves = self.leaves.clone();
        leaves.remove(i);
        Ok(Self::from_leaves(leaves))
    }

    /// Remove each target in turn (each resolved against the previous revision).
    pub fn remove_all<I, R>(&self, targets: I) -> Result<Self, MmrError>
    where
        I: IntoIterator<Item = R>,
        R: Into<LeafRef>,
    {
        let mut leaves = self.leaves.clone();
        for t in targets {
            let current = Self {
                leaves,
                tree: None,
            };
            let i = current.resolve(t.into())?;
            leaves = current.leaves;
            leaves.remove(i);
        }
        Ok(Self::from_leaves(leaves))
    }

    /// New accumulator with the leaf at `index` replaced by `d`, rebuilt.
    pub fn replace(&self, index: i64, d: Digest) -> Result<Self, MmrError> {
        let i = self.position(index)?;
        let mut leaves = self.leaves.clone();
        leaves[i] = d;
        Ok(Self::from_leaves(leaves))
    }

    /* ---------------- Paths ---------------- */

    /// Exact number of siblings needed to prove leaf `h`.
    pub fn path_size(&self, h: impl Into<LeafRef>) -> Result<usize, MmrError> {
        let (tree, i) = self.locate(h.into())?;
        Ok(tree.path_size(i as u64 + 1))
    }

    /// Sibling roots for leaf `h`, bottom-up (the sibling of the leaf first,
    /// the sibling just below the root last).
    pub fn path(&self, h: impl Into<LeafRef>) -> Result<Vec<Digest>, MmrError> {
        let (tree, i) = self.locate(h.into())?;
        let mut out = Vec::with_capacity(tree.path_size(i as u64 + 1));
        tree.path_into(i as u64 + 1, &mut out);
        Ok(out)
    }

    /// Check `proof` for leaf `h` against this accumulator's root.
    ///
    /// A proof of the wrong length, or one that folds to another root, is
    /// `Ok(false)`. Errors are reserved for a leaf that cannot be resolved.
    pub fn verify_proof(
        &self,
        h: impl Into<LeafRef>,
        proof: &[Digest],
    ) -> Result<bool, MmrError> {
        let (tree, i) = self.locate(h.into())?;
        let height = i as u64 + 1;
        if proof.len() != path_size_for(self.leaf_count(), height) {
            return Ok(false);
        }
        Ok(fold_path(self.leaf_count(), height, &self.leaves[i], proof) == *tree.root())
    }

    /* ---------------- Helpers ---------------- */

    /// 0-based position of a 1-based or negative index.
    fn position(&self, index: i64) -> Result<usize, MmrError> {
        let len = self.leaves.len();
        let invalid = || MmrError::InvalidIndex {
            index,
            len: len as u64,
        };
        if index == 0 {
            return Err(invalid());
        }
        if len == 0 {
            return Err(MmrError::EmptyAccumulator);
        }
        let magnitude = usize::try_from(index.unsigned_abs()).map_err(|_| invalid())?;
        if magnitude > len {
            return Err(invalid());
        }
        Ok(if index > 0 { magnitude - 1 } else { len - magnitude })
    }

    /// 0-based position of a leaf reference.
    fn resolve(&self, r: LeafRef) -> Result<usize, MmrError> {
        match r {
            LeafRef::Height(h) => self.position(h),
            LeafRef::Digest(d) => self
                .leaves
                .iter()
                .position(|x| *x == d)
                .ok_or(MmrError::NotFound(d)),
        }
    }

    /// Tree and 0-based position for operations that need a non-empty tree.
    fn locate(&self, r: LeafRef) -> Result<(&Node, usize), MmrError> {
        let tree = self.tree.as_deref().ok_or(MmrError::EmptyAccumulator)?;
        Ok((tree, self.resolve(r)?))
    }
}

impl PartialEq for MmrAccumulator {
    fn eq(&self, other: &Self) -> bool {
        // The tree is a pure function of the leaves.
        self.leaves == other.leaves
    }
}

impl Eq for MmrAccumulator {}

impl fmt::Debug for MmrAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tree.as_deref() {
            None => f.write_str("Mmr(empty)"),
            Some(Node::Leaf(d)) => write!(f, "Leaf(value: {d})"),
            Some(Node::Internal {
                left, right, root, n,
            }) => write!(
                f,
                "Mmr(n: {n}, root: {root}, left: {}, right: {})",
                left.root(),
                right.root()
            ),
        }
    }
}

impl From<Vec<Digest>> for MmrAccumulator {
    fn from(leaves: Vec<Digest>) -> Self {
        Self::from_leaves(leaves)
    }
}

impl FromIterator<Digest> for MmrAccumulator {
    fn from_iter<I: IntoIterator<Item = Digest>>(iter: I) -> Self {
        Self::from_leaves(iter.into_iter().collect())
    }
}

//! Tree-free path arithmetic: shape, exact path length, and the verifier fold.
//!
//! The canonical shape is a function of the leaf count alone, so a verifier
//! holding only `(root, leaf_count)` can check a revealed path without ever
//! materializing the tree. [`crate::MmrAccumulator`] delegates its
//! verification here so prover and verifier share one fold.

use crate::MmrError;
use flyclient_crypto::{chain_hash, Digest, DigestError, DIGEST_HEX_LEN, DIGEST_LEN};

/// Number of leaves placed in the left subtree of a node covering `n >= 2`
/// leaves: the largest power of two strictly less than `n`.
///
/// For a power of two this is exactly `n / 2`. Empty and single-leaf nodes
/// have no split and yield `0`.
#[inline]
#[must_use]
pub const fn split_point(n: u64) -> u64 {
    if n < 2 {
        0
    } else {
        1 << (n - 1).ilog2()
    }
}

/// `ceil(log2(m))`, with `ceil_log2(0) == ceil_log2(1) == 0`.
#[inline]
#[must_use]
pub const fn ceil_log2(m: u64) -> usize {
    if m <= 1 {
        0
    } else {
        (m - 1).ilog2() as usize + 1
    }
}

/// Exact number of siblings on the path of leaf `height` (1-based) in the
/// canonical tree over `leaf_count` leaves.
///
/// A leaf in the left subtree of a node covering `m` leaves sits at depth
/// `ceil(log2 m)` below it (the left subtree is perfect); descending right
/// costs one level per node crossed. This is exact, unlike the
/// `ceil(log2 n)` bound it refines.
///
/// Returns `0` for out-of-range input; callers validate `height` first.
#[must_use]
pub fn path_size_for(leaf_count: u64, height: u64) -> usize {
    if height == 0 || height > leaf_count {
        return 0;
    }
    let (mut m, mut k, mut depth) = (leaf_count, height, 0usize);
    loop {
        if m == 1 {
            return depth;
        }
        let left = split_point(m);
        if k <= left {
            return depth + ceil_log2(m);
        }
        depth += 1;
        k -= left;
        m -= left;
    }
}

/// Fold `proof` (bottom-up sibling order) from `leaf` at `height`.
///
/// At each level the running digest is the left operand iff its position is
/// even and has a right neighbour at that level; otherwise the sibling is.
#[must_use]
pub fn fold_path(leaf_count: u64, height: u64, leaf: &Digest, proof: &[Digest]) -> Digest {
    let mut pos = height.saturating_sub(1);
    let mut count = leaf_count.saturating_sub(1);
    let mut acc = *leaf;
    for sibling in proof {
        acc = if pos % 2 == 0 && pos < count {
            chain_hash(&acc, sibling)
        } else {
            chain_hash(sibling, &acc)
        };
        pos /= 2;
        count /= 2;
    }
    acc
}

/// Check that `proof` authenticates `leaf` at `height` under `root`.
///
/// This is the verifier side of the protocol: it needs the committed root and
/// leaf count, never the leaves themselves.
pub fn verify_path(
    root: &Digest,
    leaf_count: u64,
    height: u64,
    leaf: &Digest,
    proof: &[Digest],
) -> Result<(), MmrError> {
    if leaf_count == 0 {
        return Err(MmrError::EmptyAccumulator);
    }
    if height == 0 || height > leaf_count {
        return Err(MmrError::InvalidIndex {
            index: i64::try_from(height).unwrap_or(i64::MAX),
            len: leaf_count,
        });
    }
    let expected = path_size_for(leaf_count, height);
    if proof.len() != expected {
        return Err(MmrError::ProofLengthMismatch {
            expected,
            actual: proof.len(),
        });
    }
    if fold_path(leaf_count, height, leaf, proof) != *root {
        return Err(MmrError::RootMismatch);
    }
    Ok(())
}

/* ---------------- Encodings ---------------- */

/// Concatenated lowercase hex of every sibling (`64 * k` characters).
#[must_use]
pub fn encode_path_hex(path: &[Digest]) -> String {
    path.iter().map(Digest::to_hex).collect()
}

/// Inverse of [`encode_path_hex`].
pub fn decode_path_hex(s: &str) -> Result<Vec<Digest>, MmrError> {
    let s = s.trim();
    if s.len() % DIGEST_HEX_LEN != 0 {
        return Err(MmrError::InvalidPathEncoding(format!(
            "hex length {} is not a multiple of {DIGEST_HEX_LEN}",
            s.len()
        )));
    }
    let bytes = hex::decode(s).map_err(|e| MmrError::InvalidPathEncoding(e.to_string()))?;
    path_from_bytes(&bytes)
}

/// Raw concatenation of the sibling bytes (what the verifier receives).
#[must_use]
pub fn path_to_bytes(path: &[Digest]) -> Vec<u8> {
    let mut out = Vec::with_capacity(path.len() * DIGEST_LEN);
    for d in path {
        out.extend_from_slice(d.as_bytes());
    }
    out
}

/// Split raw bytes back into siblings.
pub fn path_from_bytes(bytes: &[u8]) -> Result<Vec<Digest>, MmrError> {
    if bytes.len() % DIGEST_LEN != 0 {
        return Err(MmrError::InvalidPathEncoding(format!(
            "{} bytes is not a multiple of {DIGEST_LEN}",
            bytes.len()
        )));
    }
    bytes
        .chunks_exact(DIGEST_LEN)
        .map(Digest::from_slice)
        .collect::<Result<Vec<_>, DigestError>>()
        .map_err(|e| MmrError::InvalidPathEncoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flyclient_crypto::hash_bytes;

    #[test]
    fn split_points() {
        assert_eq!(split_point(2), 1);
        assert_eq!(split_point(3), 2);
        assert_eq!(split_point(4), 2);
        assert_eq!(split_point(5), 4);
        assert_eq!(split_point(8), 4);
        assert_eq!(split_point(9), 8);
        assert_eq!(split_point(201), 128);
        assert_eq!(split_point(u64::MAX), 1 << 63);
    }

    #[test]
    fn split_point_without_children() {
        assert_eq!(split_point(0), 0);
        assert_eq!(split_point(1), 0);
    }

    #[test]
    fn ceil_log2_small_values() {
        let expect = [0, 0, 1, 2, 2, 3, 3, 3, 3, 4];
        for (m, &e) in expect.iter().enumerate() {
            assert_eq!(ceil_log2(m as u64), e, "m={m}");
        }
    }

    #[test]
    fn path_sizes_for_small_trees() {
        // n = 5: four perfect leaves on the left, one promoted leaf on the right.
        assert_eq!(
            (1..=5).map(|h| path_size_for(5, h)).collect::<Vec<_>>(),
            vec![3, 3, 3, 3, 1]
        );
        // n = 7: 4 | (2 | 1)
        assert_eq!(
            (1..=7).map(|h| path_size_for(7, h)).collect::<Vec<_>>(),
            vec![3, 3, 3, 3, 3, 3, 2]
        );
        assert_eq!(path_size_for(1, 1), 0);
        assert_eq!(path_size_for(3, 0), 0);
        assert_eq!(path_size_for(3, 4), 0);
    }

    #[test]
    fn three_leaf_fold_by_hand() {
        let l: Vec<Digest> = (0u8..3).map(|i| hash_bytes(&[i])).collect();
        let l01 = chain_hash(&l[0], &l[1]);
        let root = chain_hash(&l01, &l[2]);

        verify_path(&root, 3, 1, &l[0], &[l[1], l[2]]).unwrap();
        verify_path(&root, 3, 2, &l[1], &[l[0], l[2]]).unwrap();
        verify_path(&root, 3, 3, &l[2], &[l01]).unwrap();

        assert_eq!(
            verify_path(&root, 3, 3, &l[2], &[l01, l[0]]),
            Err(MmrError::ProofLengthMismatch {
                expected: 1,
                actual: 2
            })
        );
        assert_eq!(
            verify_path(&root, 3, 1, &l[0], &[l[2], l[1]]),
            Err(MmrError::RootMismatch)
        );
        assert!(matches!(
            verify_path(&root, 3, 4, &l[0], &[]),
            Err(MmrError::InvalidIndex { index: 4, len: 3 })
        ));
        assert_eq!(
            verify_path(&root, 0, 1, &l[0], &[]),
            Err(MmrError::EmptyAccumulator)
        );
    }

    #[test]
    fn hex_and_byte_encodings() {
        let path: Vec<Digest> = (0u8..3).map(|i| hash_bytes(&[i])).collect();
        let hex = encode_path_hex(&path);
        assert_eq!(hex.len(), 3 * DIGEST_HEX_LEN);
        assert_eq!(decode_path_hex(&hex).unwrap(), path);
        assert_eq!(path_from_bytes(&path_to_bytes(&path)).unwrap(), path);
        assert_eq!(decode_path_hex("").unwrap(), Vec::<Digest>::new());
        assert!(matches!(
            decode_path_hex("abc"),
            Err(MmrError::InvalidPathEncoding(_))
        ));
        assert!(matches!(
            path_from_bytes(&[0u8; 33]),
            Err(MmrError::InvalidPathEncoding(_))
        ));
    }
}

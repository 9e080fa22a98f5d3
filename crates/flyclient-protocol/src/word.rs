//! Fixed-width two's-complement words returned by the verifier.
//!
//! A word of `W = 8 * len` bits holding raw value `v` decodes to `v` when
//! `v < 2^(W-1)` and to `v - 2^W` otherwise. The arithmetic runs on
//! arbitrary-precision integers so the rule holds for any width; the
//! canonical width is 256 bits.

use crate::ProtocolError;
use num_bigint::{BigInt, BigUint, Sign};
use std::fmt;

/// Width of a canonical word in bytes.
pub const WORD_BYTES: usize = 32;

/// Raw big-endian word.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Word(Vec<u8>);

impl Word {
    /// Wrap raw big-endian bytes of any width.
    #[must_use]
    pub fn from_be_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Canonical 256-bit encoding of `value`.
    #[must_use]
    pub fn from_i64(value: i64) -> Self {
        let fill = if value < 0 { 0xff } else { 0x00 };
        let mut out = vec![fill; WORD_BYTES - 8];
        out.extend_from_slice(&value.to_be_bytes());
        Self(out)
    }

    /// Raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Width in bits.
    #[must_use]
    pub fn bits(&self) -> u64 {
        8 * self.0.len() as u64
    }

    /// Signed value under two's complement at this word's width.
    #[must_use]
    pub fn decode(&self) -> BigInt {
        decode_signed(&self.0)
    }

    /// Signed value, required to fit in an `i64`.
    pub fn to_i64(&self) -> Result<i64, ProtocolError> {
        let v = self.decode();
        i64::try_from(&v).map_err(|_| ProtocolError::DirectiveOutOfRange(v.to_string()))
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word(0x{})", hex::encode(&self.0))
    }
}

/// Decode big-endian two's-complement bytes; the width is `8 * bytes.len()`.
///
/// An empty slice decodes to zero.
#[must_use]
pub fn decode_signed(bytes: &[u8]) -> BigInt {
    let raw = BigUint::from_bytes_be(bytes);
    let Some(top) = bytes.len().checked_mul(8).filter(|&w| w > 0) else {
        return BigInt::from(0u8);
    };
    let half = BigUint::from(1u8) << (top - 1);
    if raw < half {
        BigInt::from_biguint(Sign::Plus, raw)
    } else {
        let modulus = BigInt::from_biguint(Sign::Plus, half << 1usize);
        BigInt::from_biguint(Sign::Plus, raw) - modulus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pow2(k: u32) -> BigUint {
        BigUint::from(1u8) << k
    }

    fn word256(v: &BigUint) -> Vec<u8> {
        let mut be = v.to_bytes_be();
        let mut out = vec![0u8; WORD_BYTES - be.len()];
        out.append(&mut be);
        out
    }

    #[test]
    fn canonical_width_vectors() {
        let one = BigUint::from(1u8);
        let cases: Vec<(BigUint, BigInt)> = vec![
            (BigUint::from(0u8), BigInt::from(0)),
            (
                pow2(255) - &one,
                BigInt::from_biguint(Sign::Plus, pow2(255) - &one),
            ),
            (pow2(255), -BigInt::from_biguint(Sign::Plus, pow2(255))),
            (pow2(256) - &one, BigInt::from(-1)),
            (pow2(256) - BigUint::from(2u8), BigInt::from(-2)),
            (pow2(256) - BigUint::from(3u8), BigInt::from(-3)),
            (pow2(256) - BigUint::from(4u8), BigInt::from(-4)),
        ];
        for (raw, expect) in cases {
            assert_eq!(decode_signed(&word256(&raw)), expect, "raw={raw}");
        }
    }

    #[test]
    fn other_widths() {
        assert_eq!(decode_signed(&[0x7f]), BigInt::from(127));
        assert_eq!(decode_signed(&[0x80]), BigInt::from(-128));
        assert_eq!(decode_signed(&[0xff, 0xfe]), BigInt::from(-2));
        assert_eq!(decode_signed(&[0x00, 0xfe]), BigInt::from(254));
        assert_eq!(decode_signed(&[]), BigInt::from(0));
    }

    #[test]
    fn i64_encoding_and_range() {
        for v in [0i64, 1, 105, -1, -2, -3, -4, i64::MIN, i64::MAX] {
            let w = Word::from_i64(v);
            assert_eq!(w.bits(), 256);
            assert_eq!(w.to_i64().unwrap(), v);
        }
        let big = Word::from_be_bytes(word256(&pow2(100)));
        assert!(matches!(
            big.to_i64(),
            Err(ProtocolError::DirectiveOutOfRange(_))
        ));
        let very_negative = Word::from_be_bytes(word256(&pow2(255)));
        assert!(very_negative.to_i64().is_err());
    }
}

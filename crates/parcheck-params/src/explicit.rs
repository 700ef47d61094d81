//! Enumerated parameter space: colors are subsets of `0..size` valuations.
//!
//! Sets are bit vectors of `u64` words behind an `Arc`, so cloning is a
//! reference count bump. Bits past `size` are always zero.

use crate::wire::{get_i32, get_u64, put_i32, put_u64};
use crate::{AlgebraError, AlgebraResult, Solver, SolverStats};
use std::fmt;
use std::sync::Arc;

/// A subset of the valuations of an [`ExplicitSolver`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ColorSet {
    words: Arc<[u64]>,
}

impl ColorSet {
    fn from_words(words: Vec<u64>) -> Self {
        Self {
            words: words.into(),
        }
    }

    /// Number of valuations in the set.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn contains(&self, color: usize) -> bool {
        self.words
            .get(color / 64)
            .is_some_and(|w| w & (1u64 << (color % 64)) != 0)
    }

    /// Iterate the valuations in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut w = word;
            std::iter::from_fn(move || {
                if w == 0 {
                    return None;
                }
                let bit = w.trailing_zeros() as usize;
                w &= w - 1;
                Some(i * 64 + bit)
            })
        })
    }
}

impl fmt::Debug for ColorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Solver over an explicitly enumerated, finite parameter space.
#[derive(Debug)]
pub struct ExplicitSolver {
    size: usize,
    num_words: usize,
    /// Mask of the valid bits in the last word.
    tail_mask: u64,
    stats: SolverStats,
}

impl ExplicitSolver {
    /// Create a solver over `size` valuations.
    pub fn new(size: usize) -> Self {
        let num_words = size.div_ceil(64);
        let tail_bits = size % 64;
        let tail_mask = if tail_bits == 0 {
            u64::MAX
        } else {
            (1u64 << tail_bits) - 1
        };
        Self {
            size,
            num_words,
            tail_mask,
            stats: SolverStats::default(),
        }
    }

    /// Number of valuations in the universe.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The set containing exactly the given valuations.
    ///
    /// Panics if a valuation is outside `0..size`.
    pub fn colors(&self, colors: &[usize]) -> ColorSet {
        let mut words = vec![0u64; self.num_words];
        for &c in colors {
            assert!(
                c < self.size,
                "color {c} outside of explicit domain of {} valuations",
                self.size
            );
            words[c / 64] |= 1u64 << (c % 64);
        }
        ColorSet::from_words(words)
    }

    /// The set of valuations in `range`.
    pub fn range(&self, range: std::ops::Range<usize>) -> ColorSet {
        let colors: Vec<usize> = range.collect();
        self.colors(&colors)
    }

    /// Fail fast on sets built for a different domain width.
    #[inline]
    fn check(&self, p: &ColorSet) {
        assert_eq!(
            p.words.len(),
            self.num_words,
            "color set of {} words used with explicit domain of {} valuations",
            p.words.len(),
            self.size
        );
    }

    fn zip(&self, a: &ColorSet, b: &ColorSet, op: impl Fn(u64, u64) -> u64) -> ColorSet {
        self.check(a);
        self.check(b);
        let words = a
            .words
            .iter()
            .zip(b.words.iter())
            .map(|(x, y)| op(*x, *y))
            .collect();
        ColorSet::from_words(words)
    }

    fn mask_tail(&self, words: &mut [u64]) {
        if let Some(last) = words.last_mut() {
            *last &= self.tail_mask;
        }
    }
}

impl Solver for ExplicitSolver {
    type Params = ColorSet;

    fn tt(&self) -> ColorSet {
        let mut words = vec![u64::MAX; self.num_words];
        self.mask_tail(&mut words);
        ColorSet::from_words(words)
    }

    fn ff(&self) -> ColorSet {
        ColorSet::from_words(vec![0; self.num_words])
    }

    fn and(&self, a: &ColorSet, b: &ColorSet) -> ColorSet {
        self.stats.record_and();
        self.zip(a, b, |x, y| x & y)
    }

    fn or(&self, a: &ColorSet, b: &ColorSet) -> ColorSet {
        self.stats.record_or();
        self.zip(a, b, |x, y| x | y)
    }

    fn not(&self, a: &ColorSet) -> ColorSet {
        self.stats.record_not();
        self.check(a);
        let mut words: Vec<u64> = a.words.iter().map(|w| !w).collect();
        self.mask_tail(&mut words);
        ColorSet::from_words(words)
    }

    fn complement(&self, target: &ColorSet, against: &ColorSet) -> ColorSet {
        self.stats.record_and();
        self.zip(target, against, |t, a| a & !t)
    }

    fn is_sat(&self, p: &ColorSet) -> bool {
        self.stats.record_sat_check();
        self.check(p);
        !p.is_empty()
    }

    fn equal(&self, a: &ColorSet, b: &ColorSet) -> bool {
        self.check(a);
        self.check(b);
        a.words == b.words
    }

    fn byte_size(&self, p: &ColorSet) -> usize {
        4 + 8 * p.words.len()
    }

    fn put_colors(&self, buf: &mut Vec<u8>, p: &ColorSet) {
        self.check(p);
        put_i32(buf, p.words.len() as i32);
        for &w in p.words.iter() {
            put_u64(buf, w);
        }
    }

    fn get_colors(&self, buf: &mut &[u8]) -> AlgebraResult<ColorSet> {
        let count = get_i32(buf)?;
        if count < 0 || count as usize != self.num_words {
            return Err(AlgebraError::Decode(format!(
                "expected {} color words, found {count}",
                self.num_words
            )));
        }
        let mut words = Vec::with_capacity(self.num_words);
        for _ in 0..self.num_words {
            words.push(get_u64(buf)?);
        }
        if words.last().is_some_and(|w| w & !self.tail_mask != 0) {
            return Err(AlgebraError::Decode(format!(
                "color outside of explicit domain of {} valuations",
                self.size
            )));
        }
        Ok(ColorSet::from_words(words))
    }

    fn display(&self, p: &ColorSet) -> String {
        format!("{p:?}")
    }

    fn transfer_to(&self, p: &ColorSet, target: &Self) -> AlgebraResult<ColorSet> {
        if target.size != self.size {
            return Err(AlgebraError::DomainMismatch {
                source_domain: format!("explicit({})", self.size),
                target_domain: format!("explicit({})", target.size),
            });
        }
        self.check(p);
        Ok(ColorSet::from_words(p.words.to_vec()))
    }

    fn stats(&self) -> &SolverStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_bits_stay_clear() {
        let s = ExplicitSolver::new(70);
        let tt = s.tt();
        assert_eq!(tt.len(), 70);
        let none = s.not(&tt);
        assert!(none.is_empty());
        assert_eq!(s.not(&none).len(), 70);
    }

    #[test]
    fn test_complement_is_difference() {
        let s = ExplicitSolver::new(5);
        let against = s.colors(&[0, 1, 2]);
        let target = s.colors(&[1, 4]);
        let diff = s.complement(&target, &against);
        assert_eq!(diff.iter().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_iter_across_words() {
        let s = ExplicitSolver::new(130);
        let set = s.colors(&[3, 64, 129]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![3, 64, 129]);
        assert!(set.contains(64));
        assert!(!set.contains(65));
    }

    #[test]
    fn test_decode_rejects_wrong_width() {
        let small = ExplicitSolver::new(10);
        let large = ExplicitSolver::new(100);
        let mut buf = Vec::new();
        large.put_colors(&mut buf, &large.tt());
        let mut cursor = buf.as_slice();
        assert!(small.get_colors(&mut cursor).is_err());
    }

    #[test]
    fn test_decode_rejects_bits_past_domain() {
        let s = ExplicitSolver::new(3);
        let mut buf = Vec::new();
        put_i32(&mut buf, 1);
        put_u64(&mut buf, 0b1000);
        let mut cursor = buf.as_slice();
        assert!(s.get_colors(&mut cursor).is_err());
    }

    #[test]
    fn test_transfer_between_instances() {
        let a = ExplicitSolver::new(6);
        let b = ExplicitSolver::new(6);
        let c = ExplicitSolver::new(7);
        let p = a.colors(&[2, 5]);
        let moved = a.transfer_to(&p, &b).unwrap();
        assert!(b.equal(&moved, &b.colors(&[2, 5])));
        assert!(matches!(
            a.transfer_to(&p, &c),
            Err(AlgebraError::DomainMismatch { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "explicit domain")]
    fn test_mixed_domains_fail_fast() {
        let a = ExplicitSolver::new(10);
        let b = ExplicitSolver::new(100);
        let _ = a.and(&a.tt(), &b.tt());
    }
}

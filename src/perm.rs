use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Error, Result};

/// A permutation of `0..n` held in both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    fwd: Vec<usize>,
    inv: Vec<usize>,
}

impl Permutation {
    /// Validates `fwd` and builds its inverse.
    pub fn new(fwd: Vec<usize>) -> Result<Self> {
        let n = fwd.len();
        let mut inv = vec![usize::MAX; n];
        for (k, &i) in fwd.iter().enumerate() {
            if i >= n || inv[i] != usize::MAX {
                return Err(Error::InvalidPermutation { n });
            }
            inv[i] = k;
        }
        Ok(Permutation { fwd, inv })
    }

    pub fn identity(n: usize) -> Self {
        Permutation {
            fwd: (0..n).collect(),
            inv: (0..n).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fwd.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fwd.is_empty()
    }

    /// `forward()[k]` is the original index placed at position `k`.
    pub fn forward(&self) -> &[usize] {
        &self.fwd
    }

    /// `inverse()[i]` is the new position of original index `i`.
    pub fn inverse(&self) -> &[usize] {
        &self.inv
    }

    /// The inverse permutation.
    pub fn inverted(&self) -> Permutation {
        Permutation {
            fwd: self.inv.clone(),
            inv: self.fwd.clone(),
        }
    }

    /// `x[k] = b[forward[k]]`.
    pub fn gather(&self, b: &[f64], x: &mut [f64]) {
        pvec(Some(self.fwd.as_slice()), b, x);
    }

    /// `x[forward[k]] = b[k]`.
    pub fn scatter(&self, b: &[f64], x: &mut [f64]) {
        ipvec(Some(self.fwd.as_slice()), b, x);
    }
}

/// `x[k] = b[p[k]]` for `k` in `0..x.len()`; `None` is the identity.
pub fn pvec(p: Option<&[usize]>, b: &[f64], x: &mut [f64]) {
    for (k, xk) in x.iter_mut().enumerate() {
        *xk = b[p.map_or(k, |p| p[k])];
    }
}

/// `x[p[k]] = b[k]` for `k` in `0..b.len()`; `None` is the identity.
pub fn ipvec(p: Option<&[usize]>, b: &[f64], x: &mut [f64]) {
    for (k, &bk) in b.iter().enumerate() {
        x[p.map_or(k, |p| p[k])] = bk;
    }
}

/// Inverse of the permutation `p`.
pub fn pinv(p: &[usize]) -> Vec<usize> {
    let mut pinv = vec![0; p.len()];
    for (k, &i) in p.iter().enumerate() {
        pinv[i] = k; // invert the permutation
    }
    pinv
}

/// Order in which the maximum matching visits columns.
///
/// The chosen matching, and therefore the fine block structure of a
/// Dulmage-Mendelsohn decomposition, may depend on this order; the
/// structural rank and the coarse decomposition do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnOrder {
    /// Columns `0, 1, .., n-1`.
    #[default]
    Natural,
    /// Columns `n-1, .., 1, 0`.
    Reverse,
    /// A Fisher-Yates shuffle driven by `StdRng::seed_from_u64(seed)`;
    /// reproducible for a fixed seed.
    Shuffled { seed: u64 },
}

/// The column visitation order for `n` columns, or `None` for natural order.
pub(crate) fn randperm(n: usize, order: ColumnOrder) -> Option<Vec<usize>> {
    match order {
        ColumnOrder::Natural => None,
        ColumnOrder::Reverse => Some((0..n).rev().collect()),
        ColumnOrder::Shuffled { seed } => {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut p: Vec<usize> = (0..n).collect();
            p.shuffle(&mut rng);
            Some(p)
        }
    }
}

//! Symbolic analysis: ordering and nonzero counts ahead of a numeric
//! factorization.

use crate::algebra::{permute, symperm};
use crate::amd::{amd, Order};
use crate::csc::CscMatrix;
use crate::error::{Error, Result};
use crate::etree::{counts, etree, post};
use crate::internal::cumsum;
use crate::perm::pinv;

/// Symbolic Cholesky analysis of a symmetric matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CholeskySymbolic {
    /// Inverse of the fill-reducing permutation P; `None` for the identity.
    pub pinv: Option<Vec<usize>>,
    /// Elimination tree of P*A*P'.
    pub parent: Vec<Option<usize>>,
    /// Column pointers of L.
    pub cp: Vec<usize>,
    /// Number of entries in L.
    pub lnz: usize,
}

/// Symbolic LU analysis: the column ordering and a guess at the factor sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuSymbolic {
    /// Fill-reducing column permutation Q; `None` for the identity.
    pub q: Option<Vec<usize>>,
    /// Initial capacity for L.
    pub lnz: usize,
    /// Initial capacity for U.
    pub unz: usize,
}

/// Symbolic QR analysis of A*Q.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrSymbolic {
    /// Fill-reducing column permutation Q; `None` for the identity.
    pub q: Option<Vec<usize>>,
    /// Column elimination tree of A*Q.
    pub parent: Vec<Option<usize>>,
    /// Column counts of R.
    pub cp: Vec<usize>,
    /// Row permutation: row `i` of A is row `pinv[i]` of V and R. Has `m2`
    /// entries; rows `m..m2` are fictitious rows added so that every column
    /// of V has a diagonal.
    pub pinv: Vec<usize>,
    /// `leftmost[i]` is the first column of A*Q with an entry in row `i`.
    pub leftmost: Vec<Option<usize>>,
    /// Number of rows of V and R, `m` plus the fictitious rows.
    pub m2: usize,
    /// Number of entries in V.
    pub lnz: usize,
    /// Number of entries in R.
    pub unz: usize,
}

/// Ordering and analysis for a Cholesky factorization of the symmetric
/// matrix A, of which only the upper triangular part is used.
pub fn schol(order: Order, a: &CscMatrix) -> Result<CholeskySymbolic> {
    let n = a.ncols();
    if a.nrows() != n {
        return Err(Error::NotSquare { m: a.nrows(), n });
    }
    let p = amd(order, a)?; // P = amd(A+A'), or natural
    let pinv = p.as_deref().map(pinv); // find inverse permutation
    let c = symperm(a, pinv.as_deref(), false)?; // C = spones(triu(A(P,P)))
    let parent = etree(&c, false); // find etree of C
    let post = post(&parent); // postorder the etree
    let mut c = counts(&c, &parent, &post, false); // find column counts of chol(C)
    let mut cp = vec![0; n + 1];
    let lnz = cumsum(&mut cp, &mut c); // find column pointers for L
    log::debug!("schol: n = {}, nnz(L) = {}", n, lnz);
    Ok(CholeskySymbolic {
        pinv,
        parent,
        cp,
        lnz,
    })
}

/// Column ordering for LU. The factor sizes are a guess; the numeric
/// factorization grows its storage as needed.
pub fn sqr_lu(order: Order, a: &CscMatrix) -> Result<LuSymbolic> {
    let n = a.ncols();
    if a.nrows() != n {
        return Err(Error::NotSquare { m: a.nrows(), n });
    }
    let q = amd(order, a)?; // fill-reducing ordering
    let unz = 4 * a.nnz() + n; // for LU factorization only,
    Ok(LuSymbolic { q, lnz: unz, unz }) // guess nnz(L) and nnz(U)
}

/// Ordering and analysis for a QR factorization. Requires `m >= n`.
pub fn sqr_qr(order: Order, a: &CscMatrix) -> Result<QrSymbolic> {
    let (m, n) = (a.nrows(), a.ncols());
    if m < n {
        return Err(Error::Underdetermined { m, n });
    }
    let q = amd(order, a)?; // fill-reducing ordering
    let permuted;
    let c = match &q {
        Some(q) => {
            permuted = permute(a, None, Some(q.as_slice()), false);
            &permuted
        }
        None => a,
    };
    let parent = etree(c, true); // etree of C'*C, where C=A(:,q)
    let post = post(&parent);
    let cp = counts(c, &parent, &post, true); // col counts chol(C'*C)
    let unz = cp.iter().sum();
    let v = vcount(c, &parent);
    log::debug!(
        "sqr: {}-by-{}, m2 = {}, nnz(V) = {}, nnz(R) = {}",
        m,
        n,
        v.m2,
        v.lnz,
        unz
    );
    Ok(QrSymbolic {
        q,
        parent,
        cp,
        pinv: v.pinv,
        leftmost: v.leftmost,
        m2: v.m2,
        lnz: v.lnz,
        unz,
    })
}

struct VCount {
    pinv: Vec<usize>,
    leftmost: Vec<Option<usize>>,
    m2: usize,
    lnz: usize,
}

// Row permutation and nnz(V) for a QR factorization, adding a fictitious
// row for each column with no remaining row to place on its diagonal.
fn vcount(a: &CscMatrix, parent: &[Option<usize>]) -> VCount {
    let (m, n) = (a.nrows(), a.ncols());
    let ap = a.col_ptrs();
    let ai = a.row_indices();
    let mut next: Vec<Option<usize>> = vec![None; m];
    let mut head: Vec<Option<usize>> = vec![None; n]; // queue k is empty
    let mut tail: Vec<Option<usize>> = vec![None; n];
    let mut nque: Vec<usize> = vec![0; n];
    let mut leftmost: Vec<Option<usize>> = vec![None; m];
    for k in (0..n).rev() {
        for p in ap[k]..ap[k + 1] {
            leftmost[ai[p]] = Some(k); // leftmost[i] = min(find(A(i,:)))
        }
    }
    for i in (0..m).rev() {
        // scan rows in reverse order
        let Some(k) = leftmost[i] else {
            continue; // row i is empty
        };
        if nque[k] == 0 {
            tail[k] = Some(i); // first row in queue k
        }
        nque[k] += 1;
        next[i] = head[k]; // put i at head of queue k
        head[k] = Some(i);
    }
    let mut pinv: Vec<Option<usize>> = vec![None; m + n];
    let mut lnz = 0;
    let mut m2 = m;
    for k in 0..n {
        // find row permutation and nnz(V)
        lnz += 1; // count V(k,k) as nonzero
        let i = match head[k] {
            Some(i) => i, // remove row i from queue k
            None => {
                m2 += 1; // add a fictitious row
                m2 - 1
            }
        };
        pinv[i] = Some(k); // associate row i with V(:,k)
        if nque[k] <= 1 {
            continue; // skip if V(k+1:m,k) is empty
        }
        nque[k] -= 1;
        lnz += nque[k]; // nque[k] is nnz(V(k+1:m,k))
        if let Some(pa) = parent[k] {
            // move all rows to parent of k
            if nque[pa] == 0 {
                tail[pa] = tail[k];
            }
            if let Some(t) = tail[k] {
                next[t] = head[pa];
            }
            head[pa] = next[i];
            nque[pa] += nque[k];
        }
    }
    let mut k = n;
    for p in pinv.iter_mut().take(m) {
        if p.is_none() {
            *p = Some(k);
            k += 1;
        }
    }
    let pinv = pinv
        .into_iter()
        .take(m2)
        .map(|p| p.unwrap_or_default())
        .collect();
    VCount {
        pinv,
        leftmost,
        m2,
        lnz,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triplet::Triplet;

    fn pattern(m: usize, n: usize, entries: &[(usize, usize)]) -> CscMatrix {
        let mut t = Triplet::new(m, n);
        for &(i, j) in entries {
            t.push(i, j, 1.0).unwrap();
        }
        t.compress()
    }

    fn is_perm(p: &[usize], n: usize) -> bool {
        let mut seen = vec![false; n];
        p.len() == n && p.iter().all(|&i| i < n && !std::mem::replace(&mut seen[i], true))
    }

    #[test]
    fn schol_counts_arrow() {
        // arrow pointing up-left: natural order fills in completely
        let n = 5;
        let mut entries: Vec<_> = (0..n).map(|j| (j, j)).collect();
        entries.extend((1..n).map(|j| (0, j)));
        let a = pattern(n, n, &entries);
        let s = schol(Order::Natural, &a).unwrap();
        assert!(s.pinv.is_none());
        assert_eq!(s.lnz, n * (n + 1) / 2);
        let s = schol(Order::Symmetric, &a).unwrap();
        assert_eq!(s.lnz, 2 * n - 1);
        assert!(is_perm(s.pinv.as_ref().unwrap(), n));
        assert_eq!(s.cp[n], s.lnz);
    }

    #[test]
    fn schol_rejects_rectangular() {
        assert!(matches!(
            schol(Order::Natural, &pattern(3, 2, &[(0, 0)])),
            Err(Error::NotSquare { m: 3, n: 2 })
        ));
    }

    #[test]
    fn lu_guess() {
        let a = pattern(3, 3, &[(0, 0), (1, 1), (2, 2), (0, 2)]);
        let s = sqr_lu(Order::Natural, &a).unwrap();
        assert_eq!(s.lnz, 4 * 4 + 3);
        assert_eq!(s.unz, s.lnz);
    }

    #[test]
    fn qr_adds_fictitious_row() {
        // column 1 shares its only row with column 0
        let a = pattern(3, 3, &[(0, 0), (1, 0), (1, 1), (2, 2)]);
        let s = sqr_qr(Order::Natural, &a).unwrap();
        assert_eq!(s.m2, 3);
        assert!(is_perm(&s.pinv, s.m2));
        let b = pattern(2, 2, &[(0, 0), (1, 0), (0, 1), (1, 1)]);
        let s = sqr_qr(Order::Natural, &b).unwrap();
        assert_eq!(s.m2, 2);
        // both rows start in column 0, so V(:,1) inherits the second one
        assert_eq!(s.lnz, 3);
        assert_eq!(s.unz, 3);
        let c = pattern(2, 2, &[(0, 0), (1, 0)]);
        let s = sqr_qr(Order::Natural, &c).unwrap();
        assert_eq!(s.m2, 3); // column 1 is empty and needs a fictitious row
        assert!(is_perm(&s.pinv, 3));
    }

    #[test]
    fn qr_rejects_underdetermined() {
        assert!(matches!(
            sqr_qr(Order::Natural, &pattern(1, 2, &[(0, 0), (0, 1)])),
            Err(Error::Underdetermined { m: 1, n: 2 })
        ));
    }
}

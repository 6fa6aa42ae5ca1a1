use crate::algebra::symperm;
use crate::csc::CscMatrix;
use crate::error::{Error, Result};
use crate::etree::ereach;
use crate::symbolic::CholeskySymbolic;

/// Numeric Cholesky factor: `L*L' = P*A*P'`.
#[derive(Debug, Clone, PartialEq)]
pub struct CholeskyFactor {
    /// Lower triangular, diagonal first in each column.
    pub l: CscMatrix,
}

/// Up-looking sparse Cholesky factorization of a symmetric positive
/// definite matrix, computed one row of L at a time. Only the upper
/// triangular part of A is used.
///
/// Fails with [`Error::NotPositiveDefinite`] at the first column whose
/// pivot is not positive and finite.
pub fn chol(a: &CscMatrix, s: &CholeskySymbolic) -> Result<CholeskyFactor> {
    let n = a.ncols();
    if a.nrows() != n || s.parent.len() != n {
        return Err(Error::DimensionMismatch {
            expected: (s.parent.len(), s.parent.len()),
            got: (a.nrows(), n),
        });
    }
    a.try_values()?;
    let permuted;
    let c = match &s.pinv {
        Some(pinv) => {
            permuted = symperm(a, Some(pinv.as_slice()), true)?;
            &permuted
        }
        None => a,
    };
    let cp = c.col_ptrs();
    let ci = c.row_indices();
    let cx = c.try_values()?;
    let parent = &s.parent;
    let lp = s.cp.clone();
    let mut li = vec![0; s.lnz];
    let mut lx = vec![0.0; s.lnz];
    let mut next = lp[..n].to_vec(); // next free slot in each column of L
    let mut x = vec![0.0; n];
    let mut stack = vec![0; n];
    let mut marked = vec![false; n];
    for k in 0..n {
        // Nonzero pattern of L(k,:).
        let top = ereach(c, k, parent, &mut stack, &mut marked); // find pattern of L(k,:)
        x[k] = 0.0; // x(0:k) is now zero
        for p in cp[k]..cp[k + 1] {
            // x = full(triu(C(:,k)))
            if ci[p] <= k {
                x[ci[p]] = cx[p];
            }
        }
        let mut d = x[k]; // d = C(k,k)
        x[k] = 0.0; // clear x for k+1st iteration

        // Triangular solve.
        for &i in &stack[top..n] {
            // solve L(0:k-1,0:k-1) * x = C(:,k)
            let lki = x[i] / lx[lp[i]]; // L(k,i) = x(i) / L(i,i)
            x[i] = 0.0; // clear x for k+1st iteration
            for p in lp[i] + 1..next[i] {
                x[li[p]] -= lx[p] * lki;
            }
            d -= lki * lki; // d = d - L(k,i)*L(k,i)
            let p = next[i];
            next[i] += 1;
            li[p] = k; // store L(k,i) in column i
            lx[p] = lki;
        }

        // Compute L(k,k).
        if d <= 0.0 || !d.is_finite() {
            log::warn!("chol: not positive definite at column {}", k);
            return Err(Error::NotPositiveDefinite { column: k });
        }
        let p = next[k];
        next[k] += 1;
        li[p] = k; // store L(k,k) = sqrt(d) in column k
        lx[p] = d.sqrt();
    }
    log::debug!("chol: n = {}, nnz(L) = {}", n, s.lnz);
    Ok(CholeskyFactor {
        l: CscMatrix::new(n, n, lp, li, Some(lx)),
    })
}

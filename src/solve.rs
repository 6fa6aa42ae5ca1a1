//! Triangular solves and the direct solvers built from the factorizations.

use crate::amd::Order;
use crate::cholesky::{chol, CholeskyFactor};
use crate::csc::CscMatrix;
use crate::error::{Error, Result};
use crate::lu::{lu, LuFactor};
use crate::perm::{ipvec, pvec};
use crate::qr::{happly, qr};
use crate::symbolic::{schol, sqr_lu, sqr_qr};

fn check_len(a: &CscMatrix, x: &[f64]) -> Result<()> {
    if x.len() != a.ncols() {
        return Err(Error::DimensionMismatch {
            expected: (a.ncols(), 1),
            got: (x.len(), 1),
        });
    }
    Ok(())
}

/// Solves `L x = b` in place; L is lower triangular with the diagonal
/// stored first in each column.
pub fn lsolve(l: &CscMatrix, x: &mut [f64]) -> Result<()> {
    check_len(l, x)?;
    let lp = l.col_ptrs();
    let li = l.row_indices();
    let lx = l.try_values()?;
    for j in 0..l.ncols() {
        x[j] /= lx[lp[j]];
        for p in lp[j] + 1..lp[j + 1] {
            x[li[p]] -= lx[p] * x[j];
        }
    }
    Ok(())
}

/// Solves `L' x = b` in place; L as for [`lsolve`].
pub fn ltsolve(l: &CscMatrix, x: &mut [f64]) -> Result<()> {
    check_len(l, x)?;
    let lp = l.col_ptrs();
    let li = l.row_indices();
    let lx = l.try_values()?;
    for j in (0..l.ncols()).rev() {
        for p in lp[j] + 1..lp[j + 1] {
            x[j] -= lx[p] * x[li[p]];
        }
        x[j] /= lx[lp[j]];
    }
    Ok(())
}

/// Solves `U x = b` in place; U is upper triangular with the diagonal
/// stored last in each column. Only the first `ncols` rows are used, so U
/// may be trapezoidal.
pub fn usolve(u: &CscMatrix, x: &mut [f64]) -> Result<()> {
    check_len(u, x)?;
    let up = u.col_ptrs();
    let ui = u.row_indices();
    let ux = u.try_values()?;
    for j in (0..u.ncols()).rev() {
        x[j] /= ux[up[j + 1] - 1];
        for p in up[j]..up[j + 1] - 1 {
            x[ui[p]] -= ux[p] * x[j];
        }
    }
    Ok(())
}

/// Solves `U' x = b` in place; U as for [`usolve`].
pub fn utsolve(u: &CscMatrix, x: &mut [f64]) -> Result<()> {
    check_len(u, x)?;
    let up = u.col_ptrs();
    let ui = u.row_indices();
    let ux = u.try_values()?;
    for j in 0..u.ncols() {
        for p in up[j]..up[j + 1] - 1 {
            x[j] -= ux[p] * x[ui[p]];
        }
        x[j] /= ux[up[j + 1] - 1];
    }
    Ok(())
}

impl CholeskyFactor {
    /// Solves `A x = b` in place given the factor of `P*A*P'` and the
    /// inverse permutation it was computed with.
    pub fn solve(&self, pinv: Option<&[usize]>, b: &mut [f64]) -> Result<()> {
        check_len(&self.l, b)?;
        let mut x = vec![0.0; b.len()];
        ipvec(pinv, b, &mut x); // x = P*b
        lsolve(&self.l, &mut x)?; // x = L\x
        ltsolve(&self.l, &mut x)?; // x = L'\x
        pvec(pinv, &x, b); // b = P'*x
        Ok(())
    }
}

impl LuFactor {
    /// Solves `A x = b` in place given the column permutation `q` the
    /// factor was computed with.
    pub fn solve(&self, q: Option<&[usize]>, b: &mut [f64]) -> Result<()> {
        check_len(&self.l, b)?;
        let mut x = vec![0.0; b.len()];
        ipvec(Some(self.pinv.as_slice()), b, &mut x); // x = b(p)
        lsolve(&self.l, &mut x)?; // x = L\x
        usolve(&self.u, &mut x)?; // x = U\x
        ipvec(q, &x, b); // b(q) = x
        Ok(())
    }
}

/// Solves `A x = b` for symmetric positive definite A, using only its upper
/// triangular part. `b` is overwritten with the solution.
pub fn cholsol(order: Order, a: &CscMatrix, b: &mut [f64]) -> Result<()> {
    let s = schol(order, a)?; // ordering and symbolic analysis
    check_len(a, b)?;
    let n = chol(a, &s)?; // numeric Cholesky factorization
    n.solve(s.pinv.as_deref(), b)
}

/// Solves `A x = b` for square A by LU factorization with pivot tolerance
/// `tol`. `b` is overwritten with the solution.
pub fn lusol(order: Order, a: &CscMatrix, b: &mut [f64], tol: f64) -> Result<()> {
    let s = sqr_lu(order, a)?; // ordering and symbolic analysis
    check_len(a, b)?;
    let n = lu(a, &s, tol)?; // numeric LU factorization
    n.solve(s.q.as_deref(), b)
}

// The column of R with a zero on its diagonal, if any.
// First column k with |R(k,k)| <= max(m2,n) * eps * max |R(i,j)|. R(k,k)
// is the last entry of column k.
fn negligible_diagonal(r: &CscMatrix) -> Result<Option<usize>> {
    let rp = r.col_ptrs();
    let rx = r.try_values()?;
    let largest = rx.iter().fold(0.0, |acc: f64, x| acc.max(x.abs()));
    let tol = r.nrows().max(r.ncols()) as f64 * f64::EPSILON * largest;
    Ok((0..r.ncols()).find(|&k| rx[rp[k + 1] - 1].abs() <= tol))
}

/// Least squares (`m >= n`) or minimum-norm (`m < n`) solution of
/// `A x = b` by QR factorization.
///
/// `b` must have `max(m, n)` entries: its first `m` hold the right-hand
/// side on entry and its first `n` hold the solution on return.
pub fn qrsol(order: Order, a: &CscMatrix, b: &mut [f64]) -> Result<()> {
    let (m, n) = (a.nrows(), a.ncols());
    if b.len() < m.max(n) {
        return Err(Error::DimensionMismatch {
            expected: (m.max(n), 1),
            got: (b.len(), 1),
        });
    }
    if m >= n {
        let s = sqr_qr(order, a)?; // ordering and symbolic analysis
        let f = qr(a, &s)?; // numeric QR factorization
        if let Some(column) = negligible_diagonal(&f.r)? {
            log::warn!("qrsol: R has a negligible diagonal in column {}", column);
            return Err(Error::RankDeficient { column });
        }
        let mut x = vec![0.0; s.m2];
        ipvec(Some(&s.pinv[..m]), &b[..m], &mut x); // x(p(0:m-1)) = b(0:m-1)
        for k in 0..n {
            // apply Householder refl. to x
            happly(&f.v, k, f.beta[k], &mut x)?;
        }
        usolve(&f.r, &mut x[..n])?; // x = R\x
        ipvec(s.q.as_deref(), &x[..n], b); // b(q(0:n-1)) = x(0:n-1)
    } else {
        let at = a.transpose(true); // Ax=b is underdetermined
        let s = sqr_qr(order, &at)?; // ordering and symbolic analysis
        let f = qr(&at, &s)?; // numeric QR factorization of A'
        if let Some(column) = negligible_diagonal(&f.r)? {
            log::warn!("qrsol: R has a negligible diagonal in column {}", column);
            return Err(Error::RankDeficient { column });
        }
        let mut x = vec![0.0; s.m2];
        pvec(s.q.as_deref(), &b[..m], &mut x[..m]); // x(0:m-1) = b(q(0:m-1))
        utsolve(&f.r, &mut x[..m])?; // x = R'\x
        for k in (0..m).rev() {
            // apply Householder refl. to x
            happly(&f.v, k, f.beta[k], &mut x)?;
        }
        pvec(Some(&s.pinv[..n]), &x, &mut b[..n]); // b(0:n-1) = x(p(0:n-1))
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triplet::Triplet;

    fn matrix(m: usize, n: usize, entries: &[(usize, usize, f64)]) -> CscMatrix {
        let mut t = Triplet::new(m, n);
        for &(i, j, x) in entries {
            t.push(i, j, x).unwrap();
        }
        t.compress()
    }

    fn assert_close(x: &[f64], y: &[f64]) {
        assert_eq!(x.len(), y.len());
        for (a, b) in x.iter().zip(y) {
            assert!((a - b).abs() < 1e-12, "{:?} != {:?}", x, y);
        }
    }

    #[test]
    fn triangular_solves() {
        // L = [2 . .; 1 4 .; . 1 1]
        let l = matrix(3, 3, &[(0, 0, 2.0), (1, 0, 1.0), (1, 1, 4.0), (2, 1, 1.0), (2, 2, 1.0)]);
        let mut x = [2.0, 5.0, 2.0]; // L * [1 1 1]
        lsolve(&l, &mut x).unwrap();
        assert_close(&x, &[1.0, 1.0, 1.0]);
        let mut x = [3.0, 5.0, 1.0]; // L' * [1 1 1]
        ltsolve(&l, &mut x).unwrap();
        assert_close(&x, &[1.0, 1.0, 1.0]);

        let u = l.transpose(true);
        let mut x = [3.0, 5.0, 1.0];
        usolve(&u, &mut x).unwrap();
        assert_close(&x, &[1.0, 1.0, 1.0]);
        let mut x = [2.0, 5.0, 2.0];
        utsolve(&u, &mut x).unwrap();
        assert_close(&x, &[1.0, 1.0, 1.0]);

        assert!(lsolve(&l, &mut [0.0; 2]).is_err());
    }

    #[test]
    fn direct_solvers_agree() {
        // A = [4 1 0; 1 5 2; 0 2 6], x = [1 2 3]
        let a = matrix(
            3,
            3,
            &[
                (0, 0, 4.0),
                (0, 1, 1.0),
                (1, 0, 1.0),
                (1, 1, 5.0),
                (1, 2, 2.0),
                (2, 1, 2.0),
                (2, 2, 6.0),
            ],
        );
        let b = [6.0, 17.0, 22.0];
        for order in [Order::Natural, Order::Symmetric] {
            let mut x = b;
            cholsol(order, &a, &mut x).unwrap();
            assert_close(&x, &[1.0, 2.0, 3.0]);
        }
        for order in [Order::Natural, Order::Symmetric, Order::SparseNormal] {
            let mut x = b;
            lusol(order, &a, &mut x, 1.0).unwrap();
            assert_close(&x, &[1.0, 2.0, 3.0]);
        }
        for order in [Order::Natural, Order::Normal] {
            let mut x = b;
            qrsol(order, &a, &mut x).unwrap();
            assert_close(&x, &[1.0, 2.0, 3.0]);
        }
    }

    #[test]
    fn least_squares() {
        // fit y = c0 + c1 t through (0, 1), (1, 2), (2, 4): c = [5/6, 3/2]
        let a = matrix(
            3,
            2,
            &[(0, 0, 1.0), (1, 0, 1.0), (2, 0, 1.0), (1, 1, 1.0), (2, 1, 2.0)],
        );
        let mut b = [1.0, 2.0, 4.0];
        qrsol(Order::Natural, &a, &mut b).unwrap();
        assert_close(&b[..2], &[5.0 / 6.0, 1.5]);
    }

    #[test]
    fn minimum_norm() {
        // x0 + x1 = 2 has minimum-norm solution [1 1]
        let a = matrix(1, 2, &[(0, 0, 1.0), (0, 1, 1.0)]);
        let mut b = [2.0, f64::NAN];
        qrsol(Order::Natural, &a, &mut b).unwrap();
        assert_close(&b, &[1.0, 1.0]);
        assert!(qrsol(Order::Natural, &a, &mut [2.0]).is_err());
    }

    #[test]
    fn rank_deficient_qr() {
        // column 1 is empty
        let a = matrix(2, 2, &[(0, 0, 1.0), (1, 0, 1.0)]);
        let mut b = [1.0, 1.0];
        assert!(matches!(
            qrsol(Order::Natural, &a, &mut b),
            Err(Error::RankDeficient { column: 1 })
        ));
    }

    #[test]
    fn dependent_columns_are_rank_deficient() {
        // column 1 is 3 times column 0, so R(1,1) is rounding error
        let a = matrix(
            3,
            2,
            &[(0, 0, 0.1), (1, 0, 0.2), (2, 0, 0.3), (0, 1, 0.3), (1, 1, 0.6), (2, 1, 0.9)],
        );
        let mut b = [1.0, 2.0, 3.0];
        assert!(matches!(
            qrsol(Order::Natural, &a, &mut b),
            Err(Error::RankDeficient { column: 1 })
        ));
        // the same holds for the transposed, underdetermined system
        let mut b = [1.0, 3.0, 0.0];
        assert!(matches!(
            qrsol(Order::Natural, &a.transpose(true), &mut b),
            Err(Error::RankDeficient { column: 1 })
        ));
    }

    #[test]
    fn cholsol_rejects_indefinite() {
        let a = matrix(2, 2, &[(0, 0, 1.0), (0, 1, 2.0), (1, 0, 2.0), (1, 1, 1.0)]);
        let mut b = [1.0, 1.0];
        assert!(matches!(
            cholsol(Order::Natural, &a, &mut b),
            Err(Error::NotPositiveDefinite { .. })
        ));
    }
}

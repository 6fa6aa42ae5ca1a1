use crate::csc::CscMatrix;
use crate::error::{Error, Result};
use crate::internal::cumsum;

/// Scatters `beta * A(:,j)` into the dense accumulator `x`, appending rows
/// seen for the first time to `ci`. `w[i] == mark` flags row `i` as already
/// present in the current column, so the work arrays are never re-zeroed.
pub(crate) fn scatter(
    a: &CscMatrix,
    j: usize,
    beta: f64,
    w: &mut [usize],
    mut x: Option<&mut [f64]>,
    mark: usize,
    ci: &mut Vec<usize>,
) {
    let ap = a.col_ptrs();
    let ai = a.row_indices();
    let ax = a.values();
    for p in ap[j]..ap[j + 1] {
        let i = ai[p];
        if w[i] < mark {
            w[i] = mark; // i is new entry in column j
            ci.push(i);
            if let (Some(x), Some(ax)) = (x.as_deref_mut(), ax) {
                x[i] = beta * ax[p];
            }
        } else if let (Some(x), Some(ax)) = (x.as_deref_mut(), ax) {
            x[i] += beta * ax[p]; // i exists in C(:,j) already
        }
    }
}

/// C = A*B. The result holds values only when both operands do.
pub fn multiply(a: &CscMatrix, b: &CscMatrix) -> Result<CscMatrix> {
    if a.ncols() != b.nrows() {
        return Err(Error::DimensionMismatch {
            expected: (a.ncols(), b.ncols()),
            got: (b.nrows(), b.ncols()),
        });
    }
    let (m, n) = (a.nrows(), b.ncols());
    let values = a.has_values() && b.has_values();
    let bp = b.col_ptrs();
    let bi = b.row_indices();
    let bx = b.values();
    let mut w = vec![0; m];
    let mut x = if values { vec![0.0; m] } else { Vec::new() };
    let mut cp = vec![0; n + 1];
    let mut ci = Vec::with_capacity(a.nnz() + b.nnz());
    let mut cx = Vec::with_capacity(if values { ci.capacity() } else { 0 });
    for j in 0..n {
        cp[j] = ci.len(); // column j of C starts here
        for p in bp[j]..bp[j + 1] {
            let beta = bx.map_or(1.0, |bx| bx[p]);
            let xs = if values { Some(&mut x[..]) } else { None };
            scatter(a, bi[p], beta, &mut w, xs, j + 1, &mut ci);
        }
        if values {
            cx.extend(ci[cp[j]..].iter().map(|&i| x[i]));
        }
    }
    cp[n] = ci.len();
    Ok(CscMatrix::new(m, n, cp, ci, values.then_some(cx)))
}

/// C = alpha*A + beta*B.
pub fn add(a: &CscMatrix, b: &CscMatrix, alpha: f64, beta: f64) -> Result<CscMatrix> {
    if a.nrows() != b.nrows() || a.ncols() != b.ncols() {
        return Err(Error::DimensionMismatch {
            expected: (a.nrows(), a.ncols()),
            got: (b.nrows(), b.ncols()),
        });
    }
    let (m, n) = (a.nrows(), b.ncols());
    let values = a.has_values() && b.has_values();
    let mut w = vec![0; m];
    let mut x = if values { vec![0.0; m] } else { Vec::new() };
    let mut cp = vec![0; n + 1];
    let mut ci = Vec::with_capacity(a.nnz() + b.nnz());
    let mut cx = Vec::with_capacity(if values { ci.capacity() } else { 0 });
    for j in 0..n {
        cp[j] = ci.len();
        let xs = if values { Some(&mut x[..]) } else { None };
        scatter(a, j, alpha, &mut w, xs, j + 1, &mut ci);
        let xs = if values { Some(&mut x[..]) } else { None };
        scatter(b, j, beta, &mut w, xs, j + 1, &mut ci);
        if values {
            cx.extend(ci[cp[j]..].iter().map(|&i| x[i]));
        }
    }
    cp[n] = ci.len();
    Ok(CscMatrix::new(m, n, cp, ci, values.then_some(cx)))
}

/// 1-norm of A: the largest column sum of absolute values. Zero for a pattern.
pub fn norm1(a: &CscMatrix) -> f64 {
    let Some(ax) = a.values() else {
        return 0.0;
    };
    let ap = a.col_ptrs();
    (0..a.ncols())
        .map(|j| ax[ap[j]..ap[j + 1]].iter().map(|v| v.abs()).sum::<f64>())
        .fold(0.0, f64::max)
}

/// y = A*x + y.
pub fn gaxpy(a: &CscMatrix, x: &[f64], y: &mut [f64]) -> Result<()> {
    if x.len() < a.ncols() || y.len() < a.nrows() {
        return Err(Error::DimensionMismatch {
            expected: (a.nrows(), a.ncols()),
            got: (y.len(), x.len()),
        });
    }
    let ax = a.try_values()?;
    let ap = a.col_ptrs();
    let ai = a.row_indices();
    for j in 0..a.ncols() {
        for p in ap[j]..ap[j + 1] {
            y[ai[p]] += ax[p] * x[j];
        }
    }
    Ok(())
}

/// C = A(p,q) where `pinv` is the inverse row permutation and `q` the column
/// permutation. `None` stands for the identity.
pub fn permute(
    a: &CscMatrix,
    pinv: Option<&[usize]>,
    q: Option<&[usize]>,
    values: bool,
) -> CscMatrix {
    let (m, n) = (a.nrows(), a.ncols());
    let ap = a.col_ptrs();
    let ai = a.row_indices();
    let ax = if values { a.values() } else { None };
    let mut cp = vec![0; n + 1];
    let mut ci = Vec::with_capacity(a.nnz());
    let mut cx = ax.map(|_| Vec::with_capacity(a.nnz()));
    for k in 0..n {
        cp[k] = ci.len(); // column k of C is column q[k] of A
        let j = q.map_or(k, |q| q[k]);
        for t in ap[j]..ap[j + 1] {
            if let (Some(cx), Some(ax)) = (cx.as_mut(), ax) {
                cx.push(ax[t]);
            }
            ci.push(pinv.map_or(ai[t], |pinv| pinv[ai[t]])); // row i of A is row pinv[i] of C
        }
    }
    cp[n] = ci.len();
    CscMatrix::new(m, n, cp, ci, cx)
}

/// C = A(p,p) where A and C are symmetric with only the upper triangular
/// part stored. Entries of A below the diagonal are ignored.
pub fn symperm(a: &CscMatrix, pinv: Option<&[usize]>, values: bool) -> Result<CscMatrix> {
    let n = a.ncols();
    if a.nrows() != n {
        return Err(Error::NotSquare { m: a.nrows(), n });
    }
    let ap = a.col_ptrs();
    let ai = a.row_indices();
    let ax = if values { a.values() } else { None };
    let perm = |k: usize| pinv.map_or(k, |pinv| pinv[k]);
    let mut w = vec![0; n];
    for j in 0..n {
        let j2 = perm(j); // column j of A is column j2 of C
        for p in ap[j]..ap[j + 1] {
            let i = ai[p];
            if i > j {
                continue; // skip lower triangular part of A
            }
            let i2 = perm(i);
            w[i2.max(j2)] += 1; // column count of C
        }
    }
    let mut cp = vec![0; n + 1];
    let nz = cumsum(&mut cp, &mut w);
    let mut ci = vec![0; nz];
    let mut cx = ax.map(|_| vec![0.0; nz]);
    for j in 0..n {
        let j2 = perm(j);
        for p in ap[j]..ap[j + 1] {
            let i = ai[p];
            if i > j {
                continue;
            }
            let i2 = perm(i);
            let q = w[i2.max(j2)];
            w[i2.max(j2)] += 1;
            ci[q] = i2.min(j2);
            if let (Some(cx), Some(ax)) = (cx.as_mut(), ax) {
                cx[q] = ax[p];
            }
        }
    }
    Ok(CscMatrix::new(n, n, cp, ci, cx))
}

/// C = A + triu(A,1)' when A holds one triangle of a symmetric matrix: the
/// off-diagonal entries of A' are added to A.
pub fn make_symmetric(a: &CscMatrix) -> Result<CscMatrix> {
    let mut at = a.transpose(true);
    at.fkeep(|i, j, _| i != j); // drop diagonal entries from A'
    add(a, &at, 1.0, 1.0)
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

    fn dense(a: &CscMatrix) -> Vec<Vec<f64>> {
        let mut d = vec![vec![0.0; a.ncols()]; a.nrows()];
        for j in 0..a.ncols() {
            for p in a.col_ptrs()[j]..a.col_ptrs()[j + 1] {
                d[a.row_indices()[p]][j] += a.values().unwrap()[p];
            }
        }
        d
    }

    #[test]
    fn multiply_matches_dense_product() {
        let a = matrix(3, 2, &[(0, 0, 1.0), (2, 0, 2.0), (1, 1, 3.0), (2, 1, -1.0)]);
        let b = matrix(2, 3, &[(0, 0, 4.0), (1, 1, 5.0), (0, 2, 1.0), (1, 2, 1.0)]);
        let c = multiply(&a, &b).unwrap();
        assert_eq!(
            dense(&c),
            vec![
                vec![4.0, 0.0, 1.0],
                vec![0.0, 15.0, 3.0],
                vec![8.0, -5.0, 1.0],
            ]
        );
        assert!(matches!(
            multiply(&a, &a),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn add_scales_and_merges() {
        let a = matrix(2, 2, &[(0, 0, 1.0), (1, 1, 2.0)]);
        let b = matrix(2, 2, &[(0, 0, 3.0), (1, 0, 1.0)]);
        let c = add(&a, &b, 2.0, -1.0).unwrap();
        assert_eq!(c.nnz(), 3);
        assert_eq!(dense(&c), vec![vec![-1.0, 0.0], vec![-1.0, 4.0]]);
    }

    #[test]
    fn pattern_product_has_no_values() {
        let a = matrix(2, 2, &[(0, 0, 1.0), (1, 0, 1.0)]).pattern();
        let c = multiply(&a, &a.transpose(false)).unwrap();
        assert!(!c.has_values());
        assert_eq!(c.nnz(), 4);
    }

    #[test]
    fn norm_and_gaxpy() {
        let a = matrix(2, 2, &[(0, 0, -3.0), (1, 0, 1.0), (0, 1, 2.0)]);
        assert_eq!(norm1(&a), 4.0);
        let mut y = vec![1.0, 1.0];
        gaxpy(&a, &[1.0, 2.0], &mut y).unwrap();
        assert_eq!(y, vec![2.0, 2.0]);
        assert!(gaxpy(&a, &[1.0], &mut y).is_err());
    }

    #[test]
    fn symperm_reverses_upper_triangle() {
        // upper triangle of [[4 1 0] [1 5 2] [0 2 6]]
        let a = matrix(3, 3, &[(0, 0, 4.0), (0, 1, 1.0), (1, 1, 5.0), (1, 2, 2.0), (2, 2, 6.0)]);
        let pinv = [2, 1, 0];
        let c = symperm(&a, Some(&pinv[..]), true).unwrap();
        assert!(c.is_upper_triangular());
        assert_eq!(c.get(0, 0), 6.0);
        assert_eq!(c.get(0, 1), 2.0);
        assert_eq!(c.get(1, 2), 1.0);
        assert_eq!(c.get(2, 2), 4.0);
    }

    #[test]
    fn permute_rows_and_columns() {
        let a = matrix(2, 2, &[(0, 0, 1.0), (1, 0, 2.0), (1, 1, 3.0)]);
        let c = permute(&a, Some(&[1, 0][..]), Some(&[1, 0][..]), true);
        assert_eq!(dense(&c), vec![vec![3.0, 2.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn make_symmetric_fills_both_triangles() {
        let u = matrix(3, 3, &[(0, 0, 2.0), (0, 2, 1.0), (1, 1, 2.0), (1, 2, -1.0), (2, 2, 2.0)]);
        let c = make_symmetric(&u).unwrap();
        assert!(!c.is_upper_triangular());
        assert!(!c.is_lower_triangular());
        let d = dense(&c);
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(d[i][j], d[j][i]);
            }
        }
        assert_eq!(d[0][0], 2.0);
    }
}

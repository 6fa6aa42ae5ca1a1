use crate::csc::CscMatrix;
use crate::error::{Error, Result};
use crate::symbolic::QrSymbolic;

/// Numeric QR factor: `Q*R = A(p,q)` where Q is held implicitly as the
/// product of the Householder reflections `I - beta[k]*v*v'` with `v` the
/// k-th column of V.
#[derive(Debug, Clone, PartialEq)]
pub struct QrFactor {
    /// Householder vectors, `m2`-by-`n`, diagonal first in each column.
    pub v: CscMatrix,
    /// Householder scalars, one per column.
    pub beta: Vec<f64>,
    /// Upper trapezoidal, `m2`-by-`n`, diagonal last in each column.
    pub r: CscMatrix,
}

/// Computes a Householder reflection `H = I - beta*v*v'` such that `H*x`
/// is `s*e1`. On return `x` holds `v` (with `v[0]` not necessarily 1);
/// the pair `(s, beta)` is returned.
pub fn house(x: &mut [f64]) -> (f64, f64) {
    let Some((x0, rest)) = x.split_first_mut() else {
        return (0.0, 0.0);
    };
    let sigma: f64 = rest.iter().map(|xi| xi * xi).sum();
    if sigma == 0.0 {
        let s = x0.abs(); // s = |x(0)|
        let beta = if *x0 <= 0.0 { 2.0 } else { 0.0 };
        *x0 = 1.0;
        (s, beta)
    } else {
        let s = (*x0 * *x0 + sigma).sqrt(); // s = norm (x)
        *x0 = if *x0 <= 0.0 {
            *x0 - s
        } else {
            -sigma / (*x0 + s)
        };
        (s, -1.0 / (s * *x0))
    }
}

/// Applies the i-th Householder reflection held in V to the dense vector
/// `x`: `x = (I - beta*v*v')*x`.
pub fn happly(v: &CscMatrix, i: usize, beta: f64, x: &mut [f64]) -> Result<()> {
    if x.len() < v.nrows() {
        return Err(Error::DimensionMismatch {
            expected: (v.nrows(), 1),
            got: (x.len(), 1),
        });
    }
    let vp = v.col_ptrs();
    let range = vp[i]..vp[i + 1];
    apply_reflection(&v.row_indices()[range.clone()], &v.try_values()?[range], beta, x);
    Ok(())
}

pub(crate) fn apply_reflection(vi: &[usize], vx: &[f64], beta: f64, x: &mut [f64]) {
    let mut tau = 0.0;
    for (&i, &v) in vi.iter().zip(vx) {
        tau += v * x[i]; // tau = v'*x
    }
    tau *= beta; // tau = beta*(v'*x)
    for (&i, &v) in vi.iter().zip(vx) {
        x[i] -= v * tau; // x = x - v*tau
    }
}

/// Sparse left-looking Householder QR of A(:,q), one column at a time. Each
/// column is reduced by the reflections of the columns below it in the
/// column elimination tree, then a new reflection annihilates the rest of
/// the column.
///
/// Requires `m >= n`. Structurally rank deficient matrices are handled
/// through the fictitious rows of the symbolic analysis; a numerically rank
/// deficient matrix gives a zero or negligible diagonal entry in R.
pub fn qr(a: &CscMatrix, s: &QrSymbolic) -> Result<QrFactor> {
    let (m, n) = (a.nrows(), a.ncols());
    if m < n {
        return Err(Error::Underdetermined { m, n });
    }
    if s.parent.len() != n || s.leftmost.len() != m {
        return Err(Error::DimensionMismatch {
            expected: (s.leftmost.len(), s.parent.len()),
            got: (m, n),
        });
    }
    let ap = a.col_ptrs();
    let ai = a.row_indices();
    let ax = a.try_values()?;
    let q = s.q.as_deref();
    let parent = &s.parent;
    let pinv = &s.pinv;
    let leftmost = &s.leftmost;
    let m2 = s.m2;

    // Row/column marks; `w[i] == k + 1` once i is marked for column k.
    let mut w = vec![0usize; m2];
    let mut x = vec![0.0; m2];
    let mut stack = vec![0; n];
    let mut path = Vec::new();
    let mut vp = Vec::with_capacity(n + 1);
    let mut vi = Vec::with_capacity(s.lnz);
    let mut vx = Vec::with_capacity(s.lnz);
    let mut rp = Vec::with_capacity(n + 1);
    let mut ri = Vec::with_capacity(s.unz);
    let mut rx = Vec::with_capacity(s.unz);
    let mut beta = vec![0.0; n];
    for k in 0..n {
        // compute V and R
        let mark = k + 1;
        rp.push(ri.len()); // R(:,k) starts here
        let p1 = vi.len();
        vp.push(p1); // V(:,k) starts here
        w[k] = mark; // add V(k,k) to pattern of V
        vi.push(k);
        let mut top = n;
        let col = q.map_or(k, |q| q[k]);
        for p in ap[col]..ap[col + 1] {
            // find R(:,k) pattern
            let row = ai[p];
            let mut node = leftmost[row]; // i = min(find(A(i,q)))
            path.clear();
            while let Some(i) = node {
                // traverse up to k
                if w[i] == mark {
                    break;
                }
                path.push(i);
                w[i] = mark;
                node = parent[i];
            }
            while let Some(i) = path.pop() {
                top -= 1;
                stack[top] = i; // push path on stack
            }
            let i = pinv[row]; // i = permuted row of A(:,col)
            x[i] = ax[p]; // x (i) = A(:,col)
            if i > k && w[i] != mark {
                // pattern of V(:,k) = x (k+1:m)
                vi.push(i); // add i to pattern of V(:,k)
                w[i] = mark;
            }
        }
        for &i in &stack[top..n] {
            // for each i in pattern of R(:,k)
            let range = vp[i]..vp[i + 1];
            apply_reflection(&vi[range.clone()], &vx[range], beta[i], &mut x); // apply (V(i),Beta(i)) to x
            ri.push(i); // R(i,k) = x(i)
            rx.push(x[i]);
            x[i] = 0.0;
            if parent[i] == Some(k) {
                for p in vp[i]..vp[i + 1] {
                    // scatter V(:,i) into the pattern of V(:,k)
                    let row = vi[p];
                    if w[row] != mark {
                        w[row] = mark;
                        vi.push(row);
                    }
                }
            }
        }
        for p in p1..vi.len() {
            // gather V(:,k) = x
            vx.push(x[vi[p]]);
            x[vi[p]] = 0.0;
        }
        let (rkk, bk) = house(&mut vx[p1..]); // [v,beta]=house(x)
        beta[k] = bk;
        ri.push(k); // R(k,k) = norm (x)
        rx.push(rkk);
    }
    rp.push(ri.len()); // finalize R
    vp.push(vi.len()); // finalize V
    log::debug!(
        "qr: {}-by-{}, nnz(V) = {}, nnz(R) = {}",
        m,
        n,
        vi.len(),
        ri.len()
    );
    Ok(QrFactor {
        v: CscMatrix::new(m2, n, vp, vi, Some(vx)),
        beta,
        r: CscMatrix::new(m2, n, rp, ri, Some(rx)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amd::Order;
    use crate::symbolic::sqr_qr;
    use crate::triplet::Triplet;

    fn matrix(m: usize, n: usize, entries: &[(usize, usize, f64)]) -> CscMatrix {
        let mut t = Triplet::new(m, n);
        for &(i, j, x) in entries {
            t.push(i, j, x).unwrap();
        }
        t.compress()
    }

    #[test]
    fn house_annihilates() {
        let mut x = [3.0, 4.0];
        let orig = x;
        let (s, beta) = house(&mut x);
        assert!((s - 5.0).abs() < 1e-14);
        // H*orig = orig - beta*v*(v'*orig) = [s, 0]
        let tau = beta * (x[0] * orig[0] + x[1] * orig[1]);
        assert!((orig[0] - x[0] * tau - 5.0).abs() < 1e-14);
        assert!((orig[1] - x[1] * tau).abs() < 1e-14);
    }

    #[test]
    fn house_of_negative_unit() {
        let mut x = [-2.0];
        assert_eq!(house(&mut x), (2.0, 2.0));
        assert_eq!(x, [1.0]);
        let mut x = [2.0, 0.0];
        assert_eq!(house(&mut x), (2.0, 0.0));
    }

    #[test]
    fn happly_matches_dense_reflection() {
        let v = matrix(3, 1, &[(0, 0, 1.0), (2, 0, 2.0)]);
        let mut x = [1.0, 5.0, 1.0];
        happly(&v, 0, 0.5, &mut x).unwrap();
        // tau = 0.5 * (1 + 2) = 1.5
        assert_eq!(x, [-0.5, 5.0, -2.0]);
        assert!(happly(&v, 0, 0.5, &mut [0.0; 2]).is_err());
    }

    #[test]
    fn r_of_tall_matrix() {
        // A = [3 0; 4 1; 0 2]; R'R = A'A = [25 4; 4 5]
        let a = matrix(3, 2, &[(0, 0, 3.0), (1, 0, 4.0), (1, 1, 1.0), (2, 1, 2.0)]);
        let s = sqr_qr(Order::Natural, &a).unwrap();
        let f = qr(&a, &s).unwrap();
        let r00 = f.r.get(0, 0);
        let r01 = f.r.get(0, 1);
        let r11 = f.r.get(1, 1);
        assert!((r00 * r00 - 25.0).abs() < 1e-12);
        assert!((r00 * r01 - 4.0).abs() < 1e-12);
        assert!((r01 * r01 + r11 * r11 - 5.0).abs() < 1e-12);
        assert_eq!(f.beta.len(), 2);
        assert!(f.v.nnz() <= s.lnz);
    }

    #[test]
    fn rejects_wide_matrix() {
        let a = matrix(1, 2, &[(0, 0, 1.0), (0, 1, 1.0)]);
        let s = sqr_qr(Order::Natural, &matrix(2, 2, &[(0, 0, 1.0), (1, 1, 1.0)])).unwrap();
        assert!(matches!(qr(&a, &s), Err(Error::Underdetermined { m: 1, n: 2 })));
    }
}

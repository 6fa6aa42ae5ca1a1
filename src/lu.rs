use crate::csc::CscMatrix;
use crate::error::{Error, Result};
use crate::reach::{spsolve_parts, ReachWork, SparseCols};
use crate::symbolic::LuSymbolic;

/// Numeric LU factor: `L*U = A(p,q)` with `pinv` the inverse of `p` and
/// `q` taken from the symbolic analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct LuFactor {
    /// Unit lower triangular, diagonal first in each column.
    pub l: CscMatrix,
    /// Upper triangular, diagonal last in each column.
    pub u: CscMatrix,
    /// Row `i` of A is row `pinv[i]` of L*U.
    pub pinv: Vec<usize>,
}

/// Sparse LU factorization with threshold partial pivoting, one column at a
/// time: each column of A(:,q) is solved against the columns of L computed
/// so far, then a pivot is chosen among the rows not yet pivotal.
///
/// The diagonal entry is chosen when its magnitude is at least `tol` times
/// the largest candidate; `tol = 1` is partial pivoting and `tol = 0` keeps
/// the diagonal whenever it is nonzero. Fails with [`Error::Singular`] when
/// a column has no nonzero candidate.
pub fn lu(a: &CscMatrix, s: &LuSymbolic, tol: f64) -> Result<LuFactor> {
    let n = a.ncols();
    if a.nrows() != n {
        return Err(Error::NotSquare { m: a.nrows(), n });
    }
    let ap = a.col_ptrs();
    let ai = a.row_indices();
    let ax = a.try_values()?;
    let q = s.q.as_deref();
    let mut x = vec![0.0; n];
    let mut work = ReachWork::new(n);
    let mut pinv: Vec<Option<usize>> = vec![None; n]; // no rows pivotal yet
    let mut lp = Vec::with_capacity(n + 1);
    let mut li = Vec::with_capacity(s.lnz);
    let mut lx = Vec::with_capacity(s.lnz);
    let mut up = Vec::with_capacity(n + 1);
    let mut ui = Vec::with_capacity(s.unz);
    let mut ux = Vec::with_capacity(s.unz);
    for k in 0..n {
        // Triangular solve.
        lp.push(li.len()); // L(:,k) starts here
        up.push(ui.len()); // U(:,k) starts here
        let col = q.map_or(k, |q| q[k]);
        let range = ap[col]..ap[col + 1];
        let top = spsolve_parts(
            SparseCols {
                p: &lp,
                i: &li,
                x: &lx,
            },
            n,
            &ai[range.clone()],
            &ax[range],
            &mut x,
            Some(pinv.as_slice()),
            true,
            &mut work,
        ); // x = L\A(:,col)

        // Find pivot.
        let mut ipiv = None;
        let mut amax = -1.0;
        for &i in work.pattern(top) {
            match pinv[i] {
                None => {
                    // row i is not yet pivotal
                    let t = x[i].abs();
                    if t > amax {
                        amax = t; // largest pivot candidate so far
                        ipiv = Some(i);
                    }
                }
                Some(row) => {
                    // x(i) is the entry U(pinv[i],k)
                    ui.push(row);
                    ux.push(x[i]);
                }
            }
        }
        let ipiv = match ipiv {
            Some(i) if amax > 0.0 => i,
            _ => {
                log::warn!("lu: no acceptable pivot in column {}", k);
                return Err(Error::Singular { column: k });
            }
        };
        let ipiv = if pinv[col].is_none() && x[col] != 0.0 && x[col].abs() >= amax * tol {
            col // tol=1 for partial pivoting; tol<1 gives preference to diagonal
        } else {
            ipiv
        };

        // Divide by pivot.
        let pivot = x[ipiv]; // the chosen pivot
        ui.push(k); // last entry in U(:,k) is U(k,k)
        ux.push(pivot);
        pinv[ipiv] = Some(k); // ipiv is the kth pivot row
        li.push(ipiv); // first entry in L(:,k) is L(k,k) = 1
        lx.push(1.0);
        for &i in work.pattern(top) {
            // L(k+1:n,k) = x / pivot
            if pinv[i].is_none() {
                // x(i) is an entry in L(:,k)
                li.push(i); // save unpermuted row in L
                lx.push(x[i] / pivot); // scale pivot column
            }
            x[i] = 0.0; // x [0..n-1] = 0 for next k
        }
    }

    // Final L and U.
    lp.push(li.len());
    up.push(ui.len());
    let pinv: Vec<usize> = pinv.into_iter().map(|p| p.unwrap_or_default()).collect();
    for i in li.iter_mut() {
        *i = pinv[*i]; // fix row indices of L for final pinv
    }
    log::debug!("lu: n = {}, nnz(L) = {}, nnz(U) = {}", n, li.len(), ui.len());
    Ok(LuFactor {
        l: CscMatrix::new(n, n, lp, li, Some(lx)),
        u: CscMatrix::new(n, n, up, ui, Some(ux)),
        pinv,
    })
}

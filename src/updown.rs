use crate::cholesky::CholeskyFactor;
use crate::csc::CscMatrix;
use crate::error::{Error, Result};

/// Sign of a rank-1 modification of a Cholesky factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `L*L' + w*w'`.
    Update,
    /// `L*L' - w*w'`.
    Downdate,
}

/// Modifies the Cholesky factor in place so that `L*L'` becomes
/// `L*L' ± W*W'`, one column of W at a time.
///
/// W is given in the permuted ordering of L and `parent` is the elimination
/// tree L was computed with. The pattern of each column of W must lie on
/// the tree path from its lowest row up to the root, and within the pattern
/// of L; only the columns of L on that path change. A downdate that would
/// make the factor indefinite fails with [`Error::DowndateFailed`], and an
/// update that produces a non-finite value (W holding an infinity or NaN)
/// fails with [`Error::UpdateFailed`]. Either way L is left as it was.
pub fn updown(
    l: &mut CholeskyFactor,
    direction: Direction,
    w: &CscMatrix,
    parent: &[Option<usize>],
) -> Result<()> {
    let n = l.l.ncols();
    if w.nrows() != n || parent.len() != n {
        return Err(Error::DimensionMismatch {
            expected: (n, w.ncols()),
            got: (w.nrows(), w.ncols()),
        });
    }
    let wp = w.col_ptrs();
    let wi = w.row_indices();
    let wx = w.try_values()?;
    l.l.try_values()?;

    // Every column's pattern is checked before any value changes.
    let mut paths = Vec::with_capacity(w.ncols());
    let mut on_path = vec![false; n];
    for k in 0..w.ncols() {
        let rows = &wi[wp[k]..wp[k + 1]];
        let Some(&f) = rows.iter().min() else {
            paths.push(Vec::new()); // W(:,k) is empty
            continue;
        };
        let mut path = Vec::new();
        let mut j = Some(f);
        while let Some(jj) = j {
            // walk path f up to root
            path.push(jj);
            on_path[jj] = true;
            j = parent[jj];
        }
        let stray = rows.iter().find(|&&i| !on_path[i]).copied();
        for &jj in &path {
            on_path[jj] = false;
        }
        if let Some(row) = stray {
            return Err(Error::UpdatePattern { row });
        }
        paths.push(path);
    }

    let saved = l.l.values().map(<[f64]>::to_vec);
    let mut work = vec![0.0; n];
    for (k, path) in paths.iter().enumerate() {
        let range = wp[k]..wp[k + 1];
        let rows = &wi[range.clone()];
        if let Err(column) = sweep(&mut l.l, direction, path, rows, &wx[range], &mut work) {
            if let (Some(saved), Some(lx)) = (saved.as_deref(), l.l.values_mut()) {
                lx.copy_from_slice(saved);
            }
            log::warn!("updown: {:?} failed at column {}", direction, column);
            return Err(match direction {
                Direction::Update => Error::UpdateFailed { column },
                Direction::Downdate => Error::DowndateFailed { column },
            });
        }
    }
    log::debug!("updown: {:?} of rank {}", direction, w.ncols());
    Ok(())
}

// One rank-1 sweep along `path`. On failure the column of L where the
// diagonal would vanish is returned and L is partially modified.
fn sweep(
    l: &mut CscMatrix,
    direction: Direction,
    path: &[usize],
    ci: &[usize],
    cx: &[f64],
    w: &mut [f64],
) -> std::result::Result<(), usize> {
    let sigma = match direction {
        Direction::Update => 1.0,
        Direction::Downdate => -1.0,
    };
    for &j in path {
        w[j] = 0.0; // clear workspace w
    }
    for (&i, &x) in ci.iter().zip(cx) {
        w[i] = x; // w = C
    }
    let (lp, li, Some(lx)) = l.values_parts_mut() else {
        return Ok(());
    };
    let mut beta = 1.0;
    for &j in path {
        let p = lp[j];
        let alpha = w[j] / lx[p]; // alpha = w(j) / L(j,j)
        let beta2 = beta * beta + sigma * alpha * alpha;
        if beta2 <= 0.0 || !beta2.is_finite() {
            return Err(j); // not positive definite
        }
        let beta2 = beta2.sqrt();
        let delta = if sigma > 0.0 { beta / beta2 } else { beta2 / beta };
        let gamma = sigma * alpha / (beta2 * beta);
        lx[p] = delta * lx[p] + if sigma > 0.0 { gamma * w[j] } else { 0.0 };
        beta = beta2;
        for p in lp[j] + 1..lp[j + 1] {
            let w1 = w[li[p]];
            let w2 = w1 - alpha * lx[p];
            w[li[p]] = w2;
            lx[p] = delta * lx[p] + gamma * if sigma > 0.0 { w1 } else { w2 };
        }
    }
    Ok(())
}

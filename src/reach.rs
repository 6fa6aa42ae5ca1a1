//! Depth-first reach in the graph of a sparse matrix, and the sparse
//! triangular solve built on it.

use crate::csc::CscMatrix;
use crate::error::Result;

/// Reusable work arrays for [`reach`] and [`spsolve`] on an `n`-node graph.
///
/// After a call returning `top`, the reached nodes are `xi[top..n]` in
/// topological order.
#[derive(Debug, Clone)]
pub struct ReachWork {
    xi: Vec<usize>,
    pstack: Vec<usize>,
    stack: Vec<usize>,
    marked: Vec<bool>,
}

impl ReachWork {
    pub fn new(n: usize) -> Self {
        ReachWork {
            xi: vec![0; n],
            pstack: vec![0; n],
            stack: Vec::with_capacity(n),
            marked: vec![false; n],
        }
    }

    /// The nodes found by the last call that returned `top`.
    pub fn pattern(&self, top: usize) -> &[usize] {
        &self.xi[top..]
    }
}

/// Depth-first search of the graph with column pointers `gp` and row
/// indices `gi` from node `j`, skipping marked nodes. Node `j`'s successors
/// are the row indices of column `pinv[j]` (column `j` when `pinv` is
/// `None`; none when `pinv[j]` is `None`). Finished nodes are pushed onto
/// `xi[..top]` from the top down and the new `top` is returned. Nodes stay
/// marked.
#[allow(clippy::too_many_arguments)]
pub(crate) fn dfs(
    j: usize,
    gp: &[usize],
    gi: &[usize],
    mut top: usize,
    xi: &mut [usize],
    stack: &mut Vec<usize>,
    pstack: &mut [usize],
    marked: &mut [bool],
    pinv: Option<&[Option<usize>]>,
) -> usize {
    stack.clear();
    stack.push(j); // initialize the recursion stack
    while let Some(&j) = stack.last() {
        let jnew = match pinv {
            Some(pinv) => pinv[j],
            None => Some(j),
        };
        if !marked[j] {
            marked[j] = true; // mark node j as visited
            pstack[j] = jnew.map_or(0, |jnew| gp[jnew]);
        }
        let p2 = jnew.map_or(0, |jnew| gp[jnew + 1]);
        let mut done = true; // node j done if no unvisited neighbors
        for p in pstack[j]..p2 {
            // examine all neighbors of j
            let i = gi[p]; // consider neighbor node i
            if marked[i] {
                continue; // skip visited node i
            }
            pstack[j] = p; // pause depth-first search of node j
            stack.push(i); // start dfs at node i
            done = false; // node j is not done
            break; // break, to start dfs (i)
        }
        if done {
            // depth-first search at node j is done
            stack.pop(); // remove j from the recursion stack
            top -= 1;
            xi[top] = j; // and place in the output stack
        }
    }
    top
}

/// Finds the nodes reachable in the graph of `g` from the pattern of
/// `B(:,k)`. Returns `top`; the nodes are `work.pattern(top)`, in
/// topological order.
pub fn reach(
    g: &CscMatrix,
    b: &CscMatrix,
    k: usize,
    pinv: Option<&[Option<usize>]>,
    work: &mut ReachWork,
) -> usize {
    let bp = b.col_ptrs();
    reach_parts(
        g.col_ptrs(),
        g.row_indices(),
        g.ncols(),
        &b.row_indices()[bp[k]..bp[k + 1]],
        pinv,
        work,
    )
}

// Reach from the nodes in `bi` in a graph of n nodes given by its parts.
pub(crate) fn reach_parts(
    gp: &[usize],
    gi: &[usize],
    n: usize,
    bi: &[usize],
    pinv: Option<&[Option<usize>]>,
    work: &mut ReachWork,
) -> usize {
    let mut top = n;
    let ReachWork {
        xi,
        pstack,
        stack,
        marked,
    } = work;
    for &i in bi {
        if !marked[i] {
            // start a dfs at unmarked node i
            top = dfs(i, gp, gi, top, xi, stack, pstack, marked, pinv);
        }
    }
    for &i in &xi[top..n] {
        marked[i] = false; // restore the marks
    }
    top
}

/// Solves `G x = B(:,k)` where G is triangular with its diagonal stored
/// first (`lower`) or last (upper) in each column. The solution is scattered
/// into `x`, nonzero only on `work.pattern(top)`; `top` is returned.
pub fn spsolve(
    g: &CscMatrix,
    b: &CscMatrix,
    k: usize,
    x: &mut [f64],
    pinv: Option<&[Option<usize>]>,
    lower: bool,
    work: &mut ReachWork,
) -> Result<usize> {
    let bp = b.col_ptrs();
    let range = bp[k]..bp[k + 1];
    let top = spsolve_parts(
        SparseCols {
            p: g.col_ptrs(),
            i: g.row_indices(),
            x: g.try_values()?,
        },
        g.ncols(),
        &b.row_indices()[range.clone()],
        &b.try_values()?[range],
        x,
        pinv,
        lower,
        work,
    );
    Ok(top)
}

/// Borrowed columns of a triangular factor that may still be under
/// construction: only the columns reached by the solve are read.
#[derive(Clone, Copy)]
pub(crate) struct SparseCols<'a> {
    pub p: &'a [usize],
    pub i: &'a [usize],
    pub x: &'a [f64],
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn spsolve_parts(
    g: SparseCols<'_>,
    n: usize,
    bi: &[usize],
    bx: &[f64],
    x: &mut [f64],
    pinv: Option<&[Option<usize>]>,
    lower: bool,
    work: &mut ReachWork,
) -> usize {
    let SparseCols { p: gp, i: gi, x: gx } = g;
    let top = reach_parts(gp, gi, n, bi, pinv, work); // xi[top..n]=Reach(B(:,k))
    for &j in work.pattern(top) {
        x[j] = 0.0; // clear x
    }
    for (&i, &v) in bi.iter().zip(bx) {
        x[i] = v; // scatter B
    }
    for px in top..n {
        let j = work.xi[px]; // x(j) is nonzero
        let jj = match pinv {
            Some(pinv) => pinv[j], // j maps to col J of G
            None => Some(j),
        };
        let Some(jj) = jj else {
            continue; // column J is empty
        };
        x[j] /= gx[if lower { gp[jj] } else { gp[jj + 1] - 1 }]; // x(j) /= G(j,j)
        let (start, end) = if lower {
            (gp[jj] + 1, gp[jj + 1])
        } else {
            (gp[jj], gp[jj + 1] - 1)
        };
        for p in start..end {
            x[gi[p]] -= gx[p] * x[j]; // x(i) -= G(i,j) * x(j)
        }
    }
    top
}

//! Elimination trees, postordering and column counts.
//!
//! Every tree walk here is iterative: a single long chain is the worst case
//! for depth and must not exhaust the call stack.

use crate::csc::CscMatrix;
use crate::internal::{Int, EMPTY};

/// Elimination tree of A (using only the upper triangular part, for
/// Cholesky) or of A'A (`ata`, for QR).
pub fn etree(a: &CscMatrix, ata: bool) -> Vec<Option<usize>> {
    let (m, n) = (a.nrows(), a.ncols());
    let ap = a.col_ptrs();
    let ai = a.row_indices();
    let mut parent = vec![None; n];
    let mut ancestor: Vec<Option<usize>> = vec![None; n];
    let mut prev: Vec<Option<usize>> = if ata { vec![None; m] } else { Vec::new() };
    for k in 0..n {
        for p in ap[k]..ap[k + 1] {
            let mut i = if ata { prev[ai[p]] } else { Some(ai[p]) };
            // traverse from i to k
            while let Some(node) = i.filter(|&node| node < k) {
                let inext = ancestor[node]; // inext = ancestor of node
                ancestor[node] = Some(k); // path compression
                if inext.is_none() {
                    parent[node] = Some(k); // no anc., parent is k
                }
                i = inext;
            }
            if ata {
                prev[ai[p]] = Some(k);
            }
        }
    }
    parent
}

/// Depth-first search and postorder of the tree rooted at `j`, numbering
/// from `k`. `head`/`next` hold the child lists and are consumed.
pub(crate) fn tdfs(
    j: usize,
    mut k: usize,
    head: &mut [Option<usize>],
    next: &[Option<usize>],
    post: &mut [usize],
    stack: &mut Vec<usize>,
) -> usize {
    stack.clear();
    stack.push(j); // place j on the stack
    while let Some(&p) = stack.last() {
        match head[p] {
            None => {
                stack.pop(); // p has no unordered children left
                post[k] = p; // node p is the kth postordered node
                k += 1;
            }
            Some(i) => {
                head[p] = next[i]; // remove i from children of p
                stack.push(i); // start dfs on child node i
            }
        }
    }
    k
}

/// Postorders a forest.
pub fn post(parent: &[Option<usize>]) -> Vec<usize> {
    let n = parent.len();
    let mut post = vec![0; n];
    let mut head = vec![None; n];
    let mut next = vec![None; n];
    let mut stack = Vec::with_capacity(n);
    for j in (0..n).rev() {
        // traverse nodes in reverse order
        if let Some(pj) = parent[j] {
            next[j] = head[pj]; // add j to list of its parent
            head[pj] = Some(j);
        }
    }
    let mut k = 0;
    for j in 0..n {
        if parent[j].is_none() {
            k = tdfs(j, k, &mut head, &next, &mut post, &mut stack);
        }
    }
    post
}

/// Outcome of [`leaf`]: whether `j` is a leaf of the `i`th row subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leaf {
    /// Not a leaf.
    No,
    /// First leaf; carries the root of the row subtree.
    First(usize),
    /// Subsequent leaf; carries the least common ancestor with the previous leaf.
    Subsequent(usize),
}

// Skeleton test with path-compressed least common ancestors.
fn leaf(
    i: usize,
    j: usize,
    first: &[Int],
    maxfirst: &mut [Int],
    prevleaf: &mut [Int],
    ancestor: &mut [usize],
) -> Leaf {
    if i <= j || first[j] <= maxfirst[i] {
        return Leaf::No; // j not a leaf
    }
    maxfirst[i] = first[j]; // update max first[j] seen so far
    let jprev = prevleaf[i]; // jprev = previous leaf of ith subtree
    prevleaf[i] = j as Int;
    if jprev == EMPTY {
        return Leaf::First(i); // q = root of ith subtree
    }
    let jprev = jprev as usize;
    let mut q = jprev;
    while q != ancestor[q] {
        q = ancestor[q];
    }
    let mut s = jprev;
    while s != q {
        let sparent = ancestor[s]; // path compression
        ancestor[s] = q;
        s = sparent;
    }
    Leaf::Subsequent(q) // q = least common ancestor (jprev,j)
}

/// Column counts of the Cholesky factor of A (upper triangular part used) or
/// of A'A (`ata`), without forming the factor.
pub fn counts(a: &CscMatrix, parent: &[Option<usize>], post: &[usize], ata: bool) -> Vec<usize> {
    let (m, n) = (a.nrows(), a.ncols());
    let at = a.transpose(false);
    let atp = at.col_ptrs();
    let ati = at.row_indices();
    let mut delta: Vec<isize> = vec![0; n];
    let mut ancestor: Vec<usize> = (0..n).collect(); // each node in its own set
    let mut maxfirst: Vec<Int> = vec![EMPTY; n];
    let mut prevleaf: Vec<Int> = vec![EMPTY; n];
    let mut first: Vec<Int> = vec![EMPTY; n];
    for k in 0..n {
        // find first [j]
        let mut j = post[k];
        delta[j] = if first[j] == EMPTY { 1 } else { 0 }; // delta[j]=1 if j is a leaf
        loop {
            if first[j] != EMPTY {
                break;
            }
            first[j] = k as Int;
            match parent[j] {
                Some(pj) => j = pj,
                None => break,
            }
        }
    }

    // For A'A, row i of A joins the list of the first postordered column it touches.
    let mut head: Vec<Option<usize>> = Vec::new();
    let mut next: Vec<Option<usize>> = Vec::new();
    if ata {
        head = vec![None; n + 1];
        next = vec![None; m];
        let mut w = vec![0; n];
        for (k, &pk) in post.iter().enumerate() {
            w[pk] = k; // invert post
        }
        for i in 0..m {
            let k = ati[atp[i]..atp[i + 1]].iter().map(|&j| w[j]).fold(n, usize::min);
            next[i] = head[k]; // place row i in linked list k
            head[k] = Some(i);
        }
    }

    for k in 0..n {
        let j = post[k]; // j is the kth node in postordered etree
        if let Some(pj) = parent[j] {
            delta[pj] -= 1; // j is not a root
        }
        let mut row = if ata { head[k] } else { Some(j) };
        while let Some(jj) = row {
            for p in atp[jj]..atp[jj + 1] {
                let i = ati[p];
                match leaf(i, j, &first, &mut maxfirst, &mut prevleaf, &mut ancestor) {
                    Leaf::No => {}
                    Leaf::First(_) => delta[j] += 1, // A(i,j) is in skeleton
                    Leaf::Subsequent(q) => {
                        delta[j] += 1;
                        delta[q] -= 1; // account for overlap in q
                    }
                }
            }
            row = if ata { next[jj] } else { None };
        }
        if let Some(pj) = parent[j] {
            ancestor[j] = pj;
        }
    }
    // sum up delta's of each child
    for j in 0..n {
        if let Some(pj) = parent[j] {
            delta[pj] += delta[j];
        }
    }
    delta.into_iter().map(|d| d as usize).collect()
}

/// Nonzero pattern of row `k` of the Cholesky factor L, found by walking the
/// elimination tree from each entry of the upper triangular part of A(:,k).
/// The pattern is written to `s[top..n]` in topological order and `top` is
/// returned. `marked` must be all false on entry and is all false on return.
pub fn ereach(
    a: &CscMatrix,
    k: usize,
    parent: &[Option<usize>],
    s: &mut [usize],
    marked: &mut [bool],
) -> usize {
    let n = a.ncols();
    let ap = a.col_ptrs();
    let ai = a.row_indices();
    let mut top = n;
    marked[k] = true; // mark node k as visited
    for p in ap[k]..ap[k + 1] {
        let mut i = ai[p]; // A(i,k) is nonzero
        if i > k {
            continue; // only use upper triangular part of A
        }
        let mut len = 0;
        while !marked[i] {
            s[len] = i; // L(k,i) is nonzero
            len += 1;
            marked[i] = true; // mark i as visited
            match parent[i] {
                Some(pi) => i = pi,
                None => break,
            }
        }
        while len > 0 {
            // push path onto stack
            top -= 1;
            len -= 1;
            s[top] = s[len];
        }
    }
    for &i in &s[top..n] {
        marked[i] = false; // unmark all nodes
    }
    marked[k] = false; // unmark node k
    top
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triplet::Triplet;

    fn pattern(n: usize, entries: &[(usize, usize)]) -> CscMatrix {
        let mut t = Triplet::new(n, n);
        for &(i, j) in entries {
            t.push(i, j, 1.0).unwrap();
        }
        t.compress()
    }

    #[test]
    fn arrow_matrix_tree_is_a_star() {
        // upper triangle of an arrow matrix: last column is dense
        let n = 5;
        let mut entries: Vec<_> = (0..n).map(|j| (j, j)).collect();
        entries.extend((0..n - 1).map(|i| (i, n - 1)));
        let a = pattern(n, &entries);
        let parent = etree(&a, false);
        assert_eq!(parent, vec![Some(4), Some(4), Some(4), Some(4), None]);
        let post = post(&parent);
        assert_eq!(post, vec![0, 1, 2, 3, 4]);
        assert_eq!(counts(&a, &parent, &post, false), vec![2, 2, 2, 2, 1]);
    }

    #[test]
    fn tridiagonal_tree_is_a_chain() {
        let n = 2000;
        let mut entries: Vec<_> = (0..n).map(|j| (j, j)).collect();
        entries.extend((1..n).map(|j| (j - 1, j)));
        let a = pattern(n, &entries);
        let parent = etree(&a, false);
        for j in 0..n - 1 {
            assert_eq!(parent[j], Some(j + 1));
        }
        assert_eq!(parent[n - 1], None);
        let post = post(&parent);
        assert!(post.iter().enumerate().all(|(k, &j)| k == j));
        let c = counts(&a, &parent, &post, false);
        assert_eq!(c.iter().sum::<usize>(), 2 * n - 1);
    }

    #[test]
    fn column_etree_of_ata() {
        // A = [x . x; . x x]: A'A couples columns 0-2 and 1-2
        let a = pattern(3, &[(0, 0), (1, 1), (0, 2), (1, 2)]);
        let parent = etree(&a, true);
        assert_eq!(parent, vec![Some(2), Some(2), None]);
        let post = post(&parent);
        let c = counts(&a, &parent, &post, true);
        assert_eq!(c, vec![2, 2, 1]);
    }

    #[test]
    fn ereach_finds_row_pattern() {
        // upper triangle with fill: entries (0,2) and (1,2); (0,1) absent
        let a = pattern(3, &[(0, 0), (1, 1), (2, 2), (0, 2), (1, 2)]);
        let parent = etree(&a, false);
        let mut s = vec![0; 3];
        let mut marked = vec![false; 3];
        let top = ereach(&a, 2, &parent, &mut s, &mut marked);
        let mut row: Vec<_> = s[top..].to_vec();
        row.sort();
        assert_eq!(row, vec![0, 1]);
        assert!(marked.iter().all(|&m| !m));
    }
}

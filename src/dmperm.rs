//! Maximum matching, strongly connected components and the
//! Dulmage-Mendelsohn decomposition.

use crate::csc::CscMatrix;
use crate::error::{Error, Result};
use crate::internal::{Int, EMPTY};
use crate::perm::{randperm, ColumnOrder};
use crate::reach::dfs;

/// A maximum matching of the rows and columns of a matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matching {
    /// `jmatch[i]` is the column matched to row `i`.
    pub jmatch: Vec<Option<usize>>,
    /// `imatch[j]` is the row matched to column `j`.
    pub imatch: Vec<Option<usize>>,
}

impl Matching {
    /// Number of matched pairs, the structural rank.
    pub fn size(&self) -> usize {
        self.imatch.iter().filter(|m| m.is_some()).count()
    }
}

/// Strongly connected components of a square matrix's graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scc {
    /// Node permutation; block `b` is `p[r[b]..r[b+1]]`.
    pub p: Vec<usize>,
    /// Block boundaries, `nb + 1` entries.
    pub r: Vec<usize>,
}

impl Scc {
    /// Number of components.
    pub fn nb(&self) -> usize {
        self.r.len() - 1
    }
}

/// Dulmage-Mendelsohn decomposition.
///
/// `A(p,q)` is block upper triangular with `nb` blocks; block `b` covers
/// rows `p[r[b]..r[b+1]]` and columns `q[s[b]..s[b+1]]`. The coarse
/// decomposition is given by `rr` and `cc`: rows `rr[0..1]` and columns
/// `cc[0..2]` form the underdetermined part, rows `rr[1..2]` and columns
/// `cc[2..3]` the square part with a perfect matching, and rows `rr[2..4]`
/// and columns `cc[3..4]` the overdetermined part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dmperm {
    pub p: Vec<usize>,
    pub q: Vec<usize>,
    pub r: Vec<usize>,
    pub s: Vec<usize>,
    pub nb: usize,
    pub rr: [usize; 5],
    pub cc: [usize; 5],
}

impl Dmperm {
    /// Size of a maximum matching.
    pub fn structural_rank(&self) -> usize {
        self.rr[3]
    }

    /// Number of 1-by-1 blocks.
    pub fn singletons(&self) -> usize {
        (0..self.nb)
            .filter(|&b| self.r[b + 1] - self.r[b] == 1 && self.s[b + 1] - self.s[b] == 1)
            .count()
    }
}

// Finds an augmenting path starting at column k and extends the matching if
// one is found.
#[allow(clippy::too_many_arguments)]
fn augment(
    k: usize,
    a: &CscMatrix,
    jmatch: &mut [Option<usize>],
    cheap: &mut [usize],
    w: &mut [Option<usize>],
    js: &mut [usize],
    is: &mut [usize],
    ps: &mut [usize],
) -> bool {
    let ap = a.col_ptrs();
    let ai = a.row_indices();
    let mut found = false;
    let mut head: isize = 0;
    js[0] = k; // start with just node k in jstack
    while head >= 0 {
        // Start (or continue) depth-first-search at node j.
        let h = head as usize;
        let j = js[h]; // get j from top of jstack
        if w[j] != Some(k) {
            // 1st time j visited for kth path
            w[j] = Some(k); // mark j as visited for kth path
            let mut p = cheap[j];
            while p < ap[j + 1] {
                let i = ai[p];
                p += 1;
                if jmatch[i].is_none() {
                    // try a cheap assignment (i,j)
                    is[h] = i;
                    found = true;
                    break;
                }
            }
            cheap[j] = p; // start here next time j is traversed
            if found {
                break; // column j matched with row i
            }
            ps[h] = ap[j]; // no cheap match: start dfs for j
        }

        // Depth-first-search of neighbors of j.
        let mut advanced = false;
        for p in ps[h]..ap[j + 1] {
            let i = ai[p]; // consider row i
            let Some(j2) = jmatch[i] else {
                continue;
            };
            if w[j2] == Some(k) {
                continue; // skip jmatch[i] if marked
            }
            ps[h] = p + 1; // pause dfs of node j
            is[h] = i; // i will be matched with j if found
            js[h + 1] = j2; // start dfs at column jmatch[i]
            head += 1;
            advanced = true;
            break;
        }
        if !advanced {
            head -= 1; // node j is done; pop from stack
        }
    }
    if found {
        // augment the match
        for p in (0..=head as usize).rev() {
            jmatch[is[p]] = Some(js[p]);
        }
    }
    found
}

/// Maximum transversal: a maximum matching of rows to columns, found with
/// depth-first augmenting paths and a cheap assignment pass. `order` sets
/// the order in which columns are visited.
pub fn maxtrans(a: &CscMatrix, order: ColumnOrder) -> Matching {
    let (m, n) = (a.nrows(), a.ncols());
    let ap = a.col_ptrs();
    let ai = a.row_indices();
    let mut n2 = 0; // count nonempty rows and columns
    let mut row_seen = vec![false; m];
    let mut k = 0;
    for j in 0..n {
        if ap[j] < ap[j + 1] {
            n2 += 1;
        }
        let mut diag = false;
        for p in ap[j]..ap[j + 1] {
            row_seen[ai[p]] = true;
            diag |= ai[p] == j;
        }
        if diag {
            k += 1; // count entries already on diagonal
        }
    }
    if k == m.min(n) {
        // quick return if diagonal zero-free
        let jmatch = (0..m).map(|i| (i < k).then_some(i)).collect();
        let imatch = (0..n).map(|j| (j < k).then_some(j)).collect();
        return Matching { jmatch, imatch };
    }
    let m2 = row_seen.iter().filter(|&&seen| seen).count();

    // Match on whichever of A or A' has fewer nonempty columns in its rows.
    let transposed = m2 < n2;
    let at;
    let c = if transposed {
        at = a.transpose(false);
        &at
    } else {
        a
    };
    let (cm, cn) = (c.nrows(), c.ncols());
    let mut jmatch: Vec<Option<usize>> = vec![None; cm];
    let mut cheap: Vec<usize> = c.col_ptrs()[..cn].to_vec();
    let mut w: Vec<Option<usize>> = vec![None; cn];
    let mut js = vec![0; cn];
    let mut is = vec![0; cn];
    let mut ps = vec![0; cn];
    let q = randperm(cn, order);
    let mut failed = 0;
    for k in 0..cn {
        let col = q.as_ref().map_or(k, |q| q[k]);
        if !augment(col, c, &mut jmatch, &mut cheap, &mut w, &mut js, &mut is, &mut ps) {
            failed += 1;
        }
    }
    log::trace!("maxtrans: {} columns left unmatched", failed);
    let mut imatch: Vec<Option<usize>> = vec![None; cn];
    for (i, jm) in jmatch.iter().enumerate() {
        if let Some(j) = *jm {
            imatch[j] = Some(i);
        }
    }
    if transposed {
        Matching {
            jmatch: imatch,
            imatch: jmatch,
        }
    } else {
        Matching { jmatch, imatch }
    }
}

/// Strongly connected components of the graph of a square matrix, where
/// `A(i,j) != 0` is an edge from `j` to `i`. Each block's nodes are listed
/// in increasing order.
pub fn scc(a: &CscMatrix) -> Result<Scc> {
    if a.nrows() != a.ncols() {
        return Err(Error::NotSquare {
            m: a.nrows(),
            n: a.ncols(),
        });
    }
    Ok(scc_square(a))
}

fn scc_square(a: &CscMatrix) -> Scc {
    let n = a.ncols();
    let at = a.transpose(false);
    let mut xi = vec![0; n];
    let mut pstack = vec![0; n];
    let mut stack = Vec::with_capacity(n);
    let mut marked = vec![false; n];
    let mut top = n;
    for i in 0..n {
        // first dfs(A) to find finish times (xi)
        if !marked[i] {
            top = dfs(
                i,
                a.col_ptrs(),
                a.row_indices(),
                top,
                &mut xi,
                &mut stack,
                &mut pstack,
                &mut marked,
                None,
            );
        }
    }
    let mut marked_t = vec![false; n];
    let mut p = vec![0; n];
    let mut r = vec![0; n + 1];
    top = n;
    let mut nb = n;
    for k in 0..n {
        // dfs(A') to find strongly connected comp
        let i = xi[k]; // get i in reverse order of finish times
        if marked_t[i] {
            continue; // skip node i if already ordered
        }
        r[nb] = top; // node i is the start of a component in p
        nb -= 1;
        top = dfs(
            i,
            at.col_ptrs(),
            at.row_indices(),
            top,
            &mut p,
            &mut stack,
            &mut pstack,
            &mut marked_t,
            None,
        );
    }
    r[nb] = 0; // first block starts at zero; shift r up
    r.drain(..nb);
    let nb = n - nb; // nb = # of strongly connected components

    // sort each block in natural order
    let mut blk = vec![0; n];
    for b in 0..nb {
        for &i in &p[r[b]..r[b + 1]] {
            blk[i] = b;
        }
    }
    let mut rcopy = r.clone();
    for i in 0..n {
        p[rcopy[blk[i]]] = i;
        rcopy[blk[i]] += 1;
    }
    log::debug!("scc: {} components in a graph of {} nodes", nb, n);
    Scc { p, r }
}

// Breadth-first search for the coarse decomposition (C0,C1,R1 or R3,C3,R3).
#[allow(clippy::too_many_arguments)]
fn bfs(
    a: &CscMatrix,
    n: usize,
    wi: &mut [Int],
    wj: &mut [Int],
    queue: &mut Vec<usize>,
    imatch: &[Option<usize>],
    jmatch: &[Option<usize>],
    mark: Int,
) {
    queue.clear();
    for j in 0..n {
        // place all unmatched nodes in queue
        if imatch[j].is_some() {
            continue; // skip j if matched
        }
        wj[j] = 0; // j in set C0 (R0 if transpose)
        queue.push(j); // place unmatched col j in queue
    }
    if queue.is_empty() {
        return; // quick return if no unmatched nodes
    }
    let at;
    let c = if mark == 1 {
        a
    } else {
        at = a.transpose(false);
        &at
    };
    let cp = c.col_ptrs();
    let ci = c.row_indices();
    let mut head = 0;
    while head < queue.len() {
        // while queue is not empty
        let j = queue[head]; // get the head of the queue
        head += 1;
        for p in cp[j]..cp[j + 1] {
            let i = ci[p];
            if wi[i] >= 0 {
                continue; // skip if i is marked
            }
            wi[i] = mark; // i in set R1 (C3 if transpose)
            let Some(j2) = jmatch[i] else {
                continue;
            };
            if wj[j2] >= 0 {
                continue; // skip if j2 is marked
            }
            wj[j2] = mark; // j2 in set C1 (R3 if transpose)
            queue.push(j2); // add j2 to queue
        }
    }
}

// Collects matched rows and columns into p and q.
#[allow(clippy::too_many_arguments)]
fn matched(
    n: usize,
    wj: &[Int],
    imatch: &[Option<usize>],
    p: &mut [usize],
    q: &mut [usize],
    cc: &mut [usize; 5],
    rr: &mut [usize; 5],
    set: usize,
    mark: Int,
) {
    let mut kc = cc[set];
    let mut kr = rr[set - 1];
    for j in 0..n {
        if wj[j] != mark {
            continue; // skip if j is not in C set
        }
        if let Some(i) = imatch[j] {
            p[kr] = i;
            kr += 1;
        }
        q[kc] = j;
        kc += 1;
    }
    cc[set + 1] = kc;
    rr[set] = kr;
}

// Collects unmatched rows into the permutation vector p.
fn unmatched(m: usize, wi: &[Int], p: &mut [usize], rr: &mut [usize; 5], set: usize) {
    let mut kr = rr[set];
    for i in 0..m {
        if wi[i] == 0 {
            p[kr] = i;
            kr += 1;
        }
    }
    rr[set + 1] = kr;
}

/// Dulmage-Mendelsohn decomposition of A. The matching visits columns in
/// the given `order`; the structural rank and the coarse decomposition do
/// not depend on it.
pub fn dmperm(a: &CscMatrix, order: ColumnOrder) -> Dmperm {
    let (m, n) = (a.nrows(), a.ncols());
    let Matching { jmatch, imatch } = maxtrans(a, order);

    // Coarse decomposition.

    let mut p = vec![0; m];
    let mut q = vec![0; n];
    let mut rr = [0; 5];
    let mut cc = [0; 5];
    let mut wi: Vec<Int> = vec![EMPTY; m];
    let mut wj: Vec<Int> = vec![EMPTY; n];
    let mut queue = Vec::with_capacity(m.max(n));
    bfs(a, n, &mut wi, &mut wj, &mut queue, &imatch, &jmatch, 1); // find C1, R1 from C0
    bfs(a, m, &mut wj, &mut wi, &mut queue, &jmatch, &imatch, 3); // find R3, C3 from R0
    unmatched(n, &wj, &mut q, &mut cc, 0); // unmatched set C0
    matched(n, &wj, &imatch, &mut p, &mut q, &mut cc, &mut rr, 1, 1); // set R1 and C1
    matched(n, &wj, &imatch, &mut p, &mut q, &mut cc, &mut rr, 2, EMPTY); // set R2 and C2
    matched(n, &wj, &imatch, &mut p, &mut q, &mut cc, &mut rr, 3, 3); // set R3 and C3
    unmatched(m, &wi, &mut p, &mut rr, 3); // unmatched set R0

    // Fine decomposition.

    // C = A(p,q) restricted to the square, perfectly matched block
    let pinv = crate::perm::pinv(&p);
    let nc = cc[3] - cc[2];
    let ap = a.col_ptrs();
    let ai = a.row_indices();
    let mut sp = Vec::with_capacity(nc + 1);
    let mut si = Vec::new();
    for k in cc[2]..cc[3] {
        sp.push(si.len());
        let j = q[k];
        for t in ap[j]..ap[j + 1] {
            let i = pinv[ai[t]];
            if i >= rr[1] && i < rr[2] {
                si.push(i - rr[1]); // keep rows of the square block only
            }
        }
    }
    sp.push(si.len());
    let c = CscMatrix::new(nc, nc, sp, si, None);
    let Scc { p: ps, r: rs } = scc_square(&c);

    // Combine coarse and fine decompositions.

    let qblock: Vec<usize> = ps.iter().map(|&k| q[k + cc[2]]).collect();
    q[cc[2]..cc[3]].copy_from_slice(&qblock);
    let pblock: Vec<usize> = ps.iter().map(|&k| p[k + rr[1]]).collect();
    p[rr[1]..rr[2]].copy_from_slice(&pblock);
    let mut r = Vec::with_capacity(rs.len() + 3);
    let mut s = Vec::with_capacity(rs.len() + 3);
    if cc[2] > 0 {
        r.push(0); // leading coarse block A(R1,[C0 C1])
        s.push(0);
    }
    for &b in &rs[..rs.len() - 1] {
        // one block per strongly connected component
        r.push(b + rr[1]);
        s.push(b + cc[2]);
    }
    if rr[2] < m {
        r.push(rr[2]); // trailing coarse block A([R2 R3],C3)
        s.push(cc[3]);
    }
    r.push(m);
    s.push(n);
    let nb = r.len() - 1;

    let d = Dmperm {
        p,
        q,
        r,
        s,
        nb,
        rr,
        cc,
    };
    log::debug!(
        "dmperm: {}-by-{}, structural rank {}, {} blocks, {} singletons",
        m,
        n,
        d.structural_rank(),
        d.nb,
        d.singletons()
    );
    d
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
    fn matching_needs_augmenting_paths() {
        // no diagonal: rows must be matched to off-diagonal columns
        let a = pattern(3, 3, &[(1, 0), (2, 0), (0, 1), (2, 1), (1, 2)]);
        for order in [
            ColumnOrder::Natural,
            ColumnOrder::Reverse,
            ColumnOrder::Shuffled { seed: 11 },
        ] {
            let m = maxtrans(&a, order);
            assert_eq!(m.size(), 3);
            for (j, i) in m.imatch.iter().enumerate() {
                let i = i.unwrap();
                assert_eq!(m.jmatch[i], Some(j));
                assert!(a.col(j).contains(&i));
            }
        }
    }

    #[test]
    fn scc_of_a_cycle_and_a_tail() {
        // 0 -> 1 -> 2 -> 0 form a cycle, 3 hangs off 2
        let a = pattern(4, 4, &[(0, 0), (1, 0), (1, 1), (2, 1), (2, 2), (0, 2), (3, 2), (3, 3)]);
        let c = scc(&a).unwrap();
        assert_eq!(c.nb(), 2);
        assert!(is_perm(&c.p, 4));
        let mut sizes: Vec<usize> = c.r.windows(2).map(|w| w[1] - w[0]).collect();
        sizes.sort();
        assert_eq!(sizes, vec![1, 3]);
        assert!(scc(&pattern(2, 3, &[(0, 0)])).is_err());
    }

    #[test]
    fn irreducible_matrix_is_one_block() {
        let n = 6;
        let mut entries: Vec<_> = (0..n).map(|j| (j, j)).collect();
        entries.extend((0..n).map(|j| ((j + 1) % n, j)));
        let d = dmperm(&pattern(n, n, &entries), ColumnOrder::Natural);
        assert_eq!(d.nb, 1);
        assert_eq!(d.singletons(), 0);
        assert_eq!(d.structural_rank(), n);
    }

    #[test]
    fn triangular_matrix_is_all_singletons() {
        let n = 5;
        let mut entries: Vec<_> = (0..n).map(|j| (j, j)).collect();
        entries.extend((1..n).map(|j| (j, j - 1)));
        let d = dmperm(&pattern(n, n, &entries), ColumnOrder::Reverse);
        assert_eq!(d.nb, n);
        assert_eq!(d.singletons(), n);
        assert!(is_perm(&d.p, n) && is_perm(&d.q, n));
    }

    #[test]
    fn rank_deficient_pattern() {
        // rows 0 and 1 only touch column 0
        let a = pattern(3, 3, &[(0, 0), (1, 0), (2, 1), (2, 2)]);
        let d = dmperm(&a, ColumnOrder::Natural);
        assert_eq!(d.structural_rank(), 2);
        assert_eq!(maxtrans(&a, ColumnOrder::Natural).size(), 2);
        assert!(is_perm(&d.p, 3) && is_perm(&d.q, 3));
        assert_eq!(*d.r.last().unwrap(), 3);
        assert_eq!(*d.s.last().unwrap(), 3);
        assert_eq!(d.r.len(), d.nb + 1);
    }

    #[test]
    fn rectangular_pattern() {
        let a = pattern(4, 2, &[(0, 0), (1, 0), (2, 1), (3, 1)]);
        let d = dmperm(&a, ColumnOrder::Shuffled { seed: 3 });
        assert_eq!(d.structural_rank(), 2);
        assert!(is_perm(&d.p, 4) && is_perm(&d.q, 2));
    }
}

use crate::algebra::{add, multiply};
use crate::codes::*;
use crate::csc::CscMatrix;
use crate::error::{Error, Result};
use crate::etree::tdfs;
use crate::internal::{assert_debug, dense_degree, flip, Int, EMPTY};
use crate::stats::*;

/// Fill-reducing ordering policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// No permutation.
    #[default]
    Natural,
    /// Minimum degree on the pattern of A+A', for Cholesky and for LU of
    /// matrices with a mostly symmetric pattern.
    Symmetric,
    /// Minimum degree on S'S, where S is A with its dense rows removed. For LU.
    SparseNormal,
    /// Minimum degree on A'A. For QR.
    Normal,
}

impl Order {
    /// Maps the numeric codes 0 to 3 onto the policies, in declaration order.
    pub fn from_code(code: i32) -> Option<Order> {
        match code {
            0 => Some(Order::Natural),
            1 => Some(Order::Symmetric),
            2 => Some(Order::SparseNormal),
            3 => Some(Order::Normal),
            _ => None,
        }
    }
}

/// Approximate minimum degree ordering with default knobs. Returns `None`
/// for `Order::Natural`; otherwise a permutation `p` of the columns of A
/// such that `p[k]` is the column eliminated `k`th.
pub fn amd(order: Order, a: &CscMatrix) -> Result<Option<Vec<usize>>> {
    let mut stats = empty_stats();
    amd_with(order, a, None, &mut stats)
}

/// Approximate minimum degree ordering.
///
/// Orders the graph selected by `order`. Dense nodes (more than
/// `max(16, knobs[DENSE] * sqrt(n))` neighbours) are removed before the
/// ordering starts and placed last. With `knobs[AGGRESSIVE]` nonzero,
/// elements whose external degree drops to zero are absorbed as soon as
/// this is detected.
///
/// `stats` receives the number of dense nodes, the number of garbage
/// collections, a status code, the graph order and size, and the largest
/// element degree. See [`amd_report`](crate::amd_report).
///
/// The result is deterministic for a given input and knob setting.
pub fn amd_with(
    order: Order,
    a: &CscMatrix,
    knobs: Option<[f64; KNOBS]>,
    stats: &mut [Int; STATS],
) -> Result<Option<Vec<usize>>> {
    stats.fill(0);
    stats[STATUS] = OK;
    if order == Order::Natural {
        return Ok(None);
    }

    // If no knobs, set default knobs.
    let knobs = knobs.unwrap_or_else(default_knobs);
    let aggressive = knobs[AGGRESSIVE] != 0.0;

    // Construct matrix C.

    let (m, n) = (a.nrows(), a.ncols());
    let ni = n as Int;
    let dense = dense_degree(knobs[DENSE], n).min(ni - 2);
    let mut at = a.transpose(false);
    let mut c = match order {
        Order::Symmetric if m == n => add(a, &at, 0.0, 0.0)?,
        Order::SparseNormal => {
            // drop dense rows of A, which are the dense columns of A'
            let counts: Vec<usize> = (0..m).map(|j| at.col(j).len()).collect();
            at.fkeep(|_, j, _| counts[j] as Int <= dense);
            let a2 = at.transpose(false);
            multiply(&at, &a2)?
        }
        _ => {
            if order == Order::Symmetric {
                stats[STATUS] = OK_BUT_RECTANGULAR;
            }
            multiply(&at, a)?
        }
    };
    drop(at);
    c.fkeep(|i, j, _| i != j); // drop diagonal entries
    let (_, _, cp, ci, _) = c.into_parts();
    let cnz0 = cp[n];

    // Elbow room for the elements built during elimination.
    let nzmax = cnz0 + cnz0 / 5 + 2 * n;
    let mut ci: Vec<Int> = {
        let mut v: Vec<Int> = Vec::new();
        if v.try_reserve_exact(nzmax).is_err() {
            stats[STATUS] = ERROR_OUT_OF_MEMORY;
            return Err(Error::OutOfMemory { capacity: nzmax });
        }
        v.extend(ci.iter().map(|&i| i as Int));
        v.resize(nzmax, 0);
        v
    };
    let mut cp: Vec<Int> = cp.iter().map(|&p| p as Int).collect();

    let mut len: Vec<Int> = vec![0; n + 1];
    let mut nv: Vec<Int> = vec![1; n + 1];
    let mut next: Vec<Int> = vec![EMPTY; n + 1];
    let mut head: Vec<Int> = vec![EMPTY; n + 1];
    let mut elen: Vec<Int> = vec![0; n + 1];
    let mut degree: Vec<Int> = vec![0; n + 1];
    let mut w: Vec<Int> = vec![1; n + 1];
    let mut hhead: Vec<Int> = vec![EMPTY; n + 1];
    let mut last: Vec<Int> = vec![EMPTY; n + 1];

    // Initialize quotient graph.

    for k in 0..n {
        len[k] = cp[k + 1] - cp[k];
        degree[k] = len[k];
    }
    let mut cnz = cnz0;
    let mut lemax: Int = 0;
    let mut mark = wclear(0, 0, &mut w, n);
    elen[n] = -2;
    cp[n] = EMPTY;
    w[n] = 0;
    let mut nel: Int = 0;
    let mut ngarbage: Int = 0;
    let mut mindeg: usize = 0;

    // Initialize degree lists.

    for i in 0..n {
        let d = degree[i];
        if d == 0 {
            // node i is empty
            elen[i] = -2;
            nel += 1;
            cp[i] = EMPTY;
            w[i] = 0;
        } else if d > dense {
            // node i is dense
            nv[i] = 0; // absorb i into element n
            elen[i] = EMPTY; // node i is dead
            nel += 1;
            cp[i] = flip(ni);
            nv[n] += 1;
        } else {
            let d = d as usize;
            if head[d] != EMPTY {
                last[head[d] as usize] = i as Int;
            }
            next[i] = head[d]; // put node i in degree list d
            head[d] = i as Int;
        }
    }
    log::trace!("amd: {} dense and {} empty nodes", nv[n] - 1, nel - (nv[n] - 1));

    while nel < ni {
        // Select node of minimum approximate degree.

        let Some(d) = (mindeg..n).find(|&d| head[d] != EMPTY) else {
            break;
        };
        mindeg = d;
        let k = head[mindeg] as usize;
        if next[k] != EMPTY {
            last[next[k] as usize] = EMPTY;
        }
        head[mindeg] = next[k]; // remove k from degree list
        let elenk = elen[k]; // elenk = |Ek|
        let mut nvk = nv[k]; // # of nodes k represents
        nel += nvk; // nv[k] nodes of A eliminated

        // Garbage collection.

        if elenk > 0 && cnz + mindeg >= nzmax {
            for j in 0..n {
                let p = cp[j];
                if p >= 0 {
                    // j is a live node or element
                    cp[j] = ci[p as usize]; // save first entry of object
                    ci[p as usize] = flip(j as Int); // first entry is now flip(j)
                }
            }
            let mut q = 0;
            let mut p = 0;
            while p < cnz {
                // scan all of memory
                let j = flip(ci[p]);
                p += 1;
                if j >= 0 {
                    // found object j
                    let j = j as usize;
                    ci[q] = cp[j]; // restore first entry of object
                    cp[j] = q as Int; // new pointer to object j
                    q += 1;
                    for _ in 0..len[j] - 1 {
                        ci[q] = ci[p];
                        q += 1;
                        p += 1;
                    }
                }
            }
            cnz = q; // ci[cnz..nzmax] now free
            ngarbage += 1;
            log::trace!("amd: garbage collection {} compacted to {} entries", ngarbage, cnz);
        }

        // Construct new element.

        let mut dk: Int = 0;
        nv[k] = -nvk; // flag k as in Lk
        let mut p = cp[k] as usize;
        let pk1 = if elenk == 0 { p } else { cnz }; // do in place if elen[k] == 0
        let mut pk2 = pk1;
        for k1 in 1..=elenk + 1 {
            let (e, mut pj, ln) = if k1 > elenk {
                (k, p, len[k] - elenk) // search the nodes in k
            } else {
                let e = ci[p] as usize; // search the nodes in e
                p += 1;
                (e, cp[e] as usize, len[e])
            };
            for _ in 1..=ln {
                let i = ci[pj] as usize;
                pj += 1;
                let nvi = nv[i];
                if nvi <= 0 {
                    continue; // node i dead, or seen
                }
                dk += nvi; // degree[Lk] += size of node i
                nv[i] = -nvi; // negate nv[i] to denote i in Lk
                ci[pk2] = i as Int; // place i in Lk
                pk2 += 1;
                if next[i] != EMPTY {
                    last[next[i] as usize] = last[i];
                }
                if last[i] != EMPTY {
                    // remove i from degree list
                    next[last[i] as usize] = next[i];
                } else {
                    head[degree[i] as usize] = next[i];
                }
            }
            if e != k {
                cp[e] = flip(k as Int); // absorb e into k
                w[e] = 0; // e is now a dead element
            }
        }
        if elenk != 0 {
            cnz = pk2; // ci[cnz..nzmax] is free
        }
        degree[k] = dk; // external degree of k - |Lk\i|
        cp[k] = pk1 as Int; // element k is in ci[pk1..pk2]
        len[k] = (pk2 - pk1) as Int;
        elen[k] = -2; // k is now an element

        // Find set differences.

        mark = wclear(mark, lemax, &mut w, n); // clear w if necessary
        for pk in pk1..pk2 {
            // scan 1: find |Le\Lk|
            let i = ci[pk] as usize;
            let eln = elen[i];
            if eln <= 0 {
                continue; // skip if elen[i] empty
            }
            let nvi = -nv[i]; // nv[i] was negated
            let wnvi = mark - nvi;
            let start = cp[i] as usize;
            for p in start..start + eln as usize {
                // scan Ei
                let e = ci[p] as usize;
                if w[e] >= mark {
                    w[e] -= nvi; // decrement |Le\Lk|
                } else if w[e] != 0 {
                    // ensure e is a live element
                    w[e] = degree[e] + wnvi; // 1st time e seen in scan 1
                }
            }
        }

        // Degree update.

        for pk in pk1..pk2 {
            // scan2: degree update
            let i = ci[pk] as usize; // consider node i in Lk
            let p1 = cp[i] as usize;
            let p2 = p1 + elen[i] as usize; // elements of i are ci[p1..p2]
            let mut pn = p1;
            let mut h: usize = 0;
            let mut d: Int = 0;
            for p in p1..p2 {
                // scan Ei
                let e = ci[p] as usize;
                if w[e] != 0 {
                    // e is an unabsorbed element
                    let dext = w[e] - mark; // dext = |Le\Lk|
                    assert_debug!(dext >= 0);
                    if dext > 0 || !aggressive {
                        d += dext; // sum up the set differences
                        ci[pn] = e as Int; // keep e in Ei
                        pn += 1;
                        h = h.wrapping_add(e); // compute the hash of node i
                    } else {
                        cp[e] = flip(k as Int); // aggressive absorb. e->k
                        w[e] = 0; // e is a dead element
                    }
                }
            }
            elen[i] = (pn - p1 + 1) as Int; // elen[i] = |Ei|
            let p3 = pn;
            let p4 = p1 + len[i] as usize;
            for p in p2..p4 {
                // prune edges in Ai
                let j = ci[p] as usize;
                let nvj = nv[j];
                if nvj <= 0 {
                    continue; // node j dead or in Lk
                }
                d += nvj; // degree(i) += |j|
                ci[pn] = j as Int; // place j in node list of i
                pn += 1;
                h = h.wrapping_add(j); // compute hash for node i
            }
            if d == 0 {
                // check for mass elimination
                cp[i] = flip(k as Int); // absorb i into k
                let nvi = -nv[i];
                dk -= nvi; // |Lk| -= |i|
                nvk += nvi; // |k| += nv[i]
                nel += nvi;
                nv[i] = 0;
                elen[i] = EMPTY; // node i is dead
            } else {
                degree[i] = degree[i].min(d); // update degree(i)
                ci[pn] = ci[p3]; // move first node to end
                ci[p3] = ci[p1]; // move 1st el. to end of Ei
                ci[p1] = k as Int; // add k as 1st element in of Ei
                len[i] = (pn - p1 + 1) as Int; // new len of adj. list of node i
                let h = h % n; // finalize hash of i
                next[i] = hhead[h]; // place i in hash bucket
                hhead[h] = i as Int;
                last[i] = h as Int; // save hash of i in last[i]
            }
        } // scan2 is done
        degree[k] = dk; // finalize |Lk|
        lemax = lemax.max(dk);
        mark = wclear(mark.saturating_add(lemax), lemax, &mut w, n); // clear w

        // Supernode detection.

        for pk in pk1..pk2 {
            let i = ci[pk] as usize;
            if nv[i] >= 0 {
                continue; // skip if i is dead
            }
            let h = last[i] as usize; // scan hash bucket of node i
            let mut i = hhead[h];
            hhead[h] = EMPTY; // hash bucket will be empty
            while i != EMPTY && next[i as usize] != EMPTY {
                let iu = i as usize;
                let ln = len[iu];
                let eln = elen[iu];
                let istart = cp[iu] as usize;
                for p in istart + 1..istart + ln as usize {
                    w[ci[p] as usize] = mark;
                }
                let mut jlast = iu;
                let mut j = next[iu];
                while j != EMPTY {
                    // compare i with all j
                    let ju = j as usize;
                    let jstart = cp[ju] as usize;
                    let ok = len[ju] == ln
                        && elen[ju] == eln
                        && (jstart + 1..jstart + ln as usize).all(|p| w[ci[p] as usize] == mark);
                    if ok {
                        // i and j are identical
                        cp[ju] = flip(i); // absorb j into i
                        nv[iu] += nv[ju];
                        nv[ju] = 0;
                        elen[ju] = EMPTY; // node j is dead
                        j = next[ju]; // delete j from hash bucket
                        next[jlast] = j;
                    } else {
                        jlast = ju; // j and i are different
                        j = next[ju];
                    }
                }
                i = next[iu];
                mark += 1;
            }
        }

        // Finalize new element.

        let mut p = pk1;
        for pk in pk1..pk2 {
            // finalize Lk
            let i = ci[pk] as usize;
            let nvi = -nv[i];
            if nvi <= 0 {
                continue; // skip if i is dead
            }
            nv[i] = nvi; // restore nv[i]
            let d = (degree[i] + dk - nvi).min(ni - nel - nvi); // compute external degree(i)
            let du = d as usize;
            if head[du] != EMPTY {
                last[head[du] as usize] = i as Int;
            }
            next[i] = head[du]; // put i back in degree list
            last[i] = EMPTY;
            head[du] = i as Int;
            mindeg = mindeg.min(du); // find new minimum degree
            degree[i] = d;
            ci[p] = i as Int; // place i in Lk
            p += 1;
        }
        nv[k] = nvk; // # nodes absorbed into k
        len[k] = (p - pk1) as Int;
        if len[k] == 0 {
            // length of adj list of element k
            cp[k] = EMPTY; // k is a root of the tree
            w[k] = 0; // k is now a dead element
        }
        if elenk != 0 {
            cnz = p; // free unused space in Lk
        }
    }

    // Postordering.

    for i in 0..n {
        if cp[i] >= 0 {
            cp[i] = EMPTY; // element never absorbed, a root of the tree
        }
        cp[i] = flip(cp[i]); // fix assembly tree
    }
    let mut tree_head: Vec<Option<usize>> = vec![None; n + 1];
    let mut tree_next: Vec<Option<usize>> = vec![None; n + 1];
    for j in (0..=n).rev() {
        // place unordered nodes in lists
        if nv[j] > 0 {
            continue; // skip if j is an element
        }
        let parent = cp[j] as usize;
        tree_next[j] = tree_head[parent]; // place j in list of its parent
        tree_head[parent] = Some(j);
    }
    for e in (0..=n).rev() {
        // place elements in lists
        if nv[e] <= 0 {
            continue; // skip unless e is an element
        }
        if cp[e] != EMPTY {
            let parent = cp[e] as usize;
            tree_next[e] = tree_head[parent]; // place e in list of its parent
            tree_head[parent] = Some(e);
        }
    }
    let mut perm = vec![0; n + 1];
    let mut stack = Vec::with_capacity(n + 1);
    let mut k = 0;
    for i in 0..=n {
        // postorder the assembly tree
        if cp[i] == EMPTY {
            k = tdfs(i, k, &mut tree_head, &tree_next, &mut perm, &mut stack);
        }
    }
    assert_debug!(k == n + 1 && perm[n] == n);
    perm.truncate(n); // node n is the placeholder for dense nodes

    stats[DENSE] = nv[n] - 1;
    stats[DEFRAG_COUNT] = ngarbage;
    stats[INFO1] = ni;
    stats[INFO2] = cnz0 as Int;
    stats[INFO3] = lemax;
    log::debug!(
        "amd: {:?} ordering of {} nodes, {} off-diagonal entries, {} dense, {} garbage collections",
        order,
        n,
        cnz0,
        stats[DENSE],
        ngarbage
    );
    Ok(Some(perm))
}

// Clears w if mark is small or the next marks could overflow, so that
// w[0..n] < mark holds on return.
fn wclear(mark: Int, lemax: Int, w: &mut [Int], n: usize) -> Int {
    let headroom = mark
        .checked_add(lemax)
        .and_then(|v| v.checked_add(n as Int));
    if mark < 2 || headroom.is_none() {
        for k in 0..n {
            if w[k] != 0 {
                w[k] = 1;
            }
        }
        return 2;
    }
    mark
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etree::{counts, etree, post};
    use crate::perm::pinv;
    use crate::triplet::Triplet;

    fn is_perm(p: &[usize], n: usize) -> bool {
        let mut seen = vec![false; n];
        p.len() == n && p.iter().all(|&i| i < n && !std::mem::replace(&mut seen[i], true))
    }

    fn laplacian(k: usize) -> CscMatrix {
        // 5-point grid Laplacian on a k-by-k grid
        let n = k * k;
        let mut t = Triplet::new(n, n);
        for r in 0..k {
            for c in 0..k {
                let v = r * k + c;
                t.push(v, v, 4.0).unwrap();
                if c + 1 < k {
                    t.push(v, v + 1, -1.0).unwrap();
                    t.push(v + 1, v, -1.0).unwrap();
                }
                if r + 1 < k {
                    t.push(v, v + k, -1.0).unwrap();
                    t.push(v + k, v, -1.0).unwrap();
                }
            }
        }
        t.compress()
    }

    fn cholesky_nnz(a: &CscMatrix, p: Option<&[usize]>) -> usize {
        let c = match p {
            Some(p) => crate::algebra::symperm(a, Some(pinv(p).as_slice()), false).unwrap(),
            None => crate::algebra::symperm(a, None, false).unwrap(),
        };
        let parent = etree(&c, false);
        let post = post(&parent);
        counts(&c, &parent, &post, false).iter().sum()
    }

    #[test]
    fn natural_is_none() {
        let a = laplacian(3);
        assert_eq!(amd(Order::Natural, &a).unwrap(), None);
    }

    #[test]
    fn from_code() {
        assert_eq!(Order::from_code(1), Some(Order::Symmetric));
        assert_eq!(Order::from_code(3), Some(Order::Normal));
        assert_eq!(Order::from_code(4), None);
    }

    #[test]
    fn grid_ordering_reduces_fill() {
        let a = laplacian(12);
        let n = a.ncols();
        let mut stats = empty_stats();
        let p = amd_with(Order::Symmetric, &a, None, &mut stats).unwrap().unwrap();
        assert!(is_perm(&p, n));
        assert_eq!(stats[STATUS], OK);
        assert_eq!(stats[INFO1], n as Int);
        assert!(cholesky_nnz(&a, Some(p.as_slice())) < cholesky_nnz(&a, None));
    }

    #[test]
    fn deterministic() {
        let a = laplacian(9);
        let p1 = amd(Order::Symmetric, &a).unwrap();
        let p2 = amd(Order::Symmetric, &a).unwrap();
        assert_eq!(p1, p2);
    }

    #[test]
    fn without_aggressive_absorption() {
        let a = laplacian(10);
        let mut knobs = default_knobs();
        knobs[AGGRESSIVE] = 0.0;
        let mut stats = empty_stats();
        let p = amd_with(Order::Symmetric, &a, Some(knobs), &mut stats).unwrap().unwrap();
        assert!(is_perm(&p, a.ncols()));
    }

    #[test]
    fn dense_row_is_ordered_last() {
        // arrow matrix: node 0 is adjacent to everything
        let n = 100;
        let mut t = Triplet::new(n, n);
        for i in 0..n {
            t.push(i, i, 1.0).unwrap();
            if i > 0 {
                t.push(0, i, 1.0).unwrap();
                t.push(i, 0, 1.0).unwrap();
            }
        }
        let a = t.compress();
        let mut stats = empty_stats();
        let p = amd_with(Order::Symmetric, &a, None, &mut stats).unwrap().unwrap();
        assert!(is_perm(&p, n));
        assert_eq!(stats[DENSE], 1);
        assert_eq!(p[n - 1], 0);
    }

    #[test]
    fn rectangular_policies() {
        let mut t = Triplet::new(6, 4);
        for (i, j) in [(0, 0), (1, 0), (1, 1), (2, 2), (3, 3), (4, 1), (5, 3), (5, 0)] {
            t.push(i, j, 1.0).unwrap();
        }
        let a = t.compress();
        for order in [Order::SparseNormal, Order::Normal] {
            let p = amd(order, &a).unwrap().unwrap();
            assert!(is_perm(&p, 4));
        }
        let mut stats = empty_stats();
        let p = amd_with(Order::Symmetric, &a, None, &mut stats).unwrap().unwrap();
        assert!(is_perm(&p, 4));
        assert_eq!(stats[STATUS], OK_BUT_RECTANGULAR);
    }

    #[test]
    fn tiny_and_empty() {
        assert_eq!(amd(Order::Normal, &CscMatrix::zeros(0, 0)).unwrap(), Some(vec![]));
        assert_eq!(amd(Order::Symmetric, &CscMatrix::identity(1)).unwrap(), Some(vec![0]));
        let p = amd(Order::Symmetric, &CscMatrix::identity(5)).unwrap().unwrap();
        assert!(is_perm(&p, 5));
    }
}

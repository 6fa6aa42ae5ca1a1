use crate::error::{Error, Result};
use crate::internal::{assert_debug, cumsum};

/// A sparse matrix in compressed-column form.
///
/// Column `j` holds row indices `i[p[j]..p[j+1]]` and, unless the matrix is a
/// pattern, values `x[p[j]..p[j+1]]`. Row indices within a column need not
/// be sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct CscMatrix {
    m: usize,
    n: usize,
    p: Vec<usize>,
    i: Vec<usize>,
    x: Option<Vec<f64>>,
}

impl CscMatrix {
    /// Builds a matrix from its column pointers, row indices and optional
    /// values.
    ///
    /// # Panics
    ///
    /// Panics if `p` does not have `n + 1` entries or the index and value
    /// arrays are shorter than `p[n]`.
    pub fn new(m: usize, n: usize, p: Vec<usize>, mut i: Vec<usize>, x: Option<Vec<f64>>) -> Self {
        assert_eq!(p.len(), n + 1, "column pointers must have n+1 entries");
        let nz = p[n];
        assert!(i.len() >= nz, "row index array shorter than p[n]");
        i.truncate(nz);
        let x = x.map(|mut x| {
            assert!(x.len() >= nz, "value array shorter than p[n]");
            x.truncate(nz);
            x
        });
        assert_debug!(p.windows(2).all(|w| w[0] <= w[1]));
        assert_debug!(i.iter().all(|&r| r < m));
        CscMatrix { m, n, p, i, x }
    }

    /// An `m`-by-`n` matrix with no entries.
    pub fn zeros(m: usize, n: usize) -> Self {
        CscMatrix::new(m, n, vec![0; n + 1], Vec::new(), Some(Vec::new()))
    }

    /// The `n`-by-`n` identity.
    pub fn identity(n: usize) -> Self {
        CscMatrix::new(n, n, (0..=n).collect(), (0..n).collect(), Some(vec![1.0; n]))
    }

    pub fn nrows(&self) -> usize {
        self.m
    }

    pub fn ncols(&self) -> usize {
        self.n
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.p[self.n]
    }

    pub fn col_ptrs(&self) -> &[usize] {
        &self.p
    }

    pub fn row_indices(&self) -> &[usize] {
        &self.i
    }

    pub fn values(&self) -> Option<&[f64]> {
        self.x.as_deref()
    }

    pub fn values_mut(&mut self) -> Option<&mut [f64]> {
        self.x.as_deref_mut()
    }

    /// Values, or [`Error::PatternOnly`] for a pattern matrix.
    pub fn try_values(&self) -> Result<&[f64]> {
        self.values().ok_or(Error::PatternOnly)
    }

    pub fn has_values(&self) -> bool {
        self.x.is_some()
    }

    /// Row indices of column `j`.
    pub fn col(&self, j: usize) -> &[usize] {
        &self.i[self.p[j]..self.p[j + 1]]
    }

    /// A copy of the nonzero pattern without values.
    pub fn pattern(&self) -> CscMatrix {
        CscMatrix {
            m: self.m,
            n: self.n,
            p: self.p.clone(),
            i: self.i.clone(),
            x: None,
        }
    }

    /// Column pointers and row indices with mutable values, for updating a
    /// matrix in place without changing its pattern.
    pub(crate) fn values_parts_mut(&mut self) -> (&[usize], &[usize], Option<&mut [f64]>) {
        (&self.p, &self.i, self.x.as_deref_mut())
    }

    pub(crate) fn into_parts(self) -> (usize, usize, Vec<usize>, Vec<usize>, Option<Vec<f64>>) {
        (self.m, self.n, self.p, self.i, self.x)
    }

    /// Value of entry `(i, j)`, summing duplicates; zero if absent.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        let Some(x) = self.values() else {
            return 0.0;
        };
        (self.p[j]..self.p[j + 1])
            .filter(|&p| self.i[p] == i)
            .map(|p| x[p])
            .sum()
    }

    /// Transpose. A pattern is produced when `values` is false.
    pub fn transpose(&self, values: bool) -> CscMatrix {
        let (m, n) = (self.m, self.n);
        let ax = if values { self.values() } else { None };
        let nz = self.nnz();
        let mut cp = vec![0; m + 1];
        let mut ci = vec![0; nz];
        let mut cx = ax.map(|_| vec![0.0; nz]);
        let mut w = vec![0; m];
        for &r in &self.i[..nz] {
            w[r] += 1; // row counts
        }
        cumsum(&mut cp, &mut w);
        for j in 0..n {
            for p in self.p[j]..self.p[j + 1] {
                let q = w[self.i[p]];
                w[self.i[p]] += 1;
                ci[q] = j; // place A(i,j) as entry C(j,i)
                if let (Some(cx), Some(ax)) = (cx.as_mut(), ax) {
                    cx[q] = ax[p];
                }
            }
        }
        CscMatrix::new(n, m, cp, ci, cx)
    }

    /// Drops entries for which `keep(i, j, aij)` is false, compacting in
    /// place. Pattern entries are passed a value of 1. Returns the new
    /// number of entries.
    pub fn fkeep<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(usize, usize, f64) -> bool,
    {
        let n = self.n;
        let mut nz = 0;
        for j in 0..n {
            let start = self.p[j];
            let end = self.p[j + 1];
            self.p[j] = nz; // record new location of col j
            for p in start..end {
                let aij = self.x.as_ref().map_or(1.0, |x| x[p]);
                if keep(self.i[p], j, aij) {
                    if let Some(x) = self.x.as_mut() {
                        x[nz] = x[p]; // keep A(i,j)
                    }
                    self.i[nz] = self.i[p];
                    nz += 1;
                }
            }
        }
        self.p[n] = nz;
        self.i.truncate(nz);
        if let Some(x) = self.x.as_mut() {
            x.truncate(nz);
        }
        nz
    }

    /// Removes explicitly stored zeros. Returns the number of entries dropped.
    pub fn dropzeros(&mut self) -> usize {
        let before = self.nnz();
        before - self.fkeep(|_, _, aij| aij != 0.0)
    }

    /// Removes entries with `|aij| <= tol`. Returns the number of entries dropped.
    pub fn droptol(&mut self, tol: f64) -> usize {
        let before = self.nnz();
        before - self.fkeep(|_, _, aij| aij.abs() > tol)
    }

    /// Sums duplicate entries in place. The first occurrence of each
    /// `(i, j)` keeps its position within the column.
    pub fn dupl(&mut self) {
        let (m, n) = (self.m, self.n);
        let mut w: Vec<Option<usize>> = vec![None; m]; // row i not yet seen
        let mut nz = 0;
        for j in 0..n {
            let q = nz; // column j will start at q
            let start = self.p[j];
            let end = self.p[j + 1];
            for p in start..end {
                let i = self.i[p];
                match w[i] {
                    Some(pos) if pos >= q => {
                        // A(i,j) is a duplicate
                        if let Some(x) = self.x.as_mut() {
                            x[pos] += x[p];
                        }
                    }
                    _ => {
                        w[i] = Some(nz); // record where row i occurs
                        self.i[nz] = i;
                        if let Some(x) = self.x.as_mut() {
                            x[nz] = x[p];
                        }
                        nz += 1;
                    }
                }
            }
            self.p[j] = q;
        }
        self.p[n] = nz;
        self.i.truncate(nz);
        if let Some(x) = self.x.as_mut() {
            x.truncate(nz);
        }
    }

    /// Sorts the row indices of every column (by a double transpose).
    pub fn sort(&self) -> CscMatrix {
        let values = self.has_values();
        self.transpose(values).transpose(values)
    }

    /// True if the matrix is square with no entries below the diagonal.
    pub fn is_upper_triangular(&self) -> bool {
        self.m == self.n && (0..self.n).all(|j| self.col(j).iter().all(|&i| i <= j))
    }

    /// True if the matrix is square with no entries above the diagonal.
    pub fn is_lower_triangular(&self) -> bool {
        self.m == self.n && (0..self.n).all(|j| self.col(j).iter().all(|&i| i >= j))
    }
}

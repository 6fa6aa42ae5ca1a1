use std::io::BufRead;

use crate::csc::CscMatrix;
use crate::error::{Error, Result};
use crate::internal::cumsum;

/// A sparse matrix in triplet (coordinate) form.
///
/// Entries are appended in any order and duplicates are allowed; they are
/// summed later by [`CscMatrix::dupl`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Triplet {
    m: usize,
    n: usize,
    i: Vec<usize>,
    j: Vec<usize>,
    x: Vec<f64>,
}

impl Triplet {
    /// An empty `m`-by-`n` triplet matrix.
    pub fn new(m: usize, n: usize) -> Self {
        Self::with_capacity(m, n, 1)
    }

    /// An empty `m`-by-`n` triplet matrix with room for `nzmax` entries.
    pub fn with_capacity(m: usize, n: usize, nzmax: usize) -> Self {
        let nzmax = nzmax.max(1);
        Triplet {
            m,
            n,
            i: Vec::with_capacity(nzmax),
            j: Vec::with_capacity(nzmax),
            x: Vec::with_capacity(nzmax),
        }
    }

    pub fn nrows(&self) -> usize {
        self.m
    }

    pub fn ncols(&self) -> usize {
        self.n
    }

    /// Number of entries, counting duplicates.
    pub fn nnz(&self) -> usize {
        self.i.len()
    }

    /// Number of entries the matrix can hold before it must grow.
    pub fn capacity(&self) -> usize {
        self.i.capacity()
    }

    pub fn row_indices(&self) -> &[usize] {
        &self.i
    }

    pub fn col_indices(&self) -> &[usize] {
        &self.j
    }

    pub fn values(&self) -> &[f64] {
        &self.x
    }

    /// Appends entry `(i, j, x)`, doubling the storage when full. The entry
    /// must lie within the dimensions given at creation.
    pub fn push(&mut self, i: usize, j: usize, x: f64) -> Result<()> {
        if i >= self.m || j >= self.n {
            return Err(Error::EntryOutOfBounds {
                row: i,
                col: j,
                m: self.m,
                n: self.n,
            });
        }
        self.append(i, j, x)
    }

    // Appends (i, j, x) and extends the dimensions to include it.
    fn push_growing(&mut self, i: usize, j: usize, x: f64) -> Result<()> {
        self.m = self.m.max(i + 1);
        self.n = self.n.max(j + 1);
        self.append(i, j, x)
    }

    fn append(&mut self, i: usize, j: usize, x: f64) -> Result<()> {
        if self.i.len() == self.i.capacity() {
            self.grow(2 * self.i.capacity().max(1))?;
        }
        self.i.push(i);
        self.j.push(j);
        self.x.push(x);
        Ok(())
    }

    fn grow(&mut self, capacity: usize) -> Result<()> {
        let extra = capacity - self.i.len();
        self.i
            .try_reserve_exact(extra)
            .and_then(|_| self.j.try_reserve_exact(extra))
            .and_then(|_| self.x.try_reserve_exact(extra))
            .map_err(|_| Error::OutOfMemory { capacity })
    }

    /// Reads a triplet matrix from whitespace-separated `row col value`
    /// records, one per line, with row and column indices in the given base
    /// (0 or 1). Blank lines are skipped. The dimensions are the smallest
    /// that hold every entry read.
    pub fn load<R: BufRead>(reader: R, base: usize) -> Result<Triplet> {
        if base > 1 {
            return Err(Error::InvalidBase(base));
        }
        let mut t = Triplet::new(0, 0);
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = lineno + 1;
            let mut fields = line.split_whitespace();
            let Some(first) = fields.next() else {
                continue;
            };
            let (Some(second), Some(third)) = (fields.next(), fields.next()) else {
                return Err(Error::Parse {
                    line: line_number,
                    reason: "expected three fields: row col value".to_string(),
                });
            };
            if fields.next().is_some() {
                return Err(Error::Parse {
                    line: line_number,
                    reason: "trailing fields after row col value".to_string(),
                });
            }
            let i = parse_index(first, base, line_number)?;
            let j = parse_index(second, base, line_number)?;
            let x: f64 = third.parse().map_err(|_| Error::Parse {
                line: line_number,
                reason: format!("invalid value {third:?}"),
            })?;
            t.push_growing(i, j, x)?;
        }
        log::debug!(
            "load: {}-by-{} triplet matrix with {} entries",
            t.m,
            t.n,
            t.nnz()
        );
        Ok(t)
    }

    /// Converts to compressed-column form. Duplicates are kept; entries
    /// within a column keep their relative order.
    pub fn compress(&self) -> CscMatrix {
        let (m, n) = (self.m, self.n);
        let nz = self.nnz();
        let mut cp = vec![0; n + 1];
        let mut ci = vec![0; nz];
        let mut cx = vec![0.0; nz];
        let mut w = vec![0; n];
        for &j in &self.j {
            w[j] += 1; // column counts
        }
        cumsum(&mut cp, &mut w);
        for k in 0..nz {
            let p = w[self.j[k]];
            w[self.j[k]] += 1;
            ci[p] = self.i[k];
            cx[p] = self.x[k];
        }
        CscMatrix::new(m, n, cp, ci, Some(cx))
    }
}

fn parse_index(field: &str, base: usize, line: usize) -> Result<usize> {
    let v: usize = field.parse().map_err(|_| Error::Parse {
        line,
        reason: format!("invalid index {field:?}"),
    })?;
    v.checked_sub(base).ok_or_else(|| Error::Parse {
        line,
        reason: format!("index {v} below base {base}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_grows_capacity() {
        let mut t = Triplet::with_capacity(4, 5, 1);
        t.push(0, 0, 1.0).unwrap();
        t.push(3, 1, 2.0).unwrap();
        t.push(1, 4, 3.0).unwrap();
        assert_eq!((t.nrows(), t.ncols()), (4, 5));
        assert_eq!(t.nnz(), 3);
        assert!(t.capacity() >= 3);
    }

    #[test]
    fn push_rejects_entry_outside_dimensions() {
        let mut t = Triplet::new(2, 2);
        t.push(1, 1, 1.0).unwrap();
        assert!(matches!(
            t.push(5, 7, 1.0),
            Err(Error::EntryOutOfBounds { row: 5, col: 7, m: 2, n: 2 })
        ));
        assert!(matches!(t.push(0, 2, 1.0), Err(Error::EntryOutOfBounds { .. })));
        assert_eq!((t.nrows(), t.ncols(), t.nnz()), (2, 2, 1));
    }

    #[test]
    fn load_one_based() {
        let text = "1 1 4.0\n\n2 1 -1.5\n  2 2 3.0  \n";
        let t = Triplet::load(text.as_bytes(), 1).unwrap();
        assert_eq!((t.nrows(), t.ncols(), t.nnz()), (2, 2, 3));
        assert_eq!(t.row_indices(), &[0, 1, 1]);
        assert_eq!(t.col_indices(), &[0, 0, 1]);
        assert_eq!(t.values(), &[4.0, -1.5, 3.0]);
    }

    #[test]
    fn load_rejects_bad_records() {
        assert!(matches!(
            Triplet::load("0 0\n".as_bytes(), 0),
            Err(Error::Parse { line: 1, .. })
        ));
        assert!(matches!(
            Triplet::load("0 0 1\n0 x 1\n".as_bytes(), 0),
            Err(Error::Parse { line: 2, .. })
        ));
        assert!(matches!(
            Triplet::load("0 0 1\n".as_bytes(), 1),
            Err(Error::Parse { line: 1, .. })
        ));
        assert!(matches!(
            Triplet::load("".as_bytes(), 2),
            Err(Error::InvalidBase(2))
        ));
    }

    #[test]
    fn compress_keeps_duplicates() {
        let mut t = Triplet::new(2, 2);
        t.push(1, 0, 1.0).unwrap();
        t.push(0, 1, 2.0).unwrap();
        t.push(1, 0, 3.0).unwrap();
        let a = t.compress();
        assert_eq!(a.col_ptrs(), &[0, 2, 3]);
        assert_eq!(a.row_indices(), &[1, 1, 0]);
        assert_eq!(a.values().unwrap(), &[1.0, 3.0, 2.0]);
    }
}

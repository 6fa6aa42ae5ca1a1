#[cfg(not(feature = "i64"))]
pub type Int = i32;

#[cfg(feature = "i64")]
pub type Int = i64;

pub(crate) const EMPTY: Int = -1;

/// Rows or columns with more entries than this are treated as dense.
pub(crate) fn dense_degree(alpha: f64, n: usize) -> Int {
    f64::max(16.0, alpha * (n as f64).sqrt()) as Int
}

// Marks an index in a signed workspace; flip(flip(i)) == i and flip(-1) == -1.
pub(crate) fn flip(i: Int) -> Int {
    -i - 2
}

/// `p[0..n]` = cumulative sum of `c[0..n]`, `p[n]` = total, and `c` is
/// overwritten with a copy of `p[0..n]`.
pub(crate) fn cumsum(p: &mut [usize], c: &mut [usize]) -> usize {
    let n = c.len();
    let mut nz = 0;
    for i in 0..n {
        p[i] = nz;
        nz += c[i];
        c[i] = p[i];
    }
    p[n] = nz;
    nz
}

// Feature: debug

#[cfg(feature = "debug")]
macro_rules! assert_debug {
    ($cond:expr) => {
        assert!($cond)
    };
}

#[cfg(not(feature = "debug"))]
macro_rules! assert_debug {
    ($cond:expr) => {};
}

pub(crate) use assert_debug;

#![allow(dead_code)]

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use csparse::{gaxpy, norm1, CscMatrix, Triplet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Loads a triplet file from `tests/data`.
pub fn load(name: &str, base: usize) -> Triplet {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name);
    let file = File::open(&path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e));
    Triplet::load(BufReader::new(file), base).unwrap()
}

/// The 4-by-4 unsymmetric `t1` matrix.
pub fn t1() -> CscMatrix {
    let mut a = load("t1", 0).compress();
    a.dupl();
    a
}

/// The 5-point Laplacian on a `k`-by-`k` grid, symmetric positive definite.
pub fn laplacian(k: usize) -> CscMatrix {
    let n = k * k;
    let mut t = Triplet::new(n, n);
    for x in 0..k {
        for y in 0..k {
            let j = x * k + y;
            t.push(j, j, 4.0).unwrap();
            if x + 1 < k {
                t.push(j, j + k, -1.0).unwrap();
                t.push(j + k, j, -1.0).unwrap();
            }
            if y + 1 < k {
                t.push(j, j + 1, -1.0).unwrap();
                t.push(j + 1, j, -1.0).unwrap();
            }
        }
    }
    t.compress()
}

/// An `m`-by-`n` matrix with about `per_col` random entries in `[-1, 1)`
/// per column, plus `diag` added on the diagonal.
pub fn random(m: usize, n: usize, per_col: usize, diag: f64, seed: u64) -> CscMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut t = Triplet::new(m, n);
    for j in 0..n {
        if j < m && diag != 0.0 {
            t.push(j, j, diag).unwrap();
        }
        for _ in 0..per_col {
            let i = rng.gen_range(0..m);
            t.push(i, j, rng.gen_range(-1.0..1.0)).unwrap();
        }
    }
    let mut a = t.compress();
    a.dupl();
    a
}

pub fn norm_inf(x: &[f64]) -> f64 {
    x.iter().fold(0.0, |acc, xi| f64::max(acc, xi.abs()))
}

/// `norm(A*x-b,inf) / (norm(A,1)*norm(x,inf) + norm(b,inf))`.
pub fn residual(a: &CscMatrix, x: &[f64], b: &[f64]) -> f64 {
    let mut r: Vec<f64> = b.iter().map(|bi| -bi).collect();
    gaxpy(a, x, &mut r).unwrap();
    norm_inf(&r) / (norm1(a) * norm_inf(x) + norm_inf(b))
}

/// The right-hand side `b[i] = 1 + i/m` used throughout.
pub fn rhs(m: usize) -> Vec<f64> {
    (0..m).map(|i| 1.0 + i as f64 / m as f64).collect()
}

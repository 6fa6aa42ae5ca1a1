use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use csparse::stats::{empty_stats, INFO1};
use csparse::{
    amd_report, amd_with, cholsol, dmperm, gaxpy, lusol, make_symmetric, norm1, qrsol,
    ColumnOrder, CscMatrix, Order, Triplet,
};

/// Reads a matrix in triplet form, then orders, analyses and solves with it.
///
/// The matrix is read from FILE, or from standard input, as lines of
/// `row col value`. A triangular matrix is taken to be one half of a
/// symmetric one.
///
/// The right-hand side is `b[i] = 1 + i/m`. QR is used when `m >= n`, LU for
/// square matrices and Cholesky for symmetric ones, each with the orderings
/// appropriate to it, and the relative residual of every solve is printed.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Triplet file to read (standard input if omitted)
    file: Option<PathBuf>,

    /// Index base of the row and column indices
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    base: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> csparse::Result<()> {
    let base = usize::from(cli.base);
    let t = match &cli.file {
        Some(path) => Triplet::load(BufReader::new(File::open(path)?), base)?,
        None => Triplet::load(io::stdin().lock(), base)?,
    };

    let mut a = t.compress();
    a.dupl(); // sum up duplicates
    let dropped = a.dropzeros(); // drop zero entries
    let (m, n) = (a.nrows(), a.ncols());
    let symmetric = m == n && (a.is_upper_triangular() || a.is_lower_triangular());
    if symmetric {
        a = make_symmetric(&a)?; // C = A + triu(A,1)'
    }
    println!(
        "matrix: {}-by-{}, nnz: {} (sym: {}, zeros dropped: {}) norm: {:8.2e}",
        m,
        n,
        a.nnz(),
        symmetric,
        dropped,
        norm1(&a)
    );

    let timer = Instant::now();
    let d = dmperm(&a, ColumnOrder::Natural);
    println!(
        "blocks: {} singletons: {} structural rank: {} ({:.3}s)",
        d.nb,
        d.singletons(),
        d.structural_rank(),
        timer.elapsed().as_secs_f64()
    );
    if d.structural_rank() < m.min(n) {
        println!("matrix is structurally rank deficient");
    }

    let order = if m == n { Order::Symmetric } else { Order::Normal };
    let mut stats = empty_stats();
    amd_with(order, &a, None, &mut stats)?;
    amd_report(&stats);
    println!("amd {:?}: n: {}", order, stats[INFO1]);

    let scale = m.max(1) as f64;
    let b: Vec<f64> = (0..m.max(n)).map(|i| 1.0 + i as f64 / scale).collect();
    if m >= n {
        for order in [Order::Natural, Order::Normal] {
            let mut x = b.clone();
            let timer = Instant::now();
            match qrsol(order, &a, &mut x) {
                Ok(()) => report("QR", order, &a, &b[..m], &x[..n], timer),
                Err(err) => println!("QR    {:?}: {}", order, err),
            }
        }
    }
    if m == n {
        let tol = if symmetric { 0.001 } else { 1.0 };
        for order in [Order::Natural, Order::Symmetric, Order::SparseNormal, Order::Normal] {
            if order == Order::Natural && m > 1000 {
                continue;
            }
            let mut x = b.clone();
            let timer = Instant::now();
            match lusol(order, &a, &mut x, tol) {
                Ok(()) => report("LU", order, &a, &b, &x, timer),
                Err(err) => println!("LU    {:?}: {}", order, err),
            }
        }
    }
    if symmetric {
        for order in [Order::Natural, Order::Symmetric] {
            if order == Order::Natural && m > 1000 {
                continue;
            }
            let mut x = b.clone();
            let timer = Instant::now();
            match cholsol(order, &a, &mut x) {
                Ok(()) => report("Chol", order, &a, &b, &x, timer),
                Err(err) => println!("Chol  {:?}: {}", order, err),
            }
        }
    }
    Ok(())
}

// Prints norm(A*x-b,inf) / (norm(A,1)*norm(x,inf) + norm(b,inf)).
fn report(method: &str, order: Order, a: &CscMatrix, b: &[f64], x: &[f64], timer: Instant) {
    let mut r: Vec<f64> = b.iter().map(|bi| -bi).collect();
    if gaxpy(a, x, &mut r).is_err() {
        return;
    }
    let norm = |v: &[f64]| v.iter().fold(0.0f64, |acc, vi| acc.max(vi.abs()));
    println!(
        "{:<5} {:?}: resid {:8.2e} ({:.3}s)",
        method,
        order,
        norm(&r) / (norm1(a) * norm(x) + norm(b)),
        timer.elapsed().as_secs_f64()
    );
}
